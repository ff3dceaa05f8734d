use log::{debug, info, warn};

use crate::area::flood_areas;
use crate::emit::{emit_model, CompileOutput};
use crate::entity::{set_model_numbers, Entity};
use crate::error::CompileError;
use crate::facebsp::{face_bsp, structural_face_list, visible_face_list};
use crate::filter::{
    clip_sides_into_tree, emit_hull_surfaces, filter_brushes_into_tree, filter_patches_into_tree,
    filter_sides_into_tree,
};
use crate::flood::{fill_outside, flood_entities, FloodStatus, LeakTrace};
use crate::options::{CompileOptions, DetailMode};
use crate::plane::PlaneTable;
use crate::portal::make_tree_portals;
use crate::shader::ContentFlags;
use crate::surface::{log_surface_stats, SurfaceList};
use crate::tree::{LeafBrush, Tree};

/// Everything the compile hands back to the driver: the serializer-ready
/// output plus diagnostics.
#[derive(Debug)]
pub struct CompileReport {
    pub output: CompileOutput,
    /// Leak polyline, present whenever a leak was found (fatal or not).
    pub leak: Option<LeakTrace>,
    pub num_areas: usize,
    pub num_planes: usize,
    pub num_surfaces: usize,
}

/// All mutable state of one compile invocation; torn down when the
/// compile returns.
pub struct CompileContext {
    pub options: CompileOptions,
    pub planes: PlaneTable,
    pub entities: Vec<Entity>,
    pub surfaces: SurfaceList,
    pub output: CompileOutput,
    num_areas: usize,
    leak: Option<LeakTrace>,
}

impl CompileContext {
    /// The plane table is the one the map loader interned the brush sides
    /// against; brush plane ids index into it.
    pub fn new(options: CompileOptions, entities: Vec<Entity>, planes: PlaneTable) -> CompileContext {
        let surfaces = SurfaceList::new(options.max_draw_surfaces);
        CompileContext {
            options,
            planes,
            entities,
            surfaces,
            output: CompileOutput::default(),
            num_areas: 0,
            leak: None,
        }
    }

    /// Process the world and every brush-model entity, strictly in order;
    /// each entity's tree is built, validated, filtered and emitted before
    /// the next one starts.
    pub fn process_models(mut self) -> Result<CompileReport, CompileError> {
        info!("--- ProcessModels ---");
        set_model_numbers(&mut self.entities);
        self.prepare_brushes()?;

        for entity_num in 0..self.entities.len() {
            if !self.entities[entity_num].has_geometry() {
                continue;
            }
            debug!(
                "############### model {} ###############",
                self.entities[entity_num].model_num
            );
            if entity_num == 0 {
                self.process_world_model()?;
            } else {
                self.process_submodel(entity_num)?;
            }
        }

        Ok(CompileReport {
            num_areas: self.num_areas,
            num_planes: self.planes.len(),
            num_surfaces: self.surfaces.len(),
            leak: self.leak,
            output: self.output,
        })
    }

    /// Window every brush and drop the ones the compile never looks at
    /// (collapsed, origin-only, or ignored detail). A world whose brushes
    /// all collapse has no usable geometry at all, which is fatal.
    fn prepare_brushes(&mut self) -> Result<(), CompileError> {
        let detail_mode = self.options.detail_mode;
        let world_had_brushes = !self.entities.is_empty() && !self.entities[0].brushes.is_empty();
        for entity_num in 0..self.entities.len() {
            let mut brushes = std::mem::take(&mut self.entities[entity_num].brushes);
            let mut kept = Vec::with_capacity(brushes.len());
            for mut brush in brushes.drain(..) {
                if brush.contents.contains(ContentFlags::Origin) {
                    continue;
                }
                if brush.is_detail() && detail_mode == DetailMode::Ignore {
                    continue;
                }
                if !brush.create_windings(&self.planes)? {
                    warn!(
                        "brush {} of entity {} collapsed to nothing",
                        brush.brush_num, entity_num
                    );
                    continue;
                }
                kept.push(brush);
            }
            self.entities[entity_num].brushes = kept;
        }
        if world_had_brushes && self.entities[0].brushes.is_empty() {
            return Err(CompileError::NoStructuralGeometry(0));
        }
        Ok(())
    }

    /// Options as adjusted by worldspawn keys.
    fn world_options(&self) -> CompileOptions {
        let world = &self.entities[0];
        let mut options = self.options.clone();

        for key in ["_blocksize", "blocksize", "chopsize"] {
            let value = world.value_for_key(key);
            if value.is_empty() {
                continue;
            }
            let parts: Vec<i32> = value
                .split_whitespace()
                .filter_map(|p| p.parse().ok())
                .collect();
            match parts.as_slice() {
                [all] => options.block_size = [*all; 3],
                [x, y, z] => options.block_size = [*x, *y, *z],
                _ => {}
            }
            break;
        }
        info!(
            "block size = {{ {} {} {} }}",
            options.block_size[0], options.block_size[1], options.block_size[2]
        );

        for key in ["_ignoreleaks", "ignoreleaks"] {
            if self.entities[0].value_for_key(key) == "1" {
                options.ignore_leaks = true;
            }
        }
        options
    }

    /// Full treatment for the worldspawn entity: structural tree, leak
    /// check, visible-face rebuild, filtering, areas, emission.
    fn process_world_model(&mut self) -> Result<(), CompileError> {
        let options = self.world_options();
        self.entities[0].first_draw_surface = self.surfaces.len();

        let mut brushes = std::mem::take(&mut self.entities[0].brushes);
        let structural: Vec<_> = brushes
            .iter()
            .filter(|b| !b.is_detail() || options.detail_mode == DetailMode::Promote)
            .cloned()
            .collect();

        // Initial tree from all structural faces.
        let faces = structural_face_list(&brushes, &options);
        if faces.is_empty() {
            self.entities[0].brushes = brushes;
            return Err(CompileError::NoStructuralGeometry(0));
        }
        let mut tree = face_bsp(faces, &mut self.planes, &options)?;
        make_tree_portals(&mut tree, &self.planes)?;
        filter_brushes_into_tree(&mut tree, &structural, &self.planes, true)?;

        // See if the world is completely enclosed.
        let mut status = flood_entities(&mut tree, &self.entities, &self.planes);
        if options.ignore_leaks && matches!(status, FloodStatus::Leaked(_)) {
            if let FloodStatus::Leaked(trace) = std::mem::replace(&mut status, FloodStatus::Enclosed)
            {
                debug!("leak ignored by option");
                self.leak = Some(trace);
            }
        }
        let empty = matches!(status, FloodStatus::Empty);
        let leaked = match status {
            FloodStatus::Leaked(trace) => {
                warn!("**********************");
                warn!("******* leaked *******");
                warn!("**********************");
                self.leak = Some(trace);
                if options.leak_fatal {
                    self.entities[0].brushes = brushes;
                    return Err(CompileError::MapLeaked);
                }
                true
            }
            _ => false,
        };

        if empty {
            // With nobody inside, filling would erase the whole map; just
            // chop the sides to their visible hulls on the first tree.
            clip_sides_into_tree(&mut brushes, &tree, &self.planes)?;
        } else {
            fill_outside(&mut tree);
            clip_sides_into_tree(&mut brushes, &tree, &self.planes)?;

            // Rebuild a tighter tree from only the sides visible from the
            // inside, then refilter.
            let faces = visible_face_list(&brushes, &options);
            let mut rebuilt = face_bsp(faces, &mut self.planes, &options)?;
            make_tree_portals(&mut rebuilt, &self.planes)?;
            filter_brushes_into_tree(&mut rebuilt, &structural, &self.planes, true)?;
            tree = rebuilt;

            // Flood once more so occupancy marks land on the new leaves;
            // the enclosure verdict already stands.
            let _ = flood_entities(&mut tree, &self.entities, &self.planes);
        }

        tree.number_clusters();
        self.num_areas = flood_areas(&mut tree, options.recognize_areaportals);

        // Detail brushes join the finished tree so they occlude correctly,
        // but never set leaf opacity.
        if options.detail_mode == DetailMode::Normal {
            let detail: Vec<_> = brushes.iter().filter(|b| b.is_detail()).cloned().collect();
            if !detail.is_empty() {
                filter_brushes_into_tree(&mut tree, &detail, &self.planes, false)?;
            }
        }

        // Final surfaces: the exact per-leaf set when the inside/outside
        // classification is trustworthy, the hull set otherwise.
        if leaked || empty {
            emit_hull_surfaces(
                &mut self.surfaces,
                &mut tree,
                &brushes,
                &self.planes,
                options.max_area_face_surfaces,
            )?;
        } else {
            filter_sides_into_tree(
                &mut self.surfaces,
                &mut tree,
                &mut brushes,
                &self.planes,
                options.max_area_face_surfaces,
            )?;
        }
        let patches = self.entities[0].patches.clone();
        filter_patches_into_tree(
            &mut self.surfaces,
            &mut tree,
            &patches,
            0,
            &self.planes,
            !(leaked || empty),
            options.max_area_face_surfaces,
        )?;
        log_surface_stats(&self.surfaces, self.entities[0].first_draw_surface);

        emit_model(&mut self.output, &mut self.surfaces, &brushes, &tree);
        self.entities[0].brushes = brushes;
        Ok(())
    }

    /// Brush-model entities get a minimal single-leaf tree: no splitting,
    /// no flood, hull surfaces only.
    fn process_submodel(&mut self, entity_num: usize) -> Result<(), CompileError> {
        self.entities[entity_num].first_draw_surface = self.surfaces.len();
        let mut brushes = std::mem::take(&mut self.entities[entity_num].brushes);

        let mut tree = Tree::single_leaf();
        clip_sides_into_tree(&mut brushes, &tree, &self.planes)?;

        // All brushes live in the head leaf.
        let head = tree.head;
        for brush in &brushes {
            let leaf_brush = LeafBrush {
                entity_num: brush.entity_num,
                brush_num: brush.brush_num,
                opaque: brush.opaque(),
                areaportal: brush.is_areaportal(),
            };
            tree.leaf_mut(head).brushes.push(leaf_brush);
        }

        emit_hull_surfaces(
            &mut self.surfaces,
            &mut tree,
            &brushes,
            &self.planes,
            self.options.max_area_face_surfaces,
        )?;
        let patches = self.entities[entity_num].patches.clone();
        filter_patches_into_tree(
            &mut self.surfaces,
            &mut tree,
            &patches,
            entity_num,
            &self.planes,
            false,
            self.options.max_area_face_surfaces,
        )?;
        log_surface_stats(&self.surfaces, self.entities[entity_num].first_draw_surface);

        emit_model(&mut self.output, &mut self.surfaces, &brushes, &tree);
        self.entities[entity_num].brushes = brushes;
        Ok(())
    }
}

/// Compile a fully loaded entity list. The single public entry point:
/// argument parsing and file output belong to the surrounding driver.
pub fn process_models(
    options: CompileOptions,
    entities: Vec<Entity>,
    planes: PlaneTable,
) -> Result<CompileReport, CompileError> {
    CompileContext::new(options, entities, planes).process_models()
}
