use log::debug;

use crate::brush::Brush;
use crate::math::Vec3;
use crate::shader::ShaderInfo;
use crate::winding::Winding;

/// A patch mesh attached to an entity, already flattened to planar faces
/// by the (external) tessellator. The compiler only clips and emits them.
#[derive(Clone, Debug)]
pub struct Patch {
    pub shader: ShaderInfo,
    pub faces: Vec<Winding>,
}

/// A map object: keyed string properties plus attached geometry.
#[derive(Clone, Debug, Default)]
pub struct Entity {
    /// Key/value pairs in map order. Order is part of deterministic output.
    pub pairs: Vec<(String, String)>,
    pub brushes: Vec<Brush>,
    pub patches: Vec<Patch>,
    /// Index of this entity's first draw surface in the compile output.
    pub first_draw_surface: usize,
    /// Model number assigned before processing ("*1", "*2", ...); 0 is the
    /// world.
    pub model_num: usize,
}

impl Entity {
    pub fn new(pairs: Vec<(String, String)>) -> Entity {
        Entity {
            pairs,
            ..Default::default()
        }
    }

    pub fn value_for_key(&self, key: &str) -> &str {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn set_key_value(&mut self, key: &str, value: &str) {
        if let Some(pair) = self.pairs.iter_mut().find(|(k, _)| k == key) {
            pair.1 = value.to_string();
        } else {
            self.pairs.push((key.to_string(), value.to_string()));
        }
    }

    pub fn classname(&self) -> &str {
        self.value_for_key("classname")
    }

    /// Parse a space-separated vector value; missing or malformed keys give
    /// the zero vector, matching the permissive key handling of map tools.
    pub fn vector_for_key(&self, key: &str) -> Vec3 {
        let value = self.value_for_key(key);
        let mut parts = value.split_whitespace().map(|p| p.parse::<f32>());
        match (parts.next(), parts.next(), parts.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => Vec3::new(x, y, z),
            _ => Vec3::new(0.0, 0.0, 0.0),
        }
    }

    pub fn origin(&self) -> Vec3 {
        self.vector_for_key("origin")
    }

    pub fn has_geometry(&self) -> bool {
        !self.brushes.is_empty() || !self.patches.is_empty()
    }
}

/// Assign model numbers to brush-model entities. Worldspawn is model 0;
/// every other entity with geometry gets the next "*N" model key.
pub fn set_model_numbers(entities: &mut [Entity]) {
    let mut models = 1;
    for (i, entity) in entities.iter_mut().enumerate().skip(1) {
        if !entity.has_geometry() {
            continue;
        }
        entity.model_num = models;
        let value = format!("*{}", models);
        debug!("entity {} is model {}", i, value);
        entity.set_key_value("model", &value);
        models += 1;
    }
}
