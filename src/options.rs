use crate::math::{DIST_EPSILON, NORMAL_EPSILON};

/// How detail brushes participate in the compile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DetailMode {
    /// Detail brushes are filtered into the finished tree but never split
    /// structural space.
    Normal,
    /// Detail brushes are dropped entirely.
    Ignore,
    /// Detail brushes are promoted to structural.
    Promote,
}

/// Weights for the split-plane selection heuristic. The exact coefficients
/// are tuning knobs; determinism comes from the stable tie-break, not from
/// any particular values here.
#[derive(Clone, Copy, Debug)]
pub struct SplitWeights {
    pub facing_bonus: i32,
    pub split_penalty: i32,
    pub balance_penalty: i32,
    pub axial_bonus: i32,
    pub hint_bonus: i32,
}

impl Default for SplitWeights {
    fn default() -> Self {
        SplitWeights {
            facing_bonus: 5,
            split_penalty: 5,
            balance_penalty: 1,
            axial_bonus: 5,
            hint_bonus: 100_000,
        }
    }
}

/// Configuration recognized by the compiler core. The surrounding driver
/// owns argument parsing; this struct is the whole contract.
#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// Plane-normal matching epsilon for the plane table.
    pub normal_epsilon: f32,
    /// Plane-distance matching epsilon for the plane table.
    pub distance_epsilon: f32,
    /// Detail brush inclusion mode.
    pub detail_mode: DetailMode,
    /// Abort the whole compile on any leak.
    pub leak_fatal: bool,
    /// Downgrade a leak to a warning and carry on as if enclosed.
    pub ignore_leaks: bool,
    /// Alternate split weighting favoring large centered faces, which
    /// shortens average traversal depth at some cost in tree size.
    pub alternate_split_weights: bool,
    /// Allow much deeper trees before the depth guard trips.
    pub deep_bsp: bool,
    /// Split oversized face windings before emission.
    pub max_area_face_surfaces: bool,
    /// Treat area-portal brushes as area boundaries during area flooding.
    pub recognize_areaportals: bool,
    /// World-tree block partitioning size per axis; 0 disables an axis.
    pub block_size: [i32; 3],
    /// Split-plane scoring weights.
    pub split_weights: SplitWeights,

    // Capacity ceilings. Containers grow dynamically, but crossing one of
    // these is the fatal exceeded error rather than silent unbounded growth.
    pub max_planes: usize,
    pub max_draw_surfaces: usize,
    pub max_tree_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            normal_epsilon: NORMAL_EPSILON,
            distance_epsilon: DIST_EPSILON,
            detail_mode: DetailMode::Normal,
            leak_fatal: false,
            ignore_leaks: false,
            alternate_split_weights: false,
            deep_bsp: false,
            max_area_face_surfaces: false,
            recognize_areaportals: true,
            block_size: [1024, 1024, 1024],
            split_weights: SplitWeights::default(),
            max_planes: 0x40000,
            max_draw_surfaces: 0x20000,
            max_tree_depth: 1024,
        }
    }
}

impl CompileOptions {
    /// Effective recursion ceiling for tree construction.
    pub fn tree_depth_limit(&self) -> usize {
        if self.deep_bsp {
            self.max_tree_depth * 4
        } else {
            self.max_tree_depth
        }
    }
}
