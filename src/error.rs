use thiserror::Error;

/// Fatal compile failures. Everything recoverable (degenerate windings,
/// non-fatal leaks, unassigned areas) is signalled with sentinel values
/// instead; see the flood and filter modules.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("plane table capacity exceeded ({0} planes)")]
    TooManyPlanes(usize),

    #[error("draw surface capacity exceeded ({0} surfaces)")]
    TooManySurfaces(usize),

    #[error("winding exceeded {0} points while splitting")]
    WindingOverflow(usize),

    #[error("bsp tree exceeded maximum depth {0}")]
    TreeTooDeep(usize),

    #[error("map leaked and the leak-fatal option is set")]
    MapLeaked,

    #[error("entity {0} has no structural geometry")]
    NoStructuralGeometry(usize),
}
