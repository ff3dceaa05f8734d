use bitflags::bitflags;

/// Content classification a shader imparts to the brushes that use it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContentFlags(u32);

bitflags! {
    impl ContentFlags : u32 {
        /// Blocks movement and sight.
        const Solid      = 0x00000001;
        /// Translucent contents; surfaces behind it stay visible.
        const Translucent = 0x00000002;
        /// Brush never splits structural space.
        const Detail     = 0x00000004;
        /// Brush separates two runtime areas.
        const AreaPortal = 0x00000008;
        /// Brush only anchors a rotating model's origin.
        const Origin     = 0x00000010;
    }
}

/// Per-surface properties a shader imparts to the sides that use it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceFlags(u32);

bitflags! {
    impl SurfaceFlags : u32 {
        /// Side is never emitted as a draw surface.
        const NoDraw = 0x00000001;
        /// Side's plane is a privileged splitter for the tree builder.
        const Hint   = 0x00000002;
        /// Side is ignored entirely by the tree builder.
        const Skip   = 0x00000004;
        /// Sky surface; emitted but never treated as open space boundary.
        const Sky    = 0x00000008;
    }
}

/// What the material system tells the compiler about one shader. This is
/// the whole boundary to the (external) shader table: name in, flags out.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderInfo {
    pub name: String,
    pub contents: ContentFlags,
    pub surface: SurfaceFlags,
}

impl ShaderInfo {
    pub fn opaque(&self) -> bool {
        self.contents.contains(ContentFlags::Solid)
            && !self.contents.contains(ContentFlags::Translucent)
    }
}

// Compiler-reserved shaders. Real material files extend this set; these are
// the ones the core algorithms give meaning to.
static BUILTIN_SHADERS: phf::Map<&'static str, (u32, u32)> = phf::phf_map! {
    "textures/common/caulk"      => (0x00000001, 0x00000001),              // solid, nodraw
    "textures/common/nodraw"     => (0x00000002, 0x00000001),              // translucent, nodraw
    "textures/common/hint"       => (0x00000002, 0x00000002),              // translucent, hint
    "textures/common/skip"       => (0x00000002, 0x00000004),              // translucent, skip
    "textures/common/areaportal" => (0x00000002 | 0x00000008, 0x00000001), // areaportal
    "textures/common/origin"     => (0x00000010, 0x00000001),              // origin
    "textures/common/clip"       => (0x00000002, 0x00000001),              // nonsolid, nodraw
    "textures/skies/sky"         => (0x00000001, 0x00000008),              // solid sky
};

/// Shader lookup handle. Unknown names resolve to plain structural solid,
/// which is what an unlisted wall texture means to the compiler.
pub struct ShaderTable;

impl ShaderTable {
    pub fn info_for(name: &str) -> ShaderInfo {
        match BUILTIN_SHADERS.get(name) {
            Some(&(contents, surface)) => ShaderInfo {
                name: name.to_string(),
                contents: ContentFlags::from_bits_retain(contents),
                surface: SurfaceFlags::from_bits_retain(surface),
            },
            None => ShaderInfo {
                name: name.to_string(),
                contents: ContentFlags::Solid,
                surface: SurfaceFlags::empty(),
            },
        }
    }
}
