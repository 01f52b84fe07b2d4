use ucfb_scene::ModelsBuilder;

/// Where a handler writes an output file, relative to the extraction root.
/// `unmunge-cli` supplies the real filesystem-backed implementation;
/// handlers only depend on this trait so they stay testable without disk
/// access.
pub trait FileSaver: Send + Sync {
    fn save(&self, relative_path: &str, bytes: &[u8]) -> std::io::Result<()>;
}

/// Platform pixel-format decoding, kept behind a trait because the actual
/// bit-twiddling (DXT1/DXT3/PS2 swizzled surfaces, Xbox-specific layouts)
/// is out of scope here; handlers call through it and fall back to a raw
/// dump when it returns `None`.
pub trait ImageCodec: Send + Sync {
    fn decode(&self, format_tag: &str, width: u32, height: u32, body: &[u8]) -> Option<Vec<u8>>;
}

/// Lua 4 bytecode decompilation, out of scope; a handler that can't
/// decompile a script chunk saves the raw bytecode instead.
pub trait LuaDecompiler: Send + Sync {
    fn decompile(&self, bytecode: &[u8]) -> Option<String>;
}

/// Terrain heightmap pixel unpacking, out of scope; `handle_terrain`
/// dumps the raw pixel chunk when this returns `None`.
pub trait TerrainPixelUnpacker: Send + Sync {
    fn unpack_heightmap(&self, raw: &[u8], width: u32, height: u32) -> Option<Vec<f32>>;
}

/// Resolves a hashed name back to a readable string, when the hash
/// dictionary is available; out of scope to load here.
pub trait HashNameDictionary: Send + Sync {
    fn resolve(&self, hash: u32) -> Option<String>;
}

/// No-op collaborators used where a caller has nothing better to supply
/// (e.g. unit tests exercising one handler in isolation).
pub struct NullCollaborators;

impl ImageCodec for NullCollaborators {
    fn decode(&self, _format_tag: &str, _width: u32, _height: u32, _body: &[u8]) -> Option<Vec<u8>> {
        None
    }
}

impl LuaDecompiler for NullCollaborators {
    fn decompile(&self, _bytecode: &[u8]) -> Option<String> {
        None
    }
}

impl TerrainPixelUnpacker for NullCollaborators {
    fn unpack_heightmap(&self, _raw: &[u8], _width: u32, _height: u32) -> Option<Vec<f32>> {
        None
    }
}

impl HashNameDictionary for NullCollaborators {
    fn resolve(&self, _hash: u32) -> Option<String> {
        None
    }
}

/// Everything a handler needs beyond its own chunk's bytes: the shared
/// model accumulator, where to write output files, and the out-of-scope
/// collaborator interfaces.
pub struct HandlerContext<'a> {
    pub models: &'a ModelsBuilder,
    pub saver: &'a dyn FileSaver,
    pub image_codec: &'a dyn ImageCodec,
    pub lua_decompiler: &'a dyn LuaDecompiler,
    pub terrain_unpacker: &'a dyn TerrainPixelUnpacker,
    pub hash_names: &'a dyn HashNameDictionary,
}
