use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Invalid renderer config: {0}")]
    InvalidConfig(String),
    #[error("Unknown {kind} handle: {index}")]
    UnknownResource { kind: &'static str, index: u32 },
    #[error("Buffer write out of bounds: offset {offset} + {len} bytes exceeds size {size}")]
    BufferOverflow { offset: u64, len: u64, size: u64 },
    #[error("Resource set binds {count} textures, at most {max} are supported")]
    TooManyTextures { count: usize, max: usize },
    #[error("{requested} texture slots per batch requested, backends bind at most {max}")]
    UnsupportedTextureSlots { requested: usize, max: usize },
    #[error("Parenting layer {child} under layer {parent} would form a cycle")]
    LayerCycle { child: u32, parent: u32 },
    #[error("Backend error: {0}")]
    Backend(String),
}
