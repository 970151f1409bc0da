//! Backend abstraction consumed by the draw pipeline.
//!
//! Resources are referred to by small typed handles. A backend resolves each
//! handle once, at creation time, into its own table entry, so nothing on the
//! per-draw-call path needs to inspect a resource's concrete type.

use bitflags::bitflags;

use crate::color::Color;
use crate::error::RenderError;
use crate::texture::Texture;

macro_rules! resource_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

/// Texture slots of one texture resource set on the shipped backends.
pub const TEXTURE_SLOTS: usize = 16;

resource_handle!(BufferHandle);
resource_handle!(TextureHandle);
resource_handle!(SamplerHandle);
resource_handle!(PipelineHandle);
resource_handle!(
    /// A bound group of resources (uniforms or textures) for one bind index.
    ResourceSetHandle
);
resource_handle!(RenderTargetHandle);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsages: u8 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const COPY_DST = 1 << 3;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BufferDescriptor {
    pub label: &'static str,
    pub size: u64,
    pub usage: BufferUsages,
}

/// Layout a resource set is created against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceSetLayout {
    /// The view-projection uniform.
    View,
    /// A fixed-size array of texture + sampler slots.
    Textures,
}

/// One entry of a resource set. A closed set of variants so backends resolve
/// it with a match, never a downcast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResourceBinding {
    UniformBuffer(BufferHandle),
    Texture(Texture),
    /// The backend's 1x1 white texture, used for untextured primitives and
    /// unused slots.
    WhiteTexture,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSetDescriptor {
    pub label: &'static str,
    pub layout: ResourceSetLayout,
    pub entries: Vec<ResourceBinding>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp {
    /// Keep what is already in the target.
    Load,
    Clear(Color),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDescriptor {
    pub label: &'static str,
    pub target: RenderTargetHandle,
    pub load: LoadOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    /// Size of one index element in bytes.
    pub fn byte_size(self) -> u64 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// Owns GPU resources and hands out command buffers.
///
/// Implementations are tied to the thread that owns the device queue; the
/// pipeline only calls them from the frame's submission step.
pub trait RenderDevice {
    type CommandBuffer: CommandBuffer;

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> Result<BufferHandle, RenderError>;

    fn write_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), RenderError>;

    fn create_resource_set(
        &mut self,
        desc: &ResourceSetDescriptor,
    ) -> Result<ResourceSetHandle, RenderError>;

    /// Drop a resource set. Unknown handles are ignored.
    fn release_resource_set(&mut self, set: ResourceSetHandle);

    fn create_command_buffer(&mut self, label: &'static str) -> Self::CommandBuffer;
}

pub trait CommandBuffer {
    fn begin_render_pass(
        &mut self,
        desc: &RenderPassDescriptor,
    ) -> Result<Box<dyn RenderPassEncoder + '_>, RenderError>;

    /// Submit everything recorded so far.
    fn commit(self) -> Result<(), RenderError>;
}

pub trait RenderPassEncoder {
    fn set_pipeline(&mut self, pipeline: PipelineHandle);

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64);

    fn set_index_buffer(&mut self, buffer: BufferHandle, format: IndexFormat);

    fn set_resource_set(&mut self, index: u32, set: ResourceSetHandle);

    /// Draw `index_count` indices starting `index_byte_offset` bytes into the
    /// bound index buffer.
    fn draw_indexed(&mut self, index_count: u32, index_byte_offset: u64, instance_count: u32);

    fn end_pass(self: Box<Self>);
}
