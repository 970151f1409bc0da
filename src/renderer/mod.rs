//! The draw pipeline: recording, layer caching, tessellation, batching and
//! submission.
//!
//! A frame flows through the stages in order:
//! - [`GraphicsContext`] records [`DrawCommand`]s, optionally through
//!   cached [`LayerTree`] layers.
//! - [`DrawData::record`] tessellates the commands into per-kind vertex and
//!   index buffers and groups textured primitives into batches.
//! - [`UiRenderNode::execute`] uploads the frame and issues one draw call per
//!   batch through a [`RenderDevice`].

pub mod commands;
pub mod context;
pub mod device;
pub mod draw_data;
pub mod draw_pass;
pub mod layer;
pub mod render_node;
pub mod tessellator;
pub mod vertex;

pub use commands::{CommandQueue, DrawCommand};
pub use context::{Drawable, GraphicsContext, DEFAULT_CIRCLE_FADE};
pub use device::{
    BufferHandle, CommandBuffer, PipelineHandle, RenderDevice, RenderPassEncoder,
    RenderTargetHandle, ResourceSetHandle, SamplerHandle, TextureHandle,
};
pub use draw_data::{Batch, DrawData, PrimitiveBuffer, PrimitiveKind};
pub use draw_pass::{DrawPass, DrawPassStats, UiPipelines};
pub use layer::{LayerFlags, LayerHandle, LayerId, LayerIdAllocator, LayerTree};
pub use render_node::{Camera, FrameStatus, SkipReason, UiRenderNode, ViewInput, VIEW_SLOT};
pub use tessellator::{PathGeometry, Tessellator};
pub use vertex::{CircleVertex, GlyphVertex, LineVertex, QuadVertex, ViewUniform};
