//! Retained-mode UI draw pipeline.
//!
//! Views record drawing into a [`GraphicsContext`](renderer::GraphicsContext);
//! layers cache what they recorded until invalidated; the recorded commands
//! are tessellated, batched by texture and submitted as one UI pass per view.

pub mod backend;
pub mod color;
pub mod config;
pub mod environment;
pub mod error;
pub mod geometry;
pub mod path;
pub mod render_stats;
pub mod renderer;
pub mod text;
pub mod texture;
pub mod transform;

pub mod prelude {
    pub use crate::backend::RecordingDevice;
    #[cfg(feature = "wgpu-backend")]
    pub use crate::backend::WgpuDevice;
    pub use crate::color::Color;
    pub use crate::config::RendererConfig;
    pub use crate::environment::EnvironmentValues;
    pub use crate::error::RenderError;
    pub use crate::geometry::{Point, Rect, Size};
    pub use crate::path::{Path, PathElement};
    pub use crate::renderer::{
        Camera, DrawCommand, DrawData, Drawable, FrameStatus, GraphicsContext, LayerFlags,
        LayerHandle, LayerTree, RenderDevice, UiRenderNode, ViewInput,
    };
    pub use crate::text::{Glyph, GlyphBounds, TextLayout, TextLine, TextRun};
    pub use crate::texture::{Texture, UvRect};
    pub use crate::transform::Transform;
}
