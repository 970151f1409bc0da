//! Implementations of [`RenderDevice`](crate::renderer::RenderDevice).

pub mod recording;
#[cfg(feature = "wgpu-backend")]
pub mod wgpu;

pub use recording::{DeviceCommand, RecordingDevice};
#[cfg(feature = "wgpu-backend")]
pub use self::wgpu::WgpuDevice;
