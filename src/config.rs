use crate::error::RenderError;
use crate::renderer::device::TEXTURE_SLOTS;

/// Tunables for the draw pipeline.
///
/// Build with [`RendererConfig::default`] and override fields with the
/// builder methods, then call [`RendererConfig::validate`] before handing it
/// to [`DrawData`](crate::renderer::DrawData).
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Texture slots available to one draw call (size of the sampler array).
    pub max_textures_per_batch: usize,
    /// Line segments used to flatten each Bezier curve.
    pub curve_segments: u32,
    /// Line width in effect before the first `SetLineWidth` command of a frame.
    pub default_line_width: f32,
    /// Initial GPU buffer capacity, in vertices. Buffers grow by doubling.
    pub initial_buffer_capacity: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_textures_per_batch: 16,
            curve_segments: 16,
            default_line_width: 1.0,
            initial_buffer_capacity: 256,
        }
    }
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_textures_per_batch(mut self, slots: usize) -> Self {
        self.max_textures_per_batch = slots;
        self
    }

    pub fn curve_segments(mut self, segments: u32) -> Self {
        self.curve_segments = segments;
        self
    }

    pub fn default_line_width(mut self, width: f32) -> Self {
        self.default_line_width = width;
        self
    }

    pub fn initial_buffer_capacity(mut self, vertices: usize) -> Self {
        self.initial_buffer_capacity = vertices;
        self
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.max_textures_per_batch == 0 {
            return Err(RenderError::InvalidConfig(
                "max_textures_per_batch must be at least 1".to_string(),
            ));
        }
        if self.max_textures_per_batch > TEXTURE_SLOTS {
            return Err(RenderError::UnsupportedTextureSlots {
                requested: self.max_textures_per_batch,
                max: TEXTURE_SLOTS,
            });
        }
        if self.curve_segments == 0 {
            return Err(RenderError::InvalidConfig(
                "curve_segments must be at least 1".to_string(),
            ));
        }
        if !(self.default_line_width.is_finite() && self.default_line_width > 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "default_line_width must be positive, got {}",
                self.default_line_width
            )));
        }
        Ok(())
    }
}
