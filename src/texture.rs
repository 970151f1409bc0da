//! Textures as seen by the draw pipeline: a backend image plus the sampler it
//! is read with and the sub-rectangle that is visible.

use crate::renderer::device::{SamplerHandle, TextureHandle};

/// Normalized texture-coordinate rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl UvRect {
    pub const FULL: UvRect = UvRect {
        min: [0.0, 0.0],
        max: [1.0, 1.0],
    };

    pub const fn new(min: [f32; 2], max: [f32; 2]) -> Self {
        Self { min, max }
    }

    /// Corners in quad order: min, (max x, min y), max, (min x, max y).
    pub fn corners(&self) -> [[f32; 2]; 4] {
        [
            [self.min[0], self.min[1]],
            [self.max[0], self.min[1]],
            [self.max[0], self.max[1]],
            [self.min[0], self.max[1]],
        ]
    }
}

impl Default for UvRect {
    fn default() -> Self {
        Self::FULL
    }
}

/// What a texture slot actually binds. Two textures with the same binding
/// share a slot even when their visible regions differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureBinding {
    pub texture: TextureHandle,
    pub sampler: SamplerHandle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Texture {
    pub handle: TextureHandle,
    pub sampler: SamplerHandle,
    pub width: u32,
    pub height: u32,
    pub uv: UvRect,
}

impl Texture {
    pub fn new(handle: TextureHandle, sampler: SamplerHandle, width: u32, height: u32) -> Self {
        Self {
            handle,
            sampler,
            width,
            height,
            uv: UvRect::FULL,
        }
    }

    /// The same image restricted to `uv`, e.g. one cell of an atlas.
    pub fn sub_texture(&self, uv: UvRect) -> Self {
        Self { uv, ..*self }
    }

    pub fn binding(&self) -> TextureBinding {
        TextureBinding {
            texture: self.handle,
            sampler: self.sampler,
        }
    }

    pub fn texture_coordinates(&self) -> [[f32; 2]; 4] {
        self.uv.corners()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_coordinates() {
        let texture = Texture::new(TextureHandle(1), SamplerHandle(0), 8, 8);
        assert_eq!(
            texture.texture_coordinates(),
            [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
        );
    }

    #[test]
    fn test_sub_texture_shares_binding() {
        let atlas = Texture::new(TextureHandle(4), SamplerHandle(1), 256, 256);
        let cell = atlas.sub_texture(UvRect::new([0.0, 0.0], [0.25, 0.25]));
        assert_eq!(atlas.binding(), cell.binding());
        assert_ne!(atlas, cell);
    }
}
