//! GPU vertex layouts for the four UI primitive kinds.
//!
//! All structs are `#[repr(C)]` and `Pod` so vertex arrays can be uploaded
//! with a single `bytemuck::cast_slice`.

/// Vertex of a solid or textured quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    /// Position after the command's transform, before projection.
    pub position: [f32; 4],
    pub color: [f32; 4],
    pub uv: [f32; 2],
    /// Slot in the batch's texture array. Slot 0 of an untextured quad is
    /// the white texture.
    pub texture_index: u32,
    pub _pad: u32,
}

/// Vertex of an SDF circle quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CircleVertex {
    pub world_position: [f32; 3],
    /// Position in the circle's `[-1, 1]` signed-distance space.
    pub local_position: [f32; 2],
    pub thickness: f32,
    pub fade: f32,
    pub _pad: f32,
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub width: f32,
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlyphVertex {
    pub position: [f32; 4],
    pub foreground: [f32; 4],
    pub outline: [f32; 4],
    pub uv: [f32; 2],
    pub texture_index: u32,
    pub _pad: u32,
}

/// View uniform bound at set 0 by the UI pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ViewUniform {
    /// Column-major view-projection matrix.
    pub view_projection: [f32; 16],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_have_no_implicit_padding() {
        assert_eq!(std::mem::size_of::<QuadVertex>(), 48);
        assert_eq!(std::mem::size_of::<CircleVertex>(), 48);
        assert_eq!(std::mem::size_of::<LineVertex>(), 32);
        assert_eq!(std::mem::size_of::<GlyphVertex>(), 64);
        assert_eq!(std::mem::size_of::<ViewUniform>(), 64);
    }
}
