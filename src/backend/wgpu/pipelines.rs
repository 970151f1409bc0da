//! Bind group layouts, vertex layouts and render pipelines of the UI pass.

use wgpu::{BindGroupLayout, Device, RenderPipeline, TextureFormat, VertexBufferLayout};

use crate::renderer::device::TEXTURE_SLOTS;
use crate::renderer::vertex::{CircleVertex, GlyphVertex, LineVertex, QuadVertex, ViewUniform};

const SHADER_SOURCE: &str = include_str!("ui_shader.wgsl");

impl QuadVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x4, // position
        1 => Float32x4, // color
        2 => Float32x2, // uv
        3 => Uint32,    // texture_index
    ];

    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

impl CircleVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 5] = [
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: 12,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x2,
        },
        wgpu::VertexAttribute {
            offset: 20,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32,
        },
        wgpu::VertexAttribute {
            offset: 24,
            shader_location: 3,
            format: wgpu::VertexFormat::Float32,
        },
        // offset 28 is padding
        wgpu::VertexAttribute {
            offset: 32,
            shader_location: 4,
            format: wgpu::VertexFormat::Float32x4,
        },
    ];

    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<CircleVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

impl LineVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32,   // width
        2 => Float32x4, // color
    ];

    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

impl GlyphVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x4, // position
        1 => Float32x4, // foreground
        2 => Float32x4, // outline
        3 => Float32x2, // uv
        4 => Uint32,    // texture_index
    ];

    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<GlyphVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

pub fn create_view_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("UI View Bind Group Layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ViewUniform>() as u64),
            },
            count: None,
        }],
    })
}

/// Texture views at bindings `0..TEXTURE_SLOTS`, their samplers at
/// `TEXTURE_SLOTS..2 * TEXTURE_SLOTS`.
pub fn create_texture_layout(device: &Device) -> BindGroupLayout {
    let textures = (0..TEXTURE_SLOTS as u32).map(|binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    });
    let samplers = (0..TEXTURE_SLOTS as u32).map(|slot| wgpu::BindGroupLayoutEntry {
        binding: TEXTURE_SLOTS as u32 + slot,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    });
    let entries: Vec<wgpu::BindGroupLayoutEntry> = textures.chain(samplers).collect();

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("UI Texture Bind Group Layout"),
        entries: &entries,
    })
}

pub struct UiPipelineSet {
    pub quad: RenderPipeline,
    pub circle: RenderPipeline,
    pub line: RenderPipeline,
    pub glyph: RenderPipeline,
}

pub fn create_ui_pipelines(
    device: &Device,
    format: TextureFormat,
    view_layout: &BindGroupLayout,
    texture_layout: &BindGroupLayout,
) -> UiPipelineSet {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("UI Shader"),
        source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
    });

    let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("UI Textured Pipeline Layout"),
        bind_group_layouts: &[view_layout, texture_layout],
        immediate_size: 0,
    });
    let plain_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("UI Pipeline Layout"),
        bind_group_layouts: &[view_layout],
        immediate_size: 0,
    });

    let build = |label: &str,
                 layout: &wgpu::PipelineLayout,
                 entry: (&str, &str),
                 vertex: VertexBufferLayout<'static>,
                 topology: wgpu::PrimitiveTopology| {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(entry.0),
                buffers: &[vertex],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(entry.1),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    };

    use wgpu::PrimitiveTopology::{LineList, TriangleList};
    UiPipelineSet {
        quad: build(
            "UI Quad Pipeline",
            &textured_layout,
            ("vs_quad", "fs_quad"),
            QuadVertex::desc(),
            TriangleList,
        ),
        circle: build(
            "UI Circle Pipeline",
            &plain_layout,
            ("vs_circle", "fs_circle"),
            CircleVertex::desc(),
            TriangleList,
        ),
        // Hardware lines are one pixel wide; the width attribute is carried
        // for backends that expand lines into quads.
        line: build(
            "UI Line Pipeline",
            &plain_layout,
            ("vs_line", "fs_line"),
            LineVertex::desc(),
            LineList,
        ),
        glyph: build(
            "UI Glyph Pipeline",
            &textured_layout,
            ("vs_glyph", "fs_glyph"),
            GlyphVertex::desc(),
            TriangleList,
        ),
    }
}
