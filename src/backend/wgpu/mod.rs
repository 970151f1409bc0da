//! wgpu implementation of the device abstraction.
//!
//! Handles index into resource tables shared between the device and the
//! command buffers it creates, so a pass encoder can resolve pipelines,
//! buffers and bind groups without borrowing the device.

mod pipelines;

pub use pipelines::{create_texture_layout, create_view_layout};

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use wgpu::{Device, Queue, TextureFormat, TextureView};

use crate::error::RenderError;
use crate::renderer::device::{
    BufferDescriptor, BufferHandle, BufferUsages, CommandBuffer, IndexFormat, LoadOp,
    PipelineHandle, RenderDevice, RenderPassDescriptor, RenderPassEncoder, RenderTargetHandle,
    ResourceBinding, ResourceSetDescriptor, ResourceSetHandle, ResourceSetLayout, SamplerHandle,
    TextureHandle, TEXTURE_SLOTS,
};
use crate::renderer::draw_pass::UiPipelines;
use crate::texture::Texture;

#[derive(Default)]
struct ResourceTables {
    buffers: Vec<wgpu::Buffer>,
    textures: Vec<TextureView>,
    samplers: Vec<wgpu::Sampler>,
    targets: Vec<TextureView>,
    pipelines: Vec<wgpu::RenderPipeline>,
    bind_groups: Vec<Option<wgpu::BindGroup>>,
}

fn unknown(kind: &'static str, index: u32) -> RenderError {
    RenderError::UnknownResource { kind, index }
}

pub struct WgpuDevice {
    device: Arc<Device>,
    queue: Arc<Queue>,
    tables: Rc<RefCell<ResourceTables>>,
    view_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    white: Texture,
}

impl WgpuDevice {
    /// Create a headless device on the first adapter wgpu offers.
    pub fn new() -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| RenderError::Backend(format!("no GPU adapter: {e}")))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Strata Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| RenderError::Backend(format!("device request failed: {e}")))?;

        log::info!("Using adapter {:?}", adapter.get_info().name);
        Ok(Self::from_parts(Arc::new(device), Arc::new(queue)))
    }

    /// Wrap a device and queue owned by the host application.
    pub fn from_parts(device: Arc<Device>, queue: Arc<Queue>) -> Self {
        let view_layout = create_view_layout(&device);
        let texture_layout = create_texture_layout(&device);

        let mut this = Self {
            device,
            queue,
            tables: Rc::new(RefCell::new(ResourceTables::default())),
            view_layout,
            texture_layout,
            white: Texture::new(TextureHandle(0), SamplerHandle(0), 1, 1),
        };
        this.white = this.create_texture_rgba(1, 1, &[255, 255, 255, 255]);
        this
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    pub fn create_sampler(&mut self) -> SamplerHandle {
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("UI Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });
        let mut tables = self.tables.borrow_mut();
        tables.samplers.push(sampler);
        SamplerHandle(tables.samplers.len() as u32 - 1)
    }

    /// Register an existing texture view, e.g. a glyph atlas page.
    pub fn register_texture(&mut self, view: TextureView, width: u32, height: u32) -> Texture {
        let handle = {
            let mut tables = self.tables.borrow_mut();
            tables.textures.push(view);
            TextureHandle(tables.textures.len() as u32 - 1)
        };
        let sampler = self.create_sampler();
        Texture::new(handle, sampler, width, height)
    }

    /// Upload tightly packed RGBA8 pixels into a new texture.
    pub fn create_texture_rgba(&mut self, width: u32, height: u32, rgba: &[u8]) -> Texture {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("UI Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.register_texture(view, width, height)
    }

    pub fn register_target(&mut self, view: TextureView) -> RenderTargetHandle {
        let mut tables = self.tables.borrow_mut();
        tables.targets.push(view);
        RenderTargetHandle(tables.targets.len() as u32 - 1)
    }

    /// Point `target` at a new view, e.g. this frame's swapchain texture.
    pub fn set_target(
        &mut self,
        target: RenderTargetHandle,
        view: TextureView,
    ) -> Result<(), RenderError> {
        let mut tables = self.tables.borrow_mut();
        let slot = tables
            .targets
            .get_mut(target.index())
            .ok_or_else(|| unknown("render target", target.0))?;
        *slot = view;
        Ok(())
    }

    /// Build the four UI pipelines for targets of `format`.
    pub fn create_ui_pipelines(&mut self, format: TextureFormat) -> UiPipelines {
        let set = pipelines::create_ui_pipelines(
            &self.device,
            format,
            &self.view_layout,
            &self.texture_layout,
        );
        let mut tables = self.tables.borrow_mut();
        let mut add = |pipeline: wgpu::RenderPipeline| {
            tables.pipelines.push(pipeline);
            PipelineHandle(tables.pipelines.len() as u32 - 1)
        };
        UiPipelines {
            quad: add(set.quad),
            circle: add(set.circle),
            line: add(set.line),
            glyph: add(set.glyph),
        }
    }

    fn texture_bind_group(
        &self,
        tables: &ResourceTables,
        desc: &ResourceSetDescriptor,
    ) -> Result<wgpu::BindGroup, RenderError> {
        if desc.entries.len() > TEXTURE_SLOTS {
            return Err(RenderError::TooManyTextures {
                count: desc.entries.len(),
                max: TEXTURE_SLOTS,
            });
        }

        let mut views = Vec::with_capacity(TEXTURE_SLOTS);
        let mut samplers = Vec::with_capacity(TEXTURE_SLOTS);
        for slot in 0..TEXTURE_SLOTS {
            let texture = match desc.entries.get(slot) {
                Some(ResourceBinding::Texture(texture)) => *texture,
                Some(ResourceBinding::WhiteTexture) | None => self.white,
                Some(ResourceBinding::UniformBuffer(_)) => {
                    return Err(RenderError::Backend(format!(
                        "{}: uniform buffer in texture slot {}",
                        desc.label, slot
                    )));
                }
            };
            views.push(
                tables
                    .textures
                    .get(texture.handle.index())
                    .ok_or_else(|| unknown("texture", texture.handle.0))?,
            );
            samplers.push(
                tables
                    .samplers
                    .get(texture.sampler.index())
                    .ok_or_else(|| unknown("sampler", texture.sampler.0))?,
            );
        }

        let entries: Vec<wgpu::BindGroupEntry> = views
            .iter()
            .enumerate()
            .map(|(slot, view)| wgpu::BindGroupEntry {
                binding: slot as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .chain(samplers.iter().enumerate().map(|(slot, sampler)| {
                wgpu::BindGroupEntry {
                    binding: (TEXTURE_SLOTS + slot) as u32,
                    resource: wgpu::BindingResource::Sampler(sampler),
                }
            }))
            .collect();

        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(desc.label),
            layout: &self.texture_layout,
            entries: &entries,
        }))
    }

    fn view_bind_group(
        &self,
        tables: &ResourceTables,
        desc: &ResourceSetDescriptor,
    ) -> Result<wgpu::BindGroup, RenderError> {
        let Some(ResourceBinding::UniformBuffer(handle)) = desc.entries.first() else {
            return Err(RenderError::Backend(format!(
                "{}: view set needs a uniform buffer",
                desc.label
            )));
        };
        let buffer = tables
            .buffers
            .get(handle.index())
            .ok_or_else(|| unknown("buffer", handle.0))?;

        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(desc.label),
            layout: &self.view_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        }))
    }
}

fn to_wgpu_usages(usage: BufferUsages) -> wgpu::BufferUsages {
    let mut out = wgpu::BufferUsages::empty();
    if usage.contains(BufferUsages::VERTEX) {
        out |= wgpu::BufferUsages::VERTEX;
    }
    if usage.contains(BufferUsages::INDEX) {
        out |= wgpu::BufferUsages::INDEX;
    }
    if usage.contains(BufferUsages::UNIFORM) {
        out |= wgpu::BufferUsages::UNIFORM;
    }
    if usage.contains(BufferUsages::COPY_DST) {
        out |= wgpu::BufferUsages::COPY_DST;
    }
    out
}

fn to_wgpu_index_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
        IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
    }
}

impl RenderDevice for WgpuDevice {
    type CommandBuffer = WgpuCommandBuffer;

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> Result<BufferHandle, RenderError> {
        // wgpu copies must be 4-byte aligned
        let size = desc.size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size,
            usage: to_wgpu_usages(desc.usage),
            mapped_at_creation: false,
        });
        let mut tables = self.tables.borrow_mut();
        tables.buffers.push(buffer);
        Ok(BufferHandle(tables.buffers.len() as u32 - 1))
    }

    fn write_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), RenderError> {
        let tables = self.tables.borrow();
        let target = tables
            .buffers
            .get(buffer.index())
            .ok_or_else(|| unknown("buffer", buffer.0))?;
        let len = data.len() as u64;
        let size = target.size();
        if offset + len > size {
            return Err(RenderError::BufferOverflow { offset, len, size });
        }
        self.queue.write_buffer(target, offset, data);
        Ok(())
    }

    fn create_resource_set(
        &mut self,
        desc: &ResourceSetDescriptor,
    ) -> Result<ResourceSetHandle, RenderError> {
        let bind_group = {
            let tables = self.tables.borrow();
            match desc.layout {
                ResourceSetLayout::View => self.view_bind_group(&tables, desc)?,
                ResourceSetLayout::Textures => self.texture_bind_group(&tables, desc)?,
            }
        };

        let mut tables = self.tables.borrow_mut();
        // Reuse a released slot before growing the table.
        let index = match tables.bind_groups.iter().position(Option::is_none) {
            Some(index) => {
                tables.bind_groups[index] = Some(bind_group);
                index
            }
            None => {
                tables.bind_groups.push(Some(bind_group));
                tables.bind_groups.len() - 1
            }
        };
        Ok(ResourceSetHandle(index as u32))
    }

    fn release_resource_set(&mut self, set: ResourceSetHandle) {
        if let Some(slot) = self.tables.borrow_mut().bind_groups.get_mut(set.index()) {
            *slot = None;
        }
    }

    fn create_command_buffer(&mut self, label: &'static str) -> WgpuCommandBuffer {
        WgpuCommandBuffer {
            encoder: self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) }),
            queue: Arc::clone(&self.queue),
            tables: Rc::clone(&self.tables),
        }
    }
}

pub struct WgpuCommandBuffer {
    encoder: wgpu::CommandEncoder,
    queue: Arc<Queue>,
    tables: Rc<RefCell<ResourceTables>>,
}

impl CommandBuffer for WgpuCommandBuffer {
    fn begin_render_pass(
        &mut self,
        desc: &RenderPassDescriptor,
    ) -> Result<Box<dyn RenderPassEncoder + '_>, RenderError> {
        let view = self
            .tables
            .borrow()
            .targets
            .get(desc.target.index())
            .cloned()
            .ok_or_else(|| unknown("render target", desc.target.0))?;

        let load = match desc.load {
            LoadOp::Load => wgpu::LoadOp::Load,
            LoadOp::Clear(color) => wgpu::LoadOp::Clear(wgpu::Color {
                r: color.r as f64,
                g: color.g as f64,
                b: color.b as f64,
                a: color.a as f64,
            }),
        };

        let pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(desc.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        Ok(Box::new(WgpuPassEncoder {
            pass,
            tables: Rc::clone(&self.tables),
            index_format: IndexFormat::Uint32,
        }))
    }

    fn commit(self) -> Result<(), RenderError> {
        self.queue.submit(std::iter::once(self.encoder.finish()));
        Ok(())
    }
}

struct WgpuPassEncoder<'a> {
    pass: wgpu::RenderPass<'a>,
    tables: Rc<RefCell<ResourceTables>>,
    index_format: IndexFormat,
}

impl RenderPassEncoder for WgpuPassEncoder<'_> {
    fn set_pipeline(&mut self, pipeline: PipelineHandle) {
        match self.tables.borrow().pipelines.get(pipeline.index()) {
            Some(p) => self.pass.set_pipeline(p),
            None => log::warn!("Unknown pipeline {}", pipeline.0),
        }
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64) {
        match self.tables.borrow().buffers.get(buffer.index()) {
            Some(b) => self.pass.set_vertex_buffer(slot, b.slice(offset..)),
            None => log::warn!("Unknown vertex buffer {}", buffer.0),
        }
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, format: IndexFormat) {
        match self.tables.borrow().buffers.get(buffer.index()) {
            Some(b) => {
                self.pass
                    .set_index_buffer(b.slice(..), to_wgpu_index_format(format));
                self.index_format = format;
            }
            None => log::warn!("Unknown index buffer {}", buffer.0),
        }
    }

    fn set_resource_set(&mut self, index: u32, set: ResourceSetHandle) {
        match self.tables.borrow().bind_groups.get(set.index()) {
            Some(Some(group)) => self.pass.set_bind_group(index, group, &[]),
            _ => log::warn!("Unknown or released resource set {}", set.0),
        }
    }

    fn draw_indexed(&mut self, index_count: u32, index_byte_offset: u64, instance_count: u32) {
        let first = (index_byte_offset / self.index_format.byte_size()) as u32;
        self.pass
            .draw_indexed(first..first + index_count, 0, 0..instance_count);
    }

    fn end_pass(self: Box<Self>) {
        drop(self.pass);
    }
}
