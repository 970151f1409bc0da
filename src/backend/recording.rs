//! Headless backend that records every device and encoder call.
//!
//! Buffers are plain byte vectors and writes are bounds checked, so what a
//! frame uploads can be inspected exactly. Encoder calls land in the shared
//! log only when their command buffer is committed.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RenderError;
use crate::renderer::device::{
    BufferDescriptor, BufferHandle, BufferUsages, CommandBuffer, IndexFormat, LoadOp,
    PipelineHandle, RenderDevice, RenderPassDescriptor, RenderPassEncoder, RenderTargetHandle,
    ResourceBinding, ResourceSetDescriptor, ResourceSetHandle, ResourceSetLayout, SamplerHandle,
    TextureHandle, TEXTURE_SLOTS,
};
use crate::renderer::draw_pass::UiPipelines;
use crate::texture::Texture;

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateBuffer {
        buffer: BufferHandle,
        size: u64,
        usage: BufferUsages,
    },
    WriteBuffer {
        buffer: BufferHandle,
        offset: u64,
        len: u64,
    },
    CreateResourceSet {
        set: ResourceSetHandle,
        layout: ResourceSetLayout,
        entries: Vec<ResourceBinding>,
    },
    ReleaseResourceSet(ResourceSetHandle),
    BeginRenderPass {
        label: &'static str,
        target: RenderTargetHandle,
        load: LoadOp,
    },
    SetPipeline(PipelineHandle),
    SetVertexBuffer {
        slot: u32,
        buffer: BufferHandle,
        offset: u64,
    },
    SetIndexBuffer {
        buffer: BufferHandle,
        format: IndexFormat,
    },
    SetResourceSet {
        index: u32,
        set: ResourceSetHandle,
    },
    DrawIndexed {
        index_count: u32,
        index_byte_offset: u64,
        instance_count: u32,
    },
    EndPass,
    Commit {
        label: &'static str,
    },
}

pub type CommandLog = Rc<RefCell<Vec<DeviceCommand>>>;

#[derive(Debug, Default)]
pub struct RecordingDevice {
    buffers: Vec<Vec<u8>>,
    resource_sets: Vec<Option<ResourceSetDescriptor>>,
    textures: Vec<(u32, u32)>,
    samplers: u32,
    targets: Vec<(u32, u32)>,
    pipelines: u32,
    log: CommandLog,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the command log.
    pub fn log(&self) -> CommandLog {
        Rc::clone(&self.log)
    }

    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.log.borrow().clone()
    }

    pub fn clear_commands(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn create_sampler(&mut self) -> SamplerHandle {
        self.samplers += 1;
        SamplerHandle(self.samplers - 1)
    }

    /// Register a `width` x `height` texture with a fresh sampler.
    pub fn create_texture(&mut self, width: u32, height: u32) -> Texture {
        self.textures.push((width, height));
        let handle = TextureHandle(self.textures.len() as u32 - 1);
        let sampler = self.create_sampler();
        Texture::new(handle, sampler, width, height)
    }

    pub fn create_render_target(&mut self, width: u32, height: u32) -> RenderTargetHandle {
        self.targets.push((width, height));
        RenderTargetHandle(self.targets.len() as u32 - 1)
    }

    pub fn create_ui_pipelines(&mut self) -> UiPipelines {
        let mut next = || {
            self.pipelines += 1;
            PipelineHandle(self.pipelines - 1)
        };
        UiPipelines {
            quad: next(),
            circle: next(),
            line: next(),
            glyph: next(),
        }
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(buffer.index()).map(|b| b.as_slice())
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn resource_set(&self, set: ResourceSetHandle) -> Option<&ResourceSetDescriptor> {
        self.resource_sets.get(set.index()).and_then(|s| s.as_ref())
    }

    pub fn live_resource_sets(&self) -> usize {
        self.resource_sets.iter().filter(|s| s.is_some()).count()
    }

    fn validate_set(&self, desc: &ResourceSetDescriptor) -> Result<(), RenderError> {
        match desc.layout {
            ResourceSetLayout::Textures if desc.entries.len() > TEXTURE_SLOTS => {
                Err(RenderError::TooManyTextures {
                    count: desc.entries.len(),
                    max: TEXTURE_SLOTS,
                })
            }
            _ => {
                for entry in &desc.entries {
                    match entry {
                        ResourceBinding::UniformBuffer(buffer)
                            if buffer.index() >= self.buffers.len() =>
                        {
                            return Err(RenderError::UnknownResource {
                                kind: "buffer",
                                index: buffer.0,
                            });
                        }
                        ResourceBinding::Texture(texture)
                            if texture.handle.index() >= self.textures.len() =>
                        {
                            return Err(RenderError::UnknownResource {
                                kind: "texture",
                                index: texture.handle.0,
                            });
                        }
                        _ => {}
                    }
                }
                Ok(())
            }
        }
    }
}

impl RenderDevice for RecordingDevice {
    type CommandBuffer = RecordingCommandBuffer;

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> Result<BufferHandle, RenderError> {
        self.buffers.push(vec![0; desc.size as usize]);
        let buffer = BufferHandle(self.buffers.len() as u32 - 1);
        self.log.borrow_mut().push(DeviceCommand::CreateBuffer {
            buffer,
            size: desc.size,
            usage: desc.usage,
        });
        Ok(buffer)
    }

    fn write_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), RenderError> {
        let storage = self
            .buffers
            .get_mut(buffer.index())
            .ok_or(RenderError::UnknownResource {
                kind: "buffer",
                index: buffer.0,
            })?;
        let len = data.len() as u64;
        let size = storage.len() as u64;
        if offset + len > size {
            return Err(RenderError::BufferOverflow { offset, len, size });
        }
        storage[offset as usize..(offset + len) as usize].copy_from_slice(data);
        self.log.borrow_mut().push(DeviceCommand::WriteBuffer {
            buffer,
            offset,
            len,
        });
        Ok(())
    }

    fn create_resource_set(
        &mut self,
        desc: &ResourceSetDescriptor,
    ) -> Result<ResourceSetHandle, RenderError> {
        self.validate_set(desc)?;
        self.resource_sets.push(Some(desc.clone()));
        let set = ResourceSetHandle(self.resource_sets.len() as u32 - 1);
        self.log.borrow_mut().push(DeviceCommand::CreateResourceSet {
            set,
            layout: desc.layout,
            entries: desc.entries.clone(),
        });
        Ok(set)
    }

    fn release_resource_set(&mut self, set: ResourceSetHandle) {
        if let Some(slot) = self.resource_sets.get_mut(set.index()) {
            if slot.take().is_some() {
                self.log
                    .borrow_mut()
                    .push(DeviceCommand::ReleaseResourceSet(set));
            }
        }
    }

    fn create_command_buffer(&mut self, label: &'static str) -> RecordingCommandBuffer {
        RecordingCommandBuffer {
            label,
            target_count: self.targets.len(),
            pending: Vec::new(),
            log: Rc::clone(&self.log),
        }
    }
}

pub struct RecordingCommandBuffer {
    label: &'static str,
    target_count: usize,
    pending: Vec<DeviceCommand>,
    log: CommandLog,
}

impl CommandBuffer for RecordingCommandBuffer {
    fn begin_render_pass(
        &mut self,
        desc: &RenderPassDescriptor,
    ) -> Result<Box<dyn RenderPassEncoder + '_>, RenderError> {
        if desc.target.index() >= self.target_count {
            return Err(RenderError::UnknownResource {
                kind: "render target",
                index: desc.target.0,
            });
        }
        self.pending.push(DeviceCommand::BeginRenderPass {
            label: desc.label,
            target: desc.target,
            load: desc.load,
        });
        Ok(Box::new(RecordingPassEncoder {
            commands: &mut self.pending,
        }))
    }

    fn commit(self) -> Result<(), RenderError> {
        let mut log = self.log.borrow_mut();
        log.extend(self.pending);
        log.push(DeviceCommand::Commit { label: self.label });
        Ok(())
    }
}

struct RecordingPassEncoder<'a> {
    commands: &'a mut Vec<DeviceCommand>,
}

impl RenderPassEncoder for RecordingPassEncoder<'_> {
    fn set_pipeline(&mut self, pipeline: PipelineHandle) {
        self.commands.push(DeviceCommand::SetPipeline(pipeline));
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64) {
        self.commands.push(DeviceCommand::SetVertexBuffer {
            slot,
            buffer,
            offset,
        });
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, format: IndexFormat) {
        self.commands
            .push(DeviceCommand::SetIndexBuffer { buffer, format });
    }

    fn set_resource_set(&mut self, index: u32, set: ResourceSetHandle) {
        self.commands
            .push(DeviceCommand::SetResourceSet { index, set });
    }

    fn draw_indexed(&mut self, index_count: u32, index_byte_offset: u64, instance_count: u32) {
        self.commands.push(DeviceCommand::DrawIndexed {
            index_count,
            index_byte_offset,
            instance_count,
        });
    }

    fn end_pass(self: Box<Self>) {
        self.commands.push(DeviceCommand::EndPass);
    }
}
