//! Render-graph node that draws the UI over a view's target.

use crate::error::RenderError;
use crate::geometry::Size;
use crate::transform::Transform;

use super::device::{
    BufferDescriptor, BufferHandle, BufferUsages, CommandBuffer, LoadOp, RenderDevice,
    RenderPassDescriptor, RenderTargetHandle, ResourceBinding, ResourceSetDescriptor,
    ResourceSetHandle, ResourceSetLayout,
};
use super::draw_data::DrawData;
use super::draw_pass::{DrawPass, DrawPassStats, UiPipelines, VIEW_SET};
use super::vertex::ViewUniform;

/// Name of the node's single input slot.
pub const VIEW_SLOT: &str = "view";

/// The camera of the view being rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Target size in physical pixels.
    pub viewport: Size,
    pub scale_factor: f32,
    /// The camera's own view uniform, used by scene passes. The UI pass
    /// never binds it.
    pub uniform: Option<BufferHandle>,
}

/// What the scheduler supplies through the `"view"` slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewInput {
    pub view: u64,
    pub camera: Option<Camera>,
    pub target: Option<RenderTargetHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingCamera,
    MissingTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Rendered(DrawPassStats),
    /// The view is not ready yet. Nothing was submitted.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy)]
struct ViewResources {
    buffer: BufferHandle,
    set: ResourceSetHandle,
}

pub struct UiRenderNode {
    draw_pass: DrawPass,
    view_resources: Option<ViewResources>,
}

impl UiRenderNode {
    pub fn new(pipelines: UiPipelines) -> Self {
        Self {
            draw_pass: DrawPass::new(pipelines),
            view_resources: None,
        }
    }

    pub fn input_slots(&self) -> &'static [&'static str] {
        &[VIEW_SLOT]
    }

    /// The node's own view uniform buffer, once created.
    pub fn view_buffer(&self) -> Option<BufferHandle> {
        self.view_resources.map(|r| r.buffer)
    }

    /// Render one frame of `draw_data` into the view's target.
    ///
    /// The pass loads the existing target contents, so the UI lands on top
    /// of whatever the scene passes drew.
    pub fn execute<D: RenderDevice>(
        &mut self,
        device: &mut D,
        view: &ViewInput,
        draw_data: &mut DrawData,
    ) -> Result<FrameStatus, RenderError> {
        let Some(camera) = view.camera else {
            return Ok(self.skip(view, SkipReason::MissingCamera));
        };
        let Some(target) = view.target else {
            return Ok(self.skip(view, SkipReason::MissingTarget));
        };

        match self.render(device, &camera, target, draw_data) {
            Ok(stats) => {
                crate::render_stats::record_frame_rendered(
                    stats.draw_calls,
                    stats.skipped_batches,
                );
                Ok(FrameStatus::Rendered(stats))
            }
            Err(err) => {
                log::error!("UI pass for view {} failed: {}", view.view, err);
                Err(err)
            }
        }
    }

    fn skip(&self, view: &ViewInput, reason: SkipReason) -> FrameStatus {
        log::debug!("Skipping UI pass for view {}: {:?}", view.view, reason);
        crate::render_stats::record_frame_skipped();
        FrameStatus::Skipped(reason)
    }

    fn render<D: RenderDevice>(
        &mut self,
        device: &mut D,
        camera: &Camera,
        target: RenderTargetHandle,
        draw_data: &mut DrawData,
    ) -> Result<DrawPassStats, RenderError> {
        let projection = Transform::ui_projection(
            camera.viewport.width,
            camera.viewport.height,
            camera.scale_factor,
        );
        let uniform = ViewUniform {
            view_projection: projection.to_cols_array(),
        };
        let view = self.ensure_view_resources(device)?;
        device.write_buffer(view.buffer, 0, bytemuck::bytes_of(&uniform))?;

        draw_data.write(device)?;

        let mut commands = device.create_command_buffer("UI Command Buffer");
        let stats = {
            let mut pass = commands.begin_render_pass(&RenderPassDescriptor {
                label: "UI Render Pass",
                target,
                load: LoadOp::Load,
            })?;
            pass.set_resource_set(VIEW_SET, view.set);
            let stats = self.draw_pass.render(pass.as_mut(), draw_data);
            pass.end_pass();
            stats
        };
        commands.commit()?;

        Ok(stats)
    }

    fn ensure_view_resources<D: RenderDevice>(
        &mut self,
        device: &mut D,
    ) -> Result<ViewResources, RenderError> {
        if let Some(resources) = self.view_resources {
            return Ok(resources);
        }

        let buffer = device.create_buffer(&BufferDescriptor {
            label: "UI View Uniform",
            size: std::mem::size_of::<ViewUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        })?;
        let set = device.create_resource_set(&ResourceSetDescriptor {
            label: "UI View",
            layout: ResourceSetLayout::View,
            entries: vec![ResourceBinding::UniformBuffer(buffer)],
        })?;

        let resources = ViewResources { buffer, set };
        self.view_resources = Some(resources);
        Ok(resources)
    }
}
