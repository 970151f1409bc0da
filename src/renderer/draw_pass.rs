//! Submission of batched UI geometry into an open render pass.

use super::device::{IndexFormat, PipelineHandle, RenderPassEncoder};
use super::draw_data::{DrawData, PrimitiveBuffer, PrimitiveKind};

/// Resource set index of the view uniform.
pub const VIEW_SET: u32 = 0;
/// Resource set index of a batch's texture group.
pub const TEXTURE_SET: u32 = 1;

/// Index element type of every UI index buffer.
pub const UI_INDEX_FORMAT: IndexFormat = IndexFormat::Uint32;

/// One pipeline per primitive kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiPipelines {
    pub quad: PipelineHandle,
    pub circle: PipelineHandle,
    pub line: PipelineHandle,
    pub glyph: PipelineHandle,
}

impl UiPipelines {
    pub fn get(&self, kind: PrimitiveKind) -> PipelineHandle {
        match kind {
            PrimitiveKind::Quad => self.quad,
            PrimitiveKind::Circle => self.circle,
            PrimitiveKind::Line => self.line,
            PrimitiveKind::Glyph => self.glyph,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawPassStats {
    pub draw_calls: u32,
    pub skipped_batches: u32,
}

/// Records draw calls for a frame's [`DrawData`].
#[derive(Debug, Clone)]
pub struct DrawPass {
    pipelines: UiPipelines,
}

impl DrawPass {
    pub fn new(pipelines: UiPipelines) -> Self {
        Self { pipelines }
    }

    pub fn pipelines(&self) -> &UiPipelines {
        &self.pipelines
    }

    /// Draw every non-empty kind, quads first and glyphs last.
    ///
    /// The caller has already bound the view resource set. `draw_data` must
    /// have been written to the device this frame.
    pub fn render(&self, pass: &mut dyn RenderPassEncoder, draw_data: &DrawData) -> DrawPassStats {
        let mut stats = DrawPassStats::default();
        self.render_kind(pass, &draw_data.quads, &mut stats);
        self.render_kind(pass, &draw_data.circles, &mut stats);
        self.render_kind(pass, &draw_data.lines, &mut stats);
        self.render_kind(pass, &draw_data.glyphs, &mut stats);
        stats
    }

    fn render_kind<V>(
        &self,
        pass: &mut dyn RenderPassEncoder,
        buffer: &PrimitiveBuffer<V>,
        stats: &mut DrawPassStats,
    ) where
        V: bytemuck::Pod,
    {
        if buffer.is_empty() {
            return;
        }
        let kind = buffer.kind();
        let (Some(vertex_buffer), Some(index_buffer)) = (buffer.vertex_buffer(), buffer.index_buffer())
        else {
            log::warn!("{} recorded but never written, skipping", kind.label());
            stats.skipped_batches += buffer.batches().len() as u32;
            return;
        };

        pass.set_pipeline(self.pipelines.get(kind));
        pass.set_vertex_buffer(0, vertex_buffer, 0);
        pass.set_index_buffer(index_buffer, UI_INDEX_FORMAT);

        for batch in buffer.batches() {
            if kind.is_textured() {
                match buffer.resource_sets().get(batch.texture_index as usize) {
                    Some(set) => pass.set_resource_set(TEXTURE_SET, *set),
                    None => {
                        log::warn!(
                            "{} batch at index {} references texture group {} of {}, skipping",
                            kind.label(),
                            batch.index_offset,
                            batch.texture_index,
                            buffer.resource_sets().len()
                        );
                        stats.skipped_batches += 1;
                        continue;
                    }
                }
            }

            let byte_offset = batch.index_offset as u64 * UI_INDEX_FORMAT.byte_size();
            pass.draw_indexed(batch.index_count, byte_offset, 1);
            stats.draw_calls += 1;
        }
    }
}
