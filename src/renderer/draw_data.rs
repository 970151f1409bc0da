//! Per-frame vertex/index accumulation and texture batching.
//!
//! Each primitive kind has its own [`PrimitiveBuffer`]. Textured kinds
//! (quads and glyphs) additionally run a single-pass greedy packer: a
//! primitive reuses its texture's slot in the open texture group when the
//! texture is already there, takes a free slot otherwise, and opens a new
//! group (and therefore a new batch) when the open group is full. Primitives
//! are never reordered, so every kind's batch list covers its index buffer
//! in recording order.

use std::collections::HashMap;

use bytemuck::Pod;

use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::text::Glyph;
use crate::texture::{Texture, TextureBinding};
use crate::transform::Transform;

use super::commands::DrawCommand;
use super::device::{
    BufferDescriptor, BufferHandle, BufferUsages, RenderDevice, ResourceBinding,
    ResourceSetDescriptor, ResourceSetHandle, ResourceSetLayout, TEXTURE_SLOTS,
};
use super::tessellator::{self, Tessellator, QUAD_INDICES};
use super::vertex::{CircleVertex, GlyphVertex, LineVertex, QuadVertex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Quad,
    Circle,
    Line,
    Glyph,
}

impl PrimitiveKind {
    /// Submission order of the kinds within one UI pass.
    pub const ALL: [PrimitiveKind; 4] = [
        PrimitiveKind::Quad,
        PrimitiveKind::Circle,
        PrimitiveKind::Line,
        PrimitiveKind::Glyph,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PrimitiveKind::Quad => "UI Quads",
            PrimitiveKind::Circle => "UI Circles",
            PrimitiveKind::Line => "UI Lines",
            PrimitiveKind::Glyph => "UI Glyphs",
        }
    }

    pub fn is_textured(self) -> bool {
        matches!(self, PrimitiveKind::Quad | PrimitiveKind::Glyph)
    }
}

/// A contiguous index range drawn with one texture group bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    /// Texture group of the kind this batch binds. Untextured kinds use 0.
    pub texture_index: u32,
    /// First index, in elements.
    pub index_offset: u32,
    pub index_count: u32,
}

/// Texture slots of one group. `None` is the white texture.
pub type TextureGroup = Vec<Option<Texture>>;

#[derive(Debug)]
struct TextureBatcher {
    max_slots: usize,
    groups: Vec<TextureGroup>,
}

impl TextureBatcher {
    fn new(max_slots: usize) -> Self {
        Self {
            max_slots,
            groups: Vec::new(),
        }
    }

    /// Returns `(group, slot)` for `texture`, opening a group when needed.
    fn assign(&mut self, texture: Option<&Texture>) -> (u32, u32) {
        let key = texture.map(Texture::binding);

        if let Some(group) = self.groups.last() {
            let existing = group
                .iter()
                .position(|slot| slot.as_ref().map(Texture::binding) == key);
            if let Some(slot) = existing {
                return ((self.groups.len() - 1) as u32, slot as u32);
            }
        }

        let needs_group = self
            .groups
            .last()
            .map_or(true, |group| group.len() >= self.max_slots);
        if needs_group {
            self.groups.push(Vec::with_capacity(self.max_slots));
        }

        let group_index = self.groups.len() - 1;
        let group = &mut self.groups[group_index];
        group.push(texture.copied());
        (group_index as u32, (group.len() - 1) as u32)
    }

    fn clear(&mut self) {
        self.groups.clear();
    }
}

#[derive(Debug, Clone, Copy)]
struct GpuBuffer {
    handle: BufferHandle,
    capacity: usize,
}

/// Vertices, indices and batches of one primitive kind.
#[derive(Debug)]
pub struct PrimitiveBuffer<V> {
    kind: PrimitiveKind,
    vertices: Vec<V>,
    indices: Vec<u32>,
    batches: Vec<Batch>,
    batcher: Option<TextureBatcher>,
    vertex_buffer: Option<GpuBuffer>,
    index_buffer: Option<GpuBuffer>,
    resource_sets: Vec<ResourceSetHandle>,
    set_cache: HashMap<Vec<Option<TextureBinding>>, ResourceSetHandle>,
}

impl<V: Pod> PrimitiveBuffer<V> {
    fn new(kind: PrimitiveKind, max_slots: usize) -> Self {
        Self {
            kind,
            vertices: Vec::new(),
            indices: Vec::new(),
            batches: Vec::new(),
            batcher: kind.is_textured().then(|| TextureBatcher::new(max_slots)),
            vertex_buffer: None,
            index_buffer: None,
            resource_sets: Vec::new(),
            set_cache: HashMap::new(),
        }
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Texture groups in batch order. Empty for untextured kinds.
    pub fn texture_groups(&self) -> &[TextureGroup] {
        self.batcher
            .as_ref()
            .map(|b| b.groups.as_slice())
            .unwrap_or(&[])
    }

    /// Resource sets created by the last `write`, one per texture group.
    pub fn resource_sets(&self) -> &[ResourceSetHandle] {
        &self.resource_sets
    }

    pub fn vertex_buffer(&self) -> Option<BufferHandle> {
        self.vertex_buffer.map(|b| b.handle)
    }

    pub fn index_buffer(&self) -> Option<BufferHandle> {
        self.index_buffer.map(|b| b.handle)
    }

    fn texture_slot(&mut self, texture: Option<&Texture>) -> (u32, u32) {
        match self.batcher.as_mut() {
            Some(batcher) => batcher.assign(texture),
            None => (0, 0),
        }
    }

    /// Append one primitive. `local_indices` are relative to its first vertex.
    ///
    /// # Panics
    ///
    /// Panics if a local index does not address one of `vertices`.
    fn push(&mut self, vertices: &[V], local_indices: &[u32], group: u32) {
        assert!(
            local_indices.iter().all(|&i| (i as usize) < vertices.len()),
            "{:?} primitive indexes past its {} vertices",
            self.kind,
            vertices.len()
        );

        let vertex_offset = self.vertices.len() as u32;
        let index_offset = self.indices.len() as u32;
        self.vertices.extend_from_slice(vertices);
        self.indices
            .extend(local_indices.iter().map(|&i| i + vertex_offset));

        let count = local_indices.len() as u32;
        match self.batches.last_mut() {
            Some(batch) if batch.texture_index == group => batch.index_count += count,
            _ => self.batches.push(Batch {
                texture_index: group,
                index_offset,
                index_count: count,
            }),
        }
    }

    fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.batches.clear();
        if let Some(batcher) = self.batcher.as_mut() {
            batcher.clear();
        }
    }

    fn write<D: RenderDevice>(
        &mut self,
        device: &mut D,
        initial_capacity: usize,
    ) -> Result<(), RenderError> {
        if self.is_empty() {
            self.resource_sets.clear();
            return Ok(());
        }

        let vertex_buffer = ensure_capacity::<D, V>(
            device,
            &mut self.vertex_buffer,
            self.vertices.len(),
            initial_capacity,
            BufferUsages::VERTEX | BufferUsages::COPY_DST,
            self.kind,
        )?;
        device.write_buffer(vertex_buffer, 0, bytemuck::cast_slice(&self.vertices))?;

        let index_buffer = ensure_capacity::<D, u32>(
            device,
            &mut self.index_buffer,
            self.indices.len(),
            initial_capacity * 2,
            BufferUsages::INDEX | BufferUsages::COPY_DST,
            self.kind,
        )?;
        device.write_buffer(index_buffer, 0, bytemuck::cast_slice(&self.indices))?;

        self.write_resource_sets(device)
    }

    /// One texture resource set per group, reused across frames while the
    /// group binds the same textures.
    fn write_resource_sets<D: RenderDevice>(&mut self, device: &mut D) -> Result<(), RenderError> {
        self.resource_sets.clear();
        let Some(batcher) = self.batcher.as_ref() else {
            return Ok(());
        };

        let mut previous = std::mem::take(&mut self.set_cache);
        for group in &batcher.groups {
            let key: Vec<Option<TextureBinding>> = group
                .iter()
                .map(|slot| slot.as_ref().map(Texture::binding))
                .collect();

            let set = match previous.remove(&key).or_else(|| self.set_cache.get(&key).copied()) {
                Some(set) => set,
                None => device.create_resource_set(&ResourceSetDescriptor {
                    label: self.kind.label(),
                    layout: ResourceSetLayout::Textures,
                    entries: group
                        .iter()
                        .map(|slot| match slot {
                            Some(texture) => ResourceBinding::Texture(*texture),
                            None => ResourceBinding::WhiteTexture,
                        })
                        .collect(),
                })?,
            };
            self.set_cache.insert(key, set);
            self.resource_sets.push(set);
        }

        for (_, stale) in previous {
            device.release_resource_set(stale);
        }
        Ok(())
    }
}

/// Make sure `slot` holds a buffer for at least `len` elements of `T`,
/// growing to double the old capacity (or `len`, whichever is larger).
fn ensure_capacity<D: RenderDevice, T>(
    device: &mut D,
    slot: &mut Option<GpuBuffer>,
    len: usize,
    initial_capacity: usize,
    usage: BufferUsages,
    kind: PrimitiveKind,
) -> Result<BufferHandle, RenderError> {
    if let Some(buffer) = slot {
        if buffer.capacity >= len {
            return Ok(buffer.handle);
        }
    }

    let capacity = match slot {
        Some(buffer) => (buffer.capacity * 2).max(len),
        None => initial_capacity.max(len).max(1),
    };
    let handle = device.create_buffer(&BufferDescriptor {
        label: kind.label(),
        size: (capacity * std::mem::size_of::<T>()) as u64,
        usage,
    })?;
    log::info!(
        "{} buffer ({:?}) sized for {} elements",
        kind.label(),
        usage,
        capacity
    );
    *slot = Some(GpuBuffer { handle, capacity });
    Ok(handle)
}

/// All geometry for one UI pass, rebuilt every frame.
#[derive(Debug)]
pub struct DrawData {
    tessellator: Tessellator,
    default_line_width: f32,
    initial_capacity: usize,
    max_textures_per_batch: usize,
    pub quads: PrimitiveBuffer<QuadVertex>,
    pub circles: PrimitiveBuffer<CircleVertex>,
    pub lines: PrimitiveBuffer<LineVertex>,
    pub glyphs: PrimitiveBuffer<GlyphVertex>,
}

impl Default for DrawData {
    fn default() -> Self {
        Self::new(&RendererConfig::default())
    }
}

impl DrawData {
    /// Build from a config. Call [`RendererConfig::validate`] first: the
    /// slot count is clamped to `1..=TEXTURE_SLOTS` here.
    pub fn new(config: &RendererConfig) -> Self {
        let max_slots = config.max_textures_per_batch.clamp(1, TEXTURE_SLOTS);
        Self {
            tessellator: Tessellator::with_curve_segments(config.curve_segments),
            default_line_width: config.default_line_width,
            initial_capacity: config.initial_buffer_capacity,
            max_textures_per_batch: max_slots,
            quads: PrimitiveBuffer::new(PrimitiveKind::Quad, max_slots),
            circles: PrimitiveBuffer::new(PrimitiveKind::Circle, max_slots),
            lines: PrimitiveBuffer::new(PrimitiveKind::Line, max_slots),
            glyphs: PrimitiveBuffer::new(PrimitiveKind::Glyph, max_slots),
        }
    }

    pub fn tessellator(&self) -> &Tessellator {
        &self.tessellator
    }

    pub fn max_textures_per_batch(&self) -> usize {
        self.max_textures_per_batch
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
            && self.circles.is_empty()
            && self.lines.is_empty()
            && self.glyphs.is_empty()
    }

    pub fn batch_count(&self) -> usize {
        self.quads.batches().len()
            + self.circles.batches().len()
            + self.lines.batches().len()
            + self.glyphs.batches().len()
    }

    /// Tessellate `commands` in order and append them to the frame.
    ///
    /// Line width state starts at the configured default for every call.
    /// Layer markers and `Commit` carry no geometry and are skipped.
    pub fn record(&mut self, commands: &[DrawCommand]) {
        let mut line_width = self.default_line_width;

        for command in commands {
            match command {
                DrawCommand::SetLineWidth(width) => line_width = *width,
                DrawCommand::DrawQuad {
                    transform,
                    texture,
                    color,
                } => {
                    let (group, slot) = self.quads.texture_slot(texture.as_ref());
                    let vertices =
                        tessellator::tessellate_quad(transform, texture.as_ref(), *color, slot);
                    self.quads.push(&vertices, &QUAD_INDICES, group);
                }
                DrawCommand::DrawCircle {
                    transform,
                    thickness,
                    fade,
                    color,
                } => {
                    let vertices =
                        tessellator::tessellate_circle(transform, *thickness, *fade, *color);
                    self.circles.push(&vertices, &QUAD_INDICES, 0);
                }
                DrawCommand::DrawLine {
                    start,
                    end,
                    line_width,
                    color,
                } => {
                    let vertices = tessellator::tessellate_line(*start, *end, *line_width, *color);
                    self.lines.push(&vertices, &[0, 1], 0);
                }
                DrawCommand::DrawPath {
                    path,
                    transform,
                    color,
                } => {
                    let geometry =
                        self.tessellator
                            .tessellate_path(path, line_width, *color, transform);
                    if !geometry.vertices.is_empty() {
                        self.lines.push(&geometry.vertices, &geometry.indices, 0);
                    }
                }
                DrawCommand::DrawText {
                    layout,
                    transform,
                    opacity,
                } => {
                    for glyph in layout.glyphs() {
                        self.push_glyph(&glyph.with_opacity(*opacity), transform);
                    }
                }
                DrawCommand::DrawGlyph { glyph, transform } => self.push_glyph(glyph, transform),
                DrawCommand::BeginLayer { .. }
                | DrawCommand::EndLayer { .. }
                | DrawCommand::Commit => {}
            }
        }
    }

    fn push_glyph(&mut self, glyph: &Glyph, transform: &Transform) {
        let (group, slot) = self.glyphs.texture_slot(Some(&glyph.atlas));
        let vertices = tessellator::tessellate_glyph(glyph, transform, slot);
        self.glyphs.push(&vertices, &QUAD_INDICES, group);
    }

    /// Reset for the next frame. Allocations and GPU buffers are kept.
    pub fn clear(&mut self) {
        self.quads.clear();
        self.circles.clear();
        self.lines.clear();
        self.glyphs.clear();
    }

    /// Upload every non-empty kind and build its texture resource sets.
    pub fn write<D: RenderDevice>(&mut self, device: &mut D) -> Result<(), RenderError> {
        let capacity = self.initial_capacity;
        self.quads.write(device, capacity)?;
        self.circles.write(device, capacity)?;
        self.lines.write(device, capacity)?;
        self.glyphs.write(device, capacity)?;
        Ok(())
    }
}
