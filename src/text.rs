//! Laid-out text handed over by the shaping collaborator.
//!
//! Shaping and glyph placement happen elsewhere; the pipeline only reads the
//! positioned glyphs and their atlas regions.

use crate::color::Color;
use crate::texture::{Texture, UvRect};

/// Glyph quad bounds in local pixels: `(left, bottom, right, top)`.
///
/// The box is asymmetric around the pen position, so it is stored as four
/// edges rather than an origin and size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphBounds {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl GlyphBounds {
    pub const fn new(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub bounds: GlyphBounds,
    /// Atlas region, `min` is (left, bottom) and `max` is (right, top).
    pub uv: UvRect,
    pub foreground: Color,
    pub outline: Color,
    pub atlas: Texture,
}

impl Glyph {
    /// Copy with both colors passed through the opacity rule.
    pub fn with_opacity(self, opacity: f32) -> Self {
        Self {
            foreground: self.foreground.with_opacity(opacity),
            outline: self.outline.with_opacity(opacity),
            ..self
        }
    }
}

/// Consecutive glyphs sharing one set of attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextRun {
    pub glyphs: Vec<Glyph>,
}

impl TextRun {
    pub fn new(glyphs: Vec<Glyph>) -> Self {
        Self { glyphs }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Glyph> {
        self.glyphs.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLine {
    pub runs: Vec<TextRun>,
}

impl TextLine {
    pub fn new(runs: Vec<TextRun>) -> Self {
        Self { runs }
    }

    pub fn glyphs(&self) -> impl Iterator<Item = &Glyph> {
        self.runs.iter().flat_map(|run| run.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<TextLine>,
}

impl TextLayout {
    pub fn new(lines: Vec<TextLine>) -> Self {
        Self { lines }
    }

    /// Glyphs in line, run, glyph order.
    pub fn glyphs(&self) -> impl Iterator<Item = &Glyph> {
        self.lines.iter().flat_map(|line| line.glyphs())
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs().count()
    }
}
