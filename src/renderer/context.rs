//! Recording context handed to views while they draw.
//!
//! A [`GraphicsContext`] carries the running transform, an opacity and the
//! environment by value, and a [`CommandQueue`] by reference. Cloning a
//! context therefore gives a view its own state to modify while every copy
//! keeps appending into the same queue:
//!
//! ```ignore
//! fn draw(&self, context: &mut GraphicsContext) {
//!     let mut child = context.clone();
//!     child.set_opacity(0.5);
//!     child.translate_by(8.0, 8.0);
//!     child.draw_rect(Rect::new(0.0, 0.0, 100.0, 30.0), Color::RED);
//!     // `context` still has its original transform and opacity.
//! }
//! ```

use std::rc::Rc;

use crate::color::Color;
use crate::environment::EnvironmentValues;
use crate::geometry::{Point, Rect};
use crate::path::Path;
use crate::text::{Glyph, TextLayout, TextLine, TextRun};
use crate::texture::Texture;
use crate::transform::Transform;

use super::commands::{CommandQueue, DrawCommand};

/// Anti-aliasing fade used by [`GraphicsContext::draw_ellipse`].
pub const DEFAULT_CIRCLE_FADE: f32 = 0.005;

/// Something that can record itself into a graphics context.
pub trait Drawable {
    fn draw(&self, context: &mut GraphicsContext);
}

impl<F> Drawable for F
where
    F: Fn(&mut GraphicsContext),
{
    fn draw(&self, context: &mut GraphicsContext) {
        self(context)
    }
}

#[derive(Debug, Clone)]
pub struct GraphicsContext {
    transform: Transform,
    opacity: f32,
    environment: EnvironmentValues,
    queue: CommandQueue,
}

impl Default for GraphicsContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsContext {
    /// A context recording into a fresh queue.
    pub fn new() -> Self {
        Self::with_queue(CommandQueue::new())
    }

    pub fn with_queue(queue: CommandQueue) -> Self {
        Self {
            transform: Transform::IDENTITY,
            opacity: 1.0,
            environment: EnvironmentValues::new(),
            queue,
        }
    }

    /// A context with this one's transform and environment but full opacity
    /// and an empty queue of its own.
    pub fn scratch(&self) -> Self {
        Self {
            transform: self.transform,
            opacity: 1.0,
            environment: self.environment.clone(),
            queue: CommandQueue::new(),
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Opacity applied to everything drawn from now on. Earlier commands are
    /// not affected.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity;
    }

    pub fn environment(&self) -> &EnvironmentValues {
        &self.environment
    }

    pub fn set_environment(&mut self, environment: EnvironmentValues) {
        self.environment = environment;
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    // Transform

    /// Append `transform` to the running transform.
    pub fn concatenate(&mut self, transform: &Transform) {
        self.transform = transform.then(&self.transform);
    }

    pub fn translate_by(&mut self, x: f32, y: f32) {
        self.concatenate(&Transform::translate(x, y));
    }

    pub fn scale_by(&mut self, x: f32, y: f32) {
        self.concatenate(&Transform::scale_xy(x, y));
    }

    pub fn rotate(&mut self, angle_radians: f32) {
        self.concatenate(&Transform::rotate(angle_radians));
    }

    pub fn clear_transform(&mut self) {
        self.transform = Transform::IDENTITY;
    }

    // Drawing

    pub fn draw_rect(&mut self, rect: Rect, color: Color) {
        self.push_quad(rect, None, color);
    }

    /// Fill `rect` with `texture`, tinted by `color`.
    pub fn draw_textured_rect(&mut self, rect: Rect, texture: Texture, color: Color) {
        self.push_quad(rect, Some(texture), color);
    }

    /// Ellipse inscribed in `rect`. `thickness` is the ring width in the
    /// circle's normalized space: 1.0 fills it.
    pub fn draw_ellipse(&mut self, rect: Rect, color: Color, thickness: f32) {
        let transform = self.transform.then(&rect.to_transform());
        self.queue.push(DrawCommand::DrawCircle {
            transform,
            thickness,
            fade: DEFAULT_CIRCLE_FADE,
            color: self.resolve_color(color),
        });
    }

    /// Filled circle of `radius` around `center`.
    pub fn draw_circle(&mut self, center: Point, radius: f32, color: Color) {
        let rect = Rect::new(
            center.x - radius,
            center.y - radius,
            radius * 2.0,
            radius * 2.0,
        );
        self.draw_ellipse(rect, color, 1.0);
    }

    pub fn draw_line(&mut self, start: Point, end: Point, line_width: f32, color: Color) {
        let s = self.transform.transform_point4(start.x, start.y, 0.0);
        let e = self.transform.transform_point4(end.x, end.y, 0.0);
        self.queue.push(DrawCommand::DrawLine {
            start: [s[0], s[1], s[2]],
            end: [e[0], e[1], e[2]],
            line_width,
            color: self.resolve_color(color),
        });
    }

    /// Width used to stroke paths drawn after this call.
    pub fn set_line_width(&mut self, width: f32) {
        self.queue.push(DrawCommand::SetLineWidth(width));
    }

    /// Stroke `path` with the current line width.
    pub fn draw_path(&mut self, path: impl Into<Rc<Path>>, color: Color) {
        self.queue.push(DrawCommand::DrawPath {
            path: path.into(),
            transform: self.transform,
            color: self.resolve_color(color),
        });
    }

    /// Draw a laid-out text block with its origin at the top-left of `rect`.
    pub fn draw_text(&mut self, layout: impl Into<Rc<TextLayout>>, rect: Rect) {
        let transform = self.transform.then(&Transform::translate(rect.x, rect.y));
        self.queue.push(DrawCommand::DrawText {
            layout: layout.into(),
            transform,
            opacity: self.opacity,
        });
    }

    pub fn draw_text_line(&mut self, line: &TextLine) {
        for run in &line.runs {
            self.draw_text_run(run);
        }
    }

    pub fn draw_text_run(&mut self, run: &TextRun) {
        for glyph in run.iter() {
            self.draw_glyph(glyph);
        }
    }

    /// Glyph bounds are in the context's local space.
    pub fn draw_glyph(&mut self, glyph: &Glyph) {
        self.queue.push(DrawCommand::DrawGlyph {
            glyph: glyph.with_opacity(self.opacity),
            transform: self.transform,
        });
    }

    pub fn commit_draw(&mut self) {
        self.queue.push(DrawCommand::Commit);
    }

    /// Let `view` draw into a copy of this context, so whatever state it
    /// changes does not leak back to the caller.
    pub fn draw_view(&self, view: &dyn Drawable) {
        let mut context = self.clone();
        view.draw(&mut context);
    }

    pub fn commands(&self) -> Vec<DrawCommand> {
        self.queue.snapshot()
    }

    pub fn take_commands(&self) -> Vec<DrawCommand> {
        self.queue.take()
    }

    fn push_quad(&mut self, rect: Rect, texture: Option<Texture>, color: Color) {
        let transform = self.transform.then(&rect.to_transform());
        self.queue.push(DrawCommand::DrawQuad {
            transform,
            texture,
            color: self.resolve_color(color),
        });
    }

    fn resolve_color(&self, color: Color) -> Color {
        color.with_opacity(self.opacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_color(command: &DrawCommand) -> Color {
        match command {
            DrawCommand::DrawQuad { color, .. } => *color,
            other => panic!("expected DrawQuad, got {:?}", other),
        }
    }

    #[test]
    fn test_opacity_applied_to_rect() {
        let mut ctx = GraphicsContext::new();
        ctx.set_opacity(0.5);
        ctx.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::RED);

        let commands = ctx.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(quad_color(&commands[0]).a, 0.5);
    }

    #[test]
    fn test_transparent_rect_stays_transparent() {
        let mut ctx = GraphicsContext::new();
        ctx.set_opacity(0.5);
        ctx.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::TRANSPARENT);
        assert_eq!(quad_color(&ctx.commands()[0]), Color::TRANSPARENT);
    }

    #[test]
    fn test_transform_baked_at_record_time() {
        let mut ctx = GraphicsContext::new();
        ctx.translate_by(10.0, 5.0);
        ctx.draw_rect(Rect::new(0.0, 0.0, 2.0, 2.0), Color::WHITE);
        ctx.clear_transform();

        match &ctx.commands()[0] {
            DrawCommand::DrawQuad { transform, .. } => {
                assert_eq!(transform.transform_point(-0.5, -0.5), (10.0, 5.0));
                assert_eq!(transform.transform_point(0.5, 0.5), (12.0, 7.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_concatenate_appends_in_parent_space() {
        let mut ctx = GraphicsContext::new();
        ctx.scale_by(2.0, 2.0);
        ctx.translate_by(10.0, 0.0);

        // Scale first, then translate: (1,0) -> (2,0) -> (12,0)
        assert_eq!(ctx.transform().transform_point(1.0, 0.0), (12.0, 0.0));
    }

    #[test]
    fn test_copies_share_queue_but_not_state() {
        let mut ctx = GraphicsContext::new();
        {
            let mut child = ctx.clone();
            child.set_opacity(0.25);
            child.translate_by(3.0, 3.0);
            child.draw_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
        }
        ctx.draw_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);

        let commands = ctx.commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(quad_color(&commands[0]).a, 0.25);
        assert_eq!(quad_color(&commands[1]).a, 1.0);
        assert!(ctx.transform().is_identity());
    }

    #[test]
    fn test_draw_view_isolates_state() {
        let ctx = GraphicsContext::new();
        let view = |c: &mut GraphicsContext| {
            c.set_opacity(0.1);
            c.draw_circle(Point::new(5.0, 5.0), 5.0, Color::BLACK);
        };
        ctx.draw_view(&view);

        assert_eq!(ctx.opacity(), 1.0);
        assert!(matches!(
            ctx.commands()[0],
            DrawCommand::DrawCircle { fade, .. } if fade == DEFAULT_CIRCLE_FADE
        ));
    }

    #[test]
    fn test_line_endpoints_transformed() {
        let mut ctx = GraphicsContext::new();
        ctx.translate_by(1.0, 2.0);
        ctx.draw_line(Point::new(0.0, 0.0), Point::new(4.0, 0.0), 2.0, Color::BLACK);

        match &ctx.commands()[0] {
            DrawCommand::DrawLine { start, end, line_width, .. } => {
                assert_eq!(*start, [1.0, 2.0, 0.0]);
                assert_eq!(*end, [5.0, 2.0, 0.0]);
                assert_eq!(*line_width, 2.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scratch_keeps_transform_and_environment() {
        let mut ctx = GraphicsContext::new();
        ctx.translate_by(4.0, 4.0);
        ctx.set_opacity(0.3);
        ctx.set_environment(EnvironmentValues::new().with_value(7u32));

        let scratch = ctx.scratch();
        assert_eq!(scratch.transform(), ctx.transform());
        assert_eq!(scratch.opacity(), 1.0);
        assert_eq!(scratch.environment().get::<u32>(), Some(&7));
        assert!(!scratch.queue().same_queue(ctx.queue()));
    }
}
