//! Recorded draw commands and the queue they are appended to.

use std::cell::RefCell;
use std::rc::Rc;

use crate::color::Color;
use crate::path::Path;
use crate::text::{Glyph, TextLayout};
use crate::texture::Texture;
use crate::transform::Transform;

use super::layer::LayerId;

/// A single fully-resolved drawing instruction.
///
/// Transforms and opacity are applied when the command is recorded, so a
/// command never depends on context state at the time it is consumed.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Line width used by subsequent `DrawPath` commands.
    SetLineWidth(f32),
    DrawLine {
        start: [f32; 3],
        end: [f32; 3],
        line_width: f32,
        color: Color,
    },
    /// A quad covering the unit square centred at the origin, mapped by `transform`.
    DrawQuad {
        transform: Transform,
        texture: Option<Texture>,
        color: Color,
    },
    /// An SDF circle or ring inscribed in the transformed unit square.
    DrawCircle {
        transform: Transform,
        thickness: f32,
        fade: f32,
        color: Color,
    },
    DrawPath {
        path: Rc<Path>,
        transform: Transform,
        color: Color,
    },
    DrawText {
        layout: Rc<TextLayout>,
        transform: Transform,
        opacity: f32,
    },
    DrawGlyph {
        glyph: Glyph,
        transform: Transform,
    },
    BeginLayer {
        id: LayerId,
        version: u64,
        cacheable: bool,
    },
    EndLayer {
        id: LayerId,
    },
    /// Marks the end of a view's drawing. Carries no geometry.
    Commit,
}

impl DrawCommand {
    pub fn is_layer_marker(&self) -> bool {
        matches!(
            self,
            DrawCommand::BeginLayer { .. } | DrawCommand::EndLayer { .. }
        )
    }
}

/// Append-only command sink shared by every copy of a graphics context.
///
/// The queue is reference counted with `Rc`, so it is neither `Send` nor
/// `Sync`: recording can only ever happen on the thread that created it.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    commands: Rc<RefCell<Vec<DrawCommand>>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command.
    ///
    /// # Panics
    ///
    /// Panics if the queue is currently borrowed by [`CommandQueue::with_commands`].
    pub fn push(&self, command: DrawCommand) {
        self.commands.borrow_mut().push(command);
    }

    pub fn extend<I: IntoIterator<Item = DrawCommand>>(&self, commands: I) {
        self.commands.borrow_mut().extend(commands);
    }

    pub fn len(&self) -> usize {
        self.commands.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.borrow().is_empty()
    }

    /// Copy of the recorded commands.
    pub fn snapshot(&self) -> Vec<DrawCommand> {
        self.commands.borrow().clone()
    }

    /// Take the recorded commands, leaving the queue empty.
    pub fn take(&self) -> Vec<DrawCommand> {
        std::mem::take(&mut *self.commands.borrow_mut())
    }

    pub fn with_commands<R>(&self, f: impl FnOnce(&[DrawCommand]) -> R) -> R {
        f(&self.commands.borrow())
    }

    /// Whether two queues share the same backing storage.
    pub fn same_queue(&self, other: &CommandQueue) -> bool {
        Rc::ptr_eq(&self.commands, &other.commands)
    }
}
