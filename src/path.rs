//! Vector paths built from move/line/curve elements.

use crate::geometry::{Point, Rect};

/// One element of a path's element stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathElement {
    Move { to: Point },
    Line { to: Point },
    QuadCurve { to: Point, control: Point },
    Curve {
        to: Point,
        control1: Point,
        control2: Point,
    },
    CloseSubpath,
}

/// An ordered list of path elements.
///
/// Elements are stored exactly as added. Lines and curves added before any
/// `move_to` are kept and skipped when the path is stroked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    elements: Vec<PathElement>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, to: impl Into<Point>) -> &mut Self {
        self.elements.push(PathElement::Move { to: to.into() });
        self
    }

    pub fn line_to(&mut self, to: impl Into<Point>) -> &mut Self {
        self.elements.push(PathElement::Line { to: to.into() });
        self
    }

    pub fn quad_curve_to(&mut self, to: impl Into<Point>, control: impl Into<Point>) -> &mut Self {
        self.elements.push(PathElement::QuadCurve {
            to: to.into(),
            control: control.into(),
        });
        self
    }

    pub fn curve_to(
        &mut self,
        to: impl Into<Point>,
        control1: impl Into<Point>,
        control2: impl Into<Point>,
    ) -> &mut Self {
        self.elements.push(PathElement::Curve {
            to: to.into(),
            control1: control1.into(),
            control2: control2.into(),
        });
        self
    }

    pub fn close_subpath(&mut self) -> &mut Self {
        self.elements.push(PathElement::CloseSubpath);
        self
    }

    /// Append a closed subpath tracing `rect` clockwise from its origin.
    pub fn add_rect(&mut self, rect: Rect) -> &mut Self {
        self.move_to((rect.x, rect.y))
            .line_to((rect.x + rect.width, rect.y))
            .line_to((rect.x + rect.width, rect.y + rect.height))
            .line_to((rect.x, rect.y + rect.height))
            .close_subpath()
    }

    /// Append an open polyline through `points`.
    pub fn add_lines(&mut self, points: &[Point]) -> &mut Self {
        if let Some((first, rest)) = points.split_first() {
            self.move_to(*first);
            for point in rest {
                self.line_to(*point);
            }
        }
        self
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathElement> {
        self.elements.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
