//! Geometry generation for recorded draw commands.
//!
//! Every function here is pure: the output depends only on the arguments,
//! so identical commands always produce byte-identical vertex data and
//! tessellation can run for independent layers in any order.

use crate::color::Color;
use crate::geometry::Point;
use crate::path::{Path, PathElement};
use crate::text::Glyph;
use crate::texture::{Texture, UvRect};
use crate::transform::Transform;

use super::vertex::{CircleVertex, GlyphVertex, LineVertex, QuadVertex};

/// Corners of the unit square centred at the origin, starting at the
/// minimum corner and winding towards +x first. Under the Y-down UI
/// projection that is top-left, top-right, bottom-right, bottom-left on
/// screen.
pub const QUAD_POSITIONS: [[f32; 2]; 4] = [[-0.5, -0.5], [0.5, -0.5], [0.5, 0.5], [-0.5, 0.5]];

/// Two triangles over the four quad corners.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

pub const DEFAULT_CURVE_SEGMENTS: u32 = 16;

/// Line geometry produced by stroking a path. Indices start at zero and
/// must be offset by the caller when appended to a shared buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathGeometry {
    pub vertices: Vec<LineVertex>,
    pub indices: Vec<u32>,
}

impl PathGeometry {
    pub fn line_count(&self) -> usize {
        self.vertices.len() / 2
    }

    fn push_segment(&mut self, start: [f32; 3], end: [f32; 3], width: f32, color: Color) {
        let offset = self.vertices.len() as u32;
        self.vertices
            .extend_from_slice(&tessellate_line(start, end, width, color));
        self.indices.extend_from_slice(&generate_line_indices(offset));
    }
}

/// Turns draw commands into vertices. Holds only the Bezier flattening count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tessellator {
    curve_segments: u32,
}

impl Default for Tessellator {
    fn default() -> Self {
        Self {
            curve_segments: DEFAULT_CURVE_SEGMENTS,
        }
    }
}

impl Tessellator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten every curve into exactly `segments` lines (at least one).
    pub fn with_curve_segments(segments: u32) -> Self {
        Self {
            curve_segments: segments.max(1),
        }
    }

    pub fn curve_segments(&self) -> u32 {
        self.curve_segments
    }

    /// Stroke `path` as a list of line primitives.
    ///
    /// Lines, curves and closes that arrive before any `Move` are skipped.
    /// Closing a subpath adds one segment back to its start and clears the
    /// current point.
    pub fn tessellate_path(
        &self,
        path: &Path,
        line_width: f32,
        color: Color,
        transform: &Transform,
    ) -> PathGeometry {
        let mut geometry = PathGeometry::default();
        let mut current: Option<Point> = None;
        let mut subpath_start: Option<Point> = None;
        let project = |p: Point| {
            let v = transform.transform_point4(p.x, p.y, 0.0);
            [v[0], v[1], v[2]]
        };

        for element in path {
            match *element {
                PathElement::Move { to } => {
                    current = Some(to);
                    subpath_start = Some(to);
                }
                PathElement::Line { to } => {
                    let Some(start) = current else { continue };
                    geometry.push_segment(project(start), project(to), line_width, color);
                    current = Some(to);
                }
                PathElement::QuadCurve { to, control } => {
                    let Some(start) = current else { continue };
                    let mut previous = start;
                    for i in 1..=self.curve_segments {
                        let t = i as f32 / self.curve_segments as f32;
                        let point = quadratic_point(start, control, to, t);
                        geometry.push_segment(project(previous), project(point), line_width, color);
                        previous = point;
                    }
                    current = Some(to);
                }
                PathElement::Curve {
                    to,
                    control1,
                    control2,
                } => {
                    let Some(start) = current else { continue };
                    let mut previous = start;
                    for i in 1..=self.curve_segments {
                        let t = i as f32 / self.curve_segments as f32;
                        let point = cubic_point(start, control1, control2, to, t);
                        geometry.push_segment(project(previous), project(point), line_width, color);
                        previous = point;
                    }
                    current = Some(to);
                }
                PathElement::CloseSubpath => {
                    if let (Some(end), Some(start)) = (current, subpath_start) {
                        geometry.push_segment(project(end), project(start), line_width, color);
                    }
                    current = None;
                    subpath_start = None;
                }
            }
        }

        geometry
    }
}

/// Map the unit quad through `transform` and pair each corner with the
/// texture's UV corner (or the full 0..1 square).
pub fn tessellate_quad(
    transform: &Transform,
    texture: Option<&Texture>,
    color: Color,
    texture_index: u32,
) -> [QuadVertex; 4] {
    let uvs = texture
        .map(Texture::texture_coordinates)
        .unwrap_or_else(|| UvRect::FULL.corners());
    let color = color.to_array();

    std::array::from_fn(|i| {
        let [x, y] = QUAD_POSITIONS[i];
        QuadVertex {
            position: transform.transform_point4(x, y, 0.0),
            color,
            uv: uvs[i],
            texture_index,
            _pad: 0,
        }
    })
}

pub fn generate_quad_indices(offset: u32) -> [u32; 6] {
    QUAD_INDICES.map(|i| i + offset)
}

/// Four corners carrying both the world position and the `[-1, 1]`
/// position the fragment stage runs its distance test on.
pub fn tessellate_circle(
    transform: &Transform,
    thickness: f32,
    fade: f32,
    color: Color,
) -> [CircleVertex; 4] {
    let color = color.to_array();

    std::array::from_fn(|i| {
        let [x, y] = QUAD_POSITIONS[i];
        let world = transform.transform_point4(x, y, 0.0);
        CircleVertex {
            world_position: [world[0], world[1], world[2]],
            local_position: [x * 2.0, y * 2.0],
            thickness,
            fade,
            _pad: 0.0,
            color,
        }
    })
}

pub fn generate_circle_indices(offset: u32) -> [u32; 6] {
    generate_quad_indices(offset)
}

pub fn tessellate_line(start: [f32; 3], end: [f32; 3], width: f32, color: Color) -> [LineVertex; 2] {
    let color = color.to_array();
    [
        LineVertex {
            position: start,
            width,
            color,
        },
        LineVertex {
            position: end,
            width,
            color,
        },
    ]
}

pub fn generate_line_indices(offset: u32) -> [u32; 2] {
    [offset, offset + 1]
}

/// Glyph quad from its `(left, bottom, right, top)` bounds.
///
/// Corners go (right, bottom), (right, top), (left, top), (left, bottom) and
/// each takes the atlas UV of the same corner.
pub fn tessellate_glyph(glyph: &Glyph, transform: &Transform, texture_index: u32) -> [GlyphVertex; 4] {
    let b = glyph.bounds;
    let [uv_left, uv_bottom] = glyph.uv.min;
    let [uv_right, uv_top] = glyph.uv.max;
    let corners = [
        ([b.right, b.bottom], [uv_right, uv_bottom]),
        ([b.right, b.top], [uv_right, uv_top]),
        ([b.left, b.top], [uv_left, uv_top]),
        ([b.left, b.bottom], [uv_left, uv_bottom]),
    ];
    let foreground = glyph.foreground.to_array();
    let outline = glyph.outline.to_array();

    corners.map(|([x, y], uv)| GlyphVertex {
        position: transform.transform_point4(x, y, 0.0),
        foreground,
        outline,
        uv,
        texture_index,
        _pad: 0,
    })
}

pub fn generate_glyph_indices(offset: u32) -> [u32; 6] {
    generate_quad_indices(offset)
}

fn quadratic_point(p0: Point, p1: Point, p2: Point, t: f32) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt;
    let b = 2.0 * mt * t;
    let c = t * t;
    Point::new(
        a * p0.x + b * p1.x + c * p2.x,
        a * p0.y + b * p1.y + c * p2.y,
    )
}

fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::device::{SamplerHandle, TextureHandle};
    use crate::text::GlyphBounds;

    fn atlas() -> Texture {
        Texture::new(TextureHandle(2), SamplerHandle(0), 512, 512)
    }

    #[test]
    fn test_quad_indices() {
        assert_eq!(generate_quad_indices(0), [0, 1, 2, 2, 3, 0]);
        assert_eq!(generate_quad_indices(8), [8, 9, 10, 10, 11, 8]);
        assert_eq!(generate_circle_indices(4), generate_quad_indices(4));
    }

    #[test]
    fn test_quad_corners_follow_transform() {
        let t = Transform::translate(50.0, 25.0).then(&Transform::scale_xy(100.0, 50.0));
        let v = tessellate_quad(&t, None, Color::RED, 0);

        assert_eq!(v[0].position, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(v[1].position, [100.0, 0.0, 0.0, 1.0]);
        assert_eq!(v[2].position, [100.0, 50.0, 0.0, 1.0]);
        assert_eq!(v[3].position, [0.0, 50.0, 0.0, 1.0]);
        assert_eq!(v[2].uv, [1.0, 1.0]);
        assert!(v.iter().all(|vert| vert.color == [1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_first_quad_corner_is_top_left_on_screen() {
        let t = Transform::translate(50.0, 25.0).then(&Transform::scale_xy(100.0, 50.0));
        let v = tessellate_quad(&t, None, Color::RED, 0);
        let projection = Transform::ui_projection(200.0, 100.0, 1.0);

        let clip: Vec<(f32, f32)> = v
            .iter()
            .map(|vert| projection.transform_point(vert.position[0], vert.position[1]))
            .collect();
        let close = |a: (f32, f32), b: (f32, f32)| {
            (a.0 - b.0).abs() < 1e-5 && (a.1 - b.1).abs() < 1e-5
        };
        assert!(close(clip[0], (-1.0, 1.0)), "{:?}", clip[0]);
        assert!(close(clip[1], (0.0, 1.0)), "{:?}", clip[1]);
        assert!(close(clip[2], (0.0, 0.0)), "{:?}", clip[2]);
        assert!(close(clip[3], (-1.0, 0.0)), "{:?}", clip[3]);
    }

    #[test]
    fn test_quad_uses_texture_region() {
        let region = atlas().sub_texture(UvRect::new([0.5, 0.25], [0.75, 0.5]));
        let v = tessellate_quad(&Transform::IDENTITY, Some(&region), Color::WHITE, 3);
        assert_eq!(v[0].uv, [0.5, 0.25]);
        assert_eq!(v[2].uv, [0.75, 0.5]);
        assert!(v.iter().all(|vert| vert.texture_index == 3));
    }

    #[test]
    fn test_circle_local_space() {
        let v = tessellate_circle(&Transform::scale(10.0), 0.2, 0.005, Color::BLACK);
        assert_eq!(v[0].local_position, [-1.0, -1.0]);
        assert_eq!(v[2].local_position, [1.0, 1.0]);
        assert_eq!(v[2].world_position, [5.0, 5.0, 0.0]);
        assert_eq!(v[1].thickness, 0.2);
    }

    #[test]
    fn test_glyph_corner_pairing() {
        let glyph = Glyph {
            bounds: GlyphBounds::new(1.0, 2.0, 9.0, 14.0),
            uv: UvRect::new([0.1, 0.2], [0.3, 0.4]),
            foreground: Color::WHITE,
            outline: Color::TRANSPARENT,
            atlas: atlas(),
        };
        let v = tessellate_glyph(&glyph, &Transform::IDENTITY, 5);

        let positions: Vec<[f32; 2]> = v.iter().map(|g| [g.position[0], g.position[1]]).collect();
        let uvs: Vec<[f32; 2]> = v.iter().map(|g| g.uv).collect();
        assert_eq!(positions, vec![[9.0, 2.0], [9.0, 14.0], [1.0, 14.0], [1.0, 2.0]]);
        assert_eq!(uvs, vec![[0.3, 0.2], [0.3, 0.4], [0.1, 0.4], [0.1, 0.2]]);
    }

    #[test]
    fn test_line_topology() {
        let v = tessellate_line([0.0, 0.0, 0.0], [3.0, 4.0, 0.0], 2.0, Color::BLACK);
        assert_eq!(v.len(), 2);
        assert_eq!(v[1].position, [3.0, 4.0, 0.0]);
        assert_eq!(generate_line_indices(6), [6, 7]);
    }

    #[test]
    fn test_path_move_only_is_empty() {
        let mut path = Path::new();
        path.move_to((1.0, 1.0)).move_to((2.0, 2.0));
        let geometry =
            Tessellator::new().tessellate_path(&path, 1.0, Color::BLACK, &Transform::IDENTITY);
        assert!(geometry.vertices.is_empty());
    }

    #[test]
    fn test_path_line_without_move_skipped() {
        let mut path = Path::new();
        path.line_to((5.0, 5.0)).move_to((0.0, 0.0)).line_to((1.0, 0.0));
        let geometry =
            Tessellator::new().tessellate_path(&path, 1.0, Color::BLACK, &Transform::IDENTITY);
        assert_eq!(geometry.line_count(), 1);
        assert_eq!(geometry.indices, vec![0, 1]);
    }

    #[test]
    fn test_close_resets_current_point() {
        let mut path = Path::new();
        path.move_to((0.0, 0.0))
            .line_to((10.0, 0.0))
            .close_subpath()
            .line_to((20.0, 20.0));
        let geometry =
            Tessellator::new().tessellate_path(&path, 1.0, Color::BLACK, &Transform::IDENTITY);
        assert_eq!(geometry.line_count(), 2);
        assert_eq!(geometry.vertices[3].position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_cubic_segment_count_and_endpoint() {
        let mut path = Path::new();
        path.move_to((0.0, 0.0))
            .curve_to((30.0, 0.0), (10.0, 10.0), (20.0, 10.0));
        let geometry = Tessellator::with_curve_segments(8).tessellate_path(
            &path,
            1.0,
            Color::BLACK,
            &Transform::IDENTITY,
        );
        assert_eq!(geometry.line_count(), 8);
        let last = geometry.vertices[geometry.vertices.len() - 1].position;
        assert_eq!(last, [30.0, 0.0, 0.0]);
    }

    #[test]
    fn test_path_points_are_transformed() {
        let mut path = Path::new();
        path.move_to((0.0, 0.0)).line_to((1.0, 0.0));
        let geometry = Tessellator::new().tessellate_path(
            &path,
            3.0,
            Color::BLACK,
            &Transform::translate(5.0, 6.0),
        );
        assert_eq!(geometry.vertices[0].position, [5.0, 6.0, 0.0]);
        assert_eq!(geometry.vertices[1].position, [6.0, 6.0, 0.0]);
        assert_eq!(geometry.vertices[1].width, 3.0);
    }

    #[test]
    fn test_zero_segments_clamped() {
        assert_eq!(Tessellator::with_curve_segments(0).curve_segments(), 1);
    }
}
