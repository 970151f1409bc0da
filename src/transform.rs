/// A 4x4 transformation matrix stored in row-major order.
///
/// Drawing calls compose their local transform onto the running context
/// transform, and the result is baked into every recorded command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Matrix data in row-major order: [row0, row1, row2, row3]
    pub data: [f32; 16],
}

impl Transform {
    pub const IDENTITY: Self = Self {
        data: [
            1.0, 0.0, 0.0, 0.0, // row 0
            0.0, 1.0, 0.0, 0.0, // row 1
            0.0, 0.0, 1.0, 0.0, // row 2
            0.0, 0.0, 0.0, 1.0, // row 3
        ],
    };

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn translate(x: f32, y: f32) -> Self {
        Self {
            data: [
                1.0, 0.0, 0.0, x, // row 0
                0.0, 1.0, 0.0, y, // row 1
                0.0, 0.0, 1.0, 0.0, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    /// Rotation around the Z axis.
    pub fn rotate(angle_radians: f32) -> Self {
        let cos = angle_radians.cos();
        let sin = angle_radians.sin();
        Self {
            data: [
                cos, -sin, 0.0, 0.0, // row 0
                sin, cos, 0.0, 0.0, // row 1
                0.0, 0.0, 1.0, 0.0, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    pub fn rotate_degrees(angle_degrees: f32) -> Self {
        Self::rotate(angle_degrees.to_radians())
    }

    pub fn scale(s: f32) -> Self {
        Self::scale_xy(s, s)
    }

    pub fn scale_xy(sx: f32, sy: f32) -> Self {
        Self {
            data: [
                sx, 0.0, 0.0, 0.0, // row 0
                0.0, sy, 0.0, 0.0, // row 1
                0.0, 0.0, 1.0, 0.0, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    /// Orthographic projection onto wgpu clip space (depth 0..1).
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let rl = right - left;
        let tb = top - bottom;
        let fnr = far - near;
        Self {
            data: [
                2.0 / rl, 0.0, 0.0, -(right + left) / rl, // row 0
                0.0, 2.0 / tb, 0.0, -(top + bottom) / tb, // row 1
                0.0, 0.0, 1.0 / fnr, -near / fnr, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    /// Projection used by the UI pass.
    ///
    /// Origin is the top-left corner and Y grows downward. `width` and
    /// `height` are the target size in physical pixels; logical coordinates
    /// are multiplied by `scale_factor` before projecting.
    pub fn ui_projection(width: f32, height: f32, scale_factor: f32) -> Self {
        Self::orthographic(0.0, width, height, 0.0, -1.0, 1.0).then(&Self::scale(scale_factor))
    }

    /// Compose this transform with another: self * other
    /// Applies `other` first, then `self`.
    pub fn then(&self, other: &Transform) -> Transform {
        let a = &self.data;
        let b = &other.data;

        let mut result = [0.0f32; 16];
        for i in 0..4 {
            for j in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += a[i * 4 + k] * b[k * 4 + j];
                }
                result[i * 4 + j] = sum;
            }
        }

        Transform { data: result }
    }

    /// Transform a 2D point by this matrix
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        let new_x = self.data[0] * x + self.data[1] * y + self.data[3];
        let new_y = self.data[4] * x + self.data[5] * y + self.data[7];
        (new_x, new_y)
    }

    /// Transform the homogeneous point `(x, y, z, 1)`.
    pub fn transform_point4(&self, x: f32, y: f32, z: f32) -> [f32; 4] {
        let d = &self.data;
        [
            d[0] * x + d[1] * y + d[2] * z + d[3],
            d[4] * x + d[5] * y + d[6] * z + d[7],
            d[8] * x + d[9] * y + d[10] * z + d[11],
            d[12] * x + d[13] * y + d[14] * z + d[15],
        ]
    }

    /// Column-major layout, as WGSL expects for a `mat4x4<f32>` uniform.
    pub fn to_cols_array(&self) -> [f32; 16] {
        let mut cols = [0.0f32; 16];
        for row in 0..4 {
            for col in 0..4 {
                cols[col * 4 + row] = self.data[row * 4 + col];
            }
        }
        cols
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_translate() {
        let t = Transform::translate(10.0, 20.0);
        let (x, y) = t.transform_point(5.0, 5.0);
        assert!(approx_eq(x, 15.0));
        assert!(approx_eq(y, 25.0));
    }

    #[test]
    fn test_rotate() {
        let t = Transform::rotate_degrees(90.0);
        let (x, y) = t.transform_point(1.0, 0.0);
        assert!(approx_eq(x, 0.0));
        assert!(approx_eq(y, 1.0));
    }

    #[test]
    fn test_compose_applies_right_operand_first() {
        let translate = Transform::translate(10.0, 0.0);
        let scale = Transform::scale(2.0);

        // (0,0) -> translate -> (10,0) -> scale -> (20,0)
        let composed = scale.then(&translate);
        let (x, y) = composed.transform_point(0.0, 0.0);
        assert!(approx_eq(x, 20.0));
        assert!(approx_eq(y, 0.0));
    }

    #[test]
    fn test_ui_projection_is_top_left_y_down() {
        let proj = Transform::ui_projection(200.0, 100.0, 1.0);

        let top_left = proj.transform_point4(0.0, 0.0, 0.0);
        assert!(approx_eq(top_left[0], -1.0));
        assert!(approx_eq(top_left[1], 1.0));

        let bottom_right = proj.transform_point4(200.0, 100.0, 0.0);
        assert!(approx_eq(bottom_right[0], 1.0));
        assert!(approx_eq(bottom_right[1], -1.0));
    }

    #[test]
    fn test_ui_projection_applies_scale_factor() {
        // 400x200 physical pixels at 2x is 200x100 logical.
        let proj = Transform::ui_projection(400.0, 200.0, 2.0);
        let p = proj.transform_point4(200.0, 100.0, 0.0);
        assert!(approx_eq(p[0], 1.0));
        assert!(approx_eq(p[1], -1.0));
    }

    #[test]
    fn test_cols_array_transposes() {
        let t = Transform::translate(3.0, 4.0);
        let cols = t.to_cols_array();
        assert_eq!(&cols[12..16], &[3.0, 4.0, 0.0, 1.0]);
        assert_eq!(&cols[0..4], &[1.0, 0.0, 0.0, 0.0]);
    }
}
