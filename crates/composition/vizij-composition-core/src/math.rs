//! Vector, matrix and color value types used by scene properties.
//!
//! Matrices follow the row-vector convention used by the composition runtime:
//! a point is transformed as `p' = p × M`, so `A.then(B)` applies `A` first.

use serde::{Deserialize, Serialize};

pub type Vector2 = [f32; 2];
pub type Vector3 = [f32; 3];
pub type Vector4 = [f32; 4];

/// 8-bit ARGB color.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::argb(0, 0, 0, 0);

    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Color { a, r, g, b }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { a: 0xFF, r, g, b }
    }

    /// Packed `0xAARRGGBB`.
    pub fn to_argb_u32(self) -> u32 {
        u32::from_be_bytes([self.a, self.r, self.g, self.b])
    }

    pub fn lerp(self, other: Color, t: f32) -> Color {
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color {
            a: mix(self.a, other.a),
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }
}

/// 2D affine transform `[m11, m12, m21, m22, m31, m32]`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Matrix3x2(pub [f32; 6]);

impl Default for Matrix3x2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix3x2 {
    pub const IDENTITY: Matrix3x2 = Matrix3x2([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translation(v: Vector2) -> Self {
        Matrix3x2([1.0, 0.0, 0.0, 1.0, v[0], v[1]])
    }

    pub fn scale(v: Vector2) -> Self {
        Matrix3x2([v[0], 0.0, 0.0, v[1], 0.0, 0.0])
    }

    /// Clockwise rotation in screen space (y down).
    pub fn rotation_degrees(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Matrix3x2([cos, sin, -sin, cos, 0.0, 0.0])
    }

    /// `self` applied first, then `next`.
    pub fn then(&self, next: &Matrix3x2) -> Matrix3x2 {
        let a = &self.0;
        let b = &next.0;
        Matrix3x2([
            a[0] * b[0] + a[1] * b[2],
            a[0] * b[1] + a[1] * b[3],
            a[2] * b[0] + a[3] * b[2],
            a[2] * b[1] + a[3] * b[3],
            a[4] * b[0] + a[5] * b[2] + b[4],
            a[4] * b[1] + a[5] * b[3] + b[5],
        ])
    }

    pub fn transform_point(&self, p: Vector2) -> Vector2 {
        let m = &self.0;
        [
            p[0] * m[0] + p[1] * m[2] + m[4],
            p[0] * m[1] + p[1] * m[3] + m[5],
        ]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn approx_eq(&self, other: &Matrix3x2, eps: f32) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }
}

/// 3D transform, row-major `m11..m44`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Matrix4x4(pub [f32; 16]);

impl Default for Matrix4x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4x4 {
    #[rustfmt::skip]
    pub const IDENTITY: Matrix4x4 = Matrix4x4([
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ]);

    pub fn translation(v: Vector3) -> Self {
        let mut m = Self::IDENTITY;
        m.0[12] = v[0];
        m.0[13] = v[1];
        m.0[14] = v[2];
        m
    }

    pub fn scale(v: Vector3) -> Self {
        let mut m = Self::IDENTITY;
        m.0[0] = v[0];
        m.0[5] = v[1];
        m.0[10] = v[2];
        m
    }

    /// Rotation about the Z axis.
    pub fn rotation_z_degrees(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let mut m = Self::IDENTITY;
        m.0[0] = cos;
        m.0[1] = sin;
        m.0[4] = -sin;
        m.0[5] = cos;
        m
    }

    /// `self` applied first, then `next`.
    pub fn then(&self, next: &Matrix4x4) -> Matrix4x4 {
        let a = &self.0;
        let b = &next.0;
        let mut out = [0.0f32; 16];
        for row in 0..4 {
            for col in 0..4 {
                out[row * 4 + col] = (0..4).map(|k| a[row * 4 + k] * b[k * 4 + col]).sum();
            }
        }
        Matrix4x4(out)
    }

    /// Affine 2D part (x/y rows and translation), as seen by a flat render target.
    pub fn to_matrix3x2(&self) -> Matrix3x2 {
        let m = &self.0;
        Matrix3x2([m[0], m[1], m[4], m[5], m[12], m[13]])
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}
