//! Row-major vector and matrix math over plain float arrays.
//!
//! Every matrix in this module is stored row-major: element `(row, col)` of a
//! 4x4 matrix lives at index `row * 4 + col`. GPU APIs expect column-major
//! data, so matrices pass through [`flatten`] exactly once on their way out.
//!
//! Transform builders ([`translate`], [`scale`], [`rotate`]) left-multiply the
//! new transform onto their input: `result = transform * input`.

use crate::error::{Error, Result};

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];
pub type Vec4 = [f32; 4];
pub type Mat3 = [f32; 9];
pub type Mat4 = [f32; 16];

pub const IDENTITY3: Mat3 = mat3(1.0);
pub const IDENTITY4: Mat4 = mat4(1.0);

pub fn degrees_to_radians(degrees: f32) -> f32 {
    degrees * std::f32::consts::PI / 180.0
}

/// Whether a texture dimension can use mipmaps under WebGL1 rules.
pub fn is_power_of_2(value: u32) -> bool {
    value != 0 && value & (value - 1) == 0
}

pub const fn vec2(x: f32, y: f32) -> Vec2 {
    [x, y]
}

pub const fn vec3(x: f32, y: f32, z: f32) -> Vec3 {
    [x, y, z]
}

pub const fn vec4(x: f32, y: f32, z: f32, w: f32) -> Vec4 {
    [x, y, z, w]
}

/// Build a `Vec4` from a `Vec3` and a `w` component.
pub const fn extend(v: Vec3, w: f32) -> Vec4 {
    [v[0], v[1], v[2], w]
}

pub const fn truncate(v: Vec4) -> Vec3 {
    [v[0], v[1], v[2]]
}

/// Build a `Vec3` from untyped data. Any length other than 3 yields `[0, 0, 0]`.
pub fn vec3_from_slice(values: &[f32]) -> Vec3 {
    match values {
        [x, y, z] => [*x, *y, *z],
        _ => [0.0; 3],
    }
}

/// Build a `Vec4` from untyped data. Any length other than 4 yields `[0, 0, 0, 0]`;
/// a 3-component slice is not promoted with an implicit `w`.
pub fn vec4_from_slice(values: &[f32]) -> Vec4 {
    match values {
        [x, y, z, w] => [*x, *y, *z, *w],
        _ => [0.0; 4],
    }
}

/// 3x3 matrix with `diagonal` on the diagonal. `mat3(0.0)` is the zero matrix.
pub const fn mat3(diagonal: f32) -> Mat3 {
    let d = diagonal;
    [
        d, 0.0, 0.0, //
        0.0, d, 0.0, //
        0.0, 0.0, d,
    ]
}

/// 4x4 matrix with `diagonal` on the diagonal. `mat4(1.0)` is the identity.
pub const fn mat4(diagonal: f32) -> Mat4 {
    let d = diagonal;
    [
        d, 0.0, 0.0, 0.0, //
        0.0, d, 0.0, 0.0, //
        0.0, 0.0, d, 0.0, //
        0.0, 0.0, 0.0, d,
    ]
}

pub fn add<const N: usize>(a: [f32; N], b: [f32; N]) -> [f32; N] {
    std::array::from_fn(|i| a[i] + b[i])
}

pub fn sub<const N: usize>(a: [f32; N], b: [f32; N]) -> [f32; N] {
    std::array::from_fn(|i| a[i] - b[i])
}

/// Component-wise product.
pub fn mult_elem<const N: usize>(a: [f32; N], b: [f32; N]) -> [f32; N] {
    std::array::from_fn(|i| a[i] * b[i])
}

/// Broadcast a scalar over a vector or a matrix.
pub fn mult_scalar<const N: usize>(s: f32, v: [f32; N]) -> [f32; N] {
    v.map(|c| c * s)
}

/// 4x4 matrix times column vector.
pub fn mult_mat_vec(m: &Mat4, v: Vec4) -> Vec4 {
    std::array::from_fn(|row| (0..4).map(|k| m[row * 4 + k] * v[k]).sum())
}

/// Matrix product `a * b`. Not commutative.
pub fn mult_mat(a: &Mat4, b: &Mat4) -> Mat4 {
    std::array::from_fn(|i| {
        let (row, col) = (i / 4, i % 4);
        (0..4).map(|k| a[row * 4 + k] * b[k * 4 + col]).sum()
    })
}

/// Sum of component products. No square root is taken; see [`length`].
pub fn dot<const N: usize>(a: [f32; N], b: [f32; N]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean length.
pub fn length<const N: usize>(v: [f32; N]) -> f32 {
    dot(v, v).sqrt()
}

/// Scale `v` to unit length. A zero or non-finite vector is returned unchanged.
///
/// Components are divided by the largest magnitude first so tiny vectors
/// do not underflow in the squared length.
pub fn normalize<const N: usize>(v: [f32; N]) -> [f32; N] {
    let largest = v.iter().fold(0.0_f32, |m, c| m.max(c.abs()));
    if largest == 0.0 || !v.iter().all(|c| c.is_finite()) {
        return v;
    }
    let scaled = v.map(|c| c / largest);
    let len = length(scaled);
    scaled.map(|c| c / len)
}

fn is_zero_or_invalid(v: Vec3) -> bool {
    v.iter().all(|&c| c == 0.0) || !v.iter().all(|c| c.is_finite())
}

pub fn cross(u: Vec3, v: Vec3) -> Vec3 {
    [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ]
}

/// Component-wise average of two vectors.
pub fn mid<const N: usize>(u: [f32; N], v: [f32; N]) -> [f32; N] {
    std::array::from_fn(|i| u[i] * 0.5 + v[i] * 0.5)
}

/// Square matrices stored as flat row-major arrays.
pub trait SquareMatrix: Copy + AsRef<[f32]> + AsMut<[f32]> {
    const N: usize;
}

impl SquareMatrix for Mat3 {
    const N: usize = 3;
}

impl SquareMatrix for Mat4 {
    const N: usize = 4;
}

/// Swap rows and columns.
pub fn transpose<M: SquareMatrix>(m: &M) -> M {
    let n = M::N;
    let mut result = *m;
    let src = m.as_ref();
    let dst = result.as_mut();
    for row in 0..n {
        for col in 0..n {
            dst[col * n + row] = src[row * n + col];
        }
    }
    result
}

/// Convert a row-major matrix to the column-major layout GPU uniforms expect.
///
/// This is [`transpose`] under its upload-facing name. Apply it once, at the
/// hand-off point.
pub use self::transpose as flatten;

/// `translation(v) * input`
pub fn translate(input: &Mat4, v: Vec3) -> Mat4 {
    let mut t = IDENTITY4;
    t[3] = v[0];
    t[7] = v[1];
    t[11] = v[2];
    mult_mat(&t, input)
}

/// `scaling(v) * input`
pub fn scale(input: &Mat4, v: Vec3) -> Mat4 {
    let mut s = IDENTITY4;
    s[0] = v[0];
    s[5] = v[1];
    s[10] = v[2];
    mult_mat(&s, input)
}

/// `rotation(angle, axis) * input`. The angle is in degrees and the axis need
/// not be normalized. A zero axis leaves `input` untouched.
pub fn rotate(input: &Mat4, angle_degrees: f32, axis: Vec3) -> Mat4 {
    if is_zero_or_invalid(axis) {
        return *input;
    }
    let [x, y, z] = normalize(axis);
    let rad = degrees_to_radians(angle_degrees);
    let (s, c) = rad.sin_cos();
    let t = 1.0 - c;

    let r = [
        t * x * x + c,
        t * x * y - s * z,
        t * x * z + s * y,
        0.0,
        t * x * y + s * z,
        t * y * y + c,
        t * y * z - s * x,
        0.0,
        t * x * z - s * y,
        t * y * z + s * x,
        t * z * z + c,
        0.0,
        0.0,
        0.0,
        0.0,
        1.0,
    ];
    mult_mat(&r, input)
}

/// View matrix for a camera at `eye` looking towards `at`.
///
/// The camera looks down its local -Z axis with `up` projected to local +Y.
pub fn look_at(at: Vec3, eye: Vec3, up: Vec3) -> Mat4 {
    let forward = normalize(sub(at, eye));
    let side = normalize(cross(forward, normalize(up)));
    let true_up = cross(side, forward);

    let rotation = [
        side[0], side[1], side[2], 0.0, //
        true_up[0], true_up[1], true_up[2], 0.0, //
        -forward[0], -forward[1], -forward[2], 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];
    let to_origin = translate(&IDENTITY4, [-eye[0], -eye[1], -eye[2]]);
    mult_mat(&rotation, &to_origin)
}

/// Symmetric perspective projection, OpenGL clip conventions (z in [-1, 1]
/// after the divide by w).
pub fn perspective(y_fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (degrees_to_radians(y_fov_degrees) / 2.0).tan();
    let mut result = mat4(0.0);
    result[0] = f / aspect;
    result[5] = f;
    result[10] = (far + near) / (near - far);
    result[11] = 2.0 * far * near / (near - far);
    result[14] = -1.0;
    result
}

pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let mut result = IDENTITY4;
    result[0] = 2.0 / (right - left);
    result[3] = -(right + left) / (right - left);
    result[5] = 2.0 / (top - bottom);
    result[7] = -(top + bottom) / (top - bottom);
    result[10] = -2.0 / (far - near);
    result[11] = -(far + near) / (far - near);
    result
}

/// General 4x4 inverse by Gauss-Jordan elimination with partial pivoting.
pub fn inverse(m: &Mat4) -> Result<Mat4> {
    // f64 keeps the elimination from amplifying f32 rounding.
    let mut a: [f64; 16] = m.map(f64::from);
    let mut inv: [f64; 16] = IDENTITY4.map(f64::from);

    let max_abs = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if max_abs == 0.0 || !max_abs.is_finite() {
        return Err(Error::SingularMatrix);
    }
    let tolerance = max_abs * 1e-10;

    for col in 0..4 {
        let pivot_row = (col..4)
            .max_by(|&i, &j| a[i * 4 + col].abs().total_cmp(&a[j * 4 + col].abs()))
            .unwrap_or(col);
        let pivot = a[pivot_row * 4 + col];
        if pivot.abs() <= tolerance {
            return Err(Error::SingularMatrix);
        }

        if pivot_row != col {
            for k in 0..4 {
                a.swap(pivot_row * 4 + k, col * 4 + k);
                inv.swap(pivot_row * 4 + k, col * 4 + k);
            }
        }

        for k in 0..4 {
            a[col * 4 + k] /= pivot;
            inv[col * 4 + k] /= pivot;
        }

        for row in 0..4 {
            if row == col {
                continue;
            }
            let factor = a[row * 4 + col];
            if factor == 0.0 {
                continue;
            }
            for k in 0..4 {
                a[row * 4 + k] -= factor * a[col * 4 + k];
                inv[row * 4 + k] -= factor * inv[col * 4 + k];
            }
        }
    }

    Ok(inv.map(|v| v as f32))
}

/// Matrix for transforming normals: the transpose of the inverse of `model`.
pub fn normal_matrix(model: &Mat4) -> Result<Mat4> {
    Ok(transpose(&inverse(model)?))
}

/// Upper-left 3x3 block of a 4x4 matrix.
pub fn upper_left(m: &Mat4) -> Mat3 {
    std::array::from_fn(|i| m[(i / 3) * 4 + i % 3])
}

/// A vector or matrix whose shape is only known at runtime.
///
/// This is the dynamically dispatched counterpart of the typed functions
/// above, for callers holding untyped float arrays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Scalar(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl Operand {
    /// Classify untyped data by its length.
    pub fn from_slice(values: &[f32]) -> Result<Self> {
        Ok(match values.len() {
            1 => Self::Scalar(values[0]),
            2 => Self::Vec2([values[0], values[1]]),
            3 => Self::Vec3(vec3_from_slice(values)),
            4 => Self::Vec4(vec4_from_slice(values)),
            9 => Self::Mat3(std::array::from_fn(|i| values[i])),
            16 => Self::Mat4(std::array::from_fn(|i| values[i])),
            n => {
                return Err(Error::Unsupported(format!(
                    "no vector or matrix has {n} components"
                )))
            }
        })
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Vec2(_) => "vec2",
            Self::Vec3(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::Mat3(_) => "mat3",
            Self::Mat4(_) => "mat4",
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        match self {
            Self::Scalar(s) => std::slice::from_ref(s),
            Self::Vec2(v) => v.as_slice(),
            Self::Vec3(v) => v.as_slice(),
            Self::Vec4(v) => v.as_slice(),
            Self::Mat3(m) => m.as_slice(),
            Self::Mat4(m) => m.as_slice(),
        }
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    /// Multiply following the shape table: vec3*vec3 and vec4*vec4 are
    /// component-wise, mat4*vec4 and mat4*mat4 are matrix products, and a
    /// scalar on the left broadcasts over anything.
    pub fn mult(&self, other: &Self) -> Result<Self> {
        Ok(match (self, other) {
            (Self::Scalar(s), rhs) => rhs.map(|c| c * s),
            (Self::Vec3(a), Self::Vec3(b)) => Self::Vec3(mult_elem(*a, *b)),
            (Self::Vec4(a), Self::Vec4(b)) => Self::Vec4(mult_elem(*a, *b)),
            (Self::Mat4(m), Self::Vec4(v)) => Self::Vec4(mult_mat_vec(m, *v)),
            (Self::Mat4(a), Self::Mat4(b)) => Self::Mat4(mult_mat(a, b)),
            _ => return Err(self.mismatch("mult", other)),
        })
    }

    pub fn transpose(&self) -> Result<Self> {
        match self {
            Self::Mat3(m) => Ok(Self::Mat3(transpose(m))),
            Self::Mat4(m) => Ok(Self::Mat4(transpose(m))),
            other => Err(Error::Unsupported(format!(
                "cannot transpose a {}",
                other.shape()
            ))),
        }
    }

    fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        match self {
            Self::Scalar(s) => Self::Scalar(f(*s)),
            Self::Vec2(v) => Self::Vec2(v.map(&f)),
            Self::Vec3(v) => Self::Vec3(v.map(&f)),
            Self::Vec4(v) => Self::Vec4(v.map(&f)),
            Self::Mat3(m) => Self::Mat3(m.map(&f)),
            Self::Mat4(m) => Self::Mat4(m.map(&f)),
        }
    }

    fn zip_with(&self, other: &Self, op: &'static str, f: impl Fn(f32, f32) -> f32) -> Result<Self> {
        fn zip<const N: usize>(a: &[f32; N], b: &[f32; N], f: impl Fn(f32, f32) -> f32) -> [f32; N] {
            std::array::from_fn(|i| f(a[i], b[i]))
        }

        Ok(match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => Self::Scalar(f(*a, *b)),
            (Self::Vec2(a), Self::Vec2(b)) => Self::Vec2(zip(a, b, f)),
            (Self::Vec3(a), Self::Vec3(b)) => Self::Vec3(zip(a, b, f)),
            (Self::Vec4(a), Self::Vec4(b)) => Self::Vec4(zip(a, b, f)),
            (Self::Mat3(a), Self::Mat3(b)) => Self::Mat3(zip(a, b, f)),
            (Self::Mat4(a), Self::Mat4(b)) => Self::Mat4(zip(a, b, f)),
            _ => return Err(self.mismatch(op, other)),
        })
    }

    fn mismatch(&self, op: &'static str, other: &Self) -> Error {
        Error::ShapeMismatch {
            op,
            left: format!("{} ({} components)", self.shape(), self.as_slice().len()),
            right: format!("{} ({} components)", other.shape(), other.as_slice().len()),
        }
    }
}
