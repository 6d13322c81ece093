/// Conversions between the flat row-major arrays and nalgebra types
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

use crate::math::{Mat4, Vec3, Vec4};

pub fn to_matrix4(m: &Mat4) -> Matrix4<f32> {
    Matrix4::from_row_slice(m)
}

pub fn from_matrix4(m: &Matrix4<f32>) -> Mat4 {
    // nalgebra stores columns contiguously, so the transpose's storage is row-major.
    let mut result = [0.0; 16];
    result.copy_from_slice(m.transpose().as_slice());
    result
}

pub fn to_vector3(v: Vec3) -> Vector3<f32> {
    Vector3::new(v[0], v[1], v[2])
}

pub fn to_point3(v: Vec3) -> Point3<f32> {
    Point3::new(v[0], v[1], v[2])
}

pub fn to_vector4(v: Vec4) -> Vector4<f32> {
    Vector4::new(v[0], v[1], v[2], v[3])
}

pub fn from_vector3(v: &Vector3<f32>) -> Vec3 {
    [v.x, v.y, v.z]
}

pub fn from_point3(p: &Point3<f32>) -> Vec3 {
    [p.x, p.y, p.z]
}
