// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! 4x4 affine matrices in column-major layout

use super::{RotateAngle, TransformOp};
use crate::ast::TransformKind;
use crate::error::{ConversionError, ConversionResult};
use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Affine transform. nalgebra stores it column-major, so element `12..15` of
/// [`to_column_major`] is the translation column.
pub type Matrix4 = nalgebra::Matrix4<f64>;

/// Column-major identity
pub const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// How `rotate([x, y, z])` is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationMode {
    /// Only the Z component is honored; X and Y are dropped
    #[default]
    ZOnly,
    /// Full Euler rotation, applied X then Y then Z
    FullEuler,
}

/// The 16 matrix elements, column-major
pub fn to_column_major(m: &Matrix4) -> [f64; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

/// `a * b` on raw column-major arrays:
/// `result[col*4+row] = Σ_k a[k*4+row] * b[col*4+k]`
pub fn multiply_column_major(a: &[f64; 16], b: &[f64; 16]) -> [f64; 16] {
    let mut result = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            result[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
        }
    }
    result
}

/// Turns transform operations into matrices
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixComposer {
    pub rotation_mode: RotationMode,
}

impl MatrixComposer {
    pub fn new(rotation_mode: RotationMode) -> Self {
        Self { rotation_mode }
    }

    /// Compose a chain given outermost operation first.
    ///
    /// Each operation's matrix is multiplied in on the right, so a point is
    /// mapped as `M_outer * ... * M_inner * p`.
    pub fn compose_matrix(&self, operations: &[TransformOp]) -> ConversionResult<Matrix4> {
        operations
            .iter()
            .try_fold(Matrix4::identity(), |acc, op| {
                Ok(acc * self.operation_to_matrix(op)?)
            })
    }

    pub fn operation_to_matrix(&self, op: &TransformOp) -> ConversionResult<Matrix4> {
        Ok(match op {
            TransformOp::Translate(v) => Matrix4::new_translation(v),
            TransformOp::Scale(s) => Matrix4::new_nonuniform_scaling(s),
            TransformOp::Rotate(angle) => self.rotation(angle),
            TransformOp::Mirror(normal) => mirror(normal),
            TransformOp::Multmatrix(rows) => multmatrix(rows)?,
        })
    }

    fn rotation(&self, angle: &RotateAngle) -> Matrix4 {
        match (angle, self.rotation_mode) {
            (RotateAngle::Scalar(a), _) => rotation_z(*a),
            (RotateAngle::Euler(angles), RotationMode::ZOnly) => rotation_z(angles.z),
            (RotateAngle::Euler(angles), RotationMode::FullEuler) => {
                let rx = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angles.x.to_radians());
                let ry = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angles.y.to_radians());
                let rz = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angles.z.to_radians());
                (rz * ry * rx).to_homogeneous()
            }
            // An explicit axis is always honored; only the Euler form is mode-dependent
            (RotateAngle::Axis { angle, axis }, _) => {
                match Unit::try_new(*axis, f64::EPSILON) {
                    Some(axis) => {
                        UnitQuaternion::from_axis_angle(&axis, angle.to_radians()).to_homogeneous()
                    }
                    None => rotation_z(*angle),
                }
            }
        }
    }
}

fn rotation_z(degrees: f64) -> Matrix4 {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), degrees.to_radians()).to_homogeneous()
}

fn mirror(normal: &Vector3<f64>) -> Matrix4 {
    let length = normal.norm();
    if length == 0.0 {
        return Matrix4::identity();
    }
    let n = normal / length;

    let mut m = Matrix4::identity();
    for row in 0..3 {
        for col in 0..3 {
            m[(row, col)] -= 2.0 * n[row] * n[col];
        }
    }
    m
}

fn multmatrix(rows: &[[f64; 4]]) -> ConversionResult<Matrix4> {
    if rows.len() != 3 && rows.len() != 4 {
        return Err(ConversionError::malformed(
            TransformKind::Multmatrix,
            format!("expected 3 or 4 rows, got {}", rows.len()),
        ));
    }

    let mut row_major = IDENTITY;
    for (r, row) in rows.iter().enumerate() {
        row_major[r * 4..r * 4 + 4].copy_from_slice(row);
    }
    // Row-major input read into column-major storage is exactly the transpose
    Ok(Matrix4::from_row_slice(&row_major))
}

/// [`MatrixComposer::compose_matrix`] with Z-only rotation
pub fn compose_matrix(operations: &[TransformOp]) -> ConversionResult<Matrix4> {
    MatrixComposer::default().compose_matrix(operations)
}

/// [`MatrixComposer::operation_to_matrix`] with Z-only rotation
pub fn operation_to_matrix(op: &TransformOp) -> ConversionResult<Matrix4> {
    MatrixComposer::default().operation_to_matrix(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_empty_is_identity() {
        let m = compose_matrix(&[]).unwrap();
        assert_eq!(to_column_major(&m), IDENTITY);
    }

    #[test]
    fn test_translation_column() {
        let m = operation_to_matrix(&TransformOp::Translate(Vector3::new(1.0, 2.0, 3.0))).unwrap();
        assert_eq!(&to_column_major(&m)[12..15], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_multiply_matches_nalgebra() {
        let a = operation_to_matrix(&TransformOp::Scale(Vector3::new(2.0, 3.0, 4.0))).unwrap();
        let b = operation_to_matrix(&TransformOp::Translate(Vector3::new(5.0, 6.0, 7.0))).unwrap();
        let raw = multiply_column_major(&to_column_major(&a), &to_column_major(&b));
        assert_eq!(raw, to_column_major(&(a * b)));
        assert_eq!(&raw[12..15], &[10.0, 18.0, 28.0]);
    }

    #[test]
    fn test_euler_z_only_ignores_x_and_y() {
        let op = TransformOp::Rotate(RotateAngle::Euler(Vector3::new(45.0, 30.0, 90.0)));
        let z_only = operation_to_matrix(&op).unwrap();
        let pure_z = operation_to_matrix(&TransformOp::Rotate(RotateAngle::Scalar(90.0))).unwrap();
        assert_eq!(z_only, pure_z);

        let full = MatrixComposer::new(RotationMode::FullEuler)
            .operation_to_matrix(&op)
            .unwrap();
        assert_ne!(full, pure_z);
    }

    #[test]
    fn test_full_euler_x_rotation() {
        let op = TransformOp::Rotate(RotateAngle::Euler(Vector3::new(90.0, 0.0, 0.0)));
        let m = MatrixComposer::new(RotationMode::FullEuler)
            .operation_to_matrix(&op)
            .unwrap();
        let p = m.transform_point(&Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(p.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_axis_rotation_honored_in_z_only_mode() {
        let op = TransformOp::Rotate(RotateAngle::Axis {
            angle: 90.0,
            axis: Vector3::new(1.0, 0.0, 0.0),
        });
        let m = MatrixComposer::new(RotationMode::ZOnly)
            .operation_to_matrix(&op)
            .unwrap();
        let p = m.transform_point(&Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 0.0, 1.0), epsilon = 1e-12);

        // A zero axis falls back to Z
        let op = TransformOp::Rotate(RotateAngle::Axis {
            angle: 90.0,
            axis: Vector3::zeros(),
        });
        let p = operation_to_matrix(&op)
            .unwrap()
            .transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_mirror_x() {
        let m = operation_to_matrix(&TransformOp::Mirror(Vector3::new(1.0, 0.0, 0.0))).unwrap();
        let p = m.transform_point(&nalgebra::Point3::new(2.0, 3.0, 4.0));
        assert_eq!(p, nalgebra::Point3::new(-2.0, 3.0, 4.0));
    }

    #[test]
    fn test_multmatrix_is_transposed() {
        let rows = vec![
            [1.0, 0.0, 0.0, 7.0],
            [0.0, 1.0, 0.0, 8.0],
            [0.0, 0.0, 1.0, 9.0],
        ];
        let m = operation_to_matrix(&TransformOp::Multmatrix(rows)).unwrap();
        let raw = to_column_major(&m);
        assert_eq!(&raw[12..16], &[7.0, 8.0, 9.0, 1.0]);
        assert_eq!(raw[3], 0.0);
    }

    #[test]
    fn test_multmatrix_bad_row_count() {
        let rows = vec![[1.0, 0.0, 0.0, 0.0]];
        assert!(matches!(
            operation_to_matrix(&TransformOp::Multmatrix(rows)),
            Err(ConversionError::MalformedTransformParameters { .. })
        ));
    }

    #[test]
    fn test_nan_propagates() {
        let m = operation_to_matrix(&TransformOp::Translate(Vector3::new(f64::NAN, 0.0, 0.0)))
            .unwrap();
        assert!(to_column_major(&m)[12].is_nan());
    }
}
