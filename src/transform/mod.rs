// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Transformation chains and affine matrix composition

mod chain;
mod matrix;

pub use chain::{extract_chain, extract_chain_in, Terminal, TransformationChain};
pub use matrix::{
    compose_matrix, multiply_column_major, operation_to_matrix, to_column_major,
    MatrixComposer, Matrix4, RotationMode, IDENTITY,
};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Angle argument of `rotate`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RotateAngle {
    /// `rotate(a)`: degrees about Z
    Scalar(f64),
    /// `rotate([x, y, z])`: Euler angles in degrees
    Euler(Vector3<f64>),
    /// `rotate(a, v)`: degrees about an arbitrary axis
    Axis { angle: f64, axis: Vector3<f64> },
}

/// One affine operation pulled out of a transform node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransformOp {
    Translate(Vector3<f64>),
    Rotate(RotateAngle),
    Scale(Vector3<f64>),
    /// Normal of the mirror plane through the origin
    Mirror(Vector3<f64>),
    /// Row-major rows as written in the source; 3 or 4 of them
    Multmatrix(Vec<[f64; 4]>),
}

impl TransformOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Translate(_) => "translate",
            Self::Rotate(_) => "rotate",
            Self::Scale(_) => "scale",
            Self::Mirror(_) => "mirror",
            Self::Multmatrix(_) => "multmatrix",
        }
    }
}
