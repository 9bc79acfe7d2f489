// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Conversion errors

use crate::ast::{BooleanKind, TransformKind};
use crate::csg::KernelError;
use std::time::Duration;
use thiserror::Error;

/// Result of converting a node (or any fallible engine step)
pub type ConversionResult<T = crate::geometry::Mesh> = Result<T, ConversionError>;

/// Errors produced while turning an AST into geometry.
///
/// Every component returns these as values; none of them are raised across a
/// component boundary as a panic.
#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    /// A transform node with nothing to transform.
    #[error("{kind} has no child to transform")]
    DanglingTransform { kind: TransformKind },

    #[error("malformed {kind} parameters: {reason}")]
    MalformedTransformParameters { kind: TransformKind, reason: String },

    #[error("{node}: missing required parameter `{parameter}`")]
    MissingParameter { node: String, parameter: String },

    #[error("{node}: invalid value for `{parameter}`: {reason}")]
    InvalidParameterValue {
        node: String,
        parameter: String,
        reason: String,
    },

    #[error("unknown module or function `{0}`")]
    UnknownNodeKind(String),

    #[error("`{name}` is already defined in scope `{scope}`")]
    DuplicateDefinition { name: String, scope: String },

    #[error("cannot exit the global scope")]
    CannotExitGlobalScope,

    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("{op} failed")]
    CsgOperationFailure {
        op: BooleanKind,
        #[source]
        source: KernelError,
    },

    #[error("{op} did not finish within {timeout:?}")]
    CsgOperationTimeout { op: BooleanKind, timeout: Duration },

    #[error("nesting depth exceeded the limit of {limit}")]
    RecursionLimitExceeded { limit: usize },
}

impl ConversionError {
    pub(crate) fn missing(node: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::MissingParameter {
            node: node.into(),
            parameter: parameter.into(),
        }
    }

    pub(crate) fn invalid(
        node: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameterValue {
            node: node.into(),
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(kind: TransformKind, reason: impl Into<String>) -> Self {
        Self::MalformedTransformParameters {
            kind,
            reason: reason.into(),
        }
    }

    /// Whether the error is transient and must not be memoized.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::CsgOperationTimeout { .. })
    }
}
