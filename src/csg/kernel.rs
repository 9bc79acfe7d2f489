// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean kernel interface

use crate::ast::BooleanKind;
use crate::geometry::Mesh;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Failures reported by a boolean kernel
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("non-manifold input: {edges} edge(s) shared by more than two triangles")]
    NonManifold { edges: usize },

    #[error("coordinate outside the representable range")]
    PrecisionOverflow,

    #[error("operation cancelled")]
    Cancelled,

    #[error("kernel failure: {0}")]
    Internal(String),
}

/// Cooperative cancellation flag shared between the engine and a running
/// kernel call
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once the token has been tripped
    pub fn check(&self) -> Result<(), KernelError> {
        if self.is_cancelled() {
            Err(KernelError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Pairwise mesh boolean.
///
/// Implementations must be shareable across threads: the engine may run them
/// on the rayon pool and several statements may convert at once. Long-running
/// kernels should poll `cancel` and bail out with [`KernelError::Cancelled`].
pub trait BooleanKernel: Send + Sync {
    fn name(&self) -> &str;

    fn apply(
        &self,
        op: BooleanKind,
        a: &Mesh,
        b: &Mesh,
        cancel: &CancelToken,
    ) -> Result<Mesh, KernelError>;
}
