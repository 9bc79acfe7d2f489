// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean composition of child meshes

use super::kernel::{BooleanKernel, CancelToken, KernelError};
use super::validate::validate_operand;
use super::BspKernel;
use crate::ast::BooleanKind;
use crate::error::{ConversionError, ConversionResult};
use crate::geometry::Mesh;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Applies union, difference and intersection over any number of operands by
/// folding them pairwise through a [`BooleanKernel`]
#[derive(Clone)]
pub struct CsgEngine {
    kernel: Arc<dyn BooleanKernel>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for CsgEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsgEngine")
            .field("kernel", &self.kernel.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for CsgEngine {
    fn default() -> Self {
        Self::new(Arc::new(BspKernel), None)
    }
}

impl CsgEngine {
    pub fn new(kernel: Arc<dyn BooleanKernel>, timeout: Option<Duration>) -> Self {
        Self { kernel, timeout }
    }

    pub fn kernel_name(&self) -> &str {
        self.kernel.name()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Combine `children` with `op`.
    ///
    /// Union is the union of all children, difference subtracts every later
    /// child from the first, intersection keeps the volume common to all. No
    /// children gives an empty mesh and a single child is returned unchanged.
    pub fn apply_boolean_op(&self, op: BooleanKind, children: Vec<Mesh>) -> ConversionResult<Mesh> {
        let failure = |source: KernelError| ConversionError::CsgOperationFailure { op, source };

        if children.len() <= 1 {
            return Ok(children.into_iter().next().unwrap_or_default());
        }

        for child in children.iter().filter(|mesh| !mesh.is_empty()) {
            validate_operand(child).map_err(failure)?;
        }

        let operands: Vec<Mesh> = match op {
            BooleanKind::Union => children.into_iter().filter(|m| !m.is_empty()).collect(),
            BooleanKind::Intersection => {
                if children.iter().any(Mesh::is_empty) {
                    return Ok(Mesh::empty());
                }
                children
            }
            BooleanKind::Difference => {
                let mut iter = children.into_iter();
                match iter.next() {
                    Some(first) if !first.is_empty() => std::iter::once(first)
                        .chain(iter.filter(|m| !m.is_empty()))
                        .collect(),
                    _ => return Ok(Mesh::empty()),
                }
            }
        };

        if operands.len() <= 1 {
            return Ok(operands.into_iter().next().unwrap_or_default());
        }

        let started = Instant::now();
        let count = operands.len();
        let mut result = match self.timeout {
            None => fold(self.kernel.as_ref(), op, operands, &CancelToken::new()),
            Some(timeout) => self.fold_with_timeout(op, operands, timeout)?,
        }
        .map_err(failure)?;
        result.recompute_normals();

        debug!(
            kernel = self.kernel.name(),
            %op,
            operands = count,
            triangles = result.triangle_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "boolean operation finished"
        );
        Ok(result)
    }

    /// Run the fold on a worker thread and give up after `timeout`. The
    /// worker is told to stop through its cancel token; the result is never
    /// retried.
    fn fold_with_timeout(
        &self,
        op: BooleanKind,
        operands: Vec<Mesh>,
        timeout: Duration,
    ) -> ConversionResult<Result<Mesh, KernelError>> {
        let (sender, receiver) = mpsc::channel();
        let cancel = CancelToken::new();
        let kernel = Arc::clone(&self.kernel);
        let worker_cancel = cancel.clone();

        std::thread::Builder::new()
            .name("csg-kernel".to_string())
            .spawn(move || {
                // The receiver may be gone after a timeout
                let _ = sender.send(fold(kernel.as_ref(), op, operands, &worker_cancel));
            })
            .map_err(|e| ConversionError::CsgOperationFailure {
                op,
                source: KernelError::Internal(format!("failed to start kernel worker: {}", e)),
            })?;

        match receiver.recv_timeout(timeout) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Timeout) => {
                cancel.cancel();
                warn!(%op, ?timeout, "boolean operation timed out");
                Err(ConversionError::CsgOperationTimeout { op, timeout })
            }
            Err(RecvTimeoutError::Disconnected) => Ok(Err(KernelError::Internal(
                "kernel worker exited without a result".to_string(),
            ))),
        }
    }
}

fn fold(
    kernel: &dyn BooleanKernel,
    op: BooleanKind,
    operands: Vec<Mesh>,
    cancel: &CancelToken,
) -> Result<Mesh, KernelError> {
    let mut iter = operands.into_iter();
    let mut acc = iter.next().unwrap_or_default();
    for operand in iter {
        cancel.check()?;
        acc = kernel.apply(op, &acc, &operand, cancel)?;
    }
    Ok(acc)
}
