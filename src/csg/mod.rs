// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Constructive solid geometry: the boolean engine and the kernel it drives

mod bsp;
mod engine;
mod kernel;
mod validate;

pub use bsp::BspKernel;
pub use engine::CsgEngine;
pub use kernel::{BooleanKernel, CancelToken, KernelError};
pub use validate::{is_closed, is_manifold, validate_operand};
