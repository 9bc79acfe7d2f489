// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! AST-to-geometry conversion

mod cache;
mod job;
mod orchestrator;

pub use cache::{CacheStats, GeometryCache};
pub use orchestrator::Converter;
