// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh validation ahead of boolean operations

use super::KernelError;
use crate::geometry::Mesh;
use ahash::AHashMap;

/// Undirected edge, smaller index first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Edge(u32, u32);

impl Edge {
    fn new(v0: u32, v1: u32) -> Self {
        if v0 < v1 {
            Self(v0, v1)
        } else {
            Self(v1, v0)
        }
    }
}

fn edge_counts(mesh: &Mesh) -> AHashMap<Edge, u32> {
    let mut counts = AHashMap::with_capacity(mesh.indices.len());
    for [a, b, c] in mesh.triangles() {
        for edge in [Edge::new(a, b), Edge::new(b, c), Edge::new(c, a)] {
            *counts.entry(edge).or_insert(0) += 1;
        }
    }
    counts
}

/// Check if mesh is manifold (each edge shared by at most 2 triangles)
pub fn is_manifold(mesh: &Mesh) -> bool {
    edge_counts(mesh).values().all(|&count| count <= 2)
}

/// Check if mesh is closed (each edge shared by exactly 2 triangles)
pub fn is_closed(mesh: &Mesh) -> bool {
    edge_counts(mesh).values().all(|&count| count == 2)
}

/// Reject operands the kernel cannot handle: non-finite coordinates, indices
/// past the vertex buffer and edges shared by more than two triangles
pub fn validate_operand(mesh: &Mesh) -> Result<(), KernelError> {
    if mesh.positions.iter().any(|c| !c.is_finite()) {
        return Err(KernelError::PrecisionOverflow);
    }

    let vertex_count = mesh.vertex_count() as u32;
    if let Some(index) = mesh.indices.iter().find(|&&i| i >= vertex_count) {
        return Err(KernelError::Internal(format!(
            "index {} out of range for {} vertices",
            index, vertex_count
        )));
    }

    let overused = edge_counts(mesh).values().filter(|&&count| count > 2).count();
    if overused > 0 {
        return Err(KernelError::NonManifold { edges: overused });
    }
    Ok(())
}
