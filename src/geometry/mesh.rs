// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation and utilities

use super::BoundingBox;
use crate::ast::NodeKind;
use crate::transform::Matrix4;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Transform left for the scene layer to apply
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MeshTransform {
    Matrix(Matrix4),
    /// Decomposed form used when the matrix is a pure translation
    Translation([f64; 3]),
}

impl MeshTransform {
    /// Pick the simplest representation of `matrix`
    pub fn from_matrix(matrix: Matrix4) -> Self {
        if matrix.fixed_view::<3, 3>(0, 0) == nalgebra::Matrix3::identity()
            && matrix.fixed_view::<1, 4>(3, 0) == nalgebra::RowVector4::new(0.0, 0.0, 0.0, 1.0)
        {
            Self::Translation([matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]])
        } else {
            Self::Matrix(matrix)
        }
    }

    pub fn to_matrix(&self) -> Matrix4 {
        match self {
            Self::Matrix(m) => *m,
            Self::Translation(t) => Matrix4::new_translation(&Vector3::new(t[0], t[1], t[2])),
        }
    }
}

/// Where a mesh came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshMetadata {
    /// Kind of the node that produced the geometry (the chain's terminal)
    pub source: Option<NodeKind>,
    /// Number of transforms folded above the source node
    pub chain_length: usize,
    /// Cache fingerprint, when the result went through the geometry cache
    pub fingerprint: Option<String>,
}

/// Indexed triangle mesh in render-ready buffers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Flat `xyz` triples
    pub positions: Vec<f32>,
    /// Three indices per triangle, counter-clockwise seen from outside
    pub indices: Vec<u32>,
    /// Per-vertex normals, same layout as `positions`
    pub normals: Option<Vec<f32>>,
    /// Unbaked transform, when the caller asked to keep one
    pub transform: Option<MeshTransform>,
    pub metadata: MeshMetadata,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self::new()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(triangle_count * 3),
            ..Self::default()
        }
    }

    /// Build a mesh from points and triangles, computing normals
    pub fn from_triangles(points: &[Point3<f64>], triangles: &[[u32; 3]]) -> Self {
        let mut mesh = Self::with_capacity(points.len(), triangles.len());
        for point in points {
            mesh.add_vertex(*point);
        }
        for triangle in triangles {
            mesh.add_triangle(*triangle);
        }
        mesh.recompute_normals();
        mesh
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, position: Point3<f64>) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions
            .extend_from_slice(&[position.x as f32, position.y as f32, position.z as f32]);
        index
    }

    pub fn add_triangle(&mut self, triangle: [u32; 3]) {
        self.indices.extend_from_slice(&triangle);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn position(&self, index: u32) -> Point3<f64> {
        let i = index as usize * 3;
        Point3::new(
            self.positions[i] as f64,
            self.positions[i + 1] as f64,
            self.positions[i + 2] as f64,
        )
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
    }

    /// Bake `matrix` into the vertex positions.
    ///
    /// Orientation-reversing matrices (mirrors, negative scales) also flip the
    /// triangle winding so faces keep pointing outwards.
    pub fn apply_matrix(&mut self, matrix: &Matrix4) {
        for chunk in self.positions.chunks_exact_mut(3) {
            let p = Point3::new(chunk[0] as f64, chunk[1] as f64, chunk[2] as f64);
            let p = matrix.transform_point(&p);
            chunk[0] = p.x as f32;
            chunk[1] = p.y as f32;
            chunk[2] = p.z as f32;
        }

        if matrix.fixed_view::<3, 3>(0, 0).determinant() < 0.0 {
            for tri in self.indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
        }

        if self.normals.is_some() {
            self.recompute_normals();
        }
    }

    /// Keep `matrix` for the consumer instead of baking it, composed on the
    /// outside of any transform already attached
    pub fn attach_transform(&mut self, matrix: &Matrix4) {
        let combined = match &self.transform {
            Some(existing) => matrix * existing.to_matrix(),
            None => *matrix,
        };
        self.transform = Some(MeshTransform::from_matrix(combined));
    }

    /// Append another mesh's geometry (no boolean resolution)
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertex_count() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.indices
            .extend(other.indices.iter().map(|index| index + offset));
        if self.normals.is_some() || other.normals.is_some() {
            self.recompute_normals();
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_positions(&self.positions)
    }

    /// Recompute area-weighted vertex normals from triangle geometry
    pub fn recompute_normals(&mut self) {
        let mut sums: Vec<Vector3<f64>> = vec![Vector3::zeros(); self.vertex_count()];

        for [a, b, c] in self.triangles() {
            let p0 = self.position(a);
            let face = (self.position(b) - p0).cross(&(self.position(c) - p0));
            // Unnormalized cross product already weights by area
            if face.norm() > 1e-12 {
                for index in [a, b, c] {
                    sums[index as usize] += face;
                }
            }
        }

        let mut normals = Vec::with_capacity(self.positions.len());
        for sum in sums {
            let n = sum
                .try_normalize(1e-12)
                .unwrap_or_else(|| Vector3::new(0.0, 0.0, 1.0));
            normals.extend_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
        }
        self.normals = Some(normals);
    }

    /// Signed volume enclosed by the mesh (divergence theorem)
    pub fn volume(&self) -> f64 {
        self.triangles()
            .map(|[a, b, c]| {
                let (p0, p1, p2) = (self.position(a), self.position(b), self.position(c));
                p0.coords.dot(&p1.coords.cross(&p2.coords)) / 6.0
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> Mesh {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        Mesh::from_triangles(&points, &[[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]])
    }

    #[test]
    fn test_counts_and_volume() {
        let mesh = tetrahedron();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 4);
        assert!((mesh.volume() - 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_mirror_keeps_positive_volume() {
        let mut mesh = tetrahedron();
        let mirror = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));
        mesh.apply_matrix(&mirror);
        assert!(mesh.volume() > 0.0);
        assert!(mesh.bounding_box().min.x < 0.0);
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut a = tetrahedron();
        let b = tetrahedron();
        a.merge(&b);
        assert_eq!(a.vertex_count(), 8);
        assert_eq!(a.triangles().last(), Some([5, 6, 7]));
    }

    #[test]
    fn test_attach_translation() {
        let mut mesh = tetrahedron();
        mesh.attach_transform(&Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0)));
        assert_eq!(mesh.transform, Some(MeshTransform::Translation([1.0, 2.0, 3.0])));

        mesh.attach_transform(&Matrix4::new_scaling(2.0));
        match mesh.transform {
            Some(MeshTransform::Matrix(m)) => assert_eq!(m[(0, 3)], 2.0),
            other => panic!("expected matrix, got {:?}", other),
        }
    }
}
