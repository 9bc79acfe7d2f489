// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CSG (Constructive Solid Geometry) operations using BSP trees
//!
//! Each operand is turned into a BSP tree of convex polygons; the trees clip
//! each other and the surviving polygons are triangulated back into a mesh.

use super::kernel::{BooleanKernel, CancelToken, KernelError};
use crate::ast::BooleanKind;
use crate::geometry::Mesh;
use nalgebra::{Point3, Vector3};

/// Plane thickness used when classifying points
const EPSILON: f64 = 1e-5;

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

#[derive(Debug, Clone)]
struct Plane {
    normal: Vector3<f64>,
    w: f64,
}

impl Plane {
    /// `None` for collinear points
    fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Self> {
        let normal = (b - a).cross(&(c - a)).try_normalize(1e-12)?;
        Some(Self {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    fn classify(&self, point: &Point3<f64>) -> u8 {
        let t = self.normal.dot(&point.coords) - self.w;
        if t < -EPSILON {
            BACK
        } else if t > EPSILON {
            FRONT
        } else {
            COPLANAR
        }
    }

    /// Sort `polygon` into the four buckets, splitting it when it straddles
    /// the plane
    fn split_polygon(
        &self,
        polygon: Polygon,
        coplanar_front: &mut Vec<Polygon>,
        coplanar_back: &mut Vec<Polygon>,
        front: &mut Vec<Polygon>,
        back: &mut Vec<Polygon>,
    ) {
        let types: Vec<u8> = polygon
            .vertices
            .iter()
            .map(|v| self.classify(v))
            .collect();
        let polygon_type = types.iter().fold(COPLANAR, |acc, t| acc | t);

        match polygon_type {
            COPLANAR => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    coplanar_front.push(polygon);
                } else {
                    coplanar_back.push(polygon);
                }
            }
            FRONT => front.push(polygon),
            BACK => back.push(polygon),
            _ => {
                let count = polygon.vertices.len();
                let mut f = Vec::with_capacity(count + 1);
                let mut b = Vec::with_capacity(count + 1);

                for i in 0..count {
                    let j = (i + 1) % count;
                    let (ti, tj) = (types[i], types[j]);
                    let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);

                    if ti != BACK {
                        f.push(vi);
                    }
                    if ti != FRONT {
                        b.push(vi);
                    }
                    if ti | tj == SPANNING {
                        let t = (self.w - self.normal.dot(&vi.coords))
                            / self.normal.dot(&(vj - vi));
                        let v = vi + (vj - vi) * t;
                        f.push(v);
                        b.push(v);
                    }
                }

                if let Some(p) = Polygon::with_plane(f, polygon.plane.clone()) {
                    front.push(p);
                }
                if let Some(p) = Polygon::with_plane(b, polygon.plane) {
                    back.push(p);
                }
            }
        }
    }
}

/// Convex planar polygon, counter-clockwise seen from the front
#[derive(Debug, Clone)]
struct Polygon {
    vertices: Vec<Point3<f64>>,
    plane: Plane,
}

impl Polygon {
    /// `None` for degenerate (zero-area) input
    fn new(vertices: Vec<Point3<f64>>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        let plane = Plane::from_points(&vertices[0], &vertices[1], &vertices[2])?;
        Some(Self { vertices, plane })
    }

    fn with_plane(vertices: Vec<Point3<f64>>, plane: Plane) -> Option<Self> {
        (vertices.len() >= 3).then_some(Self { vertices, plane })
    }

    fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }
}

#[derive(Debug, Clone, Default)]
struct BspNode {
    plane: Option<Plane>,
    front: Option<Box<BspNode>>,
    back: Option<Box<BspNode>>,
    polygons: Vec<Polygon>,
}

impl BspNode {
    fn new(polygons: Vec<Polygon>) -> Self {
        let mut node = Self::default();
        node.build(polygons);
        node
    }

    fn build(&mut self, polygons: Vec<Polygon>) {
        if polygons.is_empty() {
            return;
        }
        let plane = self
            .plane
            .get_or_insert_with(|| polygons[0].plane.clone())
            .clone();

        let mut front = Vec::new();
        let mut back = Vec::new();
        let mut coplanar_front = Vec::new();
        let mut coplanar_back = Vec::new();
        for polygon in polygons {
            plane.split_polygon(
                polygon,
                &mut coplanar_front,
                &mut coplanar_back,
                &mut front,
                &mut back,
            );
        }
        self.polygons.append(&mut coplanar_front);
        self.polygons.append(&mut coplanar_back);

        if !front.is_empty() {
            self.front.get_or_insert_with(Box::default).build(front);
        }
        if !back.is_empty() {
            self.back.get_or_insert_with(Box::default).build(back);
        }
    }

    /// Convert solid space to empty space and back
    fn invert(&mut self) {
        for polygon in &mut self.polygons {
            polygon.flip();
        }
        if let Some(plane) = &mut self.plane {
            plane.flip();
        }
        if let Some(front) = &mut self.front {
            front.invert();
        }
        if let Some(back) = &mut self.back {
            back.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Remove the parts of `polygons` that lie inside this tree's solid
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let Some(plane) = &self.plane else {
            return polygons;
        };

        let mut front = Vec::new();
        let mut back = Vec::new();
        for polygon in polygons {
            // Coplanar polygons go with the side their normal faces
            let (mut coplanar_front, mut coplanar_back) = (Vec::new(), Vec::new());
            plane.split_polygon(
                polygon,
                &mut coplanar_front,
                &mut coplanar_back,
                &mut front,
                &mut back,
            );
            front.append(&mut coplanar_front);
            back.append(&mut coplanar_back);
        }

        let mut front = match &self.front {
            Some(node) => node.clip_polygons(front),
            None => front,
        };
        let back = match &self.back {
            Some(node) => node.clip_polygons(back),
            None => Vec::new(),
        };
        front.extend(back);
        front
    }

    fn clip_to(&mut self, other: &BspNode) {
        self.polygons = other.clip_polygons(std::mem::take(&mut self.polygons));
        if let Some(front) = &mut self.front {
            front.clip_to(other);
        }
        if let Some(back) = &mut self.back {
            back.clip_to(other);
        }
    }

    fn all_polygons(&self) -> Vec<Polygon> {
        let mut result = self.polygons.clone();
        if let Some(front) = &self.front {
            result.extend(front.all_polygons());
        }
        if let Some(back) = &self.back {
            result.extend(back.all_polygons());
        }
        result
    }
}

/// Convert mesh to polygons, dropping zero-area triangles
fn mesh_to_polygons(mesh: &Mesh) -> Vec<Polygon> {
    mesh.triangles()
        .filter_map(|[a, b, c]| {
            Polygon::new(vec![mesh.position(a), mesh.position(b), mesh.position(c)])
        })
        .collect()
}

/// Convert polygons back to a mesh, fanning each convex polygon
fn polygons_to_mesh(polygons: &[Polygon]) -> Mesh {
    let mut mesh = Mesh::new();
    for polygon in polygons {
        let first = mesh.add_vertex(polygon.vertices[0]);
        let mut previous = mesh.add_vertex(polygon.vertices[1]);
        for vertex in &polygon.vertices[2..] {
            let current = mesh.add_vertex(*vertex);
            mesh.add_triangle([first, previous, current]);
            previous = current;
        }
    }
    mesh
}

/// Default kernel: BSP-tree polygon clipping
#[derive(Debug, Clone, Copy, Default)]
pub struct BspKernel;

impl BspKernel {
    pub fn new() -> Self {
        Self
    }
}

impl BooleanKernel for BspKernel {
    fn name(&self) -> &str {
        "bsp"
    }

    fn apply(
        &self,
        op: BooleanKind,
        a: &Mesh,
        b: &Mesh,
        cancel: &CancelToken,
    ) -> Result<Mesh, KernelError> {
        // Disjoint operands need no clipping
        if !a.bounding_box().intersects(&b.bounding_box()) {
            return Ok(match op {
                BooleanKind::Union => {
                    let mut merged = a.clone();
                    merged.merge(b);
                    merged
                }
                BooleanKind::Difference => a.clone(),
                BooleanKind::Intersection => Mesh::empty(),
            });
        }

        let mut tree_a = BspNode::new(mesh_to_polygons(a));
        let mut tree_b = BspNode::new(mesh_to_polygons(b));
        cancel.check()?;

        match op {
            BooleanKind::Union => {
                tree_a.clip_to(&tree_b);
                tree_b.clip_to(&tree_a);
                cancel.check()?;
                tree_b.invert();
                tree_b.clip_to(&tree_a);
                tree_b.invert();
                tree_a.build(tree_b.all_polygons());
            }
            BooleanKind::Difference => {
                tree_a.invert();
                tree_a.clip_to(&tree_b);
                tree_b.clip_to(&tree_a);
                cancel.check()?;
                tree_b.invert();
                tree_b.clip_to(&tree_a);
                tree_b.invert();
                tree_a.build(tree_b.all_polygons());
                tree_a.invert();
            }
            BooleanKind::Intersection => {
                tree_a.invert();
                tree_b.clip_to(&tree_a);
                tree_b.invert();
                cancel.check()?;
                tree_a.clip_to(&tree_b);
                tree_b.clip_to(&tree_a);
                tree_a.build(tree_b.all_polygons());
                tree_a.invert();
            }
        }
        cancel.check()?;

        Ok(polygons_to_mesh(&tree_a.all_polygons()))
    }
}
