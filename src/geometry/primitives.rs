// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric primitives generator
//!
//! Zero-sized shapes are valid and produce an empty mesh; negative sizes are
//! rejected.

use super::Mesh;
use crate::ast::{PrimitiveKind, Value};
use crate::error::{ConversionError, ConversionResult};
use crate::scope::{
    fragment_count, ResolvedArgs, ScopeResolver, DEFAULT_FA, DEFAULT_FN, DEFAULT_FS, MAX_FRAGMENTS,
};
use nalgebra::{Point2, Point3, Vector3};
use std::f64::consts::PI;

/// Generate the base mesh for a primitive node from its evaluated arguments
pub fn generate_primitive(
    kind: PrimitiveKind,
    args: &ResolvedArgs,
    scope: &ScopeResolver,
) -> ConversionResult<Mesh> {
    let mesh = match kind {
        PrimitiveKind::Cube => {
            let size = size3(kind, args)?;
            cube_mesh(size, args.flag("center"))
        }
        PrimitiveKind::Sphere => {
            let r = radius(kind, args, "r", "d")?.unwrap_or(1.0);
            sphere_mesh(r, fragments(args, scope, r))
        }
        PrimitiveKind::Cylinder => {
            let h = non_negative(kind, "h", args.number("h").unwrap_or(1.0))?;
            let base = radius(kind, args, "r", "d")?.unwrap_or(1.0);
            let r1 = radius(kind, args, "r1", "d1")?.unwrap_or(base);
            let r2 = radius(kind, args, "r2", "d2")?.unwrap_or(base);
            let segments = fragments(args, scope, r1.max(r2));
            cone_mesh(h, r1, r2, segments, args.flag("center"))
        }
        PrimitiveKind::Polyhedron => polyhedron_mesh(args)?,
        PrimitiveKind::Square => {
            let size = size2(kind, args)?;
            square_mesh(size, args.flag("center"))
        }
        PrimitiveKind::Circle => {
            let r = radius(kind, args, "r", "d")?.unwrap_or(1.0);
            let outline = circle_outline(r, fragments(args, scope, r));
            planar_mesh(&outline)
        }
        PrimitiveKind::Polygon => polygon_mesh(args)?,
    };
    Ok(mesh)
}

fn non_negative(kind: PrimitiveKind, parameter: &str, value: f64) -> ConversionResult<f64> {
    if value < 0.0 {
        Err(ConversionError::invalid(
            kind.name(),
            parameter,
            format!("must not be negative, got {}", value),
        ))
    } else {
        Ok(value)
    }
}

/// Radius from `r_name`, else half of `d_name`
fn radius(
    kind: PrimitiveKind,
    args: &ResolvedArgs,
    r_name: &str,
    d_name: &str,
) -> ConversionResult<Option<f64>> {
    if let Some(r) = args.number(r_name) {
        return non_negative(kind, r_name, r).map(Some);
    }
    match args.number(d_name) {
        Some(d) => non_negative(kind, d_name, d).map(|d| Some(d / 2.0)),
        None => Ok(None),
    }
}

/// `$fn`/`$fa`/`$fs` given on the call override the ones in scope
fn fragments(args: &ResolvedArgs, scope: &ScopeResolver, r: f64) -> u32 {
    fragment_count(
        args.number("$fn").unwrap_or_else(|| scope.number("$fn", DEFAULT_FN)),
        args.number("$fa").unwrap_or_else(|| scope.number("$fa", DEFAULT_FA)),
        args.number("$fs").unwrap_or_else(|| scope.number("$fs", DEFAULT_FS)),
        r,
    )
}

fn size3(kind: PrimitiveKind, args: &ResolvedArgs) -> ConversionResult<Vector3<f64>> {
    let size = match args.get("size") {
        None => Vector3::new(1.0, 1.0, 1.0),
        Some(Value::Number(s)) => Vector3::new(*s, *s, *s),
        Some(value) => match value.as_numbers().as_deref() {
            Some([x, y, z]) => Vector3::new(*x, *y, *z),
            _ => {
                return Err(ConversionError::invalid(
                    kind.name(),
                    "size",
                    format!("expected a number or 3-vector, got {}", value),
                ))
            }
        },
    };
    for (axis, component) in ["x", "y", "z"].iter().zip(size.iter()) {
        non_negative(kind, &format!("size.{}", axis), *component)?;
    }
    Ok(size)
}

fn size2(kind: PrimitiveKind, args: &ResolvedArgs) -> ConversionResult<(f64, f64)> {
    let size = match args.get("size") {
        None => (1.0, 1.0),
        Some(Value::Number(s)) => (*s, *s),
        Some(value) => match value.as_numbers().as_deref() {
            Some([x, y]) => (*x, *y),
            _ => {
                return Err(ConversionError::invalid(
                    kind.name(),
                    "size",
                    format!("expected a number or 2-vector, got {}", value),
                ))
            }
        },
    };
    non_negative(kind, "size.x", size.0)?;
    non_negative(kind, "size.y", size.1)?;
    Ok(size)
}

fn cube_mesh(size: Vector3<f64>, center: bool) -> Mesh {
    if size.iter().any(|s| *s == 0.0) {
        return Mesh::empty();
    }

    let min = if center { -size / 2.0 } else { Vector3::zeros() };
    let max = min + size;

    let points = [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ];

    let triangles = [
        // Top (z+)
        [4, 5, 6],
        [4, 6, 7],
        // Bottom (z-)
        [1, 0, 3],
        [1, 3, 2],
        // Right (x+)
        [5, 1, 2],
        [5, 2, 6],
        // Left (x-)
        [0, 4, 7],
        [0, 7, 3],
        // Back (y+)
        [7, 6, 2],
        [7, 2, 3],
        // Front (y-)
        [0, 1, 5],
        [0, 5, 4],
    ];

    Mesh::from_triangles(&points, &triangles)
}

/// Ring-stacked sphere without pole vertices: `(segments + 1) / 2` rings
/// placed at the middle of each latitude band
fn sphere_mesh(radius: f64, segments: u32) -> Mesh {
    if radius == 0.0 {
        return Mesh::empty();
    }

    let n = segments.clamp(3, MAX_FRAGMENTS);
    let rings = ((n + 1) / 2).max(2);
    let mut points = Vec::with_capacity(rings as usize * n as usize);

    for i in 0..rings {
        let phi = PI * (i as f64 + 0.5) / rings as f64;
        let z = radius * phi.cos();
        let ring_radius = radius * phi.sin();
        for j in 0..n {
            let theta = 2.0 * PI * j as f64 / n as f64;
            points.push(Point3::new(
                ring_radius * theta.cos(),
                ring_radius * theta.sin(),
                z,
            ));
        }
    }

    let index = |ring: u32, j: u32| ring * n + (j % n);
    let mut triangles = Vec::new();

    // Caps, fanned from the first vertex of the ring
    let last = rings - 1;
    for j in 1..n - 1 {
        triangles.push([index(0, 0), index(0, j), index(0, j + 1)]);
        triangles.push([index(last, 0), index(last, j + 1), index(last, j)]);
    }

    for ring in 0..last {
        for j in 0..n {
            let a = index(ring, j);
            let b = index(ring, j + 1);
            let c = index(ring + 1, j + 1);
            let d = index(ring + 1, j);
            triangles.push([a, d, c]);
            triangles.push([a, c, b]);
        }
    }

    Mesh::from_triangles(&points, &triangles)
}

/// Truncated cone from z=0 (r1) to z=h (r2); a zero radius collapses that end
/// to an apex
fn cone_mesh(height: f64, r1: f64, r2: f64, segments: u32, center: bool) -> Mesh {
    if height == 0.0 || (r1 == 0.0 && r2 == 0.0) {
        return Mesh::empty();
    }

    let n = segments.clamp(3, MAX_FRAGMENTS);
    let z0 = if center { -height / 2.0 } else { 0.0 };
    let z1 = z0 + height;
    let mut points = Vec::new();

    let mut ring = |r: f64, z: f64| -> Vec<u32> {
        if r == 0.0 {
            points.push(Point3::new(0.0, 0.0, z));
            return vec![points.len() as u32 - 1];
        }
        (0..n)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / n as f64;
                points.push(Point3::new(r * angle.cos(), r * angle.sin(), z));
                points.len() as u32 - 1
            })
            .collect()
    };

    let bottom = ring(r1, z0);
    let top = ring(r2, z1);
    let mut triangles = Vec::new();

    if bottom.len() > 1 {
        for j in 1..bottom.len() - 1 {
            triangles.push([bottom[0], bottom[j + 1], bottom[j]]);
        }
    }
    if top.len() > 1 {
        for j in 1..top.len() - 1 {
            triangles.push([top[0], top[j], top[j + 1]]);
        }
    }

    for i in 0..n as usize {
        let next = (i + 1) % n as usize;
        match (bottom.len() > 1, top.len() > 1) {
            (true, true) => {
                triangles.push([bottom[i], bottom[next], top[next]]);
                triangles.push([bottom[i], top[next], top[i]]);
            }
            (false, true) => triangles.push([bottom[0], top[next], top[i]]),
            (true, false) => triangles.push([bottom[i], bottom[next], top[0]]),
            (false, false) => unreachable!("both radii zero returns early"),
        }
    }

    Mesh::from_triangles(&points, &triangles)
}

fn polyhedron_mesh(args: &ResolvedArgs) -> ConversionResult<Mesh> {
    let kind = PrimitiveKind::Polyhedron;
    let points_value = args
        .get("points")
        .ok_or_else(|| ConversionError::missing(kind.name(), "points"))?;
    let faces_value = args
        .get("faces")
        .or_else(|| args.get("triangles"))
        .ok_or_else(|| ConversionError::missing(kind.name(), "faces"))?;

    let points = point_list::<3>(kind, "points", points_value)?;
    let Value::Vector(faces) = faces_value else {
        return Err(ConversionError::invalid(kind.name(), "faces", "expected a list of faces"));
    };

    let mut triangles = Vec::new();
    for face in faces {
        let indices = face.as_numbers().ok_or_else(|| {
            ConversionError::invalid(kind.name(), "faces", format!("bad face {}", face))
        })?;
        if indices.len() < 3 {
            return Err(ConversionError::invalid(
                kind.name(),
                "faces",
                format!("face {} has fewer than 3 points", face),
            ));
        }
        let mut face_indices = Vec::with_capacity(indices.len());
        for index in indices {
            if index < 0.0 || index.fract() != 0.0 || index as usize >= points.len() {
                return Err(ConversionError::invalid(
                    kind.name(),
                    "faces",
                    format!("index {} is out of range for {} points", index, points.len()),
                ));
            }
            face_indices.push(index as u32);
        }
        // Faces are listed clockwise seen from outside; emit counter-clockwise
        for j in 1..face_indices.len() - 1 {
            triangles.push([face_indices[0], face_indices[j + 1], face_indices[j]]);
        }
    }

    let points: Vec<Point3<f64>> = points
        .iter()
        .map(|p| Point3::new(p[0], p[1], p[2]))
        .collect();
    Ok(Mesh::from_triangles(&points, &triangles))
}

fn point_list<const N: usize>(
    kind: PrimitiveKind,
    parameter: &str,
    value: &Value,
) -> ConversionResult<Vec<[f64; N]>> {
    let Value::Vector(items) = value else {
        return Err(ConversionError::invalid(kind.name(), parameter, "expected a list of points"));
    };
    items
        .iter()
        .map(|item| {
            item.as_numbers()
                .and_then(|coords| <[f64; N]>::try_from(coords).ok())
                .ok_or_else(|| {
                    ConversionError::invalid(
                        kind.name(),
                        parameter,
                        format!("expected {}-component points, got {}", N, item),
                    )
                })
        })
        .collect()
}

fn square_mesh((x, y): (f64, f64), center: bool) -> Mesh {
    if x == 0.0 || y == 0.0 {
        return Mesh::empty();
    }
    let (x0, y0) = if center { (-x / 2.0, -y / 2.0) } else { (0.0, 0.0) };
    planar_mesh(&[
        Point2::new(x0, y0),
        Point2::new(x0 + x, y0),
        Point2::new(x0 + x, y0 + y),
        Point2::new(x0, y0 + y),
    ])
}

fn circle_outline(radius: f64, segments: u32) -> Vec<Point2<f64>> {
    if radius == 0.0 {
        return Vec::new();
    }
    (0..segments)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / segments as f64;
            Point2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

fn polygon_mesh(args: &ResolvedArgs) -> ConversionResult<Mesh> {
    let kind = PrimitiveKind::Polygon;
    let points_value = args
        .get("points")
        .ok_or_else(|| ConversionError::missing(kind.name(), "points"))?;
    let points = point_list::<2>(kind, "points", points_value)?;

    // Only the outer path is filled; holes are not cut
    let outline: Vec<Point2<f64>> = match args.get("paths") {
        Some(Value::Vector(paths)) if !paths.is_empty() => {
            let path = paths[0].as_numbers().ok_or_else(|| {
                ConversionError::invalid(kind.name(), "paths", "expected index lists")
            })?;
            path.iter()
                .map(|&i| {
                    points
                        .get(i as usize)
                        .filter(|_| i >= 0.0)
                        .map(|p| Point2::new(p[0], p[1]))
                        .ok_or_else(|| {
                            ConversionError::invalid(
                                kind.name(),
                                "paths",
                                format!("index {} out of range", i),
                            )
                        })
                })
                .collect::<ConversionResult<_>>()?
        }
        _ => points.iter().map(|p| Point2::new(p[0], p[1])).collect(),
    };

    Ok(planar_mesh(&outline))
}

fn signed_area(outline: &[Point2<f64>]) -> f64 {
    (0..outline.len())
        .map(|i| {
            let (a, b) = (outline[i], outline[(i + 1) % outline.len()]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

/// Flat mesh in the z=0 plane facing +z, triangulated by ear clipping
fn planar_mesh(outline: &[Point2<f64>]) -> Mesh {
    if outline.len() < 3 || signed_area(outline).abs() < f64::EPSILON {
        return Mesh::empty();
    }

    let mut order: Vec<usize> = (0..outline.len()).collect();
    if signed_area(outline) < 0.0 {
        order.reverse();
    }

    let cross = |o: Point2<f64>, a: Point2<f64>, b: Point2<f64>| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut triangles = Vec::new();
    let mut guard = order.len() * order.len();
    while order.len() > 3 && guard > 0 {
        guard -= 1;
        let count = order.len();
        let ear = (0..count).find(|&i| {
            let (prev, cur, next) = (
                outline[order[(i + count - 1) % count]],
                outline[order[i]],
                outline[order[(i + 1) % count]],
            );
            if cross(prev, cur, next) <= 0.0 {
                return false;
            }
            order.iter().all(|&k| {
                let p = outline[k];
                p == prev
                    || p == cur
                    || p == next
                    || !(cross(prev, cur, p) >= 0.0
                        && cross(cur, next, p) >= 0.0
                        && cross(next, prev, p) >= 0.0)
            })
        });

        // Self-intersecting outlines have no ear; fall back to a fan
        let i = ear.unwrap_or(1);
        triangles.push([
            order[(i + count - 1) % count] as u32,
            order[i] as u32,
            order[(i + 1) % count] as u32,
        ]);
        order.remove(i);
    }
    if order.len() == 3 {
        triangles.push([order[0] as u32, order[1] as u32, order[2] as u32]);
    }

    let points: Vec<Point3<f64>> = outline.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
    Mesh::from_triangles(&points, &triangles)
}
