// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Transformation chain extraction

use super::{RotateAngle, TransformOp};
use crate::ast::{AstNode, NodeKind, TransformKind, Value};
use crate::error::{ConversionError, ConversionResult};
use crate::scope::{ResolvedArgs, ScopeResolver};
use nalgebra::Vector3;

/// Where a chain of transforms bottoms out
#[derive(Debug, Clone, Copy)]
pub enum Terminal<'a> {
    /// First non-transform node below the chain
    Node(&'a AstNode),
    /// Children of a transform that has more than one; converted as an
    /// implicit union
    Group(&'a [AstNode]),
}

/// Consecutive transforms above a terminal node, outermost first
#[derive(Debug, Clone)]
pub struct TransformationChain<'a> {
    pub operations: Vec<TransformOp>,
    pub terminal: Terminal<'a>,
}

impl<'a> TransformationChain<'a> {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// A zero-length chain: nothing to fold, convert the terminal as is
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// `None` for a zero-length chain, so a chain that is present always
    /// carries at least one operation
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Extract the chain starting at `node`, with literal arguments only
pub fn extract_chain(node: &AstNode) -> ConversionResult<TransformationChain<'_>> {
    extract_chain_in(node, &ScopeResolver::new())
}

/// Extract the chain starting at `node`, resolving variable references in
/// transform arguments through `scope`
pub fn extract_chain_in<'a>(
    node: &'a AstNode,
    scope: &ScopeResolver,
) -> ConversionResult<TransformationChain<'a>> {
    let mut operations = Vec::new();
    let mut current = node;

    loop {
        let NodeKind::Transform(kind) = current.kind else {
            return Ok(TransformationChain {
                operations,
                terminal: Terminal::Node(current),
            });
        };

        let args = ResolvedArgs::resolve(current, scope)?;
        operations.push(operation_from_args(kind, &args)?);

        match current.children.as_slice() {
            [] => return Err(ConversionError::DanglingTransform { kind }),
            [only] => current = only,
            many => {
                return Ok(TransformationChain {
                    operations,
                    terminal: Terminal::Group(many),
                })
            }
        }
    }
}

fn operation_from_args(kind: TransformKind, args: &ResolvedArgs) -> ConversionResult<TransformOp> {
    Ok(match kind {
        TransformKind::Translate => TransformOp::Translate(
            read_vector(kind, args.get("v"), 0.0)?.unwrap_or_else(Vector3::zeros),
        ),
        TransformKind::Scale => TransformOp::Scale(match args.get("v") {
            Some(Value::Number(s)) => Vector3::new(*s, *s, *s),
            other => {
                read_vector(kind, other, 1.0)?.unwrap_or_else(|| Vector3::new(1.0, 1.0, 1.0))
            }
        }),
        TransformKind::Mirror => {
            TransformOp::Mirror(read_vector(kind, args.get("v"), 0.0)?.unwrap_or_else(Vector3::x))
        }
        TransformKind::Rotate => TransformOp::Rotate(match args.get("a") {
            None => RotateAngle::Scalar(0.0),
            Some(Value::Number(angle)) => match read_vector(kind, args.get("v"), 0.0)? {
                Some(axis) => RotateAngle::Axis {
                    angle: *angle,
                    axis,
                },
                None => RotateAngle::Scalar(*angle),
            },
            Some(value) => match numbers(kind, value)?.as_slice() {
                [x] => RotateAngle::Euler(Vector3::new(*x, 0.0, 0.0)),
                [x, y] => RotateAngle::Euler(Vector3::new(*x, *y, 0.0)),
                [x, y, z] => RotateAngle::Euler(Vector3::new(*x, *y, *z)),
                other => {
                    return Err(ConversionError::malformed(
                        kind,
                        format!("expected up to 3 angles, got {}", other.len()),
                    ))
                }
            },
        }),
        TransformKind::Multmatrix => TransformOp::Multmatrix(match args.get("m") {
            None => vec![[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]],
            Some(value) => read_rows(value)?,
        }),
    })
}

fn numbers(kind: TransformKind, value: &Value) -> ConversionResult<Vec<f64>> {
    value.as_numbers().ok_or_else(|| {
        ConversionError::malformed(kind, format!("expected a numeric vector, got {}", value))
    })
}

/// A 2- or 3-component vector; a missing z takes `fill`
fn read_vector(
    kind: TransformKind,
    value: Option<&Value>,
    fill: f64,
) -> ConversionResult<Option<Vector3<f64>>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let items = numbers(kind, value)?;
    match items.as_slice() {
        [x, y] => Ok(Some(Vector3::new(*x, *y, fill))),
        [x, y, z] => Ok(Some(Vector3::new(*x, *y, *z))),
        _ => Err(ConversionError::malformed(
            kind,
            format!("expected 2 or 3 components, got {}", items.len()),
        )),
    }
}

fn read_rows(value: &Value) -> ConversionResult<Vec<[f64; 4]>> {
    let kind = TransformKind::Multmatrix;
    let Value::Vector(rows) = value else {
        return Err(ConversionError::malformed(
            kind,
            format!("expected a matrix, got {}", value.type_name()),
        ));
    };
    if rows.len() != 3 && rows.len() != 4 {
        return Err(ConversionError::malformed(
            kind,
            format!("expected 3 or 4 rows, got {}", rows.len()),
        ));
    }

    rows.iter()
        .map(|row| match numbers(kind, row)?.as_slice() {
            [a, b, c] => Ok([*a, *b, *c, 0.0]),
            [a, b, c, d] => Ok([*a, *b, *c, *d]),
            other => Err(ConversionError::malformed(
                kind,
                format!("expected rows of 3 or 4 numbers, got {}", other.len()),
            )),
        })
        .collect()
}
