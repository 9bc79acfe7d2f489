// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Transform chain and matrix composition tests

use anyhow::Result;
use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use scadcore::ast::AstNode;
use scadcore::transform::{
    compose_matrix, extract_chain, multiply_column_major, to_column_major, RotateAngle,
    Terminal, TransformOp, IDENTITY,
};

#[test]
fn test_empty_composition_is_exact_identity() -> Result<()> {
    let matrix = compose_matrix(&[])?;
    assert_eq!(to_column_major(&matrix), IDENTITY);
    Ok(())
}

#[test]
fn test_translate_then_rotate_keeps_translation() -> Result<()> {
    let node = AstNode::call("translate").positional([1.0, 2.0, 3.0]).child(
        AstNode::call("rotate")
            .positional([0.0, 0.0, 90.0])
            .child(AstNode::call("cube")),
    );

    let chain = extract_chain(&node)?;
    let m = to_column_major(&compose_matrix(&chain.operations)?);
    assert_eq!(&m[12..15], &[1.0, 2.0, 3.0]);

    // The rotation part turns x into y
    let p = compose_matrix(&chain.operations)?.transform_point(&Point3::new(1.0, 0.0, 0.0));
    assert_relative_eq!(p, Point3::new(1.0, 3.0, 3.0), epsilon = 1e-12);
    Ok(())
}

#[test]
fn test_scale_then_translate_scales_translation() -> Result<()> {
    let matrix = compose_matrix(&[
        TransformOp::Scale(Vector3::new(2.0, 3.0, 4.0)),
        TransformOp::Translate(Vector3::new(5.0, 6.0, 7.0)),
    ])?;
    assert_eq!(&to_column_major(&matrix)[12..15], &[10.0, 18.0, 28.0]);
    Ok(())
}

#[test]
fn test_bare_primitive_chain() -> Result<()> {
    let node = AstNode::call("sphere").arg("r", 5.0);
    let chain = extract_chain(&node)?;
    assert_eq!(chain.len(), 0);
    assert!(matches!(chain.terminal, Terminal::Node(terminal) if std::ptr::eq(terminal, &node)));
    Ok(())
}

#[test]
fn test_raw_multiply_matches_composition() -> Result<()> {
    let a = TransformOp::Rotate(RotateAngle::Scalar(30.0));
    let b = TransformOp::Translate(Vector3::new(4.0, -1.0, 2.0));

    let composed = to_column_major(&compose_matrix(&[a.clone(), b.clone()])?);
    let raw = multiply_column_major(
        &to_column_major(&compose_matrix(&[a])?),
        &to_column_major(&compose_matrix(&[b])?),
    );
    for (x, y) in composed.iter().zip(raw.iter()) {
        assert_relative_eq!(*x, *y, epsilon = 1e-12);
    }
    Ok(())
}

#[test]
fn test_multmatrix_from_ast() -> Result<()> {
    use scadcore::ast::Expr;

    let rows = Expr::Vector(vec![
        [1.0, 0.0, 0.0, 7.0].into(),
        [0.0, 1.0, 0.0, 8.0].into(),
        [0.0, 0.0, 1.0, 9.0].into(),
    ]);
    let node = AstNode::call("multmatrix").positional(rows).child(AstNode::call("cube"));

    let matrix = compose_matrix(&extract_chain(&node)?.operations)?;
    let m = to_column_major(&matrix);
    assert_eq!(&m[12..16], &[7.0, 8.0, 9.0, 1.0]);
    Ok(())
}

#[test]
fn test_non_finite_values_propagate() -> Result<()> {
    let matrix = compose_matrix(&[TransformOp::Translate(Vector3::new(f64::INFINITY, 0.0, 0.0))])?;
    assert!(to_column_major(&matrix)[12].is_infinite());
    Ok(())
}
