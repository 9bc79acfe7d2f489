// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! End-to-end conversion tests

use approx::assert_relative_eq;
use scadcore::ast::{AstNode, BinaryOp, Expr, ModuleDefinition, NodeKind, Program};
use scadcore::geometry::MeshTransform;
use scadcore::transform::RotationMode;
use scadcore::{ConversionConfig, ConversionError, Converter};

fn converter() -> Converter {
    Converter::new(ConversionConfig::default())
}

#[test]
fn test_three_primitives_convert_independently() {
    let program = Program::new(vec![
        AstNode::call("cube").positional([10.0, 10.0, 10.0]),
        AstNode::call("sphere").arg("r", 5.0),
        AstNode::call("cylinder").arg("h", 15.0).arg("r", 3.0),
    ]);

    let results = converter().convert_program(&program);
    assert_eq!(results.len(), 3);

    for (result, name) in results.iter().zip(["cube", "sphere", "cylinder"]) {
        let mesh = result.as_ref().expect("primitive converts");
        assert_eq!(mesh.metadata.source, Some(NodeKind::from_name(name)));
        assert_eq!(mesh.metadata.chain_length, 0);
        assert!(mesh.transform.is_none());
        assert!(!mesh.is_empty());
    }
}

#[test]
fn test_failing_statement_is_isolated() {
    let program = Program::new(vec![
        AstNode::call("cube").positional([10.0, 10.0, 10.0]),
        AstNode::call("invalid_function"),
        AstNode::call("sphere").arg("r", 5.0),
    ]);

    let results = converter().convert_program(&program);
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(
        &results[1],
        Err(ConversionError::UnknownNodeKind(name)) if name == "invalid_function"
    ));
    assert_eq!(
        results[2].as_ref().unwrap().metadata.source,
        Some(NodeKind::from_name("sphere"))
    );
}

#[test]
fn test_degenerate_geometry_is_not_an_error() {
    let program = Program::new(vec![
        AstNode::call("cube").positional([0.0, 0.0, 0.0]),
        AstNode::call("sphere").arg("r", 0.0),
    ]);
    for result in converter().convert_program(&program) {
        assert!(result.unwrap().is_empty());
    }
}

#[test]
fn test_transforms_are_baked() {
    let node = AstNode::call("translate")
        .positional([5.0, 0.0, 0.0])
        .child(AstNode::call("scale").positional(2.0).child(AstNode::call("cube")));

    let mesh = converter().convert(&node).unwrap();
    let bbox = mesh.bounding_box();
    assert_relative_eq!(bbox.min.x, 5.0, epsilon = 1e-6);
    assert_relative_eq!(bbox.max.x, 7.0, epsilon = 1e-6);
    assert_eq!(mesh.metadata.chain_length, 2);
    assert_eq!(mesh.metadata.source, Some(NodeKind::from_name("cube")));
    assert!(mesh.transform.is_none());
}

#[test]
fn test_top_level_transform_attached_when_not_baking() {
    let config = ConversionConfig {
        bake_transforms: false,
        ..ConversionConfig::default()
    };
    let node = AstNode::call("translate")
        .positional([5.0, 0.0, 0.0])
        .child(AstNode::call("cube"));

    let mesh = Converter::new(config).convert(&node).unwrap();
    assert_eq!(mesh.transform, Some(MeshTransform::Translation([5.0, 0.0, 0.0])));
    assert_relative_eq!(mesh.bounding_box().min.x, 0.0);
    assert_eq!(mesh.metadata.chain_length, 1);
}

#[test]
fn test_mirror_keeps_solid_outward() {
    let node = AstNode::call("mirror")
        .positional([1.0, 0.0, 0.0])
        .child(AstNode::call("translate").positional([1.0, 0.0, 0.0]).child(AstNode::call("cube")));

    let mesh = converter().convert(&node).unwrap();
    let bbox = mesh.bounding_box();
    assert_relative_eq!(bbox.min.x, -2.0, epsilon = 1e-6);
    assert_relative_eq!(bbox.max.x, -1.0, epsilon = 1e-6);
    assert_relative_eq!(mesh.volume(), 1.0, epsilon = 1e-5);
}

#[test]
fn test_euler_rotation_modes() {
    let node = AstNode::call("rotate")
        .positional([90.0, 0.0, 0.0])
        .child(AstNode::call("cube").positional([1.0, 2.0, 3.0]));

    // Only the Z angle is honored by default
    let default = converter().convert(&node).unwrap().bounding_box();
    assert_relative_eq!(default.size().y, 2.0, epsilon = 1e-6);

    let config = ConversionConfig {
        rotation_mode: RotationMode::FullEuler,
        ..ConversionConfig::default()
    };
    let full = Converter::new(config).convert(&node).unwrap().bounding_box();
    assert_relative_eq!(full.size().y, 3.0, epsilon = 1e-5);
    assert_relative_eq!(full.size().z, 2.0, epsilon = 1e-5);
}

#[test]
fn test_program_variables() {
    let program = Program::new(vec![
        AstNode::call("cube").positional(Expr::Vector(vec![
            Expr::var("w"),
            Expr::binary(BinaryOp::Mul, Expr::var("w"), 2.0),
            1.0.into(),
        ])),
        AstNode::call("sphere").arg("r", Expr::var("missing")),
    ])
    .assign("w", 4.0);

    let results = converter().convert_program(&program);
    let size = results[0].as_ref().unwrap().bounding_box().size();
    assert_relative_eq!(size.x, 4.0);
    assert_relative_eq!(size.y, 8.0);
    assert!(matches!(
        &results[1],
        Err(ConversionError::UndefinedVariable(name)) if name == "missing"
    ));
}

#[test]
fn test_program_level_fragments() {
    let program = Program::new(vec![AstNode::call("circle").arg("r", 10.0)]).assign("$fn", 6.0);
    let results = converter().convert_program(&program);
    assert_eq!(results[0].as_ref().unwrap().vertex_count(), 6);

    let config = ConversionConfig {
        default_fragments: Some(8),
        ..ConversionConfig::default()
    };
    let mesh = Converter::new(config)
        .convert(&AstNode::call("circle").arg("r", 10.0))
        .unwrap();
    assert_eq!(mesh.vertex_count(), 8);
}

fn box_module() -> ModuleDefinition {
    ModuleDefinition::new(vec![AstNode::call("cube").positional(Expr::var("doubled"))])
        .param("size", Some(2.0.into()))
        .assign("doubled", Expr::binary(BinaryOp::Mul, Expr::var("size"), 2.0))
}

#[test]
fn test_module_calls_bind_arguments() {
    let program = Program::new(vec![
        AstNode::call("box"),
        AstNode::call("box").positional(5.0),
        AstNode::call("box").arg("size", 3.0).arg("colour", "red"),
        AstNode::call("cube").positional(Expr::var("size")),
    ])
    .assign("size", 7.0)
    .module("box", box_module());

    let results = converter().convert_program(&program);
    let widths: Vec<f64> = results
        .iter()
        .map(|r| r.as_ref().unwrap().bounding_box().size().x)
        .collect();
    // Parameters shadow the global `size`, which is untouched afterwards
    assert_eq!(widths, vec![4.0, 10.0, 6.0, 7.0]);
    assert_eq!(
        results[0].as_ref().unwrap().metadata.source,
        Some(NodeKind::ModuleCall("box".to_string()))
    );
}

#[test]
fn test_module_argument_sees_caller_scope() {
    let program = Program::new(vec![AstNode::call("box").positional(Expr::var("size"))])
        .assign("size", 1.5)
        .module("box", box_module());
    let results = converter().convert_program(&program);
    assert_relative_eq!(results[0].as_ref().unwrap().bounding_box().size().x, 3.0);
}

#[test]
fn test_self_recursive_module_hits_depth_limit() {
    let config = ConversionConfig {
        max_depth: 32,
        ..ConversionConfig::default()
    };
    let program = Program::new(vec![AstNode::call("forever"), AstNode::call("cube")])
        .module("forever", ModuleDefinition::new(vec![AstNode::call("forever")]));

    let results = Converter::new(config).convert_program(&program);
    assert!(matches!(
        results[0],
        Err(ConversionError::RecursionLimitExceeded { limit: 32 })
    ));
    assert!(results[1].is_ok());
}

#[test]
fn test_default_depth_limit_is_reported() {
    let program = Program::new(vec![AstNode::call("forever"), AstNode::call("cube")])
        .module("forever", ModuleDefinition::new(vec![AstNode::call("forever")]));

    for parallel in [true, false] {
        let config = ConversionConfig {
            parallel,
            ..ConversionConfig::default()
        };
        assert_eq!(config.max_depth, 256);

        let results = Converter::new(config).convert_program(&program);
        assert!(matches!(
            results[0],
            Err(ConversionError::RecursionLimitExceeded { limit: 256 })
        ));
        assert!(results[1].is_ok());
    }

    let result = converter().convert(&AstNode::call("forever"));
    assert!(result.is_err());
}

#[test]
fn test_bad_global_assignment_is_skipped() {
    let program = Program::new(vec![
        AstNode::call("cube").positional(Expr::var("x")),
        AstNode::call("sphere").arg("r", 2.0),
        AstNode::call("cube").positional(Expr::var("y")),
    ])
    .assign("x", 1.0)
    .assign("x", 2.0)
    .assign("y", Expr::var("nope"));

    let results = converter().convert_program(&program);
    assert_relative_eq!(results[0].as_ref().unwrap().bounding_box().size().x, 1.0);
    assert!(results[1].is_ok());
    assert!(matches!(
        &results[2],
        Err(ConversionError::UndefinedVariable(name)) if name == "y"
    ));
}

#[test]
fn test_seed_scope_uses_configured_fragments() {
    let config = ConversionConfig {
        default_fragments: Some(12),
        ..ConversionConfig::default()
    };
    let program = Program::new(vec![]).assign("r", 3.0);
    let scope = Converter::new(config).seed_scope(&program);

    assert_eq!(scope.fragments(10.0), 12);
    assert_eq!(scope.number("r", 0.0), 3.0);
}

#[test]
fn test_transform_with_several_children_is_a_union() {
    let node = AstNode::call("translate")
        .positional([0.0, 0.0, 10.0])
        .child(AstNode::call("cube"))
        .child(AstNode::call("translate").positional([5.0, 0.0, 0.0]).child(AstNode::call("cube")));

    let mesh = converter().convert(&node).unwrap();
    let bbox = mesh.bounding_box();
    assert_relative_eq!(bbox.min.z, 10.0, epsilon = 1e-6);
    assert_relative_eq!(bbox.max.x, 6.0, epsilon = 1e-6);
    assert_relative_eq!(mesh.volume(), 2.0, epsilon = 1e-5);
}

#[test]
fn test_dangling_transform_statement() {
    let program = Program::new(vec![
        AstNode::call("rotate").positional(45.0),
        AstNode::call("cube"),
    ]);
    let results = converter().convert_program(&program);
    assert!(matches!(results[0], Err(ConversionError::DanglingTransform { .. })));
    assert!(results[1].is_ok());
}

#[test]
fn test_parallel_and_sequential_agree() {
    let statements: Vec<AstNode> = (0..16)
        .map(|i| {
            AstNode::call("translate")
                .positional([i as f64 * 3.0, 0.0, 0.0])
                .child(AstNode::call("sphere").arg("r", 1.0 + i as f64 * 0.25))
        })
        .collect();
    let program = Program::new(statements);

    let parallel = converter().convert_program(&program);
    let sequential = Converter::new(ConversionConfig {
        parallel: false,
        ..ConversionConfig::default()
    })
    .convert_program(&program);

    for (a, b) in parallel.iter().zip(&sequential) {
        assert_eq!(a.as_ref().unwrap(), b.as_ref().unwrap());
    }
}

#[test]
fn test_cache_records_hits_on_repeat() {
    let group = AstNode::call("difference")
        .child(AstNode::call("cube").positional(10.0).arg("center", true))
        .child(AstNode::call("sphere").arg("r", 6.0));
    let program = Program::new(vec![group.clone(), group]);

    let converter = Converter::new(ConversionConfig {
        parallel: false,
        ..ConversionConfig::default()
    });
    let results = converter.convert_program(&program);
    assert_eq!(results[0].as_ref().unwrap(), results[1].as_ref().unwrap());
    assert!(results[0].as_ref().unwrap().metadata.fingerprint.is_some());

    let stats = converter.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);

    converter.clear_cache();
    assert_eq!(converter.cache_stats().entries, 0);
}

#[test]
fn test_cache_ignores_source_location() {
    let group = || {
        AstNode::call("difference")
            .child(AstNode::call("cube").positional(10.0).arg("center", true))
            .child(AstNode::call("sphere").arg("r", 6.0))
    };
    let program = Program::new(vec![group().at(1, 1), group().at(7, 3)]);

    let converter = Converter::new(ConversionConfig {
        parallel: false,
        ..ConversionConfig::default()
    });
    let results = converter.convert_program(&program);
    assert!(results.iter().all(|r| r.is_ok()));

    let stats = converter.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

#[test]
fn test_json_program() {
    let source = r#"{
        "assignments": [{ "name": "h", "value": 4 }],
        "statements": [
            {
                "kind": "translate",
                "args": [{ "value": [0, 0, 1] }],
                "children": [{
                    "kind": "cylinder",
                    "args": [{ "name": "h", "value": { "var": "h" } }, { "name": "r", "value": 1 }]
                }]
            },
            { "kind": "nope" }
        ]
    }"#;

    let results = scadcore::convert_json(source).unwrap();
    let bbox = results[0].as_ref().unwrap().bounding_box();
    assert_relative_eq!(bbox.min.z, 1.0, epsilon = 1e-6);
    assert_relative_eq!(bbox.max.z, 5.0, epsilon = 1e-6);
    assert!(results[1].is_err());
}
