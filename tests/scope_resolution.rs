// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Scope resolver behaviour through the public API

use anyhow::Result;
use scadcore::ast::{AstNode, Expr, SourceLocation, Value};
use scadcore::scope::{evaluate, ResolvedArgs, ScopeResolver};
use scadcore::ConversionError;

#[test]
fn test_innermost_binding_wins() -> Result<()> {
    let mut scope = ScopeResolver::new();
    scope.define_variable("size", Value::Number(1.0), None)?;
    scope.enter_scope("outer");
    scope.define_variable("size", Value::Number(2.0), None)?;
    scope.enter_scope("inner");
    scope.define_variable("size", Value::Number(3.0), Some(SourceLocation { line: 4, column: 2 }))?;

    let binding = scope.resolve_variable("size").expect("bound");
    assert_eq!(binding.value, Value::Number(3.0));
    assert_eq!(binding.scope_level, 2);
    assert_eq!(binding.location, Some(SourceLocation { line: 4, column: 2 }));

    scope.exit_scope()?;
    assert_eq!(scope.resolve_variable("size").unwrap().value, Value::Number(2.0));
    scope.exit_scope()?;
    assert_eq!(scope.resolve_variable("size").unwrap().value, Value::Number(1.0));
    Ok(())
}

#[test]
fn test_exit_global_alone_fails() {
    let mut scope = ScopeResolver::new();
    assert!(matches!(scope.exit_scope(), Err(ConversionError::CannotExitGlobalScope)));

    scope.enter_scope("m");
    assert!(scope.exit_scope().is_ok());
    assert!(matches!(scope.exit_scope(), Err(ConversionError::CannotExitGlobalScope)));
}

#[test]
fn test_duplicate_in_same_frame() {
    let mut scope = ScopeResolver::new();
    scope.enter_scope("part");
    scope.define_variable("w", Value::Number(1.0), None).unwrap();
    let err = scope.define_variable("w", Value::Number(2.0), None).unwrap_err();
    assert!(matches!(
        err,
        ConversionError::DuplicateDefinition { ref name, scope: ref frame }
            if name == "w" && frame == "part"
    ));
}

#[test]
fn test_arguments_evaluate_against_scope() -> Result<()> {
    let mut scope = ScopeResolver::new();
    scope.define_variable("r", Value::Number(2.5), None)?;

    let node = AstNode::call("sphere").arg("r", Expr::var("r")).arg("$fn", 12.0);
    let args = ResolvedArgs::resolve(&node, &scope)?;
    assert_eq!(args.number("r"), Some(2.5));
    assert_eq!(args.number("$fn"), Some(12.0));

    assert_eq!(evaluate(&Expr::negate(Expr::var("r")), &scope)?, Value::Number(-2.5));
    Ok(())
}

#[test]
fn test_accessible_variables_snapshot() -> Result<()> {
    let mut scope = ScopeResolver::new();
    scope.define_variable("a", Value::Number(1.0), None)?;
    scope.enter_scope("m");
    scope.define_variable("b", Value::Bool(true), None)?;

    let visible = scope.get_all_accessible_variables();
    let names: Vec<&str> = visible.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["$fa", "$fn", "$fs", "a", "b"]);

    scope.reset();
    assert_eq!(scope.get_all_accessible_variables().len(), 3);
    Ok(())
}
