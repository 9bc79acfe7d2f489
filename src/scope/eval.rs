// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Expression evaluation against a scope chain

use super::ScopeResolver;
use crate::ast::{AstNode, BinaryOp, Expr, Value};
use crate::error::{ConversionError, ConversionResult};

/// Evaluate an argument expression, resolving variable references.
///
/// Arithmetic on anything but numbers (or element-wise on equal-length
/// vectors) yields `undef` rather than an error.
pub fn evaluate(expr: &Expr, scope: &ScopeResolver) -> ConversionResult<Value> {
    Ok(match expr {
        Expr::Undef => Value::Undef,
        Expr::Number(n) => Value::Number(*n),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Str(s) => Value::Str(s.clone()),
        Expr::Vector(items) => Value::Vector(
            items
                .iter()
                .map(|item| evaluate(item, scope))
                .collect::<ConversionResult<_>>()?,
        ),
        Expr::Variable { var } => scope
            .resolve_variable(var)
            .map(|binding| binding.value.clone())
            .ok_or_else(|| ConversionError::UndefinedVariable(var.clone()))?,
        Expr::Negate { neg } => negate(evaluate(neg, scope)?),
        Expr::Binary { op, lhs, rhs } => {
            apply_binary(*op, &evaluate(lhs, scope)?, &evaluate(rhs, scope)?)
        }
    })
}

fn negate(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(-n),
        Value::Vector(items) => Value::Vector(items.into_iter().map(negate).collect()),
        _ => Value::Undef,
    }
}

fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Value::Number(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Mod => a % b,
        }),
        (Value::Vector(a), Value::Vector(b))
            if a.len() == b.len() && matches!(op, BinaryOp::Add | BinaryOp::Sub) =>
        {
            Value::Vector(
                a.iter()
                    .zip(b)
                    .map(|(x, y)| apply_binary(op, x, y))
                    .collect(),
            )
        }
        (Value::Vector(items), Value::Number(_))
            if matches!(op, BinaryOp::Mul | BinaryOp::Div) =>
        {
            Value::Vector(items.iter().map(|x| apply_binary(op, x, rhs)).collect())
        }
        (Value::Number(_), Value::Vector(items)) if op == BinaryOp::Mul => {
            Value::Vector(items.iter().map(|x| apply_binary(op, lhs, x)).collect())
        }
        _ => Value::Undef,
    }
}

/// Call arguments of one node after evaluation, addressable by name or by
/// their position in the node kind's canonical parameter order
#[derive(Debug, Clone, Default)]
pub struct ResolvedArgs {
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
    order: &'static [&'static str],
}

impl ResolvedArgs {
    pub fn resolve(node: &AstNode, scope: &ScopeResolver) -> ConversionResult<Self> {
        let mut resolved = Self {
            order: node.kind.parameter_names(),
            ..Self::default()
        };

        for arg in &node.args {
            let value = evaluate(&arg.value, scope)?;
            match &arg.name {
                Some(name) => resolved.named.push((name.clone(), value)),
                None => resolved.positional.push(value),
            }
        }
        Ok(resolved)
    }

    /// Named argument first, then the positional slot for `name`.
    /// `undef` counts as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let named = self
            .named
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value);

        named
            .or_else(|| {
                self.order
                    .iter()
                    .position(|param| *param == name)
                    .and_then(|index| self.positional.get(index))
            })
            .filter(|value| !value.is_undef())
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.get(name).map(Value::as_bool).unwrap_or(false)
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn named(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.named.iter().map(|(name, value)| (name.as_str(), value))
    }
}
