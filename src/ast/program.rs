// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Whole-program container handed over by the parser

use super::{AstNode, Expr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `name = value;` at program or module level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    pub value: Expr,
}

impl Assignment {
    pub fn new(name: &str, value: impl Into<Expr>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Declared module parameter with an optional default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Expr>,
}

/// `module name(params) { assignments; body }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub body: Vec<AstNode>,
}

impl ModuleDefinition {
    pub fn new(body: Vec<AstNode>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    pub fn param(mut self, name: &str, default: Option<Expr>) -> Self {
        self.params.push(Parameter {
            name: name.to_string(),
            default,
        });
        self
    }

    pub fn assign(mut self, name: &str, value: impl Into<Expr>) -> Self {
        self.assignments.push(Assignment::new(name, value));
        self
    }
}

/// Parsed program: top-level statements plus the bindings and modules they
/// may refer to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub statements: Vec<AstNode>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleDefinition>,
}

impl Program {
    pub fn new(statements: Vec<AstNode>) -> Self {
        Self {
            statements,
            ..Self::default()
        }
    }

    pub fn assign(mut self, name: &str, value: impl Into<Expr>) -> Self {
        self.assignments.push(Assignment::new(name, value));
        self
    }

    pub fn module(mut self, name: &str, definition: ModuleDefinition) -> Self {
        self.modules.insert(name.to_string(), definition);
        self
    }

    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }
}
