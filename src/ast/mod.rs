// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Abstract Syntax Tree module
//!
//! Node model consumed from the upstream parser. The tree is owned by the
//! caller and only ever read during conversion.

mod node;
mod program;
mod value;

pub use node::{
    Argument, AstNode, BooleanKind, NodeKind, PrimitiveKind, SourceLocation, TransformKind,
};
pub use program::{Assignment, ModuleDefinition, Parameter, Program};
pub use value::{BinaryOp, Expr, Value};
