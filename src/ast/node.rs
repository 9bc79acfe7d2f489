// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! AST Node definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in primitive shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Cube,
    Sphere,
    Cylinder,
    Polyhedron,
    Square,
    Circle,
    Polygon,
}

impl PrimitiveKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Sphere => "sphere",
            Self::Cylinder => "cylinder",
            Self::Polyhedron => "polyhedron",
            Self::Square => "square",
            Self::Circle => "circle",
            Self::Polygon => "polygon",
        }
    }
}

/// Affine transform nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    Translate,
    Rotate,
    Scale,
    Mirror,
    Multmatrix,
}

impl TransformKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Translate => "translate",
            Self::Rotate => "rotate",
            Self::Scale => "scale",
            Self::Mirror => "mirror",
            Self::Multmatrix => "multmatrix",
        }
    }
}

/// Boolean composition nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanKind {
    Union,
    Difference,
    Intersection,
}

impl BooleanKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Union => "union",
            Self::Difference => "difference",
            Self::Intersection => "intersection",
        }
    }
}

macro_rules! display_by_name {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        })*
    };
}

display_by_name!(PrimitiveKind, TransformKind, BooleanKind);

/// Types of AST nodes.
///
/// Serialized as the bare call name (`"cube"`, `"translate"`, `"my_module"`),
/// which is how the upstream parser hands them over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Primitive(PrimitiveKind),
    Transform(TransformKind),
    Boolean(BooleanKind),
    ModuleCall(String),
}

impl NodeKind {
    /// Map a call name onto a node kind. Anything that is not a builtin is a
    /// module call and gets resolved against the program's module table.
    pub fn from_name(name: &str) -> Self {
        match name {
            "cube" => Self::Primitive(PrimitiveKind::Cube),
            "sphere" => Self::Primitive(PrimitiveKind::Sphere),
            "cylinder" => Self::Primitive(PrimitiveKind::Cylinder),
            "polyhedron" => Self::Primitive(PrimitiveKind::Polyhedron),
            "square" => Self::Primitive(PrimitiveKind::Square),
            "circle" => Self::Primitive(PrimitiveKind::Circle),
            "polygon" => Self::Primitive(PrimitiveKind::Polygon),
            "translate" => Self::Transform(TransformKind::Translate),
            "rotate" => Self::Transform(TransformKind::Rotate),
            "scale" => Self::Transform(TransformKind::Scale),
            "mirror" => Self::Transform(TransformKind::Mirror),
            "multmatrix" => Self::Transform(TransformKind::Multmatrix),
            "union" => Self::Boolean(BooleanKind::Union),
            "difference" => Self::Boolean(BooleanKind::Difference),
            "intersection" => Self::Boolean(BooleanKind::Intersection),
            other => Self::ModuleCall(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Primitive(kind) => kind.name(),
            Self::Transform(kind) => kind.name(),
            Self::Boolean(kind) => kind.name(),
            Self::ModuleCall(name) => name,
        }
    }

    /// Canonical order of positional parameters
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            Self::Primitive(PrimitiveKind::Cube) => &["size", "center"],
            Self::Primitive(PrimitiveKind::Sphere) => &["r"],
            Self::Primitive(PrimitiveKind::Cylinder) => &["h", "r1", "r2", "center"],
            Self::Primitive(PrimitiveKind::Polyhedron) => &["points", "faces", "convexity"],
            Self::Primitive(PrimitiveKind::Square) => &["size", "center"],
            Self::Primitive(PrimitiveKind::Circle) => &["r"],
            Self::Primitive(PrimitiveKind::Polygon) => &["points", "paths"],
            Self::Transform(TransformKind::Rotate) => &["a", "v"],
            Self::Transform(TransformKind::Multmatrix) => &["m"],
            Self::Transform(_) => &["v"],
            Self::Boolean(_) | Self::ModuleCall(_) => &[],
        }
    }
}

impl From<String> for NodeKind {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.name().to_string()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position of a node in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Call argument, positional when `name` is `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub value: super::Expr,
}

/// AST Node representing a single call: primitive, transform, boolean group or
/// module invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    pub kind: NodeKind,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(default)]
    pub children: Vec<AstNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl AstNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            args: Vec::new(),
            children: Vec::new(),
            location: None,
        }
    }

    /// Node for a call by name, e.g. `AstNode::call("cube")`
    pub fn call(name: &str) -> Self {
        Self::new(NodeKind::from_name(name))
    }

    pub fn arg(mut self, name: &str, value: impl Into<super::Expr>) -> Self {
        self.args.push(Argument {
            name: Some(name.to_string()),
            value: value.into(),
        });
        self
    }

    pub fn positional(mut self, value: impl Into<super::Expr>) -> Self {
        self.args.push(Argument {
            name: None,
            value: value.into(),
        });
        self
    }

    pub fn child(mut self, child: AstNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.location = Some(SourceLocation { line, column });
        self
    }

    pub fn is_transform(&self) -> bool {
        matches!(self.kind, NodeKind::Transform(_))
    }
}
