// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Argument expressions and the values they evaluate to

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Argument expression as delivered by the parser.
///
/// Literals arrive already evaluated; anything the parser could not fold is
/// left as a [`Expr::Variable`] reference (possibly under arithmetic) and is
/// resolved through the scope chain during conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    Undef,
    Number(f64),
    Bool(bool),
    Str(String),
    Vector(Vec<Expr>),
    Variable {
        var: String,
    },
    Negate {
        neg: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Self::Variable {
            var: name.to_string(),
        }
    }

    pub fn binary(op: BinaryOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs.into()),
            rhs: Box::new(rhs.into()),
        }
    }

    pub fn negate(inner: impl Into<Expr>) -> Self {
        Self::Negate {
            neg: Box::new(inner.into()),
        }
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl<const N: usize> From<[f64; N]> for Expr {
    fn from(items: [f64; N]) -> Self {
        Self::Vector(items.iter().map(|&n| Self::Number(n)).collect())
    }
}

impl From<Vec<Expr>> for Expr {
    fn from(items: Vec<Expr>) -> Self {
        Self::Vector(items)
    }
}

/// Runtime value of an evaluated expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Undef,
    Number(f64),
    Bool(bool),
    Str(String),
    Vector(Vec<Value>),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Truthiness; only meaningful for flags such as `center`
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::Vector(v) => !v.is_empty(),
            Self::Undef => false,
        }
    }

    /// Numbers of a vector value, `None` if any element is not a number
    pub fn as_numbers(&self) -> Option<Vec<f64>> {
        match self {
            Self::Vector(items) => items.iter().map(Value::as_f64).collect(),
            _ => None,
        }
    }

    pub fn is_undef(&self) -> bool {
        matches!(self, Self::Undef)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undef => "undef",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Str(_) => "string",
            Self::Vector(_) => "vector",
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undef => f.write_str("undef"),
            Self::Number(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Str(s) => write!(f, "\"{}\"", s),
            Self::Vector(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_json_forms() {
        let expr: Expr = serde_json::from_str(r#"[1, {"var": "w"}, null]"#).unwrap();
        assert_eq!(
            expr,
            Expr::Vector(vec![Expr::Number(1.0), Expr::var("w"), Expr::Undef])
        );

        let expr: Expr =
            serde_json::from_str(r#"{"op": "mul", "lhs": {"var": "r"}, "rhs": 2}"#).unwrap();
        assert_eq!(
            expr,
            Expr::binary(BinaryOp::Mul, Expr::var("r"), 2.0)
        );
    }

    #[test]
    fn test_value_display() {
        let v = Value::Vector(vec![Value::Number(1.0), Value::Bool(true)]);
        assert_eq!(v.to_string(), "[1, true]");
        assert_eq!(v.as_numbers(), None);
    }
}
