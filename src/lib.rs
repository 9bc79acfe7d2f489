// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! scadcore
//!
//! Converts the AST of a declarative solid-modeling program (OpenSCAD style)
//! into renderable triangle meshes: transform chains are folded into affine
//! matrices, variables resolve through nested scopes and boolean groups run
//! through a CSG kernel. Each top-level statement converts independently.

pub mod ast;
pub mod config;
pub mod convert;
pub mod csg;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod scope;
pub mod transform;

pub use ast::{AstNode, NodeKind, Program};
pub use config::ConversionConfig;
pub use convert::{CacheStats, Converter};
pub use error::{ConversionError, ConversionResult};
pub use geometry::Mesh;
pub use transform::{compose_matrix, extract_chain, Matrix4, TransformationChain};

use anyhow::{Context, Result};

/// Convert a JSON-serialized program with the default configuration
pub fn convert_json(source: &str) -> Result<Vec<ConversionResult<Mesh>>> {
    let program = Program::from_json(source).context("Failed to parse program JSON")?;
    Ok(Converter::default().convert_program(&program))
}

/// Convert a JSON program file
pub fn convert_file(path: &str) -> Result<Vec<ConversionResult<Mesh>>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read program file: {}", path))?;
    convert_json(&source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_cube() {
        let results = convert_json(
            r#"{ "statements": [{ "kind": "cube", "args": [{ "value": [10, 10, 10] }] }] }"#,
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap().vertex_count(), 8);
    }

    #[test]
    fn test_bad_json() {
        assert!(convert_json("{ not json").is_err());
    }
}
