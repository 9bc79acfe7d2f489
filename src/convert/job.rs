// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Conversion of one top-level statement
//!
//! A job owns its scope resolver and walks the statement's subtree
//! recursively. Everything shared between jobs (modules, CSG engine, cache) is
//! borrowed read-only from the converter.

use super::cache::{Fingerprint, GeometryCache};
use crate::ast::{Argument, AstNode, ModuleDefinition, NodeKind};
use crate::csg::CsgEngine;
use crate::error::{ConversionError, ConversionResult};
use crate::geometry::{generate_primitive, Mesh};
use crate::scope::{evaluate, ResolvedArgs, ScopeResolver};
use crate::transform::{extract_chain_in, MatrixComposer, Terminal};
use ahash::AHashSet;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{trace, warn};

/// Read-only state shared by every job of one conversion run
pub(crate) struct JobContext<'a> {
    pub modules: &'a BTreeMap<String, ModuleDefinition>,
    pub module_digest: &'a str,
    pub engine: &'a CsgEngine,
    pub composer: MatrixComposer,
    pub cache: Option<&'a GeometryCache>,
    pub max_depth: usize,
}

pub(crate) struct ConversionJob<'a> {
    context: &'a JobContext<'a>,
    scope: ScopeResolver,
    depth: usize,
}

impl<'a> ConversionJob<'a> {
    pub fn new(context: &'a JobContext<'a>, scope: ScopeResolver) -> Self {
        Self {
            context,
            scope,
            depth: 0,
        }
    }

    /// Convert a top-level statement. With `bake` off, the statement's own
    /// transform chain is attached to the mesh rather than applied to it.
    pub fn convert_statement(&mut self, node: &AstNode, bake: bool) -> ConversionResult<Mesh> {
        if bake || !node.is_transform() {
            return self.convert_node(node);
        }

        self.guarded(|job| {
            let chain = extract_chain_in(node, &job.scope)?;
            let matrix = job.context.composer.compose_matrix(&chain.operations)?;
            let mut mesh = job.convert_terminal(chain.terminal)?;
            mesh.attach_transform(&matrix);
            mesh.metadata.chain_length = chain.len();
            Ok(mesh)
        })
    }

    /// Convert any node, baking every transform into vertex positions
    pub fn convert_node(&mut self, node: &AstNode) -> ConversionResult<Mesh> {
        self.guarded(|job| {
            trace!(kind = %node.kind, depth = job.depth, "converting node");
            match &node.kind {
                NodeKind::Primitive(_) | NodeKind::Transform(_) => job.convert_chain(node),
                NodeKind::Boolean(op) => {
                    let op = *op;
                    job.cached(node, |job| {
                        let children = job.convert_children(&node.children)?;
                        let mut mesh = job.context.engine.apply_boolean_op(op, children)?;
                        mesh.metadata.source = Some(node.kind.clone());
                        Ok(mesh)
                    })
                }
                NodeKind::ModuleCall(name) => {
                    job.cached(node, |job| job.convert_module_call(name, node))
                }
            }
        })
    }

    /// Depth guard around one level of recursion
    fn guarded(
        &mut self,
        f: impl FnOnce(&mut Self) -> ConversionResult<Mesh>,
    ) -> ConversionResult<Mesh> {
        if self.depth >= self.context.max_depth {
            return Err(ConversionError::RecursionLimitExceeded {
                limit: self.context.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn convert_chain(&mut self, node: &AstNode) -> ConversionResult<Mesh> {
        let chain = extract_chain_in(node, &self.scope)?;
        let mut mesh = self.convert_terminal(chain.terminal)?;
        if !chain.is_empty() {
            let matrix = self.context.composer.compose_matrix(&chain.operations)?;
            mesh.apply_matrix(&matrix);
            mesh.metadata.chain_length = chain.len();
        }
        Ok(mesh)
    }

    fn convert_terminal(&mut self, terminal: Terminal<'_>) -> ConversionResult<Mesh> {
        match terminal {
            Terminal::Node(node) => match node.kind {
                NodeKind::Primitive(kind) => {
                    let args = ResolvedArgs::resolve(node, &self.scope)?;
                    let mut mesh = generate_primitive(kind, &args, &self.scope)?;
                    mesh.metadata.source = Some(node.kind.clone());
                    Ok(mesh)
                }
                _ => self.convert_node(node),
            },
            Terminal::Group(children) => self.convert_group(children),
        }
    }

    fn convert_children(&mut self, children: &[AstNode]) -> ConversionResult<Vec<Mesh>> {
        children.iter().map(|child| self.convert_node(child)).collect()
    }

    /// Several nodes in a row form an implicit union
    fn convert_group(&mut self, children: &[AstNode]) -> ConversionResult<Mesh> {
        let meshes = self.convert_children(children)?;
        self.context
            .engine
            .apply_boolean_op(crate::ast::BooleanKind::Union, meshes)
    }

    fn convert_module_call(&mut self, name: &str, node: &AstNode) -> ConversionResult<Mesh> {
        let definition = self
            .context
            .modules
            .get(name)
            .ok_or_else(|| ConversionError::UnknownNodeKind(name.to_string()))?;

        // Arguments see the caller's bindings, not the module's
        let args = ResolvedArgs::resolve(node, &self.scope)?;

        self.scope.enter_scope(name);
        let result = self.bind_and_convert(name, definition, &args);
        let exited = self.scope.exit_scope();

        let mut mesh = result?;
        exited?;
        mesh.metadata.source = Some(node.kind.clone());
        Ok(mesh)
    }

    fn bind_and_convert(
        &mut self,
        name: &str,
        definition: &ModuleDefinition,
        args: &ResolvedArgs,
    ) -> ConversionResult<Mesh> {
        let declared: AHashSet<&str> = definition.params.iter().map(|p| p.name.as_str()).collect();

        for (index, param) in definition.params.iter().enumerate() {
            let named = args
                .named()
                .filter(|(key, _)| *key == param.name)
                .last()
                .map(|(_, value)| value.clone());
            let positional = args
                .positional()
                .get(index)
                .filter(|value| !value.is_undef())
                .cloned();

            let value = match named.or(positional) {
                Some(value) => value,
                None => match &param.default {
                    // Defaults may refer to earlier parameters
                    Some(expr) => evaluate(expr, &self.scope)?,
                    None => crate::ast::Value::Undef,
                },
            };
            self.scope.define_variable(&param.name, value, None)?;
        }

        if args.positional().len() > definition.params.len() {
            warn!(
                module = name,
                given = args.positional().len(),
                declared = definition.params.len(),
                "extra positional arguments ignored"
            );
        }

        let mut bound_specials = AHashSet::new();
        for (key, value) in args.named() {
            if declared.contains(key) {
                continue;
            }
            if key.starts_with('$') {
                // Special variables flow into the module body; last one wins
                if bound_specials.insert(key) {
                    let value = args.get(key).cloned().unwrap_or_else(|| value.clone());
                    self.scope.define_variable(key, value, None)?;
                }
            } else {
                warn!(module = name, argument = key, "unknown argument ignored");
            }
        }

        for assignment in &definition.assignments {
            let value = evaluate(&assignment.value, &self.scope)?;
            self.scope.define_variable(&assignment.name, value, None)?;
        }

        self.convert_group(&definition.body)
    }

    /// Memoize `compute` under the node's fingerprint when caching is on
    fn cached(
        &mut self,
        node: &AstNode,
        compute: impl FnOnce(&mut Self) -> ConversionResult<Mesh>,
    ) -> ConversionResult<Mesh> {
        let Some(cache) = self.context.cache else {
            return compute(self);
        };
        let key = match self.fingerprint(node) {
            Ok(key) => key,
            Err(err) => {
                warn!(error = %err, "cannot fingerprint node, bypassing cache");
                return compute(self);
            }
        };

        let mut mesh = cache.get_or_compute(&key, || compute(self))?;
        mesh.metadata.fingerprint = Some(key);
        Ok(mesh)
    }

    /// Hash of the subtree shape, every visible binding, the module table and
    /// the current depth. Source locations are left out so identical subtrees
    /// share an entry. The depth keeps a recursive call from waiting on its
    /// own in-flight entry.
    fn fingerprint(&self, node: &AstNode) -> serde_json::Result<String> {
        let mut fingerprint = Fingerprint::new();
        fingerprint.feed(&NodeShape::of(node))?;
        let variables = self.scope.get_all_accessible_variables();
        let values: Vec<(&String, &crate::ast::Value)> = variables
            .iter()
            .map(|(name, binding)| (name, &binding.value))
            .collect();
        fingerprint.feed(&values)?;
        fingerprint.feed_bytes(self.context.module_digest.as_bytes());
        fingerprint.feed_bytes(&self.depth.to_le_bytes());
        Ok(fingerprint.finish())
    }
}

/// Location-free view of a subtree
#[derive(Serialize)]
struct NodeShape<'n> {
    kind: &'n NodeKind,
    args: &'n [Argument],
    children: Vec<NodeShape<'n>>,
}

impl<'n> NodeShape<'n> {
    fn of(node: &'n AstNode) -> Self {
        Self {
            kind: &node.kind,
            args: &node.args,
            children: node.children.iter().map(NodeShape::of).collect(),
        }
    }
}
