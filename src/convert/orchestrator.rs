// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Converter - turns AST statements into meshes

use super::cache::{digest_of, CacheStats, GeometryCache};
use super::job::{ConversionJob, JobContext};
use crate::ast::{AstNode, ModuleDefinition, Program};
use crate::config::ConversionConfig;
use crate::csg::{BooleanKernel, BspKernel, CsgEngine};
use crate::error::ConversionResult;
use crate::geometry::Mesh;
use crate::scope::{evaluate, ScopeResolver, DEFAULT_FN};
use crate::transform::MatrixComposer;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Worker stack before any recursion
const BASE_STACK: usize = 4 * 1024 * 1024;
/// Worker stack reserved per level of `max_depth`
const STACK_PER_LEVEL: usize = 128 * 1024;
const MAX_STACK: usize = 1024 * 1024 * 1024;

/// Stack large enough for a job to reach `max_depth` and report the limit
fn worker_stack_size(max_depth: usize) -> usize {
    STACK_PER_LEVEL
        .saturating_mul(max_depth)
        .saturating_add(BASE_STACK)
        .min(MAX_STACK)
}

/// Converter with a shared geometry cache.
///
/// Every statement converts as an independent job with its own scope
/// resolver; one failing statement never affects the others.
///
/// ```
/// use scadcore::ast::{AstNode, Program};
/// use scadcore::{ConversionConfig, Converter};
///
/// let program = Program::new(vec![
///     AstNode::call("cube").positional([10.0, 10.0, 10.0]),
///     AstNode::call("no_such_module"),
/// ]);
///
/// let results = Converter::new(ConversionConfig::default()).convert_program(&program);
/// assert_eq!(results[0].as_ref().unwrap().triangle_count(), 12);
/// assert!(results[1].is_err());
/// ```
pub struct Converter {
    config: ConversionConfig,
    engine: CsgEngine,
    cache: GeometryCache,
    pool: Option<ThreadPool>,
}

impl Converter {
    /// Converter backed by the BSP kernel
    pub fn new(config: ConversionConfig) -> Self {
        Self::with_kernel(config, Arc::new(BspKernel::new()))
    }

    pub fn with_kernel(config: ConversionConfig, kernel: Arc<dyn BooleanKernel>) -> Self {
        let engine = CsgEngine::new(kernel, config.csg_timeout());
        let pool = build_pool(&config);
        Self {
            config,
            engine,
            cache: GeometryCache::new(),
            pool,
        }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert a single node with no program-level bindings or modules
    pub fn convert(&self, node: &AstNode) -> ConversionResult<Mesh> {
        let modules = BTreeMap::new();
        let digest = digest_of(&modules);
        let context = self.context(&modules, &digest);
        self.run(|| {
            ConversionJob::new(&context, self.base_scope())
                .convert_statement(node, self.config.bake_transforms)
        })
    }

    /// Convert every top-level statement, results in source order
    pub fn convert_program(&self, program: &Program) -> Vec<ConversionResult<Mesh>> {
        let started = Instant::now();
        let digest = digest_of(&program.modules);
        let context = self.context(&program.modules, &digest);
        let seeded = self.seed_scope(program);

        let convert = |(index, statement): (usize, &AstNode)| -> ConversionResult<Mesh> {
            let result = ConversionJob::new(&context, seeded.clone())
                .convert_statement(statement, self.config.bake_transforms);
            match &result {
                Ok(mesh) => debug!(
                    statement = index,
                    kind = %statement.kind,
                    triangles = mesh.triangle_count(),
                    "statement converted"
                ),
                Err(err) => warn!(
                    statement = index,
                    kind = %statement.kind,
                    location = ?statement.location,
                    error = %err,
                    "statement failed"
                ),
            }
            result
        };

        let results: Vec<_> = self.run(|| {
            if self.config.parallel {
                program.statements.par_iter().enumerate().map(convert).collect()
            } else {
                program.statements.iter().enumerate().map(convert).collect()
            }
        });

        debug!(
            statements = results.len(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            kernel = self.engine.kernel_name(),
            timeout = ?self.engine.timeout(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "program converted"
        );
        results
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Run `op` on the conversion pool, or inline when no pool could be built
    fn run<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    fn context<'a>(
        &'a self,
        modules: &'a BTreeMap<String, ModuleDefinition>,
        digest: &'a str,
    ) -> JobContext<'a> {
        JobContext {
            modules,
            module_digest: digest,
            engine: &self.engine,
            composer: MatrixComposer::new(self.config.rotation_mode),
            cache: self.config.cache_enabled.then_some(&self.cache),
            max_depth: self.config.max_depth,
        }
    }

    fn base_scope(&self) -> ScopeResolver {
        let fragments = self
            .config
            .default_fragments
            .map(f64::from)
            .unwrap_or(DEFAULT_FN);
        ScopeResolver::with_default_fragments(fragments)
    }

    /// Global frame with the program's assignments bound in order. Each job
    /// gets its own copy.
    ///
    /// An assignment that fails to evaluate or bind is skipped with a warning;
    /// statements that use the name then fail on their own.
    pub fn seed_scope(&self, program: &Program) -> ScopeResolver {
        let mut scope = self.base_scope();
        for assignment in &program.assignments {
            let bound = evaluate(&assignment.value, &scope).and_then(|value| {
                if assignment.name.starts_with('$') {
                    // Program-level `$fn = ...` replaces the built-in default
                    scope.set_special(&assignment.name, value);
                    Ok(())
                } else {
                    scope.define_variable(&assignment.name, value, None)
                }
            });
            if let Err(err) = bound {
                warn!(
                    name = %assignment.name,
                    error = %err,
                    "skipping global assignment"
                );
            }
        }
        scope
    }
}

fn build_pool(config: &ConversionConfig) -> Option<ThreadPool> {
    let threads = if config.parallel { 0 } else { 1 };
    let built = ThreadPoolBuilder::new()
        .num_threads(threads)
        .stack_size(worker_stack_size(config.max_depth))
        .thread_name(|index| format!("scadcore-convert-{}", index))
        .build();
    match built {
        Ok(pool) => Some(pool),
        Err(err) => {
            warn!(error = %err, "cannot build conversion pool, converting inline");
            None
        }
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConversionConfig::default())
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .field("cache", &self.cache.stats())
            .field("stack_size", &worker_stack_size(self.config.max_depth))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_stack_grows_with_depth() {
        assert_eq!(worker_stack_size(0), BASE_STACK);
        assert!(worker_stack_size(256) > worker_stack_size(64));
        assert_eq!(worker_stack_size(usize::MAX), MAX_STACK);
    }
}
