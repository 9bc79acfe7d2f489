// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Lexical scope resolution
//!
//! Frames live in an arena and point at their parent by index. Inner frames may
//! shadow outer bindings, but a name can only be bound once per frame.

mod eval;

pub use eval::{evaluate, ResolvedArgs};

use crate::ast::{SourceLocation, Value};
use crate::error::{ConversionError, ConversionResult};
use ahash::AHashMap;
use std::collections::BTreeMap;

/// Default `$fn` (0 defers to `$fa`/`$fs`)
pub const DEFAULT_FN: f64 = 0.0;
/// Default `$fa` in degrees
pub const DEFAULT_FA: f64 = 12.0;
/// Default `$fs` in model units
pub const DEFAULT_FS: f64 = 2.0;
/// Upper bound on segments per full circle, whatever `$fn`/`$fa`/`$fs` ask for
pub const MAX_FRAGMENTS: u32 = 1024;

const GLOBAL_SCOPE: &str = "global";

/// Index of a frame in the resolver's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

/// A bound variable. Immutable once defined.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableBinding {
    pub name: String,
    pub value: Value,
    pub scope_level: u32,
    pub location: Option<SourceLocation>,
}

/// One level of nesting: the global scope, a module invocation or a block
#[derive(Debug, Clone)]
pub struct ScopeFrame {
    pub name: String,
    pub level: u32,
    bindings: AHashMap<String, VariableBinding>,
    parent: Option<FrameId>,
}

impl ScopeFrame {
    fn new(name: &str, level: u32, parent: Option<FrameId>) -> Self {
        Self {
            name: name.to_string(),
            level,
            bindings: AHashMap::new(),
            parent,
        }
    }

    pub fn parent(&self) -> Option<FrameId> {
        self.parent
    }

    pub fn get(&self, name: &str) -> Option<&VariableBinding> {
        self.bindings.get(name)
    }
}

/// Variable resolver for a single conversion job.
///
/// ```
/// use scadcore::scope::ScopeResolver;
/// use scadcore::ast::Value;
///
/// let mut scope = ScopeResolver::new();
/// scope.define_variable("x", Value::Number(10.0), None).unwrap();
///
/// scope.enter_scope("part");
/// scope.define_variable("x", Value::Number(20.0), None).unwrap();
/// assert_eq!(scope.resolve_variable("x").unwrap().value, Value::Number(20.0));
///
/// scope.exit_scope().unwrap();
/// assert_eq!(scope.resolve_variable("x").unwrap().value, Value::Number(10.0));
/// ```
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    frames: Vec<ScopeFrame>,
    current: FrameId,
    default_fn: f64,
}

impl ScopeResolver {
    /// Create a resolver holding only the global frame, with the special
    /// variables `$fn`, `$fa` and `$fs` at their defaults
    pub fn new() -> Self {
        Self::with_default_fragments(DEFAULT_FN)
    }

    /// Like [`ScopeResolver::new`] but with the global `$fn` set to `fn_`
    pub fn with_default_fragments(fn_: f64) -> Self {
        let mut resolver = Self {
            frames: Vec::new(),
            current: FrameId(0),
            default_fn: fn_,
        };
        resolver.reset();
        resolver
    }

    /// Discard every frame and start over from a fresh global frame
    pub fn reset(&mut self) {
        self.frames.clear();
        self.frames.push(ScopeFrame::new(GLOBAL_SCOPE, 0, None));
        self.current = FrameId(0);

        let globals = &mut self.frames[0].bindings;
        let specials = [("$fn", self.default_fn), ("$fa", DEFAULT_FA), ("$fs", DEFAULT_FS)];
        for (name, value) in specials {
            globals.insert(
                name.to_string(),
                VariableBinding {
                    name: name.to_string(),
                    value: Value::Number(value),
                    scope_level: 0,
                    location: None,
                },
            );
        }
    }

    /// Push a frame one level below the current one
    pub fn enter_scope(&mut self, name: &str) {
        let level = self.current_frame().level + 1;
        self.frames
            .push(ScopeFrame::new(name, level, Some(self.current)));
        self.current = FrameId(self.frames.len() - 1);
    }

    /// Pop the current frame and make its parent current again
    pub fn exit_scope(&mut self) -> ConversionResult<()> {
        let parent = self
            .current_frame()
            .parent
            .ok_or(ConversionError::CannotExitGlobalScope)?;

        // Frames are only ever pushed on top of the current one, so the
        // current frame is always the last in the arena.
        self.frames.truncate(self.current.0);
        self.current = parent;
        Ok(())
    }

    /// Bind `name` in the current frame
    pub fn define_variable(
        &mut self,
        name: &str,
        value: Value,
        location: Option<SourceLocation>,
    ) -> ConversionResult<()> {
        let index = self.current.0;
        let frame = &mut self.frames[index];
        if frame.bindings.contains_key(name) {
            return Err(ConversionError::DuplicateDefinition {
                name: name.to_string(),
                scope: frame.name.clone(),
            });
        }

        frame.bindings.insert(
            name.to_string(),
            VariableBinding {
                name: name.to_string(),
                value,
                scope_level: frame.level,
                location,
            },
        );
        Ok(())
    }

    /// Bind a special (`$`-prefixed) variable in the current frame, replacing
    /// any binding it already has there
    pub fn set_special(&mut self, name: &str, value: Value) {
        let index = self.current.0;
        let frame = &mut self.frames[index];
        let binding = VariableBinding {
            name: name.to_string(),
            value,
            scope_level: frame.level,
            location: None,
        };
        frame.bindings.insert(name.to_string(), binding);
    }

    /// Look a name up from the current frame outwards; innermost wins
    pub fn resolve_variable(&self, name: &str) -> Option<&VariableBinding> {
        let mut cursor = Some(self.current);
        while let Some(id) = cursor {
            let frame = &self.frames[id.0];
            if let Some(binding) = frame.bindings.get(name) {
                return Some(binding);
            }
            cursor = frame.parent;
        }
        None
    }

    /// Every visible binding, inner frames overriding outer ones
    pub fn get_all_accessible_variables(&self) -> BTreeMap<String, VariableBinding> {
        let mut chain = Vec::new();
        let mut cursor = Some(self.current);
        while let Some(id) = cursor {
            chain.push(id);
            cursor = self.frames[id.0].parent;
        }

        let mut merged = BTreeMap::new();
        for id in chain.into_iter().rev() {
            for (name, binding) in &self.frames[id.0].bindings {
                merged.insert(name.clone(), binding.clone());
            }
        }
        merged
    }

    pub fn current_frame(&self) -> &ScopeFrame {
        &self.frames[self.current.0]
    }

    pub fn current_level(&self) -> u32 {
        self.current_frame().level
    }

    /// Number of live frames, global included
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Numeric value of a variable, or `default` when unbound or not a number
    pub fn number(&self, name: &str, default: f64) -> f64 {
        self.resolve_variable(name)
            .and_then(|binding| binding.value.as_f64())
            .unwrap_or(default)
    }

    /// Number of segments for a circle of `radius` under the visible
    /// `$fn`/`$fa`/`$fs`
    pub fn fragments(&self, radius: f64) -> u32 {
        fragment_count(
            self.number("$fn", DEFAULT_FN),
            self.number("$fa", DEFAULT_FA),
            self.number("$fs", DEFAULT_FS),
            radius,
        )
    }
}

/// `$fn` wins when positive (minimum 3); otherwise
/// `max(min(360 / $fa, 2πr / $fs), 5)`. Never more than [`MAX_FRAGMENTS`].
pub fn fragment_count(fn_: f64, fa: f64, fs: f64, radius: f64) -> u32 {
    let count = if fn_ > 0.0 {
        fn_.floor().max(3.0)
    } else {
        let fa = fa.max(0.01);
        let fs = fs.max(0.01);
        let by_angle = (360.0 / fa).ceil();
        let by_size = (2.0 * std::f64::consts::PI * radius.abs() / fs).ceil();
        by_angle.min(by_size).max(5.0)
    };
    count.min(MAX_FRAGMENTS as f64) as u32
}

impl Default for ScopeResolver {
    fn default() -> Self {
        Self::new()
    }
}
