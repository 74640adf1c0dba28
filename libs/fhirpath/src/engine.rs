//! Engine: the public orchestration surface.
//!
//! An [`Engine`] owns a compiled-expression cache, default limits, preset
//! variables, and the injected adapters. Each `evaluate*` call builds a fresh
//! [`EvalContext`], so concurrent callers never share mutable state; compiled
//! expressions are shared through `Arc`.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;

use crate::adapters::{ProfileValidator, ReferenceResolver, TerminologyService, TraceSink};
use crate::ast::Expression;
use crate::cache::{CacheStats, ExpressionCache};
use crate::collection::Collection;
use crate::context::{EvalContext, Limits};
use crate::error::Result;
use crate::evaluator::Evaluator;

pub struct Engine {
    cache: ExpressionCache,
    limits: Limits,
    variables: HashMap<Arc<str>, Collection>,
    cancel: Option<Arc<AtomicBool>>,
    resolver: Option<Arc<dyn ReferenceResolver>>,
    terminology: Option<Arc<dyn TerminologyService>>,
    profiles: Option<Arc<dyn ProfileValidator>>,
    trace: Option<Arc<dyn TraceSink>>,
}

impl Engine {
    /// An engine with default limits and a cache of 1000 compiled expressions.
    pub fn new() -> Self {
        Self {
            cache: ExpressionCache::new(1000),
            limits: Limits::default(),
            variables: HashMap::new(),
            cancel: None,
            resolver: None,
            terminology: None,
            profiles: None,
            trace: None,
        }
    }

    /// Cache capacity; 0 means unbounded.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = ExpressionCache::new(capacity);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.limits.timeout = timeout;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.limits.max_depth = max_depth;
        self
    }

    pub fn with_max_collection_size(mut self, max_size: usize) -> Self {
        self.limits.max_collection_size = max_size;
        self
    }

    /// Preset a variable for every evaluation, addressable as `%name`.
    pub fn with_variable(mut self, name: impl Into<Arc<str>>, value: Collection) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_terminology(mut self, service: Arc<dyn TerminologyService>) -> Self {
        self.terminology = Some(service);
        self
    }

    pub fn with_profile_validator(mut self, validator: Arc<dyn ProfileValidator>) -> Self {
        self.profiles = Some(validator);
        self
    }

    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    /// Compile through this engine's cache.
    pub fn compile(&self, expression: &str) -> Result<Arc<Expression>> {
        self.cache.get(expression)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear()
    }

    /// Evaluate an expression against a raw JSON resource.
    pub fn evaluate(&self, expression: &str, resource: &[u8]) -> Result<Collection> {
        let ast = self.compile(expression)?;
        let ctx = self.context_from_bytes(resource)?;
        Evaluator::new(&ctx).evaluate(&ast)
    }

    /// Evaluate against an already-parsed JSON document.
    pub fn evaluate_json(&self, expression: &str, resource: JsonValue) -> Result<Collection> {
        let ast = self.compile(expression)?;
        let ctx = self.apply_options(EvalContext::new(Arc::new(resource)));
        Evaluator::new(&ctx).evaluate(&ast)
    }

    /// Evaluate a pre-compiled expression; the AST is shareable across
    /// threads and calls.
    pub fn evaluate_ast(&self, ast: &Expression, resource: &[u8]) -> Result<Collection> {
        let ctx = self.context_from_bytes(resource)?;
        Evaluator::new(&ctx).evaluate(ast)
    }

    /// Build the per-call context with this engine's options applied.
    pub fn context_from_bytes(&self, resource: &[u8]) -> Result<EvalContext> {
        Ok(self.apply_options(EvalContext::from_bytes(resource)?))
    }

    fn apply_options(&self, mut ctx: EvalContext) -> EvalContext {
        ctx = ctx.with_limits(self.limits);
        for (name, value) in &self.variables {
            ctx = ctx.with_variable(name.clone(), value.clone());
        }
        if let Some(cancel) = &self.cancel {
            ctx = ctx.with_cancellation(cancel.clone());
        }
        if let Some(resolver) = &self.resolver {
            ctx = ctx.with_resolver(resolver.clone());
        }
        if let Some(terminology) = &self.terminology {
            ctx = ctx.with_terminology(terminology.clone());
        }
        if let Some(profiles) = &self.profiles {
            ctx = ctx.with_profile_validator(profiles.clone());
        }
        if let Some(trace) = &self.trace {
            ctx = ctx.with_trace_sink(trace.clone());
        }
        ctx
    }

    /// Panicking variant of [`Engine::evaluate`] for expressions the caller
    /// guarantees are valid.
    pub fn must_evaluate(&self, expression: &str, resource: &[u8]) -> Collection {
        match self.evaluate(expression, resource) {
            Ok(result) => result,
            Err(e) => panic!("must_evaluate({expression:?}): {e}"),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile through the process-wide default cache.
pub fn compile(expression: &str) -> Result<Arc<Expression>> {
    crate::cache::default_cache().get(expression)
}

/// Panicking variant of [`compile`] for expressions the caller guarantees
/// are valid.
pub fn must_compile(expression: &str) -> Arc<Expression> {
    match compile(expression) {
        Ok(ast) => ast,
        Err(e) => panic!("must_compile({expression:?}): {e}"),
    }
}
