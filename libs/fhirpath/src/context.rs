//! Per-evaluation context: the root document, variables, limits,
//! cancellation, and the injected adapters.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value as JsonValue;

use crate::adapters::{ProfileValidator, ReferenceResolver, TerminologyService, TraceSink};
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::value::{infer_root_type, Value};

/// Resource limits for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum evaluator recursion depth.
    pub max_depth: usize,
    /// Maximum size of any intermediate collection.
    pub max_collection_size: usize,
    /// Wall-clock limit for the whole evaluation.
    pub timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 100,
            max_collection_size: 10_000,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Evaluation context. Created per call; owns its variable map and limits,
/// shares the adapters by reference count.
pub struct EvalContext {
    pub(crate) root: Collection,
    pub(crate) root_type: Arc<str>,
    pub(crate) variables: HashMap<Arc<str>, Collection>,
    pub(crate) limits: Limits,
    pub(crate) deadline: Instant,
    pub(crate) cancel: Option<Arc<AtomicBool>>,
    pub(crate) resolver: Option<Arc<dyn ReferenceResolver>>,
    pub(crate) terminology: Option<Arc<dyn TerminologyService>>,
    pub(crate) profiles: Option<Arc<dyn ProfileValidator>>,
    pub(crate) trace: Option<Arc<dyn TraceSink>>,
}

impl EvalContext {
    /// Build a context over a parsed document root.
    pub fn new(root_json: Arc<JsonValue>) -> Self {
        let root_type = infer_root_type(&root_json);
        let root = match Value::from_json_root(root_json) {
            Some(value) => Collection::singleton(value),
            None => Collection::empty(),
        };

        let mut variables: HashMap<Arc<str>, Collection> = HashMap::new();
        variables.insert(Arc::from("resource"), root.clone());
        variables.insert(Arc::from("context"), root.clone());
        variables.insert(
            Arc::from("ucum"),
            Collection::singleton(Value::string("http://unitsofmeasure.org")),
        );
        variables.insert(
            Arc::from("sct"),
            Collection::singleton(Value::string("http://snomed.info/sct")),
        );
        variables.insert(
            Arc::from("loinc"),
            Collection::singleton(Value::string("http://loinc.org")),
        );

        let limits = Limits::default();
        Self {
            root,
            root_type,
            variables,
            limits,
            deadline: Instant::now() + limits.timeout,
            cancel: None,
            resolver: None,
            terminology: None,
            profiles: None,
            trace: None,
        }
    }

    /// Parse raw JSON bytes into a context.
    pub fn from_bytes(resource: &[u8]) -> Result<Self> {
        let json: JsonValue = serde_json::from_slice(resource).map_err(|e| Error::Parse {
            line: e.line(),
            column: e.column(),
            message: format!("invalid resource JSON: {e}"),
        })?;
        Ok(Self::new(Arc::new(json)))
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self.deadline = Instant::now() + limits.timeout;
        self
    }

    /// Register a user variable, addressable as `%name`.
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

    /// The root resource as the initial focus collection.
    pub fn root(&self) -> &Collection {
        &self.root
    }

    /// The inferred type name of the root resource.
    pub fn root_type(&self) -> &str {
        &self.root_type
    }

    pub fn variable(&self, name: &str) -> Option<&Collection> {
        self.variables.get(name)
    }
}
