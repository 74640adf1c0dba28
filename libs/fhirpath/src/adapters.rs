//! Injection contracts for external collaborators.
//!
//! The engine never performs I/O itself: reference resolution, terminology
//! membership, profile conformance, and trace output all go through these
//! traits. Implementations are shared across evaluation threads and must be
//! internally synchronized.

use std::sync::{Arc, Mutex};

use crate::collection::Collection;
use crate::error::Result;
use crate::operators::render_collection;

/// Resolves FHIR reference strings to raw resource JSON.
///
/// Implementations must accept relative (`Type/id`), absolute-URL, and
/// fragment (`#contained`) references. Inside `resolve()` an error causes the
/// individual reference to be silently skipped; it never aborts evaluation.
///
/// # Performance
///
/// `resolve` may be called once per element of a collection. Implementations
/// backed by a database or HTTP client should cache aggressively.
pub trait ReferenceResolver: Send + Sync {
    /// Resolve a reference to the raw JSON bytes of the target resource.
    ///
    /// Returns `Ok(None)` for a well-formed reference with no target.
    fn resolve(&self, reference: &str) -> Result<Option<Vec<u8>>>;
}

/// Answers ValueSet membership questions for `memberOf()`.
///
/// The code shape handed over is the raw JSON of the focus item: a bare
/// `{"code": ...}`, a Coding, or a CodeableConcept.
pub trait TerminologyService: Send + Sync {
    fn member_of(&self, code: &serde_json::Value, valueset_url: &str) -> Result<bool>;
}

/// Answers profile conformance questions for `conformsTo()`.
pub trait ProfileValidator: Send + Sync {
    fn conforms_to(&self, resource: &[u8], profile_url: &str) -> Result<bool>;
}

/// Receives `trace()` records.
pub trait TraceSink: Send + Sync {
    fn emit(&self, label: &str, collection: &Collection);
}

/// A sink that discards every record.
pub struct NullSink;

impl TraceSink for NullSink {
    fn emit(&self, _label: &str, _collection: &Collection) {}
}

/// Forwards trace records to the `tracing` subscriber at DEBUG level.
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn emit(&self, label: &str, collection: &Collection) {
        tracing::debug!(
            target: "fhirpath::trace",
            label,
            count = collection.len(),
            values = %render_collection(collection),
        );
    }
}

/// A sink that captures records in memory; handy in tests.
#[derive(Default)]
pub struct CollectingSink {
    records: Mutex<Vec<(String, Vec<String>)>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<(String, Vec<String>)> {
        self.records.lock().unwrap().clone()
    }
}

impl TraceSink for CollectingSink {
    fn emit(&self, label: &str, collection: &Collection) {
        let rendered = collection.iter().map(|v| v.render()).collect();
        self.records
            .lock()
            .unwrap()
            .push((label.to_string(), rendered));
    }
}
