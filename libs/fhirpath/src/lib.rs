//! A FHIRPath 2.0 evaluator over FHIR-shaped JSON documents.
//!
//! Expressions compile to an immutable AST and evaluate against a JSON
//! resource, always yielding an ordered [`Collection`] of typed values:
//!
//! ```text
//! Expression String
//!      |
//!   Parser -> AST (cached, Arc-shared)
//!      |
//! Tree-walking evaluation over the resource -> Result Collection
//! ```
//!
//! # Example
//!
//! ```
//! use calyx_fhirpath::Engine;
//!
//! let engine = Engine::new();
//! let patient = br#"{"resourceType": "Patient", "name": [{"family": "Smith"}]}"#;
//! let result = engine.evaluate("Patient.name.family", patient).unwrap();
//! assert_eq!(result.as_string().unwrap().as_ref(), "Smith");
//! ```

pub mod adapters;
pub mod ast;
pub mod cache;
pub mod collection;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod operators;
pub mod parser;
mod temporal;
pub mod token;
pub mod value;

// Re-export main types
pub use adapters::{
    CollectingSink, NullSink, ProfileValidator, ReferenceResolver, TerminologyService, TraceSink,
    TracingSink,
};
pub use ast::Expression;
pub use cache::{default_cache, CacheStats, ExpressionCache};
pub use collection::Collection;
pub use context::{EvalContext, Limits};
pub use engine::{compile, must_compile, Engine};
pub use error::{AdapterKind, Error, Result};
pub use evaluator::Evaluator;
pub use value::{DatePrecision, DateTimePrecision, ObjectValue, TimePrecision, Value};
