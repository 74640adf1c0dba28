#![allow(dead_code)]

use calyx_fhirpath::{Collection, Engine};

pub const BASIC: &str = r#"{"resourceType": "Basic"}"#;

pub fn engine() -> Engine {
    Engine::new()
}

pub fn eval_doc(expr: &str, doc: &str) -> Collection {
    Engine::new()
        .evaluate(expr, doc.as_bytes())
        .unwrap_or_else(|e| panic!("evaluation of {expr:?} failed: {e}"))
}

/// Evaluate against a minimal resource; for expressions over literals.
pub fn eval(expr: &str) -> Collection {
    eval_doc(expr, BASIC)
}

pub fn rendered(collection: &Collection) -> Vec<String> {
    collection.iter().map(|v| v.render()).collect()
}

pub fn boolean(expr: &str) -> bool {
    eval(expr)
        .as_boolean()
        .unwrap_or_else(|e| panic!("{expr:?} did not yield a boolean: {e}"))
}

pub fn integer(expr: &str) -> i64 {
    eval(expr)
        .as_integer()
        .unwrap_or_else(|e| panic!("{expr:?} did not yield an integer: {e}"))
}

pub fn string(expr: &str) -> String {
    eval(expr)
        .as_string()
        .unwrap_or_else(|e| panic!("{expr:?} did not yield a string: {e}"))
        .to_string()
}

pub fn is_empty(expr: &str) -> bool {
    eval(expr).is_empty()
}
