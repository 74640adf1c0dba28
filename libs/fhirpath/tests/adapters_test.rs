//! Adapter injection, error degradation, and the resource-limit surface.

mod test_support;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use calyx_fhirpath::{
    AdapterKind, CollectingSink, Engine, Error, ProfileValidator, ReferenceResolver,
    TerminologyService,
};

// ============================================
// Reference resolution
// ============================================

struct MapResolver;

impl ReferenceResolver for MapResolver {
    fn resolve(&self, reference: &str) -> calyx_fhirpath::Result<Option<Vec<u8>>> {
        match reference {
            "Patient/123" => Ok(Some(
                br#"{"resourceType":"Patient","id":"123","gender":"female"}"#.to_vec(),
            )),
            "Patient/missing" => Ok(None),
            _ => Err(Error::Adapter {
                kind: AdapterKind::Resolver,
                message: format!("no such reference: {reference}"),
            }),
        }
    }
}

#[test]
fn test_resolve_through_injected_resolver() {
    let engine = Engine::new().with_resolver(Arc::new(MapResolver));
    let doc = r#"{"resourceType":"Observation","subject":{"reference":"Patient/123"}}"#;

    let result = engine
        .evaluate("Observation.subject.resolve().gender", doc.as_bytes())
        .unwrap();
    assert_eq!(result.as_string().unwrap().as_ref(), "female");

    let result = engine
        .evaluate("Observation.subject.resolve() is Patient", doc.as_bytes())
        .unwrap();
    assert!(result.as_boolean().unwrap());
}

#[test]
fn test_resolve_skips_failures_silently() {
    let engine = Engine::new().with_resolver(Arc::new(MapResolver));
    let doc = r#"{"resourceType":"List","entry":[
        {"item":{"reference":"Patient/123"}},
        {"item":{"reference":"Patient/missing"}},
        {"item":{"reference":"Device/unknown"}}]}"#;

    let result = engine
        .evaluate("List.entry.item.resolve().id", doc.as_bytes())
        .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.as_string().unwrap().as_ref(), "123");
}

// ============================================
// Terminology
// ============================================

struct GenderValueSet;

impl TerminologyService for GenderValueSet {
    fn member_of(
        &self,
        code: &serde_json::Value,
        valueset_url: &str,
    ) -> calyx_fhirpath::Result<bool> {
        if valueset_url != "http://hl7.org/fhir/ValueSet/administrative-gender" {
            return Err(Error::Adapter {
                kind: AdapterKind::Terminology,
                message: format!("unknown valueset: {valueset_url}"),
            });
        }
        let code_str = code
            .get("code")
            .and_then(|c| c.as_str())
            .or_else(|| {
                code.get("coding")
                    .and_then(|c| c.get(0))
                    .and_then(|c| c.get("code"))
                    .and_then(|c| c.as_str())
            })
            .unwrap_or("");
        Ok(matches!(code_str, "male" | "female" | "other" | "unknown"))
    }
}

#[test]
fn test_member_of_code_shapes() {
    let engine = Engine::new().with_terminology(Arc::new(GenderValueSet));
    let doc = r#"{"resourceType":"Patient","gender":"female",
        "maritalStatus":{"coding":[{"system":"http://x","code":"M"}]}}"#;

    // Bare code (a JSON string).
    let result = engine
        .evaluate(
            "Patient.gender.memberOf('http://hl7.org/fhir/ValueSet/administrative-gender')",
            doc.as_bytes(),
        )
        .unwrap();
    assert!(result.as_boolean().unwrap());

    // CodeableConcept shape.
    let result = engine
        .evaluate(
            "Patient.maritalStatus.memberOf('http://hl7.org/fhir/ValueSet/administrative-gender')",
            doc.as_bytes(),
        )
        .unwrap();
    assert!(!result.as_boolean().unwrap());

    // Adapter failure degrades to empty.
    let result = engine
        .evaluate(
            "Patient.gender.memberOf('http://unknown.example.org')",
            doc.as_bytes(),
        )
        .unwrap();
    assert!(result.is_empty());
}

// ============================================
// Profiles
// ============================================

struct ResourceTypeValidator;

impl ProfileValidator for ResourceTypeValidator {
    fn conforms_to(&self, resource: &[u8], profile_url: &str) -> calyx_fhirpath::Result<bool> {
        let json: serde_json::Value = serde_json::from_slice(resource).map_err(|e| {
            Error::Adapter {
                kind: AdapterKind::Profile,
                message: e.to_string(),
            }
        })?;
        let rt = json
            .get("resourceType")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        Ok(profile_url.ends_with(rt))
    }
}

#[test]
fn test_conforms_to() {
    let engine = Engine::new().with_profile_validator(Arc::new(ResourceTypeValidator));
    let doc = r#"{"resourceType":"Patient"}"#;

    let result = engine
        .evaluate(
            "Patient.conformsTo('http://hl7.org/fhir/StructureDefinition/Patient')",
            doc.as_bytes(),
        )
        .unwrap();
    assert!(result.as_boolean().unwrap());

    let result = engine
        .evaluate(
            "Patient.conformsTo('http://hl7.org/fhir/StructureDefinition/Observation')",
            doc.as_bytes(),
        )
        .unwrap();
    assert!(!result.as_boolean().unwrap());
}

// ============================================
// Trace
// ============================================

#[test]
fn test_trace_emits_and_passes_through() {
    let sink = CollectingSink::new();
    let engine = Engine::new().with_trace_sink(sink.clone());
    let doc = r#"{"resourceType":"Patient","name":[{"family":"Smith"},{"family":"Jones"}]}"#;

    let result = engine
        .evaluate("Patient.name.trace('names').family", doc.as_bytes())
        .unwrap();
    assert_eq!(result.len(), 2);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, "names");
    assert_eq!(records[0].1.len(), 2);
}

#[test]
fn test_trace_projection() {
    let sink = CollectingSink::new();
    let engine = Engine::new().with_trace_sink(sink.clone());
    let doc = r#"{"resourceType":"Patient","name":[{"family":"Smith"},{"family":"Jones"}]}"#;

    let result = engine
        .evaluate("Patient.name.trace('families', family).count()", doc.as_bytes())
        .unwrap();
    assert_eq!(result.as_integer().unwrap(), 2);

    let records = sink.records();
    assert_eq!(records[0].1, vec!["Smith".to_string(), "Jones".to_string()]);
}

// ============================================
// Limits & cancellation
// ============================================

#[test]
fn test_cancellation() {
    let flag = Arc::new(AtomicBool::new(true));
    let engine = Engine::new().with_cancellation(flag);
    let err = engine
        .evaluate("1 + 1", test_support::BASIC.as_bytes())
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[test]
fn test_timeout() {
    let engine = Engine::new().with_timeout(Duration::from_nanos(1));
    let err = engine
        .evaluate(
            "(1 | 2 | 3 | 4 | 5).select($this * 2).sum()",
            test_support::BASIC.as_bytes(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Timeout));
}

#[test]
fn test_depth_limit() {
    let engine = Engine::new().with_max_depth(4);
    let err = engine
        .evaluate("a.b.c.d.e.f.g.h", test_support::BASIC.as_bytes())
        .unwrap_err();
    assert!(matches!(err, Error::DepthExceeded(4)));
}

#[test]
fn test_collection_size_limit() {
    let engine = Engine::new().with_max_collection_size(3);
    let err = engine
        .evaluate("{1, 2, 3, 4}", test_support::BASIC.as_bytes())
        .unwrap_err();
    assert!(matches!(err, Error::SizeExceeded(3)));
}
