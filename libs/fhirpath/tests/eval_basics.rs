//! Path navigation, literals, variables, and the end-to-end scenarios.

mod test_support;

use test_support::{boolean, eval, eval_doc, integer, is_empty, rendered, string};

// ============================================
// Literals
// ============================================

#[test]
fn test_literals() {
    assert!(boolean("true"));
    assert!(!boolean("false"));
    assert_eq!(integer("42"), 42);
    assert_eq!(string("'hello'"), "hello");
    assert_eq!(rendered(&eval("3.14")), vec!["3.14"]);
    assert!(is_empty("{}"));
}

#[test]
fn test_collection_literal() {
    assert_eq!(rendered(&eval("{1, 2, 3}")), vec!["1", "2", "3"]);
    // Unlike `|`, the collection literal keeps duplicates.
    assert_eq!(integer("{1, 1, 2}.count()"), 3);
}

#[test]
fn test_temporal_literals() {
    assert_eq!(rendered(&eval("@2015-02-04")), vec!["2015-02-04"]);
    assert_eq!(rendered(&eval("@2015-02")), vec!["2015-02"]);
    assert_eq!(rendered(&eval("@T14:34:28")), vec!["14:34:28"]);
    assert_eq!(
        rendered(&eval("@2015-02-04T14:34:28Z")),
        vec!["2015-02-04T14:34:28Z"]
    );
}

#[test]
fn test_quantity_literals() {
    assert_eq!(rendered(&eval("5 'mg'")), vec!["5 'mg'"]);
    assert_eq!(rendered(&eval("2 days")), vec!["2 days"]);
}

// ============================================
// Path navigation
// ============================================

const PATIENT: &str = r#"{
    "resourceType": "Patient",
    "active": true,
    "name": [
        {"use": "official", "family": "Chalmers", "given": ["Peter", "James"]},
        {"use": "usual", "given": ["Jim"]}
    ],
    "deceasedBoolean": null
}"#;

#[test]
fn test_root_type_absorption() {
    let result = eval_doc("Patient.active", PATIENT);
    assert!(result.as_boolean().unwrap());

    // A non-matching leading identifier is a plain (absent) field.
    assert!(eval_doc("Observation.active", PATIENT).is_empty());
}

#[test]
fn test_type_name_absorption_is_first_step_only() {
    // `HumanName` is not the first path step, so it is a literal field
    // access; the shape-inferred type name of a nested object never absorbs.
    let doc = r#"{"resourceType":"Patient","name":[{"family":"Smith"}]}"#;
    assert!(eval_doc("Patient.name.HumanName", doc).is_empty());
    assert!(eval_doc("Patient.name.HumanName.family", doc).is_empty());
    assert_eq!(rendered(&eval_doc("Patient.name.family", doc)), vec!["Smith"]);
}

#[test]
fn test_field_access_splices_arrays() {
    let result = eval_doc("Patient.name.given", PATIENT);
    assert_eq!(rendered(&result), vec!["Peter", "James", "Jim"]);
}

#[test]
fn test_absent_field_is_empty() {
    assert!(eval_doc("Patient.identifier", PATIENT).is_empty());
    assert!(eval_doc("Patient.deceasedBoolean", PATIENT).is_empty());
}

#[test]
fn test_indexer() {
    assert_eq!(
        rendered(&eval_doc("Patient.name[0].family", PATIENT)),
        vec!["Chalmers"]
    );
    assert!(eval_doc("Patient.name[5]", PATIENT).is_empty());
    assert!(eval_doc("Patient.name[-1]", PATIENT).is_empty());
    assert_eq!(rendered(&eval("(10 | 20 | 30)[1]")), vec!["20"]);
}

#[test]
fn test_environment_variables() {
    assert_eq!(string("%ucum"), "http://unitsofmeasure.org");
    assert_eq!(string("%sct"), "http://snomed.info/sct");
    assert_eq!(string("%loinc"), "http://loinc.org");

    let result = eval_doc("%resource.active", PATIENT);
    assert!(result.as_boolean().unwrap());
    let result = eval_doc("%context.name.family", PATIENT);
    assert_eq!(rendered(&result), vec!["Chalmers"]);
}

#[test]
fn test_undefined_variable_errors() {
    let err = test_support::engine()
        .evaluate("%nope", test_support::BASIC.as_bytes())
        .unwrap_err();
    assert!(matches!(err, calyx_fhirpath::Error::UndefinedVariable(_)));
}

#[test]
fn test_this_binds_to_current_item() {
    assert_eq!(integer("(42).select($this)"), 42);
    assert!(boolean("(1 | 2 | 3).select($this).count() = 3"));
}

// ============================================
// End-to-end scenarios
// ============================================

#[test]
fn test_scenario_nested_extraction_over_bundle() {
    let doc = r#"{"resourceType":"Bundle","type":"searchset","entry":[
        {"resource":{"resourceType":"Observation","id":"o1","status":"final"}},
        {"resource":{"resourceType":"Observation","id":"o2","status":"preliminary"}},
        {"resource":{"resourceType":"Observation","id":"o3","status":"final"}}]}"#;
    let result = eval_doc("Bundle.entry.resource.where(status = 'final').id", doc);
    assert_eq!(rendered(&result), vec!["o1", "o3"]);
}

#[test]
fn test_scenario_ucum_normalization() {
    assert!(boolean("1000 'mg' = 1 'g'"));
}

#[test]
fn test_scenario_three_valued_short_circuit() {
    // Patient.active is absent; false and {} is still false.
    let result = eval_doc("false and Patient.active", r#"{"resourceType":"Patient"}"#);
    assert!(!result.as_boolean().unwrap());
}

#[test]
fn test_scenario_aggregate_fold() {
    assert_eq!(integer("(1 | 2 | 3 | 4).aggregate($total + $this, 0)"), 10);
}

#[test]
fn test_scenario_vacuous_invariant() {
    let doc = r#"{"resourceType":"Patient","name":[{"family":"Smith"}]}"#;
    let result = eval_doc("Patient.name.exists() or Patient.identifier.exists()", doc);
    assert!(result.as_boolean().unwrap());
}

#[test]
fn test_scenario_partial_precision_comparison() {
    assert!(is_empty("@2024 < @2024-06-15"));
}

// ============================================
// Shared ASTs and determinism
// ============================================

#[test]
fn test_compiled_expression_is_shareable() {
    let ast = calyx_fhirpath::compile("Patient.name.given").unwrap();
    let engine = test_support::engine();
    let a = engine.evaluate_ast(&ast, PATIENT.as_bytes()).unwrap();
    let b = engine.evaluate_ast(&ast, PATIENT.as_bytes()).unwrap();
    assert_eq!(rendered(&a), rendered(&b));

    let threads: Vec<_> = (0..4)
        .map(|_| {
            let ast = ast.clone();
            std::thread::spawn(move || {
                let engine = calyx_fhirpath::Engine::new();
                let result = engine.evaluate_ast(&ast, PATIENT.as_bytes()).unwrap();
                result.len()
            })
        })
        .collect();
    for handle in threads {
        assert_eq!(handle.join().unwrap(), 3);
    }
}
