//! AST-level assertions through the public parser surface.

use calyx_fhirpath::ast::{BinaryOp, Expression, Literal};
use calyx_fhirpath::parser::parse;
use calyx_fhirpath::Error;

#[test]
fn test_operator_precedence_chain() {
    // 1 + 2 * 3 = 7 and 2 < 3 or false
    // parses as ((((1 + (2 * 3)) = 7) and (2 < 3)) or false)
    let ast = parse("1 + 2 * 3 = 7 and 2 < 3 or false").unwrap();
    let Expression::Binary { op, left, .. } = ast else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Or);
    let Expression::Binary { op, .. } = *left else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::And);
}

#[test]
fn test_implies_is_loosest() {
    let ast = parse("a or b implies c").unwrap();
    let Expression::Binary { op, .. } = ast else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Implies);
}

#[test]
fn test_union_between_type_and_inequality() {
    // a < b | c parses as a < (b | c)
    let ast = parse("a < b | c").unwrap();
    let Expression::Binary { op, right, .. } = ast else {
        panic!("expected binary");
    };
    assert_eq!(op, BinaryOp::Less);
    assert!(matches!(
        *right,
        Expression::Binary {
            op: BinaryOp::Union,
            ..
        }
    ));
}

#[test]
fn test_lambda_arguments_stay_unevaluated() {
    let ast = parse("name.where(use = 'official')").unwrap();
    let Expression::Member { member, .. } = ast else {
        panic!("expected member");
    };
    let Expression::Function { name, args } = *member else {
        panic!("expected function");
    };
    assert_eq!(name.as_ref(), "where");
    assert!(matches!(args[0], Expression::Binary { .. }));
}

#[test]
fn test_partial_temporal_literals() {
    assert!(matches!(
        parse("@2015").unwrap(),
        Expression::Literal(Literal::Date(..))
    ));
    assert!(matches!(
        parse("@2015-02T").unwrap(),
        Expression::Literal(Literal::DateTime(..))
    ));
    assert!(matches!(
        parse("@T14").unwrap(),
        Expression::Literal(Literal::Time(..))
    ));
}

#[test]
fn test_indexer_inside_path() {
    let ast = parse("name[0].given[1]").unwrap();
    let Expression::Indexer { target, .. } = ast else {
        panic!("expected indexer");
    };
    assert!(matches!(*target, Expression::Member { .. }));
}

#[test]
fn test_parse_error_reports_position() {
    match parse("1 + + ") {
        Err(Error::Parse { line, column, .. }) => {
            assert_eq!(line, 1);
            assert!(column >= 5);
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_environment_variable_forms() {
    assert!(matches!(parse("%resource").unwrap(), Expression::EnvVariable(_)));
    assert!(matches!(parse("%'vs-name'").unwrap(), Expression::EnvVariable(_)));
    assert!(matches!(parse("%`quoted`").unwrap(), Expression::EnvVariable(_)));
}
