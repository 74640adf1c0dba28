//! Token-level assertions through the public lexer surface.

use calyx_fhirpath::lexer::tokenize;
use calyx_fhirpath::token::TokenKind;

fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input)
        .unwrap()
        .iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn test_full_expression_token_stream() {
    assert_eq!(
        kinds("Bundle.entry.resource.where(status = 'final').id"),
        vec![
            TokenKind::Identifier,
            TokenKind::Dot,
            TokenKind::Identifier,
            TokenKind::Dot,
            TokenKind::Identifier,
            TokenKind::Dot,
            TokenKind::Identifier,
            TokenKind::OpenParen,
            TokenKind::Identifier,
            TokenKind::Equal,
            TokenKind::String,
            TokenKind::CloseParen,
            TokenKind::Dot,
            TokenKind::Identifier,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_quantity_literal_tokens() {
    assert_eq!(
        kinds("1000 'mg' = 1 'g'"),
        vec![
            TokenKind::Number,
            TokenKind::String,
            TokenKind::Equal,
            TokenKind::Number,
            TokenKind::String,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_delimited_identifier() {
    let tokens = tokenize("`weird field`.value").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::DelimitedIdentifier);
    assert_eq!(tokens[0].text, "weird field");
}

#[test]
fn test_unicode_escape() {
    let tokens = tokenize(r"'Aé'").unwrap();
    assert_eq!(tokens[0].text, "Aé");
}

#[test]
fn test_spans_track_lines() {
    let tokens = tokenize("a\n  b").unwrap();
    assert_eq!(tokens[0].span.line, 1);
    assert_eq!(tokens[1].span.line, 2);
    assert_eq!(tokens[1].span.column, 3);
}

#[test]
fn test_lexer_rejects_garbage() {
    assert!(tokenize("a # b").is_err());
    assert!(tokenize("'unterminated").is_err());
    assert!(tokenize("@20").is_err());
}
