//! FHIRPath lexer.
//!
//! Turns an expression string into a token vector. Whitespace and both
//! comment forms (`//` line, `/* */` block) are skipped. String literals and
//! delimited identifiers are unescaped here so the parser only sees decoded
//! text.

use crate::error::{Error, Result};
use crate::token::{Span, Token, TokenKind};

pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn span(&self) -> Span {
        Span {
            offset: self.position,
            line: self.line,
            column: self.column,
        }
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.position += 1;
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            while self.current().is_some_and(|c| c.is_whitespace()) {
                self.advance();
            }
            match (self.current(), self.peek()) {
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.current() {
                        self.advance();
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.span();
                    self.advance();
                    self.advance();
                    loop {
                        match (self.current(), self.peek()) {
                            (Some('*'), Some('/')) => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            (Some(_), _) => self.advance(),
                            (None, _) => {
                                return Err(Error::Parse {
                                    line: start.line,
                                    column: start.column,
                                    message: "unterminated block comment".into(),
                                });
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;

        let span = self.span();
        let Some(c) = self.current() else {
            return Ok(Token::eof(span));
        };

        let simple = |kind| -> Option<TokenKind> { Some(kind) };
        let single = match c {
            '.' => simple(TokenKind::Dot),
            '[' => simple(TokenKind::OpenBracket),
            ']' => simple(TokenKind::CloseBracket),
            '(' => simple(TokenKind::OpenParen),
            ')' => simple(TokenKind::CloseParen),
            '{' => simple(TokenKind::OpenBrace),
            '}' => simple(TokenKind::CloseBrace),
            ',' => simple(TokenKind::Comma),
            '+' => simple(TokenKind::Plus),
            '-' => simple(TokenKind::Minus),
            '*' => simple(TokenKind::Star),
            '/' => simple(TokenKind::Slash),
            '&' => simple(TokenKind::Ampersand),
            '|' => simple(TokenKind::Pipe),
            '=' => simple(TokenKind::Equal),
            '~' => simple(TokenKind::Equivalent),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return Ok(Token::new(kind, c.to_string(), span));
        }

        match c {
            '<' => {
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                    Ok(Token::new(TokenKind::LessEqual, "<=", span))
                } else {
                    Ok(Token::new(TokenKind::Less, "<", span))
                }
            }
            '>' => {
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                    Ok(Token::new(TokenKind::GreaterEqual, ">=", span))
                } else {
                    Ok(Token::new(TokenKind::Greater, ">", span))
                }
            }
            '!' => {
                self.advance();
                match self.current() {
                    Some('=') => {
                        self.advance();
                        Ok(Token::new(TokenKind::NotEqual, "!=", span))
                    }
                    Some('~') => {
                        self.advance();
                        Ok(Token::new(TokenKind::NotEquivalent, "!~", span))
                    }
                    _ => Err(self.error("unexpected '!'")),
                }
            }
            '\'' => {
                let text = self.read_string()?;
                Ok(Token::new(TokenKind::String, text, span))
            }
            '`' => {
                let text = self.read_delimited_identifier()?;
                Ok(Token::new(TokenKind::DelimitedIdentifier, text, span))
            }
            '%' => {
                self.advance();
                let text = match self.current() {
                    Some('\'') => self.read_string()?,
                    Some('`') => self.read_delimited_identifier()?,
                    _ => {
                        let ident = self.read_identifier_text();
                        if ident.is_empty() {
                            return Err(self.error("expected name after '%'"));
                        }
                        ident
                    }
                };
                Ok(Token::new(TokenKind::EnvVariable, text, span))
            }
            '$' => {
                self.advance();
                let ident = self.read_identifier_text();
                let kind = match ident.as_str() {
                    "this" => TokenKind::This,
                    "index" => TokenKind::Index,
                    "total" => TokenKind::Total,
                    _ => return Err(self.error(format!("unknown variable: ${ident}"))),
                };
                Ok(Token::new(kind, format!("${ident}"), span))
            }
            '@' => self.read_temporal(span),
            c if c.is_ascii_digit() => {
                let (text, is_long) = self.read_number();
                let kind = if is_long {
                    TokenKind::LongNumber
                } else {
                    TokenKind::Number
                };
                Ok(Token::new(kind, text, span))
            }
            c if c.is_alphabetic() || c == '_' => {
                let ident = self.read_identifier_text();
                let kind = match ident.as_str() {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "as" => TokenKind::As,
                    "is" => TokenKind::Is,
                    "div" => TokenKind::Div,
                    "mod" => TokenKind::Mod,
                    "in" => TokenKind::In,
                    "contains" => TokenKind::Contains,
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    "xor" => TokenKind::Xor,
                    "implies" => TokenKind::Implies,
                    _ => TokenKind::Identifier,
                };
                Ok(Token::new(kind, ident, span))
            }
            other => Err(self.error(format!("unexpected character: {other}"))),
        }
    }

    fn read_identifier_text(&mut self) -> String {
        let start = self.position;
        while self
            .current()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        self.chars[start..self.position].iter().collect()
    }

    /// Shared escape handling for `'strings'` and `` `identifiers` ``.
    fn read_quoted(&mut self, quote: char, what: &str) -> Result<String> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.current() {
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        value.push(quote);
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        return Ok(value);
                    }
                }
                Some('\\') => {
                    self.advance();
                    let Some(escaped) = self.current() else {
                        return Err(self.error(format!("incomplete escape in {what}")));
                    };
                    match escaped {
                        '\'' | '"' | '`' | '\\' | '/' => value.push(escaped),
                        'f' => value.push('\x0C'),
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        'u' => {
                            self.advance(); // 'u'
                            let mut hex = String::new();
                            for _ in 0..4 {
                                match self.current() {
                                    Some(h) if h.is_ascii_hexdigit() => {
                                        hex.push(h);
                                        self.advance();
                                    }
                                    _ => {
                                        return Err(
                                            self.error("invalid unicode escape sequence")
                                        );
                                    }
                                }
                            }
                            let code = u32::from_str_radix(&hex, 16)
                                .map_err(|_| self.error("invalid unicode code point"))?;
                            value.push(
                                char::from_u32(code)
                                    .ok_or_else(|| self.error("invalid unicode character"))?,
                            );
                            continue; // already past the escape
                        }
                        other => value.push(other),
                    }
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => return Err(self.error(format!("unterminated {what}"))),
            }
        }
    }

    fn read_string(&mut self) -> Result<String> {
        self.read_quoted('\'', "string literal")
    }

    fn read_delimited_identifier(&mut self) -> Result<String> {
        self.read_quoted('`', "delimited identifier")
    }

    fn read_number(&mut self) -> (String, bool) {
        let start = self.position;
        let mut has_decimal = false;
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        // Consume a decimal point only when digits follow, so `1.empty()`
        // leaves the dot for member access.
        if self.current() == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            has_decimal = true;
            self.advance();
            while self.current().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let mut is_long = false;
        if !has_decimal && self.current() == Some('L') {
            is_long = true;
            self.advance();
        }
        (self.chars[start..self.position].iter().collect(), is_long)
    }

    fn read_digits(&mut self, count: usize, what: &str) -> Result<String> {
        let mut out = String::new();
        for _ in 0..count {
            match self.current() {
                Some(c) if c.is_ascii_digit() => {
                    out.push(c);
                    self.advance();
                }
                _ => return Err(self.error(format!("expected {count}-digit {what}"))),
            }
        }
        Ok(out)
    }

    /// Date, DateTime, and Time literals behind `@`, including partial
    /// precision forms (`@2015`, `@2015-02T`, `@T14:30`).
    fn read_temporal(&mut self, span: Span) -> Result<Token> {
        self.advance(); // '@'

        if self.current() == Some('T') {
            self.advance();
            let time = self.read_time_text()?;
            return Ok(Token::new(TokenKind::Time, time, span));
        }

        let date = self.read_date_text()?;
        if self.current() != Some('T') {
            return Ok(Token::new(TokenKind::Date, date, span));
        }
        self.advance(); // 'T'

        if !self.current().is_some_and(|c| c.is_ascii_digit()) {
            // Partial datetime such as `@2015T`.
            return Ok(Token::new(TokenKind::DateTime, format!("{date}T"), span));
        }

        let time = self.read_time_text()?;
        let tz = self.read_timezone_text()?;
        Ok(Token::new(
            TokenKind::DateTime,
            format!("{date}T{time}{tz}"),
            span,
        ))
    }

    fn read_date_text(&mut self) -> Result<String> {
        let mut out = self.read_digits(4, "year")?;
        if self.current() == Some('-') {
            out.push('-');
            self.advance();
            out.push_str(&self.read_digits(2, "month")?);
            if self.current() == Some('-') {
                out.push('-');
                self.advance();
                out.push_str(&self.read_digits(2, "day")?);
            }
        }
        Ok(out)
    }

    fn read_time_text(&mut self) -> Result<String> {
        let mut out = self.read_digits(2, "hour")?;
        if self.current() == Some(':') {
            out.push(':');
            self.advance();
            out.push_str(&self.read_digits(2, "minute")?);
            if self.current() == Some(':') {
                out.push(':');
                self.advance();
                out.push_str(&self.read_digits(2, "second")?);
                // Fractional seconds only when digits follow the dot, so
                // `@T14:34:28.is(Time)` keeps its member access.
                if self.current() == Some('.')
                    && self.peek().is_some_and(|c| c.is_ascii_digit())
                {
                    out.push('.');
                    self.advance();
                    while let Some(c) = self.current() {
                        if !c.is_ascii_digit() {
                            break;
                        }
                        out.push(c);
                        self.advance();
                    }
                }
            }
        }
        Ok(out)
    }

    fn read_timezone_text(&mut self) -> Result<String> {
        match self.current() {
            Some('Z') => {
                self.advance();
                Ok("Z".into())
            }
            Some(sign @ ('+' | '-')) => {
                self.advance();
                let hours = self.read_digits(2, "timezone hour")?;
                if self.current() != Some(':') {
                    return Err(self.error("expected ':' in timezone offset"));
                }
                self.advance();
                let minutes = self.read_digits(2, "timezone minute")?;
                Ok(format!("{sign}{hours}:{minutes}"))
            }
            _ => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_identifiers_and_path() {
        let tokens = tokenize("Patient.name.given").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "Patient");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
        assert_eq!(tokens[2].text, "name");
        assert_eq!(tokens[4].text, "given");
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r"'it\'s' 'aAb' 'tab\there'").unwrap();
        assert_eq!(tokens[0].text, "it's");
        assert_eq!(tokens[1].text, "aAb");
        assert_eq!(tokens[2].text, "tab\there");
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("123 45.67 999L").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(tokens[1].text, "45.67");
        assert_eq!(tokens[2].kind, TokenKind::LongNumber);
    }

    #[test]
    fn test_integer_method_call_keeps_dot() {
        assert_eq!(
            kinds("1.empty()"),
            vec![
                TokenKind::Number,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::OpenParen,
                TokenKind::CloseParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("and or xor implies div mod in contains as is"),
            vec![
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Xor,
                TokenKind::Implies,
                TokenKind::Div,
                TokenKind::Mod,
                TokenKind::In,
                TokenKind::Contains,
                TokenKind::As,
                TokenKind::Is,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_special_variables() {
        assert_eq!(
            kinds("$this $index $total"),
            vec![
                TokenKind::This,
                TokenKind::Index,
                TokenKind::Total,
                TokenKind::Eof
            ]
        );
        assert!(tokenize("$bogus").is_err());
    }

    #[test]
    fn test_env_variables() {
        let tokens = tokenize("%resource %'vs-name' %`quoted`").unwrap();
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::EnvVariable));
        assert_eq!(tokens[0].text, "resource");
        assert_eq!(tokens[1].text, "vs-name");
        assert_eq!(tokens[2].text, "quoted");
    }

    #[test]
    fn test_temporal_literals() {
        let tokens = tokenize("@2015 @2015-02-04 @2015-02T @2015-02-04T14:34:28Z @T14:34").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Date);
        assert_eq!(tokens[0].text, "2015");
        assert_eq!(tokens[1].kind, TokenKind::Date);
        assert_eq!(tokens[2].kind, TokenKind::DateTime);
        assert_eq!(tokens[2].text, "2015-02T");
        assert_eq!(tokens[3].kind, TokenKind::DateTime);
        assert_eq!(tokens[3].text, "2015-02-04T14:34:28Z");
        assert_eq!(tokens[4].kind, TokenKind::Time);
        assert_eq!(tokens[4].text, "14:34");
    }

    #[test]
    fn test_comments() {
        let tokens = tokenize("name // rest of line\n.given /* block */ .family").unwrap();
        let idents: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(idents, vec!["name", "given", "family"]);
        assert!(tokenize("a /* never closed").is_err());
    }

    #[test]
    fn test_division_is_not_comment() {
        assert_eq!(
            kinds("4 / 2"),
            vec![
                TokenKind::Number,
                TokenKind::Slash,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_error_positions() {
        let err = tokenize("name ^ given").unwrap_err();
        match err {
            Error::Parse { line, column, .. } => {
                assert_eq!(line, 1);
                assert_eq!(column, 6);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
