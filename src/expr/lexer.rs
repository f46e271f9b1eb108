//! Hand-rolled lexer over UTF-8 source with byte-offset spans.

use crate::expr::ast::Span;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum TokenKind {
    Eof,
    Identifier,
    Number,
    String,
    Bool,
    Null,
    Dollar,
    Colon,
    Dot,
    Comma,
    LParen,
    RParen,
    Op,
}

#[derive(Clone, Debug)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub lit: String,
    pub span: Span,
}

#[derive(Debug)]
pub(crate) struct LexError {
    pub message: String,
    pub span: Span,
}

pub(crate) struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn token(&self, kind: TokenKind, start: usize, lit: impl Into<String>) -> Token {
        Token {
            kind,
            lit: lit.into(),
            span: Span::new(start, self.pos),
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_spaces();
        let start = self.pos;
        let Some(ch) = self.bump() else {
            return Ok(self.token(TokenKind::Eof, start, ""));
        };

        match ch {
            '$' => return Ok(self.token(TokenKind::Dollar, start, "$")),
            ':' => return Ok(self.token(TokenKind::Colon, start, ":")),
            '.' => return Ok(self.token(TokenKind::Dot, start, ".")),
            ',' => return Ok(self.token(TokenKind::Comma, start, ",")),
            '(' => return Ok(self.token(TokenKind::LParen, start, "(")),
            ')' => return Ok(self.token(TokenKind::RParen, start, ")")),
            '"' => {
                loop {
                    match self.bump() {
                        None => {
                            return Err(LexError {
                                message: "unterminated string".to_owned(),
                                span: Span::new(start, self.pos),
                            })
                        }
                        Some('"') => break,
                        Some('\\') => {
                            if self.bump().is_none() {
                                return Err(LexError {
                                    message: "unterminated escape".to_owned(),
                                    span: Span::new(start, self.pos),
                                });
                            }
                        }
                        Some(_) => {}
                    }
                }
                // The literal is the raw slice between the quotes; escape
                // sequences are carried through verbatim.
                let lit = &self.src[start + 1..self.pos - 1];
                return Ok(self.token(TokenKind::String, start, lit));
            }
            _ => {}
        }

        if ch.is_ascii_digit() {
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
            if self.peek() == Some('.') {
                self.bump();
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
            let lit = &self.src[start..self.pos];
            return Ok(self.token(TokenKind::Number, start, lit));
        }

        if is_ident_start(ch) {
            while self.peek().is_some_and(is_ident_part) {
                self.bump();
            }
            let lit = &self.src[start..self.pos];
            let kind = match lit {
                "true" | "false" => TokenKind::Bool,
                "null" => TokenKind::Null,
                _ => TokenKind::Identifier,
            };
            return Ok(self.token(kind, start, lit));
        }

        match ch {
            '+' | '-' | '*' | '/' | '%' | '!' | '<' | '>' | '=' => {
                let mut op = String::from(ch);
                if self.peek() == Some('=') {
                    self.bump();
                    op.push('=');
                }
                Ok(self.token(TokenKind::Op, start, op))
            }
            '&' if self.peek() == Some('&') => {
                self.bump();
                Ok(self.token(TokenKind::Op, start, "&&"))
            }
            '|' if self.peek() == Some('|') => {
                self.bump();
                Ok(self.token(TokenKind::Op, start, "||"))
            }
            _ => Err(LexError {
                message: format!("unexpected character: {ch:?}"),
                span: Span::new(start, self.pos),
            }),
        }
    }

    /// Lexes the whole input up front; the parser works over the vector.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .ok()
            .map(|tokens| tokens.into_iter().map(|t| t.kind).collect())
            .unwrap_or_default()
    }

    #[test]
    fn lexes_refs_and_calls() {
        assert_eq!(
            kinds("$field:order.total + SUM(1, 2)"),
            vec![
                TokenKind::Dollar,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Op,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::Number,
                TokenKind::Comma,
                TokenKind::Number,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn spans_are_byte_offsets() {
        let tokens = Lexer::new("$field:顧客名").tokenize().unwrap();
        let last_ident = &tokens[tokens.len() - 2];
        assert_eq!(last_ident.kind, TokenKind::Identifier);
        assert_eq!(last_ident.lit, "顧客名");
        assert_eq!(last_ident.span.end, "$field:顧客名".len());
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(
            kinds("a <= b && c != d || e"),
            vec![
                TokenKind::Identifier,
                TokenKind::Op,
                TokenKind::Identifier,
                TokenKind::Op,
                TokenKind::Identifier,
                TokenKind::Op,
                TokenKind::Identifier,
                TokenKind::Op,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_literal_keeps_raw_escapes() {
        let tokens = Lexer::new(r#""a\"b""#).tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lit, r#"a\"b"#);
    }

    #[test]
    fn rejects_stray_characters() {
        assert!(Lexer::new("1 # 2").tokenize().is_err());
        assert!(Lexer::new(r#""open"#).tokenize().is_err());
    }
}
