//! Recursive-descent parser for the formula language.
//!
//! Precedence, tightest first: unary → `* / %` → `+ -` → comparison →
//! `&&` → `||`, with `IF(cond, then, else)` as a special form. The parser
//! recovers where it can: diagnostics accumulate and a partially valid
//! input may still yield an AST.

use crate::expr::ast::{BinaryOp, Expr, ExprKind, Span, UnaryOp};
use crate::expr::diagnostic::{Diagnostic, DiagnosticCode};
use crate::expr::lexer::{Lexer, Token, TokenKind};
use crate::value::Value;

/// Parses a formula. Returns the AST (when one could be built) and all
/// accumulated diagnostics; callers should treat any error-level
/// diagnostic as a failed compile even if an AST is present.
pub fn parse(input: &str) -> (Option<Expr>, Vec<Diagnostic>) {
    let tokens = match Lexer::new(input).tokenize() {
        Ok(tokens) => tokens,
        Err(err) => {
            return (
                None,
                vec![Diagnostic::error(
                    DiagnosticCode::LexError,
                    err.span,
                    err.message,
                )],
            )
        }
    };

    let mut parser = Parser {
        tokens,
        pos: 0,
        diags: Vec::new(),
    };
    let expr = parser.parse_expression();
    if expr.is_none() && parser.diags.is_empty() {
        parser.diags.push(Diagnostic::error(
            DiagnosticCode::ParseError,
            Span::default(),
            "empty expression",
        ));
    }
    if parser.current().kind != TokenKind::Eof {
        let span = parser.current().span;
        parser.diags.push(Diagnostic::error(
            DiagnosticCode::ParseError,
            span,
            "unexpected trailing tokens",
        ));
    }
    (expr, parser.diags)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diags: Vec<Diagnostic>,
}

static EOF: Token = Token {
    kind: TokenKind::Eof,
    lit: String::new(),
    span: Span { start: 0, end: 0 },
};

impl Parser {
    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&EOF)
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Consumes a token of the expected kind. On mismatch, records a
    /// diagnostic and fabricates an empty token at the current position
    /// without consuming, so parsing can continue.
    fn expect(&mut self, kind: TokenKind, message: &str) -> Token {
        if self.current().kind == kind {
            return self.advance();
        }
        let span = self.current().span;
        self.diags
            .push(Diagnostic::error(DiagnosticCode::ParseError, span, message));
        Token {
            kind,
            lit: String::new(),
            span,
        }
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.diags
            .push(Diagnostic::error(DiagnosticCode::ParseError, span, message));
    }

    fn parse_expression(&mut self) -> Option<Expr> {
        self.parse_conditional()
    }

    fn parse_conditional(&mut self) -> Option<Expr> {
        if self.current().kind == TokenKind::Identifier
            && self.current().lit == "IF"
            && self.peek_kind(1) == TokenKind::LParen
        {
            let start = self.current().span.start;
            self.advance();
            self.expect(TokenKind::LParen, "expected '(' after IF");
            let cond = self.parse_expression();
            self.expect(TokenKind::Comma, "expected ',' after IF condition");
            let then_branch = self.parse_expression();
            self.expect(TokenKind::Comma, "expected ',' after IF then");
            let else_branch = self.parse_expression();
            let end = self.expect(TokenKind::RParen, "expected ')' to close IF");

            let (Some(cond), Some(then_branch), Some(else_branch)) =
                (cond, then_branch, else_branch)
            else {
                return None;
            };
            return Some(Expr::new(
                ExprKind::If {
                    cond: Box::new(cond),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                },
                Span::new(start, end.span.end),
            ));
        }
        self.parse_logical_or()
    }

    fn parse_logical_or(&mut self) -> Option<Expr> {
        self.parse_binary_level(&[("||", BinaryOp::Or)], Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> Option<Expr> {
        self.parse_binary_level(&[("&&", BinaryOp::And)], Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> Option<Expr> {
        self.parse_binary_level(
            &[
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::Ne),
                ("<=", BinaryOp::Le),
                (">=", BinaryOp::Ge),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        self.parse_binary_level(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Option<Expr> {
        self.parse_binary_level(
            &[
                ("*", BinaryOp::Mul),
                ("/", BinaryOp::Div),
                ("%", BinaryOp::Mod),
            ],
            Self::parse_unary,
        )
    }

    fn parse_binary_level(
        &mut self,
        ops: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> Option<Expr>,
    ) -> Option<Expr> {
        let mut left = next(self);
        loop {
            let current = self.current();
            if current.kind != TokenKind::Op {
                return left;
            }
            let Some(op) = ops
                .iter()
                .find(|(lit, _)| *lit == current.lit)
                .map(|(_, op)| *op)
            else {
                return left;
            };
            let op_span = current.span;
            self.advance();
            let right = next(self);
            match (left.take(), right) {
                (Some(l), Some(r)) => {
                    let span = l.span.to(r.span);
                    left = Some(Expr::new(
                        ExprKind::Binary {
                            op,
                            left: Box::new(l),
                            right: Box::new(r),
                        },
                        span,
                    ));
                }
                (l, _) => {
                    self.error(op_span, "missing operand");
                    return l;
                }
            }
        }
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        if self.current().kind == TokenKind::Op
            && (self.current().lit == "-" || self.current().lit == "!")
        {
            let op = if self.current().lit == "-" {
                UnaryOp::Neg
            } else {
                UnaryOp::Not
            };
            let op_token = self.advance();
            let Some(expr) = self.parse_unary() else {
                self.error(op_token.span, "missing operand");
                return None;
            };
            let span = op_token.span.to(expr.span);
            return Some(Expr::new(
                ExprKind::Unary {
                    op,
                    expr: Box::new(expr),
                },
                span,
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut node = self.parse_primary();
        loop {
            match self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    let id = self.expect(TokenKind::Identifier, "expected identifier after '.'");
                    let object = node?;
                    let span = object.span.to(id.span);
                    node = Some(Expr::new(
                        ExprKind::Property {
                            object: Box::new(object),
                            property: id.lit,
                        },
                        span,
                    ));
                }
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if self.current().kind != TokenKind::RParen {
                        if let Some(arg) = self.parse_expression() {
                            args.push(arg);
                        }
                        while self.current().kind == TokenKind::Comma {
                            self.advance();
                            if let Some(arg) = self.parse_expression() {
                                args.push(arg);
                            }
                        }
                    }
                    let end = self.expect(TokenKind::RParen, "expected ')' after arguments");
                    let callee = node?;
                    let span = callee.span.to(end.span);
                    node = Some(Expr::new(
                        ExprKind::Call {
                            callee: Box::new(callee),
                            args,
                        },
                        span,
                    ));
                }
                _ => return node,
            }
        }
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Dollar => {
                let start = token.span.start;
                self.advance();
                let namespace = self.expect(TokenKind::Identifier, "expected namespace").lit;
                self.expect(TokenKind::Colon, "expected ':' after namespace");
                let name = self.expect(TokenKind::Identifier, "expected name");
                let mut path = vec![name.lit];
                let mut end = name.span.end;
                while self.current().kind == TokenKind::Dot {
                    self.advance();
                    let part = self.expect(TokenKind::Identifier, "expected name segment");
                    end = part.span.end;
                    path.push(part.lit);
                }
                Some(Expr::new(
                    ExprKind::Ref { namespace, path },
                    Span::new(start, end),
                ))
            }
            TokenKind::Number => {
                self.advance();
                let number = token.lit.parse::<f64>().unwrap_or_default();
                Some(Expr::new(
                    ExprKind::Literal(Value::Number(number)),
                    token.span,
                ))
            }
            TokenKind::String => {
                self.advance();
                Some(Expr::new(
                    ExprKind::Literal(Value::String(token.lit)),
                    token.span,
                ))
            }
            TokenKind::Bool => {
                self.advance();
                Some(Expr::new(
                    ExprKind::Literal(Value::Bool(token.lit == "true")),
                    token.span,
                ))
            }
            TokenKind::Null => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Value::Null), token.span))
            }
            TokenKind::Identifier => {
                self.advance();
                Some(Expr::new(ExprKind::Identifier(token.lit), token.span))
            }
            TokenKind::LParen => {
                let start = token.span.start;
                self.advance();
                let inner = self.parse_expression();
                let end = self.expect(TokenKind::RParen, "expected ')'");
                let inner = inner?;
                Some(Expr::new(
                    ExprKind::Group(Box::new(inner)),
                    Span::new(start, end.span.end),
                ))
            }
            _ => {
                self.error(token.span, format!("unexpected token: {:?}", token.lit));
                self.advance();
                None
            }
        }
    }
}
