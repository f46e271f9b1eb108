//! Compiler diagnostics with source locations.

use std::fmt;

use crate::expr::ast::Span;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

/// Stable machine-readable diagnostic codes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DiagnosticCode {
    LexError,
    ParseError,
    UnresolvedRef,
    RelAttrRequired,
    UndefinedIdentifier,
    InvalidCall,
    UnknownFunction,
    BadArity,
    UnknownColumn,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::LexError => "LEX_ERROR",
            DiagnosticCode::ParseError => "PARSE_ERROR",
            DiagnosticCode::UnresolvedRef => "UNRESOLVED_REF",
            DiagnosticCode::RelAttrRequired => "REL_ATTR_REQUIRED",
            DiagnosticCode::UndefinedIdentifier => "UNDEFINED_IDENTIFIER",
            DiagnosticCode::InvalidCall => "INVALID_CALL",
            DiagnosticCode::UnknownFunction => "UNKNOWN_FUNCTION",
            DiagnosticCode::BadArity => "BAD_ARITY",
            DiagnosticCode::UnknownColumn => "UNKNOWN_COLUMN",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal compiler message. Diagnostics accumulate; parsing and
/// analysis continue where possible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub span: Span,
    pub message: String,
    pub code: DiagnosticCode,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            level: DiagnosticLevel::Error,
            span,
            message: message.into(),
            code,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}..{}: {}",
            self.code, self.span.start, self.span.end, self.message
        )
    }
}
