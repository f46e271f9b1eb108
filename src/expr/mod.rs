//! Formula compiler: lexer, parser, static dependency analysis, edge
//! emission, and a reference evaluator.
//!
//! The pipeline feeds the dependency graph: [`parser::parse`] builds an
//! AST with UTF-8 byte spans, [`analysis::analyze`] resolves references
//! into a [`analysis::DepSummary`], and [`emit::build_dep_events`] turns
//! the summary into `EdgeAdded(uses)` events for the log.

pub mod analysis;
pub mod ast;
pub mod diagnostic;
pub mod emit;
pub mod eval;
mod lexer;
pub mod parser;

pub use analysis::{analyze, DepEntry, DepSummary, Resolver, UnresolvedRef, ALLOWED_FUNCTIONS};
pub use ast::{BinaryOp, Expr, ExprKind, Span, UnaryOp};
pub use diagnostic::{Diagnostic, DiagnosticCode, DiagnosticLevel};
pub use emit::build_dep_events;
pub use eval::{eval, EvalError, ValueResolver};
pub use parser::parse;
