//! Static dependency extraction over a parsed formula.
//!
//! The analyzer resolves `$ns:path` references through a caller-supplied
//! [`Resolver`] and classifies what the expression reads: `exact_deps` are
//! specific nodes, `schema_deps` are entities whose *schema* matters
//! because a LOOKUP column could not be pinned down statically.

use std::collections::HashSet;

use crate::expr::ast::{Expr, ExprKind, Span};
use crate::expr::diagnostic::{Diagnostic, DiagnosticCode};
use crate::model::NodeId;
use crate::value::Value;

/// Resolves formula references to configuration nodes.
pub trait Resolver {
    /// Resolves a `$namespace:path` reference to a node id.
    fn resolve_ref(&self, namespace: &str, path: &[String]) -> Option<NodeId>;
    /// Resolves a column name against an entity's schema.
    fn resolve_entity_field(&self, entity: &NodeId, column: &str) -> Option<NodeId>;
}

/// A resolved dependency with the span that introduced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepEntry {
    pub node_id: NodeId,
    pub span: Span,
}

/// A reference the resolver could not map to a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedRef {
    pub namespace: String,
    pub path: Vec<String>,
    pub span: Span,
}

/// Output of static analysis for one expression.
#[derive(Clone, Debug)]
pub struct DepSummary {
    /// The expression's own node id.
    pub self_id: NodeId,
    /// The field the expression writes into.
    pub target_field: NodeId,
    /// Nodes the expression directly reads.
    pub exact_deps: Vec<DepEntry>,
    /// Entities whose whole schema may matter (dynamic LOOKUP columns).
    pub schema_deps: Vec<DepEntry>,
    pub unresolved: Vec<UnresolvedRef>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Functions a formula is allowed to call.
pub const ALLOWED_FUNCTIONS: &[&str] = &[
    "IF", "COALESCE", "ROUND", "FLOOR", "CEIL", "ABS", "MIN", "MAX", "SUM", "CONCAT", "LEFT",
    "RIGHT", "LEN", "TRIM", "UPPER", "LOWER", "CONTAINS", "TODAY", "NOW", "DATE_ADD", "DATE_DIFF",
    "FORMAT_DATE", "LOOKUP", "FILTER", "COUNT",
];

pub fn is_allowed_function(name: &str) -> bool {
    ALLOWED_FUNCTIONS.contains(&name)
}

struct Analyzer<'a> {
    resolver: &'a dyn Resolver,
    summary: DepSummary,
    seen_exact: HashSet<NodeId>,
    seen_schema: HashSet<NodeId>,
}

/// Resolves references and extracts dependencies from a parsed expression.
pub fn analyze(
    root: &Expr,
    resolver: &dyn Resolver,
    self_id: &NodeId,
    target_field: &NodeId,
) -> DepSummary {
    let mut analyzer = Analyzer {
        resolver,
        summary: DepSummary {
            self_id: self_id.clone(),
            target_field: target_field.clone(),
            exact_deps: Vec::new(),
            schema_deps: Vec::new(),
            unresolved: Vec::new(),
            diagnostics: Vec::new(),
        },
        seen_exact: HashSet::new(),
        seen_schema: HashSet::new(),
    };
    analyzer.walk(root);
    analyzer.summary
}

impl Analyzer<'_> {
    fn push_exact(&mut self, node_id: NodeId, span: Span) {
        if self.seen_exact.insert(node_id.clone()) {
            self.summary.exact_deps.push(DepEntry { node_id, span });
        }
    }

    fn push_schema(&mut self, node_id: NodeId, span: Span) {
        if self.seen_schema.insert(node_id.clone()) {
            self.summary.schema_deps.push(DepEntry { node_id, span });
        }
    }

    fn error(&mut self, code: DiagnosticCode, span: Span, message: &str) {
        self.summary
            .diagnostics
            .push(Diagnostic::error(code, span, message));
    }

    /// Full semantic walk: reference rules, identifier rules, and the
    /// call-head allow-list apply here.
    fn walk(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ref { namespace, path } => {
                // A bare relation reference is meaningless; relations only
                // contribute through one of their attributes.
                if namespace == "rel" && path.len() < 2 {
                    self.error(
                        DiagnosticCode::RelAttrRequired,
                        expr.span,
                        "relation attribute required",
                    );
                    return;
                }
                match self.resolver.resolve_ref(namespace, path) {
                    Some(node_id) => self.push_exact(node_id, expr.span),
                    None => {
                        self.summary.unresolved.push(UnresolvedRef {
                            namespace: namespace.clone(),
                            path: path.clone(),
                            span: expr.span,
                        });
                        self.error(
                            DiagnosticCode::UnresolvedRef,
                            expr.span,
                            "unresolved reference",
                        );
                    }
                }
            }
            ExprKind::Identifier(_) => {
                // Identifiers are only legal as call heads, which are not
                // walked.
                self.error(
                    DiagnosticCode::UndefinedIdentifier,
                    expr.span,
                    "undefined identifier",
                );
            }
            ExprKind::Call { callee, args } => {
                let callee_name = match &callee.kind {
                    ExprKind::Identifier(name) => Some(name.as_str()),
                    _ => None,
                };
                match callee_name {
                    None => self.error(DiagnosticCode::InvalidCall, expr.span, "invalid call target"),
                    Some(name) if !is_allowed_function(name) => {
                        self.error(DiagnosticCode::UnknownFunction, callee.span, "unknown function")
                    }
                    Some(_) => {}
                }
                match callee_name {
                    Some("LOOKUP") => self.analyze_lookup(expr, args),
                    Some("FILTER") => self.analyze_filter(expr, args),
                    _ => {
                        for arg in args {
                            self.walk(arg);
                        }
                    }
                }
            }
            ExprKind::Binary { left, right, .. } => {
                self.walk(left);
                self.walk(right);
            }
            ExprKind::Unary { expr, .. } => self.walk(expr),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.walk(cond);
                self.walk(then_branch);
                self.walk(else_branch);
            }
            ExprKind::Property { object, .. } => self.walk(object),
            ExprKind::Group(inner) => self.walk(inner),
            ExprKind::Literal(_) => {}
        }
    }

    /// `FILTER(table_ref, predicate...)`: the table and every reference in
    /// the predicate arguments are exact dependencies. An unresolvable
    /// table ref is dropped silently, with no `unresolved` entry and no
    /// diagnostic; only LOOKUP records its table.
    fn analyze_filter(&mut self, call: &Expr, args: &[Expr]) {
        if args.is_empty() {
            self.error(
                DiagnosticCode::BadArity,
                call.span,
                "FILTER requires a table reference",
            );
            return;
        }
        if let ExprKind::Ref { namespace, path } = &args[0].kind {
            if let Some(node_id) = self.resolver.resolve_ref(namespace, path) {
                self.push_exact(node_id, args[0].span);
            }
        }
        for arg in &args[1..] {
            self.walk_deps(arg);
        }
    }

    /// `LOOKUP(table_ref, key, column)`: the table and key are exact
    /// dependencies. A literal column that resolves through the entity
    /// schema is an exact dependency; a dynamic column degrades to a
    /// schema dependency on the entity.
    fn analyze_lookup(&mut self, call: &Expr, args: &[Expr]) {
        if args.len() < 3 {
            self.error(
                DiagnosticCode::BadArity,
                call.span,
                "LOOKUP requires (table_ref, key, column)",
            );
            return;
        }
        let table = &args[0];
        let key = &args[1];
        let column = &args[2];

        self.walk_deps(key);
        let entity = self.resolve_table_ref(table);

        if let ExprKind::Literal(Value::String(column_name)) = &column.kind {
            if let Some(entity_id) = &entity {
                match self.resolver.resolve_entity_field(entity_id, column_name) {
                    Some(field_id) => self.push_exact(field_id, column.span),
                    None => self.error(
                        DiagnosticCode::UnknownColumn,
                        column.span,
                        "unknown column",
                    ),
                }
                return;
            }
        }

        // Dynamic column: its own references still count, and any column
        // of the entity may matter.
        self.walk_deps(column);
        if let Some(entity_id) = entity {
            self.push_schema(entity_id, table.span);
        }
    }

    /// Resolves a LOOKUP table argument. Resolution failures land in
    /// `unresolved` without a diagnostic; the surrounding form may still
    /// analyze usefully.
    fn resolve_table_ref(&mut self, table: &Expr) -> Option<NodeId> {
        let ExprKind::Ref { namespace, path } = &table.kind else {
            return None;
        };
        match self.resolver.resolve_ref(namespace, path) {
            Some(node_id) => {
                self.push_exact(node_id.clone(), table.span);
                Some(node_id)
            }
            None => {
                self.summary.unresolved.push(UnresolvedRef {
                    namespace: namespace.clone(),
                    path: path.clone(),
                    span: table.span,
                });
                None
            }
        }
    }

    /// Dependency-only walk for special-form arguments: collects exact
    /// deps without re-running the semantic rules.
    fn walk_deps(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Ref { namespace, path } => {
                if let Some(node_id) = self.resolver.resolve_ref(namespace, path) {
                    self.push_exact(node_id, expr.span);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                self.walk_deps(left);
                self.walk_deps(right);
            }
            ExprKind::Unary { expr, .. } => self.walk_deps(expr),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.walk_deps(cond);
                self.walk_deps(then_branch);
                self.walk_deps(else_branch);
            }
            ExprKind::Call { args, .. } => {
                for arg in args {
                    self.walk_deps(arg);
                }
            }
            ExprKind::Property { object, .. } => self.walk_deps(object),
            ExprKind::Group(inner) => self.walk_deps(inner),
            ExprKind::Identifier(_) | ExprKind::Literal(_) => {}
        }
    }
}
