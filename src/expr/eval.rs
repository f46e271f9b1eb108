//! Reference interpreter for formulas.
//!
//! Built for correctness on small inputs and tests, not throughput.
//! Built-in functions dispatch through a registry of handlers with
//! declared minimum arities; `IF` and `COALESCE` stay special forms
//! because their arguments must evaluate lazily. Every failure is a typed
//! [`EvalError`]; evaluation never panics.

use thiserror::Error;

use crate::expr::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::expr::analysis::is_allowed_function;
use crate::value::{Value, ValueKind};

/// Resolves formula references to runtime values.
pub trait ValueResolver {
    fn resolve_value(&self, namespace: &str, path: &[String]) -> Option<Value>;
}

/// Fatal evaluation failure. The graph is unaffected; only this call dies.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("unresolved reference: ${namespace}:{path}")]
    UnresolvedRef { namespace: String, path: String },
    #[error("no value resolver provided")]
    NoResolver,
    #[error("identifier is not a value: {0}")]
    BareIdentifier(String),
    #[error("invalid call target")]
    InvalidCall,
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("function not supported by the reference evaluator: {0}")]
    UnsupportedFunction(String),
    #[error("{func} expects at least {min} argument(s), got {got}")]
    BadArity {
        func: &'static str,
        min: usize,
        got: usize,
    },
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: ValueKind,
    },
    #[error("cannot compare {left} and {right} with {op}")]
    InvalidComparison {
        op: BinaryOp,
        left: ValueKind,
        right: ValueKind,
    },
    #[error("property access on non-object value")]
    PropertyOnNonObject,
}

type EvalResult = Result<Value, EvalError>;

/// Evaluates a parsed expression against an optional value resolver.
pub fn eval(root: &Expr, resolver: Option<&dyn ValueResolver>) -> EvalResult {
    eval_node(root, resolver)
}

fn eval_node(expr: &Expr, resolver: Option<&dyn ValueResolver>) -> EvalResult {
    match &expr.kind {
        ExprKind::Literal(value) => Ok(value.clone()),
        ExprKind::Ref { namespace, path } => {
            let resolver = resolver.ok_or(EvalError::NoResolver)?;
            resolver
                .resolve_value(namespace, path)
                .ok_or_else(|| EvalError::UnresolvedRef {
                    namespace: namespace.clone(),
                    path: path.join("."),
                })
        }
        ExprKind::Identifier(name) => Err(EvalError::BareIdentifier(name.clone())),
        ExprKind::Group(inner) => eval_node(inner, resolver),
        ExprKind::Unary { op, expr } => {
            let value = eval_node(expr, resolver)?;
            match op {
                UnaryOp::Neg => Ok(Value::Number(-to_number(&value)?)),
                UnaryOp::Not => Ok(Value::Bool(!to_bool(&value)?)),
            }
        }
        ExprKind::Binary { op, left, right } => {
            let left = eval_node(left, resolver)?;
            let right = eval_node(right, resolver)?;
            eval_binary(*op, &left, &right)
        }
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let cond = to_bool(&eval_node(cond, resolver)?)?;
            if cond {
                eval_node(then_branch, resolver)
            } else {
                eval_node(else_branch, resolver)
            }
        }
        ExprKind::Call { callee, args } => {
            let ExprKind::Identifier(name) = &callee.kind else {
                return Err(EvalError::InvalidCall);
            };
            eval_call(name, args, resolver)
        }
        ExprKind::Property { object, property } => {
            let object = eval_node(object, resolver)?;
            let Value::Object(map) = object else {
                return Err(EvalError::PropertyOnNonObject);
            };
            Ok(map.get(property).cloned().unwrap_or(Value::Null))
        }
    }
}

fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let a = to_number(left)?;
            let b = to_number(right)?;
            let out = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            };
            Ok(Value::Number(out))
        }
        BinaryOp::And | BinaryOp::Or => {
            let a = to_bool(left)?;
            let b = to_bool(right)?;
            Ok(Value::Bool(if op == BinaryOp::And { a && b } else { a || b }))
        }
        _ => compare(op, left, right),
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    let invalid = || EvalError::InvalidComparison {
        op,
        left: left.kind(),
        right: right.kind(),
    };
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(match op {
            BinaryOp::Eq => a == b,
            BinaryOp::Ne => a != b,
            BinaryOp::Lt => a < b,
            BinaryOp::Le => a <= b,
            BinaryOp::Gt => a > b,
            BinaryOp::Ge => a >= b,
            _ => return Err(invalid()),
        })),
        (Value::String(a), Value::String(b)) => Ok(Value::Bool(match op {
            BinaryOp::Eq => a == b,
            BinaryOp::Ne => a != b,
            BinaryOp::Lt => a < b,
            BinaryOp::Le => a <= b,
            BinaryOp::Gt => a > b,
            BinaryOp::Ge => a >= b,
            _ => return Err(invalid()),
        })),
        (Value::Bool(a), Value::Bool(b)) => match op {
            BinaryOp::Eq => Ok(Value::Bool(a == b)),
            BinaryOp::Ne => Ok(Value::Bool(a != b)),
            _ => Err(invalid()),
        },
        (Value::Null, other) => {
            let both_null = other.is_null();
            match op {
                BinaryOp::Eq => Ok(Value::Bool(both_null)),
                BinaryOp::Ne => Ok(Value::Bool(!both_null)),
                _ => Err(invalid()),
            }
        }
        _ => Err(invalid()),
    }
}

struct Builtin {
    name: &'static str,
    min_args: usize,
    apply: fn(&[Value]) -> EvalResult,
}

/// Eagerly-evaluated builtins. Lazy forms (`IF`, `COALESCE`) and the date
/// functions (accepted by the analyzer, unimplemented here) are absent.
static BUILTINS: &[Builtin] = &[
    Builtin {
        name: "SUM",
        min_args: 0,
        apply: |args| {
            let mut total = 0.0;
            for value in args {
                total += to_number(value)?;
            }
            Ok(Value::Number(total))
        },
    },
    Builtin {
        name: "MIN",
        min_args: 1,
        apply: |args| fold_numbers(args, f64::min),
    },
    Builtin {
        name: "MAX",
        min_args: 1,
        apply: |args| fold_numbers(args, f64::max),
    },
    Builtin {
        name: "ABS",
        min_args: 1,
        apply: |args| Ok(Value::Number(to_number(&args[0])?.abs())),
    },
    Builtin {
        name: "ROUND",
        min_args: 1,
        apply: |args| Ok(Value::Number(to_number(&args[0])?.round())),
    },
    Builtin {
        name: "FLOOR",
        min_args: 1,
        apply: |args| Ok(Value::Number(to_number(&args[0])?.floor())),
    },
    Builtin {
        name: "CEIL",
        min_args: 1,
        apply: |args| Ok(Value::Number(to_number(&args[0])?.ceil())),
    },
    Builtin {
        name: "CONCAT",
        min_args: 0,
        apply: |args| {
            let mut out = String::new();
            for value in args {
                out.push_str(to_string(value)?);
            }
            Ok(Value::String(out))
        },
    },
    Builtin {
        name: "LEFT",
        min_args: 2,
        apply: |args| {
            let text = to_string(&args[0])?;
            let count = to_number(&args[1])?.max(0.0) as usize;
            Ok(Value::String(text.chars().take(count).collect()))
        },
    },
    Builtin {
        name: "RIGHT",
        min_args: 2,
        apply: |args| {
            let text = to_string(&args[0])?;
            let count = to_number(&args[1])?.max(0.0) as usize;
            let total = text.chars().count();
            Ok(Value::String(
                text.chars().skip(total.saturating_sub(count)).collect(),
            ))
        },
    },
    Builtin {
        name: "LEN",
        min_args: 1,
        apply: |args| Ok(Value::Number(to_string(&args[0])?.chars().count() as f64)),
    },
    Builtin {
        name: "TRIM",
        min_args: 1,
        apply: |args| Ok(Value::String(to_string(&args[0])?.trim().to_owned())),
    },
    Builtin {
        name: "UPPER",
        min_args: 1,
        apply: |args| Ok(Value::String(to_string(&args[0])?.to_uppercase())),
    },
    Builtin {
        name: "LOWER",
        min_args: 1,
        apply: |args| Ok(Value::String(to_string(&args[0])?.to_lowercase())),
    },
    Builtin {
        name: "CONTAINS",
        min_args: 2,
        apply: |args| {
            let text = to_string(&args[0])?;
            let needle = to_string(&args[1])?;
            Ok(Value::Bool(text.contains(needle)))
        },
    },
    Builtin {
        name: "COUNT",
        min_args: 1,
        apply: |args| match &args[0] {
            Value::Array(items) => Ok(Value::Number(items.len() as f64)),
            other => Err(EvalError::TypeMismatch {
                expected: "array",
                got: other.kind(),
            }),
        },
    },
];

fn eval_call(name: &str, args: &[Expr], resolver: Option<&dyn ValueResolver>) -> EvalResult {
    match name {
        // Lazy special forms: only the taken branch evaluates.
        "IF" => {
            if args.len() != 3 {
                return Err(EvalError::BadArity {
                    func: "IF",
                    min: 3,
                    got: args.len(),
                });
            }
            let cond = to_bool(&eval_node(&args[0], resolver)?)?;
            eval_node(if cond { &args[1] } else { &args[2] }, resolver)
        }
        "COALESCE" => {
            for arg in args {
                let value = eval_node(arg, resolver)?;
                if !value.is_null() {
                    return Ok(value);
                }
            }
            Ok(Value::Null)
        }
        _ => {
            let Some(builtin) = BUILTINS.iter().find(|b| b.name == name) else {
                if is_allowed_function(name) {
                    return Err(EvalError::UnsupportedFunction(name.to_owned()));
                }
                return Err(EvalError::UnknownFunction(name.to_owned()));
            };
            if args.len() < builtin.min_args {
                return Err(EvalError::BadArity {
                    func: builtin.name,
                    min: builtin.min_args,
                    got: args.len(),
                });
            }
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_node(arg, resolver)?);
            }
            (builtin.apply)(&values)
        }
    }
}

fn fold_numbers(args: &[Value], pick: fn(f64, f64) -> f64) -> EvalResult {
    let mut best = to_number(&args[0])?;
    for value in &args[1..] {
        best = pick(best, to_number(value)?);
    }
    Ok(Value::Number(best))
}

fn to_number(value: &Value) -> Result<f64, EvalError> {
    value.as_number().ok_or(EvalError::TypeMismatch {
        expected: "number",
        got: value.kind(),
    })
}

fn to_bool(value: &Value) -> Result<bool, EvalError> {
    value.as_bool().ok_or(EvalError::TypeMismatch {
        expected: "bool",
        got: value.kind(),
    })
}

fn to_string(value: &Value) -> Result<&str, EvalError> {
    value.as_str().ok_or(EvalError::TypeMismatch {
        expected: "string",
        got: value.kind(),
    })
}
