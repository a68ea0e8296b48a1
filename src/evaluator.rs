use crate::ast::{Expr, Index, LogicalOp};
use crate::builtins;
use crate::error::{EvalError, EvalErrorKind, Span};
use crate::host::{HostError, SliceArgs};
use crate::operators;
use crate::value::Value;
use std::collections::HashMap;

/// Names visible to an expression, supplied by the caller.
///
/// The evaluator only reads from it; a missing name is an error rather
/// than a default.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Environment::define`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.define(name, value);
        self
    }

    pub fn define(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl From<HashMap<String, Value>> for Environment {
    fn from(values: HashMap<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut environment = Self::new();
        for (name, value) in iter {
            environment.define(name, value);
        }
        environment
    }
}

/// Tree-walking evaluator bound to one environment.
///
/// Holds no state besides the environment reference, so the same tree
/// can be evaluated any number of times with identical results.
pub struct Evaluator<'env> {
    environment: &'env Environment,
}

impl<'env> Evaluator<'env> {
    pub fn new(environment: &'env Environment) -> Self {
        Self { environment }
    }

    pub fn evaluate(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal { value, .. } => Ok(Value::from(value)),
            Expr::Identifier { name, span } => self
                .environment
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::undefined(*span, name)),
            Expr::Unary {
                operator,
                operand,
                span,
            } => {
                let operand_val = self.evaluate(operand)?;
                operators::unary(*operator, operand_val, *span)
            }
            Expr::Binary {
                left,
                operator,
                right,
                span,
            } => {
                let left_val = self.evaluate(left)?;
                let right_val = self.evaluate(right)?;
                operators::binary(*operator, left_val, right_val, *span)
            }
            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => {
                let left_val = self.evaluate(left)?;

                match operator {
                    LogicalOp::Or => {
                        if left_val.is_truthy() {
                            Ok(left_val)
                        } else {
                            self.evaluate(right)
                        }
                    }
                    LogicalOp::And => {
                        if !left_val.is_truthy() {
                            Ok(left_val)
                        } else {
                            self.evaluate(right)
                        }
                    }
                }
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }
            Expr::Accessor { target, name, span } => {
                let target_val = self.evaluate(target)?;
                builtins::get_attr(&target_val, name).map_err(|error| match error {
                    HostError::Unsupported | HostError::NoAttribute(_) => EvalError::new(
                        EvalErrorKind::Attribute,
                        *span,
                        format!("'{}' value has no attribute '{}'", target_val.type_name(), name),
                    ),
                    other => host_error(other, *span),
                })
            }
            Expr::Call { callee, args, span } => {
                let function_val = self.evaluate(callee)?;
                let arg_vals = args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<Result<Vec<_>, _>>()?;

                builtins::call(&function_val, &arg_vals).map_err(|error| match error {
                    HostError::Unsupported => EvalError::new(
                        EvalErrorKind::NotCallable,
                        *span,
                        format!("'{}' value is not callable", function_val.type_name()),
                    ),
                    other => host_error(other, *span),
                })
            }
            Expr::Subscript {
                target,
                index,
                span,
            } => {
                let target_val = self.evaluate(target)?;
                let result = match index {
                    Index::Single(key) => {
                        let key_val = self.evaluate(key)?;
                        builtins::get_item(&target_val, &key_val)
                    }
                    Index::Slice { start, stop, step } => {
                        let slice = SliceArgs {
                            start: self.evaluate_optional(start.as_deref())?,
                            stop: self.evaluate_optional(stop.as_deref())?,
                            step: self.evaluate_optional(step.as_deref())?,
                        };
                        builtins::get_slice(&target_val, &slice)
                    }
                };

                result.map_err(|error| match error {
                    HostError::Unsupported => EvalError::new(
                        EvalErrorKind::NotSubscriptable,
                        *span,
                        format!("'{}' value is not subscriptable", target_val.type_name()),
                    ),
                    other => host_error(other, *span),
                })
            }
        }
    }

    fn evaluate_optional(&self, expr: Option<&Expr>) -> Result<Option<Value>, EvalError> {
        expr.map(|expr| self.evaluate(expr)).transpose()
    }
}

/// Attach the failing node's position to a refused capability request.
fn host_error(error: HostError, span: Span) -> EvalError {
    let kind = match &error {
        HostError::NoAttribute(_) => EvalErrorKind::Attribute,
        HostError::IndexOutOfRange(_) | HostError::KeyNotFound(_) => EvalErrorKind::IndexOrKey,
        HostError::InvalidArgument(_) => EvalErrorKind::Type,
        HostError::Unsupported | HostError::Failed(_) => EvalErrorKind::Host,
    };
    EvalError::new(kind, span, error.to_string())
}

/// Evaluate `expr` against `environment`.
pub fn evaluate(expr: &Expr, environment: &Environment) -> Result<Value, EvalError> {
    Evaluator::new(environment).evaluate(expr)
}
