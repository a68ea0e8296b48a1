//! The capability contract between the evaluator and values it does not
//! understand.
//!
//! A host injects arbitrary objects into an [`Environment`](crate::Environment)
//! as [`Value::Object`]. The evaluator never inspects such an object; it
//! only asks for one of four capabilities (attribute lookup, invocation,
//! item lookup, slicing). Every capability defaults to
//! [`HostError::Unsupported`], so an object exposes exactly what it
//! implements and nothing more.

use crate::value::Value;
use std::fmt;
use std::rc::Rc;

pub type HostResult = Result<Value, HostError>;

/// Why a capability request was refused.
///
/// The evaluator turns these into [`EvalError`](crate::EvalError)s,
/// choosing the kind from the capability that was requested and the
/// variant returned here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("operation not supported")]
    Unsupported,
    #[error("no attribute '{0}'")]
    NoAttribute(String),
    #[error("{0}")]
    IndexOutOfRange(String),
    #[error("key not found: {0}")]
    KeyNotFound(String),
    /// Arguments of the wrong kind or count.
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Failed(String),
}

/// Bounds of a `[start:stop:step]` subscript, already evaluated.
/// `None` means the component was left out in source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceArgs {
    pub start: Option<Value>,
    pub stop: Option<Value>,
    pub step: Option<Value>,
}

pub trait HostObject: fmt::Debug {
    fn type_name(&self) -> &str {
        "object"
    }

    fn get_attr(&self, _name: &str) -> HostResult {
        Err(HostError::Unsupported)
    }

    fn call(&self, _args: &[Value]) -> HostResult {
        Err(HostError::Unsupported)
    }

    fn get_item(&self, _key: &Value) -> HostResult {
        Err(HostError::Unsupported)
    }

    fn get_slice(&self, _slice: &SliceArgs) -> HostResult {
        Err(HostError::Unsupported)
    }

    fn is_truthy(&self) -> bool {
        true
    }

    /// Value equality with another host object. Two handles to the same
    /// object are always equal without asking.
    fn equals(&self, _other: &dyn HostObject) -> bool {
        false
    }
}

type NativeFn = dyn Fn(&[Value]) -> HostResult;

/// A Rust closure exposed as a callable value.
pub struct NativeFunction {
    name: String,
    arity: Option<usize>,
    func: Box<NativeFn>,
}

impl NativeFunction {
    /// A function accepting any number of arguments.
    pub fn variadic(name: impl Into<String>, func: impl Fn(&[Value]) -> HostResult + 'static) -> Self {
        Self {
            name: name.into(),
            arity: None,
            func: Box::new(func),
        }
    }

    /// A function that must be called with exactly `arity` arguments.
    pub fn new(
        name: impl Into<String>,
        arity: usize,
        func: impl Fn(&[Value]) -> HostResult + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity: Some(arity),
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_value(self) -> Value {
        Value::Object(Rc::new(self))
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl HostObject for NativeFunction {
    fn type_name(&self) -> &str {
        "function"
    }

    fn call(&self, args: &[Value]) -> HostResult {
        if let Some(arity) = self.arity {
            if args.len() != arity {
                return Err(HostError::InvalidArgument(format!(
                    "{}() takes {} argument{} ({} given)",
                    self.name,
                    arity,
                    if arity == 1 { "" } else { "s" },
                    args.len()
                )));
            }
        }
        (self.func)(args)
    }
}
