use crate::ast::Literal;
use crate::host::HostObject;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A runtime datum.
///
/// Literals of the language, two built-in containers, and opaque host
/// objects that are only reachable through the [`HostObject`] capabilities.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Dict(BTreeMap<String, Value>),
    Object(Rc<dyn HostObject>),
}

impl Value {
    /// Truthiness used by `!`, `&&`, `||` and `?:`.
    ///
    /// - `null` is false
    /// - booleans are themselves
    /// - numbers are false when zero (`NaN` is true)
    /// - strings, lists and dicts are false when empty
    /// - host objects decide for themselves (true unless they say otherwise)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Dict(d) => !d.is_empty(),
            Value::Object(object) => object.is_truthy(),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Object(object) => object.type_name(),
        }
    }

    pub fn object(object: impl HostObject + 'static) -> Self {
        Value::Object(Rc::new(object))
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Int(n) => Value::Int(*n),
            Literal::Float(n) => Value::Float(*n),
            Literal::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Dict(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Structural equality. Never fails: values of unrelated kinds are simply
/// unequal. Integers and floats compare by numeric value; `bool` is not
/// a number here, so `true != 1`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Int(l), Value::Int(r)) => l == r,
            (Value::Float(l), Value::Float(r)) => l == r,
            (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => int_equals_float(*i, *f),
            (Value::Str(l), Value::Str(r)) => l == r,
            (Value::List(l), Value::List(r)) => l == r,
            (Value::Dict(l), Value::Dict(r)) => l == r,
            (Value::Object(l), Value::Object(r)) => Rc::ptr_eq(l, r) || l.equals(r.as_ref()),
            _ => false,
        }
    }
}

fn int_equals_float(i: i64, f: f64) -> bool {
    int_float_ordering(i, f) == Some(Ordering::Equal)
}

/// Exact ordering of an integer against a float, without rounding the
/// integer to the nearest float. `None` when `f` is NaN.
pub(crate) fn int_float_ordering(i: i64, f: f64) -> Option<Ordering> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    if f.is_nan() {
        return None;
    }
    if f >= LIMIT {
        return Some(Ordering::Less);
    }
    if f < -LIMIT {
        return Some(Ordering::Greater);
    }

    let floor = f.floor();
    Some(match i.cmp(&(floor as i64)) {
        Ordering::Equal if f > floor => Ordering::Less,
        ordering => ordering,
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => {
                // Always show at least one decimal place for floats
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, item) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_nested(f, item)?;
                }
                write!(f, "]")
            }
            Value::Dict(d) => {
                write!(f, "{{")?;
                for (i, (key, value)) in d.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: ", key)?;
                    write_nested(f, value)?;
                }
                write!(f, "}}")
            }
            Value::Object(object) => write!(f, "<{}>", object.type_name()),
        }
    }
}

// Strings inside containers are quoted so `['a, b']` and `['a', 'b']` differ.
fn write_nested(f: &mut fmt::Formatter, value: &Value) -> fmt::Result {
    match value {
        Value::Str(s) => write!(f, "{:?}", s),
        other => write!(f, "{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_table() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::Float(-0.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(!Value::Dict(BTreeMap::new()).is_truthy());

        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(-3).is_truthy());
        assert!(Value::Float(f64::NAN).is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::from(vec![Value::Null]).is_truthy());
    }

    #[test]
    fn mixed_kind_equality() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_ne!(Value::Int(1), Value::Bool(true));
        assert_ne!(Value::from("1"), Value::Int(1));
        assert_ne!(Value::Null, Value::Bool(false));
        assert_ne!(Value::Int(i64::MAX), Value::Float(i64::MAX as f64));
    }

    #[test]
    fn int_float_ordering_is_exact() {
        assert_eq!(int_float_ordering(9_007_199_254_740_993, 9_007_199_254_740_992.0), Some(Ordering::Greater));
        assert_eq!(int_float_ordering(3, 3.0), Some(Ordering::Equal));
        assert_eq!(int_float_ordering(3, 3.5), Some(Ordering::Less));
        assert_eq!(int_float_ordering(-3, -3.5), Some(Ordering::Greater));
        assert_eq!(int_float_ordering(i64::MAX, i64::MAX as f64), Some(Ordering::Less));
        assert_eq!(int_float_ordering(i64::MIN, i64::MIN as f64), Some(Ordering::Equal));
        assert_eq!(int_float_ordering(0, f64::NEG_INFINITY), Some(Ordering::Greater));
        assert_eq!(int_float_ordering(0, f64::NAN), None);
    }

    #[test]
    fn display() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(16.5).to_string(), "16.5");
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), r#"["a", "b"]"#);
        let dict: Value = [("k", 1i64)].into_iter().collect();
        assert_eq!(dict.to_string(), r#"{"k": 1}"#);
    }
}
