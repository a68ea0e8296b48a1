//! Capabilities of the built-in value kinds, and dispatch to host objects
//! for everything else.

use crate::host::{HostError, HostObject, HostResult, SliceArgs};
use crate::value::Value;

const STR_METHODS: &[&str] = &[
    "upper",
    "lower",
    "strip",
    "lstrip",
    "rstrip",
    "count",
    "startswith",
    "endswith",
    "find",
    "replace",
    "split",
    "join",
];
const LIST_METHODS: &[&str] = &["count", "index"];
const DICT_METHODS: &[&str] = &["get", "keys", "values"];

pub fn get_attr(target: &Value, name: &str) -> HostResult {
    let methods = match target {
        Value::Object(object) => return object.get_attr(name),
        Value::Str(_) => STR_METHODS,
        Value::List(_) => LIST_METHODS,
        Value::Dict(_) => DICT_METHODS,
        _ => return Err(HostError::Unsupported),
    };

    match methods.iter().copied().find(|method| *method == name) {
        Some(method) => Ok(Value::object(BoundMethod {
            receiver: target.clone(),
            name: method,
        })),
        None => Err(HostError::NoAttribute(name.to_string())),
    }
}

pub fn call(target: &Value, args: &[Value]) -> HostResult {
    match target {
        Value::Object(object) => object.call(args),
        _ => Err(HostError::Unsupported),
    }
}

pub fn get_item(target: &Value, key: &Value) -> HostResult {
    match target {
        Value::Object(object) => object.get_item(key),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let index = sequence_index(chars.len(), key, "string")?;
            Ok(Value::Str(chars[index].to_string()))
        }
        Value::List(items) => {
            let index = sequence_index(items.len(), key, "list")?;
            Ok(items[index].clone())
        }
        Value::Dict(entries) => match key {
            Value::Str(name) => entries
                .get(name)
                .cloned()
                .ok_or_else(|| HostError::KeyNotFound(format!("{:?}", name))),
            other => Err(HostError::KeyNotFound(other.to_string())),
        },
        _ => Err(HostError::Unsupported),
    }
}

pub fn get_slice(target: &Value, slice: &SliceArgs) -> HostResult {
    match target {
        Value::Object(object) => object.get_slice(slice),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let picked = slice_indices(chars.len(), slice)?;
            Ok(Value::Str(picked.into_iter().map(|i| chars[i]).collect()))
        }
        Value::List(items) => {
            let picked = slice_indices(items.len(), slice)?;
            Ok(Value::List(picked.into_iter().map(|i| items[i].clone()).collect()))
        }
        Value::Dict(_) => Err(HostError::InvalidArgument("dict cannot be sliced".to_string())),
        _ => Err(HostError::Unsupported),
    }
}

fn sequence_index(len: usize, key: &Value, kind: &str) -> Result<usize, HostError> {
    let Value::Int(index) = key else {
        return Err(HostError::InvalidArgument(format!(
            "{} indices must be integers, not {}",
            kind,
            key.type_name()
        )));
    };

    let len = len as i64;
    let resolved = if *index < 0 { index + len } else { *index };
    if (0..len).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(HostError::IndexOutOfRange(format!("{} index out of range", kind)))
    }
}

fn slice_bound(bound: Option<&Value>) -> Result<Option<i64>, HostError> {
    match bound {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Int(n)) => Ok(Some(*n)),
        Some(other) => Err(HostError::InvalidArgument(format!(
            "slice indices must be integers or null, not {}",
            other.type_name()
        ))),
    }
}

/// Positions selected by a slice over a sequence of length `len`.
///
/// Out-of-range bounds are clamped rather than rejected and negative
/// bounds count from the end, so `[::-1]` walks the whole sequence
/// backwards.
pub fn slice_indices(len: usize, slice: &SliceArgs) -> Result<Vec<usize>, HostError> {
    let start = slice_bound(slice.start.as_ref())?;
    let stop = slice_bound(slice.stop.as_ref())?;
    let step = slice_bound(slice.step.as_ref())?.unwrap_or(1);
    if step == 0 {
        return Err(HostError::IndexOutOfRange("slice step cannot be zero".to_string()));
    }

    let len = len as i64;
    let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };
    let clamp = |bound: i64| {
        if bound < 0 {
            (bound + len).max(lower)
        } else {
            bound.min(upper)
        }
    };
    let start = start.map_or(if step < 0 { upper } else { lower }, clamp);
    let stop = stop.map_or(if step < 0 { lower } else { upper }, clamp);

    let mut picked = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        picked.push(i as usize);
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    Ok(picked)
}

/// `receiver.name` for a built-in kind, waiting to be called.
#[derive(Debug)]
struct BoundMethod {
    receiver: Value,
    name: &'static str,
}

impl HostObject for BoundMethod {
    fn type_name(&self) -> &str {
        "method"
    }

    fn call(&self, args: &[Value]) -> HostResult {
        match &self.receiver {
            Value::Str(s) => str_method(s, self.name, args),
            Value::List(items) => list_method(items, self.name, args),
            Value::Dict(entries) => match self.name {
                "get" => {
                    expect_args(self.name, args, 1, 2)?;
                    let found = match &args[0] {
                        Value::Str(key) => entries.get(key).cloned(),
                        _ => None,
                    };
                    Ok(found.unwrap_or_else(|| args.get(1).cloned().unwrap_or(Value::Null)))
                }
                "keys" => {
                    expect_args(self.name, args, 0, 0)?;
                    Ok(Value::List(entries.keys().cloned().map(Value::Str).collect()))
                }
                "values" => {
                    expect_args(self.name, args, 0, 0)?;
                    Ok(Value::List(entries.values().cloned().collect()))
                }
                _ => Err(HostError::NoAttribute(self.name.to_string())),
            },
            _ => Err(HostError::Unsupported),
        }
    }
}

fn str_method(s: &str, name: &str, args: &[Value]) -> HostResult {
    match name {
        "upper" => {
            expect_args(name, args, 0, 0)?;
            Ok(Value::Str(s.to_uppercase()))
        }
        "lower" => {
            expect_args(name, args, 0, 0)?;
            Ok(Value::Str(s.to_lowercase()))
        }
        "strip" => {
            expect_args(name, args, 0, 0)?;
            Ok(Value::from(s.trim()))
        }
        "lstrip" => {
            expect_args(name, args, 0, 0)?;
            Ok(Value::from(s.trim_start()))
        }
        "rstrip" => {
            expect_args(name, args, 0, 0)?;
            Ok(Value::from(s.trim_end()))
        }
        "count" => {
            expect_args(name, args, 1, 1)?;
            let needle = str_arg(name, args, 0)?;
            Ok(Value::Int(s.matches(needle).count() as i64))
        }
        "startswith" => {
            expect_args(name, args, 1, 1)?;
            Ok(Value::Bool(s.starts_with(str_arg(name, args, 0)?)))
        }
        "endswith" => {
            expect_args(name, args, 1, 1)?;
            Ok(Value::Bool(s.ends_with(str_arg(name, args, 0)?)))
        }
        "find" => {
            expect_args(name, args, 1, 1)?;
            let position = s
                .find(str_arg(name, args, 0)?)
                .map_or(-1, |byte| s[..byte].chars().count() as i64);
            Ok(Value::Int(position))
        }
        "replace" => {
            expect_args(name, args, 2, 2)?;
            Ok(Value::Str(s.replace(str_arg(name, args, 0)?, str_arg(name, args, 1)?)))
        }
        "split" => {
            expect_args(name, args, 0, 1)?;
            let parts: Vec<Value> = if args.is_empty() {
                s.split_whitespace().map(Value::from).collect()
            } else {
                let separator = str_arg(name, args, 0)?;
                if separator.is_empty() {
                    return Err(HostError::InvalidArgument("empty separator".to_string()));
                }
                s.split(separator).map(Value::from).collect()
            };
            Ok(Value::List(parts))
        }
        "join" => {
            expect_args(name, args, 1, 1)?;
            let Value::List(items) = &args[0] else {
                return Err(HostError::InvalidArgument(format!(
                    "join() expects a list, not {}",
                    args[0].type_name()
                )));
            };
            let mut pieces = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Str(piece) => pieces.push(piece.as_str()),
                    other => {
                        return Err(HostError::InvalidArgument(format!(
                            "join() expects a list of strings, found {}",
                            other.type_name()
                        )))
                    }
                }
            }
            Ok(Value::Str(pieces.join(s)))
        }
        _ => Err(HostError::NoAttribute(name.to_string())),
    }
}

fn list_method(items: &[Value], name: &str, args: &[Value]) -> HostResult {
    match name {
        "count" => {
            expect_args(name, args, 1, 1)?;
            Ok(Value::Int(items.iter().filter(|item| **item == args[0]).count() as i64))
        }
        "index" => {
            expect_args(name, args, 1, 1)?;
            items
                .iter()
                .position(|item| *item == args[0])
                .map(|position| Value::Int(position as i64))
                .ok_or_else(|| HostError::Failed(format!("{} is not in list", args[0])))
        }
        _ => Err(HostError::NoAttribute(name.to_string())),
    }
}

fn expect_args(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), HostError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        format!("{}", min)
    } else {
        format!("{} to {}", min, max)
    };
    Err(HostError::InvalidArgument(format!(
        "{}() takes {} argument{} ({} given)",
        name,
        expected,
        if max == 1 { "" } else { "s" },
        args.len()
    )))
}

fn str_arg<'a>(name: &str, args: &'a [Value], position: usize) -> Result<&'a str, HostError> {
    match args.get(position) {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(HostError::InvalidArgument(format!(
            "{}() expects a string argument, not {}",
            name,
            other.type_name()
        ))),
        None => Err(HostError::InvalidArgument(format!("{}() is missing an argument", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> SliceArgs {
        SliceArgs {
            start: start.map(Value::Int),
            stop: stop.map(Value::Int),
            step: step.map(Value::Int),
        }
    }

    #[test]
    fn slice_indices_follow_clamping_rules() {
        assert_eq!(slice_indices(3, &slice(None, None, None)).unwrap(), vec![0, 1, 2]);
        assert_eq!(slice_indices(3, &slice(None, None, Some(-1))).unwrap(), vec![2, 1, 0]);
        assert_eq!(slice_indices(3, &slice(Some(0), Some(-1), None)).unwrap(), vec![0, 1]);
        assert_eq!(slice_indices(6, &slice(Some(4), Some(1), Some(-1))).unwrap(), vec![4, 3, 2]);
        assert_eq!(slice_indices(3, &slice(Some(-10), Some(10), None)).unwrap(), vec![0, 1, 2]);
        assert_eq!(slice_indices(3, &slice(Some(10), None, Some(-2))).unwrap(), vec![2, 0]);
        assert!(slice_indices(0, &slice(None, None, Some(-1))).unwrap().is_empty());
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(slice_indices(3, &slice(None, None, Some(0))).is_err());
    }

    #[test]
    fn null_bounds_mean_unspecified() {
        let args = SliceArgs {
            start: Some(Value::Null),
            stop: Some(Value::Int(2)),
            step: None,
        };
        assert_eq!(slice_indices(5, &args).unwrap(), vec![0, 1]);
    }

    #[test]
    fn negative_index_counts_from_end() {
        assert_eq!(get_item(&Value::from("foo"), &Value::Int(-1)).unwrap(), Value::from("o"));
        assert!(matches!(
            get_item(&Value::from("foo"), &Value::Int(3)),
            Err(HostError::IndexOutOfRange(_))
        ));
    }

    #[test]
    fn unknown_method_is_missing_attribute() {
        assert_eq!(
            get_attr(&Value::from("foo"), "shout").unwrap_err(),
            HostError::NoAttribute("shout".to_string())
        );
        assert_eq!(get_attr(&Value::Int(1), "real").unwrap_err(), HostError::Unsupported);
    }
}
