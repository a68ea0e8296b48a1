use crate::error::Error;
use crate::evaluator::{evaluate, Environment};
use crate::host::{HostError, NativeFunction};
use crate::lexer::tokenize;
use crate::parser::parse_tokens;
use crate::value::Value;
use tracing::debug;

/// Command-line front end glue: what to print besides the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub show_tokens: bool,
    pub show_ast: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("expected NAME=EXPR, got '{0}'")]
    MissingEquals(String),
    #[error("'{0}' is not a valid identifier")]
    InvalidName(String),
    #[error("cannot evaluate value for '{name}': {source}")]
    Value { name: String, source: Error },
}

/// Environment offered by the command line: `true`, `false`, `null` and a
/// handful of conversion functions.
pub fn default_environment() -> Environment {
    Environment::new()
        .with("true", true)
        .with("false", false)
        .with("null", Value::Null)
        .with("len", NativeFunction::new("len", 1, native_len).into_value())
        .with("str", NativeFunction::new("str", 1, |args| Ok(Value::Str(args[0].to_string()))).into_value())
        .with("int", NativeFunction::new("int", 1, native_int).into_value())
        .with("float", NativeFunction::new("float", 1, native_float).into_value())
        .with("bool", NativeFunction::new("bool", 1, |args| Ok(Value::Bool(args[0].is_truthy()))).into_value())
}

fn native_len(args: &[Value]) -> Result<Value, HostError> {
    match &args[0] {
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::List(l) => Ok(Value::Int(l.len() as i64)),
        Value::Dict(d) => Ok(Value::Int(d.len() as i64)),
        other => Err(HostError::InvalidArgument(format!(
            "len() not supported for type {}",
            other.type_name()
        ))),
    }
}

fn native_int(args: &[Value]) -> Result<Value, HostError> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Float(f) => {
            let truncated = f.trunc();
            if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
                Ok(Value::Int(truncated as i64))
            } else {
                Err(HostError::Failed(format!("cannot convert {} to int", f)))
            }
        }
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| HostError::Failed(format!("invalid literal for int(): {:?}", s))),
        other => Err(HostError::InvalidArgument(format!(
            "int() argument must be a string or a number, not {}",
            other.type_name()
        ))),
    }
}

fn native_float(args: &[Value]) -> Result<Value, HostError> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| HostError::Failed(format!("could not convert string to float: {:?}", s))),
        other => Err(HostError::InvalidArgument(format!(
            "float() argument must be a string or a number, not {}",
            other.type_name()
        ))),
    }
}

/// Parse a `NAME=EXPR` binding, evaluating EXPR in `environment`.
pub fn parse_binding(binding: &str, environment: &Environment) -> Result<(String, Value), BindingError> {
    let (name, source) = binding
        .split_once('=')
        .ok_or_else(|| BindingError::MissingEquals(binding.to_string()))?;
    let name = name.trim();

    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(BindingError::InvalidName(name.to_string()));
    }

    let value = eval_source(source, environment).map_err(|source| BindingError::Value {
        name: name.to_string(),
        source,
    })?;
    Ok((name.to_string(), value))
}

/// Lex, parse and evaluate `source` in one go.
pub fn eval_source(source: &str, environment: &Environment) -> Result<Value, Error> {
    let tokens = tokenize(source)?;
    let expr = parse_tokens(source, tokens)?;
    Ok(evaluate(&expr, environment)?)
}

/// Evaluate `source` and print its value, reporting any error to stderr.
/// Returns whether evaluation succeeded.
pub fn run(source: &str, environment: &Environment, options: RunOptions, filename: Option<&str>) -> bool {
    match run_inner(source, environment, options) {
        Ok(value) => {
            println!("{}", value);
            true
        }
        Err(error) => {
            debug!(%error, "evaluation failed");
            if let Err(io_error) = error.report(source, filename) {
                eprintln!("{}", error);
                debug!(%io_error, "could not render diagnostic");
            }
            false
        }
    }
}

fn run_inner(source: &str, environment: &Environment, options: RunOptions) -> Result<Value, Error> {
    // Lexical analysis
    let tokens = tokenize(source)?;
    debug!(count = tokens.len(), "lexed source");
    if options.show_tokens {
        for token in &tokens {
            println!(
                "{:>4}..{:<4} {:<14} {:?}",
                token.span.start,
                token.span.end,
                format!("{:?}", token.token_type),
                token.lexeme
            );
        }
    }

    // Parsing
    let expr = parse_tokens(source, tokens)?;
    debug!(ast = %expr, "parsed expression");
    if options.show_ast {
        println!("{}", expr);
    }

    // Evaluation
    let value = evaluate(&expr, environment)?;
    debug!(%value, "evaluated expression");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_are_evaluated_expressions() {
        let environment = default_environment();
        let (name, value) = parse_binding("n = 2 ** 10", &environment).unwrap();
        assert_eq!(name, "n");
        assert_eq!(value, Value::Int(1024));

        let (_, value) = parse_binding("greeting='hi'.upper()", &environment).unwrap();
        assert_eq!(value, Value::from("HI"));
    }

    #[test]
    fn malformed_bindings_are_rejected() {
        let environment = default_environment();
        assert!(matches!(
            parse_binding("n", &environment),
            Err(BindingError::MissingEquals(_))
        ));
        assert!(matches!(
            parse_binding("1n=2", &environment),
            Err(BindingError::InvalidName(_))
        ));
        assert!(matches!(
            parse_binding("n=(", &environment),
            Err(BindingError::Value { .. })
        ));
    }

    #[test]
    fn default_environment_functions() {
        let environment = default_environment();
        assert_eq!(eval_source("len('héllo')", &environment).unwrap(), Value::Int(5));
        assert_eq!(eval_source("int('42') + 1", &environment).unwrap(), Value::Int(43));
        assert_eq!(eval_source("int(-2.7)", &environment).unwrap(), Value::Int(-2));
        assert_eq!(eval_source("float('2.5') * 2", &environment).unwrap(), Value::Float(5.0));
        assert_eq!(eval_source("str(12) + 'a'", &environment).unwrap(), Value::from("12a"));
        assert_eq!(eval_source("bool('') || null", &environment).unwrap(), Value::Null);
        assert!(eval_source("len(1)", &environment).is_err());
    }
}
