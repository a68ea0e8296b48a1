//! Operator semantics, dispatched on operator and operand kinds.
//!
//! Nothing here coerces implicitly: every accepted pairing is spelled out
//! and everything else is a type error naming both operand kinds.

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::{EvalError, Span};
use crate::value::{int_float_ordering, Value};
use std::cmp::Ordering;

/// Upper bound on the length produced by `str * int` and `list * int`.
const MAX_REPEAT_LEN: usize = 1 << 26;

enum Numbers {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numbers(left: &Value, right: &Value) -> Option<Numbers> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Some(Numbers::Ints(*l, *r)),
        (Value::Float(l), Value::Float(r)) => Some(Numbers::Floats(*l, *r)),
        (Value::Int(l), Value::Float(r)) => Some(Numbers::Floats(*l as f64, *r)),
        (Value::Float(l), Value::Int(r)) => Some(Numbers::Floats(*l, *r as f64)),
        _ => None,
    }
}

pub fn unary(operator: UnaryOp, operand: Value, span: Span) -> Result<Value, EvalError> {
    match (operator, operand) {
        (UnaryOp::Not, operand) => Ok(Value::Bool(!operand.is_truthy())),
        (UnaryOp::Negate, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| overflow(span)),
        (UnaryOp::Negate, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Plus, operand @ (Value::Int(_) | Value::Float(_))) => Ok(operand),
        (operator, operand) => Err(EvalError::type_error(
            span,
            format!(
                "Bad operand type for unary {}: '{}'",
                operator.symbol(),
                operand.type_name()
            ),
        )),
    }
}

pub fn binary(operator: BinaryOp, left: Value, right: Value, span: Span) -> Result<Value, EvalError> {
    match operator {
        BinaryOp::Add => add(left, right, span),
        BinaryOp::Subtract => arithmetic(operator, &left, &right, span, i64::checked_sub, |l, r| l - r),
        BinaryOp::Multiply => multiply(left, right, span),
        BinaryOp::Divide => divide(&left, &right, span),
        BinaryOp::FloorDivide => floor_divide(&left, &right, span),
        BinaryOp::Modulo => modulo(&left, &right, span),
        BinaryOp::Power => power(&left, &right, span),
        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            match compare(operator, &left, &right) {
                Some(result) => Ok(Value::Bool(result)),
                None => Err(EvalError::type_error(
                    span,
                    format!(
                        "'{}' not supported between '{}' and '{}'",
                        operator.symbol(),
                        left.type_name(),
                        right.type_name()
                    ),
                )),
            }
        }
    }
}

fn add(left: Value, right: Value, span: Span) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Str(l), Value::Str(r)) => Ok(Value::Str(l + &r)),
        (Value::List(mut l), Value::List(r)) => {
            l.extend(r);
            Ok(Value::List(l))
        }
        (left, right) => arithmetic(BinaryOp::Add, &left, &right, span, i64::checked_add, |l, r| l + r),
    }
}

fn multiply(left: Value, right: Value, span: Span) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            let count = repeat_count(s.chars().count(), n, span)?;
            Ok(Value::Str(s.repeat(count)))
        }
        (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
            let count = repeat_count(items.len(), n, span)?;
            let mut repeated = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                repeated.extend(items.iter().cloned());
            }
            Ok(Value::List(repeated))
        }
        (left, right) => arithmetic(BinaryOp::Multiply, &left, &right, span, i64::checked_mul, |l, r| l * r),
    }
}

fn repeat_count(len: usize, count: i64, span: Span) -> Result<usize, EvalError> {
    if count <= 0 {
        return Ok(0);
    }
    let count = usize::try_from(count).map_err(|_| overflow(span))?;
    match len.checked_mul(count) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(count),
        _ => Err(EvalError::arithmetic(span, "Repetition result too large".to_string())),
    }
}

fn arithmetic(
    operator: BinaryOp,
    left: &Value,
    right: &Value,
    span: Span,
    on_ints: fn(i64, i64) -> Option<i64>,
    on_floats: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    match numbers(left, right) {
        Some(Numbers::Ints(l, r)) => on_ints(l, r).map(Value::Int).ok_or_else(|| overflow(span)),
        Some(Numbers::Floats(l, r)) => Ok(Value::Float(on_floats(l, r))),
        None => Err(unsupported(operator, left, right, span)),
    }
}

fn divide(left: &Value, right: &Value, span: Span) -> Result<Value, EvalError> {
    let (l, r) = match numbers(left, right) {
        Some(Numbers::Ints(l, r)) => (l as f64, r as f64),
        Some(Numbers::Floats(l, r)) => (l, r),
        None => return Err(unsupported(BinaryOp::Divide, left, right, span)),
    };
    if r == 0.0 {
        return Err(division_by_zero(span));
    }
    Ok(Value::Float(l / r))
}

fn floor_divide(left: &Value, right: &Value, span: Span) -> Result<Value, EvalError> {
    match numbers(left, right) {
        Some(Numbers::Ints(_, 0)) => Err(division_by_zero(span)),
        Some(Numbers::Floats(_, r)) if r == 0.0 => Err(division_by_zero(span)),
        Some(Numbers::Ints(l, r)) => {
            let quotient = l.checked_div(r).ok_or_else(|| overflow(span))?;
            // Truncating division rounds toward zero; step down when the
            // signs differ and there is a remainder.
            if l % r != 0 && (l < 0) != (r < 0) {
                Ok(Value::Int(quotient - 1))
            } else {
                Ok(Value::Int(quotient))
            }
        }
        Some(Numbers::Floats(l, r)) => Ok(Value::Float(float_divmod(l, r).0)),
        None => Err(unsupported(BinaryOp::FloorDivide, left, right, span)),
    }
}

fn modulo(left: &Value, right: &Value, span: Span) -> Result<Value, EvalError> {
    match numbers(left, right) {
        Some(Numbers::Ints(_, 0)) => Err(division_by_zero(span)),
        Some(Numbers::Floats(_, r)) if r == 0.0 => Err(division_by_zero(span)),
        Some(Numbers::Ints(_, -1)) => Ok(Value::Int(0)),
        Some(Numbers::Ints(l, r)) => {
            // The result takes the sign of the divisor.
            let remainder = l % r;
            if remainder != 0 && (remainder < 0) != (r < 0) {
                Ok(Value::Int(remainder + r))
            } else {
                Ok(Value::Int(remainder))
            }
        }
        Some(Numbers::Floats(l, r)) => Ok(Value::Float(float_divmod(l, r).1)),
        None => Err(unsupported(BinaryOp::Modulo, left, right, span)),
    }
}

/// Floor quotient and divisor-signed remainder of two floats.
fn float_divmod(dividend: f64, divisor: f64) -> (f64, f64) {
    let mut remainder = dividend % divisor;
    let mut quotient = (dividend - remainder) / divisor;

    if remainder != 0.0 {
        if (divisor < 0.0) != (remainder < 0.0) {
            remainder += divisor;
            quotient -= 1.0;
        }
    } else {
        remainder = 0.0_f64.copysign(divisor);
    }

    let floored = if quotient != 0.0 {
        let mut floored = quotient.floor();
        if quotient - floored > 0.5 {
            floored += 1.0;
        }
        floored
    } else {
        0.0_f64.copysign(dividend / divisor)
    };

    (floored, remainder)
}

fn power(left: &Value, right: &Value, span: Span) -> Result<Value, EvalError> {
    match numbers(left, right) {
        Some(Numbers::Ints(base, exponent)) if exponent >= 0 => match (base, u32::try_from(exponent)) {
            (_, Ok(exponent)) => base.checked_pow(exponent).map(Value::Int).ok_or_else(|| overflow(span)),
            // Exponents past u32 only fit for these bases.
            (0 | 1, Err(_)) => Ok(Value::Int(base)),
            (-1, Err(_)) => Ok(Value::Int(if exponent % 2 == 0 { 1 } else { -1 })),
            (_, Err(_)) => Err(overflow(span)),
        },
        Some(Numbers::Ints(base, exponent)) => float_power(base as f64, exponent as f64, span),
        Some(Numbers::Floats(base, exponent)) => float_power(base, exponent, span),
        None => Err(unsupported(BinaryOp::Power, left, right, span)),
    }
}

fn float_power(base: f64, exponent: f64, span: Span) -> Result<Value, EvalError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(EvalError::arithmetic(
            span,
            "0 cannot be raised to a negative power".to_string(),
        ));
    }
    if base < 0.0 && exponent.fract() != 0.0 && exponent.is_finite() {
        return Err(EvalError::arithmetic(
            span,
            "Negative number cannot be raised to a fractional power".to_string(),
        ));
    }
    let result = base.powf(exponent);
    if result.is_infinite() && base.is_finite() && exponent.is_finite() {
        return Err(EvalError::arithmetic(span, "Numerical result out of range".to_string()));
    }
    Ok(Value::Float(result))
}

/// Evaluates an ordering operator, or `None` when the operands cannot be
/// ordered against each other.
fn compare(operator: BinaryOp, left: &Value, right: &Value) -> Option<bool> {
    let ordering = match (left, right) {
        (Value::Str(l), Value::Str(r)) => l.cmp(r),
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        // Mixed pairs compare exactly; NaN is never ordered.
        (Value::Int(i), Value::Float(f)) => {
            return Some(int_float_ordering(*i, *f).is_some_and(|ordering| apply_ordering(operator, ordering)))
        }
        (Value::Float(f), Value::Int(i)) => {
            return Some(
                int_float_ordering(*i, *f).is_some_and(|ordering| apply_ordering(operator, ordering.reverse())),
            )
        }
        (Value::List(l), Value::List(r)) => {
            // First differing element decides; otherwise the shorter list is smaller.
            return match l.iter().zip(r).find(|(a, b)| a != b) {
                Some((a, b)) => compare(operator, a, b),
                None => Some(apply_ordering(operator, l.len().cmp(&r.len()))),
            };
        }
        _ => match numbers(left, right)? {
            Numbers::Ints(l, r) => l.cmp(&r),
            // Comparing directly keeps NaN behaving as "never ordered".
            Numbers::Floats(l, r) => {
                return Some(match operator {
                    BinaryOp::Less => l < r,
                    BinaryOp::LessEqual => l <= r,
                    BinaryOp::Greater => l > r,
                    _ => l >= r,
                })
            }
        },
    };
    Some(apply_ordering(operator, ordering))
}

fn apply_ordering(operator: BinaryOp, ordering: Ordering) -> bool {
    match operator {
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::LessEqual => ordering != Ordering::Greater,
        BinaryOp::Greater => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    }
}

fn unsupported(operator: BinaryOp, left: &Value, right: &Value, span: Span) -> EvalError {
    EvalError::type_error(
        span,
        format!(
            "Unsupported operand types for {}: '{}' and '{}'",
            operator.symbol(),
            left.type_name(),
            right.type_name()
        ),
    )
}

fn overflow(span: Span) -> EvalError {
    EvalError::arithmetic(span, "Integer overflow".to_string())
        .with_help("Integers are 64-bit; use a float operand for larger magnitudes.")
}

fn division_by_zero(span: Span) -> EvalError {
    EvalError::arithmetic(span, "Division by zero".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_divmod_matches_floor_semantics() {
        assert_eq!(float_divmod(7.0, 2.0), (3.0, 1.0));
        assert_eq!(float_divmod(-7.0, 2.0), (-4.0, 1.0));
        assert_eq!(float_divmod(7.0, -2.0), (-4.0, -1.0));
        assert_eq!(float_divmod(7.5, 2.0), (3.0, 1.5));
    }
}
