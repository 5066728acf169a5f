//! Arithmetic and comparison natives
//!
//! Integers stay integers while both operands are integers; mixing in a
//! float promotes the result. Integer overflow and division by zero raise.

use super::{type_error, value};
use crate::interpreter::engine::errors::RuntimeError;
use crate::interpreter::engine::types::{Args, Completion, Value};
use crate::interpreter::engine::vm::Engine;
use std::cmp::Ordering;

/* ===================== Arithmetic ===================== */

fn arith(
    name: &str,
    args: &Args,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    args.expect_count(name, 2)?;
    match (args.get(0), args.get(1)) {
        (Value::Int(a), Value::Int(b)) => int_op(a, b)
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::raised(name, "integer overflow")),
        (a, b) => match (as_float(&a), as_float(&b)) {
            (Some(x), Some(y)) => Ok(Value::Float(float_op(x, y))),
            (None, _) => Err(type_error(name, "number", &a)),
            (_, None) => Err(type_error(name, "number", &b)),
        },
    }
}

fn as_float(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

/// add(a, b) - numeric sum, or concatenation when either side is a string
pub fn add(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    if let (Value::Str(_), _) | (_, Value::Str(_)) = (args.get(0), args.get(1)) {
        args.expect_count("add", 2)?;
        return value(Value::str(&format!("{}{}", args.get(0), args.get(1))));
    }
    value(arith("add", &args, i64::checked_add, |a, b| a + b)?)
}

pub fn sub(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    value(arith("sub", &args, i64::checked_sub, |a, b| a - b)?)
}

pub fn mul(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    value(arith("mul", &args, i64::checked_mul, |a, b| a * b)?)
}

/// div(a, b) - truncating for integers
pub fn div(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    if args.get(1).as_int() == Some(0) {
        return Err(RuntimeError::raised("div", "division by zero"));
    }
    value(arith("div", &args, i64::checked_div, |a, b| a / b)?)
}

pub fn rem(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    if args.get(1).as_int() == Some(0) {
        return Err(RuntimeError::raised("mod", "division by zero"));
    }
    value(arith("mod", &args, i64::checked_rem, |a, b| a % b)?)
}

pub fn neg(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("neg", 1)?;
    match args.get(0) {
        Value::Int(i) => i
            .checked_neg()
            .map(|n| Completion::Value(Value::Int(n)))
            .ok_or_else(|| RuntimeError::raised("neg", "integer overflow")),
        Value::Float(x) => value(Value::Float(-x)),
        other => Err(type_error("neg", "number", &other)),
    }
}

/* ===================== Comparison ===================== */

/// Equality: numbers compare across int/float, everything else by identity
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (as_float(a), as_float(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a.is_identical(b),
    }
}

fn compare(name: &str, args: &Args) -> Result<Ordering, RuntimeError> {
    args.expect_count(name, 2)?;
    let (a, b) = (args.get(0), args.get(1));
    let ordering = match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        _ => match (as_float(&a), as_float(&b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            (None, _) => return Err(type_error(name, "number or string", &a)),
            (_, None) => return Err(type_error(name, "number or string", &b)),
        },
    };
    // NaN compares false both ways
    ordering.ok_or_else(|| RuntimeError::raised(name, "values are not comparable"))
}

pub fn eq(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("eq", 2)?;
    value(Value::Bool(values_equal(&args.get(0), &args.get(1))))
}

pub fn ne(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("ne", 2)?;
    value(Value::Bool(!values_equal(&args.get(0), &args.get(1))))
}

pub fn lt(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    value(Value::Bool(compare("lt", &args)? == Ordering::Less))
}

pub fn le(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    value(Value::Bool(compare("le", &args)? != Ordering::Greater))
}

pub fn gt(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    value(Value::Bool(compare("gt", &args)? == Ordering::Greater))
}

pub fn ge(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    value(Value::Bool(compare("ge", &args)? != Ordering::Less))
}

pub fn not(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("not", 1)?;
    value(Value::Bool(!args.get(0).is_truthy()))
}
