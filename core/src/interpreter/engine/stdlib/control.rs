//! Control-flow natives
//!
//! `if`, `call` and `apply` are trigger style: they schedule the callee on the
//! evaluator loop and return `Deferred`, so a `return` inside a branch unwinds
//! through ordinary frames. `while`, `each` and `try` are invoke style: they
//! drive the callee from Rust and inspect how it ended.

use super::{type_error, value};
use crate::interpreter::engine::errors::RuntimeError;
use crate::interpreter::engine::types::{Args, Completion, Control, Value};
use crate::interpreter::engine::vm::Engine;

/// How one invocation of a loop body ended
enum Iteration {
    Done(Value),
    Break,
    Continue,
}

fn iterate(engine: &mut Engine, body: &Value, args: Args) -> Result<Iteration, RuntimeError> {
    match engine.invoke(body, None, args) {
        Ok(v) => Ok(Iteration::Done(v)),
        Err(RuntimeError::Control(Control::Break)) => Ok(Iteration::Break),
        Err(RuntimeError::Control(Control::Continue)) => Ok(Iteration::Continue),
        Err(err) => Err(err),
    }
}

/* ===================== Conditionals ===================== */

/// if(cond, then[, else])
///
/// Callable branches are triggered; plain values are the result directly.
pub fn if_(engine: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_between("if", 2, 3)?;
    let branch = if args.get(0).is_truthy() {
        args.get(1)
    } else {
        args.get(2)
    };

    if branch.is_callable() {
        engine.trigger(&branch, None, Args::empty())?;
        return Ok(Completion::Deferred);
    }
    value(branch)
}

/* ===================== Loops ===================== */

/// while(cond, body)
///
/// `cond` is re-invoked before every iteration; a non-callable `cond` is
/// tested as is (`while(true, ...)` needs a `break`).
pub fn while_(engine: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("while", 2)?;
    let (cond, body) = (args.get(0), args.get(1));

    let depth = engine.push_loop_marker()?;
    loop {
        let test = if cond.is_callable() {
            match iterate(engine, &cond, Args::empty())? {
                Iteration::Done(v) => v,
                Iteration::Break => return value(Value::Null),
                Iteration::Continue => continue,
            }
        } else {
            cond.clone()
        };
        if !test.is_truthy() {
            break;
        }

        if let Iteration::Break = iterate(engine, &body, Args::empty())? {
            return value(Value::Null);
        }
    }
    engine.pop_loop_marker(depth)?;
    value(Value::Null)
}

/// each(list, fn) - calls fn(item) for a snapshot of the list
pub fn each(engine: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("each", 2)?;
    let items = match args.get(0) {
        Value::List(items) => items.borrow().clone(),
        Value::Args(items) => items.as_slice().to_vec(),
        other => return Err(type_error("each", "list", &other)),
    };
    let body = args.get(1);

    let depth = engine.push_loop_marker()?;
    for item in items {
        if let Iteration::Break = iterate(engine, &body, Args::new(vec![item]))? {
            return value(Value::Null);
        }
    }
    engine.pop_loop_marker(depth)?;
    value(Value::Null)
}

/* ===================== Errors ===================== */

/// try(body[, catch[, finally]])
///
/// `catch(message)` handles native failures only; structural errors and
/// stack overflow always reach the embedder. `finally` runs after the body
/// whichever way it ended, unless the script exited.
pub fn try_(engine: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_between("try", 1, 3)?;
    let (body, catch, finally) = (args.get(0), args.get(1), args.get(2));

    let mut outcome = engine.invoke(&body, None, Args::empty());

    let caught = match &outcome {
        Err(RuntimeError::Native { source, .. }) if catch.is_callable() => Some(source.to_string()),
        _ => None,
    };
    if let Some(message) = caught {
        outcome = engine.invoke(&catch, None, Args::new(vec![Value::str(&message)]));
    }

    if finally.is_callable() && !engine.is_halted() {
        engine.invoke_preserving(&finally, Args::empty())?;
    }
    outcome.map(Completion::Value)
}

/// raise(message)
pub fn raise(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("raise", 1)?;
    Err(RuntimeError::raised("raise", args.get(0).to_string()))
}

/* ===================== Calling ===================== */

/// call(fn, ...args)
pub fn call(engine: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_between("call", 1, usize::MAX)?;
    let mut values = args.into_vec();
    let callee = values.remove(0);
    engine.trigger(&callee, None, Args::new(values))?;
    Ok(Completion::Deferred)
}

/// apply(fn, list) - the list (or args value) supplies the arguments
pub fn apply(engine: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("apply", 2)?;
    let values = match args.get(1) {
        Value::List(items) => items.borrow().clone(),
        Value::Args(items) => items.as_slice().to_vec(),
        Value::Null => Vec::new(),
        other => return Err(type_error("apply", "list", &other)),
    };
    engine.trigger(&args.get(0), None, Args::new(values))?;
    Ok(Completion::Deferred)
}
