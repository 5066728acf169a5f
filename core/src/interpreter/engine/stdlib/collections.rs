//! String, list, argument-list and object natives

use super::{type_error, value};
use crate::interpreter::engine::errors::RuntimeError;
use crate::interpreter::engine::objects;
use crate::interpreter::engine::types::{Args, Completion, Value};
use crate::interpreter::engine::vm::Engine;
use std::rc::Rc;

/// str(x) - display form
pub fn str(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("str", 1)?;
    value(Value::str(&args.get(0).to_string()))
}

/// len(x) - characters of a string, items of a list, slots of an object
pub fn len(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("len", 1)?;
    let n = match args.get(0) {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Args(items) => items.len(),
        Value::Object(obj) => obj.borrow().len(),
        other => return Err(type_error("len", "string, list or object", &other)),
    };
    value(Value::Int(n as i64))
}

/// push(list, item) - appends in place and returns the list
pub fn push(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("push", 2)?;
    let list = args.get(0);
    match &list {
        Value::List(items) => items.borrow_mut().push(args.get(1)),
        other => return Err(type_error("push", "list", other)),
    }
    value(list)
}

/// at(list, index) - null when out of range; negative indexes count from the end
pub fn at(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("at", 2)?;
    let index = match args.get(1) {
        Value::Int(i) => i,
        other => return Err(type_error("at", "int", &other)),
    };
    let pick = |items: &[Value]| {
        let len = items.len() as i64;
        let i = if index < 0 { len + index } else { index };
        if (0..len).contains(&i) {
            items[i as usize].clone()
        } else {
            Value::Null
        }
    };
    match args.get(0) {
        Value::List(items) => value(pick(items.borrow().as_slice())),
        Value::Args(items) => value(pick(items.as_slice())),
        other => Err(type_error("at", "list", &other)),
    }
}

/// print(...) - space-separated display forms on stdout
pub fn print(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    let line = args
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    println!("{}", line);
    value(Value::Null)
}

/// args(...) - packs the arguments into an args value
pub fn args(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    value(Value::Args(Rc::new(args)))
}

pub fn parent(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("parent", 1)?;
    value(objects::parent_of(&args.get(0)))
}

/// set_parent(object, parent) - rejects delegation cycles
pub fn set_parent(_: &mut Engine, _: Value, args: Args) -> Result<Completion, RuntimeError> {
    args.expect_count("set_parent", 2)?;
    let object = args.get(0);
    match &object {
        Value::Object(obj) => objects::set_parent(obj, args.get(1))?,
        other => return Err(type_error("set_parent", "object", other)),
    }
    value(object)
}
