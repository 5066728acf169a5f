//! Standard library natives
//!
//! The core only knows the primitives (`is`, `isnt`, `loop`, `break`,
//! `continue`, `exit`). Everything else a script calls is a native installed
//! here, organized by category:
//! - math: arithmetic and comparison
//! - control: conditionals, loops, error handling, calling
//! - collections: strings, lists, argument lists and object parents

pub mod collections;
pub mod control;
pub mod math;

use super::errors::RuntimeError;
use super::types::{Args, Completion, Value};
use super::vm::Engine;

/// Native implementation signature
type NativeFnPtr = fn(&mut Engine, Value, Args) -> Result<Completion, RuntimeError>;

/* ===================== Registry ===================== */

const NATIVES: &[(&str, NativeFnPtr)] = &[
    ("add", math::add),
    ("sub", math::sub),
    ("mul", math::mul),
    ("div", math::div),
    ("mod", math::rem),
    ("neg", math::neg),
    ("eq", math::eq),
    ("ne", math::ne),
    ("lt", math::lt),
    ("le", math::le),
    ("gt", math::gt),
    ("ge", math::ge),
    ("not", math::not),
    ("if", control::if_),
    ("while", control::while_),
    ("each", control::each),
    ("try", control::try_),
    ("raise", control::raise),
    ("call", control::call),
    ("apply", control::apply),
    ("str", collections::str),
    ("len", collections::len),
    ("push", collections::push),
    ("at", collections::at),
    ("print", collections::print),
    ("args", collections::args),
    ("parent", collections::parent),
    ("set_parent", collections::set_parent),
];

/* ===================== Environment Injection ===================== */

/// Install every stdlib native as a global
pub fn install(engine: &mut Engine) {
    for (name, func) in NATIVES {
        engine.define_native(name, *func);
    }
}

/// Names of the installed natives
pub fn names() -> impl Iterator<Item = &'static str> {
    NATIVES.iter().map(|(name, _)| *name)
}

/* ===================== Helpers ===================== */

pub(crate) fn value(v: Value) -> Result<Completion, RuntimeError> {
    Ok(Completion::Value(v))
}

/// Type error raised by the native `name`
pub(crate) fn type_error(name: &str, expected: &str, got: &Value) -> RuntimeError {
    RuntimeError::raised(name, format!("expected {}, got {}", expected, got.kind()))
}
