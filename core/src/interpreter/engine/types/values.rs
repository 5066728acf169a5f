//! Runtime value types

use super::ast::{NodeRef, SqlMode};
use super::control::ClosureHome;
use crate::interpreter::engine::env::Env;
use crate::interpreter::engine::errors::{RuntimeError, StructuralError};
use crate::interpreter::engine::vm::Engine;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Display nesting beyond this depth is elided (lists may contain themselves)
const DISPLAY_DEPTH: usize = 8;

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type ObjRef = Rc<RefCell<PlainObject>>;

/* ===================== Value ===================== */

/// Runtime value
///
/// Scalars are stored inline; every other variant is a shared handle, so
/// cloning a `Value` never copies an aggregate.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(ListRef),
    Object(ObjRef),
    Native(Rc<dyn NativeObject>),
    Function(Rc<Function>),
    Closure(Rc<Closure>),
    Primitive(Primitive),
    NativeCall(NativeFn),
    Args(Rc<Args>),
    RawSql(Rc<RawSql>),
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn object(object: PlainObject) -> Value {
        Value::Object(Rc::new(RefCell::new(object)))
    }

    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Native(_) => "native object",
            Value::Function(_) => "function",
            Value::Closure(_) => "closure",
            Value::Primitive(_) => "primitive",
            Value::NativeCall(_) => "native function",
            Value::Args(_) => "args",
            Value::RawSql(_) => "sql",
        }
    }

    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            _ => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::Closure(_) | Value::Primitive(_) | Value::NativeCall(_)
        )
    }

    /// Identity comparison
    ///
    /// Null, booleans, numbers, strings and SQL text compare by value; every
    /// other variant compares by reference. `Int(1)` and `Float(1.0)` are
    /// distinct.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::RawSql(a), Value::RawSql(b)) => a.text == b.text && a.mode == b.mode,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => thin_ptr(a) == thin_ptr(b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            (Value::NativeCall(a), Value::NativeCall(b)) => a.ptr() == b.ptr(),
            (Value::Args(a), Value::Args(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                if depth >= DISPLAY_DEPTH {
                    return write!(f, "[...]");
                }
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_nested(f, depth + 1)?;
                }
                write!(f, "]")
            }
            Value::Args(args) => {
                if depth >= DISPLAY_DEPTH {
                    return write!(f, "(...)");
                }
                write!(f, "(")?;
                for (i, item) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_nested(f, depth + 1)?;
                }
                write!(f, ")")
            }
            Value::Object(obj) => write!(f, "<object with {} slots>", obj.borrow().len()),
            Value::Native(native) => write!(f, "<{}>", native.type_name()),
            Value::Function(func) => match &func.name {
                Some(name) => write!(f, "<function {}>", name),
                None => write!(f, "<function>"),
            },
            Value::Closure(_) => write!(f, "<closure>"),
            Value::Primitive(p) => write!(f, "<primitive {}>", p.name()),
            Value::NativeCall(native) => write!(f, "<native {}>", native.name()),
            Value::RawSql(sql) => write!(f, "{}", sql.text),
        }
    }
}

fn thin_ptr(native: &Rc<dyn NativeObject>) -> *const () {
    Rc::as_ptr(native) as *const ()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_nested(f, 0)
    }
}

// Shallow: handles print their kind and summary, never the object graph.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Float(x) => write!(f, "Float({:?})", x),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::RawSql(sql) => write!(f, "RawSql({:?}, {:?})", sql.text, sql.mode),
            other => write!(f, "{}({})", other.kind(), other),
        }
    }
}

/// Equality is identity; see [`Value::is_identical`]
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.is_identical(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

/* ===================== Slot keys ===================== */

/// Hashable wrapper giving slot keys the same equality as [`Value::is_identical`]
#[derive(Clone, Debug)]
pub struct SlotKey(Value);

impl SlotKey {
    pub fn new(value: Value) -> Self {
        SlotKey(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl PartialEq for SlotKey {
    fn eq(&self, other: &SlotKey) -> bool {
        self.0.is_identical(&other.0)
    }
}

impl Eq for SlotKey {}

impl Hash for SlotKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(&self.0).hash(state);
        match &self.0 {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            // 0.0 and -0.0 are identical
            Value::Float(x) => {
                if *x == 0.0 {
                    0u64.hash(state)
                } else {
                    x.to_bits().hash(state)
                }
            }
            Value::Str(s) => s.hash(state),
            Value::RawSql(sql) => sql.text.hash(state),
            Value::List(l) => Rc::as_ptr(l).hash(state),
            Value::Object(o) => Rc::as_ptr(o).hash(state),
            Value::Native(n) => thin_ptr(n).hash(state),
            Value::Function(func) => Rc::as_ptr(func).hash(state),
            Value::Closure(c) => Rc::as_ptr(c).hash(state),
            Value::Primitive(p) => p.hash(state),
            Value::NativeCall(n) => n.ptr().hash(state),
            Value::Args(a) => Rc::as_ptr(a).hash(state),
        }
    }
}

/* ===================== Objects ===================== */

/// Plain script object: ordered slots plus one delegation parent
#[derive(Debug, Default)]
pub struct PlainObject {
    slots: IndexMap<SlotKey, Value, FxBuildHasher>,
    parent: Value,
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl PlainObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Value) -> Self {
        PlainObject {
            slots: IndexMap::default(),
            parent,
        }
    }

    /// Own slot only; delegation lives in [`crate::interpreter::engine::objects`]
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.slots.get(&SlotKey(key.clone())).cloned()
    }

    pub fn set(&mut self, key: Value, value: Value) {
        self.slots.insert(SlotKey(key), value);
    }

    pub fn has(&self, key: &Value) -> bool {
        self.slots.contains_key(&SlotKey(key.clone()))
    }

    pub fn parent(&self) -> &Value {
        &self.parent
    }

    /// Unchecked; use `objects::set_parent` to reject cycles
    pub(crate) fn replace_parent(&mut self, parent: Value) {
        self.parent = parent;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.slots.iter().map(|(k, v)| (k.value(), v))
    }
}

/// Host-backed object
///
/// Used with `new`, a native object builds the instance itself. It may also
/// answer slot lookups, in which case delegation stops at it.
pub trait NativeObject: fmt::Debug {
    fn type_name(&self) -> &str;

    fn construct(&self, engine: &mut Engine, args: Args) -> Result<Value, RuntimeError>;

    fn slot(&self, _key: &Value) -> Option<Value> {
        None
    }

    fn set_slot(&self, _key: Value, _value: Value) -> Result<(), RuntimeError> {
        Err(StructuralError::NotAssignable {
            kind: "native object",
        }
        .into())
    }
}

/* ===================== Callables ===================== */

/// Named function
///
/// The defining environment is attached exactly once, when the function
/// expression is evaluated.
pub struct Function {
    pub name: Option<Rc<str>>,
    pub params: Rc<[Rc<str>]>,
    pub body: NodeRef,
    env: OnceCell<Env>,
}

impl Function {
    pub fn new(name: Option<Rc<str>>, params: Rc<[Rc<str>]>, body: NodeRef) -> Self {
        Function {
            name,
            params,
            body,
            env: OnceCell::new(),
        }
    }

    /// Returns false if an environment was already attached
    pub fn attach(&self, env: Env) -> bool {
        self.env.set(env).is_ok()
    }

    pub fn env(&self) -> Option<&Env> {
        self.env.get()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Anonymous block closure
pub struct Closure {
    pub params: Rc<[Rc<str>]>,
    pub body: NodeRef,
    pub env: Env,
    /// Activation a `return` inside the body unwinds to
    pub home: ClosureHome,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("home", &self.home)
            .finish_non_exhaustive()
    }
}

/// Core primitives: a closed set, every other built-in is a [`NativeFn`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Identical,
    NotIdentical,
    Loop,
    LoopBreak,
    LoopContinue,
    Exit,
}

impl Primitive {
    pub const ALL: [Primitive; 6] = [
        Primitive::Identical,
        Primitive::NotIdentical,
        Primitive::Loop,
        Primitive::LoopBreak,
        Primitive::LoopContinue,
        Primitive::Exit,
    ];

    /// Global name the primitive is bound to
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Identical => "is",
            Primitive::NotIdentical => "isnt",
            Primitive::Loop => "loop",
            Primitive::LoopBreak => "break",
            Primitive::LoopContinue => "continue",
            Primitive::Exit => "exit",
        }
    }
}

/// What a native call left behind
#[derive(Debug)]
pub enum Completion {
    /// Resume the caller with this value
    Value(Value),
    /// The native positioned the engine itself (trigger style)
    Deferred,
}

pub type NativeImpl = dyn Fn(&mut Engine, Value, Args) -> Result<Completion, RuntimeError>;

/// Host extension callable
///
/// Called with the engine, the call context (`this`, or null for plain
/// calls) and the evaluated arguments.
#[derive(Clone)]
pub struct NativeFn {
    name: Rc<str>,
    func: Rc<NativeImpl>,
}

impl NativeFn {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&mut Engine, Value, Args) -> Result<Completion, RuntimeError> + 'static,
    {
        NativeFn {
            name: Rc::from(name),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(
        &self,
        engine: &mut Engine,
        context: Value,
        args: Args,
    ) -> Result<Completion, RuntimeError> {
        (self.func)(engine, context, args)
    }

    fn ptr(&self) -> *const () {
        Rc::as_ptr(&self.func) as *const ()
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({})", self.name)
    }
}

/* ===================== Args / SQL ===================== */

/// Evaluated argument list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Args(values)
    }

    pub fn empty() -> Self {
        Args(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Positional argument, null when missing
    pub fn get(&self, index: usize) -> Value {
        self.0.get(index).cloned().unwrap_or(Value::Null)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }

    pub fn expect_count(&self, name: &str, expected: usize) -> Result<(), RuntimeError> {
        self.expect_between(name, expected, expected)
    }

    pub fn expect_between(&self, name: &str, min: usize, max: usize) -> Result<(), RuntimeError> {
        if self.0.len() < min || self.0.len() > max {
            return Err(StructuralError::Arity {
                name: name.to_string(),
                expected: if self.0.len() < min { min } else { max },
                given: self.0.len(),
            }
            .into());
        }
        Ok(())
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Args(values)
    }
}

/// Rendered SQL text, spliced verbatim when interpolated into other SQL
#[derive(Debug, Clone, PartialEq)]
pub struct RawSql {
    pub text: String,
    pub mode: SqlMode,
}
