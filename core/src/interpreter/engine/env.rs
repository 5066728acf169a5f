//! Lexical environments
//!
//! An [`Env`] is a cheap-to-clone handle to one scope. Scopes are shared by
//! every function or closure that captured them, and live as long as the
//! longest holder.

use super::errors::{RuntimeError, StructuralError};
use super::types::{ClosureHome, Value};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct Scope {
    vars: FxHashMap<Rc<str>, Value>,
    parent: Option<Env>,
    /// `this`
    context: Option<Value>,
    /// Base object for `super`
    receiver: Option<Value>,
    home: Option<ClosureHome>,
}

/// Handle to a lexical scope
#[derive(Clone)]
pub struct Env(Rc<RefCell<Scope>>);

impl Env {
    /// Scope with no parent
    pub fn root() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<Env>) -> Self {
        Env(Rc::new(RefCell::new(Scope {
            vars: FxHashMap::default(),
            parent,
            context: None,
            receiver: None,
            home: None,
        })))
    }

    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    pub fn parent(&self) -> Option<Env> {
        self.0.borrow().parent.clone()
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Walk from this scope outwards, returning the first `Some`
    fn find<T>(&self, mut f: impl FnMut(&mut Scope) -> Option<T>) -> Option<T> {
        let mut current = self.clone();
        loop {
            let parent = {
                let mut scope = current.0.borrow_mut();
                if let Some(found) = f(&mut scope) {
                    return Some(found);
                }
                scope.parent.clone()
            };
            current = parent?;
        }
    }

    /* ===================== Variables ===================== */

    /// Bind in this scope, shadowing outer bindings
    pub fn declare(&self, name: impl Into<Rc<str>>, value: Value) {
        self.0.borrow_mut().vars.insert(name.into(), value);
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.0.borrow().vars.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        self.find(|scope| scope.vars.get(name).cloned())
            .ok_or_else(|| unbound(name))
    }

    /// Rebind in the nearest scope that declares `name`
    pub fn set(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let mut value = Some(value);
        self.find(|scope| match scope.vars.get_mut(name) {
            Some(slot) => {
                *slot = value.take().unwrap_or_default();
                Some(())
            }
            None => None,
        })
        .ok_or_else(|| unbound(name))
    }

    /* ===================== Context ===================== */

    /// `this`, null outside any method activation
    pub fn context(&self) -> Value {
        self.find(|scope| scope.context.clone())
            .unwrap_or_default()
    }

    pub fn set_context(&self, context: Value) {
        self.0.borrow_mut().context = Some(context);
    }

    pub fn receiver(&self) -> Value {
        self.find(|scope| scope.receiver.clone())
            .unwrap_or_default()
    }

    pub fn set_receiver(&self, receiver: Value) {
        self.0.borrow_mut().receiver = Some(receiver);
    }

    pub fn closure_home(&self) -> Option<ClosureHome> {
        self.find(|scope| scope.home)
    }

    pub fn set_closure_home(&self, home: ClosureHome) {
        self.0.borrow_mut().home = Some(home);
    }
}

fn unbound(name: &str) -> RuntimeError {
    StructuralError::Unbound {
        name: name.to_string(),
    }
    .into()
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.0.borrow();
        let mut names: Vec<&str> = scope.vars.keys().map(|k| &**k).collect();
        names.sort_unstable();
        f.debug_struct("Env")
            .field("vars", &names)
            .field("has_parent", &scope.parent.is_some())
            .finish()
    }
}
