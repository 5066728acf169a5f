//! Slot access and delegation
//!
//! Reads walk the receiver's parent chain and never report "absent": a miss
//! anywhere is `Null`. Writes always land on the receiver itself.

use super::errors::{RuntimeError, StructuralError};
use super::types::{ObjRef, Value};
use std::rc::Rc;

/// Resolve `key` along the delegation chain of `receiver`
///
/// Returns the slot value and the object that defines it.
pub fn lookup(receiver: &Value, key: &Value) -> Option<(Value, Value)> {
    let mut current = receiver.clone();
    loop {
        match current {
            Value::Object(obj) => {
                let parent = {
                    let object = obj.borrow();
                    if let Some(found) = object.get(key) {
                        return Some((found, Value::Object(obj.clone())));
                    }
                    object.parent().clone()
                };
                current = parent;
            }
            Value::Native(native) => {
                let found = native.slot(key)?;
                return Some((found, Value::Native(native)));
            }
            _ => return None,
        }
    }
}

pub fn get_slot(receiver: &Value, key: &Value) -> Value {
    lookup(receiver, key)
        .map(|(value, _)| value)
        .unwrap_or(Value::Null)
}

pub fn set_slot(receiver: &Value, key: Value, value: Value) -> Result<(), RuntimeError> {
    match receiver {
        Value::Object(obj) => {
            obj.borrow_mut().set(key, value);
            Ok(())
        }
        Value::Native(native) => native.set_slot(key, value),
        other => Err(StructuralError::NotAssignable { kind: other.kind() }.into()),
    }
}

/// Delegation parent, null for anything that is not a plain object
pub fn parent_of(value: &Value) -> Value {
    match value {
        Value::Object(obj) => obj.borrow().parent().clone(),
        _ => Value::Null,
    }
}

/// Reassign the parent of `object`, rejecting chains that would loop back
pub fn set_parent(object: &ObjRef, parent: Value) -> Result<(), RuntimeError> {
    let mut current = parent.clone();
    while let Value::Object(ancestor) = current {
        if Rc::ptr_eq(&ancestor, object) {
            return Err(StructuralError::ParentCycle.into());
        }
        current = ancestor.borrow().parent().clone();
    }
    object.borrow_mut().replace_parent(parent);
    Ok(())
}
