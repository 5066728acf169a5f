//! Conversion of script values to host values

use super::types::Value;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::fmt;

/// Final value of a script in host form
///
/// Scalars, strings and lists convert directly (SQL text becomes a string).
/// Objects, callables and lists that contain themselves are returned as
/// opaque handles.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<HostValue>),
    Handle(Value),
}

impl HostValue {
    pub fn from_value(value: &Value) -> HostValue {
        convert(value, &mut Vec::new())
    }

    pub fn is_handle(&self) -> bool {
        matches!(self, HostValue::Handle(_))
    }
}

fn convert(value: &Value, visiting: &mut Vec<*const ()>) -> HostValue {
    match value {
        Value::Null => HostValue::Null,
        Value::Bool(b) => HostValue::Bool(*b),
        Value::Int(i) => HostValue::Int(*i),
        Value::Float(x) => HostValue::Float(*x),
        Value::Str(s) => HostValue::Str(s.to_string()),
        Value::RawSql(sql) => HostValue::Str(sql.text.clone()),
        Value::List(items) => {
            let ptr = std::rc::Rc::as_ptr(items) as *const ();
            if visiting.contains(&ptr) {
                return HostValue::Handle(value.clone());
            }
            visiting.push(ptr);
            let converted = items
                .borrow()
                .iter()
                .map(|item| convert(item, visiting))
                .collect();
            visiting.pop();
            HostValue::List(converted)
        }
        Value::Args(args) => HostValue::List(args.iter().map(|v| convert(v, visiting)).collect()),
        other => HostValue::Handle(other.clone()),
    }
}

impl Serialize for HostValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HostValue::Null => serializer.serialize_unit(),
            HostValue::Bool(b) => serializer.serialize_bool(*b),
            HostValue::Int(i) => serializer.serialize_i64(*i),
            HostValue::Float(x) => serializer.serialize_f64(*x),
            HostValue::Str(s) => serializer.serialize_str(s),
            HostValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            HostValue::Handle(value) => serializer.serialize_str(&value.to_string()),
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => Err(fmt::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::engine::types::PlainObject;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lists_convert_recursively() {
        let value = Value::list(vec![Value::Int(1), Value::list(vec![Value::str("a")])]);
        assert_eq!(
            HostValue::from_value(&value),
            HostValue::List(vec![
                HostValue::Int(1),
                HostValue::List(vec![HostValue::Str("a".to_string())]),
            ])
        );
        assert_eq!(HostValue::from_value(&value).to_string(), r#"[1,["a"]]"#);
    }

    #[test]
    fn test_self_containing_list_becomes_handle() {
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        let HostValue::List(items) = HostValue::from_value(&list) else {
            panic!("expected a list");
        };
        assert_eq!(items[0], HostValue::Int(1));
        assert!(items[1].is_handle());
    }

    #[test]
    fn test_objects_are_handles() {
        let object = Value::object(PlainObject::new());
        let host = HostValue::from_value(&object);
        assert_eq!(host, HostValue::Handle(object));
    }
}
