//! EVAL dispatch
//!
//! Each node either produces a value directly (switching to CONT) or pushes
//! the continuation for its remaining work and evaluates its first
//! sub-expression.

use super::errors::{RuntimeError, StructuralError};
use super::types::{
    Closure, Entry, FrameId, FrameKind, Fragment, Function, Node, NodeRef, PlainObject, RawSql,
    SqlMode, Value,
};
use super::vm::{Engine, Mode};
use std::rc::Rc;

impl Engine {
    pub(crate) fn eval(&mut self, node: &NodeRef) -> Result<(), RuntimeError> {
        match &**node {
            Node::Block(block) => self.enter_block(block)?,

            Node::Null => self.produce(Value::Null),
            Node::Bool { v } => self.produce(Value::Bool(*v)),
            Node::Int { v } => self.produce(Value::Int(*v)),
            Node::Float { v } => self.produce(Value::Float(*v)),
            Node::Str { v } => self.produce(Value::Str(v.clone())),
            Node::Template { parts } => {
                let id = self.reserve_frame()?;
                self.resume_interpolate(id, parts.clone(), 0, String::new(), None)?;
            }
            Node::Sql { parts, mode } => {
                let id = self.reserve_frame()?;
                self.resume_interpolate(id, parts.clone(), 0, String::new(), Some(*mode))?;
            }
            Node::ObjectLit { entries } => match entries.first() {
                None => self.produce(Value::object(PlainObject::new())),
                Some(first) => {
                    let key = first.key.clone();
                    let frame = FrameKind::ObjectLit {
                        entries: entries.clone(),
                        next: 0,
                        key: None,
                        slots: Vec::with_capacity(entries.len()),
                    };
                    self.push_and_eval(frame, key)?;
                }
            },
            Node::ArrayLit { items } => match items.first() {
                None => self.produce(Value::list(Vec::new())),
                Some(first) => {
                    let first = first.clone();
                    let frame = FrameKind::ArrayLit {
                        items: items.clone(),
                        next: 0,
                        values: Vec::with_capacity(items.len()),
                    };
                    self.push_and_eval(frame, first)?;
                }
            },

            Node::Ident { name } => {
                let value = self.env.get(name)?;
                self.produce(value);
            }
            Node::Declare { name } => {
                self.env.declare(name.clone(), Value::Null);
                self.produce(Value::Null);
            }
            Node::Assign { name, value } => {
                self.push_and_eval(FrameKind::Assign { name: name.clone() }, value.clone())?
            }
            Node::DeclareAssign { name, value } => {
                self.push_and_eval(FrameKind::Declare { name: name.clone() }, value.clone())?
            }

            Node::SlotGet { receiver, slot } => self.push_and_eval(
                FrameKind::SlotGetReceiver { slot: slot.clone() },
                receiver.clone(),
            )?,
            Node::SlotSet {
                receiver,
                slot,
                value,
            } => self.push_and_eval(
                FrameKind::SlotSetReceiver {
                    slot: slot.clone(),
                    value: value.clone(),
                },
                receiver.clone(),
            )?,
            Node::SlotCall {
                receiver,
                slot,
                args,
                tail,
            } => self.push_and_eval(
                FrameKind::SlotCallReceiver {
                    slot: slot.clone(),
                    args: args.clone(),
                    tail: *tail,
                    super_call: matches!(**receiver, Node::Super),
                },
                receiver.clone(),
            )?,
            Node::Call { callee, args, tail } => self.push_and_eval(
                FrameKind::Call {
                    args: args.clone(),
                    tail: *tail,
                },
                callee.clone(),
            )?,

            Node::Function { name, params, body } => {
                let func = Function::new(name.clone(), params.clone(), body.clone());
                func.attach(self.env.clone());
                let value = Value::Function(Rc::new(func));
                if let Some(name) = name {
                    self.env.declare(name.clone(), value.clone());
                }
                self.produce(value);
            }
            Node::Closure { params, body } => {
                let home = self
                    .env
                    .closure_home()
                    .unwrap_or_else(|| self.root_home());
                let closure = Closure {
                    params: params.clone(),
                    body: body.clone(),
                    env: self.env.clone(),
                    home,
                };
                self.produce(Value::Closure(Rc::new(closure)));
            }
            Node::This => {
                let context = self.env.context();
                self.produce(context);
            }
            Node::Super => {
                let base = super::objects::parent_of(&self.env.receiver());
                self.produce(base);
            }
            Node::New { operand, args } => {
                self.push_and_eval(FrameKind::New { args: args.clone() }, operand.clone())?
            }

            Node::Return { value, tail } => match value {
                // Bare return: the current value is the result
                None => self.unwind_return()?,
                Some(expr) if *tail => {
                    self.unwind_return()?;
                    self.mode = Mode::Eval(expr.clone());
                }
                Some(expr) => self.push_and_eval(FrameKind::Return, expr.clone())?,
            },
        }
        Ok(())
    }

    /// Allocate an identity for a frame that is only pushed if work remains
    pub(crate) fn reserve_frame(&mut self) -> Result<FrameId, RuntimeError> {
        self.ensure_capacity()?;
        Ok(self.next_frame_id())
    }

    /* ===================== Literal aggregates ===================== */

    pub(crate) fn resume_object_lit(
        &mut self,
        id: FrameId,
        entries: Rc<[Entry]>,
        mut next: usize,
        key: Option<Value>,
        mut slots: Vec<(Value, Value)>,
    ) -> Result<(), RuntimeError> {
        let Some(key) = key else {
            // The key of entry `next` is done; evaluate its value
            let value = entries[next].value.clone();
            let key = Some(self.value.clone());
            self.repush(
                id,
                FrameKind::ObjectLit {
                    entries,
                    next,
                    key,
                    slots,
                },
            );
            self.mode = Mode::Eval(value);
            return Ok(());
        };

        slots.push((key, self.value.clone()));
        next += 1;
        match entries.get(next) {
            Some(entry) => {
                let key_node = entry.key.clone();
                self.repush(
                    id,
                    FrameKind::ObjectLit {
                        entries,
                        next,
                        key: None,
                        slots,
                    },
                );
                self.mode = Mode::Eval(key_node);
            }
            None => {
                let mut object = PlainObject::new();
                for (key, value) in slots {
                    object.set(key, value);
                }
                self.produce(Value::object(object));
            }
        }
        Ok(())
    }

    pub(crate) fn resume_array_lit(
        &mut self,
        id: FrameId,
        items: Rc<[NodeRef]>,
        next: usize,
        mut values: Vec<Value>,
    ) -> Result<(), RuntimeError> {
        values.push(self.value.clone());
        let next = next + 1;
        match items.get(next) {
            Some(item) => {
                let item = item.clone();
                self.repush(
                    id,
                    FrameKind::ArrayLit {
                        items,
                        next,
                        values,
                    },
                );
                self.mode = Mode::Eval(item);
            }
            None => self.produce(Value::list(values)),
        }
        Ok(())
    }

    /* ===================== Interpolation ===================== */

    /// Append text fragments until the next expression, which is evaluated
    /// under a re-pushed frame
    ///
    /// When `next > 0` the current value is the result of fragment `next - 1`.
    pub(crate) fn resume_interpolate(
        &mut self,
        id: FrameId,
        parts: Rc<[Fragment]>,
        mut next: usize,
        mut text: String,
        sql: Option<SqlMode>,
    ) -> Result<(), RuntimeError> {
        if next > 0 {
            match sql {
                Some(mode) => render_sql(&self.value, mode, &mut text)?,
                None => text.push_str(&self.value.to_string()),
            }
        }

        while let Some(part) = parts.get(next) {
            next += 1;
            match part {
                Fragment::Text { v } => text.push_str(v),
                Fragment::Expr { node } => {
                    let node = node.clone();
                    self.repush(
                        id,
                        FrameKind::Interpolate {
                            parts,
                            next,
                            text,
                            sql,
                        },
                    );
                    self.mode = Mode::Eval(node);
                    return Ok(());
                }
            }
        }

        let result = match sql {
            Some(mode) => Value::RawSql(Rc::new(RawSql { text, mode })),
            None => Value::Str(Rc::from(text)),
        };
        self.produce(result);
        Ok(())
    }
}

/// Append `value` to SQL text
///
/// Escaped mode renders SQL literals (strings quoted with `'` doubled); SQL
/// values are always spliced as-is.
pub fn render_sql(value: &Value, mode: SqlMode, out: &mut String) -> Result<(), RuntimeError> {
    match (value, mode) {
        (Value::RawSql(sql), _) => out.push_str(&sql.text),
        (_, SqlMode::Verbatim) => out.push_str(&value.to_string()),
        (Value::Null, SqlMode::Escaped) => out.push_str("NULL"),
        (Value::Bool(true), SqlMode::Escaped) => out.push_str("TRUE"),
        (Value::Bool(false), SqlMode::Escaped) => out.push_str("FALSE"),
        (Value::Int(i), SqlMode::Escaped) => out.push_str(&i.to_string()),
        (Value::Float(x), SqlMode::Escaped) => out.push_str(&x.to_string()),
        (Value::Str(s), SqlMode::Escaped) => {
            out.push('\'');
            out.push_str(&s.replace('\'', "''"));
            out.push('\'');
        }
        (Value::List(items), SqlMode::Escaped) => {
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_sql(item, mode, out)?;
            }
        }
        (other, SqlMode::Escaped) => {
            return Err(StructuralError::SqlRender { kind: other.kind() }.into())
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(value: &Value) -> String {
        let mut out = String::new();
        render_sql(value, SqlMode::Escaped, &mut out).unwrap();
        out
    }

    #[test]
    fn test_render_sql_escapes_literals() {
        assert_eq!(render(&Value::str("O'Brien")), "'O''Brien'");
        assert_eq!(render(&Value::Null), "NULL");
        assert_eq!(render(&Value::Bool(false)), "FALSE");
        assert_eq!(
            render(&Value::list(vec![Value::Int(1), Value::str("a")])),
            "1, 'a'"
        );
    }

    #[test]
    fn test_render_sql_splices_raw_sql() {
        let raw = Value::RawSql(Rc::new(RawSql {
            text: "SELECT 1".to_string(),
            mode: SqlMode::Escaped,
        }));
        assert_eq!(render(&raw), "SELECT 1");

        let mut out = String::new();
        render_sql(&Value::str("t1"), SqlMode::Verbatim, &mut out).unwrap();
        assert_eq!(out, "t1");
    }

    #[test]
    fn test_render_sql_rejects_objects() {
        let mut out = String::new();
        let err = render_sql(
            &Value::object(PlainObject::new()),
            SqlMode::Escaped,
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Structural(StructuralError::SqlRender { kind: "object" })
        ));
    }
}
