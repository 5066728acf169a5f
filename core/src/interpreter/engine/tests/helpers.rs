//! Test helpers for engine tests
//!
//! Builders for syntax trees (there is no parser in this crate) and for
//! engines with the stdlib installed.

use crate::config::EngineConfig;
use crate::interpreter::engine::types::{Block, Entry, Fragment, Node, NodeRef, SqlMode};
use crate::interpreter::engine::{stdlib, Engine, HostValue, RuntimeError};
use crate::interpreter::tail_calls;
use std::rc::Rc;

/* ===================== Engines ===================== */

/// Engine with the stdlib installed
pub fn engine_with(max_frames: usize) -> Engine {
    let mut engine = Engine::new(EngineConfig {
        max_frames,
        keep_env: false,
    });
    stdlib::install(&mut engine);
    engine
}

pub fn engine() -> Engine {
    engine_with(EngineConfig::default().max_frames)
}

/// Mark tail calls in `statements` and run them as a script
pub fn run_on(engine: &mut Engine, statements: Vec<NodeRef>) -> Result<HostValue, RuntimeError> {
    let root = tail_calls::optimize(&block(statements));
    engine.process(&root)
}

pub fn run(statements: Vec<NodeRef>) -> Result<HostValue, RuntimeError> {
    run_on(&mut engine(), statements)
}

/// Run and expect success
pub fn run_ok(statements: Vec<NodeRef>) -> HostValue {
    match run(statements) {
        Ok(value) => value,
        Err(e) => panic!("script failed: {}", e),
    }
}

/* ===================== Nodes ===================== */

fn node(n: Node) -> NodeRef {
    Rc::new(n)
}

fn names(params: &[&str]) -> Rc<[Rc<str>]> {
    params.iter().map(|p| Rc::<str>::from(*p)).collect()
}

pub fn block(body: Vec<NodeRef>) -> NodeRef {
    node(Node::Block(Rc::new(Block::new(body))))
}

/// Block that opens its own scope
pub fn scoped(body: Vec<NodeRef>) -> NodeRef {
    node(Node::Block(Rc::new(Block::scoped(body))))
}

pub fn null() -> NodeRef {
    node(Node::Null)
}

pub fn boolean(v: bool) -> NodeRef {
    node(Node::Bool { v })
}

pub fn int(v: i64) -> NodeRef {
    node(Node::Int { v })
}

pub fn float(v: f64) -> NodeRef {
    node(Node::Float { v })
}

pub fn string(v: &str) -> NodeRef {
    node(Node::Str { v: Rc::from(v) })
}

pub fn ident(name: &str) -> NodeRef {
    node(Node::Ident {
        name: Rc::from(name),
    })
}

pub fn declare(name: &str) -> NodeRef {
    node(Node::Declare {
        name: Rc::from(name),
    })
}

pub fn assign(name: &str, value: NodeRef) -> NodeRef {
    node(Node::Assign {
        name: Rc::from(name),
        value,
    })
}

/// `let name = value`
pub fn let_(name: &str, value: NodeRef) -> NodeRef {
    node(Node::DeclareAssign {
        name: Rc::from(name),
        value,
    })
}

pub fn call(callee: NodeRef, args: Vec<NodeRef>) -> NodeRef {
    node(Node::Call {
        callee,
        args: args.into(),
        tail: false,
    })
}

pub fn call_named(name: &str, args: Vec<NodeRef>) -> NodeRef {
    call(ident(name), args)
}

pub fn slot_get(receiver: NodeRef, slot: &str) -> NodeRef {
    node(Node::SlotGet {
        receiver,
        slot: string(slot),
    })
}

pub fn slot_set(receiver: NodeRef, slot: &str, value: NodeRef) -> NodeRef {
    node(Node::SlotSet {
        receiver,
        slot: string(slot),
        value,
    })
}

pub fn slot_call(receiver: NodeRef, slot: &str, args: Vec<NodeRef>) -> NodeRef {
    node(Node::SlotCall {
        receiver,
        slot: string(slot),
        args: args.into(),
        tail: false,
    })
}

pub fn func(name: Option<&str>, params: &[&str], body: Vec<NodeRef>) -> NodeRef {
    node(Node::Function {
        name: name.map(Rc::<str>::from),
        params: names(params),
        body: block(body),
    })
}

pub fn closure(params: &[&str], body: Vec<NodeRef>) -> NodeRef {
    node(Node::Closure {
        params: names(params),
        body: block(body),
    })
}

pub fn ret(value: NodeRef) -> NodeRef {
    node(Node::Return {
        value: Some(value),
        tail: false,
    })
}

pub fn ret_bare() -> NodeRef {
    node(Node::Return {
        value: None,
        tail: false,
    })
}

pub fn new_(operand: NodeRef, args: Vec<NodeRef>) -> NodeRef {
    node(Node::New {
        operand,
        args: args.into(),
    })
}

pub fn this() -> NodeRef {
    node(Node::This)
}

pub fn super_() -> NodeRef {
    node(Node::Super)
}

pub fn object(entries: Vec<(&str, NodeRef)>) -> NodeRef {
    node(Node::ObjectLit {
        entries: entries
            .into_iter()
            .map(|(key, value)| Entry {
                key: string(key),
                value,
            })
            .collect(),
    })
}

/// Object literal with computed keys
pub fn object_computed(entries: Vec<(NodeRef, NodeRef)>) -> NodeRef {
    node(Node::ObjectLit {
        entries: entries
            .into_iter()
            .map(|(key, value)| Entry { key, value })
            .collect(),
    })
}

pub fn array(items: Vec<NodeRef>) -> NodeRef {
    node(Node::ArrayLit {
        items: items.into(),
    })
}

pub fn text(v: &str) -> Fragment {
    Fragment::Text { v: Rc::from(v) }
}

pub fn expr(node: NodeRef) -> Fragment {
    Fragment::Expr { node }
}

pub fn template(parts: Vec<Fragment>) -> NodeRef {
    node(Node::Template {
        parts: parts.into(),
    })
}

pub fn sql(parts: Vec<Fragment>) -> NodeRef {
    node(Node::Sql {
        parts: parts.into(),
        mode: SqlMode::Escaped,
    })
}

pub fn sql_verbatim(parts: Vec<Fragment>) -> NodeRef {
    node(Node::Sql {
        parts: parts.into(),
        mode: SqlMode::Verbatim,
    })
}
