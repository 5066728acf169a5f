//! Abstract Syntax Tree node types
//!
//! The tree is built by an external parser (or deserialized from JSON), annotated
//! once by [`crate::interpreter::tail_calls`], and from then on shared immutably
//! through `Rc` by the engine frames and by function/closure values.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Shared handle to an immutable node
pub type NodeRef = Rc<Node>;

/// Statement sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub body: Vec<NodeRef>,

    /// Whether entering the block opens a fresh lexical scope
    #[serde(default)]
    pub scope: bool,
}

impl Block {
    pub fn new(body: Vec<NodeRef>) -> Self {
        Self { body, scope: false }
    }

    pub fn scoped(body: Vec<NodeRef>) -> Self {
        Self { body, scope: true }
    }
}

/// One `key: value` entry of an object literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub key: NodeRef,
    pub value: NodeRef,
}

/// Piece of a string or SQL template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Fragment {
    Text { v: Rc<str> },
    Expr { node: NodeRef },
}

/// How interpolated values are spliced into SQL text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlMode {
    /// Values are rendered as quoted SQL literals
    #[default]
    Escaped,
    /// Values are spliced using their display form
    Verbatim,
}

/// Statement/expression node
///
/// There is no separate statement type: declarations and `return` are nodes
/// like any other and yield a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Node {
    Block(Rc<Block>),

    Null,
    Bool {
        v: bool,
    },
    Int {
        v: i64,
    },
    Float {
        v: f64,
    },
    Str {
        v: Rc<str>,
    },
    Template {
        parts: Rc<[Fragment]>,
    },
    Sql {
        parts: Rc<[Fragment]>,
        #[serde(default)]
        mode: SqlMode,
    },
    ObjectLit {
        entries: Rc<[Entry]>,
    },
    ArrayLit {
        items: Rc<[NodeRef]>,
    },

    Ident {
        name: Rc<str>,
    },
    Declare {
        name: Rc<str>,
    },
    Assign {
        name: Rc<str>,
        value: NodeRef,
    },
    DeclareAssign {
        name: Rc<str>,
        value: NodeRef,
    },

    SlotGet {
        receiver: NodeRef,
        slot: NodeRef,
    },
    SlotSet {
        receiver: NodeRef,
        slot: NodeRef,
        value: NodeRef,
    },
    SlotCall {
        receiver: NodeRef,
        slot: NodeRef,
        #[serde(default = "no_nodes")]
        args: Rc<[NodeRef]>,
        #[serde(default)]
        tail: bool,
    },
    Call {
        callee: NodeRef,
        #[serde(default = "no_nodes")]
        args: Rc<[NodeRef]>,
        #[serde(default)]
        tail: bool,
    },

    Function {
        #[serde(default)]
        name: Option<Rc<str>>,
        params: Rc<[Rc<str>]>,
        body: NodeRef,
    },
    Closure {
        params: Rc<[Rc<str>]>,
        body: NodeRef,
    },
    This,
    Super,
    New {
        operand: NodeRef,
        #[serde(default = "no_nodes")]
        args: Rc<[NodeRef]>,
    },
    Return {
        #[serde(default)]
        value: Option<NodeRef>,
        #[serde(default)]
        tail: bool,
    },
}

fn no_nodes() -> Rc<[NodeRef]> {
    Rc::from(Vec::new())
}

impl Node {
    /// Whether the tail-call pass marked this node as tail-eligible
    pub fn is_tail(&self) -> bool {
        match self {
            Node::Call { tail, .. } | Node::SlotCall { tail, .. } | Node::Return { tail, .. } => {
                *tail
            }
            _ => false,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Node::Call { .. } | Node::SlotCall { .. })
    }
}
