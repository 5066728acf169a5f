//! Control signals and continuation frame types

use super::ast::{Block, Entry, Fragment, NodeRef, SqlMode};
use super::values::Value;
use crate::interpreter::engine::env::Env;
use std::rc::Rc;

/* ===================== Control Flow ===================== */

/// Internal unwind signal
///
/// Carried as `RuntimeError::Control`. The stack has already been unwound when
/// a signal is raised; catching it only tells the catcher that it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Break,
    Continue,
    /// A return, break or continue escaped past an `invoke` boundary
    Terminated,
}

/* ===================== Frames ===================== */

/// Frame identity, unique for the lifetime of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub(crate) u64);

/// Stack slot (and the identity of the frame in it) that a closure's
/// `return` unwinds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureHome {
    pub offset: usize,
    pub frame: FrameId,
}

/// Call-site information carried from callee resolution to dispatch
#[derive(Debug, Clone)]
pub struct CallSite {
    /// `this` for the activation; `None` keeps a closure's lexical `this`
    pub context: Option<Value>,
    /// Object the callee was resolved on, base for `super`
    pub holder: Value,
    pub tail: bool,
}

impl CallSite {
    pub fn plain(tail: bool) -> Self {
        CallSite {
            context: None,
            holder: Value::Null,
            tail,
        }
    }
}

/// Call waiting for its argument list
#[derive(Debug, Clone)]
pub enum PendingCall {
    Call { callee: Value, site: CallSite },
    New { operand: Value },
}

/// Frame kind - the work pending once the current sub-evaluation completes
#[derive(Debug, Clone)]
pub enum FrameKind {
    /// Bottom of the stack; popping it ends the run
    EndMarker,
    Block {
        block: Rc<Block>,
        next: usize,
        saved_env: Option<Env>,
    },

    ObjectLit {
        entries: Rc<[Entry]>,
        next: usize,
        key: Option<Value>,
        slots: Vec<(Value, Value)>,
    },
    ArrayLit {
        items: Rc<[NodeRef]>,
        next: usize,
        values: Vec<Value>,
    },
    Interpolate {
        parts: Rc<[Fragment]>,
        next: usize,
        text: String,
        sql: Option<SqlMode>,
    },

    Assign {
        name: Rc<str>,
    },
    Declare {
        name: Rc<str>,
    },

    SlotGetReceiver {
        slot: NodeRef,
    },
    SlotGetSlot {
        receiver: Value,
    },
    SlotSetReceiver {
        slot: NodeRef,
        value: NodeRef,
    },
    SlotSetSlot {
        receiver: Value,
        value: NodeRef,
    },
    SlotSetValue {
        receiver: Value,
        key: Value,
    },
    SlotCallReceiver {
        slot: NodeRef,
        args: Rc<[NodeRef]>,
        tail: bool,
        super_call: bool,
    },
    SlotCallSlot {
        receiver: Value,
        args: Rc<[NodeRef]>,
        tail: bool,
        super_call: bool,
    },

    Call {
        args: Rc<[NodeRef]>,
        tail: bool,
    },
    Args {
        pending: PendingCall,
        nodes: Rc<[NodeRef]>,
        next: usize,
        values: Vec<Value>,
    },
    FunctionReturn {
        saved_env: Env,
    },
    ClosureReturn {
        saved_env: Env,
        home: ClosureHome,
    },
    Return,

    LoopMarker,
    LoopBreak,
    LoopContinue,

    /// Bottom of a host or native `invoke`; anything unwinding past it
    /// has left the invocation
    InvokeBoundary,

    New {
        args: Rc<[NodeRef]>,
    },
    NewResult {
        object: Value,
    },
}

impl FrameKind {
    pub fn name(&self) -> &'static str {
        match self {
            FrameKind::EndMarker => "end",
            FrameKind::Block { .. } => "block",
            FrameKind::ObjectLit { .. } => "object-literal",
            FrameKind::ArrayLit { .. } => "array-literal",
            FrameKind::Interpolate { .. } => "interpolate",
            FrameKind::Assign { .. } => "assign",
            FrameKind::Declare { .. } => "declare",
            FrameKind::SlotGetReceiver { .. } => "slot-get-receiver",
            FrameKind::SlotGetSlot { .. } => "slot-get-slot",
            FrameKind::SlotSetReceiver { .. } => "slot-set-receiver",
            FrameKind::SlotSetSlot { .. } => "slot-set-slot",
            FrameKind::SlotSetValue { .. } => "slot-set-value",
            FrameKind::SlotCallReceiver { .. } => "slot-call-receiver",
            FrameKind::SlotCallSlot { .. } => "slot-call-slot",
            FrameKind::Call { .. } => "call",
            FrameKind::Args { .. } => "args",
            FrameKind::FunctionReturn { .. } => "function-return",
            FrameKind::ClosureReturn { .. } => "closure-return",
            FrameKind::Return => "return",
            FrameKind::LoopMarker => "loop-marker",
            FrameKind::LoopBreak => "loop-break",
            FrameKind::LoopContinue => "loop-continue",
            FrameKind::InvokeBoundary => "invoke-boundary",
            FrameKind::New { .. } => "new",
            FrameKind::NewResult { .. } => "new-result",
        }
    }
}

/// Continuation frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: FrameId,
    pub kind: FrameKind,
}
