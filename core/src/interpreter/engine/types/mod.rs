//! Type definitions for the engine
//!
//! - AST nodes (Node, Block)
//! - Runtime values (Value and the object/callable types behind it)
//! - Control flow (Control, Frame, FrameKind)

pub mod ast;
pub mod control;
pub mod values;

pub use ast::{Block, Entry, Fragment, Node, NodeRef, SqlMode};
pub use control::{CallSite, ClosureHome, Control, Frame, FrameId, FrameKind, PendingCall};
pub use values::{
    Args, Closure, Completion, Function, NativeFn, NativeObject, ObjRef, PlainObject, Primitive,
    RawSql, SlotKey, Value,
};
