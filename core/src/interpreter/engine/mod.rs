//! # Engine - Continuation-Passing Abstract Machine
//!
//! Interprets the node tree without using the host call stack.
//!
//! ## Core Principles
//!
//! 1. **Stack-driven execution**: pending work lives in `frames: Vec<Frame>`, no recursion
//! 2. **Two modes**: EVAL a node, or CONT the top frame with the current value
//! 3. **Explicit unwinding**: return scans for its activation, break/continue for a loop
//!    marker; loop constructs learn about it through `Control` signals
//! 4. **Re-entrant**: natives call back into scripts with `trigger` or `invoke`
//! 5. **Tail calls reuse frames**: marked calls replace the caller's return frame

pub mod calls;
pub mod control_flow;
pub mod env;
pub mod errors;
pub mod exec_loop;
pub mod expressions;
pub mod host;
pub mod objects;
pub mod statements;
pub mod stdlib;
pub mod types;
pub mod vm;

#[cfg(test)]
pub(crate) mod tests;

// Re-export commonly used items
pub use env::Env;
pub use errors::{RuntimeError, ScriptError, StructuralError};
pub use host::HostValue;
pub use types::{
    Args, Block, Completion, Control, Node, NodeRef, NativeObject, PlainObject, Primitive, Value,
};
pub use vm::{Engine, Mode, Step};
