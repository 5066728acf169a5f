//! Script interpreter: the continuation machine, the tail-call pass that
//! prepares trees for it, and interactive sessions on top.

pub mod engine;
pub mod session;
pub mod tail_calls;

pub use engine::{Engine, HostValue, Node, NodeRef, RuntimeError, Value};
pub use session::Session;
pub use tail_calls::{optimize, optimize_appended};
