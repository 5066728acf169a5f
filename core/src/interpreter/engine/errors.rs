//! Engine error types

use super::types::Control;
use thiserror::Error;

/// Error surfaced by `process`, `invoke` and the native interface
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("return from a closure whose defining activation has already exited")]
    NonLocalReturn,

    #[error("native `{name}` failed: {source}")]
    Native {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + 'static>,
    },

    #[error("continuation stack overflow ({capacity} frames)")]
    StackOverflow { capacity: usize },

    /// Internal unwind signal; never escapes `Engine::process`
    #[error("unhandled control signal: {0:?}")]
    Control(Control),
}

impl RuntimeError {
    /// Wrap a host failure raised by the native `name`
    pub fn native(name: &str, source: impl std::error::Error + 'static) -> Self {
        RuntimeError::Native {
            name: name.to_string(),
            source: Box::new(source),
        }
    }

    /// Native failure with a plain message
    pub fn raised(name: &str, message: impl Into<String>) -> Self {
        Self::native(name, ScriptError(message.into()))
    }

    pub fn is_control(&self) -> bool {
        matches!(self, RuntimeError::Control(_))
    }
}

/// Misuse of the machine by the script: never recovered internally
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("`{name}` expects {expected} argument(s), got {given}")]
    Arity {
        name: String,
        expected: usize,
        given: usize,
    },

    #[error("{kind} is neither function nor closure")]
    NotCallable { kind: &'static str },

    #[error("primitive `{0}` cannot be invoked from host code")]
    UnhandledPrimitive(&'static str),

    #[error("{0} outside of loop")]
    OutsideLoop(&'static str),

    #[error("unbound variable `{name}`")]
    Unbound { name: String },

    #[error("cannot set a slot on {kind}")]
    NotAssignable { kind: &'static str },

    #[error("parent cycle: an object cannot delegate to itself")]
    ParentCycle,

    #[error("cannot render {kind} as SQL")]
    SqlRender { kind: &'static str },

    #[error("stack invariant violated: {0}")]
    StackInvariant(&'static str),
}

/// Message-only failure raised by script code or the stdlib
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ScriptError(pub String);
