//! Return and loop unwinding
//!
//! Both scan down the continuation stack from the top. A return truncates to
//! the activation it belongs to and lets CONT resume that frame; break and
//! continue truncate around the nearest loop marker and then raise a
//! [`Control`] signal for the native loop construct that owns the marker.

use super::errors::{RuntimeError, StructuralError};
use super::types::{ClosureHome, Control, FrameKind};
use super::vm::Engine;
use tracing::debug;

impl Engine {
    /// Truncate the stack so the frame a `return` resumes is on top
    ///
    /// - `FunctionReturn`: the returning activation itself
    /// - `ClosureReturn`: the closure's home, which must still hold the frame
    ///   recorded when the closure was created
    /// - `EndMarker`: a top-level return ends the script
    pub(crate) fn unwind_return(&mut self) -> Result<(), RuntimeError> {
        for index in (0..self.frames.len()).rev() {
            let target = match &self.frames[index].kind {
                FrameKind::FunctionReturn { .. } | FrameKind::EndMarker => index,
                FrameKind::ClosureReturn { home, .. } => self.validate_home(*home, index)?,
                _ => continue,
            };
            self.frames.truncate(target + 1);
            return Ok(());
        }
        Err(StructuralError::StackInvariant("return without an enclosing activation").into())
    }

    fn validate_home(&self, home: ClosureHome, below: usize) -> Result<usize, RuntimeError> {
        match self.frames.get(home.offset) {
            Some(frame) if home.offset < below && frame.id == home.frame => Ok(home.offset),
            _ => {
                debug!(offset = home.offset, "closure home is gone");
                Err(RuntimeError::NonLocalReturn)
            }
        }
    }

    /// Unwind to the nearest loop marker and raise `signal`
    ///
    /// The environment saved by the lowest discarded activation or scoped
    /// block is restored, so the loop construct resumes in its own scope.
    /// Break removes the marker; continue leaves it on top.
    pub(crate) fn unwind_loop(&mut self, signal: Control) -> Result<(), RuntimeError> {
        let mut restore = None;
        for index in (0..self.frames.len()).rev() {
            match &self.frames[index].kind {
                FrameKind::LoopMarker => {
                    if let Some(env) = restore {
                        self.env = env;
                    }
                    let keep = match signal {
                        Control::Break => index,
                        _ => index + 1,
                    };
                    self.frames.truncate(keep);
                    return Err(RuntimeError::Control(signal));
                }
                FrameKind::FunctionReturn { saved_env }
                | FrameKind::ClosureReturn { saved_env, .. }
                | FrameKind::Block {
                    saved_env: Some(saved_env),
                    ..
                } => restore = Some(saved_env.clone()),
                FrameKind::EndMarker => break,
                _ => {}
            }
        }

        let name = match signal {
            Control::Break => "break",
            _ => "continue",
        };
        Err(StructuralError::OutsideLoop(name).into())
    }
}
