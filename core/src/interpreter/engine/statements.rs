//! Block execution

use super::env::Env;
use super::errors::RuntimeError;
use super::types::{Block, FrameId, FrameKind, Value};
use super::vm::{Engine, Mode};
use std::rc::Rc;

impl Engine {
    /// Enter a block: open its scope if it has one and start the first statement
    pub(crate) fn enter_block(&mut self, block: &Rc<Block>) -> Result<(), RuntimeError> {
        if block.body.is_empty() {
            self.produce(Value::Null);
            return Ok(());
        }

        let id = self.reserve_frame()?;
        let saved_env = if block.scope {
            let outer = self.env.clone();
            self.env = outer.child();
            Some(outer)
        } else {
            None
        };
        self.resume_block(id, block.clone(), 0, saved_env)
    }

    /// Advance to statement `next`, or leave the block when it is exhausted
    ///
    /// A tail-marked final statement runs with the block frame already gone,
    /// unless the frame still has a scope to restore.
    pub(crate) fn resume_block(
        &mut self,
        id: FrameId,
        block: Rc<Block>,
        next: usize,
        saved_env: Option<Env>,
    ) -> Result<(), RuntimeError> {
        let Some(stmt) = block.body.get(next).cloned() else {
            if let Some(env) = saved_env {
                self.env = env;
            }
            return Ok(());
        };

        let last = next + 1 == block.body.len();
        if !(last && saved_env.is_none() && stmt.is_tail()) {
            self.repush(
                id,
                FrameKind::Block {
                    block,
                    next: next + 1,
                    saved_env,
                },
            );
        }
        self.mode = Mode::Eval(stmt);
        Ok(())
    }
}
