//! Core execution loop
//!
//! This module contains `step()` - the heart of the interpreter. Each step
//! either evaluates one node (EVAL) or resumes the top continuation frame with
//! the current value (CONT).
//!
//! ## Function Organization
//! 1. process() - Host entry point (start, run, convert the result)
//! 2. run_to_completion() - Top-level driver (calls step repeatedly)
//! 3. step() - One EVAL or CONT transition
//! 4. resume() - CONT dispatch on the top frame's kind

use super::errors::{RuntimeError, StructuralError};
use super::host::HostValue;
use super::types::{Control, FrameKind, NodeRef, Value};
use super::vm::{Engine, Mode, Step};
use tracing::{debug, trace};

/* ===================== Public API ===================== */

impl Engine {
    /// Run `root` from a fresh stack and convert the final value
    ///
    /// On error the engine is aborted, so the next `process` starts clean.
    pub fn process(&mut self, root: &NodeRef) -> Result<HostValue, RuntimeError> {
        debug!(keep_env = self.config().keep_env, "processing script");
        self.start(root);
        match self.run_to_completion() {
            Ok(value) => Ok(HostValue::from_value(&value)),
            Err(err) => {
                debug!(error = %err, "script failed");
                self.abort();
                Err(err)
            }
        }
    }

    /// Step until the bottom frame is popped or the engine halts
    ///
    /// This is the outermost loop driver: break/continue signals that reach it
    /// have already moved the stack, so they are absorbed here.
    pub fn run_to_completion(&mut self) -> Result<Value, RuntimeError> {
        loop {
            match self.step() {
                Ok(Step::Continue) => {}
                Ok(Step::Done) => break,
                Err(RuntimeError::Control(signal)) => {
                    trace!(?signal, "control signal absorbed at top level");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(self.value.clone())
    }

    /// Execute one step
    pub fn step(&mut self) -> Result<Step, RuntimeError> {
        if self.is_finished() {
            return Ok(Step::Done);
        }

        match std::mem::replace(&mut self.mode, Mode::Cont) {
            Mode::Eval(node) => self.eval(&node)?,
            Mode::Cont => self.resume()?,
        }

        Ok(if self.is_finished() {
            Step::Done
        } else {
            Step::Continue
        })
    }

    /* ===================== CONT ===================== */

    /// Pop the top frame and continue the work it recorded
    ///
    /// Frames that still have work left are put back with their identity.
    fn resume(&mut self) -> Result<(), RuntimeError> {
        let frame = self
            .frames
            .pop()
            .ok_or(StructuralError::StackInvariant("resume on an empty stack"))?;
        trace!(frame = frame.kind.name(), depth = self.frames.len(), "resume");

        let id = frame.id;
        match frame.kind {
            FrameKind::EndMarker => Ok(()),
            FrameKind::Block {
                block,
                next,
                saved_env,
            } => self.resume_block(id, block, next, saved_env),

            FrameKind::ObjectLit {
                entries,
                next,
                key,
                slots,
            } => self.resume_object_lit(id, entries, next, key, slots),
            FrameKind::ArrayLit {
                items,
                next,
                values,
            } => self.resume_array_lit(id, items, next, values),
            FrameKind::Interpolate {
                parts,
                next,
                text,
                sql,
            } => self.resume_interpolate(id, parts, next, text, sql),

            FrameKind::Assign { name } => self.env.set(&name, self.value.clone()),
            FrameKind::Declare { name } => {
                self.env.declare(name, self.value.clone());
                Ok(())
            }

            FrameKind::SlotGetReceiver { slot } => {
                let receiver = self.value.clone();
                self.push_and_eval(FrameKind::SlotGetSlot { receiver }, slot)
            }
            FrameKind::SlotGetSlot { receiver } => {
                let value = super::objects::get_slot(&receiver, &self.value);
                self.value = value;
                Ok(())
            }
            FrameKind::SlotSetReceiver { slot, value } => {
                let receiver = self.value.clone();
                self.push_and_eval(FrameKind::SlotSetSlot { receiver, value }, slot)
            }
            FrameKind::SlotSetSlot { receiver, value } => {
                let key = self.value.clone();
                self.push_and_eval(FrameKind::SlotSetValue { receiver, key }, value)
            }
            FrameKind::SlotSetValue { receiver, key } => {
                super::objects::set_slot(&receiver, key, self.value.clone())
            }
            FrameKind::SlotCallReceiver {
                slot,
                args,
                tail,
                super_call,
            } => {
                let receiver = self.value.clone();
                self.push_and_eval(
                    FrameKind::SlotCallSlot {
                        receiver,
                        args,
                        tail,
                        super_call,
                    },
                    slot,
                )
            }
            FrameKind::SlotCallSlot {
                receiver,
                args,
                tail,
                super_call,
            } => self.resume_slot_call(receiver, args, tail, super_call),

            FrameKind::Call { args, tail } => self.resume_call(args, tail),
            FrameKind::Args {
                pending,
                nodes,
                next,
                mut values,
            } => {
                values.push(self.value.clone());
                self.collect_args(id, pending, nodes, next + 1, values)
            }
            FrameKind::FunctionReturn { saved_env } | FrameKind::ClosureReturn { saved_env, .. } => {
                self.env = saved_env;
                Ok(())
            }
            FrameKind::Return => self.unwind_return(),

            FrameKind::LoopMarker | FrameKind::InvokeBoundary => Ok(()),
            FrameKind::LoopBreak => self.unwind_loop(Control::Break),
            FrameKind::LoopContinue => self.unwind_loop(Control::Continue),

            FrameKind::New { args } => {
                let operand = self.value.clone();
                self.begin_args(super::types::PendingCall::New { operand }, args)
            }
            FrameKind::NewResult { object } => {
                self.value = object;
                Ok(())
            }
        }
    }

    /// Push a continuation and evaluate `node` under it
    pub(crate) fn push_and_eval(
        &mut self,
        kind: FrameKind,
        node: NodeRef,
    ) -> Result<(), RuntimeError> {
        self.push_frame(kind)?;
        self.mode = Mode::Eval(node);
        Ok(())
    }
}
