//! Call dispatch and native re-entry
//!
//! Every call funnels into [`Engine::dispatch`] once the callee and the
//! argument list are evaluated. Host code enters the same path through
//! [`Engine::trigger`] (schedule and return to the caller's loop) or
//! [`Engine::invoke`] (schedule and step until the call completes).

use super::env::Env;
use super::errors::{RuntimeError, StructuralError};
use super::objects;
use super::types::{
    Args, CallSite, Closure, ClosureHome, Completion, Control, Frame, FrameId, FrameKind,
    Function, NativeFn, NodeRef, PendingCall, PlainObject, Primitive, Value,
};
use super::vm::{Engine, Mode};
use std::rc::Rc;
use tracing::{debug, trace};

/// Slot `new` calls on the freshly allocated object
pub const INIT_SLOT: &str = "init";

impl Engine {
    /* ===================== Call frames ===================== */

    /// Callee of a plain call is evaluated: collect the arguments
    pub(crate) fn resume_call(
        &mut self,
        args: Rc<[NodeRef]>,
        tail: bool,
    ) -> Result<(), RuntimeError> {
        let callee = self.value.clone();
        let site = CallSite::plain(tail);
        self.begin_args(PendingCall::Call { callee, site }, args)
    }

    /// Slot key of a method call is evaluated: resolve it by delegation
    pub(crate) fn resume_slot_call(
        &mut self,
        receiver: Value,
        args: Rc<[NodeRef]>,
        tail: bool,
        super_call: bool,
    ) -> Result<(), RuntimeError> {
        let (callee, holder) =
            objects::lookup(&receiver, &self.value).unwrap_or((Value::Null, Value::Null));
        // `super.m()` runs m on the current object, not on the parent
        let context = if super_call {
            self.env.context()
        } else {
            receiver
        };
        let site = CallSite {
            context: Some(context),
            holder,
            tail,
        };
        self.begin_args(PendingCall::Call { callee, site }, args)
    }

    pub(crate) fn begin_args(
        &mut self,
        pending: PendingCall,
        nodes: Rc<[NodeRef]>,
    ) -> Result<(), RuntimeError> {
        if nodes.is_empty() {
            return self.finish_args(pending, Args::empty());
        }
        let id = self.reserve_frame()?;
        self.collect_args(id, pending, nodes, 0, Vec::new())
    }

    /// Evaluate argument `next`, or dispatch once all are collected
    pub(crate) fn collect_args(
        &mut self,
        id: FrameId,
        pending: PendingCall,
        nodes: Rc<[NodeRef]>,
        next: usize,
        values: Vec<Value>,
    ) -> Result<(), RuntimeError> {
        match nodes.get(next).cloned() {
            Some(node) => {
                self.repush(
                    id,
                    FrameKind::Args {
                        pending,
                        nodes,
                        next,
                        values,
                    },
                );
                self.mode = Mode::Eval(node);
                Ok(())
            }
            None => self.finish_args(pending, Args::new(values)),
        }
    }

    fn finish_args(&mut self, pending: PendingCall, args: Args) -> Result<(), RuntimeError> {
        match pending {
            PendingCall::Call { callee, site } => self.dispatch(callee, site, args),
            PendingCall::New { operand } => self.construct(operand, args),
        }
    }

    /* ===================== Dispatch ===================== */

    /// Dispatch on the callee kind
    pub(crate) fn dispatch(
        &mut self,
        callee: Value,
        site: CallSite,
        args: Args,
    ) -> Result<(), RuntimeError> {
        match callee {
            Value::Primitive(primitive) => self.apply_primitive(primitive, args),
            Value::NativeCall(native) => {
                let context = site.context.unwrap_or(Value::Null);
                self.call_native(&native, context, args)
            }
            Value::Function(func) => self.enter_function(&func, site, args),
            Value::Closure(closure) => self.enter_closure(&closure, site, args),
            other => Err(StructuralError::NotCallable { kind: other.kind() }.into()),
        }
    }

    /// Run a native synchronously
    ///
    /// This is the trigger boundary: `Terminated` means the native's callee
    /// already moved the stack to where execution continues.
    fn call_native(
        &mut self,
        native: &NativeFn,
        context: Value,
        args: Args,
    ) -> Result<(), RuntimeError> {
        trace!(native = native.name(), argc = args.len(), "native call");
        match native.call(self, context, args) {
            Ok(Completion::Value(value)) => {
                self.produce(value);
                Ok(())
            }
            Ok(Completion::Deferred) => Ok(()),
            Err(RuntimeError::Control(Control::Terminated)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn enter_function(
        &mut self,
        func: &Rc<Function>,
        site: CallSite,
        args: Args,
    ) -> Result<(), RuntimeError> {
        check_arity(func.display_name(), func.params.len(), &args)?;

        let defining = func.env().cloned().unwrap_or_else(|| self.globals().clone());
        let activation = defining.child();
        for (param, arg) in func.params.iter().zip(args.into_vec()) {
            activation.declare(param.clone(), arg);
        }
        activation.set_context(site.context.unwrap_or(Value::Null));
        activation.set_receiver(site.holder);

        let home = match self.frames.last() {
            // Tail call: the caller's activation is finished, reuse its frame
            Some(Frame {
                kind: FrameKind::FunctionReturn { .. },
                ..
            }) if site.tail => {
                let offset = self.frames.len() - 1;
                let frame = self.next_frame_id();
                self.frames[offset].id = frame;
                ClosureHome { offset, frame }
            }
            _ => {
                let saved_env = self.env.clone();
                let frame = self.push_frame(FrameKind::FunctionReturn { saved_env })?;
                ClosureHome {
                    offset: self.frames.len() - 1,
                    frame,
                }
            }
        };
        activation.set_closure_home(home);

        self.env = activation;
        self.mode = Mode::Eval(func.body.clone());
        Ok(())
    }

    fn enter_closure(
        &mut self,
        closure: &Rc<Closure>,
        site: CallSite,
        args: Args,
    ) -> Result<(), RuntimeError> {
        check_arity("closure", closure.params.len(), &args)?;

        let activation = closure.env.child();
        for (param, arg) in closure.params.iter().zip(args.into_vec()) {
            activation.declare(param.clone(), arg);
        }
        // Without an explicit context a closure keeps its lexical `this`
        if let Some(context) = site.context {
            activation.set_context(context);
            activation.set_receiver(site.holder);
        }
        activation.set_closure_home(closure.home);

        let saved_env = self.env.clone();
        self.push_frame(FrameKind::ClosureReturn {
            saved_env,
            home: closure.home,
        })?;
        self.env = activation;
        self.mode = Mode::Eval(closure.body.clone());
        Ok(())
    }

    fn apply_primitive(&mut self, primitive: Primitive, args: Args) -> Result<(), RuntimeError> {
        match primitive {
            Primitive::Identical | Primitive::NotIdentical => {
                args.expect_count(primitive.name(), 2)?;
                let same = args.get(0).is_identical(&args.get(1));
                self.produce(Value::Bool(same == (primitive == Primitive::Identical)));
            }
            Primitive::Loop => {
                args.expect_count(primitive.name(), 0)?;
                self.push_frame(FrameKind::LoopMarker)?;
                self.produce(Value::Null);
            }
            Primitive::LoopBreak => {
                args.expect_count(primitive.name(), 0)?;
                self.push_frame(FrameKind::LoopBreak)?;
                self.mode = Mode::Cont;
            }
            Primitive::LoopContinue => {
                args.expect_count(primitive.name(), 0)?;
                self.push_frame(FrameKind::LoopContinue)?;
                self.mode = Mode::Cont;
            }
            Primitive::Exit => {
                args.expect_between(primitive.name(), 0, 1)?;
                let value = match args.len() {
                    0 => self.value.clone(),
                    _ => args.get(0),
                };
                self.exit(value);
            }
        }
        Ok(())
    }

    /* ===================== New ===================== */

    /// Operand and arguments of `new` are evaluated
    fn construct(&mut self, operand: Value, args: Args) -> Result<(), RuntimeError> {
        if let Value::Native(native) = &operand {
            let object = native.construct(self, args)?;
            self.produce(object);
            return Ok(());
        }

        let object = Value::object(PlainObject::with_parent(operand.clone()));
        match objects::lookup(&operand, &Value::str(INIT_SLOT)) {
            Some((init, holder)) if !matches!(init, Value::Null) => {
                self.push_frame(FrameKind::NewResult {
                    object: object.clone(),
                })?;
                let site = CallSite {
                    context: Some(object),
                    holder,
                    tail: false,
                };
                self.dispatch(init, site, args)
            }
            _ => {
                self.produce(object);
                Ok(())
            }
        }
    }

    /* ===================== Native re-entry ===================== */

    /// Schedule a call and return to the evaluator loop
    ///
    /// A native that triggers must return [`Completion::Deferred`].
    pub fn trigger(
        &mut self,
        callee: &Value,
        context: Option<Value>,
        args: Args,
    ) -> Result<(), RuntimeError> {
        let site = CallSite {
            context,
            holder: Value::Null,
            tail: false,
        };
        self.dispatch(callee.clone(), site, args)
    }

    /// Call and step the evaluator until the call has completed
    ///
    /// Fails with `Control::Terminated` when a return, break or continue
    /// unwound past the frames that existed when this was called.
    pub fn invoke(
        &mut self,
        callee: &Value,
        context: Option<Value>,
        args: Args,
    ) -> Result<Value, RuntimeError> {
        let site = CallSite {
            context,
            holder: Value::Null,
            tail: false,
        };
        self.invoke_site(callee.clone(), site, args)
    }

    /// Resolve `key` on `receiver` by delegation and invoke it as a method
    pub fn invoke_method(
        &mut self,
        receiver: &Value,
        key: &Value,
        args: Args,
    ) -> Result<Value, RuntimeError> {
        let (callee, holder) =
            objects::lookup(receiver, key).unwrap_or((Value::Null, Value::Null));
        let site = CallSite {
            context: Some(receiver.clone()),
            holder,
            tail: false,
        };
        self.invoke_site(callee, site, args)
    }

    /// Invoke without disturbing the mode and current value of the caller
    ///
    /// For natives running cleanup code (e.g. a `finally` body) after the
    /// stack was already repositioned by an unwind.
    pub fn invoke_preserving(&mut self, callee: &Value, args: Args) -> Result<Value, RuntimeError> {
        let mode = self.mode.clone();
        let value = self.value.clone();
        let result = self.invoke(callee, None, args);
        if result.is_ok() {
            self.mode = mode;
            self.value = value;
        }
        result
    }

    fn invoke_site(
        &mut self,
        callee: Value,
        site: CallSite,
        args: Args,
    ) -> Result<Value, RuntimeError> {
        if let Value::Primitive(primitive) = &callee {
            if matches!(
                primitive,
                Primitive::Loop | Primitive::LoopBreak | Primitive::LoopContinue
            ) {
                return Err(StructuralError::UnhandledPrimitive(primitive.name()).into());
            }
        }
        // An idle engine (between runs, after exit or abort) can always be
        // re-entered
        if self.frames.is_empty() || (self.halted && self.frames.len() == 1) {
            self.reset_idle();
        }

        let base = self.frames.len();
        let env = self.env.clone();
        let boundary = self.push_frame(FrameKind::InvokeBoundary)?;
        // Frames above the boundary belong to this invocation
        let inside = base + 1;
        let mut outcome = self.dispatch(callee, site, args);
        loop {
            match outcome {
                Ok(()) => {}
                // The marker was inside this invocation; nothing outside owns it
                Err(RuntimeError::Control(signal)) if self.frames.len() >= inside => {
                    trace!(?signal, "control signal absorbed inside invocation");
                }
                Err(err) => return Err(self.discard_invocation(base, env, err)),
            }
            if self.halted || self.frames.len() <= inside {
                break;
            }
            outcome = self.step().map(|_| ());
        }

        match self.frames.last() {
            Some(frame) if !self.halted && frame.id == boundary => {
                self.frames.pop();
                Ok(self.value.clone())
            }
            _ => {
                debug!(base, depth = self.frames.len(), "invocation terminated early");
                Err(RuntimeError::Control(Control::Terminated))
            }
        }
    }

    /// Drop the boundary and every frame a failed invocation left above it
    ///
    /// The caller resumes as if the call had never been made, so a native
    /// can recover (e.g. run a `catch` body) on a consistent stack.
    fn discard_invocation(&mut self, base: usize, env: Env, err: RuntimeError) -> RuntimeError {
        if !err.is_control() && self.frames.len() > base {
            debug!(base, depth = self.frames.len(), error = %err, "discarding failed invocation");
            self.frames.truncate(base);
            self.env = env;
        }
        err
    }
}

fn check_arity(name: &str, expected: usize, args: &Args) -> Result<(), RuntimeError> {
    if args.len() != expected {
        return Err(StructuralError::Arity {
            name: name.to_string(),
            expected,
            given: args.len(),
        }
        .into());
    }
    Ok(())
}
