//! Engine state
//!
//! The engine holds all execution state:
//! - frames: the continuation stack, bottom frame is always the `EndMarker`
//! - mode: evaluate a node (EVAL) or resume the top frame (CONT)
//! - value: the current-value register
//! - env: the current lexical environment

use super::env::Env;
use super::errors::{RuntimeError, StructuralError};
use super::types::{
    Args, ClosureHome, Completion, Frame, FrameId, FrameKind, NativeFn, NodeRef, Primitive, Value,
};
use crate::config::EngineConfig;
use tracing::debug;

/* ===================== Engine ===================== */

/// Evaluator mode
#[derive(Debug, Clone)]
pub enum Mode {
    /// Evaluate the node
    Eval(NodeRef),
    /// Resume the top frame with the current value
    Cont,
}

/// Result of executing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue to next step
    Continue,
    /// Execution complete
    Done,
}

type TeardownHook = Box<dyn FnOnce(&mut Engine)>;

/// Continuation-passing abstract machine
///
/// Script recursion lives in `frames`, never on the host stack. Everything
/// the machine needs is owned here, so independent engines share nothing.
pub struct Engine {
    pub(crate) frames: Vec<Frame>,
    pub(crate) mode: Mode,
    pub(crate) value: Value,
    pub(crate) env: Env,
    pub(crate) halted: bool,

    /// Primitives and natives
    globals: Env,
    /// Top-level scope of the current script, a child of `globals`
    script: Env,
    root_frame: FrameId,
    next_frame: u64,
    config: EngineConfig,
    teardown: Vec<TeardownHook>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let globals = Env::root();
        for primitive in Primitive::ALL {
            globals.declare(primitive.name(), Value::Primitive(primitive));
        }

        // Closures created at top level return to the bottom frame, which
        // keeps this identity across runs.
        let root_frame = FrameId(0);
        globals.set_closure_home(ClosureHome {
            offset: 0,
            frame: root_frame,
        });

        let script = globals.child();
        Engine {
            frames: Vec::new(),
            mode: Mode::Cont,
            value: Value::Null,
            env: script.clone(),
            halted: false,
            globals,
            script,
            root_frame,
            next_frame: 1,
            config,
            teardown: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn globals(&self) -> &Env {
        &self.globals
    }

    /// Top-level scope of the current (or last) run
    pub fn script_env(&self) -> &Env {
        &self.script
    }

    /// Environment the evaluator is currently running in
    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn define_global(&mut self, name: &str, value: Value) {
        self.globals.declare(name, value);
    }

    pub fn define_native<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&mut Engine, Value, Args) -> Result<Completion, RuntimeError> + 'static,
    {
        self.define_global(name, Value::NativeCall(NativeFn::new(name, func)));
    }

    /* ===================== Registers ===================== */

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    /// Number of frames on the continuation stack
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn top_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Produce a value and switch to CONT
    pub(crate) fn produce(&mut self, value: Value) {
        self.value = value;
        self.mode = Mode::Cont;
    }

    /* ===================== Frame Management ===================== */

    pub(crate) fn next_frame_id(&mut self) -> FrameId {
        let id = FrameId(self.next_frame);
        self.next_frame += 1;
        id
    }

    pub(crate) fn ensure_capacity(&self) -> Result<(), RuntimeError> {
        if self.frames.len() >= self.config.max_frames {
            debug!(capacity = self.config.max_frames, "continuation stack full");
            return Err(RuntimeError::StackOverflow {
                capacity: self.config.max_frames,
            });
        }
        Ok(())
    }

    /// Push a new frame onto the continuation stack
    pub(crate) fn push_frame(&mut self, kind: FrameKind) -> Result<FrameId, RuntimeError> {
        self.ensure_capacity()?;
        let id = self.next_frame_id();
        self.frames.push(Frame { id, kind });
        Ok(id)
    }

    /// Put back a frame popped during this step, keeping its identity
    pub(crate) fn repush(&mut self, id: FrameId, kind: FrameKind) {
        self.frames.push(Frame { id, kind });
    }

    /// Push a loop marker for a native loop construct
    ///
    /// Returns the depth to hand back to [`Engine::pop_loop_marker`].
    pub fn push_loop_marker(&mut self) -> Result<usize, RuntimeError> {
        self.push_frame(FrameKind::LoopMarker)?;
        Ok(self.frames.len())
    }

    pub fn pop_loop_marker(&mut self, depth: usize) -> Result<(), RuntimeError> {
        match self.frames.last() {
            Some(Frame {
                kind: FrameKind::LoopMarker,
                ..
            }) if self.frames.len() == depth => {
                self.frames.pop();
                Ok(())
            }
            _ => Err(StructuralError::StackInvariant("loop marker is not on top").into()),
        }
    }

    /* ===================== Lifecycle ===================== */

    /// Position the engine at the start of `root`
    ///
    /// Unless `keep_env` is configured the top-level scope starts empty.
    pub fn start(&mut self, root: &NodeRef) {
        if !self.config.keep_env {
            self.script = self.globals.child();
        }
        self.frames.clear();
        self.frames.push(Frame {
            id: self.root_frame,
            kind: FrameKind::EndMarker,
        });
        self.env = self.script.clone();
        self.value = Value::Null;
        self.halted = false;
        self.mode = Mode::Eval(root.clone());
    }

    pub fn is_finished(&self) -> bool {
        self.halted || self.frames.is_empty()
    }

    /// Truncate the stack and halt
    pub fn abort(&mut self) {
        debug!(depth = self.frames.len(), "aborting");
        self.frames.truncate(1);
        self.halted = true;
        self.mode = Mode::Cont;
    }

    /// `exit`: keep only the bottom frame and halt with `value`
    pub(crate) fn exit(&mut self, value: Value) {
        debug!("exit requested");
        self.frames.truncate(1);
        self.value = value;
        self.halted = true;
        self.mode = Mode::Cont;
    }

    /// Drop what a finished, exited or aborted run left behind so the
    /// engine can be re-entered from the host
    pub(crate) fn reset_idle(&mut self) {
        self.frames.clear();
        self.halted = false;
        self.mode = Mode::Cont;
        self.env = self.script.clone();
    }

    /// Register a hook run by [`Engine::finish`]
    pub fn on_finish(&mut self, hook: impl FnOnce(&mut Engine) + 'static) {
        self.teardown.push(Box::new(hook));
    }

    /// Run teardown hooks in registration order
    pub fn finish(&mut self) {
        let hooks = std::mem::take(&mut self.teardown);
        debug!(hooks = hooks.len(), "running teardown hooks");
        for hook in hooks {
            hook(self);
        }
    }

    pub(crate) fn root_home(&self) -> ClosureHome {
        ClosureHome {
            offset: 0,
            frame: self.root_frame,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("depth", &self.frames.len())
            .field("mode", &self.mode)
            .field("value", &self.value)
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}

