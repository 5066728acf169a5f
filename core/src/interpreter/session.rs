//! Interactive sessions
//!
//! A session keeps one engine and one growing top-level block. Each batch of
//! statements is appended, annotated on its own, and executed in the
//! environment left by the previous batches.

use super::engine::stdlib;
use super::engine::{Block, Engine, HostValue, Node, NodeRef, RuntimeError};
use super::tail_calls;
use crate::config::EngineConfig;
use std::rc::Rc;
use tracing::debug;

pub struct Session {
    engine: Engine,
    program: Block,
}

impl Session {
    /// Session with the stdlib installed; `keep_env` is always on
    pub fn new(mut config: EngineConfig) -> Self {
        config.keep_env = true;
        let mut engine = Engine::new(config);
        stdlib::install(&mut engine);
        Session {
            engine,
            program: Block::new(Vec::new()),
        }
    }

    pub fn engine(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// All statements accepted so far
    pub fn program(&self) -> &Block {
        &self.program
    }

    /// Append `statements` and run just those
    ///
    /// On error the statements stay in the program; the environment keeps
    /// whatever they declared before failing.
    pub fn feed(&mut self, statements: Vec<NodeRef>) -> Result<HostValue, RuntimeError> {
        let from = self.program.body.len();
        self.program.body.extend(statements);
        tail_calls::optimize_appended(&mut self.program, from);
        debug!(from, total = self.program.body.len(), "running appended statements");

        let batch = Block::new(self.program.body[from..].to_vec());
        let root = Rc::new(Node::Block(Rc::new(batch)));
        self.engine.process(&root)
    }

    /// Re-execute every statement accepted so far in the kept environment
    pub fn rerun(&mut self) -> Result<HostValue, RuntimeError> {
        let root = Rc::new(Node::Block(Rc::new(self.program.clone())));
        self.engine.process(&root)
    }

    /// Run teardown hooks
    pub fn finish(mut self) {
        self.engine.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::engine::tests::helpers::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_declarations_survive_between_batches() {
        let mut session = Session::new(EngineConfig::default());
        session
            .feed(vec![let_("x", int(40))])
            .unwrap();
        let result = session
            .feed(vec![call_named("add", vec![ident("x"), int(2)])])
            .unwrap();
        assert_eq!(result, HostValue::Int(42));
        assert_eq!(session.program().body.len(), 2);
    }

    #[test]
    fn test_functions_defined_earlier_are_callable() {
        let mut session = Session::new(EngineConfig::default());
        session
            .feed(vec![func(
                Some("double"),
                &["n"],
                vec![ret(call_named("mul", vec![ident("n"), int(2)]))],
            )])
            .unwrap();
        let result = session
            .feed(vec![call_named("double", vec![int(21)])])
            .unwrap();
        assert_eq!(result, HostValue::Int(42));
    }

    #[test]
    fn test_failed_batch_keeps_session_usable() {
        let mut session = Session::new(EngineConfig::default());
        session.feed(vec![let_("x", int(1))]).unwrap();
        assert!(session.feed(vec![ident("missing")]).is_err());

        let result = session.feed(vec![ident("x")]).unwrap();
        assert_eq!(result, HostValue::Int(1));
    }

    #[test]
    fn test_rerun_replays_program() {
        let mut session = Session::new(EngineConfig::default());
        session.feed(vec![let_("n", int(1))]).unwrap();
        session
            .feed(vec![assign("n", call_named("add", vec![ident("n"), int(1)]))])
            .unwrap();

        // n = 1; n = n + 1 replayed from the start
        let result = session.rerun().unwrap();
        assert_eq!(result, HostValue::Int(2));
    }
}
