//! Tail-call marking
//!
//! A static pass run once over a parsed tree before it is executed. It sets
//! the `tail` flag on:
//! - `return <call>`: the return unwinds to its activation before the call is
//!   evaluated, so the call can replace the activation's return frame
//! - the final statement of a block in tail position, when it is a call
//!
//! Function and closure bodies start in tail position and nested blocks
//! inherit it. Top-level statements are never in tail position. Anything
//! inside the closures passed to `try` is left unmarked, because `try` still
//! has work to do (its `finally`) after they return.
//!
//! Flags are recomputed from scratch, so running the pass twice changes
//! nothing.

use super::engine::types::{Block, Entry, Fragment, Node, NodeRef};
use std::rc::Rc;

/// Callee name whose closure arguments are never tail positions
pub const TRY_CALLEE: &str = "try";

#[derive(Debug, Clone, Copy)]
struct Position {
    /// The node's value is the enclosing activation's result
    tail: bool,
    /// Inside a `try` argument
    guarded: bool,
}

impl Position {
    const TOP: Position = Position {
        tail: false,
        guarded: false,
    };

    fn operand(self) -> Position {
        Position {
            tail: false,
            ..self
        }
    }
}

/// Annotate a whole script
pub fn optimize(root: &NodeRef) -> NodeRef {
    annotate(root, Position::TOP)
}

/// Annotate only the statements appended to `block` from index `from` on
pub fn optimize_appended(block: &mut Block, from: usize) {
    for stmt in block.body.iter_mut().skip(from) {
        *stmt = annotate(stmt, Position::TOP);
    }
}

fn annotate(node: &NodeRef, pos: Position) -> NodeRef {
    let rebuilt = match &**node {
        Node::Block(block) => Node::Block(Rc::new(annotate_block(block, pos))),

        Node::Return { value, .. } => {
            let tail = !pos.guarded && value.as_deref().is_some_and(Node::is_call);
            Node::Return {
                value: value.as_ref().map(|v| {
                    annotate(
                        v,
                        Position {
                            tail,
                            guarded: pos.guarded,
                        },
                    )
                }),
                tail,
            }
        }
        Node::Call { callee, args, .. } => {
            let guard_args = pos.guarded || is_try(callee);
            Node::Call {
                callee: annotate(callee, pos.operand()),
                args: annotate_all(
                    args,
                    Position {
                        tail: false,
                        guarded: guard_args,
                    },
                ),
                tail: pos.tail && !pos.guarded,
            }
        }
        Node::SlotCall {
            receiver,
            slot,
            args,
            ..
        } => Node::SlotCall {
            receiver: annotate(receiver, pos.operand()),
            slot: annotate(slot, pos.operand()),
            args: annotate_all(args, pos.operand()),
            tail: pos.tail && !pos.guarded,
        },

        // Bodies are the start of a new activation
        Node::Function { name, params, body } => Node::Function {
            name: name.clone(),
            params: params.clone(),
            body: annotate(
                body,
                Position {
                    tail: true,
                    guarded: false,
                },
            ),
        },
        Node::Closure { params, body } => Node::Closure {
            params: params.clone(),
            body: annotate(
                body,
                Position {
                    tail: true,
                    guarded: pos.guarded,
                },
            ),
        },

        Node::Template { parts } => Node::Template {
            parts: annotate_fragments(parts, pos.operand()),
        },
        Node::Sql { parts, mode } => Node::Sql {
            parts: annotate_fragments(parts, pos.operand()),
            mode: *mode,
        },
        Node::ObjectLit { entries } => Node::ObjectLit {
            entries: entries
                .iter()
                .map(|entry| Entry {
                    key: annotate(&entry.key, pos.operand()),
                    value: annotate(&entry.value, pos.operand()),
                })
                .collect(),
        },
        Node::ArrayLit { items } => Node::ArrayLit {
            items: annotate_all(items, pos.operand()),
        },
        Node::Assign { name, value } => Node::Assign {
            name: name.clone(),
            value: annotate(value, pos.operand()),
        },
        Node::DeclareAssign { name, value } => Node::DeclareAssign {
            name: name.clone(),
            value: annotate(value, pos.operand()),
        },
        Node::SlotGet { receiver, slot } => Node::SlotGet {
            receiver: annotate(receiver, pos.operand()),
            slot: annotate(slot, pos.operand()),
        },
        Node::SlotSet {
            receiver,
            slot,
            value,
        } => Node::SlotSet {
            receiver: annotate(receiver, pos.operand()),
            slot: annotate(slot, pos.operand()),
            value: annotate(value, pos.operand()),
        },
        Node::New { operand, args } => Node::New {
            operand: annotate(operand, pos.operand()),
            args: annotate_all(args, pos.operand()),
        },

        Node::Null
        | Node::Bool { .. }
        | Node::Int { .. }
        | Node::Float { .. }
        | Node::Str { .. }
        | Node::Ident { .. }
        | Node::Declare { .. }
        | Node::This
        | Node::Super => return node.clone(),
    };
    Rc::new(rebuilt)
}

fn annotate_block(block: &Block, pos: Position) -> Block {
    let last = block.body.len().saturating_sub(1);
    let body = block
        .body
        .iter()
        .enumerate()
        .map(|(i, stmt)| {
            let tail = pos.tail && i == last;
            annotate(stmt, Position { tail, ..pos })
        })
        .collect();
    Block {
        body,
        scope: block.scope,
    }
}

fn annotate_all(nodes: &[NodeRef], pos: Position) -> Rc<[NodeRef]> {
    nodes.iter().map(|n| annotate(n, pos)).collect()
}

fn annotate_fragments(parts: &[Fragment], pos: Position) -> Rc<[Fragment]> {
    parts
        .iter()
        .map(|part| match part {
            Fragment::Text { v } => Fragment::Text { v: v.clone() },
            Fragment::Expr { node } => Fragment::Expr {
                node: annotate(node, pos),
            },
        })
        .collect()
}

fn is_try(callee: &NodeRef) -> bool {
    matches!(&**callee, Node::Ident { name } if &**name == TRY_CALLEE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::engine::tests::helpers::*;
    use pretty_assertions::assert_eq;

    fn body_of(node: &NodeRef) -> Vec<NodeRef> {
        match &**node {
            Node::Function { body, .. } | Node::Closure { body, .. } => body_of(body),
            Node::Block(block) => block.body.clone(),
            other => panic!("no body: {:?}", other),
        }
    }

    fn first_arg(node: &NodeRef, index: usize) -> NodeRef {
        match &**node {
            Node::Call { args, .. } => args[index].clone(),
            other => panic!("not a call: {:?}", other),
        }
    }

    #[test]
    fn test_return_call_is_marked() {
        // fun f(n) { return f(n) }
        let script = optimize(&block(vec![func(
            Some("f"),
            &["n"],
            vec![ret(call_named("f", vec![ident("n")]))],
        )]));

        let stmts = body_of(&body_of(&script)[0]);
        assert!(stmts[0].is_tail());
        let Node::Return { value: Some(call), .. } = &*stmts[0] else {
            panic!("expected return");
        };
        assert!(call.is_tail());
    }

    #[test]
    fn test_only_final_call_statement_is_marked() {
        // fun f() { g(); h() }
        let script = optimize(&block(vec![func(
            Some("f"),
            &[],
            vec![call_named("g", vec![]), call_named("h", vec![])],
        )]));

        let stmts = body_of(&body_of(&script)[0]);
        assert!(!stmts[0].is_tail());
        assert!(stmts[1].is_tail());
    }

    #[test]
    fn test_top_level_is_not_tail() {
        // g(); return h()
        let script = optimize(&block(vec![
            call_named("g", vec![]),
            ret(call_named("h", vec![])),
        ]));
        let stmts = body_of(&script);
        assert!(!stmts[0].is_tail());
        // returns are still eligible at top level
        assert!(stmts[1].is_tail());
    }

    #[test]
    fn test_nothing_inside_try_is_marked() {
        // fun f() { try({ return g() }, null, { h() }) }
        let script = optimize(&block(vec![func(
            Some("f"),
            &[],
            vec![call_named(
                "try",
                vec![
                    closure(&[], vec![ret(call_named("g", vec![]))]),
                    null(),
                    closure(&[], vec![call_named("h", vec![])]),
                ],
            )],
        )]));

        let try_call = body_of(&body_of(&script)[0])[0].clone();
        assert!(try_call.is_tail());
        let body = body_of(&first_arg(&try_call, 0));
        assert!(!body[0].is_tail());
        let finally = body_of(&first_arg(&try_call, 2));
        assert!(!finally[0].is_tail());
    }

    #[test]
    fn test_if_branches_keep_tail_position() {
        // fun f(n) { if(n, { return g() }) }
        let script = optimize(&block(vec![func(
            Some("f"),
            &["n"],
            vec![call_named(
                "if",
                vec![
                    ident("n"),
                    closure(&[], vec![ret(call_named("g", vec![]))]),
                ],
            )],
        )]));

        let if_call = body_of(&body_of(&script)[0])[0].clone();
        let branch = body_of(&first_arg(&if_call, 1));
        assert!(branch[0].is_tail());
    }

    #[test]
    fn test_pass_is_idempotent() {
        let script = block(vec![func(
            Some("f"),
            &["n"],
            vec![
                call_named("g", vec![]),
                ret(call_named("f", vec![ident("n")])),
            ],
        )]);
        let once = optimize(&script);
        let twice = optimize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_optimize_appended_leaves_earlier_statements() {
        let first = ret(call_named("g", vec![]));
        let mut program = Block::new(vec![first.clone()]);
        program.body.push(ret(call_named("h", vec![])));

        optimize_appended(&mut program, 1);
        assert!(Rc::ptr_eq(&program.body[0], &first));
        assert!(!program.body[0].is_tail());
        assert!(program.body[1].is_tail());
    }
}
