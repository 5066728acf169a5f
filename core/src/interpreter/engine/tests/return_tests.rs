//! Tests for return: activations, closure homes and top level

use super::helpers::*;
use crate::interpreter::engine::errors::RuntimeError;
use crate::interpreter::engine::HostValue;
use pretty_assertions::assert_eq;

#[test]
fn test_top_level_return_ends_script() {
    // return 5; 6
    let result = run_ok(vec![ret(int(5)), int(6)]);
    assert_eq!(result, HostValue::Int(5));
}

#[test]
fn test_bare_return_keeps_current_value() {
    // 7; return; 8
    let result = run_ok(vec![int(7), ret_bare(), int(8)]);
    assert_eq!(result, HostValue::Int(7));
}

#[test]
fn test_return_skips_rest_of_function() {
    // let log = []; fun f() { push(log, 1); return 2; push(log, 3) }; [f(), len(log)]
    let result = run_ok(vec![
        let_("log", array(vec![])),
        func(
            Some("f"),
            &[],
            vec![
                call_named("push", vec![ident("log"), int(1)]),
                ret(int(2)),
                call_named("push", vec![ident("log"), int(3)]),
            ],
        ),
        array(vec![
            call_named("f", vec![]),
            call_named("len", vec![ident("log")]),
        ]),
    ]);
    assert_eq!(
        result,
        HostValue::List(vec![HostValue::Int(2), HostValue::Int(1)])
    );
}

#[test]
fn test_return_from_top_level_closure() {
    // if(true, { return 3 }); 4
    let result = run_ok(vec![
        call_named("if", vec![boolean(true), closure(&[], vec![ret(int(3))])]),
        int(4),
    ]);
    assert_eq!(result, HostValue::Int(3));
}

#[test]
fn test_closure_return_leaves_enclosing_function() {
    // fun first_big(xs) { each(xs, { |x| if(gt(x, 1), { return x }) }); return null }
    // first_big([1, 2, 3])
    let result = run_ok(vec![
        func(
            Some("first_big"),
            &["xs"],
            vec![
                call_named(
                    "each",
                    vec![
                        ident("xs"),
                        closure(
                            &["x"],
                            vec![call_named(
                                "if",
                                vec![
                                    call_named("gt", vec![ident("x"), int(1)]),
                                    closure(&[], vec![ret(ident("x"))]),
                                ],
                            )],
                        ),
                    ],
                ),
                ret(null()),
            ],
        ),
        call_named("first_big", vec![array(vec![int(1), int(2), int(3)])]),
    ]);
    assert_eq!(result, HostValue::Int(2));
}

#[test]
fn test_return_restores_caller_scope() {
    // let x = "outer"; fun f() { { let x = 2; return x } }; f(); x
    let result = run_ok(vec![
        let_("x", string("outer")),
        func(
            Some("f"),
            &[],
            vec![scoped(vec![let_("x", int(2)), ret(ident("x"))])],
        ),
        call_named("f", vec![]),
        ident("x"),
    ]);
    assert_eq!(result, HostValue::Str("outer".into()));
}

#[test]
fn test_non_local_return_is_an_error() {
    // fun make() { return { return 1 } }; let c = make(); c()
    let err = run(vec![
        func(
            Some("make"),
            &[],
            vec![ret(closure(&[], vec![ret(int(1))]))],
        ),
        let_("c", call_named("make", vec![])),
        call_named("c", vec![]),
    ])
    .unwrap_err();
    assert!(matches!(err, RuntimeError::NonLocalReturn));
}

#[test]
fn test_escaped_closure_without_return_is_fine() {
    // fun make() { return { |a| add(a, 1) } }; let c = make(); c(41)
    let result = run_ok(vec![
        func(
            Some("make"),
            &[],
            vec![ret(closure(
                &["a"],
                vec![call_named("add", vec![ident("a"), int(1)])],
            ))],
        ),
        let_("c", call_named("make", vec![])),
        call_named("c", vec![int(41)]),
    ]);
    assert_eq!(result, HostValue::Int(42));
}

#[test]
fn test_engine_is_reusable_after_an_error() {
    let mut engine = engine();
    assert!(run_on(&mut engine, vec![ident("missing")]).is_err());
    assert_eq!(engine.depth(), 1);

    let result = run_on(&mut engine, vec![int(1)]).unwrap();
    assert_eq!(result, HostValue::Int(1));
}
