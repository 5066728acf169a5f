//! Tests for literals, variables, scopes and interpolation

use super::helpers::*;
use crate::interpreter::engine::errors::{RuntimeError, StructuralError};
use crate::interpreter::engine::types::{NodeRef, Value};
use crate::interpreter::engine::HostValue;
use maplit::hashmap;
use pretty_assertions::assert_eq;
use std::collections::HashMap;

#[test]
fn test_scalar_literals() {
    assert_eq!(run_ok(vec![int(42)]), HostValue::Int(42));
    assert_eq!(run_ok(vec![float(2.5)]), HostValue::Float(2.5));
    assert_eq!(run_ok(vec![string("hi")]), HostValue::Str("hi".into()));
    assert_eq!(run_ok(vec![boolean(true)]), HostValue::Bool(true));
    assert_eq!(run_ok(vec![null()]), HostValue::Null);
}

#[test]
fn test_empty_script_is_null() {
    assert_eq!(run_ok(vec![]), HostValue::Null);
}

#[test]
fn test_array_literal() {
    // [1, "two", [3]]
    let result = run_ok(vec![array(vec![
        int(1),
        string("two"),
        array(vec![int(3)]),
    ])]);

    assert_eq!(
        result,
        HostValue::List(vec![
            HostValue::Int(1),
            HostValue::Str("two".into()),
            HostValue::List(vec![HostValue::Int(3)]),
        ])
    );
}

#[test]
fn test_objects_come_back_as_handles() {
    // { a: 1 }
    let result = run_ok(vec![object(vec![("a", int(1))])]);
    assert!(result.is_handle());
}

#[test]
fn test_object_literal_slots() {
    // let o = { a: 1, b: add(1, 1), a: 3 }
    let mut engine = engine();
    run_on(
        &mut engine,
        vec![let_(
            "o",
            object(vec![
                ("a", int(1)),
                ("b", call_named("add", vec![int(1), int(1)])),
                ("a", int(3)),
            ]),
        )],
    )
    .unwrap();

    let Value::Object(o) = engine.script_env().get("o").unwrap() else {
        panic!("expected an object");
    };
    let slots: HashMap<String, String> = o
        .borrow()
        .slots()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    // later duplicates overwrite earlier ones
    assert_eq!(
        slots,
        hashmap! {
            "a".to_string() => "3".to_string(),
            "b".to_string() => "2".to_string(),
        }
    );
}

#[test]
fn test_declare_then_assign() {
    // var x; x = add(2, 3); x
    let result = run_ok(vec![
        declare("x"),
        assign("x", call_named("add", vec![int(2), int(3)])),
        ident("x"),
    ]);
    assert_eq!(result, HostValue::Int(5));
}

#[test]
fn test_assign_to_undeclared_fails() {
    // y = 1
    let err = run(vec![assign("y", int(1))]).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Structural(StructuralError::Unbound { ref name }) if name == "y"
    ));
}

#[test]
fn test_scoped_block_shadows() {
    // let x = 1; { let x = 2 }; x
    let result = run_ok(vec![
        let_("x", int(1)),
        scoped(vec![let_("x", int(2))]),
        ident("x"),
    ]);
    assert_eq!(result, HostValue::Int(1));
}

#[test]
fn test_plain_block_shares_scope() {
    // let x = 1; { let x = 2 }; x   (block without its own scope)
    let result = run_ok(vec![
        let_("x", int(1)),
        block(vec![let_("x", int(2))]),
        ident("x"),
    ]);
    assert_eq!(result, HostValue::Int(2));
}

#[test]
fn test_assignment_reaches_outer_scope() {
    // let x = 1; { x = 2 }; x
    let result = run_ok(vec![
        let_("x", int(1)),
        scoped(vec![assign("x", int(2))]),
        ident("x"),
    ]);
    assert_eq!(result, HostValue::Int(2));
}

#[test]
fn test_object_literal_evaluates_left_to_right() {
    // let log = []
    // { [at(push(log, "k1"), -1)]: at(push(log, "v1"), -1),
    //   [at(push(log, "k2"), -1)]: at(push(log, "v2"), -1) }
    // log
    let logged = |tag: &str| {
        call_named(
            "at",
            vec![call_named("push", vec![ident("log"), string(tag)]), int(-1)],
        )
    };
    let result = run_ok(vec![
        let_("log", array(vec![])),
        object_computed(vec![
            (logged("k1"), logged("v1")),
            (logged("k2"), logged("v2")),
        ]),
        ident("log"),
    ]);

    assert_eq!(
        result,
        HostValue::List(vec![
            HostValue::Str("k1".into()),
            HostValue::Str("v1".into()),
            HostValue::Str("k2".into()),
            HostValue::Str("v2".into()),
        ])
    );
}

#[test]
fn test_template_interpolation() {
    // let n = "ann"; "hi ${n}, ${add(1, 2)}"
    let result = run_ok(vec![
        let_("n", string("ann")),
        template(vec![
            text("hi "),
            expr(ident("n")),
            text(", "),
            expr(call_named("add", vec![int(1), int(2)])),
        ]),
    ]);
    assert_eq!(result, HostValue::Str("hi ann, 3".into()));
}

#[test]
fn test_sql_escapes_values() {
    // let name = "O'Brien"
    // sql"SELECT * FROM people WHERE name = ${name} AND id IN (${[1, 2]})"
    let result = run_ok(vec![
        let_("name", string("O'Brien")),
        sql(vec![
            text("SELECT * FROM people WHERE name = "),
            expr(ident("name")),
            text(" AND id IN ("),
            expr(array(vec![int(1), int(2)])),
            text(")"),
        ]),
    ]);
    assert_eq!(
        result,
        HostValue::Str("SELECT * FROM people WHERE name = 'O''Brien' AND id IN (1, 2)".into())
    );
}

#[test]
fn test_sql_fragments_nest_unescaped() {
    // let cond = sql"id = ${3}"; sql"SELECT 1 WHERE ${cond}"
    let result = run_ok(vec![
        let_("cond", sql(vec![text("id = "), expr(int(3))])),
        sql(vec![text("SELECT 1 WHERE "), expr(ident("cond"))]),
    ]);
    assert_eq!(result, HostValue::Str("SELECT 1 WHERE id = 3".into()));
}

#[test]
fn test_verbatim_sql_splices_display_form() {
    // let table = "users"; sql!"SELECT * FROM ${table}"
    let result = run_ok(vec![
        let_("table", string("users")),
        sql_verbatim(vec![text("SELECT * FROM "), expr(ident("table"))]),
    ]);
    assert_eq!(result, HostValue::Str("SELECT * FROM users".into()));
}

#[test]
fn test_sql_rejects_objects() {
    // sql"SELECT ${{}}"
    let err = run(vec![sql(vec![text("SELECT "), expr(object(vec![]))])]).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Structural(StructuralError::SqlRender { kind: "object" })
    ));
}

#[test]
fn test_identity_and_equality() {
    // let a = {}
    // [is(a, a), is({}, {}), is(1, 1.0), eq(1, 1.0), isnt("x", "x")]
    let result = run_ok(vec![
        let_("a", object(vec![])),
        array(vec![
            call_named("is", vec![ident("a"), ident("a")]),
            call_named("is", vec![object(vec![]), object(vec![])]),
            call_named("is", vec![int(1), float(1.0)]),
            call_named("eq", vec![int(1), float(1.0)]),
            call_named("isnt", vec![string("x"), string("x")]),
        ]),
    ]);
    assert_eq!(
        result,
        HostValue::List(vec![
            HostValue::Bool(true),
            HostValue::Bool(false),
            HostValue::Bool(false),
            HostValue::Bool(true),
            HostValue::Bool(false),
        ])
    );
}

#[test]
fn test_script_from_json() {
    // let x = 2; mul(x, 21)
    let json = r#"[
        {"t": "DeclareAssign", "name": "x", "value": {"t": "Int", "v": 2}},
        {"t": "Call", "callee": {"t": "Ident", "name": "mul"},
         "args": [{"t": "Ident", "name": "x"}, {"t": "Int", "v": 21}]}
    ]"#;
    let statements: Vec<NodeRef> = serde_json::from_str(json).unwrap();
    assert_eq!(run_ok(statements), HostValue::Int(42));
}

#[test]
fn test_host_value_serializes_to_json() {
    // [1, "a", null]
    let result = run_ok(vec![array(vec![int(1), string("a"), null()])]);
    assert_eq!(serde_json::to_string(&result).unwrap(), r#"[1,"a",null]"#);
}
