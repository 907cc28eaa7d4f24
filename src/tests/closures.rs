use super::support::*;
use crate::language::ast::BinaryOp;
use pretty_assertions::assert_eq;

#[test]
fn capture_is_a_snapshot_taken_at_creation() {
    let outputs = run_main(vec![
        assign("x", int(5)),
        assign("l", lambda(Vec::new(), vec![ret(var("x"))])),
        assign("x", int(99)),
        print_stmt(vec![call_expr("l", Vec::new())]),
    ]);
    assert_eq!(outputs, lines(&["5"]));
}

#[test]
fn capture_outlives_the_creating_scope() {
    let outputs = run_ok(vec![
        func(
            "make",
            Vec::new(),
            vec![
                assign("x", int(5)),
                ret(lambda(Vec::new(), vec![ret(var("x"))])),
            ],
        ),
        func(
            "main",
            Vec::new(),
            vec![
                assign("l", call_expr("make", Vec::new())),
                print_stmt(vec![call_expr("l", Vec::new())]),
            ],
        ),
    ]);
    assert_eq!(outputs, lines(&["5"]));
}

#[test]
fn capture_cells_persist_across_invocations() {
    let outputs = run_main(vec![
        assign("c", int(0)),
        assign(
            "inc",
            lambda(
                Vec::new(),
                vec![
                    assign("c", bin(BinaryOp::Add, var("c"), int(1))),
                    ret(var("c")),
                ],
            ),
        ),
        print_stmt(vec![call_expr("inc", Vec::new())]),
        print_stmt(vec![call_expr("inc", Vec::new())]),
        print_stmt(vec![var("c")]),
    ]);
    // the counter lives in the capture cell, the caller's c is untouched
    assert_eq!(outputs, lines(&["1", "2", "0"]));
}

#[test]
fn copied_lambda_shares_its_capture_cells() {
    let outputs = run_ok(vec![
        func(
            "apply",
            vec![param("f")],
            vec![ret(call_expr("f", Vec::new()))],
        ),
        func(
            "main",
            Vec::new(),
            vec![
                assign("c", int(0)),
                assign(
                    "inc",
                    lambda(
                        Vec::new(),
                        vec![
                            assign("c", bin(BinaryOp::Add, var("c"), int(1))),
                            ret(var("c")),
                        ],
                    ),
                ),
                call_stmt(call("apply", vec![var("inc")])),
                print_stmt(vec![call_expr("inc", Vec::new())]),
            ],
        ),
    ]);
    assert_eq!(outputs, lines(&["2"]));
}

#[test]
fn parameters_shadow_same_named_captures() {
    let outputs = run_main(vec![
        assign("x", int(1)),
        assign("l", lambda(vec![param("x")], vec![ret(var("x"))])),
        print_stmt(vec![call_expr("l", vec![int(42)])]),
    ]);
    assert_eq!(outputs, lines(&["42"]));
}

#[test]
fn lambda_with_reference_parameter_aliases_the_caller() {
    let outputs = run_main(vec![
        assign("a", int(1)),
        assign(
            "bump",
            lambda(
                vec![ref_param("n")],
                vec![assign("n", bin(BinaryOp::Add, var("n"), int(1)))],
            ),
        ),
        call_stmt(call("bump", vec![var("a")])),
        print_stmt(vec![var("a")]),
    ]);
    assert_eq!(outputs, lines(&["2"]));
}

#[test]
fn lambda_equality_requires_the_same_closure() {
    let outputs = run_main(vec![
        assign("a", lambda(Vec::new(), vec![ret(int(1))])),
        assign("b", var("a")),
        assign("c", lambda(Vec::new(), vec![ret(int(1))])),
        print_stmt(vec![bin(BinaryOp::Eq, var("a"), var("b"))]),
        print_stmt(vec![bin(BinaryOp::Eq, var("a"), var("c"))]),
    ]);
    assert_eq!(outputs, lines(&["true", "false"]));
}
