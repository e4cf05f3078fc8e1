mod common;

use vau_core::{Value, VauError};
use vau_eval::Interpreter;

// ============================================================
// Definitions & lookup
// ============================================================

eval_tests! {
    define_then_lookup: "(define x 5) x" => "5",
    define_returns_value: "(define x 5)" => "5",
    shadowing_in_child_frame: "(define x 1) ((vau () () (do (define x 2) x)))" => "2",
    shadowing_leaves_parent_alone: "(define x 1) ((vau () () (define x 2))) x" => "1",
    nearest_binding_wins: "(define x 1) ((vau () () (do (define x 2) ((vau () () x)))))" => "2",
    env_is_the_global_environment: "(define g 9) (eval (q g) env)" => "9",
}

// ============================================================
// Mutability
// ============================================================

eval_tests! {
    mutable_set: "(define-mutable y 1) (set! y 2) y" => "2",
    define_mutable_returns_unwrapped: "(define-mutable y 1)" => "1",
    set_returns_new_value: "(define-mutable y 1) (set! y 7)" => "7",
    set_visible_through_closure:
        "(define-mutable n 0)
         (define bump (vau () () (set! n (+ n 1))))
         (bump) (bump) n" => "2",
    set_from_inner_frame_reaches_outer_binding:
        "(define-mutable n 0) ((vau () () (set! n 5))) n" => "5",
}

eval_error_tests! {
    set_immutable: "(define z 1) (set! z 2)" => "not mutable",
    set_unbound: "(set! nowhere 2)" => "Unbound variable: nowhere",
}

#[test]
fn failed_set_keeps_old_value() {
    let interp = Interpreter::new();
    interp.eval_str("(define z 1)").unwrap();
    let err = interp.eval_str("(set! z 2)").unwrap_err();
    assert!(matches!(err.inner(), VauError::NotMutable(_)));
    assert_eq!(interp.eval_str("z").unwrap(), Value::integer(1));
}

// ============================================================
// Operatives
// ============================================================

eval_tests! {
    operand_is_unevaluated: "((vau (a) e a) 42)" => "42",
    operand_stays_a_form: "((vau (a) e a) (+ 1 2))" => "(+ 1 2)",
    eval_in_caller_env: "((vau (a) e (eval a e)) (+ 1 2))" => "3",
    variadic_gets_operand_list: "((vau args e args) 1 (x) \"s\")" => "(1 (x) \"s\")",
    variadic_with_no_operands: "((vau args e args))" => "()",
    nil_env_param_ignores_caller: "((vau (a) () a) 1)" => "1",
    closure_sees_defining_env:
        "(define make (vau (n) e (do (define k (eval n e)) (vau () () k))))
         ((make (+ 2 3)))" => "5",
    invoke_with_list: "(invoke + (cons 1 (cons 2 ())))" => "3",
    invoke_operative: "(invoke (vau args () args) (cons 1 (cons 2 ())))" => "(1 2)",
    do_returns_last: "(do 1 2 3)" => "3",
    empty_do: "(do)" => "()",
    quote: "(q (a b c))" => "(a b c)",
}

eval_error_tests! {
    arity_too_many: "((vau (a b) e a) 1 2 3)" => "expected 2, got 3",
    arity_too_few: "((vau (a b) e a) 1)" => "expected 2, got 1",
    not_an_operative: "(5 1)" => "Not an operative",
    eval_needs_environment: "(eval 1 2)" => "environment",
    invoke_needs_list: "(invoke + 5)" => "list",
    unbound_variable: "missing" => "Unbound variable: missing",
}

#[test]
fn arity_message_is_exact() {
    let err = common::eval_err("((vau (a b) e a) 1 2 3)");
    assert_eq!(
        err.message(),
        "wrong number of arguments: expected 2, got 3"
    );
}

#[test]
fn fixed_arity_accepts_matching_operands() {
    let interp = Interpreter::new();
    interp.eval_str("(define three (vau (a b c) e c))").unwrap();
    for _ in 0..3 {
        assert_eq!(interp.eval_str("(three 1 2 3)").unwrap(), Value::integer(3));
    }
}

// ============================================================
// Church booleans
// ============================================================

eval_tests! {
    true_selects_first: "(true (q yes) (q no))" => "yes",
    false_selects_second: "(false (q yes) (q no))" => "no",
    equal_numbers: "((= 1 1) (q yes) (q no))" => "yes",
    unequal_numbers: "((= 1 2) (q yes) (q no))" => "no",
    equal_lists: "(= (q (1 (2 \"x\"))) (q (1 (2 \"x\"))))" => "true",
    unequal_lists: "(= (q (1 2)) (q (1 3)))" => "false",
    equal_fractions: "(= 0.5 1/2)" => "true",
    nil_predicate: "(nil? ())" => "true",
    nil_predicate_on_pair: "(nil? (cons 1 ()))" => "false",
    booleans_print_by_name: "true" => "true",
    booleans_compare_by_tag: "(= (= 1 1) true)" => "true",
    branch_is_evaluated_lazily: "((= 1 1) 1 (first 42))" => "1",
}

// ============================================================
// Lists
// ============================================================

eval_tests! {
    first_of_cons: "(first (cons 1 ()))" => "1",
    rest_of_cons: "(rest (cons 1 (cons 2 ())))" => "(2)",
    dotted_pair: "(cons 1 2)" => "(1 . 2)",
    nested_list: "(cons (cons 1 ()) (cons 2 ()))" => "((1) 2)",
}

eval_error_tests! {
    first_of_number: "(first 42)" => "not a pair",
    rest_of_nil: "(rest ())" => "not a pair",
}

// ============================================================
// Numbers
// ============================================================

eval_tests! {
    add: "(+ 1 2 3)" => "6",
    subtract: "(- 10 3 2)" => "5",
    multiply: "(* 2 3 4)" => "24",
    divide_exact: "(/ 10 4)" => "2.5",
    one_third: "(/ 1 3)" => "0.(3)",
    one_sixth: "(/ 1 6)" => "0.1(6)",
    negative_repeating: "(/ -5 6)" => "-0.8(3)",
    single_argument_is_identity: "(- 5)" => "5",
    fraction_literal: "22/7" => "3.(142857)",
    repeating_literal: "(* 6 0.1(6))" => "1",
    nines_round_up: "-0.(9)" => "-1",
    big_integers: "(* 99999999999999999999 99999999999999999999)"
        => "9999999999999999999800000000000000000001",
    compare_less: "(<=> 1 2)" => "-1",
    compare_equal: "(<=> 1/2 0.5)" => "0",
    compare_greater: "(<=> 3 2)" => "1",
    numerator: "(numerator 0.75)" => "3",
    denominator: "(denominator 0.75)" => "4",
    remainder_truncates: "(remainder -7 2)" => "-1",
    remainder_positive: "(remainder 7 3)" => "1",
}

eval_error_tests! {
    divide_by_zero: "(/ 1 0)" => "division by zero",
    add_non_number: "(+ 1 \"a\")" => "number",
    add_nothing: "(+)" => "expected at least 1 argument, got 0",
}

// ============================================================
// Strings
// ============================================================

eval_tests! {
    string_prints_escaped: "\"a\\\"b\"" => "\"a\\\"b\"",
    string_to_list: "(string->list \"hi\")" => "(104 105)",
    list_to_string: "(list->string (string->list \"héllo\"))" => "\"héllo\"",
}

eval_error_tests! {
    surrogate_codepoint: "(list->string (cons 55296 ()))" => "surrogate",
    codepoint_too_large: "(list->string (cons 1114112 ()))" => "invalid Unicode codepoint",
}

// ============================================================
// Printing
// ============================================================

eval_tests! {
    nil_prints_as_empty_list: "()" => "()",
    operative_prints_its_parts: "(vau (x) e (eval x e))" => "(operative (x) e (eval x e))",
    operative_without_env_param: "(vau args () args)" => "(operative args () args)",
    builtin_prints_name: "+" => "#<builtin-operative:+>",
}

#[test]
fn write_and_display_print_to_output() {
    let interp = Interpreter::new();
    interp.ctx.capture_output();
    let v = interp.eval_str("(write \"a b\") (display \"a b\")").unwrap();
    assert_eq!(v, Value::string("a b"));
    assert_eq!(interp.ctx.take_output(), "\"a b\"a b");
}

#[test]
fn read_line_reaches_end_of_stream() {
    let interp = Interpreter::new();
    interp.ctx.script_input("first line\n");
    assert_eq!(
        interp.eval_str("(read-line)").unwrap(),
        Value::string("first line")
    );
    assert_eq!(interp.eval_str("(eof? (read-line))").unwrap().to_string(), "true");
}

// ============================================================
// try
// ============================================================

eval_tests! {
    try_without_error: "(try (+ 1 2) (vau (e) env 0))" => "3",
    try_handler_sees_error_tag: "(try (first 42) (vau (e) env (first (eval e env))))" => "error",
    try_handler_sees_message:
        "(try (first 42) (vau (e) env (first (rest (eval e env)))))" => "\"first: not a pair\"",
    try_handler_sees_context:
        "(try (first 42) (vau (e) env (first (rest (rest (eval e env))))))" => "\"(first 42)\"",
    try_finally_gets_result:
        "(try 1 (vau (e) env 0) (vau (r) env (+ 1 (eval r env))))" => "2",
    try_finally_gets_handler_result:
        "(try (first 42) (vau (e) env 10) (vau (r) env (+ 1 (eval r env))))" => "11",
    try_survives_shadowed_quote:
        "(define q 0) (try missing (vau (e) env (first (eval e env))))" => "error",
}

#[test]
fn errors_from_handlers_propagate() {
    let err = common::eval_err("(try (first 42) (vau (e) env (rest 1)))");
    assert_eq!(err.message(), "rest: not a pair");
}

// ============================================================
// Errors carry context
// ============================================================

#[test]
fn innermost_expression_is_reported() {
    let err = common::eval_err("(do 1 (+ 1 (first 42)))");
    assert_eq!(err.context(), Some("(first 42)"));
    assert!(err.to_string().contains("while evaluating: (first 42)"));
    let trace = err.stack_trace().expect("stack trace").to_string();
    assert!(trace.contains("(first 42)"));
}

#[test]
fn reader_errors_name_a_position() {
    let err = common::eval_err("(+ 1");
    assert!(matches!(err.inner(), VauError::Reader { .. }));
    let err = common::eval_err(")");
    assert!(err.to_string().contains("1:1"));
}

#[test]
fn interpreter_recovers_after_error() {
    let interp = Interpreter::new();
    assert!(interp.eval_str("(do (do (first 1)))").is_err());
    assert_eq!(interp.call_stack_depth(), 0);
    assert_eq!(interp.eval_str("(+ 1 1)").unwrap(), Value::integer(2));
}
