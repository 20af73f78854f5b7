mod common;

use common::{diagnostics, new_lisp, printed, result_of, run_repl};
use liblisp::Tag;

#[test]
fn self_evaluating_atoms() {
    let mut l = new_lisp();
    assert_eq!(printed(&mut l, "5"), "5");
    assert_eq!(printed(&mut l, "\"hello\""), "\"hello\"");
    assert_eq!(printed(&mut l, "t"), "t");
    assert_eq!(printed(&mut l, "nil"), "()");
    assert!(diagnostics(&l).is_empty());
}

#[test]
fn empty_list_evaluates_to_nil() {
    let mut l = new_lisp();
    let v = common::eval_all(&mut l, "()");
    assert_eq!(v, l.nil());
}

#[test]
fn quote_returns_subexpression_unevaluated() {
    assert_eq!(result_of("(quote x)"), "x");
    assert_eq!(result_of("(quote (a b (1 2)))"), "(a b (1 2))");
    assert_eq!(result_of("(quote (undefined symbols here))"), "(undefined symbols here)");
}

#[test]
fn if_selects_by_nil_test() {
    assert_eq!(result_of("(if t 1 2)"), "1");
    assert_eq!(result_of("(if nil 1 2)"), "2");
    // Anything non-nil counts as true, including 0 and the empty string.
    assert_eq!(result_of("(if 0 1 2)"), "1");
    assert_eq!(result_of("(if \"\" 1 2)"), "1");
    assert_eq!(result_of("(if (= 2 3) (quote yes) (quote no))"), "no");
}

#[test]
fn begin_evaluates_left_to_right() {
    assert_eq!(result_of("(begin 1 2 3)"), "3");
    assert_eq!(result_of("(begin)"), "()");
    assert_eq!(result_of("(begin (define c 0) (set c 5) c)"), "5");
}

#[test]
fn define_binds_globally_and_returns_the_pair() {
    let mut l = new_lisp();
    assert_eq!(printed(&mut l, "(define x 3)"), "(x 3)");
    assert_eq!(printed(&mut l, "x"), "3");
}

#[test]
fn set_replaces_an_existing_binding() {
    let mut l = new_lisp();
    printed(&mut l, "(define x 1)");
    assert_eq!(printed(&mut l, "(set x 42)"), "42");
    assert_eq!(printed(&mut l, "x"), "42");
    assert!(diagnostics(&l).is_empty());
}

#[test]
fn set_on_unbound_symbol_diagnoses() {
    let mut l = new_lisp();
    assert_eq!(printed(&mut l, "(set y 1)"), "()");
    assert_eq!(diagnostics(&l).len(), 1);
}

#[test]
fn unbound_symbol_diagnoses_and_yields_nil() {
    let mut l = new_lisp();
    assert_eq!(printed(&mut l, "mystery"), "()");
    assert_eq!(diagnostics(&l).len(), 1);
}

#[test]
fn lambda_application() {
    assert_eq!(result_of("((lambda (x y) (+ x y)) 3 4)"), "7");
    assert_eq!(
        result_of("(define sq (lambda (x) (* x x))) (sq 7)"),
        "49"
    );
}

#[test]
fn lambda_prints_stylized() {
    assert_eq!(result_of("(lambda (x) x)"), "(lambda (x) x)");
}

#[test]
fn lexical_capture() {
    let src = "
        (define make-adder (lambda (n) (lambda (x) (+ x n))))
        (define add2 (make-adder 2))
        (define add10 (make-adder 10))
        (+ (add2 40) (add10 0))";
    assert_eq!(result_of(src), "52");
}

#[test]
fn captured_environment_is_not_leaked_between_calls() {
    // Each application builds a fresh frame on top of the capture.
    let src = "
        (define id (lambda (x) x))
        (id 1)
        (id 2)
        (id 3)";
    assert_eq!(result_of(src), "3");
}

#[test]
fn parameters_shadow_globals() {
    let src = "
        (define x 1)
        (define probe (lambda (x) x))
        (probe 99)";
    assert_eq!(result_of(src), "99");
    assert_eq!(result_of("(define x 1) ((lambda (x) x) 2) x"), "1");
}

#[test]
fn closures_can_mutate_through_set() {
    let src = "
        (define c 0)
        (define inc (lambda () (set c (+ c 1))))
        (inc)
        (inc)
        c";
    assert_eq!(result_of(src), "2");
}

#[test]
fn list_in_head_position_is_applied() {
    assert_eq!(
        result_of("((lambda (x y) (cons x y)) 1 (quote (2 3)))"),
        "(1 2 3)"
    );
}

#[test]
fn non_applicable_head_diagnoses() {
    for src in ["(1 2)", "(\"s\" 1)"] {
        let mut l = new_lisp();
        assert_eq!(printed(&mut l, src), "()");
        assert_eq!(diagnostics(&l).len(), 1, "evaluating {:?}", src);
    }
}

#[test]
fn special_form_arity_errors_diagnose_exactly_once() {
    for src in [
        "(if 1 2)",
        "(if 1 2 3 4)",
        "(quote)",
        "(quote 1 2)",
        "(set x)",
        "(define x)",
        "(lambda (x))",
    ] {
        let mut l = new_lisp();
        assert_eq!(printed(&mut l, src), "()", "evaluating {:?}", src);
        assert_eq!(diagnostics(&l).len(), 1, "evaluating {:?}", src);
    }
}

#[test]
fn lambda_rejects_non_symbol_parameters() {
    let mut l = new_lisp();
    assert_eq!(printed(&mut l, "(lambda (1 x) x)"), "()");
    assert_eq!(diagnostics(&l).len(), 1);

    let mut l = new_lisp();
    assert_eq!(printed(&mut l, "(lambda x x)"), "()");
    assert_eq!(diagnostics(&l).len(), 1);
}

#[test]
fn procedure_arity_mismatch_diagnoses() {
    let mut l = new_lisp();
    assert_eq!(printed(&mut l, "((lambda (x y) x) 1)"), "()");
    assert_eq!(diagnostics(&l).len(), 1);
}

#[test]
fn procedures_and_primitives_are_first_class_values() {
    let mut l = new_lisp();
    // A primitive in value position is a value like any other.
    let v = common::eval_all(&mut l, "car");
    assert_eq!(l.heap.tag(v), Tag::Prim);
    let v = common::eval_all(&mut l, "(define f (lambda () 1)) f");
    assert_eq!(l.heap.tag(v), Tag::Proc);
}

#[test]
fn diagnostic_lines_carry_source_location() {
    let mut l = new_lisp();
    printed(&mut l, "mystery");
    let diags = diagnostics(&l);
    assert_eq!(diags.len(), 1);
    assert!(diags[0].starts_with("(error \"unbound symbol\" \""));
    assert!(diags[0].ends_with(")"));
    assert!(diags[0].contains("eval.rs"));
}

#[test]
fn repl_scenarios() {
    let (out, log) = run_repl("(+ 1 2 3)");
    assert_eq!(out, "6\n");
    assert!(log.is_empty());

    let (out, _) = run_repl("(define sq (lambda (x) (* x x))) (sq 7)");
    assert_eq!(out.lines().last(), Some("49"));

    let (out, _) = run_repl("(if (= 2 3) (quote yes) (quote no))");
    assert_eq!(out, "no\n");

    let (out, _) = run_repl("(begin (define c 0) (set c 5) c)");
    assert_eq!(out, "5\n");

    let (out, _) = run_repl("((lambda (x y) (cons x y)) 1 (quote (2 3)))");
    assert_eq!(out, "(1 2 3)\n");

    let (out, _) = run_repl("(reverse (quote (a b c)))");
    assert_eq!(out, "(c b a)\n");
}

#[test]
fn repl_continues_after_recoverable_errors() {
    let (out, log) = run_repl("(/ 1 0) (+ 2 2)");
    assert_eq!(out, "()\n4\n");
    assert_eq!(log.lines().count(), 1);
}

#[test]
fn repl_skips_unmatched_close_paren() {
    let (out, log) = run_repl(") 42");
    assert_eq!(out, "42\n");
    assert_eq!(log.lines().count(), 1);
}

#[test]
fn interrupt_flag_stops_the_repl_between_expressions() {
    use std::sync::atomic::Ordering;

    let mut l = new_lisp();
    l.interrupt_flag().store(true, Ordering::Relaxed);
    l.set_input(liblisp::Stream::string_in("(+ 1 2)"));
    assert_eq!(l.repl().unwrap(), 0);
    assert_eq!(common::output_text(&l), "");
}

#[test]
fn end_tears_down_cleanly() {
    let mut l = new_lisp();
    printed(&mut l, "(define x (quote (1 2)))");
    l.end();
}

#[test]
fn registered_host_function_is_callable() {
    use liblisp::{CellId, Lisp, LispResult};

    fn primop_answer(l: &mut Lisp, _args: CellId) -> LispResult<CellId> {
        l.heap.new_int(42)
    }

    let mut l = new_lisp();
    l.register_function("answer", primop_answer).unwrap();
    assert_eq!(printed(&mut l, "(answer)"), "42");
}
