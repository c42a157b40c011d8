//! Control-flow nesting: exits, loops, switches, and their placement rules.

use shade_ir::*;
use shade_validate::{validate, Capabilities};

fn expect_error(module: &Module, needle: &str) {
    let err = validate(module, Capabilities::NONE).expect_err("validation should fail");
    let text = format!("{err}");
    assert!(
        text.contains(needle),
        "expected error containing {needle:?}, got:\n{text}"
    );
}

/// An `exit_loop` nested only inside `if`s within the loop body is legal:
/// exits step outward across enclosing ifs transparently.
#[test]
fn exit_loop_through_if_is_allowed() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let func = b.function("f", None);
    let body = b.body(func);

    let (loop_inst, loop_body, _) = b.loop_(body, &[]);
    let cond = b.bool_operand(true);
    let (if_inst, tb, fb, _) = b.if_(loop_body, cond, &[]);
    b.exit_loop(tb, loop_inst, vec![]);
    b.exit_if(fb, if_inst, vec![]);
    b.exit_loop(loop_body, loop_inst, vec![]);
    b.ret(body, func, None);

    validate(&module, Capabilities::NONE).unwrap();
}

/// An `exit_loop` inside a `switch` that is itself inside the loop body
/// must name the switch, not jump past it.
#[test]
fn exit_loop_through_switch_is_rejected() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let func = b.function("f", None);
    let body = b.body(func);

    let (loop_inst, loop_body, _) = b.loop_(body, &[]);
    let selector = b.i32_operand(0);
    let (switch_inst, _) = b.switch(loop_body, selector, &[]);
    let case = b.switch_case(switch_inst, vec![CaseSelector::Default]);
    b.exit_loop(case, loop_inst, vec![]);
    b.exit_loop(loop_body, loop_inst, vec![]);
    b.ret(body, func, None);

    expect_error(&module, "jumps over other control instructions");
}

#[test]
fn continue_is_only_valid_in_loop_body() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let func = b.function("f", None);
    let body = b.body(func);

    let (loop_inst, loop_body, _) = b.loop_(body, &[]);
    let continuing = b.loop_continuing(loop_inst);
    // `continue` from the continuing block is malformed.
    b.continue_(continuing, loop_inst, vec![]);
    b.continue_(loop_body, loop_inst, vec![]);
    b.ret(body, func, None);

    expect_error(&module, "continue is only allowed inside the loop body");
}

#[test]
fn next_iteration_only_in_initializer_or_continuing() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let func = b.function("f", None);
    let body = b.body(func);

    let (loop_inst, loop_body, _) = b.loop_(body, &[]);
    b.next_iteration(loop_body, loop_inst, vec![]);
    b.ret(body, func, None);

    expect_error(
        &module,
        "next_iteration is only allowed in a loop initializer or continuing block",
    );
}

#[test]
fn loop_with_initializer_and_params_validates() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let i32_ty = b.ty_i32();
    let func = b.function("count", None);
    let body = b.body(func);

    let (loop_inst, loop_body, _) = b.loop_(body, &[]);
    let counter = b.block_param(loop_body, i32_ty);
    b.set_name(counter, "counter");

    let initializer = b.loop_initializer(loop_inst);
    let zero = b.i32_operand(0);
    b.next_iteration(initializer, loop_inst, vec![zero]);

    let continuing = b.loop_continuing(loop_inst);
    let one = b.i32_operand(1);
    let next = b.binary(continuing, BinaryOp::Add, counter, one, i32_ty);
    let limit = b.i32_operand(10);
    let done_ty = b.ty_bool();
    let done = b.binary(continuing, BinaryOp::GreaterEqual, next, limit, done_ty);
    b.break_if(continuing, loop_inst, done, vec![next]);

    b.continue_(loop_body, loop_inst, vec![]);
    b.ret(body, func, None);

    validate(&module, Capabilities::NONE).unwrap();
}

#[test]
fn exit_loop_in_initializer_is_rejected() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let func = b.function("f", None);
    let body = b.body(func);

    let (loop_inst, loop_body, _) = b.loop_(body, &[]);
    let initializer = b.loop_initializer(loop_inst);
    b.exit_loop(initializer, loop_inst, vec![]);
    b.exit_loop(loop_body, loop_inst, vec![]);
    b.ret(body, func, None);

    expect_error(&module, "exit_loop is not allowed in a loop initializer");
}

#[test]
fn break_if_must_terminate_continuing() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let func = b.function("f", None);
    let body = b.body(func);

    let (loop_inst, loop_body, _) = b.loop_(body, &[]);
    // break_if straight in the loop body.
    let cond = b.bool_operand(false);
    b.break_if(loop_body, loop_inst, cond, vec![]);
    b.ret(body, func, None);

    expect_error(
        &module,
        "break_if must be the last instruction of its loop's continuing block",
    );
}

#[test]
fn if_results_flow_through_exit_args() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let func = b.function("pick", Some(f32_ty));
    let body = b.body(func);

    let cond = b.bool_operand(true);
    let (if_inst, tb, fb, results) = b.if_(body, cond, &[f32_ty]);
    let one = b.f32_operand(1.0);
    b.exit_if(tb, if_inst, vec![one]);
    let two = b.f32_operand(2.0);
    b.exit_if(fb, if_inst, vec![two]);
    b.ret(body, func, Some(results[0]));

    validate(&module, Capabilities::NONE).unwrap();
}

#[test]
fn exit_arg_count_mismatch_is_rejected() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let func = b.function("f", None);
    let body = b.body(func);

    let cond = b.bool_operand(true);
    let (if_inst, tb, fb, _results) = b.if_(body, cond, &[f32_ty]);
    // The true arm forgets to supply the if's result value.
    b.exit_if(tb, if_inst, vec![]);
    let two = b.f32_operand(2.0);
    b.exit_if(fb, if_inst, vec![two]);
    b.ret(body, func, None);

    expect_error(&module, "exit_if provides 0 value(s) but the target expects 1");
}

#[test]
fn switch_needs_exactly_one_default() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let func = b.function("f", None);
    let body = b.body(func);

    let selector = b.i32_operand(1);
    let (switch_inst, _) = b.switch(body, selector, &[]);
    let zero = b.const_i32(0);
    let case = b.switch_case(switch_inst, vec![CaseSelector::Value(zero)]);
    b.exit_switch(case, switch_inst, vec![]);
    b.ret(body, func, None);

    expect_error(&module, "switch must have exactly one default case, found 0");
}

#[test]
fn duplicate_switch_selectors_are_rejected() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let func = b.function("f", None);
    let body = b.body(func);

    let selector = b.i32_operand(1);
    let (switch_inst, _) = b.switch(body, selector, &[]);
    let three = b.const_i32(3);
    let case_a = b.switch_case(switch_inst, vec![CaseSelector::Value(three)]);
    b.exit_switch(case_a, switch_inst, vec![]);
    // Interning means the same literal is the same constant handle.
    let three_again = b.const_i32(3);
    let case_b = b.switch_case(
        switch_inst,
        vec![CaseSelector::Value(three_again), CaseSelector::Default],
    );
    b.exit_switch(case_b, switch_inst, vec![]);
    b.ret(body, func, None);

    expect_error(&module, "duplicate switch case selector");
}

/// The loop-continuing restriction is a deliberate approximation: values
/// defined directly in the body block after the loop's first `continue`
/// must not be used by the continuing block.
#[test]
fn continuing_cannot_use_values_defined_after_first_continue() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let func = b.function("f", None);
    let body = b.body(func);

    let (loop_inst, loop_body, _) = b.loop_(body, &[]);
    let continuing = b.loop_continuing(loop_inst);

    // An if whose true arm continues...
    let cond = b.bool_operand(true);
    let (if_inst, tb, fb, _) = b.if_(loop_body, cond, &[]);
    b.continue_(tb, loop_inst, vec![]);
    b.exit_if(fb, if_inst, vec![]);

    // ...then a value defined after that continue...
    let one = b.f32_operand(1.0);
    let late = b.binary(loop_body, BinaryOp::Add, one, one, f32_ty);
    b.set_name(late, "late");
    b.continue_(loop_body, loop_inst, vec![]);

    // ...used by the continuing block.
    let _use = b.binary(continuing, BinaryOp::Add, late, late, f32_ty);
    b.next_iteration(continuing, loop_inst, vec![]);
    b.ret(body, func, None);

    expect_error(&module, "created after the loop's first continue");
}

/// Values defined before the first continue stay usable in the continuing
/// block; the approximation only poisons later definitions.
#[test]
fn continuing_can_use_values_defined_before_first_continue() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let func = b.function("f", None);
    let body = b.body(func);

    let (loop_inst, loop_body, _) = b.loop_(body, &[]);
    let continuing = b.loop_continuing(loop_inst);

    let one = b.f32_operand(1.0);
    let early = b.binary(loop_body, BinaryOp::Add, one, one, f32_ty);
    b.continue_(loop_body, loop_inst, vec![]);

    let _use = b.binary(continuing, BinaryOp::Add, early, early, f32_ty);
    let cond = b.bool_operand(true);
    b.break_if(continuing, loop_inst, cond, vec![]);
    b.ret(body, func, None);

    validate(&module, Capabilities::NONE).unwrap();
}
