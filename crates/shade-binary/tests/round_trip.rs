//! End-to-end wire-format properties: round trips and hard limits.

use shade_binary::{decode, encode, DecodeError};
use shade_ir::*;
use shade_validate::{validate, Capabilities};

/// A module exercising most of the instruction set: module-scope
/// resources, a helper function, an entry point with an if, a counting
/// loop, and a switch.
fn kitchen_sink() -> Module {
    let mut module = Module::new();
    let root = module.root_block;
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let i32_ty = b.ty_i32();
    let bool_ty = b.ty_bool();
    let arr = b.ty_runtime_array(f32_ty);

    let data = b.var_with_binding(root, "data", AddressSpace::Storage, arr, Access::LOAD_STORE, 0, 0);

    // Helper: f(x) = sqrt(abs(x))
    let helper = b.function("smooth", Some(f32_ty));
    let x = b.param(helper, Some("x"), f32_ty, Default::default());
    let helper_body = b.body(helper);
    let magnitude = b.builtin_call(helper_body, BuiltinFn::Abs, vec![x], f32_ty);
    let root_val = b.builtin_call(helper_body, BuiltinFn::Sqrt, vec![magnitude], f32_ty);
    b.ret(helper_body, helper, Some(root_val));

    // Entry point.
    let main = b.compute_entry("main", [64, 1, 1]);
    let body = b.body(main);

    // if: pick a scale factor.
    let flag = b.bool_operand(true);
    let (if_inst, tb, fb, if_results) = b.if_(body, flag, &[f32_ty]);
    let big = b.f32_operand(2.0);
    b.exit_if(tb, if_inst, vec![big]);
    let small = b.f32_operand(0.5);
    b.exit_if(fb, if_inst, vec![small]);
    let scale = if_results[0];

    // loop: counting with a block parameter.
    let (loop_inst, loop_body, _) = b.loop_(body, &[]);
    let counter = b.block_param(loop_body, i32_ty);
    b.set_name(counter, "counter");
    let initializer = b.loop_initializer(loop_inst);
    let zero = b.i32_operand(0);
    b.next_iteration(initializer, loop_inst, vec![zero]);
    let continuing = b.loop_continuing(loop_inst);
    let one = b.i32_operand(1);
    let bumped = b.binary(continuing, BinaryOp::Add, counter, one, i32_ty);
    let limit = b.i32_operand(8);
    let done = b.binary(continuing, BinaryOp::GreaterEqual, bumped, limit, bool_ty);
    b.break_if(continuing, loop_inst, done, vec![bumped]);
    b.continue_(loop_body, loop_inst, vec![]);

    // switch on the counter... via a constant selector.
    let selector = b.i32_operand(1);
    let (switch_inst, _) = b.switch(body, selector, &[]);
    let case_one = b.const_i32(1);
    let case_a = b.switch_case(switch_inst, vec![CaseSelector::Value(case_one)]);
    b.exit_switch(case_a, switch_inst, vec![]);
    let case_b = b.switch_case(switch_inst, vec![CaseSelector::Default]);
    b.exit_switch(case_b, switch_inst, vec![]);

    // data[0] = smooth(data[0]) * scale
    let elem_ptr = b.ty_ptr(AddressSpace::Storage, f32_ty, Access::LOAD_STORE);
    let idx = b.u32_operand(0);
    let slot = b.access(body, data, vec![idx], elem_ptr);
    let value = b.load(body, slot, f32_ty);
    let smoothed = b.call(body, helper, vec![value]).expect("helper returns f32");
    let scaled = b.binary(body, BinaryOp::Multiply, smoothed, scale, f32_ty);
    b.store(body, slot, scaled);
    b.ret(body, main, None);

    module
}

#[test]
fn kitchen_sink_validates() {
    let module = kitchen_sink();
    validate(&module, Capabilities::NONE).unwrap();
}

#[test]
fn round_trip_validates_identically() {
    let module = kitchen_sink();
    validate(&module, Capabilities::NONE).unwrap();

    let bytes = encode(&module).unwrap();
    let decoded = decode(&bytes).unwrap();
    validate(&decoded, Capabilities::NONE).unwrap();
}

#[test]
fn round_trip_preserves_structure() {
    let module = kitchen_sink();
    let decoded = decode(&encode(&module).unwrap()).unwrap();

    assert_eq!(decoded.functions.len(), module.functions.len());
    assert_eq!(decoded.blocks.len(), module.blocks.len());
    assert_eq!(decoded.instructions.len(), module.instructions.len());
    assert_eq!(decoded.values.len(), module.values.len());
    assert_eq!(decoded.constants.len(), module.constants.len());
    assert_eq!(decoded.types.len(), module.types.len());

    // Function names and stages survive.
    let names: Vec<_> = decoded
        .functions
        .iter()
        .map(|(_, f)| (f.name.clone(), f.stage))
        .collect();
    let expected: Vec<_> = module
        .functions
        .iter()
        .map(|(_, f)| (f.name.clone(), f.stage))
        .collect();
    assert_eq!(names, expected);

    // Debug names survive.
    let decoded_names: Vec<_> = {
        let mut v: Vec<_> = decoded.names.values().cloned().collect();
        v.sort();
        v
    };
    let original_names: Vec<_> = {
        let mut v: Vec<_> = module.names.values().cloned().collect();
        v.sort();
        v
    };
    assert_eq!(decoded_names, original_names);
}

#[test]
fn re_encoding_reaches_a_fixed_point() {
    let module = kitchen_sink();
    let bytes = encode(&module).unwrap();
    let once = decode(&bytes).unwrap();
    let bytes_once = encode(&once).unwrap();
    let twice = decode(&bytes_once).unwrap();
    let bytes_twice = encode(&twice).unwrap();
    assert_eq!(bytes_once, bytes_twice);
}

#[test]
fn oversized_constant_array_fails_encode() {
    let mut module = Module::new();
    let root = module.root_block;
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let huge = b.ty_array(f32_ty, shade_binary::MAX_ARRAY_ELEMENTS + 1);
    b.var(root, "huge", AddressSpace::Private, huge, Access::LOAD_STORE);

    let err = encode(&module).unwrap_err();
    let text = format!("{err}");
    assert!(
        text.contains("exceeds the limit"),
        "expected a limit error, got: {text}"
    );
}

#[test]
fn oversized_splat_fails_encode() {
    let mut module = Module::new();
    let root = module.root_block;
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let count = shade_binary::MAX_SPLAT_COUNT + 1;
    let arr = b.ty_array(f32_ty, count);
    let one = b.const_f32(1.0);
    let fill = b.const_splat(arr, one, count).expect("store accepts this count");
    let init = b.constant(fill);
    b.var_init(root, "fill", AddressSpace::Private, arr, Access::LOAD_STORE, init);

    let err = encode(&module).unwrap_err();
    let text = format!("{err}");
    assert!(
        text.contains("splat repeat count"),
        "expected a splat limit error, got: {text}"
    );
}

#[test]
fn decode_rejects_out_of_bounds_operand() {
    use prost::Message;
    use shade_binary::proto;

    let module_proto = proto::ModuleProto {
        root_block: 1,
        blocks: vec![proto::BlockProto {
            params: vec![],
            instructions: vec![1],
        }],
        instructions: vec![proto::InstructionProto {
            kind: proto::inst_kind::PHONY,
            operands: vec![42], // no values table at all
            ..Default::default()
        }],
        ..Default::default()
    };
    let err = decode(&module_proto.encode_to_vec()).unwrap_err();
    assert!(matches!(err, DecodeError::BadIndex { what: "value", .. }));
}
