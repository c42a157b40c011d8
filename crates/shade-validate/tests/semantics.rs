//! Semantic checks: overloads, conversions, composites, calls, recursion.

use shade_ir::*;
use shade_validate::{validate, Capabilities};

fn expect_error_with(module: &Module, caps: Capabilities, needle: &str) {
    let err = validate(module, caps).expect_err("validation should fail");
    let text = format!("{err}");
    assert!(
        text.contains(needle),
        "expected error containing {needle:?}, got:\n{text}"
    );
}

fn expect_error(module: &Module, needle: &str) {
    expect_error_with(module, Capabilities::NONE, needle);
}

#[test]
fn binary_operand_mismatch_is_rejected() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let func = b.function("f", None);
    let body = b.body(func);

    let lhs = b.f32_operand(1.0);
    let rhs = b.i32_operand(1);
    let _ = b.binary(body, BinaryOp::Add, lhs, rhs, f32_ty);
    b.ret(body, func, None);

    expect_error(&module, "no overload of 'add'");
}

#[test]
fn declared_result_type_is_checked() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let i32_ty = b.ty_i32();
    let func = b.function("f", None);
    let body = b.body(func);

    let lhs = b.f32_operand(1.0);
    let rhs = b.f32_operand(2.0);
    // The front end claims i32 for an f32 + f32.
    let _ = b.binary(body, BinaryOp::Add, lhs, rhs, i32_ty);
    b.ret(body, func, None);

    expect_error(&module, "expected f32, found i32");
}

#[test]
fn swizzle_bounds() {
    // [0, 1, 3] on a vec4 is fine.
    let mut ok = Module::new();
    {
        let mut b = Builder::new(&mut ok);
        let vec4f = b.ty_vec(VectorSize::Quad, Scalar::F32);
        let vec3f = b.ty_vec(VectorSize::Tri, Scalar::F32);
        let func = b.function("f", Some(vec3f));
        let body = b.body(func);
        let v = b.param(func, Some("v"), vec4f, Default::default());
        let swizzled = b.swizzle(body, v, vec![0, 1, 3], vec3f);
        b.ret(body, func, Some(swizzled));
    }
    validate(&ok, Capabilities::NONE).unwrap();

    // The same pattern on a vec2 reads component 3 out of range.
    let mut bad = Module::new();
    {
        let mut b = Builder::new(&mut bad);
        let vec2f = b.ty_vec(VectorSize::Bi, Scalar::F32);
        let vec3f = b.ty_vec(VectorSize::Tri, Scalar::F32);
        let func = b.function("f", Some(vec3f));
        let body = b.body(func);
        let v = b.param(func, Some("v"), vec2f, Default::default());
        let swizzled = b.swizzle(body, v, vec![0, 1, 3], vec3f);
        b.ret(body, func, Some(swizzled));
    }
    expect_error(&bad, "invalid index value");
}

#[test]
fn convert_requires_matching_widths() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let vec2f = b.ty_vec(VectorSize::Bi, Scalar::F32);
    let vec3i = b.ty_vec(VectorSize::Tri, Scalar::I32);
    let func = b.function("f", None);
    let body = b.body(func);

    let v = b.param(func, Some("v"), vec2f, Default::default());
    let _ = b.convert(body, v, vec3i);
    b.ret(body, func, None);

    expect_error(&module, "no conversion from vec2<f32> to vec3<i32>");
}

#[test]
fn bitcast_table() {
    // f32 -> u32 reinterprets in place.
    let mut ok = Module::new();
    {
        let mut b = Builder::new(&mut ok);
        let f32_ty = b.ty_f32();
        let u32_ty = b.ty_u32();
        let func = b.function("f", Some(u32_ty));
        let body = b.body(func);
        let x = b.param(func, Some("x"), f32_ty, Default::default());
        let bits = b.bitcast(body, x, u32_ty);
        b.ret(body, func, Some(bits));
    }
    validate(&ok, Capabilities::NONE).unwrap();

    // vec4<f16> is 64 bits; f32 is not.
    let mut bad = Module::new();
    {
        let mut b = Builder::new(&mut bad);
        let vec4h = b.ty_vec(VectorSize::Quad, Scalar::F16);
        let f32_ty = b.ty_f32();
        let func = b.function("f", Some(f32_ty));
        let body = b.body(func);
        let x = b.param(func, Some("x"), vec4h, Default::default());
        let bits = b.bitcast(body, x, f32_ty);
        b.ret(body, func, Some(bits));
    }
    expect_error(&bad, "no bitcast from vec4<f16> to f32");
}

#[test]
fn zero_argument_construct_is_always_legal() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let vec4f = b.ty_vec(VectorSize::Quad, Scalar::F32);
    let mat2x2 = b.ty_mat(VectorSize::Bi, VectorSize::Bi, Scalar::F32);
    let arr = b.ty_array(f32_ty, 4);

    let func = b.function("zeros", None);
    let body = b.body(func);
    for ty in [f32_ty, vec4f, mat2x2, arr] {
        let _ = b.construct(body, ty, vec![]);
    }
    b.ret(body, func, None);

    validate(&module, Capabilities::NONE).unwrap();
}

#[test]
fn construct_component_mismatch_is_rejected() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let vec3f = b.ty_vec(VectorSize::Tri, Scalar::F32);
    let func = b.function("f", None);
    let body = b.body(func);

    // Two components cannot fill a vec3.
    let x = b.f32_operand(1.0);
    let y = b.f32_operand(2.0);
    let _ = b.construct(body, vec3f, vec![x, y]);
    b.ret(body, func, None);

    expect_error(&module, "cannot construct vec3<f32>");
}

#[test]
fn access_static_out_of_bounds_is_rejected() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let vec2f = b.ty_vec(VectorSize::Bi, Scalar::F32);
    let f32_ty = b.ty_f32();
    let func = b.function("f", Some(f32_ty));
    let body = b.body(func);

    let v = b.param(func, Some("v"), vec2f, Default::default());
    let idx = b.u32_operand(5);
    let elem = b.access(body, v, vec![idx], f32_ty);
    b.ret(body, func, Some(elem));

    expect_error(&module, "invalid index value 5");
}

#[test]
fn access_into_struct_member() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let vec3f = b.ty_vec(VectorSize::Tri, Scalar::F32);
    let light = b.ty_struct(
        "Light",
        vec![
            (Some("intensity".into()), f32_ty, Default::default()),
            (Some("direction".into()), vec3f, Default::default()),
        ],
    );

    let func = b.function("f", Some(vec3f));
    let body = b.body(func);
    let l = b.param(func, Some("l"), light, Default::default());
    let idx = b.u32_operand(1);
    let direction = b.access(body, l, vec![idx], vec3f);
    b.ret(body, func, Some(direction));

    validate(&module, Capabilities::NONE).unwrap();
}

#[test]
fn struct_access_requires_constant_index() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let u32_ty = b.ty_u32();
    let pair = b.ty_struct(
        "Pair",
        vec![
            (Some("a".into()), f32_ty, Default::default()),
            (Some("b".into()), f32_ty, Default::default()),
        ],
    );

    let func = b.function("f", Some(f32_ty));
    let body = b.body(func);
    let p = b.param(func, Some("p"), pair, Default::default());
    let i = b.param(func, Some("i"), u32_ty, Default::default());
    let elem = b.access(body, p, vec![i], f32_ty);
    b.ret(body, func, Some(elem));

    expect_error(&module, "struct members must be accessed with constant indices");
}

#[test]
fn store_through_read_only_view_is_rejected() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let func = b.function("f", None);
    let body = b.body(func);

    let tmp = b.var(body, "tmp", AddressSpace::Function, f32_ty, Access::LOAD);
    let one = b.f32_operand(1.0);
    b.store(body, tmp, one);
    b.ret(body, func, None);

    expect_error(&module, "store to a read-only memory view");
}

#[test]
fn recursion_ban() {
    // a -> b -> a is rejected.
    let mut cyclic = Module::new();
    {
        let mut b = Builder::new(&mut cyclic);
        let fa = b.function("a", None);
        let fb = b.function("b", None);
        let a_body = b.body(fa);
        b.call(a_body, fb, vec![]);
        b.ret(a_body, fa, None);
        let b_body = b.body(fb);
        b.call(b_body, fa, vec![]);
        b.ret(b_body, fb, None);
    }
    expect_error(&cyclic, "recursive function calls are not allowed");

    // a -> b -> c is fine.
    let mut chain = Module::new();
    {
        let mut b = Builder::new(&mut chain);
        let fa = b.function("a", None);
        let fb = b.function("b", None);
        let fc = b.function("c", None);
        let a_body = b.body(fa);
        b.call(a_body, fb, vec![]);
        b.ret(a_body, fa, None);
        let b_body = b.body(fb);
        b.call(b_body, fc, vec![]);
        b.ret(b_body, fb, None);
        let c_body = b.body(fc);
        b.ret(c_body, fc, None);
    }
    validate(&chain, Capabilities::NONE).unwrap();
}

#[test]
fn discard_requires_fragment_reachability() {
    // A fragment entry point may discard.
    let mut fragment = Module::new();
    {
        let mut b = Builder::new(&mut fragment);
        let func = b.fragment_entry("fs", None, Default::default());
        let body = b.body(func);
        b.discard(body);
    }
    validate(&fragment, Capabilities::NONE).unwrap();

    // A compute entry point reaching a discard through a helper may not.
    let mut compute = Module::new();
    {
        let mut b = Builder::new(&mut compute);
        let helper = b.function("helper", None);
        let helper_body = b.body(helper);
        b.discard(helper_body);

        let main = b.compute_entry("main", [1, 1, 1]);
        let main_body = b.body(main);
        b.call(main_body, helper, vec![]);
        b.ret(main_body, main, None);
    }
    expect_error_with(
        &compute,
        Capabilities::NONE,
        "discard is only valid in a fragment entry point",
    );
}

#[test]
fn entry_points_cannot_be_called() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let ep = b.compute_entry("kernel", [8, 8, 1]);
    let ep_body = b.body(ep);
    b.ret(ep_body, ep, None);

    let func = b.function("caller", None);
    let body = b.body(func);
    b.call(body, ep, vec![]);
    b.ret(body, func, None);

    expect_error(&module, "entry point 'kernel' cannot be called");
}

#[test]
fn call_argument_types_are_checked() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let callee = b.function("callee", None);
    let _x = b.param(callee, Some("x"), f32_ty, Default::default());
    let callee_body = b.body(callee);
    b.ret(callee_body, callee, None);

    let caller = b.function("caller", None);
    let body = b.body(caller);
    let wrong = b.i32_operand(1);
    b.call(body, callee, vec![wrong]);
    b.ret(body, caller, None);

    expect_error(&module, "call argument value mismatch");
}

#[test]
fn module_scope_lets_are_capability_gated() {
    let mut module = Module::new();
    let root = module.root_block;
    let mut b = Builder::new(&mut module);

    let one = b.f32_operand(1.0);
    b.let_(root, "answer", one);

    expect_error(&module, "module-scope-lets capability");
    validate(&module, Capabilities::ALLOW_MODULE_SCOPE_LETS).unwrap();
}

#[test]
fn overrides_are_capability_gated() {
    let mut module = Module::new();
    let root = module.root_block;
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let one = b.f32_operand(1.0);
    b.override_(root, "scale", f32_ty, Some(7), Some(one));

    expect_error(&module, "overrides capability");
    validate(&module, Capabilities::ALLOW_OVERRIDES).unwrap();
}

#[test]
fn phony_is_capability_gated() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let func = b.function("f", None);
    let body = b.body(func);
    let one = b.f32_operand(1.0);
    b.phony(body, one);
    b.ret(body, func, None);

    expect_error(&module, "phony-instructions capability");
    validate(&module, Capabilities::ALLOW_PHONY_INSTRUCTIONS).unwrap();
}

#[test]
fn small_integers_are_capability_gated() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);
    let _ = b.ty(TypeInner::Scalar(Scalar::I8));

    expect_error(&module, "8bit-integers capability");
    validate(&module, Capabilities::ALLOW_8BIT_INTEGERS).unwrap();
}

#[test]
fn return_type_is_checked() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let func = b.function("f", Some(f32_ty));
    let body = b.body(func);
    let wrong = b.i32_operand(1);
    b.ret(body, func, Some(wrong));

    expect_error(&module, "expected f32, found i32");
}
