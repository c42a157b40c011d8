//! Entry-point interface rules: builtins, locations, binding points.

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

fn builtin_attrs(builtin: BuiltinValue) -> IoAttributes {
    IoAttributes {
        builtin: Some(builtin),
        ..Default::default()
    }
}

fn location_attrs(location: u32) -> IoAttributes {
    IoAttributes {
        location: Some(location),
        ..Default::default()
    }
}

#[test]
fn position_as_fragment_input_is_valid() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let vec4f = b.ty_vec(VectorSize::Quad, Scalar::F32);
    let func = b.fragment_entry("fs", Some(vec4f), location_attrs(0));
    let body = b.body(func);
    let pos = b.param(func, Some("pos"), vec4f, builtin_attrs(BuiltinValue::Position));
    b.ret(body, func, Some(pos));

    validate(&module, Capabilities::NONE).unwrap();
}

#[test]
fn position_as_vertex_input_is_rejected() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let vec4f = b.ty_vec(VectorSize::Quad, Scalar::F32);
    let func = b.vertex_entry("vs", vec4f, builtin_attrs(BuiltinValue::Position));
    let body = b.body(func);
    // The output position is fine; the *input* position is not.
    let bad = b.param(func, Some("pos"), vec4f, builtin_attrs(BuiltinValue::Position));
    b.ret(body, func, Some(bad));

    expect_error(&module, "must be an output for a vertex entry point");
}

#[test]
fn sample_mask_outside_fragment_is_rejected() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let u32_ty = b.ty_u32();
    let func = b.compute_entry("cs", [64, 1, 1]);
    let body = b.body(func);
    let _mask = b.param(func, Some("mask"), u32_ty, builtin_attrs(BuiltinValue::SampleMask));
    b.ret(body, func, None);

    expect_error(&module, "only valid in a fragment entry point");
}

#[test]
fn front_facing_must_be_bool() {
    // bool front_facing on a fragment input is fine.
    let mut ok = Module::new();
    {
        let mut b = Builder::new(&mut ok);
        let bool_ty = b.ty_bool();
        let func = b.fragment_entry("fs", None, Default::default());
        let body = b.body(func);
        let _ff = b.param(func, Some("ff"), bool_ty, builtin_attrs(BuiltinValue::FrontFacing));
        b.ret(body, func, None);
    }
    validate(&ok, Capabilities::NONE).unwrap();

    // u32 front_facing is not.
    let mut bad = Module::new();
    {
        let mut b = Builder::new(&mut bad);
        let u32_ty = b.ty_u32();
        let func = b.fragment_entry("fs", None, Default::default());
        let body = b.body(func);
        let _ff = b.param(func, Some("ff"), u32_ty, builtin_attrs(BuiltinValue::FrontFacing));
        b.ret(body, func, None);
    }
    expect_error(&bad, "must be bool");
}

#[test]
fn storage_var_requires_binding_point() {
    let mut module = Module::new();
    let root = module.root_block;
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let arr = b.ty_runtime_array(f32_ty);
    b.var(root, "data", AddressSpace::Storage, arr, Access::LOAD);

    expect_error(&module, "missing a binding point");
}

#[test]
fn storage_var_with_binding_point_is_valid() {
    let mut module = Module::new();
    let root = module.root_block;
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let arr = b.ty_runtime_array(f32_ty);
    b.var_with_binding(root, "data", AddressSpace::Storage, arr, Access::LOAD, 0, 0);

    validate(&module, Capabilities::NONE).unwrap();
}

#[test]
fn private_var_must_not_have_binding_point() {
    let mut module = Module::new();
    let root = module.root_block;
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    b.var_with_binding(
        root,
        "scratch",
        AddressSpace::Private,
        f32_ty,
        Access::LOAD_STORE,
        0,
        0,
    );

    expect_error(&module, "must not have a binding point");
}

#[test]
fn duplicate_bindings_are_capability_gated() {
    let mut module = Module::new();
    let root = module.root_block;
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();
    let arr = b.ty_runtime_array(f32_ty);
    b.var_with_binding(root, "a", AddressSpace::Storage, arr, Access::LOAD, 0, 0);
    b.var_with_binding(root, "b", AddressSpace::Storage, arr, Access::LOAD, 0, 0);

    expect_error(&module, "reuses @group(0) @binding(0)");
    validate(&module, Capabilities::ALLOW_DUPLICATE_BINDINGS).unwrap();
}

#[test]
fn exactly_one_io_annotation_per_leaf() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let u32_ty = b.ty_u32();
    let vec4f = b.ty_vec(VectorSize::Quad, Scalar::F32);
    let func = b.vertex_entry("vs", vec4f, builtin_attrs(BuiltinValue::Position));
    let body = b.body(func);

    // Both a builtin and a location on one parameter.
    let mut attrs = builtin_attrs(BuiltinValue::VertexIndex);
    attrs.location = Some(0);
    let _vi = b.param(func, Some("vi"), u32_ty, attrs);

    let pos = b.construct(body, vec4f, vec![]);
    b.ret(body, func, Some(pos));

    expect_error(&module, "exactly one IO annotation");
}

#[test]
fn entry_point_struct_members_carry_the_annotations() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let vec4f = b.ty_vec(VectorSize::Quad, Scalar::F32);
    let f32_ty = b.ty_f32();
    let out = b.ty_struct(
        "VsOut",
        vec![
            (
                Some("position".into()),
                vec4f,
                builtin_attrs(BuiltinValue::Position),
            ),
            (Some("fade".into()), f32_ty, location_attrs(0)),
        ],
    );

    let func = b.vertex_entry("vs", out, Default::default());
    let body = b.body(func);
    let result = b.construct(body, out, vec![]);
    b.ret(body, func, Some(result));

    validate(&module, Capabilities::NONE).unwrap();
}

#[test]
fn struct_member_without_annotation_is_rejected() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let vec4f = b.ty_vec(VectorSize::Quad, Scalar::F32);
    let f32_ty = b.ty_f32();
    let out = b.ty_struct(
        "VsOut",
        vec![
            (
                Some("position".into()),
                vec4f,
                builtin_attrs(BuiltinValue::Position),
            ),
            // No annotation at all.
            (Some("fade".into()), f32_ty, Default::default()),
        ],
    );

    let func = b.vertex_entry("vs", out, Default::default());
    let body = b.body(func);
    let result = b.construct(body, out, vec![]);
    b.ret(body, func, Some(result));

    expect_error(&module, "exactly one IO annotation");
}

#[test]
fn vertex_entry_must_output_position() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let vec4f = b.ty_vec(VectorSize::Quad, Scalar::F32);
    let func = b.vertex_entry("vs", vec4f, location_attrs(0));
    let body = b.body(func);
    let result = b.construct(body, vec4f, vec![]);
    b.ret(body, func, Some(result));

    expect_error(&module, "must output @builtin(position)");
}

#[test]
fn compute_workgroup_size_must_be_nonzero() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let func = b.compute_entry("cs", [0, 1, 1]);
    let body = b.body(func);
    b.ret(body, func, None);

    expect_error(&module, "zero workgroup dimension");
}

#[test]
fn compute_builtins_accept_vec3_u32() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let vec3u = b.ty_vec(VectorSize::Tri, Scalar::U32);
    let u32_ty = b.ty_u32();
    let func = b.compute_entry("cs", [8, 8, 1]);
    let body = b.body(func);
    let _gid = b.param(
        func,
        Some("gid"),
        vec3u,
        builtin_attrs(BuiltinValue::GlobalInvocationId),
    );
    let _idx = b.param(
        func,
        Some("idx"),
        u32_ty,
        builtin_attrs(BuiltinValue::LocalInvocationIndex),
    );
    b.ret(body, func, None);

    validate(&module, Capabilities::NONE).unwrap();
}
