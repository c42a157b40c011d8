//! Integration test: build a vector-scale compute module programmatically
//! and verify the structure and text dump.

use shade_ir::*;

/// Build the IR for a compute shader that scales a storage buffer:
///
/// ```wgsl
/// @group(0) @binding(0) var<storage, read> input: array<f32>;
/// @group(0) @binding(1) var<storage, read_write> output: array<f32>;
///
/// @compute @workgroup_size(64)
/// fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
///     let i = gid.x;
///     output[i] = input[i] * 2.0;
/// }
/// ```
#[test]
fn build_vector_scale_module() {
    let mut module = Module::new();
    let root = module.root_block;
    let mut b = Builder::new(&mut module);

    // ---- Types ----
    let f32_ty = b.ty_f32();
    let arr_ty = b.ty_runtime_array(f32_ty);
    let vec3u_ty = b.ty_vec(VectorSize::Tri, Scalar::U32);
    let u32_ty = b.ty_u32();

    // Type interning: the same description returns the same handle.
    let f32_again = b.ty_f32();
    assert_eq!(f32_ty, f32_again, "f32 should be interned");

    // ---- Module-scope variables ----
    let input = b.var_with_binding(root, "input", AddressSpace::Storage, arr_ty, Access::LOAD, 0, 0);
    let output = b.var_with_binding(
        root,
        "output",
        AddressSpace::Storage,
        arr_ty,
        Access::LOAD_STORE,
        0,
        1,
    );

    // ---- Entry point ----
    let func = b.compute_entry("main", [64, 1, 1]);
    let body = b.body(func);
    let gid = b.param(
        func,
        Some("gid"),
        vec3u_ty,
        IoAttributes {
            builtin: Some(BuiltinValue::GlobalInvocationId),
            ..Default::default()
        },
    );

    let i = b.swizzle(body, gid, vec![0], u32_ty);
    b.set_name(i, "i");

    let src_ptr_ty = b.ty_ptr(AddressSpace::Storage, f32_ty, Access::LOAD);
    let src = b.access(body, input, vec![i], src_ptr_ty);
    let value = b.load(body, src, f32_ty);
    let two = b.f32_operand(2.0);
    let scaled = b.binary(body, BinaryOp::Multiply, value, two, f32_ty);

    let dst_ptr_ty = b.ty_ptr(AddressSpace::Storage, f32_ty, Access::LOAD_STORE);
    let dst = b.access(body, output, vec![i], dst_ptr_ty);
    b.store(body, dst, scaled);
    b.ret(body, func, None);

    // ---- Structure ----
    assert_eq!(module.functions.len(), 1);
    let (_, main) = module.entry_points().next().expect("one entry point");
    assert_eq!(main.stage, Some(Stage::Compute));
    assert_eq!(main.workgroup_size, Some([64, 1, 1]));
    assert_eq!(main.params.len(), 1);

    // Root block holds exactly the two vars.
    assert_eq!(module.blocks[root].insts.len(), 2);

    // Every block ends in a terminator.
    let body_record = &module.blocks[body];
    let last = *body_record.insts.last().unwrap();
    assert!(module.instructions[last].op.is_terminator());

    // Usage records: `i` is used by both accesses.
    assert_eq!(module.values[i].uses.len(), 2);

    // ---- Dump ----
    let dump = dump_module(&module);
    assert!(dump.contains("Types:"));
    assert!(dump.contains("@group(0) @binding(0)"));
    assert!(dump.contains("@compute @workgroup_size(64, 1, 1)"));
    assert!(dump.contains("fn main"));
    assert!(dump.contains("binary mul"));
    assert!(dump.contains("store"));
}

#[test]
fn dependency_order_callees_first() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let f32_ty = b.ty_f32();

    // helper is declared after main but called by it.
    let main = b.function("main", Some(f32_ty));
    let helper = b.function("helper", Some(f32_ty));

    let helper_body = b.body(helper);
    let one = b.f32_operand(1.0);
    b.ret(helper_body, helper, Some(one));

    let main_body = b.body(main);
    let result = b.call(main_body, helper, vec![]).expect("helper returns f32");
    b.ret(main_body, main, Some(result));

    let order = module.dependency_order();
    let helper_pos = order.iter().position(|&f| f == helper).unwrap();
    let main_pos = order.iter().position(|&f| f == main).unwrap();
    assert!(helper_pos < main_pos, "callee must precede caller");

    // Declaration order is unchanged.
    let declared: Vec<_> = module.functions.iter().map(|(h, _)| h).collect();
    assert_eq!(declared, vec![main, helper]);
}

#[test]
fn constants_shared_across_instructions() {
    let mut module = Module::new();
    let mut b = Builder::new(&mut module);

    let c0 = b.const_f32(1.5);
    let c1 = b.const_f32(1.5);
    assert_eq!(c0, c1, "equal literals intern to one constant");

    // Distinct wrapper values may share the interned data.
    let v0 = b.constant(c0);
    let v1 = b.constant(c1);
    assert_ne!(v0, v1);
    assert_eq!(module.values[v0].ty, module.values[v1].ty);
}
