//! Binary wire format for Shade IR modules.
//!
//! The format is a flat table of tables with dense integer
//! back-references: no pointers, no graph cycles, every cross-table
//! reference a bounds-checked `u32`. [`encode`] is a single forward pass
//! that memoizes every entity by identity; [`decode`] is the structural
//! inverse, and `decode(encode(m))` validates identically to `m`.

mod codes;
mod decode;
mod encode;
pub mod proto;

pub use decode::{decode, DecodeError};
pub use encode::{encode, EncodeError, MAX_ARRAY_ELEMENTS, MAX_SPLAT_COUNT};

#[cfg(test)]
mod tests {
    use super::*;
    use shade_ir::{Access, AddressSpace, BinaryOp, Builder, Module};

    fn vec_add_module() -> Module {
        let mut module = Module::new();
        let root = module.root_block;
        let mut b = Builder::new(&mut module);

        let f32_ty = b.ty_f32();
        let arr_ty = b.ty_runtime_array(f32_ty);
        let a = b.var_with_binding(root, "a", AddressSpace::Storage, arr_ty, Access::LOAD, 0, 0);
        let out = b.var_with_binding(
            root,
            "out",
            AddressSpace::Storage,
            arr_ty,
            Access::LOAD_STORE,
            0,
            1,
        );

        let func = b.compute_entry("main", [64, 1, 1]);
        let body = b.body(func);

        let elem_ptr = b.ty_ptr(AddressSpace::Storage, f32_ty, Access::LOAD);
        let idx = b.u32_operand(0);
        let src = b.access(body, a, vec![idx], elem_ptr);
        let value = b.load(body, src, f32_ty);
        let doubled = b.binary(body, BinaryOp::Add, value, value, f32_ty);
        let out_ptr = b.ty_ptr(AddressSpace::Storage, f32_ty, Access::LOAD_STORE);
        let idx2 = b.u32_operand(0);
        let dst = b.access(body, out, vec![idx2], out_ptr);
        b.store(body, dst, doubled);
        b.ret(body, func, None);

        module
    }

    #[test]
    fn round_trip_preserves_counts() {
        let module = vec_add_module();
        let bytes = encode(&module).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.functions.len(), module.functions.len());
        assert_eq!(decoded.blocks.len(), module.blocks.len());
        assert_eq!(decoded.instructions.len(), module.instructions.len());
        assert_eq!(decoded.values.len(), module.values.len());
        assert_eq!(decoded.constants.len(), module.constants.len());
    }

    #[test]
    fn round_trip_validates() {
        let module = vec_add_module();
        shade_validate::validate(&module, shade_validate::Capabilities::NONE).unwrap();

        let bytes = encode(&module).unwrap();
        let decoded = decode(&bytes).unwrap();
        shade_validate::validate(&decoded, shade_validate::Capabilities::NONE).unwrap();
    }

    #[test]
    fn encoding_is_deterministic() {
        let module = vec_add_module();
        let first = encode(&module).unwrap();
        let second = encode(&module).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode(&[0xFF; 64]).is_err());
    }

    #[test]
    fn decode_rejects_bad_root_block() {
        use prost::Message;
        let proto = crate::proto::ModuleProto {
            root_block: 7,
            blocks: vec![crate::proto::BlockProto::default()],
            ..Default::default()
        };
        let err = decode(&proto.encode_to_vec()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }
}
