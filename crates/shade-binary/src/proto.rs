//! Wire-format message types via prost derive.
//!
//! Hand-defined messages with explicit field tags. The schema is a flat
//! table of tables: every cross-table reference is a `u32` index, 1-based
//! so that `0` always means "absent". Instruction records carry a
//! discriminant tag, kind-specific payload fields, and flat operand/result
//! index lists mirroring the in-memory model exactly.

use prost::Message;

/// Top-level module container.
#[derive(Clone, PartialEq, Message)]
pub struct ModuleProto {
    #[prost(message, repeated, tag = "1")]
    pub types: Vec<TypeProto>,
    #[prost(message, repeated, tag = "2")]
    pub constant_values: Vec<ConstantValueProto>,
    #[prost(message, repeated, tag = "3")]
    pub values: Vec<ValueProto>,
    #[prost(message, repeated, tag = "4")]
    pub blocks: Vec<BlockProto>,
    #[prost(message, repeated, tag = "5")]
    pub instructions: Vec<InstructionProto>,
    #[prost(message, repeated, tag = "6")]
    pub functions: Vec<FunctionProto>,
    /// 1-based index into `blocks`.
    #[prost(uint32, tag = "7")]
    pub root_block: u32,
    #[prost(message, repeated, tag = "8")]
    pub names: Vec<NameProto>,
}

/// One interned type.
#[derive(Clone, PartialEq, Message)]
pub struct TypeProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(
        oneof = "type_proto::Inner",
        tags = "2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12"
    )]
    pub inner: Option<type_proto::Inner>,
}

pub mod type_proto {
    /// The type discriminant and payload.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Inner {
        #[prost(message, tag = "2")]
        Scalar(super::ScalarTypeProto),
        #[prost(message, tag = "3")]
        Vector(super::VectorTypeProto),
        #[prost(message, tag = "4")]
        Matrix(super::MatrixTypeProto),
        #[prost(message, tag = "5")]
        Atomic(super::ScalarTypeProto),
        #[prost(message, tag = "6")]
        Array(super::ArrayTypeProto),
        #[prost(message, tag = "7")]
        Struct(super::StructTypeProto),
        #[prost(message, tag = "8")]
        Pointer(super::PointerTypeProto),
        #[prost(message, tag = "9")]
        Reference(super::PointerTypeProto),
        #[prost(message, tag = "10")]
        Sampler(super::SamplerTypeProto),
        #[prost(message, tag = "11")]
        Texture(super::TextureTypeProto),
        #[prost(message, tag = "12")]
        SubgroupMatrix(super::SubgroupMatrixTypeProto),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct ScalarTypeProto {
    #[prost(int32, tag = "1")]
    pub kind: i32,
    #[prost(uint32, tag = "2")]
    pub width: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct VectorTypeProto {
    #[prost(uint32, tag = "1")]
    pub size: u32,
    #[prost(int32, tag = "2")]
    pub kind: i32,
    #[prost(uint32, tag = "3")]
    pub width: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct MatrixTypeProto {
    #[prost(uint32, tag = "1")]
    pub columns: u32,
    #[prost(uint32, tag = "2")]
    pub rows: u32,
    #[prost(int32, tag = "3")]
    pub kind: i32,
    #[prost(uint32, tag = "4")]
    pub width: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct ArrayTypeProto {
    #[prost(uint32, tag = "1")]
    pub base: u32,
    #[prost(bool, tag = "2")]
    pub runtime_sized: bool,
    #[prost(uint32, tag = "3")]
    pub count: u32,
    #[prost(uint32, tag = "4")]
    pub stride: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct StructTypeProto {
    #[prost(message, repeated, tag = "1")]
    pub members: Vec<StructMemberProto>,
    #[prost(uint32, tag = "2")]
    pub span: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct StructMemberProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(uint32, tag = "2")]
    pub ty: u32,
    #[prost(uint32, tag = "3")]
    pub offset: u32,
    #[prost(message, optional, tag = "4")]
    pub attributes: Option<IoAttributesProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PointerTypeProto {
    #[prost(uint32, tag = "1")]
    pub base: u32,
    #[prost(int32, tag = "2")]
    pub space: i32,
    #[prost(uint32, tag = "3")]
    pub access: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct SamplerTypeProto {
    #[prost(bool, tag = "1")]
    pub comparison: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct TextureTypeProto {
    #[prost(int32, tag = "1")]
    pub dim: i32,
    #[prost(bool, tag = "2")]
    pub arrayed: bool,
    /// See [`texture_class`].
    #[prost(int32, tag = "3")]
    pub class: i32,
    #[prost(int32, tag = "4")]
    pub kind: i32,
    #[prost(uint32, tag = "5")]
    pub width: u32,
    #[prost(bool, tag = "6")]
    pub multisampled: bool,
    #[prost(int32, tag = "7")]
    pub format: i32,
    #[prost(uint32, tag = "8")]
    pub access: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct SubgroupMatrixTypeProto {
    #[prost(int32, tag = "1")]
    pub kind: i32,
    #[prost(int32, tag = "2")]
    pub scalar_kind: i32,
    #[prost(uint32, tag = "3")]
    pub width: u32,
    #[prost(uint32, tag = "4")]
    pub columns: u32,
    #[prost(uint32, tag = "5")]
    pub rows: u32,
}

/// One interned constant.
#[derive(Clone, PartialEq, Message)]
pub struct ConstantValueProto {
    #[prost(uint32, tag = "1")]
    pub ty: u32,
    #[prost(oneof = "constant_value_proto::Kind", tags = "2, 3, 4, 5, 6, 7, 8")]
    pub kind: Option<constant_value_proto::Kind>,
}

pub mod constant_value_proto {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(bool, tag = "2")]
        Bool(bool),
        #[prost(int32, tag = "3")]
        I32(i32),
        #[prost(uint32, tag = "4")]
        U32(u32),
        #[prost(float, tag = "5")]
        F32(f32),
        /// Raw f16 bit pattern.
        #[prost(uint32, tag = "6")]
        F16Bits(u32),
        #[prost(message, tag = "7")]
        Composite(super::CompositeProto),
        #[prost(message, tag = "8")]
        Splat(super::SplatProto),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct CompositeProto {
    #[prost(uint32, repeated, tag = "1")]
    pub elements: Vec<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SplatProto {
    #[prost(uint32, tag = "1")]
    pub value: u32,
    #[prost(uint32, tag = "2")]
    pub count: u32,
}

/// One value. Owner back-references mirror the in-memory model; the owner
/// side (instruction results, block params, function params) is the
/// authoritative list and the validator cross-checks both.
#[derive(Clone, PartialEq, Message)]
pub struct ValueProto {
    #[prost(uint32, tag = "1")]
    pub ty: u32,
    /// See [`value_kind`].
    #[prost(int32, tag = "2")]
    pub kind: i32,
    #[prost(uint32, tag = "3")]
    pub constant: u32,
    #[prost(uint32, tag = "4")]
    pub function: u32,
    #[prost(uint32, tag = "5")]
    pub instruction: u32,
    #[prost(uint32, tag = "6")]
    pub block: u32,
    #[prost(message, optional, tag = "7")]
    pub attributes: Option<IoAttributesProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct BindingPointProto {
    #[prost(uint32, tag = "1")]
    pub group: u32,
    #[prost(uint32, tag = "2")]
    pub binding: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct IoAttributesProto {
    #[prost(message, optional, tag = "1")]
    pub binding_point: Option<BindingPointProto>,
    #[prost(uint32, optional, tag = "2")]
    pub location: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub color: Option<u32>,
    #[prost(int32, optional, tag = "4")]
    pub builtin: Option<i32>,
    #[prost(int32, optional, tag = "5")]
    pub interpolation_type: Option<i32>,
    #[prost(int32, optional, tag = "6")]
    pub interpolation_sampling: Option<i32>,
    #[prost(bool, tag = "7")]
    pub invariant: bool,
    #[prost(uint32, optional, tag = "8")]
    pub input_attachment_index: Option<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct BlockProto {
    #[prost(uint32, repeated, tag = "1")]
    pub params: Vec<u32>,
    #[prost(uint32, repeated, tag = "2")]
    pub instructions: Vec<u32>,
}

/// One instruction: discriminant, payload fields, operand/result lists.
#[derive(Clone, PartialEq, Message)]
pub struct InstructionProto {
    /// See [`inst_kind`].
    #[prost(int32, tag = "1")]
    pub kind: i32,
    #[prost(uint32, repeated, tag = "2")]
    pub operands: Vec<u32>,
    #[prost(uint32, repeated, tag = "3")]
    pub results: Vec<u32>,
    #[prost(int32, tag = "4")]
    pub binary_op: i32,
    #[prost(int32, tag = "5")]
    pub unary_op: i32,
    #[prost(int32, tag = "6")]
    pub builtin: i32,
    /// Target control instruction for exit-class instructions.
    #[prost(uint32, tag = "7")]
    pub target: u32,
    #[prost(uint32, tag = "8")]
    pub true_block: u32,
    #[prost(uint32, tag = "9")]
    pub false_block: u32,
    #[prost(uint32, tag = "10")]
    pub initializer: u32,
    #[prost(uint32, tag = "11")]
    pub body: u32,
    #[prost(uint32, tag = "12")]
    pub continuing: u32,
    #[prost(message, repeated, tag = "13")]
    pub cases: Vec<SwitchCaseProto>,
    #[prost(uint32, tag = "14")]
    pub function: u32,
    #[prost(message, optional, tag = "15")]
    pub binding_point: Option<BindingPointProto>,
    #[prost(uint32, optional, tag = "16")]
    pub input_attachment_index: Option<u32>,
    #[prost(uint32, optional, tag = "17")]
    pub override_id: Option<u32>,
    #[prost(uint32, repeated, tag = "18")]
    pub indices: Vec<u32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SwitchCaseProto {
    #[prost(message, repeated, tag = "1")]
    pub selectors: Vec<CaseSelectorProto>,
    #[prost(uint32, tag = "2")]
    pub block: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct CaseSelectorProto {
    #[prost(bool, tag = "1")]
    pub is_default: bool,
    #[prost(uint32, tag = "2")]
    pub value: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct FunctionProto {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(uint32, repeated, tag = "2")]
    pub params: Vec<u32>,
    #[prost(uint32, tag = "3")]
    pub return_type: u32,
    #[prost(message, optional, tag = "4")]
    pub return_attributes: Option<IoAttributesProto>,
    /// See [`stage`].
    #[prost(int32, tag = "5")]
    pub stage: i32,
    /// Empty, or exactly three dimensions.
    #[prost(uint32, repeated, tag = "6")]
    pub workgroup_size: Vec<u32>,
    #[prost(uint32, tag = "7")]
    pub block: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct NameProto {
    #[prost(uint32, tag = "1")]
    pub value: u32,
    #[prost(string, tag = "2")]
    pub name: String,
}

/// Scalar kind codes.
pub mod scalar_kind {
    pub const BOOL: i32 = 1;
    pub const SINT: i32 = 2;
    pub const UINT: i32 = 3;
    pub const FLOAT: i32 = 4;
}

/// Address space codes.
pub mod address_space {
    pub const FUNCTION: i32 = 1;
    pub const PRIVATE: i32 = 2;
    pub const WORKGROUP: i32 = 3;
    pub const UNIFORM: i32 = 4;
    pub const STORAGE: i32 = 5;
    pub const HANDLE: i32 = 6;
}

/// Value kind codes.
pub mod value_kind {
    pub const CONSTANT: i32 = 1;
    pub const INSTRUCTION_RESULT: i32 = 2;
    pub const FUNCTION_PARAM: i32 = 3;
    pub const BLOCK_PARAM: i32 = 4;
}

/// Pipeline stage codes. `0` means "not an entry point".
pub mod stage {
    pub const COMPUTE: i32 = 1;
    pub const VERTEX: i32 = 2;
    pub const FRAGMENT: i32 = 3;
}

/// Texture class codes.
pub mod texture_class {
    pub const SAMPLED: i32 = 1;
    pub const DEPTH: i32 = 2;
    pub const STORAGE: i32 = 3;
}

/// Instruction discriminant codes.
pub mod inst_kind {
    pub const BINARY: i32 = 1;
    pub const UNARY: i32 = 2;
    pub const ACCESS: i32 = 3;
    pub const BITCAST: i32 = 4;
    pub const BREAK_IF: i32 = 5;
    pub const CONSTRUCT: i32 = 6;
    pub const CONTINUE: i32 = 7;
    pub const CONVERT: i32 = 8;
    pub const BUILTIN_CALL: i32 = 9;
    pub const DISCARD: i32 = 10;
    pub const EXIT_IF: i32 = 11;
    pub const EXIT_LOOP: i32 = 12;
    pub const EXIT_SWITCH: i32 = 13;
    pub const IF: i32 = 14;
    pub const LET: i32 = 15;
    pub const LOAD: i32 = 16;
    pub const LOAD_VECTOR_ELEMENT: i32 = 17;
    pub const LOOP: i32 = 18;
    pub const NEXT_ITERATION: i32 = 19;
    pub const OVERRIDE: i32 = 20;
    pub const PHONY: i32 = 21;
    pub const RETURN: i32 = 22;
    pub const STORE: i32 = 23;
    pub const STORE_VECTOR_ELEMENT: i32 = 24;
    pub const SWIZZLE: i32 = 25;
    pub const SWITCH: i32 = 26;
    pub const UNREACHABLE: i32 = 27;
    pub const USER_CALL: i32 = 28;
    pub const VAR: i32 = 29;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_module_round_trips() {
        let proto = ModuleProto {
            root_block: 1,
            blocks: vec![BlockProto::default()],
            ..Default::default()
        };
        let bytes = proto.encode_to_vec();
        let decoded = ModuleProto::decode(bytes.as_slice()).unwrap();
        assert_eq!(proto, decoded);
    }

    #[test]
    fn instruction_payload_round_trips() {
        let inst = InstructionProto {
            kind: inst_kind::SWIZZLE,
            operands: vec![3],
            results: vec![4],
            indices: vec![0, 1, 3],
            ..Default::default()
        };
        let bytes = inst.encode_to_vec();
        let decoded = InstructionProto::decode(bytes.as_slice()).unwrap();
        assert_eq!(inst, decoded);
    }

    #[test]
    fn zero_is_reserved_for_absent() {
        // A default record's references are all "absent".
        let value = ValueProto::default();
        assert_eq!(value.ty, 0);
        assert_eq!(value.constant, 0);
        assert_eq!(value.instruction, 0);
    }
}
