//! Conversions between IR enums and their wire codes.
//!
//! Every mapping is a pair of pure functions; `*_from` returns `None` for
//! unknown codes so the decoder can reject them instead of panicking.

use shade_ir::{
    Access, AddressSpace, BinaryOp, BuiltinFn, BuiltinValue, Interpolation,
    InterpolationSampling, InterpolationType, Scalar, ScalarKind, Stage, SubgroupMatrixKind,
    TexelFormat, TextureDimension, UnaryOp,
};

use crate::proto::{address_space, scalar_kind, stage};

pub fn scalar_kind_code(kind: ScalarKind) -> i32 {
    match kind {
        ScalarKind::Bool => scalar_kind::BOOL,
        ScalarKind::Sint => scalar_kind::SINT,
        ScalarKind::Uint => scalar_kind::UINT,
        ScalarKind::Float => scalar_kind::FLOAT,
    }
}

pub fn scalar_kind_from(code: i32) -> Option<ScalarKind> {
    Some(match code {
        scalar_kind::BOOL => ScalarKind::Bool,
        scalar_kind::SINT => ScalarKind::Sint,
        scalar_kind::UINT => ScalarKind::Uint,
        scalar_kind::FLOAT => ScalarKind::Float,
        _ => return None,
    })
}

pub fn scalar_from(kind: i32, width: u32) -> Option<Scalar> {
    let kind = scalar_kind_from(kind)?;
    let width = u8::try_from(width).ok()?;
    if !matches!(width, 1 | 2 | 4 | 8) {
        return None;
    }
    Some(Scalar { kind, width })
}

pub fn address_space_code(space: AddressSpace) -> i32 {
    match space {
        AddressSpace::Function => address_space::FUNCTION,
        AddressSpace::Private => address_space::PRIVATE,
        AddressSpace::Workgroup => address_space::WORKGROUP,
        AddressSpace::Uniform => address_space::UNIFORM,
        AddressSpace::Storage => address_space::STORAGE,
        AddressSpace::Handle => address_space::HANDLE,
    }
}

pub fn address_space_from(code: i32) -> Option<AddressSpace> {
    Some(match code {
        address_space::FUNCTION => AddressSpace::Function,
        address_space::PRIVATE => AddressSpace::Private,
        address_space::WORKGROUP => AddressSpace::Workgroup,
        address_space::UNIFORM => AddressSpace::Uniform,
        address_space::STORAGE => AddressSpace::Storage,
        address_space::HANDLE => AddressSpace::Handle,
        _ => return None,
    })
}

/// Access masks travel as raw bits; unknown bits are rejected.
pub fn access_from(bits: u32) -> Option<Access> {
    if bits > Access::LOAD_STORE.bits() {
        return None;
    }
    Some(Access::from_bits(bits))
}

pub fn stage_code(value: Option<Stage>) -> i32 {
    match value {
        None => 0,
        Some(Stage::Compute) => stage::COMPUTE,
        Some(Stage::Vertex) => stage::VERTEX,
        Some(Stage::Fragment) => stage::FRAGMENT,
    }
}

pub fn stage_from(code: i32) -> Option<Option<Stage>> {
    Some(match code {
        0 => None,
        stage::COMPUTE => Some(Stage::Compute),
        stage::VERTEX => Some(Stage::Vertex),
        stage::FRAGMENT => Some(Stage::Fragment),
        _ => return None,
    })
}

macro_rules! code_pair {
    ($to:ident, $from:ident, $ty:ty, { $($variant:path => $code:literal),+ $(,)? }) => {
        pub fn $to(value: $ty) -> i32 {
            match value {
                $($variant => $code,)+
            }
        }

        pub fn $from(code: i32) -> Option<$ty> {
            Some(match code {
                $($code => $variant,)+
                _ => return None,
            })
        }
    };
}

code_pair!(binary_op_code, binary_op_from, BinaryOp, {
    BinaryOp::Add => 1,
    BinaryOp::Subtract => 2,
    BinaryOp::Multiply => 3,
    BinaryOp::Divide => 4,
    BinaryOp::Modulo => 5,
    BinaryOp::Equal => 6,
    BinaryOp::NotEqual => 7,
    BinaryOp::Less => 8,
    BinaryOp::LessEqual => 9,
    BinaryOp::Greater => 10,
    BinaryOp::GreaterEqual => 11,
    BinaryOp::LogicalAnd => 12,
    BinaryOp::LogicalOr => 13,
    BinaryOp::BitwiseAnd => 14,
    BinaryOp::BitwiseOr => 15,
    BinaryOp::BitwiseXor => 16,
    BinaryOp::ShiftLeft => 17,
    BinaryOp::ShiftRight => 18,
});

code_pair!(unary_op_code, unary_op_from, UnaryOp, {
    UnaryOp::Negate => 1,
    UnaryOp::LogicalNot => 2,
    UnaryOp::BitwiseNot => 3,
});

code_pair!(builtin_fn_code, builtin_fn_from, BuiltinFn, {
    BuiltinFn::Abs => 1,
    BuiltinFn::Min => 2,
    BuiltinFn::Max => 3,
    BuiltinFn::Clamp => 4,
    BuiltinFn::Saturate => 5,
    BuiltinFn::Floor => 6,
    BuiltinFn::Ceil => 7,
    BuiltinFn::Round => 8,
    BuiltinFn::Fract => 9,
    BuiltinFn::Trunc => 10,
    BuiltinFn::Sin => 11,
    BuiltinFn::Cos => 12,
    BuiltinFn::Tan => 13,
    BuiltinFn::Asin => 14,
    BuiltinFn::Acos => 15,
    BuiltinFn::Atan => 16,
    BuiltinFn::Atan2 => 17,
    BuiltinFn::Sinh => 18,
    BuiltinFn::Cosh => 19,
    BuiltinFn::Tanh => 20,
    BuiltinFn::Sqrt => 21,
    BuiltinFn::InverseSqrt => 22,
    BuiltinFn::Log => 23,
    BuiltinFn::Log2 => 24,
    BuiltinFn::Exp => 25,
    BuiltinFn::Exp2 => 26,
    BuiltinFn::Pow => 27,
    BuiltinFn::Dot => 28,
    BuiltinFn::Cross => 29,
    BuiltinFn::Normalize => 30,
    BuiltinFn::Length => 31,
    BuiltinFn::Distance => 32,
    BuiltinFn::Mix => 33,
    BuiltinFn::Step => 34,
    BuiltinFn::SmoothStep => 35,
    BuiltinFn::Fma => 36,
    BuiltinFn::All => 37,
    BuiltinFn::Any => 38,
    BuiltinFn::Select => 39,
    BuiltinFn::ArrayLength => 40,
});

code_pair!(builtin_value_code, builtin_value_from, BuiltinValue, {
    BuiltinValue::Position => 1,
    BuiltinValue::FrontFacing => 2,
    BuiltinValue::VertexIndex => 3,
    BuiltinValue::InstanceIndex => 4,
    BuiltinValue::FragDepth => 5,
    BuiltinValue::SampleIndex => 6,
    BuiltinValue::SampleMask => 7,
    BuiltinValue::ClipDistances => 8,
    BuiltinValue::GlobalInvocationId => 9,
    BuiltinValue::LocalInvocationId => 10,
    BuiltinValue::LocalInvocationIndex => 11,
    BuiltinValue::WorkgroupId => 12,
    BuiltinValue::NumWorkgroups => 13,
    BuiltinValue::SubgroupInvocationId => 14,
    BuiltinValue::SubgroupSize => 15,
});

code_pair!(
    interpolation_type_code,
    interpolation_type_from,
    InterpolationType,
    {
        InterpolationType::Perspective => 1,
        InterpolationType::Linear => 2,
        InterpolationType::Flat => 3,
    }
);

code_pair!(
    interpolation_sampling_code,
    interpolation_sampling_from,
    InterpolationSampling,
    {
        InterpolationSampling::Center => 1,
        InterpolationSampling::Centroid => 2,
        InterpolationSampling::Sample => 3,
        InterpolationSampling::First => 4,
        InterpolationSampling::Either => 5,
    }
);

code_pair!(texture_dim_code, texture_dim_from, TextureDimension, {
    TextureDimension::D1 => 1,
    TextureDimension::D2 => 2,
    TextureDimension::D3 => 3,
    TextureDimension::Cube => 4,
});

code_pair!(texel_format_code, texel_format_from, TexelFormat, {
    TexelFormat::Rgba8Unorm => 1,
    TexelFormat::Rgba8Snorm => 2,
    TexelFormat::Rgba8Uint => 3,
    TexelFormat::Rgba8Sint => 4,
    TexelFormat::Rgba16Uint => 5,
    TexelFormat::Rgba16Sint => 6,
    TexelFormat::Rgba16Float => 7,
    TexelFormat::R32Uint => 8,
    TexelFormat::R32Sint => 9,
    TexelFormat::R32Float => 10,
    TexelFormat::Rg32Uint => 11,
    TexelFormat::Rg32Sint => 12,
    TexelFormat::Rg32Float => 13,
    TexelFormat::Rgba32Uint => 14,
    TexelFormat::Rgba32Sint => 15,
    TexelFormat::Rgba32Float => 16,
    TexelFormat::Bgra8Unorm => 17,
});

code_pair!(
    subgroup_matrix_kind_code,
    subgroup_matrix_kind_from,
    SubgroupMatrixKind,
    {
        SubgroupMatrixKind::Left => 1,
        SubgroupMatrixKind::Right => 2,
        SubgroupMatrixKind::Result => 3,
    }
);

pub fn interpolation_to_proto(value: Interpolation) -> (i32, Option<i32>) {
    (
        interpolation_type_code(value.ty),
        value.sampling.map(interpolation_sampling_code),
    )
}
