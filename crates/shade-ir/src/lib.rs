//! Shade intermediate representation.
//!
//! A typed, instruction-level IR for shader programs: the structure a front
//! end lowers into, the validator certifies, and the binary codec
//! serializes. Entities live in per-module arenas and reference each other
//! through dense [`Handle`]s, so the whole graph is cycle-free to own and
//! trivial to serialize.

pub mod arena;
mod block;
mod builder;
mod constant;
mod display;
mod error;
mod func;
mod inst;
mod io;
mod module;
mod types;
mod value;

pub use arena::{Arena, Handle, UniqueArena};
pub use block::{Block, BlockOwner};
pub use builder::Builder;
pub use constant::{ConstantStore, ConstantValue, ScalarValue, MAX_COMPOSITE_ELEMENTS};
pub use display::{dump_module, format_type, format_type_inner};
pub use error::IrError;
pub use func::{Function, Stage};
pub use inst::{
    BinaryOp, BuiltinFn, CaseSelector, Instruction, Op, SwitchCase, UnaryOp,
};
pub use io::{
    Access, AddressSpace, BindingPoint, BuiltinValue, Interpolation, InterpolationSampling,
    InterpolationType, IoAttributes,
};
pub use module::{transitive_callees, InstVisitSet, Module};
pub use types::{
    ArraySize, Bytes, Scalar, ScalarKind, StructMember, SubgroupMatrixKind, TexelFormat,
    TextureClass, TextureDimension, Type, TypeInner, VectorSize,
};
pub use value::{Usage, Value, ValueKind};
