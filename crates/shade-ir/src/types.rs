//! Type system for the Shade IR.
//!
//! Types are interned in the module's [`UniqueArena`](crate::UniqueArena):
//! two structurally identical types always share one handle, so type
//! equality is handle comparison.

use crate::arena::Handle;
use crate::io::{Access, AddressSpace, IoAttributes};

/// Width of a scalar type in bytes.
pub type Bytes = u8;

/// The kind of a scalar type.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum ScalarKind {
    /// Boolean.
    Bool,
    /// Signed integer.
    Sint,
    /// Unsigned integer.
    Uint,
    /// Floating point.
    Float,
}

impl ScalarKind {
    /// Returns `true` for signed or unsigned integers.
    pub fn is_integer(self) -> bool {
        matches!(self, Self::Sint | Self::Uint)
    }

    /// Returns `true` for integer or floating-point kinds.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Bool)
    }
}

/// A scalar type: kind + byte width.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Scalar {
    pub kind: ScalarKind,
    pub width: Bytes,
}

impl Scalar {
    pub const BOOL: Self = Self {
        kind: ScalarKind::Bool,
        width: 1,
    };
    pub const I32: Self = Self {
        kind: ScalarKind::Sint,
        width: 4,
    };
    pub const U32: Self = Self {
        kind: ScalarKind::Uint,
        width: 4,
    };
    pub const F16: Self = Self {
        kind: ScalarKind::Float,
        width: 2,
    };
    pub const F32: Self = Self {
        kind: ScalarKind::Float,
        width: 4,
    };
    pub const I8: Self = Self {
        kind: ScalarKind::Sint,
        width: 1,
    };
    pub const U8: Self = Self {
        kind: ScalarKind::Uint,
        width: 1,
    };
    pub const I64: Self = Self {
        kind: ScalarKind::Sint,
        width: 8,
    };
    pub const U64: Self = Self {
        kind: ScalarKind::Uint,
        width: 8,
    };
}

/// Number of components in a vector.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum VectorSize {
    /// 2 components.
    Bi = 2,
    /// 3 components.
    Tri = 3,
    /// 4 components.
    Quad = 4,
}

impl VectorSize {
    /// Builds a vector size from a component count.
    pub fn from_count(count: u32) -> Option<Self> {
        match count {
            2 => Some(Self::Bi),
            3 => Some(Self::Tri),
            4 => Some(Self::Quad),
            _ => None,
        }
    }
}

/// Size of an array.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ArraySize {
    /// Fixed-size array.
    Constant(u32),
    /// Runtime-sized array.
    Dynamic,
}

/// A member of a struct type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct StructMember {
    pub name: Option<String>,
    pub ty: Handle<Type>,
    pub offset: u32,
    /// Shader-IO attributes when the struct is an entry-point interface.
    pub attributes: IoAttributes,
}

/// Texture dimensionality.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum TextureDimension {
    D1,
    D2,
    D3,
    Cube,
}

/// Storage texture texel format.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum TexelFormat {
    Rgba8Unorm,
    Rgba8Snorm,
    Rgba8Uint,
    Rgba8Sint,
    Rgba16Uint,
    Rgba16Sint,
    Rgba16Float,
    R32Uint,
    R32Sint,
    R32Float,
    Rg32Uint,
    Rg32Sint,
    Rg32Float,
    Rgba32Uint,
    Rgba32Sint,
    Rgba32Float,
    Bgra8Unorm,
}

impl TexelFormat {
    /// The scalar type a texel of this format loads/stores as.
    pub fn component_scalar(self) -> Scalar {
        match self {
            Self::Rgba8Unorm
            | Self::Rgba8Snorm
            | Self::Rgba16Float
            | Self::R32Float
            | Self::Rg32Float
            | Self::Rgba32Float
            | Self::Bgra8Unorm => Scalar::F32,
            Self::Rgba8Uint
            | Self::Rgba16Uint
            | Self::R32Uint
            | Self::Rg32Uint
            | Self::Rgba32Uint => Scalar::U32,
            Self::Rgba8Sint
            | Self::Rgba16Sint
            | Self::R32Sint
            | Self::Rg32Sint
            | Self::Rgba32Sint => Scalar::I32,
        }
    }
}

/// The class of a texture type.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum TextureClass {
    /// Texture sampled as the given scalar kind.
    Sampled { scalar: Scalar, multisampled: bool },
    /// Depth-comparison texture.
    Depth { multisampled: bool },
    /// Read/write storage texture.
    Storage { format: TexelFormat, access: Access },
}

/// Operand role of a subgroup matrix.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum SubgroupMatrixKind {
    Left,
    Right,
    Result,
}

/// A named type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Type {
    pub name: Option<String>,
    pub inner: TypeInner,
}

/// The concrete shape of a type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum TypeInner {
    /// A single scalar value.
    Scalar(Scalar),
    /// A vector of scalars.
    Vector { size: VectorSize, scalar: Scalar },
    /// A matrix of column vectors.
    Matrix {
        columns: VectorSize,
        rows: VectorSize,
        scalar: Scalar,
    },
    /// An atomic scalar.
    Atomic(Scalar),
    /// A fixed-size or runtime-sized array.
    Array {
        base: Handle<Type>,
        size: ArraySize,
        stride: u32,
    },
    /// A composite struct type.
    Struct { members: Vec<StructMember>, span: u32 },
    /// A pointer to a value in a given address space.
    Pointer {
        base: Handle<Type>,
        space: AddressSpace,
        access: Access,
    },
    /// A reference to a memory view. Capability-gated.
    Reference {
        base: Handle<Type>,
        space: AddressSpace,
        access: Access,
    },
    /// A sampler handle.
    Sampler { comparison: bool },
    /// A texture handle.
    Texture {
        dim: TextureDimension,
        arrayed: bool,
        class: TextureClass,
    },
    /// A subgroup matrix fragment.
    SubgroupMatrix {
        kind: SubgroupMatrixKind,
        scalar: Scalar,
        columns: u32,
        rows: u32,
    },
}

impl TypeInner {
    /// Returns the scalar underlying a scalar or vector type.
    pub fn scalar(&self) -> Option<Scalar> {
        match *self {
            Self::Scalar(s) | Self::Vector { scalar: s, .. } => Some(s),
            _ => None,
        }
    }

    /// Returns the component count of a scalar (1) or vector type.
    pub fn component_count(&self) -> Option<u32> {
        match *self {
            Self::Scalar(_) => Some(1),
            Self::Vector { size, .. } => Some(size as u32),
            _ => None,
        }
    }

    /// Returns `true` if this is a memory view (pointer or reference).
    pub fn is_memory_view(&self) -> bool {
        matches!(self, Self::Pointer { .. } | Self::Reference { .. })
    }

    /// Returns `true` if this type can appear as a `Construct` result:
    /// plain scalars, vectors, matrices, fixed arrays, and structs.
    pub fn is_constructible(&self) -> bool {
        match self {
            Self::Scalar(_) | Self::Vector { .. } | Self::Matrix { .. } | Self::Struct { .. } => {
                true
            }
            Self::Array { size, .. } => matches!(size, ArraySize::Constant(_)),
            _ => false,
        }
    }

    /// Number of elements a composite constant of this type must supply,
    /// or `None` for non-composite / runtime-sized types.
    pub fn composite_element_count(&self) -> Option<u32> {
        match *self {
            Self::Vector { size, .. } => Some(size as u32),
            Self::Matrix { columns, .. } => Some(columns as u32),
            Self::Array {
                size: ArraySize::Constant(n),
                ..
            } => Some(n),
            Self::Struct { ref members, .. } => Some(members.len() as u32),
            _ => None,
        }
    }
}
