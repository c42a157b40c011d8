//! Interned constant values.
//!
//! Constants live in the module's [`ConstantStore`], independent of any
//! instruction. Two constants with the same literal data share one handle,
//! so sharing a constant across instructions is free.

use half::f16;

use crate::arena::{Handle, UniqueArena};
use crate::error::IrError;
use crate::types::{ArraySize, Scalar, Type, TypeInner};

/// Upper bound on composite/splat element counts accepted by the store.
///
/// Guards against pathological memory blow-up from hostile shaders that
/// declare enormous constant arrays.
pub const MAX_COMPOSITE_ELEMENTS: u32 = 65_536;

/// A scalar literal.
///
/// `Eq`/`Hash` compare floating-point values by bit pattern, which is what
/// interning needs: `0.0` and `-0.0` are distinct constants, and a NaN
/// interns equal to itself.
#[derive(Clone, Copy, Debug)]
pub enum ScalarValue {
    Bool(bool),
    I32(i32),
    U32(u32),
    F32(f32),
    F16(f16),
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::U32(a), Self::U32(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::F16(a), Self::F16(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl std::hash::Hash for ScalarValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match *self {
            Self::Bool(v) => v.hash(state),
            Self::I32(v) => v.hash(state),
            Self::U32(v) => v.hash(state),
            Self::F32(v) => v.to_bits().hash(state),
            Self::F16(v) => v.to_bits().hash(state),
        }
    }
}

impl ScalarValue {
    /// Returns the scalar type of this literal.
    pub fn scalar(&self) -> Scalar {
        match *self {
            Self::Bool(_) => Scalar::BOOL,
            Self::I32(_) => Scalar::I32,
            Self::U32(_) => Scalar::U32,
            Self::F32(_) => Scalar::F32,
            Self::F16(_) => Scalar::F16,
        }
    }

    /// Interprets an integer literal as an index, if it is one and is
    /// non-negative.
    pub fn index_value(&self) -> Option<u64> {
        match *self {
            Self::I32(v) if v >= 0 => Some(v as u64),
            Self::U32(v) => Some(u64::from(v)),
            _ => None,
        }
    }
}

/// An interned constant: scalar literal, composite, or splat.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum ConstantValue {
    /// A scalar literal of the given type.
    Scalar {
        ty: Handle<Type>,
        value: ScalarValue,
    },
    /// An ordered list of element constants of the given composite type.
    Composite {
        ty: Handle<Type>,
        elements: Vec<Handle<ConstantValue>>,
    },
    /// One element constant repeated `count` times.
    Splat {
        ty: Handle<Type>,
        value: Handle<ConstantValue>,
        count: u32,
    },
}

impl ConstantValue {
    /// The type of this constant.
    pub fn ty(&self) -> Handle<Type> {
        match *self {
            Self::Scalar { ty, .. } | Self::Composite { ty, .. } | Self::Splat { ty, .. } => ty,
        }
    }
}

/// The module's interning store for constant values.
#[derive(Clone, Debug, Default)]
pub struct ConstantStore {
    values: UniqueArena<ConstantValue>,
}

impl ConstantStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct constants in the store.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a reference to the constant if the handle is valid.
    pub fn try_get(&self, handle: Handle<ConstantValue>) -> Option<&ConstantValue> {
        self.values.try_get(handle)
    }

    /// Iterates over `(handle, &constant)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<ConstantValue>, &ConstantValue)> {
        self.values.iter()
    }

    /// Interns a scalar literal of the given type.
    pub fn scalar(&mut self, ty: Handle<Type>, value: ScalarValue) -> Handle<ConstantValue> {
        self.values.insert(ConstantValue::Scalar { ty, value })
    }

    /// Interns a composite constant, checking the element count against the
    /// composite type.
    pub fn composite(
        &mut self,
        types: &UniqueArena<Type>,
        ty: Handle<Type>,
        elements: Vec<Handle<ConstantValue>>,
    ) -> Result<Handle<ConstantValue>, IrError> {
        let count = elements.len() as u32;
        if count > MAX_COMPOSITE_ELEMENTS {
            return Err(IrError::CompositeTooLarge {
                count,
                max: MAX_COMPOSITE_ELEMENTS,
            });
        }
        let expected = types[ty]
            .inner
            .composite_element_count()
            .ok_or_else(|| IrError::NotComposite {
                ty: format!("{:?}", types[ty].inner),
            })?;
        if count != expected {
            return Err(IrError::CompositeCountMismatch {
                expected,
                found: count,
            });
        }
        Ok(self.values.insert(ConstantValue::Composite { ty, elements }))
    }

    /// Interns a splat constant: `value` repeated `count` times.
    pub fn splat(
        &mut self,
        types: &UniqueArena<Type>,
        ty: Handle<Type>,
        value: Handle<ConstantValue>,
        count: u32,
    ) -> Result<Handle<ConstantValue>, IrError> {
        if count > MAX_COMPOSITE_ELEMENTS {
            return Err(IrError::CompositeTooLarge {
                count,
                max: MAX_COMPOSITE_ELEMENTS,
            });
        }
        let expected = types[ty]
            .inner
            .composite_element_count()
            .ok_or_else(|| IrError::NotComposite {
                ty: format!("{:?}", types[ty].inner),
            })?;
        if count != expected {
            return Err(IrError::CompositeCountMismatch {
                expected,
                found: count,
            });
        }
        Ok(self.values.insert(ConstantValue::Splat { ty, value, count }))
    }

    /// Interns the zero value of the given type.
    ///
    /// Needs mutable access to the type arena because matrix zeros intern
    /// their column vector type on demand.
    pub fn zero(
        &mut self,
        types: &mut UniqueArena<Type>,
        ty: Handle<Type>,
    ) -> Result<Handle<ConstantValue>, IrError> {
        let inner = types[ty].inner.clone();
        match inner {
            TypeInner::Scalar(scalar) => Ok(self.scalar(ty, zero_scalar(scalar))),
            TypeInner::Vector { scalar, size } => {
                let elem_ty = types.insert(Type {
                    name: None,
                    inner: TypeInner::Scalar(scalar),
                });
                let elem = self.scalar(elem_ty, zero_scalar(scalar));
                self.splat(types, ty, elem, size as u32)
            }
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            } => {
                let column_ty = types.insert(Type {
                    name: None,
                    inner: TypeInner::Vector { size: rows, scalar },
                });
                let column = self.zero(types, column_ty)?;
                self.splat(types, ty, column, columns as u32)
            }
            TypeInner::Array {
                base,
                size: ArraySize::Constant(count),
                ..
            } => {
                let elem = self.zero(types, base)?;
                self.splat(types, ty, elem, count)
            }
            TypeInner::Struct { ref members, .. } => {
                let member_tys: Vec<_> = members.iter().map(|m| m.ty).collect();
                let mut elements = Vec::with_capacity(member_tys.len());
                for member_ty in member_tys {
                    elements.push(self.zero(types, member_ty)?);
                }
                self.composite(types, ty, elements)
            }
            _ => Err(IrError::NotConstructible {
                ty: format!("{inner:?}"),
            }),
        }
    }
}

fn zero_scalar(scalar: Scalar) -> ScalarValue {
    match scalar.kind {
        crate::types::ScalarKind::Bool => ScalarValue::Bool(false),
        crate::types::ScalarKind::Sint => ScalarValue::I32(0),
        crate::types::ScalarKind::Uint => ScalarValue::U32(0),
        crate::types::ScalarKind::Float => {
            if scalar.width == 2 {
                ScalarValue::F16(f16::from_f32(0.0))
            } else {
                ScalarValue::F32(0.0)
            }
        }
    }
}
