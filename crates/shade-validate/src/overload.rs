//! Overload tables for operators, conversions, and builtin functions.
//!
//! Result types are never inferred during lowering; the front end supplies
//! them and these tables re-derive the expected type so the validator can
//! compare. All lookups are pure functions over immutable data.

use shade_ir::{
    ArraySize, BinaryOp, BuiltinFn, Scalar, ScalarKind, Type, TypeInner, UnaryOp, UniqueArena,
    VectorSize,
};

/// Renders a type shape for error messages.
pub fn render(types: &UniqueArena<Type>, inner: &TypeInner) -> String {
    shade_ir::format_type_inner(inner, types)
}

fn is_scalar_or_vector_of(inner: &TypeInner, pred: impl Fn(Scalar) -> bool) -> bool {
    match *inner {
        TypeInner::Scalar(s) => pred(s),
        TypeInner::Vector { scalar, .. } => pred(scalar),
        _ => false,
    }
}

fn bool_shape_of(inner: &TypeInner) -> TypeInner {
    match *inner {
        TypeInner::Vector { size, .. } => TypeInner::Vector {
            size,
            scalar: Scalar::BOOL,
        },
        _ => TypeInner::Scalar(Scalar::BOOL),
    }
}

/// Expected result type of a binary operator applied to two operand types.
pub fn binary_result(
    types: &UniqueArena<Type>,
    op: BinaryOp,
    lhs: &TypeInner,
    rhs: &TypeInner,
) -> Result<TypeInner, String> {
    use BinaryOp::*;

    let mismatch = || {
        Err(format!(
            "no overload of '{op}' for operands {} and {}",
            render(types, lhs),
            render(types, rhs)
        ))
    };

    match op {
        Add | Subtract | Divide | Modulo => {
            if lhs == rhs && is_scalar_or_vector_of(lhs, |s| s.kind.is_numeric()) {
                Ok(lhs.clone())
            } else {
                mismatch()
            }
        }
        Multiply => multiply_result(types, lhs, rhs),
        Equal | NotEqual => {
            if lhs == rhs && matches!(lhs, TypeInner::Scalar(_) | TypeInner::Vector { .. }) {
                Ok(bool_shape_of(lhs))
            } else {
                mismatch()
            }
        }
        Less | LessEqual | Greater | GreaterEqual => {
            if lhs == rhs && is_scalar_or_vector_of(lhs, |s| s.kind.is_numeric()) {
                Ok(bool_shape_of(lhs))
            } else {
                mismatch()
            }
        }
        LogicalAnd | LogicalOr => {
            if lhs == rhs && matches!(lhs, TypeInner::Scalar(Scalar::BOOL)) {
                Ok(lhs.clone())
            } else {
                mismatch()
            }
        }
        BitwiseAnd | BitwiseOr | BitwiseXor => {
            let ok = lhs == rhs
                && is_scalar_or_vector_of(lhs, |s| {
                    s.kind.is_integer() || (s.kind == ScalarKind::Bool && !matches!(op, BitwiseXor))
                });
            // Bool '&'/'|' are the non-short-circuiting logical forms.
            if ok {
                Ok(lhs.clone())
            } else {
                mismatch()
            }
        }
        ShiftLeft | ShiftRight => {
            let lhs_ok = is_scalar_or_vector_of(lhs, |s| s.kind.is_integer());
            let widths_match = match (lhs, rhs) {
                (TypeInner::Scalar(_), TypeInner::Scalar(r)) => *r == Scalar::U32,
                (
                    TypeInner::Vector { size: ls, .. },
                    TypeInner::Vector {
                        size: rs,
                        scalar: r,
                    },
                ) => ls == rs && *r == Scalar::U32,
                _ => false,
            };
            if lhs_ok && widths_match {
                Ok(lhs.clone())
            } else {
                mismatch()
            }
        }
    }
}

fn multiply_result(
    types: &UniqueArena<Type>,
    lhs: &TypeInner,
    rhs: &TypeInner,
) -> Result<TypeInner, String> {
    let err = || {
        Err(format!(
            "no overload of 'mul' for operands {} and {}",
            render(types, lhs),
            render(types, rhs)
        ))
    };
    match (lhs, rhs) {
        // Same-type scalar/vector arithmetic.
        (a, b) if a == b && is_scalar_or_vector_of(a, |s| s.kind.is_numeric()) => Ok(a.clone()),
        // Scalar * vector and vector * scalar.
        (TypeInner::Scalar(s), TypeInner::Vector { size, scalar })
        | (TypeInner::Vector { size, scalar }, TypeInner::Scalar(s))
            if s == scalar && s.kind == ScalarKind::Float =>
        {
            Ok(TypeInner::Vector {
                size: *size,
                scalar: *scalar,
            })
        }
        // Scalar * matrix and matrix * scalar.
        (
            TypeInner::Scalar(s),
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            },
        )
        | (
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            },
            TypeInner::Scalar(s),
        ) if s == scalar => Ok(TypeInner::Matrix {
            columns: *columns,
            rows: *rows,
            scalar: *scalar,
        }),
        // Matrix * column vector.
        (
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            },
            TypeInner::Vector { size, scalar: vs },
        ) if columns == size && scalar == vs => Ok(TypeInner::Vector {
            size: *rows,
            scalar: *scalar,
        }),
        // Row vector * matrix.
        (
            TypeInner::Vector { size, scalar: vs },
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            },
        ) if rows == size && scalar == vs => Ok(TypeInner::Vector {
            size: *columns,
            scalar: *scalar,
        }),
        // Matrix * matrix.
        (
            TypeInner::Matrix {
                columns: k1,
                rows,
                scalar,
            },
            TypeInner::Matrix {
                columns,
                rows: k2,
                scalar: s2,
            },
        ) if k1 == k2 && scalar == s2 => Ok(TypeInner::Matrix {
            columns: *columns,
            rows: *rows,
            scalar: *scalar,
        }),
        _ => err(),
    }
}

/// Expected result type of a unary operator.
pub fn unary_result(
    types: &UniqueArena<Type>,
    op: UnaryOp,
    operand: &TypeInner,
) -> Result<TypeInner, String> {
    let ok = match op {
        UnaryOp::Negate => is_scalar_or_vector_of(operand, |s| {
            s.kind == ScalarKind::Sint || s.kind == ScalarKind::Float
        }),
        UnaryOp::LogicalNot => is_scalar_or_vector_of(operand, |s| s.kind == ScalarKind::Bool),
        UnaryOp::BitwiseNot => is_scalar_or_vector_of(operand, |s| s.kind.is_integer()),
    };
    if ok {
        Ok(operand.clone())
    } else {
        Err(format!(
            "no overload of '{op}' for operand {}",
            render(types, operand)
        ))
    }
}

/// Checks a `Convert` against the numeric-conversion table.
pub fn convert_allowed(
    types: &UniqueArena<Type>,
    from: &TypeInner,
    to: &TypeInner,
) -> Result<(), String> {
    let ok = match (from, to) {
        (TypeInner::Scalar(_), TypeInner::Scalar(_)) => true,
        (TypeInner::Vector { size: fs, .. }, TypeInner::Vector { size: ts, .. }) => fs == ts,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(format!(
            "no conversion from {} to {}",
            render(types, from),
            render(types, to)
        ))
    }
}

fn bit_shape(inner: &TypeInner) -> Option<(u32, Scalar)> {
    match *inner {
        TypeInner::Scalar(s) => Some((1, s)),
        TypeInner::Vector { size, scalar } => Some((size as u32, scalar)),
        _ => None,
    }
}

/// Checks a `Bitcast` against the fixed table of bit-reinterpretation pairs.
///
/// Both sides must be numeric scalars/vectors of 16- or 32-bit components
/// with the same total bit width, e.g. `vec2<f16>` ↔ `f32`.
pub fn bitcast_allowed(
    types: &UniqueArena<Type>,
    from: &TypeInner,
    to: &TypeInner,
) -> Result<(), String> {
    let err = || {
        Err(format!(
            "no bitcast from {} to {}",
            render(types, from),
            render(types, to)
        ))
    };
    let (Some((from_count, from_scalar)), Some((to_count, to_scalar))) =
        (bit_shape(from), bit_shape(to))
    else {
        return err();
    };
    if !from_scalar.kind.is_numeric() || !to_scalar.kind.is_numeric() {
        return err();
    }
    if !matches!(from_scalar.width, 2 | 4) || !matches!(to_scalar.width, 2 | 4) {
        return err();
    }
    if from_count * u32::from(from_scalar.width) != to_count * u32::from(to_scalar.width) {
        return err();
    }
    Ok(())
}

/// Expected result type of a builtin function call.
pub fn builtin_result(
    types: &UniqueArena<Type>,
    builtin: BuiltinFn,
    args: &[&TypeInner],
) -> Result<TypeInner, String> {
    use BuiltinFn::*;

    let err = |expected: &str| {
        let rendered: Vec<_> = args.iter().map(|a| render(types, a)).collect();
        Err(format!(
            "no overload of '{builtin}' for ({}); expected {expected}",
            rendered.join(", ")
        ))
    };

    let same = |n: usize, pred: &dyn Fn(Scalar) -> bool, expected: &str| {
        if args.len() == n
            && args.iter().all(|a| *a == args[0])
            && is_scalar_or_vector_of(args[0], pred)
        {
            Ok(args[0].clone())
        } else {
            err(expected)
        }
    };

    let float = |s: Scalar| s.kind == ScalarKind::Float;
    let numeric = |s: Scalar| s.kind.is_numeric();

    match builtin {
        Abs => same(1, &numeric, "a numeric scalar or vector"),
        Min | Max => same(2, &numeric, "two matching numeric operands"),
        Clamp => same(3, &numeric, "three matching numeric operands"),
        Saturate | Floor | Ceil | Round | Fract | Trunc | Sin | Cos | Tan | Asin | Acos
        | Atan | Sinh | Cosh | Tanh | Sqrt | InverseSqrt | Log | Log2 | Exp | Exp2 => {
            same(1, &float, "a float scalar or vector")
        }
        Atan2 | Pow | Step => same(2, &float, "two matching float operands"),
        SmoothStep | Fma => same(3, &float, "three matching float operands"),
        Mix => {
            // mix(T, T, T) and mix(vecN<S>, vecN<S>, S)
            if args.len() == 3 && args[0] == args[1] && is_scalar_or_vector_of(args[0], float) {
                if args[2] == args[0] {
                    return Ok(args[0].clone());
                }
                if let (TypeInner::Vector { scalar, .. }, TypeInner::Scalar(s)) =
                    (args[0], args[2])
                {
                    if s == scalar {
                        return Ok(args[0].clone());
                    }
                }
            }
            err("mix(T, T, T) or mix(vecN<S>, vecN<S>, S)")
        }
        Dot => match args {
            [TypeInner::Vector { size, scalar }, b]
                if *b == args[0] && scalar.kind.is_numeric() =>
            {
                let _ = size;
                Ok(TypeInner::Scalar(*scalar))
            }
            _ => err("two matching numeric vectors"),
        },
        Cross => match args {
            [TypeInner::Vector {
                size: VectorSize::Tri,
                scalar,
            }, b] if *b == args[0] && scalar.kind == ScalarKind::Float => Ok(args[0].clone()),
            _ => err("two matching vec3<float> operands"),
        },
        Normalize => match args {
            [TypeInner::Vector { scalar, .. }] if scalar.kind == ScalarKind::Float => {
                Ok(args[0].clone())
            }
            _ => err("a float vector"),
        },
        Length => match args {
            [TypeInner::Vector { scalar, .. } | TypeInner::Scalar(scalar)]
                if scalar.kind == ScalarKind::Float =>
            {
                Ok(TypeInner::Scalar(*scalar))
            }
            _ => err("a float scalar or vector"),
        },
        Distance => {
            if args.len() == 2 && args[0] == args[1] && is_scalar_or_vector_of(args[0], float) {
                let scalar = args[0].scalar().expect("scalar or vector shape");
                Ok(TypeInner::Scalar(scalar))
            } else {
                err("two matching float operands")
            }
        }
        All | Any => match args {
            [TypeInner::Scalar(Scalar::BOOL)]
            | [TypeInner::Vector {
                scalar: Scalar::BOOL,
                ..
            }] => Ok(TypeInner::Scalar(Scalar::BOOL)),
            _ => err("a bool scalar or vector"),
        },
        Select => {
            // select(false_value, true_value, condition)
            if args.len() == 3 && args[0] == args[1] {
                match args[2] {
                    TypeInner::Scalar(Scalar::BOOL) => return Ok(args[0].clone()),
                    TypeInner::Vector {
                        size,
                        scalar: Scalar::BOOL,
                    } => {
                        if let TypeInner::Vector { size: vsize, .. } = args[0] {
                            if vsize == size {
                                return Ok(args[0].clone());
                            }
                        }
                    }
                    _ => {}
                }
            }
            err("select(T, T, bool) or select(vecN<T>, vecN<T>, vecN<bool>)")
        }
        ArrayLength => match args {
            [TypeInner::Pointer { base, .. }] => match types.try_get(*base).map(|ty| &ty.inner) {
                Some(TypeInner::Array {
                    size: ArraySize::Dynamic,
                    ..
                }) => Ok(TypeInner::Scalar(Scalar::U32)),
                _ => err("a pointer to a runtime-sized array"),
            },
            _ => err("a pointer to a runtime-sized array"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec(size: VectorSize, scalar: Scalar) -> TypeInner {
        TypeInner::Vector { size, scalar }
    }

    #[test]
    fn arithmetic_same_type() {
        let types = UniqueArena::new();
        let f32_ty = TypeInner::Scalar(Scalar::F32);
        let result = binary_result(&types, BinaryOp::Add, &f32_ty, &f32_ty).unwrap();
        assert_eq!(result, f32_ty);
    }

    #[test]
    fn arithmetic_mismatch() {
        let types = UniqueArena::new();
        let f32_ty = TypeInner::Scalar(Scalar::F32);
        let i32_ty = TypeInner::Scalar(Scalar::I32);
        assert!(binary_result(&types, BinaryOp::Add, &f32_ty, &i32_ty).is_err());
    }

    #[test]
    fn arithmetic_rejects_bool() {
        let types = UniqueArena::new();
        let bool_ty = TypeInner::Scalar(Scalar::BOOL);
        assert!(binary_result(&types, BinaryOp::Add, &bool_ty, &bool_ty).is_err());
    }

    #[test]
    fn comparison_produces_bool_shape() {
        let types = UniqueArena::new();
        let v = vec(VectorSize::Tri, Scalar::F32);
        let result = binary_result(&types, BinaryOp::Less, &v, &v).unwrap();
        assert_eq!(result, vec(VectorSize::Tri, Scalar::BOOL));
    }

    #[test]
    fn matrix_vector_multiply() {
        let types = UniqueArena::new();
        let mat4x3 = TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Tri,
            scalar: Scalar::F32,
        };
        let v4 = vec(VectorSize::Quad, Scalar::F32);
        let result = binary_result(&types, BinaryOp::Multiply, &mat4x3, &v4).unwrap();
        assert_eq!(result, vec(VectorSize::Tri, Scalar::F32));
    }

    #[test]
    fn shift_requires_u32_amount() {
        let types = UniqueArena::new();
        let i32_ty = TypeInner::Scalar(Scalar::I32);
        let u32_ty = TypeInner::Scalar(Scalar::U32);
        assert!(binary_result(&types, BinaryOp::ShiftLeft, &i32_ty, &u32_ty).is_ok());
        assert!(binary_result(&types, BinaryOp::ShiftLeft, &i32_ty, &i32_ty).is_err());
    }

    #[test]
    fn negate_needs_signed() {
        let types = UniqueArena::new();
        assert!(unary_result(&types, UnaryOp::Negate, &TypeInner::Scalar(Scalar::F32)).is_ok());
        assert!(unary_result(&types, UnaryOp::Negate, &TypeInner::Scalar(Scalar::U32)).is_err());
        assert!(unary_result(&types, UnaryOp::LogicalNot, &TypeInner::Scalar(Scalar::BOOL)).is_ok());
    }

    #[test]
    fn convert_scalar_and_vector() {
        let types = UniqueArena::new();
        let f32_ty = TypeInner::Scalar(Scalar::F32);
        let i32_ty = TypeInner::Scalar(Scalar::I32);
        assert!(convert_allowed(&types, &f32_ty, &i32_ty).is_ok());
        assert!(convert_allowed(
            &types,
            &vec(VectorSize::Bi, Scalar::F32),
            &vec(VectorSize::Bi, Scalar::U32)
        )
        .is_ok());
        // Size-changing conversions are not a thing.
        assert!(convert_allowed(
            &types,
            &vec(VectorSize::Bi, Scalar::F32),
            &vec(VectorSize::Tri, Scalar::F32)
        )
        .is_err());
    }

    #[test]
    fn bitcast_pairs() {
        let types = UniqueArena::new();
        let f32_ty = TypeInner::Scalar(Scalar::F32);
        let u32_ty = TypeInner::Scalar(Scalar::U32);
        let vec2h = vec(VectorSize::Bi, Scalar::F16);
        let vec4h = vec(VectorSize::Quad, Scalar::F16);
        let vec2u = vec(VectorSize::Bi, Scalar::U32);

        assert!(bitcast_allowed(&types, &f32_ty, &u32_ty).is_ok());
        assert!(bitcast_allowed(&types, &vec2h, &f32_ty).is_ok());
        assert!(bitcast_allowed(&types, &vec2h, &u32_ty).is_ok());
        assert!(bitcast_allowed(&types, &vec4h, &vec2u).is_ok());
        // Total bit widths differ.
        assert!(bitcast_allowed(&types, &vec4h, &f32_ty).is_err());
        // Bool never bitcasts.
        assert!(bitcast_allowed(&types, &TypeInner::Scalar(Scalar::BOOL), &u32_ty).is_err());
    }

    #[test]
    fn builtin_dot() {
        let types = UniqueArena::new();
        let v3 = vec(VectorSize::Tri, Scalar::F32);
        let result = builtin_result(&types, BuiltinFn::Dot, &[&v3, &v3]).unwrap();
        assert_eq!(result, TypeInner::Scalar(Scalar::F32));
    }

    #[test]
    fn builtin_select() {
        let types = UniqueArena::new();
        let f32_ty = TypeInner::Scalar(Scalar::F32);
        let bool_ty = TypeInner::Scalar(Scalar::BOOL);
        let result =
            builtin_result(&types, BuiltinFn::Select, &[&f32_ty, &f32_ty, &bool_ty]).unwrap();
        assert_eq!(result, f32_ty);

        // Component-wise select needs matching widths.
        let v2f = vec(VectorSize::Bi, Scalar::F32);
        let v3b = vec(VectorSize::Tri, Scalar::BOOL);
        assert!(builtin_result(&types, BuiltinFn::Select, &[&v2f, &v2f, &v3b]).is_err());
    }

    #[test]
    fn builtin_wrong_arity() {
        let types = UniqueArena::new();
        let f32_ty = TypeInner::Scalar(Scalar::F32);
        assert!(builtin_result(&types, BuiltinFn::Sqrt, &[&f32_ty, &f32_ty]).is_err());
    }
}
