//! Shader-IO and binding-point validation.
//!
//! Each builtin has a fixed table entry: the pipeline stages it is legal
//! in, whether it is an input or an output there, and the type it must
//! have. Binding points follow the address-space rules: resource spaces
//! require one, everything else must not have one.

use std::collections::HashMap;

use shade_ir::{
    ArraySize, BindingPoint, BuiltinValue, Handle, IoAttributes, Module, Op, Scalar, Stage, Type,
    TypeInner, ValueKind, VectorSize,
};

use crate::capabilities::Capabilities;
use crate::diag::{DiagKind, Diagnostic};

/// Whether an IO value flows into or out of the stage.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IoDirection {
    Input,
    Output,
}

impl std::fmt::Display for IoDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Output => "output",
        })
    }
}

fn is_u32(inner: &TypeInner) -> bool {
    *inner == TypeInner::Scalar(Scalar::U32)
}

fn is_bool(inner: &TypeInner) -> bool {
    *inner == TypeInner::Scalar(Scalar::BOOL)
}

fn is_f32(inner: &TypeInner) -> bool {
    *inner == TypeInner::Scalar(Scalar::F32)
}

fn is_vec4_f32(inner: &TypeInner) -> bool {
    *inner
        == TypeInner::Vector {
            size: VectorSize::Quad,
            scalar: Scalar::F32,
        }
}

fn is_vec3_u32(inner: &TypeInner) -> bool {
    *inner
        == TypeInner::Vector {
            size: VectorSize::Tri,
            scalar: Scalar::U32,
        }
}

/// Checks one builtin-decorated value against the builtin table.
///
/// `ty` is the declared type of the decorated value; errors are returned as
/// plain strings for the caller to wrap in a [`Diagnostic`].
pub fn check_builtin(
    module: &Module,
    caps: Capabilities,
    builtin: BuiltinValue,
    stage: Stage,
    direction: IoDirection,
    ty: &TypeInner,
) -> Result<(), String> {
    use BuiltinValue::*;
    use IoDirection::*;

    let stage_err = |allowed: &str| {
        Err(format!(
            "@builtin({builtin}) is not valid as a {stage} {direction}; it must be {allowed}"
        ))
    };
    let type_err = |expected: &str| {
        Err(format!(
            "@builtin({builtin}) must be {expected}, found {}",
            shade_ir::format_type_inner(ty, &module.types)
        ))
    };

    match builtin {
        Position => match (stage, direction) {
            (Stage::Vertex, Output) | (Stage::Fragment, Input) => {
                if is_vec4_f32(ty) {
                    Ok(())
                } else {
                    type_err("vec4<f32>")
                }
            }
            (Stage::Vertex, Input) => {
                Err("@builtin(position) must be an output for a vertex entry point".into())
            }
            _ => stage_err("a vertex output or a fragment input"),
        },
        FrontFacing => match (stage, direction) {
            (Stage::Fragment, Input) => {
                if is_bool(ty) {
                    Ok(())
                } else {
                    type_err("bool")
                }
            }
            _ => stage_err("a fragment input"),
        },
        VertexIndex | InstanceIndex => match (stage, direction) {
            (Stage::Vertex, Input) => {
                if is_u32(ty) {
                    Ok(())
                } else {
                    type_err("u32")
                }
            }
            _ => stage_err("a vertex input"),
        },
        FragDepth => match (stage, direction) {
            (Stage::Fragment, Output) => {
                if is_f32(ty) {
                    Ok(())
                } else {
                    type_err("f32")
                }
            }
            _ => stage_err("a fragment output"),
        },
        SampleIndex => match (stage, direction) {
            (Stage::Fragment, Input) => {
                if is_u32(ty) {
                    Ok(())
                } else {
                    type_err("u32")
                }
            }
            _ => stage_err("a fragment input"),
        },
        SampleMask => match stage {
            Stage::Fragment => {
                if is_u32(ty) {
                    Ok(())
                } else {
                    type_err("u32")
                }
            }
            _ => Err(format!(
                "@builtin(sample_mask) is only valid in a fragment entry point, not {stage}"
            )),
        },
        ClipDistances => match (stage, direction) {
            (Stage::Vertex, Output) => {
                let array_ok = match *ty {
                    TypeInner::Array {
                        base,
                        size: ArraySize::Constant(n),
                        ..
                    } => n <= 8 && is_f32(&module.types[base].inner),
                    _ => false,
                };
                let scalar_ok =
                    caps.contains(Capabilities::ALLOW_CLIP_DISTANCES_ON_F32) && is_f32(ty);
                if array_ok || scalar_ok {
                    Ok(())
                } else {
                    type_err("array<f32, N> with N <= 8")
                }
            }
            _ => stage_err("a vertex output"),
        },
        GlobalInvocationId | LocalInvocationId | WorkgroupId | NumWorkgroups => {
            match (stage, direction) {
                (Stage::Compute, Input) => {
                    if is_vec3_u32(ty) {
                        Ok(())
                    } else {
                        type_err("vec3<u32>")
                    }
                }
                _ => stage_err("a compute input"),
            }
        }
        LocalInvocationIndex => match (stage, direction) {
            (Stage::Compute, Input) => {
                if is_u32(ty) {
                    Ok(())
                } else {
                    type_err("u32")
                }
            }
            _ => stage_err("a compute input"),
        },
        SubgroupInvocationId | SubgroupSize => match (stage, direction) {
            (Stage::Compute | Stage::Fragment, Input) => {
                if is_u32(ty) {
                    Ok(())
                } else {
                    type_err("u32")
                }
            }
            _ => stage_err("a compute or fragment input"),
        },
    }
}

/// Checks one annotated leaf (parameter, return value, or struct member).
fn check_leaf(
    module: &Module,
    caps: Capabilities,
    stage: Stage,
    direction: IoDirection,
    attrs: &IoAttributes,
    ty: Handle<Type>,
    what: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let Some(ty_record) = module.types.try_get(ty) else {
        return; // reported by the structural pass
    };
    let count = attrs.annotation_count();
    if count != 1 {
        diags.push(Diagnostic {
            kind: DiagKind::Semantic,
            message: format!(
                "{what} must have exactly one IO annotation (binding point, location, or builtin), found {count}"
            ),
            inst: None,
        });
        return;
    }
    if let Some(builtin) = attrs.builtin {
        if let Err(message) =
            check_builtin(module, caps, builtin, stage, direction, &ty_record.inner)
        {
            diags.push(Diagnostic {
                kind: DiagKind::Semantic,
                message,
                inst: None,
            });
        }
        if attrs.invariant && builtin != BuiltinValue::Position {
            diags.push(Diagnostic {
                kind: DiagKind::Semantic,
                message: format!("@invariant is only valid on @builtin(position), not {builtin}"),
                inst: None,
            });
        }
    } else if attrs.invariant {
        diags.push(Diagnostic {
            kind: DiagKind::Semantic,
            message: "@invariant is only valid on @builtin(position)".into(),
            inst: None,
        });
    }
    if let Some(location) = attrs.location {
        let inner = &ty_record.inner;
        let numeric = matches!(
            inner,
            TypeInner::Scalar(s) | TypeInner::Vector { scalar: s, .. } if s.kind.is_numeric()
        );
        if !numeric {
            diags.push(Diagnostic {
                kind: DiagKind::Semantic,
                message: format!(
                    "@location({location}) {what} must be a numeric scalar or vector, found {}",
                    shade_ir::format_type_inner(inner, &module.types)
                ),
                inst: None,
            });
        }
    }
}

/// Walks one IO value: structs fan out per member, everything else is a
/// leaf checked directly.
fn check_io_value(
    module: &Module,
    caps: Capabilities,
    stage: Stage,
    direction: IoDirection,
    attrs: &IoAttributes,
    ty: Handle<Type>,
    what: &str,
    diags: &mut Vec<Diagnostic>,
) {
    let Some(ty_record) = module.types.try_get(ty) else {
        return; // reported by the structural pass
    };
    if let TypeInner::Struct { ref members, .. } = ty_record.inner {
        if !attrs.is_empty() {
            diags.push(Diagnostic {
                kind: DiagKind::Semantic,
                message: format!(
                    "{what} is a struct; IO annotations belong on its members, not the struct itself"
                ),
                inst: None,
            });
        }
        for (index, member) in members.iter().enumerate() {
            let name = member
                .name
                .clone()
                .unwrap_or_else(|| format!("member {index}"));
            check_leaf(
                module,
                caps,
                stage,
                direction,
                &member.attributes,
                member.ty,
                &format!("{what} {name}"),
                diags,
            );
        }
    } else {
        check_leaf(module, caps, stage, direction, attrs, ty, what, diags);
    }
}

/// Returns `true` if the value (or any struct member of it) carries the
/// given builtin.
fn carries_builtin(
    module: &Module,
    attrs: &IoAttributes,
    ty: Handle<Type>,
    builtin: BuiltinValue,
) -> bool {
    if attrs.builtin == Some(builtin) {
        return true;
    }
    if let Some(TypeInner::Struct { members, .. }) = module.types.try_get(ty).map(|t| &t.inner) {
        return members
            .iter()
            .any(|m| m.attributes.builtin == Some(builtin));
    }
    false
}

/// Validates the pipeline interface of every entry point.
pub fn check_entry_points(module: &Module, caps: Capabilities, diags: &mut Vec<Diagnostic>) {
    for (_, func) in module.entry_points() {
        let stage = func.stage.expect("entry points have a stage");
        let name = func.name.as_deref().unwrap_or("_");

        match stage {
            Stage::Compute => match func.workgroup_size {
                None => diags.push(Diagnostic {
                    kind: DiagKind::Semantic,
                    message: format!("compute entry point '{name}' is missing a workgroup size"),
                    inst: None,
                }),
                Some(size) => {
                    if size.iter().any(|&d| d == 0) {
                        diags.push(Diagnostic {
                            kind: DiagKind::Semantic,
                            message: format!(
                                "compute entry point '{name}' has a zero workgroup dimension: [{}, {}, {}]",
                                size[0], size[1], size[2]
                            ),
                            inst: None,
                        });
                    }
                }
            },
            Stage::Vertex | Stage::Fragment => {
                if func.workgroup_size.is_some() {
                    diags.push(Diagnostic {
                        kind: DiagKind::Semantic,
                        message: format!(
                            "{stage} entry point '{name}' must not declare a workgroup size"
                        ),
                        inst: None,
                    });
                }
            }
        }

        for &param in &func.params {
            let Some(value) = module.values.try_get(param) else {
                continue; // reported by the structural pass
            };
            let attrs = match value.kind {
                ValueKind::FunctionParam { ref attributes, .. } => attributes,
                _ => continue, // ownership mismatch is reported by the structural pass
            };
            let what = match module.name_of(param) {
                Some(pname) => format!("parameter '{pname}' of entry point '{name}'"),
                None => format!("parameter of entry point '{name}'"),
            };
            check_io_value(
                module,
                caps,
                stage,
                IoDirection::Input,
                attrs,
                value.ty,
                &what,
                diags,
            );
        }

        if let Some(return_type) = func.return_type {
            check_io_value(
                module,
                caps,
                stage,
                IoDirection::Output,
                &func.return_attributes,
                return_type,
                &format!("return value of entry point '{name}'"),
                diags,
            );
        }

        // A vertex shader that never produces a position is not drawable.
        if stage == Stage::Vertex {
            let has_position = func.return_type.is_some_and(|ty| {
                carries_builtin(module, &func.return_attributes, ty, BuiltinValue::Position)
            });
            if !has_position {
                diags.push(Diagnostic {
                    kind: DiagKind::Semantic,
                    message: format!(
                        "vertex entry point '{name}' must output @builtin(position)"
                    ),
                    inst: None,
                });
            }
        }
    }
}

/// Validates binding points on module-scope variables.
pub fn check_bindings(module: &Module, caps: Capabilities, diags: &mut Vec<Diagnostic>) {
    let mut seen: HashMap<BindingPoint, String> = HashMap::new();

    let Some(root) = module.blocks.try_get(module.root_block) else {
        return;
    };
    for &inst in &root.insts {
        let Some(record) = module.instructions.try_get(inst) else {
            continue; // reported by the structural pass
        };
        let Op::Var { binding_point, .. } = record.op else {
            continue;
        };
        let Some(&result) = record.results.first() else {
            continue;
        };
        let name = module.name_of(result).unwrap_or("_").to_string();
        let space = match module
            .values
            .try_get(result)
            .and_then(|value| module.types.try_get(value.ty))
            .map(|ty| &ty.inner)
        {
            Some(TypeInner::Pointer { space, .. } | TypeInner::Reference { space, .. }) => *space,
            _ => continue, // non-pointer var results are reported by the semantic pass
        };

        let binding_required = match space {
            shade_ir::AddressSpace::Storage | shade_ir::AddressSpace::Uniform => true,
            shade_ir::AddressSpace::Handle => {
                !caps.contains(Capabilities::ALLOW_HANDLE_VARS_WITHOUT_BINDINGS)
            }
            _ => false,
        };

        match binding_point {
            None if binding_required => diags.push(Diagnostic {
                kind: DiagKind::Semantic,
                message: format!("var '{name}' in the {space} address space is missing a binding point"),
                inst: Some(inst),
            }),
            Some(_) if !space.is_resource() => diags.push(Diagnostic {
                kind: DiagKind::Semantic,
                message: format!(
                    "var '{name}' in the {space} address space must not have a binding point"
                ),
                inst: Some(inst),
            }),
            Some(bp) => {
                if let Some(previous) = seen.insert(bp, name.clone()) {
                    if !caps.contains(Capabilities::ALLOW_DUPLICATE_BINDINGS) {
                        diags.push(Diagnostic {
                            kind: DiagKind::Semantic,
                            message: format!(
                                "var '{name}' reuses {bp}, already bound by '{previous}'"
                            ),
                            inst: Some(inst),
                        });
                    }
                }
            }
            None => {}
        }
    }
}
