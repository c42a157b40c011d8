//! Module encoding.
//!
//! A single forward pass over the module. Every entity is memoized by
//! identity into a dense 1-based id the first time it is encountered;
//! later references are the bare integer. Struct types are pre-registered
//! so their definitions serialize before first use, and function slots are
//! pre-allocated so calls can reference a callee before its body is
//! encoded. Hard-limit violations are collected and surfaced as one
//! aggregate error instead of aborting the traversal.

use std::collections::HashMap;

use prost::Message;
use shade_ir::{
    Block, CaseSelector, ConstantValue, Function, Handle, Instruction, IoAttributes, Module, Op,
    ScalarValue, Type, TypeInner, Value, ValueKind,
};

use crate::codes;
use crate::proto::{self, type_proto, constant_value_proto};

/// Hard ceiling on constant array element counts accepted by the encoder.
pub const MAX_ARRAY_ELEMENTS: u32 = 65_536;
/// Hard ceiling on splat repeat counts accepted by the encoder.
pub const MAX_SPLAT_COUNT: u32 = 32_768;

/// The aggregate failure of an `encode` call.
#[derive(Debug, thiserror::Error)]
#[error("encoding failed: {message}")]
pub struct EncodeError {
    pub message: String,
}

/// Encodes a module into its wire format.
pub fn encode(module: &Module) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = Encoder::new(module);
    encoder.run();
    if encoder.errors.is_empty() {
        Ok(encoder.proto.encode_to_vec())
    } else {
        log::debug!("encode failed with {} error(s)", encoder.errors.len());
        Err(EncodeError {
            message: encoder.errors.join("; "),
        })
    }
}

struct Encoder<'a> {
    module: &'a Module,
    proto: proto::ModuleProto,
    type_ids: HashMap<Handle<Type>, u32>,
    types_in_progress: Vec<Handle<Type>>,
    const_ids: HashMap<Handle<ConstantValue>, u32>,
    value_ids: HashMap<Handle<Value>, u32>,
    block_ids: HashMap<Handle<Block>, u32>,
    inst_ids: HashMap<Handle<Instruction>, u32>,
    func_ids: HashMap<Handle<Function>, u32>,
    errors: Vec<String>,
}

impl<'a> Encoder<'a> {
    fn new(module: &'a Module) -> Self {
        Self {
            module,
            proto: proto::ModuleProto::default(),
            type_ids: HashMap::new(),
            types_in_progress: Vec::new(),
            const_ids: HashMap::new(),
            value_ids: HashMap::new(),
            block_ids: HashMap::new(),
            inst_ids: HashMap::new(),
            func_ids: HashMap::new(),
            errors: Vec::new(),
        }
    }

    fn run(&mut self) {
        // Struct definitions serialize before first use, independent of
        // discovery order; required for stable round-trips.
        for (handle, ty) in self.module.types.iter() {
            if matches!(ty.inner, TypeInner::Struct { .. }) {
                self.type_id(handle);
            }
        }

        // Function slots first, so call payloads can reference callees
        // whose bodies encode later.
        for (handle, _) in self.module.functions.iter() {
            let id = self.proto.functions.len() as u32 + 1;
            self.func_ids.insert(handle, id);
            self.proto.functions.push(proto::FunctionProto::default());
        }
        for (handle, _) in self.module.functions.iter() {
            let record = self.encode_function(handle);
            let slot = self.func_ids[&handle] as usize - 1;
            self.proto.functions[slot] = record;
        }

        // The root block is encoded last at the top level, via the normal
        // block encoder (and so may already be memoized).
        self.proto.root_block = self.block_id(self.module.root_block);

        // Debug names, in deterministic handle order.
        let mut named: Vec<_> = self.module.names.iter().collect();
        named.sort_by_key(|(value, _)| **value);
        for (&value, name) in named {
            let id = self.value_id(value);
            self.proto.names.push(proto::NameProto {
                value: id,
                name: name.clone(),
            });
        }
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn type_id(&mut self, handle: Handle<Type>) -> u32 {
        if let Some(&id) = self.type_ids.get(&handle) {
            return id;
        }
        let Some(ty) = self.module.types.try_get(handle) else {
            self.fail(format!("type handle {handle:?} is out of bounds"));
            return 0;
        };
        if self.types_in_progress.contains(&handle) {
            self.fail(format!("type {handle:?} is cyclic"));
            return 0;
        }
        self.types_in_progress.push(handle);

        let inner = match ty.inner {
            TypeInner::Scalar(s) => type_proto::Inner::Scalar(proto::ScalarTypeProto {
                kind: codes::scalar_kind_code(s.kind),
                width: u32::from(s.width),
            }),
            TypeInner::Vector { size, scalar } => {
                type_proto::Inner::Vector(proto::VectorTypeProto {
                    size: size as u32,
                    kind: codes::scalar_kind_code(scalar.kind),
                    width: u32::from(scalar.width),
                })
            }
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            } => type_proto::Inner::Matrix(proto::MatrixTypeProto {
                columns: columns as u32,
                rows: rows as u32,
                kind: codes::scalar_kind_code(scalar.kind),
                width: u32::from(scalar.width),
            }),
            TypeInner::Atomic(s) => type_proto::Inner::Atomic(proto::ScalarTypeProto {
                kind: codes::scalar_kind_code(s.kind),
                width: u32::from(s.width),
            }),
            TypeInner::Array { base, size, stride } => {
                let (runtime_sized, count) = match size {
                    shade_ir::ArraySize::Constant(count) => {
                        if count > MAX_ARRAY_ELEMENTS {
                            self.fail(format!(
                                "array element count {count} exceeds the limit of {MAX_ARRAY_ELEMENTS}"
                            ));
                        }
                        (false, count)
                    }
                    shade_ir::ArraySize::Dynamic => (true, 0),
                };
                type_proto::Inner::Array(proto::ArrayTypeProto {
                    base: self.type_id(base),
                    runtime_sized,
                    count,
                    stride,
                })
            }
            TypeInner::Struct { ref members, span } => {
                let members = members
                    .iter()
                    .map(|member| proto::StructMemberProto {
                        name: member.name.clone(),
                        ty: self.type_id(member.ty),
                        offset: member.offset,
                        attributes: self.encode_attributes(&member.attributes),
                    })
                    .collect();
                type_proto::Inner::Struct(proto::StructTypeProto { members, span })
            }
            TypeInner::Pointer {
                base,
                space,
                access,
            } => type_proto::Inner::Pointer(proto::PointerTypeProto {
                base: self.type_id(base),
                space: codes::address_space_code(space),
                access: access.bits(),
            }),
            TypeInner::Reference {
                base,
                space,
                access,
            } => type_proto::Inner::Reference(proto::PointerTypeProto {
                base: self.type_id(base),
                space: codes::address_space_code(space),
                access: access.bits(),
            }),
            TypeInner::Sampler { comparison } => {
                type_proto::Inner::Sampler(proto::SamplerTypeProto { comparison })
            }
            TypeInner::Texture {
                dim,
                arrayed,
                class,
            } => {
                let mut record = proto::TextureTypeProto {
                    dim: codes::texture_dim_code(dim),
                    arrayed,
                    ..Default::default()
                };
                match class {
                    shade_ir::TextureClass::Sampled {
                        scalar,
                        multisampled,
                    } => {
                        record.class = proto::texture_class::SAMPLED;
                        record.kind = codes::scalar_kind_code(scalar.kind);
                        record.width = u32::from(scalar.width);
                        record.multisampled = multisampled;
                    }
                    shade_ir::TextureClass::Depth { multisampled } => {
                        record.class = proto::texture_class::DEPTH;
                        record.multisampled = multisampled;
                    }
                    shade_ir::TextureClass::Storage { format, access } => {
                        record.class = proto::texture_class::STORAGE;
                        record.format = codes::texel_format_code(format);
                        record.access = access.bits();
                    }
                }
                type_proto::Inner::Texture(record)
            }
            TypeInner::SubgroupMatrix {
                kind,
                scalar,
                columns,
                rows,
            } => type_proto::Inner::SubgroupMatrix(proto::SubgroupMatrixTypeProto {
                kind: codes::subgroup_matrix_kind_code(kind),
                scalar_kind: codes::scalar_kind_code(scalar.kind),
                width: u32::from(scalar.width),
                columns,
                rows,
            }),
        };

        self.types_in_progress.pop();
        let id = self.proto.types.len() as u32 + 1;
        self.type_ids.insert(handle, id);
        self.proto.types.push(proto::TypeProto {
            name: ty.name.clone(),
            inner: Some(inner),
        });
        id
    }

    // ------------------------------------------------------------------
    // Constants
    // ------------------------------------------------------------------

    fn const_id(&mut self, handle: Handle<ConstantValue>) -> u32 {
        if let Some(&id) = self.const_ids.get(&handle) {
            return id;
        }
        let Some(constant) = self.module.constants.try_get(handle) else {
            self.fail(format!("constant handle {handle:?} is out of bounds"));
            return 0;
        };
        let (ty, kind) = match *constant {
            ConstantValue::Scalar { ty, value } => {
                let kind = match value {
                    ScalarValue::Bool(v) => constant_value_proto::Kind::Bool(v),
                    ScalarValue::I32(v) => constant_value_proto::Kind::I32(v),
                    ScalarValue::U32(v) => constant_value_proto::Kind::U32(v),
                    ScalarValue::F32(v) => constant_value_proto::Kind::F32(v),
                    ScalarValue::F16(v) => {
                        constant_value_proto::Kind::F16Bits(u32::from(v.to_bits()))
                    }
                };
                (ty, kind)
            }
            ConstantValue::Composite { ty, ref elements } => {
                let elements = elements.iter().map(|&e| self.const_id(e)).collect();
                (
                    ty,
                    constant_value_proto::Kind::Composite(proto::CompositeProto { elements }),
                )
            }
            ConstantValue::Splat { ty, value, count } => {
                if count > MAX_SPLAT_COUNT {
                    self.fail(format!(
                        "splat repeat count {count} exceeds the limit of {MAX_SPLAT_COUNT}"
                    ));
                }
                (
                    ty,
                    constant_value_proto::Kind::Splat(proto::SplatProto {
                        value: self.const_id(value),
                        count,
                    }),
                )
            }
        };
        let ty = self.type_id(ty);
        let id = self.proto.constant_values.len() as u32 + 1;
        self.const_ids.insert(handle, id);
        self.proto.constant_values.push(proto::ConstantValueProto {
            ty,
            kind: Some(kind),
        });
        id
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    fn value_id(&mut self, handle: Handle<Value>) -> u32 {
        if let Some(&id) = self.value_ids.get(&handle) {
            return id;
        }
        let Some(value) = self.module.values.try_get(handle) else {
            self.fail(format!("value handle {handle:?} is out of bounds"));
            return 0;
        };

        // Assign the slot before resolving back-references so reentrant
        // lookups see the memoized id.
        let id = self.proto.values.len() as u32 + 1;
        self.value_ids.insert(handle, id);
        self.proto.values.push(proto::ValueProto::default());

        let mut record = proto::ValueProto {
            ty: self.type_id(value.ty),
            ..Default::default()
        };
        match value.kind {
            ValueKind::Constant { value: constant } => {
                record.kind = proto::value_kind::CONSTANT;
                record.constant = self.const_id(constant);
            }
            ValueKind::InstructionResult { inst } => {
                record.kind = proto::value_kind::INSTRUCTION_RESULT;
                match inst {
                    Some(inst) => record.instruction = self.inst_id(inst),
                    None => self.fail(format!(
                        "value {handle:?} is a result that was never attached to an instruction"
                    )),
                }
            }
            ValueKind::FunctionParam {
                func,
                ref attributes,
            } => {
                record.kind = proto::value_kind::FUNCTION_PARAM;
                match self.func_ids.get(&func) {
                    Some(&id) => record.function = id,
                    None => self.fail(format!(
                        "value {handle:?} references a function outside the module"
                    )),
                }
                record.attributes = self.encode_attributes(attributes);
            }
            ValueKind::BlockParam { block } => {
                record.kind = proto::value_kind::BLOCK_PARAM;
                record.block = self.block_id(block);
            }
        }
        self.proto.values[id as usize - 1] = record;
        id
    }

    fn encode_attributes(&mut self, attrs: &IoAttributes) -> Option<proto::IoAttributesProto> {
        if attrs.is_empty() {
            return None;
        }
        let (interpolation_type, interpolation_sampling) = match attrs.interpolation {
            Some(interpolation) => {
                let (ty, sampling) = codes::interpolation_to_proto(interpolation);
                (Some(ty), sampling)
            }
            None => (None, None),
        };
        Some(proto::IoAttributesProto {
            binding_point: attrs.binding_point.map(|bp| proto::BindingPointProto {
                group: bp.group,
                binding: bp.binding,
            }),
            location: attrs.location,
            color: attrs.color,
            builtin: attrs.builtin.map(codes::builtin_value_code),
            interpolation_type,
            interpolation_sampling,
            invariant: attrs.invariant,
            input_attachment_index: attrs.input_attachment_index,
        })
    }

    // ------------------------------------------------------------------
    // Blocks and instructions
    // ------------------------------------------------------------------

    fn block_id(&mut self, handle: Handle<Block>) -> u32 {
        if let Some(&id) = self.block_ids.get(&handle) {
            return id;
        }
        let Some(block) = self.module.blocks.try_get(handle) else {
            self.fail(format!("block handle {handle:?} is out of bounds"));
            return 0;
        };

        let id = self.proto.blocks.len() as u32 + 1;
        self.block_ids.insert(handle, id);
        self.proto.blocks.push(proto::BlockProto::default());

        let record = proto::BlockProto {
            params: block.params.iter().map(|&p| self.value_id(p)).collect(),
            instructions: block.insts.iter().map(|&i| self.inst_id(i)).collect(),
        };
        self.proto.blocks[id as usize - 1] = record;
        id
    }

    fn inst_id(&mut self, handle: Handle<Instruction>) -> u32 {
        if let Some(&id) = self.inst_ids.get(&handle) {
            return id;
        }
        let Some(inst) = self.module.instructions.try_get(handle) else {
            self.fail(format!("instruction handle {handle:?} is out of bounds"));
            return 0;
        };

        let id = self.proto.instructions.len() as u32 + 1;
        self.inst_ids.insert(handle, id);
        self.proto.instructions.push(proto::InstructionProto::default());

        let mut record = proto::InstructionProto {
            operands: inst.operands.iter().map(|&o| self.value_id(o)).collect(),
            results: inst.results.iter().map(|&r| self.value_id(r)).collect(),
            ..Default::default()
        };
        self.encode_op(&inst.op, &mut record);
        self.proto.instructions[id as usize - 1] = record;
        id
    }

    fn encode_op(&mut self, op: &Op, record: &mut proto::InstructionProto) {
        use proto::inst_kind;
        match *op {
            Op::Binary { op } => {
                record.kind = inst_kind::BINARY;
                record.binary_op = codes::binary_op_code(op);
            }
            Op::Unary { op } => {
                record.kind = inst_kind::UNARY;
                record.unary_op = codes::unary_op_code(op);
            }
            Op::Access => record.kind = inst_kind::ACCESS,
            Op::Bitcast => record.kind = inst_kind::BITCAST,
            Op::BreakIf { loop_ } => {
                record.kind = inst_kind::BREAK_IF;
                record.target = self.inst_id(loop_);
            }
            Op::Construct => record.kind = inst_kind::CONSTRUCT,
            Op::Continue { loop_ } => {
                record.kind = inst_kind::CONTINUE;
                record.target = self.inst_id(loop_);
            }
            Op::Convert => record.kind = inst_kind::CONVERT,
            Op::BuiltinCall { builtin } => {
                record.kind = inst_kind::BUILTIN_CALL;
                record.builtin = codes::builtin_fn_code(builtin);
            }
            Op::Discard => record.kind = inst_kind::DISCARD,
            Op::ExitIf { if_ } => {
                record.kind = inst_kind::EXIT_IF;
                record.target = self.inst_id(if_);
            }
            Op::ExitLoop { loop_ } => {
                record.kind = inst_kind::EXIT_LOOP;
                record.target = self.inst_id(loop_);
            }
            Op::ExitSwitch { switch } => {
                record.kind = inst_kind::EXIT_SWITCH;
                record.target = self.inst_id(switch);
            }
            Op::If {
                true_block,
                false_block,
            } => {
                record.kind = inst_kind::IF;
                record.true_block = self.block_id(true_block);
                record.false_block = self.block_id(false_block);
            }
            Op::Let => record.kind = inst_kind::LET,
            Op::Load => record.kind = inst_kind::LOAD,
            Op::LoadVectorElement => record.kind = inst_kind::LOAD_VECTOR_ELEMENT,
            Op::Loop {
                initializer,
                body,
                continuing,
            } => {
                record.kind = inst_kind::LOOP;
                record.initializer = initializer.map_or(0, |b| self.block_id(b));
                record.body = self.block_id(body);
                record.continuing = continuing.map_or(0, |b| self.block_id(b));
            }
            Op::NextIteration { loop_ } => {
                record.kind = inst_kind::NEXT_ITERATION;
                record.target = self.inst_id(loop_);
            }
            Op::Override { override_id } => {
                record.kind = inst_kind::OVERRIDE;
                record.override_id = override_id.map(u32::from);
            }
            Op::Phony => record.kind = inst_kind::PHONY,
            Op::Return { func } => {
                record.kind = inst_kind::RETURN;
                record.function = self.func_ids.get(&func).copied().unwrap_or_else(|| {
                    self.fail("return references a function outside the module");
                    0
                });
            }
            Op::Store => record.kind = inst_kind::STORE,
            Op::StoreVectorElement => record.kind = inst_kind::STORE_VECTOR_ELEMENT,
            Op::Swizzle { ref indices } => {
                record.kind = inst_kind::SWIZZLE;
                record.indices = indices.clone();
            }
            Op::Switch { ref cases } => {
                record.kind = inst_kind::SWITCH;
                record.cases = cases
                    .iter()
                    .map(|case| proto::SwitchCaseProto {
                        selectors: case
                            .selectors
                            .iter()
                            .map(|selector| match *selector {
                                CaseSelector::Default => proto::CaseSelectorProto {
                                    is_default: true,
                                    value: 0,
                                },
                                CaseSelector::Value(constant) => proto::CaseSelectorProto {
                                    is_default: false,
                                    value: self.const_id(constant),
                                },
                            })
                            .collect(),
                        block: self.block_id(case.block),
                    })
                    .collect();
            }
            Op::Unreachable => record.kind = inst_kind::UNREACHABLE,
            Op::UserCall { func } => {
                record.kind = inst_kind::USER_CALL;
                record.function = self.func_ids.get(&func).copied().unwrap_or_else(|| {
                    self.fail("call references a function outside the module");
                    0
                });
            }
            Op::Var {
                binding_point,
                input_attachment_index,
            } => {
                record.kind = inst_kind::VAR;
                record.binding_point = binding_point.map(|bp| proto::BindingPointProto {
                    group: bp.group,
                    binding: bp.binding,
                });
                record.input_attachment_index = input_attachment_index;
            }
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn encode_function(&mut self, handle: Handle<Function>) -> proto::FunctionProto {
        let func = &self.module.functions[handle];
        let block = match func.block {
            Some(block) => self.block_id(block),
            None => {
                self.fail(format!(
                    "function '{}' has no body block",
                    func.name.as_deref().unwrap_or("_")
                ));
                0
            }
        };
        proto::FunctionProto {
            name: func.name.clone(),
            params: func.params.iter().map(|&p| self.value_id(p)).collect(),
            return_type: func.return_type.map_or(0, |ty| self.type_id(ty)),
            return_attributes: self.encode_attributes(&func.return_attributes),
            stage: codes::stage_code(func.stage),
            workgroup_size: func
                .workgroup_size
                .map_or_else(Vec::new, |size| size.to_vec()),
            block,
        }
    }
}
