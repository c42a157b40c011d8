//! Module decoding — the structural inverse of encoding.
//!
//! Every index read from the wire is bounds-checked; malformed input is a
//! decode error, never a panic. Decoding rebuilds the derived state the
//! wire format omits (usage records, block ownership back-references), so
//! a decoded module validates exactly like the module that was encoded.

use half::f16;
use prost::Message;
use shade_ir::{
    Block, BlockOwner, CaseSelector, ConstantValue, Function, Handle, Instruction, Interpolation,
    IoAttributes, IrError, Module, Op, ScalarValue, SwitchCase, Type, TypeInner, Value, ValueKind,
};

use crate::codes;
use crate::proto::{self, constant_value_proto, type_proto};

/// Why a byte stream could not be decoded into a module.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The protobuf layer rejected the bytes.
    #[error(transparent)]
    Proto(#[from] prost::DecodeError),

    /// An index field points outside its table.
    #[error("{what} index {index} is out of bounds (table size: {len})")]
    BadIndex {
        what: &'static str,
        index: u32,
        len: usize,
    },

    /// A structurally invalid record.
    #[error("malformed module: {0}")]
    Malformed(String),

    /// The constant store rejected a composite or splat.
    #[error(transparent)]
    Ir(#[from] IrError),
}

fn malformed(message: impl Into<String>) -> DecodeError {
    DecodeError::Malformed(message.into())
}

/// Decodes a wire-format module.
pub fn decode(bytes: &[u8]) -> Result<Module, DecodeError> {
    let proto = proto::ModuleProto::decode(bytes)?;
    Decoder::new(proto).run()
}

struct Decoder {
    proto: proto::ModuleProto,
    module: Module,
    types: Vec<Handle<Type>>,
    consts: Vec<Handle<ConstantValue>>,
    values: Vec<Handle<Value>>,
    blocks: Vec<Handle<Block>>,
    insts: Vec<Handle<Instruction>>,
    funcs: Vec<Handle<Function>>,
}

impl Decoder {
    fn new(proto: proto::ModuleProto) -> Self {
        Self {
            proto,
            module: Module::new(),
            types: Vec::new(),
            consts: Vec::new(),
            values: Vec::new(),
            blocks: Vec::new(),
            insts: Vec::new(),
            funcs: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Module, DecodeError> {
        self.decode_types()?;
        self.decode_constants()?;
        self.create_stubs()?;
        self.decode_values()?;
        self.decode_instructions()?;
        self.decode_blocks()?;
        self.decode_functions()?;
        self.decode_names()?;
        Ok(self.module)
    }

    // ------------------------------------------------------------------
    // Lookup helpers. All wire indices are 1-based; 0 means "absent" and
    // is only legal where the caller explicitly allows it.
    // ------------------------------------------------------------------

    fn type_at(&self, index: u32) -> Result<Handle<Type>, DecodeError> {
        lookup("type", &self.types, index)
    }

    fn const_at(&self, index: u32) -> Result<Handle<ConstantValue>, DecodeError> {
        lookup("constant", &self.consts, index)
    }

    fn value_at(&self, index: u32) -> Result<Handle<Value>, DecodeError> {
        lookup("value", &self.values, index)
    }

    fn block_at(&self, index: u32) -> Result<Handle<Block>, DecodeError> {
        lookup("block", &self.blocks, index)
    }

    fn inst_at(&self, index: u32) -> Result<Handle<Instruction>, DecodeError> {
        lookup("instruction", &self.insts, index)
    }

    fn func_at(&self, index: u32) -> Result<Handle<Function>, DecodeError> {
        lookup("function", &self.funcs, index)
    }

    // ------------------------------------------------------------------
    // Passes
    // ------------------------------------------------------------------

    /// Types decode in table order; every reference must point backward,
    /// which the encoder's child-first registration guarantees.
    fn decode_types(&mut self) -> Result<(), DecodeError> {
        for index in 0..self.proto.types.len() {
            let record = self.proto.types[index].clone();
            let inner = record
                .inner
                .ok_or_else(|| malformed(format!("type {} has no payload", index + 1)))?;
            let inner = self.decode_type_inner(inner)?;
            let handle = self.module.types.insert(Type {
                name: record.name,
                inner,
            });
            self.types.push(handle);
        }
        Ok(())
    }

    fn decode_type_inner(&mut self, inner: type_proto::Inner) -> Result<TypeInner, DecodeError> {
        Ok(match inner {
            type_proto::Inner::Scalar(s) => TypeInner::Scalar(decode_scalar(s.kind, s.width)?),
            type_proto::Inner::Vector(v) => TypeInner::Vector {
                size: decode_vector_size(v.size)?,
                scalar: decode_scalar(v.kind, v.width)?,
            },
            type_proto::Inner::Matrix(m) => TypeInner::Matrix {
                columns: decode_vector_size(m.columns)?,
                rows: decode_vector_size(m.rows)?,
                scalar: decode_scalar(m.kind, m.width)?,
            },
            type_proto::Inner::Atomic(s) => TypeInner::Atomic(decode_scalar(s.kind, s.width)?),
            type_proto::Inner::Array(a) => TypeInner::Array {
                base: self.type_at(a.base)?,
                size: if a.runtime_sized {
                    shade_ir::ArraySize::Dynamic
                } else {
                    shade_ir::ArraySize::Constant(a.count)
                },
                stride: a.stride,
            },
            type_proto::Inner::Struct(s) => {
                let mut members = Vec::with_capacity(s.members.len());
                for member in s.members {
                    members.push(shade_ir::StructMember {
                        name: member.name,
                        ty: self.type_at(member.ty)?,
                        offset: member.offset,
                        attributes: decode_attributes(member.attributes)?,
                    });
                }
                TypeInner::Struct {
                    members,
                    span: s.span,
                }
            }
            type_proto::Inner::Pointer(p) => TypeInner::Pointer {
                base: self.type_at(p.base)?,
                space: codes::address_space_from(p.space)
                    .ok_or_else(|| malformed(format!("unknown address space code {}", p.space)))?,
                access: codes::access_from(p.access)
                    .ok_or_else(|| malformed(format!("unknown access bits {}", p.access)))?,
            },
            type_proto::Inner::Reference(r) => TypeInner::Reference {
                base: self.type_at(r.base)?,
                space: codes::address_space_from(r.space)
                    .ok_or_else(|| malformed(format!("unknown address space code {}", r.space)))?,
                access: codes::access_from(r.access)
                    .ok_or_else(|| malformed(format!("unknown access bits {}", r.access)))?,
            },
            type_proto::Inner::Sampler(s) => TypeInner::Sampler {
                comparison: s.comparison,
            },
            type_proto::Inner::Texture(t) => {
                let dim = codes::texture_dim_from(t.dim)
                    .ok_or_else(|| malformed(format!("unknown texture dimension code {}", t.dim)))?;
                let class = match t.class {
                    proto::texture_class::SAMPLED => shade_ir::TextureClass::Sampled {
                        scalar: decode_scalar(t.kind, t.width)?,
                        multisampled: t.multisampled,
                    },
                    proto::texture_class::DEPTH => shade_ir::TextureClass::Depth {
                        multisampled: t.multisampled,
                    },
                    proto::texture_class::STORAGE => shade_ir::TextureClass::Storage {
                        format: codes::texel_format_from(t.format).ok_or_else(|| {
                            malformed(format!("unknown texel format code {}", t.format))
                        })?,
                        access: codes::access_from(t.access)
                            .ok_or_else(|| malformed(format!("unknown access bits {}", t.access)))?,
                    },
                    other => return Err(malformed(format!("unknown texture class code {other}"))),
                };
                TypeInner::Texture {
                    dim,
                    arrayed: t.arrayed,
                    class,
                }
            }
            type_proto::Inner::SubgroupMatrix(m) => TypeInner::SubgroupMatrix {
                kind: codes::subgroup_matrix_kind_from(m.kind).ok_or_else(|| {
                    malformed(format!("unknown subgroup matrix kind code {}", m.kind))
                })?,
                scalar: decode_scalar(m.scalar_kind, m.width)?,
                columns: m.columns,
                rows: m.rows,
            },
        })
    }

    fn decode_constants(&mut self) -> Result<(), DecodeError> {
        for index in 0..self.proto.constant_values.len() {
            let record = self.proto.constant_values[index].clone();
            let ty = self.type_at(record.ty)?;
            let kind = record
                .kind
                .ok_or_else(|| malformed(format!("constant {} has no payload", index + 1)))?;
            let handle = match kind {
                constant_value_proto::Kind::Bool(v) => {
                    self.decode_scalar_constant(ty, ScalarValue::Bool(v))?
                }
                constant_value_proto::Kind::I32(v) => {
                    self.decode_scalar_constant(ty, ScalarValue::I32(v))?
                }
                constant_value_proto::Kind::U32(v) => {
                    self.decode_scalar_constant(ty, ScalarValue::U32(v))?
                }
                constant_value_proto::Kind::F32(v) => {
                    self.decode_scalar_constant(ty, ScalarValue::F32(v))?
                }
                constant_value_proto::Kind::F16Bits(bits) => {
                    let bits = u16::try_from(bits)
                        .map_err(|_| malformed(format!("f16 bit pattern {bits} exceeds 16 bits")))?;
                    self.decode_scalar_constant(ty, ScalarValue::F16(f16::from_bits(bits)))?
                }
                constant_value_proto::Kind::Composite(composite) => {
                    let mut elements = Vec::with_capacity(composite.elements.len());
                    for element in composite.elements {
                        elements.push(self.const_at(element)?);
                    }
                    self.module
                        .constants
                        .composite(&self.module.types, ty, elements)?
                }
                constant_value_proto::Kind::Splat(splat) => {
                    let value = self.const_at(splat.value)?;
                    self.module
                        .constants
                        .splat(&self.module.types, ty, value, splat.count)?
                }
            };
            self.consts.push(handle);
        }
        Ok(())
    }

    fn decode_scalar_constant(
        &mut self,
        ty: Handle<Type>,
        value: ScalarValue,
    ) -> Result<Handle<ConstantValue>, DecodeError> {
        if self.module.types[ty].inner != TypeInner::Scalar(value.scalar()) {
            return Err(malformed(format!(
                "scalar constant {value} disagrees with its declared type"
            )));
        }
        Ok(self.module.constants.scalar(ty, value))
    }

    /// Blocks, functions, and instructions get stub entries first so that
    /// back-references resolve regardless of table order. The module's
    /// pre-made root block is reused for the wire root block.
    fn create_stubs(&mut self) -> Result<(), DecodeError> {
        let root = self.proto.root_block;
        if root == 0 || root as usize > self.proto.blocks.len() {
            return Err(malformed(format!(
                "root block index {root} is not a valid block"
            )));
        }
        for index in 0..self.proto.blocks.len() {
            if index as u32 + 1 == root {
                self.blocks.push(self.module.root_block);
            } else {
                self.blocks.push(self.module.blocks.append(Block::new()));
            }
        }
        for _ in 0..self.proto.functions.len() {
            self.funcs.push(self.module.functions.append(Function {
                name: None,
                params: Vec::new(),
                return_type: None,
                return_attributes: IoAttributes::default(),
                stage: None,
                workgroup_size: None,
                block: None,
            }));
        }
        for _ in 0..self.proto.instructions.len() {
            self.insts
                .push(self.module.instructions.append(Instruction::nullary(Op::Unreachable)));
        }
        Ok(())
    }

    fn decode_values(&mut self) -> Result<(), DecodeError> {
        for index in 0..self.proto.values.len() {
            let record = self.proto.values[index].clone();
            let ty = self.type_at(record.ty)?;
            let kind = match record.kind {
                proto::value_kind::CONSTANT => ValueKind::Constant {
                    value: self.const_at(record.constant)?,
                },
                proto::value_kind::INSTRUCTION_RESULT => ValueKind::InstructionResult {
                    inst: if record.instruction == 0 {
                        None
                    } else {
                        Some(self.inst_at(record.instruction)?)
                    },
                },
                proto::value_kind::FUNCTION_PARAM => ValueKind::FunctionParam {
                    func: self.func_at(record.function)?,
                    attributes: decode_attributes(record.attributes)?,
                },
                proto::value_kind::BLOCK_PARAM => ValueKind::BlockParam {
                    block: self.block_at(record.block)?,
                },
                other => return Err(malformed(format!("unknown value kind code {other}"))),
            };
            self.values.push(self.module.values.append(Value::new(kind, ty)));
        }
        Ok(())
    }

    fn decode_instructions(&mut self) -> Result<(), DecodeError> {
        for index in 0..self.proto.instructions.len() {
            let record = self.proto.instructions[index].clone();
            let handle = self.insts[index];

            let op = self.decode_op(&record, index)?;
            let mut operands = Vec::with_capacity(record.operands.len());
            for operand in &record.operands {
                operands.push(self.value_at(*operand)?);
            }
            let mut results = Vec::with_capacity(record.results.len());
            for result in &record.results {
                results.push(self.value_at(*result)?);
            }

            // Child blocks learn their owner from the control payload.
            for child in op.child_blocks() {
                self.module.blocks[child].owner = Some(BlockOwner::Instruction(handle));
            }
            // Usage records are derived state, rebuilt rather than carried.
            for (slot, &operand) in operands.iter().enumerate() {
                self.module.values[operand].add_use(handle, slot as u32);
            }

            let inst = &mut self.module.instructions[handle];
            inst.op = op;
            inst.operands = operands;
            inst.results = results;
        }
        Ok(())
    }

    fn decode_op(
        &mut self,
        record: &proto::InstructionProto,
        index: usize,
    ) -> Result<Op, DecodeError> {
        use proto::inst_kind;

        let target = |decoder: &Self| decoder.inst_at(record.target);
        Ok(match record.kind {
            inst_kind::BINARY => Op::Binary {
                op: codes::binary_op_from(record.binary_op).ok_or_else(|| {
                    malformed(format!("unknown binary operator code {}", record.binary_op))
                })?,
            },
            inst_kind::UNARY => Op::Unary {
                op: codes::unary_op_from(record.unary_op).ok_or_else(|| {
                    malformed(format!("unknown unary operator code {}", record.unary_op))
                })?,
            },
            inst_kind::ACCESS => Op::Access,
            inst_kind::BITCAST => Op::Bitcast,
            inst_kind::BREAK_IF => Op::BreakIf {
                loop_: target(self)?,
            },
            inst_kind::CONSTRUCT => Op::Construct,
            inst_kind::CONTINUE => Op::Continue {
                loop_: target(self)?,
            },
            inst_kind::CONVERT => Op::Convert,
            inst_kind::BUILTIN_CALL => Op::BuiltinCall {
                builtin: codes::builtin_fn_from(record.builtin).ok_or_else(|| {
                    malformed(format!("unknown builtin function code {}", record.builtin))
                })?,
            },
            inst_kind::DISCARD => Op::Discard,
            inst_kind::EXIT_IF => Op::ExitIf { if_: target(self)? },
            inst_kind::EXIT_LOOP => Op::ExitLoop {
                loop_: target(self)?,
            },
            inst_kind::EXIT_SWITCH => Op::ExitSwitch {
                switch: target(self)?,
            },
            inst_kind::IF => Op::If {
                true_block: self.block_at(record.true_block)?,
                false_block: self.block_at(record.false_block)?,
            },
            inst_kind::LET => Op::Let,
            inst_kind::LOAD => Op::Load,
            inst_kind::LOAD_VECTOR_ELEMENT => Op::LoadVectorElement,
            inst_kind::LOOP => Op::Loop {
                initializer: if record.initializer == 0 {
                    None
                } else {
                    Some(self.block_at(record.initializer)?)
                },
                body: self.block_at(record.body)?,
                continuing: if record.continuing == 0 {
                    None
                } else {
                    Some(self.block_at(record.continuing)?)
                },
            },
            inst_kind::NEXT_ITERATION => Op::NextIteration {
                loop_: target(self)?,
            },
            inst_kind::OVERRIDE => Op::Override {
                override_id: match record.override_id {
                    None => None,
                    Some(id) => Some(u16::try_from(id).map_err(|_| {
                        malformed(format!("override id {id} exceeds 16 bits"))
                    })?),
                },
            },
            inst_kind::PHONY => Op::Phony,
            inst_kind::RETURN => Op::Return {
                func: self.func_at(record.function)?,
            },
            inst_kind::STORE => Op::Store,
            inst_kind::STORE_VECTOR_ELEMENT => Op::StoreVectorElement,
            inst_kind::SWIZZLE => Op::Swizzle {
                indices: record.indices.clone(),
            },
            inst_kind::SWITCH => {
                let mut cases = Vec::with_capacity(record.cases.len());
                for case in &record.cases {
                    let mut selectors = Vec::with_capacity(case.selectors.len());
                    for selector in &case.selectors {
                        selectors.push(if selector.is_default {
                            CaseSelector::Default
                        } else {
                            CaseSelector::Value(self.const_at(selector.value)?)
                        });
                    }
                    cases.push(SwitchCase {
                        selectors,
                        block: self.block_at(case.block)?,
                    });
                }
                Op::Switch { cases }
            }
            inst_kind::UNREACHABLE => Op::Unreachable,
            inst_kind::USER_CALL => Op::UserCall {
                func: self.func_at(record.function)?,
            },
            inst_kind::VAR => Op::Var {
                binding_point: record.binding_point.as_ref().map(|bp| shade_ir::BindingPoint {
                    group: bp.group,
                    binding: bp.binding,
                }),
                input_attachment_index: record.input_attachment_index,
            },
            other => {
                return Err(malformed(format!(
                    "unknown instruction kind code {other} at instruction {}",
                    index + 1
                )))
            }
        })
    }

    fn decode_blocks(&mut self) -> Result<(), DecodeError> {
        for index in 0..self.proto.blocks.len() {
            let record = self.proto.blocks[index].clone();
            let handle = self.blocks[index];

            let mut params = Vec::with_capacity(record.params.len());
            for param in record.params {
                params.push(self.value_at(param)?);
            }
            let mut insts = Vec::with_capacity(record.instructions.len());
            for inst in record.instructions {
                let inst = self.inst_at(inst)?;
                self.module.instructions[inst].block = Some(handle);
                insts.push(inst);
            }

            let block = &mut self.module.blocks[handle];
            block.params = params;
            block.insts = insts;
        }
        Ok(())
    }

    fn decode_functions(&mut self) -> Result<(), DecodeError> {
        for index in 0..self.proto.functions.len() {
            let record = self.proto.functions[index].clone();
            let handle = self.funcs[index];

            let mut params = Vec::with_capacity(record.params.len());
            for param in record.params {
                params.push(self.value_at(param)?);
            }
            let return_type = if record.return_type == 0 {
                None
            } else {
                Some(self.type_at(record.return_type)?)
            };
            let workgroup_size = match record.workgroup_size.len() {
                0 => None,
                3 => Some([
                    record.workgroup_size[0],
                    record.workgroup_size[1],
                    record.workgroup_size[2],
                ]),
                n => {
                    return Err(malformed(format!(
                        "workgroup size must have 0 or 3 dimensions, found {n}"
                    )))
                }
            };
            let block = self.block_at(record.block)?;
            self.module.blocks[block].owner = Some(BlockOwner::Function(handle));

            let func = &mut self.module.functions[handle];
            func.name = record.name;
            func.params = params;
            func.return_type = return_type;
            func.return_attributes = decode_attributes(record.return_attributes)?;
            func.stage = codes::stage_from(record.stage)
                .ok_or_else(|| malformed(format!("unknown stage code {}", record.stage)))?;
            func.workgroup_size = workgroup_size;
            func.block = Some(block);
        }
        Ok(())
    }

    fn decode_names(&mut self) -> Result<(), DecodeError> {
        for record in std::mem::take(&mut self.proto.names) {
            let value = self.value_at(record.value)?;
            self.module.names.insert(value, record.name);
        }
        Ok(())
    }
}

fn lookup<T>(what: &'static str, table: &[Handle<T>], index: u32) -> Result<Handle<T>, DecodeError> {
    if index == 0 || index as usize > table.len() {
        return Err(DecodeError::BadIndex {
            what,
            index,
            len: table.len(),
        });
    }
    Ok(table[index as usize - 1])
}

fn decode_scalar(kind: i32, width: u32) -> Result<shade_ir::Scalar, DecodeError> {
    codes::scalar_from(kind, width)
        .ok_or_else(|| malformed(format!("invalid scalar (kind {kind}, width {width})")))
}

fn decode_vector_size(size: u32) -> Result<shade_ir::VectorSize, DecodeError> {
    shade_ir::VectorSize::from_count(size)
        .ok_or_else(|| malformed(format!("invalid vector size {size}")))
}

fn decode_attributes(
    record: Option<proto::IoAttributesProto>,
) -> Result<IoAttributes, DecodeError> {
    let Some(record) = record else {
        return Ok(IoAttributes::default());
    };
    let interpolation = match record.interpolation_type {
        None => None,
        Some(ty) => Some(Interpolation {
            ty: codes::interpolation_type_from(ty)
                .ok_or_else(|| malformed(format!("unknown interpolation type code {ty}")))?,
            sampling: match record.interpolation_sampling {
                None => None,
                Some(sampling) => Some(codes::interpolation_sampling_from(sampling).ok_or_else(
                    || malformed(format!("unknown interpolation sampling code {sampling}")),
                )?),
            },
        }),
    };
    Ok(IoAttributes {
        binding_point: record.binding_point.map(|bp| shade_ir::BindingPoint {
            group: bp.group,
            binding: bp.binding,
        }),
        location: record.location,
        color: record.color,
        builtin: match record.builtin {
            None => None,
            Some(code) => Some(
                codes::builtin_value_from(code)
                    .ok_or_else(|| malformed(format!("unknown builtin code {code}")))?,
            ),
        },
        interpolation,
        invariant: record.invariant,
        input_attachment_index: record.input_attachment_index,
    })
}
