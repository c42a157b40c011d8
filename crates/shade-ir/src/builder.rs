//! Builder — the mutation API for constructing IR.
//!
//! A front end lowers source programs through this interface; the tests in
//! this repository use it the same way. The builder is what keeps the
//! module's cross-references consistent: instruction results point back at
//! their instruction, operands record their usages, and nested blocks know
//! their owner.

use crate::arena::Handle;
use crate::block::{Block, BlockOwner};
use crate::constant::{ConstantValue, ScalarValue};
use crate::func::{Function, Stage};
use crate::inst::{BinaryOp, BuiltinFn, CaseSelector, Instruction, Op, SwitchCase, UnaryOp};
use crate::io::{Access, AddressSpace, BindingPoint, IoAttributes};
use crate::module::Module;
use crate::types::{ArraySize, Scalar, StructMember, Type, TypeInner, VectorSize};
use crate::value::{Value, ValueKind};

/// Builds IR into a [`Module`].
pub struct Builder<'a> {
    module: &'a mut Module,
}

impl<'a> Builder<'a> {
    /// Wraps a module for mutation.
    pub fn new(module: &'a mut Module) -> Self {
        Self { module }
    }

    /// The module under construction.
    pub fn module(&self) -> &Module {
        self.module
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Interns an anonymous type.
    pub fn ty(&mut self, inner: TypeInner) -> Handle<Type> {
        self.module.types.insert(Type { name: None, inner })
    }

    /// Interns a named type.
    pub fn ty_named(&mut self, name: impl Into<String>, inner: TypeInner) -> Handle<Type> {
        self.module.types.insert(Type {
            name: Some(name.into()),
            inner,
        })
    }

    pub fn ty_bool(&mut self) -> Handle<Type> {
        self.ty(TypeInner::Scalar(Scalar::BOOL))
    }

    pub fn ty_i32(&mut self) -> Handle<Type> {
        self.ty(TypeInner::Scalar(Scalar::I32))
    }

    pub fn ty_u32(&mut self) -> Handle<Type> {
        self.ty(TypeInner::Scalar(Scalar::U32))
    }

    pub fn ty_f32(&mut self) -> Handle<Type> {
        self.ty(TypeInner::Scalar(Scalar::F32))
    }

    pub fn ty_f16(&mut self) -> Handle<Type> {
        self.ty(TypeInner::Scalar(Scalar::F16))
    }

    /// Interns `vecN<scalar>`.
    pub fn ty_vec(&mut self, size: VectorSize, scalar: Scalar) -> Handle<Type> {
        self.ty(TypeInner::Vector { size, scalar })
    }

    /// Interns `matCxR<scalar>`.
    pub fn ty_mat(
        &mut self,
        columns: VectorSize,
        rows: VectorSize,
        scalar: Scalar,
    ) -> Handle<Type> {
        self.ty(TypeInner::Matrix {
            columns,
            rows,
            scalar,
        })
    }

    /// Interns `array<base, count>` with a natural stride.
    pub fn ty_array(&mut self, base: Handle<Type>, count: u32) -> Handle<Type> {
        let stride = self.byte_size(base);
        self.ty(TypeInner::Array {
            base,
            size: ArraySize::Constant(count),
            stride,
        })
    }

    /// Interns a runtime-sized `array<base>`.
    pub fn ty_runtime_array(&mut self, base: Handle<Type>) -> Handle<Type> {
        let stride = self.byte_size(base);
        self.ty(TypeInner::Array {
            base,
            size: ArraySize::Dynamic,
            stride,
        })
    }

    /// Interns `ptr<space, base, access>`.
    pub fn ty_ptr(
        &mut self,
        space: AddressSpace,
        base: Handle<Type>,
        access: Access,
    ) -> Handle<Type> {
        self.ty(TypeInner::Pointer {
            base,
            space,
            access,
        })
    }

    /// Interns a struct type, packing members at naturally-sized offsets.
    pub fn ty_struct(
        &mut self,
        name: impl Into<String>,
        members: Vec<(Option<String>, Handle<Type>, IoAttributes)>,
    ) -> Handle<Type> {
        let mut laid_out = Vec::with_capacity(members.len());
        let mut offset = 0u32;
        for (member_name, ty, attributes) in members {
            let size = self.byte_size(ty);
            laid_out.push(StructMember {
                name: member_name,
                ty,
                offset,
                attributes,
            });
            offset += size;
        }
        self.ty_named(
            name,
            TypeInner::Struct {
                members: laid_out,
                span: offset,
            },
        )
    }

    /// A rough byte size used for default strides and struct packing.
    fn byte_size(&self, ty: Handle<Type>) -> u32 {
        match self.module.types[ty].inner {
            TypeInner::Scalar(s) | TypeInner::Atomic(s) => u32::from(s.width),
            TypeInner::Vector { size, scalar } => size as u32 * u32::from(scalar.width),
            TypeInner::Matrix {
                columns,
                rows,
                scalar,
            } => columns as u32 * rows as u32 * u32::from(scalar.width),
            TypeInner::Array {
                size: ArraySize::Constant(n),
                stride,
                ..
            } => n * stride,
            TypeInner::Struct { span, .. } => span,
            _ => 4,
        }
    }

    // ------------------------------------------------------------------
    // Constants
    // ------------------------------------------------------------------

    pub fn const_bool(&mut self, v: bool) -> Handle<ConstantValue> {
        let ty = self.ty_bool();
        self.module.constants.scalar(ty, ScalarValue::Bool(v))
    }

    pub fn const_i32(&mut self, v: i32) -> Handle<ConstantValue> {
        let ty = self.ty_i32();
        self.module.constants.scalar(ty, ScalarValue::I32(v))
    }

    pub fn const_u32(&mut self, v: u32) -> Handle<ConstantValue> {
        let ty = self.ty_u32();
        self.module.constants.scalar(ty, ScalarValue::U32(v))
    }

    pub fn const_f32(&mut self, v: f32) -> Handle<ConstantValue> {
        let ty = self.ty_f32();
        self.module.constants.scalar(ty, ScalarValue::F32(v))
    }

    pub fn const_f16(&mut self, v: half::f16) -> Handle<ConstantValue> {
        let ty = self.ty_f16();
        self.module.constants.scalar(ty, ScalarValue::F16(v))
    }

    /// Interns a composite constant.
    pub fn const_composite(
        &mut self,
        ty: Handle<Type>,
        elements: Vec<Handle<ConstantValue>>,
    ) -> Result<Handle<ConstantValue>, crate::IrError> {
        self.module
            .constants
            .composite(&self.module.types, ty, elements)
    }

    /// Interns a splat constant.
    pub fn const_splat(
        &mut self,
        ty: Handle<Type>,
        value: Handle<ConstantValue>,
        count: u32,
    ) -> Result<Handle<ConstantValue>, crate::IrError> {
        self.module
            .constants
            .splat(&self.module.types, ty, value, count)
    }

    /// Interns the zero value of a type.
    pub fn const_zero(&mut self, ty: Handle<Type>) -> Result<Handle<ConstantValue>, crate::IrError> {
        self.module.constants.zero(&mut self.module.types, ty)
    }

    /// Wraps an interned constant in a `Value` usable as an operand.
    pub fn constant(&mut self, value: Handle<ConstantValue>) -> Handle<Value> {
        let ty = self.module.constants.try_get(value).map(|c| c.ty());
        let ty = ty.expect("constant handle must be valid");
        self.module
            .values
            .append(Value::new(ValueKind::Constant { value }, ty))
    }

    /// Shorthand: an i32 constant ready for use as an operand.
    pub fn i32_operand(&mut self, v: i32) -> Handle<Value> {
        let c = self.const_i32(v);
        self.constant(c)
    }

    /// Shorthand: a u32 constant ready for use as an operand.
    pub fn u32_operand(&mut self, v: u32) -> Handle<Value> {
        let c = self.const_u32(v);
        self.constant(c)
    }

    /// Shorthand: an f32 constant ready for use as an operand.
    pub fn f32_operand(&mut self, v: f32) -> Handle<Value> {
        let c = self.const_f32(v);
        self.constant(c)
    }

    /// Shorthand: a bool constant ready for use as an operand.
    pub fn bool_operand(&mut self, v: bool) -> Handle<Value> {
        let c = self.const_bool(v);
        self.constant(c)
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    /// Creates a function and its body block.
    pub fn function(
        &mut self,
        name: impl Into<String>,
        return_type: Option<Handle<Type>>,
    ) -> Handle<Function> {
        let func = self.module.functions.append(Function {
            name: Some(name.into()),
            params: Vec::new(),
            return_type,
            return_attributes: IoAttributes::default(),
            stage: None,
            workgroup_size: None,
            block: None,
        });
        let block = self.module.blocks.append(Block {
            params: Vec::new(),
            insts: Vec::new(),
            owner: Some(BlockOwner::Function(func)),
        });
        self.module.functions[func].block = Some(block);
        func
    }

    /// Creates a compute entry point.
    pub fn compute_entry(
        &mut self,
        name: impl Into<String>,
        workgroup_size: [u32; 3],
    ) -> Handle<Function> {
        let func = self.function(name, None);
        self.module.functions[func].stage = Some(Stage::Compute);
        self.module.functions[func].workgroup_size = Some(workgroup_size);
        func
    }

    /// Creates a vertex entry point returning `return_type`.
    pub fn vertex_entry(
        &mut self,
        name: impl Into<String>,
        return_type: Handle<Type>,
        return_attributes: IoAttributes,
    ) -> Handle<Function> {
        let func = self.function(name, Some(return_type));
        self.module.functions[func].stage = Some(Stage::Vertex);
        self.module.functions[func].return_attributes = return_attributes;
        func
    }

    /// Creates a fragment entry point.
    pub fn fragment_entry(
        &mut self,
        name: impl Into<String>,
        return_type: Option<Handle<Type>>,
        return_attributes: IoAttributes,
    ) -> Handle<Function> {
        let func = self.function(name, return_type);
        self.module.functions[func].stage = Some(Stage::Fragment);
        self.module.functions[func].return_attributes = return_attributes;
        func
    }

    /// Appends a parameter to a function.
    pub fn param(
        &mut self,
        func: Handle<Function>,
        name: Option<&str>,
        ty: Handle<Type>,
        attributes: IoAttributes,
    ) -> Handle<Value> {
        let value = self
            .module
            .values
            .append(Value::new(ValueKind::FunctionParam { func, attributes }, ty));
        self.module.functions[func].params.push(value);
        if let Some(name) = name {
            self.module.names.insert(value, name.into());
        }
        value
    }

    /// The body block of a function.
    pub fn body(&self, func: Handle<Function>) -> Handle<Block> {
        self.module.functions[func]
            .block
            .expect("builder-created functions always have a body block")
    }

    /// Assigns a debug name to a value.
    pub fn set_name(&mut self, value: Handle<Value>, name: impl Into<String>) {
        self.module.names.insert(value, name.into());
    }

    // ------------------------------------------------------------------
    // Instruction plumbing
    // ------------------------------------------------------------------

    /// Appends an instruction to a block, wiring operand usages and
    /// allocating one result per entry of `result_tys`.
    pub fn push_inst(
        &mut self,
        block: Handle<Block>,
        op: Op,
        operands: Vec<Handle<Value>>,
        result_tys: &[Handle<Type>],
    ) -> (Handle<Instruction>, Vec<Handle<Value>>) {
        let inst = self.module.instructions.append(Instruction {
            op,
            operands: operands.clone(),
            results: Vec::new(),
            block: Some(block),
        });
        for (index, &operand) in operands.iter().enumerate() {
            self.module.values[operand].add_use(inst, index as u32);
        }
        let results: Vec<_> = result_tys
            .iter()
            .map(|&ty| {
                self.module
                    .values
                    .append(Value::new(ValueKind::InstructionResult { inst: Some(inst) }, ty))
            })
            .collect();
        self.module.instructions[inst].results = results.clone();
        self.module.blocks[block].insts.push(inst);
        (inst, results)
    }

    // ------------------------------------------------------------------
    // Plain instructions
    // ------------------------------------------------------------------

    pub fn binary(
        &mut self,
        block: Handle<Block>,
        op: BinaryOp,
        lhs: Handle<Value>,
        rhs: Handle<Value>,
        result_ty: Handle<Type>,
    ) -> Handle<Value> {
        let (_, results) = self.push_inst(block, Op::Binary { op }, vec![lhs, rhs], &[result_ty]);
        results[0]
    }

    pub fn unary(
        &mut self,
        block: Handle<Block>,
        op: UnaryOp,
        value: Handle<Value>,
        result_ty: Handle<Type>,
    ) -> Handle<Value> {
        let (_, results) = self.push_inst(block, Op::Unary { op }, vec![value], &[result_ty]);
        results[0]
    }

    pub fn access(
        &mut self,
        block: Handle<Block>,
        object: Handle<Value>,
        indices: Vec<Handle<Value>>,
        result_ty: Handle<Type>,
    ) -> Handle<Value> {
        let mut operands = vec![object];
        operands.extend(indices);
        let (_, results) = self.push_inst(block, Op::Access, operands, &[result_ty]);
        results[0]
    }

    pub fn construct(
        &mut self,
        block: Handle<Block>,
        result_ty: Handle<Type>,
        args: Vec<Handle<Value>>,
    ) -> Handle<Value> {
        let (_, results) = self.push_inst(block, Op::Construct, args, &[result_ty]);
        results[0]
    }

    pub fn convert(
        &mut self,
        block: Handle<Block>,
        value: Handle<Value>,
        result_ty: Handle<Type>,
    ) -> Handle<Value> {
        let (_, results) = self.push_inst(block, Op::Convert, vec![value], &[result_ty]);
        results[0]
    }

    pub fn bitcast(
        &mut self,
        block: Handle<Block>,
        value: Handle<Value>,
        result_ty: Handle<Type>,
    ) -> Handle<Value> {
        let (_, results) = self.push_inst(block, Op::Bitcast, vec![value], &[result_ty]);
        results[0]
    }

    pub fn builtin_call(
        &mut self,
        block: Handle<Block>,
        builtin: BuiltinFn,
        args: Vec<Handle<Value>>,
        result_ty: Handle<Type>,
    ) -> Handle<Value> {
        let (_, results) = self.push_inst(block, Op::BuiltinCall { builtin }, args, &[result_ty]);
        results[0]
    }

    pub fn swizzle(
        &mut self,
        block: Handle<Block>,
        vector: Handle<Value>,
        indices: Vec<u32>,
        result_ty: Handle<Type>,
    ) -> Handle<Value> {
        let (_, results) =
            self.push_inst(block, Op::Swizzle { indices }, vec![vector], &[result_ty]);
        results[0]
    }

    pub fn load(
        &mut self,
        block: Handle<Block>,
        pointer: Handle<Value>,
        result_ty: Handle<Type>,
    ) -> Handle<Value> {
        let (_, results) = self.push_inst(block, Op::Load, vec![pointer], &[result_ty]);
        results[0]
    }

    pub fn store(&mut self, block: Handle<Block>, pointer: Handle<Value>, value: Handle<Value>) {
        self.push_inst(block, Op::Store, vec![pointer, value], &[]);
    }

    pub fn load_vector_element(
        &mut self,
        block: Handle<Block>,
        pointer: Handle<Value>,
        index: Handle<Value>,
        result_ty: Handle<Type>,
    ) -> Handle<Value> {
        let (_, results) =
            self.push_inst(block, Op::LoadVectorElement, vec![pointer, index], &[result_ty]);
        results[0]
    }

    pub fn store_vector_element(
        &mut self,
        block: Handle<Block>,
        pointer: Handle<Value>,
        index: Handle<Value>,
        value: Handle<Value>,
    ) {
        self.push_inst(block, Op::StoreVectorElement, vec![pointer, index, value], &[]);
    }

    /// Declares a `var`; the result is a pointer to the storage.
    pub fn var(
        &mut self,
        block: Handle<Block>,
        name: &str,
        space: AddressSpace,
        store_ty: Handle<Type>,
        access: Access,
    ) -> Handle<Value> {
        self.var_inner(block, name, space, store_ty, access, None, None)
    }

    /// Declares a `var` with a resource binding point.
    pub fn var_with_binding(
        &mut self,
        block: Handle<Block>,
        name: &str,
        space: AddressSpace,
        store_ty: Handle<Type>,
        access: Access,
        group: u32,
        binding: u32,
    ) -> Handle<Value> {
        self.var_inner(
            block,
            name,
            space,
            store_ty,
            access,
            Some(BindingPoint { group, binding }),
            None,
        )
    }

    /// Declares a `var` with an initializer.
    pub fn var_init(
        &mut self,
        block: Handle<Block>,
        name: &str,
        space: AddressSpace,
        store_ty: Handle<Type>,
        access: Access,
        init: Handle<Value>,
    ) -> Handle<Value> {
        self.var_inner(block, name, space, store_ty, access, None, Some(init))
    }

    /// Declares a `var` with both a binding point and an input-attachment
    /// index (input-attachment handles).
    pub fn var_input_attachment(
        &mut self,
        block: Handle<Block>,
        name: &str,
        store_ty: Handle<Type>,
        group: u32,
        binding: u32,
        input_attachment_index: u32,
    ) -> Handle<Value> {
        let ptr_ty = self.ty_ptr(AddressSpace::Handle, store_ty, Access::LOAD);
        let (_, results) = self.push_inst(
            block,
            Op::Var {
                binding_point: Some(BindingPoint { group, binding }),
                input_attachment_index: Some(input_attachment_index),
            },
            Vec::new(),
            &[ptr_ty],
        );
        self.module.names.insert(results[0], name.into());
        results[0]
    }

    fn var_inner(
        &mut self,
        block: Handle<Block>,
        name: &str,
        space: AddressSpace,
        store_ty: Handle<Type>,
        access: Access,
        binding_point: Option<BindingPoint>,
        init: Option<Handle<Value>>,
    ) -> Handle<Value> {
        let ptr_ty = self.ty_ptr(space, store_ty, access);
        let operands: Vec<_> = init.into_iter().collect();
        let (_, results) = self.push_inst(
            block,
            Op::Var {
                binding_point,
                input_attachment_index: None,
            },
            operands,
            &[ptr_ty],
        );
        self.module.names.insert(results[0], name.into());
        results[0]
    }

    /// Binds a value to a new named result.
    pub fn let_(
        &mut self,
        block: Handle<Block>,
        name: &str,
        value: Handle<Value>,
    ) -> Handle<Value> {
        let ty = self.module.values[value].ty;
        let (_, results) = self.push_inst(block, Op::Let, vec![value], &[ty]);
        self.module.names.insert(results[0], name.into());
        results[0]
    }

    /// Declares a module-scope override.
    pub fn override_(
        &mut self,
        block: Handle<Block>,
        name: &str,
        ty: Handle<Type>,
        override_id: Option<u16>,
        init: Option<Handle<Value>>,
    ) -> Handle<Value> {
        let operands: Vec<_> = init.into_iter().collect();
        let (_, results) = self.push_inst(block, Op::Override { override_id }, operands, &[ty]);
        self.module.names.insert(results[0], name.into());
        results[0]
    }

    /// Calls a user function; returns its result value if it has one.
    pub fn call(
        &mut self,
        block: Handle<Block>,
        func: Handle<Function>,
        args: Vec<Handle<Value>>,
    ) -> Option<Handle<Value>> {
        let result_tys: Vec<_> = self.module.functions[func].return_type.into_iter().collect();
        let (_, results) = self.push_inst(block, Op::UserCall { func }, args, &result_tys);
        results.first().copied()
    }

    /// A phony use of a value. Capability-gated at validation.
    pub fn phony(&mut self, block: Handle<Block>, value: Handle<Value>) {
        self.push_inst(block, Op::Phony, vec![value], &[]);
    }

    pub fn discard(&mut self, block: Handle<Block>) {
        self.push_inst(block, Op::Discard, Vec::new(), &[]);
    }

    pub fn unreachable_(&mut self, block: Handle<Block>) {
        self.push_inst(block, Op::Unreachable, Vec::new(), &[]);
    }

    /// Returns from `func`, optionally with a value.
    pub fn ret(&mut self, block: Handle<Block>, func: Handle<Function>, value: Option<Handle<Value>>) {
        let operands: Vec<_> = value.into_iter().collect();
        self.push_inst(block, Op::Return { func }, operands, &[]);
    }

    // ------------------------------------------------------------------
    // Control flow
    // ------------------------------------------------------------------

    /// Appends an `if` with fresh true/false blocks.
    pub fn if_(
        &mut self,
        block: Handle<Block>,
        condition: Handle<Value>,
        result_tys: &[Handle<Type>],
    ) -> (Handle<Instruction>, Handle<Block>, Handle<Block>, Vec<Handle<Value>>) {
        let true_block = self.module.blocks.append(Block::new());
        let false_block = self.module.blocks.append(Block::new());
        let (inst, results) = self.push_inst(
            block,
            Op::If {
                true_block,
                false_block,
            },
            vec![condition],
            result_tys,
        );
        self.module.blocks[true_block].owner = Some(BlockOwner::Instruction(inst));
        self.module.blocks[false_block].owner = Some(BlockOwner::Instruction(inst));
        (inst, true_block, false_block, results)
    }

    /// Appends a `loop` with a fresh body block.
    pub fn loop_(
        &mut self,
        block: Handle<Block>,
        result_tys: &[Handle<Type>],
    ) -> (Handle<Instruction>, Handle<Block>, Vec<Handle<Value>>) {
        let body = self.module.blocks.append(Block::new());
        let (inst, results) = self.push_inst(
            block,
            Op::Loop {
                initializer: None,
                body,
                continuing: None,
            },
            Vec::new(),
            result_tys,
        );
        self.module.blocks[body].owner = Some(BlockOwner::Instruction(inst));
        (inst, body, results)
    }

    /// Attaches an initializer block to a loop.
    pub fn loop_initializer(&mut self, loop_inst: Handle<Instruction>) -> Handle<Block> {
        let block = self.module.blocks.append(Block::new());
        self.module.blocks[block].owner = Some(BlockOwner::Instruction(loop_inst));
        match &mut self.module.instructions[loop_inst].op {
            Op::Loop { initializer, .. } => *initializer = Some(block),
            other => panic!("loop_initializer on non-loop instruction {}", other.name()),
        }
        block
    }

    /// Attaches a continuing block to a loop.
    pub fn loop_continuing(&mut self, loop_inst: Handle<Instruction>) -> Handle<Block> {
        let block = self.module.blocks.append(Block::new());
        self.module.blocks[block].owner = Some(BlockOwner::Instruction(loop_inst));
        match &mut self.module.instructions[loop_inst].op {
            Op::Loop { continuing, .. } => *continuing = Some(block),
            other => panic!("loop_continuing on non-loop instruction {}", other.name()),
        }
        block
    }

    /// Appends a `switch` over `selector` with no cases yet.
    pub fn switch(
        &mut self,
        block: Handle<Block>,
        selector: Handle<Value>,
        result_tys: &[Handle<Type>],
    ) -> (Handle<Instruction>, Vec<Handle<Value>>) {
        self.push_inst(
            block,
            Op::Switch { cases: Vec::new() },
            vec![selector],
            result_tys,
        )
    }

    /// Adds a case to a switch, returning its fresh block.
    pub fn switch_case(
        &mut self,
        switch_inst: Handle<Instruction>,
        selectors: Vec<CaseSelector>,
    ) -> Handle<Block> {
        let block = self.module.blocks.append(Block::new());
        self.module.blocks[block].owner = Some(BlockOwner::Instruction(switch_inst));
        match &mut self.module.instructions[switch_inst].op {
            Op::Switch { cases } => cases.push(SwitchCase { selectors, block }),
            other => panic!("switch_case on non-switch instruction {}", other.name()),
        }
        block
    }

    /// Declares a parameter on a multi-in block.
    pub fn block_param(&mut self, block: Handle<Block>, ty: Handle<Type>) -> Handle<Value> {
        let value = self
            .module
            .values
            .append(Value::new(ValueKind::BlockParam { block }, ty));
        self.module.blocks[block].params.push(value);
        value
    }

    // ------------------------------------------------------------------
    // Terminators
    // ------------------------------------------------------------------

    pub fn exit_if(
        &mut self,
        block: Handle<Block>,
        if_: Handle<Instruction>,
        args: Vec<Handle<Value>>,
    ) {
        self.push_inst(block, Op::ExitIf { if_ }, args, &[]);
    }

    pub fn exit_loop(
        &mut self,
        block: Handle<Block>,
        loop_: Handle<Instruction>,
        args: Vec<Handle<Value>>,
    ) {
        self.push_inst(block, Op::ExitLoop { loop_ }, args, &[]);
    }

    pub fn exit_switch(
        &mut self,
        block: Handle<Block>,
        switch: Handle<Instruction>,
        args: Vec<Handle<Value>>,
    ) {
        self.push_inst(block, Op::ExitSwitch { switch }, args, &[]);
    }

    pub fn continue_(
        &mut self,
        block: Handle<Block>,
        loop_: Handle<Instruction>,
        args: Vec<Handle<Value>>,
    ) {
        self.push_inst(block, Op::Continue { loop_ }, args, &[]);
    }

    pub fn next_iteration(
        &mut self,
        block: Handle<Block>,
        loop_: Handle<Instruction>,
        args: Vec<Handle<Value>>,
    ) {
        self.push_inst(block, Op::NextIteration { loop_ }, args, &[]);
    }

    pub fn break_if(
        &mut self,
        block: Handle<Block>,
        loop_: Handle<Instruction>,
        condition: Handle<Value>,
        args: Vec<Handle<Value>>,
    ) {
        let mut operands = vec![condition];
        operands.extend(args);
        self.push_inst(block, Op::BreakIf { loop_ }, operands, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_wires_uses_and_results() {
        let mut module = Module::new();
        let mut b = Builder::new(&mut module);

        let f32_ty = b.ty_f32();
        let func = b.function("add", Some(f32_ty));
        let body = b.body(func);

        let lhs = b.f32_operand(1.0);
        let rhs = b.f32_operand(2.0);
        let sum = b.binary(body, BinaryOp::Add, lhs, rhs, f32_ty);
        b.ret(body, func, Some(sum));

        // The result points back at its instruction.
        let inst = match module.values[sum].kind {
            ValueKind::InstructionResult { inst: Some(inst) } => inst,
            ref other => panic!("expected instruction result, got {other:?}"),
        };
        assert_eq!(module.instructions[inst].results, vec![sum]);

        // Operand usages recorded.
        assert_eq!(module.values[lhs].uses.len(), 1);
        assert_eq!(module.values[lhs].uses[0].inst, inst);
        assert_eq!(module.values[lhs].uses[0].operand, 0);
        assert_eq!(module.values[rhs].uses[0].operand, 1);

        // `sum` is used by the return.
        assert_eq!(module.values[sum].uses.len(), 1);

        // No detached results.
        assert!(module.detached_results().is_empty());
    }

    #[test]
    fn if_blocks_know_their_owner() {
        let mut module = Module::new();
        let mut b = Builder::new(&mut module);

        let func = b.function("f", None);
        let body = b.body(func);
        let cond = b.bool_operand(true);
        let (if_inst, true_block, false_block, _) = b.if_(body, cond, &[]);
        b.exit_if(true_block, if_inst, Vec::new());
        b.exit_if(false_block, if_inst, Vec::new());
        b.ret(body, func, None);

        assert_eq!(
            module.blocks[true_block].owner,
            Some(BlockOwner::Instruction(if_inst))
        );
        assert_eq!(
            module.blocks[false_block].owner,
            Some(BlockOwner::Instruction(if_inst))
        );
        let term = module.blocks[true_block].terminator().unwrap();
        assert!(module.instructions[term].op.is_terminator());
    }

    #[test]
    fn loop_with_continuing_and_params() {
        let mut module = Module::new();
        let mut b = Builder::new(&mut module);

        let i32_ty = b.ty_i32();
        let func = b.function("count", None);
        let body = b.body(func);

        let (loop_inst, loop_body, _) = b.loop_(body, &[]);
        let idx = b.block_param(loop_body, i32_ty);
        let continuing = b.loop_continuing(loop_inst);

        b.continue_(loop_body, loop_inst, vec![idx]);
        let cond = b.bool_operand(true);
        b.break_if(continuing, loop_inst, cond, Vec::new());
        b.ret(body, func, None);

        assert!(module.blocks[loop_body].is_multi_in());
        match module.instructions[loop_inst].op {
            Op::Loop {
                continuing: Some(c),
                ..
            } => assert_eq!(c, continuing),
            ref other => panic!("expected loop, got {other:?}"),
        }
    }

    #[test]
    fn module_scope_var_with_binding() {
        let mut module = Module::new();
        let root = module.root_block;
        let mut b = Builder::new(&mut module);

        let f32_ty = b.ty_f32();
        let arr_ty = b.ty_runtime_array(f32_ty);
        let v = b.var_with_binding(root, "data", AddressSpace::Storage, arr_ty, Access::LOAD, 0, 2);

        assert_eq!(module.name_of(v), Some("data"));
        let ptr = &module.types[module.values[v].ty];
        match ptr.inner {
            TypeInner::Pointer { space, .. } => assert_eq!(space, AddressSpace::Storage),
            ref other => panic!("expected pointer, got {other:?}"),
        }
    }
}
