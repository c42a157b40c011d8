//! Display implementations and text dump for debugging.
//!
//! The dump is what validation failures attach for context; it is not a
//! stable format and nothing parses it back.

use std::fmt;

use crate::arena::{Handle, UniqueArena};
use crate::block::Block;
use crate::constant::{ConstantValue, ScalarValue};
use crate::func::Function;
use crate::inst::{BinaryOp, BuiltinFn, CaseSelector, Instruction, Op, UnaryOp};
use crate::io::{Access, AddressSpace, BindingPoint, BuiltinValue};
use crate::module::Module;
use crate::types::{ArraySize, Scalar, ScalarKind, Type, TypeInner};
use crate::value::Value;

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ScalarKind::Bool => write!(f, "bool"),
            ScalarKind::Sint => write!(f, "i{}", self.width * 8),
            ScalarKind::Uint => write!(f, "u{}", self.width * 8),
            ScalarKind::Float => write!(f, "f{}", self.width * 8),
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let load = self.contains(Access::LOAD);
        let store = self.contains(Access::STORE);
        match (load, store) {
            (true, true) => write!(f, "read_write"),
            (true, false) => write!(f, "read"),
            (false, true) => write!(f, "write"),
            (false, false) => write!(f, "none"),
        }
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function => write!(f, "function"),
            Self::Private => write!(f, "private"),
            Self::Workgroup => write!(f, "workgroup"),
            Self::Uniform => write!(f, "uniform"),
            Self::Storage => write!(f, "storage"),
            Self::Handle => write!(f, "handle"),
        }
    }
}

impl fmt::Display for BuiltinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Position => "position",
            Self::FrontFacing => "front_facing",
            Self::VertexIndex => "vertex_index",
            Self::InstanceIndex => "instance_index",
            Self::FragDepth => "frag_depth",
            Self::SampleIndex => "sample_index",
            Self::SampleMask => "sample_mask",
            Self::ClipDistances => "clip_distances",
            Self::GlobalInvocationId => "global_invocation_id",
            Self::LocalInvocationId => "local_invocation_id",
            Self::LocalInvocationIndex => "local_invocation_index",
            Self::WorkgroupId => "workgroup_id",
            Self::NumWorkgroups => "num_workgroups",
            Self::SubgroupInvocationId => "subgroup_invocation_id",
            Self::SubgroupSize => "subgroup_size",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for BindingPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@group({}) @binding({})", self.group, self.binding)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}i"),
            Self::U32(v) => write!(f, "{v}u"),
            Self::F32(v) => write!(f, "{v}f"),
            Self::F16(v) => write!(f, "{v}h"),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negate => write!(f, "negation"),
            Self::LogicalNot => write!(f, "not"),
            Self::BitwiseNot => write!(f, "complement"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Subtract => "sub",
            Self::Multiply => "mul",
            Self::Divide => "div",
            Self::Modulo => "mod",
            Self::Equal => "eq",
            Self::NotEqual => "neq",
            Self::Less => "lt",
            Self::LessEqual => "lte",
            Self::Greater => "gt",
            Self::GreaterEqual => "gte",
            Self::LogicalAnd => "and",
            Self::LogicalOr => "or",
            Self::BitwiseAnd => "bit_and",
            Self::BitwiseOr => "bit_or",
            Self::BitwiseXor => "xor",
            Self::ShiftLeft => "shl",
            Self::ShiftRight => "shr",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for BuiltinFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::Clamp => "clamp",
            Self::Saturate => "saturate",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Round => "round",
            Self::Fract => "fract",
            Self::Trunc => "trunc",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Atan2 => "atan2",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Sqrt => "sqrt",
            Self::InverseSqrt => "inverseSqrt",
            Self::Log => "log",
            Self::Log2 => "log2",
            Self::Exp => "exp",
            Self::Exp2 => "exp2",
            Self::Pow => "pow",
            Self::Dot => "dot",
            Self::Cross => "cross",
            Self::Normalize => "normalize",
            Self::Length => "length",
            Self::Distance => "distance",
            Self::Mix => "mix",
            Self::Step => "step",
            Self::SmoothStep => "smoothstep",
            Self::Fma => "fma",
            Self::All => "all",
            Self::Any => "any",
            Self::Select => "select",
            Self::ArrayLength => "arrayLength",
        };
        write!(f, "{name}")
    }
}

/// Formats a type using the type arena for resolving inner references.
pub fn format_type(ty: &Type, types: &UniqueArena<Type>) -> String {
    format_type_depth(ty, types, 0)
}

/// Formats a [`TypeInner`] using the type arena for resolving references.
pub fn format_type_inner(inner: &TypeInner, types: &UniqueArena<Type>) -> String {
    format_type_inner_depth(inner, types, 0)
}

fn format_type_depth(ty: &Type, types: &UniqueArena<Type>, depth: usize) -> String {
    if let Some(ref name) = ty.name {
        return name.clone();
    }
    format_type_inner_depth(&ty.inner, types, depth)
}

fn base_type_ref(base: crate::arena::Handle<Type>, types: &UniqueArena<Type>, depth: usize) -> String {
    if depth > MAX_DUMP_DEPTH {
        return "...".into();
    }
    match types.try_get(base) {
        Some(ty) => format_type_depth(ty, types, depth + 1),
        None => "<bad type>".into(),
    }
}

fn format_type_inner_depth(inner: &TypeInner, types: &UniqueArena<Type>, depth: usize) -> String {
    match inner {
        TypeInner::Scalar(s) => format!("{s}"),
        TypeInner::Vector { size, scalar } => format!("vec{}<{scalar}>", *size as u32),
        TypeInner::Matrix {
            columns,
            rows,
            scalar,
        } => format!("mat{}x{}<{scalar}>", *columns as u32, *rows as u32),
        TypeInner::Atomic(s) => format!("atomic<{s}>"),
        TypeInner::Array { base, size, .. } => {
            let base_str = base_type_ref(*base, types, depth);
            match size {
                ArraySize::Constant(n) => format!("array<{base_str}, {n}>"),
                ArraySize::Dynamic => format!("array<{base_str}>"),
            }
        }
        TypeInner::Struct { members, span } => {
            format!("struct({} members, span {span})", members.len())
        }
        TypeInner::Pointer {
            base,
            space,
            access,
        } => {
            let base_str = base_type_ref(*base, types, depth);
            format!("ptr<{space}, {base_str}, {access}>")
        }
        TypeInner::Reference {
            base,
            space,
            access,
        } => {
            let base_str = base_type_ref(*base, types, depth);
            format!("ref<{space}, {base_str}, {access}>")
        }
        TypeInner::Sampler { comparison } => {
            if *comparison {
                "sampler_comparison".into()
            } else {
                "sampler".into()
            }
        }
        TypeInner::Texture { dim, arrayed, class } => {
            let dim_str = match dim {
                crate::types::TextureDimension::D1 => "1d",
                crate::types::TextureDimension::D2 => "2d",
                crate::types::TextureDimension::D3 => "3d",
                crate::types::TextureDimension::Cube => "cube",
            };
            let arr = if *arrayed { "_array" } else { "" };
            match class {
                crate::types::TextureClass::Sampled {
                    scalar,
                    multisampled,
                } => {
                    let ms = if *multisampled { "multisampled_" } else { "" };
                    format!("texture_{ms}{dim_str}{arr}<{scalar}>")
                }
                crate::types::TextureClass::Depth { multisampled } => {
                    let ms = if *multisampled { "multisampled_" } else { "" };
                    format!("texture_depth_{ms}{dim_str}{arr}")
                }
                crate::types::TextureClass::Storage { format, access } => {
                    format!("texture_storage_{dim_str}{arr}<{format:?}, {access}>")
                }
            }
        }
        TypeInner::SubgroupMatrix {
            kind,
            scalar,
            columns,
            rows,
        } => format!("subgroup_matrix_{kind:?}<{scalar}, {columns}, {rows}>"),
    }
}

// The dump renders *malformed* modules (it is attached to validation
// failures), so every handle is resolved defensively and block nesting is
// depth-capped against cyclic ownership.
const MAX_DUMP_DEPTH: usize = 64;

fn value_ref(module: &Module, value: Handle<Value>) -> String {
    match module.values.try_get(value) {
        Some(record) => {
            if let crate::value::ValueKind::Constant { value: cv } = record.kind {
                return constant_ref(module, cv);
            }
            match module.name_of(value) {
                Some(name) => format!("%{name}"),
                None => format!("%{}", value.index()),
            }
        }
        None => format!("%<bad {}>", value.index()),
    }
}

fn type_ref(module: &Module, ty: Handle<Type>) -> String {
    match module.types.try_get(ty) {
        Some(record) => format_type(record, &module.types),
        None => "<bad type>".into(),
    }
}

fn constant_ref(module: &Module, constant: Handle<ConstantValue>) -> String {
    match module.constants.try_get(constant) {
        Some(ConstantValue::Scalar { value, .. }) => format!("{value}"),
        Some(ConstantValue::Composite { elements, .. }) => {
            let parts: Vec<_> = elements.iter().map(|&e| constant_ref(module, e)).collect();
            format!("{{{}}}", parts.join(", "))
        }
        Some(ConstantValue::Splat { value, count, .. }) => {
            format!("splat({}, {count})", constant_ref(module, *value))
        }
        None => "<bad constant>".into(),
    }
}

fn result_ref(module: &Module, inst: &Instruction) -> String {
    if inst.results.is_empty() {
        return String::new();
    }
    let parts: Vec<_> = inst
        .results
        .iter()
        .map(|&r| {
            let ty = match module.values.try_get(r) {
                Some(value) => type_ref(module, value.ty),
                None => "<bad type>".into(),
            };
            format!("{}:{ty}", value_ref(module, r))
        })
        .collect();
    format!("{} = ", parts.join(", "))
}

fn operand_list(module: &Module, operands: &[Handle<Value>]) -> String {
    let parts: Vec<_> = operands.iter().map(|&o| value_ref(module, o)).collect();
    parts.join(", ")
}

fn write_inst(
    out: &mut String,
    module: &Module,
    inst: Handle<Instruction>,
    indent: usize,
    depth: usize,
) {
    let pad = " ".repeat(indent);
    let Some(record) = module.instructions.try_get(inst) else {
        out.push_str(&format!("{pad}<bad instruction {}>\n", inst.index()));
        return;
    };
    let results = result_ref(module, record);
    let operands = operand_list(module, &record.operands);

    match &record.op {
        Op::Binary { op } => {
            out.push_str(&format!("{pad}{results}binary {op} {operands}\n"));
        }
        Op::Unary { op } => {
            out.push_str(&format!("{pad}{results}unary {op} {operands}\n"));
        }
        Op::BuiltinCall { builtin } => {
            out.push_str(&format!("{pad}{results}call {builtin}({operands})\n"));
        }
        Op::UserCall { func } => {
            let name = module
                .functions
                .try_get(*func)
                .and_then(|f| f.name.as_deref())
                .unwrap_or("_");
            out.push_str(&format!("{pad}{results}call {name}({operands})\n"));
        }
        Op::Swizzle { indices } => {
            let comps: String = indices
                .iter()
                .map(|&i| ["x", "y", "z", "w"].get(i as usize).copied().unwrap_or("?"))
                .collect();
            out.push_str(&format!("{pad}{results}swizzle {operands}.{comps}\n"));
        }
        Op::Var {
            binding_point,
            input_attachment_index,
        } => {
            let binding = match binding_point {
                Some(bp) => format!(" {bp}"),
                None => String::new(),
            };
            let attach = match input_attachment_index {
                Some(i) => format!(" @input_attachment_index({i})"),
                None => String::new(),
            };
            let init = if operands.is_empty() {
                String::new()
            } else {
                format!(" = {operands}")
            };
            out.push_str(&format!("{pad}{results}var{binding}{attach}{init}\n"));
        }
        Op::Override { override_id } => {
            let id = match override_id {
                Some(id) => format!(" @id({id})"),
                None => String::new(),
            };
            let init = if operands.is_empty() {
                String::new()
            } else {
                format!(" = {operands}")
            };
            out.push_str(&format!("{pad}{results}override{id}{init}\n"));
        }
        Op::If {
            true_block,
            false_block,
        } => {
            out.push_str(&format!("{pad}{results}if {operands} {{\n"));
            write_block(out, module, *true_block, indent + 2, depth + 1);
            if !module.blocks[*false_block].insts.is_empty() {
                out.push_str(&format!("{pad}}} else {{\n"));
                write_block(out, module, *false_block, indent + 2, depth + 1);
            }
            out.push_str(&format!("{pad}}}\n"));
        }
        Op::Loop {
            initializer,
            body,
            continuing,
        } => {
            out.push_str(&format!("{pad}{results}loop {{\n"));
            if let Some(init) = initializer {
                out.push_str(&format!("{pad}  initializer {{\n"));
                write_block(out, module, *init, indent + 4, depth + 1);
                out.push_str(&format!("{pad}  }}\n"));
            }
            out.push_str(&format!("{pad}  body {{\n"));
            write_block(out, module, *body, indent + 4, depth + 1);
            out.push_str(&format!("{pad}  }}\n"));
            if let Some(cont) = continuing {
                out.push_str(&format!("{pad}  continuing {{\n"));
                write_block(out, module, *cont, indent + 4, depth + 1);
                out.push_str(&format!("{pad}  }}\n"));
            }
            out.push_str(&format!("{pad}}}\n"));
        }
        Op::Switch { cases } => {
            out.push_str(&format!("{pad}{results}switch {operands} {{\n"));
            for case in cases {
                let selectors: Vec<_> = case
                    .selectors
                    .iter()
                    .map(|s| match s {
                        CaseSelector::Value(c) => constant_ref(module, *c),
                        CaseSelector::Default => "default".into(),
                    })
                    .collect();
                out.push_str(&format!("{pad}  case {} {{\n", selectors.join(", ")));
                write_block(out, module, case.block, indent + 4, depth + 1);
                out.push_str(&format!("{pad}  }}\n"));
            }
            out.push_str(&format!("{pad}}}\n"));
        }
        op => {
            if operands.is_empty() {
                out.push_str(&format!("{pad}{results}{}\n", op.name()));
            } else {
                out.push_str(&format!("{pad}{results}{} {operands}\n", op.name()));
            }
        }
    }
}

fn write_block(
    out: &mut String,
    module: &Module,
    block: Handle<Block>,
    indent: usize,
    depth: usize,
) {
    let pad = " ".repeat(indent);
    if depth > MAX_DUMP_DEPTH {
        out.push_str(&format!("{pad}...\n"));
        return;
    }
    let Some(record) = module.blocks.try_get(block) else {
        out.push_str(&format!("{pad}<bad block {}>\n", block.index()));
        return;
    };
    if !record.params.is_empty() {
        let params: Vec<_> = record
            .params
            .iter()
            .map(|&p| {
                let ty = match module.values.try_get(p) {
                    Some(value) => type_ref(module, value.ty),
                    None => "<bad type>".into(),
                };
                format!("{}:{ty}", value_ref(module, p))
            })
            .collect();
        out.push_str(&format!("{pad}params: {}\n", params.join(", ")));
    }
    for &inst in &record.insts {
        write_inst(out, module, inst, indent, depth);
    }
}

/// Produces a human-readable text dump of a [`Module`] for debugging.
pub fn dump_module(module: &Module) -> String {
    let mut out = String::new();

    // Types
    out.push_str("Types:\n");
    for (handle, ty) in module.types.iter() {
        let formatted = format_type(ty, &module.types);
        out.push_str(&format!("  {handle:?} {formatted}\n"));
    }

    // Module-scope declarations
    if !module.blocks[module.root_block].insts.is_empty() {
        out.push_str("\nModule:\n");
        write_block(&mut out, module, module.root_block, 2, 0);
    }

    // Functions
    if !module.functions.is_empty() {
        out.push_str("\nFunctions:\n");
        for (_, func) in module.functions.iter() {
            write_function(&mut out, module, func);
        }
    }

    out
}

fn write_function(out: &mut String, module: &Module, func: &Function) {
    let name = func.name.as_deref().unwrap_or("_");

    match (func.stage, func.workgroup_size) {
        (Some(crate::func::Stage::Compute), Some([x, y, z])) => {
            out.push_str(&format!("  @compute @workgroup_size({x}, {y}, {z})\n"));
        }
        (Some(stage), _) => {
            out.push_str(&format!("  @{stage}\n"));
        }
        (None, _) => {}
    }

    let params: Vec<_> = func
        .params
        .iter()
        .map(|&p| match module.values.try_get(p) {
            Some(value) => {
                let ty = type_ref(module, value.ty);
                let attrs = match value.kind {
                    crate::value::ValueKind::FunctionParam { ref attributes, .. } => {
                        let mut parts = String::new();
                        if let Some(b) = attributes.builtin {
                            parts.push_str(&format!("@builtin({b}) "));
                        }
                        if let Some(loc) = attributes.location {
                            parts.push_str(&format!("@location({loc}) "));
                        }
                        parts
                    }
                    _ => String::new(),
                };
                format!("{attrs}{}:{ty}", value_ref(module, p))
            }
            None => format!("%<bad {}>", p.index()),
        })
        .collect();

    let ret = match func.return_type {
        Some(ty) => format!(" -> {}", type_ref(module, ty)),
        None => String::new(),
    };

    out.push_str(&format!("  fn {name}({}){ret} {{\n", params.join(", ")));
    if let Some(block) = func.block {
        write_block(out, module, block, 4, 0);
    }
    out.push_str("  }\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::inst::BinaryOp;

    #[test]
    fn display_scalar() {
        assert_eq!(format!("{}", Scalar::F32), "f32");
        assert_eq!(format!("{}", Scalar::I32), "i32");
        assert_eq!(format!("{}", Scalar::U32), "u32");
        assert_eq!(format!("{}", Scalar::F16), "f16");
        assert_eq!(format!("{}", Scalar::BOOL), "bool");
    }

    #[test]
    fn display_access() {
        assert_eq!(format!("{}", Access::LOAD), "read");
        assert_eq!(format!("{}", Access::LOAD_STORE), "read_write");
    }

    #[test]
    fn display_binding_point() {
        let bp = BindingPoint {
            group: 0,
            binding: 2,
        };
        assert_eq!(format!("{bp}"), "@group(0) @binding(2)");
    }

    #[test]
    fn display_scalar_value() {
        assert_eq!(format!("{}", ScalarValue::F32(3.25)), "3.25f");
        assert_eq!(format!("{}", ScalarValue::U32(7)), "7u");
        assert_eq!(format!("{}", ScalarValue::Bool(true)), "true");
    }

    #[test]
    fn dump_empty_module() {
        let module = Module::default();
        let dump = dump_module(&module);
        assert!(dump.contains("Types:"));
    }

    #[test]
    fn dump_simple_function() {
        let mut module = Module::new();
        let mut b = Builder::new(&mut module);

        let f32_ty = b.ty_f32();
        let func = b.function("double", Some(f32_ty));
        let body = b.body(func);
        let x = b.param(func, Some("x"), f32_ty, Default::default());
        let sum = b.binary(body, BinaryOp::Add, x, x, f32_ty);
        b.ret(body, func, Some(sum));

        let dump = dump_module(&module);
        assert!(dump.contains("fn double"));
        assert!(dump.contains("binary add %x, %x"));
        assert!(dump.contains("return"));
    }
}
