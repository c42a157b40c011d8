//! Instructions — the operations of the IR.
//!
//! Each instruction is a tagged [`Op`] payload plus flat operand/result
//! lists of value handles, mirroring the wire format exactly. Control
//! instructions (`If`, `Loop`, `Switch`) own nested blocks; exit-class
//! instructions name the control instruction they transfer to.

use crate::arena::Handle;
use crate::block::Block;
use crate::constant::ConstantValue;
use crate::func::Function;
use crate::io::BindingPoint;
use crate::value::Value;

/// A unary operator.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
    BitwiseNot,
}

/// A binary operator.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
}

/// A built-in function callable via [`Op::BuiltinCall`].
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BuiltinFn {
    // Component-wise
    Abs,
    Min,
    Max,
    Clamp,
    Saturate,
    // Rounding
    Floor,
    Ceil,
    Round,
    Fract,
    Trunc,
    // Trigonometric
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    // Exponential
    Sqrt,
    InverseSqrt,
    Log,
    Log2,
    Exp,
    Exp2,
    Pow,
    // Linear algebra
    Dot,
    Cross,
    Normalize,
    Length,
    Distance,
    // Interpolation
    Mix,
    Step,
    SmoothStep,
    // Fused multiply-add
    Fma,
    // Logical reductions
    All,
    Any,
    Select,
    // Runtime-sized arrays
    ArrayLength,
}

/// One `case` arm of a [`Op::Switch`].
#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub selectors: Vec<CaseSelector>,
    pub block: Handle<Block>,
}

/// A selector of a switch case: a constant value or the default.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaseSelector {
    Value(Handle<ConstantValue>),
    Default,
}

/// The tagged payload of an instruction.
///
/// Value operands are not stored here — they live in the instruction's flat
/// operand list, in the order documented per variant.
#[derive(Clone, Debug)]
pub enum Op {
    /// Operands: `lhs, rhs`. One result.
    Binary { op: BinaryOp },
    /// Operands: `value`. One result.
    Unary { op: UnaryOp },
    /// Operands: `object, index...`. One result: element value, or a
    /// pointer into the object when the object is a memory view.
    Access,
    /// Operands: `value`. One result of the reinterpreted type.
    Bitcast,
    /// Operands: `condition`, then exit values matching `loop_`'s results,
    /// then next-iteration values matching the body's params. Only valid
    /// as the last instruction of `loop_`'s continuing block.
    BreakIf { loop_: Handle<Instruction> },
    /// Operands: `argument...`. One result. Zero arguments denote the
    /// zero value of the result type.
    Construct,
    /// Operands: `next_iter_value...`, passed to the continuing block's
    /// params. Only valid inside `loop_`'s body.
    Continue { loop_: Handle<Instruction> },
    /// Operands: `value`. One result of the converted type.
    Convert,
    /// Operands: per [`BuiltinFn`] signature. One result.
    BuiltinCall { builtin: BuiltinFn },
    /// No operands, no results. Terminates the fragment invocation.
    Discard,
    /// Operands: `exit_value...`, matching `if_`'s results.
    ExitIf { if_: Handle<Instruction> },
    /// Operands: `exit_value...`, matching `loop_`'s results.
    ExitLoop { loop_: Handle<Instruction> },
    /// Operands: `exit_value...`, matching `switch`'s results.
    ExitSwitch { switch: Handle<Instruction> },
    /// Operands: `condition`. Results: the values produced by the exits.
    If {
        true_block: Handle<Block>,
        false_block: Handle<Block>,
    },
    /// Operands: `value`. One result aliasing the operand.
    Let,
    /// Operands: `pointer`. One result: the loaded value.
    Load,
    /// Operands: `pointer, index`. One result: the vector element.
    LoadVectorElement,
    /// Results: the values produced by `ExitLoop`/`BreakIf`.
    Loop {
        initializer: Option<Handle<Block>>,
        body: Handle<Block>,
        continuing: Option<Handle<Block>>,
    },
    /// Operands: `body_value...`, passed to the body block's params.
    /// Only valid inside `loop_`'s initializer or continuing block.
    NextIteration { loop_: Handle<Instruction> },
    /// Operands: `initializer?`. One result. Module-scope only.
    Override { override_id: Option<u16> },
    /// Operands: `value`. No results. Capability-gated.
    Phony,
    /// Operands: `value?`, matching `func`'s return type.
    Return { func: Handle<Function> },
    /// Operands: `pointer, value`. No results.
    Store,
    /// Operands: `pointer, index, value`. No results.
    StoreVectorElement,
    /// Operands: `vector`. One result of `indices.len()` components.
    Swizzle { indices: Vec<u32> },
    /// Operands: `selector`. Results: the values produced by the exits.
    Switch { cases: Vec<SwitchCase> },
    /// No operands, no results. Never executed.
    Unreachable,
    /// Operands: `argument...`. One result when the callee returns a value.
    UserCall { func: Handle<Function> },
    /// Operands: `initializer?`. One result: a pointer to the storage.
    Var {
        binding_point: Option<BindingPoint>,
        input_attachment_index: Option<u32>,
    },
}

impl Op {
    /// A short mnemonic for diagnostics and disassembly.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Binary { .. } => "binary",
            Self::Unary { .. } => "unary",
            Self::Access => "access",
            Self::Bitcast => "bitcast",
            Self::BreakIf { .. } => "break_if",
            Self::Construct => "construct",
            Self::Continue { .. } => "continue",
            Self::Convert => "convert",
            Self::BuiltinCall { .. } => "call",
            Self::Discard => "discard",
            Self::ExitIf { .. } => "exit_if",
            Self::ExitLoop { .. } => "exit_loop",
            Self::ExitSwitch { .. } => "exit_switch",
            Self::If { .. } => "if",
            Self::Let => "let",
            Self::Load => "load",
            Self::LoadVectorElement => "load_vector_element",
            Self::Loop { .. } => "loop",
            Self::NextIteration { .. } => "next_iteration",
            Self::Override { .. } => "override",
            Self::Phony => "phony",
            Self::Return { .. } => "return",
            Self::Store => "store",
            Self::StoreVectorElement => "store_vector_element",
            Self::Swizzle { .. } => "swizzle",
            Self::Switch { .. } => "switch",
            Self::Unreachable => "unreachable",
            Self::UserCall { .. } => "call",
            Self::Var { .. } => "var",
        }
    }

    /// Returns `true` for instructions that end a block's control flow.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::BreakIf { .. }
                | Self::Continue { .. }
                | Self::Discard
                | Self::ExitIf { .. }
                | Self::ExitLoop { .. }
                | Self::ExitSwitch { .. }
                | Self::NextIteration { .. }
                | Self::Return { .. }
                | Self::Unreachable
        )
    }

    /// Returns `true` for instructions that own nested blocks.
    pub fn is_control(&self) -> bool {
        matches!(self, Self::If { .. } | Self::Loop { .. } | Self::Switch { .. })
    }

    /// The nested blocks a control instruction owns, in execution order.
    pub fn child_blocks(&self) -> Vec<Handle<Block>> {
        match *self {
            Self::If {
                true_block,
                false_block,
            } => vec![true_block, false_block],
            Self::Loop {
                initializer,
                body,
                continuing,
            } => {
                let mut blocks = Vec::new();
                blocks.extend(initializer);
                blocks.push(body);
                blocks.extend(continuing);
                blocks
            }
            Self::Switch { ref cases } => cases.iter().map(|c| c.block).collect(),
            _ => Vec::new(),
        }
    }
}

/// An instruction: a tagged payload, flat operand/result lists, and a back
/// handle to the owning block.
#[derive(Clone, Debug)]
pub struct Instruction {
    pub op: Op,
    pub operands: Vec<Handle<Value>>,
    pub results: Vec<Handle<Value>>,
    pub block: Option<Handle<Block>>,
}

impl Instruction {
    /// Creates a detached instruction with no operands or results.
    pub fn nullary(op: Op) -> Self {
        Self {
            op,
            operands: Vec::new(),
            results: Vec::new(),
            block: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminator_classification() {
        assert!(Op::Return {
            func: Handle::new(0)
        }
        .is_terminator());
        assert!(Op::Unreachable.is_terminator());
        assert!(Op::Discard.is_terminator());
        assert!(Op::ExitLoop {
            loop_: Handle::new(0)
        }
        .is_terminator());
        assert!(!Op::Store.is_terminator());
        assert!(!Op::If {
            true_block: Handle::new(0),
            false_block: Handle::new(1),
        }
        .is_terminator());
    }

    #[test]
    fn control_classification() {
        assert!(Op::If {
            true_block: Handle::new(0),
            false_block: Handle::new(1),
        }
        .is_control());
        assert!(Op::Loop {
            initializer: None,
            body: Handle::new(0),
            continuing: None,
        }
        .is_control());
        assert!(!Op::Load.is_control());
    }

    #[test]
    fn loop_child_blocks_in_execution_order() {
        let init = Handle::new(0);
        let body = Handle::new(1);
        let cont = Handle::new(2);

        let full = Op::Loop {
            initializer: Some(init),
            body,
            continuing: Some(cont),
        };
        assert_eq!(full.child_blocks(), vec![init, body, cont]);

        let bare = Op::Loop {
            initializer: None,
            body,
            continuing: None,
        };
        assert_eq!(bare.child_blocks(), vec![body]);
    }
}
