//! Diagnostics accumulated during validation.

use std::fmt;

use shade_ir::{Handle, Instruction};

/// The category of a validation failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DiagKind {
    /// Malformed graph: dangling operands, misplaced terminators, bad
    /// ownership back-references.
    Structural,
    /// Operand/result type mismatch against the overload tables.
    Type,
    /// Shader-IO, binding, recursion, or capability violations.
    Semantic,
}

impl fmt::Display for DiagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Structural => "structural",
            Self::Type => "type",
            Self::Semantic => "semantic",
        })
    }
}

/// One validation failure.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub kind: DiagKind,
    pub message: String,
    /// The offending instruction, when there is one.
    pub inst: Option<Handle<Instruction>>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inst {
            Some(inst) => write!(f, "{} error at instruction {:?}: {}", self.kind, inst, self.message),
            None => write!(f, "{} error: {}", self.kind, self.message),
        }
    }
}

/// The aggregate failure of a `validate` call.
///
/// Carries every diagnostic discovered in the run plus a disassembly of the
/// offending module for debugging context.
#[derive(Debug)]
pub struct ValidationError {
    pub diagnostics: Vec<Diagnostic>,
    pub disassembly: String,
}

impl std::error::Error for ValidationError {}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "IR validation failed with {} error(s):",
            self.diagnostics.len()
        )?;
        for diag in &self.diagnostics {
            writeln!(f, "  {diag}")?;
        }
        writeln!(f)?;
        writeln!(f, "Module:")?;
        write!(f, "{}", self.disassembly)
    }
}
