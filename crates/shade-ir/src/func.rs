//! Functions and pipeline stages.

use crate::arena::Handle;
use crate::block::Block;
use crate::io::IoAttributes;
use crate::types::Type;
use crate::value::Value;

/// The pipeline stage of an entry point.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    Compute,
    Vertex,
    Fragment,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Compute => "compute",
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

/// An IR function.
///
/// A function with a `stage` is an entry point; compute entry points also
/// carry a workgroup size. Non-entry functions may be anonymous.
#[derive(Clone, Debug)]
pub struct Function {
    /// Optional function name.
    pub name: Option<String>,
    /// Formal parameters, as [`FunctionParam`](crate::ValueKind::FunctionParam) values.
    pub params: Vec<Handle<Value>>,
    /// Return type; `None` means the function returns nothing.
    pub return_type: Option<Handle<Type>>,
    /// Shader-IO attributes of the return value.
    pub return_attributes: IoAttributes,
    /// Pipeline stage; `None` means not an entry point.
    pub stage: Option<Stage>,
    /// Workgroup dimensions `[x, y, z]`, for compute entry points.
    pub workgroup_size: Option<[u32; 3]>,
    /// The root block of the function body; `None` only while detached.
    pub block: Option<Handle<Block>>,
}

impl Function {
    /// Creates an empty function with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            params: Vec::new(),
            return_type: None,
            return_attributes: IoAttributes::default(),
            stage: None,
            workgroup_size: None,
            block: None,
        }
    }

    /// Returns `true` if this function is a pipeline entry point.
    pub fn is_entry_point(&self) -> bool {
        self.stage.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_new() {
        let f = Function::new("main");
        assert_eq!(f.name.as_deref(), Some("main"));
        assert!(f.params.is_empty());
        assert!(f.return_type.is_none());
        assert!(!f.is_entry_point());
        assert!(f.block.is_none());
    }

    #[test]
    fn entry_point_stage() {
        let mut f = Function::new("cs_main");
        f.stage = Some(Stage::Compute);
        f.workgroup_size = Some([64, 1, 1]);
        assert!(f.is_entry_point());
        assert_eq!(format!("{}", Stage::Compute), "compute");
    }
}
