//! Error types for the Shade IR.

/// Errors that can occur while constructing IR.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// A handle index is out of bounds for its arena.
    #[error("handle index {index} out of bounds (arena size: {size})")]
    BadHandle { index: usize, size: usize },

    /// A composite constant's element count disagrees with its type.
    #[error("composite element count mismatch: type expects {expected}, found {found}")]
    CompositeCountMismatch { expected: u32, found: u32 },

    /// A composite or splat exceeds the element-count ceiling.
    #[error("composite with {count} elements exceeds the limit of {max}")]
    CompositeTooLarge { count: u32, max: u32 },

    /// A composite constant was requested for a non-composite type.
    #[error("type is not a composite: {ty}")]
    NotComposite { ty: String },

    /// A zero value was requested for a type with no zero value.
    #[error("type has no zero value: {ty}")]
    NotConstructible { ty: String },
}
