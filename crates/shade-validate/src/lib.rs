//! Validation for Shade IR modules.
//!
//! The validator is the gate between the front end and every downstream
//! consumer: nothing may assume a module is well-formed until
//! [`validate`] has succeeded. It checks structural soundness (scopes,
//! ownership back-references, terminators, control nesting), semantic
//! rules (operator overloads, shader-IO builtins, binding points, the
//! recursion ban), and capability gating, accumulating every discoverable
//! diagnostic into one failure.

mod capabilities;
mod diag;
pub mod io;
mod overload;
mod validator;

pub use capabilities::Capabilities;
pub use diag::{DiagKind, Diagnostic, ValidationError};
pub use io::IoDirection;
pub use validator::validate;
