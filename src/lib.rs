pub use crate::diagnostics::{ErrorCategory, ErrorKind, SourceContext, VouchError, Warning};

pub mod cli;
pub mod codegen;
pub mod constraints;
pub mod diagnostics;
pub mod extract;
pub mod rules;
pub mod source;
pub mod syntax;
