//! Code generation backends.

pub mod mips;

pub use mips::MipsBackend;

use crate::ir::Instruction;
use crate::CompileError;

/// A code generator turning cleaned-up IR into assembly text.
pub trait Backend {
    fn generate(&self, code: &[Instruction]) -> Result<String, CompileError>;

    fn name(&self) -> &'static str;
}
