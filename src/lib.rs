//! Back end for the C-- teaching language.
//!
//! Takes a typed syntax tree and runs it through three stages: scope-aware
//! semantic analysis, translation to three-address IR, and MIPS32 assembly
//! generation. Each stage runs only if the previous one succeeded; semantic
//! diagnostics stop the pipeline before any code is produced.

pub mod ast;
pub mod backend;
pub mod codegen;
pub mod ir;
pub mod symtab;
pub mod typechecker;

use snafu::Snafu;

use backend::{Backend, MipsBackend};
use codegen::Lowering;
use ir::Instruction;
use symtab::ScopePolicy;
use typechecker::{SemanticError, TypeChecker};

#[derive(Debug, Snafu)]
pub enum CompileError {
    #[snafu(display("{}", render_diagnostics(diagnostics)))]
    Semantic { diagnostics: Vec<SemanticError> },

    #[snafu(display("not implemented: {feature}"))]
    NotImplemented { feature: String },

    /// Malformed IR or a broken stage invariant; never a user error.
    #[snafu(display("internal error: {message}"))]
    Internal { message: String },
}

fn render_diagnostics(diagnostics: &[SemanticError]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug)]
pub struct CompileOutput {
    pub ir: Vec<Instruction>,
    pub assembly: String,
}

pub struct Compiler;

impl Compiler {
    pub fn new() -> Self {
        Compiler
    }

    pub fn compile_program(&self, program: &ast::Program) -> Result<CompileOutput, CompileError> {
        // The flat policy keeps every symbol in the finished table, which
        // the lowering pass resolves names through.
        let mut checker = TypeChecker::with_policy(ScopePolicy::Flat);
        if let Err(diagnostics) = checker.check_program(program) {
            return Err(CompileError::Semantic { diagnostics });
        }
        let table = checker.into_symbol_table();
        let ir = Lowering::new(&table).lower_program(program)?;
        let assembly = MipsBackend.generate(&ir)?;
        Ok(CompileOutput { ir, assembly })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

/// Semantic analysis alone, under ordinary lexical scoping.
pub fn check(program: &ast::Program) -> Result<(), Vec<SemanticError>> {
    TypeChecker::new().check_program(program)
}
