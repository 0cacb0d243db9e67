//! Ahead-of-time compiler for a subset of C, targeting x86-64 ELF on Linux.
//!
//! Each module corresponds to one pipeline stage (§2): [`lexer`] and
//! [`parser`] turn source text into an [`ast`], [`ir`] lowers the AST to a
//! three-address form and applies the System V AMD64 ABI at call sites,
//! [`regalloc`] places virtual temps into physical registers or spill
//! slots, [`codegen`] serializes the allocated IR to AT&T assembly text,
//! and [`backend`] assembles that text straight to an ELF64 executable
//! when nothing in the program needs dynamic linking. [`driver`] wires all
//! of this into the `subc` binary; the ambient `subc-dump` debugging binary
//! (`src/tools/dump_ir.rs`) is a separate `[[bin]]` target built on top of
//! this library's public API, not a module of it.

pub mod ast;
pub mod backend;
pub mod codegen;
pub mod driver;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod regalloc;

use std::path::Path;

use error::CompileResult;
use ir::module::IrModule;

/// Runs preprocessing through IR generation and register allocation for
/// `source`, without emitting assembly or linking anything. Used by
/// `subc-dump` and by tests that only need the allocated IR.
pub fn compile_to_ir(path: impl AsRef<Path>, source: &str, strategy: regalloc::Strategy) -> CompileResult<IrModule> {
    let preprocessed = driver::preprocess::preprocess(source);
    let tokens = lexer::Lexer::new(&path, &preprocessed).tokenize()?;
    let tu = parser::Parser::new(&path, &tokens).parse_translation_unit()?;
    let mut module = ir::IrGen::new(&path).generate(&tu)?;
    for func in &mut module.functions {
        regalloc::allocate(func, strategy);
    }
    Ok(module)
}
