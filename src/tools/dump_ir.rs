//! `subc-dump`: prints the AST, unallocated IR, or allocated IR for a
//! single source file without producing an executable. Test/debugging tool,
//! not part of the compiler surface proper (§6) — grounded on the grounding
//! repo's `Args`/`Operation` clap shape in `src/tools/tools.rs`, scaled down
//! to one file since this tool has three operations, not thirty.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use subc::driver::preprocess;
use subc::ir::IrGen;
use subc::lexer::Lexer;
use subc::parser::Parser as SubcParser;
use subc::regalloc::Strategy;

/// Inspect a subc compilation at an intermediate stage.
#[derive(Debug, Parser)]
struct Args {
    /// input C source file
    input: PathBuf,

    #[command(subcommand)]
    operation: Operation,
}

#[derive(Debug, Subcommand)]
enum Operation {
    /// Print the parsed AST.
    DumpAst,
    /// Print the IR before register allocation.
    DumpIr,
    /// Print the IR after register allocation (graph coloring).
    DumpAllocatedIr,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let source = fs::read_to_string(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
    let preprocessed = preprocess::preprocess(&source);

    match args.operation {
        Operation::DumpAst => {
            let tokens = Lexer::new(&args.input, &preprocessed).tokenize()?;
            let tu = SubcParser::new(&args.input, &tokens).parse_translation_unit()?;
            println!("{tu:#?}");
        }
        Operation::DumpIr => {
            let tokens = Lexer::new(&args.input, &preprocessed).tokenize()?;
            let tu = SubcParser::new(&args.input, &tokens).parse_translation_unit()?;
            let module = IrGen::new(&args.input).generate(&tu)?;
            println!("{module:#?}");
        }
        Operation::DumpAllocatedIr => {
            let module = subc::compile_to_ir(&args.input, &source, Strategy::GraphColoring)?;
            println!("{module:#?}");
        }
    }
    Ok(())
}
