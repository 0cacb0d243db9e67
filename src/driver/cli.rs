//! Command-line surface (§6), grounded on the grounding repo's
//! `clap::Parser`-derive style in `src/tools/tools.rs` — a single flag-driven
//! binary rather than a subcommand tree, since this driver only ever does
//! one thing (compile a file).

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "subc", about = "Ahead-of-time compiler for a subset of C, targeting x86-64 ELF on Linux")]
pub struct Args {
    /// C source file to compile.
    pub source: PathBuf,

    /// Output filename.
    #[arg(short = 'o', default_value = "a.out")]
    pub output: PathBuf,

    /// Execute the produced binary after a successful compile; its exit
    /// code becomes this process's exit code.
    #[arg(long = "run")]
    pub run: bool,

    /// Emit per-phase timing to stderr.
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Stop after code emission; write assembly text to `<output>.s`
    /// instead of linking a binary.
    #[arg(short = 'S')]
    pub emit_asm: bool,

    /// Use the linear-scan register allocator instead of graph coloring.
    #[arg(long = "linear-scan")]
    pub linear_scan: bool,
}
