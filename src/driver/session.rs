//! Orchestrates one compilation end to end (§2, §5): preprocess → lex →
//! parse → lower to IR → allocate registers → emit assembly → assemble (or
//! fall back to `cc`). Mirrors the grounding repo's pattern of a top-level
//! object that owns the tables threaded by reference into every stage
//! (`examples/Vector35-idb-rs/src/til/section.rs`'s `TILSectionHeader`) —
//! here that's the type-alias/struct-layout environment the parser builds
//! and the IR generator never needs to rebuild.

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::backend;
use crate::codegen;
use crate::driver::cli::Args;
use crate::driver::preprocess;
use crate::ir::gen::IrGen;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::regalloc::{self, Strategy};

pub struct CompileSession {
    source_path: PathBuf,
    verbose: bool,
}

impl CompileSession {
    pub fn new(source_path: impl AsRef<Path>, verbose: bool) -> Self {
        Self {
            source_path: source_path.as_ref().to_path_buf(),
            verbose,
        }
    }

    fn time_stage<T>(&self, name: &'static str, f: impl FnOnce() -> CompileResultT<T>) -> CompileResultT<T> {
        let start = Instant::now();
        let result = f();
        if self.verbose {
            info!(stage = name, elapsed_us = start.elapsed().as_micros() as u64, "stage complete");
        }
        result
    }

    /// Runs the full pipeline and writes whatever artifact `args` asks for.
    /// Returns the exit code the driver should use (0 on success unless
    /// `-run` overrides it with the child program's status).
    pub fn compile(&self, args: &Args) -> Result<i32> {
        let span = tracing::info_span!("compile", source = %self.source_path.display());
        let _enter = span.enter();

        let raw = fs::read_to_string(&self.source_path)
            .with_context(|| format!("reading {}", self.source_path.display()))?;

        let source = self.time_stage("preprocess", || Ok(preprocess::preprocess(&raw)))?;

        let tokens = self.time_stage("lex", || Lexer::new(&self.source_path, &source).tokenize())?;

        let tu = self.time_stage("parse", || Parser::new(&self.source_path, &tokens).parse_translation_unit())?;

        let mut module = self.time_stage("ir-gen", || IrGen::new(&self.source_path).generate(&tu))?;

        let strategy = if args.linear_scan { Strategy::LinearScan } else { Strategy::GraphColoring };
        self.time_stage("regalloc", || {
            for func in &mut module.functions {
                regalloc::allocate(func, strategy);
            }
            Ok(())
        })?;

        let asm = self.time_stage("emit", || codegen::emit_module(&module))?;

        if args.emit_asm {
            let asm_path = args.output.with_extension("s");
            fs::write(&asm_path, asm.render()).with_context(|| format!("writing {}", asm_path.display()))?;
            return Ok(0);
        }

        if module.externs.is_empty() {
            let bytes = self.time_stage("assemble", || backend::assemble(&asm))?;
            write_executable(&args.output, &bytes)?;
        } else {
            self.time_stage("cc-fallback", || link_with_cc(&asm.render(), &args.output))?;
        }

        if args.run {
            let status = Command::new(
                args.output
                    .canonicalize()
                    .unwrap_or_else(|_| args.output.clone()),
            )
            .status()
            .with_context(|| format!("running {}", args.output.display()))?;
            return Ok(status.code().unwrap_or(1));
        }

        Ok(0)
    }
}

/// Writes `bytes` to `path` as a world-executable file. The driver never
/// leaves a partial binary on disk (§7): bytes are fully assembled in memory
/// before this is called, so there's nothing to roll back on a write failure
/// beyond the temp file itself.
fn write_executable(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut f = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(bytes)?;
    }
    let mut perms = fs::metadata(&tmp)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&tmp, perms)?;
    fs::rename(&tmp, path).with_context(|| format!("renaming {} to {}", tmp.display(), path.display()))?;
    Ok(())
}

/// Hands the emitted assembly text to the system toolchain when an extern
/// reference (e.g. `printf`) needs dynamic linking this backend doesn't
/// implement (§4.6, §6).
fn link_with_cc(asm_text: &str, output: &Path) -> Result<()> {
    let tmp_asm = output.with_extension("cc-input.s");
    fs::write(&tmp_asm, asm_text).with_context(|| format!("writing {}", tmp_asm.display()))?;
    let status = Command::new("cc")
        .arg(&tmp_asm)
        .arg("-o")
        .arg(output)
        .status()
        .context("invoking cc for the extern-symbol fallback path")?;
    let _ = fs::remove_file(&tmp_asm);
    if !status.success() {
        bail!("cc exited with {status}");
    }
    Ok(())
}

/// Local alias so `time_stage` can be generic over the real `CompileResult`
/// without importing it under a name that collides with `anyhow::Result`.
/// `CompileError` already implements `std::error::Error`, so anyhow's
/// blanket `From` impl is what turns the `?` below into an `anyhow::Error`.
type CompileResultT<T> = crate::error::CompileResult<T>;
