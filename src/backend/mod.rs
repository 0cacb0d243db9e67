//! Native backend entry point: assembles `codegen::AsmModule` straight to an
//! ELF64 executable, skipping a `cc`/`as`/`ld` round trip (§4.6). The driver
//! decides whether to call this at all — any unresolved extern makes it fall
//! back to the system toolchain instead (§1, §6) — so everything past
//! [`assemble`] can assume a closed, statically-linked program.

pub mod assembler;
pub mod elf;
pub mod encode;

use std::collections::HashMap;

use crate::codegen::AsmModule;
use crate::error::{CompileError, CompileResult};

fn internal(message: impl Into<String>) -> CompileError {
    CompileError::internal(message)
}

/// `_start` has no signal frame and no libc to return into: it calls `main`
/// directly and turns its return value into the process exit status via the
/// bare `exit` syscall (rax=60). Hand-assembled through the same text path
/// every other instruction goes through rather than poked in as raw bytes,
/// so a mistake here would show up the same way a bug in the emitter would.
const START_STUB: &str = "\
_start:
  call main
  mov %eax, %edi
  mov $60, %eax
  syscall
";

/// Assembles `asm` to a ready-to-write ELF64 executable. Returns an
/// `Internal` error (not a hard failure — callers check
/// `IrModule::externs` first and only reach this when it's empty) if a
/// patch target can't be resolved against the symbol table, which would
/// mean the emitter referenced a symbol this backend doesn't know how to
/// place.
pub fn assemble(asm: &AsmModule) -> CompileResult<Vec<u8>> {
    let start = assembler::assemble_text(START_STUB)?;
    let body = assembler::assemble_text(&asm.text)?;
    let rodata = assembler::assemble_data(&asm.rodata)?;
    let data = assembler::assemble_data(&asm.data)?;

    let start_len = start.bytes.len();
    let mut text_bytes = start.bytes;
    text_bytes.extend_from_slice(&body.bytes);

    let mut text_labels: HashMap<String, usize> = start.labels;
    for (name, off) in body.labels {
        text_labels.insert(name, off + start_len);
    }

    let mut patches = start.patches;
    for mut p in body.patches {
        p.patch_offset += start_len;
        p.from_offset += start_len;
        patches.push(p);
    }

    let layout = elf::compute_layout(text_bytes.len(), rodata.bytes.len());

    let resolve = |name: &str| -> CompileResult<u64> {
        if let Some(&off) = text_labels.get(name) {
            return Ok(layout.text_vaddr + off as u64);
        }
        if let Some(&off) = rodata.labels.get(name) {
            return Ok(layout.rodata_vaddr + off as u64);
        }
        if let Some(&off) = data.labels.get(name) {
            return Ok(layout.data_vaddr + off as u64);
        }
        Err(internal(format!(
            "undefined symbol `{name}` reached the native backend (externs should have routed through the cc fallback)"
        )))
    };

    for patch in &patches {
        let target = resolve(&patch.symbol)? as i64 + patch.addend;
        let from = layout.text_vaddr + patch.from_offset as u64;
        let rel = target - from as i64;
        if rel > i32::MAX as i64 || rel < i32::MIN as i64 {
            return Err(internal(format!(
                "relative displacement to `{}` overflows 32 bits; program is too large/far apart for this backend's addressing",
                patch.symbol
            )));
        }
        let bytes = (rel as i32).to_le_bytes();
        text_bytes[patch.patch_offset..patch.patch_offset + 4].copy_from_slice(&bytes);
    }

    let exe = elf::build_executable(&text_bytes, &rodata.bytes, &data.bytes, 0, 0);
    Ok(exe.bytes)
}
