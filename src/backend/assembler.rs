//! Turns the emitter's AT&T assembly text (`codegen::AsmModule`) into raw
//! section bytes plus a patch list, one forward pass per section. Every
//! relative/RIP-relative displacement this backend ever emits is a fixed
//! 4-byte field — no short-jump form is ever chosen — so an instruction's
//! byte length never depends on where its target label ends up. That means
//! label offsets and patch sites can both be collected in the same forward
//! pass; only the actual displacement values need a label table that's
//! already complete, which is why patch resolution happens in
//! `src/backend/mod.rs` after every section has been assembled.

use std::collections::HashMap;

use crate::backend::encode::{self, Patch};
use crate::error::{CompileError, CompileResult};

fn internal(message: impl Into<String>) -> CompileError {
    CompileError::internal(message)
}

pub struct AssembledSection {
    pub bytes: Vec<u8>,
    pub labels: HashMap<String, usize>,
    pub patches: Vec<Patch>,
}

/// Splits `"a, b(%rcx,%rax,4), c"`-shaped operand lists on top-level commas
/// only — a comma inside `(...)` (a SIB triple) doesn't end an operand.
fn split_operands(rest: &str) -> Vec<String> {
    let mut operands = Vec::new();
    let mut depth = 0i32;
    let mut cur = String::new();
    for c in rest.chars() {
        match c {
            '(' => {
                depth += 1;
                cur.push(c);
            }
            ')' => {
                depth -= 1;
                cur.push(c);
            }
            ',' if depth == 0 => {
                operands.push(cur.trim().to_string());
                cur.clear();
            }
            _ => cur.push(c),
        }
    }
    if !cur.trim().is_empty() {
        operands.push(cur.trim().to_string());
    }
    operands
}

const ZERO_OPERAND: &[&str] = &["ret", "leave", "cqto", "cltd", "cwtd", "cbtw", "syscall"];

/// Assembles `.text`: every line is either a label, a directive we skip
/// (`.globl`, `.extern` — by the time this runs `externs` is already known
/// to be empty, §1/§6), or one instruction.
pub fn assemble_text(text: &str) -> CompileResult<AssembledSection> {
    let mut bytes = Vec::new();
    let mut labels = HashMap::new();
    let mut patches = Vec::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(".globl") || line.starts_with(".extern") {
            continue;
        }
        if let Some(name) = line.strip_suffix(':') {
            labels.insert(name.to_string(), bytes.len());
            continue;
        }
        let (mnemonic, rest) = line.split_once(' ').unwrap_or((line, ""));
        let from_offset = bytes.len();
        if ZERO_OPERAND.contains(&mnemonic) {
            let encoded = encode::encode_instruction(mnemonic, &[], from_offset)?;
            bytes.extend_from_slice(&encoded.bytes);
            continue;
        }
        let operands = split_operands(rest);
        let encoded = encode::encode_instruction(mnemonic, &operands, from_offset)?;
        for mut p in encoded.patches {
            p.patch_offset += from_offset;
            patches.push(p);
        }
        bytes.extend_from_slice(&encoded.bytes);
    }

    Ok(AssembledSection { bytes, labels, patches })
}

/// Assembles `.data`/`.rodata`: only numeric directives ever appear
/// (`GlobalVar::init` is always `Vec<(i64, u8)>`, never symbolic — see
/// DESIGN.md), so these sections never produce patches.
pub fn assemble_data(section: &str) -> CompileResult<AssembledSection> {
    let mut bytes = Vec::new();
    let mut labels = HashMap::new();

    for raw_line in section.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(".globl") {
            continue;
        }
        if let Some(name) = line.strip_suffix(':') {
            labels.insert(name.to_string(), bytes.len());
            continue;
        }
        let (directive, arg) = line
            .split_once(' ')
            .ok_or_else(|| internal(format!("malformed data directive: {line}")))?;
        let arg = arg.trim();
        match directive {
            ".align" => {
                let align: usize = arg.parse().map_err(|_| internal(format!("bad .align argument {arg}")))?;
                while bytes.len() % align != 0 {
                    bytes.push(0);
                }
            }
            ".zero" => {
                let n: usize = arg.parse().map_err(|_| internal(format!("bad .zero argument {arg}")))?;
                bytes.resize(bytes.len() + n, 0);
            }
            ".byte" => {
                for v in arg.split(',') {
                    let b: i64 = v.trim().parse().map_err(|_| internal(format!("bad .byte value {v}")))?;
                    bytes.push(b as u8);
                }
            }
            ".word" => {
                let v: i64 = arg.parse().map_err(|_| internal(format!("bad .word value {arg}")))?;
                bytes.extend_from_slice(&(v as i16).to_le_bytes());
            }
            ".long" => {
                let v: i64 = arg.parse().map_err(|_| internal(format!("bad .long value {arg}")))?;
                bytes.extend_from_slice(&(v as i32).to_le_bytes());
            }
            ".quad" => {
                let v: i64 = arg.parse().map_err(|_| internal(format!("bad .quad value {arg}")))?;
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            other => return Err(internal(format!("unsupported directive {other}"))),
        }
    }

    Ok(AssembledSection { bytes, labels, patches: Vec::new() })
}
