//! Serializes allocated IR into AT&T-syntax assembly text (§4.5). Output is
//! partitioned into `.text`/`.data`/`.rodata` buffers, written in that order;
//! `src/backend` consumes this same text rather than re-emitting from the IR
//! (§5, §9's buffer-reuse note).

pub mod constraints;

use crate::error::{CompileError, CompileResult};
use crate::ir::abi::{INT_ARG_REGS, SSE_ARG_REGS};
use crate::ir::func::IrFunction;
use crate::ir::inst::{ArithOp, Callee, Instruction, RetClass};
use crate::ir::module::IrModule;
use crate::ir::operand::{Operand, PhysReg, Reg};

/// The emitter's three independent output sections.
#[derive(Debug, Default, Clone)]
pub struct AsmModule {
    pub text: String,
    pub data: String,
    pub rodata: String,
}

impl AsmModule {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(".text\n");
        out.push_str(&self.text);
        out.push_str(".data\n");
        out.push_str(&self.data);
        out.push_str(".section .rodata\n");
        out.push_str(&self.rodata);
        out
    }
}

pub fn emit_module(module: &IrModule) -> CompileResult<AsmModule> {
    let mut asm = AsmModule::default();
    for name in &module.externs {
        asm.text.push_str(&format!(".extern {name}\n"));
    }
    for func in &module.functions {
        asm.text.push_str(&format!(".globl {}\n", func.name));
        emit_function(func, &mut asm.text)?;
    }
    for g in &module.globals {
        emit_global(g, &mut asm.data);
    }
    for f in &module.float_consts {
        asm.rodata.push_str(".align 8\n");
        asm.rodata.push_str(&format!("{}:\n", f.label));
        if f.width == 4 {
            asm.rodata.push_str(&format!("  .long {}\n", f.bits as u32));
        } else {
            asm.rodata.push_str(&format!("  .quad {}\n", f.bits));
        }
    }
    for s in &module.string_consts {
        asm.rodata.push_str(&format!("{}:\n  .byte {}\n", s.label, bytes_csv(&s.bytes)));
    }
    Ok(asm)
}

fn bytes_csv(bytes: &[u8]) -> String {
    let mut all: Vec<u8> = bytes.to_vec();
    all.push(0); // every string literal is NUL-terminated
    all.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(",")
}

fn emit_global(g: &crate::ir::module::GlobalVar, out: &mut String) {
    out.push_str(&format!(".globl {}\n{}:\n", g.name, g.name));
    if g.init.is_empty() {
        out.push_str(&format!("  .zero {}\n", g.ty.size().max(1)));
        return;
    }
    for (value, width) in &g.init {
        let directive = match width {
            1 => ".byte",
            2 => ".word",
            4 => ".long",
            8 => ".quad",
            other => panic!("invalid global initializer width {other}"),
        };
        out.push_str(&format!("  {directive} {value}\n"));
    }
}

fn internal(message: impl Into<String>) -> CompileError {
    CompileError::internal(message)
}

// --- operand rendering ------------------------------------------------------

fn suffix(size: u8) -> CompileResult<&'static str> {
    Ok(match size {
        1 => "b",
        2 => "w",
        4 => "l",
        8 => "q",
        other => return Err(internal(format!("invalid operand width {other}"))),
    })
}

/// Extracts the physical register backing an operand that must already be a
/// bare register (the base/index of a computed address, a call target). Any
/// `Reg::Virtual` reaching here means the allocator missed a temp.
fn reg_text(op: &Operand) -> CompileResult<String> {
    match op {
        Operand::Reg { reg: Reg::Physical(p), size } => Ok(p.name(*size)),
        Operand::Reg { reg: Reg::Virtual(id), .. } => {
            Err(internal(format!("unallocated virtual register %t{id} reached the emitter")))
        }
        other => Err(internal(format!("expected a bare register operand, got {other:?}"))),
    }
}

fn operand_text(op: &Operand) -> CompileResult<String> {
    match op {
        Operand::Reg { reg: Reg::Physical(p), size } => Ok(p.name(*size)),
        Operand::Reg { reg: Reg::Virtual(id), .. } => {
            Err(internal(format!("unallocated virtual register %t{id} reached the emitter")))
        }
        Operand::Imm { value, .. } => Ok(format!("${value}")),
        Operand::ImmLabel(label) => Ok(format!("${label}")),
        Operand::FrameSlot { offset, .. } => Ok(format!("{offset}(%rbp)")),
        Operand::Global { symbol, disp, .. } => {
            if *disp == 0 {
                Ok(format!("{symbol}(%rip)"))
            } else {
                Ok(format!("{symbol}+{disp}(%rip)"))
            }
        }
        Operand::Indirect { base, disp, .. } => {
            let base = reg_text(base)?;
            Ok(format!("{disp}({base})"))
        }
        Operand::Indexed { base, index, scale, disp, .. } => {
            let base = reg_text(base)?;
            let index = reg_text(index)?;
            Ok(format!("{disp}({base},{index},{scale})"))
        }
    }
}

fn operands_equal(a: &Operand, b: &Operand) -> bool {
    matches!(
        (a, b),
        (Operand::Reg { reg: ra, .. }, Operand::Reg { reg: rb, .. }) if ra == rb
    )
}

fn scratch(size: u8) -> Operand {
    Operand::physical(constraints::SCRATCH, size)
}

// --- function emission -------------------------------------------------------

/// Idle → EmittingPrologue → EmittingBody → EmittingEpilogue → Idle, driven
/// purely by which `Instruction` variant is current; there is no separate
/// state enum because the instruction stream itself already encodes the
/// state (`Prologue`/`Epilogue` markers bracket exactly one function each).
/// The loop index below is owned by this function alone for its entire
/// traversal — no callee it invokes is allowed to advance it, which is the
/// single-index-ownership discipline the distilled spec's design notes call
/// out as the place a handoff bug would otherwise creep in.
fn emit_function(func: &IrFunction, out: &mut String) -> CompileResult<()> {
    out.push_str(&format!("{}:\n", func.name));
    let mut i = 0;
    while i < func.insts.len() {
        emit_instruction(func, &func.insts[i], out)?;
        i += 1;
    }
    Ok(())
}

fn emit_instruction(func: &IrFunction, inst: &Instruction, out: &mut String) -> CompileResult<()> {
    match inst {
        Instruction::Prologue { frame_size } => {
            out.push_str("  push %rbp\n  mov %rsp, %rbp\n");
            if *frame_size > 0 {
                out.push_str(&format!("  sub ${frame_size}, %rsp\n"));
            }
            Ok(())
        }
        Instruction::Epilogue => {
            out.push_str("  leave\n  ret\n");
            Ok(())
        }
        Instruction::Label(name) => {
            out.push_str(&format!("{name}:\n"));
            Ok(())
        }
        Instruction::Jmp(label) => {
            out.push_str(&format!("  jmp {label}\n"));
            Ok(())
        }
        Instruction::Jcc { cond, label } => {
            out.push_str(&format!("  j{} {label}\n", cond.suffix()));
            Ok(())
        }
        Instruction::JmpIfZero { cond, label } => emit_test_and_jump(cond, label, "je", out),
        Instruction::JmpIfNotZero { cond, label } => emit_test_and_jump(cond, label, "jne", out),
        Instruction::Mov { dst, src } => emit_mov(src, dst, out),
        Instruction::Lea { dst, src } => {
            // `lea`'s destination is always a register; route through the
            // scratch GPR when the allocator spilled this temp to memory.
            let src_text = operand_text(src)?;
            if dst.is_memory() {
                push_reg(constraints::SCRATCH, out);
                let s = scratch(dst.size());
                out.push_str(&format!("  lea {src_text}, {}\n", operand_text(&s)?));
                emit_raw_mov(&s, dst, out)?;
                pop_reg(constraints::SCRATCH, out);
            } else {
                out.push_str(&format!("  lea {src_text}, {}\n", operand_text(dst)?));
            }
            Ok(())
        }
        Instruction::Cmp { lhs, rhs } => emit_cmp(lhs, rhs, out),
        Instruction::SetCc { cond, dst } => {
            let dst_text = operand_text(dst)?;
            out.push_str(&format!("  set{} {dst_text}\n", cond.suffix()));
            Ok(())
        }
        Instruction::Arith { op, dst, lhs, rhs } => emit_arith(*op, dst, lhs, rhs, out),
        Instruction::Call { callee, int_args, sse_args, ret_class, dst } => {
            emit_call(callee, int_args, sse_args, *ret_class, dst, out)
        }
        Instruction::Ret(value) => emit_ret(func, value, out),
        Instruction::Extend { dst, src, signed } => emit_extend(dst, src, *signed, out),
        Instruction::Truncate { dst, src } => {
            // A truncation is just a narrower-width mov; reuse `emit_mov` so
            // it gets the same mem-to-mem/wide-imm guards as every other mov.
            emit_mov(&src.with_size(dst.size()), dst, out)
        }
        Instruction::IntToFloat { dst, src } => {
            // `cvtsi2ss`/`cvtsi2sd`'s destination is always an XMM register;
            // route through the XMM scratch when the float temp was spilled.
            let mnemonic = if dst.size() == 4 { "cvtsi2ss" } else { "cvtsi2sd" };
            let int_suffix = suffix(src.size())?;
            if dst.is_memory() {
                push_xmm(constraints::SCRATCH_XMM, out);
                let s = Operand::physical(constraints::SCRATCH_XMM, dst.size());
                out.push_str(&format!("  {mnemonic}{int_suffix} {}, {}\n", operand_text(src)?, operand_text(&s)?));
                emit_raw_mov(&s, dst, out)?;
                pop_xmm(constraints::SCRATCH_XMM, out);
            } else {
                out.push_str(&format!("  {mnemonic}{int_suffix} {}, {}\n", operand_text(src)?, operand_text(dst)?));
            }
            Ok(())
        }
        Instruction::FloatToInt { dst, src } => {
            // `cvttss2si`/`cvttsd2si`'s destination is always a GPR.
            let mnemonic = if src.size() == 4 { "cvttss2si" } else { "cvttsd2si" };
            if dst.is_memory() {
                push_reg(constraints::SCRATCH, out);
                let s = scratch(dst.size().max(4));
                out.push_str(&format!("  {mnemonic} {}, {}\n", operand_text(src)?, operand_text(&s)?));
                emit_raw_mov(&s, dst, out)?;
                pop_reg(constraints::SCRATCH, out);
            } else {
                out.push_str(&format!("  {mnemonic} {}, {}\n", operand_text(src)?, operand_text(dst)?));
            }
            Ok(())
        }
    }
}

fn emit_test_and_jump(cond: &Operand, label: &str, jump: &str, out: &mut String) -> CompileResult<()> {
    let size = cond.size();
    let cond_text = operand_text(cond)?;
    out.push_str(&format!("  cmp{} $0, {cond_text}\n", suffix(size)?));
    out.push_str(&format!("  {jump} {label}\n"));
    Ok(())
}

fn emit_cmp(lhs: &Operand, rhs: &Operand, out: &mut String) -> CompileResult<()> {
    let size = lhs.size().max(rhs.size());
    if lhs.is_memory() && rhs.is_memory() {
        let s = scratch(size);
        emit_raw_mov(lhs, &s, out)?;
        out.push_str(&format!("  cmp{} {}, {}\n", suffix(size)?, operand_text(rhs)?, operand_text(&s)?));
    } else {
        out.push_str(&format!("  cmp{} {}, {}\n", suffix(size)?, operand_text(rhs)?, operand_text(lhs)?));
    }
    Ok(())
}

/// Plain `mov`, applying the constraints §4.5 calls out: no mem-to-mem, and a
/// 64-bit immediate can't target memory directly.
fn emit_raw_mov(src: &Operand, dst: &Operand, out: &mut String) -> CompileResult<()> {
    let size = dst.size();
    let mnemonic = if matches!(dst, Operand::Reg { reg: Reg::Physical(p), .. } if p.is_xmm())
        || matches!(src, Operand::Reg { reg: Reg::Physical(p), .. } if p.is_xmm())
    {
        if size == 4 { "movss" } else { "movsd" }
    } else if constraints::is_wide_imm(src) && matches!(dst, Operand::Reg { .. }) {
        "movabs"
    } else {
        "mov"
    };
    let suf = if mnemonic == "mov" { suffix(size)? } else { "" };
    out.push_str(&format!("  {mnemonic}{suf} {}, {}\n", operand_text(src)?, operand_text(dst)?));
    Ok(())
}

fn emit_mov(src: &Operand, dst: &Operand, out: &mut String) -> CompileResult<()> {
    if operands_equal(src, dst) {
        return Ok(());
    }
    let size = dst.size();
    let needs_scratch = constraints::is_mem_to_mem(dst, src) || (constraints::is_wide_imm(src) && dst.is_memory());
    if needs_scratch {
        let s = scratch(size.max(4));
        push_reg(constraints::SCRATCH, out);
        emit_raw_mov(src, &s, out)?;
        emit_raw_mov(&s, dst, out)?;
        pop_reg(constraints::SCRATCH, out);
        Ok(())
    } else {
        emit_raw_mov(src, dst, out)
    }
}

fn push_reg(reg: PhysReg, out: &mut String) {
    out.push_str(&format!("  push {}\n", reg.name(8)));
}

fn pop_reg(reg: PhysReg, out: &mut String) {
    out.push_str(&format!("  pop {}\n", reg.name(8)));
}

fn emit_extend(dst: &Operand, src: &Operand, signed: bool, out: &mut String) -> CompileResult<()> {
    if src.size() == dst.size() {
        return emit_mov(src, dst, out);
    }
    if !signed && src.size() == 4 && dst.size() == 8 {
        // Writing a 32-bit register always zero-extends the upper half of
        // its 64-bit form on x86-64; there is no dedicated 32->64 `movz`.
        if dst.is_memory() {
            emit_raw_mov(&Operand::imm(0, 4), &with_offset(dst, 4, 4), out)?;
        }
        return emit_mov(&src.with_size(4), &dst.with_size(4), out);
    }
    let mnemonic = if signed { "movs" } else { "movz" };
    // `movzx`/`movsx`'s destination is always a register.
    if dst.is_memory() {
        push_reg(constraints::SCRATCH, out);
        let s = scratch(dst.size());
        out.push_str(&format!(
            "  {mnemonic}{}{} {}, {}\n",
            suffix(src.size())?,
            suffix(s.size())?,
            operand_text(src)?,
            operand_text(&s)?
        ));
        emit_raw_mov(&s, dst, out)?;
        pop_reg(constraints::SCRATCH, out);
        return Ok(());
    }
    out.push_str(&format!(
        "  {mnemonic}{}{} {}, {}\n",
        suffix(src.size())?,
        suffix(dst.size())?,
        operand_text(src)?,
        operand_text(dst)?
    ));
    Ok(())
}

fn push_xmm(reg: PhysReg, out: &mut String) {
    out.push_str(&format!("  sub $16, %rsp\n  movsd {}, (%rsp)\n", reg.name(8)));
}

fn pop_xmm(reg: PhysReg, out: &mut String) {
    out.push_str(&format!("  movsd (%rsp), {}\n  add $16, %rsp\n", reg.name(8)));
}

fn arith_mnemonic(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "add",
        ArithOp::Sub => "sub",
        ArithOp::IMul => "imul",
        ArithOp::And => "and",
        ArithOp::Or => "or",
        ArithOp::Xor => "xor",
        ArithOp::Shl => "shl",
        ArithOp::Sar => "sar",
        ArithOp::Shr => "shr",
        ArithOp::FAdd => "add",
        ArithOp::FSub => "sub",
        ArithOp::FMul => "mul",
        ArithOp::FDiv => "div",
        ArithOp::IDiv | ArithOp::UDiv | ArithOp::IMod | ArithOp::UMod => {
            unreachable!("division lowered separately by emit_arith")
        }
    }
}

fn emit_arith(op: ArithOp, dst: &Operand, lhs: &Operand, rhs: &Operand, out: &mut String) -> CompileResult<()> {
    if op.is_div_like() {
        return emit_divmod(op, dst, lhs, rhs, out);
    }
    let size = dst.size();
    if !operands_equal(dst, lhs) {
        emit_mov(lhs, dst, out)?;
    }
    if op == ArithOp::IMul && dst.is_memory() {
        // The two-operand `imul` form always writes a register; `rhs` may
        // still be memory directly (imul's r/m operand is the source here).
        push_reg(constraints::SCRATCH, out);
        let s = scratch(size);
        emit_raw_mov(dst, &s, out)?;
        out.push_str(&format!("  imul{} {}, {}\n", suffix(size)?, operand_text(rhs)?, operand_text(&s)?));
        emit_raw_mov(&s, dst, out)?;
        pop_reg(constraints::SCRATCH, out);
        return Ok(());
    }
    if op.is_float() {
        let mnemonic = format!("{}{}", arith_mnemonic(op), if size == 4 { "ss" } else { "sd" });
        // SSE arithmetic always writes an XMM register; spilled float temps
        // route through the XMM scratch the same way integer ops use `SCRATCH`.
        if dst.is_memory() {
            push_xmm(constraints::SCRATCH_XMM, out);
            let s = Operand::physical(constraints::SCRATCH_XMM, size);
            emit_raw_mov(dst, &s, out)?;
            out.push_str(&format!("  {mnemonic} {}, {}\n", operand_text(rhs)?, operand_text(&s)?));
            emit_raw_mov(&s, dst, out)?;
            pop_xmm(constraints::SCRATCH_XMM, out);
        } else {
            out.push_str(&format!("  {mnemonic} {}, {}\n", operand_text(rhs)?, operand_text(dst)?));
        }
        return Ok(());
    }
    if op.is_shift() {
        // Shift counts live in CL or an 8-bit immediate; anything else is
        // loaded into CL first.
        let count_text = match rhs {
            Operand::Imm { .. } => operand_text(rhs)?,
            Operand::Reg { reg: Reg::Physical(PhysReg::Rcx), size: 1 } => "%cl".to_string(),
            other => {
                push_reg(PhysReg::Rcx, out);
                emit_raw_mov(&other.with_size(1), &Operand::physical(PhysReg::Rcx, 1), out)?;
                "%cl".to_string()
            }
        };
        out.push_str(&format!("  {}{} {count_text}, {}\n", arith_mnemonic(op), suffix(size)?, operand_text(dst)?));
        if !matches!(rhs, Operand::Imm { .. }) && !matches!(rhs, Operand::Reg { reg: Reg::Physical(PhysReg::Rcx), size: 1 }) {
            pop_reg(PhysReg::Rcx, out);
        }
        return Ok(());
    }
    if dst.is_memory() && rhs.is_memory() {
        let s = scratch(size);
        emit_raw_mov(rhs, &s, out)?;
        out.push_str(&format!("  {}{} {}, {}\n", arith_mnemonic(op), suffix(size)?, operand_text(&s)?, operand_text(dst)?));
    } else {
        out.push_str(&format!("  {}{} {}, {}\n", arith_mnemonic(op), suffix(size)?, operand_text(rhs)?, operand_text(dst)?));
    }
    Ok(())
}

/// `idiv`/`div` want the dividend sign/zero-extended across RDX:RAX and a
/// register/memory divisor — an immediate divisor (including a power-of-two
/// literal, §8) is loaded into the scratch register first.
fn emit_divmod(op: ArithOp, dst: &Operand, lhs: &Operand, rhs: &Operand, out: &mut String) -> CompileResult<()> {
    let size = dst.size();
    let signed = matches!(op, ArithOp::IDiv | ArithOp::IMod);
    let wants_remainder = matches!(op, ArithOp::IMod | ArithOp::UMod);

    emit_raw_mov(lhs, &Operand::physical(PhysReg::Rax, size), out)?;
    if signed {
        let widen = match size {
            8 => "cqto",
            4 => "cltd",
            2 => "cwtd",
            _ => "cbtw",
        };
        out.push_str(&format!("  {widen}\n"));
    } else {
        emit_raw_mov(&Operand::imm(0, size), &Operand::physical(PhysReg::Rdx, size), out)?;
    }

    let mnemonic = if signed { "idiv" } else { "div" };
    if constraints::needs_divisor_reg(rhs) {
        push_reg(constraints::SCRATCH, out);
        emit_raw_mov(rhs, &scratch(size), out)?;
        out.push_str(&format!("  {mnemonic}{} {}\n", suffix(size)?, operand_text(&scratch(size))?));
        let result = Operand::physical(if wants_remainder { PhysReg::Rdx } else { PhysReg::Rax }, size);
        emit_raw_mov(&result, dst, out)?;
        pop_reg(constraints::SCRATCH, out);
    } else {
        out.push_str(&format!("  {mnemonic}{} {}\n", suffix(size)?, operand_text(rhs)?));
        let result = Operand::physical(if wants_remainder { PhysReg::Rdx } else { PhysReg::Rax }, size);
        emit_raw_mov(&result, dst, out)?;
    }
    Ok(())
}

/// Moves each `(source, target)` pair's value into its target register, in
/// whatever order is safe rather than strictly left to right. A call like
/// `g(x, y)` where the allocator happened to place `x` in `%rsi` and `y` in
/// `%rdi` is exactly the register-swap case a naive sequential pass gets
/// wrong: moving `x` into `%rdi` first clobbers the value `y`'s own move
/// still needs to read out of `%rdi`. This also folds in the hidden
/// return-pointer argument (passed as just another entry targeting `%rdi`)
/// without caring whether it's populated first or last, since the ordering
/// is derived from the dependency graph rather than array position.
///
/// Classic parallel-copy sequencing: repeatedly emit any move whose target
/// isn't still needed as another pending move's source. Once only register
/// cycles remain, resolve a whole cycle at once using only the registers
/// already in it, plus one stack slot to carry the value that would
/// otherwise be overwritten before it's read — deliberately not a named
/// scratch register, since the allocator's palette includes `SCRATCH`/
/// `SCRATCH_XMM` and an unrelated pending argument could legitimately
/// already live there.
fn emit_parallel_move(moves: &[(Operand, PhysReg)], push: fn(PhysReg, &mut String), pop: fn(PhysReg, &mut String), out: &mut String) -> CompileResult<()> {
    fn source_reg(op: &Operand) -> Option<PhysReg> {
        match op {
            Operand::Reg { reg: Reg::Physical(p), .. } => Some(*p),
            _ => None,
        }
    }

    let sources: Vec<Operand> = moves.iter().map(|(src, _)| src.clone()).collect();
    let targets: Vec<PhysReg> = moves.iter().map(|(_, dst)| *dst).collect();
    let mut done: Vec<bool> = (0..moves.len())
        .map(|i| source_reg(&sources[i]) == Some(targets[i]))
        .collect();

    loop {
        let ready = (0..moves.len()).find(|&i| {
            !done[i]
                && !(0..moves.len())
                    .any(|j| j != i && !done[j] && source_reg(&sources[j]) == Some(targets[i]))
        });
        if let Some(i) = ready {
            emit_mov(&sources[i], &Operand::physical(targets[i], sources[i].size()), out)?;
            done[i] = true;
            continue;
        }

        let Some(start) = (0..moves.len()).find(|&i| !done[i]) else {
            break;
        };

        // Every move still pending is part of a register cycle (its source is
        // some other pending move's target). Walk it back to `start` to find
        // the cycle's full membership: `chain[k]`'s target needs
        // `chain[k + 1]`'s target's current value, cyclically.
        let mut chain = vec![start];
        let mut cur = start;
        loop {
            let need = source_reg(&sources[cur]).expect("a blocked move's source is always a register");
            let next = (0..moves.len())
                .find(|&j| !done[j] && targets[j] == need)
                .expect("the register blocking a pending move is always some pending move's target");
            if next == start {
                break;
            }
            chain.push(next);
            cur = next;
        }

        let first = targets[chain[0]];
        push(first, out);
        for k in 0..chain.len() - 1 {
            let dst = targets[chain[k]];
            let src = targets[chain[k + 1]];
            let size = sources[chain[k]].size();
            emit_raw_mov(&Operand::physical(src, size), &Operand::physical(dst, size), out)?;
        }
        pop(targets[*chain.last().unwrap()], out);
        for idx in chain {
            done[idx] = true;
        }
    }
    Ok(())
}

fn emit_call(
    callee: &Callee,
    int_args: &[Operand],
    sse_args: &[Operand],
    ret_class: RetClass,
    dst: &Option<Operand>,
    out: &mut String,
) -> CompileResult<()> {
    if int_args.len() > INT_ARG_REGS.len() {
        return Err(internal("call site has more integer arguments than this ABI subset supports on registers (stack-passed call arguments are out of scope)"));
    }
    if sse_args.len() > SSE_ARG_REGS.len() {
        return Err(internal("call site has more float arguments than this ABI subset supports on registers"));
    }
    let int_moves: Vec<(Operand, PhysReg)> = int_args.iter().cloned().zip(INT_ARG_REGS).collect();
    emit_parallel_move(&int_moves, push_reg, pop_reg, out)?;
    let sse_moves: Vec<(Operand, PhysReg)> = sse_args.iter().cloned().zip(SSE_ARG_REGS).collect();
    emit_parallel_move(&sse_moves, push_xmm, pop_xmm, out)?;
    match callee {
        Callee::Direct(name) => out.push_str(&format!("  call {name}\n")),
        Callee::Indirect(op) => out.push_str(&format!("  call *{}\n", operand_text(op)?)),
    }
    match (ret_class, dst) {
        (RetClass::Void, _) | (RetClass::Memory, _) => {}
        (RetClass::Int, Some(d)) => emit_raw_mov(&Operand::physical(PhysReg::Rax, d.size()), d, out)?,
        (RetClass::Sse, Some(d)) => emit_raw_mov(&Operand::physical(PhysReg::Xmm(0), d.size()), d, out)?,
        (RetClass::IntPair, Some(d)) => {
            let lo_size = d.size().min(8);
            let hi_size = d.size().saturating_sub(8).max(1).min(8);
            emit_raw_mov(&Operand::physical(PhysReg::Rax, lo_size), &with_offset(d, 0, lo_size), out)?;
            if d.size() > 8 {
                emit_raw_mov(&Operand::physical(PhysReg::Rdx, hi_size), &with_offset(d, 8, hi_size), out)?;
            }
        }
        (_, None) => return Err(internal("call with a non-void return class produced no destination operand")),
    }
    Ok(())
}

/// Adds a byte displacement to a `FrameSlot`/`Global`/`Indirect` destination;
/// only used here to split a 9–16-byte struct-returning call's two result
/// halves, which always land in one of these three memory kinds.
fn with_offset(op: &Operand, disp: i64, size: u8) -> Operand {
    match op {
        Operand::FrameSlot { offset, .. } => Operand::FrameSlot { offset: offset + disp as i32, size },
        Operand::Global { symbol, disp: d, .. } => Operand::Global { symbol: symbol.clone(), disp: d + disp, size },
        Operand::Indirect { base, disp: d, .. } => Operand::Indirect { base: base.clone(), disp: d + disp, size },
        other => other.with_size(size),
    }
}

fn emit_ret(func: &IrFunction, value: &Option<Operand>, out: &mut String) -> CompileResult<()> {
    let Some(val) = value else {
        return Ok(());
    };
    let ret_class = crate::ir::abi::classify_return(&func.ret);
    match ret_class {
        crate::ir::abi::RetClass::Void | crate::ir::abi::RetClass::Memory => Ok(()),
        crate::ir::abi::RetClass::Sse => emit_raw_mov(val, &Operand::physical(PhysReg::Xmm(0), val.size()), out),
        crate::ir::abi::RetClass::Int => {
            let size = val.size().max(4);
            emit_raw_mov(val, &Operand::physical(PhysReg::Rax, size), out)
        }
        crate::ir::abi::RetClass::IntPair => {
            let lo = with_offset(val, 0, val.size().min(8));
            emit_raw_mov(&lo, &Operand::physical(PhysReg::Rax, lo.size()), out)?;
            if val.size() > 8 {
                let hi = with_offset(val, 8, val.size() - 8);
                emit_raw_mov(&hi, &Operand::physical(PhysReg::Rdx, hi.size()), out)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The classic register-swap cycle (§4.3/§4.4): `g(x, y)` where the
    /// allocator placed `x` in `%rsi` and `y` in `%rdi` needs `%rdi` and
    /// `%rsi` to trade values, not have one overwrite the other. Resolved
    /// with the cycle's own registers and one stack slot, never the
    /// emitter's `SCRATCH` register.
    #[test]
    fn parallel_move_resolves_a_two_register_swap() {
        let moves = vec![
            (Operand::physical(PhysReg::Rsi, 4), PhysReg::Rdi),
            (Operand::physical(PhysReg::Rdi, 4), PhysReg::Rsi),
        ];
        let mut out = String::new();
        emit_parallel_move(&moves, push_reg, pop_reg, &mut out).expect("swap");
        assert_eq!(out, "  push %rdi\n  movl %esi, %edi\n  pop %rsi\n");
    }

    /// A three-way cycle (`%rdi <- %rsi <- %rdx <- %rdi`) exercises the same
    /// chain-walk with more than one intermediate link.
    #[test]
    fn parallel_move_resolves_a_three_register_cycle() {
        let moves = vec![
            (Operand::physical(PhysReg::Rsi, 8), PhysReg::Rdi),
            (Operand::physical(PhysReg::Rdx, 8), PhysReg::Rsi),
            (Operand::physical(PhysReg::Rdi, 8), PhysReg::Rdx),
        ];
        let mut out = String::new();
        emit_parallel_move(&moves, push_reg, pop_reg, &mut out).expect("cycle");
        assert_eq!(
            out,
            "  push %rdi\n  movq %rsi, %rdi\n  movq %rdx, %rsi\n  pop %rdx\n"
        );
    }

    /// A move chain that isn't a cycle (`%rdi <- %rsi`, `%rsi <- %rdx`, and
    /// `%rdx` isn't itself needed by anything) must still resolve strictly
    /// in dependency order: `%rdi`'s move reads `%rsi` before `%rsi` is
    /// overwritten by the move that follows it.
    #[test]
    fn parallel_move_handles_a_non_cyclic_chain_without_a_scratch_register() {
        let moves = vec![
            (Operand::physical(PhysReg::Rsi, 8), PhysReg::Rdi),
            (Operand::physical(PhysReg::Rdx, 8), PhysReg::Rsi),
        ];
        let mut out = String::new();
        emit_parallel_move(&moves, push_reg, pop_reg, &mut out).expect("chain");
        assert_eq!(out, "  movq %rsi, %rdi\n  movq %rdx, %rsi\n");
    }

    /// An argument whose source already happens to be the backend's own
    /// scratch register (§4.4 allocates `R10`/`Xmm15` out of the same
    /// general palette as every other temp) must survive a swap elsewhere
    /// in the same call untouched, since the cycle break no longer borrows
    /// that register at all.
    #[test]
    fn parallel_move_leaves_an_unrelated_scratch_sourced_argument_alone() {
        let moves = vec![
            (Operand::physical(PhysReg::Rsi, 8), PhysReg::Rdi),
            (Operand::physical(PhysReg::Rdi, 8), PhysReg::Rsi),
            (Operand::physical(constraints::SCRATCH, 8), PhysReg::Rdx),
        ];
        let mut out = String::new();
        emit_parallel_move(&moves, push_reg, pop_reg, &mut out).expect("swap plus unrelated arg");
        assert!(out.contains(&format!("{}, %rdx", constraints::SCRATCH.name(8))));
        assert_eq!(out.matches("push").count(), 1);
        assert_eq!(out.matches("pop").count(), 1);
    }
}
