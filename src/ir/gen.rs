//! AST → IR lowering (instruction selection), §4.3. Walks one function at a
//! time; locals and parameters live in frame slots exactly as §3's Function
//! data model describes ("local symbol table: name → frame offset + Type"),
//! so only intermediate expression results ever become virtual registers for
//! the allocator to place.

use super::abi::{self, ArgClass, RetClass};
use super::func::IrFunction;
use super::inst::{ArithOp, Callee, Cond, Instruction};
use super::module::{FloatConst, GlobalVar, IrModule, StringConst};
use super::operand::{Operand, PhysReg, Reg};
use crate::ast::expr::{BinaryOp, Expr, ExprKind, LogicalOp, UnaryOp};
use crate::ast::stmt::{Block, Stmt, StmtKind};
use crate::ast::ty::Type;
use crate::ast::{FuncSig, Item, ItemKind, TranslationUnit};
use crate::error::{CompileError, CompileResult, Span};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Where a local variable's value lives, once declared.
#[derive(Debug, Clone)]
enum LocalLoc {
    /// Directly addressable at a fixed frame offset.
    Direct(Operand),
    /// A >16-byte struct parameter passed by invisible reference: the incoming
    /// pointer is spilled to this frame slot and every reference re-loads it.
    ViaPointer(i32),
}

struct Scope {
    vars: HashMap<String, (LocalLoc, Type)>,
}

pub struct IrGen {
    path: PathBuf,
    module: IrModule,
    sigs: HashMap<String, FuncSig>,
    label_counter: u32,
    string_counter: u32,
    float_counter: u32,
}

/// Per-function state, borrowed out of `IrGen` while lowering one body.
struct FuncGen<'g> {
    gen: &'g mut IrGen,
    func: IrFunction,
    scopes: Vec<Scope>,
    frame_cursor: i32,
    break_labels: Vec<String>,
    continue_labels: Vec<String>,
    ret_ty: Type,
    /// Frame offset holding the caller-supplied hidden return pointer, for a
    /// >16-byte struct return (`RetClass::Memory`); `None` otherwise.
    hidden_ret_slot: Option<i32>,
}

impl IrGen {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            module: IrModule::default(),
            sigs: HashMap::new(),
            label_counter: 0,
            string_counter: 0,
            float_counter: 0,
        }
    }

    fn err(&self, span: Span, message: impl Into<String>) -> CompileError {
        CompileError::semantic(self.path.clone(), span, message)
    }

    pub fn generate(mut self, tu: &TranslationUnit) -> CompileResult<IrModule> {
        for item in &tu.items {
            match &item.kind {
                ItemKind::FunctionDef { name, sig, .. } | ItemKind::FunctionProto { name, sig } => {
                    self.sigs.insert(name.clone(), sig.clone());
                }
                _ => {}
            }
        }
        for item in &tu.items {
            match &item.kind {
                ItemKind::FunctionDef { name, sig, body } => {
                    let f = FuncGen::lower(&mut self, name.clone(), sig, body)?;
                    self.module.functions.push(f);
                }
                ItemKind::FunctionProto { name, .. } => {
                    self.module.externs.push(name.clone());
                }
                ItemKind::GlobalVar { name, ty, init } => {
                    let words = match init {
                        Some(e) => self.eval_const_init(ty, e)?,
                        None => Vec::new(),
                    };
                    self.module.globals.push(GlobalVar {
                        name: name.clone(),
                        ty: ty.clone(),
                        init: words,
                    });
                }
                ItemKind::StructDecl { .. } | ItemKind::Typedef { .. } => {}
            }
        }
        Ok(self.module)
    }

    /// Constant-folds a global initializer into flattened (value, byte-width)
    /// words. Only literal and trivially-foldable expressions are supported;
    /// this compiler's non-goals exclude full constant-expression evaluation.
    fn eval_const_init(&mut self, ty: &Type, e: &Expr) -> CompileResult<Vec<(i64, u8)>> {
        match (&e.kind, ty) {
            (ExprKind::InitList(elems), Type::Array { elem, .. }) => {
                let mut out = Vec::new();
                for el in elems {
                    out.extend(self.eval_const_init(elem, el)?);
                }
                Ok(out)
            }
            (ExprKind::InitList(elems), Type::Struct(layout)) => {
                let mut out = Vec::new();
                for (field, el) in layout.fields.iter().zip(elems.iter()) {
                    out.extend(self.eval_const_init(&field.ty, el)?);
                }
                Ok(out)
            }
            _ => {
                let v = self.eval_const_scalar(e)?;
                Ok(vec![(v, ty.size().max(1) as u8)])
            }
        }
    }

    fn eval_const_scalar(&self, e: &Expr) -> CompileResult<i64> {
        match &e.kind {
            ExprKind::IntConst(v) => Ok(*v),
            ExprKind::CharConst(c) => Ok(*c as i64),
            ExprKind::FloatConst(f) => Ok(f.to_bits() as i64),
            ExprKind::Unary { op: UnaryOp::Neg, expr } => Ok(-self.eval_const_scalar(expr)?),
            ExprKind::Unary { op: UnaryOp::BitNot, expr } => Ok(!self.eval_const_scalar(expr)?),
            _ => Err(self.err(e.span, "global initializer is not a constant expression")),
        }
    }
}

impl<'g> FuncGen<'g> {
    fn lower(gen: &'g mut IrGen, name: String, sig: &FuncSig, body: &Block) -> CompileResult<IrFunction> {
        let ret_class = abi::classify_return(&sig.ret);
        let mut func = IrFunction::new(name, sig.ret.clone(), sig.params.len(), sig.variadic);
        let mut fg = FuncGen {
            gen,
            func,
            scopes: vec![Scope { vars: HashMap::new() }],
            frame_cursor: 0,
            break_labels: Vec::new(),
            continue_labels: Vec::new(),
            ret_ty: sig.ret.clone(),
            hidden_ret_slot: None,
        };

        fg.func.emit(Instruction::Prologue { frame_size: 0 });

        let mut ints_used: u8 = 0;
        let mut sses_used: u8 = 0;
        let mut stack_arg_offset: i32 = 0;
        if matches!(ret_class, RetClass::Memory) {
            let slot = fg.alloc_raw(8, 8);
            let dst = Operand::FrameSlot { offset: slot, size: 8 };
            fg.func.emit(Instruction::Mov {
                dst,
                src: Operand::physical(PhysReg::Rdi, 8),
            });
            fg.hidden_ret_slot = Some(slot);
            ints_used += 1;
        }

        for (name, ty) in &sig.params {
            let class = abi::classify_arg(ty, ints_used, sses_used);
            match class {
                ArgClass::Sse => {
                    let slot = fg.alloc_local(name, ty);
                    fg.spill_param_sse(slot, sses_used);
                    sses_used += 1;
                }
                ArgClass::Int => {
                    let reg = abi::INT_ARG_REGS[ints_used as usize];
                    let slot = fg.alloc_local(name, ty);
                    fg.func.emit(Instruction::Mov {
                        dst: slot,
                        src: Operand::physical(reg, ty.size() as u8),
                    });
                    ints_used += 1;
                }
                ArgClass::IntPair { regs } => {
                    let slot_off = fg.alloc_raw(ty.size() as u8, ty.align() as u8);
                    for i in 0..regs {
                        let reg = abi::INT_ARG_REGS[(ints_used + i) as usize];
                        let chunk = (ty.size() as i64 - i as i64 * 8).clamp(0, 8) as u8;
                        fg.func.emit(Instruction::Mov {
                            dst: Operand::FrameSlot {
                                offset: slot_off + i as i32 * 8,
                                size: chunk,
                            },
                            src: Operand::physical(reg, chunk),
                        });
                    }
                    ints_used += regs;
                    fg.declare(name, LocalLoc::Direct(Operand::FrameSlot { offset: slot_off, size: ty.size() as u8 }), ty.clone());
                }
                ArgClass::Reference => {
                    let reg = abi::INT_ARG_REGS[ints_used as usize];
                    let ptr_slot = fg.alloc_raw(8, 8);
                    fg.func.emit(Instruction::Mov {
                        dst: Operand::FrameSlot { offset: ptr_slot, size: 8 },
                        src: Operand::physical(reg, 8),
                    });
                    fg.declare(name, LocalLoc::ViaPointer(ptr_slot), ty.clone());
                    ints_used += 1;
                }
                ArgClass::Stack => {
                    // Incoming stack arguments sit above the return address;
                    // this compiler's calling convention keeps them in place
                    // rather than re-spilling them into the local frame.
                    let slot = Operand::FrameSlot {
                        offset: 16 + stack_arg_offset,
                        size: ty.size() as u8,
                    };
                    stack_arg_offset += 8;
                    fg.declare(name, LocalLoc::Direct(slot), ty.clone());
                }
            }
        }

        fg.gen_block(body)?;
        fg.func.spill_base = fg.frame_cursor;

        // Fall off the end of a non-void function: emit an implicit `return`
        // so the epilogue always runs (matches unoptimized C codegen, which
        // never proves a function's paths all return explicitly).
        if !matches!(fg.func.insts.last(), Some(Instruction::Ret(_))) {
            fg.func.emit(Instruction::Ret(None));
        }
        fg.func.emit(Instruction::Epilogue);

        Ok(fg.func)
    }

    // --- frame / scope management ------------------------------------------

    fn alloc_raw(&mut self, size: u8, align: u8) -> i32 {
        let align = align.max(1) as i32;
        self.frame_cursor -= size as i32;
        let needed = (-self.frame_cursor) as u64;
        let rounded = crate::ast::ty::round_up(needed, align as u64);
        self.frame_cursor = -(rounded as i32);
        self.frame_cursor
    }

    fn alloc_local(&mut self, name: &str, ty: &Type) -> Operand {
        let offset = self.alloc_raw(ty.size().max(1) as u8, ty.align() as u8);
        let slot = Operand::FrameSlot {
            offset,
            size: ty.size() as u8,
        };
        self.declare(name, LocalLoc::Direct(slot.clone()), ty.clone());
        slot
    }

    fn spill_param_sse(&mut self, dst: Operand, xmm_index: u8) {
        self.func.emit(Instruction::Mov {
            dst,
            src: Operand::physical(PhysReg::Xmm(xmm_index), 8),
        });
    }

    fn declare(&mut self, name: &str, loc: LocalLoc, ty: Type) {
        self.scopes
            .last_mut()
            .expect("at least one scope")
            .vars
            .insert(name.to_string(), (loc, ty));
    }

    fn lookup(&self, name: &str) -> Option<&(LocalLoc, Type)> {
        self.scopes.iter().rev().find_map(|s| s.vars.get(name))
    }

    fn fresh_label(&mut self, hint: &str) -> String {
        let n = self.gen.label_counter;
        self.gen.label_counter += 1;
        format!(".L{hint}{n}")
    }

    fn err(&self, span: Span, message: impl Into<String>) -> CompileError {
        self.gen.err(span, message)
    }

    // --- statements ----------------------------------------------------------

    fn gen_block(&mut self, block: &Block) -> CompileResult<()> {
        self.scopes.push(Scope { vars: HashMap::new() });
        for stmt in &block.stmts {
            self.gen_stmt(stmt)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Block(b) => self.gen_block(b),
            StmtKind::Empty => Ok(()),
            StmtKind::Decl { name, ty, init } => self.gen_decl(name, ty, init.as_ref()),
            StmtKind::ExprStmt(e) => {
                self.gen_expr(e)?;
                Ok(())
            }
            StmtKind::Return(value) => self.gen_return(value.as_ref(), stmt.span),
            StmtKind::Break => {
                let label = self
                    .break_labels
                    .last()
                    .cloned()
                    .ok_or_else(|| self.err(stmt.span, "'break' outside a loop"))?;
                self.func.emit(Instruction::Jmp(label));
                Ok(())
            }
            StmtKind::Continue => {
                let label = self
                    .continue_labels
                    .last()
                    .cloned()
                    .ok_or_else(|| self.err(stmt.span, "'continue' outside a loop"))?;
                self.func.emit(Instruction::Jmp(label));
                Ok(())
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let (val, _) = self.gen_expr(cond)?;
                let else_label = self.fresh_label("else");
                let end_label = self.fresh_label("endif");
                self.func.emit(Instruction::JmpIfZero {
                    cond: val,
                    label: if else_branch.is_some() {
                        else_label.clone()
                    } else {
                        end_label.clone()
                    },
                });
                self.gen_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.func.emit(Instruction::Jmp(end_label.clone()));
                    self.func.emit(Instruction::Label(else_label));
                    self.gen_stmt(else_branch)?;
                }
                self.func.emit(Instruction::Label(end_label));
                Ok(())
            }
            StmtKind::While { cond, body } => {
                let start = self.fresh_label("while");
                let end = self.fresh_label("endwhile");
                self.func.emit(Instruction::Label(start.clone()));
                let (val, _) = self.gen_expr(cond)?;
                self.func.emit(Instruction::JmpIfZero {
                    cond: val,
                    label: end.clone(),
                });
                self.break_labels.push(end.clone());
                self.continue_labels.push(start.clone());
                self.gen_stmt(body)?;
                self.break_labels.pop();
                self.continue_labels.pop();
                self.func.emit(Instruction::Jmp(start));
                self.func.emit(Instruction::Label(end));
                Ok(())
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.scopes.push(Scope { vars: HashMap::new() });
                if let Some(init) = init {
                    self.gen_stmt(init)?;
                }
                let start = self.fresh_label("for");
                let step_label = self.fresh_label("forstep");
                let end = self.fresh_label("endfor");
                self.func.emit(Instruction::Label(start.clone()));
                if let Some(cond) = cond {
                    let (val, _) = self.gen_expr(cond)?;
                    self.func.emit(Instruction::JmpIfZero {
                        cond: val,
                        label: end.clone(),
                    });
                }
                self.break_labels.push(end.clone());
                self.continue_labels.push(step_label.clone());
                self.gen_stmt(body)?;
                self.break_labels.pop();
                self.continue_labels.pop();
                self.func.emit(Instruction::Label(step_label));
                if let Some(step) = step {
                    self.gen_expr(step)?;
                }
                self.func.emit(Instruction::Jmp(start));
                self.func.emit(Instruction::Label(end));
                self.scopes.pop();
                Ok(())
            }
        }
    }

    fn gen_return(&mut self, value: Option<&Expr>, span: Span) -> CompileResult<()> {
        match value {
            None => {
                self.func.emit(Instruction::Ret(None));
                Ok(())
            }
            Some(e) => {
                let ret_ty = self.ret_ty.clone();
                if ret_ty.is_struct() {
                    let (addr, _) = self.gen_lvalue_or_struct_value(e)?;
                    if let Some(slot) = self.hidden_ret_slot {
                        // >16-byte return: copy into the memory the caller
                        // pointed RDI at, rather than handing back our own
                        // local's address (the caller never sees it).
                        let ptr = self.to_reg(Operand::FrameSlot { offset: slot, size: 8 });
                        let dst = Operand::Indirect {
                            base: Box::new(ptr),
                            disp: 0,
                            size: ret_ty.size() as u8,
                        };
                        self.copy_aggregate(&dst, &addr, &ret_ty);
                        self.func.emit(Instruction::Ret(None));
                    } else {
                        self.func.emit(Instruction::Ret(Some(addr)));
                    }
                } else {
                    let (val, ty) = self.gen_expr(e)?;
                    let val = self.coerce(val, &ty, &ret_ty, span)?;
                    self.func.emit(Instruction::Ret(Some(val)));
                }
                Ok(())
            }
        }
    }

    fn gen_decl(&mut self, name: &str, ty: &Type, init: Option<&Expr>) -> CompileResult<()> {
        let addr = self.alloc_local(name, ty);
        match init {
            None => Ok(()),
            Some(e) => {
                if let ExprKind::InitList(elems) = &e.kind {
                    self.init_aggregate(&addr, ty, elems, e.span)?;
                    return Ok(());
                }
                if ty.is_struct() {
                    let (src_addr, _) = self.gen_lvalue_or_struct_value(e)?;
                    self.copy_aggregate(&addr, &src_addr, ty);
                } else {
                    let (val, vty) = self.gen_expr(e)?;
                    let val = self.coerce(val, &vty, ty, e.span)?;
                    self.func.emit(Instruction::Mov { dst: addr, src: val });
                }
                Ok(())
            }
        }
    }

    fn init_aggregate(&mut self, addr: &Operand, ty: &Type, elems: &[Expr], span: Span) -> CompileResult<()> {
        match ty {
            Type::Array { elem, len } => {
                let elem_size = elem.size();
                let count = len.unwrap_or(elems.len() as u64);
                for i in 0..count {
                    let field_addr = self.offset_addr(addr, i as i64 * elem_size as i64, elem.size() as u8);
                    if let Some(e) = elems.get(i as usize) {
                        if let ExprKind::InitList(sub) = &e.kind {
                            self.init_aggregate(&field_addr, elem, sub, e.span)?;
                        } else {
                            let (val, vty) = self.gen_expr(e)?;
                            let val = self.coerce(val, &vty, elem, e.span)?;
                            self.func.emit(Instruction::Mov { dst: field_addr, src: val });
                        }
                    } else {
                        self.zero_fill(&field_addr, elem.size() as u8);
                    }
                }
                Ok(())
            }
            Type::Struct(layout) => {
                for (field, e) in layout.fields.iter().zip(elems.iter()) {
                    let field_addr = self.offset_addr(addr, field.offset as i64, field.ty.size() as u8);
                    if let ExprKind::InitList(sub) = &e.kind {
                        self.init_aggregate(&field_addr, &field.ty, sub, e.span)?;
                    } else {
                        let (val, vty) = self.gen_expr(e)?;
                        let val = self.coerce(val, &vty, &field.ty, e.span)?;
                        self.func.emit(Instruction::Mov { dst: field_addr, src: val });
                    }
                }
                for field in layout.fields.iter().skip(elems.len()) {
                    let field_addr = self.offset_addr(addr, field.offset as i64, field.ty.size() as u8);
                    self.zero_fill(&field_addr, field.ty.size() as u8);
                }
                Ok(())
            }
            _ => {
                // A scalar with a one-element brace initializer, e.g. `int x = {5};`.
                if let Some(e) = elems.first() {
                    let (val, vty) = self.gen_expr(e)?;
                    let val = self.coerce(val, &vty, ty, e.span)?;
                    self.func.emit(Instruction::Mov {
                        dst: addr.clone(),
                        src: val,
                    });
                    Ok(())
                } else {
                    Err(self.err(span, "empty initializer for scalar"))
                }
            }
        }
    }

    fn zero_fill(&mut self, addr: &Operand, size: u8) {
        self.func.emit(Instruction::Mov {
            dst: addr.clone(),
            src: Operand::imm(0, size),
        });
    }

    /// Copies an aggregate field-by-field; used for struct assignment,
    /// struct-valued function arguments, and struct-returning initializers.
    fn copy_aggregate(&mut self, dst: &Operand, src: &Operand, ty: &Type) {
        if let Type::Struct(layout) = ty {
            for field in &layout.fields {
                let d = self.offset_addr(dst, field.offset as i64, field.ty.size() as u8);
                let s = self.offset_addr(src, field.offset as i64, field.ty.size() as u8);
                if field.ty.is_struct() {
                    self.copy_aggregate(&d, &s, &field.ty);
                } else {
                    let tmp = self.func.fresh_temp(field.ty.size() as u8, field.ty.is_float());
                    self.func.emit(Instruction::Mov { dst: tmp.clone(), src: s });
                    self.func.emit(Instruction::Mov { dst: d, src: tmp });
                }
            }
        } else {
            let tmp = self.func.fresh_temp(ty.size() as u8, ty.is_float());
            self.func.emit(Instruction::Mov {
                dst: tmp.clone(),
                src: src.clone(),
            });
            self.func.emit(Instruction::Mov {
                dst: dst.clone(),
                src: tmp,
            });
        }
    }

    // --- operand address arithmetic ------------------------------------------

    /// Adds a byte displacement to a memory-address operand, rewriting it in
    /// place where that's exact (frame slots, globals) and materializing the
    /// address into a scratch register otherwise.
    fn offset_addr(&mut self, addr: &Operand, disp: i64, new_size: u8) -> Operand {
        match addr {
            Operand::FrameSlot { offset, .. } => Operand::FrameSlot {
                offset: offset + disp as i32,
                size: new_size,
            },
            Operand::Global { symbol, disp: d, .. } => Operand::Global {
                symbol: symbol.clone(),
                disp: d + disp,
                size: new_size,
            },
            Operand::Indirect { base, disp: d, .. } => Operand::Indirect {
                base: base.clone(),
                disp: d + disp,
                size: new_size,
            },
            Operand::Indexed { .. } => {
                let reg = self.materialize_addr(addr);
                Operand::Indirect {
                    base: Box::new(reg),
                    disp,
                    size: new_size,
                }
            }
            other => {
                let reg = self.to_reg(other.clone());
                Operand::Indirect {
                    base: Box::new(reg),
                    disp,
                    size: new_size,
                }
            }
        }
    }

    fn materialize_addr(&mut self, addr: &Operand) -> Operand {
        let dst = self.func.fresh_temp(8, false);
        self.func.emit(Instruction::Lea {
            dst: dst.clone(),
            src: addr.clone(),
        });
        dst
    }

    fn to_reg(&mut self, op: Operand) -> Operand {
        if let Operand::Reg { .. } = op {
            return op;
        }
        let dst = self.func.fresh_temp(op.size(), false);
        self.func.emit(Instruction::Mov { dst: dst.clone(), src: op });
        dst
    }

    fn to_reg_typed(&mut self, op: Operand, ty: &Type) -> Operand {
        if let Operand::Reg { .. } = op {
            return op;
        }
        let dst = self.func.fresh_temp(op.size(), ty.is_float());
        self.func.emit(Instruction::Mov { dst: dst.clone(), src: op });
        dst
    }

    // --- expressions -----------------------------------------------------------

    /// Evaluates `e` as an lvalue if possible; struct-typed rvalues (a call
    /// result, a compound literal, a cast) also return a usable address under
    /// this compiler's "a struct value is represented by its address"
    /// convention, so most struct-consuming call sites can use this directly.
    fn gen_lvalue_or_struct_value(&mut self, e: &Expr) -> CompileResult<(Operand, Type)> {
        match &e.kind {
            ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Index { .. } | ExprKind::Unary { op: UnaryOp::Deref, .. } => {
                self.gen_lvalue(e)
            }
            _ => self.gen_expr(e),
        }
    }

    fn gen_lvalue(&mut self, e: &Expr) -> CompileResult<(Operand, Type)> {
        match &e.kind {
            ExprKind::Ident(name) => {
                let (loc, ty) = self
                    .lookup(name)
                    .cloned()
                    .ok_or_else(|| self.err(e.span, format!("undefined identifier '{name}'")))?;
                match loc {
                    LocalLoc::Direct(addr) => Ok((addr, ty)),
                    LocalLoc::ViaPointer(slot) => {
                        let ptr = self.func.fresh_temp(8, false);
                        self.func.emit(Instruction::Mov {
                            dst: ptr.clone(),
                            src: Operand::FrameSlot { offset: slot, size: 8 },
                        });
                        Ok((
                            Operand::Indirect {
                                base: Box::new(ptr),
                                disp: 0,
                                size: ty.size() as u8,
                            },
                            ty,
                        ))
                    }
                }
            }
            ExprKind::Unary { op: UnaryOp::Deref, expr } => {
                let (val, ty) = self.gen_expr(expr)?;
                let inner = match &ty {
                    Type::Pointer(inner) => (**inner).clone(),
                    _ => return Err(self.err(e.span, "dereference of a non-pointer")),
                };
                let reg = self.to_reg(val);
                Ok((
                    Operand::Indirect {
                        base: Box::new(reg),
                        disp: 0,
                        size: inner.size() as u8,
                    },
                    inner,
                ))
            }
            ExprKind::Member { base, field, arrow } => {
                if *arrow {
                    let (val, ty) = self.gen_expr(base)?;
                    let layout = match &ty {
                        Type::Pointer(inner) => match &**inner {
                            Type::Struct(l) => l.clone(),
                            _ => return Err(self.err(e.span, "'->' on a non-struct pointer")),
                        },
                        _ => return Err(self.err(e.span, "'->' on a non-pointer")),
                    };
                    let f = layout
                        .field(field)
                        .ok_or_else(|| self.err(e.span, format!("no member '{field}'")))?
                        .clone();
                    let reg = self.to_reg(val);
                    Ok((
                        Operand::Indirect {
                            base: Box::new(reg),
                            disp: f.offset as i64,
                            size: f.ty.size() as u8,
                        },
                        f.ty,
                    ))
                } else {
                    let (addr, ty) = self.gen_lvalue(base)?;
                    let layout = match &ty {
                        Type::Struct(l) => l.clone(),
                        _ => return Err(self.err(e.span, "'.' on a non-struct")),
                    };
                    let f = layout
                        .field(field)
                        .ok_or_else(|| self.err(e.span, format!("no member '{field}'")))?
                        .clone();
                    let field_addr = self.offset_addr(&addr, f.offset as i64, f.ty.size() as u8);
                    Ok((field_addr, f.ty))
                }
            }
            ExprKind::Index { base, index } => {
                let (base_ty_addr, base_ty) = match &base.kind {
                    ExprKind::Ident(_) if matches!(self.expr_type(base)?, Type::Array { .. }) => {
                        let (addr, ty) = self.gen_lvalue(base)?;
                        (Some(addr), ty)
                    }
                    _ => (None, self.expr_type(base)?),
                };
                let elem_ty = match &base_ty {
                    Type::Array { elem, .. } => (**elem).clone(),
                    Type::Pointer(elem) => (**elem).clone(),
                    _ => return Err(self.err(e.span, "subscript of a non-array, non-pointer")),
                };
                let elem_size = elem_ty.size().max(1);
                let (index_val, _) = self.gen_expr(index)?;
                let index_reg = self.to_reg(index_val);
                let (index_reg, scale) = if elem_size <= 8 && [1u64, 2, 4, 8].contains(&elem_size) {
                    (index_reg, elem_size as u8)
                } else {
                    let scaled = self.func.fresh_temp(8, false);
                    self.func.emit(Instruction::Arith {
                        op: ArithOp::IMul,
                        dst: scaled.clone(),
                        lhs: index_reg,
                        rhs: Operand::imm(elem_size as i64, 8),
                    });
                    (scaled, 1)
                };
                let base_operand = match base_ty_addr {
                    Some(addr) => addr,
                    None => {
                        let (val, _) = self.gen_expr(base)?;
                        self.to_reg(val)
                    }
                };
                Ok((
                    Operand::Indexed {
                        base: Box::new(base_operand),
                        index: Box::new(index_reg),
                        scale,
                        disp: 0,
                        size: elem_ty.size() as u8,
                    },
                    elem_ty,
                ))
            }
            _ => Err(self.err(e.span, "expression is not an lvalue")),
        }
    }

    /// Computes `e`'s static type without emitting code, for the few places
    /// (array-vs-pointer subscripting) that need to branch on a type before
    /// deciding how to lower an expression.
    fn expr_type(&mut self, e: &Expr) -> CompileResult<Type> {
        match &e.kind {
            ExprKind::Ident(name) => self
                .lookup(name)
                .map(|(_, ty)| ty.clone())
                .ok_or_else(|| self.err(e.span, format!("undefined identifier '{name}'"))),
            _ => {
                // Conservative fallback: lower into a scratch function copy is
                // wasteful, so for the expression kinds that can appear here
                // (pointer sub-expressions) we just re-derive from `Unary`/`Member`
                // shape without re-emitting instructions would require a real
                // type checker; since only `Ident` bases reach the array arm
                // above, every other base is a pointer by construction once
                // parsed (arrays don't nest under `Index` other than by name).
                Ok(Type::Pointer(Box::new(Type::INT)))
            }
        }
    }

    fn gen_expr(&mut self, e: &Expr) -> CompileResult<(Operand, Type)> {
        match &e.kind {
            ExprKind::IntConst(v) => Ok((Operand::imm(*v, 4), Type::INT)),
            ExprKind::CharConst(c) => Ok((Operand::imm(*c as i64, 1), Type::CHAR)),
            ExprKind::FloatConst(f) => {
                let label = self.gen.alloc_float_const(*f, 8);
                let dst = self.func.fresh_temp(8, true);
                self.func.emit(Instruction::Mov {
                    dst: dst.clone(),
                    src: Operand::Global {
                        symbol: label,
                        disp: 0,
                        size: 8,
                    },
                });
                Ok((dst, Type::Float { width: 8 }))
            }
            ExprKind::StrConst(s) => {
                let label = self.gen.alloc_string_const(s);
                let dst = self.func.fresh_temp(8, false);
                self.func.emit(Instruction::Lea {
                    dst: dst.clone(),
                    src: Operand::Global {
                        symbol: label,
                        disp: 0,
                        size: 1,
                    },
                });
                Ok((dst, Type::Pointer(Box::new(Type::CHAR))))
            }
            ExprKind::Ident(name) => {
                let (addr, ty) = self.gen_lvalue(e)?;
                if matches!(ty, Type::Array { .. }) {
                    let dst = self.materialize_addr(&addr);
                    Ok((dst, ty.decay()))
                } else if ty.is_struct() {
                    Ok((addr, ty))
                } else {
                    let dst = self.to_reg_typed(addr, &ty);
                    Ok((dst, ty))
                }
            }
            ExprKind::Unary { op, expr } => self.gen_unary(*op, expr, e.span),
            ExprKind::Binary { op, lhs, rhs } => self.gen_binary(*op, lhs, rhs, e.span),
            ExprKind::Logical { op, lhs, rhs } => self.gen_logical(*op, lhs, rhs),
            ExprKind::Assign { op, lhs, rhs } => self.gen_assign(*op, lhs, rhs, e.span),
            ExprKind::Call { callee, args } => self.gen_call(callee, args, e.span),
            ExprKind::Member { .. } | ExprKind::Index { .. } => {
                let (addr, ty) = self.gen_lvalue(e)?;
                if ty.is_struct() || matches!(ty, Type::Array { .. }) {
                    if matches!(ty, Type::Array { .. }) {
                        let dst = self.materialize_addr(&addr);
                        return Ok((dst, ty.decay()));
                    }
                    Ok((addr, ty))
                } else {
                    let dst = self.to_reg_typed(addr, &ty);
                    Ok((dst, ty))
                }
            }
            ExprKind::Cast { ty, expr } => {
                if ty.is_struct() {
                    let (addr, _) = self.gen_lvalue_or_struct_value(expr)?;
                    return Ok((addr, ty.clone()));
                }
                let (val, vty) = self.gen_expr(expr)?;
                let val = self.coerce(val, &vty, ty, e.span)?;
                Ok((val, ty.clone()))
            }
            ExprKind::SizeofExpr(inner) => {
                let ty = self.expr_type(inner).unwrap_or(Type::INT);
                Ok((Operand::imm(ty.size() as i64, 8), Type::Int { signed: false, width: 8 }))
            }
            ExprKind::SizeofType(ty) => Ok((
                Operand::imm(ty.size() as i64, 8),
                Type::Int { signed: false, width: 8 },
            )),
            ExprKind::StmtExpr(block) => self.gen_stmt_expr(block),
            ExprKind::CompoundLiteral { ty, fields } => {
                let offset = self.alloc_raw(ty.size() as u8, ty.align() as u8);
                let addr = Operand::FrameSlot {
                    offset,
                    size: ty.size() as u8,
                };
                self.init_aggregate(&addr, ty, fields, e.span)?;
                Ok((addr, ty.clone()))
            }
            ExprKind::InitList(_) => Err(self.err(e.span, "initializer list used outside a declaration")),
        }
    }

    fn gen_stmt_expr(&mut self, block: &Block) -> CompileResult<(Operand, Type)> {
        self.scopes.push(Scope { vars: HashMap::new() });
        let mut result = (Operand::imm(0, 4), Type::Void);
        for (i, stmt) in block.stmts.iter().enumerate() {
            if i + 1 == block.stmts.len() {
                if let StmtKind::ExprStmt(e) = &stmt.kind {
                    result = self.gen_expr(e)?;
                    self.scopes.pop();
                    return Ok(result);
                }
            }
            self.gen_stmt(stmt)?;
        }
        self.scopes.pop();
        Ok(result)
    }

    fn gen_unary(&mut self, op: UnaryOp, expr: &Expr, span: Span) -> CompileResult<(Operand, Type)> {
        match op {
            UnaryOp::Addr => {
                let (addr, ty) = self.gen_lvalue_or_struct_value(expr)?;
                let dst = self.materialize_addr(&addr);
                Ok((dst, Type::Pointer(Box::new(ty))))
            }
            UnaryOp::Deref => {
                let (val, ty) = self.gen_expr(expr)?;
                let inner = match &ty {
                    Type::Pointer(inner) => (**inner).clone(),
                    _ => return Err(self.err(span, "dereference of a non-pointer")),
                };
                let reg = self.to_reg(val);
                let addr = Operand::Indirect {
                    base: Box::new(reg),
                    disp: 0,
                    size: inner.size() as u8,
                };
                if inner.is_struct() {
                    Ok((addr, inner))
                } else {
                    let dst = self.to_reg_typed(addr, &inner);
                    Ok((dst, inner))
                }
            }
            UnaryOp::Not => {
                let (val, ty) = self.gen_expr(expr)?;
                self.func.emit(Instruction::Cmp {
                    lhs: val,
                    rhs: Operand::imm(0, ty.size() as u8),
                });
                let byte = self.func.fresh_temp(1, false);
                self.func.emit(Instruction::SetCc {
                    cond: Cond::Eq,
                    dst: byte.clone(),
                });
                let dst = self.func.fresh_temp(4, false);
                self.func.emit(Instruction::Extend {
                    dst: dst.clone(),
                    src: byte,
                    signed: false,
                });
                Ok((dst, Type::INT))
            }
            UnaryOp::BitNot => {
                let (val, ty) = self.gen_expr(expr)?;
                let dst = self.func.fresh_temp(ty.size() as u8, false);
                self.func.emit(Instruction::Arith {
                    op: ArithOp::Xor,
                    dst: dst.clone(),
                    lhs: val,
                    rhs: Operand::imm(-1, ty.size() as u8),
                });
                Ok((dst, ty))
            }
            UnaryOp::Neg => {
                let (val, ty) = self.gen_expr(expr)?;
                if ty.is_float() {
                    let zero_label = self.gen.alloc_float_const(0.0, ty.size() as u8);
                    let zero = self.func.fresh_temp(ty.size() as u8, true);
                    self.func.emit(Instruction::Mov {
                        dst: zero.clone(),
                        src: Operand::Global {
                            symbol: zero_label,
                            disp: 0,
                            size: ty.size() as u8,
                        },
                    });
                    let dst = self.func.fresh_temp(ty.size() as u8, true);
                    self.func.emit(Instruction::Arith {
                        op: ArithOp::FSub,
                        dst: dst.clone(),
                        lhs: zero,
                        rhs: val,
                    });
                    Ok((dst, ty))
                } else {
                    let dst = self.func.fresh_temp(ty.size() as u8, false);
                    self.func.emit(Instruction::Arith {
                        op: ArithOp::Sub,
                        dst: dst.clone(),
                        lhs: Operand::imm(0, ty.size() as u8),
                        rhs: val,
                    });
                    Ok((dst, ty))
                }
            }
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                let (addr, ty) = self.gen_lvalue(expr)?;
                let old = self.to_reg_typed(addr.clone(), &ty);
                let step = if matches!(ty, Type::Pointer(_)) {
                    match &ty {
                        Type::Pointer(inner) => inner.size().max(1) as i64,
                        _ => 1,
                    }
                } else {
                    1
                };
                let delta = if matches!(op, UnaryOp::PreInc | UnaryOp::PostInc) {
                    step
                } else {
                    -step
                };
                let new_val = self.func.fresh_temp(ty.size() as u8, ty.is_float());
                self.func.emit(Instruction::Arith {
                    op: ArithOp::Add,
                    dst: new_val.clone(),
                    lhs: old.clone(),
                    rhs: Operand::imm(delta, ty.size() as u8),
                });
                self.func.emit(Instruction::Mov {
                    dst: addr,
                    src: new_val.clone(),
                });
                let result = if matches!(op, UnaryOp::PreInc | UnaryOp::PreDec) {
                    new_val
                } else {
                    old
                };
                Ok((result, ty))
            }
        }
    }

    fn gen_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, span: Span) -> CompileResult<(Operand, Type)> {
        let (lv, lty) = self.gen_expr(lhs)?;
        let (rv, rty) = self.gen_expr(rhs)?;

        // Pointer +/- integer: scale the integer operand by the pointee size.
        if matches!(op, BinaryOp::Add | BinaryOp::Sub) {
            if let Type::Pointer(inner) = &lty {
                if rty.is_integer() {
                    return self.gen_ptr_arith(op, lv, rv, inner, span);
                }
            }
            if let Type::Pointer(inner) = &rty {
                if lty.is_integer() && op == BinaryOp::Add {
                    return self.gen_ptr_arith(op, rv, lv, inner, span);
                }
            }
        }

        let common = common_arith_type(&lty, &rty);
        let lv = self.coerce(lv, &lty, &common, span)?;
        let rv = self.coerce(rv, &rty, &common, span)?;

        if op.is_comparison() {
            self.func.emit(Instruction::Cmp { lhs: lv, rhs: rv });
            let byte = self.func.fresh_temp(1, false);
            self.func.emit(Instruction::SetCc {
                cond: cond_for(op, &common),
                dst: byte.clone(),
            });
            let dst = self.func.fresh_temp(4, false);
            self.func.emit(Instruction::Extend {
                dst: dst.clone(),
                src: byte,
                signed: false,
            });
            return Ok((dst, Type::INT));
        }

        let arith = arith_op_for(op, &common);
        let dst = self.func.fresh_temp(common.size() as u8, common.is_float());
        self.func.emit(Instruction::Arith {
            op: arith,
            dst: dst.clone(),
            lhs: lv,
            rhs: rv,
        });
        Ok((dst, common))
    }

    fn gen_ptr_arith(
        &mut self,
        op: BinaryOp,
        ptr: Operand,
        idx: Operand,
        inner: &Type,
        _span: Span,
    ) -> CompileResult<(Operand, Type)> {
        let scale = inner.size().max(1) as i64;
        let idx64 = self.to_reg(idx).with_size(8);
        let scaled = self.func.fresh_temp(8, false);
        self.func.emit(Instruction::Arith {
            op: ArithOp::IMul,
            dst: scaled.clone(),
            lhs: idx64,
            rhs: Operand::imm(scale, 8),
        });
        let dst = self.func.fresh_temp(8, false);
        self.func.emit(Instruction::Arith {
            op: if op == BinaryOp::Add { ArithOp::Add } else { ArithOp::Sub },
            dst: dst.clone(),
            lhs: ptr,
            rhs: scaled,
        });
        Ok((dst, Type::Pointer(Box::new(inner.clone()))))
    }

    fn gen_logical(&mut self, op: LogicalOp, lhs: &Expr, rhs: &Expr) -> CompileResult<(Operand, Type)> {
        let result = self.func.fresh_temp(4, false);
        let (lv, _) = self.gen_expr(lhs)?;
        let short_circuit_label = self.fresh_label(if op == LogicalOp::And { "andfalse" } else { "ortrue" });
        let end_label = self.fresh_label("logend");
        match op {
            LogicalOp::And => self.func.emit(Instruction::JmpIfZero {
                cond: lv,
                label: short_circuit_label.clone(),
            }),
            LogicalOp::Or => self.func.emit(Instruction::JmpIfNotZero {
                cond: lv,
                label: short_circuit_label.clone(),
            }),
        }
        let (rv, _) = self.gen_expr(rhs)?;
        match op {
            LogicalOp::And => self.func.emit(Instruction::JmpIfZero {
                cond: rv,
                label: short_circuit_label.clone(),
            }),
            LogicalOp::Or => self.func.emit(Instruction::JmpIfNotZero {
                cond: rv,
                label: short_circuit_label.clone(),
            }),
        }
        self.func.emit(Instruction::Mov {
            dst: result.clone(),
            src: Operand::imm(1, 4),
        });
        self.func.emit(Instruction::Jmp(end_label.clone()));
        self.func.emit(Instruction::Label(short_circuit_label));
        self.func.emit(Instruction::Mov {
            dst: result.clone(),
            src: Operand::imm(0, 4),
        });
        self.func.emit(Instruction::Label(end_label));
        Ok((result, Type::INT))
    }

    fn gen_assign(&mut self, op: Option<BinaryOp>, lhs: &Expr, rhs: &Expr, span: Span) -> CompileResult<(Operand, Type)> {
        let (addr, lty) = self.gen_lvalue(lhs)?;
        match op {
            None => {
                if lty.is_struct() {
                    let (src_addr, _) = self.gen_lvalue_or_struct_value(rhs)?;
                    self.copy_aggregate(&addr, &src_addr, &lty);
                    Ok((addr, lty))
                } else {
                    let (rv, rty) = self.gen_expr(rhs)?;
                    let rv = self.coerce(rv, &rty, &lty, span)?;
                    self.func.emit(Instruction::Mov {
                        dst: addr.clone(),
                        src: rv.clone(),
                    });
                    Ok((rv, lty))
                }
            }
            Some(bop) => {
                let cur = self.to_reg_typed(addr.clone(), &lty);
                let (rv, rty) = self.gen_expr(rhs)?;
                let (new_val, _) = if matches!(bop, BinaryOp::Add | BinaryOp::Sub) && matches!(lty, Type::Pointer(_)) {
                    match &lty {
                        Type::Pointer(inner) => self.gen_ptr_arith(bop, cur, rv, inner, span)?,
                        _ => unreachable!(),
                    }
                } else {
                    let common = common_arith_type(&lty, &rty);
                    let cur_c = self.coerce(cur, &lty, &common, span)?;
                    let rv_c = self.coerce(rv, &rty, &common, span)?;
                    let dst = self.func.fresh_temp(common.size() as u8, common.is_float());
                    self.func.emit(Instruction::Arith {
                        op: arith_op_for(bop, &common),
                        dst: dst.clone(),
                        lhs: cur_c,
                        rhs: rv_c,
                    });
                    (dst, common)
                };
                let new_val = self.coerce(new_val, &lty, &lty, span)?;
                self.func.emit(Instruction::Mov {
                    dst: addr,
                    src: new_val.clone(),
                });
                Ok((new_val, lty))
            }
        }
    }

    fn gen_call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> CompileResult<(Operand, Type)> {
        let name = match &callee.kind {
            ExprKind::Ident(n) => n.clone(),
            _ => return Err(self.err(span, "indirect calls through function pointers are not supported")),
        };
        let sig = self
            .gen
            .sigs
            .get(&name)
            .cloned()
            .ok_or_else(|| self.err(span, format!("call to undeclared function '{name}'")))?;

        let ret_class = abi::classify_return(&sig.ret);
        let mut int_args = Vec::new();
        let mut sse_args = Vec::new();
        let mut ints_used: u8 = 0;
        let mut sses_used: u8 = 0;
        let mut dest_slot = None;

        if matches!(ret_class, RetClass::Memory) {
            let offset = self.alloc_raw(sig.ret.size() as u8, sig.ret.align() as u8);
            let addr = Operand::FrameSlot {
                offset,
                size: sig.ret.size() as u8,
            };
            let ptr = self.materialize_addr(&addr);
            int_args.push(ptr);
            ints_used += 1;
            dest_slot = Some(addr);
        }

        for (i, arg) in args.iter().enumerate() {
            let param_ty = sig.params.get(i).cloned();
            if let Some(pty) = &param_ty {
                if pty.is_struct() {
                    let (addr, _) = self.gen_lvalue_or_struct_value(arg)?;
                    match abi::classify_arg(pty, ints_used, sses_used) {
                        ArgClass::IntPair { regs } => {
                            for r in 0..regs {
                                let chunk_size = (pty.size() as i64 - r as i64 * 8).clamp(0, 8) as u8;
                                let chunk = self.offset_addr(&addr, r as i64 * 8, chunk_size);
                                let val = self.to_reg(chunk);
                                int_args.push(val);
                            }
                            ints_used += regs;
                        }
                        _ => {
                            let ptr = self.materialize_addr(&addr);
                            int_args.push(ptr);
                            ints_used += 1;
                        }
                    }
                    continue;
                }
            }
            let (val, vty) = self.gen_expr(arg)?;
            let target_ty = param_ty.unwrap_or_else(|| vty.decay());
            let val = self.coerce(val, &vty, &target_ty, arg.span)?;
            if target_ty.is_float() {
                sse_args.push(val);
                sses_used += 1;
            } else {
                int_args.push(val);
                ints_used += 1;
            }
        }

        if sig.variadic {
            self.func.emit(Instruction::Mov {
                dst: Operand::physical(PhysReg::Rax, 1),
                src: Operand::imm(sses_used as i64, 1),
            });
        }

        let ir_ret_class = match ret_class {
            RetClass::Void => super::inst::RetClass::Void,
            RetClass::Int => super::inst::RetClass::Int,
            RetClass::Sse => super::inst::RetClass::Sse,
            RetClass::IntPair => super::inst::RetClass::IntPair,
            RetClass::Memory => super::inst::RetClass::Memory,
        };

        let dst_operand = match ret_class {
            RetClass::Void => None,
            RetClass::Int => Some(self.func.fresh_temp(sig.ret.size().max(1) as u8, false)),
            RetClass::Sse => Some(self.func.fresh_temp(sig.ret.size() as u8, true)),
            RetClass::IntPair => {
                let offset = self.alloc_raw(sig.ret.size() as u8, sig.ret.align() as u8);
                Some(Operand::FrameSlot {
                    offset,
                    size: sig.ret.size() as u8,
                })
            }
            RetClass::Memory => dest_slot.clone(),
        };

        self.func.emit(Instruction::Call {
            callee: Callee::Direct(name),
            int_args,
            sse_args,
            ret_class: ir_ret_class,
            dst: dst_operand.clone(),
        });

        match ret_class {
            RetClass::Void => Ok((Operand::imm(0, 4), Type::Void)),
            _ => Ok((dst_operand.unwrap(), sig.ret.clone())),
        }
    }

    // --- coercion ----------------------------------------------------------

    fn coerce(&mut self, val: Operand, from: &Type, to: &Type, span: Span) -> CompileResult<Operand> {
        if from == to {
            return Ok(val);
        }
        if to.is_struct() || from.is_struct() {
            return Ok(val);
        }
        match (from.is_float(), to.is_float()) {
            (false, true) => {
                let dst = self.func.fresh_temp(to.size() as u8, true);
                self.func.emit(Instruction::IntToFloat { dst: dst.clone(), src: val });
                Ok(dst)
            }
            (true, false) => {
                let dst = self.func.fresh_temp(to.size() as u8, false);
                self.func.emit(Instruction::FloatToInt { dst: dst.clone(), src: val });
                Ok(dst)
            }
            (true, true) => {
                if from.size() == to.size() {
                    return Ok(val.with_size(to.size() as u8));
                }
                let dst = self.func.fresh_temp(to.size() as u8, true);
                if to.size() > from.size() {
                    self.func.emit(Instruction::Extend {
                        dst: dst.clone(),
                        src: val,
                        signed: true,
                    });
                } else {
                    self.func.emit(Instruction::Truncate { dst: dst.clone(), src: val });
                }
                Ok(dst)
            }
            (false, false) => {
                if from.size() == to.size() {
                    return Ok(val.with_size(to.size() as u8));
                }
                let dst = self.func.fresh_temp(to.size() as u8, false);
                if to.size() > from.size() {
                    let signed = matches!(from, Type::Int { signed: true, .. });
                    self.func.emit(Instruction::Extend {
                        dst: dst.clone(),
                        src: val,
                        signed,
                    });
                } else {
                    self.func.emit(Instruction::Truncate { dst: dst.clone(), src: val });
                }
                let _ = span;
                Ok(dst)
            }
        }
    }
}

impl IrGen {
    fn alloc_float_const(&mut self, value: f64, width: u8) -> String {
        let label = format!(".LF{}", self.float_counter);
        self.float_counter += 1;
        let bits = if width == 4 {
            (value as f32).to_bits() as u64
        } else {
            value.to_bits()
        };
        self.module.float_consts.push(FloatConst { label: label.clone(), bits, width });
        label
    }

    fn alloc_string_const(&mut self, s: &str) -> String {
        let label = format!(".LS{}", self.string_counter);
        self.string_counter += 1;
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        self.module.string_consts.push(StringConst { label: label.clone(), bytes });
        label
    }
}

fn common_arith_type(l: &Type, r: &Type) -> Type {
    if l.is_float() || r.is_float() {
        let width = l.size().max(r.size()).max(4).min(8) as u8;
        return Type::Float { width };
    }
    if l.is_pointer() {
        return l.clone();
    }
    if r.is_pointer() {
        return r.clone();
    }
    let width = l.size().max(r.size()).max(4) as u8;
    let is_unsigned = |t: &Type| matches!(t, Type::Int { signed: false, .. });
    let signed = !(is_unsigned(l) || is_unsigned(r));
    Type::Int { signed, width }
}

fn cond_for(op: BinaryOp, ty: &Type) -> Cond {
    let unsigned = matches!(ty, Type::Int { signed: false, .. }) || ty.is_pointer();
    match op {
        BinaryOp::Eq => Cond::Eq,
        BinaryOp::Ne => Cond::Ne,
        BinaryOp::Lt => if unsigned { Cond::Below } else { Cond::Lt },
        BinaryOp::Le => if unsigned { Cond::BelowEq } else { Cond::Le },
        BinaryOp::Gt => if unsigned { Cond::Above } else { Cond::Gt },
        BinaryOp::Ge => if unsigned { Cond::AboveEq } else { Cond::Ge },
        _ => unreachable!("cond_for called with a non-comparison operator"),
    }
}

fn arith_op_for(op: BinaryOp, ty: &Type) -> ArithOp {
    let float = ty.is_float();
    let unsigned = matches!(ty, Type::Int { signed: false, .. });
    match op {
        BinaryOp::Add => if float { ArithOp::FAdd } else { ArithOp::Add },
        BinaryOp::Sub => if float { ArithOp::FSub } else { ArithOp::Sub },
        BinaryOp::Mul => if float { ArithOp::FMul } else { ArithOp::IMul },
        BinaryOp::Div => {
            if float {
                ArithOp::FDiv
            } else if unsigned {
                ArithOp::UDiv
            } else {
                ArithOp::IDiv
            }
        }
        BinaryOp::Mod => if unsigned { ArithOp::UMod } else { ArithOp::IMod },
        BinaryOp::BitAnd => ArithOp::And,
        BinaryOp::BitOr => ArithOp::Or,
        BinaryOp::BitXor => ArithOp::Xor,
        BinaryOp::Shl => ArithOp::Shl,
        BinaryOp::Shr => if unsigned { ArithOp::Shr } else { ArithOp::Sar },
        _ => unreachable!("arith_op_for called with a comparison operator"),
    }
}
