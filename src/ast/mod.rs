//! Abstract syntax tree produced by the parser and consumed by the IR generator.
//!
//! Mirrors the grounding repo's per-kind submodule layout (`til/struct.rs`,
//! `til/pointer.rs`, `til/function.rs`, ...) but organized by AST *role*
//! (expression/statement/item/type) rather than by C type kind, since unlike a
//! type-information format this AST has expressions and statements as first-class
//! citizens, not just types.

pub mod expr;
pub mod item;
pub mod stmt;
pub mod ty;

pub use expr::{BinaryOp, Expr, ExprKind, LogicalOp, UnaryOp};
pub use item::{FuncSig, Item, ItemKind, TranslationUnit};
pub use stmt::{Block, Stmt, StmtKind};
pub use ty::{FunctionType, StructField, StructLayout, Type};
