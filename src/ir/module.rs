//! The whole-program IR: every function plus the data that backs `.data`/`.rodata`.

use super::func::IrFunction;
use crate::ast::Type;

#[derive(Debug, Clone)]
pub struct GlobalVar {
    pub name: String,
    pub ty: Type,
    /// Flattened scalar initializer words (value, byte width), empty for
    /// zero-initialized globals (`.bss`-equivalent, emitted as `.zero N`).
    pub init: Vec<(i64, u8)>,
}

#[derive(Debug, Clone)]
pub struct FloatConst {
    pub label: String,
    pub bits: u64,
    pub width: u8,
}

#[derive(Debug, Clone)]
pub struct StringConst {
    pub label: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct IrModule {
    pub functions: Vec<IrFunction>,
    pub globals: Vec<GlobalVar>,
    pub float_consts: Vec<FloatConst>,
    pub string_consts: Vec<StringConst>,
    /// Names declared only via `FunctionProto` / an implicit-extern call
    /// target, so the emitter knows to mark them `.globl`-but-undefined
    /// rather than missing symbols.
    pub externs: Vec<String>,
}
