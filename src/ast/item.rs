use crate::ast::stmt::Block;
use crate::ast::ty::Type;
use crate::error::Span;

#[derive(Debug, Clone)]
pub struct FuncSig {
    pub ret: Type,
    pub params: Vec<(String, Type)>,
    pub variadic: bool,
}

#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub kind: ItemKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ItemKind {
    FunctionDef {
        name: String,
        sig: FuncSig,
        body: Block,
    },
    FunctionProto {
        name: String,
        sig: FuncSig,
    },
    GlobalVar {
        name: String,
        ty: Type,
        init: Option<crate::ast::expr::Expr>,
    },
    /// A standalone `struct Name { ... };` with no variable declared alongside it.
    /// The layout is already registered in the parser's type environment by the
    /// time this item is produced; it is kept here only so the IR generator can
    /// skip it without consulting the type environment again.
    StructDecl {
        tag: String,
    },
    Typedef {
        name: String,
        ty: Type,
    },
}
