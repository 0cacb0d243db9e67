use crate::ast::ty::Type;
use crate::error::Span;

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntConst(i64),
    FloatConst(f64),
    StrConst(String),
    CharConst(i8),
    Ident(String),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Short-circuiting `&&`/`||`; kept distinct from `Binary` so the IR
    /// generator knows to lower it with branches instead of a flat `cmp`
    /// (§4.3 "Short-circuit logical").
    Logical {
        op: LogicalOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        /// `None` for plain `=`; `Some(op)` for one of the ten compound forms.
        op: Option<BinaryOp>,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        base: Box<Expr>,
        field: String,
        arrow: bool,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Cast {
        ty: Type,
        expr: Box<Expr>,
    },
    SizeofExpr(Box<Expr>),
    SizeofType(Type),
    /// GNU statement expression `({ ...; expr })`: a block whose final
    /// expression-statement is this expression's value.
    StmtExpr(Box<crate::ast::stmt::Block>),
    CompoundLiteral {
        ty: Type,
        fields: Vec<Expr>,
    },
    /// A brace-enclosed initializer list attached to a declaration, e.g.
    /// `int a[5] = {1,2,3,4,5};` or `P p = {3,4};`. Distinct from
    /// `CompoundLiteral`, which names its type explicitly (`(P){3,4}`); an
    /// `InitList` takes its type from the declaration it initializes.
    InitList(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Addr,
    Deref,
    Not,
    BitNot,
    Neg,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}
