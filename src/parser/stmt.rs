use super::Parser;
use crate::ast::{Block, Stmt, StmtKind};
use crate::error::CompileResult;
use crate::lexer::{Keyword, Punct, TokenKind};

impl<'a> Parser<'a> {
    pub(super) fn parse_block(&mut self) -> CompileResult<Block> {
        self.expect_punct(Punct::LBrace)?;
        let mut stmts = Vec::new();
        while !self.eat_punct(Punct::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(Block { stmts })
    }

    pub(super) fn parse_stmt(&mut self) -> CompileResult<Stmt> {
        let span = self.span();
        match self.peek_kind() {
            TokenKind::Punct(Punct::LBrace) => {
                let block = self.parse_block()?;
                Ok(Stmt {
                    kind: StmtKind::Block(block),
                    span,
                })
            }
            TokenKind::Punct(Punct::Semi) => {
                self.advance();
                Ok(Stmt {
                    kind: StmtKind::Empty,
                    span,
                })
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if(span),
            TokenKind::Keyword(Keyword::While) => self.parse_while(span),
            TokenKind::Keyword(Keyword::For) => self.parse_for(span),
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                let value = if self.eat_punct(Punct::Semi) {
                    None
                } else {
                    let e = self.parse_expr()?;
                    self.expect_punct(Punct::Semi)?;
                    Some(e)
                };
                Ok(Stmt {
                    kind: StmtKind::Return(value),
                    span,
                })
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                self.expect_punct(Punct::Semi)?;
                Ok(Stmt {
                    kind: StmtKind::Break,
                    span,
                })
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                self.expect_punct(Punct::Semi)?;
                Ok(Stmt {
                    kind: StmtKind::Continue,
                    span,
                })
            }
            _ if self.looks_like_decl_start() => self.parse_local_decl(span),
            _ => {
                let e = self.parse_expr()?;
                self.expect_punct(Punct::Semi)?;
                Ok(Stmt {
                    kind: StmtKind::ExprStmt(e),
                    span,
                })
            }
        }
    }

    fn parse_if(&mut self, span: crate::error::Span) -> CompileResult<Stmt> {
        self.advance();
        self.expect_punct(Punct::LParen)?;
        let cond = self.parse_expr()?;
        self.expect_punct(Punct::RParen)?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.eat_keyword(Keyword::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt {
            kind: StmtKind::If {
                cond,
                then_branch,
                else_branch,
            },
            span,
        })
    }

    fn parse_while(&mut self, span: crate::error::Span) -> CompileResult<Stmt> {
        self.advance();
        self.expect_punct(Punct::LParen)?;
        let cond = self.parse_expr()?;
        self.expect_punct(Punct::RParen)?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt {
            kind: StmtKind::While { cond, body },
            span,
        })
    }

    fn parse_for(&mut self, span: crate::error::Span) -> CompileResult<Stmt> {
        self.advance();
        self.expect_punct(Punct::LParen)?;
        let init = if self.eat_punct(Punct::Semi) {
            None
        } else {
            let init_span = self.span();
            let stmt = if self.looks_like_decl_start() {
                self.parse_local_decl(init_span)?
            } else {
                let e = self.parse_expr()?;
                self.expect_punct(Punct::Semi)?;
                Stmt {
                    kind: StmtKind::ExprStmt(e),
                    span: init_span,
                }
            };
            Some(Box::new(stmt))
        };
        let cond = if matches!(self.peek_kind(), TokenKind::Punct(Punct::Semi)) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_punct(Punct::Semi)?;
        let step = if matches!(self.peek_kind(), TokenKind::Punct(Punct::RParen)) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_punct(Punct::RParen)?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt {
            kind: StmtKind::For {
                init,
                cond,
                step,
                body,
            },
            span,
        })
    }

    /// True if the upcoming tokens start a declaration rather than an
    /// expression-statement: either a built-in type keyword, `struct`, or an
    /// identifier that is a registered typedef name (§4.1's type lookup rule,
    /// reused here for statement-level ambiguity the same way it resolves the
    /// cast-vs-parenthesized-expression ambiguity).
    fn looks_like_decl_start(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Keyword(kw) => kw.starts_type() || matches!(kw, Keyword::Const | Keyword::Volatile),
            TokenKind::Ident(name) => self.types.is_type_name(name),
            _ => false,
        }
    }

    fn parse_local_decl(&mut self, span: crate::error::Span) -> CompileResult<Stmt> {
        let base_ty = self.parse_decl_specifiers()?;
        let stars = self.parse_pointer_stars();
        let mut ty = base_ty;
        for _ in 0..stars {
            ty = crate::ast::Type::Pointer(Box::new(ty));
        }
        let name = self.expect_ident()?;
        let ty = self.parse_array_suffixes(ty)?;
        let init = if self.eat_punct(Punct::Assign) {
            Some(self.parse_initializer()?)
        } else {
            None
        };
        self.expect_punct(Punct::Semi)?;
        Ok(Stmt {
            kind: StmtKind::Decl { name, ty, init },
            span,
        })
    }
}
