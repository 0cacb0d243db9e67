//! Recursive-descent parser with one token of lookahead and bounded backtracking
//! for the cast-vs-parenthesized-expression ambiguity (§4.1).

mod decl;
mod expr;
mod stmt;
pub mod symtab;

use crate::ast::TranslationUnit;
use crate::error::{CompileError, CompileResult, Span};
use crate::lexer::{Token, TokenKind};
use std::path::{Path, PathBuf};
use symtab::TypeEnv;

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    path: PathBuf,
    pub types: TypeEnv,
}

/// A restore point covering both the token cursor and every type-environment
/// mutation made since it was taken. Restoring one undoes both atomically, which
/// is the rollback guarantee §4.1 and §9 require of speculative parsing.
pub struct Savepoint {
    pos: usize,
    type_checkpoint: usize,
}

impl<'a> Parser<'a> {
    pub fn new(path: impl AsRef<Path>, tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            path: path.as_ref().to_path_buf(),
            types: TypeEnv::new(),
        }
    }

    pub fn parse_translation_unit(mut self) -> CompileResult<TranslationUnit> {
        let mut items = Vec::new();
        while !self.at_eof() {
            items.push(self.parse_item()?);
        }
        Ok(TranslationUnit { items })
    }

    // --- token cursor primitives -------------------------------------------------

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn span(&self) -> Span {
        self.peek().span
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if !matches!(tok.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn checkpoint(&self) -> Savepoint {
        Savepoint {
            pos: self.pos,
            type_checkpoint: self.types.checkpoint(),
        }
    }

    fn restore(&mut self, sp: Savepoint) {
        self.pos = sp.pos;
        self.types.rollback(sp.type_checkpoint);
    }

    fn commit(&mut self, sp: Savepoint) {
        self.types.commit(sp.type_checkpoint);
    }

    /// Run `f` speculatively: on `Ok`, the parse (and any type-environment
    /// mutations it made) is committed; on `Err`, the cursor and type
    /// environment are restored exactly as they were. This is the single place
    /// in the parser where rollback happens, used by cast detection.
    fn try_parse<T>(&mut self, f: impl FnOnce(&mut Self) -> CompileResult<T>) -> Option<T> {
        let sp = self.checkpoint();
        match f(self) {
            Ok(value) => {
                self.commit(sp);
                Some(value)
            }
            Err(_) => {
                self.restore(sp);
                None
            }
        }
    }

    fn err_syntax(&self, message: impl Into<String>) -> CompileError {
        CompileError::syntax(self.path.clone(), self.span(), message)
    }

    fn err_semantic(&self, span: Span, message: impl Into<String>) -> CompileError {
        CompileError::semantic(self.path.clone(), span, message)
    }

    fn expect_punct(&mut self, p: crate::lexer::Punct) -> CompileResult<Span> {
        let span = self.span();
        match self.peek_kind() {
            TokenKind::Punct(found) if *found == p => {
                self.advance();
                Ok(span)
            }
            other => Err(self.err_syntax(format!("expected {p:?}, found {other:?}"))),
        }
    }

    fn eat_punct(&mut self, p: crate::lexer::Punct) -> bool {
        if matches!(self.peek_kind(), TokenKind::Punct(found) if *found == p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: crate::lexer::Keyword) -> bool {
        if matches!(self.peek_kind(), TokenKind::Keyword(found) if *found == kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> CompileResult<String> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.err_syntax(format!("expected identifier, found {other:?}"))),
        }
    }
}

/// Parse a full translation unit from already-lexed tokens.
pub fn parse(path: impl AsRef<Path>, tokens: &[Token]) -> CompileResult<TranslationUnit> {
    Parser::new(path, tokens).parse_translation_unit()
}
