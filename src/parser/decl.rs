//! Type specifiers, declarators, typedefs, struct declarations, and top-level
//! function/global parsing.

use super::Parser;
use crate::ast::ty::layout_struct;
use crate::ast::{FuncSig, Item, ItemKind, Type};
use crate::error::CompileResult;
use crate::lexer::{Keyword, Punct, TokenKind};
use std::rc::Rc;

impl<'a> Parser<'a> {
    pub(super) fn parse_item(&mut self) -> CompileResult<Item> {
        let span = self.span();
        if self.eat_keyword(Keyword::Typedef) {
            return self.parse_typedef(span);
        }

        let base_ty = self.parse_decl_specifiers()?;

        // `struct Foo { ... };` with no declarator: the struct is already
        // registered by `parse_decl_specifiers`; nothing left to do but record it.
        if self.eat_punct(Punct::Semi) {
            let tag = match &base_ty {
                Type::Struct(layout) => layout.tag.clone().unwrap_or_default(),
                _ => return Err(self.err_syntax("expected declarator before ';'")),
            };
            return Ok(Item {
                kind: ItemKind::StructDecl { tag },
                span,
            });
        }

        let stars = self.parse_pointer_stars();
        let ptr_ty = wrap_pointers(base_ty, stars);
        let name = self.expect_ident()?;

        if self.eat_punct(Punct::LParen) {
            let (params, variadic) = self.parse_params()?;
            self.expect_punct(Punct::RParen)?;
            let sig = FuncSig {
                ret: ptr_ty,
                params,
                variadic,
            };
            if self.eat_punct(Punct::Semi) {
                return Ok(Item {
                    kind: ItemKind::FunctionProto { name, sig },
                    span,
                });
            }
            let body = self.parse_block()?;
            return Ok(Item {
                kind: ItemKind::FunctionDef { name, sig, body },
                span,
            });
        }

        let ty = self.parse_array_suffixes(ptr_ty)?;
        let init = if self.eat_punct(Punct::Assign) {
            Some(self.parse_initializer()?)
        } else {
            None
        };
        self.expect_punct(Punct::Semi)?;
        Ok(Item {
            kind: ItemKind::GlobalVar { name, ty, init },
            span,
        })
    }

    fn parse_typedef(&mut self, span: crate::error::Span) -> CompileResult<Item> {
        let base_ty = self.parse_decl_specifiers()?;
        let stars = self.parse_pointer_stars();
        let ptr_ty = wrap_pointers(base_ty, stars);
        let name = self.expect_ident()?;
        let ty = self.parse_array_suffixes(ptr_ty)?;
        self.expect_punct(Punct::Semi)?;
        self.types.insert_typedef(name.clone(), ty.clone());
        Ok(Item {
            kind: ItemKind::Typedef { name, ty },
            span,
        })
    }

    /// Parses a sequence of declaration-specifier keywords (`unsigned long`,
    /// `struct Point`, a typedef name, ...) into one `Type`. Does not consume any
    /// declarator (pointer stars, name, array suffixes) — callers do that.
    pub(super) fn parse_decl_specifiers(&mut self) -> CompileResult<Type> {
        if self.eat_keyword(Keyword::Struct) {
            return self.parse_struct_specifier();
        }
        if let TokenKind::Ident(name) = self.peek_kind().clone() {
            if let Some(ty) = self.types.lookup_typedef(&name).cloned() {
                self.advance();
                return Ok(ty);
            }
        }

        let mut void_seen = false;
        let mut char_seen = false;
        let mut float_seen = false;
        let mut double_seen = false;
        let mut int_seen = false;
        let mut short_count = 0u32;
        let mut long_count = 0u32;
        let mut unsigned_seen = false;
        let mut signed_seen = false;
        let mut any = false;

        loop {
            match self.peek_kind() {
                TokenKind::Keyword(Keyword::Void) => {
                    void_seen = true;
                    any = true;
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Char) => {
                    char_seen = true;
                    any = true;
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Short) => {
                    short_count += 1;
                    any = true;
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Int) => {
                    int_seen = true;
                    any = true;
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Long) => {
                    long_count += 1;
                    any = true;
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Unsigned) => {
                    unsigned_seen = true;
                    any = true;
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Signed) => {
                    signed_seen = true;
                    any = true;
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Float) => {
                    float_seen = true;
                    any = true;
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Double) => {
                    double_seen = true;
                    any = true;
                    self.advance();
                }
                TokenKind::Keyword(Keyword::Const) | TokenKind::Keyword(Keyword::Volatile) => {
                    // Qualifiers are accepted and dropped: this compiler never
                    // optimizes on them (§1 Non-goals), so they carry no
                    // information the rest of the pipeline needs.
                    self.advance();
                }
                _ => break,
            }
        }

        if !any {
            return Err(self.err_syntax("expected a type specifier"));
        }
        if void_seen {
            return Ok(Type::Void);
        }
        if float_seen {
            return Ok(Type::Float { width: 4 });
        }
        if double_seen {
            return Ok(Type::Float { width: 8 });
        }
        if char_seen {
            return Ok(Type::Int {
                signed: !unsigned_seen,
                width: 1,
            });
        }
        let signed = !unsigned_seen;
        let width = if long_count >= 1 {
            8
        } else if short_count >= 1 {
            2
        } else {
            4
        };
        let _ = (int_seen, signed_seen);
        Ok(Type::Int { signed, width })
    }

    fn parse_struct_specifier(&mut self) -> CompileResult<Type> {
        let tag_span = self.span();
        let tag = if let TokenKind::Ident(_) = self.peek_kind() {
            Some(self.expect_ident()?)
        } else {
            None
        };

        if self.eat_punct(Punct::LBrace) {
            let mut members = Vec::new();
            while !self.eat_punct(Punct::RBrace) {
                let member_ty = self.parse_decl_specifiers()?;
                loop {
                    let stars = self.parse_pointer_stars();
                    let member_ptr_ty = wrap_pointers(member_ty.clone(), stars);
                    let name = self.expect_ident()?;
                    let full_ty = self.parse_array_suffixes(member_ptr_ty)?;
                    members.push((name, full_ty));
                    if !self.eat_punct(Punct::Comma) {
                        break;
                    }
                }
                self.expect_punct(Punct::Semi)?;
            }
            // An untagged `struct { ... }` still needs a name to register
            // under: without one, `typedef struct { ... } Point;` would only
            // ever be reachable through the `Point` typedef alias, never as
            // its own struct entry.
            let registered_tag = tag.unwrap_or_else(|| self.types.fresh_anon_tag());
            let layout = Rc::new(layout_struct(Some(registered_tag.clone()), members));
            self.types.insert_struct(registered_tag, layout.clone());
            return Ok(Type::Struct(layout));
        }

        let tag = tag.ok_or_else(|| self.err_syntax("expected struct tag or '{'"))?;
        let layout = self
            .types
            .lookup_struct(&tag)
            .cloned()
            .ok_or_else(|| self.err_semantic(tag_span, format!("undefined struct '{tag}'")))?;
        Ok(Type::Struct(layout))
    }

    pub(super) fn parse_pointer_stars(&mut self) -> u32 {
        let mut count = 0;
        while self.eat_punct(Punct::Star) {
            count += 1;
        }
        count
    }

    /// Parses zero or more `[N]`/`[]` suffixes and wraps `base` into nested
    /// arrays, outermost-first-declared-dimension-outermost (§3's array-of(Type,
    /// length); see the module doc for the full precedence derivation).
    pub(super) fn parse_array_suffixes(&mut self, base: Type) -> CompileResult<Type> {
        let mut dims = Vec::new();
        while self.eat_punct(Punct::LBracket) {
            if self.eat_punct(Punct::RBracket) {
                dims.push(None);
                continue;
            }
            let len = self.parse_array_length()?;
            self.expect_punct(Punct::RBracket)?;
            dims.push(Some(len));
        }
        let mut ty = base;
        for len in dims.into_iter().rev() {
            ty = Type::Array {
                elem: Box::new(ty),
                len,
            };
        }
        Ok(ty)
    }

    fn parse_array_length(&mut self) -> CompileResult<u64> {
        match self.peek_kind().clone() {
            TokenKind::Int(lit) => {
                self.advance();
                Ok(lit.value as u64)
            }
            other => Err(self.err_syntax(format!("expected array length, found {other:?}"))),
        }
    }

    /// Parses a function parameter list. Three consecutive `.` tokens after a
    /// regular parameter mark the function variadic (§4.1): the lexer never fuses
    /// them into one token, so this is the one place that groups them.
    pub(super) fn parse_params(&mut self) -> CompileResult<(Vec<(String, Type)>, bool)> {
        let mut params = Vec::new();
        let mut variadic = false;
        if matches!(self.peek_kind(), TokenKind::Punct(Punct::RParen)) {
            return Ok((params, variadic));
        }
        // `f(void)` takes no parameters.
        if matches!(self.peek_kind(), TokenKind::Keyword(Keyword::Void))
            && matches!(self.peek_at(1), TokenKind::Punct(Punct::RParen))
        {
            self.advance();
            return Ok((params, variadic));
        }
        loop {
            if self.three_dots_ahead() {
                self.advance();
                self.advance();
                self.advance();
                variadic = true;
                break;
            }
            let ty = self.parse_decl_specifiers()?;
            let stars = self.parse_pointer_stars();
            let ty = wrap_pointers(ty, stars);
            let name = if let TokenKind::Ident(_) = self.peek_kind() {
                self.expect_ident()?
            } else {
                String::new()
            };
            let ty = self.parse_array_suffixes(ty)?.decay();
            params.push((name, ty));
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        Ok((params, variadic))
    }

    fn three_dots_ahead(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Punct(Punct::Dot))
            && matches!(self.peek_at(1), TokenKind::Punct(Punct::Dot))
            && matches!(self.peek_at(2), TokenKind::Punct(Punct::Dot))
    }

    /// Parses a type-name (decl-specifiers + abstract declarator) as used by a
    /// cast `(T)e` or `sizeof(T)`. Shares the declarator machinery with ordinary
    /// declarations but never consumes an identifier.
    pub(super) fn parse_type_name(&mut self) -> CompileResult<Type> {
        let base = self.parse_decl_specifiers()?;
        let stars = self.parse_pointer_stars();
        let ty = wrap_pointers(base, stars);
        self.parse_array_suffixes(ty)
    }
}

fn wrap_pointers(base: Type, stars: u32) -> Type {
    let mut ty = base;
    for _ in 0..stars {
        ty = Type::Pointer(Box::new(ty));
    }
    ty
}
