//! The type-alias and struct-layout tables threaded through the parser.
//!
//! In a full pipeline these would arrive pre-populated from the preprocessor
//! bridge (§1); for a single translation unit they are built up as the parser
//! encounters `typedef`s and `struct` declarations. Mutations are journaled so a
//! failed speculative parse (cast-vs-parenthesized-expression backtracking, §4.1)
//! can roll them back exactly, the same transactional requirement §9 calls out.

use crate::ast::{StructLayout, Type};
use std::collections::HashMap;
use std::rc::Rc;

enum JournalEntry {
    Typedef(String),
    Struct(String),
}

#[derive(Default)]
pub struct TypeEnv {
    typedefs: HashMap<String, Type>,
    structs: HashMap<String, Rc<StructLayout>>,
    journal: Vec<JournalEntry>,
    anon_struct_count: u32,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh internal tag for a struct the source gave no tag of its own
    /// (`typedef struct { ... } Name;`), so it can still be registered and
    /// looked up like any other struct rather than living only under its
    /// typedef alias.
    pub fn fresh_anon_tag(&mut self) -> String {
        self.anon_struct_count += 1;
        format!("__anon_struct_{}", self.anon_struct_count)
    }

    pub fn insert_typedef(&mut self, name: String, ty: Type) {
        self.typedefs.insert(name.clone(), ty);
        self.journal.push(JournalEntry::Typedef(name));
    }

    pub fn insert_struct(&mut self, tag: String, layout: Rc<StructLayout>) {
        self.structs.insert(tag.clone(), layout);
        self.journal.push(JournalEntry::Struct(tag));
    }

    pub fn lookup_typedef(&self, name: &str) -> Option<&Type> {
        self.typedefs.get(name)
    }

    pub fn lookup_struct(&self, tag: &str) -> Option<&Rc<StructLayout>> {
        self.structs.get(tag)
    }

    pub fn is_type_name(&self, name: &str) -> bool {
        self.typedefs.contains_key(name)
    }

    /// A save point a speculative parse can later roll back to.
    pub fn checkpoint(&self) -> usize {
        self.journal.len()
    }

    /// Undo every table mutation recorded since `checkpoint`. Exact rollback:
    /// each journal entry names precisely the key that was inserted, so this
    /// never discards an entry that existed before the checkpoint.
    pub fn rollback(&mut self, checkpoint: usize) {
        while self.journal.len() > checkpoint {
            match self.journal.pop().expect("checked non-empty above") {
                JournalEntry::Typedef(name) => {
                    self.typedefs.remove(&name);
                }
                JournalEntry::Struct(tag) => {
                    self.structs.remove(&tag);
                }
            }
        }
    }

    /// Speculative parsing succeeded; nothing to undo, but the checkpoint value
    /// is no longer meaningful so callers should stop holding on to it.
    pub fn commit(&mut self, _checkpoint: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_removes_only_journaled_inserts() {
        let mut env = TypeEnv::new();
        env.insert_typedef("size_t".into(), Type::LONG);
        let cp = env.checkpoint();
        env.insert_typedef("scratch_t".into(), Type::INT);
        assert!(env.is_type_name("scratch_t"));
        env.rollback(cp);
        assert!(!env.is_type_name("scratch_t"));
        assert!(env.is_type_name("size_t"));
    }
}
