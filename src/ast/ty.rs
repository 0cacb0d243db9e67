//! The `Type` graph. One variant per §3 kind; typedefs are resolved away by the
//! parser and never appear here (a `Typedef` is a parser-local name -> `Type` map
//! entry, not a `Type` variant), the same way the grounding repo's `til::Type`
//! resolves `Typedef` indirections into their target before handing a `Type` to
//! callers (`examples/Vector35-idb-rs/src/til.rs`).

use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Int { signed: bool, width: u8 },
    Float { width: u8 },
    Pointer(Box<Type>),
    Array { elem: Box<Type>, len: Option<u64> },
    Struct(Rc<StructLayout>),
    Function(Rc<FunctionType>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructLayout {
    pub tag: Option<String>,
    pub fields: Vec<StructField>,
    pub size: u64,
    pub align: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub ret: Type,
    pub params: Vec<Type>,
    pub variadic: bool,
}

impl Type {
    pub const fn int(width: u8) -> Self {
        Type::Int {
            signed: true,
            width,
        }
    }

    pub const CHAR: Type = Type::Int {
        signed: true,
        width: 1,
    };
    pub const SHORT: Type = Type::Int {
        signed: true,
        width: 2,
    };
    pub const INT: Type = Type::Int {
        signed: true,
        width: 4,
    };
    pub const LONG: Type = Type::Int {
        signed: true,
        width: 8,
    };

    pub fn pointer_to(inner: Type) -> Self {
        Type::Pointer(Box::new(inner))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int { .. })
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float { .. })
    }

    pub fn is_arithmetic(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct(_))
    }

    pub fn is_scalar(&self) -> bool {
        self.is_arithmetic() || self.is_pointer()
    }

    /// Byte size of the type, per §3's width set. Struct size is the layout's
    /// precomputed, alignment-padded size; array size is element size times
    /// length (zero-length/incomplete arrays report 0, matching how the parser
    /// never allows sizeof on an incomplete array to reach codegen).
    pub fn size(&self) -> u64 {
        match self {
            Type::Void => 0,
            Type::Int { width, .. } => *width as u64,
            Type::Float { width } => *width as u64,
            Type::Pointer(_) => 8,
            Type::Array { elem, len } => elem.size() * len.unwrap_or(0),
            Type::Struct(layout) => layout.size,
            Type::Function(_) => 0,
        }
    }

    pub fn align(&self) -> u64 {
        match self {
            Type::Void => 1,
            Type::Int { width, .. } => *width as u64,
            Type::Float { width } => *width as u64,
            Type::Pointer(_) => 8,
            Type::Array { elem, .. } => elem.align(),
            Type::Struct(layout) => layout.align,
            Type::Function(_) => 8,
        }
    }

    /// Decay `T[]`/`T[N]` to `T*`, and leave everything else untouched.  Used
    /// wherever an array value flows into a context that expects a pointer
    /// (function arguments, the right-hand side of a pointer-typed assignment).
    pub fn decay(&self) -> Type {
        match self {
            Type::Array { elem, .. } => Type::Pointer(elem.clone()),
            other => other.clone(),
        }
    }

    /// `>8` byte ("large") aggregate-return threshold check used throughout ABI
    /// classification (§3's struct-return invariant).
    pub fn is_large_aggregate(&self) -> bool {
        self.is_struct() && self.size() > 16
    }
}

impl StructLayout {
    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Computes size/alignment/offsets for a struct's field list the way a System V
/// ABI-conforming compiler must: natural alignment per field, trailing padding so
/// the whole struct's size is a multiple of its alignment. Grounded on the
/// grounding repo's dedicated size-resolution pass
/// (`examples/Vector35-idb-rs/src/til/size_calculator.rs`), generalized here from
/// "solve one type's size from a pre-parsed type graph" to "lay out a struct's
/// fields while parsing it", since this compiler has no separate deferred-size
/// pass — struct layouts are fully known the moment the declaration is parsed.
pub fn layout_struct(tag: Option<String>, members: Vec<(String, Type)>) -> StructLayout {
    let mut fields = Vec::with_capacity(members.len());
    let mut offset: u64 = 0;
    let mut max_align: u64 = 1;
    for (name, ty) in members {
        let align = ty.align().max(1);
        offset = round_up(offset, align);
        max_align = max_align.max(align);
        let field_offset = offset;
        offset += ty.size();
        fields.push(StructField {
            name,
            ty,
            offset: field_offset,
        });
    }
    let size = round_up(offset.max(1), max_align);
    StructLayout {
        tag,
        fields,
        size,
        align: max_align,
    }
}

pub fn round_up(value: u64, align: u64) -> u64 {
    if align == 0 {
        return value;
    }
    (value + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_byte_struct_two_ints() {
        let layout = layout_struct(None, vec![("x".into(), Type::INT), ("y".into(), Type::INT)]);
        assert_eq!(layout.size, 8);
        assert_eq!(layout.fields[1].offset, 4);
    }

    #[test]
    fn nine_byte_struct_pads_to_sixteen() {
        let layout = layout_struct(
            None,
            vec![("id".into(), Type::LONG), ("flag".into(), Type::CHAR)],
        );
        assert_eq!(layout.size, 16);
    }

    #[test]
    fn seventeen_byte_struct() {
        let layout = layout_struct(
            None,
            vec![
                ("a".into(), Type::LONG),
                ("b".into(), Type::LONG),
                ("c".into(), Type::CHAR),
            ],
        );
        assert_eq!(layout.size, 24);
    }

    #[test]
    fn array_decays_to_pointer() {
        let arr = Type::Array {
            elem: Box::new(Type::INT),
            len: Some(5),
        };
        assert_eq!(arr.decay(), Type::Pointer(Box::new(Type::INT)));
    }
}
