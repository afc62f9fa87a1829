//! Semantic types and the structural comparison rules.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Float,
    Array {
        elem: Box<Type>,
        size: u32,
    },
    Structure {
        name: String,
        fields: Vec<Field>,
    },
    Function {
        name: String,
        params: Vec<Field>,
        ret: Box<Type>,
        is_defined: bool,
    },
    /// Result of an expression that already produced a diagnostic.
    /// Comparisons against it are indeterminate, never a second error.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Field {
            name: name.into(),
            ty,
        }
    }
}

/// Outcome of a structural comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRelation {
    Match,
    NotMatch,
    /// At least one side is `Error`; suppresses cascading diagnostics.
    Indeterminate,
}

/// Structural type equality:
/// arrays compare element types only (the size is ignored), structures
/// compare their field lists pairwise in order (field names are ignored),
/// functions compare by name alone.
pub fn compare_types(a: &Type, b: &Type) -> TypeRelation {
    match (a, b) {
        (Type::Error, _) | (_, Type::Error) => TypeRelation::Indeterminate,
        (Type::Int, Type::Int) | (Type::Float, Type::Float) => TypeRelation::Match,
        (Type::Array { elem: ea, .. }, Type::Array { elem: eb, .. }) => compare_types(ea, eb),
        (Type::Structure { fields: fa, .. }, Type::Structure { fields: fb, .. }) => {
            if matched_field_lists(fa, fb) {
                TypeRelation::Match
            } else {
                TypeRelation::NotMatch
            }
        }
        (Type::Function { name: na, .. }, Type::Function { name: nb, .. }) => {
            if na == nb {
                TypeRelation::Match
            } else {
                TypeRelation::NotMatch
            }
        }
        _ => TypeRelation::NotMatch,
    }
}

/// Pairwise structural match of two field lists; both must exhaust
/// together. A per-field indeterminate result is acceptable, only a
/// definite mismatch fails.
pub fn matched_field_lists(a: &[Field], b: &[Field]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(fa, fb)| compare_types(&fa.ty, &fb.ty) != TypeRelation::NotMatch)
}

/// Storage size in bytes: basics are a word, arrays multiply out, a
/// structure is the unpadded sum of its fields.
pub fn size_of(ty: &Type) -> u32 {
    match ty {
        Type::Int | Type::Float => 4,
        Type::Array { elem, size } => size * size_of(elem),
        Type::Structure { fields, .. } => fields.iter().map(|f| size_of(&f.ty)).sum(),
        Type::Function { .. } | Type::Error => 0,
    }
}

/// Renders a field list the way diagnostics quote signatures: `int, float`.
pub fn render_field_list(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.ty.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Array { elem, size } => write!(f, "{}[{}]", elem, size),
            Type::Structure { name, .. } => write!(f, "struct {}", name),
            Type::Function { name, .. } => write!(f, "func {}", name),
            Type::Error => write!(f, "error_type"),
        }
    }
}
