//! Layout description AST definitions

use crate::error::SourceLocation;
use crate::types::{Dialect, PrimitiveType};

/// File (top-level)
#[derive(Debug, Clone, Default)]
pub struct File {
    pub directives: Directives,
    pub structs: Vec<StructDef>,
}

/// File-level defaults set by `@name = value;`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    pub dialect: Option<Dialect>,
    pub pack: Option<u64>,
    pub size: Option<u64>,
}

/// Struct definition
#[derive(Debug, Clone)]
pub struct StructDef {
    /// `None` for `struct { .. }`
    pub name: Option<String>,
    pub size: Option<u64>,
    pub pack: Option<u64>,
    pub fields: Vec<FieldDef>,
}

/// Field definition
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    pub offset: u64,
    pub location: SourceLocation,
}

/// Type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Scalar(PrimitiveType),
    Array { elem: PrimitiveType, len: u64 },
}
