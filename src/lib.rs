//! # Structpad
//!
//! Packed struct declaration generator with inferred padding.
//!
//! Given the fields of a binary structure that are known at known offsets,
//! structpad emits a packed C/C++ declaration for MSVC or GCC in which every
//! unknown byte range is covered by a `uint8_t unk_<N>[..]` filler array.
//!
//! ## Example
//!
//! ```rust
//! use structpad::{generate, Options};
//!
//! let description = r#"
//!     @dialect = msvc;
//!     struct test @size(0x400) @pack(4) {
//!         hello: uint8_t @ 0x0;
//!         gello: [uint32_t; 20] @ 0x10;
//!     }
//! "#;
//!
//! let result = generate(description, &Options::default()).unwrap();
//! assert!(result.text.contains("    uint8_t unk_0[0xf]; // 0x1\n"));
//! assert!(result.text.contains("    uint32_t gello[0x14]; // 0x10\n"));
//! ```

pub mod ast;
pub mod dialect;
pub mod error;
pub mod layout;
pub mod parser;
pub mod types;

pub use error::{
    ErrorCode, Result, SourceLocation, StructpadError, StructpadWarning, WarningCode,
};
pub use layout::{EmittedField, FieldDescriptor, LayoutReport, LayoutSession, PlacedField};
pub use types::{Dialect, PrimitiveType};

use std::io::Write;

/// Name used for `struct { .. }` without a name
pub const ANONYMOUS_STRUCT_NAME: &str = "anonymous";

/// Settings applied when a description leaves them open
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Overrides the `@dialect` directive when set
    pub dialect: Option<Dialect>,
    /// Packing alignment for structs without `@pack`
    pub default_pack: Option<u64>,
    /// Total size for structs without `@size`
    pub default_size: Option<u64>,
}

/// Generation result
#[derive(Debug)]
pub struct GenerateResult {
    /// Generated declarations
    pub text: String,
    /// Warning list
    pub warnings: Vec<StructpadWarning>,
}

/// Build the layout session for one parsed struct
pub fn build_session(
    def: &ast::StructDef,
    directives: &ast::Directives,
    options: &Options,
) -> LayoutSession {
    let dialect = options
        .dialect
        .or(directives.dialect)
        .unwrap_or_default();

    let mut session = LayoutSession::new(dialect);
    if let Some(pack) = def.pack.or(directives.pack).or(options.default_pack) {
        session.set_packing_alignment(pack);
    }
    if let Some(size) = def.size.or(directives.size).or(options.default_size) {
        session.set_total_size(size);
    }

    for field in &def.fields {
        let descriptor = match field.ty {
            ast::Type::Scalar(ty) => FieldDescriptor::scalar(ty, field.name.clone()),
            ast::Type::Array { elem, len } => FieldDescriptor::array(elem, field.name.clone(), len),
        };
        session.add_field(field.offset, descriptor);
    }

    session
}

/// Generate declarations and write them to `out` as they are produced
///
/// # Parameters
///
/// * `description` - Layout description text
/// * `options` - Fallback settings
/// * `out` - Output sink
///
/// # Returns
///
/// Warning list. On error, the declarations emitted so far remain in `out`.
pub fn generate_to<W: Write>(
    description: &str,
    options: &Options,
    out: &mut W,
) -> Result<Vec<StructpadWarning>> {
    // Parse description
    let file = parser::parse(description)?;

    let mut warnings = Vec::new();
    for (index, def) in file.structs.iter().enumerate() {
        if index > 0 {
            writeln!(out)?;
        }
        let name = def.name.as_deref().unwrap_or(ANONYMOUS_STRUCT_NAME);
        let session = build_session(def, &file.directives, options);
        let report = session.print_structure(name, out)?;
        warnings.extend(report.warnings);
    }

    Ok(warnings)
}

/// Generate declarations as a string
///
/// # Example
///
/// ```rust
/// use structpad::{generate, Dialect, Options};
///
/// let options = Options {
///     dialect: Some(Dialect::Gcc),
///     ..Options::default()
/// };
/// let result = generate("struct pair { a: u16 @ 0; b: u16 @ 2; }", &options).unwrap();
/// assert_eq!(
///     result.text,
///     "struct __attribute__((packed, aligned(4))) pair {\n    uint16_t a; // 0x0\n    uint16_t b; // 0x2\n};\n"
/// );
/// ```
pub fn generate(description: &str, options: &Options) -> Result<GenerateResult> {
    let mut out = Vec::new();
    let warnings = generate_to(description, options, &mut out)?;

    Ok(GenerateResult {
        text: String::from_utf8_lossy(&out).into_owned(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_GELLO: &str = r#"
        @dialect = msvc;
        struct test @size(0x400) @pack(4) {
            gello: [uint32_t; 20] @ 0x10;
            hello: uint8_t @ 0x0;
        }
    "#;

    #[test]
    fn test_generate_matches_session_api() {
        let result = generate(HELLO_GELLO, &Options::default()).unwrap();

        let mut session = LayoutSession::new(Dialect::Msvc);
        session.set_packing_alignment(4);
        session.set_total_size(0x400);
        session.add_field(0, FieldDescriptor::scalar(PrimitiveType::U8, "hello"));
        session.add_field(0x10, FieldDescriptor::array(PrimitiveType::U32, "gello", 20));

        assert_eq!(result.text, session.render("test").unwrap());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_dialect_override() {
        let options = Options {
            dialect: Some(Dialect::Gcc),
            ..Options::default()
        };
        let result = generate(HELLO_GELLO, &options).unwrap();
        assert!(result
            .text
            .starts_with("struct __attribute__((packed, aligned(4))) test {\n"));
    }

    #[test]
    fn test_setting_precedence() {
        let dsl = r#"
            @size = 0x20;
            struct a @size(0x10) { x: u32 @ 0; }
            struct b { x: u32 @ 0; }
        "#;
        let options = Options {
            default_pack: Some(2),
            default_size: Some(0x40),
            ..Options::default()
        };

        let file = parser::parse(dsl).unwrap();
        let a = build_session(&file.structs[0], &file.directives, &options);
        let b = build_session(&file.structs[1], &file.directives, &options);
        assert_eq!(a.total_size(), 0x10);
        assert_eq!(b.total_size(), 0x20);
        assert_eq!(a.packing_alignment(), 2);
        assert_eq!(a.dialect(), Dialect::Msvc);

        let file = parser::parse("struct c { x: u32 @ 0; }").unwrap();
        let c = build_session(&file.structs[0], &file.directives, &Options::default());
        assert_eq!(c.total_size(), layout::DEFAULT_TOTAL_SIZE);
        assert_eq!(c.packing_alignment(), layout::DEFAULT_PACKING_ALIGNMENT);
    }

    #[test]
    fn test_multiple_structs() {
        let dsl = r#"
            @dialect = gcc;
            struct { x: u32 @ 0; }
            struct named { y: u32 @ 0; }
        "#;
        let result = generate(dsl, &Options::default()).unwrap();
        assert_eq!(
            result.text,
            "struct __attribute__((packed, aligned(4))) anonymous {\n    uint32_t x; // 0x0\n};\n\
             \n\
             struct __attribute__((packed, aligned(4))) named {\n    uint32_t y; // 0x0\n};\n"
        );
    }

    #[test]
    fn test_overlap_keeps_partial_output() {
        let dsl = r#"
            @dialect = gcc;
            struct ok { x: u32 @ 0; }
            struct bad @size(8) {
                wide: u64 @ 0;
                inner: u16 @ 4;
            }
        "#;

        let mut out = Vec::new();
        let err = generate_to(dsl, &Options::default(), &mut out).unwrap_err();
        assert!(err.is_overlap());
        assert_eq!(err.field.as_deref(), Some("inner"));

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("struct __attribute__((packed, aligned(4))) ok {"));
        assert!(text.ends_with("    uint64_t wide; // 0x0\n"));
    }
}
