//! Structpad error type definitions

use thiserror::Error;

/// Error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Parse errors (01)
    E01003, // InvalidSyntax
    E01004, // InvalidNumber

    // Semantic errors (02)
    E02001, // UnknownType
    E02002, // DuplicateField
    E02003, // UnknownDialect

    // Layout errors (03)
    E03001, // Overlap
    E03002, // SizeMismatch
    E03003, // IntegerOverflow
    E03004, // InvalidArraySize

    // IO errors (05)
    E05001, // FileNotFound
    E05002, // FileReadError
    E05003, // FileWriteError
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Source code location
#[derive(Debug, Clone, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub context: String,
}

/// Structpad error
#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct StructpadError {
    pub code: ErrorCode,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub hint: Option<String>,
    /// Field the error is about, if any
    pub field: Option<String>,
}

impl StructpadError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
            hint: None,
            field: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// A field starts before the previous field ends
    pub fn overlap(field: &str, offset: u64, previous: &str, previous_end: u64) -> Self {
        Self::new(
            ErrorCode::E03001,
            format!(
                "Invalid structure field '{}': offset {:#x} overlaps '{}' which ends at {:#x}",
                field, offset, previous, previous_end
            ),
        )
        .with_field(field)
    }

    /// Running offset disagrees with the declared size after layout
    pub fn size_mismatch(expected: u64, actual: u64) -> Self {
        Self::new(
            ErrorCode::E03002,
            format!(
                "Laid out size {:#x} does not match declared size {:#x}",
                actual, expected
            ),
        )
        .with_hint("Check that the last field ends within the declared @size")
    }

    pub fn is_overlap(&self) -> bool {
        self.code == ErrorCode::E03001
    }
}

impl From<std::io::Error> for StructpadError {
    fn from(e: std::io::Error) -> Self {
        StructpadError::new(ErrorCode::E05003, format!("Write error: {}", e))
    }
}

/// Structpad warning
#[derive(Debug, Clone)]
pub struct StructpadWarning {
    pub code: WarningCode,
    pub message: String,
    pub location: Option<SourceLocation>,
}

/// Warning codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    W03001, // TrailingPadding
}

pub type Result<T> = std::result::Result<T, StructpadError>;
