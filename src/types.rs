//! Structpad type definitions

use std::fmt;

/// Fixed-width unsigned integer type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    U8,
    U16,
    U32,
    U64,
}

impl PrimitiveType {
    /// Return type size (in bytes)
    pub fn size(&self) -> u64 {
        match self {
            PrimitiveType::U8 => 1,
            PrimitiveType::U16 => 2,
            PrimitiveType::U32 => 4,
            PrimitiveType::U64 => 8,
        }
    }

    /// Name used in emitted declarations
    pub fn c_name(&self) -> &'static str {
        match self {
            PrimitiveType::U8 => "uint8_t",
            PrimitiveType::U16 => "uint16_t",
            PrimitiveType::U32 => "uint32_t",
            PrimitiveType::U64 => "uint64_t",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "uint8_t" | "u8" => Some(PrimitiveType::U8),
            "uint16_t" | "u16" => Some(PrimitiveType::U16),
            "uint32_t" | "u32" => Some(PrimitiveType::U32),
            "uint64_t" | "u64" => Some(PrimitiveType::U64),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

/// Target compiler packing syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Msvc,
    Gcc,
}

impl Dialect {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "msvc" => Some(Dialect::Msvc),
            "gcc" => Some(Dialect::Gcc),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Msvc => "msvc",
            Dialect::Gcc => "gcc",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
