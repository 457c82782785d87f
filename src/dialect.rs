//! Opening and closing templates for each dialect

use std::io::Write;

use crate::types::Dialect;

/// Write the lines that open a structure declaration
pub fn write_open<W: Write>(
    out: &mut W,
    dialect: Dialect,
    name: &str,
    packing_alignment: u64,
) -> std::io::Result<()> {
    match dialect {
        Dialect::Msvc => {
            writeln!(out, "#pragma pack(push, {})", packing_alignment)?;
            writeln!(out)?;
            writeln!(out, "struct {} {{", name)
        }
        // Closes every parenthesis, unlike the legacy `aligned(N))` output
        Dialect::Gcc => writeln!(
            out,
            "struct __attribute__((packed, aligned({}))) {} {{",
            packing_alignment, name
        ),
    }
}

/// Write the lines that close a structure declaration
pub fn write_close<W: Write>(out: &mut W, dialect: Dialect) -> std::io::Result<()> {
    writeln!(out, "}};")?;
    if dialect == Dialect::Msvc {
        writeln!(out, "#pragma pack(pop)")?;
    }
    Ok(())
}
