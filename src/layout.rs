//! Structure layout assembler
//!
//! A [`LayoutSession`] collects fields at known offsets and prints a packed
//! structure declaration, filling every unaccounted byte range with a
//! synthetic `uint8_t unk_<N>[..]` array.

use std::io::Write;

use log::{debug, trace};

use crate::dialect;
use crate::error::{ErrorCode, Result, StructpadError, StructpadWarning, WarningCode};
use crate::types::{Dialect, PrimitiveType};

pub const DEFAULT_PACKING_ALIGNMENT: u64 = 4;
pub const DEFAULT_TOTAL_SIZE: u64 = 4;

const PADDING_PREFIX: &str = "unk_";
const REMOVE_PAD_REMINDER: &str = "    /* ^--- remove pad if needed */";

/// Field descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldDescriptor {
    Scalar {
        ty: PrimitiveType,
        name: String,
    },
    Array {
        ty: PrimitiveType,
        name: String,
        count: u64,
    },
}

impl FieldDescriptor {
    pub fn scalar(ty: PrimitiveType, name: impl Into<String>) -> Self {
        FieldDescriptor::Scalar {
            ty,
            name: name.into(),
        }
    }

    pub fn array(ty: PrimitiveType, name: impl Into<String>, count: u64) -> Self {
        FieldDescriptor::Array {
            ty,
            name: name.into(),
            count,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FieldDescriptor::Scalar { name, .. } | FieldDescriptor::Array { name, .. } => name,
        }
    }

    pub fn ty(&self) -> PrimitiveType {
        match self {
            FieldDescriptor::Scalar { ty, .. } | FieldDescriptor::Array { ty, .. } => *ty,
        }
    }

    /// Element count, `None` for scalars
    pub fn count(&self) -> Option<u64> {
        match self {
            FieldDescriptor::Scalar { .. } => None,
            FieldDescriptor::Array { count, .. } => Some(*count),
        }
    }

    /// Size in bytes
    pub fn byte_size(&self) -> Result<u64> {
        let ty = self.ty();
        ty.size()
            .checked_mul(self.count().unwrap_or(1))
            .ok_or_else(|| {
                StructpadError::new(
                    ErrorCode::E03003,
                    format!("Size of field '{}' overflows", self.name()),
                )
                .with_field(self.name())
            })
    }
}

/// Field placed at a byte offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedField {
    pub offset: u64,
    pub field: FieldDescriptor,
}

/// One line of an emitted declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedField {
    pub offset: u64,
    pub name: String,
    pub ty: PrimitiveType,
    pub count: Option<u64>,
    /// Inserted to fill a gap
    pub synthetic: bool,
}

impl EmittedField {
    pub fn byte_size(&self) -> u64 {
        self.ty.size() * self.count.unwrap_or(1)
    }
}

/// Result of a successful layout pass
#[derive(Debug, Clone, Default)]
pub struct LayoutReport {
    pub fields: Vec<EmittedField>,
    pub warnings: Vec<StructpadWarning>,
}

/// Layout state for one structure
#[derive(Debug, Clone)]
pub struct LayoutSession {
    fields: Vec<PlacedField>,
    packing_alignment: u64,
    total_size: u64,
    dialect: Dialect,
}

impl LayoutSession {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            fields: Vec::new(),
            packing_alignment: DEFAULT_PACKING_ALIGNMENT,
            total_size: DEFAULT_TOTAL_SIZE,
            dialect,
        }
    }

    /// Alignment written into the pragma/attribute. Does not affect offsets.
    pub fn set_packing_alignment(&mut self, bytes: u64) {
        self.packing_alignment = bytes;
    }

    /// Declared total size of the structure
    pub fn set_total_size(&mut self, bytes: u64) {
        self.total_size = bytes;
    }

    pub fn add_field(&mut self, offset: u64, field: FieldDescriptor) {
        self.fields.push(PlacedField { offset, field });
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn packing_alignment(&self) -> u64 {
        self.packing_alignment
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Lay out the structure and write its declaration to `out`.
    ///
    /// Output is written line by line. On an overlap, everything emitted
    /// before the offending field stays written and nothing follows it.
    pub fn print_structure<W: Write>(&self, name: &str, out: &mut W) -> Result<LayoutReport> {
        let mut sorted: Vec<&PlacedField> = self.fields.iter().collect();
        sorted.sort_by_key(|placed| placed.offset);

        debug!(
            "laying out '{}': {} fields, size {:#x}, pack {}, {}",
            name,
            sorted.len(),
            self.total_size,
            self.packing_alignment,
            self.dialect
        );

        dialect::write_open(out, self.dialect, name, self.packing_alignment)?;

        let mut printer = Printer {
            out,
            current_offset: 0,
            num_unknowns: 0,
            report: LayoutReport::default(),
        };

        for (index, placed) in sorted.iter().enumerate() {
            if index == 0 && placed.offset > printer.current_offset {
                printer.pad_to(placed.offset)?;
            }

            printer.field(&placed.field)?;

            if let Some(next) = sorted.get(index + 1) {
                if next.offset >= printer.current_offset {
                    printer.pad_to(next.offset)?;
                } else {
                    debug!("'{}' overlaps '{}'", next.field.name(), placed.field.name());
                    return Err(StructpadError::overlap(
                        next.field.name(),
                        next.offset,
                        placed.field.name(),
                        printer.current_offset,
                    ));
                }
            }
        }

        if printer.current_offset < self.total_size {
            let start = printer.current_offset;
            printer.pad_to(self.total_size)?;
            writeln!(printer.out, "{}", REMOVE_PAD_REMINDER)?;
            printer.report.warnings.push(StructpadWarning {
                code: WarningCode::W03001,
                message: format!(
                    "Trailing padding of {:#x} bytes added to '{}' at {:#x}",
                    self.total_size - start,
                    name,
                    start
                ),
                location: None,
            });
        }

        dialect::write_close(printer.out, self.dialect)?;

        if printer.current_offset != self.total_size {
            return Err(StructpadError::size_mismatch(
                self.total_size,
                printer.current_offset,
            ));
        }

        Ok(printer.report)
    }

    /// Lay out the structure and return the declaration as a string
    pub fn render(&self, name: &str) -> Result<String> {
        let mut out = Vec::new();
        self.print_structure(name, &mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

/// Running state of one layout pass
struct Printer<'a, W: Write> {
    out: &'a mut W,
    current_offset: u64,
    num_unknowns: u32,
    report: LayoutReport,
}

impl<W: Write> Printer<'_, W> {
    fn field(&mut self, field: &FieldDescriptor) -> Result<()> {
        let size = field.byte_size()?;
        self.emit(EmittedField {
            offset: self.current_offset,
            name: field.name().to_string(),
            ty: field.ty(),
            count: field.count(),
            synthetic: false,
        })?;
        self.advance(size)
    }

    /// Fill `[current_offset, target)` with one padding array
    fn pad_to(&mut self, target: u64) -> Result<()> {
        let gap = target - self.current_offset;
        if gap == 0 {
            return Ok(());
        }

        let name = format!("{}{}", PADDING_PREFIX, self.num_unknowns);
        self.num_unknowns += 1;
        debug!("padding {} covers {:#x}..{:#x}", name, self.current_offset, target);

        self.emit(EmittedField {
            offset: self.current_offset,
            name,
            ty: PrimitiveType::U8,
            count: Some(gap),
            synthetic: true,
        })?;
        self.current_offset = target;
        Ok(())
    }

    fn advance(&mut self, size: u64) -> Result<()> {
        self.current_offset = self.current_offset.checked_add(size).ok_or_else(|| {
            StructpadError::new(
                ErrorCode::E03003,
                format!("Offset overflows after {:#x}", self.current_offset),
            )
        })?;
        Ok(())
    }

    fn emit(&mut self, field: EmittedField) -> Result<()> {
        let line = match field.count {
            Some(count) => format!(
                "    {} {}[{:#x}]; // {:#x}",
                field.ty, field.name, count, field.offset
            ),
            None => format!("    {} {}; // {:#x}", field.ty, field.name, field.offset),
        };
        trace!("{}", line.trim_start());
        writeln!(self.out, "{}", line)?;
        self.report.fields.push(field);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_gello(dialect: Dialect) -> LayoutSession {
        let mut session = LayoutSession::new(dialect);
        session.set_packing_alignment(4);
        session.set_total_size(0x400);
        session.add_field(0, FieldDescriptor::scalar(PrimitiveType::U8, "hello"));
        session.add_field(0x10, FieldDescriptor::array(PrimitiveType::U32, "gello", 20));
        session
    }

    #[test]
    fn test_msvc_scenario() {
        let output = hello_gello(Dialect::Msvc).render("test").unwrap();
        assert_eq!(
            output,
            "#pragma pack(push, 4)\n\
             \n\
             struct test {\n\
             \x20   uint8_t hello; // 0x0\n\
             \x20   uint8_t unk_0[0xf]; // 0x1\n\
             \x20   uint32_t gello[0x14]; // 0x10\n\
             \x20   uint8_t unk_1[0x3a0]; // 0x60\n\
             \x20   /* ^--- remove pad if needed */\n\
             };\n\
             #pragma pack(pop)\n"
        );
    }

    #[test]
    fn test_gcc_scenario() {
        let output = hello_gello(Dialect::Gcc).render("test").unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "struct __attribute__((packed, aligned(4))) test {");
        assert_eq!(lines.last(), Some(&"};"));
        assert!(!output.contains("pragma"));
    }

    #[test]
    fn test_gap_filling_report() {
        let mut out = Vec::new();
        let report = hello_gello(Dialect::Msvc)
            .print_structure("test", &mut out)
            .unwrap();

        let padding: Vec<(u64, u64)> = report
            .fields
            .iter()
            .filter(|f| f.synthetic)
            .map(|f| (f.offset, f.offset + f.byte_size()))
            .collect();
        assert_eq!(padding, vec![(0x1, 0x10), (0x60, 0x400)]);

        let total: u64 = report.fields.iter().map(EmittedField::byte_size).sum();
        assert_eq!(total, 0x400);

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].code, WarningCode::W03001);
    }

    #[test]
    fn test_leading_gap() {
        let mut session = LayoutSession::new(Dialect::Gcc);
        session.set_total_size(0x10);
        session.add_field(0x8, FieldDescriptor::scalar(PrimitiveType::U64, "tail"));

        let output = session.render("s").unwrap();
        assert!(output.contains("    uint8_t unk_0[0x8]; // 0x0\n"));
        assert!(output.contains("    uint64_t tail; // 0x8\n"));
        assert!(!output.contains("remove pad"));
    }

    #[test]
    fn test_no_leading_gap_at_zero() {
        let mut session = LayoutSession::new(Dialect::Gcc);
        session.set_total_size(4);
        session.add_field(0, FieldDescriptor::scalar(PrimitiveType::U32, "a"));

        let mut out = Vec::new();
        let report = session.print_structure("s", &mut out).unwrap();
        assert_eq!(report.fields.len(), 1);
        assert!(!report.fields[0].synthetic);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_sorting_ignores_insertion_order() {
        let mut session = LayoutSession::new(Dialect::Msvc);
        session.set_total_size(0x10);
        session.add_field(0xc, FieldDescriptor::scalar(PrimitiveType::U32, "d"));
        session.add_field(0x0, FieldDescriptor::scalar(PrimitiveType::U32, "a"));
        session.add_field(0x8, FieldDescriptor::scalar(PrimitiveType::U16, "c"));
        session.add_field(0x4, FieldDescriptor::scalar(PrimitiveType::U16, "b"));

        let mut out = Vec::new();
        let report = session.print_structure("s", &mut out).unwrap();
        let names: Vec<&str> = report.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "unk_0", "c", "unk_1", "d"]);
    }

    #[test]
    fn test_idempotent_print() {
        let session = hello_gello(Dialect::Msvc);
        let first = session.render("test").unwrap();
        let second = session.render("test").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_overlap_stops_output() {
        let mut session = LayoutSession::new(Dialect::Msvc);
        session.set_total_size(0x20);
        session.add_field(0x0, FieldDescriptor::scalar(PrimitiveType::U32, "first"));
        session.add_field(0x2, FieldDescriptor::scalar(PrimitiveType::U16, "second"));
        session.add_field(0x8, FieldDescriptor::scalar(PrimitiveType::U16, "third"));

        let mut out = Vec::new();
        let err = session.print_structure("s", &mut out).unwrap_err();
        assert_eq!(err.code, ErrorCode::E03001);
        assert_eq!(err.field.as_deref(), Some("second"));

        let output = String::from_utf8(out).unwrap();
        assert!(output.ends_with("    uint32_t first; // 0x0\n"));
        assert!(!output.contains("second;"));
        assert!(!output.contains("third"));
        assert!(!output.contains("};"));
    }

    #[test]
    fn test_field_past_declared_size() {
        let mut session = LayoutSession::new(Dialect::Msvc);
        session.set_total_size(4);
        session.add_field(0, FieldDescriptor::scalar(PrimitiveType::U64, "wide"));

        let mut out = Vec::new();
        let err = session.print_structure("s", &mut out).unwrap_err();
        assert_eq!(err.code, ErrorCode::E03002);

        // closing is still written before the check fails
        let output = String::from_utf8(out).unwrap();
        assert!(output.ends_with("};\n#pragma pack(pop)\n"));
    }

    #[test]
    fn test_empty_session_is_all_padding() {
        let session = LayoutSession::new(Dialect::Gcc);
        let output = session.render("empty").unwrap();
        assert_eq!(
            output,
            "struct __attribute__((packed, aligned(4))) empty {\n\
             \x20   uint8_t unk_0[0x4]; // 0x0\n\
             \x20   /* ^--- remove pad if needed */\n\
             };\n"
        );
    }

    #[test]
    fn test_array_size_overflow() {
        let mut session = LayoutSession::new(Dialect::Gcc);
        session.add_field(0, FieldDescriptor::array(PrimitiveType::U64, "huge", u64::MAX));

        let err = session.render("s").unwrap_err();
        assert_eq!(err.code, ErrorCode::E03003);
        assert_eq!(err.field.as_deref(), Some("huge"));
    }

    #[test]
    fn test_packing_alignment_only_affects_header() {
        let mut a = hello_gello(Dialect::Msvc);
        a.set_packing_alignment(1);
        let b = hello_gello(Dialect::Msvc);

        let a = a.render("test").unwrap();
        let b = b.render("test").unwrap();
        assert!(a.starts_with("#pragma pack(push, 1)\n"));
        assert_eq!(a.lines().skip(1).collect::<Vec<_>>(), b.lines().skip(1).collect::<Vec<_>>());
    }
}
