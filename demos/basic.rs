//! Basic usage example

use structpad::{Dialect, FieldDescriptor, LayoutSession, PrimitiveType};

fn main() {
    // Fields recovered so far from a 0x400 byte object
    let mut session = LayoutSession::new(Dialect::Msvc);
    session.set_packing_alignment(4);
    session.set_total_size(0x400);
    session.add_field(0x10, FieldDescriptor::array(PrimitiveType::U32, "gello", 20));
    session.add_field(0x0, FieldDescriptor::scalar(PrimitiveType::U8, "hello"));
    session.add_field(0x68, FieldDescriptor::scalar(PrimitiveType::U64, "timestamp"));

    let stdout = std::io::stdout();
    match session.print_structure("test", &mut stdout.lock()) {
        Ok(report) => {
            if !report.warnings.is_empty() {
                println!("\nWarnings:");
                for w in &report.warnings {
                    println!("  [{:?}] {}", w.code, w.message);
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(hint) = &e.hint {
                eprintln!("Hint: {}", hint);
            }
        }
    }
}
