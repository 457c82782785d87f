//! Layout description parser

use std::collections::HashSet;

use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::error::{ErrorCode, Result, SourceLocation, StructpadError};
use crate::types::{Dialect, PrimitiveType};

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct LayoutParser;

/// Parse layout description text
pub fn parse(input: &str) -> Result<File> {
    let pairs = LayoutParser::parse(Rule::file, input).map_err(|e| {
        let (line, column) = match e.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        };
        StructpadError::new(ErrorCode::E01003, format!("Parse error: {}", e)).with_location(
            SourceLocation {
                line,
                column,
                context: e.line().to_string(),
            },
        )
    })?;

    let mut file = File::default();

    for pair in pairs {
        if pair.as_rule() != Rule::file {
            continue;
        }
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::directive => parse_directive(inner, &mut file.directives)?,
                Rule::struct_def => file.structs.push(parse_struct_def(inner)?),
                _ => {}
            }
        }
    }

    Ok(file)
}

fn location(pair: &Pair<Rule>) -> SourceLocation {
    let (line, column) = pair.line_col();
    SourceLocation {
        line,
        column,
        context: pair.as_str().to_string(),
    }
}

fn parse_directive(pair: Pair<Rule>, directives: &mut Directives) -> Result<()> {
    let loc = location(&pair);
    let mut inner = pair.into_inner();
    let (name, value) = match (inner.next(), inner.next()) {
        (Some(name), Some(value)) => (name.as_str(), value),
        _ => {
            return Err(
                StructpadError::new(ErrorCode::E01003, "Malformed directive").with_location(loc),
            )
        }
    };

    match name {
        "dialect" => {
            let text = value.as_str();
            let dialect = Dialect::from_str(text).ok_or_else(|| {
                StructpadError::new(ErrorCode::E02003, format!("Unknown dialect: {}", text))
                    .with_location(loc.clone())
                    .with_hint("Supported dialects are msvc and gcc")
            })?;
            directives.dialect = Some(dialect);
        }
        "pack" => directives.pack = Some(parse_directive_number(value, &loc)?),
        "size" => directives.size = Some(parse_directive_number(value, &loc)?),
        other => {
            return Err(StructpadError::new(
                ErrorCode::E01003,
                format!("Unknown directive: @{}", other),
            )
            .with_location(loc)
            .with_hint("Supported directives are @dialect, @pack and @size"))
        }
    }
    Ok(())
}

/// `directive_value` holding a number
fn parse_directive_number(value: Pair<Rule>, loc: &SourceLocation) -> Result<u64> {
    match value.into_inner().next() {
        Some(inner) if inner.as_rule() == Rule::number => parse_number(inner),
        _ => Err(
            StructpadError::new(ErrorCode::E01004, "Directive expects a number")
                .with_location(loc.clone()),
        ),
    }
}

fn parse_struct_def(pair: Pair<Rule>) -> Result<StructDef> {
    let mut def = StructDef {
        name: None,
        size: None,
        pack: None,
        fields: Vec::new(),
    };
    let mut seen = HashSet::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => {
                def.name = Some(inner.as_str().to_string());
            }
            Rule::struct_attr => parse_struct_attr(inner, &mut def)?,
            Rule::field_def => {
                let field = parse_field_def(inner)?;
                if !seen.insert(field.name.clone()) {
                    return Err(StructpadError::new(
                        ErrorCode::E02002,
                        format!("Duplicate field: {}", field.name),
                    )
                    .with_location(field.location.clone())
                    .with_field(field.name));
                }
                def.fields.push(field);
            }
            _ => {}
        }
    }

    Ok(def)
}

fn parse_struct_attr(pair: Pair<Rule>, def: &mut StructDef) -> Result<()> {
    let loc = location(&pair);
    let mut name = "";
    let mut value = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str(),
            Rule::number => value = Some(parse_number(inner)?),
            _ => {}
        }
    }

    let value = value.ok_or_else(|| {
        StructpadError::new(ErrorCode::E01003, "Missing attribute value").with_location(loc.clone())
    })?;

    match name {
        "size" => def.size = Some(value),
        "pack" => def.pack = Some(value),
        other => {
            return Err(StructpadError::new(
                ErrorCode::E01003,
                format!("Unknown struct attribute: @{}", other),
            )
            .with_location(loc)
            .with_hint("Supported attributes are @size(n) and @pack(n)"))
        }
    }
    Ok(())
}

fn parse_field_def(pair: Pair<Rule>) -> Result<FieldDef> {
    let loc = location(&pair);
    let mut name = None;
    let mut ty = None;
    let mut offset = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = Some(inner.as_str().to_string()),
            Rule::type_spec => ty = Some(parse_type_spec(inner)?),
            Rule::number => offset = Some(parse_number(inner)?),
            _ => {}
        }
    }

    Ok(FieldDef {
        name: name.ok_or_else(|| {
            StructpadError::new(ErrorCode::E01003, "Missing field name").with_location(loc.clone())
        })?,
        ty: ty.ok_or_else(|| {
            StructpadError::new(ErrorCode::E01003, "Missing type").with_location(loc.clone())
        })?,
        offset: offset.ok_or_else(|| {
            StructpadError::new(ErrorCode::E01003, "Missing offset").with_location(loc.clone())
        })?,
        location: loc,
    })
}

fn parse_type_spec(pair: Pair<Rule>) -> Result<Type> {
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::scalar_type => return Ok(Type::Scalar(parse_scalar_type(inner)?)),
            Rule::array_type => return parse_array_type(inner),
            _ => {}
        }
    }
    Err(StructpadError::new(ErrorCode::E01003, "Invalid type"))
}

fn parse_scalar_type(pair: Pair<Rule>) -> Result<PrimitiveType> {
    PrimitiveType::from_str(pair.as_str()).ok_or_else(|| {
        StructpadError::new(ErrorCode::E02001, format!("Unknown type: {}", pair.as_str()))
            .with_location(location(&pair))
            .with_hint("Supported types are uint8_t, uint16_t, uint32_t and uint64_t")
    })
}

fn parse_array_type(pair: Pair<Rule>) -> Result<Type> {
    let loc = location(&pair);
    let mut elem = None;
    let mut len = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::scalar_type => elem = Some(parse_scalar_type(inner)?),
            Rule::number => len = Some(parse_number(inner)?),
            _ => {}
        }
    }

    let elem = elem.ok_or_else(|| {
        StructpadError::new(ErrorCode::E01003, "Missing array element type")
            .with_location(loc.clone())
    })?;
    let len = match len {
        Some(0) => {
            return Err(
                StructpadError::new(ErrorCode::E03004, "Array size must be greater than zero")
                    .with_location(loc),
            )
        }
        Some(len) => len,
        None => {
            return Err(
                StructpadError::new(ErrorCode::E01003, "Missing array length").with_location(loc),
            )
        }
    };

    Ok(Type::Array { elem, len })
}

fn parse_number(pair: Pair<Rule>) -> Result<u64> {
    let loc = location(&pair);
    let inner = pair.into_inner().next().ok_or_else(|| {
        StructpadError::new(ErrorCode::E01004, "Empty number").with_location(loc.clone())
    })?;
    let s = inner.as_str();

    let parsed = match inner.as_rule() {
        Rule::hex_number => u64::from_str_radix(&s[2..], 16),
        Rule::bin_number => u64::from_str_radix(&s[2..], 2),
        _ => s.parse::<u64>(),
    };

    parsed.map_err(|_| {
        StructpadError::new(ErrorCode::E01004, format!("Invalid number: {}", s)).with_location(loc)
    })
}
