use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser as ClapParser};
use log::{info, warn, LevelFilter};
use simple_logger::SimpleLogger;

use structpad::{generate_to, Dialect, ErrorCode, Options, Result, StructpadError};

fn parse_dialect(s: &str) -> std::result::Result<Dialect, String> {
    Dialect::from_str(s).ok_or_else(|| format!("Invalid dialect '{}', expected msvc or gcc", s))
}

fn parse_size(s: &str) -> std::result::Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| format!("Invalid number '{}'", s))
}

/// Emit packed struct declarations with inferred padding
#[derive(ClapParser, Debug)]
#[command(version, about)]
struct Args {
    /// Layout description file, `-` for standard input
    input: PathBuf,

    /// Target compiler dialect, overrides `@dialect`
    #[arg(short, long, value_parser = parse_dialect)]
    dialect: Option<Dialect>,

    /// Packing alignment for structs without `@pack`
    #[arg(short, long, value_parser = parse_size)]
    pack: Option<u64>,

    /// Total size for structs without `@size`
    #[arg(short, long, value_parser = parse_size)]
    size: Option<u64>,

    /// Exit with status 0 after reporting an overlapping field
    #[arg(long, default_value_t = false)]
    exit_zero_on_overlap: bool,

    /// Increase log verbosity
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).map_err(|e| {
            StructpadError::new(ErrorCode::E05002, format!("Failed to read stdin: {}", e))
        })?;
        return Ok(text);
    }

    fs::read_to_string(path).map_err(|e| {
        let code = if e.kind() == io::ErrorKind::NotFound {
            ErrorCode::E05001
        } else {
            ErrorCode::E05002
        };
        StructpadError::new(code, format!("Failed to read {}: {}", path.display(), e))
    })
}

fn run(args: &Args) -> Result<()> {
    let description = read_input(&args.input)?;
    let options = Options {
        dialect: args.dialect,
        default_pack: args.pack,
        default_size: args.size,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = generate_to(&description, &options, &mut out);
    out.flush()?;

    for w in result? {
        warn!("[{:?}] {}", w.code, w.message);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    info!("reading layout from {}", args.input.display());

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(loc) = &e.location {
                eprintln!("  at line {}, column {}: {}", loc.line, loc.column, loc.context);
            }
            if let Some(hint) = &e.hint {
                eprintln!("Hint: {}", hint);
            }

            exit_code(&e, args.exit_zero_on_overlap)
        }
    }
}

/// Exit status for a failed run
fn exit_code(err: &StructpadError, exit_zero_on_overlap: bool) -> ExitCode {
    if err.is_overlap() && exit_zero_on_overlap {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_exit_code() {
        let err = StructpadError::overlap("flags", 0x2, "counter", 0x4);
        assert_eq!(exit_code(&err, false), ExitCode::FAILURE);
        assert_eq!(exit_code(&err, true), ExitCode::SUCCESS);
    }

    #[test]
    fn test_other_errors_always_fail() {
        let err = StructpadError::size_mismatch(0x4, 0x8);
        assert_eq!(exit_code(&err, false), ExitCode::FAILURE);
        assert_eq!(exit_code(&err, true), ExitCode::FAILURE);

        let err = StructpadError::new(ErrorCode::E02001, "Unknown type: float");
        assert_eq!(exit_code(&err, true), ExitCode::FAILURE);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("0x400"), Ok(0x400));
        assert_eq!(parse_size("16"), Ok(16));
        assert!(parse_size("0xzz").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "structpad",
            "-d",
            "gcc",
            "--size",
            "0x40",
            "--exit-zero-on-overlap",
            "-vv",
            "in.lay",
        ])
        .unwrap();
        assert_eq!(args.dialect, Some(Dialect::Gcc));
        assert_eq!(args.size, Some(0x40));
        assert!(args.exit_zero_on_overlap);
        assert_eq!(args.verbose, 2);

        assert!(Args::try_parse_from(["structpad", "-d", "clang", "in.lay"]).is_err());
    }
}
