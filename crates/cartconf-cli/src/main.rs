//! The cartconf CLI: expands a configuration file (or inline source
//! text) into a stream of JSON parameter dictionaries, one per line.
//!
//! - `cartconf <path> [key=value | only X | no X ...]`
//! - `-c`/`--contents` treats the positional argument as source text
//!   rather than a path.
//! - `-v`/`--verbose` prints each variant's name to stderr as it's
//!   emitted.
//!
//! Exit codes: `0` success, `2` parse/expand error, `3` I/O error on
//! includes.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use cartconf_common::LineIndex;
use cartconf_expander::{CartconfError, IncludeError, NullLoader};
use cartconf_parser::FilterKind;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "cartconf", version, about = "Expand a cartconf configuration into parameter dictionaries")]
struct Cli {
    /// Path to the configuration file, or the source text itself when `-c` is set.
    config: String,

    /// Extra `key=value` assignments, or `only`/`no` followed by a filter expression.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    extra: Vec<String>,

    /// Treat `config` as the source text itself rather than a path.
    #[arg(short = 'c', long = "contents")]
    contents: bool,

    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn split_extras(extra: &[String]) -> Result<(Vec<String>, Vec<(FilterKind, String)>), String> {
    let mut assignments = Vec::new();
    let mut filters = Vec::new();
    let mut i = 0;
    while i < extra.len() {
        match extra[i].as_str() {
            "only" => {
                let expr = extra
                    .get(i + 1)
                    .ok_or_else(|| "'only' requires a filter expression argument".to_string())?;
                filters.push((FilterKind::Only, expr.clone()));
                i += 2;
            }
            "no" => {
                let expr = extra
                    .get(i + 1)
                    .ok_or_else(|| "'no' requires a filter expression argument".to_string())?;
                filters.push((FilterKind::No, expr.clone()));
                i += 2;
            }
            other => {
                assignments.push(other.to_string());
                i += 1;
            }
        }
    }
    Ok((assignments, filters))
}

fn exit_code_for(err: &CartconfError) -> i32 {
    match err {
        CartconfError::Include(IncludeError::Missing { .. }) => 3,
        _ => 2,
    }
}

/// `(line, reason)` for the error kinds that carry a line number;
/// `None` for ones that don't (include/interp/expansion errors), which
/// fall back to a plain `eprintln!`.
fn line_and_reason(err: &CartconfError) -> Option<(u32, String)> {
    match err {
        CartconfError::Lex(e) => Some((e.line, e.to_string())),
        CartconfError::Parse(e) => Some((e.line, e.reason.clone())),
        CartconfError::Filter(e) => Some((e.line, e.reason.clone())),
        _ => None,
    }
}

fn report_error(source: &str, err: &CartconfError) {
    use ariadne::{Label, Report, ReportKind, Source};

    let Some((line, reason)) = line_and_reason(err) else {
        eprintln!("error: {err}");
        return;
    };

    let index = LineIndex::new(source);
    let span = index.line_span(line, source);
    let start = span.start as usize;
    let end = (span.end as usize).max(start + 1);

    let _ = Report::<std::ops::Range<usize>>::build(ReportKind::Error, start..end)
        .with_message(err.to_string())
        .with_label(Label::new(start..end).with_message(reason))
        .finish()
        .eprint(Source::from(source));
}

fn main() {
    let cli = Cli::parse();

    let source = if cli.contents {
        cli.config.clone()
    } else {
        match std::fs::read_to_string(PathBuf::from(&cli.config)) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: could not read {:?}: {e}", cli.config);
                process::exit(3);
            }
        }
    };

    let (assignments, filters) = match split_extras(&cli.extra) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("error: {msg}");
            process::exit(2);
        }
    };

    match cartconf_expander::parse(&source, &NullLoader, &assignments, &filters) {
        Ok(iter) => {
            for variant in iter {
                if cli.verbose {
                    eprintln!("-> {}", variant.name);
                }
                match serde_json::to_string(&variant.dict) {
                    Ok(line) => println!("{line}"),
                    Err(e) => {
                        eprintln!("error: could not serialize dict: {e}");
                        process::exit(2);
                    }
                }
            }
            process::exit(0);
        }
        Err(err) => {
            report_error(&source, &err);
            process::exit(exit_code_for(&err));
        }
    }
}
