use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::cli::StreamFormat;
use crate::entropy::jitter::{Symbol, SymbolWidth};
use crate::significance::Significance;
use crate::validator::TrialResult;

/// Opens the stream sink: a file when given, otherwise stdout.
pub fn open_sink(output_file: Option<&Path>) -> io::Result<Box<dyn Write>> {
    Ok(match output_file {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

/// Writes one symbol in the requested format.
pub fn write_symbol(
    symbol: Symbol,
    width: SymbolWidth,
    format: StreamFormat,
    out: &mut dyn Write,
) -> io::Result<()> {
    match format {
        StreamFormat::Char => {
            let mut buf = [0u8; 4];
            out.write_all(symbol.to_char().encode_utf8(&mut buf).as_bytes())
        }
        StreamFormat::Hex => {
            write!(out, "{:0w$x} ", symbol.value(), w = width.bytes() * 2)
        }
        StreamFormat::Decimal => write!(out, "{} ", symbol.value()),
        StreamFormat::Raw => out.write_all(&symbol.value().to_le_bytes()[..width.bytes()]),
    }
}

/// `chisquare=<value> n=<value> characters=<value>`
pub fn format_trial(result: &TrialResult) -> String {
    format!(
        "chisquare={} n={} characters={}",
        result.statistic, result.n, result.k
    )
}

/// Trial line followed by its significance fields.
pub fn format_judged(result: &TrialResult, sig: &Significance) -> String {
    let mut line = format_trial(result);
    line.push_str(&format!(" df={}", sig.df));
    match (sig.p_value, sig.critical_value) {
        (Some(p), Some(c)) => line.push_str(&format!(" p={:.6} critical={:.3}", p, c)),
        _ => line.push_str(" p=- critical=-"),
    }
    line.push_str(&format!(" verdict={}", sig.verdict));
    line
}
