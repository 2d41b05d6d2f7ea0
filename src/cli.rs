use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::entropy::clock::ClockSource;
use crate::entropy::jitter::SymbolWidth;
use crate::logging::LogArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StreamFormat {
    /// Each symbol as a UTF-8 character
    Char,
    /// Zero-padded lowercase hexadecimal, space separated
    Hex,
    /// Decimal symbol values, space separated
    Decimal,
    /// Little-endian bytes of the symbol width
    Raw,
}

#[derive(Debug, Args)]
pub struct ExtractorArgs {
    /// Clock to sample
    #[arg(long, value_enum)]
    pub clock: Option<ClockSource>,

    /// Bits of each jitter sample kept as the symbol
    #[arg(short = 'w', long, value_enum)]
    pub width: Option<SymbolWidth>,
}

#[derive(Debug, Parser)]
#[command(name = "deltarand", about = "Clock-jitter symbol source and uniformity checker")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Stop after this many symbols (default: run until interrupted)
    #[arg(short = 'n', long = "count")]
    pub count: Option<u64>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = StreamFormat::Char)]
    pub format: StreamFormat,

    /// Write output to a file instead of stdout
    #[arg(short = 'o', long = "output-file")]
    pub output_file: Option<PathBuf>,

    /// Configuration file path (default: /etc/deltarand.toml)
    #[arg(long = "config")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub extractor: ExtractorArgs,

    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run chi-square uniformity trials at several sample sizes
    Validate(ValidateArgs),
}

#[derive(Debug, Parser)]
pub struct ValidateArgs {
    /// Comma-separated trial sizes (default: 10^3 through 10^9)
    #[arg(short = 's', long, value_delimiter = ',', allow_negative_numbers = true)]
    pub scales: Option<Vec<i64>>,

    /// Append p-value, critical value and verdict to each report line
    #[arg(short = 'j', long)]
    pub judge: bool,

    /// Significance level for the verdict and scaling review
    #[arg(short = 'a', long)]
    pub alpha: Option<f64>,

    /// Trials to run concurrently (1-64)
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Configuration file path (default: /etc/deltarand.toml)
    #[arg(long = "config")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub extractor: ExtractorArgs,

    #[command(flatten)]
    pub log: LogArgs,
}
