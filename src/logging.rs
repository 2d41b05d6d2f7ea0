use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Args, ValueEnum};
use log::{Level, LevelFilter, Log, Metadata, Record};

type SyslogLogger = syslog::Logger<syslog::LoggerBackend, syslog::Formatter3164>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
        }
    }
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Log level (default: warn)
    #[arg(long = "log-level", value_enum)]
    pub log_level: Option<LogLevel>,

    /// Append log messages to a file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Send log messages to syslog
    #[arg(long)]
    pub syslog: bool,
}

/// Where formatted records go. stderr is always present so stdout stays
/// reserved for symbols and report lines.
enum Sink {
    Stderr,
    File(Mutex<File>),
    Syslog(Mutex<SyslogLogger>),
    #[cfg(test)]
    Memory(std::sync::Arc<Mutex<Vec<u8>>>),
}

impl Sink {
    fn emit(&self, record: &Record, line: &str) {
        match self {
            Sink::Stderr => {
                let _ = writeln!(io::stderr().lock(), "{}", line);
            }
            Sink::File(file) => {
                if let Ok(mut f) = file.lock() {
                    let _ = writeln!(f, "{}", line);
                }
            }
            // syslog adds its own tag, so it gets the bare message
            Sink::Syslog(logger) => {
                if let Ok(mut l) = logger.lock() {
                    let text = record.args().to_string();
                    let _ = match record.level() {
                        Level::Error => l.err(text),
                        Level::Warn => l.warning(text),
                        Level::Info => l.info(text),
                        Level::Debug | Level::Trace => l.debug(text),
                    };
                }
            }
            #[cfg(test)]
            Sink::Memory(buf) => {
                if let Ok(mut b) = buf.lock() {
                    let _ = writeln!(b, "{}", line);
                }
            }
        }
    }

    fn flush(&self) {
        match self {
            Sink::Stderr => {
                let _ = io::stderr().flush();
            }
            Sink::File(file) => {
                if let Ok(mut f) = file.lock() {
                    let _ = f.flush();
                }
            }
            _ => {}
        }
    }
}

struct DeltarandLogger {
    level: LevelFilter,
    sinks: Vec<Sink>,
}

impl DeltarandLogger {
    /// Opens every sink `args` asks for. Sinks that cannot be opened are
    /// left out and described in the returned list.
    fn from_args(args: &LogArgs) -> (Self, Vec<String>) {
        let mut sinks = vec![Sink::Stderr];
        let mut problems = Vec::new();

        if let Some(path) = &args.log_file {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => sinks.push(Sink::File(Mutex::new(f))),
                Err(e) => problems.push(format!("log file {}: {}", path.display(), e)),
            }
        }

        if args.syslog {
            let formatter = syslog::Formatter3164 {
                facility: syslog::Facility::LOG_USER,
                hostname: None,
                process: "deltarand".into(),
                pid: std::process::id(),
            };
            match syslog::unix(formatter) {
                Ok(l) => sinks.push(Sink::Syslog(Mutex::new(l))),
                Err(e) => problems.push(format!("syslog: {}", e)),
            }
        }

        let level = args.log_level.unwrap_or(LogLevel::Warn).into();
        (Self { level, sinks }, problems)
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "error",
        Level::Warn => "warning",
        Level::Info => "info",
        Level::Debug | Level::Trace => "debug",
    }
}

fn prefix(target: &str) -> &'static str {
    if target.contains("stream") {
        "deltarand stream"
    } else if target.contains("validate") {
        "deltarand validate"
    } else {
        "deltarand"
    }
}

fn format_line(record: &Record) -> String {
    format!(
        "[{}] {}: {}",
        prefix(record.target()),
        level_tag(record.level()),
        record.args()
    )
}

impl Log for DeltarandLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record);
        for sink in &self.sinks {
            sink.emit(record, &line);
        }
    }

    fn flush(&self) {
        for sink in &self.sinks {
            sink.flush();
        }
    }
}

/// Installs the process logger. Requested sinks that fail to open are
/// reported as warnings through the sinks that did.
pub fn init(args: &LogArgs) {
    let (logger, problems) = DeltarandLogger::from_args(args);
    let level = logger.level;

    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level);
    }
    for problem in problems {
        log::warn!("{}", problem);
    }
}
