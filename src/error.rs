use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    ClockUnavailable(io::Error),
    InvalidTrialSize { n: i64, reason: &'static str },
    DegenerateBaseline { n: u64 },
    Interrupted { n: u64, completed: u64 },
    InvalidArgs(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::ClockUnavailable(e) => write!(f, "clock unavailable: {}", e),
            Error::InvalidTrialSize { n, reason } => {
                write!(f, "invalid trial size n={}: {}", n, reason)
            }
            Error::DegenerateBaseline { n } => {
                write!(f, "degenerate baseline for n={}: no symbols observed", n)
            }
            Error::Interrupted { n, completed } => write!(
                f,
                "trial n={} interrupted after {} extractions",
                n, completed
            ),
            Error::InvalidArgs(msg) => write!(f, "invalid arguments: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
