use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cli::StreamFormat;
use crate::entropy::clock::HighResolutionClock;
use crate::entropy::jitter::JitterExtractor;
use crate::error::Error;
use crate::output;

/// Writes symbols until `count` is reached or `shutdown` is set. Returns the
/// number of symbols written. A closed reader ends the stream without error.
pub fn run<C: HighResolutionClock>(
    extractor: &JitterExtractor<C>,
    count: Option<u64>,
    format: StreamFormat,
    out: &mut dyn Write,
    shutdown: &AtomicBool,
) -> Result<u64, Error> {
    let width = extractor.width();
    log::info!(
        target: "deltarand::stream",
        "started: width={} format={:?} count={}",
        width.name(),
        format,
        count.map_or_else(|| "unbounded".to_string(), |c| c.to_string()),
    );

    let mut written: u64 = 0;

    while !shutdown.load(Ordering::Relaxed) && count.map_or(true, |c| written < c) {
        let symbol = extractor.extract()?;
        match output::write_symbol(symbol, width, format, out) {
            Ok(()) => written += 1,
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                log::debug!(target: "deltarand::stream", "reader closed the pipe");
                return Ok(written);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if matches!(format, StreamFormat::Hex | StreamFormat::Decimal) && written > 0 {
        writeln!(out)?;
    }
    match out.flush() {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e.into()),
        _ => {}
    }

    if shutdown.load(Ordering::Relaxed) {
        log::info!(target: "deltarand::stream", "interrupted after {} symbols", written);
    } else {
        log::info!(target: "deltarand::stream", "wrote {} symbols", written);
    }
    Ok(written)
}
