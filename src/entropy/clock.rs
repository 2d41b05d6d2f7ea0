use std::io;

use serde::Deserialize;

use crate::error::Error;

/// Nanoseconds since the clock's epoch.
pub type ClockReading = i64;

/// A source of high-resolution timestamps.
///
/// Implementations must not do any work beyond producing the reading: the
/// extractor relies on two consecutive calls being as close together as the
/// hardware allows.
pub trait HighResolutionClock {
    fn read(&self) -> Result<ClockReading, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ClockSource {
    /// CLOCK_MONOTONIC (NTP-slewed, never steps backwards)
    Monotonic,
    /// CLOCK_MONOTONIC_RAW (raw hardware counter, no slewing)
    MonotonicRaw,
    /// CLOCK_REALTIME (wall clock, may step backwards)
    Realtime,
}

impl ClockSource {
    fn clock_id(self) -> libc::clockid_t {
        match self {
            ClockSource::Monotonic => libc::CLOCK_MONOTONIC,
            ClockSource::MonotonicRaw => libc::CLOCK_MONOTONIC_RAW,
            ClockSource::Realtime => libc::CLOCK_REALTIME,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ClockSource::Monotonic => "monotonic",
            ClockSource::MonotonicRaw => "monotonic-raw",
            ClockSource::Realtime => "realtime",
        }
    }
}

/// clock_gettime(2)-backed clock.
///
/// clock_gettime is thread-safe and async-signal-safe under POSIX, so a
/// `PosixClock` can be copied into as many threads as needed.
#[derive(Debug, Clone, Copy)]
pub struct PosixClock {
    source: ClockSource,
}

impl PosixClock {
    pub fn new(source: ClockSource) -> Self {
        Self { source }
    }

    /// Reported resolution of the underlying clock in nanoseconds.
    pub fn resolution_ns(&self) -> Result<i64, Error> {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: ts is a valid, writable timespec for the duration of the call.
        let ret = unsafe { libc::clock_getres(self.source.clock_id(), &mut ts) };
        if ret != 0 {
            return Err(Error::ClockUnavailable(io::Error::last_os_error()));
        }
        Ok(timespec_ns(&ts))
    }
}

impl HighResolutionClock for PosixClock {
    #[inline(always)]
    fn read(&self) -> Result<ClockReading, Error> {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: ts is a valid, writable timespec for the duration of the call.
        let ret = unsafe { libc::clock_gettime(self.source.clock_id(), &mut ts) };
        if ret != 0 {
            return Err(Error::ClockUnavailable(io::Error::last_os_error()));
        }
        Ok(timespec_ns(&ts))
    }
}

#[inline(always)]
fn timespec_ns(ts: &libc::timespec) -> i64 {
    (ts.tv_sec as i64)
        .wrapping_mul(1_000_000_000)
        .wrapping_add(ts.tv_nsec as i64)
}
