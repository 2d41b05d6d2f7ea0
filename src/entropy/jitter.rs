use std::fmt;

use serde::Deserialize;

use super::clock::HighResolutionClock;
use crate::error::Error;

/// One narrowed jitter measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub fn value(self) -> u32 {
        self.0
    }

    /// The symbol as a character. Every symbol is a valid Unicode scalar
    /// except the surrogate range of `word` symbols, which renders as U+FFFD.
    pub fn to_char(self) -> char {
        char::from_u32(self.0).unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a jitter sample is narrowed into a symbol. Fixed per extractor; it
/// decides the alphabet every downstream statistic is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SymbolWidth {
    /// Low 8 bits of the delta (256 symbols)
    Byte,
    /// Low 16 bits of the delta (65536 symbols)
    Word,
    /// Low 32 bits as a Unicode scalar, invalid scalars become U+FFFD.
    /// Truncation comes first, so a delta of 2^32 + 0x41 is 'A', not U+FFFD.
    Scalar,
}

impl SymbolWidth {
    pub fn name(self) -> &'static str {
        match self {
            SymbolWidth::Byte => "byte",
            SymbolWidth::Word => "word",
            SymbolWidth::Scalar => "scalar",
        }
    }

    /// Size in bytes of one symbol in raw output.
    pub fn bytes(self) -> usize {
        match self {
            SymbolWidth::Byte => 1,
            SymbolWidth::Word => 2,
            SymbolWidth::Scalar => 4,
        }
    }

    /// Number of distinct symbols the width can produce.
    pub fn alphabet_size(self) -> u64 {
        match self {
            SymbolWidth::Byte => 1 << 8,
            SymbolWidth::Word => 1 << 16,
            // 0x0..=0x10FFFF minus the 2048 surrogates
            SymbolWidth::Scalar => 0x11_0000 - 0x800,
        }
    }

    /// Truncate a signed delta to its low-order bits (two's complement).
    #[inline]
    pub fn narrow(self, delta: i64) -> Symbol {
        match self {
            SymbolWidth::Byte => Symbol(delta as u8 as u32),
            SymbolWidth::Word => Symbol(delta as u16 as u32),
            SymbolWidth::Scalar => {
                let raw = delta as u32;
                if char::from_u32(raw).is_some() {
                    Symbol(raw)
                } else {
                    Symbol(char::REPLACEMENT_CHARACTER as u32)
                }
            }
        }
    }
}

/// Derives symbols from the jitter between two adjacent clock reads.
#[derive(Debug, Clone)]
pub struct JitterExtractor<C> {
    clock: C,
    width: SymbolWidth,
}

impl<C: HighResolutionClock> JitterExtractor<C> {
    pub fn new(clock: C, width: SymbolWidth) -> Self {
        Self { clock, width }
    }

    pub fn width(&self) -> SymbolWidth {
        self.width
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Raw signed delta between two back-to-back reads. A failed read is
    /// returned as-is and never retried.
    #[inline]
    pub fn jitter_sample(&self) -> Result<i64, Error> {
        let t0 = self.clock.read()?;
        let t1 = self.clock.read()?;
        Ok(t1.wrapping_sub(t0))
    }

    #[inline]
    pub fn extract(&self) -> Result<Symbol, Error> {
        let delta = self.jitter_sample()?;
        Ok(self.width.narrow(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::clock::fake::ScriptedClock;
    use crate::entropy::clock::{ClockSource, PosixClock};

    #[test]
    fn test_narrow_byte_keeps_low_bits() {
        assert_eq!(SymbolWidth::Byte.narrow(0).value(), 0);
        assert_eq!(SymbolWidth::Byte.narrow(42).value(), 42);
        assert_eq!(SymbolWidth::Byte.narrow(0x1234).value(), 0x34);
        assert_eq!(SymbolWidth::Byte.narrow(256).value(), 0);
    }

    #[test]
    fn test_narrow_negative_is_twos_complement() {
        assert_eq!(SymbolWidth::Byte.narrow(-1).value(), 0xFF);
        assert_eq!(SymbolWidth::Word.narrow(-1).value(), 0xFFFF);
        assert_eq!(SymbolWidth::Byte.narrow(-256).value(), 0);
        // -1 as u32 is 0xFFFFFFFF, not a scalar
        assert_eq!(
            SymbolWidth::Scalar.narrow(-1).value(),
            char::REPLACEMENT_CHARACTER as u32
        );
    }

    #[test]
    fn test_narrow_scalar() {
        assert_eq!(SymbolWidth::Scalar.narrow(65).to_char(), 'A');
        assert_eq!(SymbolWidth::Scalar.narrow(0x10FFFF).value(), 0x10FFFF);
        assert_eq!(SymbolWidth::Scalar.narrow(0x110000).value(), 0xFFFD);
        assert_eq!(SymbolWidth::Scalar.narrow(0xD800).value(), 0xFFFD);
    }

    #[test]
    fn test_narrow_scalar_truncates_before_validity_check() {
        let delta = (1i64 << 32) + 0x41;
        assert_eq!(SymbolWidth::Scalar.narrow(delta).to_char(), 'A');
        assert_eq!(SymbolWidth::Scalar.narrow(1i64 << 32).value(), 0);
    }

    #[test]
    fn test_word_surrogate_renders_replacement() {
        let s = SymbolWidth::Word.narrow(0xDC00);
        assert_eq!(s.value(), 0xDC00);
        assert_eq!(s.to_char(), char::REPLACEMENT_CHARACTER);
    }

    #[test]
    fn test_alphabet_sizes() {
        assert_eq!(SymbolWidth::Byte.alphabet_size(), 256);
        assert_eq!(SymbolWidth::Word.alphabet_size(), 65536);
        assert_eq!(SymbolWidth::Scalar.alphabet_size(), 1_112_064);
    }

    #[test]
    fn test_extract_uses_scripted_deltas() {
        let clock = ScriptedClock::from_deltas(&[7, 300, -2]);
        let ex = JitterExtractor::new(clock, SymbolWidth::Byte);
        assert_eq!(ex.extract().unwrap().value(), 7);
        assert_eq!(ex.extract().unwrap().value(), 300 & 0xFF);
        assert_eq!(ex.extract().unwrap().value(), 0xFE);
        assert_eq!(ex.clock().reads(), 6);
    }

    #[test]
    fn test_clock_regression_gives_negative_sample() {
        let clock = ScriptedClock::new(vec![1_000, 400]);
        let ex = JitterExtractor::new(clock, SymbolWidth::Word);
        assert_eq!(ex.jitter_sample().unwrap(), -600);
    }

    #[test]
    fn test_sample_wraps_instead_of_overflowing() {
        let clock = ScriptedClock::new(vec![i64::MAX, i64::MIN]);
        let ex = JitterExtractor::new(clock, SymbolWidth::Byte);
        assert_eq!(ex.jitter_sample().unwrap(), 1);
    }

    #[test]
    fn test_clock_failure_propagates() {
        let clock = ScriptedClock::from_deltas(&[1]).failing_after(1);
        let ex = JitterExtractor::new(clock, SymbolWidth::Byte);
        assert!(matches!(ex.extract(), Err(Error::ClockUnavailable(_))));
    }

    #[test]
    fn test_real_clock_symbols_within_width() {
        for width in [SymbolWidth::Byte, SymbolWidth::Word, SymbolWidth::Scalar] {
            let ex = JitterExtractor::new(PosixClock::new(ClockSource::Monotonic), width);
            let a = ex.extract().unwrap();
            let b = ex.extract().unwrap();
            for s in [a, b] {
                assert!((s.value() as u64) < (1u64 << (width.bytes() * 8)).min(0x11_0000));
                assert_eq!(s.to_char().to_string().chars().count(), 1);
            }
        }
    }

    #[test]
    fn test_monotonic_sample_is_non_negative() {
        let ex = JitterExtractor::new(PosixClock::new(ClockSource::Monotonic), SymbolWidth::Byte);
        for _ in 0..1000 {
            assert!(ex.jitter_sample().unwrap() >= 0);
        }
    }
}
