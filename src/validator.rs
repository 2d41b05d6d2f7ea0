use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::entropy::clock::HighResolutionClock;
use crate::entropy::jitter::{JitterExtractor, Symbol};
use crate::error::Error;

/// Occurrence count per observed symbol.
pub type FrequencyTable = HashMap<Symbol, u64>;

/// How many extractions run between checks of the cancellation flag.
const CANCEL_POLL_INTERVAL: u64 = 1 << 16;

/// Chi-square statistic of one trial, with the `n` and alphabet size that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialResult {
    pub statistic: f64,
    pub n: u64,
    pub k: usize,
}

/// Reject non-positive trial sizes before any extraction happens.
pub fn trial_size(n: i64) -> Result<u64, Error> {
    match n {
        0 => Err(Error::InvalidTrialSize {
            n,
            reason: "zero extractions leave the uniform baseline undefined",
        }),
        n if n < 0 => Err(Error::InvalidTrialSize {
            n,
            reason: "trial size must be positive",
        }),
        n => Ok(n as u64),
    }
}

/// `k` expected counts of `n / k` each.
pub fn uniform_baseline(n: u64, k: usize) -> Vec<f64> {
    vec![n as f64 / k as f64; k]
}

/// Pearson's chi-square: sum of (observed - expected)^2 / expected.
pub fn chi_square(observed: &[f64], expected: &[f64]) -> Result<f64, Error> {
    if observed.len() != expected.len() {
        return Err(Error::InvalidArgs(format!(
            "observed has {} buckets, expected has {}",
            observed.len(),
            expected.len()
        )));
    }
    if observed.is_empty() {
        return Err(Error::InvalidArgs("chi-square of zero buckets".into()));
    }
    Ok(observed
        .iter()
        .zip(expected)
        .map(|(&obs, &exp)| {
            let diff = obs - exp;
            diff * diff / exp
        })
        .sum())
}

/// Compare a finished table against the uniform distribution over its own
/// observed alphabet.
pub fn evaluate(table: &FrequencyTable) -> Result<TrialResult, Error> {
    let n: u64 = table.values().sum();
    let k = table.len();
    if k == 0 {
        return Err(Error::DegenerateBaseline { n });
    }

    let observed: Vec<f64> = table.values().map(|&c| c as f64).collect();
    let expected = uniform_baseline(n, k);
    let statistic = chi_square(&observed, &expected)?;

    Ok(TrialResult { statistic, n, k })
}

/// Drives an extractor through independent trials.
#[derive(Debug, Clone)]
pub struct Validator<C> {
    extractor: JitterExtractor<C>,
}

impl<C: HighResolutionClock> Validator<C> {
    pub fn new(extractor: JitterExtractor<C>) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &JitterExtractor<C> {
        &self.extractor
    }

    pub fn tabulate(&self, n: i64) -> Result<FrequencyTable, Error> {
        self.tabulate_until(n, &AtomicBool::new(false))
    }

    /// Extract exactly `n` symbols into a fresh table, giving up with
    /// `Error::Interrupted` once `cancel` is observed set.
    pub fn tabulate_until(&self, n: i64, cancel: &AtomicBool) -> Result<FrequencyTable, Error> {
        let n = trial_size(n)?;
        let mut table = FrequencyTable::new();

        for i in 0..n {
            if i % CANCEL_POLL_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return Err(Error::Interrupted { n, completed: i });
            }
            let symbol = self.extractor.extract()?;
            *table.entry(symbol).or_insert(0) += 1;
        }

        Ok(table)
    }

    pub fn run_trial(&self, n: i64) -> Result<TrialResult, Error> {
        self.run_trial_until(n, &AtomicBool::new(false))
    }

    pub fn run_trial_until(&self, n: i64, cancel: &AtomicBool) -> Result<TrialResult, Error> {
        let table = self.tabulate_until(n, cancel)?;
        evaluate(&table)
    }
}
