use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ValidatorConfig;
use crate::entropy::clock::HighResolutionClock;
use crate::entropy::jitter::JitterExtractor;
use crate::error::Error;
use crate::output;
use crate::significance;
use crate::validator::{trial_size, TrialResult, Validator};

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let s = d.as_secs();
        format!("{}m {}s", s / 60, s % 60)
    }
}

/// Runs every scale as an independent trial, `threads` at a time, and hands
/// each result to `report` in scale order. Stops at the first error from a
/// trial or from `report`; trials already reported stay reported.
pub fn run_series<C, F>(
    validator: &Validator<C>,
    scales: &[i64],
    threads: usize,
    cancel: &AtomicBool,
    mut report: F,
) -> Result<Vec<TrialResult>, Error>
where
    C: HighResolutionClock + Clone + Send,
    F: FnMut(&TrialResult) -> Result<(), Error>,
{
    for &n in scales {
        trial_size(n)?;
    }

    let mut results = Vec::with_capacity(scales.len());

    for wave in scales.chunks(threads.max(1)) {
        let outcomes: Vec<(i64, Duration, Result<TrialResult, Error>)> = if wave.len() == 1 {
            let start = Instant::now();
            let r = validator.run_trial_until(wave[0], cancel);
            vec![(wave[0], start.elapsed(), r)]
        } else {
            thread::scope(|s| {
                let handles: Vec<_> = wave
                    .iter()
                    .map(|&n| {
                        let v = validator.clone();
                        s.spawn(move || {
                            let start = Instant::now();
                            let r = v.run_trial_until(n, cancel);
                            (n, start.elapsed(), r)
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| match h.join() {
                        Ok(outcome) => outcome,
                        Err(payload) => std::panic::resume_unwind(payload),
                    })
                    .collect()
            })
        };

        for (n, elapsed, outcome) in outcomes {
            let result = outcome?;
            log::debug!(
                target: "deltarand::validate",
                "n={} finished in {}",
                n,
                format_duration(elapsed)
            );
            report(&result)?;
            results.push(result);
        }
    }

    Ok(results)
}

/// The `validate` command: run the series, write one line per trial to
/// `out`, then log any scaling flags.
pub fn run<C>(
    extractor: JitterExtractor<C>,
    config: &ValidatorConfig,
    judge: bool,
    cancel: &AtomicBool,
    out: &mut dyn Write,
) -> Result<Vec<TrialResult>, Error>
where
    C: HighResolutionClock + Clone + Send,
{
    significance::check_alpha(config.alpha)?;

    log::info!(
        target: "deltarand::validate",
        "started: scales={:?} width={} alpha={} threads={}",
        config.scales,
        extractor.width().name(),
        config.alpha,
        config.threads,
    );

    let validator = Validator::new(extractor);
    let alpha = config.alpha;

    let results = run_series(&validator, &config.scales, config.threads, cancel, |r| {
        let line = if judge {
            output::format_judged(r, &significance::judge(r, alpha)?)
        } else {
            output::format_trial(r)
        };
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    })?;

    for flag in significance::review_scaling(&results, alpha)? {
        log::warn!(target: "deltarand::validate", "{}", flag);
    }

    log::info!(target: "deltarand::validate", "completed {} trials", results.len());
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::clock::fake::ScriptedClock;
    use crate::entropy::clock::{ClockSource, PosixClock};
    use crate::entropy::jitter::SymbolWidth;

    fn scripted(deltas: &[i64]) -> Validator<ScriptedClock> {
        Validator::new(JitterExtractor::new(
            ScriptedClock::from_deltas(deltas),
            SymbolWidth::Byte,
        ))
    }

    #[test]
    fn test_series_reports_in_scale_order() {
        let v = scripted(&[0, 1]);
        let mut seen = Vec::new();
        let results = run_series(&v, &[10, 100, 1000], 1, &AtomicBool::new(false), |r| {
            seen.push(r.n);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![10, 100, 1000]);
        assert_eq!(results.len(), 3);
        for r in &results {
            assert_eq!(r.k, 2);
            assert_eq!(r.statistic, 0.0);
        }
    }

    #[test]
    fn test_parallel_series_matches_sequential_order() {
        let v = scripted(&[0, 1, 2, 3]);
        let mut seen = Vec::new();
        let results = run_series(&v, &[400, 40, 4000, 8], 3, &AtomicBool::new(false), |r| {
            seen.push(r.n);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![400, 40, 4000, 8]);
        assert!(results.iter().all(|r| r.statistic == 0.0));
    }

    #[test]
    fn test_invalid_scale_rejected_before_any_trial() {
        let v = scripted(&[1]);
        let mut reported = 0;
        let err = run_series(&v, &[1000, 0, 10], 1, &AtomicBool::new(false), |_| {
            reported += 1;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, Error::InvalidTrialSize { n: 0, .. }));
        assert_eq!(reported, 0);
        assert_eq!(v.extractor().clock().reads(), 0);
    }

    #[test]
    fn test_cancelled_series_returns_interrupted() {
        let v = scripted(&[1]);
        let err = run_series(&v, &[1000], 1, &AtomicBool::new(true), |_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::Interrupted { n: 1000, .. }));
    }

    fn real_byte_validator() -> Validator<PosixClock> {
        Validator::new(JitterExtractor::new(
            PosixClock::new(ClockSource::Monotonic),
            SymbolWidth::Byte,
        ))
    }

    fn median(mut values: Vec<usize>) -> usize {
        values.sort_unstable();
        values[values.len() / 2]
    }

    #[test]
    fn test_real_clock_small_scales() {
        let v = real_byte_validator();
        let results = run_series(&v, &[1_000, 10_000, 100_000], 2, &AtomicBool::new(false), |_| Ok(()))
            .unwrap();
        for (r, &n) in results.iter().zip(&[1_000u64, 10_000, 100_000]) {
            assert_eq!(r.n, n);
            assert!(r.k >= 1 && r.k <= 256);
            assert!(r.statistic.is_finite() && r.statistic >= 0.0);
        }
    }

    #[test]
    fn test_real_clock_alphabet_grows_with_n() {
        let v = real_byte_validator();
        let mut small = Vec::new();
        let mut large = Vec::new();
        let mut flags = Vec::new();

        for _ in 0..5 {
            let series = run_series(&v, &[1_000, 100_000], 1, &AtomicBool::new(false), |_| Ok(()))
                .unwrap();
            small.push(series[0].k);
            large.push(series[1].k);
            flags.extend(significance::review_scaling(&series, 0.01).unwrap());
        }

        // More extractions can only reveal more of the alphabet, so the
        // typical alphabet at 10^5 is at least the typical one at 10^3.
        let (small_k, large_k) = (median(small), median(large));
        assert!(
            large_k >= small_k,
            "median k fell from {} at n=1000 to {} at n=100000",
            small_k,
            large_k
        );

        // Individual shrinks and oversized statistics are reported, not failed.
        for flag in &flags {
            eprintln!("scaling flag: {}", flag);
        }
    }

    #[test]
    fn test_run_writes_judged_lines() {
        let extractor = JitterExtractor::new(ScriptedClock::from_deltas(&[0, 1, 2, 3]), SymbolWidth::Byte);
        let config = ValidatorConfig {
            scales: vec![400, 4_000],
            alpha: 0.05,
            threads: 1,
        };
        let mut out = Vec::new();
        let results = run(extractor, &config, true, &AtomicBool::new(false), &mut out).unwrap();
        assert_eq!(results.len(), 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "chisquare=0 n=400 characters=4 df=3 p=1.000000 critical=7.815 verdict=consistent",
                "chisquare=0 n=4000 characters=4 df=3 p=1.000000 critical=7.815 verdict=consistent",
            ]
        );
    }

    #[test]
    fn test_run_plain_lines() {
        let extractor = JitterExtractor::new(ScriptedClock::from_deltas(&[0, 0, 0, 1]), SymbolWidth::Byte);
        let config = ValidatorConfig {
            scales: vec![400],
            alpha: 0.01,
            threads: 1,
        };
        let mut out = Vec::new();
        run(extractor, &config, false, &AtomicBool::new(false), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "chisquare=100 n=400 characters=2\n");
    }

    #[test]
    fn test_run_rejects_bad_alpha_before_any_trial() {
        let extractor = JitterExtractor::new(ScriptedClock::from_deltas(&[1]), SymbolWidth::Byte);
        let config = ValidatorConfig {
            scales: vec![1_000],
            alpha: 0.0,
            threads: 1,
        };
        let mut out = Vec::new();
        let err = run(extractor, &config, true, &AtomicBool::new(false), &mut out).unwrap_err();
        assert!(matches!(err, Error::InvalidArgs(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
