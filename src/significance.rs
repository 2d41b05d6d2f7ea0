//! Judging chi-square statistics against the chi-square distribution.
//!
//! A raw statistic is only meaningful relative to its degrees of freedom
//! (`k - 1` for a uniform fit over `k` observed symbols), so trials of
//! different sizes are compared through their p-values and critical values,
//! never through the statistic itself.

use std::fmt;

use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::Error;
use crate::validator::TrialResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Consistent,
    Deviates,
    /// A single observed symbol leaves no degrees of freedom.
    Undetermined,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Consistent => "consistent",
            Verdict::Deviates => "deviates",
            Verdict::Undetermined => "undetermined",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Significance {
    pub df: usize,
    pub alpha: f64,
    pub p_value: Option<f64>,
    pub critical_value: Option<f64>,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalingFlag {
    /// Fewer distinct symbols at a larger scale than at the previous one.
    AlphabetShrank {
        from_n: u64,
        to_n: u64,
        from_k: usize,
        to_k: usize,
    },
    /// Statistic above the critical value for the trial's own df.
    StatisticOutpacesAlphabet {
        n: u64,
        k: usize,
        statistic: f64,
        critical_value: f64,
    },
}

impl fmt::Display for ScalingFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingFlag::AlphabetShrank {
                from_n,
                to_n,
                from_k,
                to_k,
            } => write!(
                f,
                "alphabet shrank from {} symbols at n={} to {} at n={}",
                from_k, from_n, to_k, to_n
            ),
            ScalingFlag::StatisticOutpacesAlphabet {
                n,
                k,
                statistic,
                critical_value,
            } => write!(
                f,
                "chi-square {:.3} at n={} exceeds critical value {:.3} for {} symbols",
                statistic, n, critical_value, k
            ),
        }
    }
}

pub fn check_alpha(alpha: f64) -> Result<(), Error> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidArgs(format!(
            "significance level must be in (0, 1), got {}",
            alpha
        )))
    }
}

fn distribution(df: usize) -> Result<ChiSquared, Error> {
    ChiSquared::new(df as f64)
        .map_err(|e| Error::InvalidArgs(format!("chi-square with df={}: {:?}", df, e)))
}

/// Upper-tail critical value: the `x` with `P(X > x) = alpha`, found by
/// bisecting the CDF.
pub fn critical_value(df: usize, alpha: f64) -> Result<f64, Error> {
    check_alpha(alpha)?;
    Ok(computed_critical_value(&distribution(df)?, alpha))
}

fn computed_critical_value(dist: &ChiSquared, alpha: f64) -> f64 {
    let target = 1.0 - alpha;
    let mut low = 0.0;
    let mut high = 1.0;
    while dist.cdf(high) < target {
        high *= 2.0;
    }
    for _ in 0..100 {
        let mid = 0.5 * (low + high);
        if dist.cdf(mid) < target {
            low = mid;
        } else {
            high = mid;
        }
    }
    0.5 * (low + high)
}

/// Judge one trial at significance level `alpha`. The verdict follows the
/// p-value, so it never disagrees with the reported `p`.
pub fn judge(result: &TrialResult, alpha: f64) -> Result<Significance, Error> {
    check_alpha(alpha)?;
    let df = result.k.saturating_sub(1);
    if df == 0 {
        return Ok(Significance {
            df,
            alpha,
            p_value: None,
            critical_value: None,
            verdict: Verdict::Undetermined,
        });
    }

    let dist = distribution(df)?;
    let p_value = dist.sf(result.statistic);
    let critical = computed_critical_value(&dist, alpha);
    let verdict = if p_value < alpha {
        Verdict::Deviates
    } else {
        Verdict::Consistent
    };

    Ok(Significance {
        df,
        alpha,
        p_value: Some(p_value),
        critical_value: Some(critical),
        verdict,
    })
}

/// Review a multi-scale series. Returns flags to report; a flagged series is
/// not a failure.
pub fn review_scaling(results: &[TrialResult], alpha: f64) -> Result<Vec<ScalingFlag>, Error> {
    let mut sorted = results.to_vec();
    sorted.sort_by_key(|r| r.n);

    let mut flags = Vec::new();

    for pair in sorted.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.n > prev.n && next.k < prev.k {
            flags.push(ScalingFlag::AlphabetShrank {
                from_n: prev.n,
                to_n: next.n,
                from_k: prev.k,
                to_k: next.k,
            });
        }
    }

    for r in &sorted {
        let sig = judge(r, alpha)?;
        if let (Verdict::Deviates, Some(critical_value)) = (sig.verdict, sig.critical_value) {
            flags.push(ScalingFlag::StatisticOutpacesAlphabet {
                n: r.n,
                k: r.k,
                statistic: r.statistic,
                critical_value,
            });
        }
    }

    Ok(flags)
}
