//! Throughput and time-to-exhaustion estimates.

use std::fmt;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;
const MONTH: f64 = 30.0 * DAY;
const YEAR: f64 = 365.0 * DAY;

/// Number of candidates across all lengths in `min_len..=max_len`.
/// Saturates at `u128::MAX` for astronomically large spaces.
pub fn search_space(alphabet_len: usize, min_len: usize, max_len: usize) -> u128 {
    let base = alphabet_len as u128;
    (min_len..=max_len).fold(0u128, |acc, len| {
        acc.saturating_add(base.saturating_pow(len as u32))
    })
}

/// Candidates per second, or `None` while nothing can be measured yet.
pub fn rate(tried: u64, elapsed_secs: f64) -> Option<f64> {
    if tried == 0 || elapsed_secs <= 0.0 {
        return None;
    }
    Some(tried as f64 / elapsed_secs)
}

/// Remaining-time estimate for a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Estimate {
    Unknown,
    Remaining(f64),
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Estimate::Unknown => write!(f, "unknown"),
            Estimate::Remaining(secs) => write!(f, "~{}", format_remaining(*secs)),
        }
    }
}

/// Estimates time to exhaustion for one invocation of a search.
///
/// `offset` is the absolute position the invocation started at: zero for a
/// fresh run, or the rank of the resume point plus one. Remaining work is
/// therefore `total - offset - tried`, exact even after a resume.
#[derive(Debug, Clone, Copy)]
pub struct Estimator {
    total: u128,
    offset: u128,
}

impl Estimator {
    /// `offset` is the absolute position the run starts from.
    pub fn new(total: u128, offset: u128) -> Self {
        Self { total, offset }
    }

    pub fn total(&self) -> u128 {
        self.total
    }

    pub fn offset(&self) -> u128 {
        self.offset
    }

    /// Remaining time at the current rate, or `Unknown` before any progress.
    pub fn estimate(&self, tried: u64, elapsed_secs: f64) -> Estimate {
        let Some(rate) = rate(tried, elapsed_secs) else {
            return Estimate::Unknown;
        };
        let remaining = self
            .total
            .saturating_sub(self.offset)
            .saturating_sub(tried as u128);
        Estimate::Remaining(remaining as f64 / rate)
    }
}

/// Formats an elapsed duration: seconds, then minutes, then hours.
pub fn format_elapsed(secs: f64) -> String {
    if secs < MINUTE {
        format!("{:.1} seconds", secs)
    } else if secs < HOUR {
        format!("{:.1} minutes", secs / MINUTE)
    } else {
        format!("{:.1} hours", secs / HOUR)
    }
}

/// Formats a remaining duration in coarse buckets up to years.
pub fn format_remaining(secs: f64) -> String {
    if secs > YEAR {
        format!("{:.1} years", secs / YEAR)
    } else if secs > MONTH {
        format!("{:.1} months", secs / MONTH)
    } else if secs > DAY {
        format!("{:.1} days", secs / DAY)
    } else if secs > HOUR {
        format!("{:.1} hours", secs / HOUR)
    } else if secs > MINUTE {
        format!("{:.1} minutes", secs / MINUTE)
    } else {
        format!("{:.1} seconds", secs)
    }
}

/// Formats a count with thousands separators, e.g. `1,234,567`.
pub fn group_thousands(n: u128) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_space_sums_lengths() {
        assert_eq!(search_space(10, 4, 4), 10_000);
        assert_eq!(search_space(2, 1, 2), 6);
        assert_eq!(search_space(94, 1, 40), u128::MAX);
    }

    #[test]
    fn zero_progress_is_unknown() {
        let estimator = Estimator::new(10_000, 0);
        assert_eq!(estimator.estimate(0, 5.0), Estimate::Unknown);
        assert_eq!(estimator.estimate(100, 0.0), Estimate::Unknown);
        assert_eq!(estimator.estimate(0, 0.0).to_string(), "unknown");
        assert_eq!(rate(0, 1.0), None);
    }

    #[test]
    fn remaining_accounts_for_offset() {
        // 100 per second with 9,000 left after a resume at 1,000.
        let fresh = Estimator::new(10_000, 0).estimate(1_000, 10.0);
        let resumed = Estimator::new(10_000, 1_000).estimate(1_000, 10.0);
        assert_eq!(fresh, Estimate::Remaining(90.0));
        assert_eq!(resumed, Estimate::Remaining(80.0));
    }

    #[test]
    fn remaining_never_negative() {
        let estimate = Estimator::new(10, 5).estimate(50, 1.0);
        assert_eq!(estimate, Estimate::Remaining(0.0));
    }

    #[test]
    fn remaining_buckets_are_monotonic() {
        assert_eq!(format_remaining(30.0), "30.0 seconds");
        assert_eq!(format_remaining(90.0), "1.5 minutes");
        assert_eq!(format_remaining(2.0 * HOUR), "2.0 hours");
        assert_eq!(format_remaining(3.0 * DAY), "3.0 days");
        assert_eq!(format_remaining(60.0 * DAY), "2.0 months");
        assert_eq!(format_remaining(730.0 * DAY), "2.0 years");
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(1.24), "1.2 seconds");
        assert_eq!(format_elapsed(120.0), "2.0 minutes");
        assert_eq!(format_elapsed(5400.0), "1.5 hours");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(5_679), "5,679");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
