//! Size admission control.
//!
//! The transport imposes hard ceilings on both the files we may download and
//! the artifacts we may upload. `SizeGate` only reports; callers decide how to
//! tell the user.

use serde::Serialize;

const UNITS: [&str; 8] = ["", "K", "M", "G", "T", "P", "E", "Z"];

/// Result of a size check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateResult {
    Pass,
    Overflow { actual: u64, limit: u64 },
}

impl GateResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, GateResult::Pass)
    }

    /// Human readable overflow text, `None` when the check passed.
    ///
    /// `subject` names what was measured, e.g. "File" or "Converted file".
    pub fn overflow_message(&self, subject: &str) -> Option<String> {
        match self {
            GateResult::Pass => None,
            GateResult::Overflow { actual, limit } => Some(format!(
                "{} size {} exceeds the maximum limit of {} (limit imposed by Telegram, not by this bot).",
                subject,
                format_size(*actual),
                format_size(*limit)
            )),
        }
    }
}

/// Stateless size gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeGate;

impl SizeGate {
    /// Compares `actual` against `limit`. A size equal to the limit passes.
    pub fn check(actual: u64, limit: u64) -> GateResult {
        if actual <= limit {
            GateResult::Pass
        } else {
            GateResult::Overflow { actual, limit }
        }
    }
}

/// Renders a byte count with decimal (1000-based) suffixes and one decimal
/// digit: `999 -> "999.0 B"`, `1000 -> "1.0 KB"`. Values past zettabytes stay
/// in the `YB` bucket.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;

    for unit in UNITS {
        if value < 1000.0 {
            return format!("{:.1} {}B", value, unit);
        }
        value /= 1000.0;
    }

    format!("{:.1} YB", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_passes_at_and_below_limit() {
        assert_eq!(SizeGate::check(0, 10), GateResult::Pass);
        assert_eq!(SizeGate::check(10, 10), GateResult::Pass);
        assert!(SizeGate::check(9, 10).is_pass());
    }

    #[test]
    fn test_check_overflow_carries_both_values() {
        assert_eq!(
            SizeGate::check(11, 10),
            GateResult::Overflow {
                actual: 11,
                limit: 10
            }
        );
    }

    #[test]
    fn test_check_is_idempotent() {
        let first = SizeGate::check(45_000_000, 20_000_000);
        let second = SizeGate::check(45_000_000, 20_000_000);
        assert_eq!(first, second);
    }

    #[test]
    fn test_format_size_buckets() {
        assert_eq!(format_size(0), "0.0 B");
        assert_eq!(format_size(999), "999.0 B");
        assert_eq!(format_size(1000), "1.0 KB");
        assert_eq!(format_size(1_500), "1.5 KB");
        assert_eq!(format_size(1_000_000), "1.0 MB");
        assert_eq!(format_size(20_000_000), "20.0 MB");
        assert_eq!(format_size(45_000_000), "45.0 MB");
        assert_eq!(format_size(3_200_000_000), "3.2 GB");
        assert_eq!(format_size(1_000_000_000_000_000_000), "1.0 EB");
    }

    #[test]
    fn test_format_size_is_monotonic_within_bucket() {
        let sizes = [1_000, 1_100, 2_000, 500_000, 999_000];
        let rendered: Vec<f64> = sizes
            .iter()
            .map(|s| {
                format_size(*s)
                    .trim_end_matches(" KB")
                    .parse::<f64>()
                    .unwrap()
            })
            .collect();
        assert!(rendered.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_format_size_always_one_decimal() {
        for size in [1u64, 12, 123, 1_234, 12_345, 123_456_789, u64::MAX] {
            let rendered = format_size(size);
            let number = rendered.split(' ').next().unwrap();
            let decimals = number.split('.').nth(1).unwrap();
            assert_eq!(decimals.len(), 1, "{}", rendered);
        }
    }

    #[test]
    fn test_overflow_message_contains_both_magnitudes() {
        let message = SizeGate::check(45_000_000, 20_000_000)
            .overflow_message("File")
            .unwrap();
        assert!(message.starts_with("File size 45.0 MB"));
        assert!(message.contains("20.0 MB"));

        assert!(SizeGate::check(1, 2).overflow_message("File").is_none());
    }
}
