//! # Serial Numbers
//!
//! Human-readable quotation numbers of the form `Q-YYYY-NNNNNN`.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  issued serials (any order, any year)                                   │
//! │    Q-2024-000041   ← other year, ignored                                │
//! │    Q-2025-000001   ← rank 1                                             │
//! │    Q-2025-000007   ← rank 7  (max)                                      │
//! │    Q-2025-abc      ← rank 0, reported as an anomaly                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │    next_serial(2025, ..) = Q-2025-000008                                │
//! │                                                                         │
//! │  Numbering restarts at 000001 each year. This module only ranks what   │
//! │  it is given; uniqueness under concurrency is the storage layer's job  │
//! │  (unique index + retry, see quoter-db).                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use quoter_core::serial::{is_valid_serial, next_serial};
//!
//! let next = next_serial(2025, ["Q-2025-000001", "Q-2025-000007"]).unwrap();
//! assert_eq!(next.serial.to_string(), "Q-2025-000008");
//! assert!(next.anomalies.is_empty());
//!
//! assert!(is_valid_serial("Q-2025-000001"));
//! assert!(!is_valid_serial("Q-2025-1"));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Leading token of every serial.
pub const SERIAL_PREFIX: &str = "Q";

/// Highest sequence a year can hold (six digits).
pub const MAX_SEQUENCE: u32 = 999_999;

/// Accepted year range.
pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 9999;

const SEQUENCE_DIGITS: usize = 6;

// =============================================================================
// Serial
// =============================================================================

/// A validated quotation serial.
///
/// Orders by year, then sequence. Serializes as its string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Serial {
    year: i32,
    sequence: u32,
}

impl Serial {
    /// Builds a serial from its parts.
    ///
    /// ## Errors
    /// - [`CoreError::InvalidSerialYear`] outside 2000..=9999
    /// - [`CoreError::InvalidSerial`] for a sequence outside 1..=999999
    pub fn new(year: i32, sequence: u32) -> CoreResult<Self> {
        check_year(year)?;
        if !(1..=MAX_SEQUENCE).contains(&sequence) {
            return Err(CoreError::InvalidSerial(format!(
                "{SERIAL_PREFIX}-{year}-{sequence}"
            )));
        }
        Ok(Serial { year, sequence })
    }

    /// Parses a canonical `Q-YYYY-NNNNNN` string.
    pub fn parse(s: &str) -> CoreResult<Self> {
        let (year, sequence) =
            split_canonical(s).ok_or_else(|| CoreError::InvalidSerial(s.to_string()))?;
        Ok(Serial { year, sequence })
    }

    pub const fn year(&self) -> i32 {
        self.year
    }

    pub const fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SERIAL_PREFIX}-{}-{:0width$}",
            self.year,
            self.sequence,
            width = SEQUENCE_DIGITS
        )
    }
}

impl FromStr for Serial {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Serial::parse(s)
    }
}

impl TryFrom<String> for Serial {
    type Error = CoreError;

    fn try_from(s: String) -> CoreResult<Self> {
        Serial::parse(&s)
    }
}

impl From<Serial> for String {
    fn from(serial: Serial) -> Self {
        serial.to_string()
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Returns true only for `Q-YYYY-NNNNNN` with year 2000..=9999 and a
/// zero-padded sequence 000001..=999999.
pub fn is_valid_serial(s: &str) -> bool {
    split_canonical(s).is_some()
}

fn split_canonical(s: &str) -> Option<(i32, u32)> {
    let mut parts = s.split('-');
    let (prefix, year, number) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || prefix != SERIAL_PREFIX {
        return None;
    }

    if year.len() != 4 || !all_digits(year) {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return None;
    }

    if number.len() != SEQUENCE_DIGITS || !all_digits(number) {
        return None;
    }
    let sequence: u32 = number.parse().ok()?;
    if sequence == 0 {
        return None;
    }

    Some((year, sequence))
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn check_year(year: i32) -> CoreResult<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(CoreError::InvalidSerialYear { year });
    }
    Ok(())
}

// =============================================================================
// Allocation
// =============================================================================

/// Why an issued serial for the target year could not be ranked normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SerialAnomalyKind {
    /// The sequence part is not a number. Ranked as 0.
    Unparseable,
    /// The sequence is 0 or above 999999. Ranked as 0.
    OutOfRange,
    /// A valid number that is not six zero-padded digits (`Q-2025-7`).
    /// Ranked by its value.
    NonCanonical,
}

/// An issued serial that did not match the canonical format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SerialAnomaly {
    pub serial: String,
    pub kind: SerialAnomalyKind,
}

/// The outcome of [`next_serial`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialAllocation {
    pub serial: Serial,
    /// Malformed entries seen for the target year. Non-fatal.
    pub anomalies: Vec<SerialAnomaly>,
}

/// Computes the next serial for `year` from every serial issued so far.
///
/// `issued` may hold serials of any year in any order; only entries starting
/// with `Q-<year>-` are considered. Soft-deleted quotations must be included
/// so their numbers are never handed out again.
///
/// ## Errors
/// - [`CoreError::InvalidSerialYear`] for a year outside 2000..=9999
/// - [`CoreError::SerialSpaceExhausted`] when `Q-<year>-999999` is issued
pub fn next_serial<'a, I>(year: i32, issued: I) -> CoreResult<SerialAllocation>
where
    I: IntoIterator<Item = &'a str>,
{
    check_year(year)?;

    let year_prefix = format!("{SERIAL_PREFIX}-{year}-");
    let mut max_rank: u32 = 0;
    let mut anomalies = Vec::new();

    for entry in issued {
        let Some(rest) = entry.strip_prefix(year_prefix.as_str()) else {
            continue;
        };

        let (rank, anomaly) = rank_sequence(rest);
        if let Some(kind) = anomaly {
            anomalies.push(SerialAnomaly {
                serial: entry.to_string(),
                kind,
            });
        }
        max_rank = max_rank.max(rank);
    }

    if max_rank >= MAX_SEQUENCE {
        return Err(CoreError::SerialSpaceExhausted { year });
    }

    Ok(SerialAllocation {
        serial: Serial {
            year,
            sequence: max_rank + 1,
        },
        anomalies,
    })
}

fn rank_sequence(rest: &str) -> (u32, Option<SerialAnomalyKind>) {
    if !all_digits(rest) {
        return (0, Some(SerialAnomalyKind::Unparseable));
    }

    match rest.parse::<u32>() {
        Ok(n) if (1..=MAX_SEQUENCE).contains(&n) => {
            if rest.len() == SEQUENCE_DIGITS {
                (n, None)
            } else {
                (n, Some(SerialAnomalyKind::NonCanonical))
            }
        }
        // Zero, above the six-digit range, or too long to fit in a u32
        _ => (0, Some(SerialAnomalyKind::OutOfRange)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_serial_follows_max() {
        let next = next_serial(2025, ["Q-2025-000001", "Q-2025-000007"]).unwrap();
        assert_eq!(next.serial.to_string(), "Q-2025-000008");
        assert!(next.anomalies.is_empty());
    }

    #[test]
    fn test_next_serial_cold_start() {
        let next = next_serial(2025, []).unwrap();
        assert_eq!(next.serial.to_string(), "Q-2025-000001");
    }

    #[test]
    fn test_next_serial_ignores_other_years() {
        let next = next_serial(2025, ["Q-2024-000950", "Q-2026-000003"]).unwrap();
        assert_eq!(next.serial.to_string(), "Q-2025-000001");

        let next = next_serial(2025, ["Q-2024-000950", "Q-2025-000002"]).unwrap();
        assert_eq!(next.serial.to_string(), "Q-2025-000003");
    }

    #[test]
    fn test_next_serial_order_does_not_matter() {
        let a = next_serial(2025, ["Q-2025-000010", "Q-2025-000003", "Q-2025-000009"]).unwrap();
        let b = next_serial(2025, ["Q-2025-000003", "Q-2025-000009", "Q-2025-000010"]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.serial.sequence(), 11);
    }

    #[test]
    fn test_unparseable_entry_ranks_zero() {
        let next = next_serial(2025, ["Q-2025-abc"]).unwrap();
        assert_eq!(next.serial.to_string(), "Q-2025-000001");
        assert_eq!(
            next.anomalies,
            vec![SerialAnomaly {
                serial: "Q-2025-abc".to_string(),
                kind: SerialAnomalyKind::Unparseable,
            }]
        );
    }

    #[test]
    fn test_out_of_range_entries_rank_zero() {
        let next = next_serial(
            2025,
            ["Q-2025-000004", "Q-2025-000000", "Q-2025-1000000", "Q-2025-99999999999"],
        )
        .unwrap();
        assert_eq!(next.serial.sequence(), 5);
        assert_eq!(next.anomalies.len(), 3);
        assert!(next
            .anomalies
            .iter()
            .all(|a| a.kind == SerialAnomalyKind::OutOfRange));
    }

    #[test]
    fn test_non_canonical_entry_ranks_by_value() {
        let next = next_serial(2025, ["Q-2025-000003", "Q-2025-7"]).unwrap();
        assert_eq!(next.serial.to_string(), "Q-2025-000008");
        assert_eq!(next.anomalies.len(), 1);
        assert_eq!(next.anomalies[0].kind, SerialAnomalyKind::NonCanonical);
    }

    #[test]
    fn test_exhausted_year_is_an_error() {
        let err = next_serial(2025, ["Q-2025-999999"]).unwrap_err();
        assert_eq!(err, CoreError::SerialSpaceExhausted { year: 2025 });

        let next = next_serial(2025, ["Q-2025-999998"]).unwrap();
        assert_eq!(next.serial.to_string(), "Q-2025-999999");
    }

    #[test]
    fn test_year_out_of_range_is_rejected() {
        assert_eq!(
            next_serial(1999, []).unwrap_err(),
            CoreError::InvalidSerialYear { year: 1999 }
        );
        assert_eq!(
            next_serial(10_000, []).unwrap_err(),
            CoreError::InvalidSerialYear { year: 10_000 }
        );
    }

    #[test]
    fn test_is_valid_serial() {
        assert!(is_valid_serial("Q-2025-000001"));
        assert!(is_valid_serial("Q-9999-999999"));
        assert!(is_valid_serial("Q-2000-000001"));

        assert!(!is_valid_serial("Q-2025-1"));
        assert!(!is_valid_serial("Q-25-000001"));
        assert!(!is_valid_serial("Q-1999-000001"));
        assert!(!is_valid_serial("Q-2025-000000"));
        assert!(!is_valid_serial("Q-2025-1000000"));
        assert!(!is_valid_serial("X-2025-000001"));
        assert!(!is_valid_serial("Q-2025-000001-1"));
        assert!(!is_valid_serial("Q-2025-+00001"));
        assert!(!is_valid_serial(""));
    }

    #[test]
    fn test_serial_display_and_parse() {
        let serial = Serial::new(2025, 42).unwrap();
        assert_eq!(serial.to_string(), "Q-2025-000042");
        assert_eq!("Q-2025-000042".parse::<Serial>().unwrap(), serial);
        assert!("Q-2025-42".parse::<Serial>().is_err());
    }

    #[test]
    fn test_serial_new_bounds() {
        assert!(Serial::new(2025, 0).is_err());
        assert!(Serial::new(2025, MAX_SEQUENCE + 1).is_err());
        assert_eq!(
            Serial::new(1999, 1).unwrap_err(),
            CoreError::InvalidSerialYear { year: 1999 }
        );
    }

    #[test]
    fn test_serial_ordering() {
        let a = Serial::new(2024, 999).unwrap();
        let b = Serial::new(2025, 1).unwrap();
        let c = Serial::new(2025, 2).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_serial_serde_as_string() {
        let serial = Serial::new(2025, 8).unwrap();
        let json = serde_json::to_string(&serial).unwrap();
        assert_eq!(json, "\"Q-2025-000008\"");

        let back: Serial = serde_json::from_str(&json).unwrap();
        assert_eq!(back, serial);
        assert!(serde_json::from_str::<Serial>("\"Q-2025-8\"").is_err());
    }
}
