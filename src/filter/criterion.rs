//! Leaf criteria: a single field/operator/value test

use crate::entry::{FieldValue, FilterableEntry};
use crate::errors::ExpressionError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::warn;

/// Comparison operators a criterion can apply to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Between,
    Regex,
}

impl ComparisonOperator {
    /// Get the canonical name of this operator (the persisted form).
    pub fn canonical_name(&self) -> &'static str {
        match self {
            ComparisonOperator::Equals => "Equals",
            ComparisonOperator::NotEquals => "NotEquals",
            ComparisonOperator::Contains => "Contains",
            ComparisonOperator::NotContains => "NotContains",
            ComparisonOperator::StartsWith => "StartsWith",
            ComparisonOperator::EndsWith => "EndsWith",
            ComparisonOperator::GreaterThan => "GreaterThan",
            ComparisonOperator::LessThan => "LessThan",
            ComparisonOperator::GreaterThanOrEqual => "GreaterThanOrEqual",
            ComparisonOperator::LessThanOrEqual => "LessThanOrEqual",
            ComparisonOperator::Between => "Between",
            ComparisonOperator::Regex => "Regex",
        }
    }

    /// Whether this operator needs a numeric or temporal field to be useful.
    pub fn requires_ordered_field(&self) -> bool {
        matches!(
            self,
            ComparisonOperator::GreaterThan
                | ComparisonOperator::LessThan
                | ComparisonOperator::GreaterThanOrEqual
                | ComparisonOperator::LessThanOrEqual
                | ComparisonOperator::Between
        )
    }
}

impl FromStr for ComparisonOperator {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "equals" => Ok(ComparisonOperator::Equals),
            "notequals" => Ok(ComparisonOperator::NotEquals),
            "contains" => Ok(ComparisonOperator::Contains),
            "notcontains" => Ok(ComparisonOperator::NotContains),
            "startswith" => Ok(ComparisonOperator::StartsWith),
            "endswith" => Ok(ComparisonOperator::EndsWith),
            "greaterthan" => Ok(ComparisonOperator::GreaterThan),
            "lessthan" => Ok(ComparisonOperator::LessThan),
            "greaterthanorequal" => Ok(ComparisonOperator::GreaterThanOrEqual),
            "lessthanorequal" => Ok(ComparisonOperator::LessThanOrEqual),
            "between" => Ok(ComparisonOperator::Between),
            "regex" => Ok(ComparisonOperator::Regex),
            _ => Err(ExpressionError::UnknownComparisonOperator(s.to_string())),
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// A single field/operator/value test, the leaf of a filter expression.
///
/// Immutable once part of an evaluated tree. The compiled regex for the
/// `Regex` operator is cached on first use; evaluation may run concurrently
/// across partitions, so the cache is a write-once cell.
#[derive(Debug, Clone)]
pub struct Criterion {
    pub field: String,
    pub operator: ComparisonOperator,
    pub value: String,
    /// Upper bound, only meaningful for `Between`.
    pub value_to: Option<String>,
    compiled_regex: OnceLock<Option<Regex>>,
}

impl PartialEq for Criterion {
    fn eq(&self, other: &Self) -> bool {
        // The regex cache is derived state and does not take part in equality.
        self.field == other.field
            && self.operator == other.operator
            && self.value == other.value
            && self.value_to == other.value_to
    }
}

impl Criterion {
    pub fn new(
        field: impl Into<String>,
        operator: ComparisonOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            value_to: None,
            compiled_regex: OnceLock::new(),
        }
    }

    /// Build a `Between` criterion with inclusive bounds.
    pub fn between(
        field: impl Into<String>,
        low: impl Into<String>,
        high: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: ComparisonOperator::Between,
            value: low.into(),
            value_to: Some(high.into()),
            compiled_regex: OnceLock::new(),
        }
    }

    /// Evaluate this criterion against one entry.
    ///
    /// Never fails: unknown fields, type mismatches, and unparseable or
    /// uncompilable criterion values all evaluate to a non-match.
    pub fn matches<E: FilterableEntry>(&self, entry: &E) -> bool {
        let Some(value) = entry.field(&self.field) else {
            warn!(field = %self.field, "filter criterion references an unknown field");
            return false;
        };

        if value.is_null() {
            // An absent value can only satisfy the negative string operators.
            return matches!(
                self.operator,
                ComparisonOperator::NotEquals | ComparisonOperator::NotContains
            ) && !self.value.is_empty();
        }

        match self.operator {
            ComparisonOperator::Equals => eq_ci(&value.display_text(), &self.value),
            ComparisonOperator::NotEquals => !eq_ci(&value.display_text(), &self.value),
            ComparisonOperator::Contains => contains_ci(&value.display_text(), &self.value),
            ComparisonOperator::NotContains => !contains_ci(&value.display_text(), &self.value),
            ComparisonOperator::StartsWith => value
                .display_text()
                .to_lowercase()
                .starts_with(&self.value.to_lowercase()),
            ComparisonOperator::EndsWith => value
                .display_text()
                .to_lowercase()
                .ends_with(&self.value.to_lowercase()),
            ComparisonOperator::GreaterThan => {
                matches!(self.ordered_cmp(&value), Some(Ordering::Greater))
            }
            ComparisonOperator::LessThan => {
                matches!(self.ordered_cmp(&value), Some(Ordering::Less))
            }
            ComparisonOperator::GreaterThanOrEqual => matches!(
                self.ordered_cmp(&value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            ComparisonOperator::LessThanOrEqual => matches!(
                self.ordered_cmp(&value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            ComparisonOperator::Between => self.matches_between(&value),
            ComparisonOperator::Regex => self
                .compiled_regex()
                .map(|re| re.is_match(&value.display_text()))
                .unwrap_or(false),
        }
    }

    /// Compare the field value against `self.value` on the numeric or
    /// temporal axis. `None` when either side is not comparable.
    fn ordered_cmp(&self, value: &FieldValue<'_>) -> Option<Ordering> {
        if let Some(number) = value.as_number() {
            let target: f64 = self.value.trim().parse().ok()?;
            number.partial_cmp(&target)
        } else if let Some(ts) = value.as_timestamp() {
            let target = parse_temporal(&self.value)?;
            Some(ts.cmp(&target))
        } else {
            None
        }
    }

    fn matches_between(&self, value: &FieldValue<'_>) -> bool {
        let Some(high_raw) = self.value_to.as_deref() else {
            return false;
        };

        if let Some(number) = value.as_number() {
            let (Ok(low), Ok(high)) = (
                self.value.trim().parse::<f64>(),
                high_raw.trim().parse::<f64>(),
            ) else {
                return false;
            };
            low <= high && number >= low && number <= high
        } else if let Some(ts) = value.as_timestamp() {
            let (Some(low), Some(high)) = (parse_temporal(&self.value), parse_temporal(high_raw))
            else {
                return false;
            };
            low <= high && ts >= low && ts <= high
        } else {
            false
        }
    }

    /// Compile-once regex cache. A pattern that fails to compile makes the
    /// criterion evaluate false for every entry of the run.
    fn compiled_regex(&self) -> Option<&Regex> {
        self.compiled_regex
            .get_or_init(|| {
                match RegexBuilder::new(&self.value).case_insensitive(true).build() {
                    Ok(re) => Some(re),
                    Err(err) => {
                        warn!(pattern = %self.value, %err, "filter regex failed to compile");
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Whether this criterion's regex pattern compiles. Used by validation.
    pub fn regex_compiles(&self) -> bool {
        self.operator != ComparisonOperator::Regex || self.compiled_regex().is_some()
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.operator, &self.value_to) {
            (ComparisonOperator::Between, Some(high)) => {
                write!(f, "{} Between \"{}\" and \"{}\"", self.field, self.value, high)
            }
            _ => write!(f, "{} {} \"{}\"", self.field, self.operator, self.value),
        }
    }
}

fn eq_ci(haystack: &str, needle: &str) -> bool {
    haystack.eq_ignore_ascii_case(needle)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Parse a criterion value on the temporal axis. Accepts RFC 3339, a plain
/// `YYYY-MM-DD HH:MM:SS` datetime, or a bare `YYYY-MM-DD` date (midnight UTC).
fn parse_temporal(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::LogEntry;
    use chrono::TimeZone;

    fn entry(level: &str, message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
            level: level.to_string(),
            component: "core".to_string(),
            message: message.to_string(),
            logger: None,
            thread: None,
        }
    }

    #[test]
    fn equals_is_case_insensitive() {
        let log = entry("ERROR", "boom");
        assert!(Criterion::new("Level", ComparisonOperator::Equals, "error").matches(&log));
        assert!(Criterion::new("Level", ComparisonOperator::Equals, "ErRoR").matches(&log));
        assert!(!Criterion::new("Level", ComparisonOperator::Equals, "WARN").matches(&log));
    }

    #[test]
    fn contains_and_negations() {
        let log = entry("INFO", "Connection Timeout Error");
        assert!(Criterion::new("Message", ComparisonOperator::Contains, "timeout").matches(&log));
        assert!(!Criterion::new("Message", ComparisonOperator::NotContains, "timeout").matches(&log));
        assert!(Criterion::new("Message", ComparisonOperator::NotContains, "disk").matches(&log));
    }

    #[test]
    fn starts_and_ends_with() {
        let log = entry("INFO", "Connection refused");
        assert!(Criterion::new("Message", ComparisonOperator::StartsWith, "conn").matches(&log));
        assert!(Criterion::new("Message", ComparisonOperator::EndsWith, "REFUSED").matches(&log));
        assert!(!Criterion::new("Message", ComparisonOperator::StartsWith, "refused").matches(&log));
    }

    #[test]
    fn unknown_field_never_matches() {
        let log = entry("ERROR", "boom");
        assert!(!Criterion::new("NoSuchField", ComparisonOperator::Equals, "x").matches(&log));
        assert!(!Criterion::new("NoSuchField", ComparisonOperator::NotEquals, "x").matches(&log));
    }

    #[test]
    fn null_field_matches_only_negative_operators() {
        let log = entry("ERROR", "boom");
        assert!(Criterion::new("Logger", ComparisonOperator::NotEquals, "x").matches(&log));
        assert!(Criterion::new("Logger", ComparisonOperator::NotContains, "x").matches(&log));
        assert!(!Criterion::new("Logger", ComparisonOperator::NotEquals, "").matches(&log));
        assert!(!Criterion::new("Logger", ComparisonOperator::Equals, "x").matches(&log));
        assert!(!Criterion::new("Logger", ComparisonOperator::Contains, "x").matches(&log));
    }

    #[test]
    fn ordering_on_text_field_never_matches() {
        let log = entry("ERROR", "42");
        assert!(!Criterion::new("Message", ComparisonOperator::GreaterThan, "1").matches(&log));
    }

    #[test]
    fn between_is_inclusive() {
        let iis = crate::entry::IisEntry {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap(),
            client_ip: "10.0.0.1".to_string(),
            method: "GET".to_string(),
            uri_stem: "/index.html".to_string(),
            uri_query: None,
            status: 200,
            time_taken_ms: 150,
            bytes_sent: 512,
            user_agent: None,
        };
        assert!(Criterion::between("TimeTakenMs", "100", "200").matches(&iis));
        assert!(Criterion::between("Status", "100", "200").matches(&iis));
        assert!(!Criterion::between("BytesSent", "100", "200").matches(&iis));
        // Inverted bounds never match.
        assert!(!Criterion::between("TimeTakenMs", "200", "100").matches(&iis));
    }

    #[test]
    fn regex_is_case_insensitive_and_cached() {
        let log = entry("ERROR", "Request 42 timed out");
        let criterion = Criterion::new("Message", ComparisonOperator::Regex, r"request \d+");
        assert!(criterion.matches(&log));
        assert!(criterion.matches(&log));
        assert!(criterion.regex_compiles());
    }

    #[test]
    fn invalid_regex_degrades_to_false() {
        let log = entry("ERROR", "anything");
        let criterion = Criterion::new("Message", ComparisonOperator::Regex, r"[unclosed");
        assert!(!criterion.matches(&log));
        assert!(!criterion.regex_compiles());
    }

    #[test]
    fn temporal_comparisons() {
        let log = entry("INFO", "x");
        assert!(
            Criterion::new("Timestamp", ComparisonOperator::GreaterThan, "2026-03-14").matches(&log)
        );
        assert!(
            Criterion::new(
                "Timestamp",
                ComparisonOperator::LessThan,
                "2026-03-14T10:00:00Z"
            )
            .matches(&log)
        );
        assert!(
            !Criterion::new("Timestamp", ComparisonOperator::GreaterThan, "not-a-date")
                .matches(&log)
        );
    }

    #[test]
    fn operator_round_trips_through_canonical_name() {
        let all = [
            ComparisonOperator::Equals,
            ComparisonOperator::NotEquals,
            ComparisonOperator::Contains,
            ComparisonOperator::NotContains,
            ComparisonOperator::StartsWith,
            ComparisonOperator::EndsWith,
            ComparisonOperator::GreaterThan,
            ComparisonOperator::LessThan,
            ComparisonOperator::GreaterThanOrEqual,
            ComparisonOperator::LessThanOrEqual,
            ComparisonOperator::Between,
            ComparisonOperator::Regex,
        ];
        for op in all {
            assert_eq!(op.canonical_name().parse::<ComparisonOperator>().unwrap(), op);
        }
        assert!("Xor".parse::<ComparisonOperator>().is_err());
    }
}
