//! Event types for the occupancy log.

use crate::ValidationError;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Naive timestamp layouts accepted from the provider, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Largest people count accepted for one event. Keeps every running total
/// far inside `i64`.
pub const MAX_EVENT_VALUE: i64 = u32::MAX as i64;

/// Years the fixed-width stored form can represent.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 0..=9999;

/// Whether people came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Entry,
    Exit,
}

impl EventKind {
    /// Canonical name, as stored in the `type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
        }
    }

    /// Signed contribution of `value` people to the occupancy count.
    pub fn delta(self, value: i64) -> i64 {
        match self {
            Self::Entry => value,
            Self::Exit => -value,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    /// Accepts the canonical names and the provider's French vocabulary.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" | "entree" => Ok(Self::Entry),
            "exit" | "sortie" => Ok(Self::Exit),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// An event row exactly as the provider sent it.
///
/// Fields are kept untyped so a single malformed row is reported on its own
/// instead of failing the whole payload decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub timestamp: Value,
    #[serde(rename = "type", default)]
    pub kind: Value,
    #[serde(default)]
    pub value: Value,
}

impl RawEvent {
    pub fn new(
        timestamp: impl Into<Value>,
        kind: impl Into<Value>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Validate this row into an [`Event`].
    pub fn validate(&self) -> Result<Event, ValidationError> {
        let timestamp = match &self.timestamp {
            Value::Null => return Err(ValidationError::MissingField("timestamp")),
            Value::String(s) => parse_timestamp(s)
                .ok_or_else(|| ValidationError::InvalidTimestamp(s.clone()))?,
            other => return Err(ValidationError::InvalidTimestamp(other.to_string())),
        };

        let kind = match &self.kind {
            Value::Null => return Err(ValidationError::MissingField("type")),
            Value::String(s) => s.parse()?,
            other => return Err(ValidationError::UnknownKind(other.to_string())),
        };

        let value = match &self.value {
            Value::Null => return Err(ValidationError::MissingField("value")),
            Value::Number(n) => match n.as_i64() {
                Some(v) if v < 0 => return Err(ValidationError::NegativeValue(v)),
                Some(v) if v > MAX_EVENT_VALUE => {
                    return Err(ValidationError::ValueTooLarge(v));
                }
                Some(v) => v,
                None => return Err(ValidationError::InvalidValue(n.to_string())),
            },
            other => return Err(ValidationError::InvalidValue(other.to_string())),
        };

        Ok(Event {
            timestamp,
            kind,
            value,
        })
    }
}

impl TryFrom<&RawEvent> for Event {
    type Error = ValidationError;

    fn try_from(raw: &RawEvent) -> Result<Self, Self::Error> {
        raw.validate()
    }
}

/// A validated occupancy event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    /// Number of people; never negative.
    pub value: i64,
}

impl Event {
    pub fn entry(timestamp: DateTime<Utc>, value: i64) -> Self {
        Self {
            timestamp,
            kind: EventKind::Entry,
            value,
        }
    }

    pub fn exit(timestamp: DateTime<Utc>, value: i64) -> Self {
        Self {
            timestamp,
            kind: EventKind::Exit,
            value,
        }
    }

    /// Signed change in occupancy caused by this event.
    pub fn delta(&self) -> i64 {
        self.kind.delta(self.value)
    }
}

/// An event together with the identifier the store assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: i64,
    #[serde(flatten)]
    pub event: Event,
}

impl AsRef<Event> for StoredEvent {
    fn as_ref(&self) -> &Event {
        &self.event
    }
}

/// Parse an ISO-8601 timestamp.
///
/// Offsets are converted to UTC; naive date-times and bare dates are taken
/// to be UTC already. Instants outside years 0000..=9999 (after conversion
/// to UTC) are rejected.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    parse_any(s.trim()).filter(|ts| YEAR_RANGE.contains(&ts.year()))
}

fn parse_any(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Fixed-width UTC form used in the store, so text order is time order.
///
/// Full nanosecond precision; only valid for years 0000..=9999.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn kind_accepts_both_vocabularies() {
        assert_eq!("entree".parse::<EventKind>().unwrap(), EventKind::Entry);
        assert_eq!("entry".parse::<EventKind>().unwrap(), EventKind::Entry);
        assert_eq!("sortie".parse::<EventKind>().unwrap(), EventKind::Exit);
        assert_eq!("exit".parse::<EventKind>().unwrap(), EventKind::Exit);
        assert_eq!(
            "Entree".parse::<EventKind>(),
            Err(ValidationError::UnknownKind("Entree".into()))
        );
    }

    #[test]
    fn parses_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T09:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T10:30:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 09:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn years_outside_four_digits_are_rejected() {
        assert_eq!(parse_timestamp("+10000-01-01T00:00:00"), None);
        assert_eq!(parse_timestamp("10000-01-01 00:00:00"), None);
        // Shifts into year -1 once converted to UTC.
        assert_eq!(parse_timestamp("0000-01-01T00:30:00+01:00"), None);
        assert!(parse_timestamp("9999-12-31T23:59:59Z").is_some());
        assert!(matches!(
            RawEvent::new("+10000-01-01T00:00:00", "entree", 1).validate(),
            Err(ValidationError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn nanoseconds_survive_formatting() {
        let ts = parse_timestamp("2024-03-01T09:00:00.000000900Z").unwrap();
        let text = format_timestamp(&ts);
        assert_eq!(text, "2024-03-01T09:00:00.000000900Z");
        assert_eq!(text.parse::<DateTime<Utc>>().unwrap(), ts);
    }

    #[test]
    fn value_cap_is_enforced() {
        let ts = "2024-03-01T09:30:00";
        assert_eq!(
            RawEvent::new(ts, "entree", MAX_EVENT_VALUE).validate().unwrap().value,
            MAX_EVENT_VALUE
        );
        assert_eq!(
            RawEvent::new(ts, "entree", MAX_EVENT_VALUE + 1).validate(),
            Err(ValidationError::ValueTooLarge(MAX_EVENT_VALUE + 1))
        );
        assert_eq!(
            RawEvent::new(ts, "sortie", i64::MAX).validate(),
            Err(ValidationError::ValueTooLarge(i64::MAX))
        );
    }

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        for late in [
            early + chrono::Duration::milliseconds(1500),
            early + chrono::Duration::nanoseconds(800),
        ] {
            assert!(format_timestamp(&early) < format_timestamp(&late));
            assert_eq!(format_timestamp(&early).len(), format_timestamp(&late).len());
        }
    }

    #[test]
    fn validate_good_row() {
        let raw = RawEvent::new("2024-03-01T09:30:00", "entree", 4);
        let event = raw.validate().unwrap();
        assert_eq!(event.kind, EventKind::Entry);
        assert_eq!(event.value, 4);
        assert_eq!(event.delta(), 4);
    }

    #[test]
    fn validate_rejects_bad_rows() {
        let ts = "2024-03-01T09:30:00";
        assert_eq!(
            RawEvent::new(ts, "sortie", -1).validate(),
            Err(ValidationError::NegativeValue(-1))
        );
        assert_eq!(
            RawEvent::new(ts, "transfer", 1).validate(),
            Err(ValidationError::UnknownKind("transfer".into()))
        );
        assert!(matches!(
            RawEvent::new("soon", "entree", 1).validate(),
            Err(ValidationError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            RawEvent::new(ts, "entree", 1.5).validate(),
            Err(ValidationError::InvalidValue(_))
        ));
    }

    #[test]
    fn missing_fields_decode_as_null() {
        let raw: RawEvent = serde_json::from_value(json!({"timestamp": "2024-03-01"})).unwrap();
        assert_eq!(raw.validate(), Err(ValidationError::MissingField("type")));
    }

    #[test]
    fn exit_delta_is_negative() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(Event::exit(ts, 3).delta(), -3);
    }
}
