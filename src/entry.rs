//! Entry records and typed field access
//!
//! The engine never inspects a concrete log format directly. Each entry type
//! exposes a field-accessor table mapping field-name strings to typed values,
//! and the evaluator works purely through that lookup. An unknown field name
//! is an explicit `None` outcome, never a panic.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A typed value produced by an entry's field accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    /// The field exists in the entry's schema but carries no value here.
    Null,
}

impl FieldValue<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Display form used by the string comparison operators.
    pub fn display_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Text(s) => Cow::Borrowed(s),
            FieldValue::Integer(i) => Cow::Owned(i.to_string()),
            FieldValue::Float(f) => Cow::Owned(f.to_string()),
            FieldValue::Timestamp(ts) => {
                Cow::Owned(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            FieldValue::Null => Cow::Borrowed(""),
        }
    }

    /// Numeric form, if this value is numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Temporal form, if this value is a timestamp.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Timestamp,
}

impl FieldKind {
    /// Whether ordering comparisons (`GreaterThan` etc.) apply to this kind.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, FieldKind::Text)
    }
}

/// Name-to-kind table describing the fields one entry type exposes.
///
/// Used by configuration validation to warn about unknown field names and
/// operator/kind mismatches before any entry is evaluated.
#[derive(Debug)]
pub struct FieldSchema {
    pub fields: &'static [(&'static str, FieldKind)],
}

impl FieldSchema {
    /// Look up the declared kind of a field, case-insensitively.
    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, kind)| *kind)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().map(|(field, _)| *field)
    }
}

/// An entry record the engine can evaluate filters against.
pub trait FilterableEntry {
    /// The field table for this entry type.
    fn schema() -> &'static FieldSchema
    where
        Self: Sized;

    /// Resolve a field by name (case-insensitive).
    ///
    /// `None` means the schema has no such field; `Some(FieldValue::Null)`
    /// means the field exists but has no value for this entry.
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;
}

/// A generic application log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub component: String,
    pub message: String,
    pub logger: Option<String>,
    pub thread: Option<String>,
}

static LOG_ENTRY_SCHEMA: FieldSchema = FieldSchema {
    fields: &[
        ("Timestamp", FieldKind::Timestamp),
        ("Level", FieldKind::Text),
        ("Component", FieldKind::Text),
        ("Message", FieldKind::Text),
        ("Logger", FieldKind::Text),
        ("Thread", FieldKind::Text),
    ],
};

impl FilterableEntry for LogEntry {
    fn schema() -> &'static FieldSchema {
        &LOG_ENTRY_SCHEMA
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match name.to_ascii_lowercase().as_str() {
            "timestamp" => FieldValue::Timestamp(self.timestamp),
            "level" => FieldValue::Text(&self.level),
            "component" => FieldValue::Text(&self.component),
            "message" => FieldValue::Text(&self.message),
            "logger" => optional_text(&self.logger),
            "thread" => optional_text(&self.thread),
            _ => return None,
        };
        Some(value)
    }
}

/// A single IIS W3C access-log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IisEntry {
    pub timestamp: DateTime<Utc>,
    pub client_ip: String,
    pub method: String,
    pub uri_stem: String,
    pub uri_query: Option<String>,
    pub status: i64,
    pub time_taken_ms: i64,
    pub bytes_sent: i64,
    pub user_agent: Option<String>,
}

static IIS_ENTRY_SCHEMA: FieldSchema = FieldSchema {
    fields: &[
        ("Timestamp", FieldKind::Timestamp),
        ("ClientIp", FieldKind::Text),
        ("Method", FieldKind::Text),
        ("UriStem", FieldKind::Text),
        ("UriQuery", FieldKind::Text),
        ("Status", FieldKind::Integer),
        ("TimeTakenMs", FieldKind::Integer),
        ("BytesSent", FieldKind::Integer),
        ("UserAgent", FieldKind::Text),
    ],
};

impl FilterableEntry for IisEntry {
    fn schema() -> &'static FieldSchema {
        &IIS_ENTRY_SCHEMA
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match name.to_ascii_lowercase().as_str() {
            "timestamp" => FieldValue::Timestamp(self.timestamp),
            "clientip" => FieldValue::Text(&self.client_ip),
            "method" => FieldValue::Text(&self.method),
            "uristem" => FieldValue::Text(&self.uri_stem),
            "uriquery" => optional_text(&self.uri_query),
            "status" => FieldValue::Integer(self.status),
            "timetakenms" => FieldValue::Integer(self.time_taken_ms),
            "bytessent" => FieldValue::Integer(self.bytes_sent),
            "useragent" => optional_text(&self.user_agent),
            _ => return None,
        };
        Some(value)
    }
}

/// A message-broker log entry (queue activity, delivery events).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerEntry {
    pub timestamp: DateTime<Utc>,
    pub queue: String,
    pub message_id: String,
    pub level: String,
    pub message: String,
    pub payload_size: i64,
    pub consumer: Option<String>,
}

static BROKER_ENTRY_SCHEMA: FieldSchema = FieldSchema {
    fields: &[
        ("Timestamp", FieldKind::Timestamp),
        ("Queue", FieldKind::Text),
        ("MessageId", FieldKind::Text),
        ("Level", FieldKind::Text),
        ("Message", FieldKind::Text),
        ("PayloadSize", FieldKind::Integer),
        ("Consumer", FieldKind::Text),
    ],
};

impl FilterableEntry for BrokerEntry {
    fn schema() -> &'static FieldSchema {
        &BROKER_ENTRY_SCHEMA
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match name.to_ascii_lowercase().as_str() {
            "timestamp" => FieldValue::Timestamp(self.timestamp),
            "queue" => FieldValue::Text(&self.queue),
            "messageid" => FieldValue::Text(&self.message_id),
            "level" => FieldValue::Text(&self.level),
            "message" => FieldValue::Text(&self.message),
            "payloadsize" => FieldValue::Integer(self.payload_size),
            "consumer" => optional_text(&self.consumer),
            _ => return None,
        };
        Some(value)
    }
}

fn optional_text(value: &Option<String>) -> FieldValue<'_> {
    match value {
        Some(text) => FieldValue::Text(text),
        None => FieldValue::Null,
    }
}
