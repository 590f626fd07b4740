//! Decoded column and parameter values.

use std::fmt;

use bytes::Bytes;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Calendar date from the binary protocol. All-zero is the MySQL zero date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MysqlDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl fmt::Display for MysqlDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// DATETIME / TIMESTAMP from the binary protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MysqlDateTime {
    pub date: MysqlDate,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub micros: u32,
}

impl fmt::Display for MysqlDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02}:{:02}:{:02}",
            self.date, self.hour, self.minute, self.second
        )?;
        if self.micros != 0 {
            write!(f, ".{:06}", self.micros)?;
        }
        Ok(())
    }
}

/// TIME from the binary protocol (a signed duration, may exceed 24h).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MysqlTime {
    pub negative: bool,
    pub days: u32,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub micros: u32,
}

impl fmt::Display for MysqlTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = u64::from(self.days) * 24 + u64::from(self.hour);
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{:02}:{:02}:{:02}", hours, self.minute, self.second)?;
        if self.micros != 0 {
            write!(f, ".{:06}", self.micros)?;
        }
        Ok(())
    }
}

/// A single decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    Date(MysqlDate),
    DateTime(MysqlDateTime),
    Time(MysqlTime),
    /// Character column decoded as UTF-8.
    String(String),
    /// Untyped bytes that turned out to be printable.
    Text(String),
    /// Untyped bytes that are not printable.
    Binary(Bytes),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Classify raw bytes of an untyped column.
    pub fn from_untyped(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(s) if s.chars().all(|c| !c.is_control() || c.is_whitespace()) => {
                Value::Text(s.to_owned())
            }
            _ => Value::Binary(Bytes::copy_from_slice(bytes)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(n) => write!(f, "{n}"),
            Value::UInt(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Double(n) => write!(f, "{n}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::String(s) | Value::Text(s) => f.write_str(s),
            Value::Binary(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::UInt(n) => serializer.serialize_u64(*n),
            Value::Float(n) => serializer.serialize_f32(*n),
            Value::Double(n) => serializer.serialize_f64(*n),
            Value::Date(_) | Value::DateTime(_) | Value::Time(_) => {
                serializer.collect_str(self)
            }
            Value::String(s) | Value::Text(s) => serializer.serialize_str(s),
            Value::Binary(b) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("binary", &hex::encode(b))?;
                map.end()
            }
        }
    }
}
