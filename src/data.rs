use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Guid(Uuid),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Decimal(d) => d.normalize().to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Time(t) => t.format("%H:%M:%S").to_string(),
            Value::Guid(g) => g.to_string(),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::String(_) => ColumnType::String,
            Value::Integer(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Float,
            Value::Decimal(_) => ColumnType::Decimal,
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Date(_) => ColumnType::Date,
            Value::DateTime(_) => ColumnType::DateTime,
            Value::Time(_) => ColumnType::Time,
            Value::Guid(_) => ColumnType::Guid,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            other => serde_json::Value::String(other.as_display()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
    Guid,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Decimal => "decimal",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Time => "time",
            ColumnType::Guid => "guid",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "string", "integer", "float", "decimal", "boolean", "date", "datetime", "time", "guid",
        ]
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "string" | "text" => Ok(ColumnType::String),
            "integer" | "int" => Ok(ColumnType::Integer),
            "float" | "double" => Ok(ColumnType::Float),
            "decimal" | "number" => Ok(ColumnType::Decimal),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "date" => Ok(ColumnType::Date),
            "datetime" | "date-time" | "timestamp" => Ok(ColumnType::DateTime),
            "time" => Ok(ColumnType::Time),
            "guid" | "uuid" => Ok(ColumnType::Guid),
            _ => Err(anyhow!(
                "Unknown column type '{value}'. Supported types: {}",
                ColumnType::variants().join(", ")
            )),
        }
    }
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        ColumnType::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueFormat {
    pub pattern: Option<String>,
    pub decimal_separator: Option<char>,
    pub grouping_separator: Option<char>,
}

impl ValueFormat {
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub fn localized_number(decimal_separator: char, grouping_separator: Option<char>) -> Self {
        Self {
            pattern: None,
            decimal_separator: Some(decimal_separator),
            grouping_separator,
        }
    }

    pub fn normalize_number<'a>(&self, value: &'a str) -> std::borrow::Cow<'a, str> {
        if self.decimal_separator.is_none() && self.grouping_separator.is_none() {
            return std::borrow::Cow::Borrowed(value);
        }
        let mut normalized = String::with_capacity(value.len());
        for ch in value.trim().chars() {
            if Some(ch) == self.grouping_separator {
                continue;
            }
            if Some(ch) == self.decimal_separator {
                normalized.push('.');
            } else {
                normalized.push(ch);
            }
        }
        std::borrow::Cow::Owned(normalized)
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

pub fn parse_naive_time(value: &str) -> Result<NaiveTime> {
    const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];
    for fmt in TIME_FORMATS {
        if let Ok(parsed) = NaiveTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as time"))
}

/// Partial patterns such as `%Y-%m` are completed with the first day of the
/// month so year/month columns still yield a date.
fn parse_date_with_pattern(value: &str, pattern: &str) -> Result<NaiveDate> {
    if let Ok(parsed) = NaiveDate::parse_from_str(value, pattern) {
        return Ok(parsed);
    }
    NaiveDate::parse_from_str(&format!("{value}-01"), &format!("{pattern}-%d"))
        .with_context(|| format!("Failed to parse '{value}' as date with pattern '{pattern}'"))
}

pub fn parse_typed_value(
    value: &str,
    ty: &ColumnType,
    format: Option<&ValueFormat>,
) -> Result<Option<Value>> {
    if value.is_empty() {
        return Ok(None);
    }
    let pattern = format.and_then(|f| f.pattern.as_deref());
    let parsed = match ty {
        ColumnType::String => Value::String(value.to_string()),
        ColumnType::Integer => {
            let number = numeric_text(value, format);
            let parsed: i64 = number
                .trim()
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as integer"))?;
            Value::Integer(parsed)
        }
        ColumnType::Float => {
            let number = numeric_text(value, format);
            let parsed: f64 = number
                .trim()
                .parse()
                .with_context(|| format!("Failed to parse '{value}' as float"))?;
            Value::Float(parsed)
        }
        ColumnType::Decimal => {
            let number = numeric_text(value, format);
            let parsed = Decimal::from_str(number.trim())
                .with_context(|| format!("Failed to parse '{value}' as decimal"))?;
            Value::Decimal(parsed)
        }
        ColumnType::Boolean => {
            let lowered = value.trim().to_ascii_lowercase();
            let parsed = match lowered.as_str() {
                "true" | "t" | "yes" | "y" | "1" => true,
                "false" | "f" | "no" | "n" | "0" => false,
                _ => bail!("Failed to parse '{value}' as boolean"),
            };
            Value::Boolean(parsed)
        }
        ColumnType::Date => match pattern {
            Some(pattern) => Value::Date(parse_date_with_pattern(value, pattern)?),
            None => Value::Date(parse_naive_date(value)?),
        },
        ColumnType::DateTime => match pattern {
            Some(pattern) => Value::DateTime(
                NaiveDateTime::parse_from_str(value, pattern).with_context(|| {
                    format!("Failed to parse '{value}' as datetime with pattern '{pattern}'")
                })?,
            ),
            None => Value::DateTime(parse_naive_datetime(value)?),
        },
        ColumnType::Time => match pattern {
            Some(pattern) => Value::Time(NaiveTime::parse_from_str(value, pattern).with_context(
                || format!("Failed to parse '{value}' as time with pattern '{pattern}'"),
            )?),
            None => Value::Time(parse_naive_time(value)?),
        },
        ColumnType::Guid => {
            let trimmed = value.trim().trim_matches(|c| matches!(c, '{' | '}'));
            let parsed = Uuid::parse_str(trimmed)
                .with_context(|| format!("Failed to parse '{value}' as GUID"))?;
            Value::Guid(parsed)
        }
    };
    Ok(Some(parsed))
}

fn numeric_text<'a>(value: &'a str, format: Option<&ValueFormat>) -> std::borrow::Cow<'a, str> {
    match format {
        Some(format) => format.normalize_number(value),
        None => std::borrow::Cow::Borrowed(value),
    }
}

pub trait FromValue: Sized {
    const COLUMN_TYPE: ColumnType;

    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! from_value_impl {
    ($ty:ty, $column:ident, $variant:ident) => {
        impl FromValue for $ty {
            const COLUMN_TYPE: ColumnType = ColumnType::$column;

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => Err(anyhow!(
                        "Expected {} value, got {}",
                        ColumnType::$column,
                        other.column_type()
                    )),
                }
            }
        }
    };
}

from_value_impl!(String, String, String);
from_value_impl!(i64, Integer, Integer);
from_value_impl!(f64, Float, Float);
from_value_impl!(Decimal, Decimal, Decimal);
from_value_impl!(bool, Boolean, Boolean);
from_value_impl!(NaiveDate, Date, Date);
from_value_impl!(NaiveDateTime, DateTime, DateTime);
from_value_impl!(NaiveTime, Time, Time);
from_value_impl!(Uuid, Guid, Guid);

impl FromValue for Value {
    const COLUMN_TYPE: ColumnType = ColumnType::String;

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}
