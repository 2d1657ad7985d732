use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::field_type::PrimitiveKind;

/// A decoded field value.
///
/// Scalars keep the exact width and signedness of their wire kind so that
/// re-encoding is lossless. Fields with more than one element (other than
/// strings) decode to [`Value::List`]; nested record types decode to
/// [`Value::Record`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Time(DateTime<Utc>),
    Str(String),
    Record(Record),
    List(Vec<Value>),
}

impl Value {
    /// Build an integer value of `kind` holding `n`, if it fits.
    ///
    /// Returns `None` for non-integer kinds.
    pub fn integer(kind: PrimitiveKind, n: u64) -> Option<Self> {
        match kind {
            PrimitiveKind::Int8 => i8::try_from(n).ok().map(Self::Int8),
            PrimitiveKind::Int16 => i16::try_from(n).ok().map(Self::Int16),
            PrimitiveKind::Int32 => i32::try_from(n).ok().map(Self::Int32),
            PrimitiveKind::Int64 => i64::try_from(n).ok().map(Self::Int64),
            PrimitiveKind::UInt8 => u8::try_from(n).ok().map(Self::UInt8),
            PrimitiveKind::UInt16 => u16::try_from(n).ok().map(Self::UInt16),
            PrimitiveKind::UInt32 => u32::try_from(n).ok().map(Self::UInt32),
            PrimitiveKind::UInt64 => Some(Self::UInt64(n)),
            _ => None,
        }
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Int8(_) => "int8",
            Self::Int16(_) => "int16",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::UInt8(_) => "uint8",
            Self::UInt16(_) => "uint16",
            Self::UInt32(_) => "uint32",
            Self::UInt64(_) => "uint64",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Time(_) => "time",
            Self::Str(_) => "string",
            Self::Record(_) => "record",
            Self::List(_) => "list",
        }
    }

    /// Any integer variant widened to `i64`, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int8(v) => Some(i64::from(v)),
            Self::Int16(v) => Some(i64::from(v)),
            Self::Int32(v) => Some(i64::from(v)),
            Self::Int64(v) => Some(v),
            Self::UInt8(v) => Some(i64::from(v)),
            Self::UInt16(v) => Some(i64::from(v)),
            Self::UInt32(v) => Some(i64::from(v)),
            Self::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Any non-negative integer variant widened to `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::UInt64(v) => Some(v),
            _ => self.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }

    /// Any numeric variant as `f64`.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(f64::from(v)),
            Self::Double(v) => Some(v),
            Self::UInt64(v) => Some(v as f64),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Scalars render bare; times as RFC 3339; records and lists as JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt8(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Time(t) => f.write_str(&t.to_rfc3339()),
            Self::Str(s) => f.write_str(s),
            Self::Record(_) | Self::List(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

/// One decoded record: its type plus a value per schema field.
///
/// Serializes as a flat JSON object with the type under `__rectype`:
///
/// ```text
/// { "__rectype": "atl03rec", "count": 3, "heights": [1.5, 2.5, 3.5] }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "__rectype")]
    rec_type: String,

    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(rec_type: impl Into<String>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            rec_type: rec_type.into(),
            fields,
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn rec_type(&self) -> &str {
        &self.rec_type
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
