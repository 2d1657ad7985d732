//! Fixed-width primitive codec.
//!
//! Every element of every field passes through [`decode_primitive`]. It is
//! a pure function of its inputs: kind, byte order, the record bytes and
//! an offset. Reading past the end of the slice is reported, never panics.

use chrono::{DateTime, Utc};

use crate::error::TypeError;
use crate::field_type::PrimitiveKind;
use crate::value::Value;

/// TIME8 ticks are nanoseconds; calendar values are built from milliseconds.
const NANOS_PER_MILLI: i64 = 1_000_000;

fn element<'a>(
    bytes: &'a [u8],
    offset: usize,
    width: usize,
) -> Result<&'a [u8], TypeError> {
    offset
        .checked_add(width)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(TypeError::OutOfBounds {
            offset,
            width,
            len: bytes.len(),
        })
}

fn array<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&raw[..N]);
    out
}

macro_rules! read {
    ($ty:ty, $raw:expr, $big_endian:expr) => {
        if $big_endian {
            <$ty>::from_be_bytes(array($raw))
        } else {
            <$ty>::from_le_bytes(array($raw))
        }
    };
}

/// Decode one element of `kind` at byte `offset`.
///
/// # Errors
///
/// - [`TypeError::UnsupportedFieldKind`] for bitfields.
/// - [`TypeError::OutOfBounds`] if the element extends past `bytes`.
/// - [`TypeError::TimestampOutOfRange`] if a TIME8 value has no calendar
///   representation.
pub fn decode_primitive(
    kind: PrimitiveKind,
    big_endian: bool,
    bytes: &[u8],
    offset: usize,
) -> Result<Value, TypeError> {
    let raw = element(bytes, offset, kind.element_size()?)?;

    let value = match kind {
        PrimitiveKind::Int8 => Value::Int8(i8::from_ne_bytes([raw[0]])),
        PrimitiveKind::Int16 => Value::Int16(read!(i16, raw, big_endian)),
        PrimitiveKind::Int32 => Value::Int32(read!(i32, raw, big_endian)),
        PrimitiveKind::Int64 => Value::Int64(read!(i64, raw, big_endian)),
        PrimitiveKind::UInt8 => Value::UInt8(raw[0]),
        PrimitiveKind::UInt16 => Value::UInt16(read!(u16, raw, big_endian)),
        PrimitiveKind::UInt32 => Value::UInt32(read!(u32, raw, big_endian)),
        PrimitiveKind::UInt64 => Value::UInt64(read!(u64, raw, big_endian)),
        PrimitiveKind::Float => Value::Float(read!(f32, raw, big_endian)),
        PrimitiveKind::Double => Value::Double(read!(f64, raw, big_endian)),
        PrimitiveKind::Time8 => Value::Time(time_from_nanos(read!(i64, raw, big_endian))?),
        PrimitiveKind::String => Value::Str(char::from(raw[0]).to_string()),
        PrimitiveKind::Bitfield => {
            return Err(TypeError::UnsupportedFieldKind { kind });
        }
    };

    Ok(value)
}

/// Convert nanosecond ticks to a UTC timestamp at millisecond precision.
///
/// # Errors
///
/// [`TypeError::TimestampOutOfRange`] if the value is outside chrono's range.
pub fn time_from_nanos(nanos: i64) -> Result<DateTime<Utc>, TypeError> {
    DateTime::from_timestamp_millis(nanos / NANOS_PER_MILLI)
        .ok_or(TypeError::TimestampOutOfRange { nanos })
}

/// Interpret a packed byte array as consecutive elements of one kind.
///
/// STRING arrays come back as a single [`Value::Str`] holding every byte;
/// all other kinds produce one value per element.
///
/// # Errors
///
/// - [`TypeError::MalformedVariableLength`] if `bytes.len()` is not a
///   multiple of the element size.
/// - Any error from [`decode_primitive`].
pub fn decode_values(
    kind: PrimitiveKind,
    big_endian: bool,
    bytes: &[u8],
) -> Result<Vec<Value>, TypeError> {
    let size = kind.element_size()?;
    if bytes.len() % size != 0 {
        return Err(TypeError::MalformedVariableLength {
            start: 0,
            end: bytes.len(),
            element_size: size,
        });
    }

    if kind == PrimitiveKind::String {
        let text: String = bytes.iter().copied().map(char::from).collect();
        return Ok(vec![Value::Str(text)]);
    }

    (0..bytes.len() / size)
        .map(|i| decode_primitive(kind, big_endian, bytes, i * size))
        .collect()
}

macro_rules! put {
    ($buf:expr, $v:expr, $big_endian:expr) => {{
        let bytes = if $big_endian {
            $v.to_be_bytes()
        } else {
            $v.to_le_bytes()
        };
        $buf.copy_from_slice(&bytes);
    }};
}

/// Encode one element of `kind` into `buf` at byte `offset`.
///
/// The inverse of [`decode_primitive`]. A STRING element takes the first
/// character of a [`Value::Str`] (or NUL for an empty string), which must
/// be Latin-1.
///
/// # Errors
///
/// - [`TypeError::UnsupportedFieldKind`] for bitfields.
/// - [`TypeError::OutOfBounds`] if the element does not fit in `buf`.
/// - [`TypeError::ValueMismatch`] if `value` is the wrong variant for `kind`.
pub fn encode_primitive(
    kind: PrimitiveKind,
    big_endian: bool,
    value: &Value,
    buf: &mut [u8],
    offset: usize,
) -> Result<(), TypeError> {
    let width = kind.element_size()?;
    let len = buf.len();
    let out = offset
        .checked_add(width)
        .and_then(|end| buf.get_mut(offset..end))
        .ok_or(TypeError::OutOfBounds { offset, width, len })?;

    match (kind, value) {
        (PrimitiveKind::Int8, Value::Int8(v)) => put!(out, v, big_endian),
        (PrimitiveKind::Int16, Value::Int16(v)) => put!(out, v, big_endian),
        (PrimitiveKind::Int32, Value::Int32(v)) => put!(out, v, big_endian),
        (PrimitiveKind::Int64, Value::Int64(v)) => put!(out, v, big_endian),
        (PrimitiveKind::UInt8, Value::UInt8(v)) => put!(out, v, big_endian),
        (PrimitiveKind::UInt16, Value::UInt16(v)) => put!(out, v, big_endian),
        (PrimitiveKind::UInt32, Value::UInt32(v)) => put!(out, v, big_endian),
        (PrimitiveKind::UInt64, Value::UInt64(v)) => put!(out, v, big_endian),
        (PrimitiveKind::Float, Value::Float(v)) => put!(out, v, big_endian),
        (PrimitiveKind::Double, Value::Double(v)) => put!(out, v, big_endian),
        (PrimitiveKind::Time8, Value::Time(t)) => {
            let nanos = t
                .timestamp_millis()
                .checked_mul(NANOS_PER_MILLI)
                .ok_or(TypeError::TimestampOutOfRange { nanos: i64::MAX })?;
            put!(out, nanos, big_endian);
        }
        (PrimitiveKind::String, Value::Str(s)) => {
            out[0] = match s.chars().next() {
                None => 0,
                Some(c) => u8::try_from(c).map_err(|_| TypeError::ValueMismatch {
                    kind,
                    found: "non-latin-1 string",
                })?,
            };
        }
        (kind, other) => {
            return Err(TypeError::ValueMismatch {
                kind,
                found: other.kind_name(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_and_big_endian_int32() {
        let le = 42i32.to_le_bytes();
        let be = 42i32.to_be_bytes();
        assert_eq!(
            decode_primitive(PrimitiveKind::Int32, false, &le, 0).unwrap(),
            Value::Int32(42)
        );
        assert_eq!(
            decode_primitive(PrimitiveKind::Int32, true, &be, 0).unwrap(),
            Value::Int32(42)
        );
    }

    #[test]
    fn signed_and_unsigned_bytes() {
        let bytes = [0xFF];
        assert_eq!(
            decode_primitive(PrimitiveKind::Int8, false, &bytes, 0).unwrap(),
            Value::Int8(-1)
        );
        assert_eq!(
            decode_primitive(PrimitiveKind::UInt8, true, &bytes, 0).unwrap(),
            Value::UInt8(255)
        );
    }

    #[test]
    fn offset_is_honored() {
        let mut bytes = vec![0xAA, 0xBB];
        bytes.extend_from_slice(&0x0102_0304u32.to_be_bytes());
        assert_eq!(
            decode_primitive(PrimitiveKind::UInt32, true, &bytes, 2).unwrap(),
            Value::UInt32(0x0102_0304)
        );
    }

    #[test]
    fn floats() {
        let bytes = 1.25f32.to_le_bytes();
        assert_eq!(
            decode_primitive(PrimitiveKind::Float, false, &bytes, 0).unwrap(),
            Value::Float(1.25)
        );
        let bytes = (-2.5f64).to_be_bytes();
        assert_eq!(
            decode_primitive(PrimitiveKind::Double, true, &bytes, 0).unwrap(),
            Value::Double(-2.5)
        );
    }

    #[test]
    fn time8_truncates_to_milliseconds() {
        let nanos: i64 = 1_600_000_000_123_456_789;
        let bytes = nanos.to_le_bytes();
        let Value::Time(t) = decode_primitive(PrimitiveKind::Time8, false, &bytes, 0).unwrap()
        else {
            panic!("expected a time value");
        };
        assert_eq!(t.timestamp_millis(), 1_600_000_000_123);
    }

    #[test]
    fn string_unit_is_one_character() {
        assert_eq!(
            decode_primitive(PrimitiveKind::String, false, b"hi", 1).unwrap(),
            Value::Str("i".to_owned())
        );
    }

    #[test]
    fn bitfield_is_unsupported() {
        assert_eq!(
            decode_primitive(PrimitiveKind::Bitfield, false, &[0xFF], 0),
            Err(TypeError::UnsupportedFieldKind {
                kind: PrimitiveKind::Bitfield
            })
        );
    }

    #[test]
    fn reading_past_end_fails() {
        assert_eq!(
            decode_primitive(PrimitiveKind::Int64, false, &[0; 7], 0),
            Err(TypeError::OutOfBounds {
                offset: 0,
                width: 8,
                len: 7
            })
        );
        assert!(decode_primitive(PrimitiveKind::UInt8, false, &[0; 4], usize::MAX).is_err());
    }

    #[test]
    fn packed_values() {
        let mut bytes = Vec::new();
        for v in [1u16, 2, 3] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(
            decode_values(PrimitiveKind::UInt16, false, &bytes).unwrap(),
            vec![Value::UInt16(1), Value::UInt16(2), Value::UInt16(3)]
        );
        assert!(decode_values(PrimitiveKind::UInt16, false, &bytes[..5]).is_err());
        assert_eq!(
            decode_values(PrimitiveKind::String, false, b"abc").unwrap(),
            vec![Value::Str("abc".to_owned())]
        );
    }

    #[test]
    fn encode_matches_decode() {
        let mut buf = [0u8; 12];
        encode_primitive(PrimitiveKind::Int32, true, &Value::Int32(-7), &mut buf, 0).unwrap();
        encode_primitive(PrimitiveKind::Double, false, &Value::Double(0.5), &mut buf, 4).unwrap();
        assert_eq!(
            decode_primitive(PrimitiveKind::Int32, true, &buf, 0).unwrap(),
            Value::Int32(-7)
        );
        assert_eq!(
            decode_primitive(PrimitiveKind::Double, false, &buf, 4).unwrap(),
            Value::Double(0.5)
        );
    }

    #[test]
    fn encode_rejects_wrong_variant() {
        let mut buf = [0u8; 4];
        assert_eq!(
            encode_primitive(PrimitiveKind::UInt32, false, &Value::Int32(1), &mut buf, 0),
            Err(TypeError::ValueMismatch {
                kind: PrimitiveKind::UInt32,
                found: "int32"
            })
        );
    }
}
