use crate::field_type::PrimitiveKind;

/// Errors raised while decoding or encoding individual field values.
///
/// These are lower-level than the decoder's errors: they describe what
/// went wrong with one element at one offset, without knowing which record
/// or field it belonged to. The record decoder attaches that context.
///
/// ```text
/// ┌──────────────────────────┬──────────────────────────────────────────┐
/// │ Variant                  │ Cause                                    │
/// ├──────────────────────────┼──────────────────────────────────────────┤
/// │ UnsupportedFieldKind     │ BITFIELD (sub-byte extraction)           │
/// │ InvalidFieldType         │ numeric type code outside 0..=13         │
/// │ UserTypeAsPrimitive      │ USER code used where a primitive is due  │
/// │ MalformedVariableLength  │ remainder not a multiple of element size │
/// │ MisalignedOffset         │ bit offset not a multiple of 8           │
/// │ OutOfBounds              │ element extends past the record bytes    │
/// │ TimestampOutOfRange      │ TIME8 not representable as a date        │
/// │ ValueMismatch            │ encode: value variant != field kind      │
/// └──────────────────────────┴──────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TypeError {
  /// Bitfields are declared by the type system but never decoded.
  #[error("{kind} fields are unsupported")]
  UnsupportedFieldKind { kind: PrimitiveKind },

  /// A numeric type code did not map to any known kind.
  #[error("invalid field type code {code}")]
  InvalidFieldType { code: u8 },

  /// The USER code names a nested record and has no primitive encoding.
  #[error("user fields cannot be decoded as a primitive")]
  UserTypeAsPrimitive,

  /// A variable-length field's remaining bytes do not divide evenly, or
  /// the field starts past the end of the record.
  #[error(
    "variable-length field at byte {start} cannot fill record ending at {end} with {element_size}-byte elements"
  )]
  MalformedVariableLength {
    start: usize,
    end: usize,
    element_size: usize,
  },

  /// Field offsets are bit offsets but only whole bytes are addressable.
  #[error("bit offset {bit_offset} is not byte aligned")]
  MisalignedOffset { bit_offset: u64 },

  /// Reading `width` bytes at `offset` would run past `len`.
  #[error("{width}-byte element at offset {offset} exceeds {len} available bytes")]
  OutOfBounds {
    offset: usize,
    width: usize,
    len: usize,
  },

  /// A TIME8 value fell outside the calendar range.
  #[error("timestamp {nanos}ns is out of range")]
  TimestampOutOfRange { nanos: i64 },

  /// The encoder was handed a value of the wrong shape for a field.
  #[error("cannot encode {found} as {kind}")]
  ValueMismatch {
    kind: PrimitiveKind,
    found: &'static str,
  },
}

/// Structural problems in a record definition.
///
/// A definition that fails these checks never enters the schema cache.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
  #[error("record definition is not a JSON object")]
  NotAnObject,

  #[error("field {field}: {reason}")]
  InvalidField { field: String, reason: String },

  #[error("property {property}: {reason}")]
  InvalidProperty { property: String, reason: String },

  /// The type is referenced as a nested field but declares no size.
  #[error("record type {rec_type} declares no __datasize and cannot be nested")]
  MissingDataSize { rec_type: String },

  /// A nested type with `__datasize: 0` would repeat without consuming bytes.
  #[error("record type {rec_type} declares a zero __datasize and cannot be nested")]
  EmptyDataSize { rec_type: String },

  /// The type appears inside its own nesting chain.
  #[error("record type {rec_type} contains itself via {}", chain.join(" -> "))]
  RecursiveType { rec_type: String, chain: Vec<String> },
}
