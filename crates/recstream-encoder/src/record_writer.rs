use recstream_types::codec::encode_primitive;
use recstream_types::{
    CONTAINER_START_FIELD, Elements, FieldDescriptor, FieldType, PrimitiveKind, Record,
    RecordSchema, TypeError, Value,
};

use crate::error::EncodeError;
use crate::schema_set::SchemaSet;

/// Lays a [`Record`] out as payload bytes according to its schema.
///
/// This is the inverse of the decoder's schema walk. Each field is written
/// at its declared byte offset; the payload is as long as the furthest
/// field end, or the declared `__datasize` if that is larger. Gaps between
/// fields are zero-filled.
///
/// Value shapes accepted per field:
///
/// ```text
/// ┌──────────────┬─────────────────────────────────────────────────┐
/// │ Field type   │ Value                                           │
/// ├──────────────┼─────────────────────────────────────────────────┤
/// │ primitive    │ scalar (one element) or List of scalars         │
/// │ STRING       │ Str; fixed fields are NUL-padded to their count │
/// │ user type    │ Record (one element) or List of Records         │
/// └──────────────┴─────────────────────────────────────────────────┘
/// ```
///
/// A fixed count must match the number of values exactly. Auxiliary
/// fields may be absent and are left zeroed.
pub struct RecordWriter<'a> {
    schemas: &'a SchemaSet,
}

impl<'a> RecordWriter<'a> {
    #[must_use]
    pub fn new(schemas: &'a SchemaSet) -> Self {
        Self { schemas }
    }

    /// Encode a record using the schema registered for its type.
    ///
    /// # Errors
    ///
    /// [`EncodeError::UnknownRecordType`] if the type (or a nested type) has
    /// no schema, and any error from [`write_with`](Self::write_with).
    pub fn write(&self, record: &Record) -> Result<Vec<u8>, EncodeError> {
        let schema = self.schemas.require(record.rec_type())?;
        self.write_with(schema, record)
    }

    /// Encode a record's fields using an explicit schema.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::MissingField`] if a non-auxiliary field has no value.
    /// - [`EncodeError::ElementCount`] / [`EncodeError::StringTooLong`] if a
    ///   value does not fit its declared count.
    /// - [`EncodeError::NestedTooLarge`] if a nested record overflows its size.
    /// - [`EncodeError::Type`] for misaligned offsets, bitfields, or values of
    ///   the wrong variant.
    pub fn write_with(&self, schema: &RecordSchema, record: &Record) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();

        for (name, field) in schema.fields() {
            let Some(value) = record.get(name) else {
                if field.flags.is_aux() {
                    continue;
                }
                return Err(EncodeError::MissingField {
                    rec_type: schema.rec_type().to_owned(),
                    field: name.to_owned(),
                });
            };

            let offset = field.byte_offset()?;
            match &field.field_type {
                FieldType::Primitive(PrimitiveKind::String) => {
                    write_string(name, field, value, offset, &mut buf)?;
                }
                FieldType::Primitive(kind) => {
                    write_primitives(name, field, *kind, value, offset, &mut buf)?;
                }
                FieldType::User(rec_type) => {
                    self.write_nested(name, field, rec_type, value, offset, &mut buf)?;
                }
            }
        }

        if let Some(size) = schema.data_size() {
            reserve(&mut buf, size);
        }

        Ok(buf)
    }

    /// Encode a container record whose payload embeds `inner`, an already
    /// framed record stream.
    ///
    /// All container fields are zeroed except `start`, which is set to the
    /// offset where `inner` begins.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::UnknownRecordType`] if `rec_type` has no schema.
    /// - [`EncodeError::MissingContainerStart`] if the schema has no integer
    ///   `start` field, or the offset does not fit in it.
    pub fn write_container(&self, rec_type: &str, inner: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let schema = self.schemas.require(rec_type)?;
        let missing = || EncodeError::MissingContainerStart {
            rec_type: rec_type.to_owned(),
        };

        let start_field = schema.field(CONTAINER_START_FIELD).ok_or_else(missing)?;
        let FieldType::Primitive(start_kind) = start_field.field_type else {
            return Err(missing());
        };

        let mut header_len = schema.data_size().unwrap_or(0);
        for (_, field) in schema.fields() {
            header_len = header_len.max(field.byte_offset()? + self.fixed_extent(field)?);
        }

        let start = u64::try_from(header_len)
            .ok()
            .and_then(|n| Value::integer(start_kind, n))
            .ok_or_else(missing)?;
        let mut buf = vec![0u8; header_len];
        encode_primitive(
            start_kind,
            start_field.flags.is_big_endian(),
            &start,
            &mut buf,
            start_field.byte_offset()?,
        )?;
        buf.extend_from_slice(inner);

        Ok(buf)
    }

    /// Bytes occupied by a field with a fixed element count (0 if variable).
    fn fixed_extent(&self, field: &FieldDescriptor) -> Result<usize, EncodeError> {
        let Elements::Fixed(count) = field.elements else {
            return Ok(0);
        };
        let size = match &field.field_type {
            FieldType::Primitive(kind) => kind.element_size()?,
            FieldType::User(rec_type) => self.schemas.require(rec_type)?.nested_size()?,
        };
        Ok(count * size)
    }

    fn write_nested(
        &self,
        name: &str,
        field: &FieldDescriptor,
        rec_type: &str,
        value: &Value,
        offset: usize,
        buf: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        let nested = self.schemas.require(rec_type)?;
        let size = nested.nested_size()?;
        let items = elements_of(value);
        check_count(name, field.elements, items.len())?;
        reserve(buf, offset + items.len() * size);

        for (i, item) in items.into_iter().enumerate() {
            let record = item.as_record().ok_or_else(|| EncodeError::ExpectedRecord {
                field: name.to_owned(),
                found: item.kind_name(),
            })?;
            let bytes = self.write_with(nested, record)?;
            if bytes.len() > size {
                return Err(EncodeError::NestedTooLarge {
                    rec_type: rec_type.to_owned(),
                    size: bytes.len(),
                    limit: size,
                });
            }
            let at = offset + i * size;
            buf[at..at + bytes.len()].copy_from_slice(&bytes);
        }

        Ok(())
    }
}

fn write_primitives(
    name: &str,
    field: &FieldDescriptor,
    kind: PrimitiveKind,
    value: &Value,
    offset: usize,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let size = kind.element_size()?;
    let items = elements_of(value);
    check_count(name, field.elements, items.len())?;
    reserve(buf, offset + items.len() * size);

    let big_endian = field.flags.is_big_endian();
    for (i, item) in items.into_iter().enumerate() {
        encode_primitive(kind, big_endian, item, buf, offset + i * size)?;
    }

    Ok(())
}

fn write_string(
    name: &str,
    field: &FieldDescriptor,
    value: &Value,
    offset: usize,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let text = value.as_str().ok_or(TypeError::ValueMismatch {
        kind: PrimitiveKind::String,
        found: value.kind_name(),
    })?;
    let bytes = text
        .chars()
        .map(u8::try_from)
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| TypeError::ValueMismatch {
            kind: PrimitiveKind::String,
            found: "non-latin-1 string",
        })?;

    let capacity = match field.elements {
        Elements::Fixed(n) if bytes.len() > n => {
            return Err(EncodeError::StringTooLong {
                field: name.to_owned(),
                len: bytes.len(),
                capacity: n,
            });
        }
        Elements::Fixed(n) => n,
        Elements::Variable => bytes.len(),
    };

    reserve(buf, offset + capacity);
    buf[offset..offset + bytes.len()].copy_from_slice(&bytes);
    Ok(())
}

/// A list contributes its items; anything else is a single element.
fn elements_of(value: &Value) -> Vec<&Value> {
    match value {
        Value::List(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn check_count(name: &str, elements: Elements, found: usize) -> Result<(), EncodeError> {
    match elements {
        Elements::Fixed(expected) if expected != found => Err(EncodeError::ElementCount {
            field: name.to_owned(),
            expected,
            found,
        }),
        _ => Ok(()),
    }
}

fn reserve(buf: &mut Vec<u8>, len: usize) {
    if buf.len() < len {
        buf.resize(len, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schemas() -> SchemaSet {
        let mut set = SchemaSet::new();
        set.insert_json(
            "point",
            &json!({
                "x": { "type": "INT16", "offset": 0, "elements": 1, "flags": "BE" },
                "y": { "type": "INT16", "offset": 16, "elements": 1, "flags": "" },
                "__datasize": 4
            }),
        )
        .unwrap();
        set.insert_json(
            "track",
            &json!({
                "id": { "type": "UINT8", "offset": 0, "elements": 1, "flags": "" },
                "name": { "type": "STRING", "offset": 8, "elements": 4, "flags": "" },
                "origin": { "type": "point", "offset": 40, "elements": 1, "flags": "" },
                "samples": { "type": "UINT16", "offset": 72, "elements": 0, "flags": "" }
            }),
        )
        .unwrap();
        set.insert_json(
            "conrec",
            &json!({
                "start": { "type": "UINT32", "offset": 0, "elements": 1, "flags": "" },
                "count": { "type": "UINT32", "offset": 32, "elements": 1, "flags": "" }
            }),
        )
        .unwrap();
        set
    }

    fn point(x: i16, y: i16) -> Value {
        Value::Record(
            Record::new("point", Default::default())
                .with_field("x", Value::Int16(x))
                .with_field("y", Value::Int16(y)),
        )
    }

    #[test]
    fn lays_out_fields_at_offsets() {
        let set = schemas();
        let record = Record::new("track", Default::default())
            .with_field("id", Value::UInt8(7))
            .with_field("name", Value::Str("ab".to_owned()))
            .with_field("origin", point(1, 2))
            .with_field(
                "samples",
                Value::List(vec![Value::UInt16(10), Value::UInt16(11)]),
            );

        let bytes = RecordWriter::new(&set).write(&record).unwrap();
        assert_eq!(
            bytes,
            vec![7, b'a', b'b', 0, 0, 0x00, 0x01, 0x02, 0x00, 10, 0, 11, 0]
        );
    }

    #[test]
    fn datasize_pads_payload() {
        let set = schemas();
        let record = Record::new("point", Default::default())
            .with_field("x", Value::Int16(0))
            .with_field("y", Value::Int16(0));
        assert_eq!(RecordWriter::new(&set).write(&record).unwrap().len(), 4);
    }

    #[test]
    fn missing_field_is_reported() {
        let set = schemas();
        let record = Record::new("point", Default::default()).with_field("x", Value::Int16(0));
        assert!(matches!(
            RecordWriter::new(&set).write(&record),
            Err(EncodeError::MissingField { ref field, .. }) if field == "y"
        ));
    }

    #[test]
    fn fixed_count_must_match() {
        let set = schemas();
        let record = Record::new("point", Default::default())
            .with_field("x", Value::List(vec![Value::Int16(0), Value::Int16(1)]))
            .with_field("y", Value::Int16(0));
        assert!(matches!(
            RecordWriter::new(&set).write(&record),
            Err(EncodeError::ElementCount {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn string_overflow_is_rejected() {
        let set = schemas();
        let record = Record::new("track", Default::default())
            .with_field("id", Value::UInt8(0))
            .with_field("name", Value::Str("toolong".to_owned()))
            .with_field("origin", point(0, 0))
            .with_field("samples", Value::List(Vec::new()));
        assert!(matches!(
            RecordWriter::new(&set).write(&record),
            Err(EncodeError::StringTooLong {
                len: 7,
                capacity: 4,
                ..
            })
        ));
    }

    #[test]
    fn wrong_variant_is_rejected() {
        let set = schemas();
        let record = Record::new("point", Default::default())
            .with_field("x", Value::UInt32(0))
            .with_field("y", Value::Int16(0));
        assert!(matches!(
            RecordWriter::new(&set).write(&record),
            Err(EncodeError::Type(TypeError::ValueMismatch { .. }))
        ));
    }

    #[test]
    fn container_start_follows_fields() {
        let set = schemas();
        let bytes = RecordWriter::new(&set)
            .write_container("conrec", &[0xAA, 0xBB])
            .unwrap();
        assert_eq!(bytes, vec![8, 0, 0, 0, 0, 0, 0, 0, 0xAA, 0xBB]);
    }

    #[test]
    fn container_needs_start_field() {
        let set = schemas();
        assert!(matches!(
            RecordWriter::new(&set).write_container("point", &[]),
            Err(EncodeError::MissingContainerStart { .. })
        ));
    }
}
