use std::collections::BTreeMap;

use futures::FutureExt;
use futures::future::BoxFuture;
use recstream_types::codec::decode_primitive;
use recstream_types::{
    FieldDescriptor, FieldType, PrimitiveKind, Record, SchemaError, TypeError, Value,
};

use crate::error::{DecodeError, SchemaFetchError};
use crate::framer::Frame;
use crate::schema_cache::SchemaCache;
use crate::source::SchemaSource;

/// Turns record bytes into [`Record`]s using definitions from a
/// [`SchemaCache`].
///
/// Each field is located at `body_offset + bit_offset / 8` and holds either
/// a declared number of elements or, for variable-length fields, as many
/// whole elements as fit before the end of the record. Nested record types
/// are decoded recursively, each element bounded by the nested type's
/// `__datasize`.
///
/// ```text
///   STRING            → one Str, characters joined, cut at the first NUL
///   exactly 1 element → the scalar itself
///   otherwise         → List in decode order (empty for zero elements)
/// ```
pub struct RecordDecoder<S> {
    cache: SchemaCache<S>,
    decode_aux: bool,
}

impl<S> Clone for RecordDecoder<S> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            decode_aux: self.decode_aux,
        }
    }
}

impl<S: SchemaSource> RecordDecoder<S> {
    /// `decode_aux == false` leaves fields flagged `AUX` out of every record.
    pub fn new(cache: SchemaCache<S>, decode_aux: bool) -> Self {
        Self { cache, decode_aux }
    }

    pub fn cache(&self) -> &SchemaCache<S> {
        &self.cache
    }

    /// Decode a framed record; its fields start at payload offset 0.
    ///
    /// # Errors
    ///
    /// See [`decode`](Self::decode).
    pub async fn decode_frame(&self, frame: &Frame) -> Result<Record, DecodeError> {
        self.decode(&frame.rec_type, &frame.payload, 0, frame.payload.len())
            .await
    }

    /// Decode the record of `rec_type` whose body starts at `body_offset`
    /// in `bytes` and ends at `record_end`.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::SchemaFetchFailed`] if the definition of `rec_type`
    ///   cannot be obtained.
    /// - [`DecodeError::Field`] naming the field that failed, wrapping the
    ///   codec error, a nested fetch failure, or a nested field error. A
    ///   nested type that contains itself or declares a zero `__datasize`
    ///   surfaces as a nested [`SchemaFetchError::Invalid`].
    pub fn decode<'a>(
        &'a self,
        rec_type: &'a str,
        bytes: &'a [u8],
        body_offset: usize,
        record_end: usize,
    ) -> BoxFuture<'a, Result<Record, DecodeError>> {
        self.decode_within(rec_type, bytes, body_offset, record_end, Vec::new())
    }

    /// `chain` holds the enclosing record types, outermost first.
    fn decode_within<'a>(
        &'a self,
        rec_type: &'a str,
        bytes: &'a [u8],
        body_offset: usize,
        record_end: usize,
        mut chain: Vec<&'a str>,
    ) -> BoxFuture<'a, Result<Record, DecodeError>> {
        async move {
            chain.push(rec_type);
            let schema = self.cache.resolve(rec_type).await?;
            let mut fields = BTreeMap::new();

            for (name, field) in schema.fields() {
                if field.flags.is_aux() && !self.decode_aux {
                    continue;
                }
                let value = self
                    .decode_field(field, bytes, body_offset, record_end, &chain)
                    .await
                    .map_err(|source| DecodeError::Field {
                        rec_type: rec_type.to_owned(),
                        field: name.to_owned(),
                        source: Box::new(source),
                    })?;
                fields.insert(name.to_owned(), value);
            }

            Ok(Record::new(rec_type, fields))
        }
        .boxed()
    }

    async fn decode_field(
        &self,
        field: &FieldDescriptor,
        bytes: &[u8],
        body_offset: usize,
        record_end: usize,
        chain: &[&str],
    ) -> Result<Value, DecodeError> {
        let start = body_offset.saturating_add(field.byte_offset()?);
        let big_endian = field.flags.is_big_endian();

        match &field.field_type {
            FieldType::Primitive(kind) => {
                let size = kind.element_size()?;
                let count = field.elements.resolve(start, record_end, size)?;
                let record = &bytes[..record_end.min(bytes.len())];

                let mut values = Vec::with_capacity(count.min(record.len()));
                for i in 0..count {
                    let at = element_offset(start, i, size, record.len())?;
                    values.push(decode_primitive(*kind, big_endian, record, at)?);
                }

                if *kind == PrimitiveKind::String {
                    return Ok(Value::Str(join_characters(values)));
                }
                Ok(collapse(values))
            }

            FieldType::User(nested) => {
                if chain.contains(&nested.as_str()) {
                    let mut cycle: Vec<String> = chain.iter().map(|&t| t.to_owned()).collect();
                    cycle.push(nested.clone());
                    return Err(DecodeError::SchemaFetchFailed {
                        rec_type: nested.clone(),
                        source: SchemaFetchError::Invalid(SchemaError::RecursiveType {
                            rec_type: nested.clone(),
                            chain: cycle,
                        }),
                    });
                }
                let schema = self.cache.resolve(nested).await?;
                let size = schema
                    .nested_size()
                    .map_err(|e| DecodeError::SchemaFetchFailed {
                        rec_type: nested.clone(),
                        source: SchemaFetchError::Invalid(e),
                    })?;
                let count = field.elements.resolve(start, record_end, size)?;

                let mut values = Vec::with_capacity(count.min(bytes.len()));
                for i in 0..count {
                    let at = element_offset(start, i, size, record_end)?;
                    let end = at + size;
                    if end > record_end {
                        return Err(TypeError::OutOfBounds {
                            offset: at,
                            width: size,
                            len: record_end,
                        }
                        .into());
                    }
                    let record = self
                        .decode_within(nested, bytes, at, end, chain.to_vec())
                        .await?;
                    values.push(Value::Record(record));
                }
                Ok(collapse(values))
            }
        }
    }
}

/// Byte offset of element `index`, or `OutOfBounds` on overflow.
fn element_offset(start: usize, index: usize, size: usize, len: usize) -> Result<usize, TypeError> {
    index
        .checked_mul(size)
        .and_then(|delta| start.checked_add(delta))
        .and_then(|at| at.checked_add(size).map(|_| at))
        .ok_or(TypeError::OutOfBounds {
            offset: start,
            width: size,
            len,
        })
}

fn join_characters(values: Vec<Value>) -> String {
    let mut text: String = values
        .into_iter()
        .filter_map(|value| match value {
            Value::Str(c) => Some(c),
            _ => None,
        })
        .collect();
    if let Some(nul) = text.find('\0') {
        text.truncate(nul);
    }
    text
}

fn collapse(values: Vec<Value>) -> Value {
    match <[Value; 1]>::try_from(values) {
        Ok([value]) => value,
        Err(values) => Value::List(values),
    }
}
