use recstream_types::Record;
use recstream_wire::{HEADER_SIZE, RECORD_VERSION, RecordFrame};

use crate::error::EncodeError;
use crate::record_writer::RecordWriter;
use crate::schema_set::SchemaSet;

/// Record stream encoder: the producing side of the wire format.
///
/// Records are appended with [`add_record`](Self::add_record) (typed,
/// laid out from the schema set), [`add_raw`](Self::add_raw) (payload
/// bytes supplied as-is) or [`add_container`](Self::add_container) (a
/// nested stream wrapped in a container record). Modifiers such as
/// [`with_type_padding`](Self::with_type_padding) act on the most recently
/// added record.
///
/// # Usage
///
/// ```rust
/// use recstream_encoder::{SchemaSet, StreamEncoder};
/// use recstream_types::{Record, Value};
/// use serde_json::json;
///
/// let schemas = SchemaSet::from_json([(
///     "t",
///     &json!({ "value": { "type": "INT32", "offset": 0, "elements": 1, "flags": "" } }),
/// )])
/// .unwrap();
///
/// let bytes = StreamEncoder::new(schemas)
///     .add_record(Record::new("t", Default::default()).with_field("value", Value::Int32(42)))
///     .encode()
///     .unwrap();
/// assert_eq!(bytes.len(), 8 + 2 + 4);
/// ```
///
/// # Output layout
///
/// ```text
/// ┌──────────────┬──────────────────────────────────────────┐
/// │ [8 bytes]    │ Record 0 header (version, type_len, len) │
/// │ [type_len]   │ Record 0 type name + NUL padding         │
/// │ [len]        │ Record 0 payload                         │
/// │ ...          │ Record 1 ...                             │
/// └──────────────┴──────────────────────────────────────────┘
/// ```
///
/// The stream has no terminator; it ends where the bytes end.
pub struct StreamEncoder {
    schemas: SchemaSet,
    records: Vec<PendingRecord>,
    version: u16,
}

/// A record awaiting serialization.
struct PendingRecord {
    rec_type: String,
    body: PendingBody,
    /// Size of the type-name region; `None` means name + terminator.
    type_len: Option<usize>,
}

enum PendingBody {
    Typed(Record),
    Raw(Vec<u8>),
    Container(Vec<u8>),
}

impl StreamEncoder {
    #[must_use]
    pub fn new(schemas: SchemaSet) -> Self {
        Self {
            schemas,
            records: Vec::new(),
            version: RECORD_VERSION,
        }
    }

    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    /// Add a typed record, encoded with the schema for its record type.
    pub fn add_record(&mut self, record: Record) -> &mut Self {
        self.push(record.rec_type().to_owned(), PendingBody::Typed(record))
    }

    /// Add a record whose payload bytes are written verbatim.
    pub fn add_raw(&mut self, rec_type: &str, payload: &[u8]) -> &mut Self {
        self.push(rec_type.to_owned(), PendingBody::Raw(payload.to_vec()))
    }

    /// Add a container record of type `rec_type` embedding an already
    /// encoded record stream.
    pub fn add_container(&mut self, rec_type: &str, inner: Vec<u8>) -> &mut Self {
        self.push(rec_type.to_owned(), PendingBody::Container(inner))
    }

    /// Widen the type-name region of the most recently added record to
    /// `type_len` bytes, padding the name with NULs.
    ///
    /// # Errors
    ///
    /// [`EncodeError::NoRecordToModify`] if no record has been added yet.
    pub fn with_type_padding(&mut self, type_len: usize) -> Result<&mut Self, EncodeError> {
        let record = self.records.last_mut().ok_or(EncodeError::NoRecordToModify)?;
        record.type_len = Some(type_len);
        Ok(self)
    }

    /// Write `version` into every frame header instead of the current one.
    ///
    /// Only useful for producing streams a decoder must refuse.
    pub fn with_version(&mut self, version: u16) -> &mut Self {
        self.version = version;
        self
    }

    /// Serialize all accumulated records into one contiguous stream.
    ///
    /// # Errors
    ///
    /// - Any [`EncodeError`] from laying out a typed or container record.
    /// - [`EncodeError::Wire`] if a type name or payload exceeds the header's
    ///   length fields, or `type_len` cannot hold the name.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let writer = RecordWriter::new(&self.schemas);
        let mut output = Vec::with_capacity(self.records.len() * (HEADER_SIZE + 64));

        for pending in &self.records {
            let payload = match &pending.body {
                PendingBody::Typed(record) => writer.write(record)?,
                PendingBody::Raw(bytes) => bytes.clone(),
                PendingBody::Container(inner) => writer.write_container(&pending.rec_type, inner)?,
            };

            let start = output.len();
            let frame = RecordFrame::new(&pending.rec_type, &payload);
            let type_len = pending.type_len.unwrap_or(pending.rec_type.len() + 1);
            frame.write_padded_to(&mut output, type_len)?;

            if self.version != RECORD_VERSION {
                output[start..start + 2].copy_from_slice(&self.version.to_be_bytes());
            }
        }

        Ok(output)
    }

    fn push(&mut self, rec_type: String, body: PendingBody) -> &mut Self {
        self.records.push(PendingRecord {
            rec_type,
            body,
            type_len: None,
        });
        self
    }
}
