use std::sync::Arc;

use recstream_types::{SchemaError, TypeError};
use recstream_wire::WireError;

use crate::source::SourceError;

/// Errors that can occur while decoding a record stream.
///
/// Framing errors describe the byte stream itself and always end it.
/// Record errors describe one record and are subject to
/// [`RecordErrorPolicy`](crate::RecordErrorPolicy).
///
/// Error hierarchy:
///
/// ```text
///   DecodeError
///   ├── ProtocolVersionMismatch   ← header version is not 2            (framing)
///   ├── TruncatedStream           ← stream closed mid-record           (framing)
///   ├── RecordTooLarge            ← record exceeds max_record_size     (framing)
///   ├── InvalidFrame(WireError)   ← unterminated or non-ASCII type     (framing)
///   ├── Transport                 ← the byte source failed             (framing)
///   ├── SchemaFetchFailed         ← definition unavailable or invalid  (record)
///   ├── Field                     ← attributes a nested error to a field (record)
///   ├── Type(TypeError)           ← from the recstream-types codec     (record)
///   └── MissingContainerStart     ← container without a usable start   (record)
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A record header carried a format version other than the supported one.
    #[error("unsupported record format version {found} (expected {expected})")]
    ProtocolVersionMismatch { found: u16, expected: u16 },

    /// The stream closed with bytes left over that do not form a whole record.
    #[error("stream ended mid-record: {processed} of {total} bytes processed")]
    TruncatedStream { processed: u64, total: u64 },

    /// A header declared a record larger than the configured limit.
    #[error("record of {size} bytes exceeds limit of {limit}")]
    RecordTooLarge { size: usize, limit: usize },

    /// The type-name region of a record was malformed.
    #[error("invalid record frame: {0}")]
    InvalidFrame(WireError),

    /// A record definition could not be obtained.
    #[error("failed to fetch definition of {rec_type}: {source}")]
    SchemaFetchFailed {
        rec_type: String,
        source: SchemaFetchError,
    },

    /// Decoding one field of a record failed.
    ///
    /// Nested records chain these, so the full path to the failing value
    /// can be recovered by walking [`source`](std::error::Error::source).
    #[error("{rec_type}.{field}: {source}")]
    Field {
        rec_type: String,
        field: String,
        source: Box<DecodeError>,
    },

    #[error(transparent)]
    Type(#[from] TypeError),

    /// A container record had no integer `start` field, or it pointed past
    /// the end of the payload.
    #[error("container record {rec_type} has no usable start offset")]
    MissingContainerStart { rec_type: String },

    /// The transport delivering the byte stream failed.
    #[error("transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

impl DecodeError {
    /// The innermost error, past any [`DecodeError::Field`] attribution.
    pub fn root(&self) -> &DecodeError {
        match self {
            Self::Field { source, .. } => source.root(),
            other => other,
        }
    }

    /// Field names from the outermost record down to the failing value.
    pub fn field_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self;
        while let Self::Field { field, source, .. } = current {
            path.push(field.as_str());
            current = source;
        }
        path
    }
}

/// Why a record definition could not be obtained.
///
/// Cloneable so one failed fetch can be reported to every caller that was
/// waiting on it.
#[derive(Clone, Debug, thiserror::Error)]
pub enum SchemaFetchError {
    /// The schema source failed.
    #[error(transparent)]
    Source(Arc<SourceError>),

    /// The source answered, but the definition is structurally invalid.
    #[error(transparent)]
    Invalid(#[from] SchemaError),
}

impl From<SourceError> for SchemaFetchError {
    fn from(error: SourceError) -> Self {
        Self::Source(Arc::new(error))
    }
}
