use recstream_types::{SchemaError, TypeError};
use recstream_wire::WireError;

/// Errors that can occur while building a record stream.
///
/// Error hierarchy:
///
/// ```text
///   EncodeError
///   ├── UnknownRecordType      ← no schema registered for a record type
///   ├── MissingField           ← record lacks a value for a schema field
///   ├── ElementCount           ← value count differs from a fixed count
///   ├── StringTooLong          ← string exceeds its fixed element count
///   ├── NestedTooLarge         ← nested record overflows its __datasize
///   ├── ExpectedRecord         ← user-typed field holds a non-record value
///   ├── MissingContainerStart  ← container schema has no integer `start`
///   ├── NoRecordToModify       ← modifier called before any record
///   ├── Schema(SchemaError)    ← from recstream-types definitions
///   ├── Type(TypeError)        ← from recstream-types value encoding
///   ├── Wire(WireError)        ← from recstream-wire framing
///   └── Io(std::io::Error)
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("no schema registered for record type {rec_type}")]
    UnknownRecordType { rec_type: String },

    #[error("record {rec_type} has no value for field {field}")]
    MissingField { rec_type: String, field: String },

    #[error("field {field} declares {expected} elements but {found} were given")]
    ElementCount {
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("string of {len} bytes does not fit field {field} ({capacity} bytes)")]
    StringTooLong {
        field: String,
        len: usize,
        capacity: usize,
    },

    #[error("nested {rec_type} record needs {size} bytes but declares {limit}")]
    NestedTooLarge {
        rec_type: String,
        size: usize,
        limit: usize,
    },

    #[error("field {field} holds a nested record type but got {found}")]
    ExpectedRecord { field: String, found: &'static str },

    #[error("container type {rec_type} has no integer start field")]
    MissingContainerStart { rec_type: String },

    #[error("modifier called but no records have been added yet")]
    NoRecordToModify,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
