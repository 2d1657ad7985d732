/// Errors raised while reading or writing the record framing layer.
///
/// These cover only the envelope around each record: the 8-byte header
/// and the null-terminated type name. Field-level problems inside the
/// payload belong to `recstream-types`.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Input ended before a complete header or record could be read.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// The header declared a record format version this crate does not speak.
    #[error("unsupported record format version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    /// The type-name region did not contain a null terminator.
    #[error("record type name of {type_len} bytes is not null-terminated")]
    MissingTypeTerminator { type_len: usize },

    /// The type name contained bytes outside printable ASCII.
    #[error("record type name is not valid ASCII")]
    InvalidTypeName,

    /// The type name (plus terminator) does not fit in the 16-bit length field.
    #[error("record type name too long: {len} bytes")]
    TypeNameTooLong { len: usize },

    /// The payload does not fit in the 32-bit length field.
    #[error("record payload too long: {len} bytes")]
    PayloadTooLarge { len: usize },

    /// I/O error during write.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
