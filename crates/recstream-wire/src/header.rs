use crate::error::WireError;

/// Total header size in bytes (fixed).
pub const HEADER_SIZE: usize = 8;

/// The only record format version understood by this crate.
pub const RECORD_VERSION: u16 = 2;

/// Frame header: the fixed prefix of every record on the wire.
///
/// ```text
/// ┌────────┬─────────┬──────────────────────────────────────────┐
/// │ Offset │ Size    │ Description                              │
/// ├────────┼─────────┼──────────────────────────────────────────┤
/// │ 0x00   │ 2 bytes │ Version (big-endian, must be 2)          │
/// │ 0x02   │ 2 bytes │ Type name length incl. null terminator   │
/// │ 0x04   │ 4 bytes │ Payload length                           │
/// └────────┴─────────┴──────────────────────────────────────────┘
/// ```
///
/// All three integers are big-endian regardless of the endianness of the
/// fields inside the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u16,
    pub type_len: u16,
    pub payload_len: u32,
}

impl FrameHeader {
    /// Create a header with the current version.
    pub fn new(type_len: u16, payload_len: u32) -> Self {
        Self {
            version: RECORD_VERSION,
            type_len,
            payload_len,
        }
    }

    /// Number of bytes that follow the header for this record:
    /// the type-name region plus the payload.
    pub fn record_size(&self) -> usize {
        usize::from(self.type_len) + self.payload_len as usize
    }

    /// Write the 8-byte header into the provided buffer.
    ///
    /// The version is written as stored, so a header built by hand with a
    /// foreign version round-trips unchanged (useful for exercising the
    /// version gate).
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than
    /// [`HEADER_SIZE`].
    pub fn write_to(&self, buf: &mut [u8]) -> Result<(), WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::UnexpectedEof { offset: buf.len() });
        }

        buf[0..2].copy_from_slice(&self.version.to_be_bytes());
        buf[2..4].copy_from_slice(&self.type_len.to_be_bytes());
        buf[4..8].copy_from_slice(&self.payload_len.to_be_bytes());

        Ok(())
    }

    /// Parse a header from the first 8 bytes of the provided buffer.
    ///
    /// The version is checked before the length fields are read.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnexpectedEof`] if the buffer is too short.
    /// - [`WireError::UnsupportedVersion`] if the version is not
    ///   [`RECORD_VERSION`].
    pub fn read_from(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::UnexpectedEof { offset: buf.len() });
        }

        let version = u16::from_be_bytes([buf[0], buf[1]]);
        if version != RECORD_VERSION {
            return Err(WireError::UnsupportedVersion {
                found: version,
                expected: RECORD_VERSION,
            });
        }

        let type_len = u16::from_be_bytes([buf[2], buf[3]]);
        let payload_len = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);

        Ok(Self {
            version,
            type_len,
            payload_len,
        })
    }
}
