use crate::error::WireError;
use crate::header::{FrameHeader, HEADER_SIZE};

/// Record frame: the wire envelope wrapping every record's payload.
///
/// ```text
/// ┌──────────────────────────────────────────────────┐
/// │ header       (8 bytes, see FrameHeader)          │
/// │ type name    [type_len bytes, NUL-terminated]    │
/// │ payload      [payload_len bytes]                 │
/// └──────────────────────────────────────────────────┘
/// ```
///
/// The type-name region may carry extra NUL padding after the terminator;
/// the name ends at the first NUL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordFrame<'a> {
    /// The record type, which selects the schema used to decode `payload`.
    pub rec_type: &'a str,

    /// Raw field data.
    pub payload: &'a [u8],
}

impl<'a> RecordFrame<'a> {
    pub fn new(rec_type: &'a str, payload: &'a [u8]) -> Self {
        Self { rec_type, payload }
    }

    /// Total bytes this frame occupies on the wire with a minimal type region.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.rec_type.len() + 1 + self.payload.len()
    }

    /// Write this frame with a type region of exactly `name + NUL`.
    ///
    /// # Returns
    ///
    /// Total number of bytes written.
    ///
    /// # Errors
    ///
    /// See [`write_padded_to`](Self::write_padded_to).
    pub fn write_to(&self, w: &mut impl std::io::Write) -> Result<usize, WireError> {
        self.write_padded_to(w, self.rec_type.len() + 1)
    }

    /// Write this frame with a type region of `type_len` bytes, NUL-padded.
    ///
    /// # Errors
    ///
    /// - [`WireError::TypeNameTooLong`] if `type_len` is smaller than the
    ///   name plus its terminator or does not fit in 16 bits.
    /// - [`WireError::PayloadTooLarge`] if the payload exceeds 32 bits.
    /// - [`WireError::Io`] on write failure.
    pub fn write_padded_to(
        &self,
        w: &mut impl std::io::Write,
        type_len: usize,
    ) -> Result<usize, WireError> {
        let name = self.rec_type.as_bytes();
        if type_len <= name.len() {
            return Err(WireError::TypeNameTooLong { len: name.len() + 1 });
        }
        let type_len_u16 =
            u16::try_from(type_len).map_err(|_| WireError::TypeNameTooLong { len: type_len })?;
        let payload_len = u32::try_from(self.payload.len()).map_err(|_| {
            WireError::PayloadTooLarge {
                len: self.payload.len(),
            }
        })?;

        let mut header_buf = [0u8; HEADER_SIZE];
        FrameHeader::new(type_len_u16, payload_len).write_to(&mut header_buf)?;
        w.write_all(&header_buf)?;

        w.write_all(name)?;
        w.write_all(&vec![0u8; type_len - name.len()])?;

        w.write_all(self.payload)?;

        Ok(HEADER_SIZE + type_len + self.payload.len())
    }

    /// Read one record frame from the front of a complete byte slice.
    ///
    /// # Returns
    ///
    /// `Some((frame, bytes_consumed))`, or `None` if `buf` is empty.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnexpectedEof`] if the slice ends mid-frame.
    /// - [`WireError::UnsupportedVersion`] on a foreign header version.
    /// - [`WireError::MissingTypeTerminator`] / [`WireError::InvalidTypeName`]
    ///   if the type region is malformed.
    pub fn read_from(buf: &'a [u8]) -> Result<Option<(Self, usize)>, WireError> {
        if buf.is_empty() {
            return Ok(None);
        }

        let header = FrameHeader::read_from(buf)?;
        let type_end = HEADER_SIZE + usize::from(header.type_len);
        let end = HEADER_SIZE + header.record_size();
        if buf.len() < end {
            return Err(WireError::UnexpectedEof { offset: buf.len() });
        }

        let rec_type = parse_type_name(&buf[HEADER_SIZE..type_end])?;
        let payload = &buf[type_end..end];

        Ok(Some((Self { rec_type, payload }, end)))
    }
}

/// Extract the record type name from a record's type region.
///
/// The name is everything before the first NUL. A region with no NUL at
/// all is rejected, as is an empty name or one that is not printable ASCII.
///
/// # Errors
///
/// - [`WireError::MissingTypeTerminator`] if no NUL is present.
/// - [`WireError::InvalidTypeName`] if the name is not printable ASCII.
pub fn parse_type_name(region: &[u8]) -> Result<&str, WireError> {
    let nul = region
        .iter()
        .position(|&b| b == 0)
        .ok_or(WireError::MissingTypeTerminator {
            type_len: region.len(),
        })?;
    let name = &region[..nul];

    if name.is_empty() || !name.iter().all(u8::is_ascii_graphic) {
        return Err(WireError::InvalidTypeName);
    }

    std::str::from_utf8(name).map_err(|_| WireError::InvalidTypeName)
}
