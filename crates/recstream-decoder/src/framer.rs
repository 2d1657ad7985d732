use bytes::Bytes;
use recstream_wire::record_frame::parse_type_name;
use recstream_wire::{FrameHeader, HEADER_SIZE, WireError};
use tracing::trace;

use crate::chunk_queue::ChunkQueue;
use crate::error::DecodeError;

/// One complete record as cut from the byte stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub rec_type: String,
    pub payload: Bytes,
}

/// Position of the framer within the current record.
///
/// ```text
///   AwaitingHeader ──(≥ 8 bytes)──▶ AwaitingRecordBody ──(≥ record_size)──┐
///        ▲                                                                │
///        └────────────────────────────── frame emitted ◀──────────────────┘
///
///   any framing error ──▶ Poisoned (terminal)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramerState {
    AwaitingHeader,
    AwaitingRecordBody { header: FrameHeader },
    Poisoned,
}

/// Incremental record framer.
///
/// Chunks of any size are [`push`](Self::push)ed in arrival order and
/// whole frames are pulled with [`next_frame`](Self::next_frame). The
/// output does not depend on how the stream was split into chunks.
///
/// Two counters track progress: `bytes_read` counts every byte pushed,
/// `bytes_processed` advances only when a whole frame has been cut. The
/// stream decoded cleanly iff they are equal when the transport closes,
/// which [`finish`](Self::finish) checks.
#[derive(Debug)]
pub struct Framer {
    queue: ChunkQueue,
    state: FramerState,
    bytes_read: u64,
    bytes_processed: u64,
    max_record_size: usize,
}

impl Framer {
    #[must_use]
    pub fn new(max_record_size: usize) -> Self {
        Self {
            queue: ChunkQueue::new(),
            state: FramerState::AwaitingHeader,
            bytes_read: 0,
            bytes_processed: 0,
            max_record_size,
        }
    }

    pub fn push(&mut self, chunk: Bytes) {
        self.bytes_read += chunk.len() as u64;
        self.queue.push(chunk);
    }

    /// Cut the next whole frame if enough bytes are buffered.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::ProtocolVersionMismatch`] for a foreign header version.
    /// - [`DecodeError::RecordTooLarge`] if the header declares more than
    ///   `max_record_size` bytes.
    /// - [`DecodeError::InvalidFrame`] for a malformed type-name region.
    ///
    /// All of these poison the framer: it yields no further frames.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, DecodeError> {
        let result = self.advance();
        if result.is_err() {
            self.state = FramerState::Poisoned;
            self.queue.clear();
        }
        result
    }

    fn advance(&mut self) -> Result<Option<Frame>, DecodeError> {
        loop {
            match self.state {
                FramerState::Poisoned => return Ok(None),

                FramerState::AwaitingHeader => {
                    let Some(raw) = self.queue.take(HEADER_SIZE) else {
                        return Ok(None);
                    };
                    let header = FrameHeader::read_from(&raw).map_err(|e| match e {
                        WireError::UnsupportedVersion { found, expected } => {
                            DecodeError::ProtocolVersionMismatch { found, expected }
                        }
                        other => DecodeError::InvalidFrame(other),
                    })?;

                    let size = header.record_size();
                    if size > self.max_record_size {
                        return Err(DecodeError::RecordTooLarge {
                            size,
                            limit: self.max_record_size,
                        });
                    }

                    trace!(
                        type_len = header.type_len,
                        payload_len = header.payload_len,
                        "record header"
                    );
                    self.state = FramerState::AwaitingRecordBody { header };
                }

                FramerState::AwaitingRecordBody { header } => {
                    let size = header.record_size();
                    let Some(mut body) = self.queue.take(size) else {
                        return Ok(None);
                    };

                    let type_len = usize::from(header.type_len);
                    let rec_type = parse_type_name(&body[..type_len])
                        .map_err(DecodeError::InvalidFrame)?
                        .to_owned();
                    let payload = body.split_off(type_len);

                    self.bytes_processed += (HEADER_SIZE + size) as u64;
                    self.state = FramerState::AwaitingHeader;
                    trace!(rec_type = %rec_type, bytes = payload.len(), "record framed");

                    return Ok(Some(Frame { rec_type, payload }));
                }
            }
        }
    }

    /// Check that the stream ended on a frame boundary.
    ///
    /// # Errors
    ///
    /// [`DecodeError::TruncatedStream`] if any pushed bytes are not part of
    /// a whole frame.
    pub fn finish(&self) -> Result<(), DecodeError> {
        if self.buffered() == 0 {
            Ok(())
        } else {
            Err(DecodeError::TruncatedStream {
                processed: self.bytes_processed,
                total: self.bytes_read,
            })
        }
    }

    /// Drop any partially received record.
    pub fn discard(&mut self) {
        self.queue.clear();
        self.state = FramerState::AwaitingHeader;
    }

    /// Frame a complete, in-memory stream.
    ///
    /// # Errors
    ///
    /// Any error from [`next_frame`](Self::next_frame) or
    /// [`finish`](Self::finish).
    pub fn frame_all(bytes: Bytes, max_record_size: usize) -> Result<Vec<Frame>, DecodeError> {
        let mut framer = Self::new(max_record_size);
        framer.push(bytes);
        let mut frames = Vec::new();
        while let Some(frame) = framer.next_frame()? {
            frames.push(frame);
        }
        framer.finish()?;
        Ok(frames)
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    /// Bytes received but not yet part of a whole frame.
    pub fn buffered(&self) -> u64 {
        self.bytes_read - self.bytes_processed
    }
}
