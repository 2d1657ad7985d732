use std::collections::{BTreeMap, VecDeque};
use std::error::Error;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use recstream_types::{CONTAINER_START_FIELD, Record, Value};
use tracing::{debug, trace, warn};

use crate::config::{DecoderConfig, RecordErrorPolicy};
use crate::error::DecodeError;
use crate::framer::{Frame, Framer};
use crate::handlers::{HandlerRegistry, RecordHandler};
use crate::record_decoder::RecordDecoder;
use crate::session::DecodedStream;
use crate::source::SchemaSource;

/// Events emitted by the streaming decoder.
///
/// One `Record` per decoded record in arrival order (records claimed by a
/// handler or unpacked from a container are not emitted themselves), then
/// exactly one `Complete` once the transport has closed on a record
/// boundary.
///
/// ```text
///   Record(Record)
///   Record(Record)
///   ...
///   Complete(DecodeSummary)
///   (None from then on)
/// ```
#[derive(Debug)]
pub enum DecoderEvent {
  /// A record has been fully decoded.
  Record(Record),

  /// The stream closed cleanly.
  Complete(DecodeSummary),
}

/// Totals for one decoded stream.
#[derive(Debug, Default)]
pub struct DecodeSummary {
  /// Every byte received from the transport.
  pub bytes_read: u64,

  /// Bytes belonging to whole records. Equal to `bytes_read` for a
  /// complete stream.
  pub bytes_processed: u64,

  /// Decoded records per record type, including those handed to handlers
  /// and the containers themselves.
  pub records: BTreeMap<String, u64>,

  /// Records dropped under [`RecordErrorPolicy::Skip`].
  pub skipped: Vec<SkippedRecord>,
}

impl DecodeSummary {
  /// Total decoded records across all types.
  pub fn record_count(&self) -> u64 {
    self.records.values().sum()
  }
}

/// A record that failed to decode and was skipped.
#[derive(Debug)]
pub struct SkippedRecord {
  pub rec_type: String,
  pub error: DecodeError,
}

/// Asynchronous streaming decoder over a chunked byte transport.
///
/// Chunks are pulled only when the caller awaits [`next`](Self::next), so
/// backpressure follows the consumer. Records are decoded strictly in
/// arrival order: while one record waits for its definition, further
/// chunks keep flowing into the framer, but the next record is not started
/// until the current one is finished.
///
/// # Example
///
/// ```rust,no_run
/// use recstream_decoder::{DecoderEvent, MemorySchemaSource, Session};
/// use tokio::io::AsyncRead;
///
/// async fn decode_from_reader(reader: impl AsyncRead + Unpin) {
///   let session = Session::new(MemorySchemaSource::new());
///   let mut stream = session.stream_reader(reader);
///   while let Some(event) = stream.next().await.transpose().unwrap() {
///     if let DecoderEvent::Record(record) = event {
///       println!("{record:?}");
///     }
///   }
/// }
/// ```
pub struct StreamingDecoder<St, S> {
  stream: St,
  decoder: RecordDecoder<S>,
  config: Arc<DecoderConfig>,
  framer: Framer,
  handlers: HandlerRegistry,
  /// Decoded records not yet handed out.
  ready: VecDeque<Record>,
  /// Frames unpacked from containers, decoded before the framer is asked
  /// for more.
  nested: VecDeque<Frame>,
  summary: DecodeSummary,
  transport_done: bool,
  state: StreamState,
}

/// ```text
///   Running ──(Complete emitted | error)──▶ Done
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StreamState {
  Running,
  Done,
}

impl<St, E, S> StreamingDecoder<St, S>
where
  St: Stream<Item = Result<Bytes, E>> + Unpin,
  E: Into<Box<dyn Error + Send + Sync>>,
  S: SchemaSource,
{
  /// Decode `stream` with `decoder`. The built-in `eventrec`/`exceptrec`
  /// handlers are installed when `config.builtin_handlers` is set.
  pub fn new(stream: St, decoder: RecordDecoder<S>, config: Arc<DecoderConfig>) -> Self {
    let handlers = if config.builtin_handlers {
      HandlerRegistry::with_builtins()
    } else {
      HandlerRegistry::new()
    };

    Self {
      stream,
      decoder,
      framer: Framer::new(config.max_record_size),
      config,
      handlers,
      ready: VecDeque::new(),
      nested: VecDeque::new(),
      summary: DecodeSummary::default(),
      transport_done: false,
      state: StreamState::Running,
    }
  }

  /// Route records of `rec_type` to `handler` instead of emitting them.
  #[must_use]
  pub fn with_handler(
    mut self,
    rec_type: impl Into<String>,
    handler: impl RecordHandler + 'static,
  ) -> Self {
    self.handlers.register(rec_type, handler);
    self
  }

  pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
    &mut self.handlers
  }

  /// Totals so far. Byte counts are filled in on completion.
  pub fn summary(&self) -> &DecodeSummary {
    &self.summary
  }

  pub fn bytes_read(&self) -> u64 {
    self.framer.bytes_read()
  }

  /// Read the next event from the stream.
  ///
  /// Returns `Some(Ok(event))` for each event, `None` once
  /// [`DecoderEvent::Complete`] has been returned, or `Some(Err)` on a
  /// decode error. After an error the stream yields `None`.
  pub async fn next(&mut self) -> Option<Result<DecoderEvent, DecodeError>> {
    if self.state == StreamState::Done {
      return None;
    }

    let result = self.advance().await;
    if result.is_err() {
      self.state = StreamState::Done;
      self.framer.discard();
      self.ready.clear();
      self.nested.clear();
    }
    Some(result)
  }

  /// Drain the stream into memory.
  ///
  /// # Errors
  ///
  /// The first error yielded by [`next`](Self::next).
  pub async fn collect(mut self) -> Result<DecodedStream, DecodeError> {
    let mut records = Vec::new();
    while let Some(event) = self.next().await {
      match event? {
        DecoderEvent::Record(record) => records.push(record),
        DecoderEvent::Complete(summary) => return Ok(DecodedStream { records, summary }),
      }
    }
    Ok(DecodedStream {
      records,
      summary: std::mem::take(&mut self.summary),
    })
  }

  async fn advance(&mut self) -> Result<DecoderEvent, DecodeError> {
    loop {
      if let Some(record) = self.ready.pop_front() {
        return Ok(DecoderEvent::Record(record));
      }

      let frame = match self.nested.pop_front() {
        Some(frame) => Some(frame),
        None => self.framer.next_frame()?,
      };

      match frame {
        Some(frame) => self.process(frame).await?,
        None if self.transport_done => return self.complete(),
        None => self.pull().await?,
      }
    }
  }

  /// Wait for one transport item.
  async fn pull(&mut self) -> Result<(), DecodeError> {
    match self.stream.next().await {
      Some(Ok(chunk)) => {
        trace!(bytes = chunk.len(), "chunk received");
        self.framer.push(chunk);
      }
      Some(Err(e)) => return Err(DecodeError::Transport(e.into())),
      None => self.transport_done = true,
    }
    Ok(())
  }

  /// Decode one frame, keep receiving chunks meanwhile, then emit, hand
  /// off, or unpack the record.
  async fn process(&mut self, frame: Frame) -> Result<(), DecodeError> {
    let result = {
      let Self {
        stream,
        decoder,
        framer,
        transport_done,
        ..
      } = self;

      let decode = decoder.decode_frame(&frame);
      tokio::pin!(decode);

      loop {
        tokio::select! {
          biased;
          result = &mut decode => break result,
          chunk = stream.next(), if !*transport_done => match chunk {
            Some(Ok(chunk)) => framer.push(chunk),
            Some(Err(e)) => return Err(DecodeError::Transport(e.into())),
            None => *transport_done = true,
          },
        }
      }
    };

    let record = match result {
      Ok(record) => record,
      Err(error) => return self.record_failed(&frame.rec_type, error),
    };

    if self.config.container_type.as_deref() == Some(record.rec_type()) {
      return match self.unpack(&frame, &record) {
        Ok(()) => {
          self.count(&frame.rec_type);
          Ok(())
        }
        Err(error) => self.record_failed(&frame.rec_type, error),
      };
    }

    self.count(&frame.rec_type);
    if !self.handlers.dispatch(&record) {
      self.ready.push_back(record);
    }
    Ok(())
  }

  /// Queue the records embedded in a container, in order, ahead of
  /// anything still in the framer.
  fn unpack(&mut self, frame: &Frame, record: &Record) -> Result<(), DecodeError> {
    let missing_start = || DecodeError::MissingContainerStart {
      rec_type: frame.rec_type.clone(),
    };
    let start = record
      .get(CONTAINER_START_FIELD)
      .and_then(Value::as_u64)
      .and_then(|start| usize::try_from(start).ok())
      .filter(|start| *start <= frame.payload.len())
      .ok_or_else(missing_start)?;

    let frames = Framer::frame_all(frame.payload.slice(start..), self.config.max_record_size)?;
    debug!(
      rec_type = %frame.rec_type,
      start,
      records = frames.len(),
      "container unpacked"
    );
    for inner in frames.into_iter().rev() {
      self.nested.push_front(inner);
    }
    Ok(())
  }

  fn count(&mut self, rec_type: &str) {
    *self.summary.records.entry(rec_type.to_owned()).or_default() += 1;
  }

  fn record_failed(&mut self, rec_type: &str, error: DecodeError) -> Result<(), DecodeError> {
    match self.config.on_record_error {
      RecordErrorPolicy::Abort => Err(error),
      RecordErrorPolicy::Skip => {
        warn!(rec_type, %error, "skipping record");
        self.summary.skipped.push(SkippedRecord {
          rec_type: rec_type.to_owned(),
          error,
        });
        Ok(())
      }
    }
  }

  fn complete(&mut self) -> Result<DecoderEvent, DecodeError> {
    self.framer.finish()?;
    self.state = StreamState::Done;

    let mut summary = std::mem::take(&mut self.summary);
    summary.bytes_read = self.framer.bytes_read();
    summary.bytes_processed = self.framer.bytes_processed();
    debug!(
      bytes = summary.bytes_read,
      records = summary.record_count(),
      skipped = summary.skipped.len(),
      "record stream complete"
    );
    Ok(DecoderEvent::Complete(summary))
  }
}
