use std::convert::Infallible;
use std::error::Error;
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use recstream_types::Record;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::record_decoder::RecordDecoder;
use crate::schema_cache::SchemaCache;
use crate::source::SchemaSource;
use crate::streaming::{DecodeSummary, StreamingDecoder};

/// Every record of a stream, decoded in arrival order.
#[derive(Debug)]
pub struct DecodedStream {
    pub records: Vec<Record>,
    pub summary: DecodeSummary,
}

/// A decoding session: one schema cache and one configuration shared by
/// every stream decoded through it.
///
/// Definitions fetched while decoding one stream are reused by the next.
/// Cloning is cheap; clones share the cache.
///
/// # Example
///
/// ```rust
/// use recstream_decoder::{MemorySchemaSource, Session};
/// use recstream_types::Value;
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source = MemorySchemaSource::new().with_definition(
///     "t",
///     json!({ "value": { "type": "INT32", "offset": 0, "elements": 1, "flags": "" } }),
/// );
/// let session = Session::new(source);
///
/// let mut bytes = vec![0, 2, 0, 2, 0, 0, 0, 4, b't', 0];
/// bytes.extend_from_slice(&42i32.to_le_bytes());
///
/// let decoded = session.decode_bytes(bytes).await.unwrap();
/// assert_eq!(decoded.records[0].get("value"), Some(&Value::Int32(42)));
/// # }
/// ```
pub struct Session<S> {
    cache: SchemaCache<S>,
    config: Arc<DecoderConfig>,
}

impl<S> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: SchemaSource> Session<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, DecoderConfig::default())
    }

    pub fn with_config(source: S, config: DecoderConfig) -> Self {
        Self {
            cache: SchemaCache::new(source),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn cache(&self) -> &SchemaCache<S> {
        &self.cache
    }

    /// A record decoder backed by this session's cache.
    pub fn record_decoder(&self) -> RecordDecoder<S> {
        RecordDecoder::new(self.cache.clone(), self.config.decode_aux)
    }

    /// Decode a stream of byte chunks incrementally.
    pub fn stream<St, E>(&self, stream: St) -> StreamingDecoder<St, S>
    where
        St: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        StreamingDecoder::new(stream, self.record_decoder(), Arc::clone(&self.config))
    }

    /// Decode everything read from `reader` incrementally.
    pub fn stream_reader<R>(&self, reader: R) -> StreamingDecoder<ReaderStream<R>, S>
    where
        R: AsyncRead + Unpin,
    {
        self.stream(ReaderStream::new(reader))
    }

    /// Decode a whole stream into memory.
    ///
    /// # Errors
    ///
    /// Any framing error, or the first record error under
    /// [`RecordErrorPolicy::Abort`](crate::RecordErrorPolicy::Abort).
    pub async fn decode_all<St, E>(&self, stream: St) -> Result<DecodedStream, DecodeError>
    where
        St: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        self.stream(stream).collect().await
    }

    /// Decode a complete stream already held in memory.
    ///
    /// # Errors
    ///
    /// See [`decode_all`](Self::decode_all).
    pub async fn decode_bytes(&self, bytes: impl Into<Bytes>) -> Result<DecodedStream, DecodeError> {
        let chunk: Result<Bytes, Infallible> = Ok(bytes.into());
        self.decode_all(futures::stream::iter([chunk])).await
    }
}
