#![warn(clippy::pedantic)]

pub mod error;
pub mod chunk_queue;
pub mod config;
pub mod framer;
pub mod handlers;
pub mod record_decoder;
pub mod schema_cache;
pub mod session;
pub mod source;
pub mod streaming;

pub use config::{DecoderConfig, RecordErrorPolicy};
pub use error::{DecodeError, SchemaFetchError};
pub use framer::{Frame, Framer};
pub use handlers::{HandlerRegistry, RecordHandler};
pub use record_decoder::RecordDecoder;
pub use schema_cache::SchemaCache;
pub use session::{DecodedStream, Session};
pub use source::{DirectorySchemaSource, MemorySchemaSource, SchemaSource, SourceError};
pub use streaming::{DecodeSummary, DecoderEvent, SkippedRecord, StreamingDecoder};
