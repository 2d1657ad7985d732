#![warn(clippy::pedantic)]

pub mod error;
pub mod encoder;
pub mod record_writer;
pub mod schema_set;

pub use encoder::StreamEncoder;
pub use error::EncodeError;
pub use record_writer::RecordWriter;
pub use schema_set::SchemaSet;
