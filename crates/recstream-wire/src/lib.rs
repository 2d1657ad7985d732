#![warn(clippy::pedantic)]

pub mod error;
pub mod header;
pub mod record_frame;

pub use error::WireError;
pub use header::{FrameHeader, HEADER_SIZE, RECORD_VERSION};
pub use record_frame::RecordFrame;
