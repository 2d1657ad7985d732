#![warn(clippy::pedantic)]

pub mod codec;
pub mod error;
pub mod field_type;
pub mod flags;
pub mod schema;
pub mod value;

pub use error::{SchemaError, TypeError};
pub use field_type::{FieldType, PrimitiveKind};
pub use flags::FieldFlags;
pub use schema::{CONTAINER_START_FIELD, Elements, FieldDescriptor, RecordSchema};
pub use value::{Record, Value};
