use std::fmt;

use crate::error::TypeError;

/// Fixed-width primitive kinds a field element can have.
///
/// The numeric codes match the type codes used by the record service:
///
/// ```text
/// ┌──────┬──────────┬──────┐      ┌──────┬──────────┬──────┐
/// │ Code │ Name     │ Size │      │ Code │ Name     │ Size │
/// ├──────┼──────────┼──────┤      ├──────┼──────────┼──────┤
/// │ 0    │ INT8     │ 1    │      │ 7    │ UINT64   │ 8    │
/// │ 1    │ INT16    │ 2    │      │ 8    │ BITFIELD │ n/a  │
/// │ 2    │ INT32    │ 4    │      │ 9    │ FLOAT    │ 4    │
/// │ 3    │ INT64    │ 8    │      │ 10   │ DOUBLE   │ 8    │
/// │ 4    │ UINT8    │ 1    │      │ 11   │ TIME8    │ 8    │
/// │ 5    │ UINT16   │ 2    │      │ 12   │ STRING   │ 1    │
/// │ 6    │ UINT32   │ 4    │      │ 13   │ USER     │ -    │
/// └──────┴──────────┴──────┘      └──────┴──────────┴──────┘
/// ```
///
/// `USER` is deliberately not a variant: a nested record is a
/// [`FieldType::User`], so the codec can never be asked to decode one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Bitfield,
    Float,
    Double,
    Time8,
    String,
}

/// Wire code of the USER pseudo-type.
pub const USER_CODE: u8 = 13;

impl PrimitiveKind {
    pub const ALL: [Self; 13] = [
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Bitfield,
        Self::Float,
        Self::Double,
        Self::Time8,
        Self::String,
    ];

    /// Map a numeric type code to a kind.
    ///
    /// # Errors
    ///
    /// - [`TypeError::UserTypeAsPrimitive`] for the USER code (13).
    /// - [`TypeError::InvalidFieldType`] for anything else out of range.
    pub fn from_code(code: u8) -> Result<Self, TypeError> {
        match code {
            USER_CODE => Err(TypeError::UserTypeAsPrimitive),
            c if usize::from(c) < Self::ALL.len() => Ok(Self::ALL[usize::from(c)]),
            other => Err(TypeError::InvalidFieldType { code: other }),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Int8 => 0,
            Self::Int16 => 1,
            Self::Int32 => 2,
            Self::Int64 => 3,
            Self::UInt8 => 4,
            Self::UInt16 => 5,
            Self::UInt32 => 6,
            Self::UInt64 => 7,
            Self::Bitfield => 8,
            Self::Float => 9,
            Self::Double => 10,
            Self::Time8 => 11,
            Self::String => 12,
        }
    }

    /// Look up a kind by its schema name (`"INT32"`, `"DOUBLE"`, ...).
    ///
    /// Returns `None` for anything else, which the schema layer treats as
    /// the name of a nested record type.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "INT8",
            Self::Int16 => "INT16",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::UInt8 => "UINT8",
            Self::UInt16 => "UINT16",
            Self::UInt32 => "UINT32",
            Self::UInt64 => "UINT64",
            Self::Bitfield => "BITFIELD",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Time8 => "TIME8",
            Self::String => "STRING",
        }
    }

    /// Size in bytes of one element of this kind.
    ///
    /// # Errors
    ///
    /// [`TypeError::UnsupportedFieldKind`] for [`PrimitiveKind::Bitfield`],
    /// whose elements are narrower than a byte.
    pub fn element_size(self) -> Result<usize, TypeError> {
        match self {
            Self::Int8 | Self::UInt8 | Self::String => Ok(1),
            Self::Int16 | Self::UInt16 => Ok(2),
            Self::Int32 | Self::UInt32 | Self::Float => Ok(4),
            Self::Int64 | Self::UInt64 | Self::Double | Self::Time8 => Ok(8),
            Self::Bitfield => Err(TypeError::UnsupportedFieldKind { kind: self }),
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The declared type of a schema field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A fixed-width primitive decoded by the codec.
    Primitive(PrimitiveKind),

    /// Another record type, resolved through the schema cache and decoded
    /// recursively.
    User(String),
}

impl FieldType {
    /// Classify a schema `type` string.
    pub fn parse(name: &str) -> Self {
        PrimitiveKind::from_name(name)
            .map_or_else(|| Self::User(name.to_owned()), Self::Primitive)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Primitive(kind) => kind.name(),
            Self::User(name) => name,
        }
    }
}
