use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value as Json, json};

use crate::error::{SchemaError, TypeError};
use crate::field_type::FieldType;
use crate::flags::FieldFlags;

/// Keys starting with this prefix are record metadata, not fields.
pub const METADATA_PREFIX: &str = "__";

/// Metadata key holding a record type's total byte size.
pub const DATASIZE_PROPERTY: &str = "__datasize";

/// Field of a container record holding the payload offset of the
/// embedded record stream.
pub const CONTAINER_START_FIELD: &str = "start";

/// How many elements a field holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Elements {
    /// A declared, fixed count.
    Fixed(usize),

    /// Declared as `0`: the field consumes the rest of the record.
    Variable,
}

impl Elements {
    pub fn from_count(count: usize) -> Self {
        if count == 0 { Self::Variable } else { Self::Fixed(count) }
    }

    /// The count as it appears in a definition (`0` for variable).
    pub fn declared(self) -> usize {
        match self {
            Self::Fixed(n) => n,
            Self::Variable => 0,
        }
    }

    /// Effective element count for a field starting at byte `start` in a
    /// record whose bytes end at `end`.
    ///
    /// # Errors
    ///
    /// [`TypeError::MalformedVariableLength`] if a variable field starts
    /// past `end`, or the remaining bytes are not a whole number of
    /// `element_size` elements.
    pub fn resolve(self, start: usize, end: usize, element_size: usize) -> Result<usize, TypeError> {
        match self {
            Self::Fixed(n) => Ok(n),
            Self::Variable => {
                let malformed = TypeError::MalformedVariableLength {
                    start,
                    end,
                    element_size,
                };
                if start > end || element_size == 0 {
                    return Err(malformed);
                }
                let remaining = end - start;
                if remaining % element_size != 0 {
                    return Err(malformed);
                }
                Ok(remaining / element_size)
            }
        }
    }
}

/// One field of a record definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub field_type: FieldType,

    /// Offset of the first element from the start of the record body, in bits.
    pub bit_offset: u64,

    pub elements: Elements,

    pub flags: FieldFlags,
}

impl FieldDescriptor {
    pub fn new(field_type: FieldType, bit_offset: u64, elements: Elements) -> Self {
        Self {
            field_type,
            bit_offset,
            elements,
            flags: FieldFlags::NONE,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags = flags;
        self
    }

    /// The field's offset in whole bytes.
    ///
    /// # Errors
    ///
    /// [`TypeError::MisalignedOffset`] if the bit offset is not a multiple of 8.
    pub fn byte_offset(&self) -> Result<usize, TypeError> {
        if self.bit_offset % 8 != 0 {
            return Err(TypeError::MisalignedOffset {
                bit_offset: self.bit_offset,
            });
        }
        usize::try_from(self.bit_offset / 8).map_err(|_| TypeError::MisalignedOffset {
            bit_offset: self.bit_offset,
        })
    }

    fn from_json(field: &str, json: &Json) -> Result<Self, SchemaError> {
        #[derive(Deserialize)]
        struct RawField {
            #[serde(rename = "type")]
            field_type: String,
            offset: u64,
            elements: i64,
            flags: String,
        }

        let invalid = |reason: String| SchemaError::InvalidField {
            field: field.to_owned(),
            reason,
        };

        let raw = RawField::deserialize(json).map_err(|e| invalid(e.to_string()))?;
        if raw.field_type.is_empty() {
            return Err(invalid("empty type".to_owned()));
        }
        let count = usize::try_from(raw.elements)
            .map_err(|_| invalid(format!("invalid element count {}", raw.elements)))?;

        Ok(Self {
            field_type: FieldType::parse(&raw.field_type),
            bit_offset: raw.offset,
            elements: Elements::from_count(count),
            flags: FieldFlags::parse(&raw.flags),
        })
    }

    fn to_json(&self) -> Json {
        let mut flags = Vec::new();
        if self.flags.is_big_endian() {
            flags.push("BE");
        }
        if self.flags.is_aux() {
            flags.push("AUX");
        }
        json!({
            "type": self.field_type.name(),
            "offset": self.bit_offset,
            "elements": self.elements.declared(),
            "flags": flags.join("|"),
        })
    }
}

/// The decoded definition of one record type.
///
/// ```text
/// {
///   "value":      { "type": "INT32", "offset": 0,  "elements": 1, "flags": "" },
///   "samples":    { "type": "DOUBLE", "offset": 32, "elements": 0, "flags": "" },
///   "__datasize": 4
/// }
/// ```
///
/// Field order carries no meaning; fields are kept sorted by name so that
/// decoding and rendering are deterministic.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordSchema {
    rec_type: String,
    fields: BTreeMap<String, FieldDescriptor>,
    data_size: Option<usize>,
    properties: BTreeMap<String, Json>,
}

impl RecordSchema {
    pub fn new(rec_type: impl Into<String>) -> Self {
        Self {
            rec_type: rec_type.into(),
            fields: BTreeMap::new(),
            data_size: None,
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, field: FieldDescriptor) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    #[must_use]
    pub fn with_data_size(mut self, size: usize) -> Self {
        self.data_size = Some(size);
        self
    }

    /// Build a schema from a record definition returned by the service.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::NotAnObject`] if `json` is not an object.
    /// - [`SchemaError::InvalidField`] if a field lacks `type`, `offset`,
    ///   `elements` or `flags`, or one of them has the wrong JSON type.
    /// - [`SchemaError::InvalidProperty`] if `__datasize` is not a
    ///   non-negative integer.
    pub fn from_json(rec_type: &str, json: &Json) -> Result<Self, SchemaError> {
        let object: &Map<String, Json> = json.as_object().ok_or(SchemaError::NotAnObject)?;
        let mut schema = Self::new(rec_type);

        for (key, value) in object {
            if key == DATASIZE_PROPERTY {
                let size = value
                    .as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| SchemaError::InvalidProperty {
                        property: key.clone(),
                        reason: format!("expected a byte count, got {value}"),
                    })?;
                schema.data_size = Some(size);
            } else if key.starts_with(METADATA_PREFIX) {
                schema.properties.insert(key.clone(), value.clone());
            } else {
                let field = FieldDescriptor::from_json(key, value)?;
                schema.fields.insert(key.clone(), field);
            }
        }

        Ok(schema)
    }

    /// Render back into the definition format accepted by [`from_json`](Self::from_json).
    pub fn to_json(&self) -> Json {
        let mut object = Map::new();
        for (name, field) in &self.fields {
            object.insert(name.clone(), field.to_json());
        }
        for (name, value) in &self.properties {
            object.insert(name.clone(), value.clone());
        }
        if let Some(size) = self.data_size {
            object.insert(DATASIZE_PROPERTY.to_owned(), json!(size));
        }
        Json::Object(object)
    }

    pub fn rec_type(&self) -> &str {
        &self.rec_type
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn data_size(&self) -> Option<usize> {
        self.data_size
    }

    /// The byte size used when this type appears as a nested field.
    ///
    /// # Errors
    ///
    /// [`SchemaError::MissingDataSize`] if the definition has no `__datasize`,
    /// [`SchemaError::EmptyDataSize`] if it is zero.
    pub fn nested_size(&self) -> Result<usize, SchemaError> {
        match self.data_size {
            Some(0) => Err(SchemaError::EmptyDataSize {
                rec_type: self.rec_type.clone(),
            }),
            Some(size) => Ok(size),
            None => Err(SchemaError::MissingDataSize {
                rec_type: self.rec_type.clone(),
            }),
        }
    }

    /// A metadata property other than `__datasize`.
    pub fn property(&self, name: &str) -> Option<&Json> {
        self.properties.get(name)
    }
}
