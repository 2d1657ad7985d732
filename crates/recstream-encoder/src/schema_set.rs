use std::collections::BTreeMap;

use recstream_types::RecordSchema;
use serde_json::Value as Json;

use crate::error::EncodeError;

/// The record definitions an encoder lays records out with.
///
/// A decoder fetches definitions lazily; the encoder needs all of them up
/// front, including the definitions of every nested type.
#[derive(Clone, Debug, Default)]
pub struct SchemaSet {
    schemas: BTreeMap<String, RecordSchema>,
}

impl SchemaSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parsed schema under its own record type.
    pub fn insert(&mut self, schema: RecordSchema) -> &mut Self {
        self.schemas.insert(schema.rec_type().to_owned(), schema);
        self
    }

    /// Parse and register a definition in the service's JSON format.
    ///
    /// # Errors
    ///
    /// [`EncodeError::Schema`] if the definition is structurally invalid.
    pub fn insert_json(&mut self, rec_type: &str, definition: &Json) -> Result<&mut Self, EncodeError> {
        let schema = RecordSchema::from_json(rec_type, definition)?;
        Ok(self.insert(schema))
    }

    /// Build a set from `(rec_type, definition)` pairs.
    ///
    /// # Errors
    ///
    /// [`EncodeError::Schema`] on the first invalid definition.
    pub fn from_json<'a>(
        definitions: impl IntoIterator<Item = (&'a str, &'a Json)>,
    ) -> Result<Self, EncodeError> {
        let mut set = Self::new();
        for (rec_type, definition) in definitions {
            set.insert_json(rec_type, definition)?;
        }
        Ok(set)
    }

    pub fn get(&self, rec_type: &str) -> Option<&RecordSchema> {
        self.schemas.get(rec_type)
    }

    /// Look up a schema, failing with [`EncodeError::UnknownRecordType`].
    ///
    /// # Errors
    ///
    /// [`EncodeError::UnknownRecordType`] if nothing is registered for `rec_type`.
    pub fn require(&self, rec_type: &str) -> Result<&RecordSchema, EncodeError> {
        self.get(rec_type).ok_or_else(|| EncodeError::UnknownRecordType {
            rec_type: rec_type.to_owned(),
        })
    }

    /// Every definition rendered back to JSON, for seeding a schema source.
    pub fn definitions(&self) -> impl Iterator<Item = (&str, Json)> {
        self.schemas
            .iter()
            .map(|(name, schema)| (name.as_str(), schema.to_json()))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_and_lookup() {
        let definition = json!({
            "value": { "type": "INT32", "offset": 0, "elements": 1, "flags": "" }
        });
        let set = SchemaSet::from_json([("t", &definition)]).unwrap();

        assert_eq!(set.len(), 1);
        assert!(set.get("t").is_some());
        assert!(matches!(
            set.require("missing"),
            Err(EncodeError::UnknownRecordType { ref rec_type }) if rec_type == "missing"
        ));
    }

    #[test]
    fn invalid_definition_is_rejected() {
        let definition = json!({ "value": { "type": "INT32" } });
        assert!(matches!(
            SchemaSet::from_json([("t", &definition)]),
            Err(EncodeError::Schema(_))
        ));
    }

    #[test]
    fn definitions_render_back() {
        let definition = json!({
            "value": { "type": "INT32", "offset": 0, "elements": 1, "flags": "" },
            "__datasize": 4
        });
        let set = SchemaSet::from_json([("t", &definition)]).unwrap();
        let rendered: Vec<_> = set.definitions().collect();
        assert_eq!(rendered, vec![("t", definition)]);
    }
}
