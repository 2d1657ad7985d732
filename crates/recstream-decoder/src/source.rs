//! Where record definitions come from.
//!
//! The decoder never hard-codes a layout: every record type is described
//! by a JSON definition fetched on first use through a [`SchemaSource`].

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value as Json;

/// Errors raised by a [`SchemaSource`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source has no definition for this record type.
    #[error("no definition for record type {rec_type}")]
    NotFound { rec_type: String },

    /// The record type cannot be used to address a definition.
    #[error("record type {rec_type} is not a valid definition name")]
    InvalidName { rec_type: String },

    /// The definition was not valid JSON.
    #[error("malformed definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Any other failure reported by a custom source.
    #[error("{0}")]
    Other(String),
}

/// An asynchronous provider of record definitions.
///
/// Definitions use the service's JSON layout: one object per field with
/// `type`, `offset` (bits), `elements` and `flags`, plus `__`-prefixed
/// metadata such as `__datasize`.
///
/// Implementations are shared by every stream of a session, so they must
/// be `Send + Sync`, and the returned future must be `Send` so decoding can
/// run on a multi-threaded runtime.
pub trait SchemaSource: Send + Sync + 'static {
    /// Fetch the definition of `rec_type`.
    fn fetch(&self, rec_type: &str) -> impl Future<Output = Result<Json, SourceError>> + Send;
}

/// Definitions held in memory.
///
/// An optional artificial delay makes every fetch suspend, which is how
/// tests exercise decoding while a definition is still in flight.
#[derive(Clone, Debug, Default)]
pub struct MemorySchemaSource {
    definitions: HashMap<String, Json>,
    delay: Option<Duration>,
}

impl MemorySchemaSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_definition(mut self, rec_type: impl Into<String>, definition: Json) -> Self {
        self.insert(rec_type, definition);
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&mut self, rec_type: impl Into<String>, definition: Json) {
        self.definitions.insert(rec_type.into(), definition);
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, Json)> for MemorySchemaSource {
    fn from_iter<I: IntoIterator<Item = (&'a str, Json)>>(iter: I) -> Self {
        let mut source = Self::new();
        for (rec_type, definition) in iter {
            source.insert(rec_type, definition);
        }
        source
    }
}

impl SchemaSource for MemorySchemaSource {
    fn fetch(&self, rec_type: &str) -> impl Future<Output = Result<Json, SourceError>> + Send {
        let result = self
            .definitions
            .get(rec_type)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                rec_type: rec_type.to_owned(),
            });
        let delay = self.delay;

        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }
}

/// Definitions stored as `<root>/<rec_type>.json` files.
///
/// Record types that could escape `root` (path separators, a leading dot)
/// are refused before touching the filesystem.
#[derive(Clone, Debug)]
pub struct DirectorySchemaSource {
    root: PathBuf,
}

impl DirectorySchemaSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, rec_type: &str) -> Result<PathBuf, SourceError> {
        let escapes = rec_type.is_empty()
            || rec_type.starts_with('.')
            || rec_type.contains(['/', '\\']);
        if escapes {
            return Err(SourceError::InvalidName {
                rec_type: rec_type.to_owned(),
            });
        }
        Ok(self.root.join(format!("{rec_type}.json")))
    }
}

impl SchemaSource for DirectorySchemaSource {
    fn fetch(&self, rec_type: &str) -> impl Future<Output = Result<Json, SourceError>> + Send {
        let path = self.path_for(rec_type);
        let rec_type = rec_type.to_owned();

        async move {
            let path = path?;
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(SourceError::NotFound { rec_type });
                }
                Err(e) => return Err(e.into()),
            };
            Ok(serde_json::from_str(&text)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_source_serves_definitions() {
        let source = MemorySchemaSource::new().with_definition("t", json!({ "__datasize": 4 }));
        assert_eq!(source.fetch("t").await.unwrap(), json!({ "__datasize": 4 }));
        assert!(matches!(
            source.fetch("u").await,
            Err(SourceError::NotFound { ref rec_type }) if rec_type == "u"
        ));
    }

    #[tokio::test]
    async fn memory_source_delay_suspends() {
        let source = MemorySchemaSource::new()
            .with_definition("t", json!({}))
            .with_delay(Duration::from_millis(20));
        let started = tokio::time::Instant::now();
        source.fetch("t").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn directory_source_reads_json_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("t.json"),
            r#"{ "value": { "type": "INT32", "offset": 0, "elements": 1, "flags": "" } }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let source = DirectorySchemaSource::new(dir.path());
        let definition = source.fetch("t").await.unwrap();
        assert_eq!(definition["value"]["type"], "INT32");

        assert!(matches!(source.fetch("missing").await, Err(SourceError::NotFound { .. })));
        assert!(matches!(source.fetch("broken").await, Err(SourceError::Json(_))));
    }

    #[tokio::test]
    async fn directory_source_refuses_escaping_names() {
        let source = DirectorySchemaSource::new("/definitions");
        for name in ["../etc/passwd", "a/b", ".hidden", ""] {
            assert!(matches!(
                source.fetch(name).await,
                Err(SourceError::InvalidName { .. })
            ));
        }
    }
}
