use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use recstream_types::{FieldType, RecordSchema};
use tracing::{debug, warn};

use crate::error::{DecodeError, SchemaFetchError};
use crate::source::SchemaSource;

type FetchResult = Result<Arc<RecordSchema>, SchemaFetchError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Cache state for one record type.
enum Slot {
    Ready(Arc<RecordSchema>),
    /// A fetch is in flight; every caller awaits the same future.
    Pending(SharedFetch),
}

type Slots = Mutex<HashMap<String, Slot>>;

/// Lazily populated, session-scoped map from record type to schema.
///
/// ```text
///   resolve("t")
///     ├── Ready(schema)  → return it, no I/O
///     ├── Pending(fut)   → await the in-flight fetch (coalesced)
///     └── absent         → insert Pending(fut), await it
///                             fut: source.fetch → parse → slot = Ready
///                                  on failure the slot is removed
/// ```
///
/// The first request for a name issues exactly one fetch; concurrent
/// requests for the same name share it. A successful definition is stored
/// before any waiter resumes and is never replaced. Failures are not
/// cached, so a later request retries.
///
/// The lock is only held for map lookups and updates, never across an
/// `.await`. Cloning is cheap and clones share the same cache.
pub struct SchemaCache<S> {
    source: Arc<S>,
    slots: Arc<Slots>,
    fetches: Arc<AtomicUsize>,
}

impl<S> Clone for SchemaCache<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            slots: Arc::clone(&self.slots),
            fetches: Arc::clone(&self.fetches),
        }
    }
}

impl<S: SchemaSource> SchemaCache<S> {
    pub fn new(source: S) -> Self {
        Self::from_shared(Arc::new(source))
    }

    pub fn from_shared(source: Arc<S>) -> Self {
        Self {
            source,
            slots: Arc::new(Mutex::new(HashMap::new())),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Return the schema for `rec_type`, fetching it on first use.
    ///
    /// # Errors
    ///
    /// [`DecodeError::SchemaFetchFailed`] if the source fails or returns a
    /// structurally invalid definition.
    pub async fn resolve(&self, rec_type: &str) -> Result<Arc<RecordSchema>, DecodeError> {
        let fetch = {
            let mut slots = lock(&self.slots);
            match slots.get(rec_type) {
                Some(Slot::Ready(schema)) => return Ok(Arc::clone(schema)),
                Some(Slot::Pending(fetch)) => fetch.clone(),
                None => {
                    let fetch = self.start_fetch(rec_type);
                    slots.insert(rec_type.to_owned(), Slot::Pending(fetch.clone()));
                    fetch
                }
            }
        };

        fetch.await.map_err(|source| DecodeError::SchemaFetchFailed {
            rec_type: rec_type.to_owned(),
            source,
        })
    }

    /// The declared type of one field of `rec_type`, fetching the definition
    /// if needed. `None` if the record type has no such field.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub async fn field_kind(&self, rec_type: &str, field: &str) -> Result<Option<FieldType>, DecodeError> {
        let schema = self.resolve(rec_type).await?;
        Ok(schema.field(field).map(|f| f.field_type.clone()))
    }

    /// Number of fetches issued to the source so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Number of record types with a stored schema.
    pub fn len(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a schema for `rec_type` is stored (not merely in flight).
    pub fn contains(&self, rec_type: &str) -> bool {
        matches!(lock(&self.slots).get(rec_type), Some(Slot::Ready(_)))
    }

    fn start_fetch(&self, rec_type: &str) -> SharedFetch {
        let source = Arc::clone(&self.source);
        let slots = Arc::clone(&self.slots);
        let fetches = Arc::clone(&self.fetches);
        let rec_type = rec_type.to_owned();

        async move {
            fetches.fetch_add(1, Ordering::Relaxed);
            debug!(rec_type = %rec_type, "fetching record definition");

            let result = match source.fetch(&rec_type).await {
                Ok(definition) => RecordSchema::from_json(&rec_type, &definition)
                    .map(Arc::new)
                    .map_err(SchemaFetchError::from),
                Err(error) => Err(SchemaFetchError::from(error)),
            };

            settle(&slots, &rec_type, &result);
            result
        }
        .boxed()
        .shared()
    }
}

/// Store a finished fetch: the schema on success, nothing on failure.
fn settle(slots: &Slots, rec_type: &str, result: &FetchResult) {
    let mut slots = lock(slots);
    match result {
        Ok(schema) => {
            debug!(rec_type, fields = schema.len(), "record definition cached");
            slots.insert(rec_type.to_owned(), Slot::Ready(Arc::clone(schema)));
        }
        Err(error) => {
            warn!(rec_type, %error, "record definition fetch failed");
            slots.remove(rec_type);
        }
    }
}

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<String, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySchemaSource, SourceError};
    use recstream_types::{PrimitiveKind, SchemaError};
    use serde_json::json;
    use std::time::Duration;

    fn source() -> MemorySchemaSource {
        MemorySchemaSource::new()
            .with_definition(
                "t",
                json!({ "value": { "type": "INT32", "offset": 0, "elements": 1, "flags": "" } }),
            )
            .with_definition("bad", json!([1, 2, 3]))
    }

    #[tokio::test]
    async fn second_resolve_hits_cache() {
        let cache = SchemaCache::new(source());
        let first = cache.resolve("t").await.unwrap();
        let second = cache.resolve("t").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.fetch_count(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("t"));
    }

    #[tokio::test]
    async fn concurrent_resolves_share_one_fetch() {
        let cache = SchemaCache::new(source().with_delay(Duration::from_millis(10)));
        let (a, b, c) = tokio::join!(cache.resolve("t"), cache.resolve("t"), cache.resolve("t"));

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert!(c.is_ok());
        assert_eq!(cache.fetch_count(), 1);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let cache = SchemaCache::new(source());
        let clone = cache.clone();
        cache.resolve("t").await.unwrap();
        assert!(clone.contains("t"));
        assert_eq!(clone.fetch_count(), 1);
    }

    #[tokio::test]
    async fn missing_definition_is_not_cached() {
        let cache = SchemaCache::new(source());
        for _ in 0..2 {
            let err = cache.resolve("nope").await.unwrap_err();
            assert!(matches!(
                err,
                DecodeError::SchemaFetchFailed { ref rec_type, source: SchemaFetchError::Source(ref e) }
                    if rec_type == "nope" && matches!(**e, SourceError::NotFound { .. })
            ));
        }
        assert_eq!(cache.fetch_count(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn invalid_definition_fails() {
        let cache = SchemaCache::new(source());
        assert!(matches!(
            cache.resolve("bad").await,
            Err(DecodeError::SchemaFetchFailed {
                source: SchemaFetchError::Invalid(SchemaError::NotAnObject),
                ..
            })
        ));
        assert!(!cache.contains("bad"));
    }

    /// A source backed by a service that is currently refusing requests.
    struct Unavailable;

    impl SchemaSource for Unavailable {
        async fn fetch(&self, rec_type: &str) -> Result<serde_json::Value, SourceError> {
            Err(SourceError::Other(format!("{rec_type}: service unavailable")))
        }
    }

    #[tokio::test]
    async fn custom_source_failures_are_reported() {
        let cache = SchemaCache::new(Unavailable);
        let err = cache.resolve("t").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to fetch definition of t: t: service unavailable"
        );
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn field_kind_reports_declared_type() {
        let cache = SchemaCache::new(source());
        assert_eq!(
            cache.field_kind("t", "value").await.unwrap(),
            Some(FieldType::Primitive(PrimitiveKind::Int32))
        );
        assert_eq!(cache.field_kind("t", "other").await.unwrap(), None);
    }
}
