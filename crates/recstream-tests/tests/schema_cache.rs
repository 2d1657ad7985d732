//! Schema cache idempotence across streams of one session.
//!
//! Each record type is fetched from the source exactly once per session,
//! however many records use it, whether the streams run one after another
//! or concurrently, and however long the source takes to answer.

use std::time::Duration;

use recstream_decoder::{DecodeError, DirectorySchemaSource, SchemaFetchError, Session, SourceError};
use recstream_tests::fixtures::{definitions, encode, point, sample_records, source, track};
use recstream_tests::transport;

#[tokio::test]
async fn sequential_streams_fetch_each_type_once() {
    let session = Session::new(source());
    let bytes = encode(&sample_records());

    for _ in 0..3 {
        session.decode_bytes(bytes.clone()).await.unwrap();
    }

    // track, point (nested in track), stamp
    assert_eq!(session.cache().fetch_count(), 3);
    assert_eq!(session.cache().len(), 3);
    assert!(session.cache().contains("point"));
}

#[tokio::test]
async fn concurrent_streams_share_in_flight_fetches() {
    let session = Session::new(source().with_delay(Duration::from_millis(20)));
    let bytes = encode(&sample_records());

    let (a, b, c) = tokio::join!(
        session.decode_all(transport::fixed(&bytes, 7)),
        session.decode_all(transport::fixed(&bytes, 1)),
        session.decode_bytes(bytes.clone()),
    );

    assert_eq!(a.unwrap().records, sample_records());
    assert_eq!(b.unwrap().records, sample_records());
    assert_eq!(c.unwrap().records, sample_records());
    assert_eq!(session.cache().fetch_count(), 3);
}

#[tokio::test]
async fn records_decoded_while_definition_is_in_flight_keep_their_order() {
    let session = Session::new(source().with_delay(Duration::from_millis(5)));
    let records: Vec<_> = (0..20)
        .map(|i| track(i, "order", point(i16::from(i), 0), &[]))
        .collect();

    let decoded = session
        .decode_all(transport::fixed(&encode(&records), 3))
        .await
        .unwrap();
    assert_eq!(decoded.records, records);
    assert_eq!(session.cache().fetch_count(), 2);
}

#[tokio::test]
async fn failed_fetch_is_retried_by_the_next_stream() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(DirectorySchemaSource::new(dir.path()));
    let bytes = encode(&[point(1, 2)]);

    let err = session.decode_bytes(bytes.clone()).await.unwrap_err();
    assert!(matches!(
        err,
        DecodeError::SchemaFetchFailed { source: SchemaFetchError::Source(ref e), .. }
            if matches!(**e, SourceError::NotFound { .. })
    ));
    assert!(!session.cache().contains("point"));

    for (name, definition) in definitions() {
        std::fs::write(dir.path().join(format!("{name}.json")), definition.to_string()).unwrap();
    }
    let decoded = session.decode_bytes(bytes).await.unwrap();
    assert_eq!(decoded.records, vec![point(1, 2)]);
    assert_eq!(session.cache().fetch_count(), 2);
}

#[tokio::test]
async fn directory_source_decodes_a_stream() {
    let dir = tempfile::tempdir().unwrap();
    for (name, definition) in definitions() {
        std::fs::write(dir.path().join(format!("{name}.json")), definition.to_string()).unwrap();
    }
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let session = Session::new(DirectorySchemaSource::new(dir.path()));
    let decoded = session.decode_bytes(encode(&sample_records())).await.unwrap();
    assert_eq!(decoded.records, sample_records());

    let err = session.cache().resolve("broken").await.unwrap_err();
    assert!(matches!(
        err,
        DecodeError::SchemaFetchFailed { source: SchemaFetchError::Source(ref e), .. }
            if matches!(**e, SourceError::Json(_))
    ));
}
