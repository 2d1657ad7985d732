//! How decoded records reach the caller: container unpacking, record
//! handlers, the record error policy and auxiliary field filtering.

use std::sync::{Arc, Mutex};

use recstream_decoder::{
    DecodeError, DecoderConfig, RecordErrorPolicy, SchemaFetchError, Session, SourceError,
};
use recstream_encoder::StreamEncoder;
use recstream_tests::fixtures::{encode, event, exception, point, schemas, source, stamp, track};
use recstream_tests::transport;
use recstream_types::{Record, TypeError, Value};

fn skipping() -> DecoderConfig {
    DecoderConfig {
        on_record_error: RecordErrorPolicy::Skip,
        ..DecoderConfig::default()
    }
}

// ── Containers ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn container_records_are_replaced_by_their_contents() {
    let inner = encode(&[point(1, 1), point(2, 2)]);
    let mut encoder = StreamEncoder::new(schemas());
    encoder
        .add_record(point(0, 0))
        .add_container("conrec", inner)
        .add_record(point(3, 3));
    let bytes = encoder.encode().unwrap();

    let decoded = Session::new(source())
        .decode_all(transport::fixed(&bytes, 5))
        .await
        .unwrap();

    assert_eq!(
        decoded.records,
        vec![point(0, 0), point(1, 1), point(2, 2), point(3, 3)]
    );
    assert_eq!(decoded.summary.records.get("conrec"), Some(&1));
    assert_eq!(decoded.summary.records.get("point"), Some(&4));
    assert_eq!(decoded.summary.bytes_processed, bytes.len() as u64);
}

#[tokio::test]
async fn containers_nest() {
    let innermost = encode(&[point(9, 9)]);
    let mut middle = StreamEncoder::new(schemas());
    middle.add_container("conrec", innermost);
    let mut outer = StreamEncoder::new(schemas());
    outer.add_container("conrec", middle.encode().unwrap());

    let decoded = Session::new(source())
        .decode_bytes(outer.encode().unwrap())
        .await
        .unwrap();
    assert_eq!(decoded.records, vec![point(9, 9)]);
    assert_eq!(decoded.summary.records.get("conrec"), Some(&2));
}

#[tokio::test]
async fn container_unpacking_can_be_disabled() {
    let mut encoder = StreamEncoder::new(schemas());
    encoder.add_container("conrec", encode(&[point(1, 1)]));
    let config = DecoderConfig {
        container_type: None,
        ..DecoderConfig::default()
    };

    let decoded = Session::with_config(source(), config)
        .decode_bytes(encoder.encode().unwrap())
        .await
        .unwrap();
    assert_eq!(decoded.records.len(), 1);
    assert_eq!(decoded.records[0].rec_type(), "conrec");
    assert_eq!(decoded.records[0].get("start"), Some(&Value::UInt32(4)));
}

#[tokio::test]
async fn container_start_past_the_payload_is_an_error() {
    let mut encoder = StreamEncoder::new(schemas());
    encoder.add_raw("conrec", &100u32.to_le_bytes());

    let err = Session::new(source())
        .decode_bytes(encoder.encode().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, DecodeError::MissingContainerStart { ref rec_type } if rec_type == "conrec"));
}

#[tokio::test]
async fn truncated_container_contents_fail_the_container() {
    let mut inner = encode(&[point(1, 1)]);
    inner.pop();
    let mut encoder = StreamEncoder::new(schemas());
    encoder.add_container("conrec", inner).add_record(point(2, 2));
    let bytes = encoder.encode().unwrap();

    let err = Session::new(source()).decode_bytes(bytes.clone()).await.unwrap_err();
    assert!(matches!(err, DecodeError::TruncatedStream { .. }));

    let decoded = Session::with_config(source(), skipping())
        .decode_bytes(bytes)
        .await
        .unwrap();
    assert_eq!(decoded.records, vec![point(2, 2)]);
    assert_eq!(decoded.summary.skipped[0].rec_type, "conrec");
    assert_eq!(decoded.summary.records.get("conrec"), None);
}

// ── Handlers ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn service_records_go_to_the_builtin_handlers() {
    let bytes = encode(&[
        event(1, "node-1", "starting"),
        point(1, 2),
        exception(-2, "disk full"),
    ]);

    let decoded = Session::new(source()).decode_bytes(bytes).await.unwrap();
    assert_eq!(decoded.records, vec![point(1, 2)]);
    assert_eq!(decoded.summary.records.get("eventrec"), Some(&1));
    assert_eq!(decoded.summary.records.get("exceptrec"), Some(&1));
}

#[tokio::test]
async fn builtin_handlers_can_be_disabled() {
    let config = DecoderConfig {
        builtin_handlers: false,
        ..DecoderConfig::default()
    };
    let decoded = Session::with_config(source(), config)
        .decode_bytes(encode(&[event(2, "node-1", "slow disk")]))
        .await
        .unwrap();

    assert_eq!(decoded.records, vec![event(2, "node-1", "slow disk")]);
}

#[tokio::test]
async fn custom_handler_sees_records_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let bytes = encode(&[point(1, 0), stamp(0, 1, None), point(2, 0), point(3, 0)]);

    let session = Session::new(source());
    let decoded = session
        .stream(transport::fixed(&bytes, 2))
        .with_handler("point", move |record: &Record| {
            let x = record.get("x").and_then(Value::as_i64);
            sink.lock().unwrap().push(x);
        })
        .collect()
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![Some(1), Some(2), Some(3)]);
    assert_eq!(decoded.records.len(), 1);
    assert_eq!(decoded.records[0].rec_type(), "stamp");
}

#[tokio::test]
async fn custom_handler_replaces_a_builtin() {
    let count = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&count);

    let session = Session::new(source());
    let mut stream = session.stream(transport::fixed(&encode(&[exception(1, "ok")]), 64));
    stream.handlers_mut().register("exceptrec", move |_: &Record| {
        *counter.lock().unwrap() += 1;
    });
    stream.collect().await.unwrap();

    assert_eq!(*count.lock().unwrap(), 1);
}

// ── Record error policy ───────────────────────────────────────────────────────

#[tokio::test]
async fn skip_policy_continues_past_bad_records() {
    let mut encoder = StreamEncoder::new(schemas());
    encoder
        .add_record(point(1, 1))
        .add_raw("flagrec", &[1])
        .add_raw("nosuchrec", &[1, 2])
        .add_record(point(2, 2));

    let decoded = Session::with_config(source(), skipping())
        .decode_bytes(encoder.encode().unwrap())
        .await
        .unwrap();

    assert_eq!(decoded.records, vec![point(1, 1), point(2, 2)]);
    let skipped = &decoded.summary.skipped;
    assert_eq!(skipped.len(), 2);
    assert_eq!(skipped[0].rec_type, "flagrec");
    assert!(matches!(
        skipped[0].error.root(),
        DecodeError::Type(TypeError::UnsupportedFieldKind { .. })
    ));
    assert_eq!(skipped[1].rec_type, "nosuchrec");
    assert!(matches!(
        skipped[1].error,
        DecodeError::SchemaFetchFailed { source: SchemaFetchError::Source(ref e), .. }
            if matches!(**e, SourceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn abort_policy_stops_at_the_first_bad_record() {
    let mut encoder = StreamEncoder::new(schemas());
    encoder.add_record(point(1, 1)).add_raw("flagrec", &[1]);

    let session = Session::new(source());
    let mut stream = session.stream(transport::fixed(&encoder.encode().unwrap(), 64));

    assert!(stream.next().await.unwrap().is_ok());
    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(err.field_path(), vec!["bits"]);
    assert!(stream.next().await.is_none());
}

// ── Auxiliary fields ──────────────────────────────────────────────────────────

#[tokio::test]
async fn aux_fields_are_decoded_by_default() {
    let decoded = Session::new(source())
        .decode_bytes(encode(&[stamp(5, 1, Some(7))]))
        .await
        .unwrap();
    assert_eq!(decoded.records[0].get("note"), Some(&Value::UInt8(7)));
}

#[tokio::test]
async fn aux_fields_can_be_filtered() {
    let config = DecoderConfig {
        decode_aux: false,
        ..DecoderConfig::default()
    };
    let decoded = Session::with_config(source(), config)
        .decode_bytes(encode(&[stamp(5, 1, Some(7)), track(1, "x", point(0, 0), &[])]))
        .await
        .unwrap();

    assert_eq!(decoded.records[0], stamp(5, 1, None));
    assert_eq!(decoded.records[1].len(), 4);
}
