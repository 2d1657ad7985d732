use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use recstream_decoder::MemorySchemaSource;
use recstream_encoder::{SchemaSet, StreamEncoder};
use recstream_types::{Record, Value};
use serde_json::{Value as Json, json};

/// Record definitions used across the test suite.
///
/// ```text
/// point      x:INT16(BE)  y:INT16                          __datasize 4
/// track      id:UINT8  name:STRING[8]  origin:point  heights:DOUBLE[*]
/// stamp      time:TIME8  seq:UINT32  note:UINT8(AUX)       __datasize 13
/// flagrec    bits:BITFIELD
/// conrec     start:UINT32                                  __datasize 4
/// eventrec   time:INT64  level:UINT8  source:STRING[8]  message:STRING[*]
/// exceptrec  code:INT32  level:UINT8  text:STRING[*]
/// ```
pub fn definitions() -> Vec<(&'static str, Json)> {
    vec![
        (
            "point",
            json!({
                "x": { "type": "INT16", "offset": 0,  "elements": 1, "flags": "BE" },
                "y": { "type": "INT16", "offset": 16, "elements": 1, "flags": "LE" },
                "__datasize": 4
            }),
        ),
        (
            "track",
            json!({
                "id":      { "type": "UINT8",  "offset": 0,   "elements": 1, "flags": "" },
                "name":    { "type": "STRING", "offset": 8,   "elements": 8, "flags": "" },
                "origin":  { "type": "point",  "offset": 72,  "elements": 1, "flags": "" },
                "heights": { "type": "DOUBLE", "offset": 104, "elements": 0, "flags": "" }
            }),
        ),
        (
            "stamp",
            json!({
                "time": { "type": "TIME8",  "offset": 0,  "elements": 1, "flags": "" },
                "seq":  { "type": "UINT32", "offset": 64, "elements": 1, "flags": "BE" },
                "note": { "type": "UINT8",  "offset": 96, "elements": 1, "flags": "AUX" },
                "__datasize": 13
            }),
        ),
        (
            "flagrec",
            json!({ "bits": { "type": "BITFIELD", "offset": 0, "elements": 1, "flags": "" } }),
        ),
        (
            "conrec",
            json!({
                "start": { "type": "UINT32", "offset": 0, "elements": 1, "flags": "" },
                "__datasize": 4
            }),
        ),
        (
            "eventrec",
            json!({
                "time":    { "type": "INT64",  "offset": 0,   "elements": 1, "flags": "" },
                "level":   { "type": "UINT8",  "offset": 64,  "elements": 1, "flags": "" },
                "source":  { "type": "STRING", "offset": 72,  "elements": 8, "flags": "" },
                "message": { "type": "STRING", "offset": 136, "elements": 0, "flags": "" }
            }),
        ),
        (
            "exceptrec",
            json!({
                "code":  { "type": "INT32",  "offset": 0,  "elements": 1, "flags": "" },
                "level": { "type": "UINT8",  "offset": 32, "elements": 1, "flags": "" },
                "text":  { "type": "STRING", "offset": 40, "elements": 0, "flags": "" }
            }),
        ),
    ]
}

/// The definitions as an encoder schema set.
///
/// # Panics
///
/// If a fixture definition is invalid.
pub fn schemas() -> SchemaSet {
    let definitions = definitions();
    SchemaSet::from_json(definitions.iter().map(|(name, json)| (*name, json)))
        .expect("fixture definitions are valid")
}

/// The definitions as an in-memory schema source.
pub fn source() -> MemorySchemaSource {
    definitions().into_iter().collect()
}

pub fn point(x: i16, y: i16) -> Record {
    Record::new("point", BTreeMap::new())
        .with_field("x", Value::Int16(x))
        .with_field("y", Value::Int16(y))
}

/// A track record. `heights` must not hold exactly one value: a single
/// element decodes back as a scalar.
pub fn track(id: u8, name: &str, origin: Record, heights: &[f64]) -> Record {
    Record::new("track", BTreeMap::new())
        .with_field("id", Value::UInt8(id))
        .with_field("name", Value::Str(name.to_owned()))
        .with_field("origin", Value::Record(origin))
        .with_field(
            "heights",
            Value::List(heights.iter().copied().map(Value::Double).collect()),
        )
}

/// # Panics
///
/// If `millis` is outside chrono's range.
pub fn stamp(millis: i64, seq: u32, note: Option<u8>) -> Record {
    let time = DateTime::<Utc>::from_timestamp_millis(millis).expect("timestamp in range");
    let record = Record::new("stamp", BTreeMap::new())
        .with_field("time", Value::Time(time))
        .with_field("seq", Value::UInt32(seq));
    match note {
        Some(note) => record.with_field("note", Value::UInt8(note)),
        None => record,
    }
}

pub fn event(level: u8, source: &str, message: &str) -> Record {
    Record::new("eventrec", BTreeMap::new())
        .with_field("time", Value::Int64(1_000))
        .with_field("level", Value::UInt8(level))
        .with_field("source", Value::Str(source.to_owned()))
        .with_field("message", Value::Str(message.to_owned()))
}

pub fn exception(code: i32, text: &str) -> Record {
    Record::new("exceptrec", BTreeMap::new())
        .with_field("code", Value::Int32(code))
        .with_field("level", Value::UInt8(3))
        .with_field("text", Value::Str(text.to_owned()))
}

/// Encode `records` as one stream using the fixture schemas.
///
/// # Panics
///
/// If a record does not fit its schema.
pub fn encode(records: &[Record]) -> Vec<u8> {
    let mut encoder = StreamEncoder::new(schemas());
    for record in records {
        encoder.add_record(record.clone());
    }
    encoder.encode().expect("fixture records encode")
}

/// A mixed stream of every decodable fixture type.
pub fn sample_records() -> Vec<Record> {
    vec![
        track(1, "ATL", point(-3, 4), &[1.5, 2.5]),
        stamp(1_700_000_000_000, 1, Some(9)),
        track(2, "GT1L", point(10, -20), &[]),
        stamp(1_700_000_000_250, 2, Some(0)),
        track(3, "GT2R", point(i16::MIN, i16::MAX), &[0.0, -1.0, 1e9]),
    ]
}
