use std::collections::HashMap;

use recstream_types::{Record, Value};
use tracing::{debug, error, info, warn};

/// Record type of service log messages.
pub const EVENT_RECORD: &str = "eventrec";

/// Record type of service alerts.
pub const EXCEPTION_RECORD: &str = "exceptrec";

/// Receives records of one type instead of the caller.
///
/// Implemented for any `FnMut(&Record) + Send` closure.
pub trait RecordHandler: Send {
    fn handle(&mut self, record: &Record);
}

impl<F> RecordHandler for F
where
    F: FnMut(&Record) + Send,
{
    fn handle(&mut self, record: &Record) {
        self(record);
    }
}

/// Record handlers keyed by record type.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn RecordHandler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the `eventrec` and `exceptrec` logging handlers.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(EVENT_RECORD, log_event);
        registry.register(EXCEPTION_RECORD, log_exception);
        registry
    }

    /// Route records of `rec_type` to `handler`, replacing any previous one.
    pub fn register(&mut self, rec_type: impl Into<String>, handler: impl RecordHandler + 'static) {
        self.handlers.insert(rec_type.into(), Box::new(handler));
    }

    pub fn remove(&mut self, rec_type: &str) -> bool {
        self.handlers.remove(rec_type).is_some()
    }

    pub fn contains(&self, rec_type: &str) -> bool {
        self.handlers.contains_key(rec_type)
    }

    /// Hand `record` to its handler. Returns `false` if none is registered.
    pub fn dispatch(&mut self, record: &Record) -> bool {
        match self.handlers.get_mut(record.rec_type()) {
            Some(handler) => {
                handler.handle(record);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// `eventrec`: `"{time}:{source}: {message}"` at the record's level.
fn log_event(record: &Record) {
    let message = format!(
        "{}:{}: {}",
        field(record, "time"),
        field(record, "source"),
        field(record, "message"),
    );
    log_at(level(record), &message);
}

/// `exceptrec`: negative codes are alerts, others plain messages.
fn log_exception(record: &Record) {
    let text = field(record, "text");
    let code = record.get("code").and_then(Value::as_i64).unwrap_or(0);
    let message = if code < 0 {
        format!("Alert <{code}>: {text}")
    } else {
        text
    };
    log_at(level(record), &message);
}

fn field(record: &Record, name: &str) -> String {
    record.get(name).map(ToString::to_string).unwrap_or_default()
}

fn level(record: &Record) -> i64 {
    record.get("level").and_then(Value::as_i64).unwrap_or(1)
}

// 0 debug, 1 info, 2 warning, 3 error, 4 critical (no tracing equivalent)
fn log_at(level: i64, message: &str) {
    match level {
        i64::MIN..=0 => debug!(target: "recstream::service", "{message}"),
        1 => info!(target: "recstream::service", "{message}"),
        2 => warn!(target: "recstream::service", "{message}"),
        _ => error!(target: "recstream::service", "{message}"),
    }
}
