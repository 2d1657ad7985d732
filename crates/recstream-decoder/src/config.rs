/// Default upper bound on a single record (type name + payload): 64 MiB.
pub const DEFAULT_MAX_RECORD_SIZE: usize = 64 * 1024 * 1024;

/// Record type whose payload embeds a further record stream.
pub const DEFAULT_CONTAINER_TYPE: &str = "conrec";

/// Configuration for a decoding [`Session`](crate::Session).
///
/// ```text
/// ┌──────────────────┬──────────────────────────────────────────────────┐
/// │ Field            │ Purpose                                          │
/// ├──────────────────┼──────────────────────────────────────────────────┤
/// │ max_record_size  │ Refuse headers declaring larger records          │
/// │ decode_aux       │ Include fields flagged AUX in decoded records    │
/// │ on_record_error  │ Abort the stream or skip the failing record      │
/// │ container_type   │ Record type unpacked as a nested stream          │
/// │ builtin_handlers │ Log eventrec / exceptrec instead of returning    │
/// └──────────────────┴──────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug)]
pub struct DecoderConfig {
    /// Largest record, in bytes after the header, the framer will buffer.
    pub max_record_size: usize,

    /// When `false`, fields flagged `AUX` are left out of decoded records.
    pub decode_aux: bool,

    /// What to do when one record fails to decode.
    pub on_record_error: RecordErrorPolicy,

    /// Record type whose `start` field points at an embedded record
    /// stream. `None` disables container unpacking.
    pub container_type: Option<String>,

    /// Install the logging handlers for `eventrec` and `exceptrec`.
    pub builtin_handlers: bool,
}

impl Default for DecoderConfig {
    /// 64 MiB record limit, every field decoded, abort on the first bad
    /// record, `conrec` unpacked, built-in handlers installed.
    fn default() -> Self {
        Self {
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
            decode_aux: true,
            on_record_error: RecordErrorPolicy::default(),
            container_type: Some(DEFAULT_CONTAINER_TYPE.to_owned()),
            builtin_handlers: true,
        }
    }
}

/// How record-level decode errors are handled.
///
/// Framing errors (bad version, truncation, oversized records, transport
/// failures) always end the stream regardless of this policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecordErrorPolicy {
    /// Fail the stream with the error.
    #[default]
    Abort,

    /// Log the error, note it in the summary, and continue with the next
    /// record.
    Skip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DecoderConfig::default();
        assert_eq!(config.max_record_size, 64 * 1024 * 1024);
        assert!(config.decode_aux);
        assert_eq!(config.on_record_error, RecordErrorPolicy::Abort);
        assert_eq!(config.container_type.as_deref(), Some("conrec"));
        assert!(config.builtin_handlers);
    }
}
