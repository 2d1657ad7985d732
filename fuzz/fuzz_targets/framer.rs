#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use recstream_decoder::Framer;

const LIMIT: usize = 1 << 16;

// Fuzz target: incremental framing must not depend on chunking.
//
// Input format:
//   byte 0: chunk size (0 is treated as 1)
//   bytes 1..: the record stream
//
// Frames the stream in one piece and again in chunks, and asserts both
// produce the same frames and the same outcome.
fuzz_target!(|data: &[u8]| {
    let Some((&size, stream)) = data.split_first() else {
        return;
    };
    let size = usize::from(size.max(1));

    let whole = Framer::frame_all(Bytes::copy_from_slice(stream), LIMIT);

    let mut framer = Framer::new(LIMIT);
    let mut frames = Vec::new();
    let mut failed = false;
    'chunks: for chunk in stream.chunks(size) {
        framer.push(Bytes::copy_from_slice(chunk));
        loop {
            match framer.next_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(_) => {
                    failed = true;
                    break 'chunks;
                }
            }
        }
    }
    let chunked_ok = !failed && framer.finish().is_ok();

    match whole {
        Ok(expected) => {
            assert!(chunked_ok);
            assert_eq!(frames, expected);
        }
        Err(_) => assert!(!chunked_ok),
    }
});
