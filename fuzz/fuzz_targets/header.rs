#![no_main]

use libfuzzer_sys::fuzz_target;
use recstream_wire::{FrameHeader, RecordFrame};

// Fuzz target: record header and whole-frame parsing with arbitrary bytes.
//
// Catches bugs in:
// - Version checking
// - Truncated header handling
// - Length arithmetic on hostile type_len / payload_len
// - Type name terminator and ASCII validation
fuzz_target!(|data: &[u8]| {
    let _ = FrameHeader::read_from(data);
    let _ = RecordFrame::read_from(data);
});
