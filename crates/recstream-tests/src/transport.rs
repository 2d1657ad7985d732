use std::io;

use bytes::Bytes;
use futures::Stream;
use futures::stream::{self, Iter};

/// A transport delivering pre-cut chunks.
pub type ChunkStream = Iter<std::vec::IntoIter<Result<Bytes, io::Error>>>;

/// Deliver `bytes` split at each offset in `cuts` (sorted, deduplicated,
/// out-of-range offsets ignored).
pub fn split_at(bytes: &[u8], cuts: &[usize]) -> ChunkStream {
    let mut cuts: Vec<usize> = cuts.iter().copied().filter(|&c| c < bytes.len()).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut from = 0;
    for cut in cuts.into_iter().chain([bytes.len()]) {
        chunks.push(Ok(Bytes::copy_from_slice(&bytes[from..cut])));
        from = cut;
    }
    stream::iter(chunks)
}

/// Deliver `bytes` in chunks of `size` bytes.
///
/// # Panics
///
/// If `size` is zero.
pub fn fixed(bytes: &[u8], size: usize) -> ChunkStream {
    let chunks: Vec<_> = bytes
        .chunks(size)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();
    stream::iter(chunks)
}

/// Deliver `bytes`, then fail.
pub fn failing_after(bytes: &[u8]) -> impl Stream<Item = Result<Bytes, io::Error>> + Unpin {
    stream::iter(vec![
        Ok(Bytes::copy_from_slice(bytes)),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
    ])
}
