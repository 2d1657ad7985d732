use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

/// FIFO of received chunks, consumed by exact byte counts.
///
/// Chunks are kept as delivered by the transport. Taking a span that lies
/// inside the front chunk is a zero-copy `split_to`; a span that crosses
/// chunk boundaries is copied once into a fresh buffer. Every pushed byte
/// is taken exactly once.
#[derive(Debug, Default)]
pub struct ChunkQueue {
    chunks: VecDeque<Bytes>,
    len: usize,
}

impl ChunkQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.chunks.push_back(chunk);
    }

    /// Total buffered bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of chunks currently held.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Remove and return exactly `n` bytes, or `None` if fewer are buffered.
    pub fn take(&mut self, n: usize) -> Option<Bytes> {
        if n > self.len {
            return None;
        }
        if n == 0 {
            return Some(Bytes::new());
        }

        let front = self.chunks.front_mut()?;
        if front.len() >= n {
            let span = front.split_to(n);
            if front.is_empty() {
                self.chunks.pop_front();
            }
            self.len -= n;
            return Some(span);
        }

        let mut span = BytesMut::with_capacity(n);
        while span.len() < n {
            let Some(front) = self.chunks.front_mut() else {
                break;
            };
            let want = n - span.len();
            if front.len() <= want {
                span.extend_from_slice(front);
                self.chunks.pop_front();
            } else {
                span.extend_from_slice(&front.split_to(want));
            }
        }
        self.len -= span.len();
        Some(span.freeze())
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_within_one_chunk_is_zero_copy() {
        let chunk = Bytes::from_static(b"abcdef");
        let base = chunk.as_ptr();
        let mut queue = ChunkQueue::new();
        queue.push(chunk);

        let span = queue.take(4).unwrap();
        assert_eq!(&span[..], b"abcd");
        assert_eq!(span.as_ptr(), base);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn span_across_chunks_is_joined() {
        let mut queue = ChunkQueue::new();
        queue.push(Bytes::from_static(b"ab"));
        queue.push(Bytes::from_static(b"cd"));
        queue.push(Bytes::from_static(b"ef"));

        assert_eq!(&queue.take(5).unwrap()[..], b"abcde");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.chunk_count(), 1);
        assert_eq!(&queue.take(1).unwrap()[..], b"f");
        assert!(queue.is_empty());
    }

    #[test]
    fn short_queue_yields_nothing() {
        let mut queue = ChunkQueue::new();
        queue.push(Bytes::from_static(b"abc"));
        assert!(queue.take(4).is_none());
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn empty_chunks_are_ignored() {
        let mut queue = ChunkQueue::new();
        queue.push(Bytes::new());
        assert_eq!(queue.chunk_count(), 0);
        assert_eq!(queue.take(0).unwrap().len(), 0);
    }
}
