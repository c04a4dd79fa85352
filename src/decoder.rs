//! Incremental decoding of the inotify byte stream.
//!
//! The kernel only ever hands out whole records, possibly many per read. The
//! decoder keeps the bytes of the last read in one buffer and yields one
//! record per call until they are used up; only then does the caller need to
//! read again.

use std::io;

use tracing::trace;

use crate::error::ChannelError;
use crate::event::{decode_record, EventRecord, HEADER_SIZE};

pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;
pub const MIN_BUFFER_CAPACITY: usize = HEADER_SIZE;
pub const MAX_BUFFER_CAPACITY: usize = 1 << 20;

/// Read buffer plus a cursor separating yielded records from pending bytes.
///
/// `buffer[..start]` has been yielded, `buffer[start..end]` is pending and
/// `buffer[end..]` is free space for the next read.
#[derive(Debug)]
pub struct EventDecoder {
    buffer: Vec<u8>,
    start: usize,
    end: usize,
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }
}

impl EventDecoder {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(MIN_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY);
        EventDecoder {
            buffer: vec![0; capacity],
            start: 0,
            end: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes read but not yet decoded.
    pub fn pending(&self) -> usize {
        self.end - self.start
    }

    /// Decode the next buffered record without touching the channel.
    ///
    /// `Ok(None)` means the buffer is drained and a read is needed. Pending
    /// bytes that do not hold a whole record are a protocol violation; the
    /// cursor does not move in that case.
    pub fn next_buffered(&mut self) -> Result<Option<EventRecord>, ChannelError> {
        if self.start == self.end {
            return Ok(None);
        }

        let (record, span) = decode_record(&self.buffer[self.start..self.end])?;
        self.start += span;
        trace!(
            wd = record.wd.0,
            mask = ?record.mask,
            cookie = record.cookie,
            name = ?record.name,
            pending = self.pending(),
            "decoded event"
        );
        Ok(Some(record))
    }

    /// Perform one read into the free part of the buffer.
    ///
    /// `read` gets the free space and reports how many bytes it wrote, which
    /// is exactly what `read(2)` on the inotify descriptor does.
    pub fn fill<F>(&mut self, read: F) -> Result<usize, ChannelError>
    where
        F: FnOnce(&mut [u8]) -> io::Result<usize>,
    {
        self.compact();
        let n = read(self.spare_mut()).map_err(ChannelError::Read)?;
        self.commit(n)
    }

    /// Drop the yielded prefix so the whole tail is free for reading.
    pub(crate) fn compact(&mut self) {
        if self.start == 0 {
            return;
        }
        self.buffer.copy_within(self.start..self.end, 0);
        self.end -= self.start;
        self.start = 0;
    }

    pub(crate) fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[self.end..]
    }

    /// Account for `n` bytes written into [`spare_mut`](Self::spare_mut).
    pub(crate) fn commit(&mut self, n: usize) -> Result<usize, ChannelError> {
        let n = n.min(self.buffer.len() - self.end);
        self.end += n;
        trace!(read = n, pending = self.pending(), "filled event buffer");

        // The kernel never returns part of a record, so anything shorter than
        // one header after a read means the stream is broken.
        if self.pending() < HEADER_SIZE {
            return Err(ChannelError::Truncated {
                needed: HEADER_SIZE,
                available: self.pending(),
            });
        }
        Ok(n)
    }

    /// Double the buffer, up to [`MAX_BUFFER_CAPACITY`].
    ///
    /// Returns `false` if it is already at the limit.
    pub(crate) fn grow(&mut self) -> bool {
        let capacity = self.buffer.len();
        if capacity >= MAX_BUFFER_CAPACITY {
            return false;
        }
        self.buffer
            .resize((capacity * 2).min(MAX_BUFFER_CAPACITY), 0);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{encode_record, WatchDescriptor};
    use crate::mask::EventMask;
    use pretty_assertions::assert_eq;
    use std::ffi::OsString;

    fn records(n: usize) -> Vec<EventRecord> {
        (0..n)
            .map(|i| EventRecord {
                wd: WatchDescriptor(1 + (i % 3) as i32),
                mask: if i % 2 == 0 {
                    EventMask::CREATE
                } else {
                    EventMask::DELETE | EventMask::ISDIR
                },
                cookie: if i % 4 == 3 { 100 + i as u32 } else { 0 },
                // Mix of self events (no name) and names of varying length.
                name: if i % 5 == 4 {
                    OsString::new()
                } else {
                    OsString::from("n".repeat(i + 1))
                },
            })
            .collect()
    }

    fn encode_all(records: &[EventRecord]) -> Vec<Vec<u8>> {
        records
            .iter()
            .map(|r| {
                let field = if r.name.is_empty() { 0 } else { 16 * (1 + r.name.len() / 16) };
                encode_record(r, field)
            })
            .collect()
    }

    /// Feed `chunks` through `fill`, one read per chunk, decoding everything
    /// buffered between reads.
    fn decode_chunks(decoder: &mut EventDecoder, chunks: &[Vec<u8>]) -> Vec<EventRecord> {
        let mut out = Vec::new();
        for chunk in chunks {
            decoder
                .fill(|buf| {
                    buf[..chunk.len()].copy_from_slice(chunk);
                    Ok(chunk.len())
                })
                .unwrap();
            while let Some(record) = decoder.next_buffered().unwrap() {
                out.push(record);
            }
        }
        out
    }

    #[test]
    fn test_empty_decoder_needs_read() {
        let mut decoder = EventDecoder::default();
        assert_eq!(decoder.capacity(), DEFAULT_BUFFER_CAPACITY);
        assert!(decoder.next_buffered().unwrap().is_none());
    }

    #[test]
    fn test_batch_in_one_read_yields_one_per_call() {
        let expected = records(5);
        let batch: Vec<u8> = encode_all(&expected).concat();

        let mut decoder = EventDecoder::default();
        decoder
            .fill(|buf| {
                buf[..batch.len()].copy_from_slice(&batch);
                Ok(batch.len())
            })
            .unwrap();

        for record in &expected {
            assert_eq!(decoder.next_buffered().unwrap().as_ref(), Some(record));
        }
        assert!(decoder.next_buffered().unwrap().is_none());
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_every_chunking_preserves_order() {
        // Walk every way of splitting N records into consecutive reads.
        const N: usize = 7;
        let expected = records(N);
        let encoded = encode_all(&expected);

        for cuts in 0u32..(1 << (N - 1)) {
            let mut chunks = Vec::new();
            let mut current = Vec::new();
            for (i, bytes) in encoded.iter().enumerate() {
                current.extend_from_slice(bytes);
                if i == N - 1 || cuts & (1 << i) != 0 {
                    chunks.push(std::mem::take(&mut current));
                }
            }

            let mut decoder = EventDecoder::default();
            let decoded = decode_chunks(&mut decoder, &chunks);
            assert_eq!(decoded, expected, "chunking {:#b}", cuts);
            assert!(decoder.next_buffered().unwrap().is_none());
        }
    }

    #[test]
    fn test_consumed_records_are_not_repeated() {
        let expected = records(3);
        let encoded = encode_all(&expected);

        let mut decoder = EventDecoder::with_capacity(64);
        let first = decode_chunks(&mut decoder, &encoded[..1]);
        assert_eq!(first, expected[..1].to_vec());
        // Asking again without a read must not replay the first record.
        assert!(decoder.next_buffered().unwrap().is_none());
        assert!(decoder.next_buffered().unwrap().is_none());

        let rest = decode_chunks(&mut decoder, &encoded[1..]);
        assert_eq!(rest, expected[1..].to_vec());
    }

    #[test]
    fn test_small_buffer_is_reused_after_compaction() {
        // Each record is 32 bytes; the buffer holds exactly one.
        let expected = records(4);
        let encoded = encode_all(&expected);
        let mut decoder = EventDecoder::with_capacity(32);
        assert_eq!(decode_chunks(&mut decoder, &encoded), expected);
    }

    #[test]
    fn test_zero_byte_read_is_truncated() {
        let mut decoder = EventDecoder::default();
        let err = decoder.fill(|_| Ok(0)).unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Truncated {
                needed: HEADER_SIZE,
                available: 0
            }
        ));
    }

    #[test]
    fn test_partial_record_is_reported_and_cursor_stays() {
        let bytes = encode_all(&records(1)).concat();
        let half = &bytes[..bytes.len() - 4];

        let mut decoder = EventDecoder::default();
        decoder
            .fill(|buf| {
                buf[..half.len()].copy_from_slice(half);
                Ok(half.len())
            })
            .unwrap();

        let pending = decoder.pending();
        assert!(matches!(
            decoder.next_buffered(),
            Err(ChannelError::Truncated { .. })
        ));
        assert_eq!(decoder.pending(), pending);
    }

    #[test]
    fn test_truncation_is_sticky() {
        let bytes = encode_all(&records(1)).concat();
        let half = &bytes[..bytes.len() - 4];

        let mut decoder = EventDecoder::default();
        decoder
            .fill(|buf| {
                buf[..half.len()].copy_from_slice(half);
                Ok(half.len())
            })
            .unwrap();

        let pending = decoder.pending();
        for _ in 0..3 {
            let err = decoder.next_buffered().unwrap_err();
            assert!(matches!(
                err,
                ChannelError::Truncated { needed, available }
                    if needed == bytes.len() && available == pending
            ));
            assert_eq!(decoder.pending(), pending);
        }
    }

    #[test]
    fn test_short_read_after_header_is_not_a_fill_error() {
        // A read of at least one header passes `fill`; the decode reports it.
        let bytes = encode_all(&records(1)).concat();
        let mut decoder = EventDecoder::default();
        let n = decoder
            .fill(|buf| {
                buf[..HEADER_SIZE].copy_from_slice(&bytes[..HEADER_SIZE]);
                Ok(HEADER_SIZE)
            })
            .unwrap();
        assert_eq!(n, HEADER_SIZE);
        assert!(matches!(
            decoder.next_buffered(),
            Err(ChannelError::Truncated { .. })
        ));
        assert!(decoder.next_buffered().is_err());
    }

    #[test]
    fn test_read_error_keeps_buffer() {
        let encoded = encode_all(&records(2)).concat();
        let mut decoder = EventDecoder::default();
        decoder
            .fill(|buf| {
                buf[..encoded.len()].copy_from_slice(&encoded);
                Ok(encoded.len())
            })
            .unwrap();
        let first = decoder.next_buffered().unwrap();
        assert!(first.is_some());

        let err = decoder
            .fill(|_| Err(io::Error::from(io::ErrorKind::WouldBlock)))
            .unwrap_err();
        assert!(matches!(err, ChannelError::Read(_)));

        // The second record survived the failed read.
        let second = decoder.next_buffered().unwrap().unwrap();
        assert_eq!(second, records(2)[1]);
    }

    #[test]
    fn test_capacity_bounds_and_growth() {
        assert_eq!(EventDecoder::with_capacity(1).capacity(), MIN_BUFFER_CAPACITY);
        assert_eq!(
            EventDecoder::with_capacity(usize::MAX).capacity(),
            MAX_BUFFER_CAPACITY
        );

        let mut decoder = EventDecoder::with_capacity(16);
        assert!(decoder.grow());
        assert_eq!(decoder.capacity(), 32);

        let mut decoder = EventDecoder::with_capacity(MAX_BUFFER_CAPACITY);
        assert!(!decoder.grow());
    }
}
