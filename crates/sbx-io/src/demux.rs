//! Demultiplexer for the container runtime's framed stdio protocol.
//!
//! Each chunk emitted by the runtime is prefixed with an 8-byte header:
//! `[streamID(1)][reserved(3)][length(4, big-endian)]` followed by `length`
//! payload bytes. This is a byte-level protocol, not a line protocol — a
//! single read from the runtime may contain zero, one, or many frames, and
//! may split a frame's header or payload across two reads. [`Demuxer`]
//! accumulates bytes across calls to [`Demuxer::feed`] so callers never have
//! to reassemble partial frames themselves.

use bytes::BytesMut;

const HEADER_LEN: usize = 8;

/// Incremental, chunk-boundary-safe parser for framed container stdio.
///
/// Stream identity (stdout vs stderr) is intentionally discarded: both
/// streams are merged line-wise in arrival order, matching the contract of
/// `demuxStdio`.
#[derive(Default)]
pub struct Demuxer {
    buf: BytesMut,
    out: String,
}

impl Demuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of raw framed bytes, possibly completing one or more
    /// buffered frames. Safe to call repeatedly with arbitrarily small or
    /// misaligned chunks.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
        loop {
            if self.buf.len() < HEADER_LEN {
                return;
            }
            let len = u32::from_be_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]]) as usize;
            if self.buf.len() < HEADER_LEN + len {
                return;
            }
            let frame = self.buf.split_to(HEADER_LEN + len);
            let payload = &frame[HEADER_LEN..];
            if !payload.is_empty() {
                self.out.push_str(&String::from_utf8_lossy(payload));
                self.out.push('\n');
            }
        }
    }

    /// The text demultiplexed so far. Any bytes still buffered for an
    /// incomplete trailing frame are not yet reflected here.
    pub fn output(&self) -> &str {
        &self.out
    }

    /// Consumes the demuxer, returning everything demultiplexed so far.
    /// Bytes left in an incomplete trailing frame are dropped — callers
    /// should only call this once the underlying stream has ended.
    pub fn finish(self) -> String {
        self.out
    }
}

/// Convenience wrapper for demultiplexing a complete, in-memory frame
/// stream in one call.
pub fn demux_stdio(frames: &[u8]) -> String {
    let mut demuxer = Demuxer::new();
    demuxer.feed(frames);
    demuxer.finish()
}

fn frame(stream_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(stream_id);
    out.extend_from_slice(&[0, 0, 0]);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_gets_trailing_newline() {
        let bytes = frame(1, b"hello");
        assert_eq!(demux_stdio(&bytes), "hello\n");
    }

    #[test]
    fn empty_payload_is_suppressed() {
        let bytes = frame(1, b"");
        assert_eq!(demux_stdio(&bytes), "");
    }

    #[test]
    fn streams_merge_in_arrival_order() {
        let mut bytes = Vec::new();
        bytes.extend(frame(1, b"out-a"));
        bytes.extend(frame(2, b"err-a"));
        bytes.extend(frame(1, b"out-b"));
        assert_eq!(demux_stdio(&bytes), "out-a\nerr-a\nout-b\n");
    }

    #[test]
    fn handles_header_split_across_feeds() {
        let bytes = frame(1, b"split-me");
        let mut demuxer = Demuxer::new();
        demuxer.feed(&bytes[..3]);
        demuxer.feed(&bytes[3..]);
        assert_eq!(demuxer.finish(), "split-me\n");
    }

    #[test]
    fn handles_payload_split_byte_by_byte() {
        let bytes = frame(2, b"trickle");
        let mut demuxer = Demuxer::new();
        for b in &bytes {
            demuxer.feed(std::slice::from_ref(b));
        }
        assert_eq!(demuxer.finish(), "trickle\n");
    }

    #[test]
    fn character_count_matches_length_plus_newline_invariant() {
        let frames: &[&[u8]] = &[b"abc", b"", b"de", b"fghij"];
        let mut bytes = Vec::new();
        for payload in frames {
            bytes.extend(frame(1, payload));
        }
        let expected: usize = frames
            .iter()
            .map(|p| p.len() + if p.is_empty() { 0 } else { 1 })
            .sum();
        assert_eq!(demux_stdio(&bytes).len(), expected);
    }

    #[test]
    fn multiple_frames_in_one_chunk() {
        let mut bytes = Vec::new();
        bytes.extend(frame(1, b"one"));
        bytes.extend(frame(1, b"two"));
        bytes.extend(frame(1, b"three"));
        assert_eq!(demux_stdio(&bytes), "one\ntwo\nthree\n");
    }
}
