use std::fmt;

use bytes::{Bytes, BytesMut};

/// An input port of the multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Port {
    /// The FIC input.
    Fic,
    /// A subchannel input, by subchannel index.
    Subchannel(usize),
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Fic => f.write_str("fic"),
            Port::Subchannel(index) => write!(f, "subch-{index}"),
        }
    }
}

/// Accumulation buffer between one producer and the multiplexer.
///
/// Grows on input, shrinks by exactly one slot per emitted CIF. Bytes are
/// never dropped while the port is live.
#[derive(Debug)]
pub struct PortBuffer {
    port: Port,
    slot_len: usize,
    buf: BytesMut,
    high_watermark: Option<usize>,
    finished: bool,
    received: u64,
    consumed: u64,
}

impl PortBuffer {
    /// Create a buffer delivering `slot_len` bytes per CIF.
    pub fn new(port: Port, slot_len: usize) -> Self {
        Self {
            port,
            slot_len,
            buf: BytesMut::with_capacity(slot_len * 2),
            high_watermark: None,
            finished: false,
            received: 0,
            consumed: 0,
        }
    }

    /// Set a soft limit used by [`PortBuffer::wants_more`].
    pub fn with_high_watermark(mut self, bytes: usize) -> Self {
        self.high_watermark = Some(bytes.max(self.slot_len));
        self
    }

    pub fn port(&self) -> Port {
        self.port
    }

    /// Bytes consumed from this port per CIF.
    pub fn slot_len(&self) -> usize {
        self.slot_len
    }

    /// Bytes currently buffered.
    pub fn available(&self) -> usize {
        self.buf.len()
    }

    /// True when a full slot is buffered.
    pub fn ready(&self) -> bool {
        self.buf.len() >= self.slot_len
    }

    /// True when the producer may keep supplying without passing the
    /// high watermark. Always true without a watermark.
    pub fn wants_more(&self) -> bool {
        match self.high_watermark {
            Some(limit) => self.buf.len() < limit,
            None => true,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Finished and unable to fill another slot.
    pub fn is_exhausted(&self) -> bool {
        self.finished && !self.ready()
    }

    /// Append producer bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        self.received += data.len() as u64;
    }

    /// Mark producer end-of-stream.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    /// Remove exactly one slot from the front of the buffer.
    ///
    /// Returns `None` when less than a slot is buffered.
    pub fn take_slot(&mut self) -> Option<Bytes> {
        if !self.ready() {
            return None;
        }
        self.consumed += self.slot_len as u64;
        Some(self.buf.split_to(self.slot_len).freeze())
    }

    /// Bytes left over after every full slot has been taken.
    pub fn residual(&self) -> usize {
        self.buf
            .len()
            .checked_rem(self.slot_len)
            .unwrap_or(self.buf.len())
    }

    /// Discard everything still buffered and return its length.
    pub fn discard(&mut self) -> usize {
        let len = self.buf.len();
        self.buf.clear();
        len
    }

    /// Total bytes pushed into the port.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Total bytes handed to CIFs.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}
