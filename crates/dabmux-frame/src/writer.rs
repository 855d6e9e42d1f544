use std::io::{ErrorKind, Write};

use crate::error::{MuxError, Result};
use crate::layout::FrameLayout;
use crate::mux::Cif;

/// Writes complete CIFs to any `Write` sink.
///
/// A CIF is either written completely or the call fails; the output never
/// carries framing metadata. CIFs must arrive in stream order, starting at
/// a frame boundary.
pub struct CifWriter<T> {
    inner: T,
    cif_lens: Vec<usize>,
    cifs_written: u64,
    bytes_written: u64,
}

impl<T: Write> CifWriter<T> {
    /// Create a writer for frames of the given layout.
    pub fn new(inner: T, layout: &FrameLayout) -> Self {
        Self {
            inner,
            cif_lens: layout.cifs().iter().map(|cif| cif.cif_len()).collect(),
            cifs_written: 0,
            bytes_written: 0,
        }
    }

    /// Write one CIF (blocking).
    pub fn write_cif(&mut self, cif: &Cif) -> Result<()> {
        let due = (self.cifs_written % self.cif_lens.len() as u64) as usize;
        if cif.index != due {
            return Err(MuxError::OutOfOrder {
                got: cif.index,
                expected: due,
            });
        }
        self.write_payload(cif.payload.as_ref())
    }

    /// Write the payload of the next CIF in the stream (blocking).
    pub fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        let due = (self.cifs_written % self.cif_lens.len() as u64) as usize;
        let expected = self.cif_lens[due];
        if payload.len() != expected {
            return Err(MuxError::LengthMismatch {
                got: payload.len(),
                expected,
            });
        }

        let mut offset = 0usize;
        while offset < payload.len() {
            match self.inner.write(&payload[offset..]) {
                Ok(0) => return Err(MuxError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(MuxError::Io(err)),
            }
        }

        self.cifs_written += 1;
        self.bytes_written += payload.len() as u64;
        self.flush()
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(MuxError::Io(err)),
            }
        }
    }

    pub fn cifs_written(&self) -> u64 {
        self.cifs_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
