use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::error::{MuxError, Result};
use crate::layout::FrameLayout;
use crate::mux::Cif;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads a multiplexer output stream back as CIFs.
///
/// The stream carries no framing; CIF boundaries come from the layout and
/// the position in the stream, which must start at a frame boundary.
pub struct CifReader<T> {
    inner: T,
    buf: BytesMut,
    cif_lens: Vec<usize>,
    cifs_read: u64,
}

impl<T: Read> CifReader<T> {
    /// Create a reader for frames of the given layout.
    pub fn new(inner: T, layout: &FrameLayout) -> Self {
        let cif_lens: Vec<usize> = layout.cifs().iter().map(|cif| cif.cif_len()).collect();
        let largest = cif_lens.iter().copied().max().unwrap_or(0);
        Self {
            inner,
            buf: BytesMut::with_capacity(largest.max(READ_CHUNK_SIZE)),
            cif_lens,
            cifs_read: 0,
        }
    }

    /// Read the next complete CIF (blocking).
    ///
    /// Returns `Ok(None)` at a clean end of stream and
    /// `Err(MuxError::TruncatedCif)` when the stream stops inside a CIF.
    pub fn read_cif(&mut self) -> Result<Option<Cif>> {
        let per_frame = self.cif_lens.len() as u64;
        let index = (self.cifs_read % per_frame) as usize;
        let cif_len = self.cif_lens[index];

        loop {
            if self.buf.len() >= cif_len {
                let cif = Cif {
                    sequence: self.cifs_read,
                    frame: self.cifs_read / per_frame,
                    index,
                    payload: self.buf.split_to(cif_len).freeze(),
                };
                self.cifs_read += 1;
                return Ok(Some(cif));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(MuxError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(MuxError::TruncatedCif {
                    got: self.buf.len(),
                    expected: cif_len,
                });
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    pub fn cifs_read(&self) -> u64 {
        self.cifs_read
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::layout::MuxConfig;
    use crate::mode::TransmissionMode;

    /// Mode IV with 1 + 2 CU: CIF 0 is 192 + 24 bytes, CIF 1 is 24 bytes.
    fn layout() -> FrameLayout {
        MuxConfig::new(TransmissionMode::IV, 2, &[1, 2]).unwrap().layout()
    }

    #[test]
    fn follows_the_frame_schedule() {
        let mut stream = vec![1u8; 216];
        stream.extend(vec![2u8; 24]);
        stream.extend(vec![3u8; 216]);

        let mut reader = CifReader::new(Cursor::new(stream), &layout());
        let first = reader.read_cif().unwrap().unwrap();
        let second = reader.read_cif().unwrap().unwrap();
        let third = reader.read_cif().unwrap().unwrap();

        assert_eq!((first.frame, first.index, first.payload.len()), (0, 0, 216));
        assert_eq!((second.frame, second.index, second.payload.len()), (0, 1, 24));
        assert_eq!((third.frame, third.index, third.sequence), (1, 0, 2));
        assert!(first.payload.iter().all(|&b| b == 1));
        assert!(second.payload.iter().all(|&b| b == 2));
        assert!(reader.read_cif().unwrap().is_none());
        assert_eq!(reader.cifs_read(), 3);
    }

    #[test]
    fn byte_by_byte_source() {
        let source = ByteByByteReader {
            bytes: (0..216u32).map(|i| i as u8).collect(),
            pos: 0,
        };
        let mut reader = CifReader::new(source, &layout());
        let cif = reader.read_cif().unwrap().unwrap();
        assert_eq!(cif.payload.len(), 216);
        assert_eq!(cif.payload[215], 215);
    }

    #[test]
    fn truncated_tail_is_an_error() {
        let mut reader = CifReader::new(Cursor::new(vec![0u8; 216 + 3]), &layout());
        assert!(reader.read_cif().unwrap().is_some());
        let err = reader.read_cif().unwrap_err();
        assert!(matches!(
            err,
            MuxError::TruncatedCif {
                got: 3,
                expected: 24
            }
        ));
    }

    #[test]
    fn interrupted_read_retries() {
        let source = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(vec![5u8; 216]),
        };
        let mut reader = CifReader::new(source, &layout());
        assert!(reader.read_cif().unwrap().is_some());
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }
}
