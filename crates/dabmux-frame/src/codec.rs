//! CIF chunking for `tokio_util::codec` (requires the `async` feature).

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::MuxError;
use crate::layout::FrameLayout;
use crate::mux::Cif;

/// Splits a byte stream into CIFs and writes CIFs without framing.
///
/// Decoding tracks the position in the stream, which must start at a frame
/// boundary, to know the length of the next CIF.
#[derive(Debug, Clone)]
pub struct CifCodec {
    cif_lens: Vec<usize>,
    decoded: u64,
}

impl CifCodec {
    pub fn new(layout: &FrameLayout) -> Self {
        Self {
            cif_lens: layout.cifs().iter().map(|cif| cif.cif_len()).collect(),
            decoded: 0,
        }
    }

    /// Length of the CIF at `index` within a frame.
    pub fn cif_len(&self, index: usize) -> usize {
        self.cif_lens[index % self.cif_lens.len()]
    }

    fn next_index(&self) -> usize {
        (self.decoded % self.cif_lens.len() as u64) as usize
    }
}

impl Decoder for CifCodec {
    type Item = Cif;
    type Error = MuxError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Cif>, MuxError> {
        let index = self.next_index();
        let cif_len = self.cif_len(index);
        if src.len() < cif_len {
            src.reserve(cif_len - src.len());
            return Ok(None);
        }

        let cif = Cif {
            sequence: self.decoded,
            frame: self.decoded / self.cif_lens.len() as u64,
            index,
            payload: src.split_to(cif_len).freeze(),
        };
        self.decoded += 1;
        Ok(Some(cif))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Cif>, MuxError> {
        match self.decode(src)? {
            Some(cif) => Ok(Some(cif)),
            None if src.is_empty() => Ok(None),
            None => Err(MuxError::TruncatedCif {
                got: src.len(),
                expected: self.cif_len(self.next_index()),
            }),
        }
    }
}

impl Encoder<Cif> for CifCodec {
    type Error = MuxError;

    fn encode(&mut self, item: Cif, dst: &mut BytesMut) -> Result<(), MuxError> {
        let expected = self.cif_len(item.index);
        if item.payload.len() != expected {
            return Err(MuxError::LengthMismatch {
                got: item.payload.len(),
                expected,
            });
        }
        dst.reserve(expected);
        dst.put_slice(&item.payload);
        Ok(())
    }
}
