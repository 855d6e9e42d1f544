use std::ops::Range;

use bytes::{BufMut, BytesMut};

use crate::error::{ConfigurationError, MuxError, Result};
use crate::mode::{
    TransmissionMode, CU_BYTES, MAX_SUBCHANNELS, MSC_BYTES_PER_CIF, MSC_CUS_PER_CIF,
};

/// How the unused tail of the MSC region is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MscPadding {
    /// The CIF ends right after the last subchannel slot.
    #[default]
    None,
    /// The MSC region is filled to full capacity with zero bytes.
    Zero,
}

/// Validated multiplexer configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxConfig {
    mode: TransmissionMode,
    sizes: Vec<usize>,
    padding: MscPadding,
}

impl MuxConfig {
    /// Validate `(mode, subchannel_count, sizes)`.
    ///
    /// `sizes` are in capacity units, one per subchannel in index order.
    pub fn new(
        mode: TransmissionMode,
        subchannel_count: usize,
        sizes: &[u32],
    ) -> std::result::Result<Self, ConfigurationError> {
        if subchannel_count != sizes.len() {
            return Err(ConfigurationError::CountMismatch {
                count: subchannel_count,
                sizes: sizes.len(),
            });
        }
        if sizes.is_empty() {
            return Err(ConfigurationError::NoSubchannels);
        }
        if sizes.len() > MAX_SUBCHANNELS {
            return Err(ConfigurationError::TooManySubchannels {
                count: sizes.len(),
                max: MAX_SUBCHANNELS,
            });
        }
        if let Some(index) = sizes.iter().position(|&size| size == 0) {
            return Err(ConfigurationError::NonPositiveSize { index });
        }

        let sizes: Vec<usize> = sizes.iter().map(|&size| size as usize).collect();
        let requested = mode.fic_cu_equivalent() + sizes.iter().sum::<usize>();
        if requested > mode.cif_capacity_cus() {
            return Err(ConfigurationError::CapacityExceeded {
                requested,
                capacity: mode.cif_capacity_cus(),
            });
        }

        Ok(Self {
            mode,
            sizes,
            padding: MscPadding::None,
        })
    }

    /// Same as [`MuxConfig::new`] with a numeric mode identifier.
    pub fn from_mode_id(
        mode: u8,
        subchannel_count: usize,
        sizes: &[u32],
    ) -> std::result::Result<Self, ConfigurationError> {
        Self::new(TransmissionMode::from_id(mode)?, subchannel_count, sizes)
    }

    /// Select the MSC padding policy.
    pub fn with_padding(mut self, padding: MscPadding) -> Self {
        self.padding = padding;
        self
    }

    pub fn mode(&self) -> TransmissionMode {
        self.mode
    }

    pub fn padding(&self) -> MscPadding {
        self.padding
    }

    pub fn subchannel_count(&self) -> usize {
        self.sizes.len()
    }

    /// Subchannel sizes in capacity units.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Compute the byte layout of every CIF of a transmission frame.
    pub fn layout(&self) -> FrameLayout {
        FrameLayout::new(self)
    }
}

/// Byte layout of one transmission frame: one [`CifLayout`] per CIF index.
///
/// Only the first CIF of a frame carries the FIC block; the other CIFs
/// start directly with subchannel 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    mode: TransmissionMode,
    cifs: Vec<CifLayout>,
}

impl FrameLayout {
    fn new(config: &MuxConfig) -> Self {
        let cifs = (0..config.mode.cifs_per_frame())
            .map(|index| CifLayout::new(config, index))
            .collect();
        Self {
            mode: config.mode,
            cifs,
        }
    }

    pub fn mode(&self) -> TransmissionMode {
        self.mode
    }

    /// Layout of the CIF at `index` within a frame. Wraps modulo the
    /// frame length, so a running CIF counter may be passed directly.
    pub fn cif(&self, index: usize) -> &CifLayout {
        &self.cifs[index % self.cifs.len()]
    }

    /// Every CIF layout, in frame order.
    pub fn cifs(&self) -> &[CifLayout] {
        &self.cifs
    }

    pub fn cifs_per_frame(&self) -> usize {
        self.cifs.len()
    }

    /// Total bytes of one transmission frame.
    pub fn frame_len(&self) -> usize {
        self.cifs.iter().map(CifLayout::cif_len).sum()
    }

    /// Bytes of the FIC block carried once per frame.
    pub fn fic_block_size(&self) -> usize {
        self.mode.fic_block_size()
    }

    /// Subchannel slot lengths in index order. Identical in every CIF.
    pub fn slot_lens(&self) -> impl Iterator<Item = usize> + '_ {
        self.cifs[0].subchannels.iter().map(|slot| slot.len())
    }

    pub fn subchannel_count(&self) -> usize {
        self.cifs[0].subchannels.len()
    }

    /// Capacity units occupied by subchannels.
    pub fn used_cus(&self) -> usize {
        self.slot_lens().sum::<usize>() / CU_BYTES
    }

    /// MSC capacity units left unallocated.
    pub fn free_cus(&self) -> usize {
        MSC_CUS_PER_CIF - self.used_cus()
    }
}

/// Byte layout of the CIF at one index of the frame.
///
/// ```text
/// ┌──────────────┬───────────┬───────────┬─────┬───────────────┬──────────┐
/// │ FIC block    │ subch 0   │ subch 1   │ ... │ subch N-1     │ padding  │
/// │ index 0 only │ size0 × 8 │ size1 × 8 │     │ sizeN-1 × 8   │ optional │
/// └──────────────┴───────────┴───────────┴─────┴───────────────┴──────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CifLayout {
    index: usize,
    fic: Range<usize>,
    subchannels: Vec<Range<usize>>,
    padding: Range<usize>,
}

impl CifLayout {
    fn new(config: &MuxConfig, index: usize) -> Self {
        let fic_len = if config.mode.fic_scheduled(index) {
            config.mode.fic_block_size()
        } else {
            0
        };
        let fic = 0..fic_len;
        let mut offset = fic.end;
        let subchannels = config
            .sizes
            .iter()
            .map(|&size| {
                let slot = offset..offset + size * CU_BYTES;
                offset = slot.end;
                slot
            })
            .collect();
        let padding = match config.padding {
            MscPadding::None => offset..offset,
            MscPadding::Zero => offset..fic.end + MSC_BYTES_PER_CIF,
        };
        Self {
            index,
            fic,
            subchannels,
            padding,
        }
    }

    /// Position of this CIF within its frame.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Total bytes of this CIF.
    pub fn cif_len(&self) -> usize {
        self.padding.end
    }

    /// Whether this CIF carries the FIC block.
    pub fn has_fic(&self) -> bool {
        !self.fic.is_empty()
    }

    /// Byte range of the FIC block (empty when not scheduled).
    pub fn fic(&self) -> Range<usize> {
        self.fic.clone()
    }

    /// Byte range of a subchannel slot.
    pub fn subchannel(&self, index: usize) -> Option<Range<usize>> {
        self.subchannels.get(index).cloned()
    }

    /// Every subchannel slot, in index order.
    pub fn subchannels(&self) -> &[Range<usize>] {
        &self.subchannels
    }

    /// Byte range of the zero padding (empty without padding).
    pub fn padding(&self) -> Range<usize> {
        self.padding.clone()
    }

    /// Split a buffer of this CIF's length into its slices.
    pub fn split<'a>(&self, cif: &'a [u8]) -> Result<CifSlices<'a>> {
        if cif.len() != self.cif_len() {
            return Err(MuxError::LengthMismatch {
                got: cif.len(),
                expected: self.cif_len(),
            });
        }
        Ok(CifSlices {
            fic: &cif[self.fic.clone()],
            subchannels: self
                .subchannels
                .iter()
                .map(|slot| &cif[slot.clone()])
                .collect(),
        })
    }
}

/// Borrowed view of the slices of one CIF.
#[derive(Debug)]
pub struct CifSlices<'a> {
    /// Empty in CIFs that do not carry the FIC block.
    pub fic: &'a [u8],
    pub subchannels: Vec<&'a [u8]>,
}

/// Write one CIF into `dst` in layout order.
///
/// Every slice must already have exactly its slot length; `fic` is empty
/// for CIFs without the FIC block.
pub fn encode_cif<S: AsRef<[u8]>>(
    layout: &CifLayout,
    fic: &[u8],
    subchannels: &[S],
    dst: &mut BytesMut,
) -> Result<()> {
    if fic.len() != layout.fic.len() {
        return Err(MuxError::LengthMismatch {
            got: fic.len(),
            expected: layout.fic.len(),
        });
    }
    if subchannels.len() != layout.subchannels.len() {
        return Err(MuxError::SlotCountMismatch {
            got: subchannels.len(),
            expected: layout.subchannels.len(),
        });
    }

    for (slot, data) in layout.subchannels.iter().zip(subchannels) {
        if data.as_ref().len() != slot.len() {
            return Err(MuxError::LengthMismatch {
                got: data.as_ref().len(),
                expected: slot.len(),
            });
        }
    }

    dst.reserve(layout.cif_len());
    dst.put_slice(fic);
    for data in subchannels {
        dst.put_slice(data.as_ref());
    }
    dst.put_bytes(0, layout.padding.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_fifteen() -> MuxConfig {
        MuxConfig::new(TransmissionMode::I, 2, &[15, 15]).unwrap()
    }

    #[test]
    fn fic_block_leads_the_first_cif_only() {
        let layout = two_by_fifteen().layout();
        assert_eq!(layout.cifs_per_frame(), 4);

        let first = layout.cif(0);
        assert!(first.has_fic());
        assert_eq!(first.fic(), 0..384);
        assert_eq!(first.subchannel(0), Some(384..504));
        assert_eq!(first.subchannel(1), Some(504..624));
        assert_eq!(first.subchannel(2), None);
        assert_eq!(first.cif_len(), 384 + 240);

        for index in 1..4 {
            let cif = layout.cif(index);
            assert!(!cif.has_fic());
            assert_eq!(cif.subchannel(0), Some(0..120));
            assert_eq!(cif.subchannel(1), Some(120..240));
            assert_eq!(cif.cif_len(), 240);
        }
        assert_eq!(layout.frame_len(), 384 + 4 * 240);
    }

    #[test]
    fn mode_four_has_two_cifs_per_frame() {
        let layout = MuxConfig::new(TransmissionMode::IV, 1, &[4]).unwrap().layout();
        assert_eq!(layout.cifs_per_frame(), 2);
        assert_eq!(layout.cif(0).fic(), 0..192);
        assert_eq!(layout.cif(0).subchannel(0), Some(192..224));
        assert!(!layout.cif(1).has_fic());
        assert_eq!(layout.cif(1).subchannel(0), Some(0..32));
        assert_eq!(layout.cif(5).index(), 1, "index wraps by frame");
    }

    #[test]
    fn single_cif_modes_carry_fic_every_cif() {
        let layout = MuxConfig::new(TransmissionMode::III, 1, &[2]).unwrap().layout();
        assert_eq!(layout.cifs().len(), 1);
        assert_eq!(layout.cif(0).fic(), 0..128);
        assert_eq!(layout.cif(3).cif_len(), 128 + 16);
    }

    #[test]
    fn zero_padding_fills_msc() {
        let layout = two_by_fifteen().with_padding(MscPadding::Zero).layout();
        assert_eq!(layout.cif(0).cif_len(), 384 + MSC_BYTES_PER_CIF);
        assert_eq!(layout.cif(0).padding(), 624..384 + 6912);
        assert_eq!(layout.cif(1).cif_len(), MSC_BYTES_PER_CIF);
        assert_eq!(layout.cif(1).padding(), 240..6912);
        assert_eq!(layout.used_cus(), 30);
        assert_eq!(layout.free_cus(), 834);
    }

    #[test]
    fn rejects_count_mismatch() {
        let err = MuxConfig::new(TransmissionMode::I, 3, &[15, 15]).unwrap_err();
        assert_eq!(err, ConfigurationError::CountMismatch { count: 3, sizes: 2 });
    }

    #[test]
    fn rejects_zero_size() {
        let err = MuxConfig::new(TransmissionMode::II, 2, &[15, 0]).unwrap_err();
        assert_eq!(err, ConfigurationError::NonPositiveSize { index: 1 });
    }

    #[test]
    fn rejects_over_capacity() {
        let err = MuxConfig::new(TransmissionMode::I, 2, &[500, 365]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::CapacityExceeded {
                requested: 12 + 865,
                capacity: 12 + 864,
            }
        );
    }

    #[test]
    fn accepts_full_msc() {
        let config = MuxConfig::new(TransmissionMode::III, 2, &[432, 432]).unwrap();
        assert_eq!(config.layout().free_cus(), 0);
    }

    #[test]
    fn rejects_empty_and_oversized_lists() {
        assert_eq!(
            MuxConfig::new(TransmissionMode::I, 0, &[]).unwrap_err(),
            ConfigurationError::NoSubchannels
        );
        let sizes = vec![1u32; MAX_SUBCHANNELS + 1];
        assert!(matches!(
            MuxConfig::new(TransmissionMode::I, sizes.len(), &sizes),
            Err(ConfigurationError::TooManySubchannels { .. })
        ));
    }

    #[test]
    fn rejects_invalid_mode_id() {
        assert_eq!(
            MuxConfig::from_mode_id(7, 1, &[8]).unwrap_err(),
            ConfigurationError::InvalidMode(7)
        );
    }

    #[test]
    fn encode_then_split() {
        let layout = two_by_fifteen().layout();
        let fic = vec![0xF1; 384];
        let subchannels = [vec![1u8; 120], vec![2u8; 120]];

        let mut buf = BytesMut::new();
        encode_cif(layout.cif(0), &fic, &subchannels, &mut buf).unwrap();
        assert_eq!(buf.len(), 624);

        let slices = layout.cif(0).split(&buf).unwrap();
        assert_eq!(slices.fic, fic.as_slice());
        assert!(slices.subchannels[0].iter().all(|&b| b == 1));
        assert!(slices.subchannels[1].iter().all(|&b| b == 2));
    }

    #[test]
    fn encode_without_fic_block() {
        let layout = two_by_fifteen().layout();
        let mut buf = BytesMut::new();
        encode_cif(layout.cif(2), &[], &[vec![1u8; 120], vec![2u8; 120]], &mut buf).unwrap();
        assert_eq!(buf.len(), 240);
        assert_eq!(buf[0], 1);

        let mut rejected = BytesMut::new();
        assert!(matches!(
            encode_cif(
                layout.cif(2),
                &[0; 384],
                &[vec![1u8; 120], vec![2u8; 120]],
                &mut rejected
            ),
            Err(MuxError::LengthMismatch { got: 384, expected: 0 })
        ));
    }

    #[test]
    fn encode_rejects_short_slot() {
        let layout = two_by_fifteen().layout();
        let mut buf = BytesMut::new();
        let result = encode_cif(
            layout.cif(0),
            &[0; 384],
            &[vec![1u8; 120], vec![2u8; 119]],
            &mut buf,
        );
        assert!(matches!(
            result,
            Err(MuxError::LengthMismatch {
                got: 119,
                expected: 120
            })
        ));
        assert!(buf.is_empty(), "nothing is written for a rejected CIF");
    }

    #[test]
    fn split_rejects_wrong_length() {
        let layout = two_by_fifteen().layout();
        assert!(matches!(
            layout.cif(1).split(&[0u8; 10]),
            Err(MuxError::LengthMismatch { .. })
        ));
    }
}
