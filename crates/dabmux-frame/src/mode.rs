//! Transmission modes and the frame-structure constants they imply.
//!
//! Values follow the frame-structure tables of EN 300 401. Every mode shares
//! the same CIF: 24 ms and 864 capacity units of MSC. The FIC is delivered
//! as one block per transmission frame, carried by the first CIF.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigurationError;

/// Bits per capacity unit.
pub const CU_BITS: usize = 64;

/// Bytes per capacity unit.
pub const CU_BYTES: usize = CU_BITS / 8;

/// Bytes per Fast Information Block.
pub const FIB_BYTES: usize = 32;

/// MSC capacity of one CIF, in capacity units.
pub const MSC_CUS_PER_CIF: usize = 864;

/// MSC bytes of one CIF.
pub const MSC_BYTES_PER_CIF: usize = MSC_CUS_PER_CIF * CU_BYTES;

/// Duration of one CIF.
pub const CIF_DURATION: Duration = Duration::from_millis(24);

/// Largest addressable subchannel count (6-bit SubChId).
pub const MAX_SUBCHANNELS: usize = 64;

/// A transmission mode. Fixed for the lifetime of a multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransmissionMode {
    I,
    II,
    III,
    IV,
}

impl TransmissionMode {
    /// All modes, in identifier order.
    pub const ALL: [TransmissionMode; 4] = [Self::I, Self::II, Self::III, Self::IV];

    /// Resolve a numeric mode identifier (1..=4).
    pub fn from_id(id: u8) -> Result<Self, ConfigurationError> {
        match id {
            1 => Ok(Self::I),
            2 => Ok(Self::II),
            3 => Ok(Self::III),
            4 => Ok(Self::IV),
            other => Err(ConfigurationError::InvalidMode(other)),
        }
    }

    /// Numeric identifier.
    pub fn id(self) -> u8 {
        match self {
            Self::I => 1,
            Self::II => 2,
            Self::III => 3,
            Self::IV => 4,
        }
    }

    /// Number of CIFs in one transmission frame.
    pub fn cifs_per_frame(self) -> usize {
        match self {
            Self::I => 4,
            Self::II | Self::III => 1,
            Self::IV => 2,
        }
    }

    /// Number of FIBs in one transmission frame.
    pub fn fibs_per_frame(self) -> usize {
        match self {
            Self::I => 12,
            Self::II => 3,
            Self::III => 4,
            Self::IV => 6,
        }
    }

    /// Bytes of the FIC block delivered once per transmission frame.
    pub fn fic_block_size(self) -> usize {
        self.fibs_per_frame() * FIB_BYTES
    }

    /// Whether the CIF at `cif_index` within a frame carries the FIC block.
    pub fn fic_scheduled(self, cif_index: usize) -> bool {
        cif_index % self.cifs_per_frame() == 0
    }

    /// The FIC's share of one CIF expressed in capacity units.
    pub fn fic_cu_equivalent(self) -> usize {
        self.fic_block_size() / self.cifs_per_frame() / CU_BYTES
    }

    /// Total CIF capacity in capacity units (FIC equivalent plus MSC).
    pub fn cif_capacity_cus(self) -> usize {
        self.fic_cu_equivalent() + MSC_CUS_PER_CIF
    }

    /// Duration of one transmission frame.
    pub fn frame_duration(self) -> Duration {
        CIF_DURATION * self.cifs_per_frame() as u32
    }
}

impl fmt::Display for TransmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::I => "I",
            Self::II => "II",
            Self::III => "III",
            Self::IV => "IV",
        };
        f.write_str(name)
    }
}

impl TryFrom<u8> for TransmissionMode {
    type Error = ConfigurationError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::from_id(id)
    }
}

impl FromStr for TransmissionMode {
    type Err = ConfigurationError;

    /// Accepts `1`..`4` or the roman names `I`..`IV` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        match name.to_ascii_uppercase().as_str() {
            "I" => Ok(Self::I),
            "II" => Ok(Self::II),
            "III" => Ok(Self::III),
            "IV" => Ok(Self::IV),
            _ => match name.parse::<u8>() {
                Ok(id) => Self::from_id(id),
                Err(_) => Err(ConfigurationError::UnknownModeName(name.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_one_frame_structure() {
        let mode = TransmissionMode::I;
        assert_eq!(mode.cifs_per_frame(), 4);
        assert_eq!(mode.fic_block_size(), 384);
        assert_eq!(mode.fic_cu_equivalent(), 12);
        assert_eq!(mode.frame_duration(), Duration::from_millis(96));
    }

    #[test]
    fn fic_block_sizes_per_mode() {
        let sizes: Vec<usize> = TransmissionMode::ALL
            .iter()
            .map(|mode| mode.fic_block_size())
            .collect();
        assert_eq!(sizes, [384, 96, 128, 192]);
    }

    #[test]
    fn fic_is_scheduled_on_first_cif_of_each_frame() {
        let mode_one: Vec<bool> = (0..8).map(|i| TransmissionMode::I.fic_scheduled(i)).collect();
        assert_eq!(
            mode_one,
            [true, false, false, false, true, false, false, false]
        );
        assert!(TransmissionMode::IV.fic_scheduled(0));
        assert!(!TransmissionMode::IV.fic_scheduled(1));
        assert!(TransmissionMode::II.fic_scheduled(0));
        assert!(TransmissionMode::III.fic_scheduled(1));
    }

    #[test]
    fn capacity_includes_fic_equivalent() {
        assert_eq!(TransmissionMode::I.cif_capacity_cus(), 12 + 864);
        assert_eq!(TransmissionMode::III.cif_capacity_cus(), 16 + 864);
        assert_eq!(TransmissionMode::IV.cif_capacity_cus(), 12 + 864);
    }

    #[test]
    fn ids_roundtrip() {
        for mode in TransmissionMode::ALL {
            assert_eq!(TransmissionMode::from_id(mode.id()).unwrap(), mode);
        }
    }

    #[test]
    fn rejects_unknown_mode() {
        assert_eq!(
            TransmissionMode::from_id(5),
            Err(ConfigurationError::InvalidMode(5))
        );
        assert_eq!(
            TransmissionMode::from_id(0),
            Err(ConfigurationError::InvalidMode(0))
        );
    }

    #[test]
    fn parses_roman_and_numeric_names() {
        assert_eq!("iv".parse::<TransmissionMode>().unwrap(), TransmissionMode::IV);
        assert_eq!("2".parse::<TransmissionMode>().unwrap(), TransmissionMode::II);
        assert_eq!(
            "7".parse::<TransmissionMode>(),
            Err(ConfigurationError::InvalidMode(7))
        );
    }

    #[test]
    fn unknown_name_keeps_the_input() {
        let err = " V ".parse::<TransmissionMode>().unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownModeName("V".to_string()));
        assert!(err.to_string().contains("\"V\""));
    }
}
