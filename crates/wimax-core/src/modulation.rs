use serde::Deserialize;

/// OFDM modulation and coding scheme, in increasing robustness-to-throughput order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[repr(u8)]
pub enum ModulationType {
    Bpsk12 = 0,
    Qpsk12 = 1,
    Qpsk34 = 2,
    Qam16_12 = 3,
    Qam16_34 = 4,
    Qam64_23 = 5,
    Qam64_34 = 6,
}

impl ModulationType {
    pub const ALL: [ModulationType; 7] = [
        ModulationType::Bpsk12,
        ModulationType::Qpsk12,
        ModulationType::Qpsk34,
        ModulationType::Qam16_12,
        ModulationType::Qam16_34,
        ModulationType::Qam64_23,
        ModulationType::Qam64_34,
    ];

    /// Convert this enum back into the raw integer value (also the FEC code type on the wire)
    pub fn into_raw(self) -> u64 {
        self as u64
    }

    /// Coded bits carried per data subcarrier times the code rate, in eighths
    /// (BPSK 1/2 = 4/8, 64-QAM 3/4 = 36/8)
    pub fn coded_bits_x8(self) -> u32 {
        match self {
            ModulationType::Bpsk12 => 4,
            ModulationType::Qpsk12 => 8,
            ModulationType::Qpsk34 => 12,
            ModulationType::Qam16_12 => 16,
            ModulationType::Qam16_34 => 24,
            ModulationType::Qam64_23 => 32,
            ModulationType::Qam64_34 => 36,
        }
    }
}

impl std::convert::TryFrom<u64> for ModulationType {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(ModulationType::Bpsk12),
            1 => Ok(ModulationType::Qpsk12),
            2 => Ok(ModulationType::Qpsk34),
            3 => Ok(ModulationType::Qam16_12),
            4 => Ok(ModulationType::Qam16_34),
            5 => Ok(ModulationType::Qam64_23),
            6 => Ok(ModulationType::Qam64_34),
            _ => Err(()),
        }
    }
}

impl From<ModulationType> for u64 {
    fn from(e: ModulationType) -> Self { e.into_raw() }
}

impl core::fmt::Display for ModulationType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ModulationType::Bpsk12 => write!(f, "BPSK 1/2"),
            ModulationType::Qpsk12 => write!(f, "QPSK 1/2"),
            ModulationType::Qpsk34 => write!(f, "QPSK 3/4"),
            ModulationType::Qam16_12 => write!(f, "16-QAM 1/2"),
            ModulationType::Qam16_34 => write!(f, "16-QAM 3/4"),
            ModulationType::Qam64_23 => write!(f, "64-QAM 2/3"),
            ModulationType::Qam64_34 => write!(f, "64-QAM 3/4"),
        }
    }
}
