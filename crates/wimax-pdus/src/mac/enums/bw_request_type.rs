/// Type field of a bandwidth request header
/// Bits: 3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BwRequestType {
    /// Requested bytes add to what is already outstanding
    Incremental = 0,
    /// Requested bytes replace what is outstanding
    Aggregate = 1,
}

impl std::convert::TryFrom<u64> for BwRequestType {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(BwRequestType::Incremental),
            1 => Ok(BwRequestType::Aggregate),
            _ => Err(()),
        }
    }
}

impl BwRequestType {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u64
    }
}

impl core::fmt::Display for BwRequestType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BwRequestType::Incremental => write!(f, "Incremental"),
            BwRequestType::Aggregate => write!(f, "Aggregate"),
        }
    }
}
