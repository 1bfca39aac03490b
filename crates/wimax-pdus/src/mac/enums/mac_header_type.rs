/// HT bit of a MAC header
/// Bits: 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MacHeaderType {
    Generic = 0,
    BandwidthRequest = 1,
}

impl std::convert::TryFrom<u64> for MacHeaderType {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(MacHeaderType::Generic),
            1 => Ok(MacHeaderType::BandwidthRequest),
            _ => Err(()),
        }
    }
}

impl MacHeaderType {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u64
    }
}

impl From<MacHeaderType> for u64 {
    fn from(e: MacHeaderType) -> Self { e.into_raw() }
}

impl core::fmt::Display for MacHeaderType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MacHeaderType::Generic => write!(f, "Generic"),
            MacHeaderType::BandwidthRequest => write!(f, "BandwidthRequest"),
        }
    }
}
