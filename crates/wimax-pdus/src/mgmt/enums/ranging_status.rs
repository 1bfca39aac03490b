/// Ranging status carried in RNG-RSP
/// Bits: 8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RangingStatus {
    /// Ranging still in progress; not sent on the air
    Expired = 0,
    Continue = 1,
    Abort = 2,
    Success = 3,
}

impl std::convert::TryFrom<u64> for RangingStatus {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(RangingStatus::Expired),
            1 => Ok(RangingStatus::Continue),
            2 => Ok(RangingStatus::Abort),
            3 => Ok(RangingStatus::Success),
            _ => Err(()),
        }
    }
}

impl RangingStatus {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u64
    }
}

impl From<RangingStatus> for u64 {
    fn from(e: RangingStatus) -> Self { e.into_raw() }
}

impl core::fmt::Display for RangingStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RangingStatus::Expired => write!(f, "Expired"),
            RangingStatus::Continue => write!(f, "Continue"),
            RangingStatus::Abort => write!(f, "Abort"),
            RangingStatus::Success => write!(f, "Success"),
        }
    }
}
