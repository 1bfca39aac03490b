use serde::Deserialize;

/// Uplink grant scheduling type of a service flow. Raw values follow the
/// scheduling type TLV encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[repr(u8)]
pub enum SchedulingType {
    None = 0,
    Undef = 1,
    Be = 2,
    Nrtps = 3,
    Rtps = 4,
    Ugs = 6,
    All = 255,
}

impl std::convert::TryFrom<u64> for SchedulingType {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(SchedulingType::None),
            1 => Ok(SchedulingType::Undef),
            2 => Ok(SchedulingType::Be),
            3 => Ok(SchedulingType::Nrtps),
            4 => Ok(SchedulingType::Rtps),
            6 => Ok(SchedulingType::Ugs),
            255 => Ok(SchedulingType::All),
            _ => Err(()),
        }
    }
}

impl SchedulingType {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u64
    }

    /// Whether flows of this type are polled for bandwidth requests
    pub fn is_polled(self) -> bool {
        matches!(self, SchedulingType::Rtps | SchedulingType::Nrtps | SchedulingType::Be)
    }
}

impl From<SchedulingType> for u64 {
    fn from(e: SchedulingType) -> Self { e.into_raw() }
}

impl core::fmt::Display for SchedulingType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SchedulingType::None => write!(f, "None"),
            SchedulingType::Undef => write!(f, "Undef"),
            SchedulingType::Be => write!(f, "BE"),
            SchedulingType::Nrtps => write!(f, "nrtPS"),
            SchedulingType::Rtps => write!(f, "rtPS"),
            SchedulingType::Ugs => write!(f, "UGS"),
            SchedulingType::All => write!(f, "All"),
        }
    }
}

/// Direction of a service flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum SfDirection {
    /// Uplink, SS to BS
    Up,
    /// Downlink, BS to SS
    Down,
}

impl core::fmt::Display for SfDirection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SfDirection::Up => write!(f, "Up"),
            SfDirection::Down => write!(f, "Down"),
        }
    }
}
