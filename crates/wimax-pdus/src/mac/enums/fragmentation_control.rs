/// FC field of the fragmentation subheader
/// Bits: 2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FragmentationControl {
    NoFragmentation = 0b00,
    Last = 0b01,
    First = 0b10,
    Middle = 0b11,
}

impl std::convert::TryFrom<u64> for FragmentationControl {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0b00 => Ok(FragmentationControl::NoFragmentation),
            0b01 => Ok(FragmentationControl::Last),
            0b10 => Ok(FragmentationControl::First),
            0b11 => Ok(FragmentationControl::Middle),
            _ => Err(()),
        }
    }
}

impl FragmentationControl {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u64
    }
}

impl From<FragmentationControl> for u64 {
    fn from(e: FragmentationControl) -> Self { e.into_raw() }
}

impl core::fmt::Display for FragmentationControl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FragmentationControl::NoFragmentation => write!(f, "NoFragmentation"),
            FragmentationControl::Last => write!(f, "Last"),
            FragmentationControl::First => write!(f, "First"),
            FragmentationControl::Middle => write!(f, "Middle"),
        }
    }
}
