/// Management message type, first byte of every management message
/// Bits: 8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ManagementMessageType {
    Ucd = 0,
    Dcd = 1,
    DlMap = 2,
    UlMap = 3,
    RngReq = 4,
    RngRsp = 5,
    DsaReq = 11,
    DsaRsp = 12,
    DsaAck = 13,
}

impl std::convert::TryFrom<u64> for ManagementMessageType {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(ManagementMessageType::Ucd),
            1 => Ok(ManagementMessageType::Dcd),
            2 => Ok(ManagementMessageType::DlMap),
            3 => Ok(ManagementMessageType::UlMap),
            4 => Ok(ManagementMessageType::RngReq),
            5 => Ok(ManagementMessageType::RngRsp),
            11 => Ok(ManagementMessageType::DsaReq),
            12 => Ok(ManagementMessageType::DsaRsp),
            13 => Ok(ManagementMessageType::DsaAck),
            _ => Err(()),
        }
    }
}

impl ManagementMessageType {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u64
    }
}

impl From<ManagementMessageType> for u64 {
    fn from(e: ManagementMessageType) -> Self { e.into_raw() }
}

impl core::fmt::Display for ManagementMessageType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ManagementMessageType::Ucd => write!(f, "UCD"),
            ManagementMessageType::Dcd => write!(f, "DCD"),
            ManagementMessageType::DlMap => write!(f, "DL-MAP"),
            ManagementMessageType::UlMap => write!(f, "UL-MAP"),
            ManagementMessageType::RngReq => write!(f, "RNG-REQ"),
            ManagementMessageType::RngRsp => write!(f, "RNG-RSP"),
            ManagementMessageType::DsaReq => write!(f, "DSA-REQ"),
            ManagementMessageType::DsaRsp => write!(f, "DSA-RSP"),
            ManagementMessageType::DsaAck => write!(f, "DSA-ACK"),
        }
    }
}
