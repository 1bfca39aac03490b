/// DSA-RSP / DSA-ACK confirmation code
/// Bits: 8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConfirmationCode {
    Success = 0,
    RejectOther = 1,
    RejectUnrecognizedConfiguration = 2,
    /// Temporary lack of resources, e.g. no CID or no uplink capacity
    RejectTemporary = 3,
    RejectPermanent = 4,
    RejectNotOwner = 5,
    RejectServiceFlowNotFound = 6,
    RejectServiceFlowExists = 7,
    RejectRequiredParameterNotPresent = 8,
    RejectHeaderSuppression = 9,
    RejectUnknownTransactionId = 10,
}

impl std::convert::TryFrom<u64> for ConfirmationCode {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(ConfirmationCode::Success),
            1 => Ok(ConfirmationCode::RejectOther),
            2 => Ok(ConfirmationCode::RejectUnrecognizedConfiguration),
            3 => Ok(ConfirmationCode::RejectTemporary),
            4 => Ok(ConfirmationCode::RejectPermanent),
            5 => Ok(ConfirmationCode::RejectNotOwner),
            6 => Ok(ConfirmationCode::RejectServiceFlowNotFound),
            7 => Ok(ConfirmationCode::RejectServiceFlowExists),
            8 => Ok(ConfirmationCode::RejectRequiredParameterNotPresent),
            9 => Ok(ConfirmationCode::RejectHeaderSuppression),
            10 => Ok(ConfirmationCode::RejectUnknownTransactionId),
            _ => Err(()),
        }
    }
}

impl ConfirmationCode {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u64
    }

    pub fn is_success(self) -> bool {
        self == ConfirmationCode::Success
    }
}

impl From<ConfirmationCode> for u64 {
    fn from(e: ConfirmationCode) -> Self { e.into_raw() }
}

impl core::fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfirmationCode::Success => write!(f, "Success"),
            ConfirmationCode::RejectOther => write!(f, "RejectOther"),
            ConfirmationCode::RejectUnrecognizedConfiguration => write!(f, "RejectUnrecognizedConfiguration"),
            ConfirmationCode::RejectTemporary => write!(f, "RejectTemporary"),
            ConfirmationCode::RejectPermanent => write!(f, "RejectPermanent"),
            ConfirmationCode::RejectNotOwner => write!(f, "RejectNotOwner"),
            ConfirmationCode::RejectServiceFlowNotFound => write!(f, "RejectServiceFlowNotFound"),
            ConfirmationCode::RejectServiceFlowExists => write!(f, "RejectServiceFlowExists"),
            ConfirmationCode::RejectRequiredParameterNotPresent => write!(f, "RejectRequiredParameterNotPresent"),
            ConfirmationCode::RejectHeaderSuppression => write!(f, "RejectHeaderSuppression"),
            ConfirmationCode::RejectUnknownTransactionId => write!(f, "RejectUnknownTransactionId"),
        }
    }
}
