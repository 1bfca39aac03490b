use core::fmt;

/// Connection type, derived from the numeric range a CID falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CidType {
    InitialRanging,
    Basic,
    Primary,
    Transport,
    Multicast,
    Padding,
    Broadcast,
}

impl fmt::Display for CidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CidType::InitialRanging => write!(f, "InitialRanging"),
            CidType::Basic => write!(f, "Basic"),
            CidType::Primary => write!(f, "Primary"),
            CidType::Transport => write!(f, "Transport"),
            CidType::Multicast => write!(f, "Multicast"),
            CidType::Padding => write!(f, "Padding"),
            CidType::Broadcast => write!(f, "Broadcast"),
        }
    }
}

/// 16-bit Connection Identifier. Equality is by numeric value only; the type of a
/// CID is not stored but derived by a `CidFactory` from its configured ranges.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Cid(u16);

impl Cid {
    pub const INITIAL_RANGING: Cid = Cid(0x0000);
    pub const PADDING: Cid = Cid(0xFFFE);
    pub const BROADCAST: Cid = Cid(0xFFFF);

    pub const fn new(id: u16) -> Self {
        Cid(id)
    }

    pub const fn id(self) -> u16 {
        self.0
    }

    pub fn is_initial_ranging(self) -> bool {
        self == Cid::INITIAL_RANGING
    }

    pub fn is_broadcast(self) -> bool {
        self == Cid::BROADCAST
    }

    pub fn is_padding(self) -> bool {
        self == Cid::PADDING
    }
}

impl From<u16> for Cid {
    fn from(id: u16) -> Self {
        Cid(id)
    }
}

impl From<Cid> for u16 {
    fn from(cid: Cid) -> Self {
        cid.0
    }
}

impl From<Cid> for u64 {
    fn from(cid: Cid) -> Self {
        cid.0 as u64
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({:#06x})", self.0)
    }
}
