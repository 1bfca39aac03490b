/// Convergence sublayer specification of a service flow
/// Bits: 8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CsSpecification {
    Atm = 99,
    Ipv4 = 100,
    Ipv6 = 101,
    Ethernet = 102,
    Vlan = 103,
    Ipv4OverEthernet = 104,
    Ipv6OverEthernet = 105,
    Ipv4OverVlan = 106,
    Ipv6OverVlan = 107,
}

impl std::convert::TryFrom<u64> for CsSpecification {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            99 => Ok(CsSpecification::Atm),
            100 => Ok(CsSpecification::Ipv4),
            101 => Ok(CsSpecification::Ipv6),
            102 => Ok(CsSpecification::Ethernet),
            103 => Ok(CsSpecification::Vlan),
            104 => Ok(CsSpecification::Ipv4OverEthernet),
            105 => Ok(CsSpecification::Ipv6OverEthernet),
            106 => Ok(CsSpecification::Ipv4OverVlan),
            107 => Ok(CsSpecification::Ipv6OverVlan),
            _ => Err(()),
        }
    }
}

impl CsSpecification {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u64
    }
}

impl From<CsSpecification> for u64 {
    fn from(e: CsSpecification) -> Self { e.into_raw() }
}

impl core::fmt::Display for CsSpecification {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CsSpecification::Atm => write!(f, "ATM"),
            CsSpecification::Ipv4 => write!(f, "IPv4"),
            CsSpecification::Ipv6 => write!(f, "IPv6"),
            CsSpecification::Ethernet => write!(f, "Ethernet"),
            CsSpecification::Vlan => write!(f, "VLAN"),
            CsSpecification::Ipv4OverEthernet => write!(f, "IPv4 over Ethernet"),
            CsSpecification::Ipv6OverEthernet => write!(f, "IPv6 over Ethernet"),
            CsSpecification::Ipv4OverVlan => write!(f, "IPv4 over VLAN"),
            CsSpecification::Ipv6OverVlan => write!(f, "IPv6 over VLAN"),
        }
    }
}
