use std::net::Ipv4Addr;

use wimax_core::PduParseErr;

use crate::tlv::tlv_type::rule;
use crate::tlv::{Tlv, TlvValue};

use super::five_tuple::FiveTuple;

/// IPv4 packet classification rule. Empty lists match anything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IpcsClassifierRecord {
    /// Higher priority rules are checked first
    pub priority: u8,
    /// Tie-breaker between rules of equal priority, lower first
    pub index: u16,
    /// (low, high, mask) applied to the ToS byte
    pub tos: Option<(u8, u8, u8)>,
    pub protocols: Vec<u8>,
    /// (address, mask)
    pub src_addrs: Vec<(Ipv4Addr, Ipv4Addr)>,
    pub dst_addrs: Vec<(Ipv4Addr, Ipv4Addr)>,
    /// Inclusive (low, high)
    pub src_ports: Vec<(u16, u16)>,
    pub dst_ports: Vec<(u16, u16)>,
}

fn addr_matches(list: &[(Ipv4Addr, Ipv4Addr)], addr: Ipv4Addr) -> bool {
    list.is_empty()
        || list.iter().any(|(a, m)| u32::from(addr) & u32::from(*m) == u32::from(*a) & u32::from(*m))
}

fn port_matches(list: &[(u16, u16)], port: u16) -> bool {
    list.is_empty() || list.iter().any(|(lo, hi)| port >= *lo && port <= *hi)
}

impl IpcsClassifierRecord {
    /// Whether all rule components accept the tuple
    pub fn check_match(&self, t: &FiveTuple) -> bool {
        let tos_ok = match self.tos {
            Some((low, high, mask)) => {
                let v = t.tos & mask;
                v >= low && v <= high
            }
            None => true,
        };
        tos_ok
            && (self.protocols.is_empty() || self.protocols.contains(&t.protocol))
            && addr_matches(&self.src_addrs, t.src)
            && addr_matches(&self.dst_addrs, t.dst)
            && port_matches(&self.src_ports, t.src_port)
            && port_matches(&self.dst_ports, t.dst_port)
    }

    /// Encodes as the value of a packet classification rule TLV
    pub fn to_tlv_value(&self) -> TlvValue {
        let mut v = vec![Tlv::u8(rule::PRIORITY, self.priority)];
        if let Some((low, high, mask)) = self.tos {
            v.push(Tlv::new(rule::TOS, TlvValue::Tos { low, high, mask }));
        }
        if !self.protocols.is_empty() {
            v.push(Tlv::new(rule::PROTOCOL, TlvValue::Protocol(self.protocols.clone())));
        }
        if !self.src_addrs.is_empty() {
            v.push(Tlv::new(rule::IP_SRC, TlvValue::Ipv4Address(self.src_addrs.clone())));
        }
        if !self.dst_addrs.is_empty() {
            v.push(Tlv::new(rule::IP_DST, TlvValue::Ipv4Address(self.dst_addrs.clone())));
        }
        if !self.src_ports.is_empty() {
            v.push(Tlv::new(rule::PORT_SRC, TlvValue::PortRange(self.src_ports.clone())));
        }
        if !self.dst_ports.is_empty() {
            v.push(Tlv::new(rule::PORT_DST, TlvValue::PortRange(self.dst_ports.clone())));
        }
        v.push(Tlv::u16(rule::INDEX, self.index));
        TlvValue::ClassificationRuleVector(v)
    }

    pub fn from_tlv_value(value: &TlvValue) -> Result<Self, PduParseErr> {
        let TlvValue::ClassificationRuleVector(children) = value else {
            return Err(PduParseErr::Inconsistency { field: "classification_rule", reason: "not a rule vector" });
        };
        let mut rec = IpcsClassifierRecord::default();
        for child in children {
            match (&child.value, child.tlv_type) {
                (TlvValue::U8(v), rule::PRIORITY) => rec.priority = *v,
                (TlvValue::U16(v), rule::INDEX) => rec.index = *v,
                (TlvValue::Tos { low, high, mask }, rule::TOS) => rec.tos = Some((*low, *high, *mask)),
                (TlvValue::Protocol(v), rule::PROTOCOL) => rec.protocols = v.clone(),
                (TlvValue::Ipv4Address(v), rule::IP_SRC) => rec.src_addrs = v.clone(),
                (TlvValue::Ipv4Address(v), rule::IP_DST) => rec.dst_addrs = v.clone(),
                (TlvValue::PortRange(v), rule::PORT_SRC) => rec.src_ports = v.clone(),
                (TlvValue::PortRange(v), rule::PORT_DST) => rec.dst_ports = v.clone(),
                (_, t) => return Err(PduParseErr::UnknownTlvType { context: "classification rule", found: t }),
            }
        }
        Ok(rec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(dst_port: u16) -> FiveTuple {
        FiveTuple {
            src: Ipv4Addr::new(10, 1, 0, 2),
            dst: Ipv4Addr::new(10, 1, 0, 1),
            src_port: 1000,
            dst_port,
            protocol: 17,
            tos: 0,
        }
    }

    #[test]
    fn test_empty_rule_matches_everything() {
        assert!(IpcsClassifierRecord::default().check_match(&tuple(1)));
    }

    #[test]
    fn test_match_components() {
        let rec = IpcsClassifierRecord {
            protocols: vec![17],
            src_addrs: vec![(Ipv4Addr::new(10, 1, 0, 0), Ipv4Addr::new(255, 255, 255, 0))],
            dst_ports: vec![(5000, 5010)],
            ..Default::default()
        };
        assert!(rec.check_match(&tuple(5000)));
        assert!(rec.check_match(&tuple(5010)));
        assert!(!rec.check_match(&tuple(5011)), "port outside range");
        let mut t = tuple(5000);
        t.protocol = 6;
        assert!(!rec.check_match(&t), "wrong protocol");
        let mut t = tuple(5000);
        t.src = Ipv4Addr::new(10, 2, 0, 2);
        assert!(!rec.check_match(&t), "source outside subnet");
    }

    #[test]
    fn test_tos_mask() {
        let rec = IpcsClassifierRecord { tos: Some((0x20, 0x30, 0xF0)), ..Default::default() };
        let mut t = tuple(1);
        t.tos = 0x2F;
        assert!(rec.check_match(&t));
        t.tos = 0x40;
        assert!(!rec.check_match(&t));
    }

    #[test]
    fn test_tlv_value_roundtrip() {
        let rec = IpcsClassifierRecord {
            priority: 4,
            index: 2,
            tos: Some((0, 0xff, 0xff)),
            protocols: vec![17],
            dst_addrs: vec![(Ipv4Addr::new(10, 1, 0, 3), Ipv4Addr::new(255, 255, 255, 255))],
            dst_ports: vec![(80, 80)],
            ..Default::default()
        };
        let back = IpcsClassifierRecord::from_tlv_value(&rec.to_tlv_value()).unwrap();
        assert_eq!(back, rec);
    }
}
