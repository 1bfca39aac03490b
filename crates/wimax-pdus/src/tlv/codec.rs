use std::net::Ipv4Addr;

use wimax_core::{ByteBuffer, PduParseErr};

use super::tlv_type::{TlvContext, cs, rule, sf, top};

/// Value of a TLV. Which variant a type byte maps to depends on the enclosing vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlvValue {
    U8(u8),
    U16(u16),
    U32(u32),
    Tos { low: u8, high: u8, mask: u8 },
    /// (low, high) port ranges
    PortRange(Vec<(u16, u16)>),
    Protocol(Vec<u8>),
    /// (address, mask) pairs
    Ipv4Address(Vec<(Ipv4Addr, Ipv4Addr)>),
    SfVector(Vec<Tlv>),
    CsParamVector(Vec<Tlv>),
    ClassificationRuleVector(Vec<Tlv>),
}

/// Value shapes, used to pick the decoder for a (context, type) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    U8,
    U16,
    U32,
    Tos,
    PortRange,
    Protocol,
    Ipv4Address,
    SfVector,
    CsParamVector,
    ClassificationRuleVector,
    /// Carried but ignored: consumed and dropped on decode
    Skip,
}

fn value_kind(ctx: TlvContext, tlv_type: u8) -> Option<ValueKind> {
    use ValueKind::*;
    match ctx {
        TlvContext::TopLevel => match tlv_type {
            top::UPLINK_SERVICE_FLOW | top::DOWNLINK_SERVICE_FLOW => Some(SfVector),
            _ => None,
        },
        TlvContext::ServiceFlow => match tlv_type {
            sf::SFID => Some(U32),
            sf::CID => Some(U16),
            sf::SERVICE_CLASS_NAME => Some(Skip),
            sf::QOS_PARAM_SET_TYPE | sf::TRAFFIC_PRIORITY => Some(U8),
            sf::MAX_SUSTAINED_TRAFFIC_RATE
            | sf::MAX_TRAFFIC_BURST
            | sf::MIN_RESERVED_TRAFFIC_RATE
            | sf::MIN_TOLERABLE_TRAFFIC_RATE => Some(U32),
            sf::SCHEDULING_TYPE => Some(U8),
            sf::REQUEST_TX_POLICY | sf::TOLERATED_JITTER | sf::MAXIMUM_LATENCY => Some(U32),
            sf::FIXED_VS_VARIABLE_SDU | sf::SDU_SIZE => Some(U8),
            sf::TARGET_SAID => Some(U16),
            sf::ARQ_ENABLE => Some(U8),
            sf::ARQ_WINDOW_SIZE | sf::UNSOLICITED_GRANT_INTERVAL | sf::UNSOLICITED_POLLING_INTERVAL => Some(U16),
            sf::CS_SPECIFICATION => Some(U8),
            sf::IPV4_CS_PARAMETERS => Some(CsParamVector),
            _ => None,
        },
        TlvContext::CsParam => match tlv_type {
            cs::CLASSIFIER_DSC_ACTION => Some(U8),
            cs::PACKET_CLASSIFICATION_RULE => Some(ClassificationRuleVector),
            _ => None,
        },
        TlvContext::ClassificationRule => match tlv_type {
            rule::PRIORITY => Some(U8),
            rule::TOS => Some(Tos),
            rule::PROTOCOL => Some(Protocol),
            rule::IP_SRC | rule::IP_DST => Some(Ipv4Address),
            rule::PORT_SRC | rule::PORT_DST => Some(PortRange),
            rule::INDEX => Some(U16),
            _ => None,
        },
    }
}

/// Bytes used by the variable-length encoding of `len`: 1 below 128, else 0x80|n plus n bytes
pub fn size_of_len(len: usize) -> usize {
    if len < 0x80 {
        1
    } else if len <= 0xFF {
        2
    } else {
        assert!(len <= 0xFFFF, "TLV length {} not encodable", len);
        3
    }
}

fn write_len(buf: &mut ByteBuffer, len: usize) {
    match size_of_len(len) {
        1 => buf.write_uint(len as u64, 1),
        2 => {
            buf.write_uint(0x81, 1);
            buf.write_uint(len as u64, 1);
        }
        _ => {
            buf.write_uint(0x82, 1);
            buf.write_uint(len as u64, 2);
        }
    }
}

fn read_len(buf: &mut ByteBuffer) -> Result<usize, PduParseErr> {
    let first = buf.read_field(1, "tlv_length")?;
    if first & 0x80 == 0 {
        return Ok(first as usize);
    }
    let n = (first & 0x7F) as usize;
    if n == 0 || n > 2 {
        return Err(PduParseErr::InvalidValue { field: "tlv_length_size", value: n as u64 });
    }
    Ok(buf.read_field(n, "tlv_length")? as usize)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    pub tlv_type: u8,
    pub value: TlvValue,
}

impl Tlv {
    pub fn new(tlv_type: u8, value: TlvValue) -> Self {
        Tlv { tlv_type, value }
    }

    pub fn u8(tlv_type: u8, v: u8) -> Self {
        Tlv::new(tlv_type, TlvValue::U8(v))
    }

    pub fn u16(tlv_type: u8, v: u16) -> Self {
        Tlv::new(tlv_type, TlvValue::U16(v))
    }

    pub fn u32(tlv_type: u8, v: u32) -> Self {
        Tlv::new(tlv_type, TlvValue::U32(v))
    }

    /// Length of the value part in bytes
    pub fn value_len(&self) -> usize {
        self.value.serialized_size()
    }

    /// Bytes taken by the length field
    pub fn size_of_len(&self) -> usize {
        size_of_len(self.value_len())
    }

    pub fn serialized_size(&self) -> usize {
        1 + self.size_of_len() + self.value_len()
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        let start = buf.get_pos();
        buf.write_uint(self.tlv_type as u64, 1);
        write_len(buf, self.value_len());
        self.value.to_bytes(buf);
        assert_eq!(buf.get_pos() - start, self.serialized_size(), "TLV {} size mismatch", self.tlv_type);
    }

    /// Decodes one TLV in the given context. Types that are carried but ignored yield None.
    pub fn from_bytes(buf: &mut ByteBuffer, ctx: TlvContext) -> Result<Option<Self>, PduParseErr> {
        let tlv_type = buf.read_field(1, "tlv_type")? as u8;
        let len = read_len(buf)?;
        let Some(kind) = value_kind(ctx, tlv_type) else {
            tracing::debug!("unknown TLV type {} in {} context", tlv_type, ctx);
            return Err(PduParseErr::UnknownTlvType { context: ctx_name(ctx), found: tlv_type });
        };
        let raw = buf.read_bytes(len, "tlv_value")?;
        if kind == ValueKind::Skip {
            return Ok(None);
        }
        let mut sub = ByteBuffer::from_vec(raw);
        let value = TlvValue::from_bytes(&mut sub, kind, len)?;
        if sub.get_len_remaining() != 0 {
            return Err(PduParseErr::InconsistentLength { expected: len, found: len - sub.get_len_remaining() });
        }
        Ok(Some(Tlv { tlv_type, value }))
    }

    /// Children of a vector value, or None for scalar values
    pub fn children(&self) -> Option<&[Tlv]> {
        match &self.value {
            TlvValue::SfVector(v) | TlvValue::CsParamVector(v) | TlvValue::ClassificationRuleVector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        if let TlvValue::U8(v) = self.value { Some(v) } else { None }
    }

    pub fn as_u16(&self) -> Option<u16> {
        if let TlvValue::U16(v) = self.value { Some(v) } else { None }
    }

    pub fn as_u32(&self) -> Option<u32> {
        if let TlvValue::U32(v) = self.value { Some(v) } else { None }
    }
}

fn ctx_name(ctx: TlvContext) -> &'static str {
    match ctx {
        TlvContext::TopLevel => "top-level",
        TlvContext::ServiceFlow => "service flow",
        TlvContext::CsParam => "cs parameters",
        TlvContext::ClassificationRule => "classification rule",
    }
}

/// Reads child TLVs until the buffer is exhausted
fn children_from_bytes(buf: &mut ByteBuffer, ctx: TlvContext) -> Result<Vec<Tlv>, PduParseErr> {
    let mut out = Vec::new();
    while buf.get_len_remaining() > 0 {
        if let Some(tlv) = Tlv::from_bytes(buf, ctx)? {
            out.push(tlv);
        }
    }
    Ok(out)
}

impl TlvValue {
    pub fn serialized_size(&self) -> usize {
        match self {
            TlvValue::U8(_) => 1,
            TlvValue::U16(_) => 2,
            TlvValue::U32(_) => 4,
            TlvValue::Tos { .. } => 3,
            TlvValue::PortRange(v) => v.len() * 4,
            TlvValue::Protocol(v) => v.len(),
            TlvValue::Ipv4Address(v) => v.len() * 8,
            TlvValue::SfVector(v) | TlvValue::CsParamVector(v) | TlvValue::ClassificationRuleVector(v) => {
                v.iter().map(|t| t.serialized_size()).sum()
            }
        }
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        match self {
            TlvValue::U8(v) => buf.write_uint(*v as u64, 1),
            TlvValue::U16(v) => buf.write_uint(*v as u64, 2),
            TlvValue::U32(v) => buf.write_uint(*v as u64, 4),
            TlvValue::Tos { low, high, mask } => {
                buf.write_uint(*low as u64, 1);
                buf.write_uint(*high as u64, 1);
                buf.write_uint(*mask as u64, 1);
            }
            TlvValue::PortRange(v) => {
                for (low, high) in v {
                    buf.write_uint(*low as u64, 2);
                    buf.write_uint(*high as u64, 2);
                }
            }
            TlvValue::Protocol(v) => buf.write_bytes(v),
            TlvValue::Ipv4Address(v) => {
                for (addr, mask) in v {
                    buf.write_bytes(&addr.octets());
                    buf.write_bytes(&mask.octets());
                }
            }
            TlvValue::SfVector(v) | TlvValue::CsParamVector(v) | TlvValue::ClassificationRuleVector(v) => {
                for t in v {
                    t.to_bytes(buf);
                }
            }
        }
    }

    fn from_bytes(buf: &mut ByteBuffer, kind: ValueKind, len: usize) -> Result<Self, PduParseErr> {
        let expect_len = |n: usize| {
            if len == n { Ok(()) } else { Err(PduParseErr::InconsistentLength { expected: n, found: len }) }
        };
        let expect_multiple = |n: usize| {
            if len % n == 0 { Ok(()) } else { Err(PduParseErr::InconsistentLength { expected: len - len % n, found: len }) }
        };
        Ok(match kind {
            ValueKind::U8 => {
                expect_len(1)?;
                TlvValue::U8(buf.read_field(1, "tlv_u8")? as u8)
            }
            ValueKind::U16 => {
                expect_len(2)?;
                TlvValue::U16(buf.read_field(2, "tlv_u16")? as u16)
            }
            ValueKind::U32 => {
                expect_len(4)?;
                TlvValue::U32(buf.read_field(4, "tlv_u32")? as u32)
            }
            ValueKind::Tos => {
                expect_len(3)?;
                let low = buf.read_field(1, "tos_low")? as u8;
                let high = buf.read_field(1, "tos_high")? as u8;
                let mask = buf.read_field(1, "tos_mask")? as u8;
                TlvValue::Tos { low, high, mask }
            }
            ValueKind::PortRange => {
                expect_multiple(4)?;
                let mut v = Vec::with_capacity(len / 4);
                for _ in 0..len / 4 {
                    let low = buf.read_field(2, "port_low")? as u16;
                    let high = buf.read_field(2, "port_high")? as u16;
                    v.push((low, high));
                }
                TlvValue::PortRange(v)
            }
            ValueKind::Protocol => TlvValue::Protocol(buf.read_bytes(len, "protocol")?),
            ValueKind::Ipv4Address => {
                expect_multiple(8)?;
                let mut v = Vec::with_capacity(len / 8);
                for _ in 0..len / 8 {
                    let addr: [u8; 4] = buf.read_array("ip_addr")?;
                    let mask: [u8; 4] = buf.read_array("ip_mask")?;
                    v.push((Ipv4Addr::from(addr), Ipv4Addr::from(mask)));
                }
                TlvValue::Ipv4Address(v)
            }
            ValueKind::SfVector => TlvValue::SfVector(children_from_bytes(buf, TlvContext::ServiceFlow)?),
            ValueKind::CsParamVector => TlvValue::CsParamVector(children_from_bytes(buf, TlvContext::CsParam)?),
            ValueKind::ClassificationRuleVector => {
                TlvValue::ClassificationRuleVector(children_from_bytes(buf, TlvContext::ClassificationRule)?)
            }
            ValueKind::Skip => unreachable!("skipped values are never decoded"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(tlv: &Tlv) -> Vec<u8> {
        let mut buf = ByteBuffer::new_autoexpand(32);
        tlv.to_bytes(&mut buf);
        buf.into_bytes()
    }

    #[test]
    fn test_length_encoding_sizes() {
        assert_eq!(size_of_len(0), 1);
        assert_eq!(size_of_len(127), 1);
        assert_eq!(size_of_len(128), 2);
        assert_eq!(size_of_len(255), 2);
        assert_eq!(size_of_len(256), 3);
    }

    #[test]
    fn test_long_length_roundtrip() {
        // 40 port ranges -> 160 value bytes -> 2 length bytes
        let ranges: Vec<(u16, u16)> = (0..40).map(|i| (i, i + 100)).collect();
        let tlv = Tlv::new(rule::PORT_DST, TlvValue::PortRange(ranges));
        let bytes = encode(&tlv);
        assert_eq!(bytes.len(), tlv.serialized_size());
        assert_eq!(&bytes[..3], &[rule::PORT_DST, 0x81, 160]);
        let mut buf = ByteBuffer::from_vec(bytes);
        let back = Tlv::from_bytes(&mut buf, TlvContext::ClassificationRule).unwrap().unwrap();
        assert_eq!(back, tlv);
    }

    #[test]
    fn test_nested_vector_roundtrip() {
        let rule_vec = TlvValue::ClassificationRuleVector(vec![
            Tlv::u8(rule::PRIORITY, 3),
            Tlv::new(rule::TOS, TlvValue::Tos { low: 1, high: 2, mask: 0xfc }),
            Tlv::new(rule::PROTOCOL, TlvValue::Protocol(vec![6, 17])),
            Tlv::new(
                rule::IP_SRC,
                TlvValue::Ipv4Address(vec![(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(255, 255, 255, 0))]),
            ),
            Tlv::u16(rule::INDEX, 9),
        ]);
        let cs_vec = TlvValue::CsParamVector(vec![Tlv::u8(cs::CLASSIFIER_DSC_ACTION, 0), Tlv::new(cs::PACKET_CLASSIFICATION_RULE, rule_vec)]);
        let sf_vec = TlvValue::SfVector(vec![Tlv::u32(sf::SFID, 77), Tlv::new(sf::IPV4_CS_PARAMETERS, cs_vec)]);
        let tlv = Tlv::new(top::UPLINK_SERVICE_FLOW, sf_vec);

        let bytes = encode(&tlv);
        assert_eq!(bytes.len(), tlv.serialized_size());
        let mut buf = ByteBuffer::from_vec(bytes);
        let back = Tlv::from_bytes(&mut buf, TlvContext::TopLevel).unwrap().unwrap();
        assert_eq!(back, tlv);
        assert_eq!(buf.get_len_remaining(), 0);
    }

    #[test]
    fn test_unknown_type_rejected() {
        // Type 99 inside a service flow vector
        let mut buf = ByteBuffer::from_bytes(&[top::UPLINK_SERVICE_FLOW, 3, 99, 1, 0]);
        assert_eq!(
            Tlv::from_bytes(&mut buf, TlvContext::TopLevel),
            Err(PduParseErr::UnknownTlvType { context: "service flow", found: 99 })
        );
    }

    #[test]
    fn test_wrong_scalar_length_rejected() {
        // SFID declared with 2 bytes instead of 4
        let mut buf = ByteBuffer::from_bytes(&[sf::SFID, 2, 0, 1]);
        assert_eq!(
            Tlv::from_bytes(&mut buf, TlvContext::ServiceFlow),
            Err(PduParseErr::InconsistentLength { expected: 4, found: 2 })
        );
    }

    #[test]
    fn test_truncated_value() {
        let mut buf = ByteBuffer::from_bytes(&[sf::SFID, 4, 0, 1]);
        assert!(matches!(Tlv::from_bytes(&mut buf, TlvContext::ServiceFlow), Err(PduParseErr::BufferEnded { .. })));
    }

    #[test]
    fn test_service_class_name_skipped() {
        let mut buf = ByteBuffer::from_bytes(&[top::DOWNLINK_SERVICE_FLOW, 8, sf::SERVICE_CLASS_NAME, 3, b'a', b'b', b'c', sf::SDU_SIZE, 1, 5]);
        let tlv = Tlv::from_bytes(&mut buf, TlvContext::TopLevel).unwrap().unwrap();
        assert_eq!(tlv.children().unwrap(), &[Tlv::u8(sf::SDU_SIZE, 5)]);
    }
}
