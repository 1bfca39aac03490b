use core::fmt;

use wimax_core::{ByteBuffer, Cid, PduParseErr};

use super::enums::bw_request_type::BwRequestType;
use super::hcs::crc8;

/// Largest value of the 19-bit BR field
pub const MAX_BW_REQUEST: u32 = (1 << 19) - 1;

/// Bandwidth request header: `HT=1 | EC=0 | Type(3) | BR(19) | CID(16) | HCS(8)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BwRequestHeader {
    pub req_type: BwRequestType,
    /// Requested bytes
    pub br: u32,
    pub cid: Cid,
}

impl BwRequestHeader {
    /// Request clamped to what the BR field can carry
    pub fn new(req_type: BwRequestType, bytes: u32, cid: Cid) -> Self {
        BwRequestHeader { req_type, br: bytes.min(MAX_BW_REQUEST), cid }
    }

    pub fn serialized_size(&self) -> usize {
        6
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        assert!(self.br <= MAX_BW_REQUEST, "br is 19 bits");
        let cid = self.cid.id();
        let head = [
            0x80 | ((self.req_type.into_raw() as u8) << 3) | ((self.br >> 16) as u8 & 0x07),
            (self.br >> 8) as u8,
            self.br as u8,
            (cid >> 8) as u8,
            cid as u8,
        ];
        buf.write_bytes(&head);
        buf.write_uint(crc8(&head) as u64, 1);
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let head: [u8; 5] = buf.read_array("bw_request_header")?;
        let hcs = buf.read_field(1, "hcs")? as u8;
        let expected = crc8(&head);
        if hcs != expected {
            return Err(PduParseErr::InvalidHcs { expected, found: hcs });
        }
        if head[0] & 0x80 == 0 {
            return Err(PduParseErr::InvalidValue { field: "ht", value: 0 });
        }
        let raw_type = ((head[0] >> 3) & 0x07) as u64;
        let req_type = BwRequestType::try_from(raw_type)
            .map_err(|_| PduParseErr::InvalidValue { field: "bw_request_type", value: raw_type })?;
        Ok(BwRequestHeader {
            req_type,
            br: (((head[0] & 0x07) as u32) << 16) | ((head[1] as u32) << 8) | head[2] as u32,
            cid: Cid::new(((head[3] as u16) << 8) | head[4] as u16),
        })
    }
}

impl fmt::Display for BwRequestHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BwRequestHeader {{ {} br: {} cid: {} }}", self.req_type, self.br, self.cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_br_field_19_bits() {
        let h = BwRequestHeader::new(BwRequestType::Aggregate, MAX_BW_REQUEST, Cid::new(0xBEEF));
        let mut buf = ByteBuffer::new_autoexpand(6);
        h.to_bytes(&mut buf);
        let bytes = buf.into_bytes();
        assert_eq!(bytes[0], 0x80 | 0x08 | 0x07);
        let mut rd = ByteBuffer::from_vec(bytes);
        assert_eq!(BwRequestHeader::from_bytes(&mut rd).unwrap(), h);
    }

    #[test]
    fn test_request_is_clamped() {
        let h = BwRequestHeader::new(BwRequestType::Incremental, u32::MAX, Cid::new(1));
        assert_eq!(h.br, MAX_BW_REQUEST);
    }
}
