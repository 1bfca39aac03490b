use core::fmt;

use wimax_core::{ByteBuffer, Cid, PduParseErr};

use super::hcs::crc8;

pub const MAC_HEADER_LEN: usize = 6;

/// Type field bit announcing a fragmentation subheader
pub const TYPE_FRAGMENTATION_SUBHEADER: u8 = 0b000100;

/// Generic MAC header:
/// `HT=0 | EC | Type(6) | ESF | CI | EKS(2) | rsv | LEN(11) | CID(16) | HCS(8)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericMacHeader {
    pub ec: bool,
    /// Subheader presence bits
    pub type_bits: u8,
    pub esf: bool,
    pub ci: bool,
    pub eks: u8,
    /// Length of the whole PDU, header included
    pub len: u16,
    pub cid: Cid,
}

impl GenericMacHeader {
    pub fn new(cid: Cid) -> Self {
        GenericMacHeader { ec: false, type_bits: 0, esf: false, ci: false, eks: 0, len: MAC_HEADER_LEN as u16, cid }
    }

    pub fn has_fragmentation_subheader(&self) -> bool {
        self.type_bits & TYPE_FRAGMENTATION_SUBHEADER != 0
    }

    pub fn set_fragmentation_subheader(&mut self, present: bool) {
        if present {
            self.type_bits |= TYPE_FRAGMENTATION_SUBHEADER;
        } else {
            self.type_bits &= !TYPE_FRAGMENTATION_SUBHEADER;
        }
    }

    pub fn serialized_size(&self) -> usize {
        MAC_HEADER_LEN
    }

    fn first_five(&self) -> [u8; 5] {
        assert!(self.type_bits < 0x40, "type field is 6 bits");
        assert!(self.eks < 4, "eks is 2 bits");
        assert!(self.len < 0x800, "len is 11 bits");
        let cid = self.cid.id();
        [
            ((self.ec as u8) << 6) | self.type_bits,
            ((self.esf as u8) << 7) | ((self.ci as u8) << 6) | (self.eks << 4) | ((self.len >> 8) as u8 & 0x07),
            self.len as u8,
            (cid >> 8) as u8,
            cid as u8,
        ]
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        let head = self.first_five();
        buf.write_bytes(&head);
        buf.write_uint(crc8(&head) as u64, 1);
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let head: [u8; 5] = buf.read_array("generic_mac_header")?;
        let hcs = buf.read_field(1, "hcs")? as u8;
        let expected = crc8(&head);
        if hcs != expected {
            return Err(PduParseErr::InvalidHcs { expected, found: hcs });
        }
        if head[0] & 0x80 != 0 {
            return Err(PduParseErr::InvalidValue { field: "ht", value: 1 });
        }
        Ok(GenericMacHeader {
            ec: head[0] & 0x40 != 0,
            type_bits: head[0] & 0x3F,
            esf: head[1] & 0x80 != 0,
            ci: head[1] & 0x40 != 0,
            eks: (head[1] >> 4) & 0x03,
            len: (((head[1] & 0x07) as u16) << 8) | head[2] as u16,
            cid: Cid::new(((head[3] as u16) << 8) | head[4] as u16),
        })
    }
}

impl fmt::Display for GenericMacHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenericMacHeader {{ cid: {} len: {} type: {:#08b} }}", self.cid, self.len, self.type_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let mut h = GenericMacHeader::new(Cid::new(0x0102));
        h.len = 0x345;
        h.set_fragmentation_subheader(true);
        let mut buf = ByteBuffer::new_autoexpand(6);
        h.to_bytes(&mut buf);
        let bytes = buf.into_bytes();
        assert_eq!(&bytes[..5], &[0x04, 0x03, 0x45, 0x01, 0x02]);
        assert_eq!(bytes[5], crc8(&bytes[..5]));

        let mut rd = ByteBuffer::from_vec(bytes);
        assert_eq!(GenericMacHeader::from_bytes(&mut rd).unwrap(), h);
    }

    #[test]
    fn test_bad_hcs_rejected() {
        let h = GenericMacHeader::new(Cid::new(7));
        let mut buf = ByteBuffer::new_autoexpand(6);
        h.to_bytes(&mut buf);
        let mut bytes = buf.into_bytes();
        bytes[4] ^= 0x01;
        let mut rd = ByteBuffer::from_vec(bytes);
        assert!(matches!(GenericMacHeader::from_bytes(&mut rd), Err(PduParseErr::InvalidHcs { .. })));
    }
}
