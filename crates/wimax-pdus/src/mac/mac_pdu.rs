use core::fmt;

use wimax_core::{ByteBuffer, Cid, PduParseErr};

use super::bw_request_header::BwRequestHeader;
use super::enums::mac_header_type::MacHeaderType;
use super::fragmentation_subheader::{FRAG_SUBHEADER_LEN, FragmentationSubheader};
use super::generic_mac_header::{GenericMacHeader, MAC_HEADER_LEN};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacHeader {
    Generic(GenericMacHeader),
    BandwidthRequest(BwRequestHeader),
}

impl MacHeader {
    pub fn header_type(&self) -> MacHeaderType {
        match self {
            MacHeader::Generic(_) => MacHeaderType::Generic,
            MacHeader::BandwidthRequest(_) => MacHeaderType::BandwidthRequest,
        }
    }

    pub fn cid(&self) -> Cid {
        match self {
            MacHeader::Generic(h) => h.cid,
            MacHeader::BandwidthRequest(h) => h.cid,
        }
    }
}

/// One MAC PDU: header, optional fragmentation subheader and payload.
/// Bandwidth request PDUs are header-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacPdu {
    pub header: MacHeader,
    pub frag: Option<FragmentationSubheader>,
    pub payload: Vec<u8>,
}

impl MacPdu {
    /// Builds a generic PDU with LEN and the subheader bit filled in
    pub fn generic(cid: Cid, frag: Option<FragmentationSubheader>, payload: Vec<u8>) -> Self {
        let mut hdr = GenericMacHeader::new(cid);
        hdr.set_fragmentation_subheader(frag.is_some());
        let len = MAC_HEADER_LEN + frag.map_or(0, |_| FRAG_SUBHEADER_LEN) + payload.len();
        hdr.len = len as u16;
        MacPdu { header: MacHeader::Generic(hdr), frag, payload }
    }

    pub fn bandwidth_request(hdr: BwRequestHeader) -> Self {
        MacPdu { header: MacHeader::BandwidthRequest(hdr), frag: None, payload: Vec::new() }
    }

    pub fn cid(&self) -> Cid {
        self.header.cid()
    }

    pub fn serialized_size(&self) -> usize {
        MAC_HEADER_LEN + self.frag.map_or(0, |f| f.serialized_size()) + self.payload.len()
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        let start = buf.get_pos();
        match &self.header {
            MacHeader::Generic(h) => {
                assert_eq!(h.len as usize, self.serialized_size(), "generic header LEN does not match PDU size");
                assert_eq!(h.has_fragmentation_subheader(), self.frag.is_some(), "subheader bit mismatch");
                h.to_bytes(buf);
                if let Some(f) = &self.frag {
                    f.to_bytes(buf);
                }
                buf.write_bytes(&self.payload);
            }
            MacHeader::BandwidthRequest(h) => {
                assert!(self.payload.is_empty() && self.frag.is_none(), "bandwidth request PDUs carry no payload");
                h.to_bytes(buf);
            }
        }
        assert_eq!(buf.get_pos() - start, self.serialized_size());
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let Some(first) = buf.peek_field(1) else {
            return Err(PduParseErr::BufferEnded { field: Some("mac_header") });
        };
        if first & 0x80 != 0 {
            return Ok(MacPdu::bandwidth_request(BwRequestHeader::from_bytes(buf)?));
        }

        let hdr = GenericMacHeader::from_bytes(buf)?;
        let total = hdr.len as usize;
        let sub_len = if hdr.has_fragmentation_subheader() { FRAG_SUBHEADER_LEN } else { 0 };
        if total < MAC_HEADER_LEN + sub_len {
            return Err(PduParseErr::InconsistentLength { expected: MAC_HEADER_LEN + sub_len, found: total });
        }
        if total - MAC_HEADER_LEN > buf.get_len_remaining() {
            return Err(PduParseErr::InconsistentLength {
                expected: total,
                found: MAC_HEADER_LEN + buf.get_len_remaining(),
            });
        }
        let frag = if sub_len > 0 { Some(FragmentationSubheader::from_bytes(buf)?) } else { None };
        let payload = buf.read_bytes(total - MAC_HEADER_LEN - sub_len, "payload")?;
        Ok(MacPdu { header: MacHeader::Generic(hdr), frag, payload })
    }

    /// Decodes back-to-back PDUs until the buffer is exhausted
    pub fn burst_from_bytes(buf: &mut ByteBuffer) -> Result<Vec<MacPdu>, PduParseErr> {
        let mut out = Vec::new();
        while buf.get_len_remaining() > 0 {
            out.push(MacPdu::from_bytes(buf)?);
        }
        Ok(out)
    }
}

impl fmt::Display for MacPdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.header {
            MacHeader::Generic(h) => {
                write!(f, "MacPdu {{ cid: {} len: {}", h.cid, h.len)?;
                if let Some(frag) = &self.frag {
                    write!(f, " frag: {} fsn: {}", frag.fc, frag.fsn)?;
                }
                write!(f, " }}")
            }
            MacHeader::BandwidthRequest(h) => write!(f, "{}", h),
        }
    }
}
