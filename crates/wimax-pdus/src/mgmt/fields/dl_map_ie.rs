use core::fmt;

use wimax_core::{ByteBuffer, Cid, PduParseErr};

use crate::burst::iuc::diuc;

/// DL-MAP information element: `cid u16, diuc u8, preamble u8, start time u16`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlMapIe {
    pub cid: Cid,
    pub diuc: u8,
    pub preamble_present: bool,
    /// First symbol of the burst within the downlink subframe
    pub start_time: u16,
}

impl DlMapIe {
    pub const SERIALIZED_SIZE: usize = 6;

    /// Terminating IE, addressed to the initial ranging CID
    pub fn end_of_map(start_time: u16) -> Self {
        DlMapIe { cid: Cid::INITIAL_RANGING, diuc: diuc::END_OF_MAP, preamble_present: false, start_time }
    }

    pub fn is_end_of_map(&self) -> bool {
        self.diuc == diuc::END_OF_MAP
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        buf.write_uint(self.cid.id() as u64, 2);
        buf.write_uint(self.diuc as u64, 1);
        buf.write_uint(self.preamble_present as u64, 1);
        buf.write_uint(self.start_time as u64, 2);
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let cid = Cid::new(buf.read_field(2, "cid")? as u16);
        let diuc = buf.read_field(1, "diuc")? as u8;
        let preamble = buf.read_field(1, "preamble")?;
        if preamble > 1 {
            return Err(PduParseErr::InvalidValue { field: "preamble", value: preamble });
        }
        let start_time = buf.read_field(2, "start_time")? as u16;
        Ok(DlMapIe { cid, diuc, preamble_present: preamble == 1, start_time })
    }
}

impl fmt::Display for DlMapIe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DlMapIe {{ cid: {} diuc: {} start: {} }}", self.cid, self.diuc, self.start_time)
    }
}
