use core::fmt;

use wimax_core::{ByteBuffer, Cid, PduParseErr};

use crate::burst::iuc::uiuc;

/// UL-MAP information element:
/// `cid u16, start time u16, subchannel u8, uiuc u8, duration u16, midamble rep u8`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UlMapIe {
    pub cid: Cid,
    /// First symbol of the allocation within the uplink subframe
    pub start_time: u16,
    pub subchannel_index: u8,
    pub uiuc: u8,
    /// Symbols
    pub duration: u16,
    pub midamble_repetition_interval: u8,
}

impl UlMapIe {
    pub const SERIALIZED_SIZE: usize = 9;

    pub fn new(cid: Cid, uiuc: u8) -> Self {
        UlMapIe { cid, start_time: 0, subchannel_index: 0, uiuc, duration: 0, midamble_repetition_interval: 0 }
    }

    /// Terminating IE: zero duration at the final offset
    pub fn end_of_map(start_time: u16) -> Self {
        UlMapIe { start_time, ..UlMapIe::new(Cid::INITIAL_RANGING, uiuc::END_OF_MAP) }
    }

    pub fn is_end_of_map(&self) -> bool {
        self.uiuc == uiuc::END_OF_MAP
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        buf.write_uint(self.cid.id() as u64, 2);
        buf.write_uint(self.start_time as u64, 2);
        buf.write_uint(self.subchannel_index as u64, 1);
        buf.write_uint(self.uiuc as u64, 1);
        buf.write_uint(self.duration as u64, 2);
        buf.write_uint(self.midamble_repetition_interval as u64, 1);
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        Ok(UlMapIe {
            cid: Cid::new(buf.read_field(2, "cid")? as u16),
            start_time: buf.read_field(2, "start_time")? as u16,
            subchannel_index: buf.read_field(1, "subchannel_index")? as u8,
            uiuc: buf.read_field(1, "uiuc")? as u8,
            duration: buf.read_field(2, "duration")? as u16,
            midamble_repetition_interval: buf.read_field(1, "midamble_repetition_interval")? as u8,
        })
    }
}

impl fmt::Display for UlMapIe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UlMapIe {{ cid: {} uiuc: {} start: {} duration: {} }}",
            self.cid, self.uiuc, self.start_time, self.duration
        )
    }
}
