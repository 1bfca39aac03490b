use core::fmt;

use wimax_core::expect_pdu_type;
use wimax_core::{ByteBuffer, PduParseErr};

use crate::mgmt::enums::management_message_type::ManagementMessageType;
use crate::mgmt::fields::ul_map_ie::UlMapIe;

/// UL-MAP: uplink allocations of the next uplink subframe. The IE list always ends
/// with an END_OF_MAP element, which is kept in `ies`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UlMap {
    pub ucd_count: u8,
    /// Start of the uplink subframe, in symbols from the start of the frame
    pub allocation_start_time: u32,
    pub ies: Vec<UlMapIe>,
}

impl UlMap {
    pub fn serialized_size(&self) -> usize {
        1 + 1 + 4 + self.ies.len() * UlMapIe::SERIALIZED_SIZE
    }

    /// IEs without the terminating END_OF_MAP
    pub fn allocations(&self) -> impl Iterator<Item = &UlMapIe> {
        self.ies.iter().filter(|ie| !ie.is_end_of_map())
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let pdu_type = buf.read_field(1, "pdu_type")?;
        expect_pdu_type!(pdu_type, ManagementMessageType::UlMap)?;

        let ucd_count = buf.read_field(1, "ucd_count")? as u8;
        let allocation_start_time = buf.read_field(4, "allocation_start_time")? as u32;
        let mut ies = Vec::new();
        loop {
            let ie = UlMapIe::from_bytes(buf)?;
            let end = ie.is_end_of_map();
            ies.push(ie);
            if end {
                break;
            }
        }
        Ok(UlMap { ucd_count, allocation_start_time, ies })
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        assert!(self.ies.last().is_some_and(|ie| ie.is_end_of_map()), "UL-MAP must end with END_OF_MAP");
        let start = buf.get_pos();
        buf.write_uint(ManagementMessageType::UlMap.into_raw(), 1);
        buf.write_uint(self.ucd_count as u64, 1);
        buf.write_uint(self.allocation_start_time as u64, 4);
        for ie in &self.ies {
            ie.to_bytes(buf);
        }
        assert_eq!(buf.get_pos() - start, self.serialized_size(), "UL-MAP size mismatch");
    }
}

impl fmt::Display for UlMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UlMap {{ ucd_count: {} start: {} ies: [", self.ucd_count, self.allocation_start_time)?;
        for ie in &self.ies {
            write!(f, " {}", ie)?;
        }
        write!(f, " ] }}")
    }
}
