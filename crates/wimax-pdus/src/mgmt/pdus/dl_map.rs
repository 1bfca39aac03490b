use core::fmt;

use wimax_core::expect_pdu_type;
use wimax_core::{ByteBuffer, MacAddress, PduParseErr};

use crate::mgmt::enums::management_message_type::ManagementMessageType;
use crate::mgmt::fields::dl_map_ie::DlMapIe;

/// DL-MAP, first message of every downlink subframe. The IE list always ends with
/// an END_OF_MAP element, which is kept in `ies`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlMap {
    pub dcd_count: u8,
    pub base_station_id: MacAddress,
    pub ies: Vec<DlMapIe>,
}

impl DlMap {
    pub fn serialized_size(&self) -> usize {
        1 + 1 + 6 + self.ies.len() * DlMapIe::SERIALIZED_SIZE
    }

    /// IEs without the terminating END_OF_MAP
    pub fn bursts(&self) -> impl Iterator<Item = &DlMapIe> {
        self.ies.iter().filter(|ie| !ie.is_end_of_map())
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let pdu_type = buf.read_field(1, "pdu_type")?;
        expect_pdu_type!(pdu_type, ManagementMessageType::DlMap)?;

        let dcd_count = buf.read_field(1, "dcd_count")? as u8;
        let base_station_id = MacAddress(buf.read_array::<6>("base_station_id")?);
        let mut ies = Vec::new();
        loop {
            let ie = DlMapIe::from_bytes(buf)?;
            let end = ie.is_end_of_map();
            ies.push(ie);
            if end {
                break;
            }
        }
        Ok(DlMap { dcd_count, base_station_id, ies })
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        assert!(self.ies.last().is_some_and(|ie| ie.is_end_of_map()), "DL-MAP must end with END_OF_MAP");
        let start = buf.get_pos();
        buf.write_uint(ManagementMessageType::DlMap.into_raw(), 1);
        buf.write_uint(self.dcd_count as u64, 1);
        buf.write_bytes(&self.base_station_id.octets());
        for ie in &self.ies {
            ie.to_bytes(buf);
        }
        assert_eq!(buf.get_pos() - start, self.serialized_size(), "DL-MAP size mismatch");
    }
}

impl fmt::Display for DlMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DlMap {{ dcd_count: {} bs_id: {} ies: [", self.dcd_count, self.base_station_id)?;
        for ie in &self.ies {
            write!(f, " {}", ie)?;
        }
        write!(f, " ] }}")
    }
}

#[cfg(test)]
mod tests {
    use wimax_core::{Cid, debug};

    use super::*;

    #[test]
    fn test_dl_map_roundtrip() {
        debug::setup_logging_verbose();
        let map = DlMap {
            dcd_count: 0,
            base_station_id: MacAddress([0, 0, 0, 0, 0, 0xff]),
            ies: vec![
                DlMapIe { cid: Cid::BROADCAST, diuc: 1, preamble_present: true, start_time: 0 },
                DlMapIe { cid: Cid::new(3), diuc: 4, preamble_present: false, start_time: 12 },
                DlMapIe::end_of_map(20),
            ],
        };
        let mut buf = ByteBuffer::new_autoexpand(32);
        map.to_bytes(&mut buf);
        assert_eq!(buf.get_len(), map.serialized_size());
        assert_eq!(&buf.as_slice()[..2], &[2, 0]);

        buf.seek(0);
        let parsed = DlMap::from_bytes(&mut buf).expect("Failed parsing");
        assert_eq!(buf.get_len_remaining(), 0);
        assert_eq!(parsed, map);
        assert_eq!(parsed.bursts().count(), 2);
    }

    #[test]
    fn test_dl_map_without_end_is_truncated() {
        let mut buf = ByteBuffer::from_vec(vec![2, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 0xff, 1, 0, 0, 0]);
        assert!(matches!(DlMap::from_bytes(&mut buf), Err(PduParseErr::BufferEnded { .. })));
    }
}
