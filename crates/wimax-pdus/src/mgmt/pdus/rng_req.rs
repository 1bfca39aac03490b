use core::fmt;

use wimax_core::expect_pdu_type;
use wimax_core::{ByteBuffer, MacAddress, PduParseErr};

use crate::mgmt::enums::management_message_type::ManagementMessageType;

/// RNG-REQ, sent by the SS on the initial ranging CID (initial ranging) or on its
/// basic CID (invited ranging)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngReq {
    /// DIUC the station would like to receive on
    pub req_dl_burst_profile: u8,
    pub mac_address: MacAddress,
    /// Non-zero when the station still measures timing/power anomalies
    pub ranging_anomalies: u8,
}

impl RngReq {
    pub const SERIALIZED_SIZE: usize = 9;

    pub fn serialized_size(&self) -> usize {
        Self::SERIALIZED_SIZE
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let pdu_type = buf.read_field(1, "pdu_type")?;
        expect_pdu_type!(pdu_type, ManagementMessageType::RngReq)?;

        Ok(RngReq {
            req_dl_burst_profile: buf.read_field(1, "req_dl_burst_profile")? as u8,
            mac_address: MacAddress(buf.read_array::<6>("mac_address")?),
            ranging_anomalies: buf.read_field(1, "ranging_anomalies")? as u8,
        })
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        let start = buf.get_pos();
        buf.write_uint(ManagementMessageType::RngReq.into_raw(), 1);
        buf.write_uint(self.req_dl_burst_profile as u64, 1);
        buf.write_bytes(&self.mac_address.octets());
        buf.write_uint(self.ranging_anomalies as u64, 1);
        assert_eq!(buf.get_pos() - start, self.serialized_size());
    }
}

impl fmt::Display for RngReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RngReq {{ mac: {} dl_profile: {} anomalies: {} }}",
            self.mac_address, self.req_dl_burst_profile, self.ranging_anomalies
        )
    }
}
