use core::fmt;

use wimax_core::expect_pdu_type;
use wimax_core::{ByteBuffer, PduParseErr};

use crate::mgmt::enums::management_message_type::ManagementMessageType;
use crate::mgmt::fields::burst_profile::{self, BurstProfile};
use crate::mgmt::fields::ucd_channel_encodings::UcdChannelEncodings;

/// Uplink Channel Descriptor. Broadcast periodically by the BS, describes the uplink
/// channel and the UIUC to modulation mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ucd {
    pub config_change_count: u8,
    pub ranging_backoff_start: u8,
    pub ranging_backoff_end: u8,
    pub request_backoff_start: u8,
    pub request_backoff_end: u8,
    pub channel_encodings: UcdChannelEncodings,
    pub ul_burst_profiles: Vec<BurstProfile>,
}

impl Ucd {
    pub fn serialized_size(&self) -> usize {
        1 + 5 + UcdChannelEncodings::SERIALIZED_SIZE + 1 + self.ul_burst_profiles.len() * BurstProfile::SERIALIZED_SIZE
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let pdu_type = buf.read_field(1, "pdu_type")?;
        expect_pdu_type!(pdu_type, ManagementMessageType::Ucd)?;

        Ok(Ucd {
            config_change_count: buf.read_field(1, "config_change_count")? as u8,
            ranging_backoff_start: buf.read_field(1, "ranging_backoff_start")? as u8,
            ranging_backoff_end: buf.read_field(1, "ranging_backoff_end")? as u8,
            request_backoff_start: buf.read_field(1, "request_backoff_start")? as u8,
            request_backoff_end: buf.read_field(1, "request_backoff_end")? as u8,
            channel_encodings: UcdChannelEncodings::from_bytes(buf)?,
            ul_burst_profiles: burst_profile::profiles_from_bytes(buf)?,
        })
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        let start = buf.get_pos();
        buf.write_uint(ManagementMessageType::Ucd.into_raw(), 1);
        buf.write_uint(self.config_change_count as u64, 1);
        buf.write_uint(self.ranging_backoff_start as u64, 1);
        buf.write_uint(self.ranging_backoff_end as u64, 1);
        buf.write_uint(self.request_backoff_start as u64, 1);
        buf.write_uint(self.request_backoff_end as u64, 1);
        self.channel_encodings.to_bytes(buf);
        burst_profile::profiles_to_bytes(&self.ul_burst_profiles, buf);
        assert_eq!(buf.get_pos() - start, self.serialized_size(), "UCD size mismatch");
    }
}

impl fmt::Display for Ucd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ucd {{ change_count: {} bw_req_opp: {} rng_req_opp: {} profiles: {} }}",
            self.config_change_count,
            self.channel_encodings.bw_req_opp_size,
            self.channel_encodings.rang_req_opp_size,
            self.ul_burst_profiles.len()
        )
    }
}
