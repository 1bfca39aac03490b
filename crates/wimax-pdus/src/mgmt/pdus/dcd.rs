use core::fmt;

use wimax_core::expect_pdu_type;
use wimax_core::{ByteBuffer, PduParseErr};

use crate::mgmt::enums::management_message_type::ManagementMessageType;
use crate::mgmt::fields::burst_profile::{self, BurstProfile};
use crate::mgmt::fields::dcd_channel_encodings::DcdChannelEncodings;

/// Downlink Channel Descriptor. Broadcast periodically by the BS, describes the downlink
/// channel and the DIUC to modulation mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dcd {
    pub config_change_count: u8,
    pub channel_encodings: DcdChannelEncodings,
    pub dl_burst_profiles: Vec<BurstProfile>,
}

impl Dcd {
    pub fn serialized_size(&self) -> usize {
        1 + 1 + DcdChannelEncodings::SERIALIZED_SIZE + 1 + self.dl_burst_profiles.len() * BurstProfile::SERIALIZED_SIZE
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let pdu_type = buf.read_field(1, "pdu_type")?;
        expect_pdu_type!(pdu_type, ManagementMessageType::Dcd)?;

        Ok(Dcd {
            config_change_count: buf.read_field(1, "config_change_count")? as u8,
            channel_encodings: DcdChannelEncodings::from_bytes(buf)?,
            dl_burst_profiles: burst_profile::profiles_from_bytes(buf)?,
        })
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        let start = buf.get_pos();
        buf.write_uint(ManagementMessageType::Dcd.into_raw(), 1);
        buf.write_uint(self.config_change_count as u64, 1);
        self.channel_encodings.to_bytes(buf);
        burst_profile::profiles_to_bytes(&self.dl_burst_profiles, buf);
        assert_eq!(buf.get_pos() - start, self.serialized_size(), "DCD size mismatch");
    }
}

impl fmt::Display for Dcd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dcd {{ change_count: {} bs_id: {} frame: {} profiles: {} }}",
            self.config_change_count,
            self.channel_encodings.base_station_id,
            self.channel_encodings.frame_number,
            self.dl_burst_profiles.len()
        )
    }
}
