use core::fmt;

use wimax_core::expect_pdu_type;
use wimax_core::{ByteBuffer, Cid, MacAddress, PduParseErr};

use crate::mgmt::enums::management_message_type::ManagementMessageType;
use crate::mgmt::enums::ranging_status::RangingStatus;

/// RNG-RSP, the BS answer to a RNG-REQ. Carries the basic and primary management
/// CIDs once the station is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngRsp {
    pub timing_adjust: u32,
    pub power_level_adjust: u8,
    pub offset_freq_adjust: u32,
    pub ranging_status: RangingStatus,
    pub dl_freq_override: u32,
    pub ul_channel_id_override: u8,
    pub dl_oper_burst_profile: u16,
    pub mac_address: MacAddress,
    pub basic_cid: Cid,
    pub primary_cid: Cid,
    pub aas_bdcast_permission: u8,
    pub frame_number: u32,
    pub init_rng_opp_number: u8,
    pub ranging_subchannel: u8,
}

impl RngRsp {
    pub const SERIALIZED_SIZE: usize = 35;

    /// Response with all adjustments zeroed
    pub fn new(mac_address: MacAddress, ranging_status: RangingStatus) -> Self {
        RngRsp {
            timing_adjust: 0,
            power_level_adjust: 0,
            offset_freq_adjust: 0,
            ranging_status,
            dl_freq_override: 0,
            ul_channel_id_override: 0,
            dl_oper_burst_profile: 0,
            mac_address,
            basic_cid: Cid::INITIAL_RANGING,
            primary_cid: Cid::INITIAL_RANGING,
            aas_bdcast_permission: 0,
            frame_number: 0,
            init_rng_opp_number: 0,
            ranging_subchannel: 0,
        }
    }

    pub fn serialized_size(&self) -> usize {
        Self::SERIALIZED_SIZE
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let pdu_type = buf.read_field(1, "pdu_type")?;
        expect_pdu_type!(pdu_type, ManagementMessageType::RngRsp)?;

        let timing_adjust = buf.read_field(4, "timing_adjust")? as u32;
        let power_level_adjust = buf.read_field(1, "power_level_adjust")? as u8;
        let offset_freq_adjust = buf.read_field(4, "offset_freq_adjust")? as u32;
        let val = buf.read_field(1, "ranging_status")?;
        let ranging_status =
            RangingStatus::try_from(val).map_err(|_| PduParseErr::InvalidValue { field: "ranging_status", value: val })?;

        Ok(RngRsp {
            timing_adjust,
            power_level_adjust,
            offset_freq_adjust,
            ranging_status,
            dl_freq_override: buf.read_field(4, "dl_freq_override")? as u32,
            ul_channel_id_override: buf.read_field(1, "ul_channel_id_override")? as u8,
            dl_oper_burst_profile: buf.read_field(2, "dl_oper_burst_profile")? as u16,
            mac_address: MacAddress(buf.read_array::<6>("mac_address")?),
            basic_cid: Cid::new(buf.read_field(2, "basic_cid")? as u16),
            primary_cid: Cid::new(buf.read_field(2, "primary_cid")? as u16),
            aas_bdcast_permission: buf.read_field(1, "aas_bdcast_permission")? as u8,
            frame_number: buf.read_field(4, "frame_number")? as u32,
            init_rng_opp_number: buf.read_field(1, "init_rng_opp_number")? as u8,
            ranging_subchannel: buf.read_field(1, "ranging_subchannel")? as u8,
        })
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        let start = buf.get_pos();
        buf.write_uint(ManagementMessageType::RngRsp.into_raw(), 1);
        buf.write_uint(self.timing_adjust as u64, 4);
        buf.write_uint(self.power_level_adjust as u64, 1);
        buf.write_uint(self.offset_freq_adjust as u64, 4);
        buf.write_uint(self.ranging_status.into_raw(), 1);
        buf.write_uint(self.dl_freq_override as u64, 4);
        buf.write_uint(self.ul_channel_id_override as u64, 1);
        buf.write_uint(self.dl_oper_burst_profile as u64, 2);
        buf.write_bytes(&self.mac_address.octets());
        buf.write_uint(self.basic_cid.into(), 2);
        buf.write_uint(self.primary_cid.into(), 2);
        buf.write_uint(self.aas_bdcast_permission as u64, 1);
        buf.write_uint(self.frame_number as u64, 4);
        buf.write_uint(self.init_rng_opp_number as u64, 1);
        buf.write_uint(self.ranging_subchannel as u64, 1);
        assert_eq!(buf.get_pos() - start, self.serialized_size());
    }
}

impl fmt::Display for RngRsp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RngRsp {{ mac: {} status: {} basic: {} primary: {} frame: {} }}",
            self.mac_address, self.ranging_status, self.basic_cid, self.primary_cid, self.frame_number
        )
    }
}

#[cfg(test)]
mod tests {
    use wimax_core::debug;

    use super::*;

    #[test]
    fn test_rng_rsp_roundtrip() {
        debug::setup_logging_verbose();
        let mut rsp = RngRsp::new(MacAddress::from_index(7), RangingStatus::Success);
        rsp.basic_cid = Cid::new(1);
        rsp.primary_cid = Cid::new(0x5501);
        rsp.frame_number = 42;

        let mut buf = ByteBuffer::new_autoexpand(40);
        rsp.to_bytes(&mut buf);
        assert_eq!(buf.get_len(), RngRsp::SERIALIZED_SIZE);
        // Status sits after type, timing (4), power (1) and frequency (4)
        assert_eq!(buf.as_slice()[10], 3);

        buf.seek(0);
        let parsed = RngRsp::from_bytes(&mut buf).expect("Failed parsing");
        assert_eq!(buf.get_len_remaining(), 0);
        assert_eq!(parsed, rsp);
    }

    #[test]
    fn test_rng_rsp_bad_status() {
        let mut bytes = vec![0u8; RngRsp::SERIALIZED_SIZE];
        bytes[0] = 5;
        bytes[10] = 7;
        let mut buf = ByteBuffer::from_vec(bytes);
        assert_eq!(RngRsp::from_bytes(&mut buf), Err(PduParseErr::InvalidValue { field: "ranging_status", value: 7 }));
    }
}
