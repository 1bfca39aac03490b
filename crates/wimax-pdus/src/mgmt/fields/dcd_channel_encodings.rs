use wimax_core::{ByteBuffer, MacAddress, PduParseErr};

/// DCD channel encodings, fixed 22-byte block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DcdChannelEncodings {
    pub bs_eirp: u16,
    pub eirx_p_ir_max: u16,
    /// kHz
    pub frequency: u32,
    pub channel_nr: u8,
    /// Transmit/receive transition gap, in physical slots
    pub ttg: u8,
    /// Receive/transmit transition gap, in physical slots
    pub rtg: u8,
    pub base_station_id: MacAddress,
    pub frame_duration_code: u8,
    pub frame_number: u32,
}

impl DcdChannelEncodings {
    pub const SERIALIZED_SIZE: usize = 22;

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        buf.write_uint(self.bs_eirp as u64, 2);
        buf.write_uint(self.eirx_p_ir_max as u64, 2);
        buf.write_uint(self.frequency as u64, 4);
        buf.write_uint(self.channel_nr as u64, 1);
        buf.write_uint(self.ttg as u64, 1);
        buf.write_uint(self.rtg as u64, 1);
        buf.write_bytes(&self.base_station_id.octets());
        buf.write_uint(self.frame_duration_code as u64, 1);
        buf.write_uint(self.frame_number as u64, 4);
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        Ok(DcdChannelEncodings {
            bs_eirp: buf.read_field(2, "bs_eirp")? as u16,
            eirx_p_ir_max: buf.read_field(2, "eirx_p_ir_max")? as u16,
            frequency: buf.read_field(4, "frequency")? as u32,
            channel_nr: buf.read_field(1, "channel_nr")? as u8,
            ttg: buf.read_field(1, "ttg")? as u8,
            rtg: buf.read_field(1, "rtg")? as u8,
            base_station_id: MacAddress(buf.read_array::<6>("base_station_id")?),
            frame_duration_code: buf.read_field(1, "frame_duration_code")? as u8,
            frame_number: buf.read_field(4, "frame_number")? as u32,
        })
    }
}
