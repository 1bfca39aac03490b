use wimax_core::{ByteBuffer, PduParseErr};

/// UCD channel encodings, fixed 10-byte block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UcdChannelEncodings {
    /// Bandwidth request opportunity size, in symbols
    pub bw_req_opp_size: u16,
    /// Ranging request opportunity size, in symbols
    pub rang_req_opp_size: u16,
    /// kHz
    pub frequency: u32,
    pub sbchnl_req_region_full_params: u8,
    pub sbchnl_focused_cont_codes: u8,
}

impl UcdChannelEncodings {
    pub const SERIALIZED_SIZE: usize = 10;

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        buf.write_uint(self.bw_req_opp_size as u64, 2);
        buf.write_uint(self.rang_req_opp_size as u64, 2);
        buf.write_uint(self.frequency as u64, 4);
        buf.write_uint(self.sbchnl_req_region_full_params as u64, 1);
        buf.write_uint(self.sbchnl_focused_cont_codes as u64, 1);
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        Ok(UcdChannelEncodings {
            bw_req_opp_size: buf.read_field(2, "bw_req_opp_size")? as u16,
            rang_req_opp_size: buf.read_field(2, "rang_req_opp_size")? as u16,
            frequency: buf.read_field(4, "frequency")? as u32,
            sbchnl_req_region_full_params: buf.read_field(1, "sbchnl_req_region_full_params")? as u8,
            sbchnl_focused_cont_codes: buf.read_field(1, "sbchnl_focused_cont_codes")? as u8,
        })
    }
}
