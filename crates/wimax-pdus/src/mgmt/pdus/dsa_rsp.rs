use core::fmt;

use wimax_core::expect_pdu_type;
use wimax_core::{ByteBuffer, PduParseErr};

use crate::mgmt::enums::management_message_type::ManagementMessageType;
use crate::sflow::enums::confirmation_code::ConfirmationCode;
use crate::sflow::sf_params::ServiceFlowParams;

use super::dsa_req::service_flow_from_bytes;

/// DSA-RSP, BS answer to a DSA-REQ. On success the service flow carries the
/// assigned SFID and CID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsaRsp {
    pub transaction_id: u16,
    pub confirmation_code: ConfirmationCode,
    pub service_flow: ServiceFlowParams,
}

impl DsaRsp {
    pub fn serialized_size(&self) -> usize {
        1 + 2 + 1 + self.service_flow.to_tlv().serialized_size()
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let pdu_type = buf.read_field(1, "pdu_type")?;
        expect_pdu_type!(pdu_type, ManagementMessageType::DsaRsp)?;

        let transaction_id = buf.read_field(2, "transaction_id")? as u16;
        let val = buf.read_field(1, "confirmation_code")?;
        let confirmation_code = ConfirmationCode::try_from(val)
            .map_err(|_| PduParseErr::InvalidValue { field: "confirmation_code", value: val })?;
        let service_flow = service_flow_from_bytes(buf)?;
        Ok(DsaRsp { transaction_id, confirmation_code, service_flow })
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        let start = buf.get_pos();
        buf.write_uint(ManagementMessageType::DsaRsp.into_raw(), 1);
        buf.write_uint(self.transaction_id as u64, 2);
        buf.write_uint(self.confirmation_code.into_raw(), 1);
        self.service_flow.to_tlv().to_bytes(buf);
        assert_eq!(buf.get_pos() - start, self.serialized_size(), "DSA-RSP size mismatch");
    }
}

impl fmt::Display for DsaRsp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DsaRsp {{ transaction_id: {} code: {} {} }}",
            self.transaction_id, self.confirmation_code, self.service_flow
        )
    }
}

#[cfg(test)]
mod tests {
    use wimax_core::{SchedulingType, SfDirection, debug};

    use super::*;

    #[test]
    fn test_dsa_rsp_roundtrip() {
        debug::setup_logging_verbose();
        let mut sf = ServiceFlowParams::new(SfDirection::Down, SchedulingType::Be);
        sf.sfid = 7;
        sf.cid = 0xAA01;
        let rsp = DsaRsp { transaction_id: 9, confirmation_code: ConfirmationCode::Success, service_flow: sf };

        let mut buf = ByteBuffer::new_autoexpand(128);
        rsp.to_bytes(&mut buf);
        assert_eq!(buf.get_len(), rsp.serialized_size());
        assert_eq!(&buf.as_slice()[..5], &[12, 0, 9, 0, 146]);

        buf.seek(0);
        let parsed = DsaRsp::from_bytes(&mut buf).expect("Failed parsing");
        assert_eq!(buf.get_len_remaining(), 0);
        assert_eq!(parsed, rsp);
    }
}
