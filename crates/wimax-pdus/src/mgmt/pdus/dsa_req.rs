use core::fmt;

use wimax_core::expect_pdu_type;
use wimax_core::{ByteBuffer, PduParseErr};

use crate::mgmt::enums::management_message_type::ManagementMessageType;
use crate::sflow::sf_params::ServiceFlowParams;
use crate::tlv::{Tlv, TlvContext};

/// Decodes the single service flow TLV that DSA-REQ and DSA-RSP carry
pub(crate) fn service_flow_from_bytes(buf: &mut ByteBuffer) -> Result<ServiceFlowParams, PduParseErr> {
    let Some(tlv) = Tlv::from_bytes(buf, TlvContext::TopLevel)? else {
        return Err(PduParseErr::Inconsistency { field: "service_flow", reason: "missing service flow TLV" });
    };
    ServiceFlowParams::from_tlv(&tlv)
}

/// DSA-REQ, sent by the SS on its primary management connection to ask for a new
/// service flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsaReq {
    pub transaction_id: u16,
    pub service_flow: ServiceFlowParams,
}

impl DsaReq {
    pub fn serialized_size(&self) -> usize {
        1 + 2 + self.service_flow.to_tlv().serialized_size()
    }

    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let pdu_type = buf.read_field(1, "pdu_type")?;
        expect_pdu_type!(pdu_type, ManagementMessageType::DsaReq)?;

        let transaction_id = buf.read_field(2, "transaction_id")? as u16;
        let service_flow = service_flow_from_bytes(buf)?;
        Ok(DsaReq { transaction_id, service_flow })
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        let start = buf.get_pos();
        buf.write_uint(ManagementMessageType::DsaReq.into_raw(), 1);
        buf.write_uint(self.transaction_id as u64, 2);
        self.service_flow.to_tlv().to_bytes(buf);
        assert_eq!(buf.get_pos() - start, self.serialized_size(), "DSA-REQ size mismatch");
    }
}

impl fmt::Display for DsaReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DsaReq {{ transaction_id: {} {} }}", self.transaction_id, self.service_flow)
    }
}
