use core::fmt;

use wimax_core::{ByteBuffer, PduParseErr};

use super::enums::management_message_type::ManagementMessageType;
use super::pdus::dcd::Dcd;
use super::pdus::dl_map::DlMap;
use super::pdus::dsa_ack::DsaAck;
use super::pdus::dsa_req::DsaReq;
use super::pdus::dsa_rsp::DsaRsp;
use super::pdus::rng_req::RngReq;
use super::pdus::rng_rsp::RngRsp;
use super::pdus::ucd::Ucd;
use super::pdus::ul_map::UlMap;

/// Any management message, as carried in the payload of a generic MAC PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MgmtMsg {
    Ucd(Ucd),
    Dcd(Dcd),
    DlMap(DlMap),
    UlMap(UlMap),
    RngReq(RngReq),
    RngRsp(RngRsp),
    DsaReq(DsaReq),
    DsaRsp(DsaRsp),
    DsaAck(DsaAck),
}

impl MgmtMsg {
    pub fn msg_type(&self) -> ManagementMessageType {
        match self {
            MgmtMsg::Ucd(_) => ManagementMessageType::Ucd,
            MgmtMsg::Dcd(_) => ManagementMessageType::Dcd,
            MgmtMsg::DlMap(_) => ManagementMessageType::DlMap,
            MgmtMsg::UlMap(_) => ManagementMessageType::UlMap,
            MgmtMsg::RngReq(_) => ManagementMessageType::RngReq,
            MgmtMsg::RngRsp(_) => ManagementMessageType::RngRsp,
            MgmtMsg::DsaReq(_) => ManagementMessageType::DsaReq,
            MgmtMsg::DsaRsp(_) => ManagementMessageType::DsaRsp,
            MgmtMsg::DsaAck(_) => ManagementMessageType::DsaAck,
        }
    }

    pub fn serialized_size(&self) -> usize {
        match self {
            MgmtMsg::Ucd(m) => m.serialized_size(),
            MgmtMsg::Dcd(m) => m.serialized_size(),
            MgmtMsg::DlMap(m) => m.serialized_size(),
            MgmtMsg::UlMap(m) => m.serialized_size(),
            MgmtMsg::RngReq(m) => m.serialized_size(),
            MgmtMsg::RngRsp(m) => m.serialized_size(),
            MgmtMsg::DsaReq(m) => m.serialized_size(),
            MgmtMsg::DsaRsp(m) => m.serialized_size(),
            MgmtMsg::DsaAck(m) => m.serialized_size(),
        }
    }

    pub fn to_bytes(&self, buf: &mut ByteBuffer) {
        match self {
            MgmtMsg::Ucd(m) => m.to_bytes(buf),
            MgmtMsg::Dcd(m) => m.to_bytes(buf),
            MgmtMsg::DlMap(m) => m.to_bytes(buf),
            MgmtMsg::UlMap(m) => m.to_bytes(buf),
            MgmtMsg::RngReq(m) => m.to_bytes(buf),
            MgmtMsg::RngRsp(m) => m.to_bytes(buf),
            MgmtMsg::DsaReq(m) => m.to_bytes(buf),
            MgmtMsg::DsaRsp(m) => m.to_bytes(buf),
            MgmtMsg::DsaAck(m) => m.to_bytes(buf),
        }
    }

    /// Encodes into a fresh vector, ready to be used as a MAC PDU payload
    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = ByteBuffer::new(self.serialized_size());
        self.to_bytes(&mut buf);
        buf.into_bytes()
    }

    /// Dispatches on the message type byte. The whole buffer must be consumed.
    pub fn from_bytes(buf: &mut ByteBuffer) -> Result<Self, PduParseErr> {
        let Some(raw_type) = buf.peek_field(1) else {
            return Err(PduParseErr::BufferEnded { field: Some("pdu_type") });
        };
        let Ok(msg_type) = ManagementMessageType::try_from(raw_type) else {
            return Err(PduParseErr::InvalidValue { field: "pdu_type", value: raw_type });
        };
        let msg = match msg_type {
            ManagementMessageType::Ucd => MgmtMsg::Ucd(Ucd::from_bytes(buf)?),
            ManagementMessageType::Dcd => MgmtMsg::Dcd(Dcd::from_bytes(buf)?),
            ManagementMessageType::DlMap => MgmtMsg::DlMap(DlMap::from_bytes(buf)?),
            ManagementMessageType::UlMap => MgmtMsg::UlMap(UlMap::from_bytes(buf)?),
            ManagementMessageType::RngReq => MgmtMsg::RngReq(RngReq::from_bytes(buf)?),
            ManagementMessageType::RngRsp => MgmtMsg::RngRsp(RngRsp::from_bytes(buf)?),
            ManagementMessageType::DsaReq => MgmtMsg::DsaReq(DsaReq::from_bytes(buf)?),
            ManagementMessageType::DsaRsp => MgmtMsg::DsaRsp(DsaRsp::from_bytes(buf)?),
            ManagementMessageType::DsaAck => MgmtMsg::DsaAck(DsaAck::from_bytes(buf)?),
        };
        if buf.get_len_remaining() != 0 {
            return Err(PduParseErr::InconsistentLength {
                expected: buf.get_pos(),
                found: buf.get_len(),
            });
        }
        Ok(msg)
    }
}

impl fmt::Display for MgmtMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MgmtMsg::Ucd(m) => write!(f, "{}", m),
            MgmtMsg::Dcd(m) => write!(f, "{}", m),
            MgmtMsg::DlMap(m) => write!(f, "{}", m),
            MgmtMsg::UlMap(m) => write!(f, "{}", m),
            MgmtMsg::RngReq(m) => write!(f, "{}", m),
            MgmtMsg::RngRsp(m) => write!(f, "{}", m),
            MgmtMsg::DsaReq(m) => write!(f, "{}", m),
            MgmtMsg::DsaRsp(m) => write!(f, "{}", m),
            MgmtMsg::DsaAck(m) => write!(f, "{}", m),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use wimax_core::{Cid, MacAddress, SchedulingType, SfDirection, debug};

    use super::*;
    use crate::burst::BurstProfileManager;
    use crate::burst::iuc::uiuc;
    use crate::mgmt::{DcdChannelEncodings, DlMapIe, RangingStatus, UcdChannelEncodings, UlMapIe};
    use crate::sflow::{ConfirmationCode, CsParameters, IpcsClassifierRecord, ServiceFlowParams};

    #[test]
    fn test_dispatch_by_type() {
        let ack = MgmtMsg::DsaAck(DsaAck { transaction_id: 5, confirmation_code: ConfirmationCode::RejectTemporary });
        let bytes = ack.to_vec();
        assert_eq!(bytes, vec![13, 0, 5, 3]);
        let mut buf = ByteBuffer::from_vec(bytes);
        assert_eq!(MgmtMsg::from_bytes(&mut buf), Ok(ack));

        let req = MgmtMsg::RngReq(RngReq { req_dl_burst_profile: 1, mac_address: MacAddress::from_index(2), ranging_anomalies: 0 });
        let mut buf = ByteBuffer::from_vec(req.to_vec());
        assert_eq!(MgmtMsg::from_bytes(&mut buf).map(|m| m.msg_type()), Ok(ManagementMessageType::RngReq));
    }

    #[test]
    fn test_every_message_fits_its_serialized_size() {
        debug::setup_logging_verbose();
        let bs_id = MacAddress::from_index(1);
        let profiles = BurstProfileManager::default();
        let mut ir = UlMapIe::new(Cid::INITIAL_RANGING, uiuc::INITIAL_RANGING);
        ir.duration = 8;
        let mut sf = ServiceFlowParams::new(SfDirection::Up, SchedulingType::Rtps);
        sf.max_sustained_rate = 128_000;
        sf.cs_parameters = Some(CsParameters::new(IpcsClassifierRecord {
            src_addrs: vec![(Ipv4Addr::new(10, 1, 0, 2), Ipv4Addr::new(255, 255, 255, 255))],
            dst_ports: vec![(5002, 5002)],
            protocols: vec![17],
            ..Default::default()
        }));
        let mut rng_rsp = RngRsp::new(MacAddress::from_index(2), RangingStatus::Success);
        rng_rsp.basic_cid = Cid::new(1);
        rng_rsp.primary_cid = Cid::new(0x5501);

        let msgs = vec![
            MgmtMsg::Ucd(Ucd {
                config_change_count: 1,
                ranging_backoff_start: 0,
                ranging_backoff_end: 3,
                request_backoff_start: 0,
                request_backoff_end: 3,
                channel_encodings: UcdChannelEncodings {
                    bw_req_opp_size: 2,
                    rang_req_opp_size: 8,
                    frequency: 3_500_000,
                    sbchnl_req_region_full_params: 0,
                    sbchnl_focused_cont_codes: 0,
                },
                ul_burst_profiles: profiles.ul_profiles().to_vec(),
            }),
            MgmtMsg::Dcd(Dcd {
                config_change_count: 1,
                channel_encodings: DcdChannelEncodings {
                    bs_eirp: 0,
                    eirx_p_ir_max: 0,
                    frequency: 3_500_000,
                    channel_nr: 0,
                    ttg: 10,
                    rtg: 10,
                    base_station_id: bs_id,
                    frame_duration_code: 4,
                    frame_number: 100,
                },
                dl_burst_profiles: profiles.dl_profiles().to_vec(),
            }),
            MgmtMsg::DlMap(DlMap {
                dcd_count: 1,
                base_station_id: bs_id,
                ies: vec![
                    DlMapIe { cid: Cid::BROADCAST, diuc: 1, preamble_present: false, start_time: 0 },
                    DlMapIe::end_of_map(3),
                ],
            }),
            MgmtMsg::UlMap(UlMap { ucd_count: 1, allocation_start_time: 180, ies: vec![ir, UlMapIe::end_of_map(8)] }),
            MgmtMsg::RngReq(RngReq { req_dl_burst_profile: 4, mac_address: MacAddress::from_index(2), ranging_anomalies: 1 }),
            MgmtMsg::RngRsp(rng_rsp),
            MgmtMsg::DsaReq(DsaReq { transaction_id: 7, service_flow: sf.clone() }),
            MgmtMsg::DsaRsp(DsaRsp { transaction_id: 7, confirmation_code: ConfirmationCode::Success, service_flow: sf }),
            MgmtMsg::DsaAck(DsaAck { transaction_id: 7, confirmation_code: ConfirmationCode::Success }),
        ];

        for msg in msgs {
            let bytes = msg.to_vec();
            assert_eq!(bytes.len(), msg.serialized_size(), "{}", msg.msg_type());
            let mut buf = ByteBuffer::from_vec(bytes);
            assert_eq!(MgmtMsg::from_bytes(&mut buf), Ok(msg));
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut buf = ByteBuffer::from_vec(vec![13, 0, 5, 0, 0xAA]);
        assert_eq!(MgmtMsg::from_bytes(&mut buf), Err(PduParseErr::InconsistentLength { expected: 4, found: 5 }));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut buf = ByteBuffer::from_vec(vec![42, 0, 0]);
        assert_eq!(MgmtMsg::from_bytes(&mut buf), Err(PduParseErr::InvalidValue { field: "pdu_type", value: 42 }));
    }
}
