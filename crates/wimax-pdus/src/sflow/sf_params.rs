use core::fmt;

use wimax_core::{PduParseErr, SchedulingType, SfDirection};

use crate::tlv::tlv_type::{sf, top};
use crate::tlv::{Tlv, TlvValue};

use super::cs_parameters::CsParameters;
use super::enums::cs_specification::CsSpecification;

/// QoS parameter set of one service flow, as carried in DSA messages.
/// Rates are in bits per second, latency and jitter in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFlowParams {
    pub direction: SfDirection,
    /// 0 until the BS assigns one
    pub sfid: u32,
    /// 0 until the BS assigns one
    pub cid: u16,
    pub qos_param_set_type: u8,
    pub traffic_priority: u8,
    pub max_sustained_rate: u32,
    pub max_traffic_burst: u32,
    pub min_reserved_rate: u32,
    pub min_tolerable_rate: u32,
    pub scheduling_type: SchedulingType,
    pub request_tx_policy: u32,
    pub tolerated_jitter: u32,
    pub max_latency: u32,
    /// 0 variable length, 1 fixed length SDUs
    pub fixed_vs_variable_sdu: u8,
    pub sdu_size: u8,
    pub target_said: u16,
    pub arq_enable: u8,
    pub arq_window_size: u16,
    /// ms, 0 when unset
    pub unsolicited_grant_interval: u16,
    /// ms, 0 when unset
    pub unsolicited_polling_interval: u16,
    pub cs_specification: CsSpecification,
    pub cs_parameters: Option<CsParameters>,
}

impl ServiceFlowParams {
    pub fn new(direction: SfDirection, scheduling_type: SchedulingType) -> Self {
        ServiceFlowParams {
            direction,
            sfid: 0,
            cid: 0,
            qos_param_set_type: 0,
            traffic_priority: 0,
            max_sustained_rate: 0,
            max_traffic_burst: 0,
            min_reserved_rate: 0,
            min_tolerable_rate: 0,
            scheduling_type,
            request_tx_policy: 0,
            tolerated_jitter: 0,
            max_latency: 0,
            fixed_vs_variable_sdu: 0,
            sdu_size: 0,
            target_said: 0,
            arq_enable: 0,
            arq_window_size: 0,
            unsolicited_grant_interval: 0,
            unsolicited_polling_interval: 0,
            cs_specification: CsSpecification::Ipv4,
            cs_parameters: None,
        }
    }

    fn tlv_type(&self) -> u8 {
        match self.direction {
            SfDirection::Up => top::UPLINK_SERVICE_FLOW,
            SfDirection::Down => top::DOWNLINK_SERVICE_FLOW,
        }
    }

    /// Encodes as an uplink or downlink service flow TLV
    pub fn to_tlv(&self) -> Tlv {
        let mut v = vec![
            Tlv::u32(sf::SFID, self.sfid),
            Tlv::u16(sf::CID, self.cid),
            Tlv::u8(sf::QOS_PARAM_SET_TYPE, self.qos_param_set_type),
            Tlv::u8(sf::TRAFFIC_PRIORITY, self.traffic_priority),
            Tlv::u32(sf::MAX_SUSTAINED_TRAFFIC_RATE, self.max_sustained_rate),
            Tlv::u32(sf::MAX_TRAFFIC_BURST, self.max_traffic_burst),
            Tlv::u32(sf::MIN_RESERVED_TRAFFIC_RATE, self.min_reserved_rate),
            Tlv::u32(sf::MIN_TOLERABLE_TRAFFIC_RATE, self.min_tolerable_rate),
            Tlv::u8(sf::SCHEDULING_TYPE, self.scheduling_type.into_raw() as u8),
            Tlv::u32(sf::REQUEST_TX_POLICY, self.request_tx_policy),
            Tlv::u32(sf::TOLERATED_JITTER, self.tolerated_jitter),
            Tlv::u32(sf::MAXIMUM_LATENCY, self.max_latency),
            Tlv::u8(sf::FIXED_VS_VARIABLE_SDU, self.fixed_vs_variable_sdu),
            Tlv::u8(sf::SDU_SIZE, self.sdu_size),
            Tlv::u16(sf::TARGET_SAID, self.target_said),
            Tlv::u8(sf::ARQ_ENABLE, self.arq_enable),
            Tlv::u16(sf::ARQ_WINDOW_SIZE, self.arq_window_size),
            Tlv::u16(sf::UNSOLICITED_GRANT_INTERVAL, self.unsolicited_grant_interval),
            Tlv::u16(sf::UNSOLICITED_POLLING_INTERVAL, self.unsolicited_polling_interval),
            Tlv::u8(sf::CS_SPECIFICATION, self.cs_specification.into_raw() as u8),
        ];
        if let Some(cs) = &self.cs_parameters {
            v.push(Tlv::new(sf::IPV4_CS_PARAMETERS, cs.to_tlv_value()));
        }
        Tlv::new(self.tlv_type(), TlvValue::SfVector(v))
    }

    /// Decodes a service flow TLV. Children may come in any order; absent ones keep defaults.
    pub fn from_tlv(tlv: &Tlv) -> Result<Self, PduParseErr> {
        let direction = match tlv.tlv_type {
            top::UPLINK_SERVICE_FLOW => SfDirection::Up,
            top::DOWNLINK_SERVICE_FLOW => SfDirection::Down,
            t => return Err(PduParseErr::UnknownTlvType { context: "top-level", found: t }),
        };
        let TlvValue::SfVector(children) = &tlv.value else {
            return Err(PduParseErr::Inconsistency { field: "service_flow", reason: "not a service flow vector" });
        };

        let mut p = ServiceFlowParams::new(direction, SchedulingType::Undef);
        for child in children {
            match (child.tlv_type, &child.value) {
                (sf::SFID, TlvValue::U32(v)) => p.sfid = *v,
                (sf::CID, TlvValue::U16(v)) => p.cid = *v,
                (sf::QOS_PARAM_SET_TYPE, TlvValue::U8(v)) => p.qos_param_set_type = *v,
                (sf::TRAFFIC_PRIORITY, TlvValue::U8(v)) => p.traffic_priority = *v,
                (sf::MAX_SUSTAINED_TRAFFIC_RATE, TlvValue::U32(v)) => p.max_sustained_rate = *v,
                (sf::MAX_TRAFFIC_BURST, TlvValue::U32(v)) => p.max_traffic_burst = *v,
                (sf::MIN_RESERVED_TRAFFIC_RATE, TlvValue::U32(v)) => p.min_reserved_rate = *v,
                (sf::MIN_TOLERABLE_TRAFFIC_RATE, TlvValue::U32(v)) => p.min_tolerable_rate = *v,
                (sf::SCHEDULING_TYPE, TlvValue::U8(v)) => {
                    p.scheduling_type = SchedulingType::try_from(*v as u64)
                        .map_err(|_| PduParseErr::InvalidValue { field: "scheduling_type", value: *v as u64 })?;
                }
                (sf::REQUEST_TX_POLICY, TlvValue::U32(v)) => p.request_tx_policy = *v,
                (sf::TOLERATED_JITTER, TlvValue::U32(v)) => p.tolerated_jitter = *v,
                (sf::MAXIMUM_LATENCY, TlvValue::U32(v)) => p.max_latency = *v,
                (sf::FIXED_VS_VARIABLE_SDU, TlvValue::U8(v)) => p.fixed_vs_variable_sdu = *v,
                (sf::SDU_SIZE, TlvValue::U8(v)) => p.sdu_size = *v,
                (sf::TARGET_SAID, TlvValue::U16(v)) => p.target_said = *v,
                (sf::ARQ_ENABLE, TlvValue::U8(v)) => p.arq_enable = *v,
                (sf::ARQ_WINDOW_SIZE, TlvValue::U16(v)) => p.arq_window_size = *v,
                (sf::UNSOLICITED_GRANT_INTERVAL, TlvValue::U16(v)) => p.unsolicited_grant_interval = *v,
                (sf::UNSOLICITED_POLLING_INTERVAL, TlvValue::U16(v)) => p.unsolicited_polling_interval = *v,
                (sf::CS_SPECIFICATION, TlvValue::U8(v)) => {
                    p.cs_specification = CsSpecification::try_from(*v as u64)
                        .map_err(|_| PduParseErr::InvalidValue { field: "cs_specification", value: *v as u64 })?;
                }
                (sf::IPV4_CS_PARAMETERS, value) => p.cs_parameters = Some(CsParameters::from_tlv_value(value)?),
                (t, _) => return Err(PduParseErr::UnknownTlvType { context: "service flow", found: t }),
            }
        }
        Ok(p)
    }
}

impl fmt::Display for ServiceFlowParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ServiceFlowParams {{ dir: {} sfid: {} cid: {} type: {} min: {} max: {} latency: {} jitter: {} }}",
            self.direction,
            self.sfid,
            self.cid,
            self.scheduling_type,
            self.min_reserved_rate,
            self.max_sustained_rate,
            self.max_latency,
            self.tolerated_jitter
        )
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use wimax_core::ByteBuffer;

    use super::*;
    use crate::sflow::classifier_record::IpcsClassifierRecord;
    use crate::tlv::TlvContext;

    fn sample() -> ServiceFlowParams {
        let mut p = ServiceFlowParams::new(SfDirection::Up, SchedulingType::Rtps);
        p.sfid = 100;
        p.cid = 0x1234;
        p.min_reserved_rate = 64_000;
        p.max_sustained_rate = 128_000;
        p.max_latency = 40;
        p.tolerated_jitter = 10;
        p.unsolicited_polling_interval = 20;
        p.cs_parameters = Some(CsParameters::new(IpcsClassifierRecord {
            priority: 1,
            index: 3,
            protocols: vec![17],
            src_addrs: vec![(Ipv4Addr::new(10, 1, 0, 2), Ipv4Addr::new(255, 255, 255, 255))],
            dst_ports: vec![(5000, 5000)],
            ..Default::default()
        }));
        p
    }

    #[test]
    fn test_roundtrip_through_bytes() {
        let p = sample();
        let tlv = p.to_tlv();
        let mut buf = ByteBuffer::new_autoexpand(64);
        tlv.to_bytes(&mut buf);
        assert_eq!(buf.get_len(), tlv.serialized_size());
        buf.seek(0);
        let decoded = Tlv::from_bytes(&mut buf, TlvContext::TopLevel).unwrap().unwrap();
        assert_eq!(ServiceFlowParams::from_tlv(&decoded).unwrap(), p);
    }

    #[test]
    fn test_emission_order() {
        let tlv = sample().to_tlv();
        let order: Vec<u8> = tlv.children().unwrap().iter().map(|t| t.tlv_type).collect();
        assert_eq!(order, vec![1, 2, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 28, 100]);
    }

    #[test]
    fn test_any_order_accepted() {
        let tlv = Tlv::new(
            top::DOWNLINK_SERVICE_FLOW,
            TlvValue::SfVector(vec![Tlv::u8(sf::SCHEDULING_TYPE, 2), Tlv::u32(sf::SFID, 5)]),
        );
        let p = ServiceFlowParams::from_tlv(&tlv).unwrap();
        assert_eq!(p.direction, SfDirection::Down);
        assert_eq!(p.scheduling_type, SchedulingType::Be);
        assert_eq!(p.sfid, 5);
        assert!(p.cs_parameters.is_none());
    }

    #[test]
    fn test_bad_scheduling_type() {
        let tlv = Tlv::new(top::UPLINK_SERVICE_FLOW, TlvValue::SfVector(vec![Tlv::u8(sf::SCHEDULING_TYPE, 5)]));
        assert_eq!(
            ServiceFlowParams::from_tlv(&tlv),
            Err(PduParseErr::InvalidValue { field: "scheduling_type", value: 5 })
        );
    }
}
