use wimax_core::{SfDirection, Sfid};
use wimax_pdus::sflow::FiveTuple;

use crate::sflow::sf_manager::ServiceFlowManager;

/// Maps IPv4 packets onto service flows through the flows' classifier rules
pub struct IpcsClassifier;

impl IpcsClassifier {
    /// Returns the flow whose rule matches `tuple` first, rules taken in descending
    /// priority with ties broken by ascending classifier index. Flows without a rule
    /// never match.
    pub fn classify(tuple: &FiveTuple, manager: &ServiceFlowManager, direction: SfDirection) -> Option<Sfid> {
        let mut candidates: Vec<_> = manager
            .flows_in_direction(direction)
            .filter_map(|f| f.classifier().map(|rule| (rule, f.sfid())))
            .collect();
        candidates.sort_by(|(a, _), (b, _)| b.priority.cmp(&a.priority).then(a.index.cmp(&b.index)));
        let sfid = candidates.into_iter().find(|(rule, _)| rule.check_match(tuple)).map(|(_, sfid)| sfid);
        tracing::trace!("classify {} {}: {:?}", direction, tuple, sfid);
        sfid
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use wimax_core::SchedulingType;
    use wimax_pdus::sflow::{CsParameters, IpcsClassifierRecord, ServiceFlowParams};

    use super::*;
    use crate::sflow::service_flow::ServiceFlow;

    fn flow(sfid: Sfid, direction: SfDirection, rule: IpcsClassifierRecord) -> ServiceFlow {
        let mut params = ServiceFlowParams::new(direction, SchedulingType::Be);
        params.sfid = sfid;
        params.cid = 100 + sfid as u16;
        params.cs_parameters = Some(CsParameters::new(rule));
        ServiceFlow::new(params)
    }

    fn tuple(dst_port: u16) -> FiveTuple {
        FiveTuple {
            src: Ipv4Addr::new(10, 1, 0, 2),
            dst: Ipv4Addr::new(10, 1, 0, 1),
            src_port: 1000,
            dst_port,
            protocol: 17,
            tos: 0,
        }
    }

    #[test]
    fn test_priority_then_index() {
        let mut mgr = ServiceFlowManager::new();
        let any = IpcsClassifierRecord::default();
        let port_5000 = IpcsClassifierRecord { dst_ports: vec![(5000, 5000)], priority: 5, ..Default::default() };
        let low_index = IpcsClassifierRecord { priority: 1, index: 1, ..Default::default() };
        let high_index = IpcsClassifierRecord { priority: 1, index: 2, ..Default::default() };
        mgr.add(flow(1, SfDirection::Up, any)).unwrap();
        mgr.add(flow(2, SfDirection::Up, high_index)).unwrap();
        mgr.add(flow(3, SfDirection::Up, low_index)).unwrap();
        mgr.add(flow(4, SfDirection::Up, port_5000)).unwrap();

        assert_eq!(IpcsClassifier::classify(&tuple(5000), &mgr, SfDirection::Up), Some(4));
        assert_eq!(IpcsClassifier::classify(&tuple(6000), &mgr, SfDirection::Up), Some(3));
    }

    #[test]
    fn test_direction_and_no_match() {
        let mut mgr = ServiceFlowManager::new();
        let rule = IpcsClassifierRecord { protocols: vec![6], ..Default::default() };
        mgr.add(flow(1, SfDirection::Down, IpcsClassifierRecord::default())).unwrap();
        mgr.add(flow(2, SfDirection::Up, rule)).unwrap();
        assert_eq!(IpcsClassifier::classify(&tuple(5000), &mgr, SfDirection::Up), None, "udp must not match a tcp rule");
        assert_eq!(IpcsClassifier::classify(&tuple(5000), &mgr, SfDirection::Down), Some(1));
    }
}
