mod common;

use common::component_test::flow;
use common::{ComponentTest, default_test_config};
use wimax_config::{DlSchedulerKind, StackConfig, UlSchedulerKind};
use wimax_core::{SchedulingType, SfDirection, debug};

/// One station with UGS, rtPS and BE uplink flows and a BE downlink flow, all carrying traffic
fn traffic_config(uplink: UlSchedulerKind, downlink: DlSchedulerKind) -> StackConfig {
    let mut config = default_test_config(1);
    config.scheduler.uplink = uplink;
    config.scheduler.downlink = downlink;

    let mut ugs = flow(SfDirection::Up, SchedulingType::Ugs, 64_000, 5001);
    ugs.min_reserved_rate = 64_000;
    ugs.packet_size = 80;
    let mut rtps = flow(SfDirection::Up, SchedulingType::Rtps, 128_000, 5002);
    rtps.min_reserved_rate = 64_000;
    config.subscribers[0].service_flows = vec![
        ugs,
        rtps,
        flow(SfDirection::Up, SchedulingType::Be, 64_000, 5003),
        flow(SfDirection::Down, SchedulingType::Be, 64_000, 5004),
    ];
    config
}

fn run_traffic(uplink: UlSchedulerKind, downlink: DlSchedulerKind) {
    let config = traffic_config(uplink, downlink);
    let mac = config.subscribers[0].mac_address;
    let mut test = ComponentTest::new(config);
    test.populate_entities(vec![]);

    test.run_stack(150);

    let bs_flows: Vec<_> = test.bs().service_flows().flows().cloned().collect();
    assert_eq!(bs_flows.len(), 4);
    for bs_flow in &bs_flows {
        let ss_flow = test.ss(mac).service_flows().get(bs_flow.sfid()).unwrap().clone();
        let (tx, rx) = match bs_flow.direction() {
            SfDirection::Up => (ss_flow.record(), bs_flow.record()),
            SfDirection::Down => (bs_flow.record(), ss_flow.record()),
        };
        tracing::info!(
            "{:?}/{:?} {}: sent {} received {} dropped {}",
            uplink,
            downlink,
            bs_flow,
            tx.pkts_sent,
            rx.pkts_rcvd,
            tx.pkts_dropped
        );
        assert!(rx.pkts_rcvd > 10, "{}: only {} packets received", bs_flow, rx.pkts_rcvd);
        assert!(rx.pkts_rcvd <= tx.pkts_sent);
        // Fragmented SDUs arrive whole
        let packet_size = if bs_flow.scheduling_type() == SchedulingType::Ugs { 80 } else { 200 };
        assert_eq!(rx.bytes_rcvd, rx.pkts_rcvd * packet_size);
    }
    assert_eq!(test.bs().stats().ul_parse_errors, 0);
    assert_eq!(test.ss(mac).stats().dl_parse_errors, 0);
}

#[test]
fn test_traffic_simple_schedulers() {
    debug::setup_logging_verbose();
    run_traffic(UlSchedulerKind::Simple, DlSchedulerKind::Simple);
}

#[test]
fn test_traffic_rtps_schedulers() {
    debug::setup_logging_verbose();
    run_traffic(UlSchedulerKind::Rtps, DlSchedulerKind::Rtps);
}

#[test]
fn test_traffic_mbqos_uplink() {
    debug::setup_logging_verbose();
    run_traffic(UlSchedulerKind::MbQos, DlSchedulerKind::Simple);
}
