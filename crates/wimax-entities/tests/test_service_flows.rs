mod common;

use common::component_test::flow;
use common::{ComponentTest, default_test_config};
use wimax_core::{CidType, SchedulingType, SfDirection, debug};
use wimax_entities::sflow::{DsaState, SfState};

#[test]
/// All four configured flows are negotiated one after the other and end up Active on
/// both sides with the same SFID and CID
fn test_dsa_reaches_active() {
    debug::setup_logging_verbose();
    let mut config = default_test_config(1);
    let mut ugs = flow(SfDirection::Up, SchedulingType::Ugs, 0, 5001);
    ugs.min_reserved_rate = 64_000;
    config.subscribers[0].service_flows = vec![
        ugs,
        flow(SfDirection::Up, SchedulingType::Rtps, 0, 5002),
        flow(SfDirection::Up, SchedulingType::Be, 0, 5003),
        flow(SfDirection::Down, SchedulingType::Be, 0, 5004),
    ];
    let mac = config.subscribers[0].mac_address;
    let mut test = ComponentTest::new(config);
    test.populate_entities(vec![]);

    test.run_stack(20);

    let states = test.ss(mac).dsa_states();
    assert_eq!(states.len(), 4);
    assert!(states.iter().all(|s| matches!(s, DsaState::Done { .. })), "{:?}", states);

    let ss_flows: Vec<_> = test.ss(mac).service_flows().flows().map(|f| (f.sfid(), f.cid(), f.direction(), f.state())).collect();
    let bs_flows: Vec<_> = test.bs().service_flows().flows().map(|f| (f.sfid(), f.cid(), f.direction(), f.state())).collect();
    assert_eq!(ss_flows.len(), 4);
    assert_eq!(ss_flows, bs_flows);
    assert!(ss_flows.iter().all(|f| f.3 == SfState::Active));

    for (sfid, cid, _, _) in &ss_flows {
        assert_eq!(test.ss(mac).connections().cid_type(*cid), Some(CidType::Transport));
        assert_eq!(test.bs().connections().get(*cid).and_then(|c| c.sfid()), Some(*sfid));
    }

    let record = test.bs().ss_manager().get_by_mac(mac).unwrap();
    assert_eq!(record.sfids().len(), 4);
    assert!(record.are_service_flows_allocated);
}

#[test]
/// A UGS flow the uplink cannot carry is rejected; negotiation moves on to the next flow
fn test_dsa_reject_continues_with_next_flow() {
    debug::setup_logging_verbose();
    let mut config = default_test_config(1);
    let mut ugs = flow(SfDirection::Up, SchedulingType::Ugs, 0, 5001);
    ugs.min_reserved_rate = 50_000_000;
    ugs.max_sustained_rate = 100_000_000;
    config.subscribers[0].service_flows = vec![ugs, flow(SfDirection::Up, SchedulingType::Be, 0, 5002)];
    let mac = config.subscribers[0].mac_address;
    let mut test = ComponentTest::new(config);
    test.populate_entities(vec![]);

    test.run_stack(15);

    let states = test.ss(mac).dsa_states();
    assert_eq!(states[0], DsaState::Failed);
    assert!(matches!(states[1], DsaState::Done { .. }));
    assert_eq!(test.ss(mac).service_flows().len(), 1);
    assert_eq!(test.bs().service_flows().len(), 1);
    assert_eq!(test.bs().connections().connections_of_type(CidType::Transport).count(), 1);
    assert!(test.bs().ss_manager().get_by_mac(mac).unwrap().are_service_flows_allocated);
}

#[test]
/// Several stations negotiate in parallel and the BS hands out distinct SFIDs
fn test_sfids_unique_across_stations() {
    debug::setup_logging_verbose();
    let mut config = default_test_config(3);
    for ss in config.subscribers.iter_mut() {
        ss.service_flows = vec![
            flow(SfDirection::Up, SchedulingType::Be, 0, 5001),
            flow(SfDirection::Down, SchedulingType::Be, 0, 5002),
        ];
    }
    let mut test = ComponentTest::new(config);
    test.populate_entities(vec![]);

    test.run_stack(30);

    let flows: Vec<_> = test.bs().service_flows().flows().map(|f| (f.sfid(), f.state())).collect();
    assert_eq!(flows.len(), 6);
    assert!(flows.iter().all(|(_, state)| *state == SfState::Active));
    assert!(test.bs().ss_manager().iter().all(|ss| ss.are_service_flows_allocated && ss.sfids().len() == 2));
}
