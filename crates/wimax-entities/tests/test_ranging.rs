mod common;

use std::collections::HashSet;

use common::{ComponentTest, default_test_config};
use wimax_core::{CidType, MacAddress, debug};
use wimax_entities::ss::LinkState;
use wimax_pdus::mgmt::{MgmtMsg, RangingStatus};

#[test]
/// Three stations range in the first frames and get distinct management CIDs
fn test_initial_ranging() {
    debug::setup_logging_verbose();
    let config = default_test_config(3);
    let macs: Vec<MacAddress> = config.subscribers.iter().map(|s| s.mac_address).collect();
    let mut test = ComponentTest::new(config);
    test.populate_entities(vec![]);

    test.run_stack(5);

    let mut basic_cids = HashSet::new();
    for mac in &macs {
        assert_eq!(test.ss(*mac).link_state(), LinkState::Ranged, "{} not ranged", mac);
        let record = test.bs().ss_manager().get_by_mac(*mac).unwrap().clone();
        assert_eq!(record.ranging_status, RangingStatus::Success);
        assert_eq!(test.bs().connections().cid_type(record.basic_cid), Some(CidType::Basic));
        assert_eq!(test.bs().connections().cid_type(record.primary_cid), Some(CidType::Primary));
        assert!(basic_cids.insert(record.basic_cid));
    }
    assert_eq!(test.bs().ss_manager().len(), 3);
    assert_eq!(test.bs().stats().stations_ranged, 3);
}

#[test]
/// A station reporting anomalies is polled with invited ranging until it converges
fn test_invited_ranging() {
    debug::setup_logging_verbose();
    let mut config = default_test_config(1);
    config.subscribers[0].ranging_corrections = 2;
    let mac = config.subscribers[0].mac_address;
    let mut test = ComponentTest::new(config);
    test.populate_entities(vec![]);

    test.run_stack(2);
    assert_eq!(test.ss(mac).link_state(), LinkState::Invited { awaiting_rsp: true });
    assert!(test.bs().ss_manager().get_by_mac(mac).unwrap().poll_for_ranging);

    test.run_stack(3);
    assert_eq!(test.ss(mac).link_state(), LinkState::Ranged);
    let record = test.bs().ss_manager().get_by_mac(mac).unwrap();
    assert_eq!(record.ranging_correction_retries, 2);
    assert!(!record.poll_for_ranging);
}

#[test]
/// The BS gives up on a station whose corrections never converge
fn test_ranging_abort() {
    debug::setup_logging_verbose();
    let mut config = default_test_config(1);
    config.mac.max_ranging_correction_retries = 2;
    config.subscribers[0].ranging_corrections = 10;
    let mac = config.subscribers[0].mac_address;
    let mut test = ComponentTest::new(config);
    test.populate_entities(vec![]);

    test.run_stack(6);
    assert_eq!(test.ss(mac).link_state(), LinkState::Aborted);
    assert!(test.bs().ss_manager().is_empty());
    assert_eq!(test.bs().connections().connections_of_type(CidType::Basic).count(), 0);
}

#[test]
/// Every downlink subframe starts with a DL-MAP, the first ones also carry DCD and UCD
fn test_downlink_subframe_structure() {
    debug::setup_logging_verbose();
    let config = default_test_config(0);
    let monitor = MacAddress::from_index(100);
    let mut test = ComponentTest::new(config);
    test.populate_entities(vec![monitor]);

    test.run_stack(3);
    let subframes = test.dump_sinks();
    assert_eq!(subframes.len(), 3);

    for (frame, msg) in subframes.iter().enumerate() {
        assert_eq!(msg.frame, frame as u32);
        let mut buf = wimax_core::ByteBuffer::from_bytes(&msg.bytes);
        let pdus = wimax_pdus::mac::MacPdu::burst_from_bytes(&mut buf).unwrap();
        let msgs: Vec<MgmtMsg> = pdus
            .into_iter()
            .map(|p| MgmtMsg::from_bytes(&mut wimax_core::ByteBuffer::from_vec(p.payload)).unwrap())
            .collect();
        assert!(matches!(msgs[0], MgmtMsg::DlMap(_)));
        assert!(msgs.iter().any(|m| matches!(m, MgmtMsg::UlMap(_))));
        let has_descriptors = msgs.iter().any(|m| matches!(m, MgmtMsg::Dcd(_)));
        assert_eq!(has_descriptors, frame == 0);
    }
}
