use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::net::Ipv4Addr;
use std::path::Path;

use serde::Deserialize;
use toml::Value;
use wimax_core::{MacAddress, ModulationType, SchedulingType, SfDirection};

use super::stack_config::{
    CfgMac, CfgPhy, CfgScheduler, CfgServiceFlow, CfgSubscriber, DlSchedulerKind, SharedConfig, StackConfig, StackState,
    UlSchedulerKind, default_ss_ip,
};

/// Build `SharedConfig` from a TOML configuration file
pub fn from_toml_str(toml_str: &str) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    // Various sanity checks
    let expected_config_version = "0.1";
    if !root.config_version.eq(expected_config_version) {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, expected_config_version
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if let Some(ref phy) = root.phy {
        if !phy.extra.is_empty() {
            return Err(format!("Unrecognized fields: phy::{:?}", sorted_keys(&phy.extra)).into());
        }
    }
    if let Some(ref mac) = root.mac {
        if !mac.extra.is_empty() {
            return Err(format!("Unrecognized fields: mac::{:?}", sorted_keys(&mac.extra)).into());
        }
    }
    if let Some(ref sched) = root.scheduler {
        if !sched.extra.is_empty() {
            return Err(format!("Unrecognized fields: scheduler::{:?}", sorted_keys(&sched.extra)).into());
        }
    }
    for ss in &root.subscriber {
        if !ss.extra.is_empty() {
            return Err(format!("Unrecognized fields: subscriber::{:?}", sorted_keys(&ss.extra)).into());
        }
        for sf in &ss.service_flow {
            if !sf.extra.is_empty() {
                return Err(format!("Unrecognized fields: subscriber.service_flow::{:?}", sorted_keys(&sf.extra)).into());
            }
        }
    }
    if let Some(ref st) = root.stack_state {
        if !st.extra.is_empty() {
            return Err(format!("Unrecognized fields in stack_state: {:?}", sorted_keys(&st.extra)).into());
        }
    }

    let mut cfg = StackConfig {
        debug_log: root.debug_log,
        phy: CfgPhy::default(),
        mac: CfgMac::default(),
        scheduler: CfgScheduler::default(),
        subscribers: Vec::with_capacity(root.subscriber.len()),
    };

    if let Some(phy) = root.phy {
        apply_phy_patch(&mut cfg.phy, phy);
    }
    if let Some(mac) = root.mac {
        apply_mac_patch(&mut cfg.mac, mac)?;
    }
    if let Some(sched) = root.scheduler {
        apply_scheduler_patch(&mut cfg.scheduler, sched);
    }
    for (index, ss) in root.subscriber.into_iter().enumerate() {
        cfg.subscribers.push(build_subscriber(index as u32, ss)?);
    }

    let mut state = StackState::default();
    if let Some(st) = root.stack_state {
        if let Some(v) = st.dcd_config_change_count {
            state.dcd_config_change_count = v;
        }
        if let Some(v) = st.ucd_config_change_count {
            state.ucd_config_change_count = v;
        }
    }

    // Report invalid values as an error here rather than through the panic in from_parts
    cfg.validate().map_err(|e| format!("Invalid stack configuration: {}", e))?;

    Ok(SharedConfig::from_parts(cfg, state))
}

/// Build `SharedConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build `SharedConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    let r = BufReader::new(f);
    let cfg = from_reader(r)?;
    Ok(cfg)
}

fn apply_phy_patch(dst: &mut CfgPhy, src: PhyDto) {
    if let Some(v) = src.bandwidth_hz {
        dst.bandwidth_hz = v;
    }
    if let Some(v) = src.frame_duration_ms {
        dst.frame_duration_ms = v;
    }
    if let Some(v) = src.nr_dl_symbols {
        dst.nr_dl_symbols = v;
    }
    if let Some(v) = src.nr_ul_symbols {
        dst.nr_ul_symbols = v;
    }
    if let Some(v) = src.frequency_khz {
        dst.frequency_khz = v;
    }
}

fn apply_mac_patch(dst: &mut CfgMac, src: MacDto) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(v) = src.bs_id {
        dst.bs_id = v.parse::<MacAddress>()?;
    }
    if let Some(v) = src.basic_cid_count {
        dst.basic_cid_count = v;
    }
    if let Some(v) = src.max_dsa_req_retries {
        dst.max_dsa_req_retries = v;
    }
    if let Some(v) = src.max_dsa_rsp_retries {
        dst.max_dsa_rsp_retries = v;
    }
    if let Some(v) = src.max_ranging_correction_retries {
        dst.max_ranging_correction_retries = v;
    }
    if let Some(v) = src.rang_req_opp_size {
        dst.rang_req_opp_size = v;
    }
    if let Some(v) = src.bw_req_opp_size {
        dst.bw_req_opp_size = v;
    }
    if let Some(v) = src.dsa_rsp_timeout_ms {
        dst.dsa_rsp_timeout_ms = v;
    }
    if let Some(v) = src.dsa_ack_timeout_ms {
        dst.dsa_ack_timeout_ms = v;
    }
    if let Some(v) = src.initial_ranging_interval_ms {
        dst.initial_ranging_interval_ms = v;
    }
    if let Some(v) = src.dcd_ucd_interval_frames {
        dst.dcd_ucd_interval_frames = v;
    }
    if let Some(v) = src.queue_max_bytes {
        dst.queue_max_bytes = v;
    }
    Ok(())
}

fn apply_scheduler_patch(dst: &mut CfgScheduler, src: SchedulerDto) {
    if let Some(v) = src.uplink {
        dst.uplink = v;
    }
    if let Some(v) = src.downlink {
        dst.downlink = v;
    }
    if let Some(v) = src.mbqos_window_ms {
        dst.mbqos_window_ms = v;
    }
    if let Some(v) = src.mbqos_deadline_frames {
        dst.mbqos_deadline_frames = v;
    }
    if let Some(v) = src.nrtps_poll_interval_ms {
        dst.nrtps_poll_interval_ms = v;
    }
    if let Some(v) = src.be_poll_interval_ms {
        dst.be_poll_interval_ms = v;
    }
}

fn build_subscriber(index: u32, src: SubscriberDto) -> Result<CfgSubscriber, Box<dyn std::error::Error>> {
    let mut ss = CfgSubscriber::numbered(index);
    ss.mac_address = src.mac_address.parse::<MacAddress>()?;
    ss.ip_address = match src.ip_address {
        Some(ip) => ip.parse::<Ipv4Addr>()?,
        None => default_ss_ip(index),
    };
    if let Some(v) = src.modulation {
        ss.modulation = v;
    }
    if let Some(v) = src.ranging_corrections {
        ss.ranging_corrections = v;
    }
    ss.service_flows = src.service_flow.into_iter().map(apply_service_flow_patch).collect();
    Ok(ss)
}

fn apply_service_flow_patch(src: ServiceFlowDto) -> CfgServiceFlow {
    let mut dst = CfgServiceFlow {
        direction: src.direction,
        scheduling_type: src.scheduling_type,
        ..Default::default()
    };
    if let Some(v) = src.traffic_priority {
        dst.traffic_priority = v;
    }
    if let Some(v) = src.min_reserved_rate {
        dst.min_reserved_rate = v;
    }
    if let Some(v) = src.max_sustained_rate {
        dst.max_sustained_rate = v;
    }
    if let Some(v) = src.max_traffic_burst {
        dst.max_traffic_burst = v;
    }
    if let Some(v) = src.max_latency_ms {
        dst.max_latency_ms = v;
    }
    if let Some(v) = src.tolerated_jitter_ms {
        dst.tolerated_jitter_ms = v;
    }
    if let Some(v) = src.sdu_size {
        dst.sdu_size = v;
    }
    dst.unsolicited_grant_interval_ms = src.unsolicited_grant_interval_ms;
    dst.unsolicited_polling_interval_ms = src.unsolicited_polling_interval_ms;
    if let Some(v) = src.traffic_rate {
        dst.traffic_rate = v;
    }
    if let Some(v) = src.packet_size {
        dst.packet_size = v;
    }
    if let Some(v) = src.src_port {
        dst.src_port = v;
    }
    if let Some(v) = src.dst_port {
        dst.dst_port = v;
    }
    if let Some(v) = src.protocol {
        dst.protocol = v;
    }
    dst
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut v: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v
}

/// ----------------------- DTOs for input shape -----------------------

#[derive(Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    debug_log: Option<String>,

    #[serde(default)]
    phy: Option<PhyDto>,

    #[serde(default)]
    mac: Option<MacDto>,

    #[serde(default)]
    scheduler: Option<SchedulerDto>,

    #[serde(default)]
    subscriber: Vec<SubscriberDto>,

    #[serde(default)]
    stack_state: Option<StackStatePatch>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct PhyDto {
    bandwidth_hz: Option<u32>,
    frame_duration_ms: Option<f64>,
    nr_dl_symbols: Option<u32>,
    nr_ul_symbols: Option<u32>,
    frequency_khz: Option<u32>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct MacDto {
    bs_id: Option<String>,
    basic_cid_count: Option<u16>,
    max_dsa_req_retries: Option<u8>,
    max_dsa_rsp_retries: Option<u8>,
    max_ranging_correction_retries: Option<u8>,
    rang_req_opp_size: Option<u32>,
    bw_req_opp_size: Option<u32>,
    dsa_rsp_timeout_ms: Option<u64>,
    dsa_ack_timeout_ms: Option<u64>,
    initial_ranging_interval_ms: Option<u64>,
    dcd_ucd_interval_frames: Option<u32>,
    queue_max_bytes: Option<usize>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct SchedulerDto {
    uplink: Option<UlSchedulerKind>,
    downlink: Option<DlSchedulerKind>,
    mbqos_window_ms: Option<u64>,
    mbqos_deadline_frames: Option<u32>,
    nrtps_poll_interval_ms: Option<u64>,
    be_poll_interval_ms: Option<u64>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct SubscriberDto {
    mac_address: String,
    ip_address: Option<String>,
    modulation: Option<ModulationType>,
    ranging_corrections: Option<u8>,

    #[serde(default)]
    service_flow: Vec<ServiceFlowDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct ServiceFlowDto {
    direction: SfDirection,
    scheduling_type: SchedulingType,
    traffic_priority: Option<u8>,
    min_reserved_rate: Option<u32>,
    max_sustained_rate: Option<u32>,
    max_traffic_burst: Option<u32>,
    max_latency_ms: Option<u32>,
    tolerated_jitter_ms: Option<u32>,
    sdu_size: Option<u8>,
    unsolicited_grant_interval_ms: Option<u16>,
    unsolicited_polling_interval_ms: Option<u16>,
    traffic_rate: Option<u32>,
    packet_size: Option<u32>,
    src_port: Option<u16>,
    dst_port: Option<u16>,
    protocol: Option<u8>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct StackStatePatch {
    dcd_config_change_count: Option<u8>,
    ucd_config_change_count: Option<u8>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}
