use serde::Deserialize;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::{Arc, RwLock};
use wimax_core::{MacAddress, ModulationType, SchedulingType, SfDirection, SimTime, ofdm};

/// Uplink scheduler variant run by the BS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum UlSchedulerKind {
    Simple,
    Rtps,
    MbQos,
}

/// Downlink scheduler variant run by the BS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DlSchedulerKind {
    Simple,
    Rtps,
}

#[derive(Debug, Clone)]
pub struct CfgPhy {
    /// Channel bandwidth, selects the OFDM sampling factor
    pub bandwidth_hz: u32,
    pub frame_duration_ms: f64,
    /// Symbols available to the downlink subframe
    pub nr_dl_symbols: u32,
    /// Symbols available to the uplink subframe
    pub nr_ul_symbols: u32,
    pub frequency_khz: u32,
}

impl Default for CfgPhy {
    fn default() -> Self {
        Self {
            bandwidth_hz: 10_000_000,
            frame_duration_ms: 10.0,
            nr_dl_symbols: 180,
            nr_ul_symbols: 170,
            frequency_khz: 5_000_000,
        }
    }
}

impl CfgPhy {
    pub fn frame_duration(&self) -> SimTime {
        SimTime::from_ms_f64(self.frame_duration_ms)
    }

    /// Whole OFDM symbols per frame, None for an unsupported bandwidth
    pub fn symbols_per_frame(&self) -> Option<u32> {
        ofdm::symbols_per_frame(self.bandwidth_hz, self.frame_duration().as_us())
    }
}

#[derive(Debug, Clone)]
pub struct CfgMac {
    /// 48-bit base station identifier carried in DCD and DL-MAP
    pub bs_id: MacAddress,
    /// Size m of the basic CID range; primary CIDs take the next m values
    pub basic_cid_count: u16,
    /// Retransmissions of an unanswered DSA-REQ before the flow fails
    pub max_dsa_req_retries: u8,
    /// Retransmissions of an unacknowledged DSA-RSP before the flow is removed
    pub max_dsa_rsp_retries: u8,
    pub max_ranging_correction_retries: u8,
    /// Symbols reserved per initial ranging opportunity
    pub rang_req_opp_size: u32,
    /// Symbols reserved per bandwidth request opportunity
    pub bw_req_opp_size: u32,
    pub dsa_rsp_timeout_ms: u64,
    pub dsa_ack_timeout_ms: u64,
    pub initial_ranging_interval_ms: u64,
    pub dcd_ucd_interval_frames: u32,
    /// Payload byte budget of every connection queue
    pub queue_max_bytes: usize,
}

impl Default for CfgMac {
    fn default() -> Self {
        Self {
            bs_id: MacAddress([0x00, 0x00, 0x00, 0x00, 0xff, 0x00]),
            basic_cid_count: 0x5500,
            max_dsa_req_retries: 3,
            max_dsa_rsp_retries: 3,
            max_ranging_correction_retries: 16,
            rang_req_opp_size: 8,
            bw_req_opp_size: 2,
            dsa_rsp_timeout_ms: 50,
            dsa_ack_timeout_ms: 50,
            initial_ranging_interval_ms: 50,
            dcd_ucd_interval_frames: 100,
            queue_max_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgScheduler {
    pub uplink: UlSchedulerKind,
    pub downlink: DlSchedulerKind,
    /// Window over which MBQoS measures granted bandwidth
    pub mbqos_window_ms: u64,
    /// rtPS work due within this many frames is promoted by MBQoS
    pub mbqos_deadline_frames: u32,
    /// Unicast polling interval for nrtPS flows that carry none of their own
    pub nrtps_poll_interval_ms: u64,
    /// Unicast polling interval for BE flows that carry none of their own
    pub be_poll_interval_ms: u64,
}

impl Default for CfgScheduler {
    fn default() -> Self {
        Self {
            uplink: UlSchedulerKind::Simple,
            downlink: DlSchedulerKind::Simple,
            mbqos_window_ms: 1000,
            mbqos_deadline_frames: 3,
            nrtps_poll_interval_ms: 20,
            be_poll_interval_ms: 20,
        }
    }
}

/// A service flow a subscriber station asks for, plus the traffic generated on it
#[derive(Debug, Clone)]
pub struct CfgServiceFlow {
    pub direction: SfDirection,
    pub scheduling_type: SchedulingType,
    pub traffic_priority: u8,
    /// bits per second
    pub min_reserved_rate: u32,
    /// bits per second
    pub max_sustained_rate: u32,
    pub max_traffic_burst: u32,
    pub max_latency_ms: u32,
    pub tolerated_jitter_ms: u32,
    /// Fixed SDU size, 0 for variable-length SDUs
    pub sdu_size: u8,
    pub unsolicited_grant_interval_ms: Option<u16>,
    pub unsolicited_polling_interval_ms: Option<u16>,

    /// Offered load in bits per second, 0 for no generated traffic
    pub traffic_rate: u32,
    /// Payload bytes per generated packet
    pub packet_size: u32,
    pub src_port: u16,
    pub dst_port: u16,
    /// IP protocol number used by the generator and the classifier
    pub protocol: u8,
}

impl Default for CfgServiceFlow {
    fn default() -> Self {
        Self {
            direction: SfDirection::Up,
            scheduling_type: SchedulingType::Be,
            traffic_priority: 0,
            min_reserved_rate: 0,
            max_sustained_rate: 100_000,
            max_traffic_burst: 0,
            max_latency_ms: 100,
            tolerated_jitter_ms: 0,
            sdu_size: 0,
            unsolicited_grant_interval_ms: None,
            unsolicited_polling_interval_ms: None,
            traffic_rate: 0,
            packet_size: 200,
            src_port: 1000,
            dst_port: 5000,
            protocol: 17,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgSubscriber {
    pub mac_address: MacAddress,
    pub ip_address: Ipv4Addr,
    pub modulation: ModulationType,
    /// Number of ranging rounds in which the station reports anomalies before converging
    pub ranging_corrections: u8,
    pub service_flows: Vec<CfgServiceFlow>,
}

impl CfgSubscriber {
    /// Subscriber number `index` (0-based) with a derived MAC and IP address and no flows
    pub fn numbered(index: u32) -> Self {
        Self {
            mac_address: MacAddress::from_index(index + 1),
            ip_address: default_ss_ip(index),
            modulation: ModulationType::Qam16_12,
            ranging_corrections: 0,
            service_flows: Vec::new(),
        }
    }
}

/// 10.1.0.2, 10.1.0.3, ... for subscriber 0, 1, ...
pub fn default_ss_ip(index: u32) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(Ipv4Addr::new(10, 1, 0, 2)) + index)
}

/// Address of the network behind the BS, used as peer of all generated traffic
pub const CORE_IP: Ipv4Addr = Ipv4Addr::new(10, 1, 0, 1);

#[derive(Debug, Clone)]
pub struct StackConfig {
    pub debug_log: Option<String>,
    pub phy: CfgPhy,
    pub mac: CfgMac,
    pub scheduler: CfgScheduler,
    pub subscribers: Vec<CfgSubscriber>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StackConfig {
    pub fn new() -> Self {
        StackConfig {
            debug_log: None,
            phy: CfgPhy::default(),
            mac: CfgMac::default(),
            scheduler: CfgScheduler::default(),
            subscribers: Vec::new(),
        }
    }

    /// Validate that all required configuration fields are properly set.
    pub fn validate(&self) -> Result<(), &str> {
        let Some(symbols) = self.phy.symbols_per_frame() else {
            return Err("phy bandwidth_hz is not a supported OFDM channel bandwidth");
        };
        if self.phy.frame_duration_ms <= 0.0 {
            return Err("phy frame_duration_ms must be positive");
        }
        if ofdm::frame_duration_code(self.phy.frame_duration().as_us()).is_none() {
            return Err("phy frame_duration_ms must be one of 2.5, 4, 5, 8, 10, 12.5, 20");
        }
        if self.phy.nr_dl_symbols + self.phy.nr_ul_symbols > symbols {
            return Err("nr_dl_symbols + nr_ul_symbols exceed the symbols of one frame");
        }
        if self.phy.nr_dl_symbols == 0 || self.phy.nr_ul_symbols == 0 {
            return Err("nr_dl_symbols and nr_ul_symbols must be non-zero");
        }
        if self.mac.rang_req_opp_size == 0 || self.mac.bw_req_opp_size == 0 {
            return Err("rang_req_opp_size and bw_req_opp_size must be non-zero");
        }
        if self.mac.basic_cid_count == 0 || (self.mac.basic_cid_count as u32) * 2 >= 0xFEFE {
            return Err("basic_cid_count must satisfy 0 < 2 * basic_cid_count < 0xFEFE");
        }
        if self.mac.dcd_ucd_interval_frames == 0 {
            return Err("dcd_ucd_interval_frames must be non-zero");
        }
        if self.scheduler.mbqos_window_ms == 0 {
            return Err("mbqos_window_ms must be non-zero");
        }

        let mut seen_macs = HashSet::new();
        let mut seen_ips = HashSet::new();
        for ss in &self.subscribers {
            if !seen_macs.insert(ss.mac_address) {
                return Err("subscriber mac addresses must be unique");
            }
            if !seen_ips.insert(ss.ip_address) {
                return Err("subscriber ip addresses must be unique");
            }
            for sf in &ss.service_flows {
                if sf.min_reserved_rate > sf.max_sustained_rate {
                    return Err("service flow min_reserved_rate exceeds max_sustained_rate");
                }
                if sf.traffic_rate > 0 && sf.packet_size == 0 {
                    return Err("service flow with traffic_rate needs a non-zero packet_size");
                }
            }
        }

        Ok(())
    }
}

/// Mutable, stack-editable state (lock-protected).
#[derive(Debug, Clone, Default)]
pub struct StackState {
    /// Configuration change count carried in DCD and DL-MAP
    pub dcd_config_change_count: u8,
    /// Configuration change count carried in UCD and UL-MAP
    pub ucd_config_change_count: u8,
}

/// Global shared configuration: immutable config + mutable state.
#[derive(Clone)]
pub struct SharedConfig {
    /// Read-only configuration (immutable after construction).
    cfg: Arc<StackConfig>,
    /// Mutable state guarded with RwLock (write by the stack, read by others).
    state: Arc<RwLock<StackState>>,
}

impl SharedConfig {
    pub fn new() -> Self {
        Self::from_config(StackConfig::new())
    }

    pub fn from_config(cfg: StackConfig) -> Self {
        Self::from_parts(cfg, StackState::default())
    }

    pub fn from_parts(cfg: StackConfig, state: StackState) -> Self {
        // Check config for validity before returning the SharedConfig object
        match cfg.validate() {
            Ok(_) => {}
            Err(e) => panic!("Invalid stack configuration: {}", e),
        }

        Self {
            cfg: Arc::new(cfg),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Access immutable config.
    pub fn config(&self) -> Arc<StackConfig> {
        Arc::clone(&self.cfg)
    }

    /// Read guard for mutable state.
    pub fn state_read(&self) -> std::sync::RwLockReadGuard<'_, StackState> {
        self.state.read().expect("StackState RwLock blocked")
    }

    /// Write guard for mutable state.
    pub fn state_write(&self) -> std::sync::RwLockWriteGuard<'_, StackState> {
        self.state.write().expect("StackState RwLock blocked")
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = StackConfig::new();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.phy.symbols_per_frame(), Some(360));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = StackConfig::new();
        cfg.phy.nr_ul_symbols = 300;
        assert!(cfg.validate().is_err(), "symbols beyond the frame must be rejected");

        let mut cfg = StackConfig::new();
        cfg.phy.bandwidth_hz = 1_100_000;
        assert!(cfg.validate().is_err());

        let mut cfg = StackConfig::new();
        cfg.mac.basic_cid_count = 0x7F80;
        assert!(cfg.validate().is_err());

        let mut cfg = StackConfig::new();
        cfg.mac.rang_req_opp_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_subscribers() {
        let mut cfg = StackConfig::new();
        let mut ss = CfgSubscriber::numbered(0);
        ss.service_flows.push(CfgServiceFlow { min_reserved_rate: 2000, max_sustained_rate: 1000, ..Default::default() });
        cfg.subscribers.push(ss);
        assert!(cfg.validate().is_err(), "min rate above max rate must be rejected");

        let mut cfg = StackConfig::new();
        cfg.subscribers.push(CfgSubscriber::numbered(0));
        let mut dup = CfgSubscriber::numbered(1);
        dup.mac_address = cfg.subscribers[0].mac_address;
        cfg.subscribers.push(dup);
        assert!(cfg.validate().is_err(), "duplicate mac must be rejected");
    }

    #[test]
    fn test_state_shared_between_clones() {
        let shared = SharedConfig::new();
        let other = shared.clone();
        shared.state_write().ucd_config_change_count = 7;
        assert_eq!(other.state_read().ucd_config_change_count, 7);
    }
}
