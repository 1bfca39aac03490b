//! Uplink schedulers. Every variant builds the UL-MAP of one frame: initial ranging
//! opportunities, invited ranging and DSA allocations, UGS grants, unicast polls and
//! grants answering bandwidth requests. They differ in the order flows are served.

pub mod mbqos;
pub mod rtps;
pub mod simple;
pub mod ul_job;

use wimax_config::{StackConfig, UlSchedulerKind};
use wimax_core::{ModulationType, SchedulingType, SfDirection, SimTime};
use wimax_pdus::burst::BurstProfileManager;
use wimax_pdus::burst::iuc::uiuc;
use wimax_pdus::mac::{BwRequestHeader, BwRequestType};
use wimax_pdus::mgmt::{RangingStatus, UlMapIe};

use crate::bs::ss_manager::SsManager;
use crate::bs::ss_record::SsRecord;
use crate::phy::WimaxPhy;
use crate::sflow::service_flow::ServiceFlow;
use crate::sflow::sf_manager::ServiceFlowManager;

pub use mbqos::MbqosUlScheduler;
pub use rtps::RtpsUlScheduler;
pub use simple::SimpleUlScheduler;

/// Room given to a station for DSA-REQ and DSA-ACK messages
pub const MGMT_ALLOC_BYTES: u32 = 200;

/// Transition gap between the subframes, in physical slots
pub const TTG_PS: u32 = 10;
pub const RTG_PS: u32 = 10;

/// Everything a scheduler reads or updates while building one UL-MAP
pub struct UlSchedCtx<'a> {
    /// Start of the frame being scheduled
    pub now: SimTime,
    pub phy: &'a dyn WimaxPhy,
    pub profiles: &'a BurstProfileManager,
    pub ss_mgr: &'a SsManager,
    pub flows: &'a mut ServiceFlowManager,
}

/// Collects UL-MAP IEs. Each allocation starts where the previous one ended.
#[derive(Debug, Clone)]
pub struct UlMapBuilder {
    ies: Vec<UlMapIe>,
    offset: u32,
    available: u32,
}

impl UlMapBuilder {
    pub fn new(available_symbols: u32) -> Self {
        UlMapBuilder { ies: Vec::new(), offset: 0, available: available_symbols }
    }

    pub fn remaining(&self) -> u32 {
        self.available - self.offset
    }

    /// Symbol offset at which the next allocation starts
    pub fn calculate_allocation_start_time(&self) -> u16 {
        self.offset as u16
    }

    /// Appends `ie` with a duration of `symbols`, capped to what remains.
    /// Returns the granted duration, None when no symbols remain.
    pub fn add_uplink_allocation(&mut self, mut ie: UlMapIe, symbols: u32) -> Option<u32> {
        let remaining = self.remaining();
        if symbols == 0 || remaining == 0 {
            return None;
        }
        let duration = symbols.min(remaining);
        ie.start_time = self.calculate_allocation_start_time();
        ie.duration = duration as u16;
        tracing::debug!("ul alloc {}", ie);
        self.ies.push(ie);
        self.offset += duration;
        Some(duration)
    }

    pub fn ies(&self) -> &[UlMapIe] {
        &self.ies
    }

    /// Closes the map with END_OF_MAP at the final offset
    pub fn finish(mut self) -> Vec<UlMapIe> {
        self.ies.push(UlMapIe::end_of_map(self.calculate_allocation_start_time()));
        self.ies
    }
}

pub trait UplinkScheduler: Send {
    fn kind(&self) -> UlSchedulerKind;

    fn core(&self) -> &UlSchedCore;

    fn core_mut(&mut self) -> &mut UlSchedCore;

    /// Builds the UL-MAP IEs of the frame starting at `ctx.now`, END_OF_MAP included
    fn schedule(&mut self, ctx: &mut UlSchedCtx<'_>) -> Vec<UlMapIe>;

    /// Records a bandwidth request for service in a later frame. False when no flow owns the CID.
    fn process_bandwidth_request(&mut self, hdr: &BwRequestHeader, flows: &mut ServiceFlowManager) -> bool {
        let Some(flow) = flows.get_by_cid_mut(hdr.cid) else {
            return false;
        };
        let aggregate = hdr.req_type == BwRequestType::Aggregate;
        flow.record_mut().update_requested_bandwidth(hdr.br, aggregate);
        tracing::debug!("bw request {} bytes for sfid {}, backlog {}", hdr.br, flow.sfid(), flow.record().backlogged);
        true
    }

    /// Derives grant size and grant/poll intervals from the flow's QoS parameters
    fn setup_service_flow(&mut self, flow: &mut ServiceFlow, modulation: ModulationType, phy: &dyn WimaxPhy) {
        self.core().setup_service_flow(flow, modulation, phy);
    }

    /// Suppresses the contention ranging interval of the next frame
    fn set_is_ir_intrvl_allocated(&mut self, allocated: bool) {
        self.core_mut().is_ir_intrvl_allocated = allocated;
    }

    fn set_is_inv_ir_intrvl_allocated(&mut self, allocated: bool) {
        self.core_mut().is_inv_ir_intrvl_allocated = allocated;
    }

    /// Start of the uplink subframe relative to the frame start, in physical slots
    fn calculate_allocation_start_time(&self) -> u32 {
        self.core().allocation_start_time()
    }
}

pub fn new_uplink_scheduler(cfg: &StackConfig, phy: &dyn WimaxPhy) -> Box<dyn UplinkScheduler> {
    let core = UlSchedCore::new(cfg, phy);
    match cfg.scheduler.uplink {
        UlSchedulerKind::Simple => Box::new(SimpleUlScheduler::new(core)),
        UlSchedulerKind::Rtps => Box::new(RtpsUlScheduler::new(core)),
        UlSchedulerKind::MbQos => Box::new(MbqosUlScheduler::new(core, cfg)),
    }
}

/// State and steps shared by all uplink schedulers
#[derive(Debug, Clone)]
pub struct UlSchedCore {
    pub nr_ul_symbols: u32,
    nr_dl_symbols: u32,
    ps_per_symbol: u32,
    pub frame_duration: SimTime,
    pub rang_req_opp_size: u32,
    pub bw_req_opp_size: u32,
    ir_interval: SimTime,
    nrtps_poll_interval: SimTime,
    be_poll_interval: SimTime,
    last_ir_time: Option<SimTime>,
    pub is_ir_intrvl_allocated: bool,
    pub is_inv_ir_intrvl_allocated: bool,
}

impl UlSchedCore {
    pub fn new(cfg: &StackConfig, phy: &dyn WimaxPhy) -> Self {
        UlSchedCore {
            nr_ul_symbols: cfg.phy.nr_ul_symbols,
            nr_dl_symbols: cfg.phy.nr_dl_symbols,
            ps_per_symbol: phy.ps_per_symbol(),
            frame_duration: cfg.phy.frame_duration(),
            rang_req_opp_size: cfg.mac.rang_req_opp_size,
            bw_req_opp_size: cfg.mac.bw_req_opp_size,
            ir_interval: SimTime::from_ms(cfg.mac.initial_ranging_interval_ms),
            nrtps_poll_interval: SimTime::from_ms(cfg.scheduler.nrtps_poll_interval_ms),
            be_poll_interval: SimTime::from_ms(cfg.scheduler.be_poll_interval_ms),
            last_ir_time: None,
            is_ir_intrvl_allocated: false,
            is_inv_ir_intrvl_allocated: false,
        }
    }

    pub fn allocation_start_time(&self) -> u32 {
        self.nr_dl_symbols * self.ps_per_symbol + TTG_PS
    }

    /// Opens a scheduling pass on every active uplink flow
    pub fn begin_pass(&self, flows: &mut ServiceFlowManager) {
        for flow in flows.flows_mut().filter(|f| f.direction() == SfDirection::Up && f.is_active()) {
            flow.record_mut().begin_pass();
        }
    }

    pub fn commit_pass(&self, flows: &mut ServiceFlowManager, now: SimTime) {
        for flow in flows.flows_mut() {
            flow.record_mut().commit_pass(now);
        }
    }

    /// Step 1 of every frame: contention ranging opportunity when the interval has elapsed.
    /// A suppression set for this frame is consumed here.
    pub fn allocate_initial_ranging_interval(&mut self, map: &mut UlMapBuilder, ss_mgr: &SsManager, now: SimTime) {
        if self.is_ir_intrvl_allocated {
            self.is_ir_intrvl_allocated = false;
            return;
        }
        self.is_inv_ir_intrvl_allocated =
            ss_mgr.iter().any(|ss| ss.poll_for_ranging && ss.ranging_status == RangingStatus::Continue);
        if self.is_inv_ir_intrvl_allocated {
            return;
        }
        let due = self.last_ir_time.is_none_or(|t| now.since(t) + self.frame_duration > self.ir_interval);
        if !due || map.remaining() < self.rang_req_opp_size {
            return;
        }
        let ie = UlMapIe::new(wimax_core::Cid::INITIAL_RANGING, uiuc::INITIAL_RANGING);
        if map.add_uplink_allocation(ie, self.rang_req_opp_size).is_some() {
            self.last_ir_time = Some(now);
        }
    }

    /// Invited ranging or DSA allocation for a station still in setup.
    /// Returns true when the station is not ready for data service this frame.
    pub fn management_allocation(
        &self,
        map: &mut UlMapBuilder,
        ss: &SsRecord,
        phy: &dyn WimaxPhy,
        profiles: &BurstProfileManager,
        dsa_allocated: &mut bool,
    ) -> bool {
        if ss.poll_for_ranging && ss.ranging_status == RangingStatus::Continue {
            let ie = UlMapIe::new(ss.basic_cid, uiuc::INITIAL_RANGING);
            if map.remaining() >= self.rang_req_opp_size {
                map.add_uplink_allocation(ie, self.rang_req_opp_size);
            }
            return true;
        }
        if !ss.is_ranged() {
            return true;
        }
        if !ss.are_service_flows_allocated {
            // One DSA allocation per frame
            if !*dsa_allocated {
                let symbols = phy.nr_symbols(MGMT_ALLOC_BYTES, ss.modulation);
                if map.remaining() >= symbols {
                    map.add_uplink_allocation(UlMapIe::new(ss.basic_cid, data_uiuc(profiles, ss.modulation)), symbols);
                    *dsa_allocated = true;
                }
            }
            return true;
        }
        false
    }

    fn poll_interval(&self, flow: &ServiceFlow) -> SimTime {
        let own = flow.params().unsolicited_polling_interval;
        if own > 0 {
            return SimTime::from_ms(own as u64);
        }
        match flow.scheduling_type() {
            SchedulingType::Nrtps => self.nrtps_poll_interval,
            _ => self.be_poll_interval,
        }
    }

    pub fn setup_service_flow(&self, flow: &mut ServiceFlow, modulation: ModulationType, phy: &dyn WimaxPhy) {
        let frame_ms = (self.frame_duration.as_us() / 1000).max(1);
        let bytes_per_frame = (flow.min_reserved_rate() as u64 * self.frame_duration.as_us() / 8_000_000) as u32;
        match flow.scheduling_type() {
            SchedulingType::Ugs => {
                let grant_size = phy.nr_symbols(bytes_per_frame, modulation);
                let jitter = flow.params().tolerated_jitter as u64;
                let delay_frames = if jitter > frame_ms { jitter / frame_ms } else { 1 };
                let rec = flow.record_mut();
                rec.grant_size = grant_size;
                rec.grant_interval = SimTime::from_ms(delay_frames * frame_ms);
            }
            SchedulingType::Rtps => {
                let sdu = flow.params().sdu_size as u32;
                let delay_frames = if bytes_per_frame > 0 && sdu > bytes_per_frame { sdu / bytes_per_frame } else { 1 };
                flow.record_mut().poll_interval = SimTime::from_ms(delay_frames as u64 * frame_ms);
            }
            SchedulingType::Nrtps | SchedulingType::Be => {
                let interval = self.poll_interval(flow);
                flow.record_mut().poll_interval = interval;
            }
            _ => {
                tracing::warn!("setup_service_flow: sfid {} has no schedulable type", flow.sfid());
            }
        }
        tracing::debug!(
            "setup sfid {}: grant {} symbols every {}, poll every {}",
            flow.sfid(),
            flow.record().grant_size,
            flow.record().grant_interval,
            flow.record().poll_interval
        );
    }

    /// UGS grant when its interval has elapsed. False when the map had no room for it.
    pub fn service_unsolicited_grant(
        &self,
        map: &mut UlMapBuilder,
        flow: &mut ServiceFlow,
        modulation: ModulationType,
        phy: &dyn WimaxPhy,
        profiles: &BurstProfileManager,
        now: SimTime,
    ) -> bool {
        let rec = flow.record();
        let due = rec.last_grant_time.is_none_or(|t| now.since(t) >= rec.grant_interval);
        if !due || rec.grant_size == 0 {
            return true;
        }
        if map.remaining() < rec.grant_size {
            return false;
        }
        let symbols = rec.grant_size;
        let ie = UlMapIe::new(flow.cid(), data_uiuc(profiles, modulation));
        if let Some(granted) = map.add_uplink_allocation(ie, symbols) {
            flow.record_mut().tentative_grant(phy.nr_bytes(granted, modulation));
        }
        true
    }

    /// Unicast request opportunity when the flow's poll interval has elapsed
    pub fn service_poll(&self, map: &mut UlMapBuilder, flow: &mut ServiceFlow, now: SimTime) -> bool {
        let rec = flow.record();
        let due = rec.last_poll_time.is_none_or(|t| now.since(t) >= rec.poll_interval);
        if !due {
            return true;
        }
        if map.remaining() < self.bw_req_opp_size {
            return false;
        }
        let ie = UlMapIe::new(flow.cid(), uiuc::REQ_REGION_FULL);
        if map.add_uplink_allocation(ie, self.bw_req_opp_size).is_some() {
            flow.record_mut().last_poll_time = Some(now);
        }
        true
    }

    /// Grants up to `max_bytes` of the flow's outstanding backlog, capped to the symbols left.
    /// Returns the bytes granted.
    #[allow(clippy::too_many_arguments)]
    pub fn grant_backlog(
        &self,
        map: &mut UlMapBuilder,
        flow: &mut ServiceFlow,
        max_bytes: u32,
        modulation: ModulationType,
        phy: &dyn WimaxPhy,
        profiles: &BurstProfileManager,
    ) -> u32 {
        let want = flow.record().backlog_temp().min(max_bytes);
        if want == 0 {
            return 0;
        }
        let ie = UlMapIe::new(flow.cid(), data_uiuc(profiles, modulation));
        let Some(granted) = map.add_uplink_allocation(ie, phy.nr_symbols(want, modulation)) else {
            return 0;
        };
        let bytes = phy.nr_bytes(granted, modulation).min(want);
        flow.record_mut().tentative_grant(bytes);
        bytes
    }

    /// Grant answering the flow's bandwidth requests. False when the map is full.
    pub fn service_bandwidth_requests(
        &self,
        map: &mut UlMapBuilder,
        flow: &mut ServiceFlow,
        modulation: ModulationType,
        phy: &dyn WimaxPhy,
        profiles: &BurstProfileManager,
    ) -> bool {
        if flow.record().backlog_temp() == 0 {
            return true;
        }
        self.grant_backlog(map, flow, u32::MAX, modulation, phy, profiles);
        map.remaining() > 0
    }
}

/// UIUC of the data burst profile for `modulation`
pub fn data_uiuc(profiles: &BurstProfileManager, modulation: ModulationType) -> u8 {
    profiles.uiuc_for(modulation).unwrap_or(uiuc::BURST_FIRST)
}

/// Flows of `ss` that take part in uplink scheduling, in SFID order
pub fn schedulable_flows(ss: &SsRecord, flows: &ServiceFlowManager, scheduling_type: SchedulingType) -> Vec<u32> {
    ss.sfids()
        .iter()
        .copied()
        .filter(|sfid| {
            flows.get(*sfid).is_some_and(|f| {
                f.direction() == SfDirection::Up && f.is_active() && f.scheduling_type() == scheduling_type
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_util {
    use wimax_config::{StackConfig, UlSchedulerKind};
    use wimax_core::{Cid, MacAddress, ModulationType, SchedulingType, SfDirection, Sfid};
    use wimax_pdus::mgmt::RangingStatus;
    use wimax_pdus::sflow::ServiceFlowParams;

    use crate::bs::ss_manager::SsManager;
    use crate::bs::ss_record::SsRecord;
    use crate::phy::SimpleOfdmPhy;
    use crate::sflow::service_flow::{ServiceFlow, SfState};
    use crate::sflow::sf_manager::ServiceFlowManager;

    pub fn config(kind: UlSchedulerKind) -> StackConfig {
        let mut cfg = StackConfig::default();
        cfg.scheduler.uplink = kind;
        cfg
    }

    pub fn phy(cfg: &StackConfig) -> SimpleOfdmPhy {
        SimpleOfdmPhy::new(&cfg.phy)
    }

    /// Ranged station `n` with flows allocated
    pub fn ranged_ss(n: u16) -> SsRecord {
        let mut ss = SsRecord::new(MacAddress::from_index(n as u32), Cid::new(n), Cid::new(100 + n));
        ss.ranging_status = RangingStatus::Success;
        ss.are_service_flows_allocated = true;
        ss.modulation = ModulationType::Qam16_12;
        ss
    }

    pub fn active_flow(sfid: Sfid, cid: u16, st: SchedulingType) -> ServiceFlow {
        active_flow_with(sfid, cid, st, |_| {})
    }

    pub fn active_flow_with(sfid: Sfid, cid: u16, st: SchedulingType, f: impl FnOnce(&mut ServiceFlowParams)) -> ServiceFlow {
        let mut params = ServiceFlowParams::new(SfDirection::Up, st);
        params.sfid = sfid;
        params.cid = cid;
        params.max_latency = 100;
        f(&mut params);
        let mut flow = ServiceFlow::new(params);
        flow.set_state(SfState::Active);
        flow
    }

    pub fn add(ss_mgr: &mut SsManager, flows: &mut ServiceFlowManager, ss: u16, flow: ServiceFlow) {
        let sfid = flow.sfid();
        flows.add(flow).unwrap();
        ss_mgr.get_by_cid_mut(Cid::new(ss)).unwrap().add_sfid(sfid);
    }
}

#[cfg(test)]
mod tests {
    use wimax_core::Cid;

    use super::*;

    #[test]
    fn test_builder_contiguity_and_cap() {
        let mut map = UlMapBuilder::new(20);
        assert_eq!(map.add_uplink_allocation(UlMapIe::new(Cid::new(1), uiuc::BURST_FIRST), 8), Some(8));
        assert_eq!(map.add_uplink_allocation(UlMapIe::new(Cid::new(2), uiuc::BURST_FIRST), 20), Some(12), "capped");
        assert_eq!(map.add_uplink_allocation(UlMapIe::new(Cid::new(3), uiuc::BURST_FIRST), 1), None);
        let ies = map.finish();
        assert_eq!(ies.len(), 3);
        assert_eq!((ies[0].start_time, ies[0].duration), (0, 8));
        assert_eq!((ies[1].start_time, ies[1].duration), (8, 12));
        assert!(ies[2].is_end_of_map());
        assert_eq!(ies[2].start_time, 20);
    }
}
