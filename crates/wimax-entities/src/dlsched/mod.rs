//! Downlink schedulers. A frame's downlink subframe starts with the DL-MAP, followed by
//! one burst per served connection. Every burst is described by a DL-MAP IE whose start
//! time is where the previous burst ended.

pub mod rtps;
pub mod simple;

use wimax_config::{DlSchedulerKind, StackConfig};
use wimax_core::{Cid, CidType, ModulationType, SchedulingType, SfDirection, SimTime};
use wimax_pdus::burst::BurstProfileManager;
use wimax_pdus::burst::iuc::diuc;
use wimax_pdus::mac::{FragmentationControl, MacHeaderType, MacPdu};
use wimax_pdus::mgmt::DlMapIe;

use crate::bs::ss_manager::SsManager;
use crate::mac::ConnectionManager;
use crate::mac::mac_queue::FRAGMENT_OVERHEAD;
use crate::phy::WimaxPhy;
use crate::sflow::sf_manager::ServiceFlowManager;

pub use rtps::RtpsBsScheduler;
pub use simple::SimpleBsScheduler;

/// DL-MAP bytes besides its IEs: message type, DCD count, BS id
const DL_MAP_FIXED_LEN: usize = 1 + 1 + 6;

pub struct DlSchedCtx<'a> {
    pub now: SimTime,
    pub phy: &'a dyn WimaxPhy,
    pub profiles: &'a BurstProfileManager,
    pub ss_mgr: &'a SsManager,
    pub flows: &'a mut ServiceFlowManager,
    pub conns: &'a mut ConnectionManager,
    /// Symbols of the downlink subframe
    pub nr_dl_symbols: u32,
}

/// PDUs sent back to back with one burst profile
#[derive(Debug, Clone)]
pub struct DlBurst {
    pub cid: Cid,
    pub diuc: u8,
    pub modulation: ModulationType,
    pub pdus: Vec<MacPdu>,
    pub symbols: u32,
}

impl DlBurst {
    pub fn n_bytes(&self) -> usize {
        self.pdus.iter().map(|p| p.serialized_size()).sum()
    }
}

/// Result of one downlink scheduling pass
#[derive(Debug, Clone, Default)]
pub struct DlSchedule {
    /// DL-MAP IEs, END_OF_MAP included
    pub ies: Vec<DlMapIe>,
    pub bursts: Vec<DlBurst>,
    /// Symbols reserved at the start of the subframe for the DL-MAP itself
    pub dl_map_symbols: u32,
}

/// Lays bursts out back to back after the DL-MAP
#[derive(Debug)]
pub struct DlScheduleBuilder {
    schedule: DlSchedule,
    offset: u32,
    available: u32,
    /// Connections passed over this frame because their head packet did not fit
    skipped: Vec<Cid>,
}

impl DlScheduleBuilder {
    pub fn new(dl_map_symbols: u32, nr_dl_symbols: u32) -> Self {
        DlScheduleBuilder {
            schedule: DlSchedule { dl_map_symbols, ..Default::default() },
            offset: dl_map_symbols,
            available: nr_dl_symbols,
            skipped: Vec::new(),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.available.saturating_sub(self.offset)
    }

    /// Whether `cid` already got its burst or was passed over this frame
    pub fn is_done(&self, cid: Cid) -> bool {
        self.skipped.contains(&cid) || self.schedule.bursts.iter().any(|b| b.cid == cid)
    }

    pub fn skip(&mut self, cid: Cid) {
        self.skipped.push(cid);
    }

    pub fn finish(mut self) -> DlSchedule {
        self.schedule.ies.push(DlMapIe::end_of_map(self.offset as u16));
        self.schedule
    }
}

/// Symbols taken by a DL-MAP with `n_bursts` IEs plus END_OF_MAP, sent with the most robust profile
pub fn dl_map_symbols(n_bursts: usize, phy: &dyn WimaxPhy) -> u32 {
    let bytes = DL_MAP_FIXED_LEN + (n_bursts + 1) * DlMapIe::SERIALIZED_SIZE;
    phy.nr_symbols(bytes as u32, ModulationType::Bpsk12)
}

/// Burst profile for `cid`: broadcast and ranging traffic use BPSK, a station's
/// connections use the station's modulation
pub fn burst_profile(ctx: &DlSchedCtx<'_>, cid: Cid) -> (u8, ModulationType) {
    let robust = (diuc::BURST_FIRST, ModulationType::Bpsk12);
    let ss = match ctx.conns.cid_type(cid) {
        Some(CidType::Basic) | Some(CidType::Primary) => ctx.ss_mgr.get_by_cid(cid),
        Some(CidType::Transport) => {
            ctx.conns.get(cid).and_then(|c| c.sfid()).and_then(|sfid| ctx.ss_mgr.get_by_sfid(sfid))
        }
        _ => None,
    };
    match ss {
        Some(ss) => (ctx.profiles.diuc_for(ss.modulation).unwrap_or(diuc::BURST_FIRST), ss.modulation),
        None => robust,
    }
}

/// Scheduling type of the flow bound to a transport connection
pub fn connection_scheduling_type(ctx: &DlSchedCtx<'_>, cid: Cid) -> Option<SchedulingType> {
    let sfid = ctx.conns.get(cid)?.sfid()?;
    let flow = ctx.flows.get(sfid)?;
    (flow.direction() == SfDirection::Down && flow.is_active()).then_some(flow.scheduling_type())
}

/// Downlink transport connections of active flows of scheduling type `st` with data queued
pub fn connections_with_data(ctx: &DlSchedCtx<'_>, st: SchedulingType) -> Vec<Cid> {
    ctx.conns
        .connections_of_type(CidType::Transport)
        .filter(|c| c.has_packets())
        .map(|c| c.cid())
        .filter(|cid| connection_scheduling_type(ctx, *cid) == Some(st))
        .collect()
}

/// Drops UGS and rtPS downlink packets that already missed their latency bound
pub fn drop_expired(ctx: &mut DlSchedCtx<'_>) {
    for flow in ctx.flows.flows_mut() {
        let st = flow.scheduling_type();
        if flow.direction() != SfDirection::Down || !matches!(st, SchedulingType::Ugs | SchedulingType::Rtps) {
            continue;
        }
        let max_latency = flow.max_latency();
        if max_latency == SimTime::ZERO {
            continue;
        }
        let Some(conn) = ctx.conns.get_mut(flow.cid()) else { continue };
        let dropped = conn.queue_mut().drop_expired(ctx.now, max_latency);
        if dropped > 0 {
            tracing::warn!("sfid {}: dropped {} expired downlink packets", flow.sfid(), dropped);
            flow.record_mut().update_pkts_dropped(dropped as u64);
        }
    }
}

pub fn new_bs_scheduler(cfg: &StackConfig) -> Box<dyn BsScheduler> {
    match cfg.scheduler.downlink {
        DlSchedulerKind::Simple => Box::new(SimpleBsScheduler),
        DlSchedulerKind::Rtps => Box::new(RtpsBsScheduler),
    }
}

pub trait BsScheduler: Send {
    fn kind(&self) -> DlSchedulerKind;

    /// Builds the downlink subframe from the connection queues
    fn schedule(&mut self, ctx: &mut DlSchedCtx<'_>) -> DlSchedule;

    /// Next connection to serve in class order: initial ranging, broadcast, basic, primary,
    /// UGS that is due, rtPS, nrtPS, BE. Connections already served this frame are skipped.
    fn select_connection(&self, ctx: &DlSchedCtx<'_>, builder: &DlScheduleBuilder) -> Option<Cid> {
        let fresh = |cid: &Cid| !builder.is_done(*cid) && ctx.conns.get(*cid).is_some_and(|c| c.has_packets());
        for cid in [Cid::INITIAL_RANGING, Cid::BROADCAST] {
            if fresh(&cid) {
                return Some(cid);
            }
        }
        for cid_type in [CidType::Basic, CidType::Primary] {
            if let Some(c) = ctx.conns.connections_of_type(cid_type).map(|c| c.cid()).find(fresh) {
                return Some(c);
            }
        }
        if let Some(c) =
            connections_with_data(ctx, SchedulingType::Ugs).into_iter().find(|cid| fresh(cid) && ugs_due(ctx, *cid))
        {
            return Some(c);
        }
        [SchedulingType::Rtps, SchedulingType::Nrtps, SchedulingType::Be]
            .into_iter()
            .find_map(|st| connections_with_data(ctx, st).into_iter().find(fresh))
    }

    /// Burst for a UGS connection whose grant interval has elapsed, at most one grant's worth
    fn create_ugs_burst(&self, ctx: &mut DlSchedCtx<'_>, cid: Cid, max_symbols: u32) -> Option<DlBurst> {
        if !ugs_due(ctx, cid) {
            return None;
        }
        let (_, modulation) = burst_profile(ctx, cid);
        let sfid = ctx.conns.get(cid)?.sfid()?;
        let grant_size = ctx.flows.get(sfid)?.record().grant_size;
        let symbols = if grant_size > 0 { grant_size.min(max_symbols) } else { max_symbols };
        let burst = fill_burst(ctx, cid, symbols, false)?;
        if let Some(flow) = ctx.flows.get_mut(sfid) {
            flow.record_mut().dl_timestamp = Some(ctx.now);
        }
        Some(burst)
    }

    /// Appends a burst and its DL-MAP IE right after the previous burst
    fn add_downlink_burst(&self, builder: &mut DlScheduleBuilder, burst: DlBurst) {
        let ie = DlMapIe { cid: burst.cid, diuc: burst.diuc, preamble_present: false, start_time: builder.offset as u16 };
        tracing::debug!("dl burst {}: {} pdus, {} bytes, {} symbols", ie, burst.pdus.len(), burst.n_bytes(), burst.symbols);
        builder.offset += burst.symbols;
        builder.schedule.ies.push(ie);
        builder.schedule.bursts.push(burst);
    }

    /// Whether the head packet of `cid` may be split across frames
    fn check_for_fragmentation(&self, ctx: &DlSchedCtx<'_>, cid: Cid) -> bool {
        may_fragment(ctx, cid)
    }
}

fn may_fragment(ctx: &DlSchedCtx<'_>, cid: Cid) -> bool {
    ctx.conns.cid_type(cid) == Some(CidType::Transport)
        && connection_scheduling_type(ctx, cid).is_some_and(|st| st != SchedulingType::Ugs)
}

fn ugs_due(ctx: &DlSchedCtx<'_>, cid: Cid) -> bool {
    let Some(sfid) = ctx.conns.get(cid).and_then(|c| c.sfid()) else {
        return false;
    };
    let Some(rec) = ctx.flows.get(sfid).map(|f| f.record()) else {
        return false;
    };
    rec.dl_timestamp.is_none_or(|t| ctx.now >= t + rec.grant_interval)
}

/// Dequeues PDUs of `cid` into a burst of at most `max_symbols`, fragmenting the last
/// packet when allowed and more than the fragment overhead is left. Updates the sent
/// counters of the bound flow. None when nothing could be sent.
pub fn fill_burst(ctx: &mut DlSchedCtx<'_>, cid: Cid, max_symbols: u32, fragment: bool) -> Option<DlBurst> {
    let (diuc, modulation) = burst_profile(ctx, cid);
    let fragment = fragment && may_fragment(ctx, cid);
    let capacity = ctx.phy.nr_bytes(max_symbols, modulation) as usize;
    let conn = ctx.conns.get_mut(cid)?;
    let sfid = conn.sfid();

    let mut pdus = Vec::new();
    let mut used = 0usize;
    while !conn.queue().is_empty_of(MacHeaderType::Generic) {
        let left = capacity - used;
        let required = conn.queue().first_packet_required_bytes(MacHeaderType::Generic);
        let pdu = if required <= left {
            conn.queue_mut().dequeue(MacHeaderType::Generic)
        } else if fragment && left > FRAGMENT_OVERHEAD {
            conn.queue_mut().dequeue_bytes(MacHeaderType::Generic, left)
        } else {
            None
        };
        let Some(pdu) = pdu else { break };
        used += pdu.serialized_size();
        pdus.push(pdu);
    }
    if pdus.is_empty() {
        return None;
    }

    if let Some(flow) = sfid.and_then(|sfid| ctx.flows.get_mut(sfid)) {
        let rec = flow.record_mut();
        for pdu in &pdus {
            rec.bytes_sent += pdu.payload.len() as u64;
            if pdu.frag.is_none_or(|f| f.fc == FragmentationControl::Last) {
                rec.pkts_sent += 1;
            }
        }
    }
    let symbols = ctx.phy.nr_symbols(used as u32, modulation);
    Some(DlBurst { cid, diuc, modulation, pdus, symbols })
}

/// Reserves the DL-MAP and returns a builder for the remaining subframe
pub fn start_schedule(ctx: &mut DlSchedCtx<'_>) -> DlScheduleBuilder {
    drop_expired(ctx);
    let candidates = ctx.conns_with_packets();
    let dl_map_symbols = dl_map_symbols(candidates, ctx.phy);
    DlScheduleBuilder::new(dl_map_symbols, ctx.nr_dl_symbols)
}

impl DlSchedCtx<'_> {
    fn conns_with_packets(&self) -> usize {
        [CidType::InitialRanging, CidType::Broadcast, CidType::Basic, CidType::Primary, CidType::Transport]
            .into_iter()
            .map(|t| self.conns.connections_of_type(t).filter(|c| c.has_packets()).count())
            .sum()
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use wimax_config::StackConfig;
    use wimax_core::{Cid, CidFactory, CidType, MacAddress, ModulationType, SchedulingType, SfDirection, SimTime};
    use wimax_pdus::mgmt::RangingStatus;
    use wimax_pdus::sflow::ServiceFlowParams;

    use crate::bs::ss_manager::SsManager;
    use crate::bs::ss_record::SsRecord;
    use crate::mac::{ConnectionManager, Packet};
    use crate::phy::SimpleOfdmPhy;
    use crate::sflow::service_flow::{ServiceFlow, SfState};
    use crate::sflow::sf_manager::ServiceFlowManager;

    pub struct DlFixture {
        pub cfg: StackConfig,
        pub phy: SimpleOfdmPhy,
        pub ss_mgr: SsManager,
        pub flows: ServiceFlowManager,
        pub conns: ConnectionManager,
        next_sfid: u32,
    }

    impl DlFixture {
        pub fn new() -> Self {
            let cfg = StackConfig::default();
            let phy = SimpleOfdmPhy::new(&cfg.phy);
            DlFixture {
                phy,
                ss_mgr: SsManager::new(),
                flows: ServiceFlowManager::new(),
                conns: ConnectionManager::new_bs(CidFactory::new(16), cfg.mac.queue_max_bytes),
                cfg,
                next_sfid: 1,
            }
        }

        pub fn add_ss(&mut self, n: u32, modulation: ModulationType) -> Cid {
            let basic = self.conns.allocate(CidType::Basic).unwrap();
            let primary = self.conns.allocate(CidType::Primary).unwrap();
            let mut ss = SsRecord::new(MacAddress::from_index(n), basic, primary);
            ss.ranging_status = RangingStatus::Success;
            ss.modulation = modulation;
            self.ss_mgr.register(ss).unwrap();
            basic
        }

        /// Active downlink flow of the station owning `basic` with `packets` queued
        pub fn add_flow(&mut self, basic: Cid, st: SchedulingType, packets: &[usize]) -> Cid {
            let cid = self.conns.allocate(CidType::Transport).unwrap();
            let sfid = self.next_sfid;
            self.next_sfid += 1;
            let mut params = ServiceFlowParams::new(SfDirection::Down, st);
            params.sfid = sfid;
            params.cid = cid.id();
            let mut flow = ServiceFlow::new(params);
            flow.set_state(SfState::Active);
            self.flows.add(flow).unwrap();
            self.conns.bind_service_flow(cid, sfid).unwrap();
            self.ss_mgr.get_by_cid_mut(basic).unwrap().add_sfid(sfid);
            for &len in packets {
                self.conns.get_mut(cid).unwrap().enqueue(Packet::new(vec![0xAB; len]), SimTime::ZERO);
            }
            cid
        }
    }
}
