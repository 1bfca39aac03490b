use std::collections::BTreeMap;

use wimax_config::StackConfig;
use wimax_core::{Cid, CidType, EventId, EventTimer, MacAddress, ModulationType, SchedulingType, SfDirection, Sfid, SimTime};
use wimax_pdus::mgmt::{DsaAck, DsaReq, DsaRsp};
use wimax_pdus::sflow::{ConfirmationCode, CsSpecification, ServiceFlowParams};

use crate::bs::ss_manager::SsManager;
use crate::bs::ss_record::SsRecord;
use crate::mac::ConnectionManager;
use crate::phy::WimaxPhy;
use crate::sflow::ServiceFlowErr;
use crate::sflow::service_flow::{ServiceFlow, SfState};
use crate::sflow::sf_manager::ServiceFlowManager;
use crate::ulsched::UplinkScheduler;

/// Station-dependent inputs of admission control
pub struct DsaReqCtx<'a> {
    pub phy: &'a dyn WimaxPhy,
    pub modulation: ModulationType,
}

/// A DSA-RSP waiting for its DSA-ACK
#[derive(Debug, Clone, Copy)]
struct PendingAck {
    event: EventId,
    /// None when the response was a reject
    sfid: Option<Sfid>,
}

type TransactionKey = (MacAddress, u16);

/// Base station side of DSA: admission, SFID and transport CID assignment, DSA-RSP
/// retransmission until acknowledged
pub struct BsServiceFlowManager {
    flows: ServiceFlowManager,
    next_sfid: Sfid,
    nr_ul_symbols: u32,
    ack_timeout: SimTime,
    max_rsp_retries: u8,
    timers: EventTimer<TransactionKey>,
    pending: BTreeMap<TransactionKey, PendingAck>,
    /// Responses already sent, answered again on a retransmitted DSA-REQ
    responses: BTreeMap<TransactionKey, DsaRsp>,
}

impl BsServiceFlowManager {
    pub fn new(cfg: &StackConfig) -> Self {
        BsServiceFlowManager {
            flows: ServiceFlowManager::new(),
            next_sfid: 1,
            nr_ul_symbols: cfg.phy.nr_ul_symbols,
            ack_timeout: SimTime::from_ms(cfg.mac.dsa_ack_timeout_ms),
            max_rsp_retries: cfg.mac.max_dsa_rsp_retries,
            timers: EventTimer::new(),
            pending: BTreeMap::new(),
            responses: BTreeMap::new(),
        }
    }

    pub fn flows(&self) -> &ServiceFlowManager {
        &self.flows
    }

    pub fn flows_mut(&mut self) -> &mut ServiceFlowManager {
        &mut self.flows
    }

    /// Uplink symbols per frame that admitted UGS flows already hold
    fn ugs_load(&self, phy: &dyn WimaxPhy, modulation: ModulationType) -> u32 {
        self.flows
            .flows_in_direction(SfDirection::Up)
            .filter(|f| f.scheduling_type() == SchedulingType::Ugs)
            .map(|f| ugs_symbols_per_frame(f.params(), phy, modulation))
            .sum()
    }

    /// Validates a requested flow and registers it as Admitted on a new transport
    /// connection. Nothing is registered when the request is rejected.
    pub fn process_dsa_req(
        &mut self,
        req: &DsaReq,
        conns: &mut ConnectionManager,
        ctx: &DsaReqCtx<'_>,
    ) -> Result<Sfid, ConfirmationCode> {
        let sf = &req.service_flow;
        match sf.scheduling_type {
            SchedulingType::Be | SchedulingType::Nrtps | SchedulingType::Rtps | SchedulingType::Ugs => {}
            other => {
                tracing::warn!("DSA-REQ {}: unsupported scheduling type {}", req.transaction_id, other);
                return Err(ConfirmationCode::RejectUnrecognizedConfiguration);
            }
        }
        if sf.cs_specification != CsSpecification::Ipv4 {
            tracing::warn!("DSA-REQ {}: unsupported CS {:?}", req.transaction_id, sf.cs_specification);
            return Err(ConfirmationCode::RejectUnrecognizedConfiguration);
        }
        if sf.max_sustained_rate > 0 && sf.min_reserved_rate > sf.max_sustained_rate {
            tracing::warn!(
                "DSA-REQ {}: min rate {} above max rate {}",
                req.transaction_id,
                sf.min_reserved_rate,
                sf.max_sustained_rate
            );
            return Err(ConfirmationCode::RejectUnrecognizedConfiguration);
        }
        if sf.direction == SfDirection::Up && sf.scheduling_type == SchedulingType::Ugs {
            let load = self.ugs_load(ctx.phy, ctx.modulation);
            let needed = ugs_symbols_per_frame(sf, ctx.phy, ctx.modulation);
            if load + needed > self.nr_ul_symbols {
                tracing::warn!(
                    "DSA-REQ {}: UGS needs {} symbols, {} of {} taken",
                    req.transaction_id,
                    needed,
                    load,
                    self.nr_ul_symbols
                );
                return Err(ConfirmationCode::RejectTemporary);
            }
        }

        let cid = match conns.allocate(CidType::Transport) {
            Ok(cid) => cid,
            Err(e) => {
                tracing::warn!("DSA-REQ {}: no transport cid: {:?}", req.transaction_id, e);
                return Err(ConfirmationCode::RejectTemporary);
            }
        };
        let sfid = self.next_sfid;
        let mut params = sf.clone();
        params.sfid = sfid;
        params.cid = cid.id();
        let mut flow = ServiceFlow::new(params);
        flow.set_state(SfState::Admitted);
        if self.flows.add(flow).is_err() || conns.bind_service_flow(cid, sfid).is_err() {
            self.flows.remove(sfid);
            let _ = conns.remove(cid);
            return Err(ConfirmationCode::RejectOther);
        }
        self.next_sfid += 1;
        Ok(sfid)
    }

    /// Answers a DSA-REQ received on `cid` and arms the DSA-ACK timeout. A retransmitted
    /// request gets the cached response without a second allocation.
    #[allow(clippy::too_many_arguments)]
    pub fn allocate_service_flows(
        &mut self,
        req: &DsaReq,
        cid: Cid,
        now: SimTime,
        ss_mgr: &mut SsManager,
        conns: &mut ConnectionManager,
        ul_sched: &mut dyn UplinkScheduler,
        phy: &dyn WimaxPhy,
    ) -> Result<DsaRsp, ServiceFlowErr> {
        let ss = ss_mgr.get_by_cid_mut(cid).ok_or(ServiceFlowErr::UnknownStation { cid })?;
        let key = (ss.mac_address, req.transaction_id);
        if let Some(rsp) = self.responses.get(&key) {
            tracing::debug!("DSA-REQ {} from {} already answered", req.transaction_id, ss.mac_address);
            return Ok(rsp.clone());
        }

        let ctx = DsaReqCtx { phy, modulation: ss.modulation };
        let rsp = match self.process_dsa_req(req, conns, &ctx) {
            Ok(sfid) => {
                ss.add_sfid(sfid);
                let flow = self.flows.get_mut(sfid).ok_or(ServiceFlowErr::NotFound { sfid })?;
                ul_sched.setup_service_flow(flow, ss.modulation, phy);
                tracing::info!("{}: admitted {}", ss.mac_address, flow);
                DsaRsp {
                    transaction_id: req.transaction_id,
                    confirmation_code: ConfirmationCode::Success,
                    service_flow: flow.params().clone(),
                }
            }
            Err(code) => DsaRsp {
                transaction_id: req.transaction_id,
                confirmation_code: code,
                service_flow: req.service_flow.clone(),
            },
        };

        ss.dsa_rsp_retries = 0;
        let sfid = (rsp.confirmation_code == ConfirmationCode::Success).then_some(rsp.service_flow.sfid);
        let event = self.timers.arm(now + self.ack_timeout, key);
        self.pending.insert(key, PendingAck { event, sfid });
        self.responses.insert(key, rsp.clone());
        Ok(rsp)
    }

    /// Retransmits unacknowledged DSA-RSPs. Returns them with the primary CID to send on.
    /// Once the retries are spent the flow is removed and its CID freed.
    pub fn poll_timeouts(
        &mut self,
        now: SimTime,
        ss_mgr: &mut SsManager,
        conns: &mut ConnectionManager,
    ) -> Vec<(Cid, DsaRsp)> {
        let mut out = Vec::new();
        for (_, key) in self.timers.poll_expired(now) {
            let Some(pending) = self.pending.get(&key).copied() else { continue };
            let Some(ss) = ss_mgr.get_by_mac_mut(key.0) else {
                self.pending.remove(&key);
                continue;
            };
            if ss.dsa_rsp_retries < self.max_rsp_retries {
                ss.dsa_rsp_retries += 1;
                let event = self.timers.arm(now + self.ack_timeout, key);
                self.pending.insert(key, PendingAck { event, ..pending });
                if let Some(rsp) = self.responses.get(&key) {
                    tracing::debug!("DSA-RSP {} to {} unacknowledged, retry {}", key.1, key.0, ss.dsa_rsp_retries);
                    out.push((ss.primary_cid, rsp.clone()));
                }
                continue;
            }

            tracing::warn!("DSA-RSP {} to {} never acknowledged, dropping flow", key.1, key.0);
            self.pending.remove(&key);
            self.responses.remove(&key);
            if let Some(sfid) = pending.sfid {
                ss.remove_sfid(sfid);
                if let Some(flow) = self.flows.remove(sfid)
                    && let Err(e) = conns.remove(flow.cid())
                {
                    tracing::warn!("removing cid {} of sfid {}: {:?}", flow.cid(), sfid, e);
                }
            }
        }
        out
    }

    /// Closes a transaction and forgets its cached response. Returns the SFID that became
    /// active, None for an acknowledged reject. A repeated DSA-ACK is an unknown transaction.
    pub fn process_dsa_ack(
        &mut self,
        ack: &DsaAck,
        cid: Cid,
        ss_mgr: &SsManager,
    ) -> Result<Option<Sfid>, ServiceFlowErr> {
        let ss = ss_mgr.get_by_cid(cid).ok_or(ServiceFlowErr::UnknownStation { cid })?;
        let key = (ss.mac_address, ack.transaction_id);
        let Some(pending) = self.pending.remove(&key) else {
            return Err(ServiceFlowErr::UnknownTransaction { transaction_id: ack.transaction_id });
        };
        self.timers.cancel(pending.event);
        self.responses.remove(&key);
        let Some(sfid) = pending.sfid else {
            return Ok(None);
        };
        let flow = self.flows.get_mut(sfid).ok_or(ServiceFlowErr::NotFound { sfid })?;
        flow.set_state(SfState::Active);
        tracing::info!("{}: {} active", ss.mac_address, flow);
        Ok(Some(sfid))
    }

    /// Drops everything held for a station that left: open transactions, cached
    /// responses, and its flows with their transport connections
    pub fn remove_station(&mut self, ss: &SsRecord, conns: &mut ConnectionManager) {
        let mac = ss.mac_address;
        let keys: Vec<_> = self.pending.keys().filter(|(m, _)| *m == mac).copied().collect();
        for key in keys {
            if let Some(pending) = self.pending.remove(&key) {
                self.timers.cancel(pending.event);
            }
        }
        self.responses.retain(|(m, _), _| *m != mac);
        for &sfid in ss.sfids() {
            if let Some(flow) = self.flows.remove(sfid)
                && let Err(e) = conns.remove(flow.cid())
            {
                tracing::warn!("removing cid {} of sfid {}: {:?}", flow.cid(), sfid, e);
            }
        }
        tracing::debug!("{}: service flows removed", mac);
    }
}

/// Symbols per frame a UGS flow needs at its minimum reserved rate
fn ugs_symbols_per_frame(sf: &ServiceFlowParams, phy: &dyn WimaxPhy, modulation: ModulationType) -> u32 {
    let bytes = (sf.min_reserved_rate as u64 * phy.frame_duration().as_us() / 8_000_000) as u32;
    phy.nr_symbols(bytes, modulation)
}

#[cfg(test)]
mod tests {
    use wimax_core::CidFactory;

    use super::*;
    use crate::phy::SimpleOfdmPhy;
    use crate::ulsched::new_uplink_scheduler;

    struct Fixture {
        cfg: StackConfig,
        phy: SimpleOfdmPhy,
        mgr: BsServiceFlowManager,
        ss_mgr: SsManager,
        conns: ConnectionManager,
        ul_sched: Box<dyn UplinkScheduler>,
        basic: Cid,
    }

    fn fixture() -> Fixture {
        let cfg = StackConfig::default();
        let phy = SimpleOfdmPhy::new(&cfg.phy);
        let mut conns = ConnectionManager::new_bs(CidFactory::new(16), 4096);
        let basic = conns.allocate(CidType::Basic).unwrap();
        let primary = conns.allocate(CidType::Primary).unwrap();
        let mut ss_mgr = SsManager::new();
        ss_mgr.register(SsRecord::new(MacAddress::from_index(1), basic, primary)).unwrap();
        let ul_sched = new_uplink_scheduler(&cfg, &phy);
        let mgr = BsServiceFlowManager::new(&cfg);
        Fixture { cfg, phy, mgr, ss_mgr, conns, ul_sched, basic }
    }

    fn req(transaction_id: u16, st: SchedulingType) -> DsaReq {
        DsaReq { transaction_id, service_flow: ServiceFlowParams::new(SfDirection::Up, st) }
    }

    impl Fixture {
        fn allocate(&mut self, req: &DsaReq, now: SimTime) -> DsaRsp {
            self.mgr
                .allocate_service_flows(req, self.basic, now, &mut self.ss_mgr, &mut self.conns, self.ul_sched.as_mut(), &self.phy)
                .unwrap()
        }
    }

    #[test]
    fn test_admission_and_ack() {
        let mut f = fixture();
        let rsp = f.allocate(&req(1, SchedulingType::Be), SimTime::ZERO);
        assert_eq!(rsp.confirmation_code, ConfirmationCode::Success);
        let sfid = rsp.service_flow.sfid;
        let cid = Cid::new(rsp.service_flow.cid);
        assert_eq!(f.conns.cid_type(cid), Some(CidType::Transport));
        assert_eq!(f.conns.get(cid).unwrap().sfid(), Some(sfid));
        assert_eq!(f.mgr.flows().get(sfid).unwrap().state(), SfState::Admitted);
        assert_eq!(f.ss_mgr.get_by_cid(f.basic).unwrap().sfids(), &[sfid]);

        // Retransmitted request: same answer, no second flow
        assert_eq!(f.allocate(&req(1, SchedulingType::Be), SimTime::from_ms(10)), rsp);
        assert_eq!(f.mgr.flows().len(), 1);

        let ack = DsaAck { transaction_id: 1, confirmation_code: ConfirmationCode::Success };
        assert_eq!(f.mgr.process_dsa_ack(&ack, f.basic, &f.ss_mgr), Ok(Some(sfid)));
        assert!(f.mgr.flows().get(sfid).unwrap().is_active());
        assert!(f.mgr.responses.is_empty(), "acknowledged response forgotten");
        assert_eq!(
            f.mgr.process_dsa_ack(&ack, f.basic, &f.ss_mgr),
            Err(ServiceFlowErr::UnknownTransaction { transaction_id: 1 })
        );
        assert!(f.mgr.poll_timeouts(SimTime::from_ms(500), &mut f.ss_mgr, &mut f.conns).is_empty());
    }

    #[test]
    fn test_rejects_register_nothing() {
        let mut f = fixture();
        let live = f.conns.factory().unwrap().num_live();

        let rsp = f.allocate(&req(1, SchedulingType::Undef), SimTime::ZERO);
        assert_eq!(rsp.confirmation_code, ConfirmationCode::RejectUnrecognizedConfiguration);

        let mut bad_rates = req(2, SchedulingType::Rtps);
        bad_rates.service_flow.min_reserved_rate = 2000;
        bad_rates.service_flow.max_sustained_rate = 1000;
        assert_eq!(f.allocate(&bad_rates, SimTime::ZERO).confirmation_code, ConfirmationCode::RejectUnrecognizedConfiguration);

        // 100 Mbit/s of UGS cannot fit the uplink subframe
        let mut greedy = req(3, SchedulingType::Ugs);
        greedy.service_flow.min_reserved_rate = 100_000_000;
        assert_eq!(f.allocate(&greedy, SimTime::ZERO).confirmation_code, ConfirmationCode::RejectTemporary);

        assert!(f.mgr.flows().is_empty());
        assert_eq!(f.conns.factory().unwrap().num_live(), live);
        assert!(f.ss_mgr.get_by_cid(f.basic).unwrap().sfids().is_empty());
    }

    #[test]
    fn test_removed_station_leaves_nothing_behind() {
        let mut f = fixture();
        let acked = f.allocate(&req(1, SchedulingType::Be), SimTime::ZERO);
        let open = f.allocate(&req(2, SchedulingType::Rtps), SimTime::ZERO);
        let ack = DsaAck { transaction_id: 1, confirmation_code: ConfirmationCode::Success };
        f.mgr.process_dsa_ack(&ack, f.basic, &f.ss_mgr).unwrap();
        assert_eq!(f.mgr.responses.len(), 1);

        let record = f.ss_mgr.remove(MacAddress::from_index(1)).unwrap();
        f.mgr.remove_station(&record, &mut f.conns);
        assert!(f.mgr.flows().is_empty());
        assert!(f.mgr.pending.is_empty());
        assert!(f.mgr.responses.is_empty());
        for rsp in [acked, open] {
            assert!(!f.conns.contains(Cid::new(rsp.service_flow.cid)));
        }
        assert!(f.mgr.poll_timeouts(SimTime::from_ms(500), &mut f.ss_mgr, &mut f.conns).is_empty());
    }

    #[test]
    fn test_unacknowledged_rsp_removes_flow() {
        let mut f = fixture();
        let rsp = f.allocate(&req(1, SchedulingType::Rtps), SimTime::ZERO);
        let cid = Cid::new(rsp.service_flow.cid);
        let timeout = f.cfg.mac.dsa_ack_timeout_ms;

        let mut retransmissions = 0;
        for n in 1..=10u64 {
            for (send_cid, again) in f.mgr.poll_timeouts(SimTime::from_ms(n * timeout), &mut f.ss_mgr, &mut f.conns) {
                assert_eq!(send_cid, f.ss_mgr.get_by_cid(f.basic).unwrap().primary_cid);
                assert_eq!(again, rsp);
                retransmissions += 1;
            }
        }
        assert_eq!(retransmissions, f.cfg.mac.max_dsa_rsp_retries as usize);
        assert!(f.mgr.flows().is_empty());
        assert!(!f.conns.contains(cid));
        assert!(!f.conns.factory().unwrap().is_live(cid));
        assert!(f.ss_mgr.get_by_cid(f.basic).unwrap().sfids().is_empty());
    }
}
