use wimax_config::CfgMac;
use wimax_core::{EventId, EventTimer, SfDirection, Sfid, SimTime};
use wimax_pdus::mgmt::{DsaAck, DsaReq, DsaRsp};
use wimax_pdus::sflow::{ConfirmationCode, FiveTuple, ServiceFlowParams};

use crate::sflow::ServiceFlowErr;
use crate::sflow::classifier::IpcsClassifier;
use crate::sflow::service_flow::{ServiceFlow, SfState};
use crate::sflow::sf_manager::ServiceFlowManager;

/// Negotiation progress of one requested flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DsaState {
    Pending,
    AwaitingRsp { transaction_id: u16, event: EventId, retransmissions: u8 },
    Done { transaction_id: u16, sfid: Sfid },
    /// Rejected or unanswered. Never retried.
    Failed,
}

/// Final result of a negotiation, reported once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DsaOutcome {
    Admitted { sfid: Sfid },
    Rejected { code: ConfirmationCode },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DsaTimeoutAction {
    Retransmit(DsaReq),
    GaveUp { transaction_id: u16, outcome: DsaOutcome },
}

#[derive(Debug, Clone)]
struct DsaEntry {
    params: ServiceFlowParams,
    state: DsaState,
}

/// Subscriber side of DSA. Requests are negotiated one at a time in the order they were added.
pub struct SsServiceFlowManager {
    entries: Vec<DsaEntry>,
    flows: ServiceFlowManager,
    timers: EventTimer<u16>,
    next_transaction_id: u16,
    rsp_timeout: SimTime,
    max_req_retries: u8,
}

impl SsServiceFlowManager {
    pub fn new(cfg: &CfgMac) -> Self {
        SsServiceFlowManager {
            entries: Vec::new(),
            flows: ServiceFlowManager::new(),
            timers: EventTimer::new(),
            next_transaction_id: 1,
            rsp_timeout: SimTime::from_ms(cfg.dsa_rsp_timeout_ms),
            max_req_retries: cfg.max_dsa_req_retries,
        }
    }

    /// Queues a flow for negotiation. SFID and CID are assigned by the BS.
    pub fn add_requested_flow(&mut self, params: ServiceFlowParams) {
        self.entries.push(DsaEntry { params, state: DsaState::Pending });
    }

    pub fn states(&self) -> impl Iterator<Item = DsaState> + '_ {
        self.entries.iter().map(|e| e.state)
    }

    pub fn flows(&self) -> &ServiceFlowManager {
        &self.flows
    }

    pub fn flows_mut(&mut self) -> &mut ServiceFlowManager {
        &mut self.flows
    }

    fn awaiting(&self) -> Option<&DsaEntry> {
        self.entries.iter().find(|e| matches!(e.state, DsaState::AwaitingRsp { .. }))
    }

    /// Timer of the outstanding DSA-REQ, if any
    pub fn dsa_rsp_timeout_event(&self) -> Option<EventId> {
        match self.awaiting()?.state {
            DsaState::AwaitingRsp { event, .. } => Some(event),
            _ => None,
        }
    }

    /// True once no flow is pending or awaiting a response
    pub fn all_negotiated(&self) -> bool {
        self.entries.iter().all(|e| matches!(e.state, DsaState::Done { .. } | DsaState::Failed))
    }

    /// DSA-REQ for the next pending flow. None while a request is outstanding.
    pub fn schedule_dsa_req(&mut self, now: SimTime) -> Option<DsaReq> {
        if self.awaiting().is_some() {
            return None;
        }
        let idx = self.entries.iter().position(|e| e.state == DsaState::Pending)?;
        let transaction_id = self.next_transaction_id;
        self.next_transaction_id = self.next_transaction_id.wrapping_add(1).max(1);
        let event = self.timers.arm(now + self.rsp_timeout, transaction_id);
        let entry = &mut self.entries[idx];
        entry.state = DsaState::AwaitingRsp { transaction_id, event, retransmissions: 0 };
        Some(DsaReq { transaction_id, service_flow: entry.params.clone() })
    }

    /// Retransmits unanswered requests, failing a flow once its retries are spent
    pub fn poll_timeouts(&mut self, now: SimTime) -> Vec<DsaTimeoutAction> {
        let mut actions = Vec::new();
        for (_, transaction_id) in self.timers.poll_expired(now) {
            let Some(entry) = self.entries.iter_mut().find(
                |e| matches!(e.state, DsaState::AwaitingRsp { transaction_id: t, .. } if t == transaction_id),
            ) else {
                continue;
            };
            let DsaState::AwaitingRsp { retransmissions, .. } = entry.state else {
                continue;
            };
            if retransmissions >= self.max_req_retries {
                tracing::warn!(
                    "DSA-REQ {} unanswered after {} retransmissions, giving up",
                    transaction_id,
                    retransmissions
                );
                entry.state = DsaState::Failed;
                actions.push(DsaTimeoutAction::GaveUp { transaction_id, outcome: DsaOutcome::Failed });
                continue;
            }
            let event = self.timers.arm(now + self.rsp_timeout, transaction_id);
            entry.state = DsaState::AwaitingRsp { transaction_id, event, retransmissions: retransmissions + 1 };
            tracing::debug!("DSA-REQ {} timed out, retransmission {}", transaction_id, retransmissions + 1);
            actions.push(DsaTimeoutAction::Retransmit(DsaReq { transaction_id, service_flow: entry.params.clone() }));
        }
        actions
    }

    /// Handles a DSA-RSP. Returns the DSA-ACK to send and, the first time a transaction
    /// is answered, its outcome. A repeated DSA-RSP is acknowledged again without an outcome.
    pub fn process_dsa_rsp(&mut self, rsp: &DsaRsp) -> Result<(DsaAck, Option<DsaOutcome>), ServiceFlowErr> {
        let transaction_id = rsp.transaction_id;
        let ack = DsaAck { transaction_id, confirmation_code: ConfirmationCode::Success };
        let Some(idx) = self.entries.iter().position(|e| match e.state {
            DsaState::AwaitingRsp { transaction_id: t, .. } | DsaState::Done { transaction_id: t, .. } => {
                t == transaction_id
            }
            _ => false,
        }) else {
            tracing::warn!("DSA-RSP for unknown transaction {}", transaction_id);
            return Err(ServiceFlowErr::UnknownTransaction { transaction_id });
        };

        let DsaState::AwaitingRsp { event, .. } = self.entries[idx].state else {
            tracing::debug!("repeated DSA-RSP {}, acknowledging again", transaction_id);
            return Ok((ack, None));
        };
        self.timers.cancel(event);

        if rsp.confirmation_code != ConfirmationCode::Success {
            tracing::warn!("DSA-REQ {} rejected: {:?}", transaction_id, rsp.confirmation_code);
            self.entries[idx].state = DsaState::Failed;
            return Ok((ack, Some(DsaOutcome::Rejected { code: rsp.confirmation_code })));
        }

        let sfid = rsp.service_flow.sfid;
        let mut flow = ServiceFlow::new(rsp.service_flow.clone());
        flow.set_state(SfState::Admitted);
        if let Err(e) = self.flows.add(flow) {
            tracing::warn!("DSA-RSP {}: {}", transaction_id, e);
            self.entries[idx].state = DsaState::Failed;
            return Ok((ack, Some(DsaOutcome::Failed)));
        }
        self.entries[idx].state = DsaState::Done { transaction_id, sfid };
        tracing::info!("DSA-REQ {} admitted as sfid {} on cid {}", transaction_id, sfid, rsp.service_flow.cid);
        Ok((ack, Some(DsaOutcome::Admitted { sfid })))
    }

    /// Marks an admitted flow active, called once its DSA-ACK is queued
    pub fn activate(&mut self, sfid: Sfid) -> Result<(), ServiceFlowErr> {
        let flow = self.flows.get_mut(sfid).ok_or(ServiceFlowErr::NotFound { sfid })?;
        flow.set_state(SfState::Active);
        tracing::info!("{} active", flow);
        Ok(())
    }

    /// Uplink flow for an outgoing packet. Unmatched packets fall back to the first
    /// active BE flow.
    pub fn classify(&self, tuple: &FiveTuple) -> Option<Sfid> {
        if let Some(sfid) = IpcsClassifier::classify(tuple, &self.flows, SfDirection::Up)
            && self.flows.get(sfid).is_some_and(|f| f.is_active())
        {
            return Some(sfid);
        }
        self.flows
            .flows_in_direction(SfDirection::Up)
            .find(|f| f.is_active() && f.scheduling_type() == wimax_core::SchedulingType::Be)
            .map(|f| f.sfid())
    }
}

#[cfg(test)]
mod tests {
    use wimax_core::SchedulingType;

    use super::*;

    fn manager() -> SsServiceFlowManager {
        let cfg = CfgMac::default();
        let mut mgr = SsServiceFlowManager::new(&cfg);
        mgr.add_requested_flow(ServiceFlowParams::new(SfDirection::Up, SchedulingType::Ugs));
        mgr.add_requested_flow(ServiceFlowParams::new(SfDirection::Down, SchedulingType::Be));
        mgr
    }

    fn success_rsp(req: &DsaReq, sfid: Sfid, cid: u16) -> DsaRsp {
        let mut service_flow = req.service_flow.clone();
        service_flow.sfid = sfid;
        service_flow.cid = cid;
        DsaRsp { transaction_id: req.transaction_id, confirmation_code: ConfirmationCode::Success, service_flow }
    }

    #[test]
    fn test_three_retransmissions_then_failure() {
        let mut mgr = manager();
        let req = mgr.schedule_dsa_req(SimTime::ZERO).unwrap();
        let mut retransmissions = 0;
        let mut outcomes = Vec::new();
        for frame in 1..=40u64 {
            for action in mgr.poll_timeouts(SimTime::from_ms(frame * 10)) {
                match action {
                    DsaTimeoutAction::Retransmit(r) => {
                        assert_eq!(r, req, "retransmission repeats the original request");
                        retransmissions += 1;
                    }
                    DsaTimeoutAction::GaveUp { outcome, .. } => outcomes.push(outcome),
                }
            }
        }
        assert_eq!(retransmissions, 3);
        assert_eq!(outcomes, vec![DsaOutcome::Failed]);
        assert_eq!(mgr.states().next(), Some(DsaState::Failed));
        assert!(mgr.dsa_rsp_timeout_event().is_none());
    }

    #[test]
    fn test_one_request_at_a_time() {
        let mut mgr = manager();
        let first = mgr.schedule_dsa_req(SimTime::ZERO).unwrap();
        assert!(mgr.schedule_dsa_req(SimTime::from_ms(10)).is_none());
        let event = mgr.dsa_rsp_timeout_event().unwrap();

        let (ack, outcome) = mgr.process_dsa_rsp(&success_rsp(&first, 1, 2000)).unwrap();
        assert_eq!(ack.transaction_id, first.transaction_id);
        assert_eq!(outcome, Some(DsaOutcome::Admitted { sfid: 1 }));
        assert!(!mgr.timers.is_armed(event), "response cancels the timeout");
        assert_eq!(mgr.flows().get(1).unwrap().state(), SfState::Admitted);
        mgr.activate(1).unwrap();
        assert!(mgr.flows().get(1).unwrap().is_active());

        let second = mgr.schedule_dsa_req(SimTime::from_ms(20)).unwrap();
        assert_ne!(second.transaction_id, first.transaction_id);
        assert_eq!(second.service_flow.direction, SfDirection::Down);
        assert!(!mgr.all_negotiated());
    }

    #[test]
    fn test_repeated_rsp_reacked_and_reject_fails() {
        let mut mgr = manager();
        let first = mgr.schedule_dsa_req(SimTime::ZERO).unwrap();
        let rsp = success_rsp(&first, 1, 2000);
        assert!(mgr.process_dsa_rsp(&rsp).unwrap().1.is_some());
        let (ack, outcome) = mgr.process_dsa_rsp(&rsp).unwrap();
        assert_eq!(ack.transaction_id, first.transaction_id);
        assert_eq!(outcome, None);

        let second = mgr.schedule_dsa_req(SimTime::from_ms(10)).unwrap();
        let reject = DsaRsp { confirmation_code: ConfirmationCode::RejectTemporary, ..success_rsp(&second, 0, 0) };
        let (_, outcome) = mgr.process_dsa_rsp(&reject).unwrap();
        assert_eq!(outcome, Some(DsaOutcome::Rejected { code: ConfirmationCode::RejectTemporary }));
        assert!(mgr.all_negotiated());
        assert!(mgr.schedule_dsa_req(SimTime::from_ms(20)).is_none());

        assert_eq!(
            mgr.process_dsa_rsp(&DsaRsp { transaction_id: 99, ..rsp }),
            Err(ServiceFlowErr::UnknownTransaction { transaction_id: 99 })
        );
    }
}
