use core::fmt;

use wimax_core::{Cid, SchedulingType, SfDirection, Sfid, SimTime};
use wimax_pdus::sflow::{IpcsClassifierRecord, ServiceFlowParams};

use crate::sflow::sf_record::ServiceFlowRecord;

/// Life cycle of a service flow. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SfState {
    Provisioned,
    Admitted,
    Active,
}

impl fmt::Display for SfState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SfState::Provisioned => write!(f, "Provisioned"),
            SfState::Admitted => write!(f, "Admitted"),
            SfState::Active => write!(f, "Active"),
        }
    }
}

/// A QoS contract bound to one transport connection
#[derive(Debug, Clone)]
pub struct ServiceFlow {
    params: ServiceFlowParams,
    state: SfState,
    record: ServiceFlowRecord,
}

impl ServiceFlow {
    pub fn new(params: ServiceFlowParams) -> Self {
        ServiceFlow { params, state: SfState::Provisioned, record: ServiceFlowRecord::new() }
    }

    pub fn sfid(&self) -> Sfid {
        self.params.sfid
    }

    pub fn cid(&self) -> Cid {
        Cid::new(self.params.cid)
    }

    pub fn direction(&self) -> SfDirection {
        self.params.direction
    }

    pub fn scheduling_type(&self) -> SchedulingType {
        self.params.scheduling_type
    }

    pub fn params(&self) -> &ServiceFlowParams {
        &self.params
    }

    pub fn state(&self) -> SfState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SfState::Active
    }

    /// Moves the flow forward. Returns false, leaving the state unchanged, on a downgrade.
    pub fn set_state(&mut self, state: SfState) -> bool {
        if state < self.state {
            tracing::warn!("sfid {}: refusing state change {} -> {}", self.sfid(), self.state, state);
            return false;
        }
        if state != self.state {
            tracing::debug!("sfid {}: {} -> {}", self.sfid(), self.state, state);
        }
        self.state = state;
        true
    }

    pub fn record(&self) -> &ServiceFlowRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut ServiceFlowRecord {
        &mut self.record
    }

    pub fn classifier(&self) -> Option<&IpcsClassifierRecord> {
        self.params.cs_parameters.as_ref().map(|cs| &cs.classifier)
    }

    pub fn max_latency(&self) -> SimTime {
        SimTime::from_ms(self.params.max_latency as u64)
    }

    pub fn min_reserved_rate(&self) -> u32 {
        self.params.min_reserved_rate
    }
}

impl fmt::Display for ServiceFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sfid {} cid {} {} {} {}",
            self.sfid(),
            self.params.cid,
            self.direction(),
            self.scheduling_type(),
            self.state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_monotonic() {
        let mut sf = ServiceFlow::new(ServiceFlowParams::new(SfDirection::Up, SchedulingType::Be));
        assert!(sf.set_state(SfState::Admitted));
        assert!(sf.set_state(SfState::Active));
        assert!(!sf.set_state(SfState::Admitted));
        assert_eq!(sf.state(), SfState::Active);
        assert!(sf.set_state(SfState::Active), "re-entering the same state is allowed");
    }
}
