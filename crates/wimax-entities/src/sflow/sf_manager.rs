use std::collections::BTreeMap;

use wimax_core::{Cid, SfDirection, Sfid};

use crate::sflow::ServiceFlowErr;
use crate::sflow::service_flow::ServiceFlow;

/// Arena of service flows keyed by SFID
#[derive(Debug, Default)]
pub struct ServiceFlowManager {
    flows: BTreeMap<Sfid, ServiceFlow>,
}

impl ServiceFlowManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, flow: ServiceFlow) -> Result<(), ServiceFlowErr> {
        let sfid = flow.sfid();
        if self.flows.contains_key(&sfid) {
            return Err(ServiceFlowErr::AlreadyExists { sfid });
        }
        self.flows.insert(sfid, flow);
        Ok(())
    }

    pub fn remove(&mut self, sfid: Sfid) -> Option<ServiceFlow> {
        self.flows.remove(&sfid)
    }

    pub fn get(&self, sfid: Sfid) -> Option<&ServiceFlow> {
        self.flows.get(&sfid)
    }

    pub fn get_mut(&mut self, sfid: Sfid) -> Option<&mut ServiceFlow> {
        self.flows.get_mut(&sfid)
    }

    pub fn get_by_cid(&self, cid: Cid) -> Option<&ServiceFlow> {
        self.flows.values().find(|f| f.cid() == cid)
    }

    pub fn get_by_cid_mut(&mut self, cid: Cid) -> Option<&mut ServiceFlow> {
        self.flows.values_mut().find(|f| f.cid() == cid)
    }

    /// All flows in SFID order
    pub fn flows(&self) -> impl Iterator<Item = &ServiceFlow> {
        self.flows.values()
    }

    pub fn flows_mut(&mut self) -> impl Iterator<Item = &mut ServiceFlow> {
        self.flows.values_mut()
    }

    pub fn flows_in_direction(&self, direction: SfDirection) -> impl Iterator<Item = &ServiceFlow> {
        self.flows.values().filter(move |f| f.direction() == direction)
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
