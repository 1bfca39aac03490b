use wimax_core::{Cid, MacAddress, Sfid};

use crate::bs::ss_record::SsRecord;

#[derive(Debug, PartialEq, Eq)]
pub enum SsMgrErr {
    AlreadyExists { mac: MacAddress },
    NotFound { mac: MacAddress },
}

/// SS records in registration order
#[derive(Debug, Default)]
pub struct SsManager {
    records: Vec<SsRecord>,
}

impl SsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, record: SsRecord) -> Result<&mut SsRecord, SsMgrErr> {
        if self.contains(record.mac_address) {
            return Err(SsMgrErr::AlreadyExists { mac: record.mac_address });
        }
        tracing::debug!("SsManager: registered {}", record);
        self.records.push(record);
        let idx = self.records.len() - 1;
        Ok(&mut self.records[idx])
    }

    pub fn remove(&mut self, mac: MacAddress) -> Result<SsRecord, SsMgrErr> {
        let idx = self.records.iter().position(|r| r.mac_address == mac).ok_or(SsMgrErr::NotFound { mac })?;
        Ok(self.records.remove(idx))
    }

    pub fn contains(&self, mac: MacAddress) -> bool {
        self.records.iter().any(|r| r.mac_address == mac)
    }

    pub fn get_by_mac(&self, mac: MacAddress) -> Option<&SsRecord> {
        self.records.iter().find(|r| r.mac_address == mac)
    }

    pub fn get_by_mac_mut(&mut self, mac: MacAddress) -> Option<&mut SsRecord> {
        self.records.iter_mut().find(|r| r.mac_address == mac)
    }

    /// Resolves a basic or primary CID to its station
    pub fn get_by_cid(&self, cid: Cid) -> Option<&SsRecord> {
        self.records.iter().find(|r| r.owns_cid(cid))
    }

    pub fn get_by_cid_mut(&mut self, cid: Cid) -> Option<&mut SsRecord> {
        self.records.iter_mut().find(|r| r.owns_cid(cid))
    }

    /// Station whose flows include `sfid`
    pub fn get_by_sfid(&self, sfid: Sfid) -> Option<&SsRecord> {
        self.records.iter().find(|r| r.sfids().contains(&sfid))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SsRecord> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SsRecord> {
        self.records.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
