use wimax_core::{Cid, CidType, ModulationType};
use wimax_pdus::burst::BurstProfileManager;
use wimax_pdus::mgmt::{RangingStatus, RngReq, RngRsp};

use crate::bs::ss_manager::SsManager;
use crate::bs::ss_record::SsRecord;
use crate::mac::ConnectionManager;

/// Base station side of initial and invited ranging
pub struct BsLinkManager {
    max_corrections: u8,
    /// Stations that finished ranging since the last call to `take_ranged`
    newly_ranged: Vec<Cid>,
    /// Records of stations dropped after a ranging abort, until `take_removed`
    removed: Vec<SsRecord>,
}

impl BsLinkManager {
    pub fn new(max_corrections: u8) -> Self {
        BsLinkManager { max_corrections, newly_ranged: Vec::new(), removed: Vec::new() }
    }

    /// Basic CIDs of stations whose ranging succeeded since the last call
    pub fn take_ranged(&mut self) -> Vec<Cid> {
        std::mem::take(&mut self.newly_ranged)
    }

    /// Stations removed since the last call. Their service flows are not cleaned up here.
    pub fn take_removed(&mut self) -> Vec<SsRecord> {
        std::mem::take(&mut self.removed)
    }

    /// Handles a RNG-REQ received on `cid`, either the initial ranging CID or a station's
    /// basic CID. Returns the RNG-RSP to send on the initial ranging connection, None
    /// when the request cannot be attributed to any station.
    pub fn process_ranging_request(
        &mut self,
        req: &RngReq,
        cid: Cid,
        frame: u32,
        ss_mgr: &mut SsManager,
        conns: &mut ConnectionManager,
        profiles: &BurstProfileManager,
    ) -> Option<RngRsp> {
        let mac = req.mac_address;
        if cid.is_initial_ranging() {
            if !ss_mgr.contains(mac) {
                let Some((basic, primary)) = allocate_management_cids(conns) else {
                    tracing::warn!("ranging {}: no management CIDs left", mac);
                    return Some(RngRsp { frame_number: frame, ..RngRsp::new(mac, RangingStatus::Abort) });
                };
                if let Err(e) = ss_mgr.register(SsRecord::new(mac, basic, primary)) {
                    tracing::warn!("ranging {}: {:?}", mac, e);
                    free_management_cids(conns, basic, primary);
                    return None;
                }
            }
        } else if ss_mgr.get_by_cid(cid).is_none_or(|ss| ss.mac_address != mac) {
            tracing::warn!("invited ranging on cid {} from unknown station {}", cid, mac);
            return None;
        }

        let ss = ss_mgr.get_by_mac_mut(mac)?;
        ss.modulation = profiles.modulation_for_diuc(req.req_dl_burst_profile).unwrap_or(ModulationType::Bpsk12);

        let status = if req.ranging_anomalies == 0 {
            ss.poll_for_ranging = false;
            if !ss.is_ranged() {
                tracing::info!("{}: ranging complete, basic {} primary {}", mac, ss.basic_cid, ss.primary_cid);
                self.newly_ranged.push(ss.basic_cid);
            }
            RangingStatus::Success
        } else if ss.ranging_correction_retries < self.max_corrections {
            ss.ranging_correction_retries += 1;
            ss.poll_for_ranging = true;
            tracing::debug!("{}: ranging correction {}", mac, ss.ranging_correction_retries);
            RangingStatus::Continue
        } else {
            ss.poll_for_ranging = false;
            RangingStatus::Abort
        };
        ss.ranging_status = status;

        let mut rsp = RngRsp::new(mac, status);
        rsp.basic_cid = ss.basic_cid;
        rsp.primary_cid = ss.primary_cid;
        rsp.frame_number = frame;

        if status == RangingStatus::Abort {
            tracing::error!("{}: ranging aborted after {} corrections", mac, self.max_corrections);
            if let Ok(record) = ss_mgr.remove(mac) {
                free_management_cids(conns, record.basic_cid, record.primary_cid);
                self.removed.push(record);
            }
        }
        Some(rsp)
    }
}

fn allocate_management_cids(conns: &mut ConnectionManager) -> Option<(Cid, Cid)> {
    let basic = conns.allocate(CidType::Basic).ok()?;
    match conns.allocate(CidType::Primary) {
        Ok(primary) => Some((basic, primary)),
        Err(_) => {
            let _ = conns.remove(basic);
            None
        }
    }
}

fn free_management_cids(conns: &mut ConnectionManager, basic: Cid, primary: Cid) {
    for cid in [basic, primary] {
        if let Err(e) = conns.remove(cid) {
            tracing::warn!("freeing cid {}: {:?}", cid, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use wimax_core::{CidFactory, MacAddress};

    use super::*;

    struct Fixture {
        link: BsLinkManager,
        ss_mgr: SsManager,
        conns: ConnectionManager,
        profiles: BurstProfileManager,
    }

    fn fixture(max_corrections: u8, basic_cids: u16) -> Fixture {
        Fixture {
            link: BsLinkManager::new(max_corrections),
            ss_mgr: SsManager::new(),
            conns: ConnectionManager::new_bs(CidFactory::new(basic_cids), 4096),
            profiles: BurstProfileManager::default(),
        }
    }

    impl Fixture {
        fn range(&mut self, mac: MacAddress, cid: Cid, anomalies: u8) -> Option<RngRsp> {
            let req = RngReq { req_dl_burst_profile: 4, mac_address: mac, ranging_anomalies: anomalies };
            self.link.process_ranging_request(&req, cid, 7, &mut self.ss_mgr, &mut self.conns, &self.profiles)
        }
    }

    #[test]
    fn test_initial_ranging_success() {
        let mut f = fixture(4, 8);
        let mac = MacAddress::from_index(1);
        let rsp = f.range(mac, Cid::INITIAL_RANGING, 0).unwrap();
        assert_eq!(rsp.ranging_status, RangingStatus::Success);
        assert_eq!(rsp.frame_number, 7);
        assert_eq!(f.conns.cid_type(rsp.basic_cid), Some(CidType::Basic));
        assert_eq!(f.conns.cid_type(rsp.primary_cid), Some(CidType::Primary));

        let ss = f.ss_mgr.get_by_mac(mac).unwrap();
        assert!(ss.is_ranged());
        assert_eq!(ss.modulation, ModulationType::Qam16_12, "DIUC 4 is 16-QAM 1/2");
        assert_eq!(f.link.take_ranged(), vec![rsp.basic_cid]);
        assert!(f.link.take_ranged().is_empty());

        // A repeated request reuses the record and its CIDs
        let again = f.range(mac, Cid::INITIAL_RANGING, 0).unwrap();
        assert_eq!((again.basic_cid, again.primary_cid), (rsp.basic_cid, rsp.primary_cid));
        assert_eq!(f.ss_mgr.len(), 1);
    }

    #[test]
    fn test_corrections_then_invited_ranging() {
        let mut f = fixture(4, 8);
        let mac = MacAddress::from_index(1);
        let rsp = f.range(mac, Cid::INITIAL_RANGING, 1).unwrap();
        assert_eq!(rsp.ranging_status, RangingStatus::Continue);
        assert!(f.ss_mgr.get_by_mac(mac).unwrap().poll_for_ranging);

        let rsp = f.range(mac, rsp.basic_cid, 0).unwrap();
        assert_eq!(rsp.ranging_status, RangingStatus::Success);
        let ss = f.ss_mgr.get_by_mac(mac).unwrap();
        assert!(!ss.poll_for_ranging);
        assert_eq!(ss.ranging_correction_retries, 1);

        // Invited ranging on somebody else's CID is ignored
        assert!(f.range(MacAddress::from_index(2), rsp.basic_cid, 0).is_none());
    }

    #[test]
    fn test_abort_after_max_corrections() {
        let mut f = fixture(2, 8);
        let mac = MacAddress::from_index(1);
        let first = f.range(mac, Cid::INITIAL_RANGING, 1).unwrap();
        assert_eq!(f.range(mac, first.basic_cid, 1).unwrap().ranging_status, RangingStatus::Continue);
        let last = f.range(mac, first.basic_cid, 1).unwrap();
        assert_eq!(last.ranging_status, RangingStatus::Abort);
        assert!(f.ss_mgr.is_empty());
        assert!(!f.conns.contains(first.basic_cid));
        assert!(!f.conns.contains(first.primary_cid));
        assert!(f.link.take_ranged().is_empty());
        let removed = f.link.take_removed();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].mac_address, mac);
        assert!(f.link.take_removed().is_empty());
    }

    #[test]
    fn test_cid_exhaustion_aborts() {
        let mut f = fixture(4, 1);
        assert_eq!(f.range(MacAddress::from_index(1), Cid::INITIAL_RANGING, 0).unwrap().ranging_status, RangingStatus::Success);
        let rsp = f.range(MacAddress::from_index(2), Cid::INITIAL_RANGING, 0).unwrap();
        assert_eq!(rsp.ranging_status, RangingStatus::Abort);
        assert_eq!(f.ss_mgr.len(), 1);
        // Only the first station's two CIDs plus the fixed connections remain
        assert_eq!(f.conns.factory().unwrap().num_live(), 2);
    }
}
