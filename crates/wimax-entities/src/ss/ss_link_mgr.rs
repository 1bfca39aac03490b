use core::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wimax_core::{Cid, CidType, MacAddress};
use wimax_pdus::mgmt::{RangingStatus, RngReq, RngRsp, Ucd};

use crate::mac::ConnectionManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Waiting for DCD and UCD
    Scanning,
    /// Contending for initial ranging opportunities
    Ranging { defer: u32, awaiting_rsp: bool },
    /// BS asked for corrections, waiting for an invited ranging opportunity
    Invited { awaiting_rsp: bool },
    Ranged,
    Aborted,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Scanning => write!(f, "Scanning"),
            LinkState::Ranging { .. } => write!(f, "Ranging"),
            LinkState::Invited { .. } => write!(f, "Invited"),
            LinkState::Ranged => write!(f, "Ranged"),
            LinkState::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Subscriber side of initial and invited ranging. Contention requests use a truncated
/// binary exponential backoff over the window announced in the UCD.
pub struct SsLinkManager {
    mac: MacAddress,
    state: LinkState,
    rng: StdRng,
    backoff_start: u8,
    backoff_end: u8,
    window_exp: u8,
    /// Contention requests sent without a response
    unanswered: u8,
    max_unanswered: u8,
    /// Corrections still to report before the station claims a clean measurement
    corrections_left: u8,
    req_dl_burst_profile: u8,
    basic_cid: Option<Cid>,
    primary_cid: Option<Cid>,
}

impl SsLinkManager {
    pub fn new(mac: MacAddress, max_unanswered: u8, corrections: u8) -> Self {
        let seed = mac.octets().iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
        SsLinkManager {
            mac,
            state: LinkState::Scanning,
            rng: StdRng::seed_from_u64(seed),
            backoff_start: 0,
            backoff_end: 0,
            window_exp: 0,
            unanswered: 0,
            max_unanswered,
            corrections_left: corrections,
            req_dl_burst_profile: 0,
            basic_cid: None,
            primary_cid: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_ranged(&self) -> bool {
        self.state == LinkState::Ranged
    }

    pub fn basic_cid(&self) -> Option<Cid> {
        self.basic_cid
    }

    pub fn primary_cid(&self) -> Option<Cid> {
        self.primary_cid
    }

    /// Starts contention ranging once the channel descriptors are known.
    /// `req_dl_burst_profile` is the DIUC the station asks to be served with.
    pub fn start(&mut self, ucd: &Ucd, req_dl_burst_profile: u8) {
        if self.state != LinkState::Scanning {
            return;
        }
        self.backoff_start = ucd.ranging_backoff_start;
        self.backoff_end = ucd.ranging_backoff_end.max(ucd.ranging_backoff_start);
        self.window_exp = self.backoff_start;
        self.req_dl_burst_profile = req_dl_burst_profile;
        let defer = self.draw_backoff();
        tracing::debug!("{}: start ranging, deferring {} opportunities", self.mac, defer);
        self.state = LinkState::Ranging { defer, awaiting_rsp: false };
    }

    fn draw_backoff(&mut self) -> u32 {
        let window = 1u32 << self.window_exp.min(15);
        self.rng.random_range(0..window)
    }

    fn request(&self) -> RngReq {
        RngReq {
            req_dl_burst_profile: self.req_dl_burst_profile,
            mac_address: self.mac,
            ranging_anomalies: (self.corrections_left > 0) as u8,
        }
    }

    /// Called for every contention ranging opportunity in the UL-MAP. Returns the
    /// RNG-REQ to send in it, if the backoff allows.
    pub fn on_ranging_opportunity(&mut self) -> Option<RngReq> {
        let LinkState::Ranging { defer, awaiting_rsp } = self.state else {
            return None;
        };
        if awaiting_rsp {
            // The previous request was lost
            self.unanswered += 1;
            if self.unanswered >= self.max_unanswered {
                tracing::error!("{}: no RNG-RSP after {} requests, giving up", self.mac, self.unanswered);
                self.state = LinkState::Aborted;
                return None;
            }
            self.window_exp = (self.window_exp + 1).min(self.backoff_end);
            let defer = self.draw_backoff();
            tracing::debug!("{}: RNG-REQ unanswered, deferring {} opportunities", self.mac, defer);
            self.state = LinkState::Ranging { defer, awaiting_rsp: false };
            return self.on_ranging_opportunity();
        }
        if defer > 0 {
            self.state = LinkState::Ranging { defer: defer - 1, awaiting_rsp: false };
            return None;
        }
        self.state = LinkState::Ranging { defer: 0, awaiting_rsp: true };
        Some(self.request())
    }

    /// Called for an invited ranging opportunity on the station's basic CID
    pub fn on_invited_opportunity(&mut self) -> Option<RngReq> {
        match self.state {
            LinkState::Invited { .. } => {
                self.state = LinkState::Invited { awaiting_rsp: true };
                Some(self.request())
            }
            _ => None,
        }
    }

    /// Handles a RNG-RSP heard on the initial ranging connection. Responses for other
    /// stations are ignored. Adds the management connections the first time the BS
    /// hands out CIDs. Returns the status when the response was ours.
    pub fn process_ranging_response(&mut self, rsp: &RngRsp, conns: &mut ConnectionManager) -> Option<RangingStatus> {
        if rsp.mac_address != self.mac {
            return None;
        }
        if matches!(self.state, LinkState::Scanning | LinkState::Aborted) {
            tracing::debug!("{}: unsolicited RNG-RSP ignored", self.mac);
            return None;
        }
        match rsp.ranging_status {
            RangingStatus::Success | RangingStatus::Continue => {
                self.adopt_cids(rsp.basic_cid, rsp.primary_cid, conns);
                self.unanswered = 0;
                if rsp.ranging_status == RangingStatus::Success {
                    if self.state != LinkState::Ranged {
                        tracing::info!("{}: ranged, basic {} primary {}", self.mac, rsp.basic_cid, rsp.primary_cid);
                    }
                    self.state = LinkState::Ranged;
                } else {
                    self.corrections_left = self.corrections_left.saturating_sub(1);
                    tracing::debug!("{}: ranging continue, {} corrections left", self.mac, self.corrections_left);
                    self.state = LinkState::Invited { awaiting_rsp: false };
                }
            }
            RangingStatus::Abort => {
                tracing::error!("{}: ranging aborted by BS", self.mac);
                self.drop_cids(conns);
                self.state = LinkState::Aborted;
            }
            RangingStatus::Expired => {
                tracing::warn!("{}: RNG-RSP with status {}", self.mac, rsp.ranging_status);
                return None;
            }
        }
        Some(rsp.ranging_status)
    }

    fn adopt_cids(&mut self, basic: Cid, primary: Cid, conns: &mut ConnectionManager) {
        if self.basic_cid == Some(basic) && self.primary_cid == Some(primary) {
            return;
        }
        self.drop_cids(conns);
        for (cid, cid_type) in [(basic, CidType::Basic), (primary, CidType::Primary)] {
            if let Err(e) = conns.add_connection(cid, cid_type) {
                tracing::warn!("{}: adding {} cid {}: {:?}", self.mac, cid_type, cid, e);
            }
        }
        self.basic_cid = Some(basic);
        self.primary_cid = Some(primary);
    }

    fn drop_cids(&mut self, conns: &mut ConnectionManager) {
        for cid in [self.basic_cid.take(), self.primary_cid.take()].into_iter().flatten() {
            let _ = conns.remove(cid);
        }
    }
}

#[cfg(test)]
mod tests {
    use wimax_pdus::mgmt::UcdChannelEncodings;

    use super::*;

    fn ucd(start: u8, end: u8) -> Ucd {
        Ucd {
            config_change_count: 0,
            ranging_backoff_start: start,
            ranging_backoff_end: end,
            request_backoff_start: 0,
            request_backoff_end: 0,
            channel_encodings: UcdChannelEncodings {
                bw_req_opp_size: 2,
                rang_req_opp_size: 8,
                frequency: 0,
                sbchnl_req_region_full_params: 0,
                sbchnl_focused_cont_codes: 0,
            },
            ul_burst_profiles: Vec::new(),
        }
    }

    fn rsp(mac: MacAddress, status: RangingStatus) -> RngRsp {
        let mut rsp = RngRsp::new(mac, status);
        rsp.basic_cid = Cid::new(1);
        rsp.primary_cid = Cid::new(0x5501);
        rsp
    }

    #[test]
    fn test_no_backoff_window_sends_at_first_opportunity() {
        let mac = MacAddress::from_index(1);
        let mut link = SsLinkManager::new(mac, 4, 0);
        assert!(link.on_ranging_opportunity().is_none(), "nothing before the UCD");
        link.start(&ucd(0, 0), 2);

        let req = link.on_ranging_opportunity().unwrap();
        assert_eq!(req.mac_address, mac);
        assert_eq!(req.ranging_anomalies, 0);
        assert_eq!(req.req_dl_burst_profile, 2);

        let mut conns = ConnectionManager::new_ss(4096);
        assert!(link.process_ranging_response(&rsp(MacAddress::from_index(2), RangingStatus::Success), &mut conns).is_none());
        assert_eq!(link.process_ranging_response(&rsp(mac, RangingStatus::Success), &mut conns), Some(RangingStatus::Success));
        assert!(link.is_ranged());
        assert_eq!(conns.cid_type(Cid::new(1)), Some(CidType::Basic));
        assert_eq!(conns.cid_type(Cid::new(0x5501)), Some(CidType::Primary));
        assert!(link.on_ranging_opportunity().is_none());
    }

    #[test]
    fn test_corrections_use_invited_ranging() {
        let mac = MacAddress::from_index(1);
        let mut link = SsLinkManager::new(mac, 4, 1);
        let mut conns = ConnectionManager::new_ss(4096);
        link.start(&ucd(0, 0), 1);
        assert_eq!(link.on_ranging_opportunity().unwrap().ranging_anomalies, 1);
        assert!(link.on_invited_opportunity().is_none());

        link.process_ranging_response(&rsp(mac, RangingStatus::Continue), &mut conns);
        assert_eq!(link.state(), LinkState::Invited { awaiting_rsp: false });
        assert_eq!(link.basic_cid(), Some(Cid::new(1)));
        assert!(link.on_ranging_opportunity().is_none());

        assert_eq!(link.on_invited_opportunity().unwrap().ranging_anomalies, 0);
        link.process_ranging_response(&rsp(mac, RangingStatus::Success), &mut conns);
        assert!(link.is_ranged());
        assert_eq!(conns.len(), 4, "ranging, broadcast, basic and primary");
    }

    #[test]
    fn test_unanswered_requests_back_off_then_give_up() {
        let mac = MacAddress::from_index(3);
        let mut link = SsLinkManager::new(mac, 3, 0);
        link.start(&ucd(0, 2), 1);

        let mut sent = 0;
        for _ in 0..64 {
            if link.on_ranging_opportunity().is_some() {
                sent += 1;
            }
            if link.state() == LinkState::Aborted {
                break;
            }
        }
        assert_eq!(sent, 3);
        assert_eq!(link.state(), LinkState::Aborted);
    }

    #[test]
    fn test_abort_drops_cids() {
        let mac = MacAddress::from_index(1);
        let mut link = SsLinkManager::new(mac, 4, 2);
        let mut conns = ConnectionManager::new_ss(4096);
        link.start(&ucd(0, 0), 1);
        link.on_ranging_opportunity();
        link.process_ranging_response(&rsp(mac, RangingStatus::Continue), &mut conns);
        link.on_invited_opportunity();
        link.process_ranging_response(&rsp(mac, RangingStatus::Abort), &mut conns);
        assert_eq!(link.state(), LinkState::Aborted);
        assert_eq!(link.basic_cid(), None);
        assert!(!conns.contains(Cid::new(1)));
    }
}
