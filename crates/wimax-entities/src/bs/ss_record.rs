use core::fmt;

use wimax_core::{Cid, MacAddress, ModulationType, Sfid};
use wimax_pdus::mgmt::RangingStatus;

/// What the BS knows about one subscriber station
#[derive(Debug, Clone)]
pub struct SsRecord {
    pub mac_address: MacAddress,
    pub basic_cid: Cid,
    pub primary_cid: Cid,
    pub ranging_status: RangingStatus,
    /// Ranging rounds answered with `Continue`
    pub ranging_correction_retries: u8,
    /// Station is owed an invited ranging opportunity
    pub poll_for_ranging: bool,
    /// DSA-RSP retransmissions made for this station
    pub dsa_rsp_retries: u8,
    /// Set once the station signalled that DSA negotiation is over
    pub are_service_flows_allocated: bool,
    pub modulation: ModulationType,
    sfids: Vec<Sfid>,
}

impl SsRecord {
    pub fn new(mac_address: MacAddress, basic_cid: Cid, primary_cid: Cid) -> Self {
        SsRecord {
            mac_address,
            basic_cid,
            primary_cid,
            ranging_status: RangingStatus::Expired,
            ranging_correction_retries: 0,
            poll_for_ranging: false,
            dsa_rsp_retries: 0,
            are_service_flows_allocated: false,
            modulation: ModulationType::Bpsk12,
            sfids: Vec::new(),
        }
    }

    pub fn is_ranged(&self) -> bool {
        self.ranging_status == RangingStatus::Success
    }

    /// Associated flows in SFID order
    pub fn sfids(&self) -> &[Sfid] {
        &self.sfids
    }

    pub fn add_sfid(&mut self, sfid: Sfid) {
        if let Err(pos) = self.sfids.binary_search(&sfid) {
            self.sfids.insert(pos, sfid);
        }
    }

    pub fn remove_sfid(&mut self, sfid: Sfid) {
        self.sfids.retain(|s| *s != sfid);
    }

    pub fn owns_cid(&self, cid: Cid) -> bool {
        cid == self.basic_cid || cid == self.primary_cid
    }
}

impl fmt::Display for SsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SS {} basic {} primary {} {} {}",
            self.mac_address, self.basic_cid, self.primary_cid, self.ranging_status, self.modulation
        )
    }
}
