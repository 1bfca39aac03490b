use wimax_core::ModulationType;

use crate::mgmt::fields::burst_profile::BurstProfile;
use crate::mgmt::pdus::dcd::Dcd;
use crate::mgmt::pdus::ucd::Ucd;

use super::iuc::{diuc, uiuc};

/// Maps modulation types to DIUC/UIUC burst profile codes and back.
/// The BS owns the default mapping and announces it in DCD/UCD; a station rebuilds it
/// from the descriptors it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstProfileManager {
    dl: Vec<BurstProfile>,
    ul: Vec<BurstProfile>,
}

impl Default for BurstProfileManager {
    /// One profile per modulation: DIUC 1..=7 and UIUC 5..=11, in modulation order
    fn default() -> Self {
        let dl = ModulationType::ALL
            .iter()
            .enumerate()
            .map(|(i, m)| BurstProfile { iuc: diuc::BURST_FIRST + i as u8, fec_code_type: *m })
            .collect();
        let ul = ModulationType::ALL
            .iter()
            .enumerate()
            .map(|(i, m)| BurstProfile { iuc: uiuc::BURST_FIRST + i as u8, fec_code_type: *m })
            .collect();
        BurstProfileManager { dl, ul }
    }
}

impl BurstProfileManager {
    pub fn from_descriptors(dcd: &Dcd, ucd: &Ucd) -> Self {
        BurstProfileManager { dl: dcd.dl_burst_profiles.clone(), ul: ucd.ul_burst_profiles.clone() }
    }

    pub fn dl_profiles(&self) -> &[BurstProfile] {
        &self.dl
    }

    pub fn ul_profiles(&self) -> &[BurstProfile] {
        &self.ul
    }

    pub fn diuc_for(&self, modulation: ModulationType) -> Option<u8> {
        self.dl.iter().find(|p| p.fec_code_type == modulation).map(|p| p.iuc)
    }

    pub fn uiuc_for(&self, modulation: ModulationType) -> Option<u8> {
        self.ul.iter().find(|p| p.fec_code_type == modulation).map(|p| p.iuc)
    }

    pub fn modulation_for_diuc(&self, code: u8) -> Option<ModulationType> {
        self.dl.iter().find(|p| p.iuc == code).map(|p| p.fec_code_type)
    }

    /// Reserved UIUCs (ranging, request regions) have no profile and yield None
    pub fn modulation_for_uiuc(&self, code: u8) -> Option<ModulationType> {
        self.ul.iter().find(|p| p.iuc == code).map(|p| p.fec_code_type)
    }
}
