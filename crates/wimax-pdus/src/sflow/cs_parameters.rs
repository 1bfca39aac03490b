use wimax_core::PduParseErr;

use crate::tlv::tlv_type::cs;
use crate::tlv::{Tlv, TlvValue};

use super::classifier_record::IpcsClassifierRecord;

/// Classifier DSC action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClassifierDscAction {
    Add = 0,
    Replace = 1,
    Delete = 2,
}

impl std::convert::TryFrom<u64> for ClassifierDscAction {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(ClassifierDscAction::Add),
            1 => Ok(ClassifierDscAction::Replace),
            2 => Ok(ClassifierDscAction::Delete),
            _ => Err(()),
        }
    }
}

impl ClassifierDscAction {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u64
    }
}

/// IPv4 convergence sublayer parameters of a service flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsParameters {
    pub action: ClassifierDscAction,
    pub classifier: IpcsClassifierRecord,
}

impl CsParameters {
    pub fn new(classifier: IpcsClassifierRecord) -> Self {
        CsParameters { action: ClassifierDscAction::Add, classifier }
    }

    pub fn to_tlv_value(&self) -> TlvValue {
        TlvValue::CsParamVector(vec![
            Tlv::u8(cs::CLASSIFIER_DSC_ACTION, self.action.into_raw() as u8),
            Tlv::new(cs::PACKET_CLASSIFICATION_RULE, self.classifier.to_tlv_value()),
        ])
    }

    pub fn from_tlv_value(value: &TlvValue) -> Result<Self, PduParseErr> {
        let TlvValue::CsParamVector(children) = value else {
            return Err(PduParseErr::Inconsistency { field: "cs_parameters", reason: "not a cs parameter vector" });
        };
        let mut action = ClassifierDscAction::Add;
        let mut classifier = IpcsClassifierRecord::default();
        for child in children {
            match child.tlv_type {
                cs::CLASSIFIER_DSC_ACTION => {
                    let raw = child.as_u8().ok_or(PduParseErr::Inconsistency {
                        field: "classifier_dsc_action",
                        reason: "expected u8",
                    })?;
                    action = ClassifierDscAction::try_from(raw as u64)
                        .map_err(|_| PduParseErr::InvalidValue { field: "classifier_dsc_action", value: raw as u64 })?;
                }
                cs::PACKET_CLASSIFICATION_RULE => classifier = IpcsClassifierRecord::from_tlv_value(&child.value)?,
                t => return Err(PduParseErr::UnknownTlvType { context: "cs parameters", found: t }),
            }
        }
        Ok(CsParameters { action, classifier })
    }
}
