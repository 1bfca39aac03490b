pub mod bs_sf_mgr;
pub mod classifier;
pub mod service_flow;
pub mod sf_manager;
pub mod sf_record;
pub mod ss_sf_mgr;
pub mod traffic;

use core::fmt;

use wimax_core::{Cid, Sfid};

use crate::mac::ConnectionMgrErr;

pub use bs_sf_mgr::{BsServiceFlowManager, DsaReqCtx};
pub use classifier::IpcsClassifier;
pub use service_flow::{ServiceFlow, SfState};
pub use sf_manager::ServiceFlowManager;
pub use sf_record::ServiceFlowRecord;
pub use ss_sf_mgr::{DsaOutcome, DsaState, DsaTimeoutAction, SsServiceFlowManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceFlowErr {
    NotFound { sfid: Sfid },
    AlreadyExists { sfid: Sfid },
    /// DSA message for a transaction this side never started or already closed
    UnknownTransaction { transaction_id: u16 },
    /// No station owns the CID a management message arrived on
    UnknownStation { cid: Cid },
    Connection(ConnectionMgrErr),
}

impl From<ConnectionMgrErr> for ServiceFlowErr {
    fn from(e: ConnectionMgrErr) -> Self {
        ServiceFlowErr::Connection(e)
    }
}

impl fmt::Display for ServiceFlowErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceFlowErr::NotFound { sfid } => write!(f, "service flow {} not found", sfid),
            ServiceFlowErr::AlreadyExists { sfid } => write!(f, "service flow {} already exists", sfid),
            ServiceFlowErr::UnknownTransaction { transaction_id } => {
                write!(f, "unknown DSA transaction {}", transaction_id)
            }
            ServiceFlowErr::UnknownStation { cid } => write!(f, "no station owns cid {}", cid),
            ServiceFlowErr::Connection(e) => write!(f, "connection error: {:?}", e),
        }
    }
}
