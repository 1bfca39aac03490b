pub mod bs_link_mgr;
pub mod bs_net_device;
pub mod ss_manager;
pub mod ss_record;

pub use bs_link_mgr::BsLinkManager;
pub use bs_net_device::{BsNetDevice, BsStats};
pub use ss_manager::{SsManager, SsMgrErr};
pub use ss_record::SsRecord;
