pub mod ss_link_mgr;
pub mod ss_net_device;

pub use ss_link_mgr::{LinkState, SsLinkManager};
pub use ss_net_device::{SsNetDevice, SsStats};
