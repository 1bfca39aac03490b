pub mod simple_ofdm_phy;
pub mod wimax_phy;

pub use simple_ofdm_phy::{PhyStats, SimpleOfdmPhy};
pub use wimax_phy::WimaxPhy;
