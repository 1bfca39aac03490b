pub mod dcd;
pub mod dl_map;
pub mod dsa_ack;
pub mod dsa_req;
pub mod dsa_rsp;
pub mod rng_req;
pub mod rng_rsp;
pub mod ucd;
pub mod ul_map;
