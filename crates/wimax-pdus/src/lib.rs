//! Wire formats of the WiMAX MAC
//!
//! - TLV codec with context-dependent value decoding
//! - Service flow parameter sets and IPv4 classifier records
//! - Generic and bandwidth request MAC headers, fragmentation subheaders, MAC PDUs
//! - Management messages (UCD, DCD, DL-MAP, UL-MAP, RNG-REQ/RSP, DSA-REQ/RSP/ACK)
//! - Burst profile codes

pub mod burst;
pub mod mac;
pub mod mgmt;
pub mod sflow;
pub mod tlv;
