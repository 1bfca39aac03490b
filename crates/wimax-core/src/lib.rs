//! Core utilities for the WiMAX MAC stack
//!
//! This crate provides fundamental types and utilities used across the stack:
//! - ByteBuffer for big-endian PDU encoding and decoding
//! - Connection identifiers and the per-BS CID factory
//! - Simulated time and polled event timers
//! - MAC addresses, modulation and QoS enums, OFDM numerology
//! - Common macros and debug utilities

pub mod bytebuffer;
pub mod cid;
pub mod cid_factory;
pub mod debug;
pub mod event_timer;
pub mod mac_address;
pub mod modulation;
pub mod ofdm;
pub mod pdu_parse_error;
pub mod qos;
pub mod sim_time;

// Re-export commonly used items
pub use bytebuffer::ByteBuffer;
pub use cid::{Cid, CidType};
pub use cid_factory::{CidAllocErr, CidFactory};
pub use event_timer::{EventId, EventTimer};
pub use mac_address::MacAddress;
pub use modulation::ModulationType;
pub use pdu_parse_error::PduParseErr;
pub use qos::{SchedulingType, SfDirection};
pub use sim_time::SimTime;

/// Service flow identifier, unique per BS
pub type Sfid = u32;
