//! Interval usage codes. Data burst codes select a modulation through the burst
//! profiles announced in DCD/UCD; the rest have fixed meanings.

/// Downlink interval usage codes
pub mod diuc {
    /// First and last data burst profile
    pub const BURST_FIRST: u8 = 1;
    pub const BURST_LAST: u8 = 7;
    pub const GAP: u8 = 13;
    pub const END_OF_MAP: u8 = 14;
}

/// Uplink interval usage codes
pub mod uiuc {
    pub const INITIAL_RANGING: u8 = 1;
    /// Bandwidth request opportunity (unicast poll when addressed to a connection)
    pub const REQ_REGION_FULL: u8 = 2;
    pub const REQ_REGION_FOCUSED: u8 = 3;
    pub const FOCUSED_CONTENTION_IE: u8 = 4;
    /// First and last data burst profile
    pub const BURST_FIRST: u8 = 5;
    pub const BURST_LAST: u8 = 11;
    pub const END_OF_MAP: u8 = 14;
}
