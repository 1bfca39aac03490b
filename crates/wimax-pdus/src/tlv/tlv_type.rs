/// Context a TLV is decoded in. The same type byte means different things in
/// different vectors, so the context picks the value variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlvContext {
    TopLevel,
    ServiceFlow,
    CsParam,
    ClassificationRule,
}

impl core::fmt::Display for TlvContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TlvContext::TopLevel => write!(f, "TopLevel"),
            TlvContext::ServiceFlow => write!(f, "ServiceFlow"),
            TlvContext::CsParam => write!(f, "CsParam"),
            TlvContext::ClassificationRule => write!(f, "ClassificationRule"),
        }
    }
}

/// Top-level TLV type codes
pub mod top {
    pub const UPLINK_SERVICE_FLOW: u8 = 145;
    pub const DOWNLINK_SERVICE_FLOW: u8 = 146;
}

/// Type codes inside a service flow vector
pub mod sf {
    pub const SFID: u8 = 1;
    pub const CID: u8 = 2;
    pub const SERVICE_CLASS_NAME: u8 = 3;
    pub const QOS_PARAM_SET_TYPE: u8 = 5;
    pub const TRAFFIC_PRIORITY: u8 = 6;
    pub const MAX_SUSTAINED_TRAFFIC_RATE: u8 = 7;
    pub const MAX_TRAFFIC_BURST: u8 = 8;
    pub const MIN_RESERVED_TRAFFIC_RATE: u8 = 9;
    pub const MIN_TOLERABLE_TRAFFIC_RATE: u8 = 10;
    pub const SCHEDULING_TYPE: u8 = 11;
    pub const REQUEST_TX_POLICY: u8 = 12;
    pub const TOLERATED_JITTER: u8 = 13;
    pub const MAXIMUM_LATENCY: u8 = 14;
    pub const FIXED_VS_VARIABLE_SDU: u8 = 15;
    pub const SDU_SIZE: u8 = 16;
    pub const TARGET_SAID: u8 = 17;
    pub const ARQ_ENABLE: u8 = 18;
    pub const ARQ_WINDOW_SIZE: u8 = 19;
    pub const UNSOLICITED_GRANT_INTERVAL: u8 = 20;
    pub const UNSOLICITED_POLLING_INTERVAL: u8 = 21;
    pub const CS_SPECIFICATION: u8 = 28;
    pub const IPV4_CS_PARAMETERS: u8 = 100;
}

/// Type codes inside a CS parameter vector
pub mod cs {
    pub const CLASSIFIER_DSC_ACTION: u8 = 1;
    pub const PACKET_CLASSIFICATION_RULE: u8 = 3;
}

/// Type codes inside a packet classification rule
pub mod rule {
    pub const PRIORITY: u8 = 1;
    pub const TOS: u8 = 2;
    pub const PROTOCOL: u8 = 3;
    pub const IP_SRC: u8 = 4;
    pub const IP_DST: u8 = 5;
    pub const PORT_SRC: u8 = 6;
    pub const PORT_DST: u8 = 7;
    pub const INDEX: u8 = 14;
}
