use wimax_pdus::sflow::FiveTuple;

/// Opaque upper-layer packet. The 5-tuple is only consulted by the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub payload: Vec<u8>,
    pub tuple: Option<FiveTuple>,
}

impl Packet {
    pub fn new(payload: Vec<u8>) -> Self {
        Packet { payload, tuple: None }
    }

    pub fn with_tuple(payload: Vec<u8>, tuple: FiveTuple) -> Self {
        Packet { payload, tuple: Some(tuple) }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
