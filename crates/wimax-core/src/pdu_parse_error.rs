#[derive(Debug, PartialEq, Eq)]
pub enum PduParseErr {
    InvalidPduType { expected: u64, found: u64 },
    BufferEnded { field: Option<&'static str> },
    InvalidValue { field: &'static str, value: u64 },
    InconsistentLength { expected: usize, found: usize },
    Inconsistency { field: &'static str, reason: &'static str },
    UnknownTlvType { context: &'static str, found: u8 },
    InvalidHcs { expected: u8, found: u8 },
}

/// Checks whether a PDU type value matches the expected value. If not, returns PduParseErr::InvalidPduType
#[macro_export]
macro_rules! expect_pdu_type {
    ($value:expr, $expected:expr) => {{
        let raw_expected = $expected.into_raw();
        if $value == raw_expected as u64 {
            Ok(())
        } else {
            Err(PduParseErr::InvalidPduType {
                expected: raw_expected as u64,
                found: $value,
            })
        }
    }};
}
