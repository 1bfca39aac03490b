pub mod codec;
pub mod tlv_type;

pub use codec::{Tlv, TlvValue, size_of_len};
pub use tlv_type::TlvContext;
