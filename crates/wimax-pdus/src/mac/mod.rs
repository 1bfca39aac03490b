pub mod bw_request_header;
pub mod enums;
pub mod fragmentation_subheader;
pub mod generic_mac_header;
pub mod hcs;
pub mod mac_pdu;

pub use bw_request_header::BwRequestHeader;
pub use enums::bw_request_type::BwRequestType;
pub use enums::fragmentation_control::FragmentationControl;
pub use enums::mac_header_type::MacHeaderType;
pub use fragmentation_subheader::{FRAG_SUBHEADER_LEN, FragmentationSubheader};
pub use generic_mac_header::{GenericMacHeader, MAC_HEADER_LEN};
pub use mac_pdu::{MacHeader, MacPdu};
