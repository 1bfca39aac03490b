pub mod enums;
pub mod fields;
pub mod mgmt_msg;
pub mod pdus;

pub use enums::management_message_type::ManagementMessageType;
pub use enums::ranging_status::RangingStatus;
pub use fields::burst_profile::BurstProfile;
pub use fields::dcd_channel_encodings::DcdChannelEncodings;
pub use fields::dl_map_ie::DlMapIe;
pub use fields::ucd_channel_encodings::UcdChannelEncodings;
pub use fields::ul_map_ie::UlMapIe;
pub use mgmt_msg::MgmtMsg;
pub use pdus::dcd::Dcd;
pub use pdus::dl_map::DlMap;
pub use pdus::dsa_ack::DsaAck;
pub use pdus::dsa_req::DsaReq;
pub use pdus::dsa_rsp::DsaRsp;
pub use pdus::rng_req::RngReq;
pub use pdus::rng_rsp::RngRsp;
pub use pdus::ucd::Ucd;
pub use pdus::ul_map::UlMap;
