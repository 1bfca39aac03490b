pub mod bw_request_type;
pub mod fragmentation_control;
pub mod mac_header_type;
