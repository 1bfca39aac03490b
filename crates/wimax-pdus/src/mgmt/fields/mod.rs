pub mod burst_profile;
pub mod dcd_channel_encodings;
pub mod dl_map_ie;
pub mod ucd_channel_encodings;
pub mod ul_map_ie;
