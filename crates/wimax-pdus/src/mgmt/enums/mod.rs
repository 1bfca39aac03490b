pub mod management_message_type;
pub mod ranging_status;
