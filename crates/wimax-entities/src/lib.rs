pub mod bs;
pub mod dlsched;
pub mod entity_trait;
pub mod mac;
pub mod messagerouter;
pub mod phy;
pub mod sflow;
pub mod ss;
pub mod ulsched;

// Re-export commonly used items from router
pub use entity_trait::WimaxEntityTrait;
pub use messagerouter::{AirMsg, EntityId, FrameTime, MessageQueue, MessageRouter};
