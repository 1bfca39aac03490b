use as_any::AsAny;
use wimax_config::SharedConfig;

use crate::messagerouter::{AirMsg, EntityId, FrameTime, MessageQueue};

/// Trait for simulated WiMAX nodes
/// Used by MessageRouter for passing air messages between them
pub trait WimaxEntityTrait: Send + AsAny {
    /// Returns the entity identifier
    fn entity(&self) -> EntityId;

    /// Handle a burst received over the air
    fn rx_air(&mut self, queue: &mut MessageQueue, msg: AirMsg);

    /// Update configuration (optional)
    #[allow(dead_code)]
    fn set_config(&mut self, _config: SharedConfig) {}

    /// Called at the start of each frame
    fn tick_start(&mut self, _queue: &mut MessageQueue, _ts: FrameTime) {}

    /// Called at the end of each frame
    fn tick_end(&mut self, _queue: &mut MessageQueue, _ts: FrameTime) -> bool {
        false
    }
}
