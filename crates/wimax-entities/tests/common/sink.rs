use wimax_core::MacAddress;
use wimax_entities::{AirMsg, EntityId, MessageQueue, WimaxEntityTrait};

/// A passive station for testing purposes
/// Collects every burst it hears on the air for later inspection
pub struct Sink {
    mac: MacAddress,
    msgqueue: Vec<AirMsg>,
}

impl Sink {
    pub fn new(mac: MacAddress) -> Self {
        Self { mac, msgqueue: vec![] }
    }

    pub fn take_msgqueue(&mut self) -> Vec<AirMsg> {
        std::mem::take(&mut self.msgqueue)
    }
}

impl WimaxEntityTrait for Sink {
    fn entity(&self) -> EntityId {
        EntityId::Ss(self.mac)
    }

    fn rx_air(&mut self, _queue: &mut MessageQueue, message: AirMsg) {
        tracing::debug!("rx_air: {} bytes from {}", message.bytes.len(), message.src);
        self.msgqueue.push(message);
    }
}
