use as_any::AsAny;
use wimax_config::{CfgServiceFlow, CfgSubscriber, SharedConfig, StackConfig, StackState};
use wimax_core::MacAddress;
use wimax_entities::bs::BsNetDevice;
use wimax_entities::ss::SsNetDevice;
use wimax_entities::{AirMsg, EntityId, MessageRouter, WimaxEntityTrait};

use super::sink::Sink;

/// Creates a default config with `n_subscribers` numbered stations and no flows. It can
/// still be modified as needed before passing it to the ComponentTest constructor
pub fn default_test_config(n_subscribers: u32) -> StackConfig {
    let mut cfg = StackConfig::default();
    cfg.subscribers = (0..n_subscribers).map(CfgSubscriber::numbered).collect();
    cfg
}

/// Flow of `direction` and `scheduling_type` carrying `traffic_rate` bit/s on `dst_port`
#[allow(dead_code)]
pub fn flow(
    direction: wimax_core::SfDirection,
    scheduling_type: wimax_core::SchedulingType,
    traffic_rate: u32,
    dst_port: u16,
) -> CfgServiceFlow {
    CfgServiceFlow {
        direction,
        scheduling_type,
        traffic_rate,
        dst_port,
        max_sustained_rate: 1_000_000,
        ..Default::default()
    }
}

/// Infrastructure for testing the WiMAX stack
/// Quick setup of a BS and its subscribers for end-to-end testing
/// Supports optional sinks that record everything heard on the air
pub struct ComponentTest {
    pub config: SharedConfig,
    pub router: MessageRouter,
    pub sinks: Vec<MacAddress>,
}

impl ComponentTest {
    pub fn new(config: StackConfig) -> Self {
        let shared_config = SharedConfig::from_parts(config, StackState::default());
        let router = MessageRouter::new(shared_config.clone());
        Self { config: shared_config, router, sinks: vec![] }
    }

    /// Registers the BS, one station per configured subscriber and the given sinks
    pub fn populate_entities(&mut self, sinks: Vec<MacAddress>) {
        self.register_entity(BsNetDevice::new(self.config.clone()));
        for subscriber in self.config.config().subscribers.iter() {
            self.register_entity(SsNetDevice::new(self.config.clone(), subscriber.clone()));
        }
        self.create_sinks(sinks);
    }

    fn create_sinks(&mut self, sinks: Vec<MacAddress>) {
        for mac in sinks {
            assert!(!self.sinks.contains(&mac), "Sink already exists: {}", mac);
            assert!(self.router.get_entity(EntityId::Ss(mac)).is_none(), "Sink already registered as entity: {}", mac);
            self.sinks.push(mac);
            self.register_entity(Sink::new(mac));
        }
    }

    pub fn register_entity<T: 'static + WimaxEntityTrait>(&mut self, entity: T) {
        self.router.register_entity(Box::new(entity));
    }

    pub fn run_stack(&mut self, num_frames: usize) {
        self.router.run_stack(Some(num_frames), None);
    }

    pub fn bs(&mut self) -> &mut BsNetDevice {
        let component = self.router.get_entity(EntityId::Bs).expect("BS not registered");
        component.as_any_mut().downcast_mut::<BsNetDevice>().expect("BS entity is not a BsNetDevice")
    }

    pub fn ss(&mut self, mac: MacAddress) -> &mut SsNetDevice {
        let component = self.router.get_entity(EntityId::Ss(mac)).expect("SS not registered");
        component.as_any_mut().downcast_mut::<SsNetDevice>().expect("entity is not a SsNetDevice")
    }

    pub fn dump_sinks(&mut self) -> Vec<AirMsg> {
        let mut msgs = vec![];
        for mac in self.sinks.clone() {
            if let Some(component) = self.router.get_entity(EntityId::Ss(mac))
                && let Some(sink) = component.as_any_mut().downcast_mut::<Sink>()
            {
                msgs.append(&mut sink.take_msgqueue());
            }
        }
        msgs
    }
}
