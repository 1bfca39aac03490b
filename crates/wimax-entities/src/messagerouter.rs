use core::fmt;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use wimax_config::SharedConfig;
use wimax_core::{MacAddress, SimTime};

use crate::WimaxEntityTrait;

/// Identity of a node on the air interface. Ordered so that the BS ticks first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityId {
    Bs,
    Ss(MacAddress),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Bs => write!(f, "BS"),
            EntityId::Ss(mac) => write!(f, "SS {}", mac),
        }
    }
}

/// Frame number and the simulated time at which the frame starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FrameTime {
    pub frame: u32,
    pub start: SimTime,
}

impl FrameTime {
    pub fn next(self, frame_duration: SimTime) -> Self {
        FrameTime { frame: self.frame.wrapping_add(1), start: self.start + frame_duration }
    }
}

impl fmt::Display for FrameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{} @ {}", self.frame, self.start)
    }
}

/// One transmission on the air: a burst of back-to-back MAC PDUs
#[derive(Debug, Clone)]
pub struct AirMsg {
    pub src: EntityId,
    /// None reaches every other entity (downlink subframe)
    pub dest: Option<EntityId>,
    pub frame: u32,
    pub bytes: Vec<u8>,
}

pub struct MessageQueue {
    messages: VecDeque<AirMsg>,
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageQueue {
    pub fn new() -> Self {
        Self { messages: VecDeque::new() }
    }

    pub fn push_back(&mut self, message: AirMsg) {
        self.messages.push_back(message);
    }

    pub fn pop_front(&mut self) -> Option<AirMsg> {
        self.messages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub struct MessageRouter {
    config: SharedConfig,
    entities: BTreeMap<EntityId, Box<dyn WimaxEntityTrait>>,
    msg_queue: MessageQueue,
    /// Frame about to be ticked
    ts: FrameTime,
}

impl MessageRouter {
    pub fn new(config: SharedConfig) -> Self {
        Self {
            entities: BTreeMap::new(),
            msg_queue: MessageQueue::new(),
            config,
            ts: FrameTime::default(),
        }
    }

    pub fn set_frame_time(&mut self, ts: FrameTime) {
        self.ts = ts;
    }

    pub fn frame_time(&self) -> FrameTime {
        self.ts
    }

    pub fn register_entity(&mut self, entity: Box<dyn WimaxEntityTrait>) {
        let id = entity.entity();
        tracing::debug!("register_entity {}", id);
        let prev = self.entities.insert(id, entity);
        assert!(prev.is_none(), "entity {} registered twice", id);
    }

    /// Returns a mut ref to the entity with the given id
    pub fn get_entity(&mut self, id: EntityId) -> Option<&mut dyn WimaxEntityTrait> {
        self.entities.get_mut(&id).map(|entity| entity.as_mut())
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    pub fn submit_message(&mut self, message: AirMsg) {
        tracing::debug!("submit_message {} -> {:?}, {} bytes", message.src, message.dest, message.bytes.len());
        self.msg_queue.push_back(message);
    }

    pub fn deliver_message(&mut self) {
        let Some(message) = self.msg_queue.pop_front() else {
            return;
        };
        tracing::trace!("deliver_message: {} -> {:?}, {} bytes", message.src, message.dest, message.bytes.len());

        match message.dest {
            Some(dest) => {
                if let Some(entity) = self.entities.get_mut(&dest) {
                    entity.rx_air(&mut self.msg_queue, message);
                } else {
                    tracing::warn!("deliver_message: entity {} not found for message from {}", dest, message.src);
                }
            }
            None => {
                let src = message.src;
                for (id, entity) in self.entities.iter_mut() {
                    if *id != src {
                        entity.rx_air(&mut self.msg_queue, message.clone());
                    }
                }
            }
        }
    }

    pub fn deliver_all_messages(&mut self) {
        while !self.msg_queue.is_empty() {
            self.deliver_message();
        }
    }

    pub fn get_msgqueue_len(&self) -> usize {
        self.msg_queue.len()
    }

    pub fn tick_start(&mut self) {
        tracing::info!(frame = self.ts.frame, "--- tick {} ----------------------------", self.ts);
        for entity in self.entities.values_mut() {
            entity.tick_start(&mut self.msg_queue, self.ts);
        }
    }

    /// Calls tick_end on all entities, delivers what they send and advances to the next frame
    pub fn tick_end(&mut self) {
        tracing::debug!(frame = self.ts.frame, "############################ end-of-tick ############################");
        for entity in self.entities.values_mut() {
            entity.tick_end(&mut self.msg_queue, self.ts);
        }
        self.deliver_all_messages();

        let frame_duration = self.config.config().phy.frame_duration();
        self.ts = self.ts.next(frame_duration);
    }

    /// Runs the full stack either forever or for a specified number of frames.
    /// Stops early once `running` is cleared.
    pub fn run_stack(&mut self, num_frames: Option<usize>, running: Option<Arc<AtomicBool>>) {
        let mut frames: usize = 0;

        loop {
            if let Some(running) = &running {
                if !running.load(Ordering::SeqCst) {
                    tracing::info!("run_stack: stop requested after {} frames", frames);
                    break;
                }
            }

            self.tick_start();
            while self.get_msgqueue_len() > 0 {
                self.deliver_all_messages();
            }
            self.tick_end();

            frames += 1;
            if let Some(num_frames) = num_frames {
                if frames >= num_frames {
                    break;
                }
            }
        }
    }
}
