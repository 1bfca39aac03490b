use std::collections::BTreeMap;

use crate::sim_time::SimTime;

/// Handle of an armed timer, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u64);

impl EventId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Set of one-shot timers carrying a payload `T`. Nothing fires on its own: the owner
/// polls at each frame tick and receives whatever expired.
#[derive(Debug, Clone)]
pub struct EventTimer<T> {
    next_id: u64,
    /// Keyed by (expiry, id) so that expired events pop in time order, ties in arming order
    armed: BTreeMap<(SimTime, EventId), T>,
}

impl<T> Default for EventTimer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventTimer<T> {
    pub fn new() -> Self {
        EventTimer { next_id: 1, armed: BTreeMap::new() }
    }

    /// Arms a timer that expires at `expiry`
    pub fn arm(&mut self, expiry: SimTime, payload: T) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.armed.insert((expiry, id), payload);
        id
    }

    /// Cancels an armed timer, returning its payload. None if it already fired or was cancelled.
    pub fn cancel(&mut self, id: EventId) -> Option<T> {
        let key = self.armed.keys().find(|(_, k)| *k == id).copied()?;
        self.armed.remove(&key)
    }

    pub fn is_armed(&self, id: EventId) -> bool {
        self.armed.keys().any(|(_, k)| *k == id)
    }

    pub fn expiry_of(&self, id: EventId) -> Option<SimTime> {
        self.armed.keys().find(|(_, k)| *k == id).map(|(t, _)| *t)
    }

    /// Removes and returns all timers with expiry <= now, oldest first
    pub fn poll_expired(&mut self, now: SimTime) -> Vec<(EventId, T)> {
        let mut out = Vec::new();
        while let Some(entry) = self.armed.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let ((_, id), payload) = entry.remove_entry();
            out.push((id, payload));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_order() {
        let mut t = EventTimer::new();
        let _a = t.arm(SimTime::from_ms(30), "a");
        let _b = t.arm(SimTime::from_ms(10), "b");
        let _c = t.arm(SimTime::from_ms(10), "c");
        assert!(t.poll_expired(SimTime::from_ms(5)).is_empty());
        let fired: Vec<_> = t.poll_expired(SimTime::from_ms(10)).into_iter().map(|(_, p)| p).collect();
        assert_eq!(fired, vec!["b", "c"]);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_cancel() {
        let mut t = EventTimer::new();
        let a = t.arm(SimTime::from_ms(10), 1u32);
        assert!(t.is_armed(a));
        assert_eq!(t.expiry_of(a), Some(SimTime::from_ms(10)));
        assert_eq!(t.cancel(a), Some(1));
        assert!(!t.is_armed(a));
        assert_eq!(t.cancel(a), None, "second cancel is a no-op");
        assert!(t.poll_expired(SimTime::from_ms(100)).is_empty());
    }
}
