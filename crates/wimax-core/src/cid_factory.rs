use std::collections::{BTreeSet, HashSet};

use crate::cid::{Cid, CidType};

/// Last transport CID. Multicast starts at `MULTICAST_FIRST`, leaving 0xFEFF unused.
pub const TRANSPORT_LAST: u16 = 0xFEFE;
pub const MULTICAST_FIRST: u16 = 0xFF00;
pub const MULTICAST_LAST: u16 = 0xFFFD;

/// Default number of basic CIDs (and thus primary CIDs)
pub const DEFAULT_BASIC_CID_COUNT: u16 = 0x5500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CidAllocErr {
    /// Sub-range for this type has no free CID left
    Exhausted { cid_type: CidType },
    /// The type is a fixed, well-known CID and is never allocated
    NotAllocatable { cid_type: CidType },
    /// CID is not currently live in this factory
    NotAllocated { cid: Cid },
}

/// Free pool for one numeric sub-range
#[derive(Debug, Clone)]
struct CidPool {
    first: u16,
    last: u16,
    /// Next never-allocated id in this range, None once the range was fully handed out
    next_fresh: Option<u16>,
    /// Ids that were freed and may be handed out again
    recycled: BTreeSet<u16>,
}

impl CidPool {
    fn new(first: u16, last: u16) -> Self {
        CidPool {
            first,
            last,
            next_fresh: if first <= last { Some(first) } else { None },
            recycled: BTreeSet::new(),
        }
    }

    fn take(&mut self) -> Option<u16> {
        if let Some(id) = self.recycled.pop_first() {
            return Some(id);
        }
        let id = self.next_fresh?;
        self.next_fresh = if id < self.last { Some(id + 1) } else { None };
        Some(id)
    }

    fn give_back(&mut self, id: u16) {
        debug_assert!(id >= self.first && id <= self.last);
        self.recycled.insert(id);
    }

    fn len(&self) -> usize {
        if self.first > self.last { 0 } else { (self.last - self.first) as usize + 1 }
    }
}

/// Per-BS allocator for connection identifiers.
///
/// With `m` basic CIDs the 16-bit space is split as:
/// basic `1..=m`, primary `m+1..=2m`, transport `2m+1..=0xFEFE`, multicast `0xFF00..=0xFFFD`.
/// The remaining values are the fixed initial ranging, padding and broadcast CIDs.
#[derive(Debug, Clone)]
pub struct CidFactory {
    basic_count: u16,
    basic: CidPool,
    primary: CidPool,
    transport: CidPool,
    multicast: CidPool,
    live: HashSet<u16>,
}

impl Default for CidFactory {
    fn default() -> Self {
        Self::new(DEFAULT_BASIC_CID_COUNT)
    }
}

impl CidFactory {
    /// Create a factory with `basic_count` basic CIDs.
    /// Panics if the basic and primary ranges do not leave room for transport CIDs.
    pub fn new(basic_count: u16) -> Self {
        assert!(basic_count > 0, "CidFactory needs at least one basic CID");
        assert!((basic_count as u32) * 2 < TRANSPORT_LAST as u32, "basic_count {} too large", basic_count);
        let m = basic_count;
        CidFactory {
            basic_count,
            basic: CidPool::new(1, m),
            primary: CidPool::new(m + 1, 2 * m),
            transport: CidPool::new(2 * m + 1, TRANSPORT_LAST),
            multicast: CidPool::new(MULTICAST_FIRST, MULTICAST_LAST),
            live: HashSet::new(),
        }
    }

    pub fn basic_count(&self) -> u16 {
        self.basic_count
    }

    fn pool_mut(&mut self, cid_type: CidType) -> Result<&mut CidPool, CidAllocErr> {
        match cid_type {
            CidType::Basic => Ok(&mut self.basic),
            CidType::Primary => Ok(&mut self.primary),
            CidType::Transport => Ok(&mut self.transport),
            CidType::Multicast => Ok(&mut self.multicast),
            CidType::InitialRanging | CidType::Padding | CidType::Broadcast => {
                Err(CidAllocErr::NotAllocatable { cid_type })
            }
        }
    }

    /// Allocates the next free CID of the sub-range owned by `cid_type`
    pub fn allocate(&mut self, cid_type: CidType) -> Result<Cid, CidAllocErr> {
        let pool = self.pool_mut(cid_type)?;
        let Some(id) = pool.take() else {
            tracing::warn!("CidFactory: {} range exhausted", cid_type);
            return Err(CidAllocErr::Exhausted { cid_type });
        };
        let fresh = self.live.insert(id);
        assert!(fresh, "CidFactory: CID {:#06x} handed out twice", id);
        tracing::trace!("CidFactory: allocated {} cid {}", cid_type, id);
        Ok(Cid::new(id))
    }

    pub fn allocate_basic(&mut self) -> Result<Cid, CidAllocErr> {
        self.allocate(CidType::Basic)
    }

    pub fn allocate_primary(&mut self) -> Result<Cid, CidAllocErr> {
        self.allocate(CidType::Primary)
    }

    pub fn allocate_transport(&mut self) -> Result<Cid, CidAllocErr> {
        self.allocate(CidType::Transport)
    }

    pub fn allocate_multicast(&mut self) -> Result<Cid, CidAllocErr> {
        self.allocate(CidType::Multicast)
    }

    /// Returns a live CID to its pool. Freeing a CID that is not live is rejected
    /// and leaves the pool untouched.
    pub fn free_cid(&mut self, cid: Cid) -> Result<(), CidAllocErr> {
        if !self.live.remove(&cid.id()) {
            tracing::warn!("CidFactory: free of non-allocated cid {}", cid);
            return Err(CidAllocErr::NotAllocated { cid });
        }
        let cid_type = self.cid_type(cid);
        // Only allocatable types can ever be live
        let pool = self.pool_mut(cid_type).map_err(|_| CidAllocErr::NotAllocated { cid })?;
        pool.give_back(cid.id());
        tracing::trace!("CidFactory: freed {} cid {}", cid_type, cid);
        Ok(())
    }

    pub fn is_live(&self, cid: Cid) -> bool {
        self.live.contains(&cid.id())
    }

    pub fn num_live(&self) -> usize {
        self.live.len()
    }

    /// Number of CIDs in the sub-range of an allocatable type
    pub fn capacity(&self, cid_type: CidType) -> usize {
        match cid_type {
            CidType::Basic => self.basic.len(),
            CidType::Primary => self.primary.len(),
            CidType::Transport => self.transport.len(),
            CidType::Multicast => self.multicast.len(),
            _ => 1,
        }
    }

    /// Classifies a CID purely by its numeric value and this factory's range boundaries
    pub fn cid_type(&self, cid: Cid) -> CidType {
        let id = cid.id();
        let m = self.basic_count;
        match id {
            0x0000 => CidType::InitialRanging,
            0xFFFE => CidType::Padding,
            0xFFFF => CidType::Broadcast,
            _ if id <= m => CidType::Basic,
            _ if id <= 2 * m => CidType::Primary,
            _ if id <= TRANSPORT_LAST => CidType::Transport,
            // 0xFEFF is not assigned to any range; treat it as multicast like the rest of the top block
            _ => CidType::Multicast,
        }
    }

    pub fn is_basic(&self, cid: Cid) -> bool {
        self.cid_type(cid) == CidType::Basic
    }

    pub fn is_primary(&self, cid: Cid) -> bool {
        self.cid_type(cid) == CidType::Primary
    }

    pub fn is_transport(&self, cid: Cid) -> bool {
        self.cid_type(cid) == CidType::Transport
    }

    pub fn is_multicast(&self, cid: Cid) -> bool {
        self.cid_type(cid) == CidType::Multicast
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_range_exhaustion() {
        let mut f = CidFactory::new(4);
        let mut got = Vec::new();
        for _ in 0..4 {
            let cid = f.allocate_basic().expect("basic cid should be available");
            assert!(f.is_basic(cid), "{:?} should classify as basic", cid);
            got.push(cid);
        }
        got.sort();
        got.dedup();
        assert_eq!(got.len(), 4, "expected four distinct basic CIDs");
        assert_eq!(f.allocate_basic(), Err(CidAllocErr::Exhausted { cid_type: CidType::Basic }));
    }

    #[test]
    fn test_classification_by_range() {
        let f = CidFactory::new(10);
        assert_eq!(f.cid_type(Cid::INITIAL_RANGING), CidType::InitialRanging);
        assert_eq!(f.cid_type(Cid::new(1)), CidType::Basic);
        assert_eq!(f.cid_type(Cid::new(10)), CidType::Basic);
        assert_eq!(f.cid_type(Cid::new(11)), CidType::Primary);
        assert_eq!(f.cid_type(Cid::new(20)), CidType::Primary);
        assert_eq!(f.cid_type(Cid::new(21)), CidType::Transport);
        assert_eq!(f.cid_type(Cid::new(0xFEFE)), CidType::Transport);
        assert_eq!(f.cid_type(Cid::new(0xFF00)), CidType::Multicast);
        assert_eq!(f.cid_type(Cid::PADDING), CidType::Padding);
        assert_eq!(f.cid_type(Cid::BROADCAST), CidType::Broadcast);
    }

    #[test]
    fn test_free_and_reuse() {
        let mut f = CidFactory::new(4);
        let a = f.allocate_transport().unwrap();
        let b = f.allocate_transport().unwrap();
        assert_ne!(a, b);
        f.free_cid(a).unwrap();
        assert!(!f.is_live(a));
        let c = f.allocate_transport().unwrap();
        assert_eq!(c, a, "freed CID should be recycled first");
        assert!(f.is_live(b) && f.is_live(c));
    }

    #[test]
    fn test_double_free_rejected() {
        let mut f = CidFactory::new(4);
        let a = f.allocate_primary().unwrap();
        f.free_cid(a).unwrap();
        assert_eq!(f.free_cid(a), Err(CidAllocErr::NotAllocated { cid: a }));

        // Pool must be intact: exactly 4 primaries available, all distinct
        let mut got = Vec::new();
        while let Ok(cid) = f.allocate_primary() {
            got.push(cid);
        }
        let n = got.len();
        got.dedup();
        assert_eq!(n, 4);
        assert_eq!(got.len(), 4);
    }

    #[test]
    fn test_fixed_cids_not_allocatable() {
        let mut f = CidFactory::new(4);
        assert_eq!(
            f.allocate(CidType::Broadcast),
            Err(CidAllocErr::NotAllocatable { cid_type: CidType::Broadcast })
        );
        assert_eq!(f.free_cid(Cid::BROADCAST), Err(CidAllocErr::NotAllocated { cid: Cid::BROADCAST }));
    }

    #[test]
    fn test_uniqueness_under_churn() {
        let mut f = CidFactory::new(8);
        let mut live: Vec<Cid> = Vec::new();
        // Deterministic pseudo-random churn over all types
        let mut x: u32 = 0x1234_5678;
        for _ in 0..2000 {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            let t = match x % 3 {
                0 => CidType::Basic,
                1 => CidType::Primary,
                _ => CidType::Transport,
            };
            if x % 5 < 3 || live.is_empty() {
                if let Ok(cid) = f.allocate(t) {
                    assert!(!live.contains(&cid), "CID {:?} handed out while still live", cid);
                    live.push(cid);
                }
            } else {
                let idx = (x as usize / 7) % live.len();
                let cid = live.swap_remove(idx);
                f.free_cid(cid).unwrap();
            }
            assert_eq!(f.num_live(), live.len());
        }
    }
}
