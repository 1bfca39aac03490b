use std::collections::BTreeMap;

use wimax_core::{Cid, CidAllocErr, CidFactory, CidType, Sfid};

use crate::mac::connection::WimaxConnection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMgrErr {
    CidAlloc(CidAllocErr),
    NotFound { cid: Cid },
    AlreadyExists { cid: Cid },
    /// Allocation requested on a manager that only mirrors CIDs assigned elsewhere
    NoCidFactory,
}

impl From<CidAllocErr> for ConnectionMgrErr {
    fn from(e: CidAllocErr) -> Self {
        ConnectionMgrErr::CidAlloc(e)
    }
}

/// Connections of one device keyed by CID. The BS instance owns the CID factory; an SS
/// instance registers the CIDs the BS assigned to it.
pub struct ConnectionManager {
    factory: Option<CidFactory>,
    connections: BTreeMap<Cid, WimaxConnection>,
    queue_max_bytes: usize,
}

impl ConnectionManager {
    fn with_factory(factory: Option<CidFactory>, queue_max_bytes: usize) -> Self {
        let mut connections = BTreeMap::new();
        for (cid, cid_type) in [(Cid::INITIAL_RANGING, CidType::InitialRanging), (Cid::BROADCAST, CidType::Broadcast)] {
            connections.insert(cid, WimaxConnection::new(cid, cid_type, queue_max_bytes));
        }
        ConnectionManager { factory, connections, queue_max_bytes }
    }

    pub fn new_bs(factory: CidFactory, queue_max_bytes: usize) -> Self {
        Self::with_factory(Some(factory), queue_max_bytes)
    }

    pub fn new_ss(queue_max_bytes: usize) -> Self {
        Self::with_factory(None, queue_max_bytes)
    }

    pub fn factory(&self) -> Option<&CidFactory> {
        self.factory.as_ref()
    }

    /// Allocates a CID of `cid_type` and creates its connection
    pub fn allocate(&mut self, cid_type: CidType) -> Result<Cid, ConnectionMgrErr> {
        let factory = self.factory.as_mut().ok_or(ConnectionMgrErr::NoCidFactory)?;
        let cid = factory.allocate(cid_type)?;
        self.connections.insert(cid, WimaxConnection::new(cid, cid_type, self.queue_max_bytes));
        tracing::debug!("ConnectionManager: new {} connection {}", cid_type, cid);
        Ok(cid)
    }

    /// Registers a connection for a CID assigned by the peer
    pub fn add_connection(&mut self, cid: Cid, cid_type: CidType) -> Result<(), ConnectionMgrErr> {
        if self.connections.contains_key(&cid) {
            return Err(ConnectionMgrErr::AlreadyExists { cid });
        }
        self.connections.insert(cid, WimaxConnection::new(cid, cid_type, self.queue_max_bytes));
        tracing::debug!("ConnectionManager: added {} connection {}", cid_type, cid);
        Ok(())
    }

    /// Removes a connection and returns its CID to the factory, if this manager has one
    pub fn remove(&mut self, cid: Cid) -> Result<WimaxConnection, ConnectionMgrErr> {
        let conn = self.connections.remove(&cid).ok_or(ConnectionMgrErr::NotFound { cid })?;
        if let Some(factory) = self.factory.as_mut() {
            factory.free_cid(cid)?;
        }
        tracing::debug!("ConnectionManager: removed {}", conn);
        Ok(conn)
    }

    pub fn bind_service_flow(&mut self, cid: Cid, sfid: Sfid) -> Result<(), ConnectionMgrErr> {
        let conn = self.connections.get_mut(&cid).ok_or(ConnectionMgrErr::NotFound { cid })?;
        conn.set_sfid(sfid);
        Ok(())
    }

    pub fn get(&self, cid: Cid) -> Option<&WimaxConnection> {
        self.connections.get(&cid)
    }

    pub fn get_mut(&mut self, cid: Cid) -> Option<&mut WimaxConnection> {
        self.connections.get_mut(&cid)
    }

    pub fn contains(&self, cid: Cid) -> bool {
        self.connections.contains_key(&cid)
    }

    pub fn cid_type(&self, cid: Cid) -> Option<CidType> {
        self.connections.get(&cid).map(|c| c.cid_type())
    }

    /// Connections of one type, in CID order
    pub fn connections_of_type(&self, cid_type: CidType) -> impl Iterator<Item = &WimaxConnection> {
        self.connections.values().filter(move |c| c.cid_type() == cid_type)
    }

    pub fn has_packets(&self) -> bool {
        self.connections.values().any(|c| c.has_packets())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
