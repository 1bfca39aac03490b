pub mod connection;
pub mod connection_mgr;
pub mod mac_queue;
pub mod packet;

use wimax_core::{ByteBuffer, Cid};
use wimax_pdus::mac::MacPdu;
use wimax_pdus::mgmt::MgmtMsg;

pub use connection::WimaxConnection;
pub use connection_mgr::{ConnectionManager, ConnectionMgrErr};
pub use mac_queue::{QueueElement, WimaxMacQueue};
pub use packet::Packet;

/// Decodes the management message carried by a PDU on `cid`. Malformed payloads are
/// logged with a hex dump and dropped.
pub fn parse_mgmt_msg(cid: Cid, payload: &[u8]) -> Option<MgmtMsg> {
    let mut buf = ByteBuffer::from_bytes(payload);
    match MgmtMsg::from_bytes(&mut buf) {
        Ok(msg) => {
            tracing::debug!("<- {:?}", msg);
            Some(msg)
        }
        Err(e) => {
            tracing::warn!("Failed parsing management message on cid {}: {:?} {}", cid, e, buf.dump_hex());
            None
        }
    }
}

/// Concatenates PDUs into the bytes of one burst
pub fn encode_burst<'a>(pdus: impl IntoIterator<Item = &'a MacPdu>) -> Vec<u8> {
    let mut buf = ByteBuffer::new_autoexpand(256);
    for pdu in pdus {
        pdu.to_bytes(&mut buf);
    }
    buf.into_bytes()
}
