use core::fmt;

use wimax_core::{Cid, CidType, Sfid, SimTime};
use wimax_pdus::mac::{BwRequestHeader, FragmentationControl, GenericMacHeader, MacHeader, MacPdu};

use crate::mac::mac_queue::WimaxMacQueue;
use crate::mac::packet::Packet;

/// Fragments of one SDU collected so far
#[derive(Debug, Clone)]
struct Reassembly {
    next_fsn: u16,
    data: Vec<u8>,
}

/// One MAC connection: its CID, outgoing queue, the service flow it carries (transport
/// connections only) and the receive-side fragment buffer.
#[derive(Debug, Clone)]
pub struct WimaxConnection {
    cid: Cid,
    cid_type: CidType,
    queue: WimaxMacQueue,
    sfid: Option<Sfid>,
    reassembly: Option<Reassembly>,
    /// Fragment sequences abandoned because a fragment went missing
    reassembly_errors: u64,
}

impl WimaxConnection {
    pub fn new(cid: Cid, cid_type: CidType, queue_max_bytes: usize) -> Self {
        WimaxConnection {
            cid,
            cid_type,
            queue: WimaxMacQueue::new(queue_max_bytes),
            sfid: None,
            reassembly: None,
            reassembly_errors: 0,
        }
    }

    pub fn cid(&self) -> Cid {
        self.cid
    }

    pub fn cid_type(&self) -> CidType {
        self.cid_type
    }

    pub fn sfid(&self) -> Option<Sfid> {
        self.sfid
    }

    pub fn set_sfid(&mut self, sfid: Sfid) {
        self.sfid = Some(sfid);
    }

    pub fn queue(&self) -> &WimaxMacQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut WimaxMacQueue {
        &mut self.queue
    }

    pub fn has_packets(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Queues a payload for transmission under a generic header on this CID
    pub fn enqueue(&mut self, packet: Packet, now: SimTime) -> bool {
        self.queue.enqueue(packet, MacHeader::Generic(GenericMacHeader::new(self.cid)), now)
    }

    pub fn enqueue_bw_request(&mut self, hdr: BwRequestHeader, now: SimTime) -> bool {
        self.queue.enqueue(Packet::new(Vec::new()), MacHeader::BandwidthRequest(hdr), now)
    }

    pub fn reassembly_errors(&self) -> u64 {
        self.reassembly_errors
    }

    /// Feeds a received generic PDU of this connection. Returns the SDU once complete:
    /// immediately for unfragmented PDUs, on the `Last` fragment otherwise.
    /// An out-of-sequence fragment discards the partial SDU.
    pub fn reassemble(&mut self, pdu: MacPdu) -> Option<Vec<u8>> {
        let Some(frag) = pdu.frag else {
            if self.reassembly.take().is_some() {
                self.reassembly_errors += 1;
                tracing::debug!("cid {}: unfragmented PDU interrupts reassembly", self.cid);
            }
            return Some(pdu.payload);
        };

        match frag.fc {
            FragmentationControl::NoFragmentation => Some(pdu.payload),
            FragmentationControl::First => {
                if self.reassembly.is_some() {
                    self.reassembly_errors += 1;
                }
                self.reassembly = Some(Reassembly { next_fsn: (frag.fsn + 1) % 2048, data: pdu.payload });
                None
            }
            FragmentationControl::Middle | FragmentationControl::Last => {
                let Some(mut r) = self.reassembly.take() else {
                    self.reassembly_errors += 1;
                    tracing::debug!("cid {}: {} fragment without First, dropped", self.cid, frag.fc);
                    return None;
                };
                if r.next_fsn != frag.fsn {
                    self.reassembly_errors += 1;
                    tracing::debug!("cid {}: expected fsn {}, got {}, sdu dropped", self.cid, r.next_fsn, frag.fsn);
                    return None;
                }
                r.data.extend_from_slice(&pdu.payload);
                if frag.fc == FragmentationControl::Last {
                    Some(r.data)
                } else {
                    r.next_fsn = (r.next_fsn + 1) % 2048;
                    self.reassembly = Some(r);
                    None
                }
            }
        }
    }
}

impl fmt::Display for WimaxConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cid {}", self.cid_type, self.cid)?;
        if let Some(sfid) = self.sfid {
            write!(f, " sfid {}", sfid)?;
        }
        Ok(())
    }
}
