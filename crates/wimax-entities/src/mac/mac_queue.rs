use std::collections::VecDeque;

use wimax_core::SimTime;
use wimax_pdus::mac::{
    FRAG_SUBHEADER_LEN, FragmentationControl, FragmentationSubheader, MAC_HEADER_LEN, MacHeader, MacHeaderType, MacPdu,
};

use crate::mac::packet::Packet;

/// FSN field is 11 bits
const FSN_MODULUS: u16 = 2048;

/// Header plus fragmentation subheader, the least a fragment costs besides its payload
pub const FRAGMENT_OVERHEAD: usize = MAC_HEADER_LEN + FRAG_SUBHEADER_LEN;

#[derive(Debug, Clone)]
pub struct QueueElement {
    pub packet: Packet,
    pub header: MacHeader,
    /// Time the packet was enqueued
    pub timestamp: SimTime,
    /// Set once the first fragment has been sent
    pub fragmented: bool,
    /// FSN of the next fragment
    pub fragment_number: u16,
    /// Payload bytes already sent in earlier fragments
    pub fragment_offset: usize,
}

impl QueueElement {
    fn header_type(&self) -> MacHeaderType {
        self.header.header_type()
    }

    /// Payload bytes not yet sent
    pub fn remaining(&self) -> usize {
        self.packet.len() - self.fragment_offset
    }

    /// Bytes needed to send the rest of this element in one PDU
    pub fn required_bytes(&self) -> usize {
        let sub = if self.fragmented { FRAG_SUBHEADER_LEN } else { 0 };
        self.remaining() + MAC_HEADER_LEN + sub
    }

    /// The PDU carrying the rest of the element. An element already fragmented
    /// closes with a `Last` fragment.
    fn to_pdu(&self) -> MacPdu {
        match &self.header {
            MacHeader::Generic(h) => {
                let frag = self.fragmented.then_some(FragmentationSubheader {
                    fc: FragmentationControl::Last,
                    fsn: self.fragment_number,
                });
                MacPdu::generic(h.cid, frag, self.packet.payload[self.fragment_offset..].to_vec())
            }
            MacHeader::BandwidthRequest(h) => MacPdu::bandwidth_request(*h),
        }
    }
}

/// Per-connection FIFO of outgoing packets, bounded by queued payload bytes.
/// Generic and bandwidth request elements share one deque but are addressed independently.
#[derive(Debug, Clone)]
pub struct WimaxMacQueue {
    max_size: usize,
    queue: VecDeque<QueueElement>,
    /// Payload bytes still queued, partially sent elements counted by their remainder
    n_bytes: usize,
    n_data_packets: usize,
    n_request_packets: usize,
}

impl WimaxMacQueue {
    pub fn new(max_size: usize) -> Self {
        WimaxMacQueue { max_size, queue: VecDeque::new(), n_bytes: 0, n_data_packets: 0, n_request_packets: 0 }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Appends a packet. Returns false, leaving the queue untouched, when the payload
    /// would push the queue over its byte budget.
    pub fn enqueue(&mut self, packet: Packet, header: MacHeader, now: SimTime) -> bool {
        if self.n_bytes + packet.len() > self.max_size {
            tracing::debug!(
                "WimaxMacQueue: drop {} byte packet for cid {}, {} of {} bytes queued",
                packet.len(),
                header.cid(),
                self.n_bytes,
                self.max_size
            );
            return false;
        }
        match header.header_type() {
            MacHeaderType::Generic => self.n_data_packets += 1,
            MacHeaderType::BandwidthRequest => self.n_request_packets += 1,
        }
        self.n_bytes += packet.len();
        self.queue.push_back(QueueElement {
            packet,
            header,
            timestamp: now,
            fragmented: false,
            fragment_number: 0,
            fragment_offset: 0,
        });
        true
    }

    fn position_of(&self, header_type: MacHeaderType) -> Option<usize> {
        self.queue.iter().position(|e| e.header_type() == header_type)
    }

    fn remove_at(&mut self, idx: usize) -> Option<QueueElement> {
        let elem = self.queue.remove(idx)?;
        self.n_bytes -= elem.remaining();
        match elem.header_type() {
            MacHeaderType::Generic => self.n_data_packets -= 1,
            MacHeaderType::BandwidthRequest => self.n_request_packets -= 1,
        }
        Some(elem)
    }

    /// Removes the head element of `header_type` and returns it as a complete PDU
    pub fn dequeue(&mut self, header_type: MacHeaderType) -> Option<MacPdu> {
        let idx = self.position_of(header_type)?;
        let pdu = self.queue[idx].to_pdu();
        self.remove_at(idx);
        Some(pdu)
    }

    /// Dequeues the head element of `header_type` if it fits in `available_bytes`, otherwise
    /// sends a fragment of it filling `available_bytes` exactly. The rest stays at the head.
    /// None when nothing is queued or `available_bytes` cannot carry any payload.
    pub fn dequeue_bytes(&mut self, header_type: MacHeaderType, available_bytes: usize) -> Option<MacPdu> {
        let idx = self.position_of(header_type)?;
        if self.queue[idx].required_bytes() <= available_bytes {
            return self.dequeue(header_type);
        }
        if header_type == MacHeaderType::BandwidthRequest || available_bytes <= FRAGMENT_OVERHEAD {
            return None;
        }

        let frag_len = available_bytes - FRAGMENT_OVERHEAD;
        let elem = &mut self.queue[idx];
        let MacHeader::Generic(hdr) = elem.header else {
            return None;
        };
        let fc = if elem.fragmented { FragmentationControl::Middle } else { FragmentationControl::First };
        let sub = FragmentationSubheader { fc, fsn: elem.fragment_number };
        let start = elem.fragment_offset;
        let payload = elem.packet.payload[start..start + frag_len].to_vec();

        elem.fragmented = true;
        elem.fragment_offset += frag_len;
        elem.fragment_number = (elem.fragment_number + 1) % FSN_MODULUS;
        self.n_bytes -= frag_len;
        tracing::trace!("WimaxMacQueue: cid {} {} fragment fsn {} of {} bytes", hdr.cid, fc, sub.fsn, frag_len);

        Some(MacPdu::generic(hdr.cid, Some(sub), payload))
    }

    /// The PDU `dequeue(header_type)` would return
    pub fn peek(&self, header_type: MacHeaderType) -> Option<MacPdu> {
        self.front(header_type).map(|e| e.to_pdu())
    }

    pub fn front(&self, header_type: MacHeaderType) -> Option<&QueueElement> {
        self.queue.iter().find(|e| e.header_type() == header_type)
    }

    /// Payload bytes plus the header of each element and the subheader of a fragmented head
    pub fn queue_length_with_mac_overhead(&self) -> usize {
        let subheaders = self.queue.iter().filter(|e| e.fragmented).count() * FRAG_SUBHEADER_LEN;
        self.n_bytes + self.queue.len() * MAC_HEADER_LEN + subheaders
    }

    pub fn first_packet_required_bytes(&self, header_type: MacHeaderType) -> usize {
        self.front(header_type).map_or(0, |e| e.required_bytes())
    }

    pub fn check_for_fragmentation(&self, header_type: MacHeaderType) -> bool {
        self.front(header_type).is_some_and(|e| e.fragmented)
    }

    /// Drops generic elements queued for longer than `max_latency`. Elements already
    /// partially sent are kept so the receiver can complete them.
    pub fn drop_expired(&mut self, now: SimTime, max_latency: SimTime) -> usize {
        let mut dropped = 0;
        let mut idx = 0;
        while idx < self.queue.len() {
            let e = &self.queue[idx];
            if e.header_type() == MacHeaderType::Generic && !e.fragmented && now.since(e.timestamp) > max_latency {
                self.remove_at(idx);
                dropped += 1;
            } else {
                idx += 1;
            }
        }
        if dropped > 0 {
            tracing::debug!("WimaxMacQueue: dropped {} packets older than {}", dropped, max_latency);
        }
        dropped
    }

    pub fn size(&self) -> usize {
        self.queue.len()
    }

    pub fn n_bytes(&self) -> usize {
        self.n_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_empty_of(&self, header_type: MacHeaderType) -> bool {
        match header_type {
            MacHeaderType::Generic => self.n_data_packets == 0,
            MacHeaderType::BandwidthRequest => self.n_request_packets == 0,
        }
    }

    pub fn n_data_packets(&self) -> usize {
        self.n_data_packets
    }

    pub fn n_request_packets(&self) -> usize {
        self.n_request_packets
    }
}

#[cfg(test)]
mod tests {
    use wimax_core::{Cid, debug};
    use wimax_pdus::mac::{BwRequestHeader, BwRequestType, GenericMacHeader};

    use super::*;

    fn data_hdr(cid: u16) -> MacHeader {
        MacHeader::Generic(GenericMacHeader::new(Cid::new(cid)))
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_byte_budget() {
        debug::setup_logging_verbose();
        let mut q = WimaxMacQueue::new(1000);
        assert!(q.enqueue(Packet::new(vec![0; 600]), data_hdr(100), SimTime::ZERO));
        assert!(!q.enqueue(Packet::new(vec![0; 500]), data_hdr(100), SimTime::ZERO), "500 more bytes exceed budget");
        assert_eq!(q.n_bytes(), 600);
        assert_eq!(q.size(), 1);
        assert_eq!(q.queue_length_with_mac_overhead(), 606);
        assert!(q.enqueue(Packet::new(vec![0; 400]), data_hdr(100), SimTime::ZERO), "exact fit must be accepted");
        assert_eq!(q.n_bytes(), 1000);
    }

    #[test]
    fn test_fragments_reassemble() {
        debug::setup_logging_verbose();
        let mut q = WimaxMacQueue::new(10_000);
        let payload = pattern(250);
        q.enqueue(Packet::new(payload.clone()), data_hdr(300), SimTime::ZERO);

        // Too small for any payload
        assert!(q.dequeue_bytes(MacHeaderType::Generic, 8).is_none());

        let first = q.dequeue_bytes(MacHeaderType::Generic, 108).expect("first fragment");
        assert_eq!(first.serialized_size(), 108);
        let f = first.frag.expect("subheader");
        assert_eq!((f.fc, f.fsn), (FragmentationControl::First, 0));
        assert!(q.check_for_fragmentation(MacHeaderType::Generic));
        assert_eq!(q.n_bytes(), 150);
        assert_eq!(q.first_packet_required_bytes(MacHeaderType::Generic), 158);
        assert_eq!(q.queue_length_with_mac_overhead(), 158);

        let middle = q.dequeue_bytes(MacHeaderType::Generic, 108).expect("middle fragment");
        let f = middle.frag.expect("subheader");
        assert_eq!((f.fc, f.fsn), (FragmentationControl::Middle, 1));

        let last = q.dequeue_bytes(MacHeaderType::Generic, 108).expect("last fragment");
        let f = last.frag.expect("subheader");
        assert_eq!((f.fc, f.fsn), (FragmentationControl::Last, 2));
        assert_eq!(last.payload.len(), 50);
        assert!(q.is_empty());
        assert_eq!(q.n_bytes(), 0);

        let joined: Vec<u8> = [first.payload, middle.payload, last.payload].concat();
        assert_eq!(joined, payload);
    }

    #[test]
    fn test_whole_packet_when_it_fits() {
        let mut q = WimaxMacQueue::new(10_000);
        q.enqueue(Packet::new(pattern(100)), data_hdr(300), SimTime::ZERO);
        let pdu = q.dequeue_bytes(MacHeaderType::Generic, 106).expect("fits exactly");
        assert!(pdu.frag.is_none());
        assert_eq!(pdu.payload.len(), 100);
    }

    #[test]
    fn test_header_types_independent() {
        let mut q = WimaxMacQueue::new(10_000);
        q.enqueue(Packet::new(pattern(40)), data_hdr(300), SimTime::ZERO);
        let br = BwRequestHeader::new(BwRequestType::Aggregate, 46, Cid::new(300));
        q.enqueue(Packet::new(Vec::new()), MacHeader::BandwidthRequest(br), SimTime::ZERO);
        assert_eq!(q.n_data_packets(), 1);
        assert_eq!(q.n_request_packets(), 1);

        let pdu = q.dequeue(MacHeaderType::BandwidthRequest).expect("request queued behind data");
        assert_eq!(pdu.header, MacHeader::BandwidthRequest(br));
        assert!(q.is_empty_of(MacHeaderType::BandwidthRequest));
        assert!(!q.is_empty_of(MacHeaderType::Generic));
        assert_eq!(q.peek(MacHeaderType::Generic).map(|p| p.payload.len()), Some(40));
        assert_eq!(q.size(), 1);
    }

    #[test]
    fn test_drop_expired() {
        let mut q = WimaxMacQueue::new(10_000);
        q.enqueue(Packet::new(pattern(10)), data_hdr(300), SimTime::from_ms(0));
        q.enqueue(Packet::new(pattern(10)), data_hdr(300), SimTime::from_ms(30));
        assert_eq!(q.drop_expired(SimTime::from_ms(50), SimTime::from_ms(40)), 1);
        assert_eq!(q.size(), 1);
        assert_eq!(q.front(MacHeaderType::Generic).map(|e| e.timestamp), Some(SimTime::from_ms(30)));
    }
}
