use std::collections::BTreeMap;

use wimax_config::{CORE_IP, CfgSubscriber, SharedConfig};
use wimax_core::{ByteBuffer, Cid, CidType, MacAddress, ModulationType, SchedulingType, SfDirection, Sfid};
use wimax_pdus::burst::BurstProfileManager;
use wimax_pdus::burst::iuc::{diuc, uiuc};
use wimax_pdus::mac::{
    BwRequestHeader, BwRequestType, FragmentationControl, MAC_HEADER_LEN, MacHeader, MacHeaderType, MacPdu,
};
use wimax_pdus::mgmt::{Dcd, MgmtMsg, Ucd, UlMap, UlMapIe};

use crate::mac::mac_queue::FRAGMENT_OVERHEAD;
use crate::mac::{ConnectionManager, Packet, encode_burst, parse_mgmt_msg};
use crate::phy::{PhyStats, SimpleOfdmPhy, WimaxPhy};
use crate::sflow::traffic::{TrafficSource, flow_params};
use crate::sflow::{DsaOutcome, DsaState, DsaTimeoutAction, ServiceFlowManager, SsServiceFlowManager};
use crate::ss::ss_link_mgr::{LinkState, SsLinkManager};
use crate::{AirMsg, EntityId, FrameTime, MessageQueue, WimaxEntityTrait};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SsStats {
    pub dl_subframes: u64,
    pub dl_parse_errors: u64,
    pub ul_bursts: u64,
    pub bw_requests: u64,
    /// Generated packets no active uplink flow accepted
    pub ul_unclassified: u64,
}

/// Subscriber station: ranges with the BS, negotiates its configured service flows
/// one DSA transaction at a time and then carries their traffic.
pub struct SsNetDevice {
    subscriber: CfgSubscriber,
    phy: SimpleOfdmPhy,
    conns: ConnectionManager,
    sf_mgr: SsServiceFlowManager,
    link_mgr: SsLinkManager,
    dcd: Option<Dcd>,
    ucd: Option<Ucd>,
    profiles: Option<BurstProfileManager>,
    ul_traffic: BTreeMap<Sfid, TrafficSource>,
    ts: FrameTime,
    stats: SsStats,
}

impl SsNetDevice {
    pub fn new(config: SharedConfig, subscriber: CfgSubscriber) -> Self {
        let cfg = config.config();
        let mut sf_mgr = SsServiceFlowManager::new(&cfg.mac);
        for (i, cfg_sf) in subscriber.service_flows.iter().enumerate() {
            sf_mgr.add_requested_flow(flow_params(cfg_sf, subscriber.ip_address, CORE_IP, i as u16));
        }
        Self {
            phy: SimpleOfdmPhy::new(&cfg.phy),
            conns: ConnectionManager::new_ss(cfg.mac.queue_max_bytes),
            sf_mgr,
            link_mgr: SsLinkManager::new(
                subscriber.mac_address,
                cfg.mac.max_ranging_correction_retries,
                subscriber.ranging_corrections,
            ),
            dcd: None,
            ucd: None,
            profiles: None,
            ul_traffic: BTreeMap::new(),
            ts: FrameTime::default(),
            stats: SsStats::default(),
            subscriber,
        }
    }

    pub fn mac_address(&self) -> MacAddress {
        self.subscriber.mac_address
    }

    pub fn link_state(&self) -> LinkState {
        self.link_mgr.state()
    }

    pub fn service_flows(&self) -> &ServiceFlowManager {
        self.sf_mgr.flows()
    }

    pub fn dsa_states(&self) -> Vec<DsaState> {
        self.sf_mgr.states().collect()
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.conns
    }

    pub fn stats(&self) -> SsStats {
        self.stats
    }

    pub fn phy_stats(&self) -> PhyStats {
        self.phy.stats()
    }

    fn enqueue_mgmt(&mut self, cid: Cid, msg: MgmtMsg) {
        tracing::debug!("-> {:?} on cid {}", msg, cid);
        let ok = self.conns.get_mut(cid).is_some_and(|c| c.enqueue(Packet::new(msg.to_vec()), self.ts.start));
        if !ok {
            tracing::warn!("{}: cannot queue {} on cid {}", self.subscriber.mac_address, msg.msg_type(), cid);
        }
    }

    fn generate_uplink_traffic(&mut self) {
        let frame_duration = self.phy.frame_duration();
        let now = self.ts.start;
        for source in self.ul_traffic.values_mut() {
            for packet in source.generate(frame_duration) {
                let Some(tuple) = packet.tuple else { continue };
                let Some(sfid) = self.sf_mgr.classify(&tuple) else {
                    self.stats.ul_unclassified += 1;
                    continue;
                };
                let Some(flow) = self.sf_mgr.flows_mut().get_mut(sfid) else { continue };
                let accepted = self.conns.get_mut(flow.cid()).is_some_and(|c| c.enqueue(packet, now));
                if !accepted {
                    tracing::debug!("sfid {}: uplink queue full, packet dropped", sfid);
                    flow.record_mut().update_pkts_dropped(1);
                }
            }
        }
    }

    fn rx_broadcast(&mut self, cid: Cid, payload: &[u8]) -> Option<UlMap> {
        match parse_mgmt_msg(cid, payload)? {
            MgmtMsg::UlMap(ul_map) => return Some(ul_map),
            MgmtMsg::DlMap(dl_map) => {
                tracing::trace!("{}: {} downlink bursts", dl_map.base_station_id, dl_map.bursts().count());
            }
            MgmtMsg::Dcd(dcd) => self.dcd = Some(dcd),
            MgmtMsg::Ucd(ucd) => self.ucd = Some(ucd),
            other => tracing::warn!("unexpected {} on broadcast cid", other.msg_type()),
        }

        if let (Some(dcd), Some(ucd)) = (&self.dcd, &self.ucd) {
            let profiles = BurstProfileManager::from_descriptors(dcd, ucd);
            if self.link_mgr.state() == LinkState::Scanning {
                let req_diuc = profiles.diuc_for(self.subscriber.modulation).unwrap_or(diuc::BURST_FIRST);
                self.link_mgr.start(ucd, req_diuc);
            }
            self.profiles = Some(profiles);
        }
        None
    }

    fn rx_ranging(&mut self, cid: Cid, payload: &[u8]) {
        match parse_mgmt_msg(cid, payload) {
            Some(MgmtMsg::RngRsp(rsp)) => {
                self.link_mgr.process_ranging_response(&rsp, &mut self.conns);
            }
            Some(other) => tracing::warn!("unexpected {} on ranging cid", other.msg_type()),
            None => {}
        }
    }

    fn rx_primary(&mut self, cid: Cid, payload: &[u8]) {
        let Some(msg) = parse_mgmt_msg(cid, payload) else { return };
        let MgmtMsg::DsaRsp(rsp) = msg else {
            tracing::warn!("unexpected {} on primary cid {}", msg.msg_type(), cid);
            return;
        };
        let (ack, outcome) = match self.sf_mgr.process_dsa_rsp(&rsp) {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!("DSA-RSP {}: {}", rsp.transaction_id, e);
                return;
            }
        };
        self.enqueue_mgmt(cid, MgmtMsg::DsaAck(ack));
        match outcome {
            Some(DsaOutcome::Admitted { sfid }) => self.start_service_flow(sfid),
            Some(DsaOutcome::Rejected { code }) => {
                tracing::warn!("{}: DSA-REQ {} rejected: {}", self.subscriber.mac_address, rsp.transaction_id, code)
            }
            Some(DsaOutcome::Failed) | None => {}
        }
    }

    /// Creates the transport connection of an admitted flow, activates it and starts
    /// the configured uplink traffic
    fn start_service_flow(&mut self, sfid: Sfid) {
        let Some(flow) = self.sf_mgr.flows().get(sfid) else { return };
        let cid = flow.cid();
        let direction = flow.direction();
        let index = flow.classifier().map(|c| c.index as usize);

        let res = self.conns.add_connection(cid, CidType::Transport).and_then(|_| self.conns.bind_service_flow(cid, sfid));
        if let Err(e) = res {
            tracing::warn!("sfid {}: transport connection {}: {:?}", sfid, cid, e);
            return;
        }
        if let Err(e) = self.sf_mgr.activate(sfid) {
            tracing::warn!("{}", e);
            return;
        }

        if direction != SfDirection::Up {
            return;
        }
        let Some(cfg_sf) = index.and_then(|i| self.subscriber.service_flows.get(i)) else { return };
        if cfg_sf.traffic_rate > 0 {
            tracing::debug!("sfid {}: {} bit/s uplink traffic", sfid, cfg_sf.traffic_rate);
            self.ul_traffic.insert(sfid, TrafficSource::new(cfg_sf, self.subscriber.ip_address, CORE_IP));
        }
    }

    fn rx_data(&mut self, pdu: MacPdu) {
        let cid = pdu.cid();
        let Some(conn) = self.conns.get_mut(cid) else { return };
        let Some(sdu) = conn.reassemble(pdu) else { return };
        if let Some(flow) = self.sf_mgr.flows_mut().get_by_cid_mut(cid) {
            tracing::trace!("sfid {}: received {} bytes", flow.sfid(), sdu.len());
            flow.record_mut().update_pkts_rcvd(sdu.len());
        }
    }

    fn modulation_for(&self, ie: &UlMapIe) -> ModulationType {
        self.profiles
            .as_ref()
            .and_then(|p| p.modulation_for_uiuc(ie.uiuc))
            .unwrap_or(self.subscriber.modulation)
    }

    /// Bytes that fit in the allocation of `ie`
    fn allocation_bytes(&self, ie: &UlMapIe) -> usize {
        self.phy.nr_bytes(ie.duration as u32, self.modulation_for(ie)) as usize
    }

    /// Bandwidth request for everything queued on `cid`, None when the queue is empty
    fn aggregate_request(&mut self, cid: Cid) -> Option<MacPdu> {
        let now = self.ts.start;
        let conn = self.conns.get_mut(cid)?;
        let backlog = conn.queue().queue_length_with_mac_overhead() as u32;
        if backlog == 0 {
            return None;
        }
        conn.enqueue_bw_request(BwRequestHeader::new(BwRequestType::Aggregate, backlog, cid), now);
        self.stats.bw_requests += 1;
        conn.queue_mut().dequeue(MacHeaderType::BandwidthRequest)
    }

    /// Management allocation on the basic CID: queued DSA messages, or an empty request
    /// telling the BS that negotiation is over
    fn fill_management_allocation(&mut self, ie: &UlMapIe, pdus: &mut Vec<MacPdu>) {
        let mut left = self.allocation_bytes(ie);
        let Some(primary) = self.link_mgr.primary_cid() else { return };
        let Some(conn) = self.conns.get_mut(primary) else { return };
        while !conn.queue().is_empty_of(MacHeaderType::Generic)
            && conn.queue().first_packet_required_bytes(MacHeaderType::Generic) <= left
        {
            let Some(pdu) = conn.queue_mut().dequeue(MacHeaderType::Generic) else { break };
            left -= pdu.serialized_size();
            pdus.push(pdu);
        }
        if conn.queue().is_empty() && self.sf_mgr.all_negotiated() {
            pdus.push(MacPdu::bandwidth_request(BwRequestHeader::new(BwRequestType::Aggregate, 0, ie.cid)));
        }
    }

    /// Data grant on a transport CID. Fragments the head packet when it does not fit and
    /// piggybacks a request for what is left unless the flow is UGS.
    fn fill_data_grant(&mut self, ie: &UlMapIe, pdus: &mut Vec<MacPdu>) {
        let capacity = self.allocation_bytes(ie);
        let Some(conn) = self.conns.get_mut(ie.cid) else { return };
        let sfid = conn.sfid();

        let mut used = 0usize;
        let mut sent = Vec::new();
        while !conn.queue().is_empty_of(MacHeaderType::Generic) {
            let left = capacity - used;
            let required = conn.queue().first_packet_required_bytes(MacHeaderType::Generic);
            let pdu = if required <= left {
                conn.queue_mut().dequeue(MacHeaderType::Generic)
            } else if left > FRAGMENT_OVERHEAD {
                conn.queue_mut().dequeue_bytes(MacHeaderType::Generic, left)
            } else {
                None
            };
            let Some(pdu) = pdu else { break };
            used += pdu.serialized_size();
            sent.push(pdu);
        }

        let Some(flow) = sfid.and_then(|sfid| self.sf_mgr.flows_mut().get_mut(sfid)) else {
            pdus.extend(sent);
            return;
        };
        let rec = flow.record_mut();
        for pdu in &sent {
            rec.bytes_sent += pdu.payload.len() as u64;
            if pdu.frag.is_none_or(|f| f.fc == FragmentationControl::Last) {
                rec.pkts_sent += 1;
            }
        }
        pdus.extend(sent);

        let piggyback = flow.scheduling_type() != SchedulingType::Ugs;
        if piggyback
            && capacity - used >= MAC_HEADER_LEN
            && let Some(req) = self.aggregate_request(ie.cid)
        {
            pdus.push(req);
        }
    }

    /// Builds this frame's uplink burst from the UL-MAP allocations addressed to the station
    fn transmit(&mut self, queue: &mut MessageQueue, ul_map: &UlMap) {
        let basic = self.link_mgr.basic_cid();
        let mut pdus = Vec::new();
        for ie in ul_map.allocations() {
            if ie.cid.is_initial_ranging() && ie.uiuc == uiuc::INITIAL_RANGING {
                if let Some(req) = self.link_mgr.on_ranging_opportunity() {
                    tracing::debug!("-> {}", req);
                    pdus.push(MacPdu::generic(Cid::INITIAL_RANGING, None, MgmtMsg::RngReq(req).to_vec()));
                }
            } else if Some(ie.cid) == basic {
                if ie.uiuc == uiuc::INITIAL_RANGING {
                    if let Some(req) = self.link_mgr.on_invited_opportunity() {
                        tracing::debug!("-> invited {}", req);
                        pdus.push(MacPdu::generic(ie.cid, None, MgmtMsg::RngReq(req).to_vec()));
                    }
                } else {
                    self.fill_management_allocation(ie, &mut pdus);
                }
            } else if self.conns.cid_type(ie.cid) == Some(CidType::Transport) {
                if ie.uiuc == uiuc::REQ_REGION_FULL {
                    if let Some(req) = self.aggregate_request(ie.cid) {
                        pdus.push(req);
                    }
                } else {
                    self.fill_data_grant(ie, &mut pdus);
                }
            }
        }
        if pdus.is_empty() {
            return;
        }

        self.stats.ul_bursts += 1;
        let msg = AirMsg {
            src: EntityId::Ss(self.subscriber.mac_address),
            dest: Some(EntityId::Bs),
            frame: self.ts.frame,
            bytes: encode_burst(&pdus),
        };
        self.phy.send(queue, msg, self.subscriber.modulation);
    }
}

impl WimaxEntityTrait for SsNetDevice {
    fn entity(&self) -> EntityId {
        EntityId::Ss(self.subscriber.mac_address)
    }

    fn rx_air(&mut self, queue: &mut MessageQueue, msg: AirMsg) {
        if msg.src != EntityId::Bs {
            return;
        }
        self.stats.dl_subframes += 1;
        let mut buf = ByteBuffer::from_vec(msg.bytes);
        let pdus = match MacPdu::burst_from_bytes(&mut buf) {
            Ok(pdus) => pdus,
            Err(e) => {
                tracing::warn!("Failed parsing downlink subframe: {:?} {}", e, buf.dump_hex());
                self.stats.dl_parse_errors += 1;
                return;
            }
        };

        let mut ul_map = None;
        for pdu in pdus {
            if let MacHeader::BandwidthRequest(hdr) = pdu.header {
                tracing::warn!("bandwidth request {} on the downlink", hdr);
                continue;
            }
            let cid = pdu.cid();
            match self.conns.cid_type(cid) {
                Some(CidType::Broadcast) => {
                    if let Some(map) = self.rx_broadcast(cid, &pdu.payload) {
                        ul_map = Some(map);
                    }
                }
                Some(CidType::InitialRanging) => self.rx_ranging(cid, &pdu.payload),
                Some(CidType::Primary) => self.rx_primary(cid, &pdu.payload),
                Some(CidType::Transport) => self.rx_data(pdu),
                Some(other) => tracing::debug!("unexpected PDU on {} cid {}", other, cid),
                // Addressed to another station
                None => {}
            }
        }

        if self.link_mgr.is_ranged()
            && let Some(primary) = self.link_mgr.primary_cid()
            && let Some(req) = self.sf_mgr.schedule_dsa_req(self.ts.start)
        {
            self.enqueue_mgmt(primary, MgmtMsg::DsaReq(req));
        }

        if let Some(ul_map) = ul_map {
            self.transmit(queue, &ul_map);
        }
    }

    fn tick_start(&mut self, _queue: &mut MessageQueue, ts: FrameTime) {
        self.ts = ts;

        for action in self.sf_mgr.poll_timeouts(ts.start) {
            match action {
                DsaTimeoutAction::Retransmit(req) => match self.link_mgr.primary_cid() {
                    Some(primary) => self.enqueue_mgmt(primary, MgmtMsg::DsaReq(req)),
                    None => tracing::warn!("DSA-REQ {} retransmission without a primary cid", req.transaction_id),
                },
                DsaTimeoutAction::GaveUp { transaction_id, outcome } => {
                    tracing::warn!("{}: DSA-REQ {} {:?}", self.subscriber.mac_address, transaction_id, outcome)
                }
            }
        }

        self.generate_uplink_traffic();
    }
}

#[cfg(test)]
mod tests {
    use wimax_config::StackConfig;

    use super::*;
    use crate::bs::BsNetDevice;

    /// One frame between a BS and a station, delivering everything either side sends
    fn run_frame(bs: &mut BsNetDevice, ss: &mut SsNetDevice, frame: u32) {
        let mut queue = MessageQueue::new();
        let ts = FrameTime { frame, start: wimax_core::SimTime::from_ms(frame as u64 * 10) };
        bs.tick_start(&mut queue, ts);
        ss.tick_start(&mut queue, ts);
        while let Some(msg) = queue.pop_front() {
            match msg.dest {
                Some(EntityId::Bs) => bs.rx_air(&mut queue, msg),
                _ => ss.rx_air(&mut queue, msg),
            }
        }
    }

    #[test]
    fn test_ranging_then_empty_negotiation() {
        let config = SharedConfig::from_config(StackConfig::default());
        let mut subscriber = CfgSubscriber::numbered(0);
        subscriber.service_flows.clear();
        let mac = subscriber.mac_address;
        let mut bs = BsNetDevice::new(config.clone());
        let mut ss = SsNetDevice::new(config, subscriber);

        assert_eq!(ss.link_state(), LinkState::Scanning);
        for frame in 0..4 {
            run_frame(&mut bs, &mut ss, frame);
        }
        assert_eq!(ss.link_state(), LinkState::Ranged);
        let record = bs.ss_manager().get_by_mac(mac).unwrap();
        assert_eq!(Some(record.basic_cid), ss.link_mgr.basic_cid());
        assert!(record.are_service_flows_allocated, "no flows, the first management allocation closes negotiation");
        assert!(ss.service_flows().is_empty());
    }
}
