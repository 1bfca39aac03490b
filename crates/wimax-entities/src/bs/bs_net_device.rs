use std::collections::BTreeMap;

use wimax_config::{CORE_IP, SharedConfig};
use wimax_core::{ByteBuffer, Cid, CidFactory, CidType, ModulationType, SfDirection, Sfid};
use wimax_pdus::burst::BurstProfileManager;
use wimax_pdus::mac::{BwRequestHeader, MacHeader, MacPdu};
use wimax_pdus::mgmt::{Dcd, DcdChannelEncodings, DlMap, MgmtMsg, Ucd, UcdChannelEncodings, UlMap};

use crate::bs::bs_link_mgr::BsLinkManager;
use crate::bs::ss_manager::SsManager;
use crate::dlsched::{BsScheduler, DlSchedCtx, DlSchedule, new_bs_scheduler};
use crate::mac::{ConnectionManager, Packet, encode_burst, parse_mgmt_msg};
use crate::phy::{PhyStats, SimpleOfdmPhy, WimaxPhy};
use crate::sflow::traffic::TrafficSource;
use crate::sflow::{BsServiceFlowManager, IpcsClassifier, ServiceFlowManager};
use crate::ulsched::{RTG_PS, TTG_PS, UlSchedCtx, UplinkScheduler, new_uplink_scheduler};
use crate::{AirMsg, EntityId, FrameTime, MessageQueue, WimaxEntityTrait};

/// Contention backoff window advertised in the UCD, as powers of two
const RANGING_BACKOFF_START: u8 = 0;
const RANGING_BACKOFF_END: u8 = 3;
const REQUEST_BACKOFF_START: u8 = 0;
const REQUEST_BACKOFF_END: u8 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BsStats {
    pub frames: u64,
    pub ul_bursts: u64,
    /// Uplink bursts that could not be decoded
    pub ul_parse_errors: u64,
    pub bw_requests: u64,
    pub stations_ranged: u64,
    /// Downlink packets that matched no flow
    pub dl_unclassified: u64,
}

/// Base station: owns the CID space, the SS records and the BS side of every service
/// flow, and runs both schedulers once per frame.
pub struct BsNetDevice {
    config: SharedConfig,
    phy: SimpleOfdmPhy,
    profiles: BurstProfileManager,
    ss_mgr: SsManager,
    conns: ConnectionManager,
    sf_mgr: BsServiceFlowManager,
    link_mgr: BsLinkManager,
    ul_sched: Box<dyn UplinkScheduler>,
    dl_sched: Box<dyn BsScheduler>,
    /// Downlink traffic offered by the core network, per active downlink flow
    dl_traffic: BTreeMap<Sfid, TrafficSource>,
    ts: FrameTime,
    stats: BsStats,
}

impl BsNetDevice {
    pub fn new(config: SharedConfig) -> Self {
        let cfg = config.config();
        let phy = SimpleOfdmPhy::new(&cfg.phy);
        let ul_sched = new_uplink_scheduler(&cfg, &phy);
        let dl_sched = new_bs_scheduler(&cfg);
        tracing::info!(
            "BS {}: {:?} uplink scheduler, {:?} downlink scheduler",
            cfg.mac.bs_id,
            ul_sched.kind(),
            dl_sched.kind()
        );
        Self {
            profiles: BurstProfileManager::default(),
            ss_mgr: SsManager::new(),
            conns: ConnectionManager::new_bs(CidFactory::new(cfg.mac.basic_cid_count), cfg.mac.queue_max_bytes),
            sf_mgr: BsServiceFlowManager::new(&cfg),
            link_mgr: BsLinkManager::new(cfg.mac.max_ranging_correction_retries),
            ul_sched,
            dl_sched,
            phy,
            dl_traffic: BTreeMap::new(),
            ts: FrameTime::default(),
            stats: BsStats::default(),
            config,
        }
    }

    pub fn ss_manager(&self) -> &SsManager {
        &self.ss_mgr
    }

    pub fn service_flows(&self) -> &ServiceFlowManager {
        self.sf_mgr.flows()
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.conns
    }

    pub fn stats(&self) -> BsStats {
        self.stats
    }

    pub fn phy_stats(&self) -> PhyStats {
        self.phy.stats()
    }

    fn enqueue_mgmt(&mut self, cid: Cid, msg: MgmtMsg) {
        if cid.is_broadcast() {
            tracing::trace!("-> {}", msg);
        } else {
            tracing::debug!("-> {:?} on cid {}", msg, cid);
        }
        let Some(conn) = self.conns.get_mut(cid) else {
            tracing::warn!("no connection for cid {}, {} dropped", cid, msg.msg_type());
            return;
        };
        if !conn.enqueue(Packet::new(msg.to_vec()), self.ts.start) {
            tracing::warn!("cid {} queue full, {} dropped", cid, msg.msg_type());
        }
    }

    fn send_descriptors(&mut self) {
        let cfg = self.config.config();
        if self.ts.frame % cfg.mac.dcd_ucd_interval_frames != 0 {
            return;
        }
        let (dcd_count, ucd_count) = {
            let state = self.config.state_read();
            (state.dcd_config_change_count, state.ucd_config_change_count)
        };
        let dcd = Dcd {
            config_change_count: dcd_count,
            channel_encodings: DcdChannelEncodings {
                bs_eirp: 0,
                eirx_p_ir_max: 0,
                frequency: self.phy.frequency(),
                channel_nr: 0,
                ttg: TTG_PS as u8,
                rtg: RTG_PS as u8,
                base_station_id: cfg.mac.bs_id,
                frame_duration_code: self.phy.frame_duration_code(),
                frame_number: self.ts.frame,
            },
            dl_burst_profiles: self.profiles.dl_profiles().to_vec(),
        };
        let ucd = Ucd {
            config_change_count: ucd_count,
            ranging_backoff_start: RANGING_BACKOFF_START,
            ranging_backoff_end: RANGING_BACKOFF_END,
            request_backoff_start: REQUEST_BACKOFF_START,
            request_backoff_end: REQUEST_BACKOFF_END,
            channel_encodings: UcdChannelEncodings {
                bw_req_opp_size: cfg.mac.bw_req_opp_size as u16,
                rang_req_opp_size: cfg.mac.rang_req_opp_size as u16,
                frequency: self.phy.frequency(),
                sbchnl_req_region_full_params: 0,
                sbchnl_focused_cont_codes: 0,
            },
            ul_burst_profiles: self.profiles.ul_profiles().to_vec(),
        };
        self.enqueue_mgmt(Cid::BROADCAST, MgmtMsg::Dcd(dcd));
        self.enqueue_mgmt(Cid::BROADCAST, MgmtMsg::Ucd(ucd));
    }

    fn schedule_uplink(&mut self) {
        let mut ctx = UlSchedCtx {
            now: self.ts.start,
            phy: &self.phy,
            profiles: &self.profiles,
            ss_mgr: &self.ss_mgr,
            flows: self.sf_mgr.flows_mut(),
        };
        let ies = self.ul_sched.schedule(&mut ctx);
        let ul_map = UlMap {
            ucd_count: self.config.state_read().ucd_config_change_count,
            allocation_start_time: self.ul_sched.calculate_allocation_start_time(),
            ies,
        };
        self.enqueue_mgmt(Cid::BROADCAST, MgmtMsg::UlMap(ul_map));
    }

    fn generate_downlink_traffic(&mut self) {
        let frame_duration = self.phy.frame_duration();
        let now = self.ts.start;
        for source in self.dl_traffic.values_mut() {
            for packet in source.generate(frame_duration) {
                let Some(tuple) = packet.tuple else { continue };
                let Some(sfid) = IpcsClassifier::classify(&tuple, self.sf_mgr.flows(), SfDirection::Down) else {
                    tracing::warn!("no downlink flow for {}, packet dropped", tuple);
                    self.stats.dl_unclassified += 1;
                    continue;
                };
                let Some(flow) = self.sf_mgr.flows_mut().get_mut(sfid) else { continue };
                let accepted = self.conns.get_mut(flow.cid()).is_some_and(|c| c.enqueue(packet, now));
                if !accepted {
                    tracing::warn!("sfid {}: downlink queue full, packet dropped", sfid);
                    flow.record_mut().update_pkts_dropped(1);
                }
            }
        }
    }

    fn schedule_downlink(&mut self) -> DlSchedule {
        let nr_dl_symbols = self.config.config().phy.nr_dl_symbols;
        let mut ctx = DlSchedCtx {
            now: self.ts.start,
            phy: &self.phy,
            profiles: &self.profiles,
            ss_mgr: &self.ss_mgr,
            flows: self.sf_mgr.flows_mut(),
            conns: &mut self.conns,
            nr_dl_symbols,
        };
        self.dl_sched.schedule(&mut ctx)
    }

    /// Sends the downlink subframe: DL-MAP on the broadcast CID, then every burst
    fn transmit(&mut self, queue: &mut MessageQueue, schedule: DlSchedule) {
        let dl_map = DlMap {
            dcd_count: self.config.state_read().dcd_config_change_count,
            base_station_id: self.config.config().mac.bs_id,
            ies: schedule.ies,
        };
        tracing::trace!("-> {}", dl_map);
        let map_pdu = MacPdu::generic(Cid::BROADCAST, None, MgmtMsg::DlMap(dl_map).to_vec());
        let bytes = encode_burst(std::iter::once(&map_pdu).chain(schedule.bursts.iter().flat_map(|b| b.pdus.iter())));
        let msg = AirMsg { src: EntityId::Bs, dest: None, frame: self.ts.frame, bytes };
        self.phy.send(queue, msg, ModulationType::Bpsk12);
    }

    /// Starts the core network traffic of a downlink flow that just became active
    fn start_downlink_traffic(&mut self, sfid: Sfid) {
        let Some(flow) = self.sf_mgr.flows().get(sfid) else { return };
        if flow.direction() != SfDirection::Down {
            return;
        }
        let Some(index) = flow.classifier().map(|c| c.index as usize) else { return };
        let Some(mac) = self.ss_mgr.get_by_sfid(sfid).map(|ss| ss.mac_address) else { return };
        let cfg = self.config.config();
        let Some(cfg_ss) = cfg.subscribers.iter().find(|s| s.mac_address == mac) else { return };
        let Some(cfg_sf) = cfg_ss.service_flows.get(index) else { return };
        if cfg_sf.traffic_rate == 0 {
            return;
        }
        tracing::debug!("sfid {}: {} bit/s downlink traffic to {}", sfid, cfg_sf.traffic_rate, cfg_ss.ip_address);
        self.dl_traffic.insert(sfid, TrafficSource::new(cfg_sf, CORE_IP, cfg_ss.ip_address));
    }

    fn rx_ranging(&mut self, cid: Cid, payload: &[u8]) {
        let Some(msg) = parse_mgmt_msg(cid, payload) else { return };
        let MgmtMsg::RngReq(req) = msg else {
            tracing::warn!("unexpected {} on ranging cid {}", msg.msg_type(), cid);
            return;
        };
        let rsp = self.link_mgr.process_ranging_request(
            &req,
            cid,
            self.ts.frame,
            &mut self.ss_mgr,
            &mut self.conns,
            &self.profiles,
        );
        self.stats.stations_ranged += self.link_mgr.take_ranged().len() as u64;
        for record in self.link_mgr.take_removed() {
            self.sf_mgr.remove_station(&record, &mut self.conns);
        }
        if let Some(rsp) = rsp {
            self.enqueue_mgmt(Cid::INITIAL_RANGING, MgmtMsg::RngRsp(rsp));
        }
    }

    fn rx_primary(&mut self, cid: Cid, payload: &[u8]) {
        let Some(msg) = parse_mgmt_msg(cid, payload) else { return };
        match msg {
            MgmtMsg::DsaReq(req) => {
                let res = self.sf_mgr.allocate_service_flows(
                    &req,
                    cid,
                    self.ts.start,
                    &mut self.ss_mgr,
                    &mut self.conns,
                    self.ul_sched.as_mut(),
                    &self.phy,
                );
                match res {
                    Ok(rsp) => self.enqueue_mgmt(cid, MgmtMsg::DsaRsp(rsp)),
                    Err(e) => tracing::warn!("DSA-REQ {} on cid {}: {}", req.transaction_id, cid, e),
                }
            }
            MgmtMsg::DsaAck(ack) => match self.sf_mgr.process_dsa_ack(&ack, cid, &self.ss_mgr) {
                Ok(Some(sfid)) => self.start_downlink_traffic(sfid),
                Ok(None) => {}
                Err(e) => tracing::warn!("DSA-ACK {} on cid {}: {}", ack.transaction_id, cid, e),
            },
            other => tracing::warn!("unexpected {} on primary cid {}", other.msg_type(), cid),
        }
    }

    fn rx_data(&mut self, pdu: MacPdu) {
        let cid = pdu.cid();
        let Some(conn) = self.conns.get_mut(cid) else { return };
        let Some(sdu) = conn.reassemble(pdu) else { return };
        match self.sf_mgr.flows_mut().get_by_cid_mut(cid) {
            Some(flow) => {
                tracing::trace!("sfid {}: received {} bytes", flow.sfid(), sdu.len());
                flow.record_mut().update_pkts_rcvd(sdu.len());
            }
            None => tracing::warn!("data on cid {} without a service flow", cid),
        }
    }

    fn rx_bw_request(&mut self, hdr: &BwRequestHeader) {
        tracing::trace!("<- {}", hdr);
        self.stats.bw_requests += 1;
        if self.conns.cid_type(hdr.cid) == Some(CidType::Basic) {
            // Empty request on the basic CID: the station has no more flows to negotiate
            if let Some(ss) = self.ss_mgr.get_by_cid_mut(hdr.cid)
                && hdr.br == 0
                && !ss.are_service_flows_allocated
            {
                tracing::info!("{}: service flow negotiation complete", ss.mac_address);
                ss.are_service_flows_allocated = true;
            }
            return;
        }
        if !self.ul_sched.process_bandwidth_request(hdr, self.sf_mgr.flows_mut()) {
            tracing::warn!("bandwidth request on cid {} without a service flow", hdr.cid);
        }
    }
}

impl WimaxEntityTrait for BsNetDevice {
    fn entity(&self) -> EntityId {
        EntityId::Bs
    }

    fn set_config(&mut self, config: SharedConfig) {
        self.config = config;
    }

    fn rx_air(&mut self, _queue: &mut MessageQueue, msg: AirMsg) {
        tracing::trace!("rx_air from {}: {} bytes", msg.src, msg.bytes.len());
        self.stats.ul_bursts += 1;
        let mut buf = ByteBuffer::from_vec(msg.bytes);
        let pdus = match MacPdu::burst_from_bytes(&mut buf) {
            Ok(pdus) => pdus,
            Err(e) => {
                tracing::warn!("Failed parsing uplink burst from {}: {:?} {}", msg.src, e, buf.dump_hex());
                self.stats.ul_parse_errors += 1;
                return;
            }
        };

        for pdu in pdus {
            if let MacHeader::BandwidthRequest(hdr) = pdu.header {
                self.rx_bw_request(&hdr);
                continue;
            }
            let cid = pdu.cid();
            match self.conns.cid_type(cid) {
                Some(CidType::InitialRanging) | Some(CidType::Basic) => self.rx_ranging(cid, &pdu.payload),
                Some(CidType::Primary) => self.rx_primary(cid, &pdu.payload),
                Some(CidType::Transport) => self.rx_data(pdu),
                other => tracing::warn!("uplink PDU on cid {} ({:?}) dropped", cid, other),
            }
        }
    }

    fn tick_start(&mut self, queue: &mut MessageQueue, ts: FrameTime) {
        self.ts = ts;
        self.stats.frames += 1;

        for (cid, rsp) in self.sf_mgr.poll_timeouts(ts.start, &mut self.ss_mgr, &mut self.conns) {
            self.enqueue_mgmt(cid, MgmtMsg::DsaRsp(rsp));
        }
        let flows = self.sf_mgr.flows();
        self.dl_traffic.retain(|sfid, _| flows.get(*sfid).is_some());

        self.send_descriptors();
        self.schedule_uplink();
        self.generate_downlink_traffic();
        let schedule = self.schedule_downlink();
        self.transmit(queue, schedule);
    }
}
