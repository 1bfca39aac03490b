use std::net::Ipv4Addr;

use wimax_config::CfgServiceFlow;
use wimax_core::{SfDirection, SimTime};
use wimax_pdus::sflow::{CsParameters, FiveTuple, IpcsClassifierRecord, ServiceFlowParams};

use crate::mac::packet::Packet;

/// Constant bit rate packet generator for one configured flow. Packets carry a
/// big-endian sequence number in their first four bytes.
#[derive(Debug, Clone)]
pub struct TrafficSource {
    tuple: FiveTuple,
    rate_bps: u32,
    packet_size: u32,
    credit_bits: u64,
    seq: u32,
}

impl TrafficSource {
    /// `local` is the address of the generating node, `peer` the other end
    pub fn new(cfg: &CfgServiceFlow, local: Ipv4Addr, peer: Ipv4Addr) -> Self {
        TrafficSource {
            tuple: flow_tuple(cfg, local, peer),
            rate_bps: cfg.traffic_rate,
            packet_size: cfg.packet_size.max(4),
            credit_bits: 0,
            seq: 0,
        }
    }

    pub fn tuple(&self) -> &FiveTuple {
        &self.tuple
    }

    /// Packets due during one frame of `frame_duration`
    pub fn generate(&mut self, frame_duration: SimTime) -> Vec<Packet> {
        self.credit_bits += self.rate_bps as u64 * frame_duration.as_us() / 1_000_000;
        let packet_bits = self.packet_size as u64 * 8;
        let mut out = Vec::new();
        while self.credit_bits >= packet_bits {
            self.credit_bits -= packet_bits;
            let mut payload = vec![0u8; self.packet_size as usize];
            payload[..4].copy_from_slice(&self.seq.to_be_bytes());
            self.seq = self.seq.wrapping_add(1);
            out.push(Packet::with_tuple(payload, self.tuple));
        }
        out
    }
}

/// The 5-tuple of packets sent on a configured flow, seen from the node at `local`
pub fn flow_tuple(cfg: &CfgServiceFlow, local: Ipv4Addr, peer: Ipv4Addr) -> FiveTuple {
    FiveTuple { src: local, dst: peer, src_port: cfg.src_port, dst_port: cfg.dst_port, protocol: cfg.protocol, tos: 0 }
}

/// Classifier rule selecting the packets of a configured flow of a station at `ss_ip`
pub fn classifier_for(cfg: &CfgServiceFlow, ss_ip: Ipv4Addr, core_ip: Ipv4Addr, index: u16) -> IpcsClassifierRecord {
    let host = Ipv4Addr::new(255, 255, 255, 255);
    let (src, dst) = match cfg.direction {
        SfDirection::Up => (ss_ip, core_ip),
        SfDirection::Down => (core_ip, ss_ip),
    };
    IpcsClassifierRecord {
        priority: 1,
        index,
        tos: None,
        protocols: vec![cfg.protocol],
        src_addrs: vec![(src, host)],
        dst_addrs: vec![(dst, host)],
        src_ports: vec![(cfg.src_port, cfg.src_port)],
        dst_ports: vec![(cfg.dst_port, cfg.dst_port)],
    }
}

/// QoS parameters a station at `ss_ip` requests for its configured flow number `index`
pub fn flow_params(cfg: &CfgServiceFlow, ss_ip: Ipv4Addr, core_ip: Ipv4Addr, index: u16) -> ServiceFlowParams {
    let mut p = ServiceFlowParams::new(cfg.direction, cfg.scheduling_type);
    p.traffic_priority = cfg.traffic_priority;
    p.min_reserved_rate = cfg.min_reserved_rate;
    p.max_sustained_rate = cfg.max_sustained_rate;
    p.max_traffic_burst = cfg.max_traffic_burst;
    p.max_latency = cfg.max_latency_ms;
    p.tolerated_jitter = cfg.tolerated_jitter_ms;
    p.sdu_size = cfg.sdu_size;
    p.fixed_vs_variable_sdu = (cfg.sdu_size > 0) as u8;
    p.unsolicited_grant_interval = cfg.unsolicited_grant_interval_ms.unwrap_or(0);
    p.unsolicited_polling_interval = cfg.unsolicited_polling_interval_ms.unwrap_or(0);
    p.cs_parameters = Some(CsParameters::new(classifier_for(cfg, ss_ip, core_ip, index)));
    p
}
