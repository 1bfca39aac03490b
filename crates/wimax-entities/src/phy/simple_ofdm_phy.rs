use wimax_config::CfgPhy;
use wimax_core::{ModulationType, SimTime, ofdm};

use crate::messagerouter::{AirMsg, MessageQueue};
use crate::phy::wimax_phy::WimaxPhy;

/// Transmit counters of one PHY
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhyStats {
    pub tx_bursts: u64,
    pub tx_bytes: u64,
    pub tx_symbols: u64,
}

/// OFDM PHY model with ideal reception: bursts reach every addressed receiver intact
/// within the frame they are sent in
pub struct SimpleOfdmPhy {
    bandwidth_hz: u32,
    frequency_khz: u32,
    frame_duration: SimTime,
    symbol_duration_ps: u64,
    ps_duration_ps: u64,
    symbols_per_frame: u32,
    frame_duration_code: u8,
    stats: PhyStats,
}

impl SimpleOfdmPhy {
    /// Panics on a bandwidth or frame duration that a validated configuration would have rejected
    pub fn new(cfg: &CfgPhy) -> Self {
        let bw = cfg.bandwidth_hz;
        let frame_duration = cfg.frame_duration();
        let (Some(symbol_duration_ps), Some(ps_duration_ps), Some(symbols_per_frame)) = (
            ofdm::symbol_duration_ps(bw),
            ofdm::ps_duration_ps(bw),
            ofdm::symbols_per_frame(bw, frame_duration.as_us()),
        ) else {
            panic!("SimpleOfdmPhy: unsupported channel bandwidth {} Hz", bw);
        };
        let Some(frame_duration_code) = ofdm::frame_duration_code(frame_duration.as_us()) else {
            panic!("SimpleOfdmPhy: frame duration {} has no frame duration code", frame_duration);
        };
        tracing::debug!(
            "SimpleOfdmPhy: bw {} Hz, Ts {} ps, {} symbols per frame",
            bw,
            symbol_duration_ps,
            symbols_per_frame
        );
        SimpleOfdmPhy {
            bandwidth_hz: bw,
            frequency_khz: cfg.frequency_khz,
            frame_duration,
            symbol_duration_ps,
            ps_duration_ps,
            symbols_per_frame,
            frame_duration_code,
            stats: PhyStats::default(),
        }
    }

    pub fn bandwidth_hz(&self) -> u32 {
        self.bandwidth_hz
    }

    pub fn stats(&self) -> PhyStats {
        self.stats
    }
}

impl WimaxPhy for SimpleOfdmPhy {
    fn nr_symbols(&self, size_bytes: u32, modulation: ModulationType) -> u32 {
        ofdm::nr_symbols(size_bytes, modulation)
    }

    fn nr_bytes(&self, symbols: u32, modulation: ModulationType) -> u32 {
        ofdm::nr_bytes(symbols, modulation)
    }

    fn frame_duration(&self) -> SimTime {
        self.frame_duration
    }

    fn symbol_duration(&self) -> u64 {
        self.symbol_duration_ps
    }

    fn symbols_per_frame(&self) -> u32 {
        self.symbols_per_frame
    }

    fn ps_per_symbol(&self) -> u32 {
        (self.symbol_duration_ps / self.ps_duration_ps) as u32
    }

    fn frame_duration_code(&self) -> u8 {
        self.frame_duration_code
    }

    fn frequency(&self) -> u32 {
        self.frequency_khz
    }

    fn send(&mut self, queue: &mut MessageQueue, msg: AirMsg, modulation: ModulationType) {
        let symbols = self.nr_symbols(msg.bytes.len() as u32, modulation);
        self.stats.tx_bursts += 1;
        self.stats.tx_bytes += msg.bytes.len() as u64;
        self.stats.tx_symbols += symbols as u64;
        tracing::trace!("phy tx {} -> {:?}: {} bytes, {} symbols {}", msg.src, msg.dest, msg.bytes.len(), symbols, modulation);
        queue.push_back(msg);
    }
}
