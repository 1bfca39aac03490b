use wimax_core::{ModulationType, SimTime};

use crate::messagerouter::{AirMsg, MessageQueue};

/// Physical layer as seen by the MAC: symbol arithmetic for scheduling and a
/// transmit path that hands bursts to the router
pub trait WimaxPhy: Send {
    /// Symbols needed to carry `size_bytes` with `modulation`
    fn nr_symbols(&self, size_bytes: u32, modulation: ModulationType) -> u32;

    /// Bytes carried by `symbols` with `modulation`
    fn nr_bytes(&self, symbols: u32, modulation: ModulationType) -> u32;

    fn frame_duration(&self) -> SimTime;

    /// OFDM symbol duration, in picoseconds
    fn symbol_duration(&self) -> u64;

    fn symbols_per_frame(&self) -> u32;

    /// Physical slots per OFDM symbol
    fn ps_per_symbol(&self) -> u32;

    /// Air time of `size_bytes` sent with `modulation`
    fn transmission_time(&self, size_bytes: u32, modulation: ModulationType) -> SimTime {
        let ps = self.nr_symbols(size_bytes, modulation) as u64 * self.symbol_duration();
        SimTime::from_us(ps.div_ceil(1_000_000))
    }

    fn frame_duration_code(&self) -> u8;

    /// Carrier frequency in kHz
    fn frequency(&self) -> u32;

    /// Records the transmission and puts the burst on the air
    fn send(&mut self, queue: &mut MessageQueue, msg: AirMsg, modulation: ModulationType);
}
