//! OFDM numerology shared by the PHY model and the configuration checks.
//! 256-point FFT, 192 data subcarriers, cyclic prefix ratio 1/4.

use crate::modulation::ModulationType;

pub const FFT_SIZE: u64 = 256;
pub const DATA_SUBCARRIERS: u32 = 192;

/// (1 + g) * Nfft with g = 1/4, i.e. samples per OFDM symbol including the cyclic prefix
const SAMPLES_PER_SYMBOL: u64 = FFT_SIZE * 5 / 4;

/// Oversampling factor n as (numerator, denominator), selected by which reference
/// bandwidth divides the channel bandwidth
pub fn sampling_factor(bandwidth_hz: u32) -> Option<(u64, u64)> {
    let bw = bandwidth_hz as u64;
    if bw == 0 {
        None
    } else if bw % 1_750_000 == 0 {
        Some((8, 7))
    } else if bw % 1_500_000 == 0 {
        Some((86, 75))
    } else if bw % 1_250_000 == 0 {
        Some((144, 125))
    } else if bw % 2_750_000 == 0 {
        Some((316, 275))
    } else if bw % 2_000_000 == 0 {
        Some((57, 50))
    } else {
        None
    }
}

/// Fs = floor(n * BW / 8000) * 8000
pub fn sampling_frequency(bandwidth_hz: u32) -> Option<u64> {
    let (num, den) = sampling_factor(bandwidth_hz)?;
    Some((num * bandwidth_hz as u64 / den) / 8000 * 8000)
}

/// OFDM symbol duration in picoseconds, rounded
pub fn symbol_duration_ps(bandwidth_hz: u32) -> Option<u64> {
    let fs = sampling_frequency(bandwidth_hz)?;
    Some((SAMPLES_PER_SYMBOL * 1_000_000_000_000 + fs / 2) / fs)
}

/// Physical slot duration in picoseconds: 4 samples
pub fn ps_duration_ps(bandwidth_hz: u32) -> Option<u64> {
    let fs = sampling_frequency(bandwidth_hz)?;
    Some((4 * 1_000_000_000_000 + fs / 2) / fs)
}

/// Whole OFDM symbols fitting in one frame, computed without rounding the symbol duration
pub fn symbols_per_frame(bandwidth_hz: u32, frame_duration_us: u64) -> Option<u32> {
    let fs = sampling_frequency(bandwidth_hz)?;
    Some((frame_duration_us as u128 * fs as u128 / (SAMPLES_PER_SYMBOL as u128 * 1_000_000)) as u32)
}

/// Data bits per OFDM symbol for a modulation: 192 subcarriers times coded bits per subcarrier
pub fn bits_per_symbol(modulation: ModulationType) -> u32 {
    DATA_SUBCARRIERS * modulation.coded_bits_x8() / 8
}

/// Symbols needed to carry `size_bytes`
pub fn nr_symbols(size_bytes: u32, modulation: ModulationType) -> u32 {
    (size_bytes * 8).div_ceil(bits_per_symbol(modulation))
}

/// Bytes carried by `symbols`
pub fn nr_bytes(symbols: u32, modulation: ModulationType) -> u32 {
    (symbols as u64 * bits_per_symbol(modulation) as u64 / 8) as u32
}

/// Frame duration code carried in the DCD, None for durations without a code
pub fn frame_duration_code(frame_duration_us: u64) -> Option<u8> {
    match frame_duration_us {
        2_500 => Some(0),
        4_000 => Some(1),
        5_000 => Some(2),
        8_000 => Some(3),
        10_000 => Some(4),
        12_500 => Some(5),
        20_000 => Some(6),
        _ => None,
    }
}
