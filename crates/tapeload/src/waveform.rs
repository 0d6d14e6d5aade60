//! Tape waveform synthesis, for tests
//!
//! Produces the durations and samples a tape machine would
//! record for a given byte sequence.

/// Convert bytes to bits
///
/// Bits are output in tape order (most significant bit first).
#[cfg(test)]
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    let mut v = Vec::with_capacity(bytes.len() * 8);
    for byte in bytes {
        let mut word = *byte;
        for _i in 0..8 {
            v.push(word & 0x80 == 0x80);
            word <<= 1;
        }
    }

    v
}

/// Convert bits to pulse durations
///
/// Emits a lead-in `tone` of short pulses, a long start pulse,
/// and then the `bits`. Each short pulse is `period` samples,
/// and each long pulse is twice that. A bit which repeats the
/// previous bit is two short pulses, and a bit which differs is
/// one long pulse. The start bit is a one.
#[cfg(test)]
pub fn bits_to_durations(bits: &[bool], tone: usize, period: u32) -> Vec<u32> {
    let mut v = Vec::with_capacity(tone + 1 + bits.len() * 2);
    v.extend(std::iter::repeat(period).take(tone));
    v.push(2 * period);

    let mut prev = true;
    for &bit in bits {
        if bit == prev {
            v.push(period);
            v.push(period);
        } else {
            v.push(2 * period);
        }
        prev = bit;
    }

    v
}

/// Convert durations to a square wave
///
/// Each duration becomes a run of samples at `+amplitude` or
/// `-amplitude`, alternating, starting high.
#[cfg(test)]
pub fn durations_to_samples(durations: &[u32], amplitude: i32) -> Vec<i32> {
    let mut v = Vec::with_capacity(durations.iter().map(|&d| d as usize).sum());
    let mut level = amplitude;
    for &d in durations {
        v.extend(std::iter::repeat(level).take(d as usize));
        level = -level;
    }

    v
}
