//! FSK demodulation
//!
//! Tape data is recorded as a square wave with two pulse widths.
//! A *short* pulse is half of a bit cell, and a *long* pulse is a
//! whole bit cell. A bit which repeats the previous bit is two
//! short pulses. A bit which differs from the previous bit is one
//! long pulse.
//!
//! The pulse widths are not known in advance: they depend on the
//! speed of the tape machine that made the recording. Before any
//! bits can be decoded, the [`Demodulator`] must first *calibrate*
//! on a lead-in tone of short pulses. See
//! [`add_tone()`](Demodulator::add_tone).

use crate::bitstream::{BitCursor, Bitstream};
use crate::stats::ToneStatistics;

/// Number of zero bits emitted when the first long pulse is seen
///
/// The lead-in tone is a run of zero bits, but the demodulator
/// cannot count them. The first long pulse is the start bit.
pub const LEAD_IN_BITS: usize = 32;

/// Bit decoding state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BitState {
    /// No bit cell boundary has been seen yet
    Unknown,

    /// Half of a bit cell has been consumed
    Half,

    /// The pulses so far make up whole bit cells
    Full,

    /// A long pulse arrived in the middle of a bit cell
    ///
    /// Decoding continues as if the cell had been complete.
    ModulError,
}

/// Width class of a pulse
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pulse {
    /// Half of a bit cell
    Short,

    /// A whole bit cell
    Long,
}

impl Pulse {
    /// Width, in half-cell units
    pub fn units(&self) -> u32 {
        match self {
            Pulse::Short => 1,
            Pulse::Long => 2,
        }
    }
}

/// Result of adding one duration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DurationOutcome {
    /// The duration was a valid pulse
    Decoding,

    /// A long pulse arrived in the middle of a bit cell
    ModulationError,

    /// The duration was neither a short nor a long pulse
    LostTone,
}

/// Snapshot of the demodulator's calibration
///
/// Produced by [`Demodulator::report()`] when a tone is lost.
#[derive(Clone, Debug, PartialEq)]
pub struct ToneReport {
    bits: usize,
    mean_period: f64,
    units: u64,
    delta: f64,
    short: ToneStatistics,
    long: ToneStatistics,
}

impl ToneReport {
    /// Number of bits demodulated
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Estimated short pulse width, in samples
    pub fn mean_period(&self) -> f64 {
        self.mean_period
    }

    /// Total half-cell units folded into the estimate
    pub fn units(&self) -> u64 {
        self.units
    }

    /// Relative tolerance on pulse widths
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Statistics of short pulses
    pub fn short(&self) -> &ToneStatistics {
        &self.short
    }

    /// Statistics of long pulses
    pub fn long(&self) -> &ToneStatistics {
        &self.long
    }

    /// Exclusive bounds of a short pulse, in samples
    pub fn short_band(&self) -> (f64, f64) {
        band(self.mean_period, self.delta, 1)
    }

    /// Exclusive bounds of a long pulse, in samples
    pub fn long_band(&self) -> (f64, f64) {
        band(self.mean_period, self.delta, 2)
    }
}

/// FSK demodulator
///
/// Classifies each duration as a short pulse, a long pulse, or
/// neither, and converts pulses into bits. The pulse widths are
/// estimated from the input itself.
///
/// The demodulator owns the [`Bitstream`] it writes. The bits are
/// discarded whenever calibration restarts.
#[derive(Clone, Debug)]
pub struct Demodulator {
    bitstream: Bitstream,
    delta: f64,
    tone_length: u64,
    bit: bool,
    state: BitState,
    short: ToneStatistics,
    long: ToneStatistics,
    total: u64,
    units: u64,
}

impl Demodulator {
    /// New demodulator
    ///
    /// A pulse is accepted if it is within `delta` short-pulse
    /// periods of its nominal width. The tone is found once more
    /// than `tone_length` short pulses have been seen.
    pub fn new(delta: f64, tone_length: u32) -> Self {
        Self {
            bitstream: Bitstream::new(),
            delta,
            tone_length: tone_length as u64,
            bit: false,
            state: BitState::Unknown,
            short: ToneStatistics::new(),
            long: ToneStatistics::new(),
            total: 0,
            units: 0,
        }
    }

    /// Restart calibration with the duration `d`
    ///
    /// Discards all bits and statistics. The short pulse estimate
    /// becomes `d`.
    pub fn set(&mut self, d: u32) {
        self.bitstream.clear();
        self.short.reset();
        self.long.reset();
        self.total = 0;
        self.units = 0;
        self.bit = false;
        self.state = BitState::Unknown;
        self.fold(d, Pulse::Short);
    }

    /// Calibrate on the duration `d`
    ///
    /// A duration which matches the current estimate of the short
    /// pulse refines it. Any other duration restarts calibration
    /// with [`set()`](Demodulator::set). Returns `true` once the
    /// calibration holds more than `tone_length` units.
    pub fn add_tone(&mut self, d: u32) -> bool {
        if self.check(d, 1) {
            self.fold(d, Pulse::Short);
        } else {
            self.set(d);
        }
        self.units > self.tone_length
    }

    /// Demodulate the duration `d`
    ///
    /// Short and long pulses advance the bit state machine and
    /// refine the calibration. Anything else is reported as
    /// [`LostTone`](DurationOutcome::LostTone) and leaves the
    /// demodulator unchanged.
    pub fn add_duration(&mut self, d: u32) -> DurationOutcome {
        if self.state == BitState::ModulError {
            self.state = BitState::Full;
        }

        let pulse = match self.classify(d) {
            Some(pulse) => pulse,
            None => return DurationOutcome::LostTone,
        };
        match pulse {
            Pulse::Short => self.half_bit(),
            Pulse::Long => self.full_bit(),
        }
        self.fold(d, pulse);

        if self.state == BitState::ModulError {
            DurationOutcome::ModulationError
        } else {
            DurationOutcome::Decoding
        }
    }

    /// True if `d` is within tolerance of a pulse `width` half-cells wide
    pub fn check(&self, d: u32, width: u32) -> bool {
        let (lo, hi) = band(self.mean_period(), self.delta, width);
        let d = d as f64;
        lo < d && d < hi
    }

    /// Width class of `d`, if it is a valid pulse
    pub fn classify(&self, d: u32) -> Option<Pulse> {
        if self.check(d, 1) {
            Some(Pulse::Short)
        } else if self.check(d, 2) {
            Some(Pulse::Long)
        } else {
            None
        }
    }

    /// Estimated short pulse width, in samples
    ///
    /// The total of every folded duration divided by the number of
    /// half-cell units they represent.
    pub fn mean_period(&self) -> f64 {
        if self.units == 0 {
            return 0.0;
        }
        self.total as f64 / self.units as f64
    }

    /// Bit decoding state
    pub fn state(&self) -> BitState {
        self.state
    }

    /// Demodulated bits
    pub fn bitstream(&self) -> &Bitstream {
        &self.bitstream
    }

    /// Demodulated bits, for decoding
    pub fn bitstream_mut(&mut self) -> &mut Bitstream {
        &mut self.bitstream
    }

    /// True if no bits have been demodulated
    pub fn is_empty(&self) -> bool {
        self.bitstream.is_empty()
    }

    /// Snapshot of calibration and pulse statistics
    pub fn report(&self) -> ToneReport {
        ToneReport {
            bits: self.bitstream.len(),
            mean_period: self.mean_period(),
            units: self.units,
            delta: self.delta,
            short: self.short.clone(),
            long: self.long.clone(),
        }
    }

    fn fold(&mut self, d: u32, pulse: Pulse) {
        match pulse {
            Pulse::Short => self.short.add(d),
            Pulse::Long => self.long.add(d),
        }
        self.total += d as u64;
        self.units += pulse.units() as u64;
    }

    fn half_bit(&mut self) {
        match self.state {
            BitState::Half => {
                self.bitstream.add_bit(self.bit);
                self.state = BitState::Full;
            }
            BitState::Full => self.state = BitState::Half,
            BitState::Unknown | BitState::ModulError => {}
        }
    }

    fn full_bit(&mut self) {
        match self.state {
            BitState::Half => {
                self.bitstream.add_bit(self.bit);
                self.state = BitState::ModulError;
            }
            BitState::Full => {
                self.bit = !self.bit;
                self.bitstream.add_bit(self.bit);
            }
            BitState::Unknown => {
                self.bit = false;
                for _i in 0..LEAD_IN_BITS {
                    self.bitstream.add_bit(self.bit);
                }
                self.bit = true;
                self.bitstream.add_bit(self.bit);
                self.state = BitState::Full;
            }
            BitState::ModulError => {}
        }
    }
}

// exclusive bounds for a pulse `width` half-cells wide
fn band(mean_period: f64, delta: f64, width: u32) -> (f64, f64) {
    let w = width as f64;
    (
        w * (1.0 - delta / w) * mean_period,
        w * (1.0 + delta / w) * mean_period,
    )
}
