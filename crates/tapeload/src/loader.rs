//! Full tape loader chain

#[cfg(not(test))]
use log::{info, warn};

#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as warn;

use std::collections::VecDeque;

mod output;

pub use output::{DurationMark, LoaderEvent, WINDOW_LEN};

use crate::bitstream::BitCursor;
use crate::builder::TapeLoaderBuilder;
use crate::datafile;
use crate::demod::{Demodulator, DurationOutcome};
use crate::segment::{self, DurationBuffer};
use crate::source::{Channel, SampleSource};

/// Loader state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoaderState {
    /// Next duration restarts calibration
    Init,

    /// Calibrating on a lead-in tone
    WaitTone,

    /// Demodulating bits
    Process,

    /// The tone was lost, and its bits await decoding
    LostTone,
}

/// A complete tape loader chain
///
/// The loader takes PCM samples and performs the following
/// operations:
///
/// 1. Mean-crossing segmentation into durations
/// 2. Calibration on the lead-in tone of each file
/// 3. FSK demodulation into a bitstream, until the tone is lost
/// 4. Decoding of every file in the bitstream
///
/// To create the loader, first create its Builder:
///
/// ```
/// use tapeload::{InterleavedSamples, TapeLoaderBuilder};
///
/// let mut loader = TapeLoaderBuilder::default().build();
///
/// let mut source = InterleavedSamples::mono([1000, 1000, -1000, -1000]);
/// let durations = loader.segment(&mut source).unwrap();
/// assert_eq!(durations.len(), 2);
///
/// for evt in loader.iter(&durations) {
///     println!("{}", evt);
/// }
/// ```
///
/// See [crate documentation](crate) for details.
#[derive(Clone, Debug)]
pub struct TapeLoader {
    channel: Channel,
    demod: Demodulator,
    state: LoaderState,
    index: usize,
    sample: u64,
}

impl TapeLoader {
    /// Segment a source of samples into durations
    ///
    /// Reads the configured channel of the `source` twice: once
    /// to find its mean level and once to find crossings of
    /// it. See [`segment()`](fn@crate::segment).
    pub fn segment<S>(&self, source: &mut S) -> Result<DurationBuffer, S::Error>
    where
        S: SampleSource,
    {
        segment::segment(source, self.channel)
    }

    /// Load files from a sequence of durations
    ///
    /// Bind an iterator which will consume the `durations` and
    /// produce [`LoaderEvent`]s, which include:
    ///
    /// * notifications about found and lost tones,
    /// * modulation errors;
    /// * pulse statistics for each tone; and
    /// * every file decoded, or attempted
    ///
    /// The loader is [reset](TapeLoader::reset) first, and
    /// duration indexes in the events refer to `durations`.
    /// When the durations are exhausted, any bits demodulated
    /// from the last tone are decoded as though the tone had
    /// been lost.
    #[must_use = "iterators are lazy and do nothing unless consumed"]
    pub fn iter<'rx, 'buf>(&'rx mut self, durations: &'buf DurationBuffer) -> EventIter<'rx, 'buf> {
        self.reset();
        EventIter {
            loader: self,
            durations,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Clear all states and return to the start
    pub fn reset(&mut self) {
        self.state = LoaderState::Init;
        self.index = 0;
        self.sample = 0;
    }

    /// Current state
    pub fn state(&self) -> LoaderState {
        self.state
    }

    /// Channel to demodulate
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Index of the next duration to process
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of samples processed
    pub fn sample(&self) -> u64 {
        self.sample
    }

    // Process one duration
    fn step(&mut self, d: u32, durations: &DurationBuffer, out: &mut VecDeque<LoaderEvent>) {
        match self.state {
            LoaderState::Init => {
                self.demod.set(d);
                self.state = LoaderState::WaitTone;
            }
            LoaderState::WaitTone => {
                if self.demod.add_tone(d) {
                    let mark = self.mark(durations);
                    info!(
                        "loader: found tone at sample {}, duration {} ({}), period {:.1}",
                        mark.sample(),
                        mark.index(),
                        mark,
                        self.demod.mean_period()
                    );
                    out.push_back(LoaderEvent::ToneFound(mark));
                    self.state = LoaderState::Process;
                }
            }
            LoaderState::Process => self.process(d, durations, out),
            LoaderState::LostTone => {
                // this duration is not used
                self.drain(out);
                self.state = LoaderState::Init;
            }
        }

        self.index += 1;
        self.sample += d as u64;
    }

    fn process(&mut self, d: u32, durations: &DurationBuffer, out: &mut VecDeque<LoaderEvent>) {
        match self.demod.add_duration(d) {
            DurationOutcome::Decoding => {}
            DurationOutcome::ModulationError => {
                let mark = self.mark(durations);
                warn!(
                    "loader: modulation error at sample {}, duration {} ({})",
                    mark.sample(),
                    mark.index(),
                    mark
                );
                out.push_back(LoaderEvent::ModulationError(mark));
            }
            DurationOutcome::LostTone => {
                let mark = self.mark(durations);
                info!(
                    "loader: lost tone at sample {}, duration {} ({}), {} bits",
                    mark.sample(),
                    mark.index(),
                    mark,
                    self.demod.bitstream().len()
                );
                out.push_back(LoaderEvent::LostTone(mark));
                self.state = LoaderState::LostTone;
            }
        }
    }

    // End of durations
    fn finish(&mut self, durations: &DurationBuffer, out: &mut VecDeque<LoaderEvent>) {
        if self.state == LoaderState::Process {
            // zero is never a valid pulse
            self.process(0, durations, out);
        }
        if self.state == LoaderState::LostTone {
            self.drain(out);
            self.state = LoaderState::Init;
        }
    }

    // Decode every file in the bitstream
    fn drain(&mut self, out: &mut VecDeque<LoaderEvent>) {
        if self.demod.is_empty() {
            return;
        }

        out.push_back(LoaderEvent::Statistics(self.demod.report()));

        let bits = self.demod.bitstream_mut();
        while !bits.is_empty() {
            let analysis = datafile::analyze(bits);
            let file = analysis.result();
            info!(
                "loader: file \"{}\": {}, {} bytes",
                file.name().unwrap_or(""),
                analysis.attempt().outcome(),
                file.data().len()
            );
            out.extend(analysis.into_iter().map(LoaderEvent::File));
            bits.trim();
        }
    }

    fn mark(&self, durations: &DurationBuffer) -> DurationMark {
        let start = self.index.saturating_sub(WINDOW_LEN / 2);
        DurationMark::new(
            self.index,
            self.sample,
            start,
            durations.window(start, WINDOW_LEN),
        )
    }
}

impl From<&TapeLoaderBuilder> for TapeLoader {
    /// Create the tape loader from its Builder
    fn from(cfg: &TapeLoaderBuilder) -> Self {
        Self {
            channel: cfg.channel(),
            demod: Demodulator::new(cfg.delta(), cfg.tone_length()),
            state: LoaderState::Init,
            index: 0,
            sample: 0,
        }
    }
}

/// Iterator over loader events
///
/// Created by [`TapeLoader::iter()`]. Consumes as many durations
/// as are required to produce the next event.
#[derive(Debug)]
pub struct EventIter<'rx, 'buf> {
    loader: &'rx mut TapeLoader,
    durations: &'buf DurationBuffer,
    pending: VecDeque<LoaderEvent>,
    finished: bool,
}

impl<'rx, 'buf> Iterator for EventIter<'rx, 'buf> {
    type Item = LoaderEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(evt) = self.pending.pop_front() {
                return Some(evt);
            }
            if self.finished {
                return None;
            }

            match self.durations.get(self.loader.index) {
                Some(d) => self.loader.step(d, self.durations, &mut self.pending),
                None => {
                    self.loader.finish(self.durations, &mut self.pending);
                    self.finished = true;
                }
            }
        }
    }
}
