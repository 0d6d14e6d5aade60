//! # tapeload: Cassette Tape Data Recovery
//!
//! This crate recovers program and data files from digitized
//! recordings of 8-bit home computer cassette tapes. Given the
//! samples of a recording, it finds each lead-in tone, demodulates
//! the frequency-shift keyed signal into bits, and decodes every
//! tape file it can find.
//!
//! ## Example
//!
//! Obtain a recording of the tape as integer PCM. Any sampling
//! rate will do, as long as each half-cycle of the tape signal
//! spans several samples. Mono or stereo recordings are accepted.
//!
//! ```
//! use tapeload::{InterleavedSamples, LoaderEvent, TapeLoaderBuilder};
//!
//! # let some_recording = || vec![0i32; 16];
//! #
//! let mut loader = TapeLoaderBuilder::default()
//!     .with_delta(0.4)       // pulse width tolerance, 0.0 < delta < 1.0
//!     .with_tone_length(32)  // lead-in pulses required before decoding
//!     .build();
//!
//! let mut source = InterleavedSamples::mono(some_recording());
//! let durations = loader.segment(&mut source).unwrap();
//!
//! for evt in loader.iter(&durations) {
//!     match evt {
//!         LoaderEvent::File(file) if file.outcome().is_ok() => {
//!             println!("loaded {:?}: {} bytes", file.name(), file.data().len());
//!         }
//!         _ => println!("{}", evt),
//!     }
//! }
//! ```
//!
//! With the `wav` feature, the [`WavSource`] reads WAV files
//! directly.
//!
//! ## Background
//!
//! Home computers of the late 1970s and 1980s stored programs
//! on ordinary audio cassettes. Data is recorded as a square wave
//! with two pulse widths: a short pulse is half of a bit cell,
//! and a long pulse is a whole bit cell. A bit that repeats the
//! previous bit is sent as two short pulses; a bit that differs
//! is sent as one long pulse.
//!
//! Every file begins with a lead-in tone of short pulses. The
//! loader measures the tone to learn the pulse widths, which vary
//! with the speed of the machine that made the recording. The
//! tone ends at the start bit, and the bits that follow are read
//! until the signal no longer looks like a tape signal.
//!
//! Each file within the bits is introduced by a sync byte of
//! `0xE6`. Neither the polarity of the recording nor the position
//! of the sync byte is known in advance, so the sync byte is
//! searched for at every bit position in both polarities. Two
//! file formats are decoded, and anything else is captured raw.
//! See [`DataFile`].
//!
//! ## Crate features
//!
//! * `wav` (default): Read WAV files with
//!   [hound](https://crates.io/crates/hound).

mod bitstream;
mod builder;
mod datafile;
mod demod;
mod loader;
mod segment;
mod source;
mod stats;
mod waveform;

pub use bitstream::{BitCursor, Bitstream, SYNC_BIT, SYNC_BIT_MASK, SYNC_BYTE};
pub use builder::TapeLoaderBuilder;
pub use datafile::{analyze, checksum, classify, Analysis, DataFile, Outcome, TapeFormat};
pub use demod::{BitState, Demodulator, DurationOutcome, Pulse, ToneReport, LEAD_IN_BITS};
pub use loader::{DurationMark, EventIter, LoaderEvent, LoaderState, TapeLoader, WINDOW_LEN};
pub use segment::{average, segment, DurationBuffer, Segmenter, BLOCK_SIZE};
pub use source::{Channel, ChannelLayout, InterleavedSamples, SampleSource, SourceError};
pub use stats::ToneStatistics;

#[cfg(feature = "wav")]
pub use source::WavSource;
