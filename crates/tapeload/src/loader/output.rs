use std::fmt;

use arrayvec::ArrayVec;

use crate::datafile::DataFile;
use crate::demod::ToneReport;

/// Number of durations captured around each event
pub const WINDOW_LEN: usize = 16;

/// Location of an event in the duration sequence
///
/// Records the index of the duration which caused the event and
/// the sample position at which that duration begins. A window of
/// up to [`WINDOW_LEN`] durations around the index is kept for
/// diagnostics. The window begins half its length before the
/// index, or at the first duration.
///
/// Displays as the duration index in `BYTE+BIT` form: the index
/// divided by eight, in hex, and the remainder.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DurationMark {
    index: usize,
    sample: u64,
    window_start: usize,
    window: ArrayVec<u32, WINDOW_LEN>,
}

impl DurationMark {
    pub(crate) fn new<I>(index: usize, sample: u64, window_start: usize, window: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        Self {
            index,
            sample,
            window_start,
            window: window.into_iter().take(WINDOW_LEN).collect(),
        }
    }

    /// Index of the duration
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of samples before the duration
    pub fn sample(&self) -> u64 {
        self.sample
    }

    /// Index of the first duration in the window
    pub fn window_start(&self) -> usize {
        self.window_start
    }

    /// Durations around the index
    pub fn window(&self) -> &[u32] {
        self.window.as_slice()
    }
}

impl fmt::Display for DurationMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}+{}", self.index >> 3, self.index & 7)
    }
}

/// Tape loader event
///
/// Events are produced, in order, as the
/// [`TapeLoader`](crate::TapeLoader) works through the
/// recording. Each lead-in tone produces a
/// [`ToneFound`](LoaderEvent::ToneFound) event. When the tone
/// ends, a [`LostTone`](LoaderEvent::LostTone) event is followed
/// by [`Statistics`](LoaderEvent::Statistics) and one or more
/// [`File`](LoaderEvent::File) events, if any bits were
/// demodulated.
#[derive(Clone, Debug, PartialEq)]
pub enum LoaderEvent {
    /// Calibrated on a lead-in tone
    ToneFound(DurationMark),

    /// A long pulse arrived in the middle of a bit cell
    ModulationError(DurationMark),

    /// A duration was neither a short nor a long pulse
    LostTone(DurationMark),

    /// Calibration and pulse statistics for the lost tone
    Statistics(ToneReport),

    /// A decoded file, or a failed attempt to decode one
    ///
    /// Every failed attempt is followed by its raw capture.
    File(DataFile),
}

impl LoaderEvent {
    /// Duration location, for tone events
    pub fn mark(&self) -> Option<&DurationMark> {
        match self {
            LoaderEvent::ToneFound(mark)
            | LoaderEvent::ModulationError(mark)
            | LoaderEvent::LostTone(mark) => Some(mark),
            _ => None,
        }
    }

    /// Statistics, if any
    pub fn report(&self) -> Option<&ToneReport> {
        match self {
            LoaderEvent::Statistics(report) => Some(report),
            _ => None,
        }
    }

    /// Decoded file, if any
    pub fn file(&self) -> Option<&DataFile> {
        match self {
            LoaderEvent::File(file) => Some(file),
            _ => None,
        }
    }

    /// Convert into decoded file, if any
    pub fn into_file(self) -> Option<DataFile> {
        match self {
            LoaderEvent::File(file) => Some(file),
            _ => None,
        }
    }
}

impl AsRef<str> for LoaderEvent {
    fn as_ref(&self) -> &str {
        match self {
            LoaderEvent::ToneFound(_) => "found tone",
            LoaderEvent::ModulationError(_) => "modulation error",
            LoaderEvent::LostTone(_) => "lost tone",
            LoaderEvent::Statistics(_) => "statistics",
            LoaderEvent::File(_) => "file",
        }
    }
}

impl fmt::Display for LoaderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderEvent::ToneFound(mark)
            | LoaderEvent::ModulationError(mark)
            | LoaderEvent::LostTone(mark) => write!(
                f,
                "{} at sample {}, duration index {} ({})",
                self.as_ref(),
                mark.sample(),
                mark.index(),
                mark
            ),
            LoaderEvent::Statistics(report) => write!(
                f,
                "{}: {} bits, average period {:.1}",
                self.as_ref(),
                report.bits(),
                report.mean_period()
            ),
            LoaderEvent::File(file) => write!(
                f,
                "{}: {} \"{}\"",
                self.as_ref(),
                file.outcome(),
                file.name().unwrap_or("")
            ),
        }
    }
}
