//! Sources of PCM audio samples
//!
//! The demodulator reads its input twice: once to find the
//! mean signal level and once to segment the signal at that
//! level. A [`SampleSource`] must therefore be *restartable*.
//! Every call to [`for_each_frame()`](SampleSource::for_each_frame)
//! begins again at the first frame.

use std::convert::Infallible;

#[cfg(feature = "wav")]
use std::path::Path;

use thiserror::Error;

/// Channel layout of a sample source
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    /// One sample per frame
    Mono,

    /// Two samples per frame: left, then right
    Stereo,
}

impl ChannelLayout {
    /// Number of samples in each frame
    pub fn channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Layout for the given channel count, if supported
    pub fn from_channels(channels: u16) -> Option<Self> {
        match channels {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

/// Channel to demodulate
///
/// Stereo recordings often carry the tape signal on only one
/// channel. The selected channel is ignored for mono sources,
/// which always use their only sample.
///
/// ```
/// use tapeload::Channel;
///
/// assert_eq!(Channel::Left.select(&[100, -20]), 100);
/// assert_eq!(Channel::Right.select(&[100, -20]), -20);
/// assert_eq!(Channel::Both.select(&[100, -20]), 40);
/// assert_eq!(Channel::Right.select(&[7]), 7);
/// assert_eq!("both", Channel::Both.as_ref());
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum_macros::AsRefStr,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
    /// First sample of each frame
    #[default]
    Left,

    /// Second sample of each frame
    Right,

    /// Mean of both samples, rounded down
    Both,
}

impl Channel {
    /// Select one sample from a `frame`
    ///
    /// A frame with a single sample is mono, and that sample
    /// is returned no matter which channel is selected. An
    /// empty frame reads as zero.
    pub fn select(&self, frame: &[i32]) -> i32 {
        match (self, frame) {
            (_, []) => 0,
            (_, [only]) => *only,
            (Channel::Left, [left, ..]) => *left,
            (Channel::Right, [_, right, ..]) => *right,
            (Channel::Both, [left, right, ..]) => {
                (*left as i64 + *right as i64).div_euclid(2) as i32
            }
        }
    }
}

/// A restartable source of integer PCM frames
pub trait SampleSource {
    /// Error reading from the source
    type Error: std::error::Error + Send + Sync + 'static;

    /// Channel layout of every frame
    fn layout(&self) -> ChannelLayout;

    /// Visit every frame, in order, from the start
    ///
    /// The `visit` callback receives one slice per frame, with
    /// [`layout().channels()`](ChannelLayout::channels) samples.
    /// Each call starts over at the first frame. Read errors
    /// abort the pass and are returned to the caller.
    fn for_each_frame<F>(&mut self, visit: F) -> Result<(), Self::Error>
    where
        F: FnMut(&[i32]);
}

/// In-memory interleaved samples
///
/// Holds PCM frames with one or two samples each, interleaved
/// left-then-right for stereo. Reading from memory never fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterleavedSamples {
    layout: ChannelLayout,
    samples: Vec<i32>,
}

impl InterleavedSamples {
    /// Mono samples
    pub fn mono<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        Self {
            layout: ChannelLayout::Mono,
            samples: samples.into_iter().collect(),
        }
    }

    /// Stereo frames, as `(left, right)` pairs
    pub fn stereo<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        Self {
            layout: ChannelLayout::Stereo,
            samples: frames
                .into_iter()
                .flat_map(|(left, right)| [left, right])
                .collect(),
        }
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.samples.len() / self.layout.channels()
    }

    /// True if there are no frames
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SampleSource for InterleavedSamples {
    type Error = Infallible;

    fn layout(&self) -> ChannelLayout {
        self.layout
    }

    fn for_each_frame<F>(&mut self, mut visit: F) -> Result<(), Self::Error>
    where
        F: FnMut(&[i32]),
    {
        for frame in self.samples.chunks_exact(self.layout.channels()) {
            visit(frame);
        }
        Ok(())
    }
}

/// Error reading a sample source
#[derive(Error, Debug)]
pub enum SourceError {
    /// The WAV container could not be read
    #[cfg(feature = "wav")]
    #[error("unable to read WAV data: {0}")]
    Wav(#[from] hound::Error),

    /// The source could not be rewound or read
    #[error("unable to read sample source: {0}")]
    Io(#[from] std::io::Error),

    /// Only mono and stereo sources are accepted
    #[error("unsupported channel count {0}: expected mono or stereo")]
    Channels(u16),

    /// Only integer PCM is accepted
    #[error("unsupported sample format: expected integer PCM")]
    SampleFormat,
}

/// WAV file sample source
///
/// Reads integer PCM from a mono or stereo WAV file of any bit
/// depth up to 32 bits. The file is rewound at the start of
/// every pass.
#[cfg(feature = "wav")]
pub struct WavSource {
    reader: hound::WavReader<std::io::BufReader<std::fs::File>>,
    layout: ChannelLayout,
}

#[cfg(feature = "wav")]
impl WavSource {
    /// Open the WAV file at `path`
    ///
    /// Fails if the file cannot be read, if its samples are
    /// floating-point, or if it has more than two channels.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int {
            return Err(SourceError::SampleFormat);
        }
        let layout =
            ChannelLayout::from_channels(spec.channels).ok_or(SourceError::Channels(spec.channels))?;
        Ok(Self { reader, layout })
    }

    /// WAV format description
    pub fn spec(&self) -> hound::WavSpec {
        self.reader.spec()
    }

    /// Number of frames in the file
    pub fn len(&self) -> u32 {
        self.reader.duration()
    }

    /// True if the file holds no frames
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(feature = "wav")]
impl SampleSource for WavSource {
    type Error = SourceError;

    fn layout(&self) -> ChannelLayout {
        self.layout
    }

    fn for_each_frame<F>(&mut self, mut visit: F) -> Result<(), Self::Error>
    where
        F: FnMut(&[i32]),
    {
        self.reader.seek(0)?;

        let channels = self.layout.channels();
        let mut frame = [0i32; 2];
        let mut filled = 0;
        for sa in self.reader.samples::<i32>() {
            frame[filled] = sa?;
            filled += 1;
            if filled == channels {
                visit(&frame[..channels]);
                filled = 0;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::str::FromStr;

    #[test]
    fn test_channel_select() {
        assert_eq!(Channel::Left.select(&[3, 9]), 3);
        assert_eq!(Channel::Right.select(&[3, 9]), 9);
        assert_eq!(Channel::Both.select(&[3, 9]), 6);

        // mean rounds toward negative infinity
        assert_eq!(Channel::Both.select(&[-3, 0]), -2);
        assert_eq!(Channel::Both.select(&[i32::MAX, i32::MAX]), i32::MAX);

        // mono ignores the selection
        for ch in [Channel::Left, Channel::Right, Channel::Both] {
            assert_eq!(ch.select(&[-42]), -42);
        }
        assert_eq!(Channel::Both.select(&[]), 0);
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::from_str("right"), Ok(Channel::Right));
        assert_eq!("left", Channel::default().as_ref());
        assert!(Channel::from_str("center").is_err());
    }

    #[test]
    fn test_interleaved_restartable() {
        let mut src = InterleavedSamples::stereo([(1, 2), (3, 4), (5, 6)]);
        assert_eq!(src.layout(), ChannelLayout::Stereo);
        assert_eq!(src.len(), 3);

        for _pass in 0..2 {
            let mut frames = vec![];
            src.for_each_frame(|frame| frames.push(frame.to_vec()))
                .expect("memory source");
            assert_eq!(frames, vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
        }
    }

    #[test]
    fn test_layout_channels() {
        assert_eq!(ChannelLayout::from_channels(1), Some(ChannelLayout::Mono));
        assert_eq!(ChannelLayout::from_channels(2), Some(ChannelLayout::Stereo));
        assert_eq!(ChannelLayout::from_channels(6), None);
        assert_eq!(ChannelLayout::Stereo.channels(), 2);
    }
}
