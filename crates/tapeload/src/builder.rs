use crate::loader::TapeLoader;
use crate::source::Channel;

/// Builds a tape loader
///
/// The builder comes with a sensible set of default options,
/// which work well for most recordings made at any common
/// sampling rate. No option depends on the sampling rate: pulse
/// widths are measured from the recording itself.
///
/// ```
/// use tapeload::{Channel, TapeLoaderBuilder};
///
/// let mut builder = TapeLoaderBuilder::default();
/// builder.with_channel(Channel::Right).with_delta(0.3);
/// let loader = builder.build();
/// assert_eq!(loader.channel(), Channel::Right);
/// ```
///
/// The API specified by the builder is part of this crate's
/// API. The actual default values are *not*, however, and
/// are subject to revision in any minor release.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TapeLoaderBuilder {
    channel: Channel,
    delta: f64,
    tone_length: u32,
}

impl TapeLoaderBuilder {
    /// New loader with defaults
    pub fn new() -> Self {
        Self {
            channel: Channel::Left,
            delta: 0.4,
            tone_length: 32,
        }
    }

    /// Build a loader
    ///
    /// Once built, the loader is immediately ready to segment
    /// and demodulate.
    pub fn build(&self) -> TapeLoader {
        TapeLoader::from(self)
    }

    /// Channel to demodulate
    ///
    /// Ignored for mono sources.
    pub fn with_channel(&mut self, channel: Channel) -> &mut Self {
        self.channel = channel;
        self
    }

    /// Pulse width tolerance (fraction of the short pulse)
    ///
    /// A duration is accepted as a short pulse if it lies within
    /// `delta` short-pulse periods of one period, and as a long
    /// pulse if it lies within `delta` periods of two periods.
    /// The tolerance is clamped to `[0.01, 0.99]` so that the two
    /// pulse bands never overlap.
    pub fn with_delta(&mut self, delta: f64) -> &mut Self {
        self.delta = f64::clamp(delta, 0.01, 0.99);
        self
    }

    /// Minimum lead-in tone length (short pulses)
    ///
    /// Decoding begins only after more than `len` consecutive
    /// short pulses of consistent width. At least one pulse is
    /// required.
    pub fn with_tone_length(&mut self, len: u32) -> &mut Self {
        self.tone_length = u32::max(len, 1);
        self
    }

    /// Channel to demodulate
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Pulse width tolerance (fraction of the short pulse)
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Minimum lead-in tone length (short pulses)
    pub fn tone_length(&self) -> u32 {
        self.tone_length
    }
}

impl Default for TapeLoaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamping() {
        let mut builder = TapeLoaderBuilder::default();
        assert_eq!(builder.channel(), Channel::Left);
        assert_eq!(builder.delta(), 0.4);
        assert_eq!(builder.tone_length(), 32);

        builder.with_delta(1.5).with_tone_length(0);
        assert_eq!(builder.delta(), 0.99);
        assert_eq!(builder.tone_length(), 1);

        builder.with_delta(-1.0);
        assert_eq!(builder.delta(), 0.01);
    }
}
