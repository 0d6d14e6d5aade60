//! Mean-crossing segmentation
//!
//! Tape recordings are rarely centered on zero. Rather than
//! detect zero crossings, we first compute the mean level of the
//! entire recording and then detect crossings of *that* level.
//! The mean must be known before the first crossing decision, so
//! segmentation always makes two full passes over the source.
//!
//! The output of segmentation is a sequence of *durations*: the
//! number of samples between successive crossings.

use std::iter::FromIterator;

#[cfg(not(test))]
use log::trace;

#[cfg(test)]
use std::println as trace;

use crate::source::{Channel, SampleSource};

/// Durations stored per block
pub const BLOCK_SIZE: usize = 4096;

/// Append-only sequence of durations
///
/// Durations are stored in fixed-size blocks of [`BLOCK_SIZE`]
/// elements so that long recordings never need one huge
/// reallocation. The total count and the total number of samples
/// are tracked on append.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DurationBuffer {
    blocks: Vec<Vec<u32>>,
    len: usize,
    sum: u64,
}

impl DurationBuffer {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a duration
    pub fn push(&mut self, duration: u32) {
        match self.blocks.last_mut() {
            Some(block) if block.len() < BLOCK_SIZE => block.push(duration),
            _ => {
                let mut block = Vec::with_capacity(BLOCK_SIZE);
                block.push(duration);
                self.blocks.push(block);
            }
        }
        self.len += 1;
        self.sum += duration as u64;
    }

    /// Number of durations
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if there are no durations
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of samples covered by all durations
    pub fn sum(&self) -> u64 {
        self.sum
    }

    /// Duration at `index`, if any
    pub fn get(&self, index: usize) -> Option<u32> {
        self.blocks
            .get(index / BLOCK_SIZE)?
            .get(index % BLOCK_SIZE)
            .copied()
    }

    /// Copy out up to `len` durations starting at `offset`
    ///
    /// The window may span any number of blocks. It is truncated
    /// at the end of the buffer.
    pub fn window(&self, offset: usize, len: usize) -> Vec<u32> {
        let end = usize::min(offset.saturating_add(len), self.len);
        (offset..end).filter_map(|i| self.get(i)).collect()
    }

    /// Iterate over all durations, in order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.blocks.iter().flat_map(|block| block.iter().copied())
    }
}

impl Extend<u32> for DurationBuffer {
    fn extend<T: IntoIterator<Item = u32>>(&mut self, iter: T) {
        for duration in iter {
            self.push(duration);
        }
    }
}

impl FromIterator<u32> for DurationBuffer {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        let mut out = Self::new();
        out.extend(iter);
        out
    }
}

/// Mean-crossing detector
///
/// Smooths its input with a single-pole filter,
///
/// ```txt
/// cur = trunc(0.4 * prev + 0.6 * sample)
/// ```
///
/// and reports the length of each run between crossings of the
/// `mean` level. The very first sample opens a run without a
/// crossing decision.
#[derive(Clone, Debug)]
pub struct Segmenter {
    mean: i64,
    prev: Option<i64>,
    run: u32,
}

impl Segmenter {
    /// New detector for crossings of `mean`
    pub fn new(mean: i32) -> Self {
        Self {
            mean: mean as i64,
            prev: None,
            run: 0,
        }
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.prev = None;
        self.run = 0;
    }

    /// Process one sample
    ///
    /// Returns the length of the run which this sample closes,
    /// if any.
    #[inline]
    pub fn input(&mut self, sample: i32) -> Option<u32> {
        let smoothed = self.prev.unwrap_or(0);
        let cur = (Self::HISTORY_WEIGHT * smoothed as f64 + Self::INPUT_WEIGHT * sample as f64) as i64;

        let mut out = None;
        if let Some(prev) = self.prev {
            let mean = self.mean;
            if (cur >= mean && prev < mean) || (cur < mean && prev >= mean) {
                out = Some(self.run);
                self.run = 0;
            }
        }

        self.run += 1;
        self.prev = Some(cur);
        out
    }

    /// Close the open run, if any
    pub fn finish(&mut self) -> Option<u32> {
        let run = std::mem::take(&mut self.run);
        if run > 0 {
            Some(run)
        } else {
            None
        }
    }

    const HISTORY_WEIGHT: f64 = 0.4;
    const INPUT_WEIGHT: f64 = 0.6;
}

/// Mean sample level of the selected `channel`
///
/// The mean is rounded toward negative infinity. An empty source
/// has a mean of zero.
pub fn average<S>(source: &mut S, channel: Channel) -> Result<i32, S::Error>
where
    S: SampleSource,
{
    let mut sum = 0i64;
    let mut count = 0i64;
    source.for_each_frame(|frame| {
        sum += channel.select(frame) as i64;
        count += 1;
    })?;

    if count > 0 {
        Ok(sum.div_euclid(count) as i32)
    } else {
        Ok(0)
    }
}

/// Segment the selected `channel` into mean-crossing durations
///
/// Makes one pass to compute the [`average()`] and a second pass
/// to detect crossings of it. Any run that is still open at the
/// end of the source is flushed as the final duration.
pub fn segment<S>(source: &mut S, channel: Channel) -> Result<DurationBuffer, S::Error>
where
    S: SampleSource,
{
    let mean = average(source, channel)?;

    let mut segmenter = Segmenter::new(mean);
    let mut out = DurationBuffer::new();
    source.for_each_frame(|frame| {
        if let Some(duration) = segmenter.input(channel.select(frame)) {
            out.push(duration);
        }
    })?;
    if let Some(duration) = segmenter.finish() {
        out.push(duration);
    }

    trace!(
        "segment: mean level {}, {} durations, {} samples",
        mean,
        out.len(),
        out.sum()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::source::InterleavedSamples;

    // square wave with `periods` full cycles and `half` samples per level
    fn square(periods: usize, half: usize, low: i32, high: i32) -> Vec<i32> {
        let mut out = Vec::with_capacity(periods * half * 2);
        for _i in 0..periods {
            out.extend(std::iter::repeat(high).take(half));
            out.extend(std::iter::repeat(low).take(half));
        }
        out
    }

    #[test]
    fn test_duration_buffer_blocks() {
        let mut buf = DurationBuffer::new();
        assert!(buf.is_empty());
        for i in 0..(2 * BLOCK_SIZE + 10) {
            buf.push((i % 100) as u32);
        }
        assert_eq!(buf.len(), 2 * BLOCK_SIZE + 10);
        assert_eq!(buf.blocks.len(), 3);
        assert_eq!(buf.sum(), buf.iter().map(|d| d as u64).sum::<u64>());

        // window spans a block boundary
        let win = buf.window(BLOCK_SIZE - 2, 4);
        let expect: Vec<u32> = (BLOCK_SIZE - 2..BLOCK_SIZE + 2)
            .map(|i| (i % 100) as u32)
            .collect();
        assert_eq!(win, expect);

        // window spans two boundaries
        assert_eq!(buf.window(BLOCK_SIZE - 1, BLOCK_SIZE + 2).len(), BLOCK_SIZE + 2);

        // windows are truncated at the end
        assert_eq!(buf.window(buf.len() - 3, 16).len(), 3);
        assert!(buf.window(buf.len() + 5, 16).is_empty());
        assert_eq!(buf.get(buf.len()), None);
    }

    #[test]
    fn test_duration_buffer_collect() {
        let buf: DurationBuffer = vec![3u32, 4, 5].into_iter().collect();
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.sum(), 12);
        assert_eq!(buf.get(1), Some(4));
    }

    #[test]
    fn test_average() {
        let mut src = InterleavedSamples::mono([1, 2, 3, 4]);
        assert_eq!(average(&mut src, Channel::Left).unwrap(), 2);

        let mut src = InterleavedSamples::mono([-1, -2]);
        assert_eq!(average(&mut src, Channel::Left).unwrap(), -2);

        let mut src = InterleavedSamples::stereo([(10, 0), (20, 100)]);
        assert_eq!(average(&mut src, Channel::Left).unwrap(), 15);
        assert_eq!(average(&mut src, Channel::Right).unwrap(), 50);
        assert_eq!(average(&mut src, Channel::Both).unwrap(), 32);

        let mut src = InterleavedSamples::mono([]);
        assert_eq!(average(&mut src, Channel::Left).unwrap(), 0);
    }

    #[test]
    fn test_segment_square_wave() {
        const HALF: usize = 5;
        let mut src = InterleavedSamples::mono(square(20, HALF, -1000, 1000));
        let durations = segment(&mut src, Channel::Left).unwrap();
        println!("{:?}", durations.iter().collect::<Vec<_>>());

        assert_eq!(durations.len(), 40);
        assert!(durations.iter().all(|d| d == HALF as u32));
        assert_eq!(durations.sum(), 200);
    }

    #[test]
    fn test_segment_dc_offset() {
        // the smoothing filter starts from zero, so only the
        // first runs are distorted by a large DC offset
        const HALF: usize = 8;
        let mut src = InterleavedSamples::mono(square(10, HALF, 4000, 6000));
        let durations: Vec<u32> = segment(&mut src, Channel::Left).unwrap().iter().collect();
        println!("{:?}", durations);

        assert_eq!(&durations[0..2], &[1, 7]);
        assert!(durations[2..].iter().all(|&d| d == HALF as u32));
        assert_eq!(durations.iter().sum::<u32>(), 160);
    }

    #[test]
    fn test_segment_selects_channel() {
        let left = square(4, 3, -500, 500);
        let right = square(4, 6, -500, 500);
        let mut src = InterleavedSamples::stereo(left.into_iter().zip(right));

        let durations: Vec<u32> = segment(&mut src, Channel::Right).unwrap().iter().collect();
        assert_eq!(&durations[0..4], &[6, 6, 6, 6]);
    }

    #[test]
    fn test_segmenter_flush() {
        let mut seg = Segmenter::new(0);
        assert_eq!(seg.input(100), None);
        assert_eq!(seg.input(100), None);
        assert_eq!(seg.finish(), Some(2));
        assert_eq!(seg.finish(), None);
    }
}
