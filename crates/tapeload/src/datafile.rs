//! Tape file decoding
//!
//! A tape file is a run of bytes introduced by a [`SYNC_BYTE`].
//! Two container formats are understood.
//!
//! * **Radio** files carry a big-endian base address and end
//!   address, the payload, a second sync byte, and a checksum.
//!
//!   ```txt
//!   E6 | base:16 end:16 | payload | E6 | checksum:16
//!   ```
//!
//! * **Orion** files carry the same body, but first a header block
//!   with an eight-character name and eight zero bytes.
//!
//!   ```txt
//!   E6 | name:8×8 | 00×8 | xx | E6 | base:16 end:16 | payload | E6 | checksum:16
//!   ```
//!
//! Any failure to decode either format is reported as an
//! [`Outcome`]. Failed files are then captured *raw*: every byte
//! from the first [`SYNC_BIT`](crate::SYNC_BIT)
//! pattern to the end of the stream.
//!
//! [`SYNC_BYTE`]: crate::SYNC_BYTE

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(not(test))]
use log::{debug, info};

#[cfg(test)]
use std::{println as debug, println as info};

use crate::bitstream::BitCursor;

/// Result of a decoding attempt
///
/// Displays in `snake_case`.
///
/// ```
/// use tapeload::Outcome;
///
/// assert_eq!("bad_crc", Outcome::BadCrc.as_ref());
/// assert_eq!("ok", &format!("{}", Outcome::Ok));
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum_macros::AsRefStr,
    strum_macros::Display,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    /// Decoded, and the checksum matches
    Ok,

    /// Unstructured capture
    Raw,

    /// No sync byte before the file
    NoSync,

    /// The header is truncated or does not match any format
    NoHeader,

    /// An orion header with non-zero padding
    NotOrion,

    /// Stream ended before the base address
    NoBase,

    /// Stream ended before the end address
    NoLength,

    /// The end address is below the base address
    NegativeLength,

    /// Stream ended inside the payload
    WrongLength,

    /// No sync byte before the checksum
    NoSyncCrc,

    /// Stream ended inside the checksum
    NoCrc,

    /// Decoded, but the checksum does not match
    BadCrc,
}

impl Outcome {
    /// True if the file decoded with a valid checksum
    pub fn is_ok(&self) -> bool {
        *self == Outcome::Ok
    }

    /// True if the file carries payload bytes worth displaying
    pub fn has_payload(&self) -> bool {
        matches!(
            self,
            Outcome::Ok | Outcome::BadCrc | Outcome::WrongLength | Outcome::Raw
        )
    }
}

/// Tape file container format
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::AsRefStr, strum_macros::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum TapeFormat {
    /// Address block and payload
    Radio,

    /// Named header block, then a radio body
    Orion,
}

/// A decoded (or partially-decoded) tape file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataFile {
    outcome: Outcome,
    format: Option<TapeFormat>,
    name: Option<String>,
    base: i32,
    end: i32,
    length: i32,
    data: Vec<u8>,
    checksum_read: u16,
    checksum_computed: u16,
}

/// Decoding results for one file
///
/// If the structured `attempt` did not succeed, the `raw`
/// capture holds the unstructured bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Analysis {
    attempt: DataFile,
    raw: Option<DataFile>,
}

/// Determine the container format of the next file
///
/// Rewinds, finds the first sync byte, and inspects the eight
/// bytes after it. Any byte outside `[0x20, 0x7F]` marks a radio
/// file. If all eight are printable, the next eight bytes must be
/// zero for an orion file. Anything else is inconclusive and
/// reported as [`NoHeader`](Outcome::NoHeader).
pub fn classify<B>(bits: &mut B) -> Result<TapeFormat, Outcome>
where
    B: BitCursor + ?Sized,
{
    bits.reset();
    require(bits.find_sync(), Outcome::NoSync)?;

    for _i in 0..8 {
        let c = bits.byte();
        require(bits.next_byte(), Outcome::NoHeader)?;
        if !is_printable(c) {
            return Ok(TapeFormat::Radio);
        }
    }

    for _i in 0..8 {
        require(bits.byte() == 0, Outcome::NoHeader)?;
        require(bits.next_byte(), Outcome::NoHeader)?;
    }

    Ok(TapeFormat::Orion)
}

/// Decode the next file
///
/// Classifies the stream and decodes it in the matching format.
/// Unless that succeeds, the stream is also captured raw. On
/// return the cursor is at the end of whatever was read last, so
/// that [`trim()`](BitCursor::trim) discards it.
pub fn analyze<B>(bits: &mut B) -> Analysis
where
    B: BitCursor + ?Sized,
{
    let attempt = match classify(bits) {
        Ok(TapeFormat::Radio) => DataFile::radio(bits),
        Ok(TapeFormat::Orion) => DataFile::orion(bits),
        Err(outcome) => DataFile::failed(None, outcome),
    };
    match attempt.format {
        Some(format) => debug!("analyze: {} file: {}", format, attempt.outcome),
        None => debug!("analyze: unrecognized file: {}", attempt.outcome),
    }

    let raw = if attempt.outcome.is_ok() {
        None
    } else {
        Some(DataFile::raw(bits))
    };

    Analysis { attempt, raw }
}

/// Tape checksum of `data`
///
/// A two-byte running sum. The low byte is the sum of all bytes.
/// The high byte is the sum of every byte but the last, plus the
/// carries out of the low byte.
///
/// ```
/// assert_eq!(tapeload::checksum(&[0x01, 0x02, 0x03]), 0x0306);
/// ```
pub fn checksum(data: &[u8]) -> u16 {
    let mut low = 0u32;
    let mut high = 0u32;
    for (i, &b) in data.iter().enumerate() {
        low += b as u32;
        let carry = low >> 8;
        low &= 0xff;
        if i + 1 == data.len() {
            break;
        }
        high = (high + b as u32 + carry) & 0xff;
    }
    ((high << 8) | low) as u16
}

impl DataFile {
    /// Decode a radio file
    ///
    /// The file is named after its recorded checksum.
    pub fn radio<B>(bits: &mut B) -> Self
    where
        B: BitCursor + ?Sized,
    {
        let mut file = Self::failed(Some(TapeFormat::Radio), Outcome::NoSync);
        let outcome = match file.read_radio(bits) {
            Ok(()) => file.verify(),
            Err(outcome) => outcome,
        };
        file.outcome = outcome;
        file
    }

    /// Decode an orion file
    ///
    /// The file is named by its header. Characters which are not
    /// printable, and path separators, are replaced with `?`.
    pub fn orion<B>(bits: &mut B) -> Self
    where
        B: BitCursor + ?Sized,
    {
        let mut file = Self::failed(Some(TapeFormat::Orion), Outcome::NoSync);
        let outcome = match file.read_orion(bits) {
            Ok(()) => file.verify(),
            Err(outcome) => outcome,
        };
        file.outcome = outcome;
        file
    }

    /// Capture the stream without structure
    ///
    /// Every byte from the first
    /// [`find_sync_bit()`](BitCursor::find_sync_bit) match to the end
    /// of the stream. A stream with no match captures nothing and
    /// reports an end address of `-1`.
    pub fn raw<B>(bits: &mut B) -> Self
    where
        B: BitCursor + ?Sized,
    {
        let data = bits.bytes();
        let length = i32::try_from(data.len()).unwrap_or(i32::MAX);
        Self {
            outcome: Outcome::Raw,
            format: None,
            name: Some("raw data".to_owned()),
            base: 0,
            end: length - 1,
            length,
            data,
            checksum_read: 0,
            checksum_computed: 0,
        }
    }

    /// Result of decoding
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Container format, if one was recognized
    pub fn format(&self) -> Option<TapeFormat> {
        self.format
    }

    /// File name, if one was decoded
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Load address of the first byte
    pub fn base(&self) -> i32 {
        self.base
    }

    /// Load address of the last byte
    pub fn end(&self) -> i32 {
        self.end
    }

    /// Declared payload length, in bytes
    pub fn length(&self) -> i32 {
        self.length
    }

    /// Payload bytes read
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Checksum as recorded on tape
    pub fn checksum_read(&self) -> u16 {
        self.checksum_read
    }

    /// Checksum computed over the payload
    pub fn checksum_computed(&self) -> u16 {
        self.checksum_computed
    }

    /// Write the payload to `dir`
    ///
    /// Only files which decoded [`Ok`](Outcome::Ok) are written,
    /// verbatim, under their decoded name. Returns the path
    /// written, if any. An existing file is overwritten.
    pub fn save<P>(&self, dir: P) -> io::Result<Option<PathBuf>>
    where
        P: AsRef<Path>,
    {
        let name = match (self.outcome, &self.name) {
            (Outcome::Ok, Some(name)) => name,
            _ => return Ok(None),
        };

        let path = dir.as_ref().join(name);
        fs::write(&path, &self.data)?;
        info!("saved {} bytes to \"{}\"", self.data.len(), path.display());
        Ok(Some(path))
    }

    fn failed(format: Option<TapeFormat>, outcome: Outcome) -> Self {
        Self {
            outcome,
            format,
            name: None,
            base: 0,
            end: 0,
            length: 0,
            data: Vec::new(),
            checksum_read: 0,
            checksum_computed: 0,
        }
    }

    fn read_radio<B>(&mut self, bits: &mut B) -> Result<(), Outcome>
    where
        B: BitCursor + ?Sized,
    {
        bits.reset();
        require(bits.find_sync(), Outcome::NoSync)?;
        self.read_body(bits)?;
        self.name = Some(format!("{:04x}.rk", self.checksum_read));
        Ok(())
    }

    fn read_orion<B>(&mut self, bits: &mut B) -> Result<(), Outcome>
    where
        B: BitCursor + ?Sized,
    {
        bits.reset();
        require(bits.find_sync(), Outcome::NoSync)?;

        let mut name = String::with_capacity(8);
        for _i in 0..8 {
            let c = bits.byte();
            require(bits.next_byte(), Outcome::NoHeader)?;
            name.push(sanitize(c));
        }
        self.name = Some(name);

        for _i in 0..8 {
            require(bits.byte() == 0, Outcome::NotOrion)?;
            require(bits.next_byte(), Outcome::NoHeader)?;
        }
        require(bits.next_byte(), Outcome::NoHeader)?;

        require(bits.find_sync(), Outcome::NoSync)?;
        self.read_body(bits)
    }

    // address block, payload, and recorded checksum
    fn read_body<B>(&mut self, bits: &mut B) -> Result<(), Outcome>
    where
        B: BitCursor + ?Sized,
    {
        self.base = bits.word() as i32;
        require(bits.next_word(), Outcome::NoBase)?;

        self.end = bits.word() as i32;
        require(bits.next_word(), Outcome::NoLength)?;

        self.length = self.end - self.base + 1;
        require(self.length >= 0, Outcome::NegativeLength)?;

        self.data.reserve(self.length as usize);
        for _i in 0..self.length {
            self.data.push(bits.byte());
            require(bits.next_byte(), Outcome::WrongLength)?;
        }

        require(bits.find_sync(), Outcome::NoSyncCrc)?;
        self.checksum_read = bits.word();
        require(bits.next_word(), Outcome::NoCrc)?;
        Ok(())
    }

    fn verify(&mut self) -> Outcome {
        self.checksum_computed = checksum(&self.data);
        if self.checksum_computed == self.checksum_read {
            Outcome::Ok
        } else {
            Outcome::BadCrc
        }
    }
}

impl Analysis {
    /// The structured decoding attempt
    pub fn attempt(&self) -> &DataFile {
        &self.attempt
    }

    /// The raw capture, if the attempt failed
    pub fn raw(&self) -> Option<&DataFile> {
        self.raw.as_ref()
    }

    /// The final result: the raw capture if there is one
    pub fn result(&self) -> &DataFile {
        self.raw.as_ref().unwrap_or(&self.attempt)
    }

    /// Save the file to `dir`, if it decoded successfully
    ///
    /// See [`DataFile::save()`].
    pub fn save<P>(&self, dir: P) -> io::Result<Option<PathBuf>>
    where
        P: AsRef<Path>,
    {
        self.result().save(dir)
    }
}

impl IntoIterator for Analysis {
    type Item = DataFile;
    type IntoIter = std::iter::Chain<std::iter::Once<DataFile>, std::option::IntoIter<DataFile>>;

    /// The attempt, then the raw capture
    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self.attempt).chain(self.raw)
    }
}

#[inline]
fn require(cond: bool, outcome: Outcome) -> Result<(), Outcome> {
    if cond {
        Ok(())
    } else {
        Err(outcome)
    }
}

#[inline]
fn is_printable(c: u8) -> bool {
    (0x20..=0x7f).contains(&c)
}

fn sanitize(c: u8) -> char {
    match c {
        b'/' | b'\\' => '?',
        c if is_printable(c) => c as char,
        _ => '?',
    }
}
