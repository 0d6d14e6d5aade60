//! Diagnostic report printing
//!
//! Everything is written to any [`Write`], so the report can be
//! checked without a terminal.

use std::fmt::Write as _;
use std::io::{self, Write};

use tapeload::{DataFile, DurationBuffer, DurationMark, LoaderEvent, ToneReport, ToneStatistics};

/// Bytes per hex dump line
pub const DUMP_WIDTH: usize = 16;

const RULE: &str =
    "--------------------------------------------------------------------------------";

/// Write the size of the duration sequence
pub fn write_durations<W: Write>(out: &mut W, durations: &DurationBuffer) -> io::Result<()> {
    writeln!(out, "durations length:  {}", durations.len())?;
    writeln!(out, "durations samples: {}", durations.sum())
}

/// Write one loader event
pub fn write_event<W: Write>(out: &mut W, evt: &LoaderEvent) -> io::Result<()> {
    match evt {
        LoaderEvent::ToneFound(mark) => {
            writeln!(out, "{}", RULE)?;
            write_mark(out, "Found tone", mark)
        }
        LoaderEvent::ModulationError(mark) => write_mark(out, "Modulation error", mark),
        LoaderEvent::LostTone(mark) => write_mark(out, "Lost tone", mark),
        LoaderEvent::Statistics(report) => write_report(out, report),
        LoaderEvent::File(file) => write_file(out, file),
    }
}

fn write_mark<W: Write>(out: &mut W, what: &str, mark: &DurationMark) -> io::Result<()> {
    writeln!(
        out,
        "{} at sample: {}, duration index: {} ({})",
        what,
        mark.sample(),
        mark.index(),
        mark
    )?;
    writeln!(out, "durations: {}", window_line(mark))
}

/// Format the durations around a mark
///
/// The first duration's index, then each duration.
pub fn window_line(mark: &DurationMark) -> String {
    let mut line = format!("{}:", mark.window_start());
    for d in mark.window() {
        let _ = write!(line, " {:2}", d);
    }
    line
}

fn write_report<W: Write>(out: &mut W, report: &ToneReport) -> io::Result<()> {
    writeln!(out, "Statistics:")?;
    writeln!(
        out,
        "\tstream length:   {} bits ({:04x}+{})",
        report.bits(),
        report.bits() >> 3,
        report.bits() & 7
    )?;
    writeln!(
        out,
        "\taverage period:  {:.1} ({} units)",
        report.mean_period(),
        report.units()
    )?;
    write_pulses(out, "short", report.short_band(), report.short())?;
    write_pulses(out, "long", report.long_band(), report.long())
}

fn write_pulses<W: Write>(
    out: &mut W,
    what: &str,
    band: (f64, f64),
    stats: &ToneStatistics,
) -> io::Result<()> {
    writeln!(out, "\t{} pulses:", what)?;
    writeln!(
        out,
        "\t\tperiod:       [{:.1}] {} < {:.1} < {} [{:.1}] ({})",
        band.0,
        optional(stats.min()),
        stats.mean(),
        optional(stats.max()),
        band.1,
        stats.count()
    )?;
    writeln!(out, "\t\tdistribution: {}", histogram_line(stats))?;
    writeln!(out, "\t\tdispersion:   {:.2}", stats.variance())
}

/// Format a histogram as `duration:count` pairs
pub fn histogram_line(stats: &ToneStatistics) -> String {
    let mut line = String::new();
    for (d, n) in stats.histogram() {
        if !line.is_empty() {
            line.push(' ');
        }
        let _ = write!(line, "{}:{}", d, n);
    }
    line
}

fn optional(v: Option<u32>) -> String {
    v.map_or_else(|| "-".to_owned(), |v| v.to_string())
}

fn write_file<W: Write>(out: &mut W, file: &DataFile) -> io::Result<()> {
    writeln!(out, "File info:")?;
    writeln!(out, "\tresult: {}", file.outcome())?;
    if let Some(format) = file.format() {
        writeln!(out, "\tformat: {}", format)?;
    }
    if !file.outcome().has_payload() {
        return Ok(());
    }

    if let Some(name) = file.name() {
        writeln!(out, "\tname:   {}", name)?;
    }
    writeln!(
        out,
        "\tbase:   {}-{}",
        address(file.base()),
        address(file.end())
    )?;
    writeln!(out, "\tlength: {}", address(file.length()))?;
    if file.format().is_some() {
        writeln!(
            out,
            "\tCRC:    {:04x} -> {:04x}",
            file.checksum_read(),
            file.checksum_computed()
        )?;
    }

    let base = file.base().max(0) as usize;
    for (i, chunk) in file.data().chunks(DUMP_WIDTH).enumerate() {
        writeln!(out, "{}", dump_line(base + i * DUMP_WIDTH, chunk))?;
    }
    Ok(())
}

/// Format an address or length as four hex digits
///
/// Negative values keep their sign.
pub fn address(v: i32) -> String {
    if v < 0 {
        format!("-{:04x}", v.unsigned_abs())
    } else {
        format!("{:04x}", v)
    }
}

/// Format one hex dump line
///
/// The address, up to [`DUMP_WIDTH`] bytes in hex, and the same
/// bytes as ASCII. Unprintable bytes show as `.`.
pub fn dump_line(addr: usize, bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(3 * DUMP_WIDTH);
    let mut ascii = String::with_capacity(DUMP_WIDTH);
    for &b in bytes.iter().take(DUMP_WIDTH) {
        let _ = write!(hex, "{:02x} ", b);
        ascii.push(if (0x20..0x7f).contains(&b) {
            b as char
        } else {
            '.'
        });
    }
    format!("{:04x}: {:<width$} {}", addr, hex, ascii, width = 3 * DUMP_WIDTH)
}
