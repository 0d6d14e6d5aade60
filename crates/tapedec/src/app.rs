//! Load every file on the tape

use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use log::{info, warn};

use tapeload::{DurationBuffer, LoaderEvent, TapeLoader};

use crate::cli::Args;
use crate::report;

/// Run the application
///
/// Runs the `loader` over the `durations` of the whole recording,
/// printing the report to `out` unless `args` ask for quiet.
/// Every file which loads successfully is saved to the output
/// directory. Returns the number of files saved.
pub fn run<W>(
    args: &Args,
    loader: &mut TapeLoader,
    durations: &DurationBuffer,
    out: &mut W,
) -> Result<usize, anyhow::Error>
where
    W: Write,
{
    let out_dir = Path::new(&args.output_dir);

    if !args.quiet {
        report::write_durations(out, durations).context("unable to write report")?;
    }

    let mut saved = 0;
    for evt in loader.iter(durations) {
        if !args.quiet {
            report::write_event(out, &evt).context("unable to write report")?;
        }

        if let LoaderEvent::File(file) = &evt {
            let written = file.save(out_dir).with_context(|| {
                format!(
                    "Unable to save \"{}\" to --output-dir \"{}\"",
                    file.name().unwrap_or(""),
                    args.output_dir
                )
            })?;
            if let Some(path) = written {
                info!("saved file: \"{}\"", path.display());
                saved += 1;
            }
        }
    }

    if saved == 0 {
        warn!("no files loaded; try another --channel or a wider --delta");
    }
    out.flush().context("unable to write report")?;
    Ok(saved)
}

/// Run the application on standard output
pub fn run_stdout(
    args: &Args,
    loader: &mut TapeLoader,
    durations: &DurationBuffer,
) -> Result<usize, anyhow::Error> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    run(args, loader, durations, &mut handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::Parser;
    use tapeload::{InterleavedSamples, TapeLoaderBuilder};

    const RADIO: &[u8] = &[
        0x00, 0x00, 0xE6, 0x40, 0x00, 0x40, 0x02, 0x10, 0x20, 0x30, 0x00, 0x00, 0xE6, 0x30, 0x60,
    ];

    // lead-in tone, start bit, then the bytes as a square wave
    fn recording() -> Vec<i32> {
        let mut durations = vec![8u32; 64];
        durations.push(16);
        let mut prev = true;
        for byte in RADIO {
            for i in (0..8).rev() {
                let bit = (byte >> i) & 0x01 == 0x01;
                if bit == prev {
                    durations.extend_from_slice(&[8, 8]);
                } else {
                    durations.push(16);
                }
                prev = bit;
            }
        }

        let mut samples = vec![];
        let mut level = 10000;
        for d in durations {
            samples.extend(std::iter::repeat(level).take(d as usize));
            level = -level;
        }
        samples
    }

    #[test]
    fn test_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out_dir = dir.path().to_str().expect("utf8 path");

        let args = Args::try_parse_from(["tapedec", "-f", "tape.wav", "-o", out_dir])
            .expect("valid arguments");
        let mut loader = TapeLoaderBuilder::default().build();
        let durations = loader
            .segment(&mut InterleavedSamples::mono(recording()))
            .expect("memory source");

        let mut out = vec![];
        let saved = run(&args, &mut loader, &durations, &mut out).expect("run");
        assert_eq!(saved, 1);
        assert_eq!(
            std::fs::read(dir.path().join("3060.rk")).expect("saved file"),
            vec![0x10, 0x20, 0x30]
        );

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Found tone"));
        assert!(text.contains("\tresult: ok\n"));
        assert!(text.contains("4000: 10 20 30"));

        // quiet still saves, but prints nothing
        let args = Args::try_parse_from(["tapedec", "-q", "-f", "tape.wav", "-o", out_dir])
            .expect("valid arguments");
        let mut out = vec![];
        let saved = run(&args, &mut loader, &durations, &mut out).expect("run");
        assert_eq!(saved, 1);
        assert!(out.is_empty());
    }

    #[test]
    fn test_run_missing_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing");

        let args = Args::try_parse_from([
            "tapedec",
            "-q",
            "-o",
            missing.to_str().expect("utf8 path"),
        ])
        .expect("valid arguments");
        let mut loader = TapeLoaderBuilder::default().build();
        let durations = loader
            .segment(&mut InterleavedSamples::mono(recording()))
            .expect("memory source");

        let mut out = vec![];
        let err = run(&args, &mut loader, &durations, &mut out).expect_err("no such directory");
        assert!(err.to_string().contains("--output-dir"));
    }
}
