use std::fmt::Display;

use clap::{error::ErrorKind, value_parser, CommandFactory, Parser, ValueEnum};

use tapeload::Channel;

const USAGE_SHORT: &str = r#"
This program reads a WAV recording of a cassette tape, demodulates it, and saves every file that loads with a valid checksum. A diagnostic report is printed for each tone and file.

See --help for more details.
"#;

const USAGE_LONG: &str = r#"
This program reads a WAV recording of a cassette tape, demodulates it, and saves every file that loads with a valid checksum. A diagnostic report is printed for each tone and file.

The recording must be integer PCM, mono or stereo, at any sampling rate that gives several samples per half-cycle of the tape signal. Digitize at 22050 Hz or better:

    tapedec --file tape.wav --output-dir loaded/

Radio-format files are saved under their checksum, like "3060.rk". Orion-format files are saved under the name in their header. Files which fail to decode are dumped to the report but never saved.

If no files load, try the other --channel of a stereo recording or widen the pulse width tolerance with --delta.
"#;

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_help = USAGE_SHORT, after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
pub struct Args {
    /// Verbosity level (-vvv for more)
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print NOTHING, not even the report
    #[arg(short, long)]
    pub quiet: bool,

    /// Channel to demodulate
    ///
    /// Stereo recordings often carry the tape signal on one channel
    /// only. "both" averages the two. Ignored for mono recordings.
    #[arg(short, long, value_enum, default_value_t = ChannelArg::Left)]
    pub channel: ChannelArg,

    /// Pulse width tolerance (percent)
    ///
    /// Pulses within this fraction of the measured short pulse width
    /// are accepted.
    #[arg(short, long, default_value_t = 40)]
    #[arg(value_parser = value_parser!(u8).range(1..100))]
    pub delta: u8,

    /// Lead-in tone length (pulses)
    ///
    /// Decoding begins after more than this many short pulses of
    /// consistent width.
    #[arg(short, long, default_value_t = 32)]
    #[arg(value_parser = value_parser!(u32).range(1..))]
    pub tone: u32,

    /// Input WAV file
    #[arg(short, long)]
    pub file: Option<String>,

    /// Directory for recovered files
    #[arg(short, long, default_value_t = String::from("."))]
    pub output_dir: String,
}

impl Args {
    /// Pulse width tolerance, as a fraction
    pub fn delta_fraction(&self) -> f64 {
        self.delta as f64 / 100.0
    }
}

/// Channel selection
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelArg {
    Left,
    Right,
    Both,
}

impl From<ChannelArg> for Channel {
    fn from(arg: ChannelArg) -> Channel {
        match arg {
            ChannelArg::Left => Channel::Left,
            ChannelArg::Right => Channel::Right,
            ChannelArg::Both => Channel::Both,
        }
    }
}

/// A program-level error with exit code
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Create new error with a custom exit code
    pub fn new(error: anyhow::Error, code: i32) -> CliError {
        CliError {
            error,
            exit_code: code,
        }
    }

    /// Print this error to the terminal
    ///
    /// Errors from clap are printed verbatim. Other types of errors
    /// are printed indirectly via clap's fancy formatter.
    pub fn print(&self) -> std::io::Result<()> {
        if let Some(e) = self.error.downcast_ref::<clap::Error>() {
            e.print()
        } else {
            Args::command()
                .error(ErrorKind::Format, self.to_string())
                .print()
        }
    }

    /// Print this error to the terminal and exit
    pub fn exit(&self) -> ! {
        drop(self.print());
        std::process::exit(self.exit_code);
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.error)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        let code = if err.use_stderr() { 1 } else { 0 };
        CliError::new(err.into(), code)
    }
}
