use anyhow::Context;
use clap::{CommandFactory, Parser};
use log::{info, LevelFilter};

use tapeload::{TapeLoaderBuilder, WavSource};

mod app;
mod cli;
mod report;

use cli::{Args, CliError};

fn main() {
    match tapedec() {
        Ok(()) => {}
        Err(cli_error) => cli_error.exit(),
    }
}

fn tapedec() -> Result<(), CliError> {
    // Parse options and start logging
    let args = Args::try_parse()?;
    log_setup(&args);

    // nothing to load: show usage
    let file = match &args.file {
        Some(file) => file,
        None => {
            Args::command()
                .print_help()
                .context("unable to print usage")?;
            return Ok(());
        }
    };

    // create the loader
    let mut loader = TapeLoaderBuilder::new()
        .with_channel(args.channel.into())
        .with_delta(args.delta_fraction())
        .with_tone_length(args.tone)
        .build();

    info!("tape loader reading file: \"{}\"", file);
    let mut source =
        WavSource::open(file).with_context(|| format!("Unable to open --file \"{}\"", file))?;
    info!(
        "input: {} Hz, {} channel(s), {} frames",
        source.spec().sample_rate,
        source.spec().channels,
        source.len()
    );

    let durations = loader
        .segment(&mut source)
        .with_context(|| format!("Unable to read --file \"{}\"", file))?;

    let saved = app::run_stdout(&args, &mut loader, &durations)?;
    info!("{} file(s) saved to \"{}\"", saved, args.output_dir);

    Ok(())
}

fn log_setup(args: &Args) {
    if args.quiet {
        // no logging
        return;
    } else if std::env::var_os("RUST_LOG").is_none() {
        // parameter controls
        let log_filter = match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        pretty_env_logger::formatted_builder()
            .filter_module("tapeload", log_filter)
            .filter_module("tapedec", log_filter)
            .init();
    } else {
        // environment controls
        pretty_env_logger::init();
    }
}
