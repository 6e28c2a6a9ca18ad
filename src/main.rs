use std::path::PathBuf;

use clap::{AppSettings, Parser};
use log::info;

use blavg::{
    config::{SmoothConfig, DEFAULT_DATA_COL_NAME, DEFAULT_ION_FACTOR},
    process::smooth_ms,
};

/// Smooth visibilities along time with a Gaussian whose width depends on the
/// baseline length. Short baselines are smoothed more than long ones.
#[derive(Parser)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_long_args = true)]
struct Args {
    /// The measurement set to be smoothed.
    ms: PathBuf,

    /// How strong the ionosphere is assumed to be. Larger values smooth more.
    #[clap(short, long, default_value_t = DEFAULT_ION_FACTOR)]
    ion_factor: f64,

    /// Overwrite the input measurement set, rather than writing a new one with
    /// "-BLavg" added to its name.
    #[clap(short, long)]
    overwrite: bool,

    /// Remove the output measurement set if it already exists.
    #[clap(short, long)]
    clobber: bool,

    /// The column containing the visibilities to be smoothed.
    #[clap(short = 'l', long, default_value = DEFAULT_DATA_COL_NAME)]
    column: String,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,

    /// Disable progress bars.
    #[clap(long)]
    no_progress_bars: bool,
}

fn main() {
    let args = Args::parse();
    setup_logging(args.verbosity);

    let mut config = SmoothConfig::new(
        &args.ms,
        args.ion_factor,
        args.overwrite,
        args.clobber,
        args.column,
    );
    config.progress_bars = !args.no_progress_bars;
    match smooth_ms(&args.ms, &config) {
        Ok(_) => info!("Done"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();
}
