mod logger;

use std::path::{Path, PathBuf};

use bridge::FormatBridge;
use clap::error::ErrorKind;
use clap::Parser;
use dds::DecodeOptions;
use miette::Result;

#[derive(Parser, Debug)]
#[command(name = "dds-convert")]
#[command(about, version, long_about = None)]
struct Cli {
    /// Input DDS file followed by the output PNG file
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,
    /// Mip level to convert
    #[arg(long, default_value_t = 0, value_name = "LEVEL")]
    mip: usize,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

pub fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            // Unrecognized input is treated like a wrong path count.
            _ => return Ok(()),
        },
    };
    logger::init(cli.verbose);

    // Anything but exactly two paths is a silent no-op.
    let [input, output] = cli.paths.as_slice() else {
        log::debug!("expected 2 paths, got {}; nothing to do", cli.paths.len());
        return Ok(());
    };

    command_convert(input, output, cli.mip)
}

fn command_convert(input: &Path, output: &Path, mip_level: usize) -> Result<()> {
    let options = DecodeOptions {
        mip_level,
        ..DecodeOptions::default()
    };
    FormatBridge::with_options(options).convert(input, output)?;
    Ok(())
}
