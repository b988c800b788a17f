#[macro_use]
extern crate log;

use clap::Parser;
use humantime::format_duration;
use monarch_ingest::pmc;
use std::error;
use std::path;
use std::process;
use std::time::Instant;

#[derive(Parser, PartialEq, Debug)]
#[command(author, version, about, long_about = None)]
struct Options {
    input_dir: path::PathBuf,

    output_dir: path::PathBuf,

    /// Convert every file, even when several share a PMC id
    #[arg(long, default_value_t = false)]
    no_duplicates: bool,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn error::Error>> {
    let start = Instant::now();
    let options = Options::parse();
    let default_level = if options.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
    debug!("{:?}", options);

    if !options.input_dir.exists() {
        error!("input directory does not exist: {:?}", options.input_dir);
        process::exit(1);
    }

    pmc::convert_dir(&options.input_dir, &options.output_dir, !options.no_duplicates)?;

    info!("Duration: {}", format_duration(start.elapsed()).to_string());
    Ok(())
}
