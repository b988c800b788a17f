#[macro_use]
extern crate log;

use clap::Parser;
use humantime::format_duration;
use monarch_ingest::config::PipelineConfig;
use monarch_ingest::idgen::UuidGenerator;
use monarch_ingest::pipeline;
use std::error;
use std::path;
use std::process;
use std::time::Instant;

#[derive(Parser, PartialEq, Debug)]
#[command(author, version, about, long_about = None)]
struct Options {
    /// Pipeline configuration; defaults to ./ingest.yaml when present
    #[arg(short, long)]
    config: Option<path::PathBuf>,

    #[arg(short, long)]
    data_dir: Option<path::PathBuf>,

    #[arg(short, long)]
    output_dir: Option<path::PathBuf>,

    #[arg(short, long)]
    workers: Option<usize>,

    #[arg(long, default_value_t = false)]
    skip_download: bool,

    /// Run only these ingests, e.g. `--only hgnc_gene --only zfin_publication_to_gene`
    #[arg(long)]
    only: Vec<String>,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn error::Error>> {
    let start = Instant::now();
    let options = Options::parse();
    let default_level = if options.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
    debug!("{:?}", options);

    let mut config = PipelineConfig::load(options.config.as_deref())?;
    if let Some(data_dir) = options.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(output_dir) = options.output_dir {
        config.output_dir = output_dir;
    }
    if options.workers.is_some() {
        config.workers = options.workers;
    }
    config.restrict(&options.only)?;

    let summary = pipeline::run(&config, options.skip_download, &UuidGenerator)?;
    summary.log();

    info!("Duration: {}", format_duration(start.elapsed()).to_string());
    if !summary.is_success() {
        process::exit(1);
    }
    Ok(())
}
