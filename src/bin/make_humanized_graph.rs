#[macro_use]
extern crate log;

use clap::Parser;
use humantime::format_duration;
use monarch_ingest::humanize;
use monarch_ingest::writer::KgxGraph;
use std::error;
use std::path;
use std::time::Instant;

#[derive(Parser, PartialEq, Debug)]
#[command(author, version, about, long_about = None)]
struct Options {
    /// Directory holding `<graph_name>_nodes.tsv` and `<graph_name>_edges.tsv`
    #[arg(short, long, default_value = "output")]
    input_dir: path::PathBuf,

    #[arg(short, long, default_value = "monarch-kg")]
    graph_name: String,

    /// Process only the first N edges
    #[arg(short, long)]
    limit: Option<usize>,
}

fn main() -> Result<(), Box<dyn error::Error>> {
    let start = Instant::now();
    env_logger::init();

    let options = Options::parse();
    debug!("{:?}", options);

    let graph = KgxGraph::in_dir(&options.input_dir, &options.graph_name);
    for file in [&graph.nodes_file, &graph.edges_file] {
        if !file.exists() {
            return Err(format!("{:?} not found", file).into());
        }
    }

    let output_file = options.input_dir.join(format!("{}_humanized_edges.tsv", options.graph_name));
    let count = humanize::humanize_edges(&graph.nodes_file, &graph.edges_file, &output_file, options.limit)?;
    info!("{} edges humanized into {:?}", count, output_file);

    info!("Duration: {}", format_duration(start.elapsed()).to_string());
    Ok(())
}
