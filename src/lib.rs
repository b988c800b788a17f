extern crate env_logger;
extern crate log;

use std::{fs, io, path};

use crate::error::Result;
use crate::model::{KgxEdge, KgxNode};

pub mod config;
pub mod curie;
pub mod download;
pub mod error;
pub mod humanize;
pub mod idgen;
pub mod ingests;
pub mod job;
pub mod lookup;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod pmc;
pub mod prepare;
pub mod row;
pub mod summary;
pub mod transform;
pub mod validate;
pub mod writer;

pub const INFORES_MONARCH: &str = "infores:monarchinitiative";
pub const MULTIVALUE_SEPARATOR: &str = "|";

fn kgx_reader(path: &path::Path) -> Result<csv::Reader<io::BufReader<fs::File>>> {
    let file = fs::File::open(path)?;
    let reader = io::BufReader::with_capacity(2_usize.pow(14), file);
    Ok(csv::ReaderBuilder::new().has_headers(true).delimiter(b'\t').quoting(false).from_reader(reader))
}

pub fn read_edges_file(edges_path: &path::Path) -> Result<Vec<KgxEdge>> {
    let mut rdr = kgx_reader(edges_path)?;
    let mut edges = vec![];
    for result in rdr.deserialize() {
        let record: KgxEdge = result?;
        edges.push(record);
    }
    Ok(edges)
}

pub fn read_nodes_file(nodes_path: &path::Path) -> Result<Vec<KgxNode>> {
    let mut rdr = kgx_reader(nodes_path)?;
    let mut nodes = vec![];
    for result in rdr.deserialize() {
        let record: KgxNode = result?;
        nodes.push(record);
    }
    Ok(nodes)
}
