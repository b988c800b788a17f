use log::{info, warn};
use polars::prelude::*;
use std::{fs, path};

use crate::error::{IngestError, Result};
use crate::model::{EDGE_COLUMNS, NODE_COLUMNS};
use crate::writer::{write_tsv, KgxGraph};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeReport {
    pub graph: KgxGraph,
    pub merged: Vec<String>,
    pub omitted: Vec<String>,
    pub nodes: usize,
    pub edges: usize,
}

fn scan_tsv(path: &path::Path) -> Result<LazyFrame> {
    let frame = LazyCsvReader::new(path.to_path_buf())
        .with_separator(b'\t')
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
        .with_quote_char(None)
        .with_truncate_ragged_lines(true)
        .with_ignore_errors(true)
        .finish()?;
    Ok(frame)
}

fn read_tsv(path: &path::Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(IngestError::Merge { path: path.to_path_buf(), reason: "file does not exist".to_string() });
    }
    scan_tsv(path).and_then(|frame| Ok(frame.collect()?)).map_err(|e| IngestError::Merge { path: path.to_path_buf(), reason: e.to_string() })
}

/// Reads a graph eagerly so an unreadable file only costs that graph its place in the merge.
fn read_graph(graph: &KgxGraph) -> Result<(DataFrame, DataFrame)> {
    let nodes = read_tsv(&graph.nodes_file)?;
    let edges = read_tsv(&graph.edges_file)?;
    Ok((nodes, edges))
}

fn write_frame(path: &path::Path, df: &mut DataFrame) -> Result<()> {
    let mut file = fs::File::create(path)?;
    CsvWriter::new(&mut file).with_separator(b'\t').with_quote_style(QuoteStyle::Never).finish(df)?;
    Ok(())
}

/// Combines per-ingest graphs, in the order given, into `<graph_name>_{nodes|edges}.tsv`.
/// A node id seen more than once keeps its first row; edges are concatenated as-is.
pub fn merge(graphs: &[KgxGraph], output_dir: &path::Path, graph_name: &str) -> Result<MergeReport> {
    fs::create_dir_all(output_dir)?;
    let mut node_frames = vec![];
    let mut edge_frames = vec![];
    let mut merged = vec![];
    let mut omitted = vec![];

    for graph in graphs.iter() {
        match read_graph(graph) {
            Ok((nodes, edges)) => {
                node_frames.push(nodes.lazy());
                edge_frames.push(edges.lazy());
                merged.push(graph.name.clone());
            }
            Err(e) => {
                warn!("omitting {} from the merge: {}", graph.name, e);
                omitted.push(graph.name.clone());
            }
        }
    }

    let output = KgxGraph::in_dir(output_dir, graph_name);
    if merged.is_empty() {
        warn!("nothing to merge, writing an empty {} graph", graph_name);
        write_tsv(&output.nodes_file, &NODE_COLUMNS, std::iter::empty::<Vec<String>>())?;
        write_tsv(&output.edges_file, &EDGE_COLUMNS, std::iter::empty::<Vec<String>>())?;
        return Ok(MergeReport { graph: output, merged, omitted, nodes: 0, edges: 0 });
    }

    let mut nodes_df = concat(node_frames, UnionArgs::default())?.unique_stable(Some(vec!["id".into()]), UniqueKeepStrategy::First).collect()?;
    let mut edges_df = concat(edge_frames, UnionArgs::default())?.collect()?;

    write_frame(&output.nodes_file, &mut nodes_df)?;
    write_frame(&output.edges_file, &mut edges_df)?;

    info!("merged {} graphs into {}: {} nodes, {} edges", merged.len(), graph_name, nodes_df.height(), edges_df.height());
    if !omitted.is_empty() {
        warn!("merge omitted: {}", omitted.join(", "));
    }
    Ok(MergeReport { graph: output, merged, omitted, nodes: nodes_df.height(), edges: edges_df.height() })
}
