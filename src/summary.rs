use log::info;
use serde_derive::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::{fs, path};

use crate::error::Result;
use crate::model::{KgxEdge, KgxNode};
use crate::writer::KgxGraph;
use crate::{read_edges_file, read_nodes_file, MULTIVALUE_SEPARATOR};

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub graph_name: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub node_categories: BTreeMap<String, usize>,
    pub predicates: BTreeMap<String, usize>,
    pub primary_knowledge_sources: BTreeMap<String, usize>,
    pub max_degree: usize,
    pub mean_degree: f64,
}

fn count<'a, I: Iterator<Item = &'a str>>(values: I) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    values.filter(|v| !v.is_empty()).for_each(|v| *counts.entry(v.to_string()).or_insert(0) += 1);
    counts
}

impl GraphStats {
    pub fn compute(graph_name: &str, nodes: &[KgxNode], edges: &[KgxEdge]) -> Self {
        let mut degrees: HashMap<&str, usize> = HashMap::new();
        for edge in edges.iter() {
            *degrees.entry(edge.subject.as_str()).or_insert(0) += 1;
            *degrees.entry(edge.object.as_str()).or_insert(0) += 1;
        }
        let mean_degree = match degrees.len() {
            0 => 0.0,
            n => degrees.values().sum::<usize>() as f64 / n as f64,
        };

        GraphStats {
            graph_name: graph_name.to_string(),
            node_count: nodes.len(),
            edge_count: edges.len(),
            node_categories: count(nodes.iter().flat_map(|n| n.category.split(MULTIVALUE_SEPARATOR))),
            predicates: count(edges.iter().map(|e| e.predicate.as_str())),
            primary_knowledge_sources: count(edges.iter().map(|e| e.primary_knowledge_source.as_str())),
            max_degree: degrees.values().copied().max().unwrap_or(0),
            mean_degree,
        }
    }
}

pub fn stats_file(output_dir: &path::Path, name: &str) -> path::PathBuf {
    output_dir.join(format!("{}_graph_stats.yaml", name))
}

/// Writes `<name>_graph_stats.yaml` next to the graph's files.
pub fn summarize(graph: &KgxGraph) -> Result<path::PathBuf> {
    let nodes = read_nodes_file(&graph.nodes_file)?;
    let edges = read_edges_file(&graph.edges_file)?;
    let stats = GraphStats::compute(&graph.name, &nodes, &edges);

    let output_dir = graph.nodes_file.parent().unwrap_or_else(|| path::Path::new("."));
    let path = stats_file(output_dir, &graph.name);
    fs::write(&path, serde_yml::to_string(&stats)?)?;
    info!("{}: {} nodes, {} edges, stats written to {:?}", graph.name, stats.node_count, stats.edge_count, path);
    Ok(path)
}
