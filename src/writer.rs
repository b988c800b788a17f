use log::debug;
use std::{fs, path};

use crate::error::Result;
use crate::model::{Association, Entity, Node, EDGE_COLUMNS, NODE_COLUMNS};

/// The node/edge file pair one ingest (or the merge) produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KgxGraph {
    pub name: String,
    pub nodes_file: path::PathBuf,
    pub edges_file: path::PathBuf,
}

impl KgxGraph {
    pub fn in_dir(output_dir: &path::Path, name: &str) -> Self {
        KgxGraph {
            name: name.to_string(),
            nodes_file: output_dir.join(format!("{}_nodes.tsv", name)),
            edges_file: output_dir.join(format!("{}_edges.tsv", name)),
        }
    }

    pub fn exists(&self) -> bool {
        self.nodes_file.exists() && self.edges_file.exists()
    }
}

/// Collects one job's entities in emission order, split by kind. Not shared between jobs.
#[derive(Debug, Default)]
pub struct EntityWriter {
    nodes: Vec<Node>,
    edges: Vec<Association>,
}

impl EntityWriter {
    pub fn write<I: IntoIterator<Item = Entity>>(&mut self, entities: I) {
        for entity in entities {
            match entity {
                Entity::Node(node) => self.nodes.push(node),
                Entity::Association(association) => self.edges.push(association),
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Association] {
        &self.edges
    }

    pub fn persist(&self, output_dir: &path::Path, name: &str) -> Result<KgxGraph> {
        fs::create_dir_all(output_dir)?;
        let graph = KgxGraph::in_dir(output_dir, name);
        debug!("writing {} nodes to {:?}", self.nodes.len(), graph.nodes_file);
        write_tsv(&graph.nodes_file, &NODE_COLUMNS, self.nodes.iter().map(Node::to_record))?;
        debug!("writing {} edges to {:?}", self.edges.len(), graph.edges_file);
        write_tsv(&graph.edges_file, &EDGE_COLUMNS, self.edges.iter().map(Association::to_record))?;
        Ok(graph)
    }
}

pub(crate) fn write_tsv<I: Iterator<Item = Vec<String>>>(path: &path::Path, header: &[&str], records: I) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').quote_style(csv::QuoteStyle::Never).from_path(path)?;
    writer.write_record(header)?;
    for record in records {
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
