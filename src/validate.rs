use itertools::Itertools;
use lazy_static::lazy_static;
use log::{debug, warn};
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashSet;

use crate::error::{IngestError, Result};
use crate::model::{KgxEdge, KgxNode};
use crate::writer::KgxGraph;
use crate::{read_edges_file, read_nodes_file, INFORES_MONARCH, MULTIVALUE_SEPARATOR};

lazy_static! {
    static ref CURIE_REGEX: Regex = Regex::new(r"^[A-Za-z_]+:.+$").expect("Could not create curie regex");
    static ref STARTS_WITH_BIOLINK_REGEX: Regex = Regex::new("^biolink:.+$").expect("Could not create biolink regex");
    static ref STARTS_WITH_INFORES_REGEX: Regex = Regex::new("^infores:.+$").expect("Could not create infores regex");
}

/// Reported infractions are capped so one bad source does not flood the log.
const MAX_REPORTED: usize = 20;

pub fn node_infractions(nodes: &[KgxNode]) -> Vec<String> {
    let id_infractions: Vec<_> = nodes
        .par_iter()
        .filter_map(|n| match CURIE_REGEX.is_match(n.id.as_str()) {
            true => None,
            false => Some(format!("id column does not have a valid CURIE: {:?}", n)),
        })
        .collect();

    let category_infractions: Vec<_> = nodes
        .par_iter()
        .filter_map(|n| match n.category.split(MULTIVALUE_SEPARATOR).all(|c| STARTS_WITH_BIOLINK_REGEX.is_match(c)) {
            true => None,
            false => Some(format!("category column does not start with 'biolink': {:?}", n)),
        })
        .collect();

    id_infractions.into_iter().chain(category_infractions).collect()
}

pub fn edge_infractions(edges: &[KgxEdge]) -> Vec<String> {
    let subject_infractions: Vec<_> = edges
        .par_iter()
        .filter_map(|e| match CURIE_REGEX.is_match(e.subject.as_str()) {
            true => None,
            false => Some(format!("subject column does not have a valid CURIE: {:?}", e)),
        })
        .collect();

    let predicate_infractions: Vec<_> = edges
        .par_iter()
        .filter_map(|e| match STARTS_WITH_BIOLINK_REGEX.is_match(e.predicate.as_str()) {
            true => None,
            false => Some(format!("predicate column does not start with 'biolink': {:?}", e)),
        })
        .collect();

    let object_infractions: Vec<_> = edges
        .par_iter()
        .filter_map(|e| match CURIE_REGEX.is_match(e.object.as_str()) {
            true => None,
            false => Some(format!("object column does not have a valid CURIE: {:?}", e)),
        })
        .collect();

    let provenance_infractions: Vec<_> = edges
        .par_iter()
        .filter_map(|e| {
            let aggregated = e.aggregator_knowledge_source.as_deref().unwrap_or_default().split(MULTIVALUE_SEPARATOR).any(|s| s == INFORES_MONARCH);
            match (STARTS_WITH_INFORES_REGEX.is_match(e.primary_knowledge_source.as_str()), aggregated) {
                (true, true) => None,
                (false, _) => Some(format!("primary_knowledge_source is not an infores id: {:?}", e)),
                (true, false) => Some(format!("aggregator_knowledge_source lacks {}: {:?}", INFORES_MONARCH, e)),
            }
        })
        .collect();

    subject_infractions.into_iter().chain(predicate_infractions).chain(object_infractions).chain(provenance_infractions).collect()
}

/// Schema check of a written node/edge pair; a failure flags the graph as suspect.
pub fn validate(graph: &KgxGraph) -> Result<()> {
    let nodes = read_nodes_file(&graph.nodes_file)?;
    let edges = read_edges_file(&graph.edges_file)?;
    debug!("validating {}: {} nodes, {} edges", graph.name, nodes.len(), edges.len());

    let infractions = node_infractions(&nodes).into_iter().chain(edge_infractions(&edges)).collect_vec();
    if infractions.is_empty() {
        return Ok(());
    }
    infractions.iter().take(MAX_REPORTED).for_each(|i| warn!("{}: {}", graph.name, i));
    Err(IngestError::Validation { ingest: graph.name.clone(), infractions })
}

/// Edge endpoints with no node of their own, sorted.
pub fn dangling_edge_ids(graph: &KgxGraph) -> Result<Vec<String>> {
    let node_ids: HashSet<String> = read_nodes_file(&graph.nodes_file)?.into_iter().map(|n| n.id).collect();
    let edges = read_edges_file(&graph.edges_file)?;
    let dangling = edges
        .par_iter()
        .flat_map_iter(|e| [e.subject.as_str(), e.object.as_str()])
        .filter(|id| !node_ids.contains(*id))
        .map(str::to_string)
        .collect::<HashSet<_>>()
        .into_iter()
        .sorted()
        .collect_vec();
    Ok(dangling)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{category, predicate, Association, Node};
    use crate::writer::EntityWriter;
    use std::fs;

    fn edge(subject: &str, predicate: &str, aggregator: Option<&str>) -> KgxEdge {
        KgxEdge {
            subject: subject.into(),
            predicate: predicate.into(),
            object: "HP:0000001".into(),
            primary_knowledge_source: "infores:hgnc".into(),
            aggregator_knowledge_source: aggregator.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn flags_bad_curies_and_predicates() {
        let edges = vec![
            edge("HGNC:1", "biolink:has_phenotype", Some("infores:monarchinitiative")),
            edge("not a curie", "biolink:has_phenotype", Some("infores:monarchinitiative")),
            edge("HGNC:1", "has_phenotype", Some("infores:monarchinitiative")),
        ];
        let infractions = edge_infractions(&edges);
        assert_eq!(infractions.len(), 2);
        assert!(infractions[0].starts_with("subject column"));
        assert!(infractions[1].starts_with("predicate column"));
    }

    #[test]
    fn flags_missing_monarch_aggregator() {
        let infractions = edge_infractions(&[edge("HGNC:1", "biolink:has_phenotype", Some("infores:alliancegenome"))]);
        assert_eq!(infractions.len(), 1);
        assert!(infractions[0].contains("infores:monarchinitiative"));
    }

    #[test]
    fn flags_non_biolink_categories() {
        let nodes = vec![KgxNode { id: "HGNC:1".into(), category: "biolink:Gene".into(), name: None }, KgxNode { id: "HGNC:2".into(), category: "Gene".into(), name: None }];
        assert_eq!(node_infractions(&nodes).len(), 1);
    }

    #[test]
    fn written_graph_validates_and_reports_dangling_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = EntityWriter::default();
        writer.write(vec![
            Node::gene("HGNC:1").into(),
            Association::new("uuid:1".into(), category::GENE_TO_PHENOTYPIC_FEATURE, "HGNC:1".into(), predicate::HAS_PHENOTYPE, "HP:1".into(), "infores:hgnc").into(),
        ]);
        let graph = writer.persist(dir.path(), "hgnc_gene").unwrap();
        validate(&graph).unwrap();
        assert_eq!(dangling_edge_ids(&graph).unwrap(), vec!["HP:1".to_string()]);
    }

    #[test]
    fn invalid_file_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let graph = KgxGraph::in_dir(dir.path(), "broken");
        fs::write(&graph.nodes_file, "id\tcategory\nbad\tbiolink:Gene\n").unwrap();
        fs::write(&graph.edges_file, "subject\tpredicate\tobject\n").unwrap();
        match validate(&graph) {
            Err(IngestError::Validation { ingest, infractions }) => {
                assert_eq!(ingest, "broken");
                assert_eq!(infractions.len(), 1);
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
    }
}
