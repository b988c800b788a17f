use itertools::Itertools;
use std::sync::Arc;

use crate::transform::Transform;

pub mod alliance;
pub mod bgee;
pub mod dictybase;
pub mod hgnc;
pub mod panther;
pub mod pombase;
pub mod zfin;

/// Every transform this crate knows how to run, in merge order.
pub fn registry() -> Vec<Arc<dyn Transform>> {
    vec![
        Arc::new(hgnc::Gene),
        Arc::new(pombase::Gene),
        Arc::new(alliance::GeneToPhenotype),
        Arc::new(pombase::GeneToPhenotype),
        Arc::new(dictybase::GeneToPhenotype),
        Arc::new(zfin::PublicationToGene),
        Arc::new(panther::RefGenomeOrthologs),
        Arc::new(bgee::GeneToExpression),
    ]
}

pub fn find(source: &str, transform: &str) -> Option<Arc<dyn Transform>> {
    registry().into_iter().find(|t| t.source() == source && t.name() == transform)
}

pub fn names() -> Vec<String> {
    registry().iter().map(|t| t.ingest_name()).collect_vec()
}
