use lazy_static::lazy_static;
use log::warn;
use std::collections::HashMap;

use crate::curie;
use crate::error::RowTransformError;
use crate::lookup::LookupMap;
use crate::model::{category, predicate, AgentType, Association, Entity, KnowledgeLevel, Node};
use crate::row::Row;
use crate::transform::{Transform, TransformContext};

pub const UNIPROT_MAP: &str = "uniprot_2_gene";
pub const INFORES_PANTHER: &str = "infores:panther";
/// Gene nodes are attributed to the gene registry rather than to PANTHER.
pub const INFORES_ENTREZ: &str = "infores:entrez";

lazy_static! {
    static ref SPECIES_TAXA: HashMap<&'static str, &'static str> = HashMap::from([
        ("HUMAN", "NCBITaxon:9606"),
        ("MOUSE", "NCBITaxon:10090"),
        ("RAT", "NCBITaxon:10116"),
        ("DANRE", "NCBITaxon:7955"),
        ("DROME", "NCBITaxon:7227"),
        ("CAEEL", "NCBITaxon:6239"),
        ("YEAST", "NCBITaxon:559292"),
        ("SCHPO", "NCBITaxon:284812"),
        ("DICDI", "NCBITaxon:44689"),
        ("CHICK", "NCBITaxon:9031"),
        ("CANLF", "NCBITaxon:9615"),
        ("PIG", "NCBITaxon:9823"),
        ("BOVIN", "NCBITaxon:9913"),
        ("XENTR", "NCBITaxon:8364"),
    ]);
}

/// Database tags as Panther writes them, longest first so `MGI=MGI=` wins over any shorter match.
const GENE_DATABASES: &[(&str, &str)] = &[
    ("MGI=MGI=", "MGI:"),
    ("EnsemblGenome=", "ENSEMBL:"),
    ("Ensembl=", "ENSEMBL:"),
    ("dictyBase=", "dictyBase:"),
    ("WormBase=", "WB:"),
    ("FlyBase=", "FB:"),
    ("PomBase=", "PomBase:"),
    ("Xenbase=", "Xenbase:"),
    ("GeneID=", "NCBIGene:"),
    ("HGNC=", "HGNC:"),
    ("ZFIN=", "ZFIN:"),
    ("RGD=", "RGD:"),
    ("SGD=", "SGD:"),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedGene {
    pub id: String,
    pub taxon: String,
}

/// Parses a `SPECIES|DB=id|UniProtKB=acc` entry. Unsupported databases fall back to the UniProt map.
pub fn parse_gene(entry: &str, uniprot_2_gene: &LookupMap) -> Option<ParsedGene> {
    let mut parts = entry.split('|');
    let species = parts.next()?;
    let gene_part = parts.next()?;
    let uniprot_part = parts.next();

    let taxon = SPECIES_TAXA.get(species)?.to_string();

    let id = match GENE_DATABASES.iter().find(|(tag, _)| gene_part.starts_with(tag)) {
        Some((tag, prefix)) => gene_part.replacen(tag, prefix, 1),
        None => {
            let accession = uniprot_part?.strip_prefix("UniProtKB=")?;
            let entrez = uniprot_2_gene.value(accession, "NCBIGene").filter(|g| !g.is_empty())?;
            curie::prefixed("NCBIGene", entrez)
        }
    };
    Some(ParsedGene { id, taxon })
}

pub struct RefGenomeOrthologs;

impl Transform for RefGenomeOrthologs {
    fn source(&self) -> &'static str {
        "panther"
    }

    fn name(&self) -> &'static str {
        "ref_genome_orthologs"
    }

    fn knowledge_sources(&self) -> &'static [&'static str] {
        &[INFORES_PANTHER]
    }

    fn transform(&self, row: &Row, ctx: &TransformContext) -> Result<Vec<Entity>, RowTransformError> {
        let uniprot_2_gene = ctx.map(UNIPROT_MAP)?;

        let Some(gene) = parse_gene(row.require_str("Gene")?, uniprot_2_gene) else {
            warn!("Gene lacking a resolvable gene id, skipping: {}", row);
            return Ok(vec![]);
        };
        let Some(ortholog) = parse_gene(row.require_str("Ortholog")?, uniprot_2_gene) else {
            warn!("Ortholog lacking a resolvable gene id, skipping: {}", row);
            return Ok(vec![]);
        };

        let association = Association::new(ctx.next_id(), category::GENE_TO_GENE_HOMOLOGY, gene.id.clone(), predicate::ORTHOLOGOUS_TO, ortholog.id.clone(), INFORES_PANTHER)
            .with_levels(KnowledgeLevel::KnowledgeAssertion, AgentType::AutomatedAgent);

        Ok(vec![
            Node::gene(gene.id).with_taxon(gene.taxon).with_provided_by(INFORES_ENTREZ).into(),
            Node::gene(ortholog.id).with_taxon(ortholog.taxon).with_provided_by(INFORES_ENTREZ).into(),
            association.into(),
        ])
    }
}
