use crate::curie;
use crate::error::RowTransformError;
use crate::model::{category, predicate, Association, Entity, Node};
use crate::row::Row;
use crate::transform::{Filter, Transform, TransformContext, Verdict};

pub const INFORES_POMBASE: &str = "infores:pombase";
pub const FISSION_YEAST_TAXON: &str = "NCBITaxon:4896";

pub struct Gene;

impl Transform for Gene {
    fn source(&self) -> &'static str {
        "pombase"
    }

    fn name(&self) -> &'static str {
        "gene"
    }

    fn knowledge_sources(&self) -> &'static [&'static str] {
        &[INFORES_POMBASE]
    }

    fn transform(&self, row: &Row, _ctx: &TransformContext) -> Result<Vec<Entity>, RowTransformError> {
        let Some(id) = row.non_empty("curie") else {
            return Ok(vec![]);
        };
        let systematic_id = row.require_str("gene_systematic_id")?;

        // full name and product type have no slot in the node schema
        let mut gene = Node::gene(id).with_taxon(FISSION_YEAST_TAXON).with_provided_by(INFORES_POMBASE);
        gene.symbol = Some(systematic_id.to_string());
        gene.name = Some(systematic_id.to_string());

        if let Some(synonyms) = row.non_empty("synonyms") {
            gene.synonym = Some(curie::split_values(synonyms, ','));
        }
        if let Some(accession) = row.non_empty("UniProtKB accession") {
            gene.xref = Some(vec![curie::prefixed("UniProtKB", accession)]);
        }

        Ok(vec![gene.into()])
    }
}

const PHENOTYPE_FILTERS: &[Filter] = &[Filter { name: "has_fypo_term", check: has_fypo_term }];

fn has_fypo_term(row: &Row, _ctx: &TransformContext) -> Result<Verdict, RowTransformError> {
    match row.non_empty("FYPO ID") {
        Some(_) => Ok(Verdict::Keep),
        None => Ok(Verdict::Skip("no FYPO term".into())),
    }
}

pub struct GeneToPhenotype;

impl Transform for GeneToPhenotype {
    fn source(&self) -> &'static str {
        "pombase"
    }

    fn name(&self) -> &'static str {
        "gene_to_phenotype"
    }

    fn knowledge_sources(&self) -> &'static [&'static str] {
        &[INFORES_POMBASE]
    }

    fn filters(&self) -> &'static [Filter] {
        PHENOTYPE_FILTERS
    }

    fn transform(&self, row: &Row, ctx: &TransformContext) -> Result<Vec<Entity>, RowTransformError> {
        let Some(systematic_id) = row.non_empty("Gene systematic ID") else {
            return Ok(vec![]);
        };
        let phenotype_id = row.require_str("FYPO ID")?.trim();

        let publications = row.non_empty("Reference").map(|r| curie::split_identifiers(r, '|')).unwrap_or_default();
        let conditions = row.non_empty("Condition").map(|c| curie::split_identifiers(c, ',')).unwrap_or_default();

        let association = Association::new(
            ctx.next_id(),
            category::GENE_TO_PHENOTYPIC_FEATURE,
            curie::prefixed("PomBase", systematic_id),
            predicate::HAS_PHENOTYPE,
            phenotype_id.to_string(),
            INFORES_POMBASE,
        )
        .with_publications(publications)
        .with_qualifiers(conditions);

        Ok(vec![association.into()])
    }
}
