use itertools::Itertools;
use log::debug;

use crate::curie;
use crate::error::RowTransformError;
use crate::lookup::LookupMap;
use crate::model::{category, predicate, Association, Entity};
use crate::row::Row;
use crate::transform::{Filter, Transform, TransformContext, Verdict};

pub const PHENOTYPE_MAP: &str = "dictybase_phenotype_names_to_ids";
pub const INFORES_DICTYBASE: &str = "infores:dictybase";

const FILTERS: &[Filter] = &[Filter { name: "single_gene", check: single_gene }];

fn single_gene(row: &Row, _ctx: &TransformContext) -> Result<Verdict, RowTransformError> {
    let genes = curie::split_identifiers(row.get_str("DDB_G_ID").unwrap_or_default(), '|');
    match genes.len() {
        1 => Ok(Verdict::Keep),
        n => Ok(Verdict::Skip(format!("{} genes in DDB_G_ID", n))),
    }
}

/// Resolves `|`-separated phenotype names to ontology ids, dropping names the map does not know.
pub fn parse_phenotypes(row: &Row, phenotype_names_to_ids: &LookupMap) -> Vec<String> {
    curie::split_identifiers(row.get_str("Phenotypes").unwrap_or_default(), '|')
        .into_iter()
        .filter_map(|name| match phenotype_names_to_ids.value(&name, "id") {
            Some(id) => Some(id.to_string()),
            None => {
                debug!("unknown dictyBase phenotype name: {}", name);
                None
            }
        })
        .unique()
        .collect_vec()
}

pub struct GeneToPhenotype;

impl Transform for GeneToPhenotype {
    fn source(&self) -> &'static str {
        "dictybase"
    }

    fn name(&self) -> &'static str {
        "gene_to_phenotype"
    }

    fn knowledge_sources(&self) -> &'static [&'static str] {
        &[INFORES_DICTYBASE]
    }

    fn filters(&self) -> &'static [Filter] {
        FILTERS
    }

    fn transform(&self, row: &Row, ctx: &TransformContext) -> Result<Vec<Entity>, RowTransformError> {
        let phenotype_names_to_ids = ctx.map(PHENOTYPE_MAP)?;
        let gene_ids = curie::split_identifiers(row.require_str("DDB_G_ID")?, '|');
        let Some(gene_id) = gene_ids.first() else {
            return Ok(vec![]);
        };
        let gene_id = curie::prefixed("dictyBase", gene_id);

        // TODO: carry the strain descriptor once the edge schema has a genotype context slot
        let entities = parse_phenotypes(row, phenotype_names_to_ids)
            .into_iter()
            .map(|phenotype_id| Association::new(ctx.next_id(), category::GENE_TO_PHENOTYPIC_FEATURE, gene_id.clone(), predicate::HAS_PHENOTYPE, phenotype_id, INFORES_DICTYBASE).into())
            .collect_vec();
        Ok(entities)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lookup::MapCache;
    use crate::transform::test::{associations, run_row};

    fn maps() -> MapCache {
        let phenotypes: LookupMap = vec![("aberrant spore morphology", vec![("id", "DDPHENO:0000163")]), ("decreased cell motility", vec![("id", "DDPHENO:0000226")])].into_iter().collect();
        MapCache::from([(PHENOTYPE_MAP.to_string(), phenotypes)])
    }

    #[test]
    fn one_association_per_resolved_phenotype() {
        let row = Row::from_pairs(&[
            ("Systematic Name", "DBS0235594"),
            ("Strain Descriptor", "CHE10"),
            ("Associated gene(s)", "cheA"),
            ("DDB_G_ID", "DDB_G0279417"),
            ("Phenotypes", "aberrant spore morphology | decreased cell motility | unknown thing"),
        ]);
        let entities = run_row(&GeneToPhenotype, &row, &maps());
        let associations = associations(&entities);
        assert_eq!(associations.len(), 2);
        assert!(associations.iter().all(|a| a.subject == "dictyBase:DDB_G0279417"));
        assert_eq!(associations.iter().map(|a| a.object.as_str()).collect_vec(), vec!["DDPHENO:0000163", "DDPHENO:0000226"]);
        assert!(associations.iter().all(|a| a.primary_knowledge_source == INFORES_DICTYBASE));
    }

    #[test]
    fn rows_with_several_genes_are_filtered() {
        let row = Row::from_pairs(&[("DDB_G_ID", "DDB_G0279417|DDB_G0279418"), ("Phenotypes", "decreased cell motility")]);
        assert!(run_row(&GeneToPhenotype, &row, &maps()).is_empty());
    }
}
