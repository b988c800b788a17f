use itertools::Itertools;
use lazy_static::lazy_static;
use log::debug;
use serde_json::Value;
use std::collections::HashMap;

use crate::curie;
use crate::error::RowTransformError;
use crate::model::{category, predicate, Association, Entity};
use crate::row::Row;
use crate::transform::{Filter, Transform, TransformContext, Verdict};

pub const GENE_MAP: &str = "alliance-gene";
pub const INFORES_ALLIANCE: &str = "infores:alliancegenome";

lazy_static! {
    /// Gene id prefix -> the model organism database that curated the annotation.
    static ref PROVIDERS: HashMap<&'static str, &'static str> = HashMap::from([
        ("MGI", "infores:mgi"),
        ("RGD", "infores:rgd"),
        ("HGNC", "infores:rgd"),
        ("ZFIN", "infores:zfin"),
        ("WB", "infores:wormbase"),
        ("FB", "infores:flybase"),
        ("SGD", "infores:sgd"),
        ("Xenbase", "infores:xenbase"),
    ]);
}

const PROVIDER_SOURCES: &[&str] = &["infores:mgi", "infores:rgd", "infores:zfin", "infores:wormbase", "infores:flybase", "infores:sgd", "infores:xenbase"];

const FILTERS: &[Filter] = &[Filter { name: "known_gene", check: known_gene }, Filter { name: "single_phenotype_term", check: single_phenotype_term }];

fn known_gene(row: &Row, ctx: &TransformContext) -> Result<Verdict, RowTransformError> {
    let genes = ctx.map(GENE_MAP)?;
    match row.non_empty("objectId") {
        Some(id) if genes.contains_key(id) => Ok(Verdict::Keep),
        Some(id) => Ok(Verdict::Skip(format!("{} is not a gene", id))),
        None => Ok(Verdict::Skip("no objectId".into())),
    }
}

fn single_phenotype_term(row: &Row, _ctx: &TransformContext) -> Result<Verdict, RowTransformError> {
    let count = row.get_array("phenotypeTermIdentifiers").map(Vec::len).unwrap_or(0);
    match count {
        1 => Ok(Verdict::Keep),
        n => {
            debug!("Phenotype ingest record has {} phenotype terms: {}", n, row);
            Ok(Verdict::Skip(format!("{} phenotype terms", n)))
        }
    }
}

fn condition_qualifiers(row: &Row) -> Vec<String> {
    row.get_array("conditionRelations")
        .map(|relations| {
            relations
                .iter()
                .filter_map(|relation| relation.get("conditions").and_then(Value::as_array))
                .flatten()
                .filter_map(|condition| condition.get("conditionClassId").and_then(Value::as_str))
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect_vec()
        })
        .unwrap_or_default()
}

pub struct GeneToPhenotype;

impl Transform for GeneToPhenotype {
    fn source(&self) -> &'static str {
        "alliance"
    }

    fn name(&self) -> &'static str {
        "gene_to_phenotype"
    }

    fn knowledge_sources(&self) -> &'static [&'static str] {
        PROVIDER_SOURCES
    }

    fn filters(&self) -> &'static [Filter] {
        FILTERS
    }

    fn transform(&self, row: &Row, ctx: &TransformContext) -> Result<Vec<Entity>, RowTransformError> {
        let gene_id = row.require_str("objectId")?;
        let provider = curie::prefix_of(gene_id)
            .and_then(|prefix| PROVIDERS.get(prefix))
            .ok_or_else(|| RowTransformError::UnexpectedValue { field: "objectId".into(), value: gene_id.to_string() })?;

        let term_id = row
            .pointer("/phenotypeTermIdentifiers/0/termId")
            .and_then(Value::as_str)
            .ok_or_else(|| RowTransformError::MissingField("phenotypeTermIdentifiers.termId".into()))?;
        let phenotype_id = curie::rewrite_prefix(term_id, "WB:WBPhenotype:", "WBPhenotype:");

        let publications = row.pointer("/evidence/publicationId").and_then(Value::as_str).map(|p| vec![p.to_string()]).unwrap_or_default();

        let association = Association::new(ctx.next_id(), category::GENE_TO_PHENOTYPIC_FEATURE, gene_id.to_string(), predicate::HAS_PHENOTYPE, phenotype_id, provider)
            .with_aggregator(INFORES_ALLIANCE)
            .with_publications(publications)
            .with_qualifiers(condition_qualifiers(row));

        Ok(vec![association.into()])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lookup::{LookupMap, MapCache};
    use crate::transform::test::{associations, run_row};
    use crate::INFORES_MONARCH;
    use serde_json::json;

    fn maps() -> MapCache {
        MapCache::from([(GENE_MAP.to_string(), LookupMap::from_keys(["MGI:12345", "WB:WBGene00000001"]))])
    }

    fn row(value: Value) -> Row {
        Row::from_value(value).unwrap()
    }

    #[test]
    fn single_term_row_yields_one_association() {
        let entities = run_row(
            &GeneToPhenotype,
            &row(json!({"objectId": "MGI:12345", "phenotypeTermIdentifiers": [{"termId": "WB:WBPhenotype:0000123"}], "evidence": {"publicationId": "PMID:1"}})),
            &maps(),
        );
        assert_eq!(entities.len(), 1);
        let association = associations(&entities)[0];
        assert_eq!(association.subject, "MGI:12345");
        assert_eq!(association.object, "WBPhenotype:0000123");
        assert_eq!(association.predicate, "biolink:has_phenotype");
        assert_eq!(association.publications, Some(vec!["PMID:1".to_string()]));
        assert_eq!(association.primary_knowledge_source, "infores:mgi");
        assert!(association.aggregator_knowledge_source.contains(&INFORES_MONARCH.to_string()));
        assert!(association.aggregator_knowledge_source.contains(&INFORES_ALLIANCE.to_string()));
        assert_eq!(association.qualifiers, None);
    }

    #[test]
    fn multiple_phenotype_terms_are_filtered() {
        let entities = run_row(
            &GeneToPhenotype,
            &row(json!({"objectId": "MGI:12345", "phenotypeTermIdentifiers": [{"termId": "MP:1"}, {"termId": "MP:2"}], "evidence": {"publicationId": "PMID:1"}})),
            &maps(),
        );
        assert!(entities.is_empty());
    }

    #[test]
    fn genes_outside_the_gene_map_are_filtered() {
        let entities = run_row(
            &GeneToPhenotype,
            &row(json!({"objectId": "MGI:99999", "phenotypeTermIdentifiers": [{"termId": "MP:1"}], "evidence": {"publicationId": "PMID:1"}})),
            &maps(),
        );
        assert!(entities.is_empty());
    }

    #[test]
    fn condition_terms_become_qualifiers() {
        let entities = run_row(
            &GeneToPhenotype,
            &row(json!({
                "objectId": "WB:WBGene00000001",
                "phenotypeTermIdentifiers": [{"termId": "WB:WBPhenotype:0000001"}],
                "evidence": {"publicationId": "PMID:2"},
                "conditionRelations": [{"conditions": [{"conditionClassId": "ZECO:0000111"}, {"conditionClassId": null}]}, {"conditions": [{"conditionClassId": "ZECO:0000222"}]}]
            })),
            &maps(),
        );
        let association = associations(&entities)[0];
        assert_eq!(association.primary_knowledge_source, "infores:wormbase");
        assert_eq!(association.qualifiers, Some(vec!["ZECO:0000111".to_string(), "ZECO:0000222".to_string()]));
    }
}
