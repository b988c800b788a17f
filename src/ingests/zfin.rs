use crate::curie;
use crate::error::RowTransformError;
use crate::model::{category, predicate, Association, Entity};
use crate::row::Row;
use crate::transform::{Transform, TransformContext};

pub const INFORES_ZFIN: &str = "infores:zfin";

pub struct PublicationToGene;

impl Transform for PublicationToGene {
    fn source(&self) -> &'static str {
        "zfin"
    }

    fn name(&self) -> &'static str {
        "publication_to_gene"
    }

    fn knowledge_sources(&self) -> &'static [&'static str] {
        &[INFORES_ZFIN]
    }

    fn transform(&self, row: &Row, ctx: &TransformContext) -> Result<Vec<Entity>, RowTransformError> {
        let (Some(publication_id), Some(gene_id)) = (row.non_empty("Publication ID"), row.non_empty("Gene ID")) else {
            return Ok(vec![]);
        };

        let association = Association::new(
            ctx.next_id(),
            category::PUBLICATION_TO_NAMED_THING,
            curie::prefixed("ZFIN", publication_id),
            predicate::MENTIONS,
            curie::prefixed("ZFIN", gene_id),
            INFORES_ZFIN,
        );
        Ok(vec![association.into()])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lookup::MapCache;
    use crate::transform::test::{associations, run_row};
    use crate::INFORES_MONARCH;

    fn basic_row() -> Row {
        Row::from_pairs(&[
            ("Gene Symbol", "si:dkey-84j12.1"),
            ("Gene ID", "ZDB-GENE-060526-342"),
            ("Publication ID", "ZDB-PUB-140801-12"),
            ("Publication Type", "Journal"),
            ("PubMed ID", "25078621"),
        ])
    }

    #[test]
    fn association() {
        let entities = run_row(&PublicationToGene, &basic_row(), &MapCache::new());
        let association = associations(&entities)[0];
        assert_eq!(association.subject, "ZFIN:ZDB-PUB-140801-12");
        assert_eq!(association.object, "ZFIN:ZDB-GENE-060526-342");
        assert_eq!(association.primary_knowledge_source, INFORES_ZFIN);
        assert!(association.aggregator_knowledge_source.contains(&INFORES_MONARCH.to_string()));
    }

    #[test]
    fn missing_publication_emits_nothing() {
        let row = Row::from_pairs(&[("Gene ID", "ZDB-GENE-060526-342"), ("Publication ID", "")]);
        assert!(run_row(&PublicationToGene, &row, &MapCache::new()).is_empty());
    }
}
