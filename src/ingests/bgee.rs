use crate::curie;
use crate::error::RowTransformError;
use crate::model::{category, predicate, AgentType, Association, Entity, KnowledgeLevel};
use crate::row::Row;
use crate::transform::{Filter, Transform, TransformContext, Verdict};

pub const INFORES_BGEE: &str = "infores:bgee";

const FILTERS: &[Filter] = &[Filter { name: "expression_present", check: expression_present }];

fn expression_present(row: &Row, _ctx: &TransformContext) -> Result<Verdict, RowTransformError> {
    match row.get_str("Expression").map(str::trim) {
        Some("present") => Ok(Verdict::Keep),
        other => Ok(Verdict::Skip(format!("expression call {:?}", other.unwrap_or_default()))),
    }
}

/// Bgee writes post-composed terms as `CL:x ∩ UBERON:y`; the anatomy half is kept.
pub fn anatomical_entity(id: &str) -> Option<String> {
    let parts: Vec<&str> = id.split('∩').map(str::trim).filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [] => None,
        [single] => Some(single.to_string()),
        many => Some(many.iter().find(|p| p.starts_with("UBERON:")).unwrap_or(&many[0]).to_string()),
    }
}

pub struct GeneToExpression;

impl Transform for GeneToExpression {
    fn source(&self) -> &'static str {
        "bgee"
    }

    fn name(&self) -> &'static str {
        "gene_to_expression"
    }

    fn knowledge_sources(&self) -> &'static [&'static str] {
        &[INFORES_BGEE]
    }

    fn filters(&self) -> &'static [Filter] {
        FILTERS
    }

    fn transform(&self, row: &Row, ctx: &TransformContext) -> Result<Vec<Entity>, RowTransformError> {
        let Some(gene_id) = row.non_empty("Gene ID") else {
            return Ok(vec![]);
        };
        let Some(anatomy) = anatomical_entity(row.require_str("Anatomical entity ID")?) else {
            return Ok(vec![]);
        };

        let association = Association::new(ctx.next_id(), category::GENE_TO_EXPRESSION_SITE, curie::prefixed("ENSEMBL", gene_id), predicate::EXPRESSED_IN, anatomy, INFORES_BGEE)
            .with_levels(KnowledgeLevel::Observation, AgentType::AutomatedAgent);
        Ok(vec![association.into()])
    }
}
