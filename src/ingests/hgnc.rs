use crate::curie;
use crate::error::RowTransformError;
use crate::model::{Entity, Node};
use crate::row::Row;
use crate::transform::{Transform, TransformContext};

pub const SO_TERM_MAP: &str = "hgnc-so-terms";
pub const INFORES_HGNC: &str = "infores:hgnc";
pub const HUMAN_TAXON: &str = "NCBITaxon:9606";

const SYNONYM_COLUMNS: [&str; 4] = ["alias_symbol", "alias_name", "prev_symbol", "prev_name"];

pub struct Gene;

impl Transform for Gene {
    fn source(&self) -> &'static str {
        "hgnc"
    }

    fn name(&self) -> &'static str {
        "gene"
    }

    fn knowledge_sources(&self) -> &'static [&'static str] {
        &[INFORES_HGNC]
    }

    fn transform(&self, row: &Row, ctx: &TransformContext) -> Result<Vec<Entity>, RowTransformError> {
        let Some(hgnc_id) = row.non_empty("hgnc_id") else {
            return Ok(vec![]);
        };

        let mut gene = Node::gene(hgnc_id).with_taxon(HUMAN_TAXON).with_provided_by(INFORES_HGNC);
        gene.symbol = Some(row.require_str("symbol")?.to_string());
        gene.name = Some(row.require_str("name")?.to_string());

        let mut synonyms = vec![];
        for column in SYNONYM_COLUMNS {
            synonyms.extend(curie::split_values(row.get_str(column).unwrap_or_default(), '|'));
        }
        gene.synonym = Some(synonyms);

        let mut xrefs = vec![];
        if let Some(ensembl) = row.non_empty("ensembl_gene_id") {
            xrefs.push(curie::prefixed("ENSEMBL", ensembl));
        }
        if let Some(omim) = row.non_empty("omim_id") {
            xrefs.extend(curie::split_identifiers(omim, '|').iter().map(|o| curie::prefixed("OMIM", o)));
        }
        if !xrefs.is_empty() {
            gene.xref = Some(xrefs);
        }

        if let Some(so_term) = ctx.map(SO_TERM_MAP)?.value(hgnc_id, "so_term_id").filter(|t| !t.is_empty()) {
            gene.type_ = Some(vec![so_term.to_string()]);
        }

        Ok(vec![gene.into()])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lookup::{LookupMap, MapCache};
    use crate::transform::test::run_row;

    fn a1cf() -> Row {
        Row::from_pairs(&[
            ("hgnc_id", "HGNC:24086"),
            ("pubmed_id", "11072063"),
            ("symbol", "A1CF"),
            ("name", "APOBEC1 complementation factor"),
            ("ensembl_gene_id", "ENSG00000148584"),
            ("omim_id", "618199"),
            ("alias_symbol", "ACF|ASP|ACF64|ACF65|APOBEC1CF"),
            ("alias_name", ""),
            ("prev_symbol", ""),
            ("prev_name", ""),
        ])
    }

    fn maps() -> MapCache {
        let so_terms: LookupMap = vec![("HGNC:24086", vec![("so_term_id", "SO:0001217")])].into_iter().collect();
        MapCache::from([(SO_TERM_MAP.to_string(), so_terms)])
    }

    fn gene() -> Node {
        let entities = run_row(&Gene, &a1cf(), &maps());
        assert_eq!(entities.len(), 1);
        entities[0].as_node().unwrap().clone()
    }

    #[test]
    fn gene_identity() {
        let gene = gene();
        assert_eq!(gene.id, "HGNC:24086");
        assert_eq!(gene.symbol.as_deref(), Some("A1CF"));
        assert_eq!(gene.in_taxon, Some(vec![HUMAN_TAXON.to_string()]));
        assert_eq!(gene.provided_by, vec![INFORES_HGNC.to_string()]);
    }

    #[test]
    fn gene_synonyms_keep_empty_positions() {
        assert_eq!(gene().synonym, Some(vec!["ACF", "ASP", "ACF64", "ACF65", "APOBEC1CF", "", "", ""].into_iter().map(String::from).collect()));
    }

    #[test]
    fn gene_xrefs() {
        assert_eq!(gene().xref, Some(vec!["ENSEMBL:ENSG00000148584".to_string(), "OMIM:618199".to_string()]));
    }

    #[test]
    fn gene_so_term() {
        assert_eq!(gene().type_, Some(vec!["SO:0001217".to_string()]));
    }

    #[test]
    fn row_without_hgnc_id_emits_nothing() {
        let entities = run_row(&Gene, &Row::from_pairs(&[("hgnc_id", ""), ("symbol", "X"), ("name", "x")]), &maps());
        assert!(entities.is_empty());
    }
}
