use itertools::Itertools;

pub fn prefixed(prefix: &str, local_id: &str) -> String {
    format!("{}:{}", prefix, local_id.trim())
}

/// Literal substring replacement of an embedded prefix, e.g. `WB:WBPhenotype:` -> `WBPhenotype:`.
pub fn rewrite_prefix(id: &str, from: &str, to: &str) -> String {
    id.replace(from, to)
}

pub fn prefix_of(id: &str) -> Option<&str> {
    id.split_once(':').map(|(prefix, _)| prefix)
}

pub fn local_id(id: &str) -> &str {
    id.split_once(':').map(|(_, local)| local).unwrap_or(id)
}

/// Positional split; empty sub-fields survive so synonym-like columns keep their shape.
pub fn split_values(value: &str, delimiter: char) -> Vec<String> {
    value.split(delimiter).map(|v| v.to_string()).collect_vec()
}

/// Splits every element again, which is a no-op for sequences that were already split.
pub fn split_all(values: &[String], delimiter: char) -> Vec<String> {
    values.iter().flat_map(|v| split_values(v, delimiter)).collect_vec()
}

/// Identifier split: trims and drops empty sub-fields.
pub fn split_identifiers(value: &str, delimiter: char) -> Vec<String> {
    value.split(delimiter).map(|v| v.trim()).filter(|v| !v.is_empty()).map(|v| v.to_string()).collect_vec()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn split_values_keeps_empty_positions() {
        assert_eq!(split_values("ACF||ASP|", '|'), vec!["ACF", "", "ASP", ""]);
        assert_eq!(split_values("", '|'), vec![""]);
    }

    #[test]
    fn split_all_is_idempotent() {
        let once = split_all(&["ACF|ASP".to_string(), "".to_string(), "|X".to_string()], '|');
        assert_eq!(once, vec!["ACF", "ASP", "", "", "X"]);
        let twice = split_all(&once, '|');
        assert_eq!(once, twice);
    }

    #[test]
    fn split_identifiers_drops_empties() {
        assert_eq!(split_identifiers(" DDB_G1 || DDB_G2|", '|'), vec!["DDB_G1", "DDB_G2"]);
    }

    #[test]
    fn prefix_helpers() {
        assert_eq!(rewrite_prefix("WB:WBPhenotype:0000123", "WB:WBPhenotype:", "WBPhenotype:"), "WBPhenotype:0000123");
        assert_eq!(prefixed("ZFIN", "ZDB-GENE-1"), "ZFIN:ZDB-GENE-1");
        assert_eq!(prefix_of("MGI:12345"), Some("MGI"));
        assert_eq!(prefix_of("12345"), None);
        assert_eq!(local_id("infores:pombase"), "pombase");
    }
}
