use log::{debug, info};
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path;

use crate::error::{IngestError, Result};
use crate::row::{delimiter_byte, open_reader};

fn default_delimiter() -> char {
    '\t'
}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct MapSpec {
    pub name: String,
    pub file: path::PathBuf,
    pub key: String,
    #[serde(default)]
    pub values: Option<Vec<String>>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

/// Key column value -> retained attributes. Immutable once built.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct LookupMap {
    records: HashMap<String, HashMap<String, String>>,
}

impl LookupMap {
    pub fn from_keys<I: IntoIterator<Item = S>, S: Into<String>>(keys: I) -> Self {
        let mut map = LookupMap::default();
        keys.into_iter().for_each(|k| map.insert(k.into(), HashMap::new()));
        map
    }

    pub fn get(&self, key: &str) -> Option<&HashMap<String, String>> {
        self.records.get(key)
    }

    pub fn value(&self, key: &str, attribute: &str) -> Option<&str> {
        self.get(key).and_then(|r| r.get(attribute)).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record for a key wins.
    pub fn insert(&mut self, key: String, record: HashMap<String, String>) {
        self.records.entry(key).or_insert(record);
    }
}

impl<K: Into<String>, A: Into<String>, V: Into<String>> FromIterator<(K, Vec<(A, V)>)> for LookupMap {
    fn from_iter<T: IntoIterator<Item = (K, Vec<(A, V)>)>>(iter: T) -> Self {
        let mut map = LookupMap::default();
        for (key, attributes) in iter {
            map.insert(key.into(), attributes.into_iter().map(|(a, v)| (a.into(), v.into())).collect());
        }
        map
    }
}

pub type MapCache = HashMap<String, LookupMap>;

pub fn build(specs: &[MapSpec], data_dir: &path::Path) -> Result<MapCache> {
    let mut cache = MapCache::new();
    for spec in specs.iter() {
        let map = build_map(spec, data_dir)?;
        info!("built map '{}' with {} entries", spec.name, map.len());
        cache.insert(spec.name.clone(), map);
    }
    Ok(cache)
}

pub fn build_map(spec: &MapSpec, data_dir: &path::Path) -> Result<LookupMap> {
    let file = if spec.file.is_absolute() { spec.file.clone() } else { data_dir.join(&spec.file) };
    if !file.exists() {
        return Err(IngestError::map_build(&spec.name, format!("{} does not exist", file.display())));
    }
    debug!("building map '{}' from {:?}", spec.name, file);

    let reader = open_reader(&file).map_err(|e| IngestError::map_build(&spec.name, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte(spec.delimiter)?)
        .has_headers(spec.columns.is_none())
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let header: Vec<String> = match &spec.columns {
        Some(columns) => columns.clone(),
        None => rdr.headers().map_err(|e| IngestError::map_build(&spec.name, e))?.iter().map(|h| h.trim().to_string()).collect(),
    };

    let key_idx = header
        .iter()
        .position(|h| h == &spec.key)
        .ok_or_else(|| IngestError::map_build(&spec.name, format!("key column '{}' is absent from {}", spec.key, file.display())))?;

    let value_indices: Vec<(usize, String)> = match &spec.values {
        Some(values) => values
            .iter()
            .map(|v| header.iter().position(|h| h == v).map(|idx| (idx, v.clone())).ok_or_else(|| IngestError::map_build(&spec.name, format!("value column '{}' is absent", v))))
            .collect::<Result<Vec<_>>>()?,
        None => header.iter().enumerate().filter(|(idx, _)| *idx != key_idx).map(|(idx, h)| (idx, h.clone())).collect(),
    };

    let mut map = LookupMap::default();
    for result in rdr.records() {
        let record = result.map_err(|e| IngestError::map_build(&spec.name, e))?;
        let Some(key) = record.get(key_idx).map(str::trim).filter(|k| !k.is_empty()) else {
            continue;
        };
        let attributes = value_indices.iter().filter_map(|(idx, name)| record.get(*idx).map(|v| (name.clone(), v.to_string()))).collect();
        map.insert(key.to_string(), attributes);
    }
    Ok(map)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn builds_map_keyed_by_designated_column() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("so.tsv"), "hgnc_id\tso_term_id\textra\nHGNC:1\tSO:0001217\tx\nHGNC:1\tSO:9999999\ty\n\tSO:1\tz\n").unwrap();
        let spec = MapSpec { name: "hgnc-so-terms".into(), file: "so.tsv".into(), key: "hgnc_id".into(), values: Some(vec!["so_term_id".into()]), delimiter: '\t', columns: None };
        let cache = build(&[spec], dir.path()).unwrap();
        let map = cache.get("hgnc-so-terms").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.value("HGNC:1", "so_term_id"), Some("SO:0001217"));
        assert_eq!(map.value("HGNC:1", "extra"), None);
    }

    #[test]
    fn absent_key_column_is_a_map_build_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("so.tsv"), "id\tso_term_id\nHGNC:1\tSO:1\n").unwrap();
        let spec = MapSpec { name: "hgnc-so-terms".into(), file: "so.tsv".into(), key: "hgnc_id".into(), delimiter: '\t', ..Default::default() };
        assert!(matches!(build(&[spec], dir.path()), Err(IngestError::MapBuild { .. })));
    }

    #[test]
    fn missing_file_is_a_map_build_error() {
        let dir = tempfile::tempdir().unwrap();
        let spec = MapSpec { name: "alliance-gene".into(), file: "nope.tsv".into(), key: "id".into(), delimiter: '\t', ..Default::default() };
        assert!(matches!(build_map(&spec, dir.path()), Err(IngestError::MapBuild { .. })));
    }

    #[test]
    fn single_column_files_work_as_key_sets() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ids.txt"), "MGI:1\nMGI:2\n").unwrap();
        let spec = MapSpec { name: "alliance-gene".into(), file: "ids.txt".into(), key: "id".into(), delimiter: '\t', columns: Some(vec!["id".into()]), values: None };
        let map = build_map(&spec, dir.path()).unwrap();
        assert!(map.contains_key("MGI:2"));
        assert!(map.get("MGI:1").unwrap().is_empty());
    }
}
