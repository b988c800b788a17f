use flate2::read::MultiGzDecoder;
use itertools::Itertools;
use log::{debug, warn};
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::{fmt, fs, io, path};

use crate::error::{IngestError, Result, RowTransformError};

/// One raw input record. TSV rows only hold strings; JSON rows may nest.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Row {
    value: Value,
}

impl Row {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Row { value: Value::Object(map) }
    }

    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(_) => Some(Row { value }),
            _ => None,
        }
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let map = pairs.iter().map(|(k, v)| (k.to_string(), Value::String(v.to_string()))).collect::<Map<String, Value>>();
        Row::from_map(map)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).map(|v| !v.is_null()).unwrap_or(false)
    }

    /// JSON pointer lookup for nested records, e.g. `/evidence/publicationId`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.value.pointer(pointer)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Present and not blank.
    pub fn non_empty(&self, field: &str) -> Option<&str> {
        self.get_str(field).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn require_str(&self, field: &str) -> std::result::Result<&str, RowTransformError> {
        self.get_str(field).ok_or_else(|| RowTransformError::MissingField(field.to_string()))
    }

    pub fn get_array(&self, field: &str) -> Option<&Vec<Value>> {
        self.get(field).and_then(Value::as_array)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Tsv,
    Json,
}

fn default_delimiter() -> char {
    '\t'
}

/// Where and how one ingest reads its rows.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct RowSourceSpec {
    pub files: Vec<path::PathBuf>,
    #[serde(default)]
    pub format: Format,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub json_key: Option<String>,
    #[serde(default)]
    pub comment: Option<char>,
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub required_columns: Vec<String>,
}

pub trait RowSource: Iterator<Item = Result<Row>> + Send {
    /// Rows dropped because they could not be read as records.
    fn malformed(&self) -> usize {
        0
    }
}

impl RowSource for std::vec::IntoIter<Result<Row>> {}

pub fn open(spec: &RowSourceSpec, data_dir: &path::Path) -> Result<Box<dyn RowSource>> {
    let files = spec.files.iter().map(|f| if f.is_absolute() { f.clone() } else { data_dir.join(f) }).collect_vec();
    for file in files.iter() {
        if !file.exists() {
            return Err(IngestError::Io(io::Error::new(io::ErrorKind::NotFound, format!("{} does not exist", file.display()))));
        }
    }
    match spec.format {
        Format::Tsv => Ok(Box::new(TsvRowSource::new(spec.clone(), files))),
        Format::Json => Ok(Box::new(JsonRowSource::new(spec.json_key.clone(), files))),
    }
}

pub(crate) fn open_reader(path: &path::Path) -> Result<Box<dyn io::Read + Send>> {
    let file = fs::File::open(path)?;
    let reader = io::BufReader::with_capacity(2_usize.pow(14), file);
    match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => Ok(Box::new(MultiGzDecoder::new(reader))),
        _ => Ok(Box::new(reader)),
    }
}

pub(crate) fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter).map_err(|_| IngestError::Config(format!("delimiter {:?} is not a single byte", delimiter)))
}

struct OpenTsv {
    path: path::PathBuf,
    reader: csv::Reader<Box<dyn io::Read + Send>>,
    header: Vec<String>,
}

pub struct TsvRowSource {
    spec: RowSourceSpec,
    pending: VecDeque<path::PathBuf>,
    current: Option<OpenTsv>,
    record: csv::StringRecord,
    malformed: usize,
}

impl TsvRowSource {
    pub fn new(spec: RowSourceSpec, files: Vec<path::PathBuf>) -> Self {
        TsvRowSource { spec, pending: files.into(), current: None, record: csv::StringRecord::new(), malformed: 0 }
    }

    fn open_next(&mut self) -> Result<bool> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(false);
        };
        debug!("reading rows from {:?}", path);
        let mut builder = csv::ReaderBuilder::new();
        builder.delimiter(delimiter_byte(self.spec.delimiter)?).has_headers(self.spec.columns.is_none()).flexible(true).quoting(false);
        if let Some(comment) = self.spec.comment {
            builder.comment(Some(delimiter_byte(comment)?));
        }
        let mut reader = builder.from_reader(open_reader(&path)?);

        let header: Vec<String> = match &self.spec.columns {
            Some(columns) => columns.clone(),
            None => reader.headers()?.iter().map(|h| h.trim().to_string()).collect(),
        };
        for required in self.spec.required_columns.iter() {
            if !header.contains(required) {
                return Err(IngestError::MissingColumn { path: path.clone(), column: required.clone() });
            }
        }
        self.current = Some(OpenTsv { path, reader, header });
        Ok(true)
    }
}

impl Iterator for TsvRowSource {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                match self.open_next() {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(e) => return Some(Err(e)),
                }
            }
            let current = self.current.as_mut()?;
            match current.reader.read_record(&mut self.record) {
                Ok(true) => {
                    if self.record.len() != current.header.len() {
                        self.malformed += 1;
                        let line = self.record.position().map(|p| p.line()).unwrap_or_default();
                        warn!("skipping malformed row at {:?}:{} (expected {} columns, found {})", current.path, line, current.header.len(), self.record.len());
                        continue;
                    }
                    let map = current.header.iter().zip(self.record.iter()).map(|(k, v)| (k.clone(), Value::String(v.to_string()))).collect::<Map<String, Value>>();
                    return Some(Ok(Row::from_map(map)));
                }
                Ok(false) => {
                    self.current = None;
                }
                Err(e) if e.is_io_error() => return Some(Err(e.into())),
                Err(e) => {
                    self.malformed += 1;
                    warn!("skipping unreadable row in {:?}: {}", current.path, e);
                }
            }
        }
    }
}

impl RowSource for TsvRowSource {
    fn malformed(&self) -> usize {
        self.malformed
    }
}

pub struct JsonRowSource {
    json_key: Option<String>,
    pending: VecDeque<path::PathBuf>,
    current: std::vec::IntoIter<Value>,
    malformed: usize,
}

impl JsonRowSource {
    pub fn new(json_key: Option<String>, files: Vec<path::PathBuf>) -> Self {
        JsonRowSource { json_key, pending: files.into(), current: Vec::new().into_iter(), malformed: 0 }
    }

    fn open_next(&mut self) -> Result<bool> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(false);
        };
        debug!("reading rows from {:?}", path);
        let document: Value = serde_json::from_reader(open_reader(&path)?)?;
        let rows = match (&self.json_key, document) {
            (Some(key), Value::Object(mut map)) => map.remove(key).unwrap_or(Value::Null),
            (None, document) => document,
            (Some(key), _) => {
                return Err(IngestError::Config(format!("{} is not a JSON object with key '{}'", path.display(), key)));
            }
        };
        match rows {
            Value::Array(values) => {
                self.current = values.into_iter();
                Ok(true)
            }
            _ => Err(IngestError::Config(format!("{} does not contain an array of rows", path.display()))),
        }
    }
}

impl Iterator for JsonRowSource {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.current.next() {
                match Row::from_value(value) {
                    Some(row) => return Some(Ok(row)),
                    None => {
                        self.malformed += 1;
                        warn!("skipping JSON row that is not an object");
                        continue;
                    }
                }
            }
            match self.open_next() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl RowSource for JsonRowSource {
    fn malformed(&self) -> usize {
        self.malformed
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &path::Path, name: &str, contents: &str) -> path::PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn tsv_rows_are_keyed_by_header_and_malformed_rows_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "genes.tsv", "id\tsymbol\nHGNC:1\tA1BG\nHGNC:2\nHGNC:3\tA2M\n");
        let spec = RowSourceSpec { files: vec!["genes.tsv".into()], delimiter: '\t', ..Default::default() };
        let mut source = open(&spec, dir.path()).unwrap();
        let rows: Vec<Row> = source.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get_str("symbol"), Some("A1BG"));
        assert_eq!(rows[1].get_str("id"), Some("HGNC:3"));
        assert_eq!(source.malformed(), 1);
    }

    #[test]
    fn undecodable_rows_are_malformed_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut contents = b"id\tsymbol\nHGNC:1\tA1BG\nHGNC:2\tA".to_vec();
        contents.extend_from_slice(b"\xe9\xff\nHGNC:3\tA2M\n");
        fs::write(dir.path().join("genes.tsv"), contents).unwrap();
        let spec = RowSourceSpec { files: vec!["genes.tsv".into()], delimiter: '\t', ..Default::default() };
        let mut source = open(&spec, dir.path()).unwrap();
        let rows: Vec<Row> = source.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(rows.iter().filter_map(|r| r.get_str("id")).collect_vec(), vec!["HGNC:1", "HGNC:3"]);
        assert_eq!(source.malformed(), 1);
    }

    #[test]
    fn missing_required_column_fails_the_source() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "genes.tsv", "id\tsymbol\nHGNC:1\tA1BG\n");
        let spec = RowSourceSpec { files: vec!["genes.tsv".into()], delimiter: '\t', required_columns: vec!["name".into()], ..Default::default() };
        let mut source = open(&spec, dir.path()).unwrap();
        assert!(matches!(source.next(), Some(Err(IngestError::MissingColumn { .. }))));
    }

    #[test]
    fn headerless_files_use_declared_columns_and_skip_comments() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "orthologs.tsv", "# generated\nHUMAN|HGNC=1|UniProtKB=P1\tMOUSE|MGI=MGI=2|UniProtKB=Q1\n");
        let spec = RowSourceSpec {
            files: vec!["orthologs.tsv".into()],
            delimiter: '\t',
            comment: Some('#'),
            columns: Some(vec!["Gene".into(), "Ortholog".into()]),
            ..Default::default()
        };
        let rows: Vec<Row> = open(&spec, dir.path()).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("Ortholog"), Some("MOUSE|MGI=MGI=2|UniProtKB=Q1"));
    }

    #[test]
    fn json_rows_come_from_the_data_key() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "phenotypes.json", r#"{"metaData": {}, "data": [{"objectId": "MGI:1"}, 7, {"objectId": "MGI:2"}]}"#);
        let spec = RowSourceSpec { files: vec!["phenotypes.json".into()], format: Format::Json, json_key: Some("data".into()), ..Default::default() };
        let mut source = open(&spec, dir.path()).unwrap();
        let rows: Vec<Row> = source.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(rows.iter().filter_map(|r| r.get_str("objectId")).collect_vec(), vec!["MGI:1", "MGI:2"]);
        assert_eq!(source.malformed(), 1);
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let spec = RowSourceSpec { files: vec!["absent.tsv".into()], ..Default::default() };
        assert!(open(&spec, dir.path()).is_err());
    }

    #[test]
    fn row_accessors() {
        let row = Row::from_value(serde_json::json!({"a": "", "b": " x ", "evidence": {"publicationId": "PMID:1"}, "n": null})).unwrap();
        assert_eq!(row.non_empty("a"), None);
        assert_eq!(row.non_empty("b"), Some("x"));
        assert_eq!(row.pointer("/evidence/publicationId").and_then(Value::as_str), Some("PMID:1"));
        assert!(!row.contains("n"));
        assert_eq!(row.require_str("missing"), Err(RowTransformError::MissingField("missing".into())));
    }
}
