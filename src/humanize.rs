use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use std::collections::HashMap;
use std::{fs, io, path};

use crate::error::{IngestError, Result};

lazy_static! {
    static ref CAMEL_CASE_REGEX: Regex = Regex::new(r"([a-z])([A-Z])").expect("Could not create camel case regex");
}

/// `biolink:has_phenotype` -> `has phenotype`; unprefixed predicates are looked up as node ids.
pub fn humanize_predicate(predicate: &str, names: &HashMap<String, String>) -> String {
    match predicate.split_once(':') {
        Some((_, local)) => local.replace('_', " "),
        None => names.get(predicate).cloned().unwrap_or_else(|| predicate.to_string()),
    }
}

pub fn humanize_source(source: &str) -> &str {
    source.split_once(':').map(|(_, local)| local).unwrap_or(source)
}

/// `biolink:GeneProduct` -> `a gene product`.
pub fn humanize_category(category: &str) -> String {
    let local = category.split_once(':').map(|(_, local)| local).unwrap_or(category);
    let spaced = CAMEL_CASE_REGEX.replace_all(local, "$1 $2").to_lowercase();
    match spaced.chars().next() {
        None => String::new(),
        Some(c) if "aeiou".contains(c) => format!("an {}", spaced),
        Some(_) => format!("a {}", spaced),
    }
}

#[derive(Debug, Default)]
pub struct NodeLabels {
    pub names: HashMap<String, String>,
    pub categories: HashMap<String, String>,
    pub has_categories: bool,
}

impl NodeLabels {
    /// `name (a category)` when the node has a category, the bare name otherwise; unknown ids pass through.
    pub fn label(&self, id: &str) -> String {
        let name = self.names.get(id).map(String::as_str).unwrap_or(id);
        match self.categories.get(id).map(|c| humanize_category(c)).filter(|c| !c.is_empty()) {
            Some(category) => format!("{} ({})", name, category),
            None => name.to_string(),
        }
    }
}

fn tsv_reader(path: &path::Path) -> Result<csv::Reader<io::BufReader<fs::File>>> {
    let file = fs::File::open(path)?;
    let reader = io::BufReader::with_capacity(2_usize.pow(14), file);
    Ok(csv::ReaderBuilder::new().has_headers(true).delimiter(b'\t').flexible(true).quoting(false).from_reader(reader))
}

fn column_index(header: &csv::StringRecord, column: &str) -> Option<usize> {
    header.iter().position(|h| h == column)
}

fn require_column(header: &csv::StringRecord, path: &path::Path, column: &str) -> Result<usize> {
    column_index(header, column).ok_or_else(|| IngestError::MissingColumn { path: path.to_path_buf(), column: column.to_string() })
}

pub fn load_labels(nodes_file: &path::Path) -> Result<NodeLabels> {
    let mut rdr = tsv_reader(nodes_file)?;
    let header = rdr.headers()?.clone();
    let id_idx = require_column(&header, nodes_file, "id")?;
    let name_idx = require_column(&header, nodes_file, "name")?;
    let category_idx = column_index(&header, "category");
    if category_idx.is_none() {
        warn!("no category column in {:?}, node categories will not be included", nodes_file);
    }

    let mut labels = NodeLabels { has_categories: category_idx.is_some(), ..Default::default() };
    for result in rdr.records() {
        let record = result?;
        let (Some(id), Some(name)) = (record.get(id_idx), record.get(name_idx)) else {
            continue;
        };
        if id.is_empty() {
            continue;
        }
        labels.names.insert(id.to_string(), name.to_string());
        if let Some(category) = category_idx.and_then(|i| record.get(i)).filter(|c| !c.is_empty()) {
            labels.categories.insert(id.to_string(), category.to_string());
        }
    }
    info!("loaded {} node names and {} node categories", labels.names.len(), labels.categories.len());
    Ok(labels)
}

/// Writes `subject predicate object [source]` rows with ids replaced by node labels.
/// Returns the number of edges processed; `limit` stops early, `Some(0)` meaning no limit.
pub fn humanize_edges(nodes_file: &path::Path, edges_file: &path::Path, output_file: &path::Path, limit: Option<usize>) -> Result<usize> {
    let limit = limit.filter(|limit| *limit > 0);
    let labels = load_labels(nodes_file)?;

    let mut rdr = tsv_reader(edges_file)?;
    let header = rdr.headers()?.clone();
    let subject_idx = require_column(&header, edges_file, "subject")?;
    let predicate_idx = require_column(&header, edges_file, "predicate")?;
    let object_idx = require_column(&header, edges_file, "object")?;
    let source_idx = column_index(&header, "primary_knowledge_source");
    if source_idx.is_none() {
        warn!("no primary_knowledge_source column in {:?}, sources will not be included", edges_file);
    }

    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').quote_style(csv::QuoteStyle::Never).from_path(output_file)?;
    match source_idx {
        Some(_) => writer.write_record(["subject", "predicate", "object", "source"])?,
        None => writer.write_record(["subject", "predicate", "object"])?,
    }

    let mut count = 0;
    for result in rdr.records() {
        if limit.is_some_and(|limit| count >= limit) {
            break;
        }
        let record = result?;
        count += 1;
        let (Some(subject), Some(predicate), Some(object)) = (record.get(subject_idx), record.get(predicate_idx), record.get(object_idx)) else {
            continue;
        };
        let mut humanized = vec![labels.label(subject), humanize_predicate(predicate, &labels.names), labels.label(object)];
        if let Some(source) = source_idx.and_then(|i| record.get(i)) {
            humanized.push(humanize_source(source).to_string());
        }
        writer.write_record(&humanized)?;
    }
    writer.flush()?;
    info!("{} humanized edges written to {:?}", count, output_file);
    Ok(count)
}
