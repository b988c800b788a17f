use lazy_static::lazy_static;
use log::{debug, error, info, warn};
use regex::Regex;
use std::collections::HashMap;
use std::{fs, io, path};
use walkdir::WalkDir;
use xmltree::{Element, XMLNode};

use crate::error::{IngestError, Result};

lazy_static! {
    static ref PMC_ID_REGEX: Regex = Regex::new(r"PMC\d+").expect("Could not create PMC id regex");
}

pub const NO_CONTENT: &str = "No content extracted";

fn descendants<'a>(element: &'a Element, name: &str, found: &mut Vec<&'a Element>) {
    for child in element.children.iter() {
        if let XMLNode::Element(child) = child {
            if child.name == name {
                found.push(child);
            }
            descendants(child, name, found);
        }
    }
}

fn find_all<'a>(element: &'a Element, name: &str) -> Vec<&'a Element> {
    let mut found = vec![];
    descendants(element, name, &mut found);
    found
}

fn find<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    find_all(element, name).into_iter().next()
}

fn text_pieces(element: &Element, pieces: &mut Vec<String>) {
    for child in element.children.iter() {
        match child {
            XMLNode::Element(child) => text_pieces(child, pieces),
            XMLNode::Text(text) | XMLNode::CData(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    pieces.push(trimmed.to_string());
                }
            }
            _ => {}
        }
    }
}

/// Trimmed text nodes under `element`, joined with `separator`.
fn text(element: &Element, separator: &str) -> String {
    let mut pieces = vec![];
    text_pieces(element, &mut pieces);
    pieces.join(separator)
}

fn section(sec: &Element, header: String) -> Option<String> {
    let paragraphs: Vec<String> = find_all(sec, "p").into_iter().map(|p| text(p, " ")).collect();
    if paragraphs.is_empty() {
        return None;
    }
    Some(format!("{}\n{}", header, paragraphs.join("\n\n")))
}

fn top_level_sections(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(|c| match c {
        XMLNode::Element(e) if e.name == "sec" => Some(e),
        _ => None,
    })
}

/// Renders an article as `# Title`, `# Abstract` and one `## ...` block per top-level body section,
/// plus back-matter conclusions.
pub fn extract_text(article: &Element) -> String {
    let mut sections = vec![];

    if let Some(title) = find(article, "article-title") {
        sections.push(format!("# Title\n{}", text(title, "")));
    }

    if let Some(abstract_) = find(article, "abstract") {
        let paragraphs: Vec<String> = find_all(abstract_, "p").into_iter().map(|p| text(p, " ")).collect();
        if !paragraphs.is_empty() {
            sections.push(format!("# Abstract\n{}", paragraphs.join(" ")));
        }
    }

    if let Some(body) = find(article, "body") {
        for sec in top_level_sections(body) {
            let header = match find(sec, "title") {
                Some(title) => format!("## {}", text(title, "")),
                None => "## Section".to_string(),
            };
            sections.extend(section(sec, header));
        }
    }

    if let Some(back) = find(article, "back") {
        for sec in top_level_sections(back) {
            let Some(title) = find(sec, "title").map(|t| text(t, "")) else {
                continue;
            };
            if title.to_lowercase().contains("conclusion") {
                sections.extend(section(sec, format!("## {}", title)));
            }
        }
    }

    match sections.is_empty() {
        true => NO_CONTENT.to_string(),
        false => sections.join("\n\n"),
    }
}

pub fn parse_file(path: &path::Path) -> Result<Element> {
    let file = fs::File::open(path)?;
    Ok(Element::parse(io::BufReader::new(file))?)
}

pub fn pmc_id_from_filename(file_name: &str) -> Option<String> {
    PMC_ID_REGEX.find(file_name).map(|m| m.as_str().to_string())
}

pub fn pmc_id_from_xml(article: &Element) -> Option<String> {
    let article_id = find_all(article, "article-id").into_iter().find(|e| e.attributes.get("pub-id-type").map(String::as_str) == Some("pmc"))?;
    let id = text(article_id, "");
    match id.starts_with("PMC") {
        true => Some(id),
        false => Some(format!("PMC{}", id)),
    }
}

/// Filename first, then the article metadata.
pub fn pmc_id(path: &path::Path) -> Option<String> {
    let from_name = path.file_name().and_then(|n| n.to_str()).and_then(pmc_id_from_filename);
    from_name.or_else(|| match parse_file(path) {
        Ok(article) => pmc_id_from_xml(&article),
        Err(e) => {
            warn!("could not extract PMC id from {:?}: {}", path, e);
            None
        }
    })
}

pub fn find_xml_files(input_dir: &path::Path) -> Vec<path::PathBuf> {
    WalkDir::new(input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.path().extension().and_then(|x| x.to_str()) == Some("xml"))
        .map(|e| e.into_path())
        .collect()
}

/// Keeps the first file seen for each PMC id; files with no id are all kept.
pub fn deduplicate(xml_files: Vec<path::PathBuf>) -> (Vec<path::PathBuf>, usize) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut kept = vec![];
    let mut without_id = 0;
    for xml_file in xml_files {
        match pmc_id(&xml_file) {
            Some(id) => {
                let copies = seen.entry(id.clone()).or_insert(0);
                *copies += 1;
                if *copies == 1 {
                    kept.push(xml_file);
                } else {
                    debug!("skipping {:?}, a duplicate of {}", xml_file, id);
                }
            }
            None => {
                without_id += 1;
                debug!("no PMC id found for {:?}", xml_file);
                kept.push(xml_file);
            }
        }
    }
    if without_id > 0 {
        warn!("found {} files without PMC ids", without_id);
    }
    let duplicated = seen.values().filter(|c| **c > 1).count();
    if duplicated > 0 {
        info!("found {} PMC ids with duplicates", duplicated);
    }
    (kept, duplicated)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub found: usize,
    pub duplicated_ids: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Unparseable XML still yields a text file, holding the parse error in place of the article.
fn convert_file(xml_file: &path::Path, output_dir: &path::Path) -> Result<path::PathBuf> {
    let from_name = xml_file.file_name().and_then(|n| n.to_str()).and_then(pmc_id_from_filename);
    let (name, contents) = match parse_file(xml_file) {
        Ok(article) => (from_name.or_else(|| pmc_id_from_xml(&article)), extract_text(&article)),
        Err(IngestError::Xml(e)) => {
            error!("failed to parse XML file {:?}: {}", xml_file, e);
            (from_name, format!("Error parsing XML: {}", e))
        }
        Err(e) => return Err(e),
    };
    let name = name.unwrap_or_else(|| xml_file.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default());
    let output_file = output_dir.join(format!("{}.txt", name));
    fs::write(&output_file, contents)?;
    Ok(output_file)
}

pub fn convert_dir(input_dir: &path::Path, output_dir: &path::Path, handle_duplicates: bool) -> Result<ConversionReport> {
    fs::create_dir_all(output_dir)?;
    let xml_files = find_xml_files(input_dir);
    info!("found {} XML files", xml_files.len());

    let mut report = ConversionReport { found: xml_files.len(), ..Default::default() };
    let processed = match handle_duplicates {
        true => {
            let (kept, duplicated) = deduplicate(xml_files);
            report.duplicated_ids = duplicated;
            kept
        }
        false => xml_files,
    };
    info!("processing {} files", processed.len());

    for xml_file in processed.iter() {
        match convert_file(xml_file, output_dir) {
            Ok(output_file) => {
                report.successful += 1;
                debug!("converted {:?} -> {:?}", xml_file, output_file);
            }
            Err(e) => {
                report.failed += 1;
                error!("failed to convert {:?}: {}", xml_file, e);
            }
        }
    }
    info!("conversion complete: {} successful, {} failed", report.successful, report.failed);
    Ok(report)
}
