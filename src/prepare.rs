use flate2::write::GzEncoder;
use flate2::Compression;
use itertools::Itertools;
use log::{debug, info, warn};
use serde_json::Value;
use std::io::{self, Write};
use std::{fs, path};
use walkdir::WalkDir;

use crate::error::{IngestError, Result};
use crate::row::open_reader;

/// NCBI taxa of the reference genomes kept in the UniProt to Entrez gene map.
pub const REFERENCE_TAXA: [&str; 12] = ["10090", "10116", "162425", "44689", "6239", "7227", "7955", "9031", "9606", "9615", "9823", "9913"];

pub const ALLIANCE_GENE_IDS: &str = "alliance/alliance_gene_ids.txt.gz";
pub const UNIPROT_2_ENTREZ: &str = "goa/uniprot_2_entrez.tab.gz";
pub const REF_GENOME_ORTHOLOGS: &str = "panther/RefGenomeOrthologs.tsv.gz";

/// Writes `output` from files under the data directory. `Ok(false)` means the inputs are absent.
type Derive = fn(&path::Path, &path::Path) -> Result<bool>;

const DERIVATIONS: [(&str, Derive); 3] = [(ALLIANCE_GENE_IDS, alliance_gene_ids), (UNIPROT_2_ENTREZ, uniprot_2_entrez), (REF_GENOME_ORTHOLOGS, ref_genome_orthologs)];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrepareReport {
    pub derived: Vec<path::PathBuf>,
    pub present: Vec<path::PathBuf>,
    pub unavailable: Vec<path::PathBuf>,
    pub failed: Vec<path::PathBuf>,
}

fn gz_writer(output: &path::Path) -> Result<GzEncoder<io::BufWriter<fs::File>>> {
    let file = fs::File::create(output)?;
    Ok(GzEncoder::new(io::BufWriter::new(file), Compression::default()))
}

fn finish(encoder: GzEncoder<io::BufWriter<fs::File>>) -> Result<()> {
    encoder.finish()?.flush()?;
    Ok(())
}

/// One primary gene id per line, from every `alliance/BGI_*.gz` basic gene information file.
fn alliance_gene_ids(data_dir: &path::Path, output: &path::Path) -> Result<bool> {
    let bgi_files = WalkDir::new(data_dir.join("alliance"))
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name().to_str().is_some_and(|n| n.starts_with("BGI_") && n.ends_with(".gz")))
        .map(|e| e.into_path())
        .collect_vec();
    if bgi_files.is_empty() {
        return Ok(false);
    }

    let mut encoder = gz_writer(output)?;
    for bgi_file in bgi_files.iter() {
        debug!("reading gene ids from {:?}", bgi_file);
        let document: Value = serde_json::from_reader(open_reader(bgi_file)?)?;
        let ids = document
            .get("data")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|gene| gene.pointer("/basicGeneticEntity/primaryId").and_then(Value::as_str));
        for id in ids {
            writeln!(encoder, "{}", id)?;
        }
    }
    finish(encoder)?;
    Ok(true)
}

/// Accession and gene id columns of `goa/uniprot_2_gene.tab.gz`, restricted to the reference taxa.
fn uniprot_2_entrez(data_dir: &path::Path, output: &path::Path) -> Result<bool> {
    let input = data_dir.join("goa").join("uniprot_2_gene.tab.gz");
    if !input.exists() {
        return Ok(false);
    }

    let mut rdr = csv::ReaderBuilder::new().delimiter(b'\t').has_headers(false).flexible(true).quoting(false).from_reader(open_reader(&input)?);
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').quote_style(csv::QuoteStyle::Never).from_writer(gz_writer(output)?);
    for result in rdr.byte_records() {
        let record = result?;
        let (Some(accession), Some(gene_ids), Some(taxon)) = (record.get(0), record.get(2), record.get(6)) else {
            continue;
        };
        if REFERENCE_TAXA.iter().any(|t| t.as_bytes() == taxon) {
            writer.write_record([accession, gene_ids])?;
        }
    }
    let encoder = writer.into_inner().map_err(|e| IngestError::Io(e.into_error()))?;
    finish(encoder)?;
    Ok(true)
}

/// Every regular file of `panther/RefGenomeOrthologs.tar.gz`, concatenated and recompressed.
fn ref_genome_orthologs(data_dir: &path::Path, output: &path::Path) -> Result<bool> {
    let input = data_dir.join("panther").join("RefGenomeOrthologs.tar.gz");
    if !input.exists() {
        return Ok(false);
    }

    let mut archive = tar::Archive::new(open_reader(&input)?);
    let mut encoder = gz_writer(output)?;
    let mut extracted = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        debug!("extracting {:?} from {:?}", entry.path()?, input);
        io::copy(&mut entry, &mut encoder)?;
        extracted += 1;
    }
    if extracted == 0 {
        return Err(IngestError::Prepare { path: input, reason: "archive holds no files".to_string() });
    }
    finish(encoder)?;
    Ok(true)
}

fn partial_path(target: &path::Path) -> path::PathBuf {
    let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

/// Derives the lookup and source files some ingests read instead of the raw downloads.
/// Outputs that already exist are left alone; a failed derivation is logged and its owning job fails later.
pub fn run(data_dir: &path::Path) -> PrepareReport {
    let mut report = PrepareReport::default();
    for (output, derive) in DERIVATIONS.iter() {
        let target = data_dir.join(output);
        if target.exists() {
            debug!("{:?} already present", target);
            report.present.push(target);
            continue;
        }
        if let Some(parent) = target.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("unable to create {:?}: {}", parent, e);
                report.failed.push(target);
                continue;
            }
        }

        let partial = partial_path(&target);
        let outcome = derive(data_dir, &partial).and_then(|derived| {
            if derived {
                fs::rename(&partial, &target)?;
            }
            Ok(derived)
        });
        match outcome {
            Ok(true) => {
                info!("derived {:?}", target);
                report.derived.push(target);
            }
            Ok(false) => {
                debug!("inputs for {:?} are not in {:?}", target, data_dir);
                report.unavailable.push(target);
            }
            Err(e) => {
                warn!("{}", IngestError::Prepare { path: target.clone(), reason: e.to_string() });
                if partial.exists() {
                    if let Err(e) = fs::remove_file(&partial) {
                        warn!("unable to remove {:?}: {}", partial, e);
                    }
                }
                report.failed.push(target);
            }
        }
    }
    info!("prepared files: {} derived, {} already present, {} unavailable, {} failed", report.derived.len(), report.present.len(), report.unavailable.len(), report.failed.len());
    report
}
