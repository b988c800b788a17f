use itertools::Itertools;
use log::{debug, info};
use serde_derive::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{fs, path};

use crate::error::{IngestError, Result};
use crate::ingests;
use crate::lookup::MapSpec;
use crate::row::RowSourceSpec;

pub const DEFAULT_CONFIG_FILE: &str = "ingest.yaml";

/// The standard source files for every registered transform, relative to the data directory.
const DEFAULT_INGESTS: &str = r##"
- source: hgnc
  transform: gene
  files: [hgnc_complete_set.txt]
  required_columns: [hgnc_id, symbol, name]
  maps:
    - name: hgnc-so-terms
      file: hgnc_so_terms.tsv
      key: hgnc_id
      values: [so_term_id]
- source: pombase
  transform: gene
  files: [pombase_gene_IDs_names_products.tsv]
  columns: [gene_systematic_id, gene_systematic_id_with_prefix, curie, gene_name, chromosome_id, gene_product, uniprot_id, product_type, synonyms, "UniProtKB accession"]
- source: alliance
  transform: gene_to_phenotype
  files: [alliance_phenotype.json.gz]
  format: json
  json_key: data
  maps:
    - name: alliance-gene
      file: alliance/alliance_gene_ids.txt.gz
      key: id
      columns: [id]
- source: pombase
  transform: gene_to_phenotype
  files: [pombase_phenotype_annotations.fypo.phaf.tsv]
  comment: "#"
  required_columns: [Gene systematic ID, FYPO ID]
- source: dictybase
  transform: gene_to_phenotype
  files: [dictybase_all-mutants-phenotypes.txt]
  required_columns: [DDB_G_ID, Phenotypes]
  maps:
    - name: dictybase_phenotype_names_to_ids
      file: dictybase_phenotype_names_to_ids.tsv
      key: phenotype_name
      columns: [phenotype_name, id]
- source: zfin
  transform: publication_to_gene
  files: [zfin_gene_publication.txt]
  columns: [Gene Symbol, Gene ID, Publication ID, Publication Type, PubMed ID]
- source: panther
  transform: ref_genome_orthologs
  files: [panther/RefGenomeOrthologs.tsv.gz]
  columns: [Gene, Ortholog, Type of ortholog, Common ancestor for the orthologs, Panther Ortholog ID]
  maps:
    - name: uniprot_2_gene
      file: goa/uniprot_2_entrez.tab.gz
      key: UniProtKB
      values: [NCBIGene]
      columns: [UniProtKB, NCBIGene]
- source: bgee
  transform: gene_to_expression
  files: [bgee_expr_simple.tsv.gz]
  required_columns: [Gene ID, Anatomical entity ID, Expression]
"##;

fn default_graph_name() -> String {
    "monarch-kg".to_string()
}

fn default_data_dir() -> path::PathBuf {
    path::PathBuf::from("data")
}

fn default_output_dir() -> path::PathBuf {
    path::PathBuf::from("output")
}

fn default_download() -> Option<path::PathBuf> {
    Some(path::PathBuf::from("download.yaml"))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngestSpec {
    pub source: String,
    pub transform: String,
    #[serde(flatten)]
    pub rows: RowSourceSpec,
    #[serde(default)]
    pub maps: Vec<MapSpec>,
}

impl IngestSpec {
    pub fn name(&self) -> String {
        format!("{}_{}", self.source, self.transform)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_graph_name")]
    pub graph_name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: path::PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: path::PathBuf,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default = "default_download")]
    pub download: Option<path::PathBuf>,
    #[serde(default)]
    pub ingests: Vec<IngestSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            graph_name: default_graph_name(),
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            workers: None,
            download: default_download(),
            ingests: vec![],
        }
    }
}

pub fn default_ingests() -> Result<Vec<IngestSpec>> {
    Ok(serde_yml::from_str(DEFAULT_INGESTS)?)
}

impl PipelineConfig {
    /// Reads `path` when given, else `ingest.yaml` when present, else the built-in registry.
    pub fn load(path: Option<&path::Path>) -> Result<PipelineConfig> {
        let mut config = match path {
            Some(path) if !path.exists() => return Err(IngestError::Config(format!("config file {:?} does not exist", path))),
            Some(path) => Self::from_file(path)?,
            None if path::Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(path::Path::new(DEFAULT_CONFIG_FILE))?,
            None => {
                info!("no {} found, using the built-in ingest registry", DEFAULT_CONFIG_FILE);
                PipelineConfig::default()
            }
        };
        if config.ingests.is_empty() {
            config.ingests = default_ingests()?;
        }
        Ok(config)
    }

    pub fn from_file(path: &path::Path) -> Result<PipelineConfig> {
        debug!("reading pipeline config from {:?}", path);
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<PipelineConfig> {
        serde_yml::from_str(contents).map_err(|e| IngestError::Config(format!("unable to parse pipeline config: {}", e)))
    }

    /// Keeps only the named ingests, in configured order.
    pub fn restrict(&mut self, only: &[String]) -> Result<()> {
        if only.is_empty() {
            return Ok(());
        }
        let known = self.ingests.iter().map(IngestSpec::name).collect::<HashSet<_>>();
        if let Some(unknown) = only.iter().find(|name| !known.contains(*name)) {
            return Err(IngestError::Config(format!("--only names an unconfigured ingest: {}", unknown)));
        }
        self.ingests.retain(|ingest| only.contains(&ingest.name()));
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(IngestError::Config("workers must be at least 1".to_string()));
        }
        if let Some(spec) = self.ingests.iter().find(|spec| ingests::find(&spec.source, &spec.transform).is_none()) {
            return Err(IngestError::Config(format!("unknown transform {}/{}; registered: {}", spec.source, spec.transform, ingests::names().join(", "))));
        }
        let duplicates = self.ingests.iter().map(IngestSpec::name).duplicates().collect_vec();
        if !duplicates.is_empty() {
            return Err(IngestError::Config(format!("ingests configured more than once: {}", duplicates.join(", "))));
        }
        if let Some(spec) = self.ingests.iter().find(|spec| spec.rows.files.is_empty()) {
            return Err(IngestError::Config(format!("ingest {} lists no files", spec.name())));
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::row::Format;

    #[test]
    fn default_registry_covers_every_transform() {
        let config = PipelineConfig { ingests: default_ingests().unwrap(), ..Default::default() };
        config.validate().unwrap();
        assert_eq!(config.ingests.iter().map(IngestSpec::name).collect_vec(), ingests::names());
        let alliance = config.ingests.iter().find(|s| s.source == "alliance").unwrap();
        assert_eq!(alliance.rows.format, Format::Json);
        assert_eq!(alliance.rows.json_key.as_deref(), Some("data"));
        assert_eq!(alliance.rows.delimiter, '\t');
        let pombase = config.ingests.iter().find(|s| s.name() == "pombase_gene_to_phenotype").unwrap();
        assert_eq!(pombase.rows.comment, Some('#'));
    }

    #[test]
    fn parses_yaml_with_defaults() {
        let config = PipelineConfig::from_yaml(
            r#"
graph_name: test-kg
workers: 2
ingests:
  - source: zfin
    transform: publication_to_gene
    files: [zfin.tsv]
    delimiter: ","
"#,
        )
        .unwrap();
        assert_eq!(config.graph_name, "test-kg");
        assert_eq!(config.data_dir, path::PathBuf::from("data"));
        assert_eq!(config.worker_count(), 2);
        assert_eq!(config.ingests[0].rows.delimiter, ',');
        assert!(config.ingests[0].maps.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn unknown_transform_is_rejected() {
        let config = PipelineConfig::from_yaml("ingests:\n  - source: zfin\n    transform: gene\n    files: [zfin.tsv]\n").unwrap();
        assert!(matches!(config.validate(), Err(IngestError::Config(_))));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let config = PipelineConfig { workers: Some(0), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn restrict_to_named_ingests() {
        let mut config = PipelineConfig { ingests: default_ingests().unwrap(), ..Default::default() };
        config.restrict(&["bgee_gene_to_expression".to_string()]).unwrap();
        assert_eq!(config.ingests.len(), 1);
        assert!(config.restrict(&["nope_gene".to_string()]).is_err());
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        assert!(matches!(PipelineConfig::load(Some(path::Path::new("/nonexistent/ingest.yaml"))), Err(IngestError::Config(_))));
    }
}
