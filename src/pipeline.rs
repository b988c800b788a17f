use itertools::Itertools;
use log::{error, info, warn};
use rayon::prelude::*;
use std::fs;

use crate::config::PipelineConfig;
use crate::download;
use crate::error::{IngestError, Result};
use crate::idgen::IdGenerator;
use crate::job::{self, JobReport, JobState};
use crate::merge::{self, MergeReport};
use crate::prepare;
use crate::summary;
use crate::validate;

#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub jobs: Vec<JobReport>,
    pub merge: MergeReport,
}

impl RunSummary {
    pub fn succeeded(&self) -> Vec<&JobReport> {
        self.jobs.iter().filter(|j| j.succeeded()).collect_vec()
    }

    pub fn failed(&self) -> Vec<(&str, &str)> {
        self.jobs
            .iter()
            .filter_map(|j| match &j.state {
                JobState::Failed(reason) => Some((j.name.as_str(), reason.as_str())),
                _ => None,
            })
            .collect_vec()
    }

    pub fn suspect(&self) -> Vec<(&str, &str)> {
        self.jobs.iter().filter_map(|j| j.suspect.as_deref().map(|s| (j.name.as_str(), s))).collect_vec()
    }

    pub fn rows_skipped(&self) -> usize {
        self.jobs.iter().map(JobReport::rows_skipped).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed().is_empty()
    }

    pub fn log(&self) {
        info!("succeeded: {}", self.succeeded().iter().map(|j| j.name.as_str()).join(", "));
        for (name, reason) in self.failed() {
            error!("failed: {}: {}", name, reason);
        }
        for (name, reason) in self.suspect() {
            warn!("suspect: {}: {}", name, reason);
        }
        info!("rows skipped: {}", self.rows_skipped());
        info!("merged graph {}: {} nodes, {} edges", self.merge.graph.name, self.merge.nodes, self.merge.edges);
    }
}

/// Validates and summarizes one completed job's output; problems only flag the job.
fn post_process(report: &mut JobReport) {
    let Some(graph) = report.graph.clone() else {
        return;
    };
    match validate::validate(&graph) {
        Ok(()) => {}
        Err(IngestError::Validation { infractions, .. }) => report.suspect = Some(format!("{} schema infractions", infractions.len())),
        Err(e) => report.suspect = Some(format!("unable to validate output: {}", e)),
    }
    if let Err(e) = summary::summarize(&graph) {
        warn!("unable to summarize {}: {}", report.name, e);
    }
}

/// Runs every configured ingest on a bounded pool, then merges the successful outputs.
pub fn run(config: &PipelineConfig, skip_download: bool, ids: &dyn IdGenerator) -> Result<RunSummary> {
    config.validate()?;
    let jobs = config.ingests.iter().cloned().map(job::resolve).collect::<Result<Vec<_>>>()?;

    fs::create_dir_all(&config.data_dir)?;
    fs::create_dir_all(&config.output_dir)?;

    match (&config.download, skip_download) {
        (Some(download_file), false) => {
            download::run(download_file, &config.data_dir)?;
        }
        _ => info!("skipping the download step"),
    }
    prepare::run(&config.data_dir);

    let workers = config.worker_count();
    info!("running {} ingests on {} workers", jobs.len(), workers);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build().map_err(|e| IngestError::Config(format!("unable to build worker pool: {}", e)))?;

    let reports: Vec<JobReport> = pool.install(|| {
        jobs.into_par_iter()
            .map(|mut job| {
                let mut report = job.run(&config.data_dir, &config.output_dir, ids);
                post_process(&mut report);
                report
            })
            .collect()
    });

    let missing = reports.iter().filter(|r| !r.succeeded()).map(|r| r.name.as_str()).collect_vec();
    if !missing.is_empty() {
        warn!("merging without: {}", missing.join(", "));
    }
    let graphs = reports.iter().filter(|r| r.succeeded()).filter_map(|r| r.graph.clone()).collect_vec();
    let merge = merge::merge(&graphs, &config.output_dir, &config.graph_name)?;

    if let Err(e) = summary::summarize(&merge.graph) {
        warn!("unable to summarize {}: {}", merge.graph.name, e);
    }
    match validate::dangling_edge_ids(&merge.graph) {
        Ok(dangling) if !dangling.is_empty() => warn!("{} edge endpoints have no node in {}", dangling.len(), merge.graph.name),
        Ok(_) => {}
        Err(e) => warn!("unable to check edge endpoints: {}", e),
    }

    Ok(RunSummary { jobs: reports, merge })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::idgen::SequentialIdGenerator;
    use std::path;

    fn config(dir: &path::Path) -> PipelineConfig {
        let mut config = PipelineConfig::from_yaml(
            r#"
graph_name: test-kg
workers: 2
ingests:
  - source: zfin
    transform: publication_to_gene
    files: [zfin.tsv]
  - source: bgee
    transform: gene_to_expression
    files: [bgee.tsv]
  - source: dictybase
    transform: gene_to_phenotype
    files: [dicty.tsv]
    maps:
      - name: dictybase_phenotype_names_to_ids
        file: missing.tsv
        key: phenotype_name
"#,
        )
        .unwrap();
        config.data_dir = dir.join("data");
        config.output_dir = dir.join("output");
        config
    }

    #[test]
    fn failed_job_does_not_stop_siblings_or_the_merge() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        fs::create_dir_all(&config.data_dir).unwrap();
        fs::write(config.data_dir.join("zfin.tsv"), "Gene ID\tPublication ID\nZDB-GENE-1\tZDB-PUB-1\nZDB-GENE-2\tZDB-PUB-1\n").unwrap();
        fs::write(config.data_dir.join("bgee.tsv"), "Gene ID\tAnatomical entity ID\tExpression\nENSG1\tUBERON:1\tpresent\nENSG2\tUBERON:1\tabsent\n").unwrap();
        fs::write(config.data_dir.join("dicty.tsv"), "DDB_G_ID\tPhenotypes\n").unwrap();

        let summary = run(&config, true, &SequentialIdGenerator::default()).unwrap();
        assert!(!summary.is_success());
        assert_eq!(summary.succeeded().len(), 2);
        assert_eq!(summary.failed().len(), 1);
        assert_eq!(summary.failed()[0].0, "dictybase_gene_to_phenotype");
        assert_eq!(summary.jobs[1].rows_filtered, 1);
        assert_eq!(summary.merge.edges, 3);
        assert_eq!(summary.merge.merged, vec!["zfin_publication_to_gene".to_string(), "bgee_gene_to_expression".to_string()]);
        assert!(summary.suspect().is_empty());
        assert!(config.output_dir.join("zfin_publication_to_gene_graph_stats.yaml").exists());
        assert!(config.output_dir.join("test-kg_graph_stats.yaml").exists());
    }

    #[test]
    fn raw_downloads_are_prepared_before_the_jobs_run() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::from_yaml(
            r#"
graph_name: test-kg
ingests:
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
"#,
        )
        .unwrap();
        config.data_dir = dir.path().join("data");
        config.output_dir = dir.path().join("output");

        fs::create_dir_all(config.data_dir.join("goa")).unwrap();
        let mut encoder = GzEncoder::new(fs::File::create(config.data_dir.join("goa").join("uniprot_2_gene.tab.gz")).unwrap(), Compression::default());
        encoder.write_all(b"Q9XYZ1\tX_CHICK\t395512\t\t\t\t9031\n").unwrap();
        encoder.finish().unwrap();

        fs::create_dir_all(config.data_dir.join("panther")).unwrap();
        let contents = "HUMAN|HGNC=11477|UniProtKB=Q6GZX4\tCHICK|Gene_ORFName=abc|UniProtKB=Q9XYZ1\tLDO\tAmniota\tPTHR1\n";
        let encoder = GzEncoder::new(fs::File::create(config.data_dir.join("panther").join("RefGenomeOrthologs.tar.gz")).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, "RefGenomeOrthologs", contents.as_bytes()).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let summary = run(&config, true, &SequentialIdGenerator::default()).unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.jobs[0].edges, 1);
        let edges = crate::read_edges_file(&summary.merge.graph.edges_file).unwrap();
        assert_eq!(edges[0].object, "NCBIGene:395512");
    }

    #[test]
    fn unknown_transform_fails_before_any_job() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.ingests[0].transform = "gene".into();
        assert!(matches!(run(&config, true, &SequentialIdGenerator::default()), Err(IngestError::Config(_))));
        assert!(!config.output_dir.exists());
    }
}
