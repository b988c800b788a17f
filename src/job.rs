use humantime::format_duration;
use log::{debug, error, info, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::IngestSpec;
use crate::error::{IngestError, Result, RowTransformError};
use crate::idgen::IdGenerator;
use crate::lookup;
use crate::row;
use crate::transform::{self, Outcome, Transform, TransformContext};
use crate::writer::{EntityWriter, KgxGraph};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobReport {
    pub name: String,
    pub state: JobState,
    pub rows_read: usize,
    pub rows_filtered: usize,
    pub rows_failed: usize,
    pub rows_malformed: usize,
    pub nodes: usize,
    pub edges: usize,
    pub graph: Option<KgxGraph>,
    /// Set by the validation post-step when the output breaks the schema.
    pub suspect: Option<String>,
}

impl JobReport {
    fn new(name: String) -> Self {
        JobReport {
            name,
            state: JobState::Pending,
            rows_read: 0,
            rows_filtered: 0,
            rows_failed: 0,
            rows_malformed: 0,
            nodes: 0,
            edges: 0,
            graph: None,
            suspect: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == JobState::Completed
    }

    pub fn rows_skipped(&self) -> usize {
        self.rows_failed + self.rows_malformed
    }
}

/// One (source, transform) pair: its row source, maps, transform and writer live only inside `run`.
pub struct IngestJob {
    spec: IngestSpec,
    transform: Arc<dyn Transform>,
    state: JobState,
}

impl IngestJob {
    pub fn new(spec: IngestSpec, transform: Arc<dyn Transform>) -> Self {
        IngestJob { spec, transform, state: JobState::Pending }
    }

    pub fn name(&self) -> String {
        self.spec.name()
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn run(&mut self, data_dir: &path::Path, output_dir: &path::Path, ids: &dyn IdGenerator) -> JobReport {
        let start = Instant::now();
        let mut report = JobReport::new(self.name());
        self.state = JobState::Running;
        info!("running ingest {}", report.name);

        self.state = match self.execute(data_dir, output_dir, ids, &mut report) {
            Ok(()) => JobState::Completed,
            Err(e) => {
                error!("ingest {} failed: {}", report.name, e);
                JobState::Failed(e.to_string())
            }
        };
        report.state = self.state.clone();

        info!(
            "ingest {} finished as {:?}: {} rows read, {} filtered, {} failed, {} malformed, {} nodes, {} edges in {}",
            report.name,
            report.state,
            report.rows_read,
            report.rows_filtered,
            report.rows_failed,
            report.rows_malformed,
            report.nodes,
            report.edges,
            format_duration(start.elapsed())
        );
        report
    }

    fn execute(&self, data_dir: &path::Path, output_dir: &path::Path, ids: &dyn IdGenerator, report: &mut JobReport) -> Result<()> {
        let maps = lookup::build(&self.spec.maps, data_dir)?;
        let mut rows = row::open(&self.spec.rows, data_dir)?;
        let ctx = TransformContext::new(&maps, ids);
        let mut writer = EntityWriter::default();

        for result in rows.by_ref() {
            let row = result?;
            report.rows_read += 1;

            let outcome = catch_unwind(AssertUnwindSafe(|| transform::apply(self.transform.as_ref(), &row, &ctx)))
                .unwrap_or_else(|panic| Err(RowTransformError::Panic(panic_message(panic.as_ref()))));

            match outcome {
                Ok(Outcome::Emitted(entities)) => writer.write(entities),
                Ok(Outcome::Filtered { stage, reason }) => {
                    report.rows_filtered += 1;
                    debug!("{}: row {} filtered by {}: {}", report.name, report.rows_read, stage, reason);
                }
                Err(e) => {
                    report.rows_failed += 1;
                    warn!("{}: skipping row {}: {} -- {}", report.name, report.rows_read, e, row);
                }
            }
        }
        report.rows_malformed = rows.malformed();
        report.nodes = writer.nodes().len();
        report.edges = writer.edges().len();

        let graph = writer.persist(output_dir, &report.name)?;
        report.graph = Some(graph);
        Ok(())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fails fast for a job whose transform is not registered.
pub fn resolve(spec: IngestSpec) -> Result<IngestJob> {
    match crate::ingests::find(&spec.source, &spec.transform) {
        Some(transform) => Ok(IngestJob::new(spec, transform)),
        None => Err(IngestError::Config(format!("no transform named {}/{} is registered", spec.source, spec.transform))),
    }
}
