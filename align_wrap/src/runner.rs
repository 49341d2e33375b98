//! Run one partition of a `cellranger count` dispatch.
//!
//! A job moves strictly forward through
//! `Start -> StageReference -> StageInput -> RunTool -> SyncOutput -> Done` and stops at the
//! first fatal error. Only the final upload is retried: a partially staged input or a
//! half-finished alignment cannot be told apart from a good one, so those steps fail hard.

use crate::archive::extract_tgz;
use crate::count::CountArgs;
use crate::errors::JobError;
use crate::layout::{sample_id, JobLayout};
use crate::tool::ExternalTool;
use align_types::{validate_partition, GenomeFormat, PartitionMode, ReferenceCatalog, Region};
use cloud_utils::{
    join_key, ObjectStore, ObjectUri, RetryPolicy, TransferAttempt, TransferFilter, TransferOp,
    TransferStatus,
};
use log::{error, info, warn};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Start,
    StageReference,
    StageInput,
    RunTool,
    SyncOutput,
    Done,
    Failed,
}

/// Everything `run_10x_count` is told on its command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountJob {
    pub taxon: String,
    /// Defaults to [`Region::default`] when absent.
    pub region: Option<String>,
    pub s3_input_path: String,
    pub s3_output_path: String,
    /// Sample to align. Defaults to the last segment of `s3_input_path`.
    pub sample_prefix: Option<String>,
    pub num_partitions: usize,
    pub partition_id: usize,
    pub cell_count: usize,
    pub mode: PartitionMode,
    pub glacier: bool,
    pub root_dir: PathBuf,
    pub job_id: Option<String>,
    pub legacy: bool,
}

/// Final state of a job and every transfer attempted along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub state: JobState,
    pub attempts: Vec<TransferAttempt>,
}

impl Default for JobReport {
    fn default() -> Self {
        JobReport {
            state: JobState::Start,
            attempts: Vec::new(),
        }
    }
}

fn check_staged(what: String, status: TransferStatus) -> Result<(), JobError> {
    match status {
        TransferStatus::Success => Ok(()),
        TransferStatus::Failed { output, .. } => Err(JobError::StagingFailure { what, output }),
    }
}

pub struct JobRunner<'a, S: ?Sized, T: ?Sized> {
    catalog: &'a ReferenceCatalog,
    store: &'a S,
    tool: &'a T,
    sync_policy: RetryPolicy,
}

impl<'a, S, T> JobRunner<'a, S, T>
where
    S: ObjectStore + ?Sized,
    T: ExternalTool + ?Sized,
{
    pub fn new(catalog: &'a ReferenceCatalog, store: &'a S, tool: &'a T) -> Self {
        JobRunner {
            catalog,
            store,
            tool,
            sync_policy: RetryPolicy::default(),
        }
    }

    /// Policy for the output upload. Staging is never retried.
    pub fn with_sync_policy(self, sync_policy: RetryPolicy) -> Self {
        JobRunner {
            sync_policy,
            ..self
        }
    }

    pub fn run(&self, job: &CountJob) -> Result<JobReport, JobError> {
        let mut report = JobReport::default();
        self.run_with_report(job, &mut report)?;
        Ok(report)
    }

    /// Like [`JobRunner::run`], but leaves the report with the caller so that the state
    /// and the attempts of a failed job can be inspected.
    pub fn run_with_report(&self, job: &CountJob, report: &mut JobReport) -> Result<(), JobError> {
        match self.execute(job, report) {
            Ok(()) => {
                report.state = JobState::Done;
                Ok(())
            }
            Err(err) => {
                error!("job failed during {:?}: {err}", report.state);
                report.state = JobState::Failed;
                Err(err)
            }
        }
    }

    fn execute(&self, job: &CountJob, report: &mut JobReport) -> Result<(), JobError> {
        let genome = self.catalog.resolve(&job.taxon)?;
        let region = match &job.region {
            Some(region) => Region::parse(region)?,
            None => Region::default(),
        };
        validate_partition(job.partition_id, job.num_partitions)?;
        job.s3_input_path.parse::<ObjectUri>()?;
        job.s3_output_path.parse::<ObjectUri>()?;

        let sample_id = sample_id(&job.s3_input_path);
        let sample = job.sample_prefix.as_deref().unwrap_or(sample_id);
        let layout = JobLayout::new(
            &job.root_dir,
            job.job_id.as_deref(),
            sample_id,
            job.legacy,
            GenomeFormat::CellRanger,
        );
        let genome_dir = layout.genome_dir(genome);
        let (bucket, key) =
            self.catalog
                .reference_location(region, GenomeFormat::CellRanger, genome);

        info!(
            "Run Info: partition {} out of {}\n\
             \tgenome_dir:\t{}\n\
             \tref_genome_10x_file:\t{key}\n\
             \ttaxon:\t{}\n\
             \ts3_input_path:\t{}",
            job.partition_id,
            job.num_partitions,
            genome_dir.display(),
            job.taxon,
            job.s3_input_path,
        );
        layout.create()?;

        report.state = JobState::StageReference;
        info!("Downloading and extracting genome data {genome}");
        let archive = layout.genome_base.join(format!("{genome}.tgz"));
        let status = RetryPolicy::once().run(TransferOp::StageIn, &mut report.attempts, || {
            self.store.download_object(bucket, &key, &archive)
        })?;
        check_staged(format!("reference s3://{bucket}/{key}"), status)?;
        extract_tgz(&archive, &layout.genome_base).map_err(|err| JobError::StagingFailure {
            what: format!("reference archive {}", archive.display()),
            output: err.to_string(),
        })?;
        if let Err(err) = fs::remove_file(&archive) {
            warn!("could not remove {}: {err}", archive.display());
        }

        report.state = JobState::StageInput;
        let filter = match job.mode {
            PartitionMode::ByFilename => TransferFilter::containing(sample),
            PartitionMode::ByFolder => TransferFilter::default(),
        }
        .glacier(job.glacier);
        info!(
            "Downloading {} to {}",
            job.s3_input_path,
            layout.fastq_path.display()
        );
        let status = RetryPolicy::once().run(TransferOp::StageIn, &mut report.attempts, || {
            self.store
                .sync_down(&job.s3_input_path, &layout.fastq_path, &filter)
        })?;
        check_staged(format!("input {}", job.s3_input_path), status)?;

        report.state = JobState::RunTool;
        info!(
            "Running partition {} of {}",
            job.partition_id, job.num_partitions
        );
        let args = CountArgs {
            sample: sample.to_string(),
            fastqs: layout.fastq_path.clone(),
            transcriptome: genome_dir,
            expect_cells: job.cell_count,
            mode: job.mode,
        }
        .get_args();
        info!("{} {}", self.tool.name(), args.join(" "));
        let tool_failed = |exit_code, output| JobError::ToolExecutionFailure {
            tool: self.tool.name().to_string(),
            exit_code,
            output,
        };
        let out = self
            .tool
            .run(&args, &layout.result_path)
            .map_err(|err| tool_failed(None, err.to_string()))?;
        if !out.success() {
            error!("{}", out.output);
            return Err(tool_failed(out.exit_code, out.output));
        }
        info!("{}", out.output);

        report.state = JobState::SyncOutput;
        let outs = layout.outs_dir(sample);
        let destination = join_key(&job.s3_output_path, sample);
        info!("Uploading {} to {destination}", outs.display());
        let status = self
            .sync_policy
            .run(TransferOp::StageOut, &mut report.attempts, || {
                self.store
                    .sync_up(&outs, &destination, &TransferFilter::default())
            })?;
        if !status.is_success() {
            return Err(JobError::SyncRetryExhausted {
                destination,
                attempts: self.sync_policy.max_attempts.max(1),
            });
        }
        Ok(())
    }
}
