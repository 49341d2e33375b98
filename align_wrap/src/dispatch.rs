//! Fan a sample set out into one scheduler command per sample.
//!
//! Nothing is submitted from here: the printed lines form a shell script that is run
//! against the cluster scheduler.

use crate::errors::JobError;
use align_types::sample::FASTQ_SUFFIX;
use align_types::{
    describe_jobs, partition_by_filename, partition_by_folder, JobDescription, JobFlags,
    PartitionMode, ReferenceCatalog,
};
use cloud_utils::{list_immediate_subfolders, list_object_keys, ObjectStore, ObjectUri};
use itertools::Itertools;
use log::info;
use shell_escape::escape;
use std::borrow::Cow;

pub const SCHEDULER: &str = "evros";
pub const COUNT_ENTRY_POINT: &str = "alignment.run_10x_count";
pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_IMAGE: &str = "thsuanwu/cellranger";

/// Pause between consecutive submissions, so the scheduler API is not flooded.
pub const SETTLE_DELAY_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub taxon: String,
    /// Shared FASTQ prefix in filename mode, parent of the sample folders in folder mode.
    pub s3_input_path: String,
    pub s3_output_path: String,
    pub flags: JobFlags,
    /// Branch of the job scripts the scheduler checks out.
    pub branch: String,
    /// Container image the jobs run in.
    pub image: String,
}

impl DispatchRequest {
    /// The scheduler invocation for one job, shell-quoted.
    pub fn command_line(&self, job: &JobDescription) -> String {
        let mut args: Vec<String> = vec![
            SCHEDULER.to_string(),
            "--branch".to_string(),
            self.branch.clone(),
            COUNT_ENTRY_POINT.to_string(),
        ];
        if job.flags.glacier {
            args.push("--glacier".to_string());
        }
        args.extend([
            "--image".to_string(),
            self.image.clone(),
            "--taxon".to_string(),
            job.taxon.clone(),
            "--num_partitions".to_string(),
            job.num_partitions.to_string(),
            "--partition_id".to_string(),
            job.partition_id.to_string(),
            "--sample_prefix".to_string(),
            job.sample.name.clone(),
            "--s3_input_path".to_string(),
            job.s3_input_path().to_string(),
            "--s3_output_path".to_string(),
            job.s3_output_path.clone(),
        ]);
        if job.flags.mode == PartitionMode::ByFolder {
            args.push("--by_folder".to_string());
        }
        args.extend(job.flags.extra_args.iter().cloned());
        args.into_iter().map(|arg| escape(Cow::from(arg))).join(" ")
    }

    /// One command line per job, each followed by the settle delay.
    pub fn script(&self, jobs: &[JobDescription]) -> Vec<String> {
        jobs.iter()
            .flat_map(|job| [self.command_line(job), format!("sleep {SETTLE_DELAY_SECS}")])
            .collect()
    }
}

pub struct Dispatcher<'a, S: ?Sized> {
    catalog: &'a ReferenceCatalog,
    store: &'a S,
}

impl<'a, S: ObjectStore + ?Sized> Dispatcher<'a, S> {
    pub fn new(catalog: &'a ReferenceCatalog, store: &'a S) -> Self {
        Dispatcher { catalog, store }
    }

    /// Discover the samples under the input path and describe one job per sample.
    /// The taxon and both URIs are checked before anything is listed.
    pub fn plan(&self, request: &DispatchRequest) -> Result<Vec<JobDescription>, JobError> {
        self.catalog.resolve(&request.taxon)?;
        let input: ObjectUri = request.s3_input_path.parse()?;
        request.s3_output_path.parse::<ObjectUri>()?;

        let units = match request.flags.mode {
            PartitionMode::ByFolder => {
                let folders: Vec<String> =
                    list_immediate_subfolders(self.store, &input.bucket, &input.key)
                        .collect::<Result<_, _>>()?;
                partition_by_folder(folders, &input.bucket_uri())
            }
            PartitionMode::ByFilename => {
                let keys: Vec<String> = list_object_keys(
                    self.store,
                    &input.bucket,
                    &input.folder_key(),
                    FASTQ_SUFFIX,
                )
                .collect::<Result<_, _>>()?;
                partition_by_filename(keys, &input.to_string())
            }
        };
        info!(
            "found {} samples under {}",
            units.len(),
            request.s3_input_path
        );
        Ok(describe_jobs(
            units,
            &request.taxon,
            &request.s3_output_path,
            &request.flags,
        ))
    }
}
