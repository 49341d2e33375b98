//! Local working directory of a job.

use crate::errors::JobError;
use align_types::GenomeFormat;
use std::fs;
use std::path::{Path, PathBuf};

/// Set by AWS Batch to a value unique to each job.
pub const JOB_ID_ENV: &str = "AWS_BATCH_JOB_ID";

pub const DEFAULT_ROOT_DIR: &str = "/mnt";

pub fn job_id_from_env() -> Option<String> {
    std::env::var(JOB_ID_ENV).ok().filter(|id| !id.is_empty())
}

/// Last path segment of the input URI, ignoring one trailing `/`.
pub fn sample_id(s3_input_path: &str) -> &str {
    let path = s3_input_path.strip_suffix('/').unwrap_or(s3_input_path);
    path.rsplit('/').next().unwrap_or(path)
}

/// ```text
/// <root>[/<job id>]/
///     data/<sample id>/           result_path, the tool's working directory
///         [fastqs/]               fastq_path, only with --legacy
///     genome/<format>/            genome_base
///         <genome name>/
///     barcodes/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLayout {
    pub root: PathBuf,
    pub result_path: PathBuf,
    pub fastq_path: PathBuf,
    pub genome_base: PathBuf,
}

impl JobLayout {
    pub fn new(
        root_dir: &Path,
        job_id: Option<&str>,
        sample_id: &str,
        legacy: bool,
        format: GenomeFormat,
    ) -> Self {
        let root = match job_id {
            Some(job_id) => root_dir.join(job_id),
            None => root_dir.to_path_buf(),
        };
        let result_path = root.join("data").join(sample_id);
        let fastq_path = if legacy {
            result_path.join("fastqs")
        } else {
            result_path.clone()
        };
        let genome_base = root.join("genome").join(format.dir_name());
        JobLayout {
            root,
            result_path,
            fastq_path,
            genome_base,
        }
    }

    /// Where the extracted reference `genome` lives.
    pub fn genome_dir(&self, genome: &str) -> PathBuf {
        self.genome_base.join(genome)
    }

    /// cellranger writes its results to `<cwd>/<id>/outs`.
    pub fn outs_dir(&self, sample: &str) -> PathBuf {
        self.result_path.join(sample).join("outs")
    }

    pub fn barcode_dir(&self) -> PathBuf {
        self.root.join("barcodes")
    }

    /// Create the FASTQ and genome directories. Existing directories are reused.
    pub fn create(&self) -> Result<(), JobError> {
        for dir in [&self.fastq_path, &self.genome_base] {
            create_dir(dir)?;
        }
        Ok(())
    }
}

pub(crate) fn create_dir(path: &Path) -> Result<(), JobError> {
    fs::create_dir_all(path).map_err(|source| JobError::Setup {
        path: path.to_path_buf(),
        source,
    })
}
