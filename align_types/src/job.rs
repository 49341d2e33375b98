use crate::errors::InputError;
use crate::sample::{PartitionMode, SampleUnit};
use serde::Serialize;

/// Flags forwarded unchanged to every job of a dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobFlags {
    pub mode: PartitionMode,
    /// Restore archived inputs from cold storage before copying them.
    pub glacier: bool,
    /// Extra arguments for the job runner, passed through verbatim.
    pub extra_args: Vec<String>,
}

/// Everything one worker needs to process one sample. Consumed once by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDescription {
    pub taxon: String,
    pub sample: SampleUnit,
    pub partition_id: usize,
    pub num_partitions: usize,
    pub s3_output_path: String,
    pub flags: JobFlags,
}

impl JobDescription {
    pub fn s3_input_path(&self) -> &str {
        &self.sample.input_uri
    }
}

/// Assign partition ids `0..units.len()` in the order given. `units` is expected to be
/// the sorted output of one of the partitioners.
pub fn describe_jobs(
    units: Vec<SampleUnit>,
    taxon: &str,
    s3_output_path: &str,
    flags: &JobFlags,
) -> Vec<JobDescription> {
    let num_partitions = units.len();
    units
        .into_iter()
        .enumerate()
        .map(|(partition_id, sample)| JobDescription {
            taxon: taxon.to_string(),
            sample,
            partition_id,
            num_partitions,
            s3_output_path: s3_output_path.to_string(),
            flags: flags.clone(),
        })
        .collect()
}

pub fn validate_partition(partition_id: usize, num_partitions: usize) -> Result<(), InputError> {
    if partition_id < num_partitions {
        Ok(())
    } else {
        Err(InputError::InvalidPartition {
            partition_id,
            num_partitions,
        })
    }
}
