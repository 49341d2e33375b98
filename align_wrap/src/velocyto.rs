//! Front end of the STAR solo RNA velocity job.
//!
//! Only validation and the local layout are enabled so far; the job stops after
//! logging what it would stage.

use crate::errors::JobError;
use crate::layout::{create_dir, sample_id, JobLayout};
use align_types::{validate_partition, GenomeFormat, PartitionMode, ReferenceCatalog, Region};
use log::info;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VelocytoJob {
    pub taxon: String,
    /// 10x chemistry, e.g. `10x3v3`. Selects the barcode whitelist.
    pub version_10x: String,
    pub sample_prefix: Option<String>,
    pub s3_input_path: String,
    pub s3_output_path: String,
    pub num_partitions: usize,
    pub partition_id: usize,
    pub mode: PartitionMode,
    pub input_dirs: Vec<String>,
    /// Process samples even when results already exist.
    pub force_redo: bool,
    pub glacier: bool,
    pub root_dir: PathBuf,
    pub job_id: Option<String>,
    pub legacy: bool,
}

/// What the job would stage, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VelocytoPlan {
    pub sample: String,
    pub layout: JobLayout,
    pub genome_dir: PathBuf,
    pub reference_bucket: String,
    pub reference_key: String,
    pub barcode_dir: PathBuf,
    pub whitelist_key: String,
}

/// Validate `job` against a STAR catalog, then create the job's directories.
pub fn plan_velocyto(
    catalog: &ReferenceCatalog,
    job: &VelocytoJob,
) -> Result<VelocytoPlan, JobError> {
    let genome = catalog.resolve(&job.taxon)?;
    let whitelist = catalog.whitelist(&job.version_10x)?;
    validate_partition(job.partition_id, job.num_partitions)?;

    let sample_id = sample_id(&job.s3_input_path);
    let layout = JobLayout::new(
        &job.root_dir,
        job.job_id.as_deref(),
        sample_id,
        job.legacy,
        GenomeFormat::Star,
    );
    let (bucket, reference_key) =
        catalog.reference_location(Region::default(), GenomeFormat::Star, genome);
    let plan = VelocytoPlan {
        sample: job
            .sample_prefix
            .clone()
            .unwrap_or_else(|| sample_id.to_string()),
        genome_dir: layout.genome_dir(genome),
        reference_bucket: bucket.to_string(),
        reference_key,
        barcode_dir: layout.barcode_dir().join(&job.version_10x),
        whitelist_key: GenomeFormat::Star.whitelist_key(whitelist),
        layout,
    };

    plan.layout.create()?;
    create_dir(&plan.layout.barcode_dir())?;

    info!(
        "Run Info: partition {} out of {}\n\
         \tgenome_dir:\t{}\n\
         \tref_genome_10x_file:\t{}\n\
         \ttaxon:\t{}\n\
         \t10x version:\t{}\n\
         \ts3_input_path:\t{}\n\
         \ts3_output_path:\t{}\n\
         \tinput_dirs:\t{}\n\
         \tmode:\t{:?} glacier: {} force_redo: {}",
        job.partition_id,
        job.num_partitions,
        plan.genome_dir.display(),
        plan.reference_key,
        job.taxon,
        job.version_10x,
        job.s3_input_path,
        job.s3_output_path,
        job.input_dirs.join(" "),
        job.mode,
        job.glacier,
        job.force_redo,
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use align_types::{CatalogConfig, InputError};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    const GENOME: &str = "homo.gencode.v30.annotation.ERCC92_and_sars.cov2.wa1";

    fn catalog() -> ReferenceCatalog {
        ReferenceCatalog::new(CatalogConfig::star()).unwrap()
    }

    fn job(root: &Path) -> VelocytoJob {
        VelocytoJob {
            taxon: GENOME.to_string(),
            version_10x: "10x3v3".to_string(),
            sample_prefix: None,
            s3_input_path: "s3://input-bucket/runs/S1/".to_string(),
            s3_output_path: "s3://output-bucket/velocyto".to_string(),
            num_partitions: 1,
            partition_id: 0,
            mode: PartitionMode::ByFolder,
            input_dirs: vec!["runs/S1".to_string()],
            force_redo: false,
            glacier: false,
            root_dir: root.to_path_buf(),
            job_id: Some("job-7".to_string()),
            legacy: false,
        }
    }

    #[test]
    fn test_plan() {
        let root = tempfile::tempdir().unwrap();
        let plan = plan_velocyto(&catalog(), &job(root.path())).unwrap();
        let job_root = root.path().join("job-7");

        assert_eq!(plan.sample, "S1");
        assert_eq!(plan.reference_bucket, "czbiohub-reference-krasnow");
        assert_eq!(plan.reference_key, format!("STAR-2.7.9a/{GENOME}.tgz"));
        assert_eq!(plan.whitelist_key, "STAR-2.7.9a/3M-february-2018.txt");
        assert_eq!(plan.genome_dir, job_root.join("genome/STAR-2.7.9a").join(GENOME));
        assert_eq!(plan.barcode_dir, job_root.join("barcodes/10x3v3"));
        assert!(job_root.join("data/S1").is_dir());
        assert!(job_root.join("genome/STAR-2.7.9a").is_dir());
        assert!(job_root.join("barcodes").is_dir());
    }

    #[test]
    fn test_rejects_bad_input_before_creating_anything() {
        let root = tempfile::tempdir().unwrap();
        let catalog = catalog();

        let cellranger_only = VelocytoJob {
            taxon: "hg38-plus".to_string(),
            ..job(root.path())
        };
        assert!(matches!(
            plan_velocyto(&catalog, &cellranger_only),
            Err(JobError::Input(InputError::UnknownTaxon(_)))
        ));

        let bad_version = VelocytoJob {
            version_10x: "10x3v4".to_string(),
            ..job(root.path())
        };
        assert!(matches!(
            plan_velocyto(&catalog, &bad_version),
            Err(JobError::Input(InputError::UnknownVersion(_)))
        ));

        let bad_partition = VelocytoJob {
            partition_id: 1,
            ..job(root.path())
        };
        assert!(matches!(
            plan_velocyto(&catalog, &bad_partition),
            Err(JobError::Input(InputError::InvalidPartition { .. }))
        ));
        assert!(!root.path().join("job-7").exists());
    }
}
