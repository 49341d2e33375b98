//! run_10x_count
#![deny(missing_docs)]

use align_types::{CatalogConfig, PartitionMode, Region};
use align_wrap::count::DEFAULT_CELL_COUNT;
use align_wrap::layout::{job_id_from_env, DEFAULT_ROOT_DIR};
use align_wrap::logging::init_logging;
use align_wrap::runner::{CountJob, JobRunner};
use align_wrap::tool::{Subprocess, CELLRANGER};
use align_wrap::utils::{load_catalog, print_error_chain, region_parser};
use anyhow::Result;
use clap::{self, Parser};
use cloud_utils::AwsCli;
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

/// Download a reference genome and the FASTQs of one sample, run `cellranger count` on
/// them, and upload the results.
#[derive(Parser, Debug)]
#[clap(name = "run_10x_count")]
struct Cli {
    /// Reference genome for the alignment run.
    #[clap(long, value_name = "TAXON")]
    taxon: String,

    /// The folder with the fastq.gz files to align.
    #[clap(long = "s3_input_path", value_name = "URI")]
    s3_input_path: String,

    /// The folder to store the alignment results.
    #[clap(long = "s3_output_path", value_name = "URI")]
    s3_output_path: String,

    /// Number of jobs the samples were split into.
    #[clap(long = "num_partitions", value_name = "NUM")]
    num_partitions: usize,

    /// Index of this job, less than --num_partitions.
    #[clap(long = "partition_id", value_name = "NUM")]
    partition_id: usize,

    /// Sample to align. Defaults to the last segment of --s3_input_path.
    #[clap(long = "sample_prefix", value_name = "NAME")]
    sample_prefix: Option<String>,

    /// Align every sample in the input folder rather than only --sample_prefix.
    #[clap(long = "by_folder")]
    by_folder: bool,

    /// Number of cells expected.
    #[clap(long = "cell_count", value_name = "NUM", default_value_t = DEFAULT_CELL_COUNT)]
    cell_count: usize,

    /// Region holding the reference genomes.
    #[clap(
        long,
        value_name = "REGION",
        value_parser = region_parser(),
        default_value_t = Region::default()
    )]
    region: Region,

    /// Restore archived FASTQs from cold storage.
    #[clap(long)]
    glacier: bool,

    /// Working directory of the job.
    #[clap(long = "root_dir", value_name = "PATH", default_value = DEFAULT_ROOT_DIR)]
    root_dir: PathBuf,

    /// FASTQs live in a fastqs/ subfolder, as in runs before 2019.
    #[clap(long)]
    legacy: bool,

    /// TOML file replacing the built-in reference tables.
    #[clap(long = "reference_config", value_name = "PATH", hide = true)]
    reference_config: Option<PathBuf>,
}

fn inner_main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging();

    let catalog = load_catalog(cli.reference_config.as_deref(), CatalogConfig::cellranger())?;
    let job = CountJob {
        taxon: cli.taxon,
        region: Some(cli.region.to_string()),
        s3_input_path: cli.s3_input_path,
        s3_output_path: cli.s3_output_path,
        sample_prefix: cli.sample_prefix,
        num_partitions: cli.num_partitions,
        partition_id: cli.partition_id,
        cell_count: cli.cell_count,
        mode: if cli.by_folder {
            PartitionMode::ByFolder
        } else {
            PartitionMode::ByFilename
        },
        glacier: cli.glacier,
        root_dir: cli.root_dir,
        job_id: job_id_from_env(),
        legacy: cli.legacy,
    };

    let store = AwsCli::default();
    let tool = Subprocess::new(CELLRANGER);
    let report = JobRunner::new(&catalog, &store, &tool).run(&job)?;
    info!(
        "partition {} of {} finished after {} transfers",
        job.partition_id,
        job.num_partitions,
        report.attempts.len()
    );
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    match inner_main() {
        Ok(exit_code) => exit_code,
        Err(err) => {
            print_error_chain(&err);
            ExitCode::FAILURE
        }
    }
}
