//! run_10x_velocyto
#![deny(missing_docs)]

use align_types::{CatalogConfig, PartitionMode};
use align_wrap::layout::{job_id_from_env, DEFAULT_ROOT_DIR};
use align_wrap::logging::init_logging;
use align_wrap::utils::{load_catalog, print_error_chain};
use align_wrap::velocyto::{plan_velocyto, VelocytoJob};
use anyhow::Result;
use clap::{self, Parser};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

/// Run expression dynamics (RNA velocity) analysis on 10x fastq data using STAR solo.
#[derive(Parser, Debug)]
#[clap(name = "run_10x_velocyto")]
struct Cli {
    /// Reference genome. Choose the same genome used in the alignment job.
    #[clap(long, value_name = "TAXON")]
    taxon: String,

    /// 10x chemistry, selecting the barcode whitelist: 10x3v1, 10x3v2, 10x3v3, 10x5v1 or
    /// 10x5v2.
    #[clap(long = "version_10x", value_name = "VERSION")]
    version_10x: String,

    /// Sample prefix. Defaults to the last segment of --s3_input_path.
    #[clap(long = "sample_prefix", value_name = "NAME")]
    sample_prefix: Option<String>,

    /// The folder with the fastq.gz files to align.
    #[clap(long = "s3_input_path", value_name = "URI")]
    s3_input_path: String,

    /// Location for output.
    #[clap(long = "s3_output_path", value_name = "URI")]
    s3_output_path: String,

    /// Number of velocyto jobs to launch.
    #[clap(long = "num_partitions", value_name = "NUM")]
    num_partitions: usize,

    /// Index of this job, less than --num_partitions.
    #[clap(long = "partition_id", value_name = "NUM")]
    partition_id: usize,

    /// Treat the input folder as one sample.
    #[clap(long = "by_folder")]
    by_folder: bool,

    /// Input folders to process.
    #[clap(long = "input_dirs", value_name = "DIR", num_args = 1.., required = true)]
    input_dirs: Vec<String>,

    /// Process files even when results already exist.
    #[clap(long = "force_redo")]
    force_redo: bool,

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

    let catalog = load_catalog(cli.reference_config.as_deref(), CatalogConfig::star())?;
    let job = VelocytoJob {
        taxon: cli.taxon,
        version_10x: cli.version_10x,
        sample_prefix: cli.sample_prefix,
        s3_input_path: cli.s3_input_path,
        s3_output_path: cli.s3_output_path,
        num_partitions: cli.num_partitions,
        partition_id: cli.partition_id,
        mode: if cli.by_folder {
            PartitionMode::ByFolder
        } else {
            PartitionMode::ByFilename
        },
        input_dirs: cli.input_dirs,
        force_redo: cli.force_redo,
        glacier: cli.glacier,
        root_dir: cli.root_dir,
        job_id: job_id_from_env(),
        legacy: cli.legacy,
    };
    let plan = plan_velocyto(&catalog, &job)?;
    info!(
        "prepared {} for sample {}; staging and STAR solo are not enabled",
        plan.layout.root.display(),
        plan.sample
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
