//! aws_10x
#![deny(missing_docs)]

use align_types::{CatalogConfig, JobFlags, PartitionMode};
use align_wrap::dispatch::{DispatchRequest, Dispatcher, DEFAULT_BRANCH, DEFAULT_IMAGE};
use align_wrap::logging::init_logging;
use align_wrap::utils::{load_catalog, print_error_chain};
use anyhow::{ensure, Result};
use clap::{self, Parser};
use cloud_utils::AwsCli;
use std::path::PathBuf;
use std::process::ExitCode;

/// Print a shell script that submits one `cellranger count` job per sample found under
/// the input path.
#[derive(Parser, Debug)]
#[clap(name = "aws_10x", allow_hyphen_values = true, trailing_var_arg = true)]
struct Cli {
    /// Reference genome for the alignment run.
    #[clap(long, value_name = "TAXON")]
    taxon: String,

    /// The folder containing the fastq.gz files to align, or with --by_folder the folder
    /// containing one folder per sample.
    #[clap(long = "s3_input_path", value_name = "URI")]
    s3_input_path: String,

    /// The folder to store the alignment results.
    #[clap(long = "s3_output_path", value_name = "URI")]
    s3_output_path: String,

    /// Treat each subfolder of the input path as one sample.
    #[clap(long = "by_folder")]
    by_folder: bool,

    /// Docker image.
    #[clap(long, default_value = DEFAULT_IMAGE)]
    image: String,

    /// Branch of the job scripts to use.
    #[clap(long, default_value = DEFAULT_BRANCH)]
    branch: String,

    /// Restore archived FASTQs from cold storage.
    #[clap(long)]
    glacier: bool,

    /// TOML file replacing the built-in reference tables.
    #[clap(long = "reference_config", value_name = "PATH", hide = true)]
    reference_config: Option<PathBuf>,

    /// Extra arguments are passed to run_10x_count.
    script_args: Vec<String>,
}

fn inner_main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging();

    let catalog = load_catalog(cli.reference_config.as_deref(), CatalogConfig::cellranger())?;
    let request = DispatchRequest {
        taxon: cli.taxon,
        s3_input_path: cli.s3_input_path,
        s3_output_path: cli.s3_output_path,
        flags: JobFlags {
            mode: if cli.by_folder {
                PartitionMode::ByFolder
            } else {
                PartitionMode::ByFilename
            },
            glacier: cli.glacier,
            extra_args: cli.script_args,
        },
        branch: cli.branch,
        image: cli.image,
    };

    let store = AwsCli::default();
    let jobs = Dispatcher::new(&catalog, &store).plan(&request)?;
    ensure!(
        !jobs.is_empty(),
        "no samples found under {}",
        request.s3_input_path
    );
    for line in request.script(&jobs) {
        println!("{line}");
    }
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
