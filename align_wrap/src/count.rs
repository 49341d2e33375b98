use align_types::PartitionMode;
use std::path::PathBuf;

/// Memory cap passed to `cellranger count`, in GB. Without it cellranger takes 90% of
/// the machine.
pub const LOCALMEM_GB: usize = 240;

/// Expected number of recovered cells when the caller does not say.
pub const DEFAULT_CELL_COUNT: usize = 3000;

/// Arguments of one `cellranger count` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountArgs {
    /// Used both as the pipestance id and, in filename mode, as the FASTQ sample filter.
    pub sample: String,
    pub fastqs: PathBuf,
    pub transcriptome: PathBuf,
    pub expect_cells: usize,
    pub mode: PartitionMode,
}

impl CountArgs {
    /// Convert this struct into a vector of command line arguments.
    pub fn get_args(&self) -> Vec<String> {
        let sample_filter = match self.mode {
            PartitionMode::ByFilename => Some(format!("--sample={}", self.sample)),
            // Every sample in the folder.
            PartitionMode::ByFolder => None,
        };
        [
            "count".to_string(),
            format!("--localmem={LOCALMEM_GB}"),
            "--nosecondary".to_string(),
            "--disable-ui".to_string(),
            format!("--expect-cells={}", self.expect_cells),
            format!("--id={}", self.sample),
            format!("--fastqs={}", self.fastqs.display()),
            format!("--transcriptome={}", self.transcriptome.display()),
        ]
        .into_iter()
        .chain(sample_filter)
        .collect()
    }
}
