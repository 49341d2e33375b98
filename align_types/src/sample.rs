//! Discover the samples under an input prefix and order them into partitions.

use serde::Serialize;
use std::collections::BTreeSet;

/// bcl2fastq writes reads it could not assign to any sample under this name.
pub const UNDETERMINED: &str = "Undetermined";

/// Only keys with this suffix are considered when grouping by filename.
pub const FASTQ_SUFFIX: &str = "fastq.gz";

/// Number of `_`-separated fields in the Illumina suffix `_S1_L001_R1_001.fastq.gz`.
const ILLUMINA_SUFFIX_FIELDS: usize = 4;

/// How samples are found under the input prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PartitionMode {
    /// FASTQs of every sample share one folder; samples are told apart by filename prefix.
    #[default]
    ByFilename,
    /// Each immediate subfolder holds one sample.
    ByFolder,
}

/// One independently alignable sample.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SampleUnit {
    /// Sample prefix, or folder name in folder mode.
    pub name: String,
    /// Where the sample's FASTQs live.
    pub input_uri: String,
}

/// Strip the directory and the Illumina suffix from an object key:
/// `runs/heart_1k_S1_L002_R2_001.fastq.gz` becomes `heart_1k`.
/// The last four `_`-separated fields are dropped whether or not they look like
/// `S#_L###_R#_001`; a name without any `_` is returned whole.
pub fn sample_prefix(key: &str) -> &str {
    let basename = key.rsplit('/').next().unwrap_or(key);
    basename
        .rsplitn(ILLUMINA_SUFFIX_FIELDS + 1, '_')
        .last()
        .unwrap_or(basename)
}

/// Group FASTQ keys into samples by filename prefix. All samples share `input_uri`.
/// The `Undetermined` bucket is never a sample. The result is sorted by name so that
/// partition ids are reproducible for a given input set.
pub fn partition_by_filename<I, S>(keys: I, input_uri: &str) -> Vec<SampleUnit>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut prefixes: BTreeSet<String> = keys
        .into_iter()
        .map(|key| sample_prefix(key.as_ref()).to_string())
        .collect();
    prefixes.remove(UNDETERMINED);

    prefixes
        .into_iter()
        .map(|name| SampleUnit {
            name,
            input_uri: input_uri.to_string(),
        })
        .collect()
}

/// One sample per folder prefix (e.g. `runs/S1/`), located under `bucket_uri`
/// (e.g. `s3://bucket`). The folder's last path segment names the sample.
///
/// Unlike filename mode, a folder called `Undetermined` is kept.
pub fn partition_by_folder<I, S>(folders: I, bucket_uri: &str) -> Vec<SampleUnit>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let bucket_uri = bucket_uri.trim_end_matches('/');
    let units: BTreeSet<SampleUnit> = folders
        .into_iter()
        .filter_map(|folder| {
            let folder = folder.as_ref();
            let name = folder.trim_end_matches('/').rsplit('/').next()?;
            (!name.is_empty()).then(|| SampleUnit {
                name: name.to_string(),
                input_uri: format!("{bucket_uri}/{folder}"),
            })
        })
        .collect();
    units.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const INPUT: &str = "s3://bucket/run1";

    fn names(units: &[SampleUnit]) -> Vec<&str> {
        units.iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn test_sample_prefix() {
        assert_eq!(sample_prefix("heart_1k_v3_S1_L002_R2_001.fastq.gz"), "heart_1k_v3");
        assert_eq!(sample_prefix("a/b/heart-1k_S1_L002_R2_001.fastq.gz"), "heart-1k");
        assert_eq!(sample_prefix("S1_L001_R1_001.fastq.gz"), "S1");
        assert_eq!(sample_prefix("plain.fastq.gz"), "plain.fastq.gz");
    }

    #[test]
    fn test_partition_by_filename() {
        let keys = [
            "S1_S1_L001_R1_001.fastq.gz",
            "S1_S1_L001_R2_001.fastq.gz",
            "S2_S1_L001_R1_001.fastq.gz",
            "Undetermined_S0_L001_R1_001.fastq.gz",
        ];
        let units = partition_by_filename(keys, INPUT);
        assert_eq!(
            units,
            vec![
                SampleUnit {
                    name: "S1".to_string(),
                    input_uri: INPUT.to_string(),
                },
                SampleUnit {
                    name: "S2".to_string(),
                    input_uri: INPUT.to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_partition_by_filename_is_sorted() {
        let keys = [
            "run1/zeta_S3_L001_R1_001.fastq.gz",
            "run1/alpha_S1_L002_R1_001.fastq.gz",
            "run1/mid_S2_L001_R2_001.fastq.gz",
            "run1/alpha_S1_L001_R1_001.fastq.gz",
        ];
        assert_eq!(
            names(&partition_by_filename(keys, INPUT)),
            ["alpha", "mid", "zeta"]
        );
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition_by_filename(Vec::<String>::new(), INPUT).is_empty());
        assert!(partition_by_filename(["Undetermined_S0_L001_R1_001.fastq.gz"], INPUT).is_empty());
        assert!(partition_by_folder(Vec::<String>::new(), "s3://bucket").is_empty());
    }

    #[test]
    fn test_partition_by_folder() {
        let folders = ["runs/S2/", "runs/S1/", "runs/Undetermined/", "runs/S1/"];
        let units = partition_by_folder(folders, "s3://bucket/");
        assert_eq!(names(&units), ["S1", "S2", "Undetermined"]);
        assert_eq!(units[0].input_uri, "s3://bucket/runs/S1/");
    }

    fn illumina_key() -> impl Strategy<Value = String> {
        (
            prop_oneof![Just("Undetermined".to_string()), "[A-Za-z][A-Za-z0-9_-]{0,12}"],
            1..20usize,
            1..5usize,
            1..3usize,
        )
            .prop_map(|(sample, s, lane, read)| {
                format!("prefix/{sample}_S{s}_L{lane:03}_R{read}_001.fastq.gz")
            })
    }

    proptest! {
        #[test]
        fn prop_units_unique_and_determined(keys in proptest::collection::vec(illumina_key(), 0..40)) {
            let units = partition_by_filename(&keys, INPUT);
            let unique: BTreeSet<_> = units.iter().map(|u| &u.name).collect();
            prop_assert_eq!(unique.len(), units.len());
            prop_assert!(units.iter().all(|u| u.name != UNDETERMINED));
            prop_assert!(units.windows(2).all(|w| w[0].name < w[1].name));
        }

        #[test]
        fn prop_partition_order_independent(mut keys in proptest::collection::vec(illumina_key(), 0..40)) {
            let forward = partition_by_filename(&keys, INPUT);
            keys.reverse();
            prop_assert_eq!(forward, partition_by_filename(&keys, INPUT));
        }
    }
}
