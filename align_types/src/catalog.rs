//! Reference genome lookup tables.
//!
//! The tables are plain configuration: a `CatalogConfig` is built once at startup (either the
//! built-in defaults or a TOML override) and handed to a `ReferenceCatalog`, which validates it
//! and answers taxon, region and barcode-version queries.

use crate::errors::InputError;
use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use strum_macros::{Display, EnumString, IntoStaticStr};

const CELLRANGER_GENOMES: &[(&str, &str)] = &[
    ("homo", "HG38-PLUS"),
    ("hg38-plus", "HG38-PLUS"),
    (
        "homo.gencode.v30.annotation.ERCC92",
        "homo.gencode.v30.annotation.ERCC92",
    ),
    (
        "homo.gencode.v30.annotation.ERCC92_and_sars.cov2.wa1",
        "homo.gencode.v30.annotation.ERCC92_and_sars.cov2.wa1",
    ),
    (
        "homo.gencode.v30.annotation.ERCC92_and_sars.cov2.wa1.GCA_009937905.1",
        "homo.gencode.v30.annotation.ERCC92_and_sars.cov2.wa1.GCA_009937905.1",
    ),
    ("mus", "MM10-PLUS"),
    ("mm10-plus", "MM10-PLUS"),
    ("mm10-1.2.0", "mm10-1.2.0"),
    ("mus-premrna", "mm10-1.2.0-premrna"),
    ("mm10-1.2.0-premrna", "mm10-1.2.0-premrna"),
    ("hg19-mm10-3.0.0", "hg19-mm10-3.0.0"),
    ("microcebus", "MicMur3-PLUS"),
    ("gencode.vM19", "gencode.vM19"),
    ("GRCh38_premrna", "GRCh38_premrna"),
    ("zebrafish-plus", "danio_rerio_plus_STAR2.6.1d"),
    ("botryllus", "botryllus"),
    ("Mmur3-cellranger-7", "Mmur3-cellranger-7"),
];

const DEPRECATED_TAXA: &[(&str, &str)] = &[
    ("homo", "hg38-plus"),
    ("mus", "mm10-plus"),
    ("mus-premrna", "mm10-1.2.0-premrna"),
];

const STAR_GENOMES: &[(&str, &str)] = &[(
    "homo.gencode.v30.annotation.ERCC92_and_sars.cov2.wa1",
    "homo.gencode.v30.annotation.ERCC92_and_sars.cov2.wa1",
)];

const REFERENCE_BUCKETS: &[(&str, &str)] = &[
    ("east", "czbiohub-reference-east"),
    ("west", "czbiohub-reference"),
    ("krasnow", "czbiohub-reference-krasnow"),
];

/// Barcode whitelists by 10x chemistry version.
const BARCODES_10X: &[(&str, &str)] = &[
    ("10x3v3", "3M-february-2018.txt"),
    ("10x3v2", "737K-august-2016.txt"),
    ("10x3v1", "737K-april-2014_rc.txt"),
    ("10x5v1", "737K-august-2016.txt"),
    ("10x5v2", "737K-august-2016.txt"),
];

/// Region the jobs run in. Selects the bucket holding the reference genomes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Region {
    East,
    West,
    #[default]
    Krasnow,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::East, Region::West, Region::Krasnow];

    /// Lowercase name, as accepted by [`Region::parse`].
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn parse(s: &str) -> Result<Region, InputError> {
        s.parse()
            .map_err(|_| InputError::UnknownRegion(s.to_string()))
    }
}

/// Layout of a packaged reference, which depends on the aligner that consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenomeFormat {
    CellRanger,
    Star,
}

impl GenomeFormat {
    /// Directory name used both in the reference bucket and under `<root>/genome`.
    pub fn dir_name(self) -> &'static str {
        match self {
            GenomeFormat::CellRanger => "cellranger",
            GenomeFormat::Star => "STAR-2.7.9a",
        }
    }

    /// Object key of the gzipped tarball holding `genome`.
    pub fn archive_key(self, genome: &str) -> String {
        format!("{}/{genome}.tgz", self.dir_name())
    }

    /// Object key of a barcode whitelist file.
    pub fn whitelist_key(self, whitelist: &str) -> String {
        format!("{}/{whitelist}", self.dir_name())
    }
}

/// A resolved taxon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceGenome {
    pub taxon_key: String,
    pub canonical_name: String,
    pub is_deprecated: bool,
    pub replacement_key: Option<String>,
}

fn table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|&(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The raw lookup tables. Deserializable so a deployment can ship its own catalog as TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// taxon key -> canonical genome name
    pub genomes: BTreeMap<String, String>,
    /// deprecated taxon key -> recommended replacement key
    #[serde(default)]
    pub deprecated: BTreeMap<String, String>,
    /// region name -> reference bucket
    pub buckets: BTreeMap<String, String>,
    /// 10x chemistry version -> barcode whitelist file
    #[serde(default)]
    pub barcodes: BTreeMap<String, String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig::cellranger()
    }
}

impl CatalogConfig {
    /// Genomes packaged for `cellranger count`.
    pub fn cellranger() -> Self {
        CatalogConfig {
            genomes: table(CELLRANGER_GENOMES),
            deprecated: table(DEPRECATED_TAXA),
            buckets: table(REFERENCE_BUCKETS),
            barcodes: table(BARCODES_10X),
        }
    }

    /// Genomes packaged for STAR solo.
    pub fn star() -> Self {
        CatalogConfig {
            genomes: table(STAR_GENOMES),
            deprecated: BTreeMap::new(),
            buckets: table(REFERENCE_BUCKETS),
            barcodes: table(BARCODES_10X),
        }
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| path.display().to_string())?;
        toml::from_str(&s).with_context(|| path.display().to_string())
    }
}

#[derive(Debug, Clone)]
struct RegionBuckets {
    east: String,
    west: String,
    krasnow: String,
}

impl RegionBuckets {
    fn get(&self, region: Region) -> &str {
        match region {
            Region::East => &self.east,
            Region::West => &self.west,
            Region::Krasnow => &self.krasnow,
        }
    }
}

/// Validated, immutable view of a `CatalogConfig`.
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    config: CatalogConfig,
    buckets: RegionBuckets,
}

impl ReferenceCatalog {
    /// Check the tables for consistency: every deprecated key and its replacement must exist and
    /// name the same genome, and every region must have exactly one known bucket.
    pub fn new(config: CatalogConfig) -> Result<Self, InputError> {
        let invalid = InputError::InvalidCatalog;
        for (taxon, replacement) in &config.deprecated {
            let Some(genome) = config.genomes.get(taxon) else {
                return Err(invalid(format!(
                    "deprecated taxon {taxon} is not in the genome table"
                )));
            };
            let Some(replacement_genome) = config.genomes.get(replacement) else {
                return Err(invalid(format!(
                    "replacement {replacement} for deprecated taxon {taxon} is not in the genome table"
                )));
            };
            if genome != replacement_genome {
                return Err(invalid(format!(
                    "deprecated taxon {taxon} resolves to {genome} but its replacement \
                     {replacement} resolves to {replacement_genome}"
                )));
            }
        }

        for region in config.buckets.keys() {
            if Region::parse(region).is_err() {
                return Err(invalid(format!("unknown region {region} in bucket table")));
            }
        }
        let bucket = |region: Region| {
            config
                .buckets
                .get(&region.to_string())
                .cloned()
                .ok_or_else(|| invalid(format!("no reference bucket for region {region}")))
        };
        let buckets = RegionBuckets {
            east: bucket(Region::East)?,
            west: bucket(Region::West)?,
            krasnow: bucket(Region::Krasnow)?,
        };

        Ok(ReferenceCatalog { config, buckets })
    }

    /// All known taxon keys, sorted.
    pub fn taxa(&self) -> impl Iterator<Item = &str> + '_ {
        self.config.genomes.keys().map(String::as_str)
    }

    fn lookup(&self, taxon: &str) -> Result<&str, InputError> {
        self.config
            .genomes
            .get(taxon)
            .map(String::as_str)
            .ok_or_else(|| InputError::UnknownTaxon(taxon.to_string()))
    }

    /// Return the canonical genome name for `taxon`.
    /// Deprecated keys still resolve; a warning names the replacement.
    pub fn resolve(&self, taxon: &str) -> Result<&str, InputError> {
        let genome = self.lookup(taxon)?;
        if let Some(replacement) = self.config.deprecated.get(taxon) {
            warn!("The name '{taxon}' will be removed in the future, start using '{replacement}'");
        }
        Ok(genome)
    }

    pub fn genome(&self, taxon: &str) -> Result<ReferenceGenome, InputError> {
        let canonical_name = self.resolve(taxon)?.to_string();
        let replacement_key = self.config.deprecated.get(taxon).cloned();
        Ok(ReferenceGenome {
            taxon_key: taxon.to_string(),
            canonical_name,
            is_deprecated: replacement_key.is_some(),
            replacement_key,
        })
    }

    pub fn bucket(&self, region: Region) -> &str {
        self.buckets.get(region)
    }

    pub fn bucket_for(&self, region: &str) -> Result<&str, InputError> {
        Ok(self.bucket(Region::parse(region)?))
    }

    /// Barcode whitelist file for a 10x chemistry version, e.g. `10x3v3`.
    pub fn whitelist(&self, version_10x: &str) -> Result<&str, InputError> {
        self.config
            .barcodes
            .get(version_10x)
            .map(String::as_str)
            .ok_or_else(|| InputError::UnknownVersion(version_10x.to_string()))
    }

    /// Bucket and key of the packaged reference. The east bucket keeps everything under
    /// `ref-genome/`.
    pub fn reference_location(
        &self,
        region: Region,
        format: GenomeFormat,
        genome: &str,
    ) -> (&str, String) {
        let key = format.archive_key(genome);
        let key = match region {
            Region::East => format!("ref-genome/{key}"),
            Region::West | Region::Krasnow => key,
        };
        (self.bucket(region), key)
    }
}
