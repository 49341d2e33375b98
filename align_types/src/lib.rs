// Warning groups (as of rust 1.55)
#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_compatibility,
    rust_2021_compatibility,
    rust_2018_idioms,
    unused
)]

//! Value types shared by the alignment job dispatcher and runners: the reference catalog,
//! sample discovery and partitioning, and per-partition job descriptions.

pub mod catalog;
pub mod errors;
pub mod job;
pub mod sample;

pub use catalog::{CatalogConfig, GenomeFormat, ReferenceCatalog, ReferenceGenome, Region};
pub use errors::InputError;
pub use job::{describe_jobs, validate_partition, JobDescription, JobFlags};
pub use sample::{partition_by_filename, partition_by_folder, PartitionMode, SampleUnit};
