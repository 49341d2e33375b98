/// Bad user input. Every variant is reported before any object store traffic happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown taxon {0}")]
    UnknownTaxon(String),

    #[error("unknown region {0}, expected one of: east, west, krasnow")]
    UnknownRegion(String),

    #[error("unknown 10x version {0}")]
    UnknownVersion(String),

    #[error(
        "partition_id {partition_id} is out of range, it must be less than num_partitions \
         ({num_partitions})"
    )]
    InvalidPartition {
        partition_id: usize,
        num_partitions: usize,
    },

    #[error("invalid reference catalog: {0}")]
    InvalidCatalog(String),
}
