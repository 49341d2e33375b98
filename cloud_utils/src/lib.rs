//! Object store access for alignment jobs: URI parsing, lazy listings, incremental
//! transfers and the retry policy applied to them.
#![deny(missing_docs)]

pub mod aws_cli;
pub mod errors;
pub mod listing;
pub mod retry;
pub mod store;
pub mod uri;

pub use aws_cli::AwsCli;
pub use errors::CloudError;
pub use listing::{list_immediate_subfolders, list_object_keys, ObjectKeys, Subfolders};
pub use retry::{AttemptOutcome, RetryPolicy, TransferAttempt, TransferOp};
pub use store::{
    ListPage, ListRequest, Location, ObjectStore, TransferFilter, TransferRequest, TransferStatus,
};
pub use uri::{bucket_and_key, folder_prefix, join_key, ObjectUri};
