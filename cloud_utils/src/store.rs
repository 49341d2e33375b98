//! The object store capability used by the dispatcher and the job runners.

use crate::errors::CloudError;
use crate::uri::ObjectUri;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

/// Parameters of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Bucket to list.
    pub bucket: String,
    /// Only keys starting with this prefix are returned.
    pub prefix: String,
    /// Roll keys up to the first occurrence of the delimiter after the prefix, yielding
    /// "folders" as common prefixes.
    pub delimiter: Option<String>,
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Object keys on this page.
    pub keys: Vec<String>,
    /// Common prefixes on this page, only present for delimited listings.
    pub common_prefixes: Vec<String>,
    /// Continuation token for the next page, `None` on the last page.
    pub next: Option<String>,
}

/// One end of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// An object store URI.
    Remote(String),
    /// A local directory.
    Local(PathBuf),
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Location::Remote(uri) => f.write_str(uri),
            Location::Local(path) => Display::fmt(&path.display(), f),
        }
    }
}

/// Restrictions on a recursive transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferFilter {
    /// Glob pattern; when set, only matching objects are transferred.
    pub include: Option<String>,
    /// Restore objects archived in cold storage rather than skipping them.
    pub force_glacier: bool,
}

impl TransferFilter {
    /// Only transfer objects whose relative path contains `fragment`.
    pub fn containing(fragment: &str) -> TransferFilter {
        TransferFilter {
            include: Some(format!("*{fragment}*")),
            force_glacier: false,
        }
    }

    /// Set the cold storage flag.
    pub fn glacier(self, force_glacier: bool) -> TransferFilter {
        TransferFilter {
            force_glacier,
            ..self
        }
    }
}

/// A recursive, incremental copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Copy from here.
    pub source: Location,
    /// Copy to here.
    pub destination: Location,
    /// What to copy.
    pub filter: TransferFilter,
}

/// Result of a transfer that ran to completion, successfully or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    /// Everything was copied.
    Success,
    /// The transfer failed in a way that may be transient.
    Failed {
        /// Exit code of the client, if it exited normally.
        exit_code: Option<i32>,
        /// Captured client output.
        output: String,
    },
}

impl TransferStatus {
    /// True for `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, TransferStatus::Success)
    }
}

impl Display for TransferStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransferStatus::Success => write!(f, "succeeded"),
            TransferStatus::Failed {
                exit_code: Some(code),
                ..
            } => write!(f, "failed with exit code {code}"),
            TransferStatus::Failed {
                exit_code: None, ..
            } => write!(f, "failed"),
        }
    }
}

/// Primitive operations of an object store. Listing iterators live in [`crate::listing`].
///
/// Transfers return a `TransferStatus` for ordinary failures so that callers can own the
/// retry policy; an `Err` is always fatal.
pub trait ObjectStore {
    /// Fetch one page of a listing, starting after `continuation` when given.
    fn list_page(
        &self,
        request: &ListRequest,
        continuation: Option<&str>,
    ) -> Result<ListPage, CloudError>;

    /// Run a recursive, incremental copy.
    fn transfer(&self, request: &TransferRequest) -> Result<TransferStatus, CloudError>;

    /// Copy a single object to the local file `dest`.
    fn download_object(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
    ) -> Result<TransferStatus, CloudError>;

    /// Copy everything under `uri` that passes `filter` into the directory `local`.
    fn sync_down(
        &self,
        uri: &str,
        local: &Path,
        filter: &TransferFilter,
    ) -> Result<TransferStatus, CloudError> {
        uri.parse::<ObjectUri>()?;
        self.transfer(&TransferRequest {
            source: Location::Remote(uri.to_string()),
            destination: Location::Local(local.to_path_buf()),
            filter: filter.clone(),
        })
    }

    /// Copy everything under the directory `local` that passes `filter` to `uri`.
    fn sync_up(
        &self,
        local: &Path,
        uri: &str,
        filter: &TransferFilter,
    ) -> Result<TransferStatus, CloudError> {
        uri.parse::<ObjectUri>()?;
        self.transfer(&TransferRequest {
            source: Location::Local(local.to_path_buf()),
            destination: Location::Remote(uri.to_string()),
            filter: filter.clone(),
        })
    }
}
