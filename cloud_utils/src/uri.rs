//! `scheme://bucket/key` URIs.

use crate::errors::CloudError;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A parsed object store URI. The key is kept verbatim, including any trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUri {
    /// e.g. `s3`
    pub scheme: String,
    /// Bucket name, never empty.
    pub bucket: String,
    /// Object key or prefix, possibly empty.
    pub key: String,
}

impl ObjectUri {
    /// The URI of the bucket root, e.g. `s3://bucket`.
    pub fn bucket_uri(&self) -> String {
        format!("{}://{}", self.scheme, self.bucket)
    }

    /// The key as a folder prefix, see [`folder_prefix`].
    pub fn folder_key(&self) -> String {
        folder_prefix(&self.key)
    }
}

impl FromStr for ObjectUri {
    type Err = CloudError;

    fn from_str(uri: &str) -> Result<ObjectUri, CloudError> {
        let malformed = |reason: &'static str| CloudError::MalformedUri {
            uri: uri.to_string(),
            reason,
        };
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| malformed("missing scheme"))?;
        if scheme.is_empty() {
            return Err(malformed("missing scheme"));
        }
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(malformed("empty bucket"));
        }
        Ok(ObjectUri {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl Display for ObjectUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

/// Split a URI into its bucket and key.
pub fn bucket_and_key(uri: &str) -> Result<(String, String), CloudError> {
    let ObjectUri { bucket, key, .. } = uri.parse()?;
    Ok((bucket, key))
}

/// `prefix` with exactly one trailing `/`, so that listing `runs/run1` does not also
/// match `runs/run10`. The bucket root stays empty.
pub fn folder_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

/// Join a key or URI with a child path the way POSIX paths join: an absolute child wins,
/// otherwise exactly one `/` separates the two.
pub fn join_key(base: &str, child: &str) -> String {
    if child.starts_with('/') || base.is_empty() {
        child.to_string()
    } else if base.ends_with('/') {
        format!("{base}{child}")
    } else {
        format!("{base}/{child}")
    }
}
