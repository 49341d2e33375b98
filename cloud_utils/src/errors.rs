//! Fatal object store errors. Ordinary transfer failures are not errors; they are
//! reported as a failed `TransferStatus` and retried by the caller.

/// A condition that no amount of retrying will fix.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// The URI has no scheme or no bucket.
    #[error("malformed object store URI {uri:?}: {reason}")]
    MalformedUri {
        /// The offending URI.
        uri: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The store rejected our credentials.
    #[error("object store rejected the credentials for `{command}`:\n{output}")]
    Auth {
        /// The command that was rejected.
        command: String,
        /// Captured output of the command.
        output: String,
    },

    /// The client binary could not be started at all.
    #[error("failed to launch `{command}`")]
    Launch {
        /// The command that failed to start.
        command: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A listing request failed.
    #[error("listing s3://{bucket}/{prefix} failed:\n{output}")]
    Listing {
        /// Bucket being listed.
        bucket: String,
        /// Prefix being listed.
        prefix: String,
        /// Captured output of the failed request.
        output: String,
    },

    /// A listing response could not be parsed.
    #[error("could not parse the listing of s3://{bucket}/{prefix}")]
    ListingFormat {
        /// Bucket being listed.
        bucket: String,
        /// Prefix being listed.
        prefix: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}
