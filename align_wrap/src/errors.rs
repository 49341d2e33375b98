use align_types::InputError;
use cloud_utils::CloudError;
use std::path::PathBuf;

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exited with code {code}"),
        None => "was killed by a signal".to_string(),
    }
}

/// Fatal job failures. Every variant aborts the job; nothing is retried past this point.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("could not create {}", .path.display())]
    Setup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The reference or the input FASTQs could not be staged.
    #[error("staging {what} failed:\n{output}")]
    StagingFailure { what: String, output: String },

    #[error("{tool} {}:\n{output}", describe_exit(.exit_code))]
    ToolExecutionFailure {
        tool: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("couldn't sync output to {destination} after {attempts} attempts")]
    SyncRetryExhausted { destination: String, attempts: u32 },
}
