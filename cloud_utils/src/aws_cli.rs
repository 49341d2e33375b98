//! [`ObjectStore`] backed by the `aws` command line client.

use crate::errors::CloudError;
use crate::store::{ListPage, ListRequest, Location, ObjectStore, TransferRequest, TransferStatus};
use itertools::Itertools;
use log::{debug, info};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Page size requested from `list-objects-v2`.
const PAGE_SIZE: usize = 1000;

/// Substrings of client output that mean retrying cannot help.
const AUTH_MARKERS: &[&str] = &[
    "InvalidAccessKeyId",
    "ExpiredToken",
    "SignatureDoesNotMatch",
    "Unable to locate credentials",
    "AccessDenied",
];

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ObjectEntry {
    key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PrefixEntry {
    prefix: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct ListObjectsOutput {
    #[serde(default)]
    contents: Option<Vec<ObjectEntry>>,
    #[serde(default)]
    common_prefixes: Option<Vec<PrefixEntry>>,
    #[serde(default)]
    next_token: Option<String>,
}

impl From<ListObjectsOutput> for ListPage {
    fn from(output: ListObjectsOutput) -> ListPage {
        ListPage {
            keys: output
                .contents
                .unwrap_or_default()
                .into_iter()
                .map(|o| o.key)
                .collect(),
            common_prefixes: output
                .common_prefixes
                .unwrap_or_default()
                .into_iter()
                .map(|p| p.prefix)
                .collect(),
            next: output.next_token,
        }
    }
}

fn parse_list_output(
    stdout: &str,
    request: &ListRequest,
) -> Result<ListPage, CloudError> {
    // list-objects-v2 prints nothing at all for an empty prefix.
    if stdout.trim().is_empty() {
        return Ok(ListPage::default());
    }
    let output: ListObjectsOutput =
        serde_json::from_str(stdout).map_err(|source| CloudError::ListingFormat {
            bucket: request.bucket.clone(),
            prefix: request.prefix.clone(),
            source,
        })?;
    Ok(output.into())
}

fn is_auth_failure(output: &str) -> bool {
    AUTH_MARKERS.iter().any(|marker| output.contains(marker))
}

/// Captured result of one client invocation.
struct Invocation {
    command: String,
    success: bool,
    exit_code: Option<i32>,
    stdout: String,
    output: String,
}

/// Runs `aws` subcommands.
#[derive(Debug, Clone)]
pub struct AwsCli {
    program: PathBuf,
}

impl Default for AwsCli {
    fn default() -> Self {
        AwsCli {
            program: PathBuf::from("aws"),
        }
    }
}

impl AwsCli {
    /// Use the client at `program` instead of `aws` from the PATH.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        AwsCli {
            program: program.into(),
        }
    }

    fn invoke(&self, args: &[OsString]) -> Result<Invocation, CloudError> {
        let command = std::iter::once(self.program.as_os_str())
            .chain(args.iter().map(OsString::as_os_str))
            .map(|arg| arg.to_string_lossy())
            .join(" ");
        debug!("running {command}");
        let out = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| CloudError::Launch {
                command: command.clone(),
                source,
            })?;
        let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
        let output = format!("{stdout}{}", String::from_utf8_lossy(&out.stderr));
        if !out.status.success() && is_auth_failure(&output) {
            return Err(CloudError::Auth { command, output });
        }
        Ok(Invocation {
            command,
            success: out.status.success(),
            exit_code: out.status.code(),
            stdout,
            output,
        })
    }

    fn status(invocation: Invocation) -> TransferStatus {
        if invocation.success {
            TransferStatus::Success
        } else {
            info!("`{}` failed:\n{}", invocation.command, invocation.output);
            TransferStatus::Failed {
                exit_code: invocation.exit_code,
                output: invocation.output,
            }
        }
    }
}

fn location_arg(location: &Location) -> OsString {
    match location {
        Location::Remote(uri) => OsString::from(uri),
        Location::Local(path) => path.as_os_str().to_os_string(),
    }
}

fn list_args(request: &ListRequest, continuation: Option<&str>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "s3api".into(),
        "list-objects-v2".into(),
        "--output".into(),
        "json".into(),
        "--bucket".into(),
        request.bucket.as_str().into(),
        "--prefix".into(),
        request.prefix.as_str().into(),
        "--max-items".into(),
        PAGE_SIZE.to_string().into(),
    ];
    if let Some(delimiter) = &request.delimiter {
        args.push("--delimiter".into());
        args.push(delimiter.as_str().into());
    }
    if let Some(token) = continuation {
        args.push("--starting-token".into());
        args.push(token.into());
    }
    args
}

fn sync_args(request: &TransferRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "s3".into(),
        "sync".into(),
        "--no-progress".into(),
        location_arg(&request.source),
        location_arg(&request.destination),
    ];
    if let Some(include) = &request.filter.include {
        args.extend(["--exclude".into(), "*".into(), "--include".into()]);
        args.push(include.as_str().into());
    }
    if request.filter.force_glacier {
        args.push("--force-glacier-transfer".into());
    }
    args
}

impl ObjectStore for AwsCli {
    fn list_page(
        &self,
        request: &ListRequest,
        continuation: Option<&str>,
    ) -> Result<ListPage, CloudError> {
        let invocation = self.invoke(&list_args(request, continuation))?;
        if !invocation.success {
            return Err(CloudError::Listing {
                bucket: request.bucket.clone(),
                prefix: request.prefix.clone(),
                output: invocation.output,
            });
        }
        parse_list_output(&invocation.stdout, request)
    }

    fn transfer(&self, request: &TransferRequest) -> Result<TransferStatus, CloudError> {
        info!("syncing {} to {}", request.source, request.destination);
        Ok(AwsCli::status(self.invoke(&sync_args(request))?))
    }

    fn download_object(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
    ) -> Result<TransferStatus, CloudError> {
        let uri = format!("s3://{bucket}/{key}");
        info!("downloading {uri} to {}", dest.display());
        let args: Vec<OsString> = vec![
            "s3".into(),
            "cp".into(),
            "--no-progress".into(),
            uri.into(),
            dest.as_os_str().to_os_string(),
        ];
        Ok(AwsCli::status(self.invoke(&args)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TransferFilter;
    use pretty_assertions::assert_eq;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.into_string().unwrap())
            .collect()
    }

    fn request(delimiter: Option<&str>) -> ListRequest {
        ListRequest {
            bucket: "bucket".to_string(),
            prefix: "runs/".to_string(),
            delimiter: delimiter.map(String::from),
        }
    }

    #[test]
    fn test_parse_list_output() {
        let stdout = r#"{
            "Contents": [
                {"Key": "runs/S1_L001_R1_001.fastq.gz", "Size": 10},
                {"Key": "runs/S1_L001_R2_001.fastq.gz", "Size": 12}
            ],
            "NextToken": "abc"
        }"#;
        let page = parse_list_output(stdout, &request(None)).unwrap();
        assert_eq!(
            page,
            ListPage {
                keys: vec![
                    "runs/S1_L001_R1_001.fastq.gz".to_string(),
                    "runs/S1_L001_R2_001.fastq.gz".to_string()
                ],
                common_prefixes: vec![],
                next: Some("abc".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_common_prefixes() {
        let stdout = r#"{"CommonPrefixes": [{"Prefix": "runs/S1/"}, {"Prefix": "runs/S2/"}]}"#;
        let page = parse_list_output(stdout, &request(Some("/"))).unwrap();
        assert_eq!(page.common_prefixes, ["runs/S1/", "runs/S2/"]);
        assert!(page.keys.is_empty());
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_parse_empty_listing() {
        assert_eq!(
            parse_list_output("\n", &request(None)).unwrap(),
            ListPage::default()
        );
        assert!(matches!(
            parse_list_output("not json", &request(None)),
            Err(CloudError::ListingFormat { .. })
        ));
    }

    #[test]
    fn test_list_args() {
        assert_eq!(
            strings(list_args(&request(Some("/")), Some("tok"))),
            [
                "s3api",
                "list-objects-v2",
                "--output",
                "json",
                "--bucket",
                "bucket",
                "--prefix",
                "runs/",
                "--max-items",
                "1000",
                "--delimiter",
                "/",
                "--starting-token",
                "tok"
            ]
        );
    }

    #[test]
    fn test_sync_args() {
        let request = TransferRequest {
            source: Location::Remote("s3://bucket/runs/".to_string()),
            destination: Location::Local(PathBuf::from("/mnt/job/data/S1")),
            filter: TransferFilter::containing("S1").glacier(true),
        };
        assert_eq!(
            strings(sync_args(&request)),
            [
                "s3",
                "sync",
                "--no-progress",
                "s3://bucket/runs/",
                "/mnt/job/data/S1",
                "--exclude",
                "*",
                "--include",
                "*S1*",
                "--force-glacier-transfer"
            ]
        );

        let request = TransferRequest {
            source: Location::Local(PathBuf::from("/mnt/job/data/S1/S1/outs")),
            destination: Location::Remote("s3://out/S1".to_string()),
            filter: TransferFilter::default(),
        };
        assert_eq!(
            strings(sync_args(&request)),
            [
                "s3",
                "sync",
                "--no-progress",
                "/mnt/job/data/S1/S1/outs",
                "s3://out/S1"
            ]
        );
    }

    #[test]
    fn test_auth_markers() {
        assert!(is_auth_failure(
            "An error occurred (ExpiredToken) when calling the ListObjectsV2 operation"
        ));
        assert!(!is_auth_failure("Connection was closed before we received a valid response"));
    }

    /// Install an executable `aws` stand-in running `body` under `dir`.
    fn stub_client(dir: &Path, body: &str) -> AwsCli {
        use std::os::unix::fs::PermissionsExt;
        let program = dir.join("aws");
        std::fs::write(&program, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
        AwsCli::with_program(program)
    }

    #[test]
    fn test_transient_failure_is_a_status() {
        let dir = tempfile::tempdir().unwrap();
        let cli = stub_client(
            dir.path(),
            "echo 'upload failed: Connection reset by peer' >&2; exit 1",
        );
        let status = cli
            .sync_up(dir.path(), "s3://out/S1", &TransferFilter::default())
            .unwrap();
        match status {
            TransferStatus::Failed { exit_code, output } => {
                assert_eq!(exit_code, Some(1));
                assert!(output.contains("Connection reset by peer"));
            }
            TransferStatus::Success => panic!("expected a failed transfer"),
        }

        let cli = stub_client(dir.path(), "exit 0");
        assert_eq!(
            cli.sync_down("s3://in/runs/", dir.path(), &TransferFilter::default())
                .unwrap(),
            TransferStatus::Success
        );
    }

    #[test]
    fn test_expired_credentials_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let cli = stub_client(
            dir.path(),
            "echo 'An error occurred (ExpiredToken) when calling the ListObjectsV2 operation' >&2\nexit 255",
        );
        assert!(matches!(
            cli.sync_up(dir.path(), "s3://out/S1", &TransferFilter::default()),
            Err(CloudError::Auth { .. })
        ));
        assert!(matches!(
            cli.list_page(&request(None), None),
            Err(CloudError::Auth { .. })
        ));
        assert!(matches!(
            cli.download_object("bucket", "ref.tgz", &dir.path().join("ref.tgz")),
            Err(CloudError::Auth { .. })
        ));
    }

    #[test]
    fn test_malformed_uri_never_runs_the_client() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let cli = stub_client(dir.path(), &format!("touch '{}'", marker.display()));
        assert!(matches!(
            cli.sync_up(dir.path(), "b/k", &TransferFilter::default()),
            Err(CloudError::MalformedUri { .. })
        ));
        assert!(matches!(
            cli.sync_down("s3:///k", dir.path(), &TransferFilter::default()),
            Err(CloudError::MalformedUri { .. })
        ));
        assert!(!marker.exists());
    }

    #[test]
    fn test_missing_program() {
        let cli = AwsCli::with_program("/nonexistent/aws");
        assert!(matches!(
            cli.list_page(&request(None), None),
            Err(CloudError::Launch { .. })
        ));
    }
}
