//! In-memory object store and tool used by the runner and dispatcher tests.

use crate::archive::write_tgz;
use crate::tool::{ExternalTool, ToolOutput};
use cloud_utils::{
    CloudError, ListPage, ListRequest, Location, ObjectStore, TransferRequest, TransferStatus,
};
use std::cell::{Cell, RefCell};
use std::io;
use std::path::{Path, PathBuf};

fn failed(output: &str) -> TransferStatus {
    TransferStatus::Failed {
        exit_code: Some(1),
        output: output.to_string(),
    }
}

#[derive(Default)]
pub(crate) struct MockStore {
    pub keys: Vec<String>,
    pub folders: Vec<String>,
    pub page_size: usize,
    /// Fail this many uploads before letting one through.
    pub sync_up_failures: Cell<u32>,
    pub fail_download: bool,
    pub fail_sync_down: bool,
    pub list_calls: Cell<usize>,
    pub downloads: RefCell<Vec<(String, String)>>,
    pub transfers: RefCell<Vec<TransferRequest>>,
}

impl MockStore {
    pub fn with_keys(keys: &[&str]) -> Self {
        MockStore {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            page_size: 2,
            ..MockStore::default()
        }
    }

    pub fn with_folders(folders: &[&str]) -> Self {
        MockStore {
            folders: folders.iter().map(|k| k.to_string()).collect(),
            page_size: 2,
            ..MockStore::default()
        }
    }

    /// Every call that would have reached the network.
    pub fn calls(&self) -> usize {
        self.list_calls.get() + self.downloads.borrow().len() + self.transfers.borrow().len()
    }

    pub fn uploads(&self) -> Vec<TransferRequest> {
        self.transfers
            .borrow()
            .iter()
            .filter(|t| matches!(t.destination, Location::Remote(_)))
            .cloned()
            .collect()
    }
}

impl ObjectStore for MockStore {
    fn list_page(
        &self,
        request: &ListRequest,
        continuation: Option<&str>,
    ) -> Result<ListPage, CloudError> {
        self.list_calls.set(self.list_calls.get() + 1);
        let source = if request.delimiter.is_some() {
            &self.folders
        } else {
            &self.keys
        };
        let matching: Vec<String> = source
            .iter()
            .filter(|k| k.starts_with(&request.prefix))
            .cloned()
            .collect();
        let start: usize = continuation.map_or(0, |c| c.parse().unwrap());
        let end = (start + self.page_size.max(1)).min(matching.len());
        let entries = matching[start..end].to_vec();
        let next = (end < matching.len()).then(|| end.to_string());
        Ok(if request.delimiter.is_some() {
            ListPage {
                common_prefixes: entries,
                next,
                ..ListPage::default()
            }
        } else {
            ListPage {
                keys: entries,
                next,
                ..ListPage::default()
            }
        })
    }

    fn transfer(&self, request: &TransferRequest) -> Result<TransferStatus, CloudError> {
        self.transfers.borrow_mut().push(request.clone());
        if let Location::Remote(_) = request.destination {
            let remaining = self.sync_up_failures.get();
            if remaining > 0 {
                self.sync_up_failures.set(remaining - 1);
                return Ok(failed("upload failed: Connection reset by peer"));
            }
        } else if self.fail_sync_down {
            return Ok(failed("download failed: NoSuchBucket"));
        }
        Ok(TransferStatus::Success)
    }

    /// Writes a small reference tarball named after the key.
    fn download_object(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
    ) -> Result<TransferStatus, CloudError> {
        self.downloads
            .borrow_mut()
            .push((bucket.to_string(), key.to_string()));
        if self.fail_download {
            return Ok(failed("fatal error: An error occurred (404)"));
        }
        let name = key.rsplit('/').next().unwrap().trim_end_matches(".tgz");
        let entry = format!("{name}/reference.json");
        write_tgz(dest, &[(entry.as_str(), &b"{}"[..])]).unwrap();
        Ok(TransferStatus::Success)
    }
}

pub(crate) struct FakeTool {
    pub exit_code: Option<i32>,
    pub runs: RefCell<Vec<(Vec<String>, PathBuf)>>,
}

impl FakeTool {
    pub fn exiting_with(exit_code: i32) -> Self {
        FakeTool {
            exit_code: Some(exit_code),
            runs: RefCell::new(Vec::new()),
        }
    }
}

impl ExternalTool for FakeTool {
    fn name(&self) -> &str {
        "cellranger"
    }

    fn run(&self, args: &[String], cwd: &Path) -> io::Result<ToolOutput> {
        self.runs
            .borrow_mut()
            .push((args.to_vec(), cwd.to_path_buf()));
        Ok(ToolOutput {
            exit_code: self.exit_code,
            output: "Pipestance completed successfully!".to_string(),
        })
    }
}
