//! Fetching dataset subsets from the Hugging Face hub through its CLI.

use crate::error::PipelineError;
use crate::tool::{OutputMode, ToolInvocation, ToolRunner};
use std::path::PathBuf;
use tracing::info;

/// One subset folder of a hub dataset repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Hub CLI executable.
    pub cli: PathBuf,
    /// Dataset repository id, e.g. `user/scans`.
    pub repo_id: String,
    /// Folder inside the repository to fetch.
    pub subset: String,
    pub local_dir: PathBuf,
}

impl DownloadRequest {
    pub fn new(repo_id: impl Into<String>, subset: impl Into<String>) -> Self {
        Self {
            cli: PathBuf::from("huggingface-cli"),
            repo_id: repo_id.into(),
            subset: subset.into(),
            local_dir: PathBuf::from("./data"),
        }
    }

    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_dir = dir.into();
        self
    }

    pub fn invocation(&self) -> ToolInvocation {
        ToolInvocation::new(&self.cli, "download")
            .arg(&self.repo_id)
            .opt("repo-type", "dataset")
            .opt("include", format!("{}/*", self.subset.trim_end_matches('/')))
            .path("local-dir", &self.local_dir)
    }

    /// Where the subset lands once downloaded.
    pub fn target_dir(&self) -> PathBuf {
        self.local_dir.join(self.subset.trim_end_matches('/'))
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.repo_id.contains('/') {
            return Err(PipelineError::InvalidConfig(format!(
                "repo id '{}' should look like 'owner/name'",
                self.repo_id
            )));
        }
        if self.subset.trim_matches('/').is_empty() {
            return Err(PipelineError::InvalidConfig("subset must not be empty".into()));
        }
        Ok(())
    }
}

/// Download the subset and return its local directory.
pub fn download_subset<R: ToolRunner>(runner: &R, request: &DownloadRequest) -> Result<PathBuf, PipelineError> {
    request.validate()?;
    runner.run_checked(&request.invocation(), OutputMode::Inherit)?;
    let target = request.target_dir();
    info!("Subset '{}' downloaded to {}", request.subset, target.display());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolOutput;
    use crate::tool::testing::ScriptedRunner;
    use std::ffi::OsStr;

    #[test]
    fn test_invocation() {
        let request = DownloadRequest::new("lab/plant-scans", "human/").with_local_dir("/datasets");
        let inv = request.invocation();

        assert_eq!(
            inv.to_string(),
            "huggingface-cli download lab/plant-scans --repo-type dataset --include human/* --local-dir /datasets"
        );
        assert_eq!(inv.value_of("include"), Some(OsStr::new("human/*")));
        assert_eq!(request.target_dir(), PathBuf::from("/datasets/human"));
    }

    #[test]
    fn test_download_runs_cli_once() {
        let runner = ScriptedRunner::succeeding();
        let request = DownloadRequest::new("lab/plant-scans", "human");

        let target = download_subset(&runner, &request).unwrap();
        assert_eq!(target, PathBuf::from("./data/human"));
        assert_eq!(runner.subcommands(), ["download"]);
    }

    #[test]
    fn test_failures() {
        let runner = ScriptedRunner::new(|_| ToolOutput::failure(1));
        let request = DownloadRequest::new("lab/plant-scans", "human");
        assert!(matches!(
            download_subset(&runner, &request),
            Err(PipelineError::ToolFailed { .. })
        ));

        let bad = DownloadRequest::new("no-owner", "human");
        assert!(download_subset(&runner, &bad).is_err());
        assert_eq!(runner.calls.borrow().len(), 1);
    }
}
