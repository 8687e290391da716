use std::{path::PathBuf, time::Duration};

pub const DEFAULT_ROOT_URL: &str =
    "https://gitea.radium.group/api/v1/repos/radium/project-configuration/contents";
/// Fixed, so repeated runs write over the previous mirror instead of each
/// landing in a fresh temporary directory.
pub const DEFAULT_OUTPUT_DIR: &str = "repo-mirror";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a single mirror run needs to know.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Contents endpoint of the repository root.
    pub root_url: String,
    pub output_dir: PathBuf,
    /// Upper bound on concurrent requests, unbounded when `None`.
    pub max_tasks: Option<usize>,
    pub max_depth: Option<usize>,
    pub request_timeout: Option<Duration>,
}

impl Settings {
    pub fn new(root_url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_url: root_url.into(),
            output_dir: output_dir.into(),
            max_tasks: None,
            max_depth: None,
            request_timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}
