use std::{
    future::Future,
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
};

use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::{
    error::{MirrorError, Result},
    fetch::Fetcher,
    fingerprint::fingerprint,
    listing::DownloadTask,
    writer::{ensure_dir, save_file},
};

/// A file that was written to disk during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirroredFile {
    pub path: PathBuf,
    pub size: usize,
    pub fingerprint: String,
}

type WalkFuture = Pin<Box<dyn Future<Output = Result<Vec<MirroredFile>>> + Send + 'static>>;

/// Recursively mirrors directory listings onto the local filesystem.
///
/// Every entry of a listing runs as its own task. A listing completes once all
/// of its entries have; the first failing entry aborts the rest of the listing
/// (and with it every subtree below it) and is returned to the caller.
#[derive(Clone)]
pub struct TreeWalker {
    fetcher: Arc<Fetcher>,
    max_depth: Option<usize>,
}

impl TreeWalker {
    pub fn new(fetcher: Arc<Fetcher>, max_depth: Option<usize>) -> Self {
        Self { fetcher, max_depth }
    }

    /// Mirrors the listing at `url` into `path`.
    pub fn dispatch(&self, url: String, path: PathBuf) -> WalkFuture {
        self.dispatch_at(url, path, 0)
    }

    fn dispatch_at(&self, url: String, path: PathBuf, depth: usize) -> WalkFuture {
        let walker = self.clone();
        Box::pin(async move {
            let listing = walker.fetcher.get_listing(&url).await?;
            debug!("{url}: {} entries", listing.len());

            let mut tasks = JoinSet::new();
            for entry in listing {
                let walker = walker.clone();
                match entry.into_task(&path) {
                    DownloadTask::File { name, url, path } => {
                        tasks.spawn(async move {
                            let file = walker.download_file(&name, &url, &path).await;
                            file.map(|f| vec![f]).map_err(|e| MirrorError::Download {
                                name,
                                source: Box::new(e),
                            })
                        });
                    }
                    DownloadTask::Directory { url, path } => {
                        tasks.spawn(async move {
                            // nothing past the cap touches the disk
                            if let Some(max) = walker.max_depth {
                                if depth + 1 > max {
                                    return Err(MirrorError::DepthExceeded { url, max });
                                }
                            }
                            ensure_dir(&path).await?;
                            debug!("created directory {}", path.display());
                            walker.dispatch_at(url, path, depth + 1).await
                        });
                    }
                }
            }

            let mut files = vec![];
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(mut mirrored)) => files.append(&mut mirrored),
                    Ok(Err(e)) => {
                        tasks.abort_all();
                        return Err(e);
                    }
                    Err(e) => {
                        tasks.abort_all();
                        return Err(MirrorError::Task(e));
                    }
                }
            }

            Ok(files)
        })
    }

    async fn download_file(&self, name: &str, url: &str, path: &Path) -> Result<MirroredFile> {
        // the whole file is buffered in memory, no chunking
        let content = self.fetcher.get_bytes(url).await?;
        save_file(path, &content).await?;

        let hash = fingerprint(&content);
        info!("{name} Hash {hash}");

        Ok(MirroredFile {
            path: path.to_path_buf(),
            size: content.len(),
            fingerprint: hash,
        })
    }
}
