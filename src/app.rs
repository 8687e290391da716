use std::{sync::Arc, time::Instant};

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    fetch::Fetcher,
    settings::Settings,
    walk::{MirroredFile, TreeWalker},
    writer::ensure_dir,
};

/// Mirrors the repository described by `settings` and returns every file that
/// was written. The http client lives exactly as long as this call.
pub async fn run(settings: &Settings) -> Result<Vec<MirroredFile>> {
    let fetcher = Arc::new(Fetcher::new(settings.request_timeout, settings.max_tasks));

    let started_at = Instant::now();
    info!("Starting app...");

    let result = download_repo_structure(settings, Arc::clone(&fetcher)).await;

    fetcher.close();
    drop(fetcher);

    let files = result?;
    let total: usize = files.iter().map(|f| f.size).sum();
    info!("Done. {} files, {total} bytes", files.len());
    info!("timing. {} secs", started_at.elapsed().as_secs_f64());
    info!("{}", "=".repeat(120));

    Ok(files)
}

async fn download_repo_structure(
    settings: &Settings,
    fetcher: Arc<Fetcher>,
) -> Result<Vec<MirroredFile>> {
    info!("Downloading repo to {}", settings.output_dir.display());
    ensure_dir(&settings.output_dir).await?;

    TreeWalker::new(fetcher, settings.max_depth)
        .dispatch(settings.root_url.clone(), settings.output_dir.clone())
        .await
        .with_context(|| format!("Failed to mirror {}", settings.root_url))
}
