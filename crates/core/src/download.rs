//! Concurrent image downloads for local Markdown copies.
//!
//! Every image is fetched on its own task. A failed or timed out fetch is
//! logged and left out of the path map; the batch itself always completes.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::images::ImageRef;
use crate::naming::{IMAGES_SUBFOLDER, image_link_path, sanitize_image_filename};
use crate::output::{default_output_dir, unique_path_by};
use crate::{EzyCopyError, Result};

/// Image download settings.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Folder the Markdown file lives in; images go to `images/<page>/` below it.
    pub root: PathBuf,
    /// Per-image limit. A fetch that runs over is a failure and is not retried.
    pub timeout: Duration,
    /// Fetches in flight at once.
    pub max_concurrent: usize,
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            root: default_output_dir(),
            timeout: Duration::from_secs(30),
            max_concurrent: 8,
            user_agent: crate::fetch::FetchConfig::default().user_agent,
        }
    }
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadReport {
    /// Original URL to path relative to the Markdown root, successes only.
    pub url_to_path_map: HashMap<String, String>,
    pub total_images: usize,
    pub downloaded_count: usize,
}

/// A planned download: where one image goes.
#[derive(Debug, Clone)]
struct Job {
    url: String,
    dest: PathBuf,
    link: String,
}

/// Downloads images into a page's image folder.
#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: Client,
    config: DownloadConfig,
}

impl ImageDownloader {
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let client = Client::builder().user_agent(config.user_agent.as_str()).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Uses an existing client; its own timeout and proxy settings apply.
    pub fn with_client(client: Client, config: DownloadConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Gives every image a distinct destination inside `dir`.
    ///
    /// Names clash when two URLs share a last path segment; later ones get
    /// ` (n)` suffixes, as do names already present on disk.
    fn plan(images: &[ImageRef], dir: &Path, subfolder: &str) -> Vec<Job> {
        let mut taken = HashSet::new();

        images
            .iter()
            .enumerate()
            .map(|(index, image)| {
                let wanted = dir.join(sanitize_image_filename(&image.src, index));
                let dest = unique_path_by(&wanted, |p| taken.contains(p) || p.exists());
                taken.insert(dest.clone());

                let filename = dest.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                Job { url: image.src.clone(), link: image_link_path(subfolder, &filename), dest }
            })
            .collect()
    }

    /// Downloads `images` into `<root>/images/<subfolder>/`.
    ///
    /// # Errors
    ///
    /// Only when the image folder cannot be created. Individual image
    /// failures are reported through [`DownloadReport::downloaded_count`].
    pub async fn download_all(&self, images: &[ImageRef], subfolder: &str) -> Result<DownloadReport> {
        let dir = self.config.root.join(IMAGES_SUBFOLDER).join(subfolder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| EzyCopyError::Persistence { path: dir.clone(), source })?;

        let jobs = Self::plan(images, &dir, subfolder);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut tasks = JoinSet::new();

        for job in jobs {
            let client = self.client.clone();
            let semaphore = Arc::clone(&semaphore);
            let limit = self.config.timeout;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let outcome = match tokio::time::timeout(limit, fetch_to_file(&client, &job.url, &job.dest)).await {
                    Ok(result) => result,
                    Err(_) => Err(EzyCopyError::ImageDownload {
                        url: job.url.clone(),
                        reason: format!("timed out after {}s", limit.as_secs_f32()),
                    }),
                };
                (job, outcome)
            });
        }

        let mut report = DownloadReport { total_images: images.len(), ..Default::default() };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((job, Ok(()))) => {
                    debug!(url = %job.url, path = %job.dest.display(), "downloaded image");
                    report.url_to_path_map.insert(job.url, job.link);
                    report.downloaded_count += 1;
                }
                Ok((job, Err(err))) => {
                    warn!(url = %job.url, error = %err, "image download failed");
                    let _ = tokio::fs::remove_file(&job.dest).await;
                }
                Err(err) => warn!(error = %err, "image download task failed"),
            }
        }

        debug!(total = report.total_images, downloaded = report.downloaded_count, "image batch finished");
        Ok(report)
    }
}

async fn fetch_to_file(client: &Client, url: &str, dest: &Path) -> Result<()> {
    let failed = |reason: String| EzyCopyError::ImageDownload { url: url.to_string(), reason };

    let response = client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| failed(e.to_string()))?;
    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    tokio::fs::write(dest, &bytes).await.map_err(|e| failed(e.to_string()))
}
