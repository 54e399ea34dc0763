//! Download engine: resolve, transfer, extract, install.
//!
//! The [`Fetcher`] is the main entry point. A fetch either leaves a complete,
//! executable file at `destination/final_name` or leaves that path exactly as
//! it was; scratch files are removed on every exit path.

use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::downloader::{
    download_to, AssetSource, DownloadProgress, HttpAssetSource, TransferError,
};
use super::error::Error;
use super::extractor::{extract_member, make_executable, MemberSelector};
use super::paths::{self, StagingPaths};
use super::template::build_asset;
use super::types::{DownloadRequest, DownloadResult, ResolvedAsset};
use super::version::{HttpReleaseSource, ReleaseSource, VersionResolver};
use crate::config::Settings;

// ============================================================================
// Staging Guard
// ============================================================================

/// Removes scratch files when dropped, unless disarmed.
struct StagingGuard {
    paths: Vec<PathBuf>,
}

impl StagingGuard {
    fn new(staging: &StagingPaths) -> Self {
        Self {
            paths: vec![staging.staged.clone(), staging.archive.clone()],
        }
    }

    /// Stops tracking `path`; it has been renamed into place.
    fn release(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "Removed scratch file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove scratch file"),
            }
        }
    }
}

// ============================================================================
// Fetcher
// ============================================================================

/// Resolves and installs tools.
///
/// Cheap to share; holds no per-request state.
#[derive(Clone)]
pub struct Fetcher {
    resolver: VersionResolver,
    assets: Arc<dyn AssetSource>,
    stash_dir: PathBuf,
}

impl Fetcher {
    /// Creates a fetcher talking to the network as configured by `settings`.
    pub fn new(settings: &Settings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(&settings.user_agent)
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .read_timeout(Duration::from_secs(settings.read_timeout_secs))
            .build()?;

        let releases = HttpReleaseSource::new(
            client.clone(),
            &settings.github_api_url,
            settings.github_token.clone(),
        );

        Ok(Self::with_sources(
            Arc::new(releases),
            Arc::new(HttpAssetSource::new(client)),
            settings.stash_dir(),
        ))
    }

    /// Creates a fetcher over explicit sources.
    pub fn with_sources(
        releases: Arc<dyn ReleaseSource>,
        assets: Arc<dyn AssetSource>,
        stash_dir: PathBuf,
    ) -> Self {
        Self {
            resolver: VersionResolver::new(releases),
            assets,
            stash_dir,
        }
    }

    pub fn stash_dir(&self) -> &Path {
        &self.stash_dir
    }

    /// Resolves the version and builds the asset URL without downloading.
    pub async fn plan(&self, request: &DownloadRequest<'_>) -> Result<ResolvedAsset, Error> {
        let tool = request.tool;

        let version = self
            .resolver
            .resolve(tool, &request.version)
            .await
            .map_err(|source| Error::VersionResolution {
                tool: tool.name.clone(),
                source,
            })?;

        build_asset(tool, request.platform, &version).map_err(|source| Error::Template {
            tool: tool.name.clone(),
            platform: request.platform,
            version,
            source,
        })
    }

    /// Downloads and installs the requested tool.
    ///
    /// `on_progress` is only called when the request asks for progress.
    pub async fn fetch<F>(
        &self,
        request: &DownloadRequest<'_>,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<DownloadResult, Error>
    where
        F: Fn(DownloadProgress) + Send + Sync,
    {
        let tool = &request.tool.name;
        let cancelled = || Error::Cancelled { tool: tool.clone() };

        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let asset = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            asset = self.plan(request) => asset?,
        };

        let dest_dir = paths::destination_dir(request.destination, &self.stash_dir).map_err(
            |source| Error::Install {
                tool: tool.clone(),
                path: std::env::temp_dir(),
                source,
            },
        )?;
        paths::ensure_dir(&dest_dir)
            .await
            .map_err(|source| Error::Install {
                tool: tool.clone(),
                path: dest_dir.clone(),
                source,
            })?;

        info!(
            tool = %asset.tool,
            version = %asset.version,
            platform = %asset.platform,
            url = %asset.url,
            "Fetching"
        );

        let final_path = dest_dir.join(&asset.final_name);
        let staging = StagingPaths::new(&dest_dir, &asset.final_name);
        let mut guard = StagingGuard::new(&staging);

        let download_path = if asset.archive.is_some() {
            &staging.archive
        } else {
            &staging.staged
        };

        let progress: Option<&(dyn Fn(DownloadProgress) + Send + Sync)> = if request.progress {
            Some(&on_progress)
        } else {
            None
        };

        download_to(
            self.assets.as_ref(),
            &asset.url,
            download_path,
            cancel,
            progress,
        )
        .await
        .map_err(|e| transfer_error(&asset, e))?;

        if let Some(format) = asset.archive {
            let archive_path = staging.archive.clone();
            let staged = staging.staged.clone();
            let member = asset.archive_member.clone();
            let final_name = asset.final_name.clone();

            tokio::task::spawn_blocking(move || {
                let selector = match &member {
                    Some(path) => MemberSelector::Path(path),
                    None => MemberSelector::FileName(&final_name),
                };
                extract_member(&archive_path, format, selector, &staged)
            })
            .await
            .map_err(|e| Error::Install {
                tool: tool.clone(),
                path: staging.staged.clone(),
                source: std::io::Error::other(e),
            })?
            .map_err(|source| Error::Extraction {
                tool: tool.clone(),
                version: asset.version.clone(),
                source,
            })?;

            if let Err(e) = tokio::fs::remove_file(&staging.archive).await {
                debug!(error = %e, "Archive already gone");
            }
        }

        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let install_err = |source: std::io::Error| Error::Install {
            tool: tool.clone(),
            path: final_path.clone(),
            source,
        };
        make_executable(&staging.staged).map_err(install_err)?;
        tokio::fs::rename(&staging.staged, &final_path)
            .await
            .map_err(install_err)?;
        guard.release(&staging.staged);

        info!(path = %final_path.display(), "Installed {} {}", asset.tool, asset.version);

        Ok(DownloadResult {
            output_file_path: final_path,
            final_name: asset.final_name,
        })
    }
}

fn transfer_error(asset: &ResolvedAsset, error: TransferError) -> Error {
    match error {
        TransferError::Cancelled => Error::Cancelled {
            tool: asset.tool.clone(),
        },
        TransferError::Status { status, .. } => Error::HttpStatus {
            tool: asset.tool.clone(),
            version: asset.version.clone(),
            url: asset.url.clone(),
            status,
        },
        TransferError::Write { path, source } => Error::Install {
            tool: asset.tool.clone(),
            path,
            source,
        },
        other => Error::Network {
            tool: asset.tool.clone(),
            version: asset.version.clone(),
            url: asset.url.clone(),
            source: other,
        },
    }
}
