//! Streaming asset transfer with progress reporting and cancellation.
//!
//! The HTTP side sits behind [`AssetSource`] so the engine can be driven by
//! in-memory bodies in tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Minimum spacing between progress callbacks.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed reading response body: {0}")]
    Body(#[source] io::Error),

    #[error("stream ended after {received} of {expected} bytes")]
    Truncated { expected: u64, received: u64 },

    #[error("failed writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("transfer cancelled")]
    Cancelled,
}

// ============================================================================
// Download Progress
// ============================================================================

/// Progress information during a download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    pub bytes_downloaded: u64,
    /// Total bytes expected (if known from Content-Length header).
    pub total_bytes: Option<u64>,
    /// 0.0 to 100.0, or None if the total is unknown.
    pub percent: Option<f32>,
}

impl DownloadProgress {
    pub fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percent = total_bytes.map(|total| {
            if total > 0 {
                (bytes_downloaded as f32 / total as f32) * 100.0
            } else {
                0.0
            }
        });

        Self {
            bytes_downloaded,
            total_bytes,
            percent,
        }
    }
}

/// Rate-limits progress callbacks to one per [`PROGRESS_INTERVAL`].
struct Throttle {
    last: Option<Instant>,
}

impl Throttle {
    fn new() -> Self {
        Self { last: None }
    }

    fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < PROGRESS_INTERVAL => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

// ============================================================================
// Asset Sources
// ============================================================================

/// An opened asset: declared length plus body chunks.
pub struct AssetBody {
    pub total_bytes: Option<u64>,
    pub chunks: BoxStream<'static, Result<Bytes, TransferError>>,
}

/// Opens a remote asset for streaming.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Starts the request. Non-2xx responses fail with [`TransferError::Status`].
    async fn open(&self, url: &str) -> Result<AssetBody, TransferError>;
}

pub struct HttpAssetSource {
    client: Client,
}

impl HttpAssetSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn open(&self, url: &str) -> Result<AssetBody, TransferError> {
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|source| TransferError::Request {
                    url: url.to_string(),
                    source,
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length();
        debug!(?total_bytes, "Content-Length");

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransferError::Body(io::Error::other(e))))
            .boxed();

        Ok(AssetBody {
            total_bytes,
            chunks,
        })
    }
}

// ============================================================================
// Download Function
// ============================================================================

/// Streams `url` into `dest`, returning the number of bytes written.
///
/// `dest` is created (or truncated). On error it may hold partial data; the
/// caller owns its cleanup. Cancellation is checked between chunks.
pub async fn download_to(
    source: &dyn AssetSource,
    url: &str,
    dest: &Path,
    cancel: &CancellationToken,
    on_progress: Option<&(dyn Fn(DownloadProgress) + Send + Sync)>,
) -> Result<u64, TransferError> {
    info!("Downloading {} to {}", url, dest.display());

    let body = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(TransferError::Cancelled),
        body = source.open(url) => body?,
    };
    let AssetBody {
        total_bytes,
        mut chunks,
    } = body;

    let write_err = |source: io::Error| TransferError::Write {
        path: dest.to_path_buf(),
        source,
    };
    let mut file = File::create(dest).await.map_err(write_err)?;

    let mut throttle = Throttle::new();
    let mut bytes_downloaded: u64 = 0;
    let report = |bytes: u64| {
        if let Some(cb) = on_progress {
            cb(DownloadProgress::new(bytes, total_bytes));
        }
    };

    throttle.ready(Instant::now());
    report(0);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(bytes_downloaded, "Transfer cancelled");
                return Err(TransferError::Cancelled);
            }
            next = chunks.next() => next,
        };
        let Some(chunk) = next else { break };
        let chunk = chunk?;

        file.write_all(&chunk).await.map_err(write_err)?;
        bytes_downloaded += chunk.len() as u64;

        if throttle.ready(Instant::now()) {
            report(bytes_downloaded);
        }
    }

    file.flush().await.map_err(write_err)?;
    file.sync_all().await.map_err(write_err)?;

    if let Some(expected) = total_bytes {
        if bytes_downloaded < expected {
            return Err(TransferError::Truncated {
                expected,
                received: bytes_downloaded,
            });
        }
    }

    report(bytes_downloaded);
    info!(
        "Download complete: {} bytes written to {}",
        bytes_downloaded,
        dest.display()
    );

    Ok(bytes_downloaded)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use futures::stream;
    use std::collections::HashMap;

    enum Canned {
        Body {
            total_bytes: Option<u64>,
            data: Bytes,
            reset: bool,
        },
        Status(u16),
    }

    /// Serves canned bodies keyed by URL.
    #[derive(Default)]
    pub struct StaticSource {
        bodies: HashMap<String, Canned>,
    }

    impl StaticSource {
        pub fn new() -> Self {
            Self::default()
        }

        fn body(mut self, url: &str, data: &[u8], total_bytes: Option<u64>, reset: bool) -> Self {
            self.bodies.insert(
                url.to_string(),
                Canned::Body {
                    total_bytes,
                    data: Bytes::copy_from_slice(data),
                    reset,
                },
            );
            self
        }

        pub fn with(self, url: &str, data: &[u8]) -> Self {
            self.body(url, data, Some(data.len() as u64), false)
        }

        pub fn with_status(mut self, url: &str, status: u16) -> Self {
            self.bodies.insert(url.to_string(), Canned::Status(status));
            self
        }

        /// Declares `declared` bytes but delivers only `data`.
        pub fn with_short_body(self, url: &str, data: &[u8], declared: u64) -> Self {
            self.body(url, data, Some(declared), false)
        }

        /// Delivers `data`, then fails as if the peer reset the connection.
        pub fn with_reset(self, url: &str, data: &[u8], declared: u64) -> Self {
            self.body(url, data, Some(declared), true)
        }
    }

    #[async_trait]
    impl AssetSource for StaticSource {
        async fn open(&self, url: &str) -> Result<AssetBody, TransferError> {
            match self.bodies.get(url) {
                None => Err(TransferError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
                Some(Canned::Status(status)) => Err(TransferError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
                Some(Canned::Body {
                    total_bytes,
                    data,
                    reset,
                }) => {
                    let mut chunks = vec![Ok(data.clone())];
                    if *reset {
                        chunks.push(Err(TransferError::Body(io::Error::from(
                            io::ErrorKind::ConnectionReset,
                        ))));
                    }
                    Ok(AssetBody {
                        total_bytes: *total_bytes,
                        chunks: stream::iter(chunks).boxed(),
                    })
                }
            }
        }
    }

    /// Sends one chunk, then stalls until cancelled.
    pub struct StallingSource;

    #[async_trait]
    impl AssetSource for StallingSource {
        async fn open(&self, _url: &str) -> Result<AssetBody, TransferError> {
            let first = stream::iter(vec![Ok(Bytes::from_static(b"partial"))]);
            Ok(AssetBody {
                total_bytes: Some(1 << 20),
                chunks: first.chain(stream::pending()).boxed(),
            })
        }
    }
}
