//! Error taxonomy for tool resolution and download.

use std::path::PathBuf;
use thiserror::Error;

use super::downloader::TransferError;
use super::extractor::ExtractionError;
use super::platform::Platform;
use super::template::TemplateError;
use super::version::VersionResolutionError;

/// Errors returned by the catalog, resolver, builder and download engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported platform: os={os:?}, arch={arch:?}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("unknown tool: {name}")]
    NotFound { name: String },

    #[error("cannot resolve a version for {tool}: {source}")]
    VersionResolution {
        tool: String,
        #[source]
        source: VersionResolutionError,
    },

    #[error("cannot build the download URL for {tool} {version} on {platform}: {source}")]
    Template {
        tool: String,
        platform: Platform,
        version: String,
        #[source]
        source: TemplateError,
    },

    #[error("network error downloading {tool} {version} from {url}: {source}")]
    Network {
        tool: String,
        version: String,
        url: String,
        #[source]
        source: TransferError,
    },

    #[error("server returned HTTP {status} for {tool} {version} ({url})")]
    HttpStatus {
        tool: String,
        version: String,
        url: String,
        status: u16,
    },

    #[error("cannot extract {tool} {version}: {source}")]
    Extraction {
        tool: String,
        version: String,
        #[source]
        source: ExtractionError,
    },

    #[error("cannot install {tool} to {}: {source}", path.display())]
    Install {
        tool: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("download of {tool} was cancelled")]
    Cancelled { tool: String },
}

/// Coarse classification of [`Error`], for callers choosing messages or exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedPlatform,
    NotFound,
    VersionResolution,
    Template,
    Network,
    HttpStatus,
    Extraction,
    Install,
    Cancelled,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedPlatform { .. } => ErrorKind::UnsupportedPlatform,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::VersionResolution { .. } => ErrorKind::VersionResolution,
            Self::Template { .. } => ErrorKind::Template,
            Self::Network { .. } => ErrorKind::Network,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::Extraction { .. } => ErrorKind::Extraction,
            Self::Install { .. } => ErrorKind::Install,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl ErrorKind {
    /// A short, actionable suggestion to show next to the error.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::UnsupportedPlatform => "this operating system or CPU architecture is not supported",
            Self::NotFound => "run `toolstash get` to list the available tools",
            Self::VersionResolution => {
                "pass --version explicitly, or set GITHUB_TOKEN if you are rate limited"
            }
            Self::Template | Self::HttpStatus | Self::Extraction => {
                "check with the vendor whether this tool is available for your system"
            }
            Self::Network => "check your network connection and try again",
            Self::Install => "check that the destination directory is writable",
            Self::Cancelled => "the download was interrupted",
        }
    }
}
