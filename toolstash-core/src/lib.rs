//! toolstash Core Library
//!
//! Fetches prebuilt command-line tools for the running platform. It includes:
//!
//! - A catalog of tool definitions (built-in plus user-supplied)
//! - Version resolution against GitHub releases and plain-text version URLs
//! - Asset URL templating with per-tool OS/architecture spellings
//! - Streaming downloads with progress, cancellation and atomic install
//! - Configuration from `~/.toolstash/config.json` and the environment

pub mod config;
pub mod tools;

pub use config::{ConfigError, Settings};
pub use tools::{
    Catalog, CancellationSupervisor, DestinationMode, DownloadProgress, DownloadRequest,
    DownloadResult, Error, ErrorKind, Fetcher, Platform, ResolvedAsset, Tool, EXIT_CANCELLED,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
