//! Tool resolution and download.
//!
//! # Architecture
//!
//! - `platform`: OS/architecture normalization
//! - `types`: Tool definitions, requests and results
//! - `catalog`: Built-in and user tool definitions
//! - `version`: Explicit and latest version resolution
//! - `template`: Asset URL and binary name templates
//! - `downloader`: Streaming transfer with progress and cancellation
//! - `extractor`: Pulling the executable out of tar.gz, tar.xz and zip assets
//! - `paths`: Destination and staging locations
//! - `engine`: The [`Fetcher`] tying it all together
//! - `cancel`: Signal-driven cancellation
//!
//! # Example
//!
//! ```ignore
//! use toolstash_core::tools::{Catalog, CancellationSupervisor, DownloadRequest, Fetcher, Platform};
//!
//! let fetcher = Fetcher::new(&settings)?;
//! let supervisor = CancellationSupervisor::install()?;
//! let request = DownloadRequest::for_tool(Catalog::builtin(), "kubectl", Platform::detect()?)?
//!     .version("v1.28.0");
//!
//! let result = fetcher.fetch(&request, &supervisor.token(), |_| {}).await?;
//! println!("{}", result.output_file_path.display());
//! ```

pub mod cancel;
pub mod catalog;
pub mod downloader;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod paths;
pub mod platform;
pub mod template;
pub mod types;
pub mod version;

pub use cancel::{CancellationSupervisor, EXIT_CANCELLED};
pub use catalog::{Catalog, CatalogError};
pub use downloader::{AssetSource, DownloadProgress, HttpAssetSource, TransferError};
pub use engine::Fetcher;
pub use error::{Error, ErrorKind};
pub use extractor::ExtractionError;
pub use platform::{Arch, Os, Platform};
pub use template::{build_asset, TemplateError};
pub use types::{
    ArchiveFormat, DestinationMode, DownloadRequest, DownloadResult, ResolvedAsset, Tool,
    VersionSource,
};
pub use version::{HttpReleaseSource, ReleaseSource, VersionResolutionError, VersionResolver};
