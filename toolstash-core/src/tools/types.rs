//! Core types for tool resolution and download.
//!
//! A [`Tool`] is pure data: where its releases live, how "latest" is found,
//! and templates describing the asset URL and the installed binary name.
//! Per-tool naming quirks are expressed through aliases and per-OS overrides
//! rather than code.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::catalog::Catalog;
use super::error::Error;
use super::platform::{Arch, Os, Platform};

// ============================================================================
// Archive Formats
// ============================================================================

/// Archive format of a downloaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    /// Gzip-compressed tar archive (.tar.gz, .tgz)
    TarGz,
    /// XZ-compressed tar archive (.tar.xz)
    TarXz,
    /// ZIP archive (.zip)
    Zip,
}

impl ArchiveFormat {
    /// Infers the archive format from a URL or filename.
    ///
    /// Returns `None` for anything that looks like a bare executable.
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar.xz") {
            Some(Self::TarXz)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

// ============================================================================
// Version Sources
// ============================================================================

/// Where the newest version of a tool is discovered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VersionSource {
    /// Latest GitHub release of `owner/repo`.
    #[default]
    GithubRelease,
    /// A URL whose plain-text body is the version (e.g. Kubernetes `stable.txt`).
    Url { url: String },
    /// A fixed version used when none is requested.
    Pinned { version: String },
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Complete definition of a downloadable tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    /// Unique name within the catalog.
    pub name: String,
    /// One-line description shown in listings.
    #[serde(default)]
    pub description: String,
    /// Release owner (GitHub user or organization).
    #[serde(default)]
    pub owner: Option<String>,
    /// Release repository.
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub version_source: VersionSource,
    /// Asset URL template.
    pub url_template: String,
    /// Per-OS replacements for `url_template`.
    #[serde(default)]
    pub url_overrides: BTreeMap<Os, String>,
    /// Installed executable name template.
    #[serde(default = "default_binary_template")]
    pub binary_template: String,
    /// Per-OS replacements for `binary_template`.
    #[serde(default)]
    pub binary_overrides: BTreeMap<Os, String>,
    /// Path of the binary inside an archive. When unset, the first entry whose
    /// file name equals the installed name is used.
    #[serde(default)]
    pub archive_member: Option<String>,
    /// Explicit archive format; otherwise inferred from the asset file name.
    #[serde(default)]
    pub archive: Option<ArchiveFormat>,
    /// Tool-specific spellings of normalized OS names.
    #[serde(default)]
    pub os_aliases: BTreeMap<Os, String>,
    /// Tool-specific spellings of normalized architectures.
    #[serde(default)]
    pub arch_aliases: BTreeMap<Arch, String>,
}

fn default_binary_template() -> String {
    "{name}{ext}".to_string()
}

impl Tool {
    /// Creates a tool with the given name, description and URL template.
    pub fn new(name: &str, description: &str, url_template: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            owner: None,
            repo: None,
            version_source: VersionSource::default(),
            url_template: url_template.to_string(),
            url_overrides: BTreeMap::new(),
            binary_template: default_binary_template(),
            binary_overrides: BTreeMap::new(),
            archive_member: None,
            archive: None,
            os_aliases: BTreeMap::new(),
            arch_aliases: BTreeMap::new(),
        }
    }

    pub fn github(mut self, owner: &str, repo: &str) -> Self {
        self.owner = Some(owner.to_string());
        self.repo = Some(repo.to_string());
        self
    }

    pub fn version_url(mut self, url: &str) -> Self {
        self.version_source = VersionSource::Url {
            url: url.to_string(),
        };
        self
    }

    pub fn pinned(mut self, version: &str) -> Self {
        self.version_source = VersionSource::Pinned {
            version: version.to_string(),
        };
        self
    }

    pub fn url_for(mut self, os: Os, template: &str) -> Self {
        self.url_overrides.insert(os, template.to_string());
        self
    }

    pub fn binary(mut self, template: &str) -> Self {
        self.binary_template = template.to_string();
        self
    }

    pub fn binary_for(mut self, os: Os, template: &str) -> Self {
        self.binary_overrides.insert(os, template.to_string());
        self
    }

    pub fn member(mut self, template: &str) -> Self {
        self.archive_member = Some(template.to_string());
        self
    }

    pub fn archive(mut self, format: ArchiveFormat) -> Self {
        self.archive = Some(format);
        self
    }

    pub fn os_alias(mut self, os: Os, alias: &str) -> Self {
        self.os_aliases.insert(os, alias.to_string());
        self
    }

    pub fn arch_alias(mut self, arch: Arch, alias: &str) -> Self {
        self.arch_aliases.insert(arch, alias.to_string());
        self
    }

    /// The OS spelling this tool uses in its asset names.
    pub fn os_name(&self, os: Os) -> &str {
        self.os_aliases
            .get(&os)
            .map(String::as_str)
            .unwrap_or(os.as_str())
    }

    /// The architecture spelling this tool uses in its asset names.
    pub fn arch_name(&self, arch: Arch) -> &str {
        self.arch_aliases
            .get(&arch)
            .map(String::as_str)
            .unwrap_or(arch.as_str())
    }

    pub fn url_template_for(&self, os: Os) -> &str {
        self.url_overrides
            .get(&os)
            .map(String::as_str)
            .unwrap_or(&self.url_template)
    }

    pub fn binary_template_for(&self, os: Os) -> &str {
        self.binary_overrides
            .get(&os)
            .map(String::as_str)
            .unwrap_or(&self.binary_template)
    }
}

// ============================================================================
// Requests and Results
// ============================================================================

/// Where a fetched tool is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DestinationMode {
    /// The persistent per-user binaries directory.
    #[default]
    StashDirectory,
    /// A process-scoped directory under the OS temp dir.
    TemporaryDirectory,
}

/// A single request to fetch one tool.
#[derive(Debug, Clone)]
pub struct DownloadRequest<'a> {
    pub tool: &'a Tool,
    pub platform: Platform,
    /// Requested version; empty means latest.
    pub version: String,
    pub destination: DestinationMode,
    pub progress: bool,
}

impl<'a> DownloadRequest<'a> {
    pub fn new(tool: &'a Tool, platform: Platform) -> Self {
        Self {
            tool,
            platform,
            version: String::new(),
            destination: DestinationMode::default(),
            progress: false,
        }
    }

    /// Looks `name` up in `catalog` and builds a request for it.
    pub fn for_tool(catalog: &'a Catalog, name: &str, platform: Platform) -> Result<Self, Error> {
        catalog.lookup(name).map(|tool| Self::new(tool, platform))
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn destination(mut self, destination: DestinationMode) -> Self {
        self.destination = destination;
        self
    }

    pub fn progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }
}

/// A fully resolved download plan, computed before any transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub tool: String,
    pub platform: Platform,
    pub version: String,
    pub url: String,
    /// Last path segment of `url`.
    pub file_name: String,
    /// Name of the installed executable.
    pub final_name: String,
    pub archive: Option<ArchiveFormat>,
    /// Path of the binary inside the archive, if the tool names one.
    pub archive_member: Option<String>,
}

/// Outcome of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Absolute path of the installed executable.
    pub output_file_path: PathBuf,
    /// Bare executable name.
    pub final_name: String,
}
