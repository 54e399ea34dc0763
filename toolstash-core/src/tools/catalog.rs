//! Tool catalog with built-in definitions.
//!
//! The catalog is an immutable, name-sorted set of [`Tool`] records. The
//! built-in catalog is constructed once per process; user-supplied
//! definitions can be merged over it to produce a new catalog.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

use super::error::Error;
use super::platform::{Arch, Os};
use super::types::Tool;

/// Errors raised while building a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate tool definition: {0}")]
    DuplicateTool(String),

    #[error("invalid tool catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// An immutable collection of tool definitions, sorted by name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tools: Vec<Tool>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate names.
    pub fn new(mut tools: Vec<Tool>) -> Result<Self, CatalogError> {
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(pair) = tools.windows(2).find(|pair| pair[0].name == pair[1].name) {
            return Err(CatalogError::DuplicateTool(pair[0].name.clone()));
        }
        Ok(Self { tools })
    }

    /// Parses a JSON array of tool definitions.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let tools: Vec<Tool> = serde_json::from_str(json)?;
        Self::new(tools)
    }

    /// The process-wide built-in catalog.
    pub fn builtin() -> &'static Catalog {
        static BUILTIN: OnceLock<Catalog> = OnceLock::new();
        BUILTIN.get_or_init(|| Catalog {
            tools: {
                let mut tools = builtin_tools();
                tools.sort_by(|a, b| a.name.cmp(&b.name));
                tools
            },
        })
    }

    /// Returns a new catalog where `other`'s definitions replace same-named ones.
    pub fn merged(&self, other: &Catalog) -> Catalog {
        let mut by_name: BTreeMap<&str, &Tool> =
            self.tools.iter().map(|t| (t.name.as_str(), t)).collect();
        for tool in &other.tools {
            by_name.insert(tool.name.as_str(), tool);
        }
        Catalog {
            tools: by_name.into_values().cloned().collect(),
        }
    }

    /// The built-in catalog with the definitions in `path` merged over it.
    ///
    /// A missing file leaves the built-in catalog unchanged.
    pub fn with_user_file(path: &Path) -> Result<Catalog> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::builtin().clone());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        let user = Self::from_json(&json)
            .with_context(|| format!("Failed to load tool catalog {}", path.display()))?;
        debug!(path = %path.display(), tools = user.len(), "Loaded user catalog");
        Ok(Self::builtin().merged(&user))
    }

    /// All tools, sorted by name.
    pub fn list_all(&self) -> &[Tool] {
        &self.tools
    }

    pub fn lookup(&self, name: &str) -> Result<&Tool, Error> {
        self.tools
            .binary_search_by(|t| t.name.as_str().cmp(name))
            .map(|index| &self.tools[index])
            .map_err(|_| Error::NotFound {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// Built-in Definitions
// ============================================================================

const GITHUB_DOWNLOAD: &str = "https://github.com/{owner}/{repo}/releases/download/{version}";

fn builtin_tools() -> Vec<Tool> {
    vec![
        faas_cli(),
        gh(),
        helm(),
        jq(),
        k3d(),
        k9s(),
        kind(),
        kubectl(),
        kubectx(),
        kustomize(),
        minikube(),
        terraform(),
        yq(),
    ]
}

fn github_asset(asset: &str) -> String {
    format!("{GITHUB_DOWNLOAD}/{asset}")
}

fn faas_cli() -> Tool {
    // Bare binaries named faas-cli, faas-cli-arm64, faas-cli-darwin, ...
    Tool::new(
        "faas-cli",
        "Official CLI for OpenFaaS.",
        &github_asset("faas-cli{os}{arch}{ext}"),
    )
    .github("openfaas", "faas-cli")
    .os_alias(Os::Linux, "")
    .os_alias(Os::Darwin, "-darwin")
    .os_alias(Os::Windows, "")
    .arch_alias(Arch::Amd64, "")
    .arch_alias(Arch::Arm64, "-arm64")
    .arch_alias(Arch::Armv7, "-armhf")
    .arch_alias(Arch::Armv6, "-armhf")
}

fn gh() -> Tool {
    Tool::new(
        "gh",
        "GitHub's official command line tool.",
        &github_asset("gh_{version_number}_{os}_{arch}.tar.gz"),
    )
    .github("cli", "cli")
    .url_for(Os::Darwin, &github_asset("gh_{version_number}_{os}_{arch}.zip"))
    .url_for(Os::Windows, &github_asset("gh_{version_number}_{os}_{arch}.zip"))
    .os_alias(Os::Darwin, "macOS")
    .arch_alias(Arch::Armv7, "armv6")
}

fn helm() -> Tool {
    Tool::new(
        "helm",
        "The Kubernetes Package Manager.",
        "https://get.helm.sh/helm-{version}-{os}-{arch}.tar.gz",
    )
    .github("helm", "helm")
    .url_for(Os::Windows, "https://get.helm.sh/helm-{version}-{os}-{arch}.zip")
    .member("{os}-{arch}/helm{ext}")
    .arch_alias(Arch::Armv7, "arm")
    .arch_alias(Arch::Armv6, "arm")
}

fn jq() -> Tool {
    Tool::new(
        "jq",
        "Command-line JSON processor.",
        &github_asset("jq-{os}-{arch}{ext}"),
    )
    .github("jqlang", "jq")
    .os_alias(Os::Darwin, "macos")
    .arch_alias(Arch::Armv7, "armhf")
    .arch_alias(Arch::Armv6, "armel")
}

fn k3d() -> Tool {
    Tool::new(
        "k3d",
        "Helper to run k3s (Lightweight Kubernetes) in Docker.",
        &github_asset("k3d-{os}-{arch}{ext}"),
    )
    .github("k3d-io", "k3d")
    .arch_alias(Arch::Armv7, "arm")
    .arch_alias(Arch::Armv6, "arm")
}

fn k9s() -> Tool {
    Tool::new(
        "k9s",
        "Terminal UI to interact with Kubernetes clusters.",
        &github_asset("k9s_{os}_{arch}.tar.gz"),
    )
    .github("derailed", "k9s")
    .url_for(Os::Windows, &github_asset("k9s_{os}_{arch}.zip"))
    .os_alias(Os::Linux, "Linux")
    .os_alias(Os::Darwin, "Darwin")
    .os_alias(Os::Windows, "Windows")
}

fn kind() -> Tool {
    Tool::new(
        "kind",
        "Run local Kubernetes clusters using Docker container nodes.",
        &github_asset("kind-{os}-{arch}"),
    )
    .github("kubernetes-sigs", "kind")
}

fn kubectl() -> Tool {
    Tool::new(
        "kubectl",
        "Run commands against Kubernetes clusters.",
        "https://dl.k8s.io/release/v{version_number}/bin/{os}/{arch}/kubectl{ext}",
    )
    .github("kubernetes", "kubernetes")
    .version_url("https://dl.k8s.io/release/stable.txt")
    .arch_alias(Arch::Armv7, "arm")
    .arch_alias(Arch::Armv6, "arm")
}

fn kubectx() -> Tool {
    Tool::new(
        "kubectx",
        "Faster way to switch between clusters.",
        &github_asset("kubectx_{version}_{os}_{arch}.tar.gz"),
    )
    .github("ahmetb", "kubectx")
    .url_for(Os::Windows, &github_asset("kubectx_{version}_{os}_{arch}.zip"))
    .arch_alias(Arch::Amd64, "x86_64")
}

fn kustomize() -> Tool {
    // Releases are tagged kustomize/vX.Y.Z, so "latest" is pinned.
    Tool::new(
        "kustomize",
        "Customization of Kubernetes YAML configurations.",
        "https://github.com/{owner}/{repo}/releases/download/kustomize%2F{version}/kustomize_{version}_{os}_{arch}.tar.gz",
    )
    .github("kubernetes-sigs", "kustomize")
    .pinned("v5.4.3")
}

fn minikube() -> Tool {
    Tool::new(
        "minikube",
        "Runs the latest stable release of Kubernetes, with support for standard Kubernetes features.",
        &github_asset("minikube-{os}-{arch}{ext}"),
    )
    .github("kubernetes", "minikube")
    .arch_alias(Arch::Armv7, "arm")
    .arch_alias(Arch::Armv6, "arm")
}

fn terraform() -> Tool {
    Tool::new(
        "terraform",
        "Infrastructure as Code for major cloud providers.",
        "https://releases.hashicorp.com/terraform/{version_number}/terraform_{version_number}_{os}_{arch}.zip",
    )
    .github("hashicorp", "terraform")
    .arch_alias(Arch::Armv7, "arm")
    .arch_alias(Arch::Armv6, "arm")
}

fn yq() -> Tool {
    Tool::new(
        "yq",
        "Portable command-line YAML processor.",
        &github_asset("yq_{os}_{arch}{ext}"),
    )
    .github("mikefarah", "yq")
    .arch_alias(Arch::Armv7, "arm")
    .arch_alias(Arch::Armv6, "arm")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::VersionSource;

    #[test]
    fn test_builtin_is_sorted_and_unique() {
        let tools = Catalog::builtin().list_all();
        assert!(!tools.is_empty());
        for pair in tools.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} !< {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn test_list_all_is_stable() {
        let first: Vec<&str> = Catalog::builtin().list_all().iter().map(|t| t.name.as_str()).collect();
        let second: Vec<&str> = Catalog::builtin().list_all().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_lookup_returns_exact_tool() {
        let catalog = Catalog::builtin();
        for tool in catalog.list_all() {
            let found = catalog.lookup(&tool.name).unwrap();
            assert_eq!(found, tool);
        }
    }

    #[test]
    fn test_lookup_unknown_tool() {
        match Catalog::builtin().lookup("not-a-real-tool") {
            Err(Error::NotFound { name }) => assert_eq!(name, "not-a-real-tool"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_new_sorts_and_rejects_duplicates() {
        let catalog = Catalog::new(vec![
            Tool::new("zeta", "", "https://example.com/zeta"),
            Tool::new("alpha", "", "https://example.com/alpha"),
        ])
        .unwrap();
        let names: Vec<&str> = catalog.list_all().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        let err = Catalog::new(vec![
            Tool::new("dup", "", "https://example.com/a"),
            Tool::new("dup", "", "https://example.com/b"),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateTool(name) if name == "dup"));
    }

    #[test]
    fn test_from_json_and_merge() {
        let user = Catalog::from_json(
            r#"[
                {"name": "kind", "url_template": "https://mirror.example.com/kind-{os}-{arch}"},
                {"name": "mytool", "url_template": "https://example.com/mytool"}
            ]"#,
        )
        .unwrap();

        let merged = Catalog::builtin().merged(&user);
        assert_eq!(merged.len(), Catalog::builtin().len() + 1);
        assert_eq!(
            merged.lookup("kind").unwrap().url_template,
            "https://mirror.example.com/kind-{os}-{arch}"
        );
        assert!(merged.lookup("mytool").is_ok());
        // The built-in catalog itself is untouched.
        assert!(Catalog::builtin().lookup("mytool").is_err());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            Catalog::from_json("{not json"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_kubectl_uses_stable_txt() {
        let kubectl = Catalog::builtin().lookup("kubectl").unwrap();
        assert_eq!(
            kubectl.version_source,
            VersionSource::Url {
                url: "https://dl.k8s.io/release/stable.txt".to_string()
            }
        );
    }

    #[test]
    fn test_github_tools_name_their_repository() {
        for tool in Catalog::builtin().list_all() {
            if tool.version_source == VersionSource::GithubRelease {
                assert!(tool.owner.is_some() && tool.repo.is_some(), "{}", tool.name);
            }
        }
    }

    #[test]
    fn test_user_file_merges_over_builtin() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("tools.json");

        let catalog = Catalog::with_user_file(&path).unwrap();
        assert_eq!(catalog.len(), Catalog::builtin().len());

        std::fs::write(
            &path,
            r#"[{"name": "mytool", "url_template": "https://example.com/mytool"}]"#,
        )
        .unwrap();
        let catalog = Catalog::with_user_file(&path).unwrap();
        assert!(catalog.lookup("mytool").is_ok());
        assert!(catalog.lookup("kubectl").is_ok());

        std::fs::write(&path, "[{").unwrap();
        let err = Catalog::with_user_file(&path).unwrap_err();
        assert!(err.to_string().contains("tools.json"));
    }
}
