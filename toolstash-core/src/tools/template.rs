//! Asset URL and filename templates.
//!
//! Templates use `{variable}` placeholders. Rendering either substitutes every
//! placeholder or fails naming the offending one; a partially filled string is
//! never returned.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

use super::platform::Platform;
use super::types::{ArchiveFormat, ResolvedAsset, Tool};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown template variable {{{variable}}} in {template:?}")]
    UnknownVariable { variable: String, template: String },

    #[error("template variable {{{variable}}} has no value in {template:?}")]
    MissingValue { variable: String, template: String },

    #[error("unbalanced brace in template {template:?}")]
    Unterminated { template: String },

    #[error("rendered URL {url:?} is not valid: {reason}")]
    InvalidUrl { url: String, reason: String },
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder regex is valid"))
}

// ============================================================================
// Variables
// ============================================================================

/// Values substituted into a tool's templates.
#[derive(Debug, Clone)]
pub struct TemplateVars<'a> {
    name: &'a str,
    owner: Option<&'a str>,
    repo: Option<&'a str>,
    os: &'a str,
    arch: &'a str,
    version: &'a str,
    version_number: &'a str,
    ext: &'a str,
}

impl<'a> TemplateVars<'a> {
    pub fn new(tool: &'a Tool, platform: Platform, version: &'a str) -> Self {
        Self {
            name: &tool.name,
            owner: tool.owner.as_deref(),
            repo: tool.repo.as_deref(),
            os: tool.os_name(platform.os),
            arch: tool.arch_name(platform.arch),
            version,
            version_number: version.strip_prefix('v').unwrap_or(version),
            ext: platform.os.exe_suffix(),
        }
    }

    fn get(&self, variable: &str, template: &str) -> Result<&'a str, TemplateError> {
        let value = match variable {
            "name" => Some(self.name),
            "owner" => self.owner,
            "repo" => self.repo,
            "os" => Some(self.os),
            "arch" => Some(self.arch),
            "version" => Some(self.version),
            "version_number" => Some(self.version_number),
            "ext" => Some(self.ext),
            _ => {
                return Err(TemplateError::UnknownVariable {
                    variable: variable.to_string(),
                    template: template.to_string(),
                })
            }
        };
        value.ok_or_else(|| TemplateError::MissingValue {
            variable: variable.to_string(),
            template: template.to_string(),
        })
    }

    /// Fills every placeholder in `template`.
    pub fn render(&self, template: &str) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len() + 32);
        let mut last = 0;

        for caps in placeholder().captures_iter(template) {
            let Some(whole) = caps.get(0) else { continue };
            push_literal(&mut out, &template[last..whole.start()], template)?;
            out.push_str(self.get(&caps[1], template)?);
            last = whole.end();
        }
        push_literal(&mut out, &template[last..], template)?;

        Ok(out)
    }
}

fn push_literal(out: &mut String, literal: &str, template: &str) -> Result<(), TemplateError> {
    if literal.contains(['{', '}']) {
        return Err(TemplateError::Unterminated {
            template: template.to_string(),
        });
    }
    out.push_str(literal);
    Ok(())
}

// ============================================================================
// Asset Resolution
// ============================================================================

/// Builds the download plan for `tool` on `platform` at `version`.
///
/// Pure: identical inputs always produce identical output.
pub fn build_asset(
    tool: &Tool,
    platform: Platform,
    version: &str,
) -> Result<ResolvedAsset, TemplateError> {
    let vars = TemplateVars::new(tool, platform, version);

    let url = vars.render(tool.url_template_for(platform.os))?;
    let file_name = validate_url(&url)?;
    let final_name = vars.render(tool.binary_template_for(platform.os))?;
    let archive = tool.archive.or_else(|| ArchiveFormat::from_url(&file_name));
    let archive_member = match (&archive, &tool.archive_member) {
        (Some(_), Some(member)) => Some(vars.render(member)?),
        _ => None,
    };

    Ok(ResolvedAsset {
        tool: tool.name.clone(),
        platform,
        version: version.to_string(),
        url,
        file_name,
        final_name,
        archive,
        archive_member,
    })
}

/// Checks the rendered URL and returns its file name.
fn validate_url(rendered: &str) -> Result<String, TemplateError> {
    let invalid = |reason: String| TemplateError::InvalidUrl {
        url: rendered.to_string(),
        reason,
    };

    let url = Url::parse(rendered).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| invalid("URL has no file name".to_string()))
}
