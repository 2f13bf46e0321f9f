//! # Install Target Schema
//!
//! An [`InstallTarget`] describes one installable application: where its installer
//! comes from, which silent switches its installer-builder understands, and what to
//! do after a successful install. Targets are built once at the start of a run from
//! the built-in catalog plus the configuration file, and are never mutated afterwards.
//!
//! Configuration files describe targets with [`TargetDefinition`]:
//!
//! ```yaml
//! targets:
//!   - name: flmsg
//!     listing: https://sourceforge.net/projects/fldigi/files/flmsg/
//!     pattern: 'flmsg-[\d.]+_x64-setup\.exe/download$'
//!     installer: nsis
//!   - name: my-logger
//!     url: https://example.org/logger-2.1.msi
//!     installer: msi
//!     acceptable_exit_codes: [3010, 1641]
//! ```

use crate::installers::runner::Invocation;
use crate::libs::post_install::PostInstallConfig;
use crate::libs::utilities::path_helpers::expand_path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Windows Installer's "success, reboot required" code.
pub const EXIT_SUCCESS_REBOOT_REQUIRED: i32 = 3010;

/// Where a target's installer is downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSource {
    /// A fixed, absolute download URL. Resolution is skipped.
    Direct { url: String },
    /// Resolve the newest matching link at run time.
    Listing(ListingSource),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingSource {
    /// A vendor downloads page scraped for `<a href>` links matching `link_pattern`.
    Page {
        page_url: String,
        link_pattern: String,
    },
    /// The latest GitHub release of `repo` (`owner/name`); asset download URLs are
    /// matched against `asset_pattern`.
    GithubRelease { repo: String, asset_pattern: String },
}

impl ListingSource {
    pub fn pattern(&self) -> &str {
        match self {
            ListingSource::Page { link_pattern, .. } => link_pattern,
            ListingSource::GithubRelease { asset_pattern, .. } => asset_pattern,
        }
    }
}

impl fmt::Display for TargetSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TargetSource::Direct { url } => write!(f, "direct: {url}"),
            TargetSource::Listing(ListingSource::Page { page_url, .. }) => {
                write!(f, "listing: {page_url}")
            }
            TargetSource::Listing(ListingSource::GithubRelease { repo, .. }) => {
                write!(f, "github: {repo}")
            }
        }
    }
}

/// Silent-install vocabulary of the common Windows installer builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SilentSwitches {
    /// Inno Setup: `/VERYSILENT /SUPPRESSMSGBOXES /NORESTART /SP-`.
    #[serde(alias = "inno")]
    InnoSetup,
    /// Nullsoft (NSIS): `/S`.
    Nsis,
    /// Windows Installer package, run through `msiexec /i <pkg> /qn /norestart`.
    Msi,
    /// InstallShield wrapping an MSI: `/s /v/qn`.
    #[serde(alias = "installshield")]
    InstallShield,
    /// Arguments passed verbatim to the artifact.
    Raw(Vec<String>),
}

impl SilentSwitches {
    /// Builds the program and ordered argument list that installs `artifact` unattended.
    pub fn invocation(&self, artifact: &Path) -> Invocation {
        let direct = |args: &[&str]| Invocation {
            program: artifact.to_path_buf(),
            args: args.iter().map(OsString::from).collect(),
        };
        match self {
            SilentSwitches::InnoSetup => {
                direct(&["/VERYSILENT", "/SUPPRESSMSGBOXES", "/NORESTART", "/SP-"])
            }
            SilentSwitches::Nsis => direct(&["/S"]),
            SilentSwitches::InstallShield => direct(&["/s", "/v/qn"]),
            SilentSwitches::Msi => Invocation {
                program: PathBuf::from("msiexec"),
                args: vec![
                    OsString::from("/i"),
                    artifact.as_os_str().to_os_string(),
                    OsString::from("/qn"),
                    OsString::from("/norestart"),
                ],
            },
            SilentSwitches::Raw(args) => Invocation {
                program: artifact.to_path_buf(),
                args: args.iter().map(OsString::from).collect(),
            },
        }
    }
}

impl fmt::Display for SilentSwitches {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SilentSwitches::InnoSetup => write!(f, "inno"),
            SilentSwitches::Nsis => write!(f, "nsis"),
            SilentSwitches::Msi => write!(f, "msi"),
            SilentSwitches::InstallShield => write!(f, "installshield"),
            SilentSwitches::Raw(args) => write!(f, "raw [{}]", args.join(" ")),
        }
    }
}

/// One installable application.
#[derive(Clone)]
pub struct InstallTarget {
    pub name: String,
    pub description: String,
    pub default_enabled: bool,
    pub source: TargetSource,
    pub silent_args: SilentSwitches,
    /// Non-zero exit codes that still count as success.
    pub acceptable_exit_codes: BTreeSet<i32>,
    /// When this path exists the application is considered installed and skipped.
    pub detect_path: Option<PathBuf>,
    /// Expected SHA-256 of the downloaded artifact, lowercase hex.
    pub sha256: Option<String>,
    pub post_install_config: Option<Arc<dyn PostInstallConfig>>,
}

impl InstallTarget {
    pub fn new(name: &str, source: TargetSource, silent_args: SilentSwitches) -> Self {
        InstallTarget {
            name: name.to_string(),
            description: String::new(),
            default_enabled: false,
            source,
            silent_args,
            acceptable_exit_codes: BTreeSet::from([EXIT_SUCCESS_REBOOT_REQUIRED]),
            detect_path: None,
            sha256: None,
            post_install_config: None,
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn default_on(mut self) -> Self {
        self.default_enabled = true;
        self
    }

    pub fn detect(mut self, path: &str) -> Self {
        self.detect_path = Some(expand_path(path));
        self
    }

    pub fn accept_exit_codes(mut self, codes: &[i32]) -> Self {
        self.acceptable_exit_codes.extend(codes.iter().copied());
        self
    }

    pub fn with_post_install(mut self, config: Arc<dyn PostInstallConfig>) -> Self {
        self.post_install_config = Some(config);
        self
    }
}

impl fmt::Debug for InstallTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("InstallTarget")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("silent_args", &self.silent_args)
            .field("acceptable_exit_codes", &self.acceptable_exit_codes)
            .field("detect_path", &self.detect_path)
            .field("post_install_config", &self.post_install_config.is_some())
            .finish()
    }
}

fn default_true() -> bool {
    true
}

fn default_acceptable_codes() -> Vec<i32> {
    vec![EXIT_SUCCESS_REBOOT_REQUIRED]
}

/// Serialized form of a target in the configuration file.
///
/// Exactly one source must be given: `url`, `listing` + `pattern`, or
/// `github` + `pattern`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub default_enabled: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub listing: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    pub installer: SilentSwitches,
    #[serde(default = "default_acceptable_codes")]
    pub acceptable_exit_codes: Vec<i32>,
    #[serde(default)]
    pub detect_path: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
}

impl TargetDefinition {
    /// Validates the source fields and builds the immutable target.
    pub fn into_target(self) -> Result<InstallTarget, String> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("target with an empty name".to_string());
        }

        let source = match (self.url, self.listing, self.github, self.pattern) {
            (Some(url), None, None, None) => TargetSource::Direct { url },
            (None, Some(page_url), None, Some(link_pattern)) => {
                TargetSource::Listing(ListingSource::Page {
                    page_url,
                    link_pattern,
                })
            }
            (None, None, Some(repo), Some(asset_pattern)) => {
                TargetSource::Listing(ListingSource::GithubRelease {
                    repo,
                    asset_pattern,
                })
            }
            (None, Some(_), None, None) | (None, None, Some(_), None) => {
                return Err(format!("target '{name}' needs a 'pattern' for its listing"));
            }
            _ => {
                return Err(format!(
                    "target '{name}' must set exactly one of 'url', 'listing' or 'github'"
                ));
            }
        };

        if let Some(sha) = &self.sha256 {
            if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(format!("target '{name}' has a malformed sha256"));
            }
        }

        Ok(InstallTarget {
            name,
            description: self.description,
            default_enabled: self.default_enabled,
            source,
            silent_args: self.installer,
            acceptable_exit_codes: self.acceptable_exit_codes.into_iter().collect(),
            detect_path: self.detect_path.as_deref().map(expand_path),
            sha256: self.sha256.map(|s| s.to_ascii_lowercase()),
            post_install_config: None,
        })
    }
}
