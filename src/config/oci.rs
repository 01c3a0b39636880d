//! OCI SDK config file loading.
//!
//! Reads the same INI-style file the OCI CLI and SDKs use
//! (`~/.oci/config` by default):
//!
//! ```text
//! [DEFAULT]
//! user=ocid1.user.oc1..aaaa
//! fingerprint=20:3b:97:13:55:1c:...
//! tenancy=ocid1.tenancy.oc1..aaaa
//! region=us-ashburn-1
//! key_file=~/.oci/oci_api_key.pem
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::OciError;

/// Profile read when none is named explicitly
pub const DEFAULT_PROFILE: &str = "DEFAULT";

/// Credentials and region for one OCI profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OciProfile {
    pub user: String,
    pub fingerprint: String,
    pub tenancy: String,
    pub region: String,
    pub key_file: PathBuf,
}

impl OciProfile {
    /// Load a profile from an OCI config file on disk
    pub fn load(path: &Path, profile: &str) -> Result<Self, OciError> {
        let content = std::fs::read_to_string(path).map_err(|e| OciError::Config {
            path: path.display().to_string(),
            message: format!("cannot read file: {}", e),
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::parse(&content, profile, base_dir, home.as_deref()).map_err(|message| {
            OciError::Config {
                path: path.display().to_string(),
                message,
            }
        })
    }

    /// Parse a profile out of config file text
    ///
    /// Keys missing from the named profile fall back to `[DEFAULT]`, matching
    /// the OCI SDK lookup rules. A `key_file` of `~` or starting with `~/`
    /// resolves under `home`; other relative paths resolve against `base_dir`.
    pub fn parse(
        content: &str,
        profile: &str,
        base_dir: &Path,
        home: Option<&Path>,
    ) -> Result<Self, String> {
        let sections = parse_sections(content)?;

        let selected = sections
            .get(profile)
            .ok_or_else(|| format!("profile [{}] not found", profile))?;
        let defaults = sections.get(DEFAULT_PROFILE);

        let get = |key: &str| -> Option<&str> {
            selected
                .get(key)
                .or_else(|| defaults.and_then(|d| d.get(key)))
                .map(String::as_str)
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| -> Result<String, String> {
            get(key)
                .map(str::to_string)
                .ok_or_else(|| format!("missing '{}' in profile [{}]", key, profile))
        };

        if get("pass_phrase").is_some() {
            return Err("encrypted API keys (pass_phrase) are not supported".to_string());
        }

        let key_file = expand_key_path(&require("key_file")?, base_dir, home)?;

        Ok(Self {
            user: require("user")?,
            fingerprint: require("fingerprint")?,
            tenancy: require("tenancy")?,
            region: require("region")?,
            key_file,
        })
    }

    /// Key id used in the request signature
    pub fn key_id(&self) -> String {
        format!("{}/{}/{}", self.tenancy, self.user, self.fingerprint)
    }

    /// Core Services endpoint for the profile's region
    pub fn core_endpoint(&self) -> String {
        format!("https://iaas.{}.oraclecloud.com", self.region)
    }
}

fn parse_sections(content: &str) -> Result<HashMap<String, HashMap<String, String>>, String> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for (number, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| format!("line {}: expected key=value", number + 1))?;
        let section = current
            .as_ref()
            .ok_or_else(|| format!("line {}: entry outside of a [profile] section", number + 1))?;

        sections
            .entry(section.clone())
            .or_default()
            .insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(sections)
}

fn expand_key_path(raw: &str, base_dir: &Path, home: Option<&Path>) -> Result<PathBuf, String> {
    if raw == "~" || raw.starts_with("~/") {
        let home = home.ok_or_else(|| format!("key_file {} needs HOME, which is not set", raw))?;
        return Ok(match raw.strip_prefix("~/") {
            Some(rest) => home.join(rest),
            None => home.to_path_buf(),
        });
    }

    let path = PathBuf::from(raw);
    if path.is_relative() {
        Ok(base_dir.join(path))
    } else {
        Ok(path)
    }
}
