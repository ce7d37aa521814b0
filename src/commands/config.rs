//! Command configuration resolved from CLI flags and the environment.

use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Catalog endpoint used when neither `--api-url` nor `DAPI_API_URL` is given.
pub const DEFAULT_API_URL: &str = "https://dapi.devassistant.org/api/";

/// When set, structured catalog fetches return this payload instead.
pub const FAKE_DATA_ENV: &str = "DAPI_FAKE_DATA";

/// Values given on the command line. `None` means "use the default".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub install_root: Option<PathBuf>,
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub install_root: PathBuf,
    /// Always ends with `/`.
    pub api_url: String,
    pub fake_data: Option<String>,
}

impl Config {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, overrides: ConfigOverrides) -> Result<Self> {
        let install_root = match overrides.install_root {
            Some(path) => normalize_root(runtime, path)?,
            None => default_install_root(runtime)?,
        };

        let mut api_url = overrides
            .api_url
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !api_url.ends_with('/') {
            api_url.push('/');
        }

        let fake_data = runtime.env_var(FAKE_DATA_ENV).ok();
        if fake_data.is_some() {
            debug!("{} is set, catalog fetches are faked", FAKE_DATA_ENV);
        }

        debug!("Install root {:?}, catalog {}", install_root, api_url);
        Ok(Self {
            install_root,
            api_url,
            fake_data,
        })
    }

    #[cfg(test)]
    pub fn for_test(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            api_url: DEFAULT_API_URL.to_string(),
            fake_data: None,
        }
    }
}

/// `/usr/share/devassistant` for privileged users, `~/.devassistant` otherwise.
#[tracing::instrument(skip(runtime))]
pub fn default_install_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    if runtime.is_privileged() {
        Ok(system_install_root())
    } else {
        let home_dir = runtime
            .home_dir()
            .context("Could not find home directory")?;
        Ok(home_dir.join(".devassistant"))
    }
}

#[cfg(not(windows))]
fn system_install_root() -> PathBuf {
    PathBuf::from("/usr/share/devassistant")
}

#[cfg(windows)]
fn system_install_root() -> PathBuf {
    PathBuf::from(r"C:\ProgramData\devassistant")
}

/// Expand a leading `~` and drop trailing separators.
fn normalize_root<R: Runtime>(runtime: &R, path: PathBuf) -> Result<PathBuf> {
    let text = path.to_string_lossy();
    let expanded = if text == "~" {
        runtime.home_dir().context("Could not find home directory")?
    } else if let Some(rest) = text.strip_prefix("~/") {
        runtime
            .home_dir()
            .context("Could not find home directory")?
            .join(rest)
    } else {
        path.clone()
    };

    let trimmed = expanded
        .to_string_lossy()
        .trim_end_matches('/')
        .to_string();
    if trimmed.is_empty() {
        return Ok(expanded);
    }
    Ok(PathBuf::from(trimmed))
}
