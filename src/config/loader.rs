//! Settings file loading.
//!
//! A settings file may sit anywhere, so a relative `workspace_root` is taken
//! relative to the directory holding the file rather than the process cwd.

use crate::config::schema::{Settings, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings TOML{}: {source}", origin(path))]
    Toml {
        path: Option<PathBuf>,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("invalid settings{}: {source}", origin(path))]
    Validation {
        path: Option<PathBuf>,
        #[source]
        source: ValidationError,
    },
}

fn origin(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

/// Parse and validate settings that did not come from a file.
///
/// A relative `workspace_root` stays relative to the current directory.
pub fn load_from_str(input: &str) -> Result<Settings, ConfigError> {
    parse(input, None)
}

/// Read, parse and validate the settings file at `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents, Some(path))
}

fn parse(input: &str, file: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = file.map(Path::to_path_buf);
    let mut settings: Settings = toml_edit::de::from_str(input).map_err(|source| {
        ConfigError::Toml {
            path: path.clone(),
            source,
        }
    })?;
    settings
        .validate()
        .map_err(|source| ConfigError::Validation { path, source })?;

    if let (Some(root), Some(dir)) = (&settings.workspace_root, file.and_then(Path::parent)) {
        if root.is_relative() {
            settings.workspace_root = Some(dir.join(root));
        }
    }
    Ok(settings)
}
