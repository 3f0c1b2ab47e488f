//! Best-effort minification of the JavaScript bundled into the binary.
//!
//! Failures here never fail a build; the orchestrator logs and moves on.

use crate::build::{CommandRunner, Invocation, RunError};
use crate::config::{MinifySettings, FILE_PLACEHOLDER};
use crate::workspace::{Workspace, WorkspaceError};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum MinifyError {
    #[error("minify target unavailable: {0}")]
    Target(#[from] WorkspaceError),

    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("minifier failed: {0}")]
    Tool(#[from] RunError),
}

pub trait Minifier {
    /// Minify the embedded script assets in `workspace`, returning the file count.
    fn minify(&self, workspace: &Workspace) -> Result<usize, MinifyError>;
}

/// Leaves the checkout untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipMinify;

impl Minifier for SkipMinify {
    fn minify(&self, _workspace: &Workspace) -> Result<usize, MinifyError> {
        Ok(0)
    }
}

/// Runs an external minifier once per target file.
pub struct CommandMinifier<'a> {
    settings: &'a MinifySettings,
    runner: &'a dyn CommandRunner,
}

impl<'a> CommandMinifier<'a> {
    pub fn new(settings: &'a MinifySettings, runner: &'a dyn CommandRunner) -> Self {
        Self { settings, runner }
    }

    /// Expand configured targets into the `.js` files they name.
    pub fn collect_files(&self, workspace: &Workspace) -> Result<Vec<PathBuf>, MinifyError> {
        let mut files = Vec::new();
        for target in &self.settings.targets {
            let resolved = workspace.resolve(target)?;
            if resolved.is_file() {
                files.push(resolved);
                continue;
            }
            for entry in WalkDir::new(&resolved).sort_by_file_name() {
                let entry = entry.map_err(|source| MinifyError::Walk {
                    path: resolved.clone(),
                    source,
                })?;
                let is_js = entry.path().extension().and_then(|ext| ext.to_str()) == Some("js");
                if entry.file_type().is_file() && is_js {
                    files.push(entry.into_path());
                }
            }
        }
        Ok(files)
    }

    fn invocation(&self, workspace: &Workspace, file: &std::path::Path) -> Invocation {
        let rendered = file.to_string_lossy();
        Invocation::new(&self.settings.program, workspace.path()).args(
            self.settings
                .args
                .iter()
                .map(|arg| arg.replace(FILE_PLACEHOLDER, &rendered)),
        )
    }
}

impl Minifier for CommandMinifier<'_> {
    fn minify(&self, workspace: &Workspace) -> Result<usize, MinifyError> {
        let files = self.collect_files(workspace)?;
        for file in &files {
            debug!(file = %file.display(), "minifying");
            self.runner.run(&self.invocation(workspace, file))?;
        }
        info!(files = files.len(), "minified embedded scripts");
        Ok(files.len())
    }
}
