use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, error};

const WORKSPACE_PREFIX: &str = "nanode-src-";
const STAGING_PREFIX: &str = "nanode-artifacts-";

/// Exclusively owned checkout directory for one build.
///
/// Each workspace is a fresh uniquely named directory under the configured
/// root, so concurrent runs never share a checkout. The directory is removed
/// by [`Workspace::release`], or on drop if release is never reached.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    /// Canonical form of `dir`, used for containment checks
    root: PathBuf,
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("failed to create workspace under {}: {source}", parent.display())]
    Create {
        parent: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path is outside workspace: {} (workspace: {})", path.display(), workspace.display())]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("failed to resolve {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove workspace {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Workspace {
    /// Create a fresh, empty workspace directory under `parent`.
    pub fn acquire(parent: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let dir = create_dir(parent.as_ref(), WORKSPACE_PREFIX)?;
        let root = dir.path().canonicalize().map_err(|source| WorkspaceError::Resolve {
            path: dir.path().to_path_buf(),
            source,
        })?;
        debug!(path = %root.display(), "acquired workspace");
        Ok(Self { dir, root })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Resolve `path` against the workspace and reject anything that escapes it.
    ///
    /// Relative paths are joined to the workspace root. The result is
    /// canonicalized, so the target must exist and symlinks pointing outside
    /// the checkout are refused.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, WorkspaceError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let canonical = absolute
            .canonicalize()
            .map_err(|source| WorkspaceError::Resolve {
                path: absolute.clone(),
                source,
            })?;

        if !canonical.starts_with(&self.root) {
            return Err(WorkspaceError::OutsideWorkspace {
                path: canonical,
                workspace: self.root.clone(),
            });
        }
        Ok(canonical)
    }

    /// Remove the workspace directory and everything in it.
    pub fn release(self) -> Result<(), WorkspaceError> {
        let path = self.dir.path().to_path_buf();
        debug!(path = %path.display(), "releasing workspace");
        self.dir.close().map_err(|source| {
            error!(path = %path.display(), error = %source, "workspace removal failed");
            WorkspaceError::Remove { path, source }
        })
    }
}

/// Directory outside the checkout where artifacts are copied as they are
/// registered, so they survive in-place post-processing and the workspace
/// teardown that precedes publication.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    pub fn acquire(parent: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        Ok(Self {
            dir: create_dir(parent.as_ref(), STAGING_PREFIX)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn create_dir(parent: &Path, prefix: &str) -> Result<TempDir, WorkspaceError> {
    std::fs::create_dir_all(parent).map_err(|source| WorkspaceError::Create {
        parent: parent.to_path_buf(),
        source,
    })?;
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir_in(parent)
        .map_err(|source| WorkspaceError::Create {
            parent: parent.to_path_buf(),
            source,
        })
}
