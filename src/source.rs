//! Upstream checkout.

use crate::build::{CommandRunner, Invocation, ProcessRunner, RunError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to check out {repository}@{tag}: {source}")]
    Clone {
        repository: String,
        tag: String,
        #[source]
        source: RunError,
    },

    #[error("checkout destination has no parent: {}", .0.display())]
    InvalidDestination(PathBuf),
}

pub trait SourceFetcher {
    /// Produce a shallow single-branch checkout of `tag` rooted at `dest`.
    ///
    /// `dest` exists and is empty.
    fn fetch(&self, repository: &str, tag: &str, dest: &Path) -> Result<(), FetchError>;
}

/// Shallow `git clone` through a [`CommandRunner`].
pub struct GitClone<R = ProcessRunner> {
    runner: R,
}

impl GitClone<ProcessRunner> {
    pub fn new() -> Self {
        Self {
            runner: ProcessRunner,
        }
    }
}

impl Default for GitClone<ProcessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> GitClone<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    /// The clone invocation for `tag` into `dest`.
    pub fn invocation(repository: &str, tag: &str, dest: &Path) -> Result<Invocation, FetchError> {
        let parent = dest
            .parent()
            .ok_or_else(|| FetchError::InvalidDestination(dest.to_path_buf()))?;
        Ok(Invocation::new("git", parent)
            .args(["clone", "--depth", "1", "--single-branch", "--branch", tag, repository])
            .arg(dest.to_string_lossy()))
    }
}

impl<R: CommandRunner> SourceFetcher for GitClone<R> {
    fn fetch(&self, repository: &str, tag: &str, dest: &Path) -> Result<(), FetchError> {
        info!(repository, tag, dest = %dest.display(), "cloning upstream");
        let invocation = Self::invocation(repository, tag, dest)?;
        self.runner
            .run(&invocation)
            .map_err(|source| FetchError::Clone {
                repository: repository.to_string(),
                tag: tag.to_string(),
                source,
            })
    }
}
