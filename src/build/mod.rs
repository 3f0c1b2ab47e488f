//! Platform-dispatched build execution.
//!
//! A [`BuildDispatcher`] turns a patched checkout into a list of staged
//! artifacts. There is one implementation per host family, selected once at
//! run start by [`dispatcher_for`].

pub mod runner;
pub mod unix;
pub mod windows;

pub use runner::{CommandRunner, Invocation, ProcessRunner, RunError};
pub use unix::UnixBuild;
pub use windows::WindowsBuild;

use crate::config::{
    meets_minimum_major, BuildConfiguration, BuildSettings, IcuMode, VersionError,
    MIN_CLANG_CL_MAJOR,
};
use crate::identity::VariantIdentity;
use crate::platform::HostPlatform;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// A build output ready for publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// Asset name on the release host.
    pub name: String,
    /// Staged copy outside the workspace.
    pub local_path: PathBuf,
}

/// Requested features that cannot be built on this host or version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("target version is empty")]
    EmptyVersion,

    #[error("clang-cl is only supported on Windows (host: {host})")]
    ClangClRequiresWindows { host: HostPlatform },

    #[error("clang-cl is only supported on Node.js {minimum} and above (requested {version})")]
    ClangClRequiresVersion { version: String, minimum: u64 },

    #[error("cannot check clang-cl support: {0}")]
    Version(#[from] VersionError),

    #[error("icu mode '{mode}' is not supported by the {host} build script")]
    UnsupportedIcuMode { mode: IcuMode, host: HostPlatform },
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("build step failed: {0}")]
    Step(#[from] RunError),

    #[error("expected build output missing: {}", path.display())]
    MissingOutput { path: PathBuf },

    #[error("failed to stage artifact {name}: {source}")]
    Stage {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

/// Everything a dispatcher needs besides the configuration.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    /// Root of the patched checkout; every invocation runs here.
    pub workspace: &'a Path,
    /// Directory receiving staged copies of registered artifacts.
    pub staging: &'a Path,
    pub identity: &'a VariantIdentity,
    pub settings: &'a BuildSettings,
    pub runner: &'a dyn CommandRunner,
}

impl BuildContext<'_> {
    pub fn invocation(&self, program: impl Into<String>) -> Invocation {
        Invocation::new(program, self.workspace)
    }

    pub fn run(&self, invocation: Invocation) -> Result<(), BuildError> {
        self.runner.run(&invocation)?;
        Ok(())
    }

    /// Compress `binary` in place with the configured external compressor.
    pub fn compress(&self, binary: &Path) -> Result<(), BuildError> {
        let compressor = &self.settings.compressor;
        self.run(
            self.invocation(&compressor.program)
                .args(compressor.args.iter().cloned())
                .path_arg(binary),
        )
    }

    /// Copy `source` into staging under `name` and describe it.
    ///
    /// Staging happens at registration time so later in-place steps (the
    /// compressor) do not change what an earlier descriptor points at.
    pub fn register(&self, name: String, source: &Path) -> Result<ArtifactDescriptor, BuildError> {
        if !source.is_file() {
            return Err(BuildError::MissingOutput {
                path: source.to_path_buf(),
            });
        }
        let local_path = self.staging.join(&name);
        fs::copy(source, &local_path).map_err(|source| BuildError::Stage {
            name: name.clone(),
            source,
        })?;
        debug!(artifact = %name, path = %local_path.display(), "registered artifact");
        Ok(ArtifactDescriptor { name, local_path })
    }
}

pub trait BuildDispatcher {
    fn platform(&self) -> HostPlatform;

    /// Reject configurations this dispatcher cannot build.
    fn check(&self, config: &BuildConfiguration) -> Result<(), PreconditionError>;

    /// Run the full build sequence and return the staged artifacts.
    fn run_build(
        &self,
        config: &BuildConfiguration,
        ctx: &BuildContext<'_>,
    ) -> Result<Vec<ArtifactDescriptor>, BuildError>;
}

/// The dispatcher for `host`.
pub fn dispatcher_for(host: HostPlatform) -> &'static dyn BuildDispatcher {
    match host {
        HostPlatform::Windows => &WindowsBuild,
        HostPlatform::Unix => &UnixBuild,
    }
}

/// Checks shared by every host, followed by the dispatcher's own.
///
/// Runs before anything touches the disk or network.
pub fn validate_preconditions(
    config: &BuildConfiguration,
    host: HostPlatform,
) -> Result<(), PreconditionError> {
    if config.target_version.trim().is_empty() {
        return Err(PreconditionError::EmptyVersion);
    }

    if config.use_clang_cl {
        if !host.is_windows() {
            return Err(PreconditionError::ClangClRequiresWindows { host });
        }
        if !meets_minimum_major(&config.target_version, MIN_CLANG_CL_MAJOR)? {
            return Err(PreconditionError::ClangClRequiresVersion {
                version: config.target_version.clone(),
                minimum: MIN_CLANG_CL_MAJOR,
            });
        }
    }

    dispatcher_for(host).check(config)
}

/// Path of the primary build output relative to the checkout.
pub(crate) fn release_output(workspace: &Path, file_name: &str) -> PathBuf {
    workspace.join("out").join("Release").join(file_name)
}
