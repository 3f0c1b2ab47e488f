//! Nanode Builder: feature-trimmed Node.js variants, built once and published
//!
//! A [`BuildConfiguration`] names the compile-time features of one variant.
//! The [`Orchestrator`] turns it into a published release asset:
//!
//! 1. Reject configurations the host cannot build ([`build::validate_preconditions`]).
//! 2. Derive the canonical [`VariantIdentity`].
//! 3. Ask the [`PublicationLedger`] whether the release already carries it.
//! 4. Clone upstream into a fresh [`Workspace`], patch `configure.py`
//!    according to a [`PatchPlan`], and run the host's [`BuildDispatcher`].
//! 5. Release the workspace, then upload every staged artifact.
//!
//! # Safety
//!
//! - Workspaces are uniquely named and always removed, even on failure
//! - Patched files are written atomically (tempfile + fsync + rename)
//! - Nothing is published unless the build and teardown both succeeded
//!
//! # Example
//!
//! ```
//! use nanode_builder::{BuildConfiguration, HostPlatform, VariantIdentity};
//! use nanode_builder::patch::build_patch_plan;
//!
//! let config = BuildConfiguration {
//!     enable_lto: true,
//!     ..BuildConfiguration::new("v20.x")
//! };
//!
//! let identity = VariantIdentity::compute(&config);
//! assert_eq!(identity.as_str(), "nanode-v20.x-icu_full-lto-x64");
//!
//! let plan = build_patch_plan(&config, HostPlatform::Unix);
//! assert_eq!(plan.step_ids(), vec!["lto", "trim-bundled-features"]);
//! ```

pub mod build;
pub mod config;
pub mod host;
pub mod identity;
pub mod ledger;
pub mod minify;
pub mod orchestrator;
pub mod patch;
pub mod platform;
pub mod source;
pub mod workspace;

// Re-exports
pub use build::{
    dispatcher_for, validate_preconditions, ArtifactDescriptor, BuildDispatcher, BuildError,
    CommandRunner, Invocation, PreconditionError, ProcessRunner, RunError,
};
pub use config::{
    load_from_path, load_from_str, BuildConfiguration, ConfigError, IcuMode, Settings,
    TargetArch, VersionError,
};
pub use host::{GitHubReleases, HostError, Release, ReleaseHost, ReleaseUpload};
pub use identity::{compute_identity, VariantIdentity};
pub use ledger::{PlatformExpectations, PublicationLedger};
pub use minify::{CommandMinifier, Minifier, MinifyError, SkipMinify};
pub use orchestrator::{Orchestrator, OrchestratorError, RunOutcome};
pub use patch::{apply_to_file, build_patch_plan, PatchError, PatchPlan, PatchPolicy};
pub use platform::HostPlatform;
pub use source::{FetchError, GitClone, SourceFetcher};
pub use workspace::{StagingArea, Workspace, WorkspaceError};
