//! End-to-end variant pipeline.
//!
//! ```text
//! preconditions -> identity -> ledger -> workspace { fetch, minify, patch, build } -> teardown -> publish
//! ```
//!
//! The workspace is released on every path out of the protected block, and
//! nothing is published unless the build and the teardown both succeeded.

use crate::build::{
    dispatcher_for, validate_preconditions, ArtifactDescriptor, BuildContext, BuildError,
    CommandRunner, PreconditionError,
};
use crate::config::{BuildConfiguration, Settings};
use crate::host::{HostError, ReleaseHost, ReleaseUpload};
use crate::identity::VariantIdentity;
use crate::ledger::{PlatformExpectations, PublicationLedger};
use crate::minify::Minifier;
use crate::patch::{apply_to_file, build_patch_plan, PatchError, PatchPolicy};
use crate::platform::HostPlatform;
use crate::source::{FetchError, SourceFetcher};
use crate::workspace::{StagingArea, Workspace, WorkspaceError};
use thiserror::Error;
use tracing::{info, info_span, warn};

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error("release lookup failed: {0}")]
    Ledger(#[source] HostError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("patching failed: {0}")]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("failed to publish {asset}: {source}")]
    Publish {
        asset: String,
        #[source]
        source: HostError,
    },
}

impl OrchestratorError {
    /// True when the run stopped before touching disk or network.
    pub fn is_precondition(&self) -> bool {
        matches!(self, OrchestratorError::Precondition(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RunOutcome reports whether anything was published"]
pub enum RunOutcome {
    /// The release already carries this variant; nothing was done.
    AlreadyPublished { identity: VariantIdentity },
    /// The variant was built and these assets were uploaded.
    Published {
        identity: VariantIdentity,
        assets: Vec<String>,
    },
}

impl RunOutcome {
    pub fn identity(&self) -> &VariantIdentity {
        match self {
            RunOutcome::AlreadyPublished { identity } | RunOutcome::Published { identity, .. } => {
                identity
            }
        }
    }
}

/// Collaborators and settings for one or more variant runs.
pub struct Orchestrator<'a> {
    pub settings: &'a Settings,
    pub host: HostPlatform,
    pub releases: &'a dyn ReleaseHost,
    pub fetcher: &'a dyn SourceFetcher,
    pub runner: &'a dyn CommandRunner,
    pub minifier: &'a dyn Minifier,
}

impl Orchestrator<'_> {
    /// Build and publish `config` unless it is already published.
    pub fn run(&self, config: &BuildConfiguration) -> Result<RunOutcome, OrchestratorError> {
        validate_preconditions(config, self.host)?;

        let identity = VariantIdentity::compute(config);
        let span = info_span!("variant", identity = %identity);
        let _enter = span.enter();

        let expectations = PlatformExpectations::new(&identity, self.host);
        let published = PublicationLedger::new(self.releases)
            .already_published(&config.target_version, &expectations)
            .map_err(OrchestratorError::Ledger)?;
        if published {
            info!("release already exists, skipping");
            return Ok(RunOutcome::AlreadyPublished { identity });
        }

        let root = self.settings.workspace_root();
        let staging = StagingArea::acquire(&root)?;
        let workspace = Workspace::acquire(&root)?;

        let built = self.build_in(&workspace, &staging, config, &identity);
        let released = workspace.release();
        let artifacts = built?;
        released?;

        let assets = self.publish(config, &artifacts)?;
        Ok(RunOutcome::Published { identity, assets })
    }

    /// The protected block: everything that needs the checkout.
    fn build_in(
        &self,
        workspace: &Workspace,
        staging: &StagingArea,
        config: &BuildConfiguration,
        identity: &VariantIdentity,
    ) -> Result<Vec<ArtifactDescriptor>, OrchestratorError> {
        self.fetcher.fetch(
            &self.settings.upstream.repository,
            &config.target_version,
            workspace.path(),
        )?;

        if let Err(e) = self.minifier.minify(workspace) {
            warn!(error = %e, "failed to minify embedded scripts, continuing");
        }

        let plan = build_patch_plan(config, self.host);
        let configure = workspace.resolve(&self.settings.upstream.configure_file)?;
        let _report = apply_to_file(
            &plan,
            &configure,
            PatchPolicy::from_strict(self.settings.patches.strict),
        )?;

        let ctx = BuildContext {
            workspace: workspace.path(),
            staging: staging.path(),
            identity,
            settings: &self.settings.build,
            runner: self.runner,
        };
        Ok(dispatcher_for(self.host).run_build(config, &ctx)?)
    }

    fn publish(
        &self,
        config: &BuildConfiguration,
        artifacts: &[ArtifactDescriptor],
    ) -> Result<Vec<String>, OrchestratorError> {
        let mut assets = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let upload = ReleaseUpload {
                tag: &config.target_version,
                release_name: &config.target_version,
                release_notes: &self.settings.release.notes,
                file_name: &artifact.name,
                file_path: &artifact.local_path,
            };
            self.releases
                .create_or_update_release(&upload)
                .map_err(|source| OrchestratorError::Publish {
                    asset: artifact.name.clone(),
                    source,
                })?;
            info!(asset = %artifact.name, "published");
            assets.push(artifact.name.clone());
        }
        Ok(assets)
    }
}
