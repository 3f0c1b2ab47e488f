use crate::build::{
    release_output, ArtifactDescriptor, BuildContext, BuildDispatcher, BuildError,
    PreconditionError,
};
use crate::config::{BuildConfiguration, IcuMode};
use crate::identity::COMPRESSED_SUFFIX;
use crate::platform::HostPlatform;
use tracing::info;

/// `./configure && make && strip`, optionally followed by compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixBuild;

/// Value for `./configure --with-intl=`.
pub fn configure_intl_arg(mode: IcuMode) -> String {
    match mode {
        IcuMode::None => "none".to_string(),
        other => format!("{}-icu", other.as_str()),
    }
}

impl BuildDispatcher for UnixBuild {
    fn platform(&self) -> HostPlatform {
        HostPlatform::Unix
    }

    fn check(&self, _config: &BuildConfiguration) -> Result<(), PreconditionError> {
        Ok(())
    }

    fn run_build(
        &self,
        config: &BuildConfiguration,
        ctx: &BuildContext<'_>,
    ) -> Result<Vec<ArtifactDescriptor>, BuildError> {
        info!(identity = %ctx.identity, "configuring");
        ctx.run(
            ctx.invocation("./configure")
                .arg(format!("--with-intl={}", configure_intl_arg(config.icu_mode))),
        )?;

        info!(jobs = ctx.settings.jobs, "compiling");
        ctx.run(ctx.invocation("make").arg(format!("-j{}", ctx.settings.jobs)))?;

        let binary = release_output(ctx.workspace, "node");
        ctx.run(ctx.invocation("strip").path_arg(&binary))?;

        let mut artifacts = vec![ctx.register(ctx.identity.asset_name("", None), &binary)?];

        if config.make_compressed_build {
            info!("compressing binary");
            ctx.compress(&binary)?;
            artifacts.push(ctx.register(ctx.identity.asset_name(COMPRESSED_SUFFIX, None), &binary)?);
        }

        Ok(artifacts)
    }
}
