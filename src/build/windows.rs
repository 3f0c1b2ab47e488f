use crate::build::{
    release_output, ArtifactDescriptor, BuildContext, BuildDispatcher, BuildError,
    PreconditionError,
};
use crate::config::{BuildConfiguration, IcuMode};
use crate::identity::COMPRESSED_SUFFIX;
use crate::platform::HostPlatform;
use tracing::info;

/// `vcbuild.bat <arch> <icu> [clang-cl]`, optionally followed by compression.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsBuild;

/// ICU token understood by `vcbuild.bat`. System ICU has no equivalent.
pub fn vcbuild_icu_arg(mode: IcuMode) -> Option<&'static str> {
    match mode {
        IcuMode::Full => Some("full-icu"),
        IcuMode::Small => Some("small-icu"),
        IcuMode::None => Some("intl-none"),
        IcuMode::System => None,
    }
}

impl BuildDispatcher for WindowsBuild {
    fn platform(&self) -> HostPlatform {
        HostPlatform::Windows
    }

    fn check(&self, config: &BuildConfiguration) -> Result<(), PreconditionError> {
        match vcbuild_icu_arg(config.icu_mode) {
            Some(_) => Ok(()),
            None => Err(PreconditionError::UnsupportedIcuMode {
                mode: config.icu_mode,
                host: HostPlatform::Windows,
            }),
        }
    }

    fn run_build(
        &self,
        config: &BuildConfiguration,
        ctx: &BuildContext<'_>,
    ) -> Result<Vec<ArtifactDescriptor>, BuildError> {
        self.check(config)?;
        let icu = vcbuild_icu_arg(config.icu_mode).unwrap_or_default();

        let mut vcbuild = ctx
            .invocation("cmd")
            .args(["/c", "vcbuild.bat", config.target_arch.as_str(), icu]);
        if config.use_clang_cl {
            vcbuild = vcbuild.arg("clang-cl");
        }
        info!(identity = %ctx.identity, command = %vcbuild, "compiling");
        ctx.run(vcbuild)?;

        let binary = release_output(ctx.workspace, "node.exe");
        let symbols = release_output(ctx.workspace, "node.pdb");

        let mut artifacts = vec![
            ctx.register(ctx.identity.asset_name("", Some("exe")), &binary)?,
            ctx.register(ctx.identity.asset_name("", Some("pdb")), &symbols)?,
        ];

        if config.make_compressed_build {
            info!("compressing binary");
            ctx.compress(&binary)?;
            artifacts.push(
                ctx.register(ctx.identity.asset_name(COMPRESSED_SUFFIX, Some("exe")), &binary)?,
            );
        }

        Ok(artifacts)
    }
}
