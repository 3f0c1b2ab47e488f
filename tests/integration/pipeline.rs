//! Orchestrator scenarios: identity, ledger gate, patching, dispatch,
//! teardown and publication.

use crate::fakes::{FailingMinifier, FakeToolchain, RecordingHost, StubFetcher};
use nanode_builder::config::{BuildConfiguration, IcuMode, Settings};
use nanode_builder::minify::{Minifier, SkipMinify};
use nanode_builder::{
    HostPlatform, Orchestrator, OrchestratorError, PreconditionError, RunOutcome,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

struct Harness {
    root: TempDir,
    settings: Settings,
    host: RecordingHost,
    fetcher: StubFetcher,
    toolchain: FakeToolchain,
}

impl Harness {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let settings = Settings {
            workspace_root: Some(root.path().join("builds")),
            ..Settings::default()
        };
        Self {
            root,
            settings,
            host: RecordingHost::default(),
            fetcher: StubFetcher::new(),
            toolchain: FakeToolchain::default(),
        }
    }

    fn run(
        &self,
        platform: HostPlatform,
        config: &BuildConfiguration,
    ) -> Result<RunOutcome, OrchestratorError> {
        self.run_with(platform, config, &SkipMinify)
    }

    fn run_with(
        &self,
        platform: HostPlatform,
        config: &BuildConfiguration,
        minifier: &dyn Minifier,
    ) -> Result<RunOutcome, OrchestratorError> {
        Orchestrator {
            settings: &self.settings,
            host: platform,
            releases: &self.host,
            fetcher: &self.fetcher,
            runner: &self.toolchain,
            minifier,
        }
        .run(config)
    }

    fn builds_dir(&self) -> &Path {
        self.settings.workspace_root.as_deref().unwrap()
    }

    /// Nothing left behind: no checkout, no staging directory.
    fn assert_torn_down(&self) {
        let builds = self.builds_dir();
        if builds.exists() {
            let leftovers: Vec<_> = fs::read_dir(builds).unwrap().collect();
            assert!(leftovers.is_empty(), "leftover directories: {:?}", leftovers);
        }
        assert!(self.root.path().exists());
    }

    fn patched_configure(&self) -> String {
        self.toolchain
            .configure_snapshot
            .borrow()
            .clone()
            .expect("build never reached configure")
    }
}

#[test]
fn test_default_variant_on_unix() {
    let harness = Harness::new();
    let config = BuildConfiguration {
        target_version: "v18.x".to_string(),
        icu_mode: IcuMode::Full,
        ..BuildConfiguration::default()
    };

    let outcome = harness.run(HostPlatform::Unix, &config).unwrap();
    assert_eq!(outcome.identity().as_str(), "nanode-v18.x-icu_full-x64");

    let calls = harness.fetcher.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "https://github.com/nodejs/node");
    assert_eq!(calls[0].1, "v18.x");

    // Only the unconditional trimming step ran.
    let configure = harness.patched_configure();
    assert!(configure.contains("if True:\n    o['variables']['node_install_npm']"));
    assert!(!configure.contains("options.without_"));
    assert!(configure.contains("b(options.v8_enable_pointer_compression)"));
    assert!(configure.contains("b(options.enable_lto)"));
    assert!(configure.contains("b(options.v8_lite_mode)"));

    assert_eq!(
        harness.toolchain.commands(),
        vec![
            "./configure --with-intl=full-icu",
            "make -j4",
            "strip out/Release/node",
        ]
    );

    let uploads = harness.host.uploads.borrow();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].file_name, "nanode-v18.x-icu_full-x64");
    assert_eq!(uploads[0].tag, "v18.x");
    assert_eq!(uploads[0].release_name, "v18.x");
    assert_eq!(uploads[0].notes, "Upload");
    assert_eq!(uploads[0].bytes, b"stripped");

    harness.assert_torn_down();
}

#[test]
fn test_compressed_variant_publishes_both_binaries() {
    let harness = Harness::new();
    let config = BuildConfiguration {
        make_compressed_build: true,
        ..BuildConfiguration::new("v18.x")
    };

    let outcome = harness.run(HostPlatform::Unix, &config).unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Published {
            identity: outcome.identity().clone(),
            assets: vec![
                "nanode-v18.x-icu_full-x64".to_string(),
                "nanode-v18.x-icu_full-x64-upx".to_string(),
            ],
        }
    );

    let uploads = harness.host.uploads.borrow();
    assert_eq!(uploads[0].bytes, b"stripped");
    assert_eq!(uploads[1].bytes, b"compressed");
    harness.assert_torn_down();
}

#[test]
fn test_clang_cl_on_old_version_aborts_before_clone() {
    let harness = Harness::new();
    let config = BuildConfiguration {
        use_clang_cl: true,
        ..BuildConfiguration::new("v16.x")
    };

    let err = harness.run(HostPlatform::Windows, &config).unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Precondition(PreconditionError::ClangClRequiresVersion { .. })
    ));
    assert_eq!(harness.host.lookups.get(), 0);
    assert!(harness.fetcher.calls.borrow().is_empty());
    assert!(harness.toolchain.calls.borrow().is_empty());
    assert!(!harness.builds_dir().exists());
}

#[test]
fn test_clang_cl_outside_windows_aborts() {
    let harness = Harness::new();
    let config = BuildConfiguration {
        use_clang_cl: true,
        ..BuildConfiguration::new("v22.x")
    };

    let err = harness.run(HostPlatform::Unix, &config).unwrap_err();
    assert!(err.is_precondition());
    assert!(harness.fetcher.calls.borrow().is_empty());
}

#[test]
fn test_already_published_is_a_no_op() {
    let mut harness = Harness::new();
    harness.host = RecordingHost::with_assets("v18.x", &["nanode-v18.x-icu_full-x64"]);

    let outcome = harness
        .run(HostPlatform::Unix, &BuildConfiguration::new("v18.x"))
        .unwrap();
    assert!(matches!(outcome, RunOutcome::AlreadyPublished { .. }));
    assert_eq!(harness.host.lookups.get(), 1);
    assert!(harness.fetcher.calls.borrow().is_empty());
    assert!(harness.toolchain.calls.borrow().is_empty());
    assert!(harness.host.uploads.borrow().is_empty());
    assert!(!harness.builds_dir().exists());
}

#[test]
fn test_other_platform_asset_does_not_count_as_published() {
    let mut harness = Harness::new();
    harness.host = RecordingHost::with_assets("v18.x", &["nanode-v18.x-icu_full-x64"]);

    let outcome = harness
        .run(HostPlatform::Windows, &BuildConfiguration::new("v18.x"))
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Published { .. }));
    assert_eq!(
        harness.host.uploaded_names(),
        vec![
            "nanode-v18.x-icu_full-x64.exe",
            "nanode-v18.x-icu_full-x64.pdb",
        ]
    );
}

#[test]
fn test_windows_variant_with_every_flag() {
    let harness = Harness::new();
    let config = BuildConfiguration {
        enable_v8_debug_opts: true,
        disable_jit: true,
        enable_lto: true,
        use_clang_cl: true,
        enable_pointer_compression: true,
        make_compressed_build: true,
        ..BuildConfiguration::new("v22.x")
    };

    let outcome = harness.run(HostPlatform::Windows, &config).unwrap();
    let identity = "nanode-v22.x-icu_full-v8_opts-nojit-lto-clang-ptr_compr-x64";
    assert_eq!(outcome.identity().as_str(), identity);

    assert_eq!(
        harness.toolchain.commands()[0],
        "cmd /c vcbuild.bat x64 full-icu clang-cl"
    );
    assert_eq!(
        harness.host.uploaded_names(),
        vec![
            format!("{identity}.exe"),
            format!("{identity}.pdb"),
            format!("{identity}-upx.exe"),
        ]
    );

    let configure = harness.patched_configure();
    assert!(configure.contains("b(True)"));
    assert!(!configure.contains("options.with_ltcg"));
    // The Windows LTO token differs; the Unix one stays.
    assert!(configure.contains("options.enable_lto"));
    assert!(configure.contains("0 if True else 1"));
    assert!(configure.contains("1 if False else 0"));
    harness.assert_torn_down();
}

#[test]
fn test_build_failure_tears_down_without_publishing() {
    let mut harness = Harness::new();
    harness.toolchain = FakeToolchain::failing_on("make");

    let err = harness
        .run(HostPlatform::Unix, &BuildConfiguration::default())
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Build(_)));
    assert!(err.to_string().contains("make -j4"));
    assert!(harness.host.uploads.borrow().is_empty());
    harness.assert_torn_down();
}

#[test]
fn test_strict_patch_failure_tears_down_before_build() {
    let mut harness = Harness::new();
    harness.settings.patches.strict = true;
    harness.fetcher = StubFetcher::with_configure("# configure.py from the future\n");

    let err = harness
        .run(HostPlatform::Unix, &BuildConfiguration::default())
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Patch(_)));
    assert!(harness.toolchain.calls.borrow().is_empty());
    assert!(harness.host.uploads.borrow().is_empty());
    harness.assert_torn_down();
}

#[test]
fn test_lenient_patching_skips_missing_tokens() {
    let mut harness = Harness::new();
    harness.fetcher = StubFetcher::with_configure("# nothing to patch\n");

    let outcome = harness
        .run(HostPlatform::Unix, &BuildConfiguration::default())
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Published { .. }));
    assert_eq!(harness.patched_configure(), "# nothing to patch\n");
    assert_eq!(harness.host.uploads.borrow().len(), 1);
}

#[test]
fn test_missing_configure_file_fails_in_workspace() {
    let mut harness = Harness::new();
    harness.settings.upstream.configure_file = "tools/configure.py".to_string();

    let err = harness
        .run(HostPlatform::Unix, &BuildConfiguration::default())
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Workspace(_)));
    harness.assert_torn_down();
}

#[test]
fn test_minify_failure_is_swallowed() {
    let harness = Harness::new();
    let minifier = FailingMinifier::new();

    let outcome = harness
        .run_with(HostPlatform::Unix, &BuildConfiguration::default(), &minifier)
        .unwrap();
    assert!(minifier.called.get());
    assert!(matches!(outcome, RunOutcome::Published { .. }));
}

#[test]
fn test_ledger_error_is_fatal() {
    let mut harness = Harness::new();
    harness.host.fail_lookup = true;

    let err = harness
        .run(HostPlatform::Unix, &BuildConfiguration::default())
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Ledger(_)));
    assert!(harness.fetcher.calls.borrow().is_empty());
}

#[test]
fn test_publish_failure_names_asset() {
    let mut harness = Harness::new();
    harness.host.fail_upload = true;

    let err = harness
        .run(HostPlatform::Unix, &BuildConfiguration::default())
        .unwrap_err();
    match err {
        OrchestratorError::Publish { asset, .. } => {
            assert_eq!(asset, "nanode-v18.x-icu_full-x64")
        }
        other => panic!("unexpected error: {other}"),
    }
    harness.assert_torn_down();
}

#[test]
fn test_sequential_runs_share_nothing() {
    let harness = Harness::new();
    let first = harness
        .run(HostPlatform::Unix, &BuildConfiguration::new("v18.x"))
        .unwrap();
    let second = harness
        .run(HostPlatform::Unix, &BuildConfiguration::new("v20.x"))
        .unwrap();
    assert_ne!(first.identity(), second.identity());

    let calls = harness.fetcher.calls.borrow();
    assert_ne!(calls[0].2, calls[1].2);
    assert_eq!(
        harness.host.uploaded_names(),
        vec!["nanode-v18.x-icu_full-x64", "nanode-v20.x-icu_full-x64"]
    );
    harness.assert_torn_down();
}
