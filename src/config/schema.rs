use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// How internationalization data is compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IcuMode {
    #[default]
    Full,
    Small,
    System,
    None,
}

impl IcuMode {
    pub const ALL: [IcuMode; 4] = [IcuMode::Full, IcuMode::Small, IcuMode::System, IcuMode::None];

    pub fn as_str(self) -> &'static str {
        match self {
            IcuMode::Full => "full",
            IcuMode::Small => "small",
            IcuMode::System => "system",
            IcuMode::None => "none",
        }
    }
}

/// CPU architecture the binary is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetArch {
    #[default]
    X64,
    Arm64,
    X86,
}

impl TargetArch {
    pub const ALL: [TargetArch; 3] = [TargetArch::X64, TargetArch::Arm64, TargetArch::X86];

    pub fn as_str(self) -> &'static str {
        match self {
            TargetArch::X64 => "x64",
            TargetArch::Arm64 => "arm64",
            TargetArch::X86 => "x86",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
    expected: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str, expected: &[&str]) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected: expected.join(", "),
        }
    }
}

impl FromStr for IcuMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IcuMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ParseEnumError::new("icu mode", s, &IcuMode::ALL.map(IcuMode::as_str))
            })
    }
}

impl FromStr for TargetArch {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetArch::ALL
            .into_iter()
            .find(|arch| arch.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ParseEnumError::new("target arch", s, &TargetArch::ALL.map(TargetArch::as_str))
            })
    }
}

impl fmt::Display for IcuMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TargetArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full set of compile-time choices for one variant.
///
/// Constructed once per run and never mutated afterwards. Every field has a
/// default so partial TOML tables and CLI flag sets are valid inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfiguration {
    /// Upstream release branch or tag, e.g. `v18.x` or `v22.11.0`.
    #[serde(alias = "version")]
    pub target_version: String,
    pub icu_mode: IcuMode,
    #[serde(alias = "v8_opts")]
    pub enable_v8_debug_opts: bool,
    pub target_arch: TargetArch,
    #[serde(alias = "no_jit")]
    pub disable_jit: bool,
    #[serde(alias = "use_lto")]
    pub enable_lto: bool,
    #[serde(alias = "win_use_clang_cl")]
    pub use_clang_cl: bool,
    #[serde(alias = "pointer_compression")]
    pub enable_pointer_compression: bool,
    #[serde(alias = "make_upx_build")]
    pub make_compressed_build: bool,
}

pub const DEFAULT_TARGET_VERSION: &str = "v18.x";

impl Default for BuildConfiguration {
    fn default() -> Self {
        Self {
            target_version: DEFAULT_TARGET_VERSION.to_string(),
            icu_mode: IcuMode::default(),
            enable_v8_debug_opts: false,
            target_arch: TargetArch::default(),
            disable_jit: false,
            enable_lto: false,
            use_clang_cl: false,
            enable_pointer_compression: false,
            make_compressed_build: false,
        }
    }
}

impl BuildConfiguration {
    pub fn new(target_version: impl Into<String>) -> Self {
        Self {
            target_version: target_version.into(),
            ..Self::default()
        }
    }
}

/// Operator settings shared by every variant of a run.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub release: ReleaseSettings,
    pub upstream: UpstreamSettings,
    pub build: BuildSettings,
    pub patches: PatchSettings,
    pub minify: MinifySettings,
    /// Parent directory for workspaces and artifact staging.
    pub workspace_root: Option<PathBuf>,
    pub variants: Vec<BuildConfiguration>,
}

impl Settings {
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        let required = [
            ("release.owner", &self.release.owner),
            ("release.repo", &self.release.repo),
            ("release.api_url", &self.release.api_url),
            ("release.upload_url", &self.release.upload_url),
            ("upstream.repository", &self.upstream.repository),
            ("upstream.configure_file", &self.upstream.configure_file),
            ("build.compressor.program", &self.build.compressor.program),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                issues.push(ValidationIssue::MissingField { field });
            }
        }

        if self.build.jobs == 0 {
            issues.push(ValidationIssue::InvalidValue {
                field: "build.jobs",
                message: "must be at least 1".to_string(),
            });
        }

        if self.minify.enabled {
            if self.minify.program.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    field: "minify.program",
                });
            }
            if !self.minify.args.iter().any(|arg| arg.contains(FILE_PLACEHOLDER)) {
                issues.push(ValidationIssue::InvalidValue {
                    field: "minify.args",
                    message: format!("no argument contains the {FILE_PLACEHOLDER} placeholder"),
                });
            }
        }

        for (index, variant) in self.variants.iter().enumerate() {
            if variant.target_version.trim().is_empty() {
                issues.push(ValidationIssue::InvalidVariant {
                    index,
                    message: "target_version is empty".to_string(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseSettings {
    pub owner: String,
    pub repo: String,
    pub notes: String,
    pub api_url: String,
    pub upload_url: String,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            owner: "undefined-moe".to_string(),
            repo: "nanode".to_string(),
            notes: "Upload".to_string(),
            api_url: "https://api.github.com".to_string(),
            upload_url: "https://uploads.github.com".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamSettings {
    pub repository: String,
    /// Build configurator rewritten by the patch plan, relative to the checkout.
    pub configure_file: String,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            repository: "https://github.com/nodejs/node".to_string(),
            configure_file: "configure.py".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSettings {
    /// Parallelism passed to `make` on non-Windows hosts.
    pub jobs: u32,
    pub compressor: CompressorSettings,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            jobs: 4,
            compressor: CompressorSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct CompressorSettings {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            program: "upx".to_string(),
            args: vec!["--best".to_string(), "--ultra-brute".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PatchSettings {
    /// Fail the run when a token never matches anywhere in the plan.
    pub strict: bool,
}

/// Placeholder substituted with the target path in minifier arguments.
pub const FILE_PLACEHOLDER: &str = "{file}";

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct MinifySettings {
    pub enabled: bool,
    pub program: String,
    pub args: Vec<String>,
    /// Files or directories relative to the checkout.
    pub targets: Vec<PathBuf>,
}

impl Default for MinifySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "terser".to_string(),
            args: vec![
                FILE_PLACEHOLDER.to_string(),
                "--compress".to_string(),
                "--mangle".to_string(),
                "--output".to_string(),
                FILE_PLACEHOLDER.to_string(),
            ],
            targets: vec![PathBuf::from("deps/undici/undici.js")],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    MissingField { field: &'static str },
    InvalidValue { field: &'static str, message: String },
    InvalidVariant { index: usize, message: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "missing required field '{field}'")
            }
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid value for '{field}': {message}")
            }
            ValidationIssue::InvalidVariant { index, message } => {
                write!(f, "variant #{index} is invalid: {message}")
            }
        }
    }
}
