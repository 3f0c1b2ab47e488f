pub mod loader;
pub mod schema;
pub mod version;

pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    BuildConfiguration, BuildSettings, CompressorSettings, IcuMode, MinifySettings,
    ParseEnumError, PatchSettings, ReleaseSettings, Settings, TargetArch, UpstreamSettings,
    ValidationError, ValidationIssue, FILE_PLACEHOLDER,
};
pub use version::{major_version, meets_minimum_major, VersionError, MIN_CLANG_CL_MAJOR};
