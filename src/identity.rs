//! Variant naming.
//!
//! The identity doubles as the display name of a build and as the key used to
//! look up already-published assets, so it must be a pure function of the
//! configuration. Segment order is fixed:
//!
//! ```text
//! nanode-<version>-icu_<mode>[-v8_opts][-nojit][-lto][-clang][-ptr_compr]-<arch>
//! ```
//!
//! `make_compressed_build` is not encoded; compression only adds a separately
//! named `-upx` asset next to the primary binary.

use crate::config::BuildConfiguration;
use std::fmt;

pub const IDENTITY_PREFIX: &str = "nanode";

/// Suffix appended to the names of compressed artifacts.
pub const COMPRESSED_SUFFIX: &str = "-upx";

/// Stable name of one build variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantIdentity(String);

impl VariantIdentity {
    /// Derive the identity of `config`.
    ///
    /// ```
    /// use nanode_builder::{BuildConfiguration, VariantIdentity};
    ///
    /// let config = BuildConfiguration::new("v18.x");
    /// assert_eq!(VariantIdentity::compute(&config).as_str(), "nanode-v18.x-icu_full-x64");
    /// ```
    pub fn compute(config: &BuildConfiguration) -> Self {
        let flags = [
            (config.enable_v8_debug_opts, "-v8_opts"),
            (config.disable_jit, "-nojit"),
            (config.enable_lto, "-lto"),
            (config.use_clang_cl, "-clang"),
            (config.enable_pointer_compression, "-ptr_compr"),
        ];

        let mut name = format!(
            "{IDENTITY_PREFIX}-{}-icu_{}",
            config.target_version, config.icu_mode
        );
        for (enabled, token) in flags {
            if enabled {
                name.push_str(token);
            }
        }
        name.push('-');
        name.push_str(config.target_arch.as_str());

        VariantIdentity(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Asset name for this identity with an optional suffix and extension.
    pub fn asset_name(&self, suffix: &str, extension: Option<&str>) -> String {
        match extension {
            Some(ext) => format!("{}{}.{}", self.0, suffix, ext),
            None => format!("{}{}", self.0, suffix),
        }
    }
}

impl fmt::Display for VariantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VariantIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Free-function form of [`VariantIdentity::compute`].
pub fn compute_identity(config: &BuildConfiguration) -> VariantIdentity {
    VariantIdentity::compute(config)
}
