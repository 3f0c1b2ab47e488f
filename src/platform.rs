//! Host platform detection.
//!
//! The build tool invocations, the expected asset names and one of the patch
//! targets all depend on which family of host the build runs on. The value is
//! resolved once at run start and passed explicitly to every consumer.

use std::fmt;

/// The two host families the build pipeline distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostPlatform {
    Windows,
    Unix,
}

impl HostPlatform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            HostPlatform::Windows
        } else {
            HostPlatform::Unix
        }
    }

    pub fn is_windows(self) -> bool {
        matches!(self, HostPlatform::Windows)
    }

    /// Append the platform executable extension to `stem`.
    ///
    /// ```
    /// use nanode_builder::HostPlatform;
    ///
    /// assert_eq!(HostPlatform::Windows.executable_name("node"), "node.exe");
    /// assert_eq!(HostPlatform::Unix.executable_name("node"), "node");
    /// ```
    pub fn executable_name(self, stem: &str) -> String {
        match self {
            HostPlatform::Windows => format!("{stem}.exe"),
            HostPlatform::Unix => stem.to_string(),
        }
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPlatform::Windows => write!(f, "windows"),
            HostPlatform::Unix => write!(f, "unix"),
        }
    }
}
