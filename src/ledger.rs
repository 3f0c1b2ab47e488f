//! Idempotency gate backed by the release host.

use crate::host::{HostError, ReleaseHost};
use crate::identity::VariantIdentity;
use crate::platform::HostPlatform;
use tracing::{debug, info};

/// The asset whose presence marks a variant as already published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformExpectations {
    pub binary_name: String,
}

impl PlatformExpectations {
    pub fn new(identity: &VariantIdentity, host: HostPlatform) -> Self {
        Self {
            binary_name: host.executable_name(identity.as_str()),
        }
    }
}

/// Read-only view of published assets.
pub struct PublicationLedger<'a> {
    host: &'a dyn ReleaseHost,
}

impl<'a> PublicationLedger<'a> {
    pub fn new(host: &'a dyn ReleaseHost) -> Self {
        Self { host }
    }

    /// True iff the release tagged `tag` already carries the expected binary.
    ///
    /// A release that does not exist yet is the normal first-build case and
    /// reads as "nothing published".
    pub fn already_published(
        &self,
        tag: &str,
        expectations: &PlatformExpectations,
    ) -> Result<bool, HostError> {
        let Some(release) = self.host.release_by_tag(tag)? else {
            debug!(tag, "release does not exist yet");
            return Ok(false);
        };

        let found = release.has_asset(&expectations.binary_name);
        info!(
            tag,
            asset = %expectations.binary_name,
            published = found,
            "checked release ledger"
        );
        Ok(found)
    }
}
