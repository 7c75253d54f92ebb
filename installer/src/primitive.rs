use helperd_authz::AuthorizationCredential;
use helperd_protocol::HelperDescriptor;

/// The OS primitive that places the helper at its system location.
///
/// The primitive installs the helper fresh, upgrades an older installation,
/// or no-ops when an equivalent or newer trusted version is already
/// present. Version comparison and rollback policy are owned entirely by
/// the primitive, never by the caller.
#[async_trait::async_trait]
pub trait InstallPrimitive: Send + Sync {
    async fn install(
        &self,
        credential: &AuthorizationCredential,
        descriptor: &HelperDescriptor,
    ) -> anyhow::Result<()>;
}
