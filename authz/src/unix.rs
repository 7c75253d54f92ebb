use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tracing::debug;

use crate::authority::Authority;
use crate::authority::AuthorizationCredential;
use crate::authority::RightsRequest;
use crate::session::AuthError;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Default [`Authority`] for Unix hosts.
///
/// A base context is handed out only when the daemon already runs with an
/// administrative effective uid; rights requests against such a context are
/// granted without prompting. Deployments with an interactive authorization
/// broker (polkit, a desktop agent) substitute their own [`Authority`].
pub struct UnixAuthority {
    admin_uid: u32,
}

impl UnixAuthority {
    pub fn new() -> Self {
        Self { admin_uid: 0 }
    }

    /// Treat `uid` as administrative instead of root. Intended for tests
    /// and sandboxed deployments.
    pub fn with_admin_uid(admin_uid: u32) -> Self {
        Self { admin_uid }
    }

    fn effective_uid() -> u32 {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() }
    }
}

impl Default for UnixAuthority {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Authority for UnixAuthority {
    async fn create_context(&self) -> Result<AuthorizationCredential, AuthError> {
        let euid = Self::effective_uid();
        if euid == self.admin_uid {
            let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
            debug!("created authorization context {id} for euid {euid}");
            Ok(AuthorizationCredential::from_raw(id))
        } else {
            Err(AuthError::Unavailable {
                reason: format!("effective uid {euid} is not administrative"),
            })
        }
    }

    async fn request_rights(
        &self,
        credential: &AuthorizationCredential,
        request: &RightsRequest,
    ) -> Result<(), AuthError> {
        // The context only exists for an administrative uid, so every named
        // right is already implied by it.
        debug!(
            "granting rights {:?} on context {}",
            request.rights,
            credential.raw()
        );
        Ok(())
    }
}
