use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::Shared;
use helperd_authz::AuthError;
use helperd_authz::AuthorizationSession;
use helperd_authz::RightsRequest;
use helperd_protocol::HelperDescriptor;
use helperd_protocol::INSTALL_HELPER_RIGHT;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::primitive::InstallPrimitive;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstallError {
    #[error("authorization subsystem is unavailable")]
    AuthUnavailable,
    #[error("authorization was denied for right `{right}`")]
    AuthDenied { right: String },
    #[error("authorization prompt timed out")]
    PromptTimedOut,
    #[error("installation primitive failed: {cause}")]
    Failed { cause: String },
}

impl From<AuthError> for InstallError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unavailable { .. } => InstallError::AuthUnavailable,
            AuthError::Denied { right } => InstallError::AuthDenied { right },
            AuthError::PromptTimedOut { .. } => InstallError::PromptTimedOut,
        }
    }
}

type InstallFuture = Shared<BoxFuture<'static, Result<(), InstallError>>>;

/// Ensures the privileged helper is installed, acquiring authorization per
/// attempt.
///
/// Attempts are de-duplicated per helper identifier: concurrent callers
/// join the attempt already in flight, and once an attempt has succeeded
/// later callers observe that success without re-invoking the installation
/// primitive. Failed attempts are evicted so an explicit retry runs the
/// whole sequence again.
pub struct HelperInstaller {
    session: Option<Arc<AuthorizationSession>>,
    primitive: Arc<dyn InstallPrimitive>,
    attempts: Mutex<HashMap<String, InstallFuture>>,
}

impl HelperInstaller {
    /// `session` is `None` when the bootstrap could not obtain an
    /// authorization context; every privileged call then reports
    /// [`InstallError::AuthUnavailable`].
    pub fn new(
        session: Option<Arc<AuthorizationSession>>,
        primitive: Arc<dyn InstallPrimitive>,
    ) -> Self {
        Self {
            session,
            primitive,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Installs (or verifies) the helper named by `descriptor`.
    ///
    /// Safe to invoke concurrently from any number of client sessions.
    pub async fn ensure_installed(&self, descriptor: &HelperDescriptor) -> Result<(), InstallError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
            match attempts.get(&descriptor.identifier) {
                Some(existing) => existing.clone(),
                None => {
                    let attempt = Self::run_install(
                        self.session.clone(),
                        Arc::clone(&self.primitive),
                        descriptor.clone(),
                    )
                    .boxed()
                    .shared();
                    attempts.insert(descriptor.identifier.clone(), attempt.clone());
                    attempt
                }
            }
        };

        let result = attempt.clone().await;
        if result.is_err() {
            // Keep successes cached forever; drop this attempt so the
            // caller's next try re-runs authorization and installation.
            let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
            let failed_attempt_is_current = attempts
                .get(&descriptor.identifier)
                .is_some_and(|existing| existing.ptr_eq(&attempt));
            if failed_attempt_is_current {
                attempts.remove(&descriptor.identifier);
            }
        }
        result
    }

    async fn run_install(
        session: Option<Arc<AuthorizationSession>>,
        primitive: Arc<dyn InstallPrimitive>,
        descriptor: HelperDescriptor,
    ) -> Result<(), InstallError> {
        let Some(session) = session else {
            return Err(InstallError::AuthUnavailable);
        };
        let credential = session.acquire();

        let request = RightsRequest::privileged([INSTALL_HELPER_RIGHT]);
        session.request_rights(&request).await?;

        primitive
            .install(&credential, &descriptor)
            .await
            .map_err(|err| {
                warn!("install primitive failed for {}: {err:#}", descriptor.identifier);
                InstallError::Failed {
                    cause: format!("{err:#}"),
                }
            })?;
        info!("helper {} installed", descriptor.identifier);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use helperd_authz::Authority;
    use helperd_authz::AuthorizationCredential;
    use helperd_authz::DEFAULT_PROMPT_TIMEOUT;
    use pretty_assertions::assert_eq;

    use super::*;

    struct StubAuthority {
        deny: bool,
    }

    #[async_trait::async_trait]
    impl Authority for StubAuthority {
        async fn create_context(&self) -> Result<AuthorizationCredential, AuthError> {
            Ok(AuthorizationCredential::from_raw(7))
        }

        async fn request_rights(
            &self,
            _credential: &AuthorizationCredential,
            request: &RightsRequest,
        ) -> Result<(), AuthError> {
            if self.deny {
                Err(AuthError::Denied {
                    right: request.rights.first().cloned().unwrap_or_default(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct CountingPrimitive {
        calls: AtomicUsize,
        fail_first: AtomicUsize,
    }

    impl CountingPrimitive {
        fn succeeding() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: AtomicUsize::new(0),
            }
        }

        fn failing_first(n: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: AtomicUsize::new(n),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl InstallPrimitive for CountingPrimitive {
        async fn install(
            &self,
            _credential: &AuthorizationCredential,
            _descriptor: &HelperDescriptor,
        ) -> anyhow::Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            // Yield so concurrent callers can pile onto the shared attempt.
            tokio::time::sleep(Duration::from_millis(5)).await;
            if call < self.fail_first.load(Ordering::SeqCst) {
                anyhow::bail!("simulated primitive failure");
            }
            Ok(())
        }
    }

    async fn session(deny: bool) -> Arc<AuthorizationSession> {
        Arc::new(
            AuthorizationSession::new(Arc::new(StubAuthority { deny }), DEFAULT_PROMPT_TIMEOUT)
                .await
                .expect("session should construct"),
        )
    }

    #[tokio::test]
    async fn sequential_installs_invoke_primitive_once() {
        let primitive = Arc::new(CountingPrimitive::succeeding());
        let installer = HelperInstaller::new(Some(session(false).await), primitive.clone());
        let descriptor = HelperDescriptor::builtin();

        installer
            .ensure_installed(&descriptor)
            .await
            .expect("first install should succeed");
        installer
            .ensure_installed(&descriptor)
            .await
            .expect("second install should succeed");

        assert_eq!(1, primitive.calls());
    }

    #[tokio::test]
    async fn concurrent_installs_share_one_attempt() {
        let primitive = Arc::new(CountingPrimitive::succeeding());
        let installer =
            Arc::new(HelperInstaller::new(Some(session(false).await), primitive.clone()));
        let descriptor = HelperDescriptor::builtin();

        let (a, b, c) = tokio::join!(
            installer.ensure_installed(&descriptor),
            installer.ensure_installed(&descriptor),
            installer.ensure_installed(&descriptor),
        );
        a.expect("install should succeed");
        b.expect("install should succeed");
        c.expect("install should succeed");

        assert_eq!(1, primitive.calls());
    }

    #[tokio::test]
    async fn denial_skips_the_primitive() {
        let primitive = Arc::new(CountingPrimitive::succeeding());
        let installer = HelperInstaller::new(Some(session(true).await), primitive.clone());

        let result = installer.ensure_installed(&HelperDescriptor::builtin()).await;
        assert_matches!(result, Err(InstallError::AuthDenied { .. }));
        assert_eq!(0, primitive.calls());
    }

    #[tokio::test]
    async fn missing_session_reports_auth_unavailable() {
        let primitive = Arc::new(CountingPrimitive::succeeding());
        let installer = HelperInstaller::new(None, primitive.clone());

        let result = installer.ensure_installed(&HelperDescriptor::builtin()).await;
        assert_matches!(result, Err(InstallError::AuthUnavailable));
        assert_eq!(0, primitive.calls());
    }

    #[tokio::test]
    async fn failed_attempt_is_retried_on_next_call() {
        let primitive = Arc::new(CountingPrimitive::failing_first(1));
        let installer = HelperInstaller::new(Some(session(false).await), primitive.clone());
        let descriptor = HelperDescriptor::builtin();

        let first = installer.ensure_installed(&descriptor).await;
        assert_matches!(first, Err(InstallError::Failed { cause }) if cause.contains("simulated"));

        installer
            .ensure_installed(&descriptor)
            .await
            .expect("retry should succeed");
        assert_eq!(2, primitive.calls());
    }
}
