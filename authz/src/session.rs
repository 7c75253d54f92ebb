use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

use crate::authority::Authority;
use crate::authority::AuthorizationCredential;
use crate::authority::RightsRequest;

/// How long to wait for an interactive rights prompt before giving up.
/// Interactive prompts may never be answered; an unbounded wait would hang
/// the calling session forever.
pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("authorization subsystem is unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("authorization was denied for right `{right}`")]
    Denied { right: String },
    #[error("authorization prompt timed out after {timeout:?}")]
    PromptTimedOut { timeout: Duration },
}

/// One process-lifetime authorization context plus the rights it has been
/// escalated to cover.
///
/// Construction fails if the environment refuses to hand out a base
/// context; whether that failure aborts the process is the binary
/// bootstrap's decision, not this type's.
pub struct AuthorizationSession {
    authority: Arc<dyn Authority>,
    credential: AuthorizationCredential,
    granted: Mutex<HashSet<String>>,
    prompt_timeout: Duration,
}

impl std::fmt::Debug for AuthorizationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationSession")
            .field("credential", &self.credential)
            .field("prompt_timeout", &self.prompt_timeout)
            .finish_non_exhaustive()
    }
}

impl AuthorizationSession {
    pub async fn new(
        authority: Arc<dyn Authority>,
        prompt_timeout: Duration,
    ) -> Result<Self, AuthError> {
        let credential = authority.create_context().await?;
        debug!("authorization context acquired");
        Ok(Self {
            authority,
            credential,
            granted: Mutex::new(HashSet::new()),
            prompt_timeout,
        })
    }

    /// Returns the held credential for consumption by a privileged
    /// operation. The credential is only valid for this process lifetime.
    pub fn acquire(&self) -> AuthorizationCredential {
        self.credential.clone()
    }

    /// Escalates the held context to cover `request`.
    ///
    /// Idempotent: rights already granted through this session succeed
    /// without going back to the authority, so no re-prompt occurs. The
    /// wait on the authority is bounded; a prompt left unanswered surfaces
    /// as [`AuthError::PromptTimedOut`].
    pub async fn request_rights(&self, request: &RightsRequest) -> Result<(), AuthError> {
        let missing: Vec<String> = {
            let granted = self.granted.lock().unwrap_or_else(|e| e.into_inner());
            request
                .rights
                .iter()
                .filter(|right| !granted.contains(*right))
                .cloned()
                .collect()
        };
        if missing.is_empty() {
            debug!("all requested rights already granted");
            return Ok(());
        }

        // The granted-rights lock must not be held here: the authority may
        // suspend for as long as the operator takes to answer a prompt.
        let outcome = timeout(
            self.prompt_timeout,
            self.authority.request_rights(&self.credential, request),
        )
        .await;
        match outcome {
            Ok(Ok(())) => {
                let mut granted = self.granted.lock().unwrap_or_else(|e| e.into_inner());
                granted.extend(request.rights.iter().cloned());
                Ok(())
            }
            Ok(Err(err)) => {
                warn!("rights request failed: {err}");
                Err(err)
            }
            Err(_) => {
                warn!(
                    "rights request timed out after {:?} waiting on the operator",
                    self.prompt_timeout
                );
                Err(AuthError::PromptTimedOut {
                    timeout: self.prompt_timeout,
                })
            }
        }
    }
}
