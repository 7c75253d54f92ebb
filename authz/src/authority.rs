use crate::session::AuthError;

/// Opaque handle representing a granted set of administrative rights.
///
/// Created on demand by an [`Authority`], owned by the
/// [`crate::AuthorizationSession`] that requested it, and meaningless after
/// this process exits. Nothing outside the authority should interpret the
/// raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCredential {
    raw: u64,
}

impl AuthorizationCredential {
    pub fn from_raw(raw: u64) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> u64 {
        self.raw
    }
}

/// A set of named rights plus the flags governing how they may be obtained.
/// Immutable value, constructed per escalation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RightsRequest {
    pub rights: Vec<String>,
    /// The authority may prompt the human operator interactively.
    pub allow_interaction: bool,
    /// The authority may extend the held context beyond its current rights.
    pub extend_rights: bool,
    /// Authorize before the privileged primitive runs rather than at use.
    pub pre_authorize: bool,
}

impl RightsRequest {
    /// A request for `rights` with every acquisition flag set, matching how
    /// a privileged installation is authorized.
    pub fn privileged<I, S>(rights: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rights: rights.into_iter().map(Into::into).collect(),
            allow_interaction: true,
            extend_rights: true,
            pre_authorize: true,
        }
    }
}

/// The operating environment's authorization subsystem.
#[async_trait::async_trait]
pub trait Authority: Send + Sync {
    /// Obtains a base authorization context, or fails if the environment
    /// refuses (no subsystem, policy denial).
    async fn create_context(&self) -> Result<AuthorizationCredential, AuthError>;

    /// Escalates `credential` to cover `request`. May block for a
    /// human-timescale duration while an interactive prompt is answered;
    /// callers bound the wait. Must be safe to invoke concurrently.
    async fn request_rights(
        &self,
        credential: &AuthorizationCredential,
        request: &RightsRequest,
    ) -> Result<(), AuthError>;
}
