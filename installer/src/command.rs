use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Context as _;
use helperd_authz::AuthorizationCredential;
use helperd_protocol::HelperDescriptor;
use tokio::process::Command;
use tracing::debug;

use crate::primitive::InstallPrimitive;

/// Environment variable through which the authorization context reaches the
/// installer command.
pub const AUTH_CONTEXT_ENV_VAR: &str = "HELPERD_AUTH_CONTEXT";

/// [`InstallPrimitive`] that delegates to a platform installer command.
///
/// The command receives the helper identifier and minimum version as its
/// final arguments and owns the install/upgrade/no-op decision for any
/// existing installation.
pub struct CommandInstallPrimitive {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandInstallPrimitive {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

#[async_trait::async_trait]
impl InstallPrimitive for CommandInstallPrimitive {
    async fn install(
        &self,
        credential: &AuthorizationCredential,
        descriptor: &HelperDescriptor,
    ) -> anyhow::Result<()> {
        debug!(
            "invoking install command {:?} for {}",
            self.program, descriptor.identifier
        );
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&descriptor.identifier)
            .arg(&descriptor.min_version)
            .env(AUTH_CONTEXT_ENV_VAR, credential.raw().to_string())
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to spawn install command {:?}", self.program))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "install command exited with {}: {}",
                output.status,
                stderr.trim()
            )
        }
    }
}
