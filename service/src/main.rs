use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use helperd_authz::AuthorizationSession;
use helperd_authz::UnixAuthority;
use helperd_broker::HelperConnectionBroker;
use helperd_broker::UdsHelperTransport;
use helperd_installer::CommandInstallPrimitive;
use helperd_installer::HelperInstaller;
use helperd_protocol::HelperDescriptor;
use helperd_service::ListenEndpoint;
use helperd_service::SameUserPolicy;
use helperd_service::ServiceFront;
use helperd_service::serve;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LISTEN_URL: &str = "unix:///var/run/dev.helperd.broker.sock";

#[derive(Debug, Parser)]
struct HelperdArgs {
    /// Listen endpoint URL. Supported values: `unix://PATH`.
    #[arg(long = "listen", value_name = "URL", default_value = DEFAULT_LISTEN_URL)]
    listen: ListenEndpoint,

    /// Directory containing the installed helper's listening socket.
    #[arg(long = "helper-socket-dir", value_name = "DIR", default_value = "/var/run")]
    helper_socket_dir: PathBuf,

    /// Installer command invoked with the helper identifier and minimum
    /// version appended as its final arguments.
    #[arg(
        long = "install-command",
        value_name = "PROGRAM",
        default_value = "/usr/libexec/helperd-install"
    )]
    install_command: PathBuf,

    /// Extra arguments passed to the installer command before the
    /// identifier.
    #[arg(long = "install-arg", value_name = "ARG")]
    install_args: Vec<String>,

    /// Upper bound on how long an interactive authorization prompt may stay
    /// unanswered.
    #[arg(long = "prompt-timeout-secs", value_name = "SECS", default_value_t = 120)]
    prompt_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = HelperdArgs::parse();
    let prompt_timeout = Duration::from_secs(args.prompt_timeout_secs);

    let authority = Arc::new(UnixAuthority::new());
    let session = match AuthorizationSession::new(authority, prompt_timeout).await {
        Ok(session) => Some(Arc::new(session)),
        Err(err) if cfg!(debug_assertions) => {
            // Development builds fail fast on a broken environment.
            return Err(err.into());
        }
        Err(err) => {
            error!("authorization unavailable, privileged paths degraded: {err}");
            None
        }
    };
    debug!("authorization available: {}", session.is_some());

    let descriptor = HelperDescriptor::builtin();
    let primitive = Arc::new(CommandInstallPrimitive::new(
        args.install_command,
        args.install_args,
    ));
    let installer = Arc::new(HelperInstaller::new(session, primitive));
    let transport = Arc::new(UdsHelperTransport::new(args.helper_socket_dir));
    let broker = HelperConnectionBroker::new(descriptor.clone(), transport);
    let front = Arc::new(ServiceFront::new(descriptor, installer, broker));

    let listener = args.listen.bind()?;
    info!("helperd listening on {}", args.listen.describe());

    tokio::select! {
        result = serve(listener, front, Arc::new(SameUserPolicy)) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}
