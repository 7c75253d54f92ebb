use std::path::PathBuf;
use std::str::FromStr;

use tokio::net::UnixListener;

/// Where the daemon listens for client connections.
///
/// Parsed from a `unix://PATH` URL so the transport stays swappable without
/// touching the CLI surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenEndpoint {
    Unix { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenEndpointParseError {
    UnsupportedListenUrl(String),
    EmptySocketPath(String),
}

impl std::fmt::Display for ListenEndpointParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenEndpointParseError::UnsupportedListenUrl(listen_url) => {
                write!(
                    f,
                    "unsupported --listen URL `{listen_url}`; expected `unix://PATH`"
                )
            }
            ListenEndpointParseError::EmptySocketPath(listen_url) => {
                write!(
                    f,
                    "invalid --listen URL `{listen_url}`; socket path is empty"
                )
            }
        }
    }
}

impl std::error::Error for ListenEndpointParseError {}

impl ListenEndpoint {
    pub fn from_listen_url(listen_url: &str) -> Result<Self, ListenEndpointParseError> {
        if let Some(path) = listen_url.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(ListenEndpointParseError::EmptySocketPath(
                    listen_url.to_string(),
                ));
            }
            return Ok(Self::Unix {
                path: PathBuf::from(path),
            });
        }
        Err(ListenEndpointParseError::UnsupportedListenUrl(
            listen_url.to_string(),
        ))
    }

    /// Binds the listening socket, replacing a stale socket file left over
    /// from a previous run.
    pub fn bind(&self) -> std::io::Result<UnixListener> {
        match self {
            ListenEndpoint::Unix { path } => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
                UnixListener::bind(path)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ListenEndpoint::Unix { path } => format!("unix://{}", path.display()),
        }
    }
}

impl FromStr for ListenEndpoint {
    type Err = ListenEndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_listen_url(s)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn listen_endpoint_parses_unix_listen_url() {
        let endpoint = ListenEndpoint::from_listen_url("unix:///run/helperd.sock")
            .expect("unix listen URL should parse");
        assert_eq!(
            endpoint,
            ListenEndpoint::Unix {
                path: PathBuf::from("/run/helperd.sock"),
            }
        );
    }

    #[test]
    fn listen_endpoint_rejects_empty_socket_path() {
        let err = ListenEndpoint::from_listen_url("unix://")
            .expect_err("empty socket path should be rejected");
        assert_eq!(
            err.to_string(),
            "invalid --listen URL `unix://`; socket path is empty"
        );
    }

    #[test]
    fn listen_endpoint_rejects_unsupported_listen_url() {
        let err = ListenEndpoint::from_listen_url("tcp://127.0.0.1:4000")
            .expect_err("unsupported scheme should fail");
        assert_eq!(
            err.to_string(),
            "unsupported --listen URL `tcp://127.0.0.1:4000`; expected `unix://PATH`"
        );
    }
}
