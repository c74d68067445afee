//! TOTP daemon client (spec §6): a Unix-domain-socket, JSON-lines request/
//! response protocol, plus an in-memory fake for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Daemon reachability/protocol failure, distinct from "not configured".
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DaemonError {
    /// The socket could not be connected to, or the connection dropped
    /// mid-exchange.
    #[error("totp daemon unreachable: {0}")]
    Unreachable(String),
    /// The daemon replied but the response did not parse.
    #[error("totp daemon protocol error: {0}")]
    Protocol(String),
}

/// What the TOTP gate needs from the daemon.
#[async_trait]
pub trait TotpDaemonClient: Send + Sync {
    /// Does `user_id` have TOTP configured?
    async fn is_configured(&self, user_id: &str) -> Result<bool, DaemonError>;

    /// Verify `code` for `user_id`. Returns whether it matched.
    async fn verify(&self, user_id: &str, code: &str) -> Result<bool, DaemonError>;
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    op: &'a str,
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct Response {
    ok: bool,
    #[serde(default)]
    configured: Option<bool>,
}

/// Talks to the TOTP daemon over a Unix-domain socket, one line-delimited
/// JSON request/response per connection.
pub struct UnixSocketTotpDaemon {
    socket_path: PathBuf,
}

impl UnixSocketTotpDaemon {
    /// Bind to the daemon listening at `socket_path`.
    #[must_use]
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    async fn roundtrip(&self, request: &Request<'_>) -> Result<Response, DaemonError> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| DaemonError::Unreachable(e.to_string()))?;
        let (read_half, mut write_half) = stream.into_split();

        let mut line = serde_json::to_string(request)
            .map_err(|e| DaemonError::Protocol(e.to_string()))?;
        line.push('\n');
        write_half
            .write_all(line.as_bytes())
            .await
            .map_err(|e| DaemonError::Unreachable(e.to_string()))?;

        let mut reader = BufReader::new(read_half);
        let mut response_line = String::new();
        let bytes_read = reader
            .read_line(&mut response_line)
            .await
            .map_err(|e| DaemonError::Unreachable(e.to_string()))?;
        if bytes_read == 0 {
            return Err(DaemonError::Unreachable("connection closed".to_string()));
        }

        serde_json::from_str(response_line.trim_end()).map_err(|e| DaemonError::Protocol(e.to_string()))
    }
}

#[async_trait]
impl TotpDaemonClient for UnixSocketTotpDaemon {
    async fn is_configured(&self, user_id: &str) -> Result<bool, DaemonError> {
        let response = self
            .roundtrip(&Request {
                op: "check",
                user_id,
                code: None,
            })
            .await?;
        Ok(response.ok && response.configured.unwrap_or(false))
    }

    async fn verify(&self, user_id: &str, code: &str) -> Result<bool, DaemonError> {
        let response = self
            .roundtrip(&Request {
                op: "verify",
                user_id,
                code: Some(code),
            })
            .await?;
        Ok(response.ok)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::{DaemonError, TotpDaemonClient};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// An in-process fake daemon: `configured` maps `user_id` to the fixed
    /// code that verifies for them. An unreachable flag simulates daemon
    /// loss.
    #[derive(Default)]
    pub struct FakeTotpDaemon {
        configured: Mutex<HashMap<String, String>>,
        unreachable: Mutex<bool>,
    }

    impl FakeTotpDaemon {
        pub fn configure(&self, user_id: &str, code: &str) {
            self.configured
                .lock()
                .expect("fake daemon lock poisoned")
                .insert(user_id.to_string(), code.to_string());
        }

        pub fn set_unreachable(&self, unreachable: bool) {
            *self.unreachable.lock().expect("fake daemon lock poisoned") = unreachable;
        }
    }

    #[async_trait]
    impl TotpDaemonClient for FakeTotpDaemon {
        async fn is_configured(&self, user_id: &str) -> Result<bool, DaemonError> {
            if *self.unreachable.lock().expect("fake daemon lock poisoned") {
                return Err(DaemonError::Unreachable("fake daemon down".to_string()));
            }
            Ok(self
                .configured
                .lock()
                .expect("fake daemon lock poisoned")
                .contains_key(user_id))
        }

        async fn verify(&self, user_id: &str, code: &str) -> Result<bool, DaemonError> {
            if *self.unreachable.lock().expect("fake daemon lock poisoned") {
                return Err(DaemonError::Unreachable("fake daemon down".to_string()));
            }
            Ok(self
                .configured
                .lock()
                .expect("fake daemon lock poisoned")
                .get(user_id)
                .is_some_and(|expected| expected == code))
        }
    }
}
