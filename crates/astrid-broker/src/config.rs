//! Broker tunables (spec §4.K).

use std::path::PathBuf;

/// Configuration for [`crate::build_router`] and its middleware stack.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Bind to loopback only in native mode; all interfaces inside a
    /// container (the container boundary itself is the isolation).
    pub bind_all_interfaces: bool,
    /// Port to listen on.
    pub port: u16,
    /// Max request body size, in bytes (default 256 KiB).
    pub max_body_bytes: usize,
    /// Max in-flight requests across the whole broker (default 4).
    pub max_concurrency: usize,
    /// Max chars for a prompt field (image-generate).
    pub max_prompt_chars: usize,
    /// Max chars for a TTS text field.
    pub max_tts_chars: usize,
    /// Max chars for a media-path field.
    pub max_media_path_chars: usize,
    /// Max bytes streamed for an OAuth-provider proxy download.
    pub max_oauth_download_bytes: u64,
    /// Roots that path-accepting endpoints may resolve into.
    pub media_roots: Vec<PathBuf>,
    /// Known OAuth provider ids the proxy endpoint accepts.
    pub known_oauth_providers: Vec<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            bind_all_interfaces: false,
            port: 8089,
            max_body_bytes: 256 * 1024,
            max_concurrency: 4,
            max_prompt_chars: 8_000,
            max_tts_chars: 4_000,
            max_media_path_chars: 4_096,
            max_oauth_download_bytes: 20 * 1024 * 1024,
            media_roots: Vec::new(),
            known_oauth_providers: Vec::new(),
        }
    }
}

impl BrokerConfig {
    /// The socket address to bind, given [`Self::bind_all_interfaces`].
    #[must_use]
    pub fn bind_addr(&self) -> std::net::SocketAddr {
        let ip = if self.bind_all_interfaces {
            std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
        } else {
            std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)
        };
        std::net::SocketAddr::new(ip, self.port)
    }
}
