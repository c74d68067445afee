//! Fetch-guard (spec §4.K): DNS-pinning protection for outbound requests
//! made on behalf of the agent. Resolves the hostname before connecting,
//! rejects private-address literals and cloud metadata IPs, and
//! re-validates on every redirect hop.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use thiserror::Error;
use url::Url;

/// Cloud-metadata IPs fetch-guard always rejects, independent of the
/// generic private-range check.
const METADATA_IPS: &[IpAddr] = &[
    IpAddr::V4(Ipv4Addr::new(169, 254, 169, 254)),
    IpAddr::V6(Ipv6Addr::new(0xfd00, 0xec2, 0, 0, 0, 0, 0, 0x254)),
];

/// Why a fetch-guard check refused a URL.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FetchGuardError {
    /// The URL has no host, or an unsupported scheme.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    /// DNS resolution failed.
    #[error("DNS resolution failed for {0}")]
    ResolutionFailed(String),
    /// A resolved address (or a raw IP literal) is private, link-local, or
    /// a cloud metadata endpoint.
    #[error("address is not publicly routable: {0}")]
    PrivateAddress(IpAddr),
}

/// `true` for addresses fetch-guard must never let the agent reach:
/// RFC1918/RFC4193 private ranges, loopback, link-local, and the cloud
/// metadata endpoints.
#[must_use]
pub fn is_blocked_address(addr: IpAddr) -> bool {
    if METADATA_IPS.contains(&addr) {
        return true;
    }
    match addr {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_broadcast() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

/// Parse `raw_url` and resolve its host, rejecting anything that is not a
/// publicly routable address. Returns the resolved addresses on success,
/// so the caller can connect directly to a pinned address rather than
/// re-resolving (closing the DNS-rebinding TOCTOU window).
///
/// # Errors
///
/// Returns [`FetchGuardError`] if the URL is malformed, resolution fails,
/// or every resolved address is blocked.
pub async fn validate_url(raw_url: &str) -> Result<Vec<IpAddr>, FetchGuardError> {
    let url = Url::parse(raw_url).map_err(|e| FetchGuardError::InvalidUrl(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(FetchGuardError::InvalidUrl(format!("unsupported scheme: {}", url.scheme())));
    }
    let host = url.host_str().ok_or_else(|| FetchGuardError::InvalidUrl("missing host".to_string()))?;

    if let Ok(literal) = host.parse::<IpAddr>() {
        if is_blocked_address(literal) {
            return Err(FetchGuardError::PrivateAddress(literal));
        }
        return Ok(vec![literal]);
    }

    let port = url.port_or_known_default().unwrap_or(443);
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| FetchGuardError::ResolutionFailed(e.to_string()))?
        .map(|socket_addr| socket_addr.ip())
        .collect::<Vec<_>>();

    if addrs.is_empty() {
        return Err(FetchGuardError::ResolutionFailed(host.to_string()));
    }
    if let Some(blocked) = addrs.iter().find(|a| is_blocked_address(**a)) {
        return Err(FetchGuardError::PrivateAddress(*blocked));
    }
    Ok(addrs)
}

/// Validate a redirect target the same way as the original URL. Kept as
/// a distinct name so call sites make the "on redirect, re-validate"
/// requirement visible.
///
/// # Errors
///
/// Same as [`validate_url`].
pub async fn validate_redirect(location: &str) -> Result<Vec<IpAddr>, FetchGuardError> {
    validate_url(location).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_ip_is_blocked() {
        assert!(is_blocked_address(IpAddr::V4(Ipv4Addr::new(169, 254, 169, 254))));
    }

    #[test]
    fn rfc1918_is_blocked() {
        assert!(is_blocked_address(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert!(is_blocked_address(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))));
        assert!(is_blocked_address(IpAddr::V4(Ipv4Addr::new(172, 16, 0, 1))));
    }

    #[test]
    fn loopback_is_blocked() {
        assert!(is_blocked_address(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))));
    }

    #[test]
    fn public_address_is_allowed() {
        assert!(!is_blocked_address(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))));
    }

    #[tokio::test]
    async fn ip_literal_to_private_address_is_rejected() {
        let err = validate_url("http://127.0.0.1/secret").await.unwrap_err();
        assert!(matches!(err, FetchGuardError::PrivateAddress(_)));
    }

    #[tokio::test]
    async fn metadata_literal_is_rejected() {
        let err = validate_url("http://169.254.169.254/latest/meta-data").await.unwrap_err();
        assert!(matches!(err, FetchGuardError::PrivateAddress(_)));
    }

    #[tokio::test]
    async fn unsupported_scheme_is_rejected() {
        let err = validate_url("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, FetchGuardError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn public_ip_literal_is_allowed() {
        let addrs = validate_url("http://93.184.216.34/").await.unwrap();
        assert_eq!(addrs, vec![IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))]);
    }
}
