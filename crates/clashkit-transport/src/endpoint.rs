//! Server endpoints.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::TransportError;

/// Port game servers listen on when none is configured.
pub const DEFAULT_PORT: u16 = 9339;

/// A `host:port` pair the client can connect to.
///
/// The host is kept as text and resolved at connect time, so both
/// `"127.0.0.1:9339"` and `"game.example.com:9339"` are valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Creates an endpoint from parts.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidEndpoint`] for an empty host or
    /// port 0.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, TransportError> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(TransportError::InvalidEndpoint("empty host".into()));
        }
        if port == 0 {
            return Err(TransportError::InvalidEndpoint(format!(
                "{host}: port must be non-zero"
            )));
        }
        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    /// Parses `host:port`. IPv6 hosts use brackets: `[::1]:9339`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TransportError::InvalidEndpoint("empty endpoint".into()));
        }
        let (host, port) = s.rsplit_once(':').ok_or_else(|| {
            TransportError::InvalidEndpoint(format!("{s}: expected host:port"))
        })?;
        let port: u16 = port.parse().map_err(|_| {
            TransportError::InvalidEndpoint(format!("{s}: invalid port"))
        })?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        Self::new(host, port)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self {
            host: addr.ip().to_string(),
            port: addr.port(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_and_port() {
        let ep: Endpoint = "game.example.com:9339".parse().unwrap();
        assert_eq!(ep.host(), "game.example.com");
        assert_eq!(ep.port(), 9339);
    }

    #[test]
    fn test_parse_bracketed_ipv6() {
        let ep: Endpoint = "[::1]:9339".parse().unwrap();
        assert_eq!(ep.host(), "::1");
        assert_eq!(ep.to_string(), "[::1]:9339");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in ["", "   ", "no-port", "host:", "host:notaport", ":9339", "host:0", "host:70000"] {
            assert!(
                matches!(bad.parse::<Endpoint>(), Err(TransportError::InvalidEndpoint(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_socket_addr() {
        let addr: SocketAddr = "127.0.0.1:9339".parse().unwrap();
        let ep = Endpoint::from(addr);
        assert_eq!(ep.to_string(), "127.0.0.1:9339");
    }
}
