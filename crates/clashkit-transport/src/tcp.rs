//! TCP connector using `tokio::net::TcpStream`.

use tokio::net::TcpStream;

use crate::{Connector, Endpoint, TransportError};

/// A [`Connector`] that opens plain TCP connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, endpoint: &Endpoint) -> Result<TcpStream, TransportError> {
        let stream = TcpStream::connect((endpoint.host(), endpoint.port()))
            .await
            .map_err(TransportError::ConnectFailed)?;
        // Packets are small and latency-sensitive.
        stream.set_nodelay(true).map_err(TransportError::ConnectFailed)?;
        tracing::debug!(%endpoint, "tcp connection established");
        Ok(stream)
    }
}
