//! Opening the byte stream underneath the acknowledged channel

use anyhow::{Context, Result};
use enclave_config::{ConnectionConfig, ConnectionKind, TransportConfig};
use enclave_vsock::ChannelConfig;
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

/// Wildcard CID used when listening on vsock
pub const VMADDR_CID_ANY: u32 = u32::MAX;

/// Any bidirectional stream the channel can run on
pub trait Stream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Stream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

pub type BoxedStream = Box<dyn Stream>;

/// Where to listen or connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(String),
    Vsock { cid: u32, port: u32 },
}

impl Endpoint {
    /// Endpoint to connect to, as described by the configuration
    pub fn from_config(config: &ConnectionConfig) -> Self {
        match config.kind {
            ConnectionKind::Tcp => Endpoint::Tcp(config.address.clone()),
            ConnectionKind::Vsock => Endpoint::Vsock {
                cid: config.cid,
                port: config.port,
            },
        }
    }

    /// Endpoint to listen on. vsock listeners accept from any CID.
    pub fn listen_from_config(config: &ConnectionConfig) -> Self {
        match Self::from_config(config) {
            Endpoint::Vsock { port, .. } => Endpoint::Vsock {
                cid: VMADDR_CID_ANY,
                port,
            },
            tcp => tcp,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(address) => write!(f, "tcp://{}", address),
            Endpoint::Vsock { cid, port } => write!(f, "vsock://{}:{}", cid, port),
        }
    }
}

/// Channel limits from the transport configuration
pub fn channel_config(config: &TransportConfig) -> ChannelConfig {
    ChannelConfig::default()
        .with_max_message_size(config.max_message_size)
        .with_max_concurrent(config.max_concurrent)
        .with_cleanup_margin(config.cleanup_margin)
        .with_queue_capacity(config.queue_capacity)
        .with_ack_timeout(config.ack_timeout)
}

/// Listen on `endpoint` and return the first accepted connection
pub async fn accept(endpoint: &Endpoint) -> Result<BoxedStream> {
    match endpoint {
        Endpoint::Tcp(address) => {
            let listener = TcpListener::bind(address)
                .await
                .with_context(|| format!("Unable to bind TCP listener on {}", address))?;
            info!("Listening for a connection on {}", endpoint);

            let (stream, peer) = listener.accept().await.context("Failed to accept connection")?;
            stream.set_nodelay(true)?;
            info!(%peer, "Accepted connection");
            Ok(Box::new(stream))
        }
        Endpoint::Vsock { cid, port } => accept_vsock(*cid, *port, endpoint).await,
    }
}

/// Connect to `endpoint`
pub async fn connect(endpoint: &Endpoint) -> Result<BoxedStream> {
    match endpoint {
        Endpoint::Tcp(address) => {
            let stream = TcpStream::connect(address)
                .await
                .with_context(|| format!("Failed to connect to {}", endpoint))?;
            stream.set_nodelay(true)?;
            info!("Connected to {}", endpoint);
            Ok(Box::new(stream))
        }
        Endpoint::Vsock { cid, port } => connect_vsock(*cid, *port, endpoint).await,
    }
}

#[cfg(feature = "vsock")]
async fn accept_vsock(cid: u32, port: u32, endpoint: &Endpoint) -> Result<BoxedStream> {
    use tokio_vsock::{VsockAddr, VsockListener};

    let listener = VsockListener::bind(VsockAddr::new(cid, port))
        .context("Unable to bind vsock listener")?;
    info!("Listening for a connection on {}", endpoint);

    let (stream, peer) = listener.accept().await.context("Failed to accept connection")?;
    info!(peer_cid = peer.cid(), peer_port = peer.port(), "Accepted connection");
    Ok(Box::new(stream))
}

#[cfg(feature = "vsock")]
async fn connect_vsock(cid: u32, port: u32, endpoint: &Endpoint) -> Result<BoxedStream> {
    use tokio_vsock::{VsockAddr, VsockStream};

    let stream = VsockStream::connect(VsockAddr::new(cid, port))
        .await
        .with_context(|| format!("Failed to connect to {}", endpoint))?;
    info!("Connected to {}", endpoint);
    Ok(Box::new(stream))
}

#[cfg(not(feature = "vsock"))]
async fn accept_vsock(_cid: u32, _port: u32, endpoint: &Endpoint) -> Result<BoxedStream> {
    Err(vsock_unavailable(endpoint))
}

#[cfg(not(feature = "vsock"))]
async fn connect_vsock(_cid: u32, _port: u32, endpoint: &Endpoint) -> Result<BoxedStream> {
    Err(vsock_unavailable(endpoint))
}

#[cfg(not(feature = "vsock"))]
fn vsock_unavailable(endpoint: &Endpoint) -> anyhow::Error {
    anyhow::anyhow!(
        "Cannot use {}: vsock support not available. Build with --features=vsock",
        endpoint
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_endpoint_from_config() {
        let mut config = ConnectionConfig::default();
        assert_eq!(
            Endpoint::from_config(&config),
            Endpoint::Tcp("127.0.0.1:7001".to_string())
        );

        config.kind = ConnectionKind::Vsock;
        config.cid = 16;
        assert_eq!(
            Endpoint::from_config(&config),
            Endpoint::Vsock { cid: 16, port: 7001 }
        );
        assert_eq!(
            Endpoint::listen_from_config(&config),
            Endpoint::Vsock { cid: VMADDR_CID_ANY, port: 7001 }
        );
    }

    #[test]
    fn test_channel_config_mapping() {
        let transport = TransportConfig {
            max_message_size: 2048,
            max_concurrent: 7,
            cleanup_margin: 3,
            queue_capacity: 4,
            ack_timeout: Duration::from_secs(9),
        };
        let channel = channel_config(&transport);

        assert_eq!(channel.max_message_size, 2048);
        assert_eq!(channel.max_concurrent, 7);
        assert_eq!(channel.cleanup_trigger(), 10);
        assert_eq!(channel.queue_capacity, 4);
        assert_eq!(channel.ack_timeout, Duration::from_secs(9));
    }

    #[tokio::test]
    async fn test_tcp_accept_and_connect() {
        // Reserve a free port, then release it for the listener
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = probe.local_addr().unwrap().to_string();
        drop(probe);

        let endpoint = Endpoint::Tcp(address);
        let server = {
            let endpoint = endpoint.clone();
            tokio::spawn(async move { accept(&endpoint).await })
        };

        let mut client = None;
        for _ in 0..50 {
            match connect(&endpoint).await {
                Ok(stream) => {
                    client = Some(stream);
                    break;
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }

        assert!(client.is_some());
        assert!(server.await.unwrap().is_ok());
    }
}
