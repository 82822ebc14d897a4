use crate::connection::{self, channel_config, Endpoint};
use anyhow::{Context, Result};
use enclave_config::EnclaveConfig;
use enclave_vsock::{AckReader, ManagerMessage, TransportError};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

/// Accept one connection and log every message until the peer hangs up
pub async fn receive_command(config: &EnclaveConfig, endpoint: &Endpoint, raw: bool) -> Result<()> {
    let stream = connection::accept(endpoint).await?;
    let mut reader = AckReader::with_config(stream, &channel_config(&config.transport));

    let received = tokio::select! {
        result = receive_loop(&mut reader, raw) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping receiver");
            return Ok(());
        }
    };

    println!("Received {} message(s)", received);
    Ok(())
}

/// Read until the connection closes. Undecodable messages are logged and
/// skipped; they have already been acknowledged.
pub async fn receive_loop<C>(reader: &mut AckReader<C>, raw: bool) -> Result<usize>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let mut received = 0;

    loop {
        let outcome = if raw {
            reader.read_frame().await.map(|frame| {
                println!(
                    "[{}] {} bytes: {}",
                    frame.id,
                    frame.payload.len(),
                    String::from_utf8_lossy(&frame.payload)
                );
            })
        } else {
            reader.read_envelope::<ManagerMessage>().await.map(|envelope| {
                info!(sent_at = %envelope.timestamp, "Received {}", envelope.message);
                println!("{}", envelope.message);
            })
        };

        match outcome {
            Ok(()) => received += 1,
            Err(TransportError::ConnectionClosed) => {
                info!(received, "Peer closed the connection");
                return Ok(received);
            }
            Err(e @ TransportError::Deserialization(_)) => {
                received += 1;
                warn!(error = %e, "Skipping undecodable message");
            }
            Err(e) => return Err(e).context("Failed to receive message"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_vsock::{AckWriter, ComputationSpec};

    #[tokio::test]
    async fn test_receive_loop_skips_bad_payloads() {
        let (host, guest) = tokio::io::duplex(64 * 1024);
        let writer = AckWriter::new(host);
        let mut reader = AckReader::new(guest);

        let send = async {
            writer
                .write_envelope(ManagerMessage::RunRequest {
                    computation: ComputationSpec::new("c-1", "sum"),
                })
                .await
                .unwrap();
            writer.write(b"garbage").await.unwrap();
            let last = writer
                .write_envelope(ManagerMessage::Stop {
                    computation_id: "c-1".to_string(),
                })
                .await
                .unwrap();
            writer.wait_for_ack_default(last.id).await.unwrap();
            writer.close().await.unwrap();
        };

        let (_, received) = tokio::join!(send, receive_loop(&mut reader, false));
        assert_eq!(received.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_receive_loop_raw() {
        let (host, guest) = tokio::io::duplex(1024);
        let writer = AckWriter::new(host);
        let mut reader = AckReader::new(guest);

        let send = async {
            writer.write(b"one").await.unwrap();
            let last = writer.send(b"").await.unwrap();
            writer.wait_for_ack_default(last.id).await.unwrap();
            writer.close().await.unwrap();
        };

        let (_, received) = tokio::join!(send, receive_loop(&mut reader, true));
        assert_eq!(received.unwrap(), 2);
    }
}
