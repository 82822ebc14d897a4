use crate::connection::{self, channel_config, Endpoint};
use anyhow::{Context, Result};
use enclave_config::EnclaveConfig;
use enclave_vsock::{AckWriter, ComputationSpec, ManagerMessage, MessageStatus};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of one delivered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub id: u32,
    pub bytes: usize,
    pub status: MessageStatus,
}

/// Read the algorithm from `--file` or take it from `--text`
pub async fn load_payload(file: Option<&Path>, text: Option<&str>) -> Result<Vec<u8>> {
    match (file, text) {
        (Some(path), _) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path)),
        (None, Some(text)) => Ok(text.as_bytes().to_vec()),
        (None, None) => Err(anyhow::anyhow!("Either --file or --text is required")),
    }
}

/// Connect, send a run request followed by the algorithm, and report the
/// acknowledgment status of both
pub async fn send_command(
    config: &EnclaveConfig,
    endpoint: &Endpoint,
    algorithm: Vec<u8>,
    name: &str,
) -> Result<()> {
    let stream = connection::connect(endpoint).await?;
    let writer = AckWriter::with_config(stream, channel_config(&config.transport));

    let computation = ComputationSpec::new(Uuid::new_v4().to_string(), name);
    let result = send_computation(&writer, computation, algorithm).await;
    let closed = writer.close().await;

    for delivery in result? {
        println!(
            "message {}: {} ({} bytes)",
            delivery.id, delivery.status, delivery.bytes
        );
    }
    closed.context("Failed to close connection")?;
    Ok(())
}

/// Send the run request and the algorithm upload, then wait for both
/// acknowledgments with the configured timeout
pub async fn send_computation(
    writer: &AckWriter,
    computation: ComputationSpec,
    algorithm: Vec<u8>,
) -> Result<Vec<Delivery>> {
    let computation_id = computation.id.clone();
    let messages = [
        ManagerMessage::RunRequest { computation },
        ManagerMessage::AlgorithmUpload { algorithm },
    ];

    let mut receipts = Vec::with_capacity(messages.len());
    for message in messages {
        let description = message.to_string();
        let receipt = writer
            .write_envelope(message)
            .await
            .with_context(|| format!("Failed to send {}", description))?;
        info!(message_id = receipt.id, %computation_id, "Sent {}", description);
        receipts.push(receipt);
    }

    let mut deliveries = Vec::with_capacity(receipts.len());
    for receipt in receipts {
        let status = writer
            .wait_for_ack_default(receipt.id)
            .await
            .with_context(|| format!("No acknowledgment for message {}", receipt.id))?;
        if status != MessageStatus::Acknowledged {
            warn!(message_id = receipt.id, %status, "Message was not delivered");
        }
        deliveries.push(Delivery {
            id: receipt.id,
            bytes: receipt.bytes_written,
            status,
        });
    }

    Ok(deliveries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_vsock::AckReader;

    #[tokio::test]
    async fn test_load_payload() {
        assert_eq!(load_payload(None, Some("x = 1")).await.unwrap(), b"x = 1");

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"print('hi')").unwrap();
        assert_eq!(
            load_payload(Some(file.path()), None).await.unwrap(),
            b"print('hi')"
        );

        assert!(load_payload(None, None).await.is_err());
        assert!(load_payload(Some(Path::new("/nonexistent/algo.py")), None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_send_computation_is_acknowledged() {
        let (host, guest) = tokio::io::duplex(64 * 1024);
        let writer = AckWriter::new(host);
        let mut reader = AckReader::new(guest);

        let receive = async {
            let first = reader.read_envelope::<ManagerMessage>().await.unwrap();
            let second = reader.read_envelope::<ManagerMessage>().await.unwrap();
            (first.message, second.message)
        };
        let send = send_computation(
            &writer,
            ComputationSpec::new("c-7", "median"),
            b"algo".to_vec(),
        );

        let (deliveries, (first, second)) = tokio::join!(send, receive);
        let deliveries = deliveries.unwrap();

        assert!(matches!(first, ManagerMessage::RunRequest { ref computation } if computation.id == "c-7"));
        assert_eq!(
            second,
            ManagerMessage::AlgorithmUpload {
                algorithm: b"algo".to_vec()
            }
        );
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].id, 1);
        assert_eq!(deliveries[1].id, 2);
        assert!(deliveries
            .iter()
            .all(|d| d.status == MessageStatus::Acknowledged && d.bytes > 0));

        writer.close().await.unwrap();
    }
}
