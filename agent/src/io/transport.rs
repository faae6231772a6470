//! NDJSON output of monitoring notifications.

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::protocol::messages::JsonRpcNotification;

/// Sender half for monitoring tasks to emit notifications.
pub type NotificationSender = tokio::sync::mpsc::UnboundedSender<JsonRpcNotification>;

/// Receiver half drained by [`run_output_loop`].
pub type NotificationReceiver = tokio::sync::mpsc::UnboundedReceiver<JsonRpcNotification>;

/// Write every notification from `rx` to `writer`, one JSON object per
/// line, until all senders are dropped. Returns the number written.
pub async fn run_output_loop<W>(writer: &mut W, rx: &mut NotificationReceiver) -> anyhow::Result<u64>
where
    W: AsyncWriteExt + Unpin,
{
    let mut written = 0;
    while let Some(notification) = rx.recv().await {
        let json = serde_json::to_value(&notification)?;
        debug!("Sending notification: {}", json);
        write_json(writer, &json).await?;
        written += 1;
    }
    debug!("Notification channel closed after {written} messages");
    Ok(written)
}

/// Write a JSON value as an NDJSON line to the writer.
pub async fn write_json<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
