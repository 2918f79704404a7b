//! Pull progress stream parsing
//!
//! A model pull returns an incremental stream of newline-delimited JSON
//! status events, potentially spanning minutes. This module reassembles lines
//! across chunk boundaries, logs every status transition as it arrives, and
//! reduces the stream to the last formatted status plus the raw status of the
//! final event (which decides whether the pull actually succeeded).

use crate::{EngineError, Result};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, info};

/// One status event from a pull stream
#[derive(Debug, Clone, Deserialize)]
pub struct PullEvent {
    #[serde(default)]
    pub status: String,
    pub completed: Option<u64>,
    pub total: Option<u64>,
}

/// Reduction of a completed pull stream
#[derive(Debug, Clone, Default)]
pub struct PullSummary {
    /// Last formatted status line, e.g. `downloading - 42.3%`
    pub last_status: String,

    /// Raw status of the final event as emitted by the engine
    pub final_status: String,
}

impl PullSummary {
    /// Whether the stream ended with the engine's explicit success event
    pub fn is_success(&self) -> bool {
        self.final_status == "success"
    }
}

/// Format a status event as a human-readable line
///
/// With both progress counters present this yields
/// `"<status> - <percent:.1>%"`; otherwise the status verbatim. A zero total
/// produces a non-finite percent, which is formatted as-is rather than
/// panicking (the engine does not emit zero totals in practice).
pub fn format_status(event: &PullEvent) -> String {
    match (event.completed, event.total) {
        (Some(completed), Some(total)) => {
            let percent = (completed as f64 / total as f64) * 100.0;
            format!("{} - {percent:.1}%", event.status)
        }
        _ => event.status.clone(),
    }
}

/// Drive a pull response's status stream to completion
pub async fn consume_pull_stream(response: reqwest::Response, model: &str) -> Result<PullSummary> {
    consume_chunks(response.bytes_stream(), model).await
}

/// Consume newline-delimited JSON status events from a chunk stream
///
/// Chunks are reassembled into lines before parsing; a trailing line without
/// a newline is flushed at end-of-stream. Empty and non-JSON lines are
/// skipped. A transport error mid-stream aborts the pull.
pub async fn consume_chunks<S, E>(mut stream: S, model: &str) -> Result<PullSummary>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut summary = PullSummary::default();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| EngineError::Connection(format!("pull stream interrupted: {e}")))?;
        buffer.extend_from_slice(&chunk);

        while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=newline).collect();
            process_line(&line[..newline], model, &mut summary);
        }
    }

    // Flush a final line the engine sent without a trailing newline
    if !buffer.is_empty() {
        process_line(&buffer, model, &mut summary);
    }

    Ok(summary)
}

fn process_line(line: &[u8], model: &str, summary: &mut PullSummary) {
    if line.iter().all(u8::is_ascii_whitespace) {
        return;
    }

    let event: PullEvent = match serde_json::from_slice(line) {
        Ok(event) => event,
        Err(e) => {
            debug!("skipping malformed pull status line: {e}");
            return;
        }
    };

    if event.status.is_empty() {
        return;
    }

    let formatted = format_status(&event);
    info!("Model {model}: {formatted}");
    summary.last_status = formatted;
    summary.final_status = event.status;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::convert::Infallible;

    fn chunks(parts: &[&str]) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|part| Ok(Bytes::copy_from_slice(part.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_format_with_progress() {
        let event = PullEvent {
            status: "downloading".to_string(),
            completed: Some(423),
            total: Some(1000),
        };
        assert_eq!(format_status(&event), "downloading - 42.3%");
    }

    #[test]
    fn test_format_rounds_to_one_decimal() {
        let event = PullEvent {
            status: "downloading".to_string(),
            completed: Some(1),
            total: Some(3),
        };
        assert_eq!(format_status(&event), "downloading - 33.3%");
    }

    #[test]
    fn test_format_without_counters_is_verbatim() {
        let event = PullEvent {
            status: "verifying sha256 digest".to_string(),
            completed: None,
            total: None,
        };
        assert_eq!(format_status(&event), "verifying sha256 digest");

        // One counter alone is not progress
        let event = PullEvent {
            status: "downloading".to_string(),
            completed: Some(10),
            total: None,
        };
        assert_eq!(format_status(&event), "downloading");
    }

    #[test]
    fn test_format_zero_total_does_not_panic() {
        let event = PullEvent {
            status: "downloading".to_string(),
            completed: Some(1),
            total: Some(0),
        };
        // Non-finite percent, formatted without panicking
        assert!(format_status(&event).starts_with("downloading - "));
    }

    #[tokio::test]
    async fn test_consume_reduces_to_last_status() {
        let summary = consume_chunks(
            chunks(&[
                "{\"status\":\"pulling manifest\"}\n",
                "{\"status\":\"downloading\",\"completed\":500,\"total\":1000}\n",
                "{\"status\":\"success\"}\n",
            ]),
            "qwen3:8b",
        )
        .await
        .unwrap();

        assert_eq!(summary.last_status, "success");
        assert_eq!(summary.final_status, "success");
        assert!(summary.is_success());
    }

    #[tokio::test]
    async fn test_consume_reassembles_split_lines() {
        let summary = consume_chunks(
            chunks(&[
                "{\"status\":\"downloa",
                "ding\",\"completed\":250,",
                "\"total\":1000}\n{\"status\":\"succ",
                "ess\"}",
            ]),
            "qwen3:8b",
        )
        .await
        .unwrap();

        // Final line arrives without a trailing newline and is still parsed
        assert_eq!(summary.final_status, "success");
        assert!(summary.is_success());
    }

    #[tokio::test]
    async fn test_consume_skips_malformed_lines() {
        let summary = consume_chunks(
            chunks(&[
                "not json at all\n",
                "\n",
                "{\"status\":\"downloading\",\"completed\":999,\"total\":1000}\n",
                "{\"broken\n",
            ]),
            "qwen3:8b",
        )
        .await
        .unwrap();

        assert_eq!(summary.last_status, "downloading - 99.9%");
        assert_eq!(summary.final_status, "downloading");
        assert!(!summary.is_success());
    }

    #[tokio::test]
    async fn test_consume_interrupted_stream_is_not_success() {
        let summary = consume_chunks(
            chunks(&[
                "{\"status\":\"downloading\",\"completed\":10,\"total\":1000}\n",
            ]),
            "qwen3:8b",
        )
        .await
        .unwrap();

        // Stream ended without the engine's success event
        assert!(!summary.is_success());
        assert_eq!(summary.last_status, "downloading - 1.0%");
    }

    #[tokio::test]
    async fn test_consume_empty_stream() {
        let summary = consume_chunks(chunks(&[]), "qwen3:8b").await.unwrap();
        assert_eq!(summary.last_status, "");
        assert!(!summary.is_success());
    }
}
