//! # SSE Parser
//!
//! Server-Sent Events parser for streaming chat completions:
//! - Line buffering from chunked responses
//! - `data: ` prefix extraction
//! - `[DONE]` marker filtering
//! - Optional processing of a trailing line without newline

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tracing::warn;

/// Parse SSE lines from a byte stream and yield the `data` payloads.
///
/// Comments, non-data fields, empty payloads and `[DONE]` are skipped. A read
/// error ends the stream.
pub fn parse_sse_lines<S>(
    byte_stream: S,
    process_remaining: bool,
) -> impl Stream<Item = String> + Send + 'static
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    futures::stream::unfold(
        (byte_stream, BytesMut::with_capacity(8192), false),
        move |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }

            loop {
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    let Ok(line) = std::str::from_utf8(&line_bytes) else {
                        continue;
                    };

                    if let Some(data) = extract_sse_data(line) {
                        return Some((data, (stream, buffer, false)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => {
                        warn!("SSE stream read error: {e}");
                        return None;
                    }
                    None => {
                        if process_remaining && !buffer.is_empty() {
                            let Ok(line) = std::str::from_utf8(&buffer) else {
                                return None;
                            };
                            if let Some(data) = extract_sse_data(line.trim()) {
                                buffer.clear();
                                return Some((data, (stream, buffer, true)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Extract the data payload from an SSE line.
fn extract_sse_data(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))?
        .trim();

    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_string())
}

/// Parse JSON from an SSE payload, logging and skipping malformed data.
pub fn parse_sse_data<T: serde::de::DeserializeOwned>(data: &str, provider: &str) -> Option<T> {
    match serde_json::from_str(data) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            let preview: String = data.chars().take(100).collect();
            warn!(provider, error = %e, data_preview = %preview, "failed to parse SSE data");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(chunks: Vec<&'static str>, process_remaining: bool) -> Vec<String> {
        let items: Vec<Result<Bytes, reqwest::Error>> =
            chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
        parse_sse_lines(futures::stream::iter(items), process_remaining)
            .collect()
            .await
    }

    #[test]
    fn extract_data_line() {
        assert_eq!(extract_sse_data("data: {\"a\":1}"), Some("{\"a\":1}".into()));
        assert_eq!(extract_sse_data("data:{\"a\":1}"), Some("{\"a\":1}".into()));
    }

    #[test]
    fn extract_skips_done_comments_and_other_fields() {
        assert_eq!(extract_sse_data("data: [DONE]"), None);
        assert_eq!(extract_sse_data(": keep-alive"), None);
        assert_eq!(extract_sse_data("event: message"), None);
        assert_eq!(extract_sse_data("data: "), None);
        assert_eq!(extract_sse_data(""), None);
    }

    #[test]
    fn parse_invalid_json_returns_none() {
        let result: Option<serde_json::Value> = parse_sse_data("not json", "test");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn multiple_events_in_one_chunk() {
        let out = collect(vec!["data: {\"a\":1}\n\ndata: {\"b\":2}\n\n"], false).await;
        assert_eq!(out, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[tokio::test]
    async fn event_split_across_chunks() {
        let out = collect(vec!["data: {\"par", "tial\":true}\r\n\r\n"], false).await;
        assert_eq!(out, vec!["{\"partial\":true}"]);
    }

    #[tokio::test]
    async fn done_marker_is_filtered() {
        let out = collect(vec!["data: {\"ok\":true}\n\ndata: [DONE]\n\n"], false).await;
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn trailing_line_depends_on_option() {
        assert_eq!(collect(vec!["data: {\"t\":1}"], true).await.len(), 1);
        assert!(collect(vec!["data: {\"t\":1}"], false).await.is_empty());
    }
}
