//! Upstream server event feed.
//!
//! The API pushes order and product events as `text/event-stream`. Frames
//! are decoded here and translated to [`ServerEvent`]s; names we do not
//! know are dropped.

use canteen_core::notifications::ServerEvent;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use reqwest::header;
use tracing::{instrument, trace, warn};

use super::{ApiError, ApiSession, CanteenClient};

/// Longest line kept while waiting for its newline.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Largest `data` payload kept for one frame.
pub const MAX_FRAME_BYTES: usize = 256 * 1024;

/// Incremental decoder for `text/event-stream` bodies.
///
/// Feed it network chunks as they arrive; it returns every complete
/// `(event, data)` frame. Chunks may split lines and UTF-8 sequences
/// anywhere. Lines over [`MAX_LINE_BYTES`] and frames over
/// [`MAX_FRAME_BYTES`] are dropped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already searched for a newline.
    scanned: usize,
    /// Inside an oversized line; skip to the next newline.
    skipping_line: bool,
    /// The current frame outgrew the limit; skip to the next blank line.
    skipping_frame: bool,
    event: Option<String>,
    data: Vec<String>,
    data_len: usize,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return the frames it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<(String, String)> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            self.scanned = end + 1;
            let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            start = self.scanned;

            if std::mem::take(&mut self.skipping_line) {
                continue;
            }
            if let Some(frame) = self.line(line.trim_end_matches('\r')) {
                frames.push(frame);
            }
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        if self.buffer.len() > MAX_LINE_BYTES {
            warn!(bytes = self.buffer.len(), "Dropping oversized event line");
            self.buffer.clear();
            self.scanned = 0;
            self.skipping_line = true;
        }

        frames
    }

    fn line(&mut self, line: &str) -> Option<(String, String)> {
        if line.is_empty() {
            return self.dispatch();
        }
        // Comment / keep-alive
        if line.starts_with(':') || self.skipping_frame {
            return None;
        }

        let (field, value) = line
            .split_once(':')
            .map_or((line, ""), |(f, v)| (f, v.strip_prefix(' ').unwrap_or(v)));
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => {
                self.data_len += value.len() + 1;
                if self.data_len > MAX_FRAME_BYTES {
                    warn!(bytes = self.data_len, "Dropping oversized event frame");
                    self.data.clear();
                    self.skipping_frame = true;
                } else {
                    self.data.push(value.to_owned());
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<(String, String)> {
        let event = self.event.take();
        self.data_len = 0;
        if std::mem::take(&mut self.skipping_frame) || self.data.is_empty() {
            self.data.clear();
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        Some((event.unwrap_or_else(|| "message".to_owned()), data))
    }
}

impl CanteenClient {
    /// Open the event feed for a signed-in user.
    ///
    /// The returned stream ends when the connection drops; it is never
    /// re-established from here.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the session has expired, or an
    /// error if the feed cannot be opened.
    #[instrument(skip(self, session))]
    pub async fn events(
        &self,
        session: &ApiSession,
    ) -> Result<impl Stream<Item = ServerEvent> + Send + 'static, ApiError> {
        let response = self
            .inner
            .client
            .get(self.inner.config.events_url.clone())
            .header(header::ACCEPT, "text/event-stream")
            .header(header::COOKIE, session.cookie())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized("Session expired".to_owned()));
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: "Event feed unavailable".to_owned(),
            });
        }

        let mut body = response.bytes_stream();
        Ok(async_stream::stream! {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(bytes) => {
                        for (name, data) in decoder.feed(&bytes) {
                            match ServerEvent::parse(&name, &data) {
                                Some(event) => {
                                    yield event;
                                }
                                None => trace!(event = %name, "Ignoring unknown event"),
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Event feed interrupted");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_named_frames() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(
            b"event: order:paid\ndata: {\"orderId\":\"o1\"}\n\nevent: product:new\ndata: {\"name\":\"Tea\"}\n\n",
        );
        assert_eq!(
            frames,
            vec![
                ("order:paid".to_owned(), "{\"orderId\":\"o1\"}".to_owned()),
                ("product:new".to_owned(), "{\"name\":\"Tea\"}".to_owned()),
            ]
        );
    }

    #[test]
    fn test_frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: order:ne").is_empty());
        assert!(decoder.feed(b"w\r\ndata: {}\r\n").is_empty());
        let frames = decoder.feed(b"\r\n");
        assert_eq!(frames, vec![("order:new".to_owned(), "{}".to_owned())]);
    }

    #[test]
    fn test_multibyte_split() {
        let mut decoder = SseDecoder::new();
        let payload = "event: product:new\ndata: {\"name\":\"Café\"}\n\n".as_bytes();
        let (a, b) = payload.split_at(payload.len() - 5);
        assert!(decoder.feed(a).is_empty());
        let frames = decoder.feed(b);
        assert_eq!(frames[0].1, "{\"name\":\"Café\"}");
    }

    #[test]
    fn test_comments_and_empty_frames_ignored() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b": keep-alive\n\nevent: order:new\n\ndata: x\n\n");
        assert_eq!(frames, vec![("message".to_owned(), "x".to_owned())]);
    }

    #[test]
    fn test_oversized_line_is_dropped_and_decoding_resumes() {
        let mut decoder = SseDecoder::new();
        let filler = vec![b'x'; MAX_LINE_BYTES / 2];
        assert!(decoder.feed(b"data: ").is_empty());
        assert!(decoder.feed(&filler).is_empty());
        assert!(decoder.feed(&filler).is_empty());
        assert!(decoder.feed(&filler).is_empty());
        assert!(decoder.buffer.len() <= MAX_LINE_BYTES);

        // The tail of the long line ends here; the next frame is intact.
        let frames = decoder.feed(b"xxx\n\nevent: order:new\ndata: {}\n\n");
        assert_eq!(frames, vec![("order:new".to_owned(), "{}".to_owned())]);
    }

    #[test]
    fn test_oversized_frame_is_dropped() {
        let mut decoder = SseDecoder::new();
        let line = format!("data: {}\n", "y".repeat(MAX_LINE_BYTES - 16));
        for _ in 0..(MAX_FRAME_BYTES / MAX_LINE_BYTES + 1) {
            assert!(decoder.feed(line.as_bytes()).is_empty());
        }
        assert!(decoder.feed(b"\n").is_empty());
        let frames = decoder.feed(b"data: small\n\n");
        assert_eq!(frames, vec![("message".to_owned(), "small".to_owned())]);
    }

    #[test]
    fn test_byte_at_a_time_keeps_scan_position() {
        let mut decoder = SseDecoder::new();
        let mut frames = Vec::new();
        for byte in b"event: order:paid\ndata: {\"orderId\":\"o1\"}\n\n" {
            frames.extend(decoder.feed(std::slice::from_ref(byte)));
            assert_eq!(decoder.scanned, decoder.buffer.len());
        }
        assert_eq!(
            frames,
            vec![("order:paid".to_owned(), "{\"orderId\":\"o1\"}".to_owned())]
        );
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: a\ndata: b\n\n");
        assert_eq!(frames, vec![("message".to_owned(), "a\nb".to_owned())]);
    }
}
