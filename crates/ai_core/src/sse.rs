//! Server-sent event line decoding
//!
//! MiniMax streams `data: {...}` lines. Network chunks do not respect line
//! boundaries, so bytes are buffered until a newline arrives and the
//! unterminated tail is released when the body ends.

use bytes::Bytes;
use futures::{
    Stream,
    stream::{self, StreamExt},
};

/// One non-empty line of an SSE body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Payload of a `data:` line with leading whitespace removed
    Data(String),
    /// Any other line, e.g. a plain JSON error body
    Other(String),
}

/// Incremental splitter from byte chunks to SSE lines
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    /// Feed bytes and return every completed line
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseLine> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(line) = classify(&raw[..raw.len() - 1]) {
                lines.push(line);
            }
        }
        lines
    }

    /// Release the unterminated tail, if any
    pub fn finish(&mut self) -> Option<SseLine> {
        let raw = std::mem::take(&mut self.buffer);
        classify(&raw)
    }
}

fn classify(raw: &[u8]) -> Option<SseLine> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim_end_matches('\r').trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    line.strip_prefix("data:").map_or_else(
        || Some(SseLine::Other(line.to_string())),
        |payload| Some(SseLine::Data(payload.trim_start().to_string())),
    )
}

/// Turn a response byte stream into a stream of SSE lines
pub fn sse_lines<S>(bytes: S) -> impl Stream<Item = Result<SseLine, reqwest::Error>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    bytes
        .map(Some)
        .chain(stream::once(async { None }))
        .scan(SseLineDecoder::default(), |decoder, item| {
            let out: Vec<Result<SseLine, reqwest::Error>> = match item {
                Some(Ok(chunk)) => decoder.push(&chunk).into_iter().map(Ok).collect(),
                Some(Err(e)) => vec![Err(e)],
                None => decoder.finish().into_iter().map(Ok).collect(),
            };
            futures::future::ready(Some(out))
        })
        .flat_map(stream::iter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_data_lines() {
        let mut decoder = SseLineDecoder::default();
        let lines = decoder.push(b"data: {\"a\":1}\n\ndata:{\"b\":2}\n");
        assert_eq!(
            lines,
            vec![
                SseLine::Data("{\"a\":1}".to_string()),
                SseLine::Data("{\"b\":2}".to_string())
            ]
        );
    }

    #[test]
    fn buffers_partial_lines() {
        let mut decoder = SseLineDecoder::default();
        assert!(decoder.push(b"data: {\"con").is_empty());
        let lines = decoder.push(b"tent\":1}\r\n");
        assert_eq!(lines, vec![SseLine::Data("{\"content\":1}".to_string())]);
    }

    #[test]
    fn keeps_multibyte_characters_split_across_chunks() {
        let text = "data: 你好\n".as_bytes();
        let mut decoder = SseLineDecoder::default();
        assert!(decoder.push(&text[..7]).is_empty());
        let lines = decoder.push(&text[7..]);
        assert_eq!(lines, vec![SseLine::Data("你好".to_string())]);
    }

    #[test]
    fn finish_releases_tail() {
        let mut decoder = SseLineDecoder::default();
        decoder.push(b"data: tail");
        assert_eq!(decoder.finish(), Some(SseLine::Data("tail".to_string())));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn non_data_lines_are_reported() {
        let mut decoder = SseLineDecoder::default();
        let lines = decoder.push(b"{\"base_resp\":{\"status_code\":1002}}\n: keepalive\n");
        assert_eq!(
            lines,
            vec![SseLine::Other(
                "{\"base_resp\":{\"status_code\":1002}}".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn stream_adapter_flushes_at_end() {
        let chunks: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::from_static(b"data: one\ndata: t")),
            Ok(Bytes::from_static(b"wo")),
        ];
        let lines: Vec<SseLine> = sse_lines(stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(
            lines,
            vec![
                SseLine::Data("one".to_string()),
                SseLine::Data("two".to_string())
            ]
        );
    }
}
