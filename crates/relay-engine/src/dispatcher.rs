use std::sync::Arc;

use relay_channels::{ChannelError, ChatSink};
use relay_core::config::CHUNK_LIMIT;
use tracing::{debug, info};

/// Delivers rendered text to chat destinations in size-bounded chunks.
pub struct Dispatcher {
    sink: Arc<dyn ChatSink>,
    chunk_limit: usize,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn ChatSink>) -> Self {
        Self::with_chunk_limit(sink, CHUNK_LIMIT)
    }

    pub fn with_chunk_limit(sink: Arc<dyn ChatSink>, chunk_limit: usize) -> Self {
        Self {
            sink,
            chunk_limit: chunk_limit.max(1),
        }
    }

    /// Send `text` to `destination`, one awaited call per chunk.
    ///
    /// Returns the number of chunks delivered. Blank text is skipped
    /// (`Ok(0)`). The first failed chunk aborts the rest of this dispatch.
    pub async fn deliver(&self, destination: &str, text: &str) -> Result<usize, ChannelError> {
        if text.trim().is_empty() {
            debug!(channel = destination, "skipping blank dispatch");
            return Ok(0);
        }

        let chunks = split_chunks(text, self.chunk_limit);
        if chunks.len() > 1 {
            info!(
                channel = destination,
                chunks = chunks.len(),
                "message too long, splitting into chunks"
            );
        }

        for (sent, chunk) in chunks.iter().enumerate() {
            if let Err(e) = self.sink.send_text(destination, chunk).await {
                debug!(channel = destination, sent, "dispatch aborted");
                return Err(e);
            }
        }

        debug!(channel = destination, sink = self.sink.name(), "dispatch complete");
        Ok(chunks.len())
    }
}

/// Split `text` into consecutive slices of at most `limit` characters.
///
/// Fixed-length slicing: no attempt is made to keep words or lines whole,
/// but a character is never cut in half.
pub fn split_chunks(text: &str, limit: usize) -> Vec<&str> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == limit {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String)>>,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl ChatSink for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn send_text(&self, destination: &str, text: &str) -> Result<(), ChannelError> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_after.is_some_and(|n| sent.len() >= n) {
                return Err(ChannelError::SendFailed("boom".into()));
            }
            sent.push((destination.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[test]
    fn short_text_is_single_chunk() {
        assert_eq!(split_chunks("Hello, world!", 2000), vec!["Hello, world!"]);
    }

    #[test]
    fn exact_limit_is_single_chunk() {
        let text = "x".repeat(2000);
        assert_eq!(split_chunks(&text, 2000).len(), 1);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(split_chunks("", 2000).is_empty());
    }

    #[test]
    fn multibyte_characters_are_never_split() {
        let text = "\u{e9}".repeat(5); // 2 bytes each
        let chunks = split_chunks(&text, 2);
        assert_eq!(chunks, vec!["\u{e9}\u{e9}", "\u{e9}\u{e9}", "\u{e9}"]);
    }

    #[tokio::test]
    async fn long_text_is_sent_in_order() {
        let sink = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(sink.clone());
        let text = format!("{}{}{}", "a".repeat(2000), "b".repeat(2000), "c".repeat(500));

        assert_eq!(dispatcher.deliver("chan", &text).await.unwrap(), 3);

        let sent = sink.sent.lock().unwrap();
        let lens: Vec<usize> = sent.iter().map(|(_, t)| t.chars().count()).collect();
        assert_eq!(lens, vec![2000, 2000, 500]);
        assert!(sent[0].1.starts_with('a'));
        assert!(sent[1].1.starts_with('b'));
        assert!(sent[2].1.starts_with('c'));
        assert!(sent.iter().all(|(dest, _)| dest == "chan"));
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let sink = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(sink.clone());
        assert_eq!(dispatcher.deliver("chan", "   \n\t").await.unwrap(), 0);
        assert_eq!(dispatcher.deliver("chan", "").await.unwrap(), 0);
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_stops_remaining_chunks() {
        let sink = Arc::new(Recorder {
            fail_after: Some(1),
            ..Recorder::default()
        });
        let dispatcher = Dispatcher::with_chunk_limit(sink.clone(), 10);
        let result = dispatcher.deliver("chan", &"z".repeat(35)).await;
        assert!(result.is_err());
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }
}
