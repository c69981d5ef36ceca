use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Split};
use tokio::sync::mpsc;
use tracing::warn;

/// Source of raw inbound request payloads. `None` means the source is
/// exhausted and the poll loop should stop.
#[async_trait]
pub trait JobSource: Send {
    async fn next_job(&mut self) -> Option<Vec<u8>>;
}

/// Newline-delimited JSON requests from any async reader. Lines are handed
/// over as raw bytes; decoding, UTF-8 included, is the coordinator's job.
pub struct LineJobSource<R> {
    segments: Split<R>,
}

impl<R: AsyncBufRead + Unpin + Send> LineJobSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            segments: reader.split(b'\n'),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> JobSource for LineJobSource<R> {
    async fn next_job(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.segments.next_segment().await {
                Ok(Some(mut line)) => {
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Some(line);
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!("job source read failed: {}", e);
                    return None;
                }
            }
        }
    }
}

/// Requests pushed through a tokio channel
pub struct ChannelJobSource {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl ChannelJobSource {
    pub fn new(rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { rx }
    }

    /// Source paired with the sender feeding it
    pub fn channel(capacity: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl JobSource for ChannelJobSource {
    async fn next_job(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_line_source_skips_blank_lines() {
        let input: &[u8] = b"{\"a\":1}\n\n  \n{\"b\":2}\n";
        let mut source = LineJobSource::new(BufReader::new(input));

        assert_eq!(source.next_job().await.unwrap(), b"{\"a\":1}".to_vec());
        assert_eq!(source.next_job().await.unwrap(), b"{\"b\":2}".to_vec());
        assert!(source.next_job().await.is_none());
    }

    #[tokio::test]
    async fn test_line_source_passes_invalid_utf8_through() {
        let input: &[u8] = b"\xff\xfe garbage\r\n{\"repo\":\"octo/widgets\"}\n";
        let mut source = LineJobSource::new(BufReader::new(input));

        assert_eq!(source.next_job().await.unwrap(), b"\xff\xfe garbage".to_vec());
        assert_eq!(source.next_job().await.unwrap(), b"{\"repo\":\"octo/widgets\"}".to_vec());
        assert!(source.next_job().await.is_none());
    }

    #[tokio::test]
    async fn test_channel_source_ends_when_senders_drop() {
        let (tx, mut source) = ChannelJobSource::channel(4);
        tx.send(b"one".to_vec()).await.unwrap();
        drop(tx);

        assert_eq!(source.next_job().await.unwrap(), b"one".to_vec());
        assert!(source.next_job().await.is_none());
    }
}
