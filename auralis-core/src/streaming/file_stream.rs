//! Chunked, bounded-memory file streaming.
//!
//! A spawned pump task reads the file in fixed-size chunks and hands them to
//! the response body through a small bounded channel. The file handle lives
//! inside the pump, so it is released as soon as the pump returns: when the
//! window has been sent, when the client goes away (the body, and with it the
//! receiver, is dropped), or when the client stops reading for longer than
//! the stall timeout.

use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, stream};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::StreamingConfig;

type Chunk = Result<Bytes, std::io::Error>;

/// How a pump finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// Every requested byte was handed to the body.
    Completed { bytes_sent: u64 },
    /// The body was dropped before the window was finished.
    ClientGone { bytes_sent: u64 },
    /// The client did not accept a chunk within the stall timeout.
    Stalled { bytes_sent: u64 },
    /// Reading from disk failed mid-stream.
    ReadFailed { bytes_sent: u64 },
    /// The file ended before the requested window did.
    Truncated { bytes_sent: u64, expected: u64 },
}

/// Start streaming `length` bytes from the current position of `file`.
///
/// The caller positions the file before handing it over. The returned stream
/// yields the bytes in ascending order with no gaps; a read failure or early
/// end of file is surfaced as a final `Err` item so the transport aborts the
/// response instead of sending a short body. The join handle resolves to the
/// pump's outcome and may be dropped.
pub fn spawn_file_pump(
    file: File,
    length: u64,
    config: &StreamingConfig,
    label: String,
) -> (
    impl Stream<Item = Chunk> + Send + 'static,
    JoinHandle<PumpOutcome>,
) {
    let (sender, receiver) = mpsc::channel(config.buffered_chunks.max(1));
    let chunk_size = config.chunk_size.max(1);
    let stall_timeout = config.stall_timeout;

    let handle = tokio::spawn(async move {
        let outcome = pump(file, length, chunk_size, stall_timeout, sender).await;
        match outcome {
            PumpOutcome::Completed { bytes_sent } => {
                debug!("Stream {} completed: {} bytes", label, bytes_sent);
            }
            PumpOutcome::ClientGone { bytes_sent } => {
                debug!(
                    "Stream {} closed by client after {} of {} bytes",
                    label, bytes_sent, length
                );
            }
            PumpOutcome::Stalled { bytes_sent } => {
                warn!(
                    "Stream {} abandoned: client stalled for {:?} after {} bytes",
                    label, stall_timeout, bytes_sent
                );
            }
            PumpOutcome::ReadFailed { bytes_sent } => {
                warn!("Stream {} aborted by read failure after {} bytes", label, bytes_sent);
            }
            PumpOutcome::Truncated {
                bytes_sent,
                expected,
            } => {
                warn!(
                    "Stream {} truncated: file ended after {} of {} bytes",
                    label, bytes_sent, expected
                );
            }
        }
        outcome
    });

    let body = stream::unfold(receiver, |mut receiver| async move {
        receiver.recv().await.map(|chunk| (chunk, receiver))
    });

    (body, handle)
}

async fn pump(
    mut file: File,
    length: u64,
    chunk_size: usize,
    stall_timeout: Duration,
    sender: mpsc::Sender<Chunk>,
) -> PumpOutcome {
    let mut bytes_sent = 0u64;

    while bytes_sent < length {
        let want = (length - bytes_sent).min(chunk_size as u64) as usize;
        let mut buffer = vec![0u8; want];

        let chunk = match file.read(&mut buffer).await {
            Ok(0) => {
                let eof = std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("file ended after {bytes_sent} of {length} bytes"),
                );
                // Best effort: the client may already be gone.
                let _ = sender.send_timeout(Err(eof), stall_timeout).await;
                return PumpOutcome::Truncated {
                    bytes_sent,
                    expected: length,
                };
            }
            Ok(n) => {
                buffer.truncate(n);
                Bytes::from(buffer)
            }
            Err(e) => {
                let _ = sender.send_timeout(Err(e), stall_timeout).await;
                return PumpOutcome::ReadFailed { bytes_sent };
            }
        };

        let chunk_len = chunk.len() as u64;
        match sender.send_timeout(Ok(chunk), stall_timeout).await {
            Ok(()) => bytes_sent += chunk_len,
            Err(SendTimeoutError::Closed(_)) => return PumpOutcome::ClientGone { bytes_sent },
            Err(SendTimeoutError::Timeout(_)) => return PumpOutcome::Stalled { bytes_sent },
        }
    }

    PumpOutcome::Completed { bytes_sent }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use tempfile::TempDir;
    use tokio::io::AsyncSeekExt;

    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    async fn fixture(len: usize) -> (TempDir, File) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.wav");
        tokio::fs::write(&path, pattern(len)).await.unwrap();
        let file = File::open(&path).await.unwrap();
        (dir, file)
    }

    fn small_chunks() -> StreamingConfig {
        StreamingConfig {
            chunk_size: 64,
            stall_timeout: Duration::from_millis(100),
            buffered_chunks: 1,
        }
    }

    #[tokio::test]
    async fn test_pump_streams_whole_file_in_chunks() {
        let (_dir, file) = fixture(1000).await;
        let (stream, handle) = spawn_file_pump(file, 1000, &small_chunks(), "test".into());

        let chunks: Vec<Bytes> = stream.map(|chunk| chunk.unwrap()).collect().await;
        assert!(chunks.iter().all(|c| c.len() <= 64));

        let body: Vec<u8> = chunks.concat();
        assert_eq!(body, pattern(1000));
        assert_eq!(
            handle.await.unwrap(),
            PumpOutcome::Completed { bytes_sent: 1000 }
        );
    }

    #[tokio::test]
    async fn test_pump_streams_exact_window_from_offset() {
        let (_dir, mut file) = fixture(1000).await;
        file.seek(std::io::SeekFrom::Start(100)).await.unwrap();
        let (stream, handle) = spawn_file_pump(file, 100, &small_chunks(), "test".into());

        let body: Vec<u8> = stream
            .map(|chunk| chunk.unwrap())
            .collect::<Vec<_>>()
            .await
            .concat();
        assert_eq!(body, pattern(1000)[100..200].to_vec());
        assert_eq!(
            handle.await.unwrap(),
            PumpOutcome::Completed { bytes_sent: 100 }
        );
    }

    #[tokio::test]
    async fn test_dropped_body_stops_pump() {
        let (_dir, file) = fixture(100_000).await;
        let (stream, handle) = spawn_file_pump(file, 100_000, &small_chunks(), "test".into());

        let mut stream = Box::pin(stream);
        let first = stream.next().await.unwrap().unwrap();
        assert!(!first.is_empty() && first.len() <= 64);
        drop(stream);

        let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        match outcome {
            PumpOutcome::ClientGone { bytes_sent } => assert!(bytes_sent < 100_000),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stalled_client_releases_pump() {
        let (_dir, file) = fixture(100_000).await;
        let config = StreamingConfig {
            stall_timeout: Duration::from_millis(50),
            ..small_chunks()
        };
        let (stream, handle) = spawn_file_pump(file, 100_000, &config, "test".into());

        let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, PumpOutcome::Stalled { .. }));
        drop(stream);
    }

    #[tokio::test]
    async fn test_short_file_ends_with_error() {
        let (_dir, file) = fixture(100).await;
        let (stream, handle) = spawn_file_pump(file, 150, &small_chunks(), "test".into());

        let items: Vec<Chunk> = stream.collect().await;
        let last = items.last().unwrap();
        assert_eq!(
            last.as_ref().unwrap_err().kind(),
            std::io::ErrorKind::UnexpectedEof
        );
        assert_eq!(
            handle.await.unwrap(),
            PumpOutcome::Truncated {
                bytes_sent: 100,
                expected: 150
            }
        );
    }

    #[tokio::test]
    async fn test_zero_length_window_is_empty() {
        let (_dir, file) = fixture(0).await;
        let (stream, handle) = spawn_file_pump(file, 0, &small_chunks(), "test".into());

        let items: Vec<Chunk> = stream.collect().await;
        assert!(items.is_empty());
        assert_eq!(
            handle.await.unwrap(),
            PumpOutcome::Completed { bytes_sent: 0 }
        );
    }
}
