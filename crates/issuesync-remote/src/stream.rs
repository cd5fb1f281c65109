use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

/// Producers hand items over one at a time, like an unbuffered channel.
const CHANNEL_CAPACITY: usize = 1;

// ─── ItemStream ───────────────────────────────────────────────────────────

/// A lazy, finite, single-reader stream fed by one background task.
///
/// Backed by a Tokio mpsc channel. The producer ends the stream by returning
/// (dropping its sender). Dropping `ItemStream` closes the receiver, which
/// makes the producer's next send fail so it can stop early.
///
/// ```rust,ignore
/// use futures::StreamExt;
///
/// let mut numbers = ItemStream::spawn(|tx| async move {
///     for n in 0..3 {
///         if tx.send(n).await.is_err() {
///             return;
///         }
///     }
/// });
/// while let Some(n) = numbers.next().await {
///     println!("{n}");
/// }
/// ```
pub struct ItemStream<T> {
    rx: mpsc::Receiver<T>,
}

impl<T: Send + 'static> ItemStream<T> {
    /// Run `producer` on the Tokio runtime and expose what it sends.
    pub fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(mpsc::Sender<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(producer(tx));
        Self { rx }
    }
}

impl<T> Stream for ItemStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
