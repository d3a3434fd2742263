//! # Message Streams
//!
//! Async side of the bus. A [`MessageStream`] is a listener whose callback
//! queues `(broadcast tag, payload clone)` on an unbounded tokio channel;
//! consumers `recv().await` or use it as a `tokio_stream::Stream`.
//!
//! Delivery into the queue happens synchronously during the broadcast, so a
//! stream observes messages in the same order as any other listener.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use message_types::Tag;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio_stream::Stream;

use crate::error::StreamError;
use crate::handle::{ListenerGuard, ListenerHandle};

/// Stream of `T` payloads broadcast on a tag.
///
/// Dropping the stream unregisters its listener. The stream ends (`None`)
/// once the listener is removed some other way, e.g. by
/// [`MessageBus::clear`](crate::MessageBus::clear).
pub struct MessageStream<T> {
    // Declared before the receiver: the listener goes away first.
    guard: ListenerGuard,
    receiver: mpsc::UnboundedReceiver<(Tag, T)>,
}

impl<T> MessageStream<T> {
    pub(crate) fn new(guard: ListenerGuard, receiver: mpsc::UnboundedReceiver<(Tag, T)>) -> Self {
        Self { guard, receiver }
    }

    /// Handle of the backing listener, `None` after [`close`](Self::close).
    #[must_use]
    pub fn handle(&self) -> Option<&ListenerHandle> {
        self.guard.handle()
    }

    /// Wait for the next message.
    ///
    /// # Returns
    ///
    /// - `Some((tag, payload))` - The next message and the tag it was broadcast on
    /// - `None` - The listener was removed and the queue is drained
    pub async fn recv(&mut self) -> Option<(Tag, T)> {
        self.receiver.recv().await
    }

    /// Take the next queued message without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was queued
    /// - `Ok(None)` - Nothing queued yet
    /// - `Err(StreamError::Closed)` - The listener was removed and the queue is drained
    pub fn try_recv(&mut self) -> Result<Option<(Tag, T)>, StreamError> {
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(StreamError::Closed),
        }
    }

    /// Stop listening. Messages already queued can still be received.
    pub fn close(&mut self) {
        self.guard.unregister();
    }
}

impl<T> Stream for MessageStream<T> {
    type Item = (Tag, T);

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl<T> fmt::Debug for MessageStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageStream")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}
