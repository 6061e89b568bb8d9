//! Stream-backed event sources

use super::EventSource;
use crate::connectable::Consumer;
use crate::disposable::Disposable;
use futures::stream::BoxStream;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

type StreamFactory<E> = dyn Fn() -> BoxStream<'static, E> + Send + Sync;

/// Forwards a fresh stream per subscription from a task on `runtime`.
///
/// The stream is created at subscribe time, so it only sees what is
/// produced afterwards. Disposing the subscription cancels the task.
pub struct StreamEventSource<E> {
    runtime: Handle,
    factory: Arc<StreamFactory<E>>,
}

impl<E: Send + 'static> StreamEventSource<E> {
    pub fn new(runtime: Handle, factory: impl Fn() -> BoxStream<'static, E> + Send + Sync + 'static) -> Self {
        Self {
            runtime,
            factory: Arc::new(factory),
        }
    }

    /// Each subscription gets its own broadcast receiver. Lagged receivers
    /// skip the messages they missed.
    pub fn from_broadcast(runtime: Handle, sender: broadcast::Sender<E>) -> Self
    where
        E: Clone,
    {
        Self::new(runtime, move || {
            let stream = BroadcastStream::new(sender.subscribe()).filter_map(|result| match result {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event source lagged, events dropped");
                    None
                }
            });
            Box::pin(stream)
        })
    }
}

impl<E: Send + 'static> EventSource<E> for StreamEventSource<E> {
    fn subscribe(&self, consumer: Consumer<E>) -> Box<dyn Disposable> {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let mut stream = (self.factory)();

        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    () = cancelled.cancelled() => break,

                    next = stream.next() => match next {
                        Some(event) => consumer(event),
                        None => break,
                    },
                }
            }
            tracing::debug!("Stream event source finished");
        });

        Box::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingConsumer;
    use std::time::Duration;

    #[tokio::test]
    async fn test_forwards_stream_items() {
        let source = StreamEventSource::<i32>::new(Handle::current(), || Box::pin(futures::stream::iter(vec![1, 2, 3])));
        let seen = RecordingConsumer::new();

        let _subscription = source.subscribe(seen.consumer());

        assert_eq!(seen.wait_for_len_async(3).await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_broadcast_only_sees_messages_after_subscribe() {
        let (tx, _rx) = broadcast::channel(16);
        let source = StreamEventSource::from_broadcast(Handle::current(), tx.clone());
        let seen = RecordingConsumer::new();

        tx.send("before").unwrap();
        let subscription = source.subscribe(seen.consumer());
        tx.send("after").unwrap();

        assert_eq!(seen.wait_for_len_async(1).await, vec!["after"]);

        subscription.dispose();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let _ = tx.send("disposed");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(seen.values(), vec!["after"]);
    }
}
