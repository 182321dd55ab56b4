//! Relays progress events from a running deliberation to an async consumer.
//!
//! The worker only sees an [`EventSink`]; every `emit` is a non-blocking push
//! onto an unbounded channel. The consumer pulls events with
//! [`BridgedRun::next`] until it sees [`BridgeItem::Finished`], which is only
//! returned once every event emitted before the worker returned has been
//! delivered.

use crate::error::{JuraiError, Result};
use crate::events::{EventSink, ProgressEvent};
use futures::Stream;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

/// What the consumer sees next.
#[derive(Debug)]
pub enum BridgeItem<T> {
    Event(ProgressEvent),
    /// The worker's result. Always the last item.
    Finished(Result<T>),
}

pub struct EventBridge;

impl EventBridge {
    /// Run async work as its own tokio task.
    pub fn spawn<T, F, Fut>(work: F) -> BridgedRun<T>
    where
        F: FnOnce(EventSink) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (sink, events) = channel_sink();
        let worker = tokio::spawn(work(sink));
        BridgedRun::new(events, worker)
    }

    /// Run synchronous work on the blocking pool.
    pub fn spawn_blocking<T, F>(work: F) -> BridgedRun<T>
    where
        F: FnOnce(EventSink) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sink, events) = channel_sink();
        let worker = tokio::task::spawn_blocking(move || work(sink));
        BridgedRun::new(events, worker)
    }
}

fn channel_sink() -> (EventSink, mpsc::UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let warned = Arc::new(AtomicBool::new(false));
    let sink = EventSink::new(move |event| {
        if tx.send(event).is_err() && !warned.swap(true, Ordering::Relaxed) {
            tracing::debug!("Event listener went away; dropping further progress events");
        }
    });
    (sink, rx)
}

enum Race<T> {
    Event(ProgressEvent),
    Closed,
    Joined(std::result::Result<T, JoinError>),
}

/// Handle on one bridged run. Dropping it detaches the worker, which keeps
/// running to completion with its emits silently discarded.
pub struct BridgedRun<T> {
    events: mpsc::UnboundedReceiver<ProgressEvent>,
    worker: Option<JoinHandle<T>>,
    outcome: Option<Result<T>>,
    done: bool,
}

impl<T: Send + 'static> BridgedRun<T> {
    fn new(events: mpsc::UnboundedReceiver<ProgressEvent>, worker: JoinHandle<T>) -> Self {
        Self {
            events,
            worker: Some(worker),
            outcome: None,
            done: false,
        }
    }

    /// Next event, or the result once the worker is done and the queue is
    /// drained. Returns `None` after `Finished` has been handed out.
    pub async fn next(&mut self) -> Option<BridgeItem<T>> {
        if self.done {
            return None;
        }

        while let Some(worker) = self.worker.as_mut() {
            let race = tokio::select! {
                biased;
                event = self.events.recv() => match event {
                    Some(event) => Race::Event(event),
                    None => Race::Closed,
                },
                joined = worker => Race::Joined(joined),
            };

            match race {
                Race::Event(event) => return Some(BridgeItem::Event(event)),
                // All senders gone: the worker dropped its sink but may still be running.
                Race::Closed => {
                    let joined = match self.worker.take() {
                        Some(worker) => worker.await,
                        None => break,
                    };
                    self.outcome = Some(joined.map_err(worker_error));
                }
                Race::Joined(joined) => {
                    self.worker = None;
                    self.outcome = Some(joined.map_err(worker_error));
                }
            }
        }

        if let Ok(event) = self.events.try_recv() {
            return Some(BridgeItem::Event(event));
        }

        self.done = true;
        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| Err(JuraiError::Worker("worker result already taken".into())));
        Some(BridgeItem::Finished(outcome))
    }

    /// Consume the run as a stream of [`BridgeItem`]s, ending after `Finished`.
    pub fn into_stream(self) -> impl Stream<Item = BridgeItem<T>> {
        futures::stream::unfold(self, |mut run| async move {
            run.next().await.map(|item| (item, run))
        })
    }

    /// Deliver every event to `on_event`, then return the worker's result.
    pub async fn finish(mut self, mut on_event: impl FnMut(ProgressEvent)) -> Result<T> {
        loop {
            match self.next().await {
                Some(BridgeItem::Event(event)) => on_event(event),
                Some(BridgeItem::Finished(result)) => return result,
                None => return Err(JuraiError::Worker("bridged run already finished".into())),
            }
        }
    }
}

fn worker_error(e: JoinError) -> JuraiError {
    if e.is_panic() {
        JuraiError::Worker(format!("deliberation worker panicked: {e}"))
    } else {
        JuraiError::Worker(format!("deliberation worker was cancelled: {e}"))
    }
}
