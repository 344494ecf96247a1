use std::sync::Arc;
use tokio::sync::broadcast;

/// Bounded broadcast topic. The demo publishes body-velocity commands on one
/// and the drive task subscribes; dropping the last publisher ends the drive
/// task once it has drained the backlog.
#[derive(Debug, Clone)]
pub struct Topic<T> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> Topic<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes `msg`, returning how many subscribers will see it. With no
    /// subscriber the message is dropped.
    pub fn publish(&self, msg: T) -> usize {
        self.tx.send(Arc::new(msg)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }
}
