use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Multi-consumer view of a bounded mpsc channel.
///
/// Workers clone the queue and call [`WorkQueue::next`] until it yields
/// `None`, which happens once every sender is dropped and the buffer is
/// drained.
pub struct WorkQueue<T> {
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> WorkQueue<T> {
    pub fn new(rx: mpsc::Receiver<T>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    pub async fn next(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}

/// Builds a closed queue holding exactly `items`.
pub async fn preloaded<T>(items: Vec<T>) -> WorkQueue<T> {
    let (tx, rx) = mpsc::channel(items.len().max(1));
    for item in items {
        // 容量等於項目數，send 不會阻塞；receiver 仍在本函式中
        if tx.send(item).await.is_err() {
            break;
        }
    }
    WorkQueue::new(rx)
}
