//! Bounded worker pools.
//!
//! Two dispatch shapes are used:
//!
//! - [`BatchPool`]: each submitted item (a scan page) is one unit of work.
//!   `submit` waits while the queue is full, so a fast scanner can never run
//!   ahead of the workers.
//! - [`run_key_workers`]: keys flow through one bounded channel into N
//!   long-lived [`BatchWorker`]s, each owning its own connections. A worker
//!   compares whenever it has gathered `batch_size` keys and always flushes
//!   the partial batch once the channel closes.
//!
//! Both return only after every worker has finished.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::scanner::PROGRESS_INTERVAL;
use crate::{CompareError, Result};

type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

/// Take the next item off a receiver shared by several workers.
async fn next_item<T>(rx: &SharedReceiver<T>) -> Option<T> {
    rx.lock().await.recv().await
}

/// Collapse worker outcomes into the first error, if any.
async fn join_workers(mut workers: JoinSet<Result<u64>>) -> Result<u64> {
    let mut total = 0;
    let mut first_err = None;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(count)) => total += count,
            Ok(Err(e)) => {
                first_err.get_or_insert(e);
            }
            Err(e) => {
                first_err.get_or_insert(CompareError::Worker(e.to_string()));
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(total),
    }
}

/// Fixed-size pool consuming items from a bounded queue.
pub struct BatchPool<T> {
    sender: mpsc::Sender<T>,
    workers: JoinSet<Result<u64>>,
}

impl<T: Send + 'static> BatchPool<T> {
    /// Start `threads` workers running `handler` on each item. The queue holds
    /// at most `threads` pending items.
    ///
    /// A handler error stops that worker; the error is reported by
    /// [`BatchPool::join`].
    pub fn spawn<F, Fut>(threads: usize, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<u64>> + Send + 'static,
    {
        let threads = threads.max(1);
        let (sender, receiver) = mpsc::channel(threads);
        let receiver: SharedReceiver<T> = Arc::new(Mutex::new(receiver));
        let handler = Arc::new(handler);

        let mut workers = JoinSet::new();
        for id in 0..threads {
            let receiver = receiver.clone();
            let handler = handler.clone();
            workers.spawn(async move {
                let mut done = 0;
                while let Some(item) = next_item(&receiver).await {
                    done += handler(item).await?;
                }
                debug!("Pool worker {} finished after {} items of work", id, done);
                Ok(done)
            });
        }
        Self { sender, workers }
    }

    /// Queue one item, waiting for room.
    pub async fn submit(&self, item: T) -> Result<()> {
        self.sender
            .send(item)
            .await
            .map_err(|_| CompareError::Worker("all pool workers have stopped".to_string()))
    }

    /// Close the queue and wait for every worker. Returns the sum of the
    /// handlers' counts, or the first error.
    pub async fn join(self) -> Result<u64> {
        drop(self.sender);
        join_workers(self.workers).await
    }
}

/// A long-lived consumer of key sub-batches.
#[async_trait]
pub trait BatchWorker: Send + 'static {
    /// Compare one batch. Returns how many keys were compared.
    async fn compare_batch(&mut self, keys: Vec<String>) -> Result<u64>;
}

/// Push every key through a channel of `capacity` into `workers`.
///
/// Returns the number of keys the workers compared.
pub async fn run_key_workers<W, I>(
    keys: I,
    workers: Vec<W>,
    batch_size: usize,
    capacity: usize,
) -> Result<u64>
where
    W: BatchWorker,
    I: IntoIterator<Item = String>,
{
    if workers.is_empty() {
        return Err(CompareError::InvalidOptions(
            "at least one worker is required".to_string(),
        ));
    }
    let batch_size = batch_size.max(1);
    let (sender, receiver) = mpsc::channel::<String>(capacity.max(1));
    let receiver: SharedReceiver<String> = Arc::new(Mutex::new(receiver));

    let mut set = JoinSet::new();
    for (id, mut worker) in workers.into_iter().enumerate() {
        let receiver = receiver.clone();
        set.spawn(async move {
            let mut batch = Vec::with_capacity(batch_size);
            let mut compared = 0;
            let mut last_report = Instant::now();
            while let Some(key) = next_item(&receiver).await {
                batch.push(key);
                if batch.len() == batch_size {
                    compared += worker.compare_batch(std::mem::take(&mut batch)).await?;
                }
                if last_report.elapsed() >= PROGRESS_INTERVAL {
                    last_report = Instant::now();
                    info!("Comparing values, worker id: {}, compared keys: {}", id, compared);
                }
            }
            if !batch.is_empty() {
                compared += worker.compare_batch(batch).await?;
            }
            debug!("Comparing values, worker id: {} finished, compared keys: {}", id, compared);
            Ok(compared)
        });
    }

    let mut queued = 0u64;
    let mut last_report = Instant::now();
    for key in keys {
        if sender.send(key).await.is_err() {
            // Every worker has stopped; the join below reports why.
            break;
        }
        queued += 1;
        if last_report.elapsed() >= PROGRESS_INTERVAL {
            last_report = Instant::now();
            info!("Comparing values, queued keys: {}", queued);
        }
    }
    drop(sender);

    join_workers(set).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[tokio::test]
    async fn test_batch_pool_runs_every_item() {
        let seen = Arc::new(AtomicU64::new(0));
        let counter = seen.clone();
        let pool = BatchPool::spawn(3, move |n: u64| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(n, Ordering::SeqCst);
                Ok::<u64, CompareError>(1)
            }
        });
        for n in 1..=10 {
            pool.submit(n).await.unwrap();
        }
        assert_eq!(pool.join().await.unwrap(), 10);
        assert_eq!(seen.load(Ordering::SeqCst), 55);
    }

    #[tokio::test]
    async fn test_batch_pool_reports_handler_error() {
        let pool = BatchPool::spawn(1, |n: u64| async move {
            if n == 2 {
                Err(CompareError::Worker("boom".into()))
            } else {
                Ok::<u64, CompareError>(1)
            }
        });
        for n in 1..=2 {
            pool.submit(n).await.unwrap();
        }
        assert!(pool.join().await.is_err());
    }

    struct Collect {
        batches: Arc<std::sync::Mutex<Vec<usize>>>,
    }

    #[async_trait]
    impl BatchWorker for Collect {
        async fn compare_batch(&mut self, keys: Vec<String>) -> Result<u64> {
            self.batches.lock().unwrap().push(keys.len());
            Ok(keys.len() as u64)
        }
    }

    #[tokio::test]
    async fn test_partial_batch_is_flushed() {
        let batches = Arc::new(std::sync::Mutex::new(Vec::new()));
        let worker = Collect {
            batches: batches.clone(),
        };
        let keys = (0..7).map(|i| format!("k{i}"));

        let compared = run_key_workers(keys, vec![worker], 3, 16).await.unwrap();
        assert_eq!(compared, 7);
        assert_eq!(*batches.lock().unwrap(), vec![3, 3, 1]);
    }

    #[tokio::test]
    async fn test_many_workers_cover_every_key() {
        let batches = Arc::new(std::sync::Mutex::new(Vec::new()));
        let workers = (0..4)
            .map(|_| Collect {
                batches: batches.clone(),
            })
            .collect();
        let keys = (0..1000).map(|i| format!("k{i}"));

        let compared = run_key_workers(keys, workers, 50, 8).await.unwrap();
        assert_eq!(compared, 1000);
        assert_eq!(batches.lock().unwrap().iter().sum::<usize>(), 1000);
    }
}
