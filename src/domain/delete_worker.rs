//! Background worker that batches soft-delete requests.
//!
//! Producers hand records to a [`DeleteQueue`] and return immediately. A single
//! task owns the pending buffer and flushes it to storage when it grows past
//! the batch size or when the flush timer fires, whichever comes first.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::entities::UrlRecord;
use crate::domain::errors::StorageError;
use crate::domain::repositories::UrlRepository;

/// Batching parameters of the deletion worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteWorkerConfig {
    /// A flush is triggered as soon as the buffer holds more than this many records.
    pub batch_size: usize,
    /// Period of the flush timer.
    pub flush_interval: Duration,
    /// Upper bound on a single storage batch call.
    pub flush_timeout: Duration,
    /// How many further flush triggers a failed batch is kept for.
    /// Zero drops a failed batch right away.
    pub flush_retries: u32,
}

impl Default for DeleteWorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            flush_interval: Duration::from_secs(10),
            flush_timeout: Duration::from_secs(3),
            flush_retries: 0,
        }
    }
}

/// Producer handle of the deletion worker.
///
/// Cheap to clone; every clone feeds the same worker.
#[derive(Debug, Clone)]
pub struct DeleteQueue {
    tx: mpsc::UnboundedSender<UrlRecord>,
}

impl DeleteQueue {
    /// Enqueues a record for soft deletion without waiting.
    ///
    /// There is no acknowledgement: the record counts as handed off once this
    /// returns, and is durable only after a later flush succeeds.
    pub fn submit(&self, record: UrlRecord) {
        if let Err(e) = self.tx.send(record) {
            warn!(short = %e.0.short, "Delete worker is stopped, dropping request");
        }
    }

    /// Returns true once the worker no longer accepts records.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The consume/flush loop of the deletion pipeline.
pub struct DeleteWorker<R: UrlRepository + ?Sized> {
    rx: mpsc::UnboundedReceiver<UrlRecord>,
    repository: Arc<R>,
    config: DeleteWorkerConfig,
    shutdown: CancellationToken,
    buffer: Vec<UrlRecord>,
    failed_attempts: u32,
}

impl<R: UrlRepository + ?Sized + 'static> DeleteWorker<R> {
    /// Creates a worker and its producer handle without starting it.
    pub fn new(
        repository: Arc<R>,
        config: DeleteWorkerConfig,
        shutdown: CancellationToken,
    ) -> (DeleteQueue, Self) {
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = Self {
            rx,
            repository,
            config,
            shutdown,
            buffer: Vec::with_capacity(config.batch_size + 1),
            failed_attempts: 0,
        };

        (DeleteQueue { tx }, worker)
    }

    /// Creates a worker and runs it on a dedicated task.
    pub fn spawn(
        repository: Arc<R>,
        config: DeleteWorkerConfig,
        shutdown: CancellationToken,
    ) -> (DeleteQueue, JoinHandle<()>) {
        let (queue, worker) = Self::new(repository, config, shutdown);
        (queue, tokio::spawn(worker.run()))
    }

    /// Runs until the shutdown token is cancelled or every producer is gone,
    /// then makes one last best-effort flush.
    pub async fn run(mut self) {
        info!(
            batch_size = self.config.batch_size,
            interval_ms = self.config.flush_interval.as_millis() as u64,
            "Delete worker started"
        );

        let mut ticker = time::interval_at(
            Instant::now() + self.config.flush_interval,
            self.config.flush_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    self.drain_queued();
                    break;
                }
                received = self.rx.recv() => match received {
                    Some(record) => {
                        debug!(short = %record.short, user_id = %record.user_id, "Got record to delete");
                        self.buffer.push(record);
                        if self.buffer.len() > self.config.batch_size {
                            self.flush().await;
                        }
                    }
                    None => {
                        debug!("All delete producers dropped");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if !self.buffer.is_empty() {
                        self.flush().await;
                    }
                }
            }
        }

        if !self.buffer.is_empty() {
            // No later cycle exists to retry in.
            self.failed_attempts = self.config.flush_retries;
            self.flush().await;
        }

        info!("Delete worker stopped");
    }

    /// Moves records still sitting in the channel into the buffer.
    fn drain_queued(&mut self) {
        self.rx.close();
        while let Ok(record) = self.rx.try_recv() {
            self.buffer.push(record);
        }
    }

    async fn flush(&mut self) {
        let count = self.buffer.len();
        info!(count, "Flushing delete records");
        metrics::counter!("delete_worker_flushes_total").increment(1);

        let outcome = match time::timeout(
            self.config.flush_timeout,
            self.repository.delete_batch(&self.buffer),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout),
        };

        match outcome {
            Ok(()) => {
                self.failed_attempts = 0;
                self.buffer.clear();
            }
            Err(e) => {
                metrics::counter!("delete_worker_flush_failures_total").increment(1);

                if self.failed_attempts < self.config.flush_retries {
                    self.failed_attempts += 1;
                    warn!(
                        error = %e,
                        count,
                        attempt = self.failed_attempts,
                        "Cannot delete records, keeping batch for retry"
                    );
                    return;
                }

                error!(error = %e, count, "Cannot delete records, dropping batch");
                metrics::counter!("delete_worker_records_dropped_total").increment(count as u64);
                self.failed_attempts = 0;
                self.buffer.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::{MockUrlRepository, StorageStats};
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<Vec<UrlRecord>>>>;

    /// Mock that records every batch and fails the calls selected by `fail`.
    fn recording_repo(fail: impl Fn(usize) -> bool + Send + 'static) -> (MockUrlRepository, Calls) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let captured = calls.clone();

        let mut repo = MockUrlRepository::new();
        repo.expect_delete_batch()
            .returning(move |records: &[UrlRecord]| {
                let mut calls = captured.lock().unwrap();
                calls.push(records.to_vec());
                if fail(calls.len()) {
                    Err(StorageError::Timeout)
                } else {
                    Ok(())
                }
            });

        (repo, calls)
    }

    fn record(i: usize) -> UrlRecord {
        UrlRecord::deletion(format!("code{i}"), "user")
    }

    fn batch_sizes(calls: &Calls) -> Vec<usize> {
        calls.lock().unwrap().iter().map(Vec::len).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_size_triggers_flush() {
        let (repo, calls) = recording_repo(|_| false);
        let shutdown = CancellationToken::new();
        let (queue, handle) =
            DeleteWorker::spawn(Arc::new(repo), DeleteWorkerConfig::default(), shutdown.clone());

        for i in 0..26 {
            queue.submit(record(i));
        }
        time::sleep(Duration::from_millis(100)).await;

        assert_eq!(batch_sizes(&calls), vec![26]);
        let flushed = calls.lock().unwrap()[0].clone();
        let expected: Vec<UrlRecord> = (0..26).map(record).collect();
        assert_eq!(flushed, expected, "records are flushed in arrival order");

        shutdown.cancel();
        handle.await.unwrap();
        assert_eq!(batch_sizes(&calls), vec![26]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_is_exclusive() {
        let (repo, calls) = recording_repo(|_| false);
        let (queue, _handle) = DeleteWorker::spawn(
            Arc::new(repo),
            DeleteWorkerConfig::default(),
            CancellationToken::new(),
        );

        for i in 0..25 {
            queue.submit(record(i));
        }
        time::sleep(Duration::from_millis(100)).await;

        assert!(batch_sizes(&calls).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_triggers_flush() {
        let (repo, calls) = recording_repo(|_| false);
        let (queue, _handle) = DeleteWorker::spawn(
            Arc::new(repo),
            DeleteWorkerConfig::default(),
            CancellationToken::new(),
        );

        queue.submit(UrlRecord::deletion("abc", "user"));
        queue.submit(UrlRecord::deletion("def", "user"));
        time::sleep(Duration::from_secs(11)).await;

        assert_eq!(batch_sizes(&calls), vec![2]);
        let shorts: Vec<String> = calls.lock().unwrap()[0]
            .iter()
            .map(|r| r.short.clone())
            .collect();
        assert_eq!(shorts, vec!["abc", "def"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_flush_without_records() {
        let (repo, calls) = recording_repo(|_| false);
        let (_queue, _handle) = DeleteWorker::spawn(
            Arc::new(repo),
            DeleteWorkerConfig::default(),
            CancellationToken::new(),
        );

        time::sleep(Duration::from_secs(35)).await;

        assert!(batch_sizes(&calls).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_clears_buffer() {
        let (repo, calls) = recording_repo(|call| call == 1);
        let (queue, _handle) = DeleteWorker::spawn(
            Arc::new(repo),
            DeleteWorkerConfig::default(),
            CancellationToken::new(),
        );

        for i in 0..30 {
            queue.submit(record(i));
        }
        time::sleep(Duration::from_secs(11)).await;

        // The failed batch of 26 is gone; the timer flush only carries the rest.
        assert_eq!(batch_sizes(&calls), vec![26, 4]);
        assert_eq!(calls.lock().unwrap()[1][0], record(26));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_is_retried_when_configured() {
        let (repo, calls) = recording_repo(|call| call == 1);
        let config = DeleteWorkerConfig {
            flush_retries: 1,
            ..DeleteWorkerConfig::default()
        };
        let (queue, _handle) =
            DeleteWorker::spawn(Arc::new(repo), config, CancellationToken::new());

        queue.submit(record(1));
        queue.submit(record(2));
        time::sleep(Duration::from_secs(11)).await;
        assert_eq!(batch_sizes(&calls), vec![2]);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(batch_sizes(&calls), vec![2, 2]);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(batch_sizes(&calls), vec![2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let (repo, calls) = recording_repo(|_| true);
        let config = DeleteWorkerConfig {
            flush_retries: 2,
            ..DeleteWorkerConfig::default()
        };
        let (queue, _handle) =
            DeleteWorker::spawn(Arc::new(repo), config, CancellationToken::new());

        queue.submit(record(1));
        time::sleep(Duration::from_secs(65)).await;

        assert_eq!(batch_sizes(&calls), vec![1, 1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_pending_records() {
        let (repo, calls) = recording_repo(|_| false);
        let shutdown = CancellationToken::new();
        let (queue, handle) =
            DeleteWorker::spawn(Arc::new(repo), DeleteWorkerConfig::default(), shutdown.clone());

        for i in 0..3 {
            queue.submit(record(i));
        }
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(batch_sizes(&calls), vec![3]);
        assert!(queue.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_producers_stops_worker() {
        let (repo, calls) = recording_repo(|_| false);
        let (queue, handle) = DeleteWorker::spawn(
            Arc::new(repo),
            DeleteWorkerConfig::default(),
            CancellationToken::new(),
        );

        queue.submit(record(1));
        drop(queue);
        handle.await.unwrap();

        assert_eq!(batch_sizes(&calls), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_after_stop_is_ignored() {
        let (repo, calls) = recording_repo(|_| false);
        let shutdown = CancellationToken::new();
        let (queue, handle) =
            DeleteWorker::spawn(Arc::new(repo), DeleteWorkerConfig::default(), shutdown.clone());

        shutdown.cancel();
        handle.await.unwrap();
        queue.submit(record(1));

        assert!(batch_sizes(&calls).is_empty());
    }

    /// Repository whose batch delete never finishes in time.
    struct StalledRepository {
        calls: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl UrlRepository for StalledRepository {
        async fn write(&self, record: UrlRecord) -> Result<UrlRecord, StorageError> {
            Ok(record)
        }
        async fn write_all(&self, _records: Vec<UrlRecord>) -> Result<(), StorageError> {
            Ok(())
        }
        async fn find_by_short(&self, _short: &str) -> Result<Option<UrlRecord>, StorageError> {
            Ok(None)
        }
        async fn find_by_original(
            &self,
            _original: &str,
        ) -> Result<Option<UrlRecord>, StorageError> {
            Ok(None)
        }
        async fn find_by_user(&self, _user_id: &str) -> Result<Vec<UrlRecord>, StorageError> {
            Ok(Vec::new())
        }
        async fn delete_batch(&self, _records: &[UrlRecord]) -> Result<(), StorageError> {
            *self.calls.lock().unwrap() += 1;
            time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
        async fn stats(&self) -> Result<StorageStats, StorageError> {
            Ok(StorageStats::default())
        }
        async fn ping(&self, _timeout: Duration) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_timeout_does_not_stall_worker() {
        let calls = Arc::new(Mutex::new(0));
        let repo = StalledRepository {
            calls: calls.clone(),
        };
        let (queue, _handle) = DeleteWorker::spawn(
            Arc::new(repo),
            DeleteWorkerConfig::default(),
            CancellationToken::new(),
        );

        queue.submit(record(1));
        // Timer at 10s, timeout at 13s.
        time::sleep(Duration::from_secs(14)).await;
        assert_eq!(*calls.lock().unwrap(), 1);

        queue.submit(record(2));
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(*calls.lock().unwrap(), 2);
    }
}
