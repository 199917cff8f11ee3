mod types;

pub use types::*;

use crate::tracker::ResultCache;
use music_channel_common::TrackerId;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use uuid::Uuid;

/// Unbounded FIFO of jobs with many producers and one consumer.
///
/// `push` never blocks. The consumer drains with `pop` and parks in
/// `wait` when the queue is empty.
#[derive(Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
    notify: Notify,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, job: Job) {
        self.jobs.lock().push_back(job);
        self.notify.notify_one();
    }

    pub fn pop(&self) -> Option<Job> {
        self.jobs.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Park until a job is pushed or `idle_delay` passes, whichever is first.
    ///
    /// A push that happened while nobody was waiting is not lost: the stored
    /// permit wakes the next call immediately.
    pub async fn wait(&self, idle_delay: Duration) {
        tokio::select! {
            _ = self.notify.notified() => {}
            _ = tokio::time::sleep(idle_delay) => {}
        }
    }
}

/// Process-wide service state: the job queue, the result cache, and job
/// lifecycle events. Constructed once and shared by the intake, the worker
/// and the dispatcher.
pub struct AppState {
    queue: JobQueue,
    results: Arc<ResultCache<JobResult>>,
    stats: RwLock<JobStats>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl AppState {
    pub fn new(default_ttl: Duration) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(256);

        Arc::new(Self {
            queue: JobQueue::new(),
            results: Arc::new(ResultCache::new(default_ttl)),
            stats: RwLock::new(JobStats::default()),
            event_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    fn broadcast(&self, event: JobEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("No subscribers for job event");
        }
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Shared handle to the result cache, for the sweeper.
    pub fn results(&self) -> Arc<ResultCache<JobResult>> {
        Arc::clone(&self.results)
    }

    /// Append an accepted job to the queue
    pub fn queue_job(&self, job: Job) -> Uuid {
        let id = job.id;
        self.queue.push(job);
        tracing::info!(job_id = %id, depth = self.queue.len(), "Job queued");
        self.broadcast(JobEvent::Queued { job_id: id });
        id
    }

    /// Get the next job from the queue
    pub fn dequeue_job(&self) -> Option<Job> {
        self.queue.pop()
    }

    /// Record that a job's transform has begun under `tracker_id`
    pub fn start_job(&self, job_id: Uuid, tracker_id: &TrackerId) {
        tracing::info!(job_id = %job_id, tracker_id = %tracker_id, "Job started");
        self.broadcast(JobEvent::Started {
            job_id,
            tracker_id: tracker_id.clone(),
        });
    }

    /// Publish a successful result under `tracker_id` with the default TTL
    pub fn complete_job(&self, tracker_id: TrackerId, result: JobResult) {
        let job_id = result.job_id;
        self.results.insert(tracker_id.clone(), result);
        self.stats.write().record_success();

        tracing::info!(job_id = %job_id, tracker_id = %tracker_id, "Job completed");
        self.broadcast(JobEvent::Completed { job_id, tracker_id });
    }

    /// Record an abandoned job
    pub fn fail_job(&self, job_id: Uuid, error: &str) {
        self.stats.write().record_failure();

        tracing::error!(job_id = %job_id, "Job failed: {}", error);
        self.broadcast(JobEvent::Failed {
            job_id,
            error: error.to_string(),
        });
    }

    /// Look up a live result
    pub fn lookup_result(&self, tracker_id: &TrackerId) -> Option<JobResult> {
        self.results.get(tracker_id)
    }

    pub fn get_stats(&self) -> JobStats {
        self.stats.read().clone()
    }
}
