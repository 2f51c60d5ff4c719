//! Batch Module - Train-All Job Coordinator
//!
//! Trains one model family for every crop type on a background thread.
//!
//! # State machine
//! `Idle -> Running -> {Completed | Cancelled | Failed}`; a new job may start
//! from any state except `Running`.
//!
//! # Cancellation
//! Cooperative. The token is checked before each crop type, so a crop that is
//! mid-training finishes and is saved. Artifacts already written are kept.

pub mod events;

#[cfg(test)]
mod tests;

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

pub use events::{BatchEvent, ItemOutcome};
use crate::logic::dataset::Dataset;
use crate::logic::error::{CoreError, CoreResult};
use crate::logic::model::ModelFamily;
use crate::logic::registry::ModelRegistry;
use crate::logic::trainer::Trainer;

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Cancelled | JobState::Failed)
    }
}

/// Shared cancel flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of the most recent finished job
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub family: ModelFamily,
    pub state: JobState,
    pub total: usize,
    pub trained: usize,
    pub skipped: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub error: Option<String>,
}

/// Called on the worker thread for every event
pub type BatchObserver = Box<dyn Fn(&BatchEvent) + Send + 'static>;

struct CoordinatorState {
    state: JobState,
    token: Option<CancellationToken>,
    last_report: Option<JobReport>,
}

// ============================================================================
// COORDINATOR
// ============================================================================

pub struct BatchCoordinator {
    registry: Arc<ModelRegistry>,
    trainer: Trainer,
    inner: Arc<RwLock<CoordinatorState>>,
}

impl BatchCoordinator {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            trainer: Trainer::new(),
            inner: Arc::new(RwLock::new(CoordinatorState {
                state: JobState::Idle,
                token: None,
                last_report: None,
            })),
        }
    }

    pub fn state(&self) -> JobState {
        self.inner.read().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == JobState::Running
    }

    /// Request cancellation of the active job. False if none is running.
    pub fn cancel(&self) -> bool {
        let inner = self.inner.read();
        match (&inner.state, &inner.token) {
            (JobState::Running, Some(token)) => {
                token.cancel();
                log::info!("Cancellation requested for running training job");
                true
            }
            _ => false,
        }
    }

    pub fn last_report(&self) -> Option<JobReport> {
        self.inner.read().last_report.clone()
    }

    /// Start a train-all job. Returns immediately.
    pub fn start(&self, family: ModelFamily, dataset: Arc<Dataset>) -> CoreResult<BatchHandle> {
        self.launch(family, dataset, None)
    }

    /// Like `start`, also invoking `observer` on the worker thread per event
    pub fn start_observed<F>(
        &self,
        family: ModelFamily,
        dataset: Arc<Dataset>,
        observer: F,
    ) -> CoreResult<BatchHandle>
    where
        F: Fn(&BatchEvent) + Send + 'static,
    {
        self.launch(family, dataset, Some(Box::new(observer)))
    }

    fn launch(
        &self,
        family: ModelFamily,
        dataset: Arc<Dataset>,
        observer: Option<BatchObserver>,
    ) -> CoreResult<BatchHandle> {
        let token = CancellationToken::new();
        {
            let mut inner = self.inner.write();
            if inner.state == JobState::Running {
                return Err(CoreError::AlreadyRunning);
            }
            inner.state = JobState::Running;
            inner.token = Some(token.clone());
        }

        let job_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let job = Job {
            job_id,
            family,
            dataset,
            registry: Arc::clone(&self.registry),
            trainer: self.trainer,
            token: token.clone(),
            inner: Arc::clone(&self.inner),
            events: tx,
            observer,
            observer_panicked: Cell::new(false),
            started_at: Utc::now(),
            position: Cell::new(0),
            trained: Cell::new(0),
            skipped: Cell::new(0),
        };

        let worker = thread::Builder::new()
            .name(format!("train-all-{}", family.as_str()))
            .spawn(move || job.run());

        let worker = match worker {
            Ok(handle) => handle,
            Err(e) => {
                let mut inner = self.inner.write();
                inner.state = JobState::Idle;
                inner.token = None;
                return Err(CoreError::Training(format!("Failed to spawn training worker: {}", e)));
            }
        };

        log::info!("Training job {} started for {}", job_id, family);

        Ok(BatchHandle {
            job_id,
            token,
            events: rx,
            worker: Some(worker),
        })
    }
}

// ============================================================================
// HANDLE
// ============================================================================

/// Caller's view of a running job
pub struct BatchHandle {
    pub job_id: Uuid,
    token: CancellationToken,
    events: mpsc::UnboundedReceiver<BatchEvent>,
    worker: Option<JoinHandle<JobState>>,
}

impl BatchHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Next event, blocking. None once the job has finished and all events
    /// are drained. Must not be called from inside an async runtime.
    pub fn next_event(&mut self) -> Option<BatchEvent> {
        self.events.blocking_recv()
    }

    /// Next event without blocking
    pub fn try_next_event(&mut self) -> Option<BatchEvent> {
        self.events.try_recv().ok()
    }

    pub async fn recv_event(&mut self) -> Option<BatchEvent> {
        self.events.recv().await
    }

    /// Block until the worker exits and return its terminal state
    pub fn wait(mut self) -> JobState {
        match self.worker.take().map(|w| w.join()) {
            Some(Ok(state)) => state,
            Some(Err(_)) => {
                log::error!("Training worker for job {} panicked", self.job_id);
                JobState::Failed
            }
            None => JobState::Failed,
        }
    }
}

// ============================================================================
// WORKER
// ============================================================================

struct Job {
    job_id: Uuid,
    family: ModelFamily,
    dataset: Arc<Dataset>,
    registry: Arc<ModelRegistry>,
    trainer: Trainer,
    token: CancellationToken,
    inner: Arc<RwLock<CoordinatorState>>,
    events: mpsc::UnboundedSender<BatchEvent>,
    observer: Option<BatchObserver>,
    observer_panicked: Cell<bool>,
    started_at: DateTime<Utc>,
    /// Index of the crop being processed
    position: Cell<usize>,
    trained: Cell<usize>,
    skipped: Cell<usize>,
}

impl Job {
    /// Runs the job. A panic on the worker still ends in `Failed`.
    fn run(self) -> JobState {
        match panic::catch_unwind(AssertUnwindSafe(|| self.process())) {
            Ok(state) => state,
            Err(payload) => {
                let message = format!("Training worker panicked: {}", panic_message(payload.as_ref()));
                let crop_type = self
                    .dataset
                    .crop_types()
                    .get(self.position.get())
                    .cloned()
                    .unwrap_or_default();
                log::error!("Training job {} failed on '{}': {}", self.job_id, crop_type, message);
                self.finish(JobState::Failed, Some(message.clone()), BatchEvent::Failed { crop_type, message })
            }
        }
    }

    fn process(&self) -> JobState {
        let crops = self.dataset.crop_types();
        let total = crops.len();

        for (index, crop) in crops.iter().enumerate() {
            self.position.set(index);

            if self.token.is_cancelled() {
                log::warn!("Training job {} cancelled after {}/{} crop types", self.job_id, index, total);
                return self.finish(JobState::Cancelled, None, BatchEvent::Cancelled { processed: index });
            }

            let outcome = if self.registry.exists(self.family, crop) {
                log::debug!("Skipping {} / '{}': artifact present", self.family, crop);
                self.skipped.set(self.skipped.get() + 1);
                ItemOutcome::Skipped
            } else {
                match self.train_one(crop) {
                    Ok(()) => {
                        self.trained.set(self.trained.get() + 1);
                        ItemOutcome::Trained
                    }
                    Err(e) => {
                        log::error!("Training job {} failed on '{}': {}", self.job_id, crop, e);
                        let message = e.to_string();
                        return self.finish(
                            JobState::Failed,
                            Some(message.clone()),
                            BatchEvent::Failed { crop_type: crop.clone(), message },
                        );
                    }
                }
            };

            self.emit(BatchEvent::progress(index, total, crop, outcome));

            if self.observer_panicked.get() {
                let message = "Batch observer panicked".to_string();
                return self.finish(
                    JobState::Failed,
                    Some(message.clone()),
                    BatchEvent::Failed { crop_type: crop.clone(), message },
                );
            }
        }

        log::info!(
            "Training job {} completed: {} trained, {} skipped",
            self.job_id,
            self.trained.get(),
            self.skipped.get()
        );
        self.finish(
            JobState::Completed,
            None,
            BatchEvent::Completed { trained: self.trained.get(), skipped: self.skipped.get() },
        )
    }

    fn train_one(&self, crop: &str) -> CoreResult<()> {
        let slice = self.dataset.slice(crop);
        let model = self.trainer.train(self.family, &slice)?;
        self.registry.save(self.family, crop, &model, slice.len())
    }

    /// Record the terminal state, then emit the terminal event
    fn finish(&self, state: JobState, error: Option<String>, event: BatchEvent) -> JobState {
        {
            let mut inner = self.inner.write();
            inner.state = state;
            inner.token = None;
            inner.last_report = Some(JobReport {
                job_id: self.job_id,
                family: self.family,
                state,
                total: self.dataset.crop_types().len(),
                trained: self.trained.get(),
                skipped: self.skipped.get(),
                started_at: self.started_at,
                finished_at: Utc::now(),
                error,
            });
        }
        self.emit(event);
        state
    }

    /// Observer first, then the channel. A panicking observer is not called again.
    fn emit(&self, event: BatchEvent) {
        if let Some(observer) = &self.observer {
            if !self.observer_panicked.get()
                && panic::catch_unwind(AssertUnwindSafe(|| observer(&event))).is_err()
            {
                log::error!("Observer for training job {} panicked", self.job_id);
                self.observer_panicked.set(true);
            }
        }
        // Receiver may be gone if the caller dropped the handle
        let _ = self.events.send(event);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
