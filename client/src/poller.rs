//! Completion polling for asynchronous generation jobs.
//!
//! The backend acknowledges a submission with a job id in `processing` state
//! and finishes the work later. [`CompletionPoller`] queries the job on a
//! fixed interval until it reaches a terminal state, then reports once.
//!
//! Timing goes through tokio's clock, so tests drive it deterministically
//! with a paused runtime (`start_paused = true` plus `tokio::time::advance`).

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    backend::Backend,
    error::Error,
    resolver::ImageUrlResolver,
    types::{DeviceId, JobStatus, GENERIC_FAILURE},
};

/// Default interval between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Default ceiling on total polling time.
pub const DEFAULT_MAX_POLL_DURATION: Duration = Duration::from_secs(10 * 60);

/// Polling cadence and horizon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Time between status queries. The first query happens one interval after start.
    pub interval: Duration,
    /// Give up after this long; `None` polls until a terminal state or cancellation.
    pub max_duration: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_duration: Some(DEFAULT_MAX_POLL_DURATION),
        }
    }
}

/// Handle to a running poll.
///
/// Cancelling is idempotent and harmless after the poll has finished.
#[derive(Debug)]
pub struct PollHandle {
    job_id: String,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Stops polling. No callback fires after this returns.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!("cancelling poll for {}", self.job_id);
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns true once the polling task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Polls job status until completion, failure, timeout or cancellation.
pub struct CompletionPoller<B: Backend + ?Sized> {
    backend: Arc<B>,
    resolver: Arc<ImageUrlResolver>,
    config: PollConfig,
}

impl<B: Backend + ?Sized> Clone for CompletionPoller<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            resolver: self.resolver.clone(),
            config: self.config.clone(),
        }
    }
}

impl<B: Backend + ?Sized + 'static> CompletionPoller<B> {
    /// Creates a poller. A zero interval falls back to [`DEFAULT_POLL_INTERVAL`].
    pub fn new(backend: Arc<B>, resolver: Arc<ImageUrlResolver>, mut config: PollConfig) -> Self {
        if config.interval.is_zero() {
            warn!("zero poll interval, using {:?}", DEFAULT_POLL_INTERVAL);
            config.interval = DEFAULT_POLL_INTERVAL;
        }
        Self {
            backend,
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Starts polling `job_id` on the current tokio runtime.
    ///
    /// Exactly one of the callbacks fires, at most once, unless the handle is
    /// cancelled first. `on_completed` receives the resolved output URL.
    /// `device_id` is sent along for anonymous jobs.
    pub fn start_polling<C, F>(
        &self,
        job_id: impl Into<String>,
        device_id: Option<DeviceId>,
        on_completed: C,
        on_failed: F,
    ) -> PollHandle
    where
        C: FnOnce(String) + Send + 'static,
        F: FnOnce(String) + Send + 'static,
    {
        let job_id = job_id.into();
        let token = CancellationToken::new();
        let poller = self.clone();
        let started = Instant::now();

        let task = tokio::spawn({
            let job_id = job_id.clone();
            let token = token.clone();
            async move {
                let outcome = poller
                    .poll(&job_id, device_id.as_ref(), &token, started)
                    .await;
                if token.is_cancelled() {
                    return;
                }
                match outcome {
                    Some(Ok(url)) => on_completed(url),
                    Some(Err(message)) => on_failed(message),
                    None => {}
                }
            }
        });

        PollHandle { job_id, token, task }
    }

    /// Runs the poll loop. `None` means cancelled.
    async fn poll(
        &self,
        job_id: &str,
        device_id: Option<&DeviceId>,
        token: &CancellationToken,
        started: Instant,
    ) -> Option<Result<String, String>> {
        let mut ticker = time::interval_at(started + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempt: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return None,
                _ = ticker.tick() => {}
            }

            if let Some(max) = self.config.max_duration {
                if started.elapsed() >= max {
                    warn!("giving up on job {} after {:?}", job_id, max);
                    return Some(Err(Error::PollTimeout(max).user_message()));
                }
            }

            attempt += 1;
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => return None,
                r = self.backend.generation_status(job_id, device_id) => r,
            };

            let job = match result {
                Ok(job) => job,
                Err(e) => {
                    debug!("status query {} for job {} failed, retrying: {}", attempt, job_id, e);
                    continue;
                }
            };

            match job.status {
                JobStatus::Processing => {
                    debug!("job {} still processing (query {})", job_id, attempt);
                }
                JobStatus::Completed => {
                    info!("job {} completed after {} queries", job_id, attempt);
                    return Some(
                        self.resolver
                            .resolve(job.output_image_url.as_deref())
                            .ok_or_else(|| "Generation completed without an output image".to_string()),
                    );
                }
                JobStatus::Failed => {
                    let message = job
                        .error_message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| GENERIC_FAILURE.to_string());
                    info!("job {} failed: {}", job_id, message);
                    return Some(Err(message));
                }
            }
        }
    }
}
