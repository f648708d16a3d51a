//! Status poller: one cancellable task per generation job.
//!
//! The task owns its `GenerationJob`, runs the submission, then polls the
//! provider at a fixed interval until the job is terminal, the attempt ceiling
//! is hit, or the task is stopped. Every state change is published on a
//! `watch` channel; the task is its only writer.
//!
//! Progress is folded with `Progress::advance`, so out-of-order reports never
//! move it backwards. Transient poll errors are retried with exponential
//! backoff up to `max_consecutive_errors`; anything else fails the job at once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::PollSettings;
use crate::generation::orchestrator::submit;
use crate::generation::qr::encode_data_url;
use crate::models::cv::CvHandle;
use crate::models::job::{FailureReason, GenerationJob, JobError};
use crate::models::preferences::PreferenceConfig;
use crate::video_client::{ReportedStatus, StatusReport, VideoService};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Handle to a running generation. Stopping is idempotent, and dropping the
/// handle stops the task.
#[derive(Debug)]
pub struct GenerationTask {
    cancel: CancellationToken,
    updates: watch::Receiver<GenerationJob>,
}

impl GenerationTask {
    pub fn spawn(
        service: Arc<dyn VideoService>,
        poll: PollSettings,
        session_id: Uuid,
        cv: CvHandle,
        prefs: PreferenceConfig,
    ) -> Self {
        let (tx, updates) = watch::channel(GenerationJob::new());
        let cancel = CancellationToken::new();

        let runner = Runner {
            service,
            poll,
            tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(
            runner
                .run(cv, prefs)
                .instrument(info_span!("generation", %session_id)),
        );

        Self { cancel, updates }
    }

    /// Stream of job states, starting with the current one.
    pub fn observe(&self) -> watch::Receiver<GenerationJob> {
        self.updates.clone()
    }

    pub fn snapshot(&self) -> GenerationJob {
        self.updates.borrow().clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for GenerationTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Waits until the job is terminal or its task has gone away, returning the
/// last published state.
pub async fn wait_terminal(mut rx: watch::Receiver<GenerationJob>) -> GenerationJob {
    loop {
        if rx.borrow_and_update().is_terminal() {
            return rx.borrow().clone();
        }
        if rx.changed().await.is_err() {
            return rx.borrow().clone();
        }
    }
}

fn backoff(interval: Duration, consecutive_errors: u32) -> Duration {
    interval
        .saturating_mul(1u32 << consecutive_errors.min(16))
        .min(MAX_BACKOFF)
}

struct Runner {
    service: Arc<dyn VideoService>,
    poll: PollSettings,
    tx: watch::Sender<GenerationJob>,
    cancel: CancellationToken,
}

impl Runner {
    async fn run(self, cv: CvHandle, prefs: PreferenceConfig) {
        let mut job = self.tx.borrow().clone();

        let submitted = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Generation cancelled before submission completed");
                return;
            }
            result = submit(self.service.as_ref(), &cv, &prefs) => result,
        };

        let job_id = match submitted {
            Ok(job_id) => job_id,
            Err(e) => {
                warn!("Generation submission failed: {e}");
                self.transition(&mut job, |j| {
                    j.fail(FailureReason::Submission(e.public_detail()))
                });
                return;
            }
        };
        self.transition(&mut job, |j| j.start_processing(job_id.clone()));

        self.poll_until_terminal(&mut job, &job_id).await;
    }

    async fn poll_until_terminal(&self, job: &mut GenerationJob, job_id: &str) {
        let mut attempts: u32 = 0;
        let mut consecutive_errors: u32 = 0;
        let mut delay = self.poll.interval;

        loop {
            if attempts >= self.poll.max_attempts {
                warn!(%job_id, attempts, "Giving up on generation job");
                self.transition(job, |j| j.fail(FailureReason::TimedOut { attempts }));
                return;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(%job_id, "Polling cancelled");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempts += 1;
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(%job_id, "Polling cancelled mid-request");
                    return;
                }
                result = self.service.status(job_id) => result,
            };

            match result {
                Ok(report) => {
                    consecutive_errors = 0;
                    delay = self.poll.interval;
                    if self.apply_report(job, job_id, report) {
                        return;
                    }
                }
                Err(e) if e.is_transient() && consecutive_errors < self.poll.max_consecutive_errors => {
                    consecutive_errors += 1;
                    delay = backoff(self.poll.interval, consecutive_errors);
                    warn!(
                        %job_id,
                        attempt = attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        "Transient status error, retrying: {e}"
                    );
                }
                Err(e) => {
                    warn!(%job_id, attempt = attempts, "Status query failed: {e}");
                    self.transition(job, |j| {
                        j.fail(FailureReason::Poll(e.public_detail()))
                    });
                    return;
                }
            }
        }
    }

    /// Applies one status report. Returns true once the job is terminal.
    fn apply_report(&self, job: &mut GenerationJob, job_id: &str, report: StatusReport) -> bool {
        match report.status {
            ReportedStatus::Processing => {
                self.transition(job, |j| match report.progress {
                    Some(p) => j.record_progress(p),
                    None => Ok(()),
                });
                debug!(%job_id, progress = job.progress.value(), "Generation in progress");
                false
            }
            ReportedStatus::Completed => {
                match report.video_url {
                    Some(url) => match encode_data_url(&url) {
                        Ok(qr_code_url) => {
                            info!(%job_id, video_url = %url, "Generation completed");
                            self.transition(job, |j| j.complete(url, qr_code_url));
                        }
                        Err(e) => {
                            warn!(%job_id, "QR encoding failed: {e}");
                            self.transition(job, |j| {
                                j.fail(FailureReason::QrEncoding(e.to_string()))
                            });
                        }
                    },
                    None => {
                        warn!(%job_id, "Service reported completion without a video URL");
                        self.transition(job, |j| j.fail(FailureReason::MissingResultUrl));
                    }
                }
                true
            }
            ReportedStatus::Failed => {
                info!(%job_id, "Service reported generation failure");
                self.transition(job, |j| j.fail(FailureReason::ServiceReported));
                true
            }
        }
    }

    /// Applies a mutation and publishes the result.
    fn transition<F>(&self, job: &mut GenerationJob, f: F)
    where
        F: FnOnce(&mut GenerationJob) -> Result<(), JobError>,
    {
        if let Err(e) = f(job) {
            error!("Rejected job transition: {e}");
            return;
        }
        self.tx.send_replace(job.clone());
    }
}
