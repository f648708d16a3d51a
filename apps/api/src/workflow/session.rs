//! One visitor's pass through the creation workflow.
//!
//! The step is derived from what the session holds, never stored:
//! no CV -> Upload, CV only -> Questionnaire, task running or failed ->
//! Generating, task completed -> Complete.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::config::PollSettings;
use crate::generation::poller::GenerationTask;
use crate::models::cv::CvHandle;
use crate::models::job::{GenerationJob, JobStatus};
use crate::models::preferences::PreferenceConfig;
use crate::tiers::{Capabilities, ResultView};
use crate::video_client::VideoService;
use crate::workflow::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Upload,
    Questionnaire,
    Generating,
    Complete,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Upload => "upload",
            Step::Questionnaire => "questionnaire",
            Step::Generating => "generating",
            Step::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions the client may offer from the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    UploadCv,
    RemoveCv,
    SubmitPreferences,
    Restart,
}

#[derive(Debug)]
pub struct WorkflowSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Last client request against this session. Drives idle eviction.
    last_seen: Instant,
    cv: Option<CvHandle>,
    preferences: Option<PreferenceConfig>,
    generation: Option<GenerationTask>,
}

/// Serializable snapshot of a session, with tier-gated render decisions.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub step: Step,
    pub cv: Option<CvHandle>,
    pub preferences: Option<PreferenceConfig>,
    pub job: Option<GenerationJob>,
    pub capabilities: Capabilities,
    pub result: Option<ResultView>,
    pub failure_message: Option<&'static str>,
    pub actions: Vec<Action>,
}

impl WorkflowSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            last_seen: Instant::now(),
            cv: None,
            preferences: None,
            generation: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    pub fn step(&self) -> Step {
        let job = self.generation.as_ref().map(GenerationTask::snapshot);
        self.step_for(job.as_ref())
    }

    fn step_for(&self, job: Option<&GenerationJob>) -> Step {
        match (job, &self.cv) {
            (Some(job), _) if matches!(job.status, JobStatus::Completed { .. }) => Step::Complete,
            (Some(_), _) => Step::Generating,
            (None, Some(_)) => Step::Questionnaire,
            (None, None) => Step::Upload,
        }
    }

    fn require_step(&self, action: &'static str, allowed: &[Step]) -> Result<(), WorkflowError> {
        let step = self.step();
        if allowed.contains(&step) {
            Ok(())
        } else {
            Err(WorkflowError::WrongStep { action, step })
        }
    }

    /// Stores a new CV, returning the one it supersedes.
    pub fn attach_cv(&mut self, cv: CvHandle) -> Result<Option<CvHandle>, WorkflowError> {
        self.require_step("upload a CV", &[Step::Upload, Step::Questionnaire])?;
        Ok(self.cv.replace(cv))
    }

    pub fn remove_cv(&mut self) -> Result<CvHandle, WorkflowError> {
        self.require_step("remove the CV", &[Step::Questionnaire])?;
        self.cv.take().ok_or(WorkflowError::WrongStep {
            action: "remove the CV",
            step: Step::Upload,
        })
    }

    pub fn cv(&self, cv_id: Uuid) -> Result<&CvHandle, WorkflowError> {
        self.cv
            .as_ref()
            .filter(|cv| cv.id == cv_id)
            .ok_or(WorkflowError::CvNotFound(cv_id))
    }

    /// Locks in the preferences and spawns the generation task. Only one task
    /// exists per session; a second submission is rejected.
    pub fn start_generation(
        &mut self,
        prefs: PreferenceConfig,
        service: Arc<dyn VideoService>,
        poll: PollSettings,
    ) -> Result<watch::Receiver<GenerationJob>, WorkflowError> {
        self.require_step("submit preferences", &[Step::Questionnaire])?;
        let cv = self.cv.clone().ok_or(WorkflowError::WrongStep {
            action: "submit preferences",
            step: Step::Upload,
        })?;

        let task = GenerationTask::spawn(service, poll, self.id, cv, prefs.clone());
        let updates = task.observe();
        self.preferences = Some(prefs);
        self.generation = Some(task);
        info!(session_id = %self.id, "Generation started");
        Ok(updates)
    }

    pub fn observe(&self) -> Result<watch::Receiver<GenerationJob>, WorkflowError> {
        self.generation
            .as_ref()
            .map(GenerationTask::observe)
            .ok_or(WorkflowError::WrongStep {
                action: "observe generation",
                step: self.step(),
            })
    }

    /// Full reset: stops any running task and drops the CV, preferences and job.
    pub fn restart(&mut self) {
        if let Some(task) = self.generation.take() {
            task.stop();
        }
        self.preferences = None;
        self.cv = None;
        info!(session_id = %self.id, "Workflow restarted");
    }

    /// Restart is always offered once a task exists: on a running job it
    /// cancels, on a failed or completed one it starts over.
    fn actions(step: Step) -> Vec<Action> {
        match step {
            Step::Upload => vec![Action::UploadCv],
            Step::Questionnaire => {
                vec![Action::UploadCv, Action::RemoveCv, Action::SubmitPreferences]
            }
            Step::Generating | Step::Complete => vec![Action::Restart],
        }
    }

    pub fn view(&self, capabilities: Capabilities) -> SessionView {
        let job = self.generation.as_ref().map(GenerationTask::snapshot);
        let step = self.step_for(job.as_ref());

        let result = job
            .as_ref()
            .and_then(|j| ResultView::for_job(j, &capabilities));
        let failure_message = job.as_ref().and_then(|j| match &j.status {
            JobStatus::Failed { reason } => Some(reason.user_message()),
            _ => None,
        });

        SessionView {
            session_id: self.id,
            step,
            cv: self.cv.clone(),
            preferences: self.preferences.clone(),
            actions: Self::actions(step),
            job,
            capabilities,
            result,
            failure_message,
        }
    }
}

impl Default for WorkflowSession {
    fn default() -> Self {
        Self::new()
    }
}
