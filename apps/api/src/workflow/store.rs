use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::PollSettings;
use crate::generation::poller::wait_terminal;
use crate::models::cv::CvHandle;
use crate::models::job::{GenerationJob, JobStatus};
use crate::models::preferences::PreferenceConfig;
use crate::tiers::Capabilities;
use crate::video_client::VideoService;
use crate::workflow::session::{SessionView, WorkflowSession};
use crate::workflow::WorkflowError;

/// Records kept for the recent-videos listing. Counters are not bounded by it.
const MAX_HISTORY: usize = 50;

/// Upper bound on how often the idle sweeper runs.
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// A finished video, as listed on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRecord {
    pub job_id: String,
    pub title: String,
    pub video_url: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Completion counts plus the newest records.
#[derive(Debug, Clone)]
pub struct VideoStats {
    pub total: usize,
    pub this_month: usize,
    /// Newest first.
    pub recent: Vec<VideoRecord>,
}

#[derive(Debug, Default)]
struct History {
    recent: VecDeque<VideoRecord>,
    total: usize,
    /// Completions per (year, month).
    per_month: HashMap<(i32, u32), usize>,
}

impl History {
    fn record(&mut self, video: VideoRecord) {
        self.total += 1;
        *self.per_month.entry(month_key(video.completed_at)).or_default() += 1;
        self.recent.push_back(video);
        if self.recent.len() > MAX_HISTORY {
            self.recent.pop_front();
        }
    }
}

fn month_key(at: DateTime<Utc>) -> (i32, u32) {
    (at.year(), at.month())
}

/// In-memory registry of workflow sessions and completed videos.
/// Locks are only held for synchronous bookkeeping, never across network calls.
/// Every access marks the session as seen; see `spawn_idle_sweeper`.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, WorkflowSession>>>,
    history: Arc<RwLock<History>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, capabilities: Capabilities) -> SessionView {
        let session = WorkflowSession::new();
        let view = session.view(capabilities);
        self.sessions.write().await.insert(session.id, session);
        info!(session_id = %view.session_id, "Session created");
        view
    }

    pub async fn view(&self, id: Uuid, capabilities: Capabilities) -> Result<SessionView, WorkflowError> {
        let mut sessions = self.sessions.write().await;
        let session = seen(&mut sessions, id)?;
        Ok(session.view(capabilities))
    }

    pub async fn contains(&self, id: Uuid) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    /// Drops the session; its generation task stops with it.
    pub async fn remove(&self, id: Uuid) -> Result<(), WorkflowError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| info!(session_id = %id, "Session closed"))
            .ok_or(WorkflowError::SessionNotFound(id))
    }

    pub async fn attach_cv(
        &self,
        id: Uuid,
        cv: CvHandle,
        capabilities: Capabilities,
    ) -> Result<SessionView, WorkflowError> {
        let mut sessions = self.sessions.write().await;
        let session = seen(&mut sessions, id)?;
        let (file_name, size_bytes) = (cv.file_name.clone(), cv.size_bytes);
        if let Some(old) = session.attach_cv(cv)? {
            info!(session_id = %id, released = %old.id, "Superseded CV released");
        }
        info!(session_id = %id, %file_name, size_bytes, "CV accepted");
        Ok(session.view(capabilities))
    }

    pub async fn remove_cv(&self, id: Uuid, capabilities: Capabilities) -> Result<SessionView, WorkflowError> {
        let mut sessions = self.sessions.write().await;
        let session = seen(&mut sessions, id)?;
        let cv = session.remove_cv()?;
        info!(session_id = %id, released = %cv.id, "CV removed");
        Ok(session.view(capabilities))
    }

    pub async fn cv(&self, id: Uuid, cv_id: Uuid) -> Result<CvHandle, WorkflowError> {
        let mut sessions = self.sessions.write().await;
        let session = seen(&mut sessions, id)?;
        session.cv(cv_id).cloned()
    }

    /// Starts generation for the session and records the video in the
    /// dashboard history if it completes.
    pub async fn start_generation(
        &self,
        id: Uuid,
        prefs: PreferenceConfig,
        service: Arc<dyn VideoService>,
        poll: PollSettings,
        capabilities: Capabilities,
    ) -> Result<SessionView, WorkflowError> {
        let title = prefs.job_goal.clone();
        let mut sessions = self.sessions.write().await;
        let session = seen(&mut sessions, id)?;
        let updates = session.start_generation(prefs, service, poll)?;
        let view = session.view(capabilities);
        drop(sessions);

        tokio::spawn(record_on_completion(updates, self.history.clone(), title));
        Ok(view)
    }

    pub async fn observe(&self, id: Uuid) -> Result<watch::Receiver<GenerationJob>, WorkflowError> {
        let mut sessions = self.sessions.write().await;
        let session = seen(&mut sessions, id)?;
        session.observe()
    }

    pub async fn restart(&self, id: Uuid, capabilities: Capabilities) -> Result<SessionView, WorkflowError> {
        let mut sessions = self.sessions.write().await;
        let session = seen(&mut sessions, id)?;
        session.restart();
        Ok(session.view(capabilities))
    }

    /// Lifetime completion counts and the `limit` newest records.
    pub async fn video_stats(&self, now: DateTime<Utc>, limit: usize) -> VideoStats {
        let history = self.history.read().await;
        VideoStats {
            total: history.total,
            this_month: history.per_month.get(&month_key(now)).copied().unwrap_or(0),
            recent: history.recent.iter().rev().take(limit).cloned().collect(),
        }
    }

    /// Drops every session with no request for longer than `max_idle`,
    /// stopping any generation it still runs. Returns how many went.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = session.idle_for(now) <= max_idle;
            if !keep {
                info!(session_id = %id, "Idle session evicted");
            }
            keep
        });
        before - sessions.len()
    }

    /// Runs `evict_idle` periodically for the life of the process.
    pub fn spawn_idle_sweeper(&self, max_idle: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let period = max_idle.clamp(Duration::from_secs(1), MAX_SWEEP_PERIOD);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(max_idle).await;
                if evicted > 0 {
                    debug!(evicted, "Idle sweep finished");
                }
            }
        })
    }
}

/// Looks up a session and marks it as seen.
fn seen(
    sessions: &mut HashMap<Uuid, WorkflowSession>,
    id: Uuid,
) -> Result<&mut WorkflowSession, WorkflowError> {
    let session = sessions.get_mut(&id).ok_or(WorkflowError::SessionNotFound(id))?;
    session.touch();
    Ok(session)
}

async fn record_on_completion(
    updates: watch::Receiver<GenerationJob>,
    history: Arc<RwLock<History>>,
    title: String,
) {
    let job = wait_terminal(updates).await;
    let (JobStatus::Completed { result_url, .. }, Some(job_id)) = (job.status, job.job_id) else {
        return;
    };

    history.write().await.record(VideoRecord {
        job_id,
        title,
        video_url: result_url,
        created_at: job.created_at,
        completed_at: Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::accept_upload;
    use crate::models::preferences::PreferenceDraft;
    use crate::models::tier::SubscriptionTier;
    use crate::tiers::capabilities;
    use crate::video_client::testing::ScriptedVideoService;
    use crate::workflow::session::Step;
    use bytes::Bytes;
    use std::time::Duration;

    fn caps() -> Capabilities {
        capabilities(SubscriptionTier::Pro)
    }

    fn poll() -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(2),
            max_attempts: 10,
            max_consecutive_errors: 0,
        }
    }

    fn prefs(goal: &str) -> PreferenceConfig {
        PreferenceDraft {
            video_type: Default::default(),
            duration: 20,
            job_goal: goal.to_string(),
            style: Default::default(),
            tone: Default::default(),
            highlights: vec![],
        }
        .validate(&caps())
        .unwrap()
    }

    async fn session_with_cv(store: &SessionStore) -> Uuid {
        let id = store.create(caps()).await.session_id;
        let cv = accept_upload(id, "cv.txt", Some("text/plain"), Bytes::from_static(b"cv")).unwrap();
        store.attach_cv(id, cv, caps()).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let store = SessionStore::new();
        let missing = Uuid::new_v4();
        assert!(matches!(
            store.view(missing, caps()).await,
            Err(WorkflowError::SessionNotFound(_))
        ));
        assert!(store.remove(missing).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_job_lands_in_history() {
        let store = SessionStore::new();
        let id = session_with_cv(&store).await;
        let service = Arc::new(ScriptedVideoService::new("job_7").then_completed("https://cdn/7.mp4"));

        store
            .start_generation(id, prefs("Data Scientist"), service, poll(), caps())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(store.view(id, caps()).await.unwrap().step, Step::Complete);
        let stats = store.video_stats(Utc::now(), 10).await;
        assert_eq!(stats.total, 1);
        let recent = stats.recent;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].job_id, "job_7");
        assert_eq!(recent[0].title, "Data Scientist");
        assert_eq!(recent[0].video_url, "https://cdn/7.mp4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_or_abandoned_jobs_not_recorded() {
        let store = SessionStore::new();

        let failed = session_with_cv(&store).await;
        let service = Arc::new(ScriptedVideoService::new("job_f").then_failed());
        store
            .start_generation(failed, prefs("A"), service, poll(), caps())
            .await
            .unwrap();

        let abandoned = session_with_cv(&store).await;
        let service = Arc::new(ScriptedVideoService::new("job_a"));
        store
            .start_generation(abandoned, prefs("B"), service, poll(), caps())
            .await
            .unwrap();
        store.remove(abandoned).await.unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.video_stats(Utc::now(), 10).await.total, 0);
    }

    #[tokio::test]
    async fn test_cv_lookup_follows_current_handle() {
        let store = SessionStore::new();
        let id = session_with_cv(&store).await;
        let cv_id = store.view(id, caps()).await.unwrap().cv.unwrap().id;
        assert!(store.cv(id, cv_id).await.is_ok());

        store.remove_cv(id, caps()).await.unwrap();
        assert!(matches!(
            store.cv(id, cv_id).await,
            Err(WorkflowError::CvNotFound(_))
        ));
    }

    fn completed(job_id: &str) -> watch::Receiver<GenerationJob> {
        let mut job = GenerationJob::new();
        job.start_processing(job_id.to_string()).unwrap();
        job.complete(format!("https://cdn/{job_id}.mp4"), "data:qr".to_string())
            .unwrap();
        watch::channel(job).1
    }

    #[tokio::test]
    async fn test_counts_survive_history_truncation() {
        let store = SessionStore::new();
        for n in 0..60 {
            let job_id = format!("job_{n}");
            record_on_completion(completed(&job_id), store.history.clone(), job_id).await;
        }

        let stats = store.video_stats(Utc::now(), usize::MAX).await;
        assert_eq!(stats.total, 60);
        assert_eq!(stats.this_month, 60);
        assert_eq!(stats.recent.len(), MAX_HISTORY);
        assert_eq!(stats.recent[0].job_id, "job_59");

        let dashboard = crate::dashboard::summarize(stats, SubscriptionTier::Pro);
        assert_eq!(dashboard.stats[0].value, "60");
        assert_eq!(dashboard.stats[0].caption, "+60 this month");
    }

    #[tokio::test]
    async fn test_this_month_ignores_other_months() {
        let store = SessionStore::new();
        record_on_completion(completed("job_1"), store.history.clone(), "A".to_string()).await;

        let next_year = Utc::now() + chrono::Duration::days(366);
        let stats = store.video_stats(next_year, 10).await;
        assert_eq!(stats.total, 1);
        assert_eq!(stats.this_month, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_evicted_and_its_poller_stopped() {
        let store = SessionStore::new();
        let idle = session_with_cv(&store).await;
        let active = session_with_cv(&store).await;

        let service = Arc::new(ScriptedVideoService::new("job_idle"));
        let long_poll = PollSettings {
            max_attempts: 1000,
            ..poll()
        };
        store
            .start_generation(idle, prefs("A"), service.clone(), long_poll, caps())
            .await
            .unwrap();

        let sweeper = store.spawn_idle_sweeper(Duration::from_secs(60));
        for _ in 0..8 {
            tokio::time::sleep(Duration::from_secs(20)).await;
            store.view(active, caps()).await.unwrap();
        }

        assert!(!store.contains(idle).await);
        assert!(store.contains(active).await);

        let calls = service.status_calls();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(service.status_calls(), calls);
        sweeper.abort();
    }
}
