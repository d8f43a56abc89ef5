use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use transit_billing::BillingService;
use transit_db::{ChannelRepository, DbError, Task, TaskRepository, TaskStatus};
use transit_store::AdmissionStore;
use transit_upstream::{UpstreamAdapter, UpstreamError, UpstreamStatus};
use uuid::Uuid;

/// Why one task could not be reconciled this tick
///
/// All variants leave the task `running`; the next sweep retries it.
#[derive(Debug, thiserror::Error)]
enum ReconcileError {
    #[error("channel {0} no longer exists")]
    ChannelGone(Uuid),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Periodic reconciliation loop for async tasks
pub struct TaskPoller {
    tasks: Arc<dyn TaskRepository>,
    channels: Arc<dyn ChannelRepository>,
    admission: AdmissionStore,
    billing: BillingService,
    interval: Duration,
    batch_size: i64,
}

impl TaskPoller {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        channels: Arc<dyn ChannelRepository>,
        admission: AdmissionStore,
        billing: BillingService,
        interval: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            tasks,
            channels,
            admission,
            billing,
            interval,
            batch_size,
        }
    }

    /// Run sweeps until the token is cancelled
    ///
    /// Cancellation is only observed between sweeps, so a tick that has
    /// started finishes its batch.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            batch_size = self.batch_size,
            "task poller started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::info!("task poller stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.sweep().await;
                }
            }
        }
    }

    /// One reconciliation pass over the oldest running tasks
    pub async fn sweep(&self) {
        let batch = match self.tasks.list_running(self.batch_size).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch running tasks");
                return;
            }
        };

        if batch.is_empty() {
            return;
        }

        tracing::debug!(count = batch.len(), "reconciling tasks");

        for task in batch {
            if let Err(e) = self.reconcile(&task).await {
                tracing::error!(task_id = %task.id, error = %e, "failed to reconcile task");
            }
        }
    }

    async fn reconcile(&self, task: &Task) -> Result<(), ReconcileError> {
        let channel = self
            .channels
            .find(task.channel_id)
            .await?
            .ok_or(ReconcileError::ChannelGone(task.channel_id))?;

        let adapter = UpstreamAdapter::new(&channel.base_url, channel.secret_key.clone())?;
        let status = adapter.task_status(&task.upstream_task_id).await?;

        match status.status {
            UpstreamStatus::Completed => {
                let result_url = status.result.first_url().map(str::to_owned);
                self.tasks
                    .mark_terminal(task.id, TaskStatus::Completed, result_url.clone())
                    .await?;
                self.release(task.channel_id).await;

                tracing::info!(
                    task_id = %task.id,
                    result_url = result_url.as_deref().unwrap_or(""),
                    "task completed"
                );
            }
            UpstreamStatus::Failed | UpstreamStatus::Cancelled => {
                let terminal = if status.status == UpstreamStatus::Failed {
                    TaskStatus::Failed
                } else {
                    TaskStatus::Cancelled
                };
                self.tasks.mark_terminal(task.id, terminal, None).await?;

                // The status update above removed the task from the
                // running set, so this refund cannot repeat on a later
                // sweep even if it fails now.
                if let Err(e) = self.billing.refund(task.user_id, task.cost).await {
                    tracing::error!(task_id = %task.id, error = %e, "failed to refund task cost");
                }
                self.release(task.channel_id).await;

                tracing::warn!(
                    task_id = %task.id,
                    status = terminal.as_str(),
                    upstream_error = status.error.as_ref().map(|e| e.message.as_str()).unwrap_or(""),
                    "task ended without a result"
                );
            }
            UpstreamStatus::Pending | UpstreamStatus::Processing => {
                tracing::debug!(task_id = %task.id, progress = status.progress, "task in progress");
            }
            UpstreamStatus::Unknown => {
                tracing::warn!(task_id = %task.id, "upstream reported an unknown status");
            }
        }

        Ok(())
    }

    async fn release(&self, channel_id: Uuid) {
        // Clamped at zero in the store, so releases after a counter
        // reset are harmless.
        if let Err(e) = self.admission.release(channel_id).await {
            tracing::error!(%channel_id, error = %e, "failed to release concurrency slot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use secrecy::SecretString;
    use transit_db::in_memory::{InMemoryChannelRepository, InMemoryTaskRepository};
    use transit_db::Channel;
    use transit_store::BalanceStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        poller: TaskPoller,
        tasks: Arc<InMemoryTaskRepository>,
        admission: AdmissionStore,
        balances: BalanceStore,
        channel: Channel,
        upstream: MockServer,
    }

    async fn fixture() -> Fixture {
        let upstream = MockServer::start().await;

        let channel = Channel::new(
            "chan".to_owned(),
            SecretString::from("sk-chan"),
            upstream.uri(),
            5,
            10,
        );
        let channels = Arc::new(InMemoryChannelRepository::new());
        channels.create(&channel).await.unwrap();

        let tasks = Arc::new(InMemoryTaskRepository::new());
        let admission = AdmissionStore::in_memory();
        let balances = BalanceStore::in_memory();
        let billing = BillingService::new(balances.clone());

        let poller = TaskPoller::new(
            tasks.clone(),
            channels,
            admission.clone(),
            billing,
            Duration::from_secs(10),
            100,
        );

        Fixture {
            poller,
            tasks,
            admission,
            balances,
            channel,
            upstream,
        }
    }

    /// Seed one running task holding a slot and `cost` against the user
    async fn running_task(f: &Fixture, upstream_task_id: &str, cost: f64) -> Task {
        let task = Task::submitted(
            Uuid::new_v4(),
            f.channel.id,
            "vid".to_owned(),
            upstream_task_id.to_owned(),
            cost,
        );
        f.tasks.create(&task).await.unwrap();
        assert!(f.admission.acquire(f.channel.id, f.channel.max_concurrency).await.unwrap());
        task
    }

    fn status_response(body: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(body)
    }

    #[tokio::test]
    async fn completed_task_releases_slot_without_billing() {
        let f = fixture().await;
        let task = running_task(&f, "up-1", 2.0).await;

        Mock::given(method("GET"))
            .and(path("/v1/tasks/up-1"))
            .respond_with(status_response(serde_json::json!({
                "id": "up-1",
                "status": "completed",
                "progress": 100,
                "result": {"images": ["http://cdn/i/1.png"]}
            })))
            .mount(&f.upstream)
            .await;

        f.poller.sweep().await;

        let stored = f.tasks.find(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
        assert_eq!(stored.result_url.as_deref(), Some("http://cdn/i/1.png"));
        assert_eq!(f.admission.in_flight(f.channel.id).await.unwrap(), 0);
        // No refund on success
        assert!(f.balances.read(task.user_id).await.unwrap().abs() < 1e-9);
    }

    #[tokio::test]
    async fn failed_task_refunds_exactly_once() {
        let f = fixture().await;
        let task = running_task(&f, "up-2", 2.0).await;

        Mock::given(method("GET"))
            .and(path("/v1/tasks/up-2"))
            .respond_with(status_response(serde_json::json!({
                "id": "up-2",
                "status": "failed",
                "error": {"code": "gpu_oom", "message": "worker died"}
            })))
            .mount(&f.upstream)
            .await;

        f.poller.sweep().await;
        // A second sweep must not double-refund: the task left the
        // running set on the first one
        f.poller.sweep().await;

        let stored = f.tasks.find(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Failed);
        assert!((f.balances.read(task.user_id).await.unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(f.admission.in_flight(f.channel.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cancelled_task_is_treated_like_failure() {
        let f = fixture().await;
        let task = running_task(&f, "up-3", 0.5).await;

        Mock::given(method("GET"))
            .and(path("/v1/tasks/up-3"))
            .respond_with(status_response(serde_json::json!({
                "id": "up-3",
                "status": "cancelled"
            })))
            .mount(&f.upstream)
            .await;

        f.poller.sweep().await;

        let stored = f.tasks.find(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Cancelled);
        assert!((f.balances.read(task.user_id).await.unwrap() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn in_progress_task_is_left_untouched() {
        let f = fixture().await;
        let task = running_task(&f, "up-4", 2.0).await;

        Mock::given(method("GET"))
            .and(path("/v1/tasks/up-4"))
            .respond_with(status_response(serde_json::json!({
                "id": "up-4",
                "status": "processing",
                "progress": 50
            })))
            .mount(&f.upstream)
            .await;

        f.poller.sweep().await;

        let stored = f.tasks.find(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Running);
        assert_eq!(f.admission.in_flight(f.channel.id).await.unwrap(), 1);
        assert!(f.balances.read(task.user_id).await.unwrap().abs() < 1e-9);
    }

    #[tokio::test]
    async fn upstream_failure_leaves_the_task_for_the_next_tick() {
        let f = fixture().await;
        let task = running_task(&f, "up-5", 2.0).await;

        Mock::given(method("GET"))
            .and(path("/v1/tasks/up-5"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&f.upstream)
            .await;

        f.poller.sweep().await;

        let stored = f.tasks.find(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Running);
        assert_eq!(f.admission.in_flight(f.channel.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn one_bad_task_does_not_halt_the_batch() {
        let f = fixture().await;
        let bad = running_task(&f, "up-bad", 1.0).await;
        let good = running_task(&f, "up-good", 1.0).await;

        Mock::given(method("GET"))
            .and(path("/v1/tasks/up-bad"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&f.upstream)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/tasks/up-good"))
            .respond_with(status_response(serde_json::json!({
                "id": "up-good",
                "status": "completed",
                "result": {"videos": ["http://cdn/v/2.mp4"]}
            })))
            .mount(&f.upstream)
            .await;

        f.poller.sweep().await;

        assert_eq!(f.tasks.find(bad.id).await.unwrap().unwrap().status, TaskStatus::Running);
        assert_eq!(f.tasks.find(good.id).await.unwrap().unwrap().status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn counter_reset_makes_release_a_harmless_no_op() {
        let f = fixture().await;
        // Task exists but its slot was lost in a store restart: the
        // counter already reads zero
        let task = Task::submitted(
            Uuid::new_v4(),
            f.channel.id,
            "vid".to_owned(),
            "up-6".to_owned(),
            2.0,
        );
        f.tasks.create(&task).await.unwrap();

        Mock::given(method("GET"))
            .and(path("/v1/tasks/up-6"))
            .respond_with(status_response(serde_json::json!({
                "id": "up-6",
                "status": "completed",
                "result": {"images": ["http://cdn/i/6.png"]}
            })))
            .mount(&f.upstream)
            .await;

        f.poller.sweep().await;

        assert_eq!(f.tasks.find(task.id).await.unwrap().unwrap().status, TaskStatus::Completed);
        assert_eq!(f.admission.in_flight(f.channel.id).await.unwrap(), 0);
    }
}
