use std::sync::Arc;
use std::time::Duration;

use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::{
    application::{
        handlers::message_dispatcher::{DispatchResult, MessageDispatchHandler},
        services::{clock::Clock, rate_gate::RateGate},
    },
    domain::{models::ScheduledMessage, repositories::ScheduledMessageRepository},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub due: usize,
    pub sent: usize,
    pub failed: usize,
    pub discarded: usize,
    pub errors: usize,
    /// The due set could not be loaded; nothing was attempted.
    pub skipped: bool,
}

/// Periodically pulls due messages from the store and dispatches them one at
/// a time through the rate gate.
pub struct PollScheduler {
    repo: Arc<dyn ScheduledMessageRepository>,
    handler: Arc<MessageDispatchHandler>,
    gate: Arc<RateGate>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl PollScheduler {
    pub fn new(
        repo: Arc<dyn ScheduledMessageRepository>,
        handler: Arc<MessageDispatchHandler>,
        gate: Arc<RateGate>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            repo,
            handler,
            gate,
            clock,
            interval,
        }
    }

    pub fn spawn(self) -> PollSchedulerHandle {
        let (shutdown, receiver) = watch::channel(false);
        let task = tokio::spawn(async move { self.run(receiver).await });
        PollSchedulerHandle { shutdown, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            min_send_interval_ms = self.gate.min_interval().as_millis() as u64,
            "poll scheduler started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut skipped_in_a_row = 0u32;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.tick().await.skipped {
                        skipped_in_a_row += 1;
                        if skipped_in_a_row > 1 {
                            tracing::warn!(ticks = skipped_in_a_row, "store unavailable for consecutive ticks");
                        }
                    } else {
                        skipped_in_a_row = 0;
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        tracing::info!("poll scheduler stopped");
    }

    /// Runs a single poll: loads the due set and dispatches it sequentially.
    /// Never fails; problems are logged and reflected in the summary.
    pub async fn tick(&self) -> TickSummary {
        let now = self.clock.now();
        let due = match self.repo.find_due(now).await {
            Ok(due) => due,
            Err(err) => {
                tracing::error!(error = %err, "failed to load due messages, skipping tick");
                return TickSummary {
                    skipped: true,
                    ..TickSummary::default()
                };
            }
        };

        let mut summary = TickSummary {
            due: due.len(),
            ..TickSummary::default()
        };
        if due.is_empty() {
            return summary;
        }
        tracing::info!(count = due.len(), "dispatching due messages");

        for message in due {
            self.gate.wait().await;

            let current = match self.refresh(&message).await {
                Ok(Some(current)) => current,
                Ok(None) => {
                    summary.discarded += 1;
                    continue;
                }
                Err(err) => {
                    summary.errors += 1;
                    tracing::error!(
                        message_id = %message.id,
                        error = %err,
                        "failed to reload message"
                    );
                    continue;
                }
            };

            match self.handler.handle(&current).await {
                Ok(DispatchResult::Sent) => summary.sent += 1,
                Ok(DispatchResult::Failed) => summary.failed += 1,
                Ok(DispatchResult::Discarded) => summary.discarded += 1,
                Err(err) => {
                    summary.errors += 1;
                    tracing::error!(
                        message_id = %message.id,
                        error = %err,
                        "failed to record dispatch result"
                    );
                }
            }
        }

        tracing::info!(
            due = summary.due,
            sent = summary.sent,
            failed = summary.failed,
            discarded = summary.discarded,
            errors = summary.errors,
            "poll tick finished"
        );
        summary
    }

    /// Re-reads a message right before sending so edits and deletions made
    /// while it waited at the gate are honoured.
    async fn refresh(
        &self,
        message: &ScheduledMessage,
    ) -> anyhow::Result<Option<ScheduledMessage>> {
        let current = self
            .repo
            .get(message.id)
            .await?
            .filter(|current| current.is_due(self.clock.now()));
        if current.is_none() {
            tracing::debug!(message_id = %message.id, "message changed before dispatch, skipping");
        }
        Ok(current)
    }
}

pub struct PollSchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollSchedulerHandle {
    /// Stops the loop once the tick in progress, if any, has finished.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "poll scheduler task panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use tokio::time::Instant;
    use uuid::Uuid;

    use super::*;
    use crate::{
        application::{
            services::{
                clock::ManualClock,
                delivery::{
                    DeliveryBackend, DeliveryClient, DeliveryPolicy, ProviderReceipt,
                    testing::ScriptedBackend,
                },
            },
            usecases::{
                delete_message::DeleteMessageUseCase,
                get_message::GetMessageUseCase,
                schedule_message::{ScheduleMessageRequest, ScheduleMessageUseCase},
                update_message::{UpdateMessageRequest, UpdateMessageUseCase},
            },
        },
        domain::{
            errors::DomainError,
            models::{
                CorrelationKey, DispatchRecord, MessageStatus, NewScheduledMessage, UpdateOutcome,
            },
        },
        infrastructure::repositories::in_memory::InMemoryScheduledMessageRepository,
    };

    struct Harness {
        clock: Arc<ManualClock>,
        repo: Arc<InMemoryScheduledMessageRepository>,
        scheduler: PollScheduler,
    }

    impl Harness {
        fn new(backend: Arc<dyn DeliveryBackend>) -> Self {
            let clock = Arc::new(ManualClock::new(Utc::now()));
            let repo = Arc::new(InMemoryScheduledMessageRepository::new(clock.clone()));
            let delivery = Arc::new(DeliveryClient::new(backend, DeliveryPolicy::default()));
            let handler = Arc::new(MessageDispatchHandler::new(repo.clone(), delivery));
            let scheduler = PollScheduler::new(
                repo.clone(),
                handler,
                Arc::new(RateGate::new(Duration::from_secs(1))),
                clock.clone(),
                Duration::from_secs(30),
            );
            Self {
                clock,
                repo,
                scheduler,
            }
        }

        fn schedule_usecase(&self) -> ScheduleMessageUseCase {
            ScheduleMessageUseCase::new(self.repo.clone(), self.clock.clone())
        }

        async fn schedule_in(&self, offset: ChronoDuration) -> Result<ScheduledMessage, DomainError> {
            self.schedule_usecase()
                .execute(ScheduleMessageRequest {
                    recipient: "+15550001111".to_string(),
                    body: "water the plants".to_string(),
                    scheduled_at: (self.clock.now() + offset).to_rfc3339(),
                })
                .await
        }

        async fn stored(&self, id: Uuid) -> Option<ScheduledMessage> {
            self.repo.get(id).await.unwrap()
        }
    }

    /// Records when each send reached the provider.
    #[derive(Default)]
    struct TimestampingBackend {
        stamps: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl DeliveryBackend for TimestampingBackend {
        fn name(&self) -> &'static str {
            "timestamping"
        }

        async fn send(&self, _recipient: &str, _body: &str) -> anyhow::Result<ProviderReceipt> {
            let mut stamps = self.stamps.lock().unwrap();
            stamps.push(Instant::now());
            Ok(ProviderReceipt {
                provider_ref: format!("SM{}", stamps.len()),
                status: None,
            })
        }
    }

    /// Store that fails every call, except that it can hand out a fixed due
    /// set.
    struct BrokenRepository {
        due: Option<Vec<ScheduledMessage>>,
    }

    #[async_trait]
    impl ScheduledMessageRepository for BrokenRepository {
        async fn insert(&self, _message: NewScheduledMessage) -> anyhow::Result<ScheduledMessage> {
            anyhow::bail!("store unavailable")
        }

        async fn get(&self, _id: Uuid) -> anyhow::Result<Option<ScheduledMessage>> {
            anyhow::bail!("store unavailable")
        }

        async fn list(&self) -> anyhow::Result<Vec<ScheduledMessage>> {
            anyhow::bail!("store unavailable")
        }

        async fn update(&self, _message: &ScheduledMessage) -> anyhow::Result<UpdateOutcome> {
            anyhow::bail!("store unavailable")
        }

        async fn delete(&self, _id: Uuid) -> anyhow::Result<bool> {
            anyhow::bail!("store unavailable")
        }

        async fn find_due(&self, _now: DateTime<Utc>) -> anyhow::Result<Vec<ScheduledMessage>> {
            match &self.due {
                Some(due) => Ok(due.clone()),
                None => anyhow::bail!("store unavailable"),
            }
        }

        async fn record_dispatch(
            &self,
            _id: Uuid,
            _record: DispatchRecord,
        ) -> anyhow::Result<Option<ScheduledMessage>> {
            anyhow::bail!("store unavailable")
        }

        async fn apply_status(
            &self,
            _key: &CorrelationKey,
            _status: MessageStatus,
        ) -> anyhow::Result<u64> {
            anyhow::bail!("store unavailable")
        }
    }

    fn scheduler_over(
        repo: Arc<dyn ScheduledMessageRepository>,
        backend: Arc<ScriptedBackend>,
    ) -> PollScheduler {
        let delivery = Arc::new(DeliveryClient::new(backend, DeliveryPolicy::default()));
        PollScheduler::new(
            repo.clone(),
            Arc::new(MessageDispatchHandler::new(repo, delivery)),
            Arc::new(RateGate::new(Duration::from_secs(1))),
            Arc::new(ManualClock::new(Utc::now())),
            Duration::from_secs(30),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn due_message_is_sent_after_clock_passes_schedule() {
        let harness = Harness::new(Arc::new(ScriptedBackend::always_succeeding()));
        let message = harness.schedule_in(ChronoDuration::hours(1)).await.unwrap();
        assert_eq!(message.status, MessageStatus::Pending);

        let early = harness.scheduler.tick().await;
        assert_eq!(early.due, 0);
        assert_eq!(
            harness.stored(message.id).await.unwrap().status,
            MessageStatus::Pending
        );

        harness.clock.advance(ChronoDuration::hours(1) + ChronoDuration::seconds(1));
        let summary = harness.scheduler.tick().await;

        assert_eq!(summary.due, 1);
        assert_eq!(summary.sent, 1);
        let stored = harness.stored(message.id).await.unwrap();
        assert_eq!(stored.status, MessageStatus::Sent);
        assert!(stored.updated_at > message.updated_at);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduling_in_the_past_fails_validation() {
        let harness = Harness::new(Arc::new(ScriptedBackend::always_succeeding()));
        let result = harness.schedule_in(ChronoDuration::seconds(-1)).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(harness.repo.list().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn edit_is_allowed_until_message_is_sent() {
        let harness = Harness::new(Arc::new(ScriptedBackend::always_succeeding()));
        let message = harness.schedule_in(ChronoDuration::hours(1)).await.unwrap();
        let update = UpdateMessageUseCase::new(harness.repo.clone());

        harness.clock.advance(ChronoDuration::minutes(1));
        let new_at = harness.clock.now() + ChronoDuration::minutes(10);
        let edited = update
            .execute(UpdateMessageRequest {
                id: message.id,
                recipient: "+15550002222".to_string(),
                body: "water the garden".to_string(),
                scheduled_at: new_at.to_rfc3339(),
            })
            .await
            .unwrap();
        assert_eq!(edited.recipient, "+15550002222");
        assert_eq!(edited.body, "water the garden");
        assert_eq!(edited.scheduled_at, new_at);
        assert!(edited.updated_at > message.updated_at);

        harness.clock.advance(ChronoDuration::minutes(11));
        assert_eq!(harness.scheduler.tick().await.sent, 1);

        let second = update
            .execute(UpdateMessageRequest {
                id: message.id,
                recipient: "+15550003333".to_string(),
                body: "too late".to_string(),
                scheduled_at: harness.clock.now().to_rfc3339(),
            })
            .await;
        assert!(matches!(second, Err(DomainError::InvalidState(_))));
        let stored = harness.stored(message.id).await.unwrap();
        assert_eq!(stored.body, "water the garden");
        assert_eq!(stored.status, MessageStatus::Sent);
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_message_is_gone_and_never_dispatched() {
        let backend = Arc::new(ScriptedBackend::always_succeeding());
        let harness = Harness::new(backend.clone());
        let message = harness.schedule_in(ChronoDuration::minutes(5)).await.unwrap();

        DeleteMessageUseCase::new(harness.repo.clone())
            .execute(message.id)
            .await
            .unwrap();

        assert!(matches!(
            GetMessageUseCase::new(harness.repo.clone())
                .execute(message.id)
                .await,
            Err(DomainError::NotFound(_))
        ));
        harness.clock.advance(ChronoDuration::minutes(10));
        let summary = harness.scheduler.tick().await;
        assert_eq!(summary.due, 0);
        assert_eq!(backend.calls(), 0);

        assert!(matches!(
            DeleteMessageUseCase::new(harness.repo.clone())
                .execute(message.id)
                .await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_message_is_not_retried_on_later_ticks() {
        let backend = Arc::new(ScriptedBackend::always_failing());
        let harness = Harness::new(backend.clone());
        let message = harness.schedule_in(ChronoDuration::seconds(10)).await.unwrap();
        harness.clock.advance(ChronoDuration::seconds(11));

        let first = harness.scheduler.tick().await;
        assert_eq!(first.failed, 1);
        assert_eq!(backend.calls(), 3);
        assert_eq!(
            harness.stored(message.id).await.unwrap().status,
            MessageStatus::Failed
        );

        let second = harness.scheduler.tick().await;
        assert_eq!(second.due, 0);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sends_within_a_tick_are_spaced_by_the_rate_gate() {
        let backend = Arc::new(TimestampingBackend::default());
        let harness = Harness::new(backend.clone());
        for minutes in 1..=4 {
            harness
                .schedule_in(ChronoDuration::minutes(minutes))
                .await
                .unwrap();
        }
        harness.clock.advance(ChronoDuration::minutes(5));

        let summary = harness.scheduler.tick().await;
        assert_eq!(summary.sent, 4);

        let stamps = backend.stamps.lock().unwrap().clone();
        assert_eq!(stamps.len(), 4);
        assert!(stamps[3] - stamps[0] >= Duration::from_secs(3));
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn due_messages_are_sent_oldest_first() {
        let backend = Arc::new(ScriptedBackend::always_succeeding());
        let harness = Harness::new(backend.clone());
        let now = harness.clock.now();
        for (recipient, offset) in [("+3", 30), ("+1", 10), ("+2", 20)] {
            harness
                .repo
                .insert(NewScheduledMessage {
                    recipient: recipient.to_string(),
                    body: "hi".to_string(),
                    scheduled_at: now - ChronoDuration::seconds(100 - offset),
                })
                .await
                .unwrap();
        }

        harness.scheduler.tick().await;

        let order: Vec<_> = backend.sent().into_iter().map(|(to, _)| to).collect();
        assert_eq!(order, vec!["+1", "+2", "+3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_store_skips_the_tick() {
        let backend = Arc::new(ScriptedBackend::always_succeeding());
        let scheduler = scheduler_over(Arc::new(BrokenRepository { due: None }), backend.clone());

        let summary = scheduler.tick().await;

        assert!(summary.skipped);
        assert_eq!(summary.due, 0);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reload_failure_counts_as_error_not_discard() {
        let now = Utc::now();
        let message = ScheduledMessage {
            id: Uuid::new_v4(),
            recipient: "+15550001111".to_string(),
            body: "hi".to_string(),
            scheduled_at: now - ChronoDuration::minutes(1),
            status: MessageStatus::Pending,
            provider_ref: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        let backend = Arc::new(ScriptedBackend::always_succeeding());
        let scheduler = scheduler_over(
            Arc::new(BrokenRepository {
                due: Some(vec![message]),
            }),
            backend.clone(),
        );

        let summary = scheduler.tick().await;

        assert!(!summary.skipped);
        assert_eq!(summary.due, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.discarded, 0);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn changes_made_while_waiting_at_the_gate_are_honoured() {
        let backend = Arc::new(ScriptedBackend::always_succeeding());
        let harness = Harness::new(backend.clone());
        let now = harness.clock.now();
        let mut ids = Vec::new();
        for (recipient, age) in [("+1", 30), ("+2", 20), ("+3", 10)] {
            let message = harness
                .repo
                .insert(NewScheduledMessage {
                    recipient: recipient.to_string(),
                    body: "hi".to_string(),
                    scheduled_at: now - ChronoDuration::seconds(age),
                })
                .await
                .unwrap();
            ids.push(message.id);
        }
        let later = now + ChronoDuration::hours(1);

        // The first send goes out immediately; the other two wait at the gate
        // while one is deleted and the other is moved into the future.
        let (summary, _) = tokio::join!(harness.scheduler.tick(), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            DeleteMessageUseCase::new(harness.repo.clone())
                .execute(ids[1])
                .await
                .unwrap();
            UpdateMessageUseCase::new(harness.repo.clone())
                .execute(UpdateMessageRequest {
                    id: ids[2],
                    recipient: "+3".to_string(),
                    body: "hi".to_string(),
                    scheduled_at: later.to_rfc3339(),
                })
                .await
                .unwrap();
        });

        assert_eq!(summary.due, 3);
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.discarded, 2);
        assert_eq!(summary.errors, 0);
        assert_eq!(backend.sent(), vec![("+1".to_string(), "hi".to_string())]);
        assert!(harness.stored(ids[1]).await.is_none());
        let moved = harness.stored(ids[2]).await.unwrap();
        assert_eq!(moved.status, MessageStatus::Pending);
        assert_eq!(moved.scheduled_at, later);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_loop_keeps_ticking_until_shutdown() {
        let backend = Arc::new(ScriptedBackend::always_succeeding());
        let harness = Harness::new(backend.clone());
        let first = harness.schedule_in(ChronoDuration::seconds(1)).await.unwrap();
        harness.clock.advance(ChronoDuration::seconds(2));
        let Harness {
            clock,
            repo,
            scheduler,
        } = harness;

        let handle = scheduler.spawn();
        // first tick fires immediately
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(repo.get(first.id).await.unwrap().unwrap().status, MessageStatus::Sent);

        let second = repo
            .insert(NewScheduledMessage {
                recipient: "+2".to_string(),
                body: "later".to_string(),
                scheduled_at: clock.now(),
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(repo.get(second.id).await.unwrap().unwrap().status, MessageStatus::Sent);

        handle.shutdown().await;
        assert_eq!(backend.calls(), 2);
    }
}
