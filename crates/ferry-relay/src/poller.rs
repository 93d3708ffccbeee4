// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay cycles and their scheduling.
//!
//! A cycle fetches the platform's buffered updates, drops updates from chats
//! other than the session's source and everything at or below the session
//! watermark, then appends, forwards and reports each
//! remaining message in order before advancing the watermark.
//!
//! [`Poller::start`] runs cycles on one background task. Periodic ticks and
//! explicit triggers both feed that task, so cycles never overlap: a trigger
//! arriving mid-cycle occupies a single queue slot and further triggers are
//! dropped until it is consumed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ferry_config::model::{RelayConfig, WatermarkAdvance};
use ferry_core::{FerryError, MessageStore, NewMessage, PlatformAdapter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::forwarder::Forwarder;
use crate::progress::ProgressReporter;
use crate::session::{SessionState, SharedSession};

/// Per-cycle behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOptions {
    /// Stable-sort each batch by remote id before filtering.
    pub sort_batches: bool,
    pub watermark_advance: WatermarkAdvance,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            sort_batches: true,
            watermark_advance: WatermarkAdvance::Batch,
        }
    }
}

impl From<&RelayConfig> for CycleOptions {
    fn from(config: &RelayConfig) -> Self {
        Self {
            sort_batches: config.sort_batches,
            watermark_advance: config.watermark_advance,
        }
    }
}

/// Runs relay cycles against a platform and a message store.
#[derive(Clone)]
pub struct Poller {
    platform: Arc<dyn PlatformAdapter>,
    store: Arc<dyn MessageStore>,
    forwarder: Forwarder,
    progress: Arc<ProgressReporter>,
    options: CycleOptions,
}

impl Poller {
    pub fn new(
        platform: Arc<dyn PlatformAdapter>,
        store: Arc<dyn MessageStore>,
        progress: Arc<ProgressReporter>,
        options: CycleOptions,
    ) -> Self {
        Self {
            forwarder: Forwarder::new(platform.clone()),
            platform,
            store,
            progress,
            options,
        }
    }

    pub fn options(&self) -> CycleOptions {
        self.options
    }

    /// Runs one cycle, returning the number of new messages processed.
    ///
    /// A fetch or append failure aborts the cycle and is returned. In
    /// [`WatermarkAdvance::Batch`] mode the watermark is then unchanged; in
    /// [`WatermarkAdvance::Message`] mode it keeps whatever the messages before
    /// the failure advanced it to. Forward failures never abort the cycle.
    pub async fn try_cycle(&self, session: &mut SessionState) -> Result<usize, FerryError> {
        let mut batch = self.platform.get_updates(&session.credential).await?;
        let fetched = batch.len();
        batch.retain(|update| session.accepts_chat(update.chat_id));
        if batch.len() < fetched {
            debug!(
                skipped = fetched - batch.len(),
                source = %session.source_chat_id,
                "ignored updates from other chats"
            );
        }
        if self.options.sort_batches {
            batch.sort_by_key(|update| update.remote_message_id);
        }

        let floor = session.watermark;
        let fresh: Vec<_> = batch
            .into_iter()
            .filter(|update| update.remote_message_id > floor)
            .collect();
        self.progress.begin(fresh.len());
        if fresh.is_empty() {
            debug!(watermark = floor, "no new messages");
            return Ok(0);
        }

        let mut highest = floor;
        let mut delivered = 0usize;
        for update in &fresh {
            let text = update.text.clone().unwrap_or_default();
            let record = self
                .store
                .append(NewMessage {
                    source_credential: session.credential.clone(),
                    sender_chat_id: update.chat_id.to_string(),
                    receiver_chat_id: session.destination_chat_id.clone(),
                    remote_message_id: update.remote_message_id.to_string(),
                    text,
                })
                .await?;
            crate::recording::record_relayed();

            if self
                .forwarder
                .forward(&session.credential, &record.text, &session.destination_chat_id)
                .await
            {
                delivered += 1;
            }
            self.progress.advance();

            highest = highest.max(update.remote_message_id);
            if self.options.watermark_advance == WatermarkAdvance::Message {
                session.advance_watermark(update.remote_message_id);
            }
        }
        session.advance_watermark(highest);

        info!(
            processed = fresh.len(),
            delivered,
            watermark = session.watermark,
            "relay cycle complete"
        );
        Ok(fresh.len())
    }

    /// Runs one cycle, logging instead of returning failures.
    pub async fn run_cycle(&self, session: &mut SessionState) -> usize {
        let started = Instant::now();
        let result = self.try_cycle(session).await;
        let seconds = started.elapsed().as_secs_f64();
        match result {
            Ok(processed) => {
                crate::recording::record_cycle("ok", seconds);
                processed
            }
            Err(e) => {
                crate::recording::record_cycle("error", seconds);
                warn!(error = %e, watermark = session.watermark, "relay cycle aborted");
                0
            }
        }
    }

    /// Spawns the polling task for `session`.
    ///
    /// A cycle runs immediately when the session already has both chat ids,
    /// then every `interval`. Each cycle works on a snapshot of the session
    /// and commits the watermark back only if the session still has the same
    /// credential and source.
    pub fn start(&self, session: SharedSession, interval: Duration) -> PollHandle {
        let cancel = CancellationToken::new();
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let task = tokio::spawn(poll_loop(
            self.clone(),
            session,
            interval,
            cancel.clone(),
            trigger_rx,
        ));
        PollHandle {
            cancel,
            trigger: trigger_tx,
            task,
        }
    }

    async fn cycle_shared(&self, session: &SharedSession) -> usize {
        let mut snapshot = session.lock().await.clone();
        let processed = self.run_cycle(&mut snapshot).await;

        let mut live = session.lock().await;
        if live.same_scope(&snapshot) {
            live.advance_watermark(snapshot.watermark);
            crate::recording::set_watermark(live.watermark);
        } else {
            debug!("session changed during cycle; watermark not committed");
        }
        processed
    }
}

async fn poll_loop(
    poller: Poller,
    session: SharedSession,
    interval: Duration,
    cancel: CancellationToken,
    mut triggers: mpsc::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let immediate = session.lock().await.has_routes();
    debug!(interval_ms = interval.as_millis() as u64, immediate, "polling started");
    if immediate {
        poller.cycle_shared(&session).await;
    }

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            request = triggers.recv() => match request {
                Some(()) => debug!("triggered cycle"),
                // Handle dropped without stop().
                None => break,
            },
            _ = ticker.tick() => {}
        }
        poller.cycle_shared(&session).await;
    }
    debug!("polling stopped");
}

/// Owned handle to a running polling task.
#[derive(Debug)]
pub struct PollHandle {
    cancel: CancellationToken,
    trigger: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Requests a cycle as soon as the task is idle.
    ///
    /// Returns `false` when a request is already queued or the task has
    /// stopped; the queued request covers this one.
    pub fn trigger(&self) -> bool {
        self.trigger.try_send(()).is_ok()
    }

    /// Prevents any further cycle from starting and waits for the task to exit.
    ///
    /// A cycle already in flight runs to completion first.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "polling task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::PlatformUpdate;
    use ferry_test_utils::{text_update, MemoryMessageStore, MockPlatform};
    use tokio::sync::Mutex;

    struct Fixture {
        platform: Arc<MockPlatform>,
        store: Arc<MemoryMessageStore>,
        progress: Arc<ProgressReporter>,
        poller: Poller,
    }

    fn fixture(options: CycleOptions) -> Fixture {
        let platform = Arc::new(MockPlatform::new());
        let store = Arc::new(MemoryMessageStore::new());
        let progress = Arc::new(ProgressReporter::new());
        let poller = Poller::new(platform.clone(), store.clone(), progress.clone(), options);
        Fixture {
            platform,
            store,
            progress,
            poller,
        }
    }

    fn session() -> SessionState {
        SessionState::new("123:abc", "-1001", "42")
    }

    #[tokio::test]
    async fn new_batch_is_appended_forwarded_and_advances_watermark() {
        let fx = fixture(CycleOptions::default());
        fx.platform
            .push_updates([text_update(101, "hi"), text_update(102, "yo")])
            .await;
        let mut session = session();

        assert_eq!(fx.poller.try_cycle(&mut session).await.unwrap(), 2);
        assert_eq!(session.watermark, 102);

        let records = fx.store.list_all().await.unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(records[0].remote_message_id, "101");
        assert_eq!(records[0].sender_chat_id, "-1001");
        assert_eq!(records[0].receiver_chat_id, "42");
        assert_eq!(records[0].source_credential, "123:abc");
        assert_eq!(fx.platform.sent_texts().await, vec!["hi", "yo"]);
        assert_eq!(fx.progress.percent(), 100);
    }

    #[tokio::test]
    async fn repeated_batch_is_a_no_op() {
        let fx = fixture(CycleOptions::default());
        fx.platform
            .push_updates([text_update(101, "hi"), text_update(102, "yo")])
            .await;
        let mut session = session();
        fx.poller.try_cycle(&mut session).await.unwrap();

        assert_eq!(fx.poller.try_cycle(&mut session).await.unwrap(), 0);
        assert_eq!(session.watermark, 102);
        assert_eq!(fx.store.len().await, 2);
        assert_eq!(fx.platform.sent_messages().await.len(), 2);
        assert_eq!(fx.progress.percent(), 0);
    }

    #[tokio::test]
    async fn messages_at_or_below_watermark_are_skipped() {
        let fx = fixture(CycleOptions::default());
        fx.platform
            .push_updates([text_update(5, "old"), text_update(6, "edge"), text_update(7, "new")])
            .await;
        let mut session = session();
        session.watermark = 6;

        assert_eq!(fx.poller.try_cycle(&mut session).await.unwrap(), 1);
        assert_eq!(fx.platform.sent_texts().await, vec!["new"]);
    }

    #[tokio::test]
    async fn missing_text_is_stored_and_sent_empty() {
        let fx = fixture(CycleOptions::default());
        fx.platform
            .push_updates([PlatformUpdate {
                remote_message_id: 1,
                chat_id: -1001,
                text: None,
            }])
            .await;
        let mut session = session();
        fx.poller.try_cycle(&mut session).await.unwrap();

        assert_eq!(fx.store.list_all().await.unwrap()[0].text, "");
        assert_eq!(fx.platform.sent_texts().await, vec![""]);
    }

    #[tokio::test]
    async fn forward_failure_does_not_block_the_batch() {
        let fx = fixture(CycleOptions::default());
        fx.platform.reject_text("boom").await;
        fx.platform
            .push_updates([text_update(1, "a"), text_update(2, "boom"), text_update(3, "c")])
            .await;
        let mut session = session();

        assert_eq!(fx.poller.try_cycle(&mut session).await.unwrap(), 3);
        assert_eq!(fx.store.len().await, 3);
        assert_eq!(fx.platform.sent_texts().await, vec!["a", "c"]);
        assert_eq!(session.watermark, 3);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_watermark_and_is_swallowed_by_run_cycle() {
        let fx = fixture(CycleOptions::default());
        fx.platform.push_updates([text_update(1, "a")]).await;
        fx.platform.fail_next_fetches(1);
        let mut session = session();

        assert_eq!(fx.poller.run_cycle(&mut session).await, 0);
        assert_eq!(session.watermark, 0);
        assert!(fx.store.is_empty().await);

        // Retried on the next cycle.
        assert_eq!(fx.poller.run_cycle(&mut session).await, 1);
        assert_eq!(session.watermark, 1);
    }

    #[tokio::test]
    async fn append_failure_aborts_with_storage_error() {
        let fx = fixture(CycleOptions::default());
        fx.platform.push_updates([text_update(1, "a")]).await;
        fx.store.set_fail_appends(true);
        let mut session = session();

        let err = fx.poller.try_cycle(&mut session).await.unwrap_err();
        assert!(matches!(err, FerryError::Storage { .. }));
        assert_eq!(session.watermark, 0);
        assert!(fx.platform.sent_messages().await.is_empty());
    }

    #[tokio::test]
    async fn out_of_order_batch_is_sorted() {
        let fx = fixture(CycleOptions::default());
        fx.platform
            .push_updates([text_update(12, "c"), text_update(10, "a"), text_update(11, "b")])
            .await;
        let mut session = session();
        fx.poller.try_cycle(&mut session).await.unwrap();

        assert_eq!(fx.platform.sent_texts().await, vec!["a", "b", "c"]);
        assert_eq!(session.watermark, 12);
    }

    #[tokio::test]
    async fn unsorted_mode_keeps_source_order() {
        let fx = fixture(CycleOptions {
            sort_batches: false,
            ..CycleOptions::default()
        });
        fx.platform
            .push_updates([text_update(12, "c"), text_update(10, "a")])
            .await;
        let mut session = session();
        fx.poller.try_cycle(&mut session).await.unwrap();

        assert_eq!(fx.platform.sent_texts().await, vec!["c", "a"]);
        assert_eq!(session.watermark, 12);
    }

    async fn watermark_after_abort(mode: WatermarkAdvance) -> i64 {
        let fx = fixture(CycleOptions {
            watermark_advance: mode,
            ..CycleOptions::default()
        });
        fx.platform.push_updates([text_update(1, "a")]).await;
        let mut session = session();
        fx.poller.try_cycle(&mut session).await.unwrap();
        assert_eq!(session.watermark, 1);

        fx.platform
            .set_updates(vec![text_update(2, "b"), text_update(3, "c")])
            .await;
        fx.store.fail_after_appends(1);
        let err = fx.poller.try_cycle(&mut session).await.unwrap_err();
        assert!(matches!(err, FerryError::Storage { .. }));
        assert_eq!(fx.store.len().await, 2);
        session.watermark
    }

    #[tokio::test]
    async fn per_message_advance_keeps_progress_on_abort() {
        assert_eq!(watermark_after_abort(WatermarkAdvance::Message).await, 2);
    }

    #[tokio::test]
    async fn batch_advance_discards_progress_on_abort() {
        assert_eq!(watermark_after_abort(WatermarkAdvance::Batch).await, 1);
    }

    #[tokio::test]
    async fn other_chats_are_ignored_and_do_not_move_watermark() {
        let fx = fixture(CycleOptions::default());
        fx.platform
            .push_updates([
                PlatformUpdate {
                    remote_message_id: 500,
                    chat_id: -2002,
                    text: Some("foreign".into()),
                },
                text_update(10, "src-a"),
            ])
            .await;
        let mut session = session();

        assert_eq!(fx.poller.try_cycle(&mut session).await.unwrap(), 1);
        assert_eq!(session.watermark, 10);

        fx.platform.push_updates([text_update(11, "src-b")]).await;
        assert_eq!(fx.poller.try_cycle(&mut session).await.unwrap(), 1);
        assert_eq!(session.watermark, 11);
        assert_eq!(fx.platform.sent_texts().await, vec!["src-a", "src-b"]);
        let records = fx.store.list_all().await.unwrap();
        assert!(records.iter().all(|r| r.sender_chat_id == "-1001"));
    }

    #[tokio::test]
    async fn without_source_every_chat_is_relayed() {
        let fx = fixture(CycleOptions::default());
        fx.platform
            .push_updates([
                PlatformUpdate {
                    remote_message_id: 3,
                    chat_id: -2002,
                    text: Some("other".into()),
                },
                text_update(4, "mine"),
            ])
            .await;
        let mut session = SessionState::new("123:abc", "", "42");

        assert_eq!(fx.poller.try_cycle(&mut session).await.unwrap(), 2);
        assert_eq!(fx.platform.sent_texts().await, vec!["other", "mine"]);
    }

    #[tokio::test]
    async fn watermark_after_n_cycles_is_max_seen() {
        let fx = fixture(CycleOptions::default());
        let mut session = session();
        let mut expected = 0;

        for cycle in 0..5i64 {
            let ids: Vec<i64> = (0..3).map(|i| 100 + cycle * 10 + i).collect();
            fx.platform
                .set_updates(ids.iter().map(|&id| text_update(id, "x")).collect())
                .await;
            expected = *ids.iter().max().unwrap();
            fx.poller.run_cycle(&mut session).await;
            assert_eq!(session.watermark, expected);
        }

        assert_eq!(session.watermark, expected);
        assert_eq!(fx.store.len().await, 15);
    }

    #[tokio::test(start_paused = true)]
    async fn start_runs_immediately_then_on_interval() {
        let fx = fixture(CycleOptions::default());
        fx.platform.push_updates([text_update(1, "a")]).await;
        let shared = Arc::new(Mutex::new(session()));

        let handle = fx.poller.start(shared.clone(), Duration::from_secs(3));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fx.platform.fetch_calls(), 1);
        assert_eq!(shared.lock().await.watermark, 1);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fx.platform.fetch_calls(), 2);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fx.platform.fetch_calls(), 3);

        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fx.platform.fetch_calls(), 3);
        assert_eq!(fx.platform.sent_messages().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_immediate_cycle_without_source() {
        let fx = fixture(CycleOptions::default());
        let shared = Arc::new(Mutex::new(SessionState::new("t", "", "42")));

        let handle = fx.poller.start(shared, Duration::from_secs(3));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fx.platform.fetch_calls(), 0);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fx.platform.fetch_calls(), 1);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cycles_never_overlap_and_triggers_coalesce() {
        let fx = fixture(CycleOptions::default());
        fx.platform.set_fetch_delay(Duration::from_secs(10)).await;
        let shared = Arc::new(Mutex::new(session()));

        let handle = fx.poller.start(shared, Duration::from_secs(3));
        tokio::time::sleep(Duration::from_millis(10)).await;
        // First cycle is in flight; one trigger queues, the rest coalesce.
        assert!(handle.trigger());
        assert!(!handle.trigger());
        assert!(!handle.trigger());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fx.platform.max_concurrent_fetches(), 1);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_in_flight_cycle_finish() {
        let fx = fixture(CycleOptions::default());
        fx.platform.set_fetch_delay(Duration::from_secs(5)).await;
        fx.platform.push_updates([text_update(7, "late")]).await;
        let shared = Arc::new(Mutex::new(session()));

        let handle = fx.poller.start(shared.clone(), Duration::from_secs(3));
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.stop().await;

        assert_eq!(fx.platform.fetch_calls(), 1);
        assert_eq!(fx.platform.sent_texts().await, vec!["late"]);
        assert_eq!(shared.lock().await.watermark, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn watermark_not_committed_after_credential_change() {
        let fx = fixture(CycleOptions::default());
        fx.platform.set_fetch_delay(Duration::from_secs(5)).await;
        fx.platform.push_updates([text_update(7, "x")]).await;
        let shared = Arc::new(Mutex::new(session()));

        let handle = fx.poller.start(shared.clone(), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(10)).await;
        shared.lock().await.replace_credential("other");
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(shared.lock().await.watermark, 0);
        handle.stop().await;
    }
}
