// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The relay engine: the surface a front end drives.
//!
//! [`RelayEngine`] owns the session, the message store handle and at most one
//! polling task. Every operation is safe to call from any task.

use std::sync::Arc;
use std::time::Duration;

use ferry_config::model::RelayConfig;
use ferry_core::{
    FerryError, Identity, MessageRecord, MessageStore, PlatformAdapter, RelayState,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::poller::{CycleOptions, PollHandle, Poller};
use crate::progress::ProgressReporter;
use crate::session::{SessionState, SharedSession};
use crate::verifier::Verifier;

pub struct RelayEngine {
    session: SharedSession,
    poller: Poller,
    verifier: Verifier,
    store: Arc<dyn MessageStore>,
    progress: Arc<ProgressReporter>,
    interval: Duration,
    handle: Mutex<Option<PollHandle>>,
}

impl RelayEngine {
    /// Builds an engine using the `[relay]` section's cadence and cycle options.
    pub fn new(
        platform: Arc<dyn PlatformAdapter>,
        store: Arc<dyn MessageStore>,
        config: &RelayConfig,
    ) -> Self {
        Self::with_options(
            platform,
            store,
            CycleOptions::from(config),
            Duration::from_millis(config.poll_interval_ms),
        )
    }

    pub fn with_options(
        platform: Arc<dyn PlatformAdapter>,
        store: Arc<dyn MessageStore>,
        options: CycleOptions,
        interval: Duration,
    ) -> Self {
        let progress = Arc::new(ProgressReporter::new());
        Self {
            session: Arc::new(Mutex::new(SessionState::default())),
            poller: Poller::new(platform.clone(), store.clone(), progress.clone(), options),
            verifier: Verifier::new(platform),
            store,
            progress,
            interval,
            handle: Mutex::new(None),
        }
    }

    /// Installs `session` and starts polling.
    ///
    /// Fails with [`FerryError::InvalidState`] if the relay is already running
    /// or the session lacks a credential or destination. The resolved name
    /// carries over when the credential is unchanged, and the higher watermark
    /// when the source chat is unchanged too.
    pub async fn start_relay(&self, session: SessionState) -> Result<(), FerryError> {
        session.ensure_startable()?;

        let mut handle = self.handle.lock().await;
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(FerryError::InvalidState("relay is already running".into()));
        }

        {
            let mut live = self.session.lock().await;
            let mut next = session;
            if live.same_scope(&next) {
                next.advance_watermark(live.watermark);
            }
            if live.credential == next.credential && next.resolved_name.is_none() {
                next.resolved_name = live.resolved_name.clone();
            }
            info!(
                source = %next.source_chat_id,
                destination = %next.destination_chat_id,
                watermark = next.watermark,
                "starting relay"
            );
            *live = next;
        }

        *handle = Some(self.poller.start(self.session.clone(), self.interval));
        Ok(())
    }

    /// Stops polling. A cycle already in flight finishes first.
    ///
    /// Fails with [`FerryError::InvalidState`] if the relay is not running.
    pub async fn stop_relay(&self) -> Result<(), FerryError> {
        if self.halt().await {
            info!("relay stopped");
            Ok(())
        } else {
            Err(FerryError::InvalidState("relay is not running".into()))
        }
    }

    async fn halt(&self) -> bool {
        let Some(handle) = self.handle.lock().await.take() else {
            return false;
        };
        let was_running = !handle.is_finished();
        handle.stop().await;
        was_running
    }

    pub async fn relay_state(&self) -> RelayState {
        match self.handle.lock().await.as_ref() {
            Some(h) if !h.is_finished() => RelayState::Running,
            _ => RelayState::Stopped,
        }
    }

    /// The message log in insertion order.
    pub async fn get_messages(&self) -> Result<Vec<MessageRecord>, FerryError> {
        self.store.list_all().await
    }

    pub async fn clear_messages(&self) -> Result<(), FerryError> {
        self.store.clear_all().await?;
        info!("message log cleared");
        Ok(())
    }

    /// Percent complete of the current (or last) batch, `0..=100`.
    pub fn get_progress(&self) -> u8 {
        self.progress.percent()
    }

    /// Verifies `credential` and makes it the session's credential.
    ///
    /// A credential different from the current one first resets the resolved
    /// name and watermark. On success the resolved name is recorded and, if
    /// the relay is running, a cycle is requested right away. While stopped no
    /// cycle runs; the next [`start_relay`](Self::start_relay) runs its own
    /// immediate cycle once both chat ids are set. On failure the resolved
    /// name is left absent.
    pub async fn verify_credential(&self, credential: &str) -> Result<Identity, FerryError> {
        self.session.lock().await.replace_credential(credential);

        let result = self.verifier.verify(credential).await;

        {
            let mut session = self.session.lock().await;
            if session.credential != credential {
                debug!("credential replaced during verification; result discarded");
                return result;
            }
            session.resolved_name = result.as_ref().ok().map(|id| id.resolved_name.clone());
        }

        if result.is_ok()
            && let Some(handle) = self.handle.lock().await.as_ref()
        {
            handle.trigger();
        }
        result
    }

    /// Stops the relay and forgets the session.
    pub async fn clear_credential(&self) {
        self.halt().await;
        self.session.lock().await.reset();
        info!("credential cleared");
    }

    /// A copy of the current session.
    pub async fn session(&self) -> SessionState {
        self.session.lock().await.clone()
    }

    /// Stops polling if running. For process shutdown.
    pub async fn shutdown(&self) {
        if self.halt().await {
            info!("relay stopped for shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_test_utils::{text_update, MemoryMessageStore, MockPlatform};

    fn engine(platform: &Arc<MockPlatform>, store: &Arc<MemoryMessageStore>) -> RelayEngine {
        RelayEngine::with_options(
            platform.clone(),
            store.clone(),
            CycleOptions::default(),
            Duration::from_secs(3),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_stop_transition_relay_state() {
        let platform = Arc::new(MockPlatform::new());
        let store = Arc::new(MemoryMessageStore::new());
        let engine = engine(&platform, &store);
        assert_eq!(engine.relay_state().await, RelayState::Stopped);

        engine
            .start_relay(SessionState::new("t", "-1001", "42"))
            .await
            .unwrap();
        assert_eq!(engine.relay_state().await, RelayState::Running);

        engine.stop_relay().await.unwrap();
        assert_eq!(engine.relay_state().await, RelayState::Stopped);
        assert!(matches!(
            engine.stop_relay().await,
            Err(FerryError::InvalidState(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_is_rejected() {
        let platform = Arc::new(MockPlatform::new());
        let store = Arc::new(MemoryMessageStore::new());
        let engine = engine(&platform, &store);

        engine
            .start_relay(SessionState::new("t", "-1001", "42"))
            .await
            .unwrap();
        let err = engine
            .start_relay(SessionState::new("t", "-1001", "42"))
            .await
            .unwrap_err();
        assert!(matches!(err, FerryError::InvalidState(_)));

        tokio::time::sleep(Duration::from_secs(10)).await;
        // One immediate cycle plus ticks at 3s, 6s and 9s from a single timer.
        assert_eq!(platform.fetch_calls(), 4);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn start_requires_credential_and_destination() {
        let platform = Arc::new(MockPlatform::new());
        let store = Arc::new(MemoryMessageStore::new());
        let engine = engine(&platform, &store);

        assert!(engine
            .start_relay(SessionState::new("", "-1001", "42"))
            .await
            .is_err());
        assert!(engine
            .start_relay(SessionState::new("t", "-1001", ""))
            .await
            .is_err());
        assert_eq!(engine.relay_state().await, RelayState::Stopped);
    }

    #[tokio::test]
    async fn bad_credential_leaves_name_absent() {
        let platform = Arc::new(MockPlatform::new());
        let store = Arc::new(MemoryMessageStore::new());
        let engine = engine(&platform, &store);

        let err = engine.verify_credential("bad").await.unwrap_err();
        assert!(matches!(err, FerryError::Auth { ref reason } if reason == "Unauthorized"));
        assert!(engine.session().await.resolved_name.is_none());
    }

    #[tokio::test]
    async fn verification_records_name_and_new_credential_resets_session() {
        let platform = Arc::new(MockPlatform::new());
        platform.accept("one", "First Bot").await;
        platform.accept("two", "Second Bot").await;
        let store = Arc::new(MemoryMessageStore::new());
        let engine = engine(&platform, &store);

        engine.verify_credential("one").await.unwrap();
        assert_eq!(
            engine.session().await.resolved_name.as_deref(),
            Some("First Bot")
        );

        engine.session.lock().await.watermark = 55;
        engine.verify_credential("two").await.unwrap();
        let session = engine.session().await;
        assert_eq!(session.credential, "two");
        assert_eq!(session.resolved_name.as_deref(), Some("Second Bot"));
        assert_eq!(session.watermark, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn verify_while_running_triggers_a_cycle() {
        let platform = Arc::new(MockPlatform::new());
        platform.accept("t", "Relay Bot").await;
        let store = Arc::new(MemoryMessageStore::new());
        let engine = RelayEngine::with_options(
            platform.clone(),
            store.clone(),
            CycleOptions::default(),
            Duration::from_secs(3600),
        );

        engine
            .start_relay(SessionState::new("t", "-1001", "42"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(platform.fetch_calls(), 1);

        platform.push_updates([text_update(1, "hello")]).await;
        engine.verify_credential("t").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(platform.fetch_calls(), 2);
        assert_eq!(platform.sent_texts().await, vec!["hello"]);
        assert_eq!(engine.get_progress(), 100);
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn verify_while_stopped_does_not_poll() {
        let platform = Arc::new(MockPlatform::new());
        platform.accept("t", "Relay Bot").await;
        platform.push_updates([text_update(1, "hello")]).await;
        let store = Arc::new(MemoryMessageStore::new());
        let engine = engine(&platform, &store);

        engine.verify_credential("t").await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(platform.fetch_calls(), 0);
        assert!(platform.sent_messages().await.is_empty());
        assert_eq!(engine.relay_state().await, RelayState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_carries_watermark_for_same_scope() {
        let platform = Arc::new(MockPlatform::new());
        platform.push_updates([text_update(101, "hi")]).await;
        let store = Arc::new(MemoryMessageStore::new());
        let engine = engine(&platform, &store);

        engine
            .start_relay(SessionState::new("t", "-1001", "42"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.stop_relay().await.unwrap();

        engine
            .start_relay(SessionState::new("t", "-1001", "42"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.stop_relay().await.unwrap();

        assert_eq!(engine.session().await.watermark, 101);
        assert_eq!(platform.sent_messages().await.len(), 1);
        assert_eq!(engine.get_messages().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_credential_stops_and_resets() {
        let platform = Arc::new(MockPlatform::new());
        platform.push_updates([text_update(9, "x")]).await;
        let store = Arc::new(MemoryMessageStore::new());
        let engine = engine(&platform, &store);

        engine
            .start_relay(SessionState::new("t", "-1001", "42"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(engine.session().await.watermark, 9);

        engine.clear_credential().await;
        assert_eq!(engine.relay_state().await, RelayState::Stopped);
        assert_eq!(engine.session().await, SessionState::default());
        // The log is independent of the session.
        assert_eq!(engine.get_messages().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_messages_empties_the_log() {
        let platform = Arc::new(MockPlatform::new());
        platform.push_updates([text_update(1, "a")]).await;
        let store = Arc::new(MemoryMessageStore::new());
        let engine = engine(&platform, &store);

        let mut session = SessionState::new("t", "-1001", "42");
        engine.poller.run_cycle(&mut session).await;
        assert_eq!(engine.get_messages().await.unwrap().len(), 1);

        engine.clear_messages().await.unwrap();
        assert!(engine.get_messages().await.unwrap().is_empty());
    }
}
