// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay engine for Ferry.
//!
//! Polls a source chat through a [`PlatformAdapter`](ferry_core::PlatformAdapter),
//! records every new message in a [`MessageStore`](ferry_core::MessageStore)
//! and forwards it to the destination chat. Deduplication rests on a single
//! per-session watermark: the highest remote message id already processed.
//!
//! - [`RelayEngine`] - start/stop, verification, log access, progress
//! - [`Poller`] - one relay cycle, and the polling task behind [`PollHandle`]
//! - [`Verifier`] / [`Forwarder`] - the identity check and the single-attempt send
//! - [`ProgressReporter`] - percent complete of the current batch

pub mod engine;
pub mod forwarder;
pub mod poller;
pub mod progress;
pub mod recording;
pub mod session;
pub mod shutdown;
pub mod verifier;

pub use engine::RelayEngine;
pub use forwarder::Forwarder;
pub use poller::{CycleOptions, PollHandle, Poller};
pub use progress::{percent_complete, ProgressReporter};
pub use session::{SessionState, SharedSession};
pub use verifier::Verifier;
