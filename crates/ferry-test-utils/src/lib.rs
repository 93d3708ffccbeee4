// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Ferry.
//!
//! Provides in-memory adapters for fast, deterministic tests without a
//! network or a database.
//!
//! # Components
//!
//! - [`MockPlatform`] - Scripted chat platform with update injection and send capture
//! - [`MemoryMessageStore`] - `Vec`-backed message log

pub mod memory_store;
pub mod mock_platform;

pub use memory_store::MemoryMessageStore;
pub use mock_platform::{text_update, MockPlatform, SentMessage, SOURCE_CHAT};
