// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Percent-complete of the current relay batch.

use std::sync::atomic::{AtomicUsize, Ordering};

/// `processed / batch * 100`, floored and clamped to `0..=100`.
///
/// An empty batch reports 0.
pub fn percent_complete(processed: usize, batch: usize) -> u8 {
    if batch == 0 {
        return 0;
    }
    let pct = processed.min(batch).saturating_mul(100) / batch;
    pct as u8
}

/// Progress of the batch being relayed.
///
/// Written by the polling task, read by anyone. The last cycle's figure stays
/// visible until the next cycle calls [`begin`](Self::begin).
#[derive(Debug, Default)]
pub struct ProgressReporter {
    batch: AtomicUsize,
    processed: AtomicUsize,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new batch of `batch` messages.
    pub fn begin(&self, batch: usize) {
        self.processed.store(0, Ordering::SeqCst);
        self.batch.store(batch, Ordering::SeqCst);
    }

    /// Marks one more message of the batch as processed.
    pub fn advance(&self) {
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn percent(&self) -> u8 {
        percent_complete(
            self.processed.load(Ordering::SeqCst),
            self.batch.load(Ordering::SeqCst),
        )
    }
}
