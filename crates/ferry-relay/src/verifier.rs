// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential verification against the platform's identity endpoint.

use std::sync::Arc;

use ferry_core::{FerryError, Identity, PlatformAdapter};
use tracing::{info, warn};

/// Resolves a credential to the bot identity it belongs to.
#[derive(Clone)]
pub struct Verifier {
    platform: Arc<dyn PlatformAdapter>,
}

impl Verifier {
    pub fn new(platform: Arc<dyn PlatformAdapter>) -> Self {
        Self { platform }
    }

    /// One `getMe` round trip.
    ///
    /// Fails with [`FerryError::Auth`] if the platform rejects the credential
    /// (or it is blank) and [`FerryError::Connectivity`] on transport failure.
    pub async fn verify(&self, credential: &str) -> Result<Identity, FerryError> {
        if credential.trim().is_empty() {
            return Err(FerryError::Auth {
                reason: "credential is empty".into(),
            });
        }

        match self.platform.get_me(credential).await {
            Ok(identity) => {
                info!(bot = %identity.resolved_name, "credential verified");
                Ok(identity)
            }
            Err(e) => {
                warn!(error = %e, "credential verification failed");
                Err(e)
            }
        }
    }
}
