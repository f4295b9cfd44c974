//! Identity admin operations and the wipe gate.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use rollcall_core::member::MemberProfile;
use rollcall_protocol::{display_name_is_well_formed, MemberId};
use rollcall_store::{IdentityRecord, IdentityStore, StoreError};

/// Error type for the operations surface.
#[derive(Debug, Error)]
pub enum OpsError {
    #[error("display name must contain a first and a last name")]
    MalformedDisplayName,
    #[error("no wipe confirmation pending")]
    NoPendingConfirmation,
    #[error("wipe confirmation phrase did not match")]
    ConfirmationMismatch,
    #[error("wipe confirmation window expired")]
    ConfirmationExpired,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
struct PendingWipe {
    phrase: String,
    expires_at: Instant,
}

/// Pre-authorized identity administration over the injected store.
///
/// The destructive bulk wipe is two-step: [`IdentityOps::request_wipe`]
/// issues a one-time confirmation phrase valid for the configured window,
/// and only [`IdentityOps::confirm_wipe`] with that literal phrase inside
/// the window mutates anything. A wrong phrase or an expired window
/// cancels the pending request without touching the store.
pub struct IdentityOps {
    store: Arc<dyn IdentityStore>,
    pending_wipe: Mutex<Option<PendingWipe>>,
    confirmation_window: Duration,
}

impl IdentityOps {
    pub fn new(store: Arc<dyn IdentityStore>, confirmation_window: Duration) -> Self {
        Self {
            store,
            pending_wipe: Mutex::new(None),
            confirmation_window,
        }
    }

    /// Upsert a member's identity record, deriving first and last name
    /// from their current display name.
    pub async fn add_or_update_identity(
        &self,
        profile: &MemberProfile,
        external_id: &str,
    ) -> Result<IdentityRecord, OpsError> {
        let display_name = profile.display_name.as_deref();
        if !display_name_is_well_formed(display_name) {
            return Err(OpsError::MalformedDisplayName);
        }
        let mut tokens = display_name.unwrap_or_default().split_whitespace();
        let first_name = tokens.next().unwrap_or_default().to_string();
        let last_name = tokens.collect::<Vec<_>>().join(" ");

        let record = IdentityRecord::new(profile.id.clone(), first_name, last_name, external_id);
        self.store.upsert(record.clone()).await?;
        info!(member = %profile.id, "identity record upserted by admin");
        Ok(record)
    }

    pub async fn get_identity(
        &self,
        member_id: &MemberId,
    ) -> Result<Option<IdentityRecord>, OpsError> {
        Ok(self.store.lookup(member_id).await?)
    }

    pub async fn list_identities(&self) -> Result<Vec<IdentityRecord>, OpsError> {
        Ok(self.store.list_all().await?)
    }

    /// Arm the wipe gate and return the phrase the caller must echo back.
    pub fn request_wipe(&self) -> String {
        let phrase = format!("wipe-{}", Uuid::new_v4().simple());
        let pending = PendingWipe {
            phrase: phrase.clone(),
            expires_at: Instant::now() + self.confirmation_window,
        };
        warn!(
            window_secs = self.confirmation_window.as_secs(),
            "bulk identity wipe requested; awaiting confirmation"
        );
        *self
            .pending_wipe
            .lock()
            .expect("wipe gate poisoned") = Some(pending);
        phrase
    }

    /// Execute the wipe if `phrase` matches the pending request inside its
    /// window. Any failure consumes the pending request, so a new
    /// `request_wipe` is required to try again.
    pub async fn confirm_wipe(&self, phrase: &str) -> Result<(), OpsError> {
        let pending = self
            .pending_wipe
            .lock()
            .expect("wipe gate poisoned")
            .take()
            .ok_or(OpsError::NoPendingConfirmation)?;

        if Instant::now() > pending.expires_at {
            warn!("wipe confirmation arrived after the window; aborted");
            return Err(OpsError::ConfirmationExpired);
        }
        if pending.phrase != phrase {
            warn!("wipe confirmation phrase mismatch; aborted");
            return Err(OpsError::ConfirmationMismatch);
        }

        self.store.wipe_all().await?;
        info!("all identity records wiped");
        Ok(())
    }
}
