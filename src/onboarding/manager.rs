//! Owns live wizard instances and hands finished registrations to the
//! account creator.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::session::SessionHub;
use crate::store::AccountCreator;

use super::model::FieldEdit;
use super::wizard::{AdvanceOutcome, EditRejected, Wizard, WizardStatus};

/// Why a manager call could not reach a wizard.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("Wizard {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Edit(#[from] EditRejected),
}

struct Slot {
    wizard: Arc<Mutex<Wizard>>,
    touched: DateTime<Utc>,
}

/// Registry of in-progress registrations.
///
/// Each wizard sits behind its own mutex so a slow account creation only
/// blocks the wizard that is submitting.
pub struct WizardManager {
    creator: Arc<dyn AccountCreator>,
    sessions: Arc<SessionHub>,
    wizards: RwLock<HashMap<Uuid, Slot>>,
}

impl WizardManager {
    pub fn new(creator: Arc<dyn AccountCreator>, sessions: Arc<SessionHub>) -> Self {
        Self {
            creator,
            sessions,
            wizards: RwLock::new(HashMap::new()),
        }
    }

    /// Start a new empty wizard.
    pub async fn start(&self) -> (Uuid, WizardStatus) {
        let id = Uuid::new_v4();
        let wizard = Wizard::new();
        let status = wizard.status();
        self.wizards.write().await.insert(
            id,
            Slot {
                wizard: Arc::new(Mutex::new(wizard)),
                touched: Utc::now(),
            },
        );
        info!(wizard_id = %id, "Registration wizard started");
        (id, status)
    }

    /// Look up a wizard and mark it as used.
    async fn get(&self, id: Uuid) -> Result<Arc<Mutex<Wizard>>, WizardError> {
        let mut wizards = self.wizards.write().await;
        let slot = wizards.get_mut(&id).ok_or(WizardError::NotFound(id))?;
        slot.touched = Utc::now();
        Ok(Arc::clone(&slot.wizard))
    }

    pub async fn status(&self, id: Uuid) -> Result<WizardStatus, WizardError> {
        let wizard = self.get(id).await?;
        let status = wizard.lock().await.status();
        Ok(status)
    }

    pub async fn edit(&self, id: Uuid, edit: FieldEdit) -> Result<WizardStatus, WizardError> {
        let wizard = self.get(id).await?;
        let mut wizard = wizard.lock().await;
        wizard.edit(edit)?;
        Ok(wizard.status())
    }

    /// Advance the wizard; on a successful submission the wizard is
    /// discarded and a sign-in is published.
    pub async fn advance(&self, id: Uuid) -> Result<AdvanceOutcome, WizardError> {
        let wizard = self.get(id).await?;
        let mut wizard = wizard.lock().await;

        let outcome = wizard.advance(self.creator.as_ref()).await;
        match &outcome {
            AdvanceOutcome::Advanced { step, .. } => {
                info!(wizard_id = %id, step = %step, "Wizard advanced");
            }
            AdvanceOutcome::Rejected(rejection) => {
                info!(
                    wizard_id = %id,
                    step = %rejection.errors.step(),
                    failing = rejection.errors.len(),
                    "Wizard step rejected"
                );
            }
            AdvanceOutcome::Submitted { account_id } => {
                info!(wizard_id = %id, account_id = %account_id, "Registration submitted");
                if let Some(email) = wizard.submitted_email() {
                    self.sessions
                        .signed_in(account_id.clone(), email.to_string())
                        .await;
                }
            }
            AdvanceOutcome::SubmitFailed { .. } | AdvanceOutcome::AlreadySubmitted => {}
        }
        drop(wizard);

        if matches!(outcome, AdvanceOutcome::Submitted { .. }) {
            self.wizards.write().await.remove(&id);
        }
        Ok(outcome)
    }

    /// Drop a wizard without submitting. Returns whether it existed.
    pub async fn abandon(&self, id: Uuid) -> bool {
        let removed = self.wizards.write().await.remove(&id).is_some();
        if removed {
            info!(wizard_id = %id, "Registration wizard abandoned");
        }
        removed
    }

    /// Drop wizards nobody has touched for `ttl`, which is how a client
    /// that navigated away is cleaned up. Returns how many were dropped.
    pub async fn expire_idle(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        match Utc::now().checked_sub_signed(ttl) {
            Some(cutoff) => self.expire_untouched_since(cutoff).await,
            None => 0,
        }
    }

    async fn expire_untouched_since(&self, cutoff: DateTime<Utc>) -> usize {
        let mut wizards = self.wizards.write().await;
        let before = wizards.len();
        wizards.retain(|id, slot| {
            let keep = slot.touched > cutoff;
            if !keep {
                debug!(wizard_id = %id, "Registration wizard expired");
            }
            keep
        });
        let expired = before - wizards.len();
        if expired > 0 {
            info!(count = expired, "Expired idle registration wizards");
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.wizards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.wizards.read().await.is_empty()
    }
}
