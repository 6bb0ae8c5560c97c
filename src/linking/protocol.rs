//! Code verification protocol: local shape checks, one lookup, handoff.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::LookupError;
use crate::store::{CLIENTS_COLLECTION, ClientDirectory, EqualityQuery, SHARE_CODE_FIELD};

use super::code::{CodeEntry, CodeFormatError, ShareCode};

/// Where a linking session is in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Entering,
    Validating,
    Submitting,
    /// Match shown to the user; handoff pending.
    Found,
}

/// Found client, handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientBinding {
    pub client_id: String,
    pub client_display_name: String,
}

/// Result of one verify attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LinkOutcome {
    Linked(ClientBinding),
    Incomplete,
    BadFormat,
    NotFound,
    PermissionError,
    TransientError,
    /// Another verify is still running for this session.
    Busy,
}

impl LinkOutcome {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Linked(_) => "Client found! Opening their profile...",
            Self::Incomplete => "Please complete the 8-character code.",
            Self::BadFormat => "Invalid code format. Codes look like DYN-XXXXX.",
            Self::NotFound => "Invalid code or client not found.",
            Self::PermissionError => {
                "Access denied while searching for the client. Check the database access rules."
            }
            Self::TransientError => "Could not verify the code. Please try again.",
            Self::Busy => "Verification already in progress.",
        }
    }

    pub fn is_linked(&self) -> bool {
        matches!(self, Self::Linked(_))
    }
}

impl From<&CodeFormatError> for LinkOutcome {
    fn from(e: &CodeFormatError) -> Self {
        match e {
            CodeFormatError::Incomplete { .. } => Self::Incomplete,
            CodeFormatError::BadPrefix { .. } | CodeFormatError::BadSuffix { .. } => {
                Self::BadFormat
            }
        }
    }
}

/// Serializable snapshot of a session.
#[derive(Debug, Clone, Serialize)]
pub struct LinkingStatus {
    pub state: LinkState,
    pub entry: CodeEntry,
}

/// One professional's code-entry screen.
///
/// At most one lookup is outstanding per session; the entered code is kept
/// across failed attempts and cleared only after a handoff.
pub struct LinkingSession {
    directory: Arc<dyn ClientDirectory>,
    handoff_delay: Duration,
    entry: Mutex<CodeEntry>,
    state: RwLock<LinkState>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however verify exits.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl LinkingSession {
    pub fn new(directory: Arc<dyn ClientDirectory>, handoff_delay: Duration) -> Self {
        Self {
            directory,
            handoff_delay,
            entry: Mutex::new(CodeEntry::new()),
            state: RwLock::new(LinkState::Entering),
            in_flight: AtomicBool::new(false),
        }
    }

    pub async fn state(&self) -> LinkState {
        *self.state.read().await
    }

    pub async fn entry(&self) -> CodeEntry {
        self.entry.lock().await.clone()
    }

    pub async fn status(&self) -> LinkingStatus {
        LinkingStatus {
            state: self.state().await,
            entry: self.entry().await,
        }
    }

    /// Type into one slot. Returns `false` while a verify is running.
    pub async fn type_char(&self, index: usize, ch: char) -> bool {
        self.edit_entry(|entry| entry.type_char(index, ch)).await
    }

    /// Clear one slot. Returns `false` while a verify is running.
    pub async fn backspace(&self, index: usize) -> bool {
        self.edit_entry(|entry| entry.backspace(index)).await
    }

    /// Replace the whole entry. Returns `false` while a verify is running.
    pub async fn paste(&self, raw: &str) -> bool {
        self.edit_entry(|entry| entry.paste(raw)).await
    }

    /// The flag is checked under the entry lock, so an edit either lands
    /// before verify reads the code or is refused.
    async fn edit_entry(&self, f: impl FnOnce(&mut CodeEntry)) -> bool {
        let mut entry = self.entry.lock().await;
        if self.in_flight.load(Ordering::Acquire) {
            debug!("Entry edit refused: verify in flight");
            return false;
        }
        f(&mut entry);
        true
    }

    async fn set_state(&self, state: LinkState) {
        *self.state.write().await = state;
    }

    /// Verify the entered code.
    ///
    /// Shape failures return without touching the directory. A match is
    /// acknowledged for the handoff delay, then the entry is reset.
    pub async fn verify(&self) -> LinkOutcome {
        self.run_verify(None).await
    }

    /// Replace the entry with `raw` and verify it as one step.
    ///
    /// The paste only happens once this call owns the session, so a `Busy`
    /// answer leaves the code of the running lookup in place.
    pub async fn verify_code(&self, raw: &str) -> LinkOutcome {
        self.run_verify(Some(raw)).await
    }

    async fn run_verify(&self, raw: Option<&str>) -> LinkOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Verify ignored: lookup already in flight");
            return LinkOutcome::Busy;
        }
        let _guard = InFlight(&self.in_flight);

        self.set_state(LinkState::Validating).await;
        let parsed = {
            let mut entry = self.entry.lock().await;
            if let Some(raw) = raw {
                entry.paste(raw);
            }
            entry.share_code()
        };
        let code = match parsed {
            Ok(code) => code,
            Err(e) => {
                debug!(error = %e, "Code rejected locally");
                self.set_state(LinkState::Entering).await;
                return LinkOutcome::from(&e);
            }
        };

        self.set_state(LinkState::Submitting).await;
        let binding = match self.lookup(&code).await {
            Ok(Some(binding)) => binding,
            Ok(None) => {
                info!(code = %code, "No client for share code");
                self.set_state(LinkState::Entering).await;
                return LinkOutcome::NotFound;
            }
            Err(LookupError::PermissionDenied { collection }) => {
                warn!(collection = %collection, "Permission denied looking up share code");
                self.set_state(LinkState::Entering).await;
                return LinkOutcome::PermissionError;
            }
            Err(e) => {
                warn!(error = %e, "Share code lookup failed");
                self.set_state(LinkState::Entering).await;
                return LinkOutcome::TransientError;
            }
        };

        self.set_state(LinkState::Found).await;
        info!(client_id = %binding.client_id, "Client found for share code");
        if !self.handoff_delay.is_zero() {
            tokio::time::sleep(self.handoff_delay).await;
        }

        self.entry.lock().await.reset();
        self.set_state(LinkState::Entering).await;
        LinkOutcome::Linked(binding)
    }

    /// Single round trip; the first record wins.
    async fn lookup(&self, code: &ShareCode) -> Result<Option<ClientBinding>, LookupError> {
        let query = EqualityQuery::new(CLIENTS_COLLECTION, SHARE_CODE_FIELD, code.as_str());
        let records = self.directory.find_equal(&query).await?;
        if records.len() > 1 {
            warn!(code = %code, matches = records.len(), "Share code matches several clients");
        }
        Ok(records.into_iter().next().map(|r| ClientBinding {
            client_id: r.id,
            client_display_name: r.name,
        }))
    }
}
