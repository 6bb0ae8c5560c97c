//! Session hub: explicit subscription interface for auth state changes.
//!
//! Hosts either subscribe to the broadcast stream or poll `current()`.
//! Producers only publish results; nothing here knows how sign-in happened.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::info;

use crate::onboarding::AccountId;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// An auth state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn { account_id: AccountId, email: String },
    SignedOut { account_id: AccountId },
}

/// Last known signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub account_id: AccountId,
    pub email: String,
}

pub struct SessionHub {
    current: RwLock<Option<SessionInfo>>,
    tx: broadcast::Sender<AuthEvent>,
}

impl SessionHub {
    pub fn new() -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            current: RwLock::new(None),
            tx,
        })
    }

    /// Subscribe to auth events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }

    /// The signed-in account, if any.
    pub async fn current(&self) -> Option<SessionInfo> {
        self.current.read().await.clone()
    }

    pub async fn signed_in(&self, account_id: AccountId, email: String) {
        info!(account_id = %account_id, "Session signed in");
        *self.current.write().await = Some(SessionInfo {
            account_id: account_id.clone(),
            email: email.clone(),
        });
        // Ok if nobody is listening
        let _ = self.tx.send(AuthEvent::SignedIn { account_id, email });
    }

    pub async fn signed_out(&self) {
        let previous = self.current.write().await.take();
        if let Some(session) = previous {
            info!(account_id = %session.account_id, "Session signed out");
            let _ = self.tx.send(AuthEvent::SignedOut {
                account_id: session.account_id,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_is_broadcast_and_pollable() {
        let hub = SessionHub::new();
        let mut rx = hub.subscribe();

        hub.signed_in(AccountId("u1".into()), "ana@example.com".into())
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            AuthEvent::SignedIn {
                account_id: AccountId("u1".into()),
                email: "ana@example.com".into(),
            }
        );
        assert_eq!(
            hub.current().await.map(|s| s.account_id),
            Some(AccountId("u1".into()))
        );
    }

    #[tokio::test]
    async fn sign_out_without_session_is_silent() {
        let hub = SessionHub::new();
        let mut rx = hub.subscribe();

        hub.signed_out().await;
        assert!(rx.try_recv().is_err());

        hub.signed_in(AccountId("u2".into()), "b@c.de".into()).await;
        hub.signed_out().await;
        let _ = rx.recv().await.unwrap();
        assert!(matches!(rx.recv().await.unwrap(), AuthEvent::SignedOut { .. }));
        assert!(hub.current().await.is_none());
    }
}
