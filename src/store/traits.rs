//! Collaborator traits, the only seams between the logic cores and storage.
//!
//! Each trait mirrors one external contract: account creation, the client
//! record lookup, daily tracking logs and meal plans. `LibSqlBackend`
//! implements all of them; tests substitute stubs.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{AccountError, DatabaseError, LookupError};
use crate::nutrition::MealPlan;
use crate::onboarding::{AccountId, NewAccount};
use crate::tracking::DailyLog;

/// Collection holding client records.
pub const CLIENTS_COLLECTION: &str = "users";
/// Attribute holding each client's personal share code.
pub const SHARE_CODE_FIELD: &str = "share_code";

/// Creates accounts from a validated registration.
#[async_trait]
pub trait AccountCreator: Send + Sync {
    async fn create_account(&self, account: &NewAccount) -> Result<AccountId, AccountError>;
}

/// `field == value` filter against a named collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualityQuery {
    pub collection: String,
    pub field: String,
    pub value: String,
}

impl EqualityQuery {
    pub fn new(
        collection: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Minimal view of a client record returned by a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientRecord {
    pub id: String,
    pub name: String,
}

/// Record lookup against the client collection.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Return every record matching the query, in store order.
    ///
    /// No results is `Ok(vec![])`, never an error.
    async fn find_equal(&self, query: &EqualityQuery) -> Result<Vec<ClientRecord>, LookupError>;
}

/// Daily metric logs.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Insert or replace the log for `(client_id, date)`.
    async fn upsert_daily_log(&self, log: &DailyLog) -> Result<(), DatabaseError>;

    /// Logs dated on or after `since`, oldest first.
    async fn list_daily_logs(
        &self,
        client_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<DailyLog>, DatabaseError>;
}

/// Meal plan documents, one per client.
#[async_trait]
pub trait MealPlanStore: Send + Sync {
    async fn get_meal_plan(&self, client_id: &str) -> Result<Option<MealPlan>, DatabaseError>;

    /// Replace the client's plan.
    async fn put_meal_plan(&self, plan: &MealPlan) -> Result<(), DatabaseError>;
}
