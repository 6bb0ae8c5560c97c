//! libSQL backend implementing every collaborator trait.
//!
//! Supports local file and in-memory databases. Password hashing runs on
//! the blocking pool.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AccountError, DatabaseError, LookupError};
use crate::linking::ShareCode;
use crate::nutrition::{Meal, MealPlan};
use crate::onboarding::validation::MIN_PASSWORD_LEN;
use crate::onboarding::{AccountId, NewAccount};
use crate::store::migrations;
use crate::store::traits::{
    AccountCreator, CLIENTS_COLLECTION, ClientDirectory, ClientRecord, EqualityQuery,
    MealPlanStore, TrackingStore,
};
use crate::tracking::DailyLog;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Client attributes that may be used in an equality lookup, mapped to
/// their column. Anything else is refused as a permission failure.
const LOOKUP_COLUMNS: &[(&str, &str)] = &[
    ("share_code", "share_code"),
    ("id", "id"),
    ("email", "email"),
];

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    bcrypt_cost: u32,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        };
        migrations::run_migrations(backend.conn()).await?;
        Ok(backend)
    }

    /// Override the bcrypt work factor (tests use the minimum).
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn email_registered(&self, email: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM users WHERE email = ?1", params![email])
            .await
            .map_err(|e| DatabaseError::Query(format!("email_registered: {e}")))?;
        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0) > 0),
            Ok(None) => Ok(false),
            Err(e) => Err(DatabaseError::Query(format!("email_registered: {e}"))),
        }
    }

    /// Share code assigned to an account at creation.
    pub async fn share_code_for(&self, account_id: &str) -> Result<Option<ShareCode>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT share_code FROM users WHERE id = ?1",
                params![account_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("share_code_for: {e}")))?;
        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("share_code_for row: {e}")))?;
                ShareCode::parse(&raw)
                    .map(Some)
                    .map_err(|e| DatabaseError::Serialization(format!("share_code {raw:?}: {e}")))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("share_code_for: {e}"))),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn opt_real(v: Option<f64>) -> libsql::Value {
    match v {
        Some(v) => libsql::Value::Real(v),
        None => libsql::Value::Null,
    }
}

fn is_unique_violation(e: &libsql::Error) -> bool {
    e.to_string().contains("UNIQUE constraint failed")
}

/// Map a libsql Row to a DailyLog.
///
/// Column order: 0:client_id, 1:date, 2:calories_kcal, 3:weight_kg,
/// 4:water_ml, 5:protein_g, 6:carbs_g, 7:fat_g
fn row_to_log(row: &libsql::Row) -> Result<DailyLog, DatabaseError> {
    let read = |e: libsql::Error| DatabaseError::Query(format!("daily_logs row: {e}"));
    let date_str: String = row.get(1).map_err(read)?;
    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .map_err(|e| DatabaseError::Serialization(format!("date {date_str:?}: {e}")))?;
    let count = |i: i32| -> Result<u32, DatabaseError> {
        let v: i64 = row.get(i).map_err(read)?;
        u32::try_from(v).map_err(|_| DatabaseError::Serialization(format!("column {i}: {v}")))
    };

    Ok(DailyLog {
        client_id: row.get(0).map_err(read)?,
        date,
        calories_kcal: count(2)?,
        weight_kg: row.get::<f64>(3).ok(),
        water_ml: count(4)?,
        protein_g: row.get(5).map_err(read)?,
        carbs_g: row.get(6).map_err(read)?,
        fat_g: row.get(7).map_err(read)?,
    })
}

/// Map a libsql Row to a MealPlan.
///
/// Column order: 0:client_id, 1:meals, 2:notes, 3:updated_by, 4:updated_at
fn row_to_plan(row: &libsql::Row) -> Result<MealPlan, DatabaseError> {
    let read = |e: libsql::Error| DatabaseError::Query(format!("meal_plans row: {e}"));
    let meals_json: String = row.get(1).map_err(read)?;
    let meals: Vec<Meal> = serde_json::from_str(&meals_json)
        .map_err(|e| DatabaseError::Serialization(format!("meals: {e}")))?;
    let updated_str: String = row.get(4).map_err(read)?;

    Ok(MealPlan {
        client_id: row.get(0).map_err(read)?,
        meals,
        notes: row.get(2).ok(),
        updated_by: row.get(3).ok(),
        updated_at: parse_datetime(&updated_str),
    })
}

// ── Accounts ────────────────────────────────────────────────────────

#[async_trait]
impl AccountCreator for LibSqlBackend {
    async fn create_account(&self, account: &NewAccount) -> Result<AccountId, AccountError> {
        let password = account.password_owned();
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::WeakPassword);
        }
        if !account.email.contains('@') {
            return Err(AccountError::InvalidEmail);
        }
        if self.email_registered(&account.email).await? {
            return Err(AccountError::EmailInUse {
                email: account.email.clone(),
            });
        }

        let cost = self.bcrypt_cost;
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AccountError::Failed(format!("hash task: {e}")))?
            .map_err(|e| AccountError::Failed(format!("hash: {e}")))?;

        let id = Uuid::new_v4().to_string();
        let share_code = ShareCode::generate(&mut rand::thread_rng());

        let inserted = self
            .conn()
            .execute(
                "INSERT INTO users (id, name, email, password_hash, age, height_cm, gender, activity_level, current_weight_kg, target_weight_kg, objective, share_code, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    id.clone(),
                    account.name.clone(),
                    account.email.clone(),
                    password_hash,
                    i64::from(account.age),
                    account.height_cm,
                    account.gender.to_string(),
                    account.activity_level.to_string(),
                    account.current_weight_kg,
                    account.target_weight_kg,
                    account.objective.to_string(),
                    share_code.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await;

        match inserted {
            Ok(_) => {
                info!(account_id = %id, share_code = %share_code, "Account created");
                Ok(AccountId(id))
            }
            // Lost a race with a concurrent registration of the same email.
            Err(e) if is_unique_violation(&e) => Err(AccountError::EmailInUse {
                email: account.email.clone(),
            }),
            Err(e) => Err(DatabaseError::Query(format!("create_account: {e}")).into()),
        }
    }
}

// ── Client lookup ───────────────────────────────────────────────────

#[async_trait]
impl ClientDirectory for LibSqlBackend {
    async fn find_equal(&self, query: &EqualityQuery) -> Result<Vec<ClientRecord>, LookupError> {
        if query.collection != CLIENTS_COLLECTION {
            return Err(LookupError::PermissionDenied {
                collection: query.collection.clone(),
            });
        }
        let Some((_, column)) = LOOKUP_COLUMNS.iter().find(|(f, _)| *f == query.field) else {
            return Err(LookupError::PermissionDenied {
                collection: format!("{}.{}", query.collection, query.field),
            });
        };

        let mut rows = self
            .conn()
            .query(
                &format!("SELECT id, name FROM users WHERE {column} = ?1 ORDER BY rowid"),
                params![query.value.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_equal: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("find_equal: {e}")))?
        {
            records.push(ClientRecord {
                id: row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("find_equal row: {e}")))?,
                name: row
                    .get(1)
                    .map_err(|e| DatabaseError::Query(format!("find_equal row: {e}")))?,
            });
        }
        debug!(field = %query.field, matches = records.len(), "Client lookup");
        Ok(records)
    }
}

// ── Tracking ────────────────────────────────────────────────────────

#[async_trait]
impl TrackingStore for LibSqlBackend {
    async fn upsert_daily_log(&self, log: &DailyLog) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO daily_logs (client_id, date, calories_kcal, weight_kg, water_ml, protein_g, carbs_g, fat_g, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, datetime('now'))
                 ON CONFLICT(client_id, date) DO UPDATE SET
                    calories_kcal = excluded.calories_kcal,
                    weight_kg = excluded.weight_kg,
                    water_ml = excluded.water_ml,
                    protein_g = excluded.protein_g,
                    carbs_g = excluded.carbs_g,
                    fat_g = excluded.fat_g,
                    updated_at = excluded.updated_at",
                params![
                    log.client_id.as_str(),
                    log.date.format(DATE_FORMAT).to_string(),
                    i64::from(log.calories_kcal),
                    opt_real(log.weight_kg),
                    i64::from(log.water_ml),
                    log.protein_g,
                    log.carbs_g,
                    log.fat_g,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_daily_log: {e}")))?;
        debug!(client_id = %log.client_id, date = %log.date, "Daily log upserted");
        Ok(())
    }

    async fn list_daily_logs(
        &self,
        client_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<DailyLog>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT client_id, date, calories_kcal, weight_kg, water_ml, protein_g, carbs_g, fat_g
                 FROM daily_logs WHERE client_id = ?1 AND date >= ?2 ORDER BY date ASC",
                params![client_id, since.format(DATE_FORMAT).to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_daily_logs: {e}")))?;

        let mut logs = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_daily_logs: {e}")))?
        {
            match row_to_log(&row) {
                Ok(log) => logs.push(log),
                Err(e) => warn!(client_id, error = %e, "Skipping unreadable daily log"),
            }
        }
        Ok(logs)
    }
}

// ── Meal plans ──────────────────────────────────────────────────────

#[async_trait]
impl MealPlanStore for LibSqlBackend {
    async fn get_meal_plan(&self, client_id: &str) -> Result<Option<MealPlan>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT client_id, meals, notes, updated_by, updated_at FROM meal_plans WHERE client_id = ?1",
                params![client_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_meal_plan: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_plan(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_meal_plan: {e}"))),
        }
    }

    async fn put_meal_plan(&self, plan: &MealPlan) -> Result<(), DatabaseError> {
        let meals_json = serde_json::to_string(&plan.meals)
            .map_err(|e| DatabaseError::Serialization(format!("meals: {e}")))?;
        self.conn()
            .execute(
                "INSERT INTO meal_plans (client_id, meals, notes, updated_by, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(client_id) DO UPDATE SET
                    meals = excluded.meals,
                    notes = excluded.notes,
                    updated_by = excluded.updated_by,
                    updated_at = excluded.updated_at",
                params![
                    plan.client_id.as_str(),
                    meals_json,
                    opt_text(plan.notes.as_deref()),
                    opt_text(plan.updated_by.as_deref()),
                    plan.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("put_meal_plan: {e}")))?;
        Ok(())
    }
}
