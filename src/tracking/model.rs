//! Daily metric logs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::TrackingError;

/// One client's metrics for one calendar day.
///
/// There is at most one log per `(client_id, date)`; a second write for
/// the same day replaces the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    pub client_id: String,
    pub date: NaiveDate,
    pub calories_kcal: u32,
    /// Not every day has a weigh-in.
    pub weight_kg: Option<f64>,
    pub water_ml: u32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl DailyLog {
    /// Reject negative or non-finite macros and a non-positive weight.
    pub fn validate(&self) -> Result<(), TrackingError> {
        if self.client_id.trim().is_empty() {
            return Err(TrackingError::InvalidValue {
                field: "client_id",
                reason: "must not be empty".into(),
            });
        }
        for (field, value) in [
            ("protein_g", self.protein_g),
            ("carbs_g", self.carbs_g),
            ("fat_g", self.fat_g),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TrackingError::InvalidValue {
                    field,
                    reason: format!("{value} is not a non-negative number"),
                });
            }
        }
        if let Some(weight) = self.weight_kg {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(TrackingError::InvalidValue {
                    field: "weight_kg",
                    reason: format!("{weight} is not a positive number"),
                });
            }
        }
        Ok(())
    }
}

/// Request body for recording a day; the client comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub calories_kcal: u32,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub water_ml: u32,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
}

impl LogEntry {
    pub fn into_log(self, client_id: impl Into<String>) -> DailyLog {
        DailyLog {
            client_id: client_id.into(),
            date: self.date,
            calories_kcal: self.calories_kcal,
            weight_kg: self.weight_kg,
            water_ml: self.water_ml,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fat_g: self.fat_g,
        }
    }
}
