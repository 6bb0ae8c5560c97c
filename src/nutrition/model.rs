//! Meal plan documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrackingError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub name: String,
    /// Free-form time of day, e.g. "07:30".
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub calories_kcal: u32,
}

/// A client's current plan. Replaced wholesale on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub client_id: String,
    pub meals: Vec<Meal>,
    pub notes: Option<String>,
    /// Professional who last wrote the plan, if known.
    pub updated_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for replacing a plan.
#[derive(Debug, Clone, Deserialize)]
pub struct MealPlanUpdate {
    pub meals: Vec<Meal>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl MealPlanUpdate {
    pub fn validate(&self) -> Result<(), TrackingError> {
        if let Some(idx) = self.meals.iter().position(|m| m.name.trim().is_empty()) {
            return Err(TrackingError::InvalidValue {
                field: "meals",
                reason: format!("meal {} has an empty name", idx + 1),
            });
        }
        Ok(())
    }

    /// Stamp the update into a stored plan.
    pub fn into_plan(self, client_id: impl Into<String>, now: DateTime<Utc>) -> MealPlan {
        let meals = self
            .meals
            .into_iter()
            .map(|m| Meal {
                name: m.name.trim().to_string(),
                ..m
            })
            .collect();
        MealPlan {
            client_id: client_id.into(),
            meals,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            updated_by: self.updated_by.filter(|p| !p.trim().is_empty()),
            updated_at: now,
        }
    }
}
