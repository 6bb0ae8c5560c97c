//! Per-client meal plans, written by a linked professional.

pub mod model;
pub mod routes;

pub use model::{Meal, MealPlan, MealPlanUpdate};
pub use routes::{NutritionRouteState, PROFESSIONAL_HEADER, nutrition_routes};
