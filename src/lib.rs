//! FitLink: client onboarding, professional linking and progress tracking.

pub mod api;
pub mod config;
pub mod error;
pub mod linking;
pub mod nutrition;
pub mod onboarding;
pub mod session;
pub mod store;
pub mod tracking;
