//! The four-step registration wizard.
//!
//! A wizard walks Identity → Body → Goals → Credentials. Each advance
//! validates only the active step; the last one hands the assembled
//! account to an [`AccountCreator`](crate::store::AccountCreator).

pub mod manager;
pub mod model;
pub mod routes;
pub mod state;
pub mod validation;
pub mod wizard;

pub use manager::{WizardError, WizardManager};
pub use model::{
    AccountId, ActivityLevel, Field, FieldEdit, Gender, NewAccount, Objective, RegistrationDraft,
};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use state::WizardStep;
pub use validation::{FieldErrorKind, StepErrors, StepRejection, validate_step};
pub use wizard::{AdvanceOutcome, Transition, Wizard, WizardStatus};
