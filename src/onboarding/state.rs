//! Wizard state machine. Tracks which registration step is active.

use serde::{Deserialize, Serialize};

use super::model::Field;

/// Number of input steps before submission.
pub const STEP_COUNT: usize = 4;

/// The steps of the registration wizard.
///
/// Progresses linearly: Identity → Body → Goals → Credentials → Submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Identity,
    Body,
    Goals,
    Credentials,
    Submitted,
}

impl WizardStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: WizardStep) -> bool {
        use WizardStep::*;
        matches!(
            (self, target),
            (Identity, Body) | (Body, Goals) | (Goals, Credentials) | (Credentials, Submitted)
        )
    }

    /// Whether the wizard is done.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<WizardStep> {
        use WizardStep::*;
        match self {
            Identity => Some(Body),
            Body => Some(Goals),
            Goals => Some(Credentials),
            Credentials => Some(Submitted),
            Submitted => None,
        }
    }

    /// Zero-based position of the step.
    pub fn index(&self) -> usize {
        match self {
            Self::Identity => 0,
            Self::Body => 1,
            Self::Goals => 2,
            Self::Credentials => 3,
            Self::Submitted => STEP_COUNT,
        }
    }

    /// Progress bar fraction, `(index + 1) / 4`, clamped to 1.0.
    ///
    /// Purely observable; never used for control flow.
    pub fn progress(&self) -> f32 {
        ((self.index() + 1) as f32 / STEP_COUNT as f32).min(1.0)
    }

    /// Fields owned by this step, in validation order.
    pub fn fields(&self) -> &'static [Field] {
        match self {
            Self::Identity => &[Field::Name, Field::Age, Field::HeightCm],
            Self::Body => &[Field::Gender, Field::ActivityLevel],
            Self::Goals => &[Field::CurrentWeight, Field::TargetWeight, Field::Objective],
            Self::Credentials => &[Field::Email, Field::Password],
            Self::Submitted => &[],
        }
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Identity => "identity",
            Self::Body => "body",
            Self::Goals => "goals",
            Self::Credentials => "credentials",
            Self::Submitted => "submitted",
        };
        write!(f, "{s}")
    }
}
