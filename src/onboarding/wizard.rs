//! A single registration wizard instance: draft, current step, and errors.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::AccountError;
use crate::store::AccountCreator;

use super::model::{AccountId, Field, FieldEdit, NewAccount, RegistrationDraft};
use super::state::WizardStep;
use super::validation::{
    BodyValues, GoalValues, IdentityValues, StepErrors, StepRejection, StepValues, validate_step,
};

/// Accepted slices of the steps already passed.
#[derive(Debug)]
enum Stage {
    Identity,
    Body {
        identity: IdentityValues,
    },
    Goals {
        identity: IdentityValues,
        body: BodyValues,
    },
    Credentials {
        identity: IdentityValues,
        body: BodyValues,
        goals: GoalValues,
    },
    Submitted {
        account_id: AccountId,
        email: String,
    },
}

impl Stage {
    fn step(&self) -> WizardStep {
        match self {
            Self::Identity => WizardStep::Identity,
            Self::Body { .. } => WizardStep::Body,
            Self::Goals { .. } => WizardStep::Goals,
            Self::Credentials { .. } => WizardStep::Credentials,
            Self::Submitted { .. } => WizardStep::Submitted,
        }
    }
}

/// Result of the synchronous part of an advance.
#[derive(Debug)]
pub enum Transition {
    /// Moved to the next input step.
    Advance(WizardStep),
    /// Credentials passed; the account is ready for the creator.
    Complete(NewAccount),
    Reject(StepRejection),
    AlreadySubmitted,
}

/// What the caller sees after an advance attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    Advanced { step: WizardStep, progress: f32 },
    Rejected(StepRejection),
    Submitted { account_id: AccountId },
    SubmitFailed { message: String },
    AlreadySubmitted,
}

/// Edit refused because the field is not on the active step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Field {field} is not editable on step {step}")]
pub struct EditRejected {
    pub field: Field,
    pub step: WizardStep,
}

/// Serializable snapshot of a wizard.
#[derive(Debug, Clone, Serialize)]
pub struct WizardStatus {
    pub step: WizardStep,
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<StepErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Default)]
pub struct Wizard {
    draft: RegistrationDraft,
    stage: Stage,
    errors: Option<StepErrors>,
    message: Option<String>,
}

impl Default for Stage {
    fn default() -> Self {
        Self::Identity
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.stage.step()
    }

    pub fn draft(&self) -> &RegistrationDraft {
        &self.draft
    }

    /// Errors from the last failed validation of the current step.
    pub fn errors(&self) -> Option<&StepErrors> {
        self.errors.as_ref()
    }

    pub fn status(&self) -> WizardStatus {
        let step = self.step();
        WizardStatus {
            step,
            progress: step.progress(),
            errors: self.errors.clone().filter(|e| !e.is_empty()),
            message: self.message.clone(),
        }
    }

    /// Apply a user edit. Clears that field's error immediately,
    /// whatever the state of the other fields.
    pub fn edit(&mut self, edit: FieldEdit) -> Result<(), EditRejected> {
        let field = edit.field();
        let step = self.step();
        if field.step() != step {
            return Err(EditRejected { field, step });
        }

        self.draft.apply(edit);
        if let Some(errors) = self.errors.as_mut() {
            let shown = errors.get(field).map(|kind| kind.message(field));
            if errors.clear(field) {
                debug!(field = %field, "Cleared field error on edit");
                if shown.is_some() && self.message.as_deref() == shown {
                    self.message = None;
                }
            }
        }
        Ok(())
    }

    /// Validate the current step and move on if it passes.
    ///
    /// Steps before `Credentials` advance here. At `Credentials` the stage
    /// is left untouched and the assembled account is returned; the caller
    /// reports the creator's answer through [`Wizard::record_submission`];
    /// [`Wizard::advance`] does both.
    pub fn transition(&mut self) -> Transition {
        let step = self.step();
        if step.is_terminal() {
            return Transition::AlreadySubmitted;
        }

        let values = match validate_step(step, &self.draft) {
            Ok(values) => values,
            Err(errors) => {
                let rejection = StepRejection::from(errors.clone());
                self.message = Some(rejection.message.clone());
                self.errors = Some(errors);
                return Transition::Reject(rejection);
            }
        };
        self.errors = None;
        self.message = None;

        let stage = std::mem::take(&mut self.stage);
        let (stage, transition) = match (stage, values) {
            (Stage::Identity, StepValues::Identity(identity)) => {
                (Stage::Body { identity }, Transition::Advance(WizardStep::Body))
            }
            (Stage::Body { identity }, StepValues::Body(body)) => (
                Stage::Goals { identity, body },
                Transition::Advance(WizardStep::Goals),
            ),
            (Stage::Goals { identity, body }, StepValues::Goals(goals)) => (
                Stage::Credentials {
                    identity,
                    body,
                    goals,
                },
                Transition::Advance(WizardStep::Credentials),
            ),
            (
                Stage::Credentials {
                    identity,
                    body,
                    goals,
                },
                StepValues::Credentials(credentials),
            ) => {
                let account = NewAccount::assemble(&identity, &body, &goals, credentials);
                (
                    Stage::Credentials {
                        identity,
                        body,
                        goals,
                    },
                    Transition::Complete(account),
                )
            }
            // validate_step always answers with the values of the step it was given
            (stage, _) => (
                stage,
                Transition::Reject(StepRejection::from(StepErrors::empty(step))),
            ),
        };
        self.stage = stage;
        transition
    }

    /// Record the account creator's answer for a `Complete` transition.
    ///
    /// On failure the wizard stays on `Credentials` with the draft intact.
    pub fn record_submission(
        &mut self,
        email: String,
        result: Result<AccountId, AccountError>,
    ) -> AdvanceOutcome {
        if !matches!(self.stage, Stage::Credentials { .. }) {
            return AdvanceOutcome::AlreadySubmitted;
        }
        match result {
            Ok(account_id) => {
                self.stage = Stage::Submitted {
                    account_id: account_id.clone(),
                    email,
                };
                self.message = None;
                AdvanceOutcome::Submitted { account_id }
            }
            Err(e) => {
                warn!(error = %e, "Account creation failed");
                let message = e.user_message().to_string();
                self.message = Some(message.clone());
                AdvanceOutcome::SubmitFailed { message }
            }
        }
    }

    /// Full advance: validate, and at the last step hand off to `creator`.
    pub async fn advance(&mut self, creator: &dyn AccountCreator) -> AdvanceOutcome {
        match self.transition() {
            Transition::Advance(step) => AdvanceOutcome::Advanced {
                step,
                progress: step.progress(),
            },
            Transition::Reject(rejection) => AdvanceOutcome::Rejected(rejection),
            Transition::AlreadySubmitted => AdvanceOutcome::AlreadySubmitted,
            Transition::Complete(account) => {
                let email = account.email.clone();
                let result = creator.create_account(&account).await;
                self.record_submission(email, result)
            }
        }
    }

    /// Account id once submitted.
    pub fn account_id(&self) -> Option<&AccountId> {
        match &self.stage {
            Stage::Submitted { account_id, .. } => Some(account_id),
            _ => None,
        }
    }

    /// Email the account was created with, once submitted.
    pub fn submitted_email(&self) -> Option<&str> {
        match &self.stage {
            Stage::Submitted { email, .. } => Some(email),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::onboarding::model::{ActivityLevel, Gender, Objective};
    use crate::onboarding::validation::FieldErrorKind;

    /// Records submitted accounts and answers with a canned result.
    struct StubCreator {
        fail_with: Mutex<Option<AccountError>>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl StubCreator {
        fn ok() -> Self {
            Self {
                fail_with: Mutex::new(None),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: AccountError) -> Self {
            Self {
                fail_with: Mutex::new(Some(err)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AccountCreator for StubCreator {
        async fn create_account(&self, account: &NewAccount) -> Result<AccountId, AccountError> {
            self.seen.lock().unwrap().push((
                account.email.clone(),
                account.password.expose_secret().to_string(),
            ));
            match self.fail_with.lock().unwrap().take() {
                Some(err) => Err(err),
                None => Ok(AccountId("acct-1".into())),
            }
        }
    }

    fn fill_identity(w: &mut Wizard) {
        w.edit(FieldEdit::Name("Ana".into())).unwrap();
        w.edit(FieldEdit::Age("29".into())).unwrap();
        w.edit(FieldEdit::HeightCm("165".into())).unwrap();
    }

    fn fill_body(w: &mut Wizard) {
        w.edit(FieldEdit::Gender(Gender::Woman)).unwrap();
        w.edit(FieldEdit::ActivityLevel(ActivityLevel::Light)).unwrap();
    }

    fn fill_goals(w: &mut Wizard) {
        w.edit(FieldEdit::CurrentWeight("70".into())).unwrap();
        w.edit(FieldEdit::TargetWeight("64".into())).unwrap();
        w.edit(FieldEdit::Objective(Objective::Definition)).unwrap();
    }

    fn fill_credentials(w: &mut Wizard) {
        w.edit(FieldEdit::Email("ana@example.com".into())).unwrap();
        w.edit(FieldEdit::Password("secret1".into())).unwrap();
    }

    async fn wizard_at_credentials(creator: &StubCreator) -> Wizard {
        let mut w = Wizard::new();
        fill_identity(&mut w);
        w.advance(creator).await;
        fill_body(&mut w);
        w.advance(creator).await;
        fill_goals(&mut w);
        w.advance(creator).await;
        assert_eq!(w.step(), WizardStep::Credentials);
        w
    }

    #[tokio::test]
    async fn walks_all_steps_and_submits() {
        let creator = StubCreator::ok();
        let mut w = Wizard::new();

        fill_identity(&mut w);
        assert_eq!(
            w.advance(&creator).await,
            AdvanceOutcome::Advanced {
                step: WizardStep::Body,
                progress: 0.5
            }
        );
        fill_body(&mut w);
        assert!(matches!(
            w.advance(&creator).await,
            AdvanceOutcome::Advanced { step: WizardStep::Goals, .. }
        ));
        fill_goals(&mut w);
        assert!(matches!(
            w.advance(&creator).await,
            AdvanceOutcome::Advanced { step: WizardStep::Credentials, progress } if progress == 1.0
        ));
        fill_credentials(&mut w);
        assert_eq!(
            w.advance(&creator).await,
            AdvanceOutcome::Submitted {
                account_id: AccountId("acct-1".into())
            }
        );

        assert_eq!(w.step(), WizardStep::Submitted);
        assert_eq!(w.account_id(), Some(&AccountId("acct-1".into())));
        assert_eq!(w.submitted_email(), Some("ana@example.com"));
        assert_eq!(
            creator.seen.lock().unwrap().as_slice(),
            &[("ana@example.com".to_string(), "secret1".to_string())]
        );
        assert_eq!(w.advance(&creator).await, AdvanceOutcome::AlreadySubmitted);
    }

    #[tokio::test]
    async fn rejection_keeps_step_and_sets_errors() {
        let creator = StubCreator::ok();
        let mut w = Wizard::new();
        w.edit(FieldEdit::Age("29".into())).unwrap();

        let outcome = w.advance(&creator).await;
        let AdvanceOutcome::Rejected(rejection) = outcome else {
            panic!("expected rejection, got {outcome:?}");
        };
        assert_eq!(rejection.message, "Please enter your name.");
        assert_eq!(w.step(), WizardStep::Identity);

        let errors = w.errors().unwrap();
        assert_eq!(errors.get(Field::Name), Some(FieldErrorKind::Missing));
        assert_eq!(errors.get(Field::HeightCm), Some(FieldErrorKind::Missing));
        assert_eq!(errors.get(Field::Age), None);
    }

    #[tokio::test]
    async fn edit_clears_only_that_field_error() {
        let creator = StubCreator::ok();
        let mut w = Wizard::new();
        w.edit(FieldEdit::Age("zero".into())).unwrap();
        w.advance(&creator).await;
        assert_eq!(w.errors().unwrap().len(), 3);

        // name is still empty, but typing into age clears age's error
        w.edit(FieldEdit::Age("3".into())).unwrap();
        let errors = w.errors().unwrap();
        assert_eq!(errors.get(Field::Age), None);
        assert_eq!(errors.get(Field::Name), Some(FieldErrorKind::Missing));
        assert_eq!(errors.get(Field::HeightCm), Some(FieldErrorKind::Missing));

        // clearing to an invalid value still clears the flag; only validation sets it
        w.edit(FieldEdit::Name(String::new())).unwrap();
        assert_eq!(w.errors().unwrap().get(Field::Name), None);
    }

    #[tokio::test]
    async fn edits_outside_current_step_are_refused() {
        let mut w = Wizard::new();
        let err = w.edit(FieldEdit::Email("a@b.co".into())).unwrap_err();
        assert_eq!(
            err,
            EditRejected {
                field: Field::Email,
                step: WizardStep::Identity
            }
        );
        assert!(w.draft().email.is_empty());
    }

    #[tokio::test]
    async fn creator_not_called_before_credentials_pass() {
        let creator = StubCreator::ok();
        let mut w = wizard_at_credentials(&creator).await;
        w.edit(FieldEdit::Email("not-an-email".into())).unwrap();
        w.edit(FieldEdit::Password("secret1".into())).unwrap();

        let outcome = w.advance(&creator).await;
        assert!(matches!(outcome, AdvanceOutcome::Rejected(ref r)
            if r.message == "Please enter a valid email address."));
        assert!(creator.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_submission_stays_on_credentials_and_retries() {
        let creator = StubCreator::failing(AccountError::EmailInUse {
            email: "ana@example.com".into(),
        });
        let mut w = wizard_at_credentials(&creator).await;
        fill_credentials(&mut w);

        let outcome = w.advance(&creator).await;
        assert_eq!(
            outcome,
            AdvanceOutcome::SubmitFailed {
                message: "This email is already in use. Try signing in instead.".into()
            }
        );
        assert_eq!(w.step(), WizardStep::Credentials);
        assert_eq!(w.draft().name, "Ana");

        // correct the email and resubmit without touching earlier steps
        w.edit(FieldEdit::Email("ana2@example.com".into())).unwrap();
        let outcome = w.advance(&creator).await;
        assert!(matches!(outcome, AdvanceOutcome::Submitted { .. }));
        assert_eq!(creator.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn transition_is_pure_on_valid_credentials() {
        let creator = StubCreator::ok();
        let mut w = wizard_at_credentials(&creator).await;
        fill_credentials(&mut w);

        for _ in 0..3 {
            assert!(matches!(w.transition(), Transition::Complete(_)));
            assert_eq!(w.step(), WizardStep::Credentials);
            assert!(w.errors().is_none());
        }
    }

    #[tokio::test]
    async fn submitted_account_carries_every_step() {
        let creator = StubCreator::ok();
        let mut w = wizard_at_credentials(&creator).await;
        fill_credentials(&mut w);

        let Transition::Complete(account) = w.transition() else {
            panic!("expected complete");
        };
        assert_eq!(account.name, "Ana");
        assert_eq!(account.age, 29);
        assert_eq!(account.gender, Gender::Woman);
        assert_eq!(account.activity_level, ActivityLevel::Light);
        assert_eq!(account.target_weight_kg, 64.0);
        assert_eq!(account.objective, Objective::Definition);
    }

    #[test]
    fn status_reports_progress_and_message() {
        let mut w = Wizard::new();
        assert_eq!(w.status().progress, 0.25);
        assert!(w.status().message.is_none());

        w.transition();
        let status = w.status();
        assert_eq!(status.message.as_deref(), Some("Please enter your name."));
        assert_eq!(status.errors.unwrap().len(), 3);
    }

    #[test]
    fn fixing_the_reported_field_clears_its_message() {
        let mut w = Wizard::new();
        w.transition();

        // age is not the field behind the message
        w.edit(FieldEdit::Age("30".into())).unwrap();
        assert_eq!(w.status().message.as_deref(), Some("Please enter your name."));

        w.edit(FieldEdit::Name("Ana".into())).unwrap();
        let status = w.status();
        assert!(status.message.is_none());
        assert_eq!(status.errors.unwrap().get(Field::HeightCm), Some(FieldErrorKind::Missing));
    }
}
