//! Per-step validation for the registration wizard.
//!
//! Validation is a pure function of the draft: it only ever looks at the
//! fields owned by the step being validated, and it never mutates anything.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::model::{ActivityLevel, Field, Gender, NewAccount, Objective, RegistrationDraft};
use super::state::WizardStep;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Shown when a rejection carries no field-specific message.
pub const FALLBACK_MESSAGE: &str = "Please fill in all fields.";

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Why a single field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldErrorKind {
    Missing,
    NotNumeric,
    NotPositive,
    NotSelected,
    InvalidEmail,
    TooShort { min: usize },
}

impl FieldErrorKind {
    /// User-visible message for this error on `field`.
    pub fn message(&self, field: Field) -> &'static str {
        use FieldErrorKind::*;
        match (field, self) {
            (Field::Name, _) => "Please enter your name.",
            (Field::Age, NotNumeric) => "Age must be a whole number.",
            (Field::Age, NotPositive) => "Age must be greater than zero.",
            (Field::Age, _) => "Please enter your age.",
            (Field::HeightCm, NotNumeric) => "Height must be a number.",
            (Field::HeightCm, NotPositive) => "Height must be greater than zero.",
            (Field::HeightCm, _) => "Please enter your height.",
            (Field::Gender, _) => "Please select your gender.",
            (Field::ActivityLevel, _) => "Please select your activity level.",
            (Field::CurrentWeight, NotNumeric) => "Current weight must be a number.",
            (Field::CurrentWeight, NotPositive) => "Current weight must be greater than zero.",
            (Field::CurrentWeight, _) => "Please enter your current weight.",
            (Field::TargetWeight, NotNumeric) => "Target weight must be a number.",
            (Field::TargetWeight, NotPositive) => "Target weight must be greater than zero.",
            (Field::TargetWeight, _) => "Please enter your target weight.",
            (Field::Objective, _) => "Please select your objective.",
            (Field::Email, InvalidEmail) => "Please enter a valid email address.",
            (Field::Email, _) => "Please enter your email.",
            (Field::Password, TooShort { .. }) => "Password must be at least 6 characters.",
            (Field::Password, _) => "Please enter a password.",
        }
    }
}

/// Errors for the fields of exactly one step.
///
/// Only constructed by validating a step, so it can never hold an error
/// for a field the step does not own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepErrors {
    step: WizardStep,
    fields: BTreeMap<Field, FieldErrorKind>,
}

impl StepErrors {
    pub(super) fn empty(step: WizardStep) -> Self {
        Self {
            step,
            fields: BTreeMap::new(),
        }
    }

    fn record<T>(&mut self, field: Field, result: Result<T, FieldErrorKind>) -> Option<T> {
        debug_assert_eq!(field.step(), self.step);
        match result {
            Ok(value) => Some(value),
            Err(kind) => {
                self.fields.insert(field, kind);
                None
            }
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn get(&self, field: Field) -> Option<FieldErrorKind> {
        self.fields.get(&field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Errors in field order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, FieldErrorKind)> + '_ {
        self.fields.iter().map(|(f, k)| (*f, *k))
    }

    /// Clear the error on `field`. Returns whether one was set.
    pub fn clear(&mut self, field: Field) -> bool {
        self.fields.remove(&field).is_some()
    }

    /// Message of the first failing field, in validation order.
    pub fn first_message(&self) -> Option<&'static str> {
        self.iter().next().map(|(field, kind)| kind.message(field))
    }
}

/// A refused transition: every failing field plus the one message to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRejection {
    pub message: String,
    pub errors: StepErrors,
}

impl From<StepErrors> for StepRejection {
    fn from(errors: StepErrors) -> Self {
        let message = errors
            .first_message()
            .unwrap_or(FALLBACK_MESSAGE)
            .to_string();
        Self { message, errors }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityValues {
    pub name: String,
    pub age: u32,
    pub height_cm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyValues {
    pub gender: Gender,
    pub activity_level: ActivityLevel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalValues {
    pub current_weight_kg: f64,
    pub target_weight_kg: f64,
    pub objective: Objective,
}

#[derive(Debug)]
pub struct CredentialValues {
    pub email: String,
    pub password: SecretString,
}

/// Typed values of a step that passed validation.
#[derive(Debug)]
pub enum StepValues {
    Identity(IdentityValues),
    Body(BodyValues),
    Goals(GoalValues),
    Credentials(CredentialValues),
}

impl NewAccount {
    /// Combine the accepted slices of every step.
    pub fn assemble(
        identity: &IdentityValues,
        body: &BodyValues,
        goals: &GoalValues,
        credentials: CredentialValues,
    ) -> Self {
        Self {
            name: identity.name.clone(),
            age: identity.age,
            height_cm: identity.height_cm,
            gender: body.gender,
            activity_level: body.activity_level,
            current_weight_kg: goals.current_weight_kg,
            target_weight_kg: goals.target_weight_kg,
            objective: goals.objective,
            email: credentials.email,
            password: credentials.password,
        }
    }
}

/// Validate the fields of `step` only.
///
/// Every failing field is recorded; fields are checked in the order
/// returned by [`WizardStep::fields`]. `Submitted` owns no fields and is
/// always rejected with an empty error set.
pub fn validate_step(
    step: WizardStep,
    draft: &RegistrationDraft,
) -> Result<StepValues, StepErrors> {
    let mut errors = StepErrors::empty(step);

    let values = match step {
        WizardStep::Identity => {
            let name = errors.record(Field::Name, required_text(&draft.name));
            let age = errors.record(Field::Age, positive_integer(&draft.age));
            let height_cm = errors.record(Field::HeightCm, positive_number(&draft.height_cm));
            match (name, age, height_cm) {
                (Some(name), Some(age), Some(height_cm)) => Some(StepValues::Identity(
                    IdentityValues {
                        name,
                        age,
                        height_cm,
                    },
                )),
                _ => None,
            }
        }
        WizardStep::Body => {
            let gender = errors.record(Field::Gender, selected(draft.gender));
            let activity_level = errors.record(Field::ActivityLevel, selected(draft.activity_level));
            match (gender, activity_level) {
                (Some(gender), Some(activity_level)) => Some(StepValues::Body(BodyValues {
                    gender,
                    activity_level,
                })),
                _ => None,
            }
        }
        WizardStep::Goals => {
            let current =
                errors.record(Field::CurrentWeight, positive_number(&draft.current_weight));
            let target = errors.record(Field::TargetWeight, positive_number(&draft.target_weight));
            let objective = errors.record(Field::Objective, selected(draft.objective));
            match (current, target, objective) {
                (Some(current_weight_kg), Some(target_weight_kg), Some(objective)) => {
                    Some(StepValues::Goals(GoalValues {
                        current_weight_kg,
                        target_weight_kg,
                        objective,
                    }))
                }
                _ => None,
            }
        }
        WizardStep::Credentials => {
            let email = errors.record(Field::Email, email(&draft.email));
            let password = errors.record(Field::Password, password(&draft.password));
            match (email, password) {
                (Some(email), Some(password)) => Some(StepValues::Credentials(CredentialValues {
                    email,
                    password,
                })),
                _ => None,
            }
        }
        WizardStep::Submitted => None,
    };

    values.ok_or(errors)
}

fn required_text(raw: &str) -> Result<String, FieldErrorKind> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldErrorKind::Missing);
    }
    Ok(trimmed.to_string())
}

fn selected<T: Copy>(choice: Option<T>) -> Result<T, FieldErrorKind> {
    choice.ok_or(FieldErrorKind::NotSelected)
}

/// Parse a decimal typed by the user. Accepts `,` as the decimal separator.
fn positive_number(raw: &str) -> Result<f64, FieldErrorKind> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldErrorKind::Missing);
    }
    let value: f64 = trimmed
        .replace(',', ".")
        .parse()
        .map_err(|_| FieldErrorKind::NotNumeric)?;
    if !value.is_finite() {
        return Err(FieldErrorKind::NotNumeric);
    }
    if value <= 0.0 {
        return Err(FieldErrorKind::NotPositive);
    }
    Ok(value)
}

fn positive_integer(raw: &str) -> Result<u32, FieldErrorKind> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldErrorKind::Missing);
    }
    let value: i64 = trimmed.parse().map_err(|_| FieldErrorKind::NotNumeric)?;
    if value <= 0 {
        return Err(FieldErrorKind::NotPositive);
    }
    u32::try_from(value).map_err(|_| FieldErrorKind::NotNumeric)
}

fn email(raw: &str) -> Result<String, FieldErrorKind> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldErrorKind::Missing);
    }
    if !trimmed.contains('@') || !EMAIL_SHAPE.is_match(trimmed) {
        return Err(FieldErrorKind::InvalidEmail);
    }
    Ok(trimmed.to_lowercase())
}

fn password(raw: &SecretString) -> Result<SecretString, FieldErrorKind> {
    let exposed = raw.expose_secret();
    if exposed.is_empty() {
        return Err(FieldErrorKind::Missing);
    }
    if exposed.chars().count() < MIN_PASSWORD_LEN {
        return Err(FieldErrorKind::TooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(SecretString::from(exposed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::FieldEdit;

    fn draft_with(edits: Vec<FieldEdit>) -> RegistrationDraft {
        let mut draft = RegistrationDraft::default();
        for edit in edits {
            draft.apply(edit);
        }
        draft
    }

    fn complete_draft() -> RegistrationDraft {
        draft_with(vec![
            FieldEdit::Name("Ana".into()),
            FieldEdit::Age("29".into()),
            FieldEdit::HeightCm("165".into()),
            FieldEdit::Gender(Gender::Woman),
            FieldEdit::ActivityLevel(ActivityLevel::Moderate),
            FieldEdit::CurrentWeight("62,5".into()),
            FieldEdit::TargetWeight("58".into()),
            FieldEdit::Objective(Objective::LoseWeight),
            FieldEdit::Email("Ana@Example.com".into()),
            FieldEdit::Password("secret1".into()),
        ])
    }

    #[test]
    fn identity_reports_every_failing_field_but_first_message() {
        let draft = draft_with(vec![FieldEdit::Age("abc".into()), FieldEdit::HeightCm("0".into())]);
        let errors = validate_step(WizardStep::Identity, &draft).unwrap_err();

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get(Field::Name), Some(FieldErrorKind::Missing));
        assert_eq!(errors.get(Field::Age), Some(FieldErrorKind::NotNumeric));
        assert_eq!(errors.get(Field::HeightCm), Some(FieldErrorKind::NotPositive));

        let rejection = StepRejection::from(errors);
        assert_eq!(rejection.message, "Please enter your name.");
    }

    #[test]
    fn first_message_follows_field_order_not_insertion() {
        let draft = draft_with(vec![FieldEdit::Name("Ana".into()), FieldEdit::HeightCm("-4".into())]);
        let rejection = StepRejection::from(validate_step(WizardStep::Identity, &draft).unwrap_err());
        assert_eq!(rejection.message, "Please enter your age.");
    }

    #[test]
    fn later_step_fields_never_checked() {
        // Only identity filled in: every later field is empty.
        let draft = draft_with(vec![
            FieldEdit::Name("Ana".into()),
            FieldEdit::Age("29".into()),
            FieldEdit::HeightCm("165".into()),
        ]);
        let values = validate_step(WizardStep::Identity, &draft).unwrap();
        assert!(matches!(values, StepValues::Identity(ref v) if v.age == 29));
    }

    #[test]
    fn earlier_step_fields_never_checked() {
        // Identity left empty; body step still passes on its own fields.
        let draft = draft_with(vec![
            FieldEdit::Gender(Gender::Man),
            FieldEdit::ActivityLevel(ActivityLevel::Intense),
        ]);
        assert!(validate_step(WizardStep::Body, &draft).is_ok());
        assert!(validate_step(WizardStep::Identity, &draft).is_err());
    }

    #[test]
    fn body_requires_both_selections() {
        let draft = draft_with(vec![FieldEdit::Gender(Gender::Man)]);
        let errors = validate_step(WizardStep::Body, &draft).unwrap_err();
        assert_eq!(errors.get(Field::Gender), None);
        assert_eq!(errors.get(Field::ActivityLevel), Some(FieldErrorKind::NotSelected));
        assert_eq!(
            StepRejection::from(errors).message,
            "Please select your activity level."
        );
    }

    #[test]
    fn goals_accept_comma_decimals() {
        let draft = complete_draft();
        match validate_step(WizardStep::Goals, &draft).unwrap() {
            StepValues::Goals(goals) => {
                assert_eq!(goals.current_weight_kg, 62.5);
                assert_eq!(goals.target_weight_kg, 58.0);
                assert_eq!(goals.objective, Objective::LoseWeight);
            }
            other => panic!("expected goals, got {other:?}"),
        }
    }

    #[test]
    fn goals_reject_missing_objective_and_bad_weights() {
        let draft = draft_with(vec![
            FieldEdit::CurrentWeight("heavy".into()),
            FieldEdit::TargetWeight("0".into()),
        ]);
        let errors = validate_step(WizardStep::Goals, &draft).unwrap_err();
        assert_eq!(errors.get(Field::CurrentWeight), Some(FieldErrorKind::NotNumeric));
        assert_eq!(errors.get(Field::TargetWeight), Some(FieldErrorKind::NotPositive));
        assert_eq!(errors.get(Field::Objective), Some(FieldErrorKind::NotSelected));
    }

    #[test]
    fn email_shapes() {
        for (raw, expected) in [
            ("", Err(FieldErrorKind::Missing)),
            ("   ", Err(FieldErrorKind::Missing)),
            ("ana.example.com", Err(FieldErrorKind::InvalidEmail)),
            ("ana@example", Err(FieldErrorKind::InvalidEmail)),
            ("ana @x.io", Err(FieldErrorKind::InvalidEmail)),
            ("Ana@Example.com", Ok("ana@example.com".to_string())),
        ] {
            assert_eq!(email(raw), expected, "email {raw:?}");
        }
    }

    #[test]
    fn password_length_counts_characters() {
        let short = SecretString::from("abc12".to_string());
        assert_eq!(
            password(&short).unwrap_err(),
            FieldErrorKind::TooShort { min: MIN_PASSWORD_LEN }
        );

        let empty = SecretString::from(String::new());
        assert_eq!(password(&empty).unwrap_err(), FieldErrorKind::Missing);

        let accented = SecretString::from("çãõéíú".to_string());
        assert!(password(&accented).is_ok());
    }

    #[test]
    fn credentials_message_for_short_password() {
        let draft = draft_with(vec![
            FieldEdit::Email("ana@example.com".into()),
            FieldEdit::Password("12345".into()),
        ]);
        let rejection =
            StepRejection::from(validate_step(WizardStep::Credentials, &draft).unwrap_err());
        assert_eq!(rejection.message, "Password must be at least 6 characters.");
        assert_eq!(rejection.errors.len(), 1);
    }

    #[test]
    fn validation_is_idempotent_on_valid_draft() {
        let draft = complete_draft();
        for step in [
            WizardStep::Identity,
            WizardStep::Body,
            WizardStep::Goals,
            WizardStep::Credentials,
        ] {
            for _ in 0..3 {
                assert!(validate_step(step, &draft).is_ok(), "{step} should pass repeatedly");
            }
        }
    }

    #[test]
    fn submitted_rejects_with_fallback_message() {
        let errors = validate_step(WizardStep::Submitted, &complete_draft()).unwrap_err();
        assert!(errors.is_empty());
        assert_eq!(StepRejection::from(errors).message, FALLBACK_MESSAGE);
    }

    #[test]
    fn age_bounds() {
        assert_eq!(positive_integer("0"), Err(FieldErrorKind::NotPositive));
        assert_eq!(positive_integer("-3"), Err(FieldErrorKind::NotPositive));
        assert_eq!(positive_integer("29.5"), Err(FieldErrorKind::NotNumeric));
        assert_eq!(positive_integer(" 41 "), Ok(41));
        assert_eq!(positive_integer("99999999999"), Err(FieldErrorKind::NotNumeric));
    }

    #[test]
    fn rejection_serializes_field_map() {
        let draft = draft_with(vec![FieldEdit::Gender(Gender::Man)]);
        let rejection = StepRejection::from(validate_step(WizardStep::Body, &draft).unwrap_err());
        let json = serde_json::to_value(&rejection).unwrap();
        assert_eq!(json["errors"]["step"], "body");
        assert_eq!(json["errors"]["fields"]["activity_level"]["kind"], "not_selected");
    }
}
