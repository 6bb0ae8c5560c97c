//! Registration draft and the typed account it turns into.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::state::WizardStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Man,
    Woman,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Light,
    Moderate,
    Intense,
}

/// What the user wants to achieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    LoseWeight,
    GainMuscle,
    MaintainWeight,
    Definition,
}

macro_rules! db_enum {
    ($ty:ty { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let s = match self {
                    $(Self::$variant => $s,)+
                };
                write!(f, "{s}")
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    _ => Err(format!("Unknown {}: {}", stringify!($ty), s)),
                }
            }
        }
    };
}

db_enum!(Gender { Man => "man", Woman => "woman" });
db_enum!(ActivityLevel { Light => "light", Moderate => "moderate", Intense => "intense" });
db_enum!(Objective {
    LoseWeight => "lose_weight",
    GainMuscle => "gain_muscle",
    MaintainWeight => "maintain_weight",
    Definition => "definition",
});

/// A single wizard field, in validation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Age,
    HeightCm,
    Gender,
    ActivityLevel,
    CurrentWeight,
    TargetWeight,
    Objective,
    Email,
    Password,
}

impl Field {
    /// The step that owns this field.
    pub fn step(&self) -> WizardStep {
        match self {
            Self::Name | Self::Age | Self::HeightCm => WizardStep::Identity,
            Self::Gender | Self::ActivityLevel => WizardStep::Body,
            Self::CurrentWeight | Self::TargetWeight | Self::Objective => WizardStep::Goals,
            Self::Email | Self::Password => WizardStep::Credentials,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Age => "age",
            Self::HeightCm => "height_cm",
            Self::Gender => "gender",
            Self::ActivityLevel => "activity_level",
            Self::CurrentWeight => "current_weight",
            Self::TargetWeight => "target_weight",
            Self::Objective => "objective",
            Self::Email => "email",
            Self::Password => "password",
        };
        write!(f, "{s}")
    }
}

/// One user edit to the draft. Numeric fields carry the raw typed text.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldEdit {
    Name(String),
    Age(String),
    HeightCm(String),
    Gender(Gender),
    ActivityLevel(ActivityLevel),
    CurrentWeight(String),
    TargetWeight(String),
    Objective(Objective),
    Email(String),
    Password(String),
}

impl FieldEdit {
    pub fn field(&self) -> Field {
        match self {
            Self::Name(_) => Field::Name,
            Self::Age(_) => Field::Age,
            Self::HeightCm(_) => Field::HeightCm,
            Self::Gender(_) => Field::Gender,
            Self::ActivityLevel(_) => Field::ActivityLevel,
            Self::CurrentWeight(_) => Field::CurrentWeight,
            Self::TargetWeight(_) => Field::TargetWeight,
            Self::Objective(_) => Field::Objective,
            Self::Email(_) => Field::Email,
            Self::Password(_) => Field::Password,
        }
    }
}

/// In-memory, not-yet-submitted registration form.
#[derive(Debug)]
pub struct RegistrationDraft {
    pub name: String,
    pub age: String,
    pub height_cm: String,
    pub gender: Option<Gender>,
    pub activity_level: Option<ActivityLevel>,
    pub current_weight: String,
    pub target_weight: String,
    pub objective: Option<Objective>,
    pub email: String,
    pub password: SecretString,
}

impl Default for RegistrationDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: String::new(),
            height_cm: String::new(),
            gender: None,
            activity_level: None,
            current_weight: String::new(),
            target_weight: String::new(),
            objective: None,
            email: String::new(),
            password: SecretString::from(String::new()),
        }
    }
}

impl RegistrationDraft {
    /// Write an edit into the draft.
    pub fn apply(&mut self, edit: FieldEdit) {
        match edit {
            FieldEdit::Name(v) => self.name = v,
            FieldEdit::Age(v) => self.age = v,
            FieldEdit::HeightCm(v) => self.height_cm = v,
            FieldEdit::Gender(v) => self.gender = Some(v),
            FieldEdit::ActivityLevel(v) => self.activity_level = Some(v),
            FieldEdit::CurrentWeight(v) => self.current_weight = v,
            FieldEdit::TargetWeight(v) => self.target_weight = v,
            FieldEdit::Objective(v) => self.objective = Some(v),
            FieldEdit::Email(v) => self.email = v,
            FieldEdit::Password(v) => self.password = SecretString::from(v),
        }
    }
}

/// A fully validated registration, handed to the account creator.
#[derive(Debug)]
pub struct NewAccount {
    pub name: String,
    pub age: u32,
    pub height_cm: f64,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub current_weight_kg: f64,
    pub target_weight_kg: f64,
    pub objective: Objective,
    pub email: String,
    pub password: SecretString,
}

impl NewAccount {
    /// Copy of the password for hashing off the async executor.
    pub fn password_owned(&self) -> String {
        self.password.expose_secret().to_string()
    }
}

/// Identifier returned by the account creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_belongs_to_one_step() {
        use Field::*;
        let expected = [
            (Name, WizardStep::Identity),
            (Age, WizardStep::Identity),
            (HeightCm, WizardStep::Identity),
            (Gender, WizardStep::Body),
            (ActivityLevel, WizardStep::Body),
            (CurrentWeight, WizardStep::Goals),
            (TargetWeight, WizardStep::Goals),
            (Objective, WizardStep::Goals),
            (Email, WizardStep::Credentials),
            (Password, WizardStep::Credentials),
        ];
        for (field, step) in expected {
            assert_eq!(field.step(), step, "{field} should belong to {step}");
        }
    }

    #[test]
    fn field_edit_deserializes_tagged() {
        let edit: FieldEdit =
            serde_json::from_str(r#"{"field": "age", "value": "31"}"#).unwrap();
        assert!(matches!(edit, FieldEdit::Age(ref v) if v == "31"));

        let edit: FieldEdit =
            serde_json::from_str(r#"{"field": "objective", "value": "gain_muscle"}"#).unwrap();
        assert!(matches!(edit, FieldEdit::Objective(Objective::GainMuscle)));
    }

    #[test]
    fn apply_writes_selected_field_only() {
        let mut draft = RegistrationDraft::default();
        draft.apply(FieldEdit::Gender(Gender::Woman));
        draft.apply(FieldEdit::Password("hunter22".to_string()));

        assert_eq!(draft.gender, Some(Gender::Woman));
        assert_eq!(draft.password.expose_secret(), "hunter22");
        assert!(draft.name.is_empty());
        assert!(draft.activity_level.is_none());
    }

    #[test]
    fn enum_strings_roundtrip_through_display() {
        for objective in [
            Objective::LoseWeight,
            Objective::GainMuscle,
            Objective::MaintainWeight,
            Objective::Definition,
        ] {
            let parsed: Objective = objective.to_string().parse().unwrap();
            assert_eq!(parsed, objective);
        }
        assert!("couch".parse::<ActivityLevel>().is_err());
    }

    #[test]
    fn password_is_redacted_in_debug() {
        let mut draft = RegistrationDraft::default();
        draft.apply(FieldEdit::Password("s3cret-pass".to_string()));
        assert!(!format!("{draft:?}").contains("s3cret-pass"));
    }
}
