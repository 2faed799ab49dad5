//! Domain records returned by the remote services.
//!
//! These are plain immutable value carriers. A fresh record is built for every response;
//! nothing here caches or owns another record. Datasets only reference models by name.

use serde::{Deserialize, Serialize};

// ============================================================================
// Accounts and identity
// ============================================================================

/// Account role as carried on the wire (`1` doctor, `2` admin).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Doctor,
    Admin,
    Other(i64),
}

impl Role {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Role::Doctor,
            2 => Role::Admin,
            other => Role::Other(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Role::Doctor => 1,
            Role::Admin => 2,
            Role::Other(code) => code,
        }
    }

    /// The landing route after a successful login, if this role has one.
    pub fn home_route(self) -> Option<&'static str> {
        match self {
            Role::Doctor => Some("/patients"),
            Role::Admin => Some("/dashboard"),
            Role::Other(_) => None,
        }
    }

    /// Navigation entries visible to this role. Nothing else restricts access.
    pub fn navigation(self) -> &'static [&'static str] {
        match self {
            Role::Doctor => &["patients"],
            Role::Admin => &["dashboard", "dataset", "accounts"],
            Role::Other(_) => &[],
        }
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Role::from_code(i64::deserialize(deserializer)?))
    }
}

/// A user account as listed by the accounts service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// The identity part shared by every account-like record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&Account> for AccountIdentity {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
        }
    }
}

/// A doctor: an embedded account identity plus practice details.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub account: AccountIdentity,
    pub rank: String,
    pub phone_number: String,
    pub number_of_patients: u32,
    pub active: bool,
    pub date_of_birth: String,
}

/// The minimal authenticated-user data kept client-side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

impl From<&Account> for SessionIdentity {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            role: account.role,
        }
    }
}

// ============================================================================
// Patients
// ============================================================================

/// A patient as shown in the doctor's book and the risk-assessment form.
///
/// Every clinical field is free text; `image` holds a base64 data URL when one is attached.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Patient {
    pub description: String,
    pub image_path: String,
    pub image: Option<String>,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub age: String,
    pub blood_pressure: String,
    pub blood_sugar: String,
    pub procedure_count: String,
    pub infections_reported: String,
    pub body_temperature: String,
    pub heart_rate: String,
    pub operative_procedure: String,
    pub feelings_and_urge: String,
    pub disease: String,
    pub critical_feelings: String,
}

impl Patient {
    /// The empty record used when a doctor starts a new patient.
    pub fn blank() -> Self {
        Self::default()
    }

    /// A patient without a name has not been saved yet.
    pub fn is_new(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// Case-insensitive name filter used by the patient list.
    pub fn matches_filter(&self, filter: &str) -> bool {
        self.name.to_lowercase().contains(&filter.to_lowercase())
    }
}

// ============================================================================
// Datasets, widgets, enums
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    Labeled,
    Unlabeled,
    Other(String),
}

impl ModelKind {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "Labeled" => ModelKind::Labeled,
            "Unlabeled" => ModelKind::Unlabeled,
            other => ModelKind::Other(other.to_string()),
        }
    }
}

/// A reference to a trained model, by name only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub name: String,
    pub kind: ModelKind,
}

/// A decision dataset feeding the risk assessment, with the models trained on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionDataset {
    /// Key under which the dataset service lists this dataset (e.g. `ckd`).
    pub key: String,
    pub name: String,
    pub number_of_lines: u64,
    pub relative_weight: f64,
    pub models: Vec<ModelRef>,
}

/// Dashboard counters. Values are kept as display text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widgets {
    pub total_users: String,
    pub active_users: String,
    pub non_active_users: String,
    pub total_admins: String,
    pub total_doctors: String,
    pub total_patients: String,
    pub total_algorithms: String,
    pub rank_of_success: String,
    pub total_usages: String,
    pub labeled_models: String,
    pub unlabeled_models: String,
}

/// Option lists for the patient form's select fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalEnums {
    #[serde(rename = "Operative_Procedure", default)]
    pub operative_procedure: Vec<String>,
    #[serde(rename = "Feelings_and_Urge", default)]
    pub feelings_and_urge: Vec<String>,
    #[serde(rename = "Disease", default)]
    pub disease: Vec<String>,
    #[serde(rename = "Critical_Feelings", default)]
    pub critical_feelings: Vec<String>,
}
