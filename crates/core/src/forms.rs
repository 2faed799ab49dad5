//! Form validation and the request bodies built from valid forms.
//!
//! Each form is a loose bag of strings as typed by the user. `validate()` either produces the
//! exact JSON body the remote service expects or a `ConsoleError::InvalidInput` carrying the
//! inline message. Nothing is sent while a form is invalid.

use crate::records::Account;
use crate::{ConsoleError, ConsoleResult};
use hrc_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

// ============================================================================
// LOGIN
// ============================================================================

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Body of `POST /login`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> ConsoleResult<Credentials> {
        let email = NonEmptyText::new(&self.email).map_err(|_| invalid("email is required"))?;
        if self.password.is_empty() {
            return Err(invalid("password is required"));
        }
        Ok(Credentials {
            email: email.into_inner(),
            password: self.password.clone(),
        })
    }
}

// ============================================================================
// ACCOUNTS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Doctor,
    Admin,
}

impl std::str::FromStr for AccountKind {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doctor" => Ok(AccountKind::Doctor),
            "admin" => Ok(AccountKind::Admin),
            other => Err(invalid(format!("role must be doctor or admin, got {other:?}"))),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewAccountForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: String,
}

/// Body of `POST /create-account`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: AccountKind,
}

impl NewAccountForm {
    pub fn validate(&self) -> ConsoleResult<NewAccount> {
        let email = EmailAddress::parse(&self.email)?;
        let username = NonEmptyText::with_min_len(&self.username, MIN_USERNAME_LEN)
            .map_err(|e| invalid(format!("username: {e}")))?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(invalid(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let role = self.role.parse::<AccountKind>()?;

        Ok(NewAccount {
            email: email.as_str().to_string(),
            username: username.into_inner(),
            password: self.password.clone(),
            role,
        })
    }
}

/// Body of `POST /delete-account`: the full account as listed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDeletion {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: i64,
}

impl From<&Account> for AccountDeletion {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
            password: account.password.clone(),
            role: account.role.code(),
        }
    }
}

// ============================================================================
// PATIENTS
// ============================================================================

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatientForm {
    pub name: String,
    pub age: String,
    pub email: String,
    pub phone_number: String,
    /// Image as a `data:image/...;base64,` URL.
    pub image: String,
}

/// Body of `POST /create-patient`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub age: u32,
    pub email: String,
    pub doctor_id: String,
    pub image: String,
    pub phone_number: String,
}

impl NewPatientForm {
    /// Validates the form for the logged-in doctor `doctor_id`.
    pub fn validate(&self, doctor_id: i64) -> ConsoleResult<NewPatient> {
        let name = NonEmptyText::new(&self.name).map_err(|_| invalid("name is required"))?;
        let age = self
            .age
            .trim()
            .parse::<u32>()
            .map_err(|_| invalid(format!("age must be a whole number, got {:?}", self.age)))?;
        let email = EmailAddress::parse(&self.email)?;
        validate_image_data_url(&self.image)?;

        Ok(NewPatient {
            name: name.into_inner(),
            age,
            email: email.as_str().to_string(),
            doctor_id: doctor_id.to_string(),
            image: self.image.clone(),
            phone_number: self.phone_number.trim().to_string(),
        })
    }
}

/// Only image uploads are accepted, and they travel inline as base64 data URLs.
pub fn validate_image_data_url(value: &str) -> ConsoleResult<()> {
    let Some(rest) = value.strip_prefix("data:image/") else {
        return Err(invalid("unsupported file type: image must be a data:image/ URL"));
    };
    match rest.split_once(";base64,") {
        Some((subtype, payload)) if !subtype.is_empty() && !payload.is_empty() => Ok(()),
        _ => Err(invalid("image must be base64 encoded")),
    }
}

fn invalid(message: impl Into<String>) -> ConsoleError {
    ConsoleError::InvalidInput(message.into())
}
