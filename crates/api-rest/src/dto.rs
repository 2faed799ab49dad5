//! Request and response bodies of the console API.
//!
//! Records that the console passes through untouched (patients, datasets, widgets, enums)
//! are documented as plain objects; everything the console shapes itself gets a schema.

use hrc_core::{
    Account, AccountIdentity, AssessmentReport, ClinicalEnums, ComponentLine, DecisionDataset,
    DoctorProfile, Patient, SessionIdentity, Widgets,
};
use hrc_gateway::{ProbeReport, StatusTable, ServiceStatus};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub message: String,
}

// ============================================================================
// Session
// ============================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginRes {
    pub id: i64,
    pub name: String,
    pub role: i64,
    /// Where the client should go next: `/patients` or `/dashboard`.
    pub home_route: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SessionRes {
    pub authenticated: bool,
    pub id: Option<i64>,
    pub name: String,
    pub role: i64,
    /// Navigation entries visible to this role.
    pub navigation: Vec<String>,
}

impl SessionRes {
    pub fn from_identity(identity: Option<&SessionIdentity>) -> Self {
        match identity {
            Some(user) => Self {
                authenticated: true,
                id: Some(user.id),
                name: user.name.clone(),
                role: user.role.code(),
                navigation: user
                    .role
                    .navigation()
                    .iter()
                    .map(|entry| entry.to_string())
                    .collect(),
            },
            None => Self {
                authenticated: false,
                id: None,
                name: String::new(),
                role: 0,
                navigation: Vec::new(),
            },
        }
    }
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ServiceStatusRow {
    pub service: String,
    pub status: String,
    /// RFC 3339 timestamp of this service's own probe.
    pub checked_at: String,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

impl From<&ProbeReport> for ServiceStatusRow {
    fn from(report: &ProbeReport) -> Self {
        Self {
            service: report.service.to_string(),
            status: report.status.to_string(),
            checked_at: report.checked_at.to_rfc3339(),
            elapsed_ms: report.elapsed_ms,
            error: report.error.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DashboardRes {
    pub operational: usize,
    pub down: usize,
    pub services: Vec<ServiceStatusRow>,
    #[schema(value_type = Option<Object>)]
    pub widgets: Option<Widgets>,
}

impl DashboardRes {
    pub fn new(table: &StatusTable, widgets: Option<Widgets>) -> Self {
        Self {
            operational: table.count(ServiceStatus::Operational),
            down: table.count(ServiceStatus::Down),
            services: table.rows().map(ServiceStatusRow::from).collect(),
            widgets,
        }
    }
}

// ============================================================================
// Accounts
// ============================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AccountView {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: i64,
}

impl From<&AccountIdentity> for AccountView {
    fn from(identity: &AccountIdentity) -> Self {
        Self {
            id: identity.id,
            name: identity.name.clone(),
            email: identity.email.clone(),
            role: identity.role.code(),
        }
    }
}

/// The password never leaves the console.
impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self::from(&AccountIdentity::from(account))
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DoctorProfileRes {
    pub account: AccountView,
    pub rank: String,
    pub phone_number: String,
    pub number_of_patients: u32,
    pub active: bool,
    pub date_of_birth: String,
}

impl From<&DoctorProfile> for DoctorProfileRes {
    fn from(doctor: &DoctorProfile) -> Self {
        Self {
            account: AccountView::from(&doctor.account),
            rank: doctor.rank.clone(),
            phone_number: doctor.phone_number.clone(),
            number_of_patients: doctor.number_of_patients,
            active: doctor.active,
            date_of_birth: doctor.date_of_birth.clone(),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct NewAccountReq {
    pub email: String,
    pub username: String,
    pub password: String,
    /// `doctor` or `admin`.
    pub role: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SuccessRes {
    pub success: bool,
}

// ============================================================================
// Patients
// ============================================================================

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientFilter {
    /// Case-insensitive substring of the patient name.
    pub filter: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PatientsRes {
    #[schema(value_type = Vec<Object>)]
    pub patients: Vec<Patient>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPatientReq {
    pub name: String,
    pub age: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    /// `data:image/...;base64,` URL.
    pub image: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct EnumsRes {
    #[schema(value_type = Object)]
    pub enums: ClinicalEnums,
}

// ============================================================================
// Risk assessment
// ============================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentReq {
    #[schema(value_type = Object)]
    pub patient: Patient,
    pub disease_rating: i64,
    pub ckd_rating: i64,
    pub sir_rating: i64,
    pub ma_rating: i64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ComponentRes {
    pub text: String,
    pub percentage: Option<f64>,
    pub tier: String,
    pub css_class: String,
}

impl From<&ComponentLine> for ComponentRes {
    fn from(line: &ComponentLine) -> Self {
        Self {
            text: line.text.clone(),
            percentage: line.percentage,
            tier: line.tier.to_string(),
            css_class: line.tier.css_class().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AssessmentRes {
    pub assessment: String,
    pub components: Vec<ComponentRes>,
}

impl From<&AssessmentReport> for AssessmentRes {
    fn from(report: &AssessmentReport) -> Self {
        Self {
            assessment: report.assessment.clone(),
            components: report.components.iter().map(ComponentRes::from).collect(),
        }
    }
}

// ============================================================================
// Datasets
// ============================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DatasetsRes {
    #[schema(value_type = Vec<Object>)]
    pub datasets: Vec<DecisionDataset>,
}
