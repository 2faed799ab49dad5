//! HTTP client for the remote health-record services.
//!
//! One [`Gateway`] wraps a single `reqwest::Client` and the base URL of every service. Each
//! remote operation is one method: a single request, no retries, no batching. A call either
//! resolves to the decoded payload or fails with a [`GatewayError`]; callers do not tell
//! "service down" apart from "bad request".

use crate::{GatewayError, GatewayResult};
use hrc_core::forms::{AccountDeletion, Credentials, NewAccount, NewPatient};
use hrc_core::mapper::{self, decode_account, decode_patient};
use hrc_core::{
    Account, ClinicalEnums, DecisionDataset, DoctorProfile, Patient, RiskAssessmentRequest,
    Service, ServiceEndpoints, Widgets,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Wire responses
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    /// Positional account row, present when `success` is true.
    #[serde(default)]
    pub account: Option<Vec<Value>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AccountsResponse {
    pub success: bool,
    #[serde(default)]
    pub accounts: Option<Vec<Vec<Value>>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DatasetsResponse {
    pub datasets: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EnumsResponse {
    pub enums: ClinicalEnums,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RiskAssessmentResponse {
    pub message: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize)]
struct AccountsRequest {
    id: i64,
}

// ============================================================================
// Gateway
// ============================================================================

#[derive(Clone, Debug)]
pub struct Gateway {
    client: reqwest::Client,
    endpoints: ServiceEndpoints,
}

impl Gateway {
    pub fn new(endpoints: ServiceEndpoints) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(GatewayError::Client)?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    async fn get<T: DeserializeOwned>(&self, service: Service, path: &str) -> GatewayResult<T> {
        let url = self.endpoints.url(service, path);
        tracing::debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| GatewayError::Transport { service, source })?;
        read_json(service, response).await
    }

    async fn post<B, T>(&self, service: Service, path: &str, body: &B) -> GatewayResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoints.url(service, path);
        tracing::debug!("POST {url}");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| GatewayError::Transport { service, source })?;
        read_json(service, response).await
    }

    // ------------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------------

    pub async fn login(&self, credentials: &Credentials) -> GatewayResult<LoginResponse> {
        self.post(Service::Accounts, "/login", credentials).await
    }

    /// Every account except the requester's own.
    pub async fn get_accounts(&self, requester_id: i64) -> GatewayResult<AccountsResponse> {
        let body = AccountsRequest { id: requester_id };
        self.post(Service::Accounts, "/get-accounts", &body).await
    }

    pub async fn create_account(&self, account: &NewAccount) -> GatewayResult<SuccessResponse> {
        self.post(Service::Accounts, "/create-account", account).await
    }

    pub async fn delete_account(&self, account: &Account) -> GatewayResult<SuccessResponse> {
        let body = AccountDeletion::from(account);
        self.post(Service::Accounts, "/delete-account", &body).await
    }

    /// Accounts decoded into records; rows that do not map are skipped.
    ///
    /// An unsuccessful response or a missing list is logged and yields no accounts.
    pub async fn list_accounts(&self, requester_id: i64) -> GatewayResult<Vec<Account>> {
        let response = self.get_accounts(requester_id).await?;
        match response.accounts {
            Some(rows) if response.success => Ok(mapper::map_rows(&rows, decode_account)),
            _ => {
                tracing::warn!("accounts service returned no account list");
                Ok(Vec::new())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Doctors
    // ------------------------------------------------------------------------

    pub async fn get_doctor(&self, user_id: i64) -> GatewayResult<Vec<Value>> {
        self.get(Service::Doctors, &format!("/get-doctor/{user_id}"))
            .await
    }

    /// The doctor record for `user_id`; `None` when the service has none or the row does not
    /// decode.
    pub async fn doctor_profile(&self, user_id: i64) -> GatewayResult<Option<DoctorProfile>> {
        let row = match self.get_doctor(user_id).await {
            Ok(row) => row,
            Err(GatewayError::Status { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        match mapper::decode_doctor(&row) {
            Ok(doctor) => Ok(Some(doctor)),
            Err(e) => {
                tracing::warn!("skipping doctor {user_id}: {e}");
                Ok(None)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------------

    pub async fn get_patients_by_doctor(&self, doctor_id: i64) -> GatewayResult<Vec<Vec<Value>>> {
        self.get(Service::Patients, &format!("/get-patients/{doctor_id}"))
            .await
    }

    pub async fn list_patients(&self, doctor_id: i64) -> GatewayResult<Vec<Patient>> {
        let rows = self.get_patients_by_doctor(doctor_id).await?;
        Ok(mapper::map_rows(&rows, decode_patient))
    }

    pub async fn create_patient(&self, patient: &NewPatient) -> GatewayResult<MessageResponse> {
        self.post(Service::Patients, "/create-patient", patient).await
    }

    // ------------------------------------------------------------------------
    // Datasets, enums, widgets
    // ------------------------------------------------------------------------

    pub async fn get_datasets(&self) -> GatewayResult<DatasetsResponse> {
        self.get(Service::Datasets, "/get-datasets").await
    }

    pub async fn list_datasets(&self) -> GatewayResult<Vec<DecisionDataset>> {
        let response = self.get_datasets().await?;
        Ok(mapper::decode_datasets(&response.datasets))
    }

    pub async fn get_enums(&self) -> GatewayResult<ClinicalEnums> {
        let response: EnumsResponse = self.get(Service::Utils, "/get-enums").await?;
        Ok(response.enums)
    }

    pub async fn get_widgets(&self) -> GatewayResult<Vec<Value>> {
        self.get(Service::Widgets, "/get-widgets").await
    }

    /// Dashboard counters; `None` when the row cannot be decoded.
    pub async fn widgets(&self) -> GatewayResult<Option<Widgets>> {
        let row = self.get_widgets().await?;
        match mapper::decode_widgets(&row) {
            Ok(widgets) => Ok(Some(widgets)),
            Err(e) => {
                tracing::warn!("skipping widgets: {e}");
                Ok(None)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Risk assessment and health
    // ------------------------------------------------------------------------

    pub async fn get_risk_assessment(
        &self,
        request: &RiskAssessmentRequest,
    ) -> GatewayResult<RiskAssessmentResponse> {
        self.post(Service::DatasetOps, "/get-risk-assessment", request)
            .await
    }

    pub async fn check_health(&self, service: Service) -> GatewayResult<HealthResponse> {
        self.get(service, "/health").await
    }
}

/// Non-2xx statuses become [`GatewayError::Status`] carrying the body text.
async fn read_json<T: DeserializeOwned>(
    service: Service,
    response: reqwest::Response,
) -> GatewayResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| GatewayError::Transport { service, source })?;

    if !status.is_success() {
        tracing::warn!("{service} responded {status}");
        return Err(GatewayError::Status {
            service,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|source| {
        tracing::warn!("{service} returned an undecodable body: {source}");
        GatewayError::Decode { service, source }
    })
}
