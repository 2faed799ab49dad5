//! Route handlers.
//!
//! Handlers behind the session guard still re-read the identity: a logout can land between
//! the guard and the handler.

use crate::dto::{
    AccountView, AssessmentReq, AssessmentRes, DashboardRes, DatasetsRes, DoctorProfileRes,
    EnumsRes, ErrorRes, HealthRes, LoginReq, LoginRes, MessageRes, NewAccountReq, NewPatientReq,
    PatientFilter, PatientsRes, SessionRes, SuccessRes,
};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use hrc_core::forms::{LoginForm, NewAccountForm, NewPatientForm};
use hrc_core::{AssessmentFlow, Service, SessionIdentity};
use hrc_gateway::auth::{self, LoginOutcome, LoginRejection};
use hrc_gateway::assessment;

fn current_user(state: &AppState) -> ApiResult<SessionIdentity> {
    state
        .session
        .current()
        .ok_or_else(|| ApiError::unauthorized("not logged in"))
}

// ============================================================================
// Public routes
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Console liveness", body = HealthRes)
    )
)]
/// Liveness of the console itself. Remote services are not contacted.
pub async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Health-record console is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in", body = LoginRes),
        (status = 400, description = "Missing email or password", body = ErrorRes),
        (status = 401, description = "Invalid credentials or role", body = ErrorRes),
        (status = 502, description = "Accounts service failed", body = ErrorRes)
    )
)]
/// Log in against the accounts service.
///
/// Doctors are sent to `/patients`, admins to `/dashboard`. Any other role is refused and
/// nothing is stored.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> ApiResult<Json<LoginRes>> {
    let credentials = LoginForm {
        email: req.email,
        password: req.password,
    }
    .validate()?;

    match auth::login(&state.gateway, &state.session, &credentials).await {
        LoginOutcome::Authenticated {
            identity,
            home_route,
        } => Ok(Json(LoginRes {
            id: identity.id,
            name: identity.name,
            role: identity.role.code(),
            home_route: home_route.to_string(),
        })),
        LoginOutcome::Rejected(LoginRejection::Failed) => Err(ApiError::new(
            StatusCode::BAD_GATEWAY,
            LoginRejection::Failed.message(),
        )),
        LoginOutcome::Rejected(reason) => Err(ApiError::unauthorized(reason.message())),
    }
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 204, description = "Session cleared")
    )
)]
pub async fn logout(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.session.logout()?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Current identity and visible navigation", body = SessionRes)
    )
)]
pub async fn session(State(state): State<AppState>) -> Json<SessionRes> {
    Json(SessionRes::from_identity(state.session.current().as_ref()))
}

// ============================================================================
// Admin routes
// ============================================================================

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Service health table and widgets", body = DashboardRes),
        (status = 303, description = "Not logged in, redirected to /login")
    )
)]
/// Polls every dashboard service and fetches the widgets at the same time.
///
/// A widgets failure leaves `widgets` empty; it never fails the dashboard.
#[axum::debug_handler]
pub async fn dashboard(State(state): State<AppState>) -> Json<DashboardRes> {
    let (table, widgets) = tokio::join!(
        state.poller.poll(&Service::DASHBOARD),
        state.gateway.widgets()
    );
    let widgets = widgets.unwrap_or_else(|e| {
        tracing::warn!("widgets unavailable: {e}");
        None
    });
    Json(DashboardRes::new(&table, widgets))
}

#[utoipa::path(
    get,
    path = "/accounts",
    responses(
        (status = 200, description = "Every account except the caller's", body = Vec<AccountView>),
        (status = 303, description = "Not logged in, redirected to /login"),
        (status = 502, description = "Accounts service failed", body = ErrorRes)
    )
)]
pub async fn list_accounts(State(state): State<AppState>) -> ApiResult<Json<Vec<AccountView>>> {
    let user = current_user(&state)?;
    let accounts = state.gateway.list_accounts(user.id).await?;
    Ok(Json(accounts.iter().map(AccountView::from).collect()))
}

#[utoipa::path(
    post,
    path = "/accounts",
    request_body = NewAccountReq,
    responses(
        (status = 200, description = "Accounts service verdict", body = SuccessRes),
        (status = 400, description = "Invalid form", body = ErrorRes),
        (status = 502, description = "Accounts service failed", body = ErrorRes)
    )
)]
pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<NewAccountReq>,
) -> ApiResult<Json<SuccessRes>> {
    let account = NewAccountForm {
        email: req.email,
        username: req.username,
        password: req.password,
        role: req.role,
    }
    .validate()?;

    let response = state.gateway.create_account(&account).await?;
    tracing::info!("account creation for {}: success={}", account.email, response.success);
    Ok(Json(SuccessRes {
        success: response.success,
    }))
}

#[utoipa::path(
    delete,
    path = "/accounts/{id}",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Accounts service verdict", body = SuccessRes),
        (status = 404, description = "No such account in the caller's list", body = ErrorRes),
        (status = 502, description = "Accounts service failed", body = ErrorRes)
    )
)]
/// Delete an account.
///
/// The accounts service expects the full record, so the account is looked up in the
/// caller's list first. The caller's own account is never in that list.
pub async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessRes>> {
    let user = current_user(&state)?;
    let accounts = state.gateway.list_accounts(user.id).await?;
    let account = accounts
        .iter()
        .find(|account| account.id == id)
        .ok_or_else(|| ApiError::not_found(format!("account {id} not found")))?;

    let response = state.gateway.delete_account(account).await?;
    tracing::info!("account {id} deletion: success={}", response.success);
    Ok(Json(SuccessRes {
        success: response.success,
    }))
}

#[utoipa::path(
    get,
    path = "/dataset",
    responses(
        (status = 200, description = "Decision datasets in service order", body = DatasetsRes),
        (status = 502, description = "Datasets service failed", body = ErrorRes)
    )
)]
pub async fn datasets(State(state): State<AppState>) -> ApiResult<Json<DatasetsRes>> {
    let datasets = state.gateway.list_datasets().await?;
    Ok(Json(DatasetsRes { datasets }))
}

// ============================================================================
// Doctor routes
// ============================================================================

#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "The caller's doctor record", body = DoctorProfileRes),
        (status = 303, description = "Not logged in, redirected to /login"),
        (status = 404, description = "The caller has no doctor record", body = ErrorRes),
        (status = 502, description = "Doctors service failed", body = ErrorRes)
    )
)]
pub async fn profile(State(state): State<AppState>) -> ApiResult<Json<DoctorProfileRes>> {
    let user = current_user(&state)?;
    let doctor = state
        .gateway
        .doctor_profile(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no doctor record for user {}", user.id)))?;
    Ok(Json(DoctorProfileRes::from(&doctor)))
}

#[utoipa::path(
    get,
    path = "/patients",
    params(PatientFilter),
    responses(
        (status = 200, description = "The caller's patients", body = PatientsRes),
        (status = 303, description = "Not logged in, redirected to /login"),
        (status = 502, description = "Patients service failed", body = ErrorRes)
    )
)]
pub async fn list_patients(
    State(state): State<AppState>,
    Query(query): Query<PatientFilter>,
) -> ApiResult<Json<PatientsRes>> {
    let user = current_user(&state)?;
    let mut patients = state.gateway.list_patients(user.id).await?;
    if let Some(filter) = query.filter.as_deref().filter(|f| !f.is_empty()) {
        patients.retain(|patient| patient.matches_filter(filter));
    }
    Ok(Json(PatientsRes { patients }))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = NewPatientReq,
    responses(
        (status = 200, description = "Patients service message", body = MessageRes),
        (status = 400, description = "Invalid form", body = ErrorRes),
        (status = 502, description = "Patients service failed", body = ErrorRes)
    )
)]
/// Create a patient owned by the logged-in doctor.
pub async fn create_patient(
    State(state): State<AppState>,
    Json(req): Json<NewPatientReq>,
) -> ApiResult<Json<MessageRes>> {
    let user = current_user(&state)?;
    let patient = NewPatientForm {
        name: req.name,
        age: req.age,
        email: req.email,
        phone_number: req.phone_number,
        image: req.image,
    }
    .validate(user.id)?;

    let response = state.gateway.create_patient(&patient).await?;
    Ok(Json(MessageRes {
        message: response.message,
    }))
}

#[utoipa::path(
    get,
    path = "/patients/enums",
    responses(
        (status = 200, description = "Option lists for the patient form", body = EnumsRes),
        (status = 502, description = "Utils service failed", body = ErrorRes)
    )
)]
pub async fn enums(State(state): State<AppState>) -> ApiResult<Json<EnumsRes>> {
    let enums = state.gateway.get_enums().await?;
    Ok(Json(EnumsRes { enums }))
}

#[utoipa::path(
    post,
    path = "/patients/assessment",
    request_body = AssessmentReq,
    responses(
        (status = 200, description = "Assessment with tiered components", body = AssessmentRes),
        (status = 422, description = "Ratings out of range, all zero, or patient unnamed", body = ErrorRes)
    )
)]
/// Run a risk assessment for one patient.
///
/// A failing dataset-operations service is not an error: the report then carries the
/// generic message and no components.
#[axum::debug_handler]
pub async fn assess(
    State(state): State<AppState>,
    Json(req): Json<AssessmentReq>,
) -> ApiResult<Json<AssessmentRes>> {
    let mut flow = AssessmentFlow::new();
    flow.select_patient(req.patient)?;
    flow.rate(req.disease_rating, req.ckd_rating, req.sir_rating, req.ma_rating)?;

    let report = assessment::submit(&state.gateway, &mut flow).await?;
    Ok(Json(AssessmentRes::from(report)))
}
