//! # API REST
//!
//! Local REST console for the health-record services.
//!
//! Handles:
//! - The console routes (`/login`, `/dashboard`, `/accounts`, `/patients`, `/profile`,
//!   `/dataset`) with axum
//! - The session guard: routes past login redirect to `/login` when nobody is logged in
//! - OpenAPI/Swagger documentation
//!
//! All remote work goes through `hrc-gateway`; identity comes from the shared
//! [`SessionStore`].

#![warn(rust_2018_idioms)]

pub mod dto;
pub mod error;
pub mod handlers;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use hrc_core::SessionStore;
use hrc_gateway::{Gateway, HealthPoller};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub session: Arc<SessionStore>,
    pub poller: Arc<HealthPoller<Gateway>>,
}

impl AppState {
    pub fn new(gateway: Gateway, session: Arc<SessionStore>, probe_timeout: Duration) -> Self {
        let poller = Arc::new(HealthPoller::new(gateway.clone(), probe_timeout));
        Self {
            gateway,
            session,
            poller,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::login,
        handlers::logout,
        handlers::session,
        handlers::dashboard,
        handlers::list_accounts,
        handlers::create_account,
        handlers::delete_account,
        handlers::datasets,
        handlers::profile,
        handlers::list_patients,
        handlers::create_patient,
        handlers::enums,
        handlers::assess,
    ),
    components(schemas(
        dto::HealthRes,
        dto::ErrorRes,
        dto::LoginReq,
        dto::LoginRes,
        dto::SessionRes,
        dto::ServiceStatusRow,
        dto::DashboardRes,
        dto::AccountView,
        dto::DoctorProfileRes,
        dto::NewAccountReq,
        dto::SuccessRes,
        dto::PatientsRes,
        dto::NewPatientReq,
        dto::MessageRes,
        dto::EnumsRes,
        dto::AssessmentReq,
        dto::ComponentRes,
        dto::AssessmentRes,
        dto::DatasetsRes,
    ))
)]
pub struct ApiDoc;

/// Redirects to `/login` unless someone is logged in.
async fn require_session(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.session.is_authenticated() {
        tracing::debug!("redirecting {} to /login", request.uri().path());
        return Redirect::to("/login").into_response();
    }
    next.run(request).await
}

/// The full console router.
pub fn router(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/dashboard", get(handlers::dashboard))
        .route(
            "/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route("/accounts/:id", delete(handlers::delete_account))
        .route("/dataset", get(handlers::datasets))
        .route("/profile", get(handlers::profile))
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route("/patients/enums", get(handlers::enums))
        .route("/patients/assessment", post(handlers::assess))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/", get(|| async { Redirect::to("/login") }))
        .route("/health", get(handlers::health))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/session", get(handlers::session))
        .merge(guarded)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, StatusCode};
    use axum::routing::{get, post};
    use axum::Json;
    use hrc_core::{MemoryStorage, Role, Service, ServiceEndpoints, SessionIdentity};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    async fn spawn_stub(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Every service pointed at a port nobody listens on, except the given stubs.
    async fn endpoints(stubs: &[(Service, &str)]) -> ServiceEndpoints {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let mut endpoints = ServiceEndpoints::local_defaults();
        for service in Service::ALL {
            endpoints.set(service, dead.clone()).unwrap();
        }
        for (service, url) in stubs {
            endpoints.set(*service, *url).unwrap();
        }
        endpoints
    }

    fn state(endpoints: ServiceEndpoints) -> AppState {
        let session = Arc::new(SessionStore::open(Arc::new(MemoryStorage::new())));
        AppState::new(
            Gateway::new(endpoints).unwrap(),
            session,
            Duration::from_secs(2),
        )
    }

    fn log_in_as(state: &AppState, id: i64, role: Role) {
        state
            .session
            .set_user(SessionIdentity {
                id,
                name: "Test".into(),
                role,
            })
            .unwrap();
    }

    fn get_req(uri: &str) -> Request {
        axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: Method, uri: &str, body: Value) -> Request {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = router(state(endpoints(&[]).await));

        let response = app.oneshot(get_req("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["ok"], json!(true));
    }

    #[tokio::test]
    async fn guarded_routes_redirect_to_login() {
        let app = router(state(endpoints(&[]).await));

        for uri in ["/dashboard", "/accounts", "/patients", "/profile", "/dataset", "/patients/enums"] {
            let response = app.clone().oneshot(get_req(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(response.headers()[header::LOCATION], "/login");
        }
    }

    #[tokio::test]
    async fn root_redirects_to_login() {
        let app = router(state(endpoints(&[]).await));

        let response = app.oneshot(get_req("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn login_then_session_shows_doctor_navigation() {
        let accounts = Router::new().route(
            "/login",
            post(|| async {
                Json(json!({"success": true, "account": [3, "d@x.org", "Dr D", "pw", 1]}))
            }),
        );
        let base = spawn_stub(accounts).await;
        let app = router(state(endpoints(&[(Service::Accounts, &base)]).await));

        let response = app
            .clone()
            .oneshot(json_req(
                Method::POST,
                "/login",
                json!({"email": "d@x.org", "password": "pw"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["home_route"], "/patients");

        let session = body_json(app.clone().oneshot(get_req("/session")).await.unwrap()).await;
        assert_eq!(session["authenticated"], json!(true));
        assert_eq!(session["navigation"], json!(["patients"]));

        let response = app
            .clone()
            .oneshot(json_req(Method::POST, "/logout", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let session = body_json(app.oneshot(get_req("/session")).await.unwrap()).await;
        assert_eq!(session["authenticated"], json!(false));
    }

    #[tokio::test]
    async fn login_failures_map_to_statuses() {
        let accounts = Router::new().route("/login", post(|| async { Json(json!({"success": false})) }));
        let base = spawn_stub(accounts).await;
        let app = router(state(endpoints(&[(Service::Accounts, &base)]).await));

        let response = app
            .clone()
            .oneshot(json_req(Method::POST, "/login", json!({"email": "", "password": "pw"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(json_req(
                Method::POST,
                "/login",
                json!({"email": "a@b.org", "password": "pw"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn login_rejection_kind_selects_status() {
        let accounts = Router::new().route(
            "/login",
            post(|| async {
                Json(json!({"success": true, "account": [5, "n@x.org", "Nia", "pw", 3]}))
            }),
        );
        let base = spawn_stub(accounts).await;
        let app = router(state(endpoints(&[(Service::Accounts, &base)]).await));
        let credentials = json!({"email": "n@x.org", "password": "pw"});

        let response = app
            .oneshot(json_req(Method::POST, "/login", credentials.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["message"], "Invalid role");

        let offline = router(state(endpoints(&[]).await));
        let response = offline
            .oneshot(json_req(Method::POST, "/login", credentials))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_json(response).await["message"],
            "An error occurred while processing your request."
        );
    }

    #[tokio::test]
    async fn profile_shows_logged_in_doctor_without_password() {
        let doctors = Router::new().route(
            "/get-doctor/:id",
            get(|| async {
                Json(json!([
                    12, "Dr D", "d.jpg", "d@x.org", "secret", 1, true,
                    "Senior", "555-7", 4, true, "1970-01-01"
                ]))
            }),
        );
        let base = spawn_stub(doctors).await;
        let state = state(endpoints(&[(Service::Doctors, &base)]).await);
        log_in_as(&state, 12, Role::Doctor);
        let app = router(state);

        let response = app.oneshot(get_req("/profile")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["account"]["email"], "d@x.org");
        assert_eq!(body["number_of_patients"], 4);
        assert!(!body.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn patients_are_filtered_by_name() {
        let patients = Router::new().route(
            "/get-patients/:id",
            get(|| async {
                Json(json!([
                    [1, "a@x.org", "1", "Alice Moreau", 30, "a.jpg"],
                    [2, "b@x.org", "2", "Bob Stone", 41, "b.jpg"]
                ]))
            }),
        );
        let base = spawn_stub(patients).await;
        let state = state(endpoints(&[(Service::Patients, &base)]).await);
        log_in_as(&state, 12, Role::Doctor);
        let app = router(state);

        let response = app.oneshot(get_req("/patients?filter=alice")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let patients = body["patients"].as_array().unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0]["name"], "Alice Moreau");
    }

    #[tokio::test]
    async fn all_zero_ratings_are_rejected() {
        let state = state(endpoints(&[]).await);
        log_in_as(&state, 12, Role::Doctor);
        let app = router(state);

        let response = app
            .oneshot(json_req(
                Method::POST,
                "/patients/assessment",
                json!({
                    "patient": {"name": "Rosa"},
                    "diseaseRating": 0, "ckdRating": 0, "sirRating": 0, "maRating": 0
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await["message"],
            "Please enter values greater than 0 for at least one rating."
        );
    }

    #[tokio::test]
    async fn assessment_returns_tiered_components() {
        let ops = Router::new().route(
            "/get-risk-assessment",
            post(|| async { Json(json!({"message": "- High risk\nCKD: 80%\nSIR: 20%"})) }),
        );
        let base = spawn_stub(ops).await;
        let state = state(endpoints(&[(Service::DatasetOps, &base)]).await);
        log_in_as(&state, 12, Role::Doctor);
        let app = router(state);

        let response = app
            .oneshot(json_req(
                Method::POST,
                "/patients/assessment",
                json!({
                    "patient": {"name": "Rosa", "age": "61"},
                    "diseaseRating": 2, "ckdRating": 5, "sirRating": 1, "maRating": 0
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["assessment"], "High risk");
        assert_eq!(body["components"][0]["tier"], "high");
        assert_eq!(body["components"][1]["tier"], "low");
    }

    #[tokio::test]
    async fn account_form_is_validated_before_sending() {
        let state = state(endpoints(&[]).await);
        log_in_as(&state, 1, Role::Admin);
        let app = router(state);

        let response = app
            .oneshot(json_req(
                Method::POST,
                "/accounts",
                json!({"email": "bad", "username": "newdoc", "password": "secret1", "role": "doctor"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deleting_unknown_account_is_not_found() {
        let accounts = Router::new().route(
            "/get-accounts",
            post(|| async {
                Json(json!({"success": true, "accounts": [[5, "e@x.org", "E", "pw", 1]]}))
            }),
        );
        let base = spawn_stub(accounts).await;
        let state = state(endpoints(&[(Service::Accounts, &base)]).await);
        log_in_as(&state, 1, Role::Admin);
        let app = router(state);

        let request = axum::http::Request::builder()
            .method(Method::DELETE)
            .uri("/accounts/99")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dashboard_reports_each_service() {
        let accounts = Router::new().route(
            "/health",
            get(|| async { Json(json!({"status": "ok"})) }),
        );
        let base = spawn_stub(accounts).await;
        let state = state(endpoints(&[(Service::Accounts, &base)]).await);
        log_in_as(&state, 1, Role::Admin);
        let app = router(state);

        let response = app.oneshot(get_req("/dashboard")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["operational"], 1);
        assert_eq!(body["down"], 9);
        assert_eq!(body["services"].as_array().unwrap().len(), 10);
        assert_eq!(body["services"][0]["service"], "Accounts");
        assert_eq!(body["widgets"], Value::Null);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = router(state(endpoints(&[]).await));

        let response = app
            .oneshot(get_req("/api-docs/openapi.json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let doc = body_json(response).await;
        assert!(doc["paths"].get("/patients/assessment").is_some());
    }
}
