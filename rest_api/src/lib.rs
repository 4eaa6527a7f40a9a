// rest_api/src/lib.rs
//! HTTP boundary for the clinic assistant. Every route lives under
//! `/api/v1`; a bearer token is resolved to a principal for each request and
//! protected routes are wrapped in the authorization gate.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error as AnyhowError};
use axum::{
    extract::DefaultBodyLimit,
    http::{Method, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use lib::{AppConfig, ClinicError, ClinicStorage, Classifier, SledClinicStorage};
use security::middleware::{authenticate, guard, AuthState};
use security::{AuthError, GateError, PrincipalResolver, Requirement, TokenIssuer, SUPER_ADMIN_ROLE};

pub mod handlers;

#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Clinic(#[from] ClinicError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

fn auth_status(e: &AuthError) -> StatusCode {
    match e {
        AuthError::InvalidCredentials | AuthError::InactiveAccount => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            RestApiError::Gate(e) => return e.into_response(),
            RestApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            RestApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            RestApiError::Auth(e) => (auth_status(&e), e.to_string()),
            RestApiError::Clinic(e) => {
                let status = match &e {
                    ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
                    ClinicError::AlreadyExists(_) | ClinicError::Conflict(_) => StatusCode::CONFLICT,
                    ClinicError::InvalidData(_) | ClinicError::Validation(_) | ClinicError::JsonError(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    ClinicError::Auth(inner) => auth_status(inner),
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    error!("Request failed: {}", e);
                    (status, "Internal server error".to_string())
                } else {
                    (status, e.to_string())
                }
            }
        };

        let body = Json(json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, RestApiError>;

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<SledClinicStorage>,
    pub classifier: Arc<Classifier>,
    pub tokens: Arc<TokenIssuer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Loads the knowledge base from `storage` and sets up token signing.
    pub async fn build(config: AppConfig, storage: Arc<SledClinicStorage>) -> Result<Self, ClinicError> {
        let tokens = match &config.security.jwt_secret {
            Some(secret) => TokenIssuer::new(secret.as_bytes(), config.security.token_ttl_hours),
            None => {
                warn!("No token secret configured; using a random secret, issued tokens will not survive a restart");
                TokenIssuer::ephemeral(config.security.token_ttl_hours)
            }
        };
        let knowledge_base = storage.load_knowledge_base().await?;
        info!(
            "Knowledge base holds {} surgery types and {} diet phases",
            knowledge_base.surgery_types().len(),
            knowledge_base.diet_phases().len()
        );
        let classifier = Classifier::new(Arc::new(knowledge_base)).with_match_mode(config.chat.match_mode);

        Ok(AppState {
            storage,
            classifier: Arc::new(classifier),
            tokens: Arc::new(tokens),
            config: Arc::new(config),
        })
    }
}

fn guarded(router: Router<AppState>, requirement: Requirement) -> Router<AppState> {
    router.route_layer(from_fn_with_state(Arc::new(requirement), guard))
}

pub fn build_router(state: AppState) -> Router {
    let resolver: Arc<dyn PrincipalResolver> = state.storage.clone();
    let auth = AuthState { tokens: state.tokens.clone(), resolver };

    let admin = guarded(
        Router::new()
            .route("/admin/dashboard", get(handlers::dashboard))
            .route("/admin/users", get(handlers::list_users))
            .route("/users/:id", put(handlers::update_user)),
        Requirement::Admin,
    );
    let super_admin = guarded(
        Router::new().route("/admin/roles", get(handlers::list_roles)),
        Requirement::any_role([SUPER_ADMIN_ROLE]),
    );
    let auditors = guarded(
        Router::new().route("/admin/audit-logs", get(handlers::list_audit_logs)),
        Requirement::all_permissions(["view_audit_logs"]),
    );
    let schedulers = guarded(
        Router::new()
            .route("/admin/appointments", get(handlers::list_appointments))
            .route("/admin/appointments/stats", get(handlers::appointment_stats))
            .route("/appointments", post(handlers::create_appointment))
            .route("/appointments/:id", put(handlers::update_appointment)),
        Requirement::all_permissions(["manage_appointments"]),
    );

    let max_message_bytes = state.config.chat.max_message_bytes;
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/chat", post(handlers::chat).layer(DefaultBodyLimit::max(max_message_bytes)))
        .route("/chat/history", get(handlers::chat_history))
        .route("/chat/:id/feedback", post(handlers::chat_feedback))
        .route("/eligibility", post(handlers::eligibility))
        .route("/diet-plans/:surgery_type/:phase", get(handlers::diet_plan))
        .route("/appointments/slots", get(handlers::appointment_slots))
        .merge(admin)
        .merge(super_admin)
        .merge(auditors)
        .merge(schedulers)
        .layer(from_fn_with_state(auth, authenticate))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new().nest("/api/v1", api).layer(cors)
}

/// Binds the configured address and serves until `shutdown` resolves.
pub async fn start_server<F>(state: AppState, shutdown: F) -> Result<(), AnyhowError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .context("Invalid listen address")?;
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to address: {}", addr))?;
    info!("REST API server listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .context("REST API server failed to start or run")?;

    info!("REST API server stopped.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use lib::bootstrap;
    use models::medical::{NewUser, User};
    use security::RolesConfig;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn test_state() -> AppState {
        let mut config = AppConfig::default();
        config.security.jwt_secret = Some("router-test-secret".into());
        let storage = Arc::new(SledClinicStorage::temporary().unwrap());
        bootstrap::init(storage.as_ref(), &RolesConfig::default()).await.unwrap();
        AppState::build(config, storage).await.unwrap()
    }

    async fn add_user(state: &AppState, username: &str, roles: &[&str]) -> (User, String) {
        let user = bootstrap::register_user(
            state.storage.as_ref(),
            NewUser {
                username: username.into(),
                email: format!("{}@clinic.test", username),
                password: "password1".into(),
                first_name: "Sam".into(),
                last_name: "Lee".into(),
                phone: None,
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
        )
        .await
        .unwrap();
        let token = state.tokens.issue(&user).unwrap();
        (user, token)
    }

    async fn send(
        state: &AppState,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = build_router(state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_is_public() {
        let state = test_state().await;
        let (status, body) = send(&state, Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn anonymous_chat_is_answered_but_not_stored() {
        let state = test_state().await;
        let (status, body) = send(
            &state,
            Method::POST,
            "/api/v1/chat",
            None,
            Some(json!({"message": "What is the cost of gastric bypass?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"], "cost_info");
        assert!(body.get("message_id").is_none());
        assert_eq!(state.storage.count_chat_history().await.unwrap(), 0);

        let (status, _) = send(&state, Method::POST, "/api/v1/chat", None, Some(json!({"message": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_issues_working_token() {
        let state = test_state().await;
        add_user(&state, "drgrey", &["doctor"]).await;

        let (status, _) = send(
            &state,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"username": "drgrey", "password": "wrong-one"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"username": "drgrey", "password": "password1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["user"].get("password_hash").is_none());
        let token = body["token"].as_str().unwrap().to_string();

        let (status, _) = send(&state, Method::POST, "/api/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let actions: Vec<String> = state
            .storage
            .list_audit_logs()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.action)
            .collect();
        assert_eq!(actions, ["logout", "login"]);
    }

    #[tokio::test]
    async fn chat_history_and_feedback_belong_to_caller() {
        let state = test_state().await;
        let (_, token) = add_user(&state, "patient1", &[]).await;
        let (_, other) = add_user(&state, "patient2", &[]).await;

        let (_, body) = send(&state, Method::POST, "/api/v1/chat", Some(&token), Some(json!({"message": "hello"}))).await;
        assert_eq!(body["intent"], "greeting");
        let id = body["message_id"].as_u64().unwrap();

        let (status, page) = send(&state, Method::GET, "/api/v1/chat/history", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 1);

        let uri = format!("/api/v1/chat/{}/feedback", id);
        let (status, _) = send(&state, Method::POST, &uri, Some(&other), Some(json!({"helpful": true}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, rated) = send(&state, Method::POST, &uri, Some(&token), Some(json!({"helpful": true}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rated["feedback"], true);

        let (status, _) = send(&state, Method::GET, "/api/v1/chat/history", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_follow_role_requirements() {
        let state = test_state().await;
        let (_, super_admin) = add_user(&state, "rootadmin", &[SUPER_ADMIN_ROLE]).await;
        let (_, admin) = add_user(&state, "officeadmin", &["admin"]).await;
        let (_, doctor) = add_user(&state, "drhouse", &["doctor"]).await;

        let dashboard = "/api/v1/admin/dashboard";
        assert_eq!(send(&state, Method::GET, dashboard, None, None).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(send(&state, Method::GET, dashboard, Some(&doctor), None).await.0, StatusCode::FORBIDDEN);
        let (status, body) = send(&state, Method::GET, dashboard, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_users"], 3);

        let roles = "/api/v1/admin/roles";
        assert_eq!(send(&state, Method::GET, roles, Some(&admin), None).await.0, StatusCode::FORBIDDEN);
        assert_eq!(send(&state, Method::GET, roles, Some(&super_admin), None).await.0, StatusCode::OK);

        let audit = "/api/v1/admin/audit-logs";
        assert_eq!(send(&state, Method::GET, audit, Some(&admin), None).await.0, StatusCode::OK);
        assert_eq!(send(&state, Method::GET, audit, Some(&doctor), None).await.0, StatusCode::FORBIDDEN);
        assert_eq!(send(&state, Method::GET, audit, Some(&super_admin), None).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn deactivated_user_loses_access() {
        let state = test_state().await;
        let (_, admin) = add_user(&state, "officeadmin", &["admin"]).await;
        let (nurse, nurse_token) = add_user(&state, "nurse22", &["staff"]).await;

        let uri = format!("/api/v1/users/{}", nurse.id);
        let (status, body) = send(&state, Method::PUT, &uri, Some(&admin), Some(json!({"is_active": false}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_active"], false);

        let (status, _) = send(&state, Method::POST, "/api/v1/auth/logout", Some(&nurse_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&state, Method::PUT, &uri, Some(&admin), Some(json!({"roles": ["wizard"]}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn appointments_are_booked_once_per_slot() {
        let state = test_state().await;
        let (doctor, doctor_token) = add_user(&state, "drstrange", &["doctor"]).await;
        let (patient, _) = add_user(&state, "patient9", &[]).await;

        let request = json!({
            "patient_id": patient.id,
            "doctor_id": doctor.id,
            "scheduled_time": "2031-05-05T09:30:00Z",
            "appointment_type": "consultation",
        });
        let (status, created) =
            send(&state, Method::POST, "/api/v1/appointments", Some(&doctor_token), Some(request.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["status"], "scheduled");

        let (status, _) = send(&state, Method::POST, "/api/v1/appointments", Some(&doctor_token), Some(request)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let slots_uri = format!("/api/v1/appointments/slots?doctor_id={}&date=2031-05-05", doctor.id);
        let (_, slots) = send(&state, Method::GET, &slots_uri, None, None).await;
        let taken: Vec<&Value> = slots.as_array().unwrap().iter().filter(|s| s["available"] == false).collect();
        assert_eq!(taken.len(), 1);

        let uri = format!("/api/v1/appointments/{}", created["id"]);
        let (status, updated) =
            send(&state, Method::PUT, &uri, Some(&doctor_token), Some(json!({"status": "cancelled"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "cancelled");

        let (_, stats) = send(&state, Method::GET, "/api/v1/admin/appointments/stats", Some(&doctor_token), None).await;
        assert_eq!(stats["cancelled"], 1);

        let (status, _) =
            send(&state, Method::GET, "/api/v1/admin/appointments?days=-1", Some(&doctor_token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(
            &state,
            Method::GET,
            "/api/v1/admin/appointments?days=9223372036854775807",
            Some(&doctor_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn diet_plans_are_looked_up_by_procedure_and_phase() {
        let state = test_state().await;
        let (status, plan) =
            send(&state, Method::GET, "/api/v1/diet-plans/sleeve_gastrectomy/pre_op", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(plan["phase"], "pre_op");
        assert_eq!(plan["duration"], "2 weeks before surgery");
        assert!(plan["restricted_foods"].as_array().unwrap().iter().any(|f| f == "Caffeine"));

        let (status, body) =
            send(&state, Method::GET, "/api/v1/diet-plans/sleeve_gastrectomy/maintenance", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn eligibility_derives_bmi() {
        let state = test_state().await;
        let (status, body) = send(
            &state,
            Method::POST,
            "/api/v1/eligibility",
            None,
            Some(json!({"weight_kg": 120.0, "height_cm": 170.0, "age": 40})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bmi"], 41.5);
        assert_eq!(body["eligible"], true);

        let (status, _) = send(&state, Method::POST, "/api/v1/eligibility", None, Some(json!({"age": 40}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
