// rest_api/src/handlers.rs

use axum::{
    extract::{Path, Query, State},
    http::{header::USER_AGENT, HeaderMap},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use lib::appointments::{self, AppointmentStats, Slot};
use lib::bootstrap;
use lib::clinical::{self, DietPlan, Eligibility};
use lib::storage_engine::touch_last_login;
use lib::{record_audit, ClinicError, ClinicStorage};
use models::medical::{Appointment, AppointmentStatus, AuditLog, Login, NewAppointment, NewAuditLog, Role, UserView};
use models::{ChatResponse, Page};
use security::{check_credentials, AuthError, GateError, Principal};

use crate::{ApiResult, AppState, RestApiError};

fn client_info(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };
    let ip = header("x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .or_else(|| header("x-real-ip"));
    (ip, header(USER_AGENT.as_str()))
}

fn signed_in(principal: &Principal) -> ApiResult<Uuid> {
    match (principal.is_authenticated(), principal.user_id) {
        (true, Some(id)) => Ok(id),
        _ => Err(GateError::Unauthenticated.into()),
    }
}

async fn audit(state: &AppState, principal: &Principal, headers: &HeaderMap, action: &str, details: Value) {
    let (ip, agent) = client_info(headers);
    let entry = NewAuditLog::new(principal.user_id, action)
        .with_details(details)
        .with_client(ip, agent);
    record_audit(state.storage.as_ref(), entry).await;
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

impl PageQuery {
    fn page(&self) -> usize {
        self.page.unwrap_or(1)
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub user: UserView,
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Login>,
) -> ApiResult<Json<LoginResponse>> {
    let mut user = state
        .storage
        .get_user_by_username(&payload.username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    if let Err(e) = check_credentials(&user, &payload.password) {
        debug!("Login for {} rejected: {}", payload.username, e);
        return Err(e.into());
    }

    touch_last_login(state.storage.as_ref(), &mut user).await?;
    let token = state.tokens.issue(&user)?;
    let principal = Principal::for_user(&user, Vec::new());
    audit(&state, &principal, &headers, "login", json!({ "username": user.username })).await;
    info!("User {} signed in", user.username);

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in: state.tokens.ttl_secs(),
        user: UserView::from(&user),
    }))
}

/// Tokens are stateless; signing out only leaves an audit trail.
pub async fn logout(State(state): State<AppState>, principal: Principal, headers: HeaderMap) -> ApiResult<Json<Value>> {
    signed_in(&principal)?;
    audit(&state, &principal, &headers, "logout", json!({})).await;
    Ok(Json(json!({ "status": "ok", "message": "You have been logged out." })))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    #[serde(flatten)]
    pub response: ChatResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<u64>,
}

/// Answers a chat message. Exchanges of signed-in users are kept in their
/// history; a failure to store one does not fail the answer.
pub async fn chat(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<ChatRequest>,
) -> ApiResult<Json<ChatReply>> {
    if payload.message.trim().is_empty() {
        return Err(RestApiError::InvalidInput("No message provided".into()));
    }
    let response = state.classifier.classify(&payload.message);

    let message_id = match principal.user_id.filter(|_| principal.is_authenticated()) {
        Some(user_id) => match state.storage.add_chat_history(user_id, &payload.message, &response).await {
            Ok(entry) => Some(entry.id),
            Err(e) => {
                warn!("Failed to store chat history for {}: {}", user_id, e);
                None
            }
        },
        None => None,
    };

    Ok(Json(ChatReply { response, message_id }))
}

pub async fn chat_history(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<models::medical::ChatHistory>>> {
    let user_id = signed_in(&principal)?;
    let history = state.storage.list_chat_history(&user_id).await?;
    Ok(Json(Page::paginate(history, query.page(), state.config.items_per_page)))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub helpful: bool,
}

pub async fn chat_feedback(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<u64>,
    Json(payload): Json<FeedbackRequest>,
) -> ApiResult<Json<models::medical::ChatHistory>> {
    let user_id = signed_in(&principal)?;
    let entry = state.storage.set_chat_feedback(id, &user_id, payload.helpful).await?;
    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
pub struct EligibilityRequest {
    pub bmi: Option<f64>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub age: u32,
    #[serde(default)]
    pub conditions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub bmi: f64,
    #[serde(flatten)]
    pub eligibility: Eligibility,
}

pub async fn eligibility(Json(payload): Json<EligibilityRequest>) -> ApiResult<Json<EligibilityResponse>> {
    let bmi = match (payload.bmi, payload.weight_kg, payload.height_cm) {
        (Some(bmi), _, _) => bmi,
        (None, Some(weight), Some(height)) => clinical::calculate_bmi(weight, height)
            .ok_or_else(|| RestApiError::InvalidInput("weight and height must be positive".into()))?,
        _ => return Err(RestApiError::InvalidInput("either bmi or weight_kg and height_cm are required".into())),
    };
    let eligibility = clinical::check_eligibility(bmi, payload.age, &payload.conditions);
    Ok(Json(EligibilityResponse { bmi, eligibility }))
}

pub async fn diet_plan(
    State(state): State<AppState>,
    Path((surgery_type, phase)): Path<(String, String)>,
) -> ApiResult<Json<DietPlan>> {
    clinical::generate_diet_plan(state.classifier.knowledge_base(), &surgery_type, &phase)
        .map(Json)
        .ok_or_else(|| RestApiError::NotFound(format!("diet plan {} for {}", phase, surgery_type)))
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

pub async fn appointment_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotQuery>,
) -> ApiResult<Json<Vec<Slot>>> {
    let booked = state.storage.list_appointments().await?;
    Ok(Json(appointments::generate_slots(
        query.date,
        &query.doctor_id,
        &booked,
        &state.config.scheduling,
    )))
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub total_users: usize,
    pub total_chats: usize,
    pub total_appointments: usize,
    pub appointments: AppointmentStats,
    pub recent_activities: Vec<AuditEntry>,
}

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<Dashboard>> {
    let storage = &state.storage;
    let appointments = storage.list_appointments().await?;
    let recent_activities = storage
        .list_audit_logs()
        .await?
        .into_iter()
        .take(10)
        .map(AuditEntry::from)
        .collect();

    Ok(Json(Dashboard {
        total_users: storage.list_users().await?.len(),
        total_chats: storage.count_chat_history().await?,
        total_appointments: appointments.len(),
        appointments: appointments::statistics(&appointments, Utc::now()),
        recent_activities,
    }))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<UserView>>> {
    let users = bootstrap::list_users(state.storage.as_ref()).await?;
    Ok(Json(Page::paginate(users, query.page(), state.config.items_per_page)))
}

pub async fn list_roles(State(state): State<AppState>) -> ApiResult<Json<Vec<Role>>> {
    Ok(Json(state.storage.list_roles().await?))
}

/// An audit log entry with its details decoded.
#[derive(Debug, Serialize)]
pub struct AuditEntry {
    pub id: u64,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub details: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLog> for AuditEntry {
    fn from(log: AuditLog) -> Self {
        AuditEntry {
            details: log.details_json(),
            id: log.id,
            user_id: log.user_id,
            action: log.action,
            ip_address: log.ip_address,
            user_agent: log.user_agent,
            created_at: log.created_at,
        }
    }
}

pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<AuditEntry>>> {
    let logs = state.storage.list_audit_logs().await?;
    Ok(Json(
        Page::paginate(logs, query.page(), state.config.items_per_page).map(AuditEntry::from),
    ))
}

#[derive(Debug, Deserialize)]
pub struct AppointmentQuery {
    pub page: Option<usize>,
    /// Restrict to non-cancelled appointments in the next N days.
    pub days: Option<i64>,
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Query(query): Query<AppointmentQuery>,
) -> ApiResult<Json<Page<Appointment>>> {
    let all = state.storage.list_appointments().await?;
    let listed = match query.days {
        Some(days) => appointments::upcoming(&all, Utc::now(), days)?,
        None => all.into_iter().rev().collect(),
    };
    Ok(Json(Page::paginate(listed, query.page.unwrap_or(1), state.config.items_per_page)))
}

pub async fn appointment_stats(State(state): State<AppState>) -> ApiResult<Json<AppointmentStats>> {
    let all = state.storage.list_appointments().await?;
    Ok(Json(appointments::statistics(&all, Utc::now())))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateUserRequest {
    pub roles: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserView>> {
    let storage = state.storage.as_ref();
    if let Some(roles) = payload.roles.clone() {
        bootstrap::assign_roles(storage, &id, roles).await?;
    }
    let mut user = storage
        .get_user(&id)
        .await?
        .ok_or_else(|| RestApiError::NotFound(format!("user {}", id)))?;
    if let Some(active) = payload.is_active {
        user.is_active = active;
    }
    if let Some(first_name) = payload.first_name.clone().filter(|s| !s.trim().is_empty()) {
        user.first_name = first_name;
    }
    if let Some(last_name) = payload.last_name.clone().filter(|s| !s.trim().is_empty()) {
        user.last_name = last_name;
    }
    if let Some(phone) = &payload.phone {
        user.phone = clinical::format_phone_number(phone);
    }
    user.updated_at = Utc::now();
    storage.update_user(&user).await?;

    audit(
        &state,
        &principal,
        &headers,
        "update_user",
        json!({ "target_user_id": id, "changes": payload }),
    )
    .await;
    Ok(Json(UserView::from(&user)))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    Json(payload): Json<NewAppointment>,
) -> ApiResult<Json<Appointment>> {
    let storage = state.storage.as_ref();
    for (label, id) in [("patient", payload.patient_id), ("doctor", payload.doctor_id)] {
        if storage.get_user(&id).await?.is_none() {
            return Err(RestApiError::InvalidInput(format!("unknown {} {}", label, id)));
        }
    }
    let appointment = appointments::book(storage, payload).await?;
    audit(
        &state,
        &principal,
        &headers,
        "create_appointment",
        json!({ "appointment_id": appointment.id }),
    )
    .await;
    Ok(Json(appointment))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateAppointmentRequest {
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
    pub scheduled_time: Option<DateTime<Utc>>,
}

pub async fn update_appointment(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(payload): Json<UpdateAppointmentRequest>,
) -> ApiResult<Json<Appointment>> {
    let storage = state.storage.as_ref();
    let mut appointment = storage
        .get_appointment(id)
        .await?
        .ok_or_else(|| RestApiError::NotFound(format!("appointment {}", id)))?;

    if let Some(time) = payload.scheduled_time {
        let clash = storage.list_appointments().await?.iter().any(|a| {
            a.id != id && a.doctor_id == appointment.doctor_id && !a.is_cancelled() && a.scheduled_time == time
        });
        if clash {
            return Err(ClinicError::Conflict(format!("doctor {} is already booked at {}", appointment.doctor_id, time)).into());
        }
        appointment.scheduled_time = time;
    }
    if let Some(status) = payload.status {
        appointment.status = status;
    }
    if let Some(notes) = &payload.notes {
        appointment.notes = Some(notes.clone());
    }
    appointment.updated_at = Utc::now();
    storage.update_appointment(&appointment).await?;

    audit(
        &state,
        &principal,
        &headers,
        "update_appointment",
        json!({ "appointment_id": id, "changes": payload }),
    )
    .await;
    Ok(Json(appointment))
}
