// security/src/middleware.rs
//! axum wiring for the authorization gate.
//!
//! `authenticate` runs once per request and stores a [`Principal`] in the
//! request extensions, falling back to an anonymous one. `guard` is layered
//! on individual routes and rejects the request before the handler runs.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::gate::{GateError, Principal, Requirement};
use crate::{PrincipalResolver, TokenIssuer};

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenIssuer>,
    pub resolver: Arc<dyn PrincipalResolver>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|hv| hv.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn resolve_principal(state: &AuthState, headers: &HeaderMap) -> Principal {
    let Some(token) = bearer_token(headers) else {
        return Principal::anonymous();
    };

    let claims = match state.tokens.validate(token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Rejected bearer token: {}", e);
            return Principal::anonymous();
        }
    };

    match state.resolver.resolve(&claims).await {
        Ok(Some(principal)) => principal,
        Ok(None) => {
            debug!("Token subject {} no longer resolves to an active user", claims.sub);
            Principal::anonymous()
        }
        Err(e) => {
            warn!("Failed to resolve principal for {}: {}", claims.sub, e);
            Principal::anonymous()
        }
    }
}

pub async fn authenticate(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let principal = resolve_principal(&state, req.headers()).await;
    req.extensions_mut().insert(principal);
    next.run(req).await
}

pub async fn guard(
    State(requirement): State<Arc<Requirement>>,
    req: Request,
    next: Next,
) -> Result<Response, GateError> {
    let decision = match req.extensions().get::<Principal>() {
        Some(principal) => requirement.check(principal),
        None => requirement.check(&Principal::anonymous()),
    };
    if let Err(e) = decision.into_result() {
        debug!("{} {} rejected: {}", req.method(), req.uri().path(), e);
        return Err(e);
    }
    Ok(next.run(req).await)
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = match self {
            GateError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GateError::Forbidden => StatusCode::FORBIDDEN,
        };
        let body = Json(json!({
            "status": "error",
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Principal>()
            .cloned()
            .unwrap_or_else(Principal::anonymous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthError, Claims};
    use axum::{body::Body, http, middleware::from_fn_with_state, routing::get, Router};
    use models::medical::{NewUser, Role, User};
    use std::collections::HashMap;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct StaticResolver(HashMap<Uuid, Principal>);

    #[async_trait]
    impl PrincipalResolver for StaticResolver {
        async fn resolve(&self, claims: &Claims) -> Result<Option<Principal>, AuthError> {
            Ok(self.0.get(&claims.uid).cloned())
        }
    }

    fn user(name: &str) -> User {
        User::from_new_user(
            NewUser {
                username: name.into(),
                email: format!("{}@example.com", name),
                password: String::new(),
                first_name: "Test".into(),
                last_name: "User".into(),
                phone: None,
                roles: Vec::new(),
            },
            String::new(),
        )
    }

    fn app(tokens: Arc<TokenIssuer>, principals: HashMap<Uuid, Principal>) -> Router {
        let auth = AuthState { tokens, resolver: Arc::new(StaticResolver(principals)) };
        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .route_layer(from_fn_with_state(Arc::new(Requirement::Admin), guard))
            .route("/whoami", get(|p: Principal| async move { p.username.unwrap_or_default() }))
            .layer(from_fn_with_state(auth, authenticate))
    }

    async fn status_for(app: Router, path: &str, token: Option<&str>) -> StatusCode {
        let mut builder = http::Request::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap().status()
    }

    #[tokio::test]
    async fn guard_maps_decisions_to_status_codes() {
        let tokens = Arc::new(TokenIssuer::ephemeral(1));
        let admin = user("admin1");
        let doctor = user("doctor1");
        let principals = HashMap::from([
            (admin.id, Principal::for_user(&admin, vec![Role::new("admin", "", Vec::new())])),
            (doctor.id, Principal::for_user(&doctor, vec![Role::new("doctor", "", Vec::new())])),
        ]);
        let admin_token = tokens.issue(&admin).unwrap();
        let doctor_token = tokens.issue(&doctor).unwrap();

        let app = app(tokens, principals);
        assert_eq!(status_for(app.clone(), "/admin", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(app.clone(), "/admin", Some("garbage")).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(app.clone(), "/admin", Some(&doctor_token)).await, StatusCode::FORBIDDEN);
        assert_eq!(status_for(app.clone(), "/admin", Some(&admin_token)).await, StatusCode::OK);
        assert_eq!(status_for(app, "/whoami", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_subject_is_anonymous() {
        let tokens = Arc::new(TokenIssuer::ephemeral(1));
        let ghost = tokens.issue(&user("ghost1")).unwrap();
        let app = app(tokens, HashMap::new());
        assert_eq!(status_for(app, "/admin", Some(&ghost)).await, StatusCode::UNAUTHORIZED);
    }
}
