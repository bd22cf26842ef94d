// HTTP surface over the authorizer

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthDecision, AuthError, Authorizer, Credentials};

pub type AppState = Arc<Authorizer>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/authorize", get(authorize))
        .route("/whoami", get(whoami))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

async fn authorize(State(authorizer): State<AppState>, headers: HeaderMap) -> Response {
    let result = authorizer.authorize(&Credentials::from(&headers)).await;
    decision_response(result)
}

/// Identity lookup for the OAuth handshake; the whitelist is not applied.
async fn whoami(State(authorizer): State<AppState>, headers: HeaderMap) -> Response {
    let result = authorizer.identify(&Credentials::from(&headers)).await;
    decision_response(result)
}

fn decision_response(result: Result<AuthDecision, AuthError>) -> Response {
    match result {
        // The upstream access token stays server-side.
        Ok(AuthDecision::Allowed(user)) => Json(json!({
            "status": "allowed",
            "user": {
                "email": user.email,
                "cacheAllowed": user.cache_allowed,
            }
        }))
        .into_response(),
        Ok(AuthDecision::Redirect(url)) => Json(json!({
            "status": "redirect",
            "url": url,
        }))
        .into_response(),
        Err(err) => {
            let status = StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        MemorySessionStore, OAuthRedirect, OAuthRedirectConfig, TokenVerifier, User,
        VerifyError, Whitelist,
    };
    use crate::types::AccessToken;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    struct AcceptAll;

    #[async_trait]
    impl TokenVerifier for AcceptAll {
        async fn verify(&self, _access_token: &AccessToken) -> Result<(), VerifyError> {
            Ok(())
        }
    }

    async fn app() -> Router {
        let store = MemorySessionStore::new(
            Duration::from_secs(300),
            OAuthRedirect::new(OAuthRedirectConfig {
                authorize_url: "https://idp.example.com/authorize".to_string(),
                client_id: "cid".to_string(),
                callback_url: None,
                scope: None,
            }),
        );
        store
            .insert_user("member", User::new("member@example.com").with_access_token("gho"))
            .await;
        store
            .insert_user("outsider", User::new("outsider@example.com").with_access_token("gho"))
            .await;
        store
            .insert_user("fresh", User::new("member@example.com"))
            .await;

        let authorizer = Authorizer::new(
            Arc::new(store),
            Arc::new(AcceptAll),
            Whitelist::from_entries(["member@example.com"]),
        );
        create_router(Arc::new(authorizer))
    }

    async fn call(app: Router, path: &str, auth: Option<&str>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(path);
        if let Some(auth) = auth {
            request = request.header("authorization", auth);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(app().await, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_authorize_allowed() {
        let (status, body) = call(app().await, "/authorize", Some("Bearer member")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "allowed");
        assert_eq!(body["user"]["email"], "member@example.com");
        assert_eq!(body["user"]["cacheAllowed"], false);
        assert!(body["user"].get("accessToken").is_none());
    }

    #[tokio::test]
    async fn test_authorize_missing_header_is_404() {
        let (status, body) = call(app().await, "/authorize", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not found");
    }

    #[tokio::test]
    async fn test_authorize_outsider_is_402_but_whoami_allows() {
        let app = app().await;
        let (status, body) = call(app.clone(), "/authorize", Some("Bearer outsider")).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert!(body["error"].as_str().unwrap().contains("outsider@example.com"));

        let (status, body) = call(app, "/whoami", Some("Bearer outsider")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "allowed");
    }

    #[tokio::test]
    async fn test_authorize_redirect() {
        let (status, body) = call(app().await, "/authorize", Some("Bearer fresh")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "redirect");
        assert!(body["url"].as_str().unwrap().contains("state=fresh"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let (status, body) = call(app().await, "/authorize", Some("Bearer ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "session not found");
    }
}
