//! Authentication middleware for API key validation.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use fedpay_types::FederationRepository;

use super::handlers::AppState;

/// Extracts the API key from the Authorization header.
/// Expected format: "Bearer <api_key>" or just "<api_key>"
fn extract_api_key(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;
    if header.starts_with("Bearer ") {
        Some(header.strip_prefix("Bearer ").unwrap())
    } else {
        Some(header)
    }
}

/// Whether a request path skips API-key authentication.
///
/// - `/health` - liveness probe
/// - `POST /api/bootstrap` - first-key creation (self-protected)
/// - `/api/webhooks/*` - provider callbacks, authenticated by signature
/// - `/docs`, `/api-docs` - OpenAPI surface
fn is_public(path: &str, method: &axum::http::Method) -> bool {
    path == "/health"
        || (path == "/api/bootstrap" && method == axum::http::Method::POST)
        || path.starts_with("/api/webhooks")
        || path.starts_with("/docs")
        || path.starts_with("/api-docs")
}

/// Authentication middleware that validates API keys.
///
/// Extracts the key from the Authorization header, hashes it with SHA-256
/// and verifies the hash against the database. 401 on failure.
pub async fn auth_middleware<R: FederationRepository>(
    State(state): State<Arc<AppState<R>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_public(request.uri().path(), request.method()) {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let api_key = match extract_api_key(auth_header) {
        Some(key) if !key.is_empty() => key,
        _ => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    let key_hash = fedpay_repo::security::hash_api_key(api_key);

    match state.service.repo().verify_api_key_hash(&key_hash).await {
        Ok(Some(_api_key)) => next.run(request).await,
        Ok(None) => unauthorized_response("Invalid API key"),
        Err(e) => {
            tracing::error!("API key verification failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Internal server error",
                    "code": 500
                })),
            )
                .into_response()
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": message,
            "code": 401
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[test]
    fn test_extract_api_key_bearer() {
        assert_eq!(
            extract_api_key(Some("Bearer sk_test_123")),
            Some("sk_test_123")
        );
    }

    #[test]
    fn test_extract_api_key_raw() {
        assert_eq!(extract_api_key(Some("sk_test_123")), Some("sk_test_123"));
    }

    #[test]
    fn test_extract_api_key_none() {
        assert_eq!(extract_api_key(None), None);
    }

    #[test]
    fn test_webhooks_are_public() {
        assert!(is_public("/api/webhooks/payment", &Method::POST));
        assert!(is_public("/health", &Method::GET));
        assert!(is_public("/api/bootstrap", &Method::POST));
        assert!(!is_public("/api/payments/checkout", &Method::POST));
        assert!(!is_public("/api/bootstrap", &Method::GET));
    }
}
