//! HTTP responses for [`AuthError`].

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = error_details(&self);

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(error_code, message);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(error_json(error_code, message))).into_response()
    }
}

/// Returns (HTTP status, OAuth error code, message).
fn error_details(error: &AuthError) -> (StatusCode, &'static str, &str) {
    match error {
        AuthError::Unauthorized { message } => {
            (StatusCode::UNAUTHORIZED, "invalid_token", message.as_str())
        }
        AuthError::BadRequest { message } => {
            (StatusCode::BAD_REQUEST, "invalid_request", message.as_str())
        }
        AuthError::Internal { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            message.as_str(),
        ),
    }
}

/// Format: `Bearer realm="keyward", error="invalid_token", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped_desc = description.replace('"', "\\\"");
    format!("Bearer realm=\"keyward\", error=\"{error}\", error_description=\"{escaped_desc}\"")
}

/// JSON body used for every error response.
#[must_use]
pub fn error_json(error: &str, description: &str) -> serde_json::Value {
    json!({
        "error": error,
        "error_description": description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_response() {
        let response = AuthError::invalid_token().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(www_auth.starts_with("Bearer "));
        assert!(www_auth.contains("realm=\"keyward\""));
        assert!(www_auth.contains("error=\"invalid_token\""));

        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_token");
        assert_eq!(body["error_description"], "invalid token");
    }

    #[tokio::test]
    async fn test_bad_request_response() {
        let response = AuthError::bad_request("Missing Authorization header").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));

        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_internal_response() {
        let response = AuthError::internal("token service unavailable").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "server_error");
    }

    #[test]
    fn test_www_authenticate_escapes_quotes() {
        let header = build_www_authenticate_header("invalid_token", "say \"hi\"");
        assert!(header.contains(r#"error_description="say \"hi\"""#));
    }
}
