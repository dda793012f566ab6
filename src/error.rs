use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Request-level failures, rendered as the JSON bodies the companion app
/// already understands.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400 `{created: false, error}` with the store's constraint message.
    #[error("{0}")]
    Validation(String),
    /// 400 `{created: false, errorMsg}` — the character endpoints report
    /// failures under the older `errorMsg` key.
    #[error("{0}")]
    CharacterValidation(String),
    /// 401 on a failed login attempt.
    #[error("invalid username or password")]
    InvalidCredentials,
    /// 401 `{loggedOut: true}` from the access-token check.
    #[error("unauthorized")]
    LoggedOut,
    /// 404 for a lookup-by-id that resolved nothing.
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "created": false, "error": msg }),
            ),
            ApiError::CharacterValidation(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "created": false, "errorMsg": msg }),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": self.to_string() }),
            ),
            ApiError::LoggedOut => (StatusCode::UNAUTHORIZED, json!({ "loggedOut": true })),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "message": self.to_string() })),
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Pulls the database's own constraint-violation message out of an error
/// chain, when the failure came from the store rejecting a write.
pub fn constraint_message(err: &anyhow::Error) -> Option<String> {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) => Some(db.message().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_renders_created_false_with_error() {
        let resp = ApiError::Validation("duplicate key".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["created"], false);
        assert_eq!(body["error"], "duplicate key");
    }

    #[tokio::test]
    async fn character_validation_uses_error_msg_key() {
        let resp = ApiError::CharacterValidation("bad payload".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["errorMsg"], "bad payload");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn logged_out_is_the_fixed_401_payload() {
        let resp = ApiError::LoggedOut.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(resp).await;
        assert_eq!(body, serde_json::json!({ "loggedOut": true }));
    }

    #[tokio::test]
    async fn not_found_is_a_clean_404() {
        let resp = ApiError::NotFound("character").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_json(resp).await;
        assert_eq!(body["message"], "character not found");
    }
}
