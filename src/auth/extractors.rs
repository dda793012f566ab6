use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
    RequestPartsExt,
};
use tracing::warn;
use uuid::Uuid;

use crate::{auth::repo::User, error::ApiError, state::AppState};

/// Header carrying the opaque per-user token. Not a bearer scheme.
pub const ACCESS_TOKEN_HEADER: &str = "accesstoken";

/// Resolves the `:id` path segment to a user and checks the `accesstoken`
/// header against the stored token. Every failure mode (missing header,
/// unparseable id, unknown user, mismatched token) is the same 401
/// `{loggedOut: true}`.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(user_id) = parts
            .extract::<Path<Uuid>>()
            .await
            .map_err(|_| ApiError::LoggedOut)?;

        let supplied = parts
            .headers
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::LoggedOut)?
            .to_string();

        let user = User::find_by_id(&state.db, user_id)
            .await
            .map_err(|e| {
                warn!(error = %e, %user_id, "token check lookup failed");
                ApiError::LoggedOut
            })?
            .ok_or_else(|| {
                warn!(%user_id, "token check for unknown user");
                ApiError::LoggedOut
            })?;

        if user.access_token != supplied {
            warn!(user_id = %user.id, "access token mismatch");
            return Err(ApiError::LoggedOut);
        }

        Ok(CurrentUser(user))
    }
}
