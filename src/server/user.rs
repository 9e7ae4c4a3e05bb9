use crate::errors::JournalError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Header carrying the authenticated user id, set by the gateway in front
/// of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: i64,
}

impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = JournalError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| JournalError::Unauthorized("missing user context".into()))?;
        let user_id = raw
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| JournalError::Unauthorized("invalid user context".into()))?;
        Ok(Self { user_id })
    }
}
