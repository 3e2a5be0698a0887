//! Authentication extractor.
//!
//! When `AUTH_SECRET` is configured, feed connections and write endpoints
//! must present it as a bearer token. Without a secret every request passes.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};

use crate::AppState;

/// Caller that passed the bearer check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthUser {
    /// No secret is configured
    Anonymous,
    /// A token matching the configured secret was presented
    Bearer,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        check(auth_header, state.config.auth_secret.as_deref())
    }
}

fn check(
    header: Option<&str>,
    secret: Option<&str>,
) -> Result<AuthUser, (StatusCode, &'static str)> {
    let Some(secret) = secret else {
        return Ok(AuthUser::Anonymous);
    };

    match header {
        Some(header) => match header.strip_prefix("Bearer ") {
            Some("") => Err((StatusCode::UNAUTHORIZED, "Empty bearer token")),
            Some(token) if token == secret => Ok(AuthUser::Bearer),
            Some(_) => Err((StatusCode::UNAUTHORIZED, "Invalid bearer token")),
            None => Err((
                StatusCode::UNAUTHORIZED,
                "Invalid authorization header format",
            )),
        },
        None => Err((StatusCode::UNAUTHORIZED, "Missing authorization header")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_without_secret() {
        assert_eq!(check(None, None), Ok(AuthUser::Anonymous));
        assert_eq!(check(Some("Bearer anything"), None), Ok(AuthUser::Anonymous));
    }

    #[test]
    fn test_secret_required() {
        let secret = Some("s3cret");
        assert_eq!(check(Some("Bearer s3cret"), secret), Ok(AuthUser::Bearer));
        assert!(check(None, secret).is_err());
        assert!(check(Some("Bearer "), secret).is_err());
        assert!(check(Some("Bearer wrong"), secret).is_err());
        assert!(check(Some("Basic s3cret"), secret).is_err());
    }
}
