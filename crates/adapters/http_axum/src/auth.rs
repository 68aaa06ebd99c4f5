//! Caller identification.
//!
//! There are no passwords: API clients name themselves with the `X-User-Id`
//! header, and the dashboard keeps the user id in a session cookie set at
//! login.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;

use smartcode_app::ports::UserRepository;
use smartcode_domain::error::SmartHomeError;
use smartcode_domain::id::UserId;
use smartcode_domain::user::User;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the caller's user id on API requests.
pub const USER_HEADER: &str = "x-user-id";

/// Cookie carrying the logged-in user id on dashboard requests.
pub const SESSION_COOKIE: &str = "smartcode_user";

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// User id claimed by the request, header first, then session cookie.
#[must_use]
pub fn claimed_user_id(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .or_else(|| cookie_value(headers, SESSION_COOKIE))
        .and_then(|value| value.parse().ok())
}

/// Resolve the calling user.
///
/// # Errors
///
/// Returns [`ApiError::Unauthenticated`] when the request names no known
/// user, [`ApiError::Inactive`] for a deactivated account, or a storage
/// error.
pub async fn current_user<D, U, S, C>(
    state: &AppState<D, U, S, C>,
    headers: &HeaderMap,
) -> Result<User, ApiError>
where
    U: UserRepository + Send + Sync + 'static,
{
    let user_id = claimed_user_id(headers).ok_or(ApiError::Unauthenticated)?;
    let user = match state.user_service.get(user_id).await {
        Ok(user) => user,
        Err(SmartHomeError::NotFound(_)) => return Err(ApiError::Unauthenticated),
        Err(err) => return Err(err.into()),
    };
    if !user.is_active {
        return Err(ApiError::Inactive);
    }
    Ok(user)
}

/// `Set-Cookie` value starting a dashboard session.
#[must_use]
pub fn login_cookie(user_id: UserId) -> String {
    format!("{SESSION_COOKIE}={user_id}; Path=/; HttpOnly; SameSite=Lax")
}

/// `Set-Cookie` value ending a dashboard session.
#[must_use]
pub fn logout_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn should_prefer_header_over_cookie() {
        let from_header = UserId::new();
        let from_cookie = UserId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_HEADER,
            HeaderValue::from_str(&from_header.to_string()).unwrap(),
        );
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{SESSION_COOKIE}={from_cookie}")).unwrap(),
        );

        assert_eq!(claimed_user_id(&headers), Some(from_header));
    }

    #[test]
    fn should_find_session_among_other_cookies() {
        let user_id = UserId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={user_id}; lang=en"))
                .unwrap(),
        );

        assert_eq!(claimed_user_id(&headers), Some(user_id));
    }

    #[test]
    fn should_ignore_garbage_ids() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("42"));
        assert_eq!(claimed_user_id(&headers), None);
        assert_eq!(claimed_user_id(&HeaderMap::new()), None);
    }

    #[test]
    fn should_build_session_cookies() {
        let user_id = UserId::new();
        assert!(login_cookie(user_id).starts_with(&format!("{SESSION_COOKIE}={user_id};")));
        assert!(logout_cookie().contains("Max-Age=0"));
    }
}
