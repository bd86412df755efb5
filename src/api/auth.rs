//! Caller identity forwarded by the auth gateway

use crate::models::{AuthUser, DEFAULT_USER_NAME};
use axum::http::HeaderMap;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Build the caller from gateway headers; `None` means anonymous.
///
/// A blank or non-UTF-8 user id counts as absent.
pub fn caller_from_headers(headers: &HeaderMap) -> Option<AuthUser> {
    let id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())?;

    let name = headers
        .get(USER_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_USER_NAME);

    Some(AuthUser::new(id, name))
}
