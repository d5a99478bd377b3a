pub mod chat;
pub mod health;
pub mod history;
pub mod pong;
pub mod regenerate;
pub mod sessions;
pub mod stop;
pub mod stream;
pub mod switch_branch;

use actix_web::HttpRequest;
use chat_core::Principal;

use crate::error::AppError;

/// Identity resolution stand-in: the upstream auth middleware puts the
/// resolved account id (or the device fingerprint for anonymous
/// callers) into a header; the core only sees an opaque principal.
pub(crate) fn principal_from(req: &HttpRequest) -> Result<Principal, AppError> {
    if let Some(account) = header_value(req, "X-User-Id") {
        return Ok(Principal::Account(account));
    }
    if let Some(fingerprint) = header_value(req, "X-Fingerprint-Hash") {
        return Ok(Principal::Fingerprint(fingerprint));
    }
    Err(AppError::BadRequest(
        "X-User-Id or X-Fingerprint-Hash header is required".into(),
    ))
}

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
