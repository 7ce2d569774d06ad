use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};

use gallery_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Session cookie name. The cookie carries a signed token and no
/// Max-Age, so it lives for the browser session only.
pub const SESSION_COOKIE: &str = "gallery_session";

/// Decode the session token from the cookie jar. A missing cookie or
/// a bad or expired token both mean "anonymous".
pub fn decode_session(jar: &CookieJar, secret: &str) -> Option<Claims> {
    let token = jar.get(SESSION_COOKIE)?.value();

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

/// Gate in front of every user-scoped route: without a valid session
/// the wrapped handler is never invoked and no store is touched. On
/// success the decoded claims ride along in request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = decode_session(&jar, &state.session_secret).ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
