use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};
use uuid::Uuid;

use gallery_db::Database;
use gallery_storage::BlobStorage;
use gallery_types::api::{
    Claims, LoginRequest, LoginResponse, MessageResponse, RegisterRequest, StatusResponse,
};

use crate::error::ApiError;
use crate::middleware::{SESSION_COOKIE, decode_session};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    /// `None` when the database failed to open at startup; every
    /// data-dependent route then degrades to one uniform 500.
    pub db: Option<Database>,
    pub storage: Arc<dyn BlobStorage>,
    pub session_secret: String,
}

impl AppStateInner {
    pub fn db(&self) -> Result<&Database, ApiError> {
        self.db.as_ref().ok_or(ApiError::Database)
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required.".into(),
        ));
    }

    // Check if username is taken
    let lookup = state.clone();
    let username = req.username.clone();
    let existing = tokio::task::spawn_blocking(move || {
        lookup.db()?.get_user_by_username(&username).map_err(|e| {
            error!("DB get_user_by_username error: {}", e);
            ApiError::Database
        })
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    if existing.is_some() {
        return Err(ApiError::Conflict("Username already exists.".into()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Password hash failure: {}", e);
            ApiError::Internal
        })?
        .to_string();

    let user_id = Uuid::new_v4();

    let db_state = state.clone();
    let username = req.username.clone();
    tokio::task::spawn_blocking(move || {
        db_state
            .db()?
            .create_user(&user_id.to_string(), &username, &password_hash)
            .map_err(|e| {
                error!("DB create_user error: {}", e);
                ApiError::Database
            })
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    info!("Registered user {}", req.username);

    Ok(Json(MessageResponse {
        success: true,
        message: "Registration successful! Login now.".into(),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = state.clone();
    let username = req.username.clone();
    let user = tokio::task::spawn_blocking(move || {
        lookup.db()?.get_user_by_username(&username).map_err(|e| {
            error!("DB get_user_by_username error: {}", e);
            ApiError::Database
        })
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??
    // An unknown username answers exactly like a wrong password.
    .ok_or(ApiError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&user.password).map_err(|e| {
        error!("Stored hash for {} is unparseable: {}", user.username, e);
        ApiError::Internal
    })?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let user_id: Uuid = user.id.parse().map_err(|e| {
        error!("Corrupt user id '{}': {}", user.id, e);
        ApiError::Internal
    })?;

    let token = create_token(&state.session_secret, user_id, &user.username).map_err(|e| {
        error!("Token creation failed: {}", e);
        ApiError::Internal
    })?;

    info!("User {} logged in", user.username);

    Ok((
        jar.add(session_cookie(token)),
        Json(LoginResponse {
            success: true,
            message: "Login successful.".into(),
            username: user.username,
        }),
    ))
}

pub async fn logout(jar: CookieJar, Extension(claims): Extension<Claims>) -> impl IntoResponse {
    info!("User {} logged out", claims.username);

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());

    (
        jar,
        Json(MessageResponse {
            success: true,
            message: "Logout successful.".into(),
        }),
    )
}

/// Pure read of session state — never fails, anonymous callers included.
pub async fn status(State(state): State<AppState>, jar: CookieJar) -> Json<StatusResponse> {
    match decode_session(&jar, &state.session_secret) {
        Some(claims) => Json(StatusResponse {
            is_logged_in: true,
            username: Some(claims.username),
        }),
        None => Json(StatusResponse {
            is_logged_in: false,
            username: None,
        }),
    }
}

fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        // TTL backstop; the cookie itself is browser-session-scoped.
        exp: (chrono::Utc::now() + chrono::Duration::hours(24)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
