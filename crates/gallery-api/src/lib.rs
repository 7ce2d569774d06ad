pub mod auth;
pub mod error;
pub mod middleware;
pub mod photos;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};

use crate::auth::AppState;

/// The /api surface. Registration, login, and status are anonymous;
/// everything user-scoped sits behind the session guard. Static
/// assets and tower layers are the binary's concern.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/status", get(auth::status));

    let protected = Router::new()
        .route("/api/logout", post(auth::logout))
        .route("/api/photos", post(photos::upload_photo).get(photos::list_photos))
        .route("/api/photos/{id}", delete(photos::delete_photo))
        .layer(from_fn_with_state(state.clone(), middleware::require_session));

    Router::new().merge(public).merge(protected).with_state(state)
}
