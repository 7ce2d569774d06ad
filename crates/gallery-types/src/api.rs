use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Session claims --

/// JWT claims carried by the session cookie. Canonical definition lives
/// here in gallery-types so the guard middleware and the auth handlers
/// share one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub username: String,
}

/// GET /api/status body. `username` is omitted entirely for anonymous
/// callers rather than serialized as null.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub is_logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

// -- Photos --

/// The only photo shape that crosses the trust boundary. Owner id,
/// deletion handle, and the ordering timestamp never leave the server.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoView {
    pub id: Uuid,
    pub title: String,
    pub src: String,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub photo: PhotoView,
}

#[derive(Debug, Serialize)]
pub struct PhotoListResponse {
    pub success: bool,
    pub photos: Vec<PhotoView>,
}
