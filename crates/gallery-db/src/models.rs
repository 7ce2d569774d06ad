/// Database row types — these map directly to SQLite rows.
/// Distinct from the gallery-types API views so internal fields
/// (owner id, deletion handle, ordering timestamp) stay server-side.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct PhotoRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub src: String,
    /// Opaque deletion handle issued by the blob store at upload time.
    pub public_id: String,
    pub date: String,
    /// RFC 3339 UTC with microseconds; lexicographic order matches
    /// chronological order for this fixed format.
    pub uploaded_at: String,
}
