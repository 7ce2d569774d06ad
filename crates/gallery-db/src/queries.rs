use crate::Database;
use crate::models::{PhotoRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    // -- Photos --

    pub fn insert_photo(&self, photo: &PhotoRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO photos (id, owner_id, title, src, public_id, date, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    photo.id,
                    photo.owner_id,
                    photo.title,
                    photo.src,
                    photo.public_id,
                    photo.date,
                    photo.uploaded_at,
                ],
            )?;
            Ok(())
        })
    }

    /// All photos owned by `owner_id`, newest upload first.
    pub fn photos_by_owner(&self, owner_id: &str) -> Result<Vec<PhotoRow>> {
        self.with_conn(|conn| query_photos_by_owner(conn, owner_id))
    }

    /// Fetch a photo by id AND owner in one predicate. A photo that
    /// exists under a different owner is indistinguishable from one
    /// that does not exist.
    pub fn get_photo_owned(&self, photo_id: &str, owner_id: &str) -> Result<Option<PhotoRow>> {
        self.with_conn(|conn| query_photo_owned(conn, photo_id, owner_id))
    }

    /// Delete a photo, again scoped to its owner. Returns the number
    /// of rows removed (0 when the id/owner pair matches nothing).
    pub fn delete_photo(&self, photo_id: &str, owner_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM photos WHERE id = ?1 AND owner_id = ?2",
                (photo_id, owner_id),
            )?;
            Ok(n)
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_photos_by_owner(conn: &Connection, owner_id: &str) -> Result<Vec<PhotoRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, title, src, public_id, date, uploaded_at
         FROM photos
         WHERE owner_id = ?1
         ORDER BY uploaded_at DESC",
    )?;

    let rows = stmt
        .query_map([owner_id], photo_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_photo_owned(conn: &Connection, photo_id: &str, owner_id: &str) -> Result<Option<PhotoRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, title, src, public_id, date, uploaded_at
         FROM photos
         WHERE id = ?1 AND owner_id = ?2",
    )?;

    let row = stmt.query_row([photo_id, owner_id], photo_from_row).optional()?;

    Ok(row)
}

fn photo_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<PhotoRow, rusqlite::Error> {
    Ok(PhotoRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        src: row.get(3)?,
        public_id: row.get(4)?,
        date: row.get(5)?,
        uploaded_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn photo(id: &str, owner: &str, uploaded_at: &str) -> PhotoRow {
        PhotoRow {
            id: id.to_string(),
            owner_id: owner.to_string(),
            title: format!("{id}.jpg"),
            src: format!("https://cdn.example.com/{id}.jpg"),
            public_id: format!("gallery_user_{owner}/{id}"),
            date: "2026-08-07".to_string(),
            uploaded_at: uploaded_at.to_string(),
        }
    }

    #[test]
    fn create_and_lookup_user() {
        let db = test_db();
        db.create_user("u1", "alice", "hash1").unwrap();

        let user = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.password, "hash1");

        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_rejected() {
        let db = test_db();
        db.create_user("u1", "alice", "hash1").unwrap();
        assert!(db.create_user("u2", "alice", "hash2").is_err());
    }

    #[test]
    fn username_lookup_is_case_sensitive() {
        let db = test_db();
        db.create_user("u1", "Bob", "hash1").unwrap();
        db.create_user("u2", "bob", "hash2").unwrap();

        assert_eq!(db.get_user_by_username("Bob").unwrap().unwrap().id, "u1");
        assert_eq!(db.get_user_by_username("bob").unwrap().unwrap().id, "u2");
    }

    #[test]
    fn photos_scoped_to_owner() {
        let db = test_db();
        db.create_user("a", "alice", "h").unwrap();
        db.create_user("b", "bob", "h").unwrap();
        db.insert_photo(&photo("p1", "a", "2026-08-07T10:00:00.000001+00:00")).unwrap();
        db.insert_photo(&photo("p2", "b", "2026-08-07T10:00:00.000002+00:00")).unwrap();

        let alices = db.photos_by_owner("a").unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].id, "p1");

        // Cross-owner lookup behaves exactly like a missing photo.
        assert!(db.get_photo_owned("p1", "b").unwrap().is_none());
        assert!(db.get_photo_owned("p1", "a").unwrap().is_some());
    }

    #[test]
    fn photos_ordered_newest_first() {
        let db = test_db();
        db.create_user("a", "alice", "h").unwrap();
        // Insert out of chronological order.
        db.insert_photo(&photo("p2", "a", "2026-08-07T10:00:01.500000+00:00")).unwrap();
        db.insert_photo(&photo("p3", "a", "2026-08-07T10:00:02.000000+00:00")).unwrap();
        db.insert_photo(&photo("p1", "a", "2026-08-07T10:00:01.000000+00:00")).unwrap();

        let ids: Vec<String> = db
            .photos_by_owner("a")
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["p3", "p2", "p1"]);
    }

    #[test]
    fn delete_requires_matching_owner() {
        let db = test_db();
        db.create_user("a", "alice", "h").unwrap();
        db.create_user("b", "bob", "h").unwrap();
        db.insert_photo(&photo("p1", "a", "2026-08-07T10:00:00.000000+00:00")).unwrap();

        assert_eq!(db.delete_photo("p1", "b").unwrap(), 0);
        assert_eq!(db.photos_by_owner("a").unwrap().len(), 1);

        assert_eq!(db.delete_photo("p1", "a").unwrap(), 1);
        assert!(db.photos_by_owner("a").unwrap().is_empty());
    }
}
