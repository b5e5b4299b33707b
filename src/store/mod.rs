// src/store/mod.rs — SQLite persistence for users, posts, sessions, connections

pub mod schema;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::core::types::PostRecord;

/// Shared handle used across the orchestrator, transport, and API layers.
pub type StoreHandle = Arc<Mutex<Store>>;

/// Low-level SQLite operations for all data types.
pub struct Store {
    conn: Connection,
}

/// Stored chat-user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub welcomed_after_connect: bool,
}

/// Stored LinkedIn connection for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInConnection {
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    /// Raw userinfo JSON from the OIDC endpoint.
    pub profile: Option<serde_json::Value>,
    pub connected_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open the store at a path, running migrations.
    pub fn open(path: &std::path::Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        schema::run_migrations(&conn)?;
        Ok(Self::new(conn))
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn)?;
        Ok(Self::new(conn))
    }

    // -- Users --

    pub fn upsert_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO users (user_id, username, first_name, last_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
               username = excluded.username,
               first_name = excluded.first_name,
               last_name = excluded.last_name,
               updated_at = excluded.updated_at",
            params![user_id, username, first_name, last_name, now],
        )?;
        Ok(())
    }

    pub fn get_user(&self, user_id: i64) -> anyhow::Result<Option<UserRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT user_id, username, first_name, last_name, welcomed_after_connect
                 FROM users WHERE user_id = ?1",
                params![user_id],
                |r| {
                    Ok(UserRecord {
                        user_id: r.get(0)?,
                        username: r.get(1)?,
                        first_name: r.get(2)?,
                        last_name: r.get(3)?,
                        welcomed_after_connect: r.get::<_, i64>(4)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn mark_welcomed(&self, user_id: i64) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE users SET welcomed_after_connect = 1, updated_at = ?1 WHERE user_id = ?2",
            params![now, user_id],
        )?;
        Ok(())
    }

    // -- Posts --

    pub fn insert_post(&self, post: &PostRecord) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        let hashtags = serde_json::to_string(&post.hashtags)?;
        self.conn.execute(
            "INSERT INTO posts (id, user_id, content, source_type, status, topic,
             industry, tone, hashtags, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                post.id,
                post.user_id,
                post.content,
                post.source_type.to_string(),
                post.status.to_string(),
                post.topic,
                post.industry,
                post.tone,
                hashtags,
                post.created_at.to_rfc3339(),
                now,
            ],
        )?;
        Ok(())
    }

    /// Post contents for one user and status, newest first.
    pub fn list_posts(
        &self,
        user_id: i64,
        status: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content FROM posts
             WHERE user_id = ?1 AND status = ?2
             ORDER BY created_at DESC LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![user_id, status, limit], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_posts(&self, status: &str) -> anyhow::Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    // -- Session snapshots --

    pub fn save_session_snapshot(&self, user_id: i64, snapshot: &str) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sessions (user_id, snapshot, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
               snapshot = excluded.snapshot,
               updated_at = excluded.updated_at",
            params![user_id, snapshot, now],
        )?;
        Ok(())
    }

    pub fn load_session_snapshot(&self, user_id: i64) -> anyhow::Result<Option<String>> {
        let row = self
            .conn
            .query_row(
                "SELECT snapshot FROM sessions WHERE user_id = ?1",
                params![user_id],
                |r| r.get::<_, String>(0),
            )
            .optional()?;
        Ok(row)
    }

    // -- LinkedIn connections --

    pub fn save_connection(&self, conn_rec: &LinkedInConnection) -> anyhow::Result<()> {
        let profile = conn_rec
            .profile
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "INSERT INTO linkedin_connections
               (user_id, access_token, refresh_token, id_token, profile, connected_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id) DO UPDATE SET
               access_token = excluded.access_token,
               refresh_token = excluded.refresh_token,
               id_token = excluded.id_token,
               profile = excluded.profile,
               connected_at = excluded.connected_at,
               expires_at = excluded.expires_at",
            params![
                conn_rec.user_id,
                conn_rec.access_token,
                conn_rec.refresh_token,
                conn_rec.id_token,
                profile,
                conn_rec.connected_at.to_rfc3339(),
                conn_rec.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_connection(&self, user_id: i64) -> anyhow::Result<Option<LinkedInConnection>> {
        let row = self
            .conn
            .query_row(
                "SELECT user_id, access_token, refresh_token, id_token, profile,
                        connected_at, expires_at
                 FROM linkedin_connections WHERE user_id = ?1",
                params![user_id],
                |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, Option<String>>(2)?,
                        r.get::<_, Option<String>>(3)?,
                        r.get::<_, Option<String>>(4)?,
                        r.get::<_, String>(5)?,
                        r.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((user_id, access_token, refresh_token, id_token, profile, connected, expires)) =
            row
        else {
            return Ok(None);
        };

        Ok(Some(LinkedInConnection {
            user_id,
            access_token,
            refresh_token,
            id_token,
            profile: profile.and_then(|p| serde_json::from_str(&p).ok()),
            connected_at: DateTime::parse_from_rfc3339(&connected)?.with_timezone(&Utc),
            expires_at: DateTime::parse_from_rfc3339(&expires)?.with_timezone(&Utc),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DraftStatus, SourceType};
    use chrono::Duration;

    fn post(id: &str, user_id: i64) -> PostRecord {
        PostRecord {
            id: id.into(),
            user_id,
            content: format!("content of {id}"),
            source_type: SourceType::Text,
            status: DraftStatus::Draft,
            topic: "topic".into(),
            industry: "general".into(),
            tone: "professional".into(),
            hashtags: vec!["launch".into()],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_upsert_user_twice_updates() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_user(1, Some("ada"), Some("Ada"), None).unwrap();
        store
            .upsert_user(1, Some("ada"), Some("Ada"), Some("Lovelace"))
            .unwrap();

        let user = store.get_user(1).unwrap().unwrap();
        assert_eq!(user.last_name.as_deref(), Some("Lovelace"));
        assert!(!user.welcomed_after_connect);
    }

    #[test]
    fn test_mark_welcomed() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_user(1, None, Some("Ada"), None).unwrap();
        store.mark_welcomed(1).unwrap();
        assert!(store.get_user(1).unwrap().unwrap().welcomed_after_connect);
    }

    #[test]
    fn test_insert_and_list_posts_newest_first() {
        let store = Store::open_in_memory().unwrap();
        let mut first = post("p1", 1);
        first.created_at = Utc::now() - Duration::minutes(5);
        store.insert_post(&first).unwrap();
        store.insert_post(&post("p2", 1)).unwrap();
        store.insert_post(&post("other", 2)).unwrap();

        let drafts = store.list_posts(1, "draft", 10).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].0, "p2");
        assert_eq!(store.count_posts("draft").unwrap(), 3);
    }

    #[test]
    fn test_session_snapshot_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.load_session_snapshot(9).unwrap().is_none());

        store.save_session_snapshot(9, r#"{"user_id":9}"#).unwrap();
        store.save_session_snapshot(9, r#"{"user_id":9,"v":2}"#).unwrap();

        let snap = store.load_session_snapshot(9).unwrap().unwrap();
        assert!(snap.contains("\"v\":2"));
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("postwright.db");

        {
            let store = Store::open(&path).unwrap();
            store.insert_post(&post("p1", 1)).unwrap();
        }

        let store = Store::open(&path).unwrap();
        assert_eq!(store.count_posts("draft").unwrap(), 1);
    }

    #[test]
    fn test_connection_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let rec = LinkedInConnection {
            user_id: 4,
            access_token: "tok".into(),
            refresh_token: None,
            id_token: None,
            profile: Some(serde_json::json!({"name": "Ada Lovelace"})),
            connected_at: Utc::now(),
            expires_at: Utc::now() + Duration::days(60),
        };
        store.save_connection(&rec).unwrap();

        let loaded = store.get_connection(4).unwrap().unwrap();
        assert_eq!(loaded.access_token, "tok");
        assert_eq!(loaded.profile.unwrap()["name"], "Ada Lovelace");
    }
}
