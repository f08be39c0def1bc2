//! libSQL backend: async `PostStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{NewPost, Post, PostStore};

const POST_COLUMNS: &str = "id, content, webhook_id, webhook_token, webhook_url, created_at";

/// Ids bound per lookup query, well under SQLite's host parameter limit.
const MAX_IDS_PER_QUERY: usize = 500;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        migrations::run_migrations(backend.conn()).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        migrations::run_migrations(backend.conn()).await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn opt_text(value: Option<&str>) -> libsql::Value {
    match value {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Map a libsql Row to a Post. Column order matches `POST_COLUMNS`.
fn row_to_post(row: &libsql::Row) -> Result<Post, libsql::Error> {
    let created_str: String = row.get(5)?;
    Ok(Post {
        id: row.get(0)?,
        content: row.get(1)?,
        webhook_id: row.get(2).ok(),
        webhook_token: row.get(3).ok(),
        webhook_url: row.get(4).ok(),
        created_at: parse_datetime(&created_str),
    })
}

/// Keep the first occurrence of every id, preserving request order.
fn unique_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

impl LibSqlBackend {
    /// Load the posts with the given ids into `found`, in one `IN` query.
    async fn fetch_posts(
        &self,
        ids: &[i64],
        found: &mut std::collections::HashMap<i64, Post>,
    ) -> Result<(), DatabaseError> {
        let placeholders = (1..=ids.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id IN ({placeholders})");
        let params: Vec<libsql::Value> = ids.iter().map(|id| libsql::Value::Integer(*id)).collect();

        let mut rows = self
            .conn()
            .query(&sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to list posts: {e}")))?;

        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read post row: {e}")))?
        {
            let post = row_to_post(&row)
                .map_err(|e| DatabaseError::Query(format!("Failed to decode post row: {e}")))?;
            found.insert(post.id, post);
        }
        Ok(())
    }
}

#[async_trait]
impl PostStore for LibSqlBackend {
    async fn list(&self, ids: &[i64]) -> Result<Vec<Post>, DatabaseError> {
        let wanted = unique_ids(ids);
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let mut found = std::collections::HashMap::with_capacity(wanted.len());
        for chunk in wanted.chunks(MAX_IDS_PER_QUERY) {
            self.fetch_posts(chunk, &mut found).await?;
        }

        let missing: Vec<String> = wanted
            .iter()
            .filter(|id| !found.contains_key(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DatabaseError::NotFound {
                entity: "post".into(),
                id: missing.join(", "),
            });
        }

        debug!(count = wanted.len(), "Posts resolved");
        Ok(wanted
            .into_iter()
            .filter_map(|id| found.remove(&id))
            .collect())
    }

    async fn insert(&self, post: NewPost) -> Result<Post, DatabaseError> {
        let created_at = Utc::now();
        self.conn()
            .execute(
                "INSERT INTO posts (content, webhook_id, webhook_token, webhook_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                vec![
                    libsql::Value::Text(post.content.clone()),
                    opt_text(post.webhook_id.as_deref()),
                    opt_text(post.webhook_token.as_deref()),
                    opt_text(post.webhook_url.as_deref()),
                    libsql::Value::Text(created_at.to_rfc3339()),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to insert post: {e}")))?;

        let id = self.conn().last_insert_rowid();
        debug!(post_id = id, "Post inserted");

        Ok(Post {
            id,
            content: post.content,
            webhook_id: post.webhook_id,
            webhook_token: post.webhook_token,
            webhook_url: post.webhook_url,
            created_at: parse_datetime(&created_at.to_rfc3339()),
        })
    }
}
