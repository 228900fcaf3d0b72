//! Body storage repository.

use chrono::{DateTime, Utc};
use mailpull_mime::DecodedBody;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::StoredBody;
use crate::Result;

/// Repository for extracted message bodies.
#[derive(Debug, Clone)]
pub struct BodyRepository {
    pool: SqlitePool,
}

impl BodyRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS email_bodies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL,
                message_id TEXT NOT NULL,
                body_text TEXT NOT NULL DEFAULT '',
                body_html TEXT NOT NULL DEFAULT '',
                has_attachments INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                UNIQUE(email, message_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store the decoded body for a message, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn save_body(&self, email: &str, message_id: &str, body: &DecodedBody) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO email_bodies
                (email, message_id, body_text, body_html, has_attachments, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(email, message_id) DO UPDATE SET
                body_text = excluded.body_text,
                body_html = excluded.body_html,
                has_attachments = excluded.has_attachments,
                updated_at = excluded.updated_at
            ",
        )
        .bind(email)
        .bind(message_id)
        .bind(&body.text)
        .bind(&body.html)
        .bind(body.has_attachments)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the stored body for a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_body(&self, email: &str, message_id: &str) -> Result<Option<StoredBody>> {
        let row = sqlx::query(
            r"
            SELECT email, message_id, body_text, body_html, has_attachments, updated_at
            FROM email_bodies
            WHERE email = ? AND message_id = ?
            ",
        )
        .bind(email)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        let body = row.and_then(|row| {
            let updated_at_str: String = row.get("updated_at");
            let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
                .ok()?
                .with_timezone(&Utc);

            Some(StoredBody {
                email: row.get("email"),
                message_id: row.get("message_id"),
                body_text: row.get("body_text"),
                body_html: row.get("body_html"),
                has_attachments: row.get::<bool, _>("has_attachments"),
                updated_at,
            })
        });

        Ok(body)
    }
}
