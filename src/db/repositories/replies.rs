use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::db::connection::Database;

impl Database {
    pub async fn insert_story_reply(
        &self,
        story_id: &str,
        sender_id: &str,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<String> {
        let reply_id = Uuid::new_v4().to_string();
        let story_id = story_id.to_string();
        let sender_id = sender_id.to_string();
        let text = text.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO story_replies (id, story_id, sender_id, text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![reply_id, story_id, sender_id, text, created_at.to_rfc3339()],
            )
            .context("failed to insert story reply")?;
            Ok(reply_id)
        })
        .await
    }

    pub async fn count_story_replies(&self, story_id: &str) -> Result<u64> {
        let story_id = story_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM story_replies WHERE story_id = ?1",
                params![story_id],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}
