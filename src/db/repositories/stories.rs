use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{parse_datetime, parse_media_type},
    },
    models::StorySegment,
};

const STORY_COLUMNS: &str = "id, owner_id, media_type, media_url, caption, created_at";

fn row_to_segment(row: &Row) -> Result<StorySegment> {
    let media_type: String = row.get("media_type")?;
    let created_at: String = row.get("created_at")?;

    Ok(StorySegment {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        media_type: parse_media_type(&media_type)?,
        media_url: row.get("media_url")?,
        caption: row.get("caption")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_story(
        &self,
        segment: &StorySegment,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let record = segment.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO stories
                     (id, owner_id, media_type, media_url, caption, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.owner_id,
                    record.media_type.as_str(),
                    record.media_url,
                    record.caption,
                    record.created_at.to_rfc3339(),
                    expires_at.to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to insert story {}", record.id))?;
            Ok(())
        })
        .await
    }

    /// Returns the story only while it is still active at `now`.
    pub async fn get_active_story(
        &self,
        story_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<StorySegment>> {
        let story_id = story_id.to_string();
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {STORY_COLUMNS} FROM stories WHERE id = ?1 AND expires_at > ?2"
            );
            let segment = conn
                .query_row(&sql, params![story_id, now.to_rfc3339()], |row| {
                    Ok(row_to_segment(row))
                })
                .optional()?
                .transpose()?;
            Ok(segment)
        })
        .await
    }

    pub async fn list_active_stories_for_owner(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<StorySegment>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {STORY_COLUMNS} FROM stories
                 WHERE owner_id = ?1 AND expires_at > ?2
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![owner_id, now.to_rfc3339()])?;
            let mut segments = Vec::new();
            while let Some(row) = rows.next()? {
                segments.push(row_to_segment(row)?);
            }
            Ok(segments)
        })
        .await
    }
}
