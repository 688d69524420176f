use anyhow::{Context, Result};
use rusqlite::params;

use crate::{
    db::{connection::Database, helpers::parse_datetime},
    models::{SeenRecord, ViewerEntry},
};

impl Database {
    /// Inserts the view once; later calls for the same pair keep the first `seen_at`.
    pub async fn insert_story_view(&self, record: &SeenRecord) -> Result<bool> {
        let record = record.clone();
        self.execute(move |conn| {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO story_views (story_id, viewer_id, seen_at)
                     VALUES (?1, ?2, ?3)",
                    params![record.segment_id, record.viewer_id, record.seen_at.to_rfc3339()],
                )
                .with_context(|| format!("failed to insert view of {}", record.segment_id))?;
            Ok(inserted > 0)
        })
        .await
    }

    pub async fn list_story_viewers(&self, story_id: &str) -> Result<Vec<ViewerEntry>> {
        let story_id = story_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT v.viewer_id, p.display_name, p.handle, p.avatar_uri, v.seen_at
                 FROM story_views v
                 JOIN profiles p ON p.id = v.viewer_id
                 WHERE v.story_id = ?1
                 ORDER BY v.seen_at DESC",
            )?;

            let mut rows = stmt.query(params![story_id])?;
            let mut viewers = Vec::new();
            while let Some(row) = rows.next()? {
                let seen_at: String = row.get(4)?;
                viewers.push(ViewerEntry {
                    viewer_id: row.get(0)?,
                    display_name: row.get(1)?,
                    handle: row.get(2)?,
                    avatar_uri: row.get(3)?,
                    seen_at: parse_datetime(&seen_at, "seen_at")?,
                });
            }
            Ok(viewers)
        })
        .await
    }
}
