use anyhow::Result;
use rusqlite::{params, OptionalExtension};

use crate::{db::connection::Database, models::Profile};

impl Database {
    pub async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        let record = profile.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO profiles (id, display_name, handle, avatar_uri)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     display_name = excluded.display_name,
                     handle = excluded.handle,
                     avatar_uri = excluded.avatar_uri",
                params![
                    record.id,
                    record.display_name,
                    record.handle,
                    record.avatar_uri
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>> {
        let profile_id = profile_id.to_string();
        self.execute(move |conn| {
            let profile = conn
                .query_row(
                    "SELECT id, display_name, handle, avatar_uri FROM profiles WHERE id = ?1",
                    params![profile_id],
                    |row| {
                        Ok(Profile {
                            id: row.get(0)?,
                            display_name: row.get(1)?,
                            handle: row.get(2)?,
                            avatar_uri: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(profile)
        })
        .await
    }
}
