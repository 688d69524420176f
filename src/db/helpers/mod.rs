use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::models::MediaType;

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_media_type(value: &str) -> Result<MediaType> {
    match value {
        "image" => Ok(MediaType::Image),
        "video" => Ok(MediaType::Video),
        other => Err(anyhow!("unknown media type {other}")),
    }
}
