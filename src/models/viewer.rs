use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// "viewer V has seen segment S"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeenRecord {
    pub viewer_id: String,
    pub segment_id: String,
    pub seen_at: DateTime<Utc>,
}

/// A seen record resolved against the viewer's profile, as shown to the owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewerEntry {
    pub viewer_id: String,
    pub display_name: String,
    pub handle: String,
    pub avatar_uri: Option<String>,
    pub seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub handle: String,
    pub avatar_uri: Option<String>,
}
