use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TapZone {
    /// Retreat.
    Left,
    /// Advance.
    Right,
}

impl TapZone {
    /// Maps a horizontal tap position on a surface of `width` to a hit zone.
    pub fn classify(x: f64, width: f64) -> Option<TapZone> {
        if !x.is_finite() || !width.is_finite() || width <= 0.0 {
            return None;
        }
        if x < 0.0 || x > width {
            return None;
        }
        if x < width / 2.0 {
            Some(TapZone::Left)
        } else {
            Some(TapZone::Right)
        }
    }
}
