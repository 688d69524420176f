use serde::{Deserialize, Serialize};

/// Reply text being composed for the active segment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplyDraft {
    pub text: String,
}

impl ReplyDraft {
    /// Replaces the text, keeping at most `max_chars` characters.
    pub fn set_text(&mut self, text: &str, max_chars: usize) {
        self.text = text.chars().take(max_chars).collect();
    }

    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn is_blank(&self) -> bool {
        self.trimmed().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_text_truncates_on_char_boundaries() {
        let mut draft = ReplyDraft::default();
        draft.set_text("héllo wörld", 5);
        assert_eq!(draft.text, "héllo");
    }

    #[test]
    fn whitespace_only_draft_is_blank() {
        let mut draft = ReplyDraft::default();
        draft.set_text("  \n\t ", 200);
        assert!(draft.is_blank());
    }
}
