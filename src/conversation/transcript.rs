//! Transcript formatting rules.

use std::collections::BTreeMap;

/// Separator placed between entries in the plain-text export.
pub const EXPORT_SEPARATOR: &str = "\n\n--------------------------\n\n";

/// Prefix shared by the edit form's transcript fields (`history_0`, ...).
pub const HISTORY_FIELD_PREFIX: &str = "history_";

/// Speaker of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The visitor.
    User,
    /// The completion service.
    Assistant,
}

impl Role {
    /// Label used in front of the entry text.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }

    /// Format `text` as a transcript entry for this role.
    #[must_use]
    pub fn turn(self, text: &str) -> String {
        format!("{}: {text}", self.label())
    }
}

/// Build the prompt sent to the completion service.
///
/// Existing entries are newline-joined and the new user turn follows after a
/// blank line, even when the transcript is empty.
#[must_use]
pub fn build_prompt(history: &[String], user_text: &str) -> String {
    format!("{}\n\n{}", history.join("\n"), Role::User.turn(user_text))
}

/// Rebuild a transcript from submitted form fields.
///
/// Only `history_`-prefixed fields are kept. Entries are ordered by field name
/// as plain strings, so `history_10` sorts before `history_2`. When a name is
/// submitted more than once the first value wins.
#[must_use]
pub fn collect_edits<I>(fields: I) -> Vec<String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut selected = BTreeMap::new();
    for (name, value) in fields {
        if name.starts_with(HISTORY_FIELD_PREFIX) {
            selected.entry(name).or_insert(value);
        }
    }
    selected.into_values().collect()
}

/// Join a transcript into its plain-text export, or `None` when empty.
#[must_use]
pub fn render_export(history: &[String]) -> Option<String> {
    (!history.is_empty()).then(|| history.join(EXPORT_SEPARATOR))
}
