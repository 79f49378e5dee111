//! Timeline entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One step in a claim's or process's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry<S> {
    pub at: DateTime<Utc>,
    /// `None` for the creating entry
    pub from: Option<S>,
    pub to: S,
    pub action: String,
    pub actor: String,
    pub note: Option<String>,
}

impl<S> TimelineEntry<S> {
    pub fn new(from: Option<S>, to: S, action: &str, actor: &str, note: Option<String>) -> Self {
        Self {
            at: Utc::now(),
            from,
            to,
            action: action.to_string(),
            actor: actor.to_string(),
            note,
        }
    }
}
