//! Feedback and style aggregate models.

use serde::{Deserialize, Serialize};

use super::{ItemId, UserId};

/// A like/dislike decision on one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Like,
    Dislike,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Like => "like",
            Decision::Dislike => "dislike",
        }
    }
}

/// Body of a feedback submission to the catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub item_id: ItemId,
    pub user_id: UserId,
    #[serde(rename = "feedback")]
    pub decision: Decision,
}

/// Share of liked items carrying one style tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleShare {
    pub style: String,
    pub count: usize,
    /// `count` relative to the number of liked items, in percent. Shares may sum above 100.
    pub percentage: f64,
}
