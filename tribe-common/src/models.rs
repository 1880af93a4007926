//! Data model shared by Tribe clients
//!
//! Shapes match the JSON produced by the Tribe REST backend (snake_case keys).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Story or post author as embedded by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
    pub full_name: String,
    /// Avatar URL (None when the user has not uploaded one)
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Kind of media attached to a story
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Image => write!(f, "image"),
            MediaType::Video => write!(f, "video"),
        }
    }
}

/// A single story
///
/// Immutable once fetched except `likes_count` / `is_liked`, which change only
/// when a like response from the server is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: u64,
    pub media_url: String,
    pub media_type: MediaType,
    #[serde(default)]
    pub caption: Option<String>,
    pub expires_at: DateTime<Utc>,
    /// Server-rendered remaining lifetime label (e.g. "5h")
    #[serde(default)]
    pub time_remaining: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub comments_count: u64,
}

impl Story {
    /// Current like state as embedded in the fetched story
    pub fn like_status(&self) -> LikeStatus {
        LikeStatus {
            liked: self.is_liked,
            likes_count: self.likes_count,
        }
    }

    /// Overwrite like state with values reported by the server
    pub fn apply_like_status(&mut self, status: LikeStatus) {
        self.is_liked = status.liked;
        self.likes_count = status.likes_count;
    }

    /// Remaining lifetime label, preferring the server-rendered value
    pub fn remaining_label(&self, now: DateTime<Utc>) -> String {
        if let Some(label) = &self.time_remaining {
            return label.clone();
        }
        crate::time::format_remaining(self.expires_at - now)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// All active stories of one user
///
/// Stories are ordered newest-first (index 0 = latest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryGroup {
    pub user: UserSummary,
    pub stories: Vec<Story>,
    #[serde(default)]
    pub has_viewed: bool,
}

impl StoryGroup {
    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    /// Index of the last story, None for an empty group
    pub fn last_index(&self) -> Option<usize> {
        self.stories.len().checked_sub(1)
    }

    /// Find a story in this group by id
    pub fn story_mut(&mut self, story_id: u64) -> Option<&mut Story> {
        self.stories.iter_mut().find(|s| s.id == story_id)
    }
}

/// Like state reported by `POST /stories/{id}/like` and
/// `GET /stories/{id}/like-status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeStatus {
    pub liked: bool,
    pub likes_count: u64,
}

/// Drop groups that carry no stories
///
/// A viewer cursor cannot point into an empty group, so such groups are
/// removed right after fetching. Server order of the remaining groups is kept.
pub fn retain_playable(groups: Vec<StoryGroup>) -> Vec<StoryGroup> {
    groups.into_iter().filter(|g| !g.is_empty()).collect()
}

/// Timeline post envelope
///
/// Fields shared by every post type live here; subtype-specific content is
/// carried by [`PostKind`], tagged with `post_type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub author: UserSummary,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(flatten)]
    pub kind: PostKind,
}

/// One case per specialized post type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "post_type", rename_all = "snake_case")]
pub enum PostKind {
    /// Plain text post
    Text,

    /// Source snippet with syntax language
    CodeSnippet { language: String, code: String },

    /// Ordered walkthrough
    Tutorial { steps: Vec<TutorialStep> },

    /// Question with its accepted answer
    ProblemSolution { problem: String, solution: String },

    /// Runnable snippet, optionally with a hosted preview
    Playground {
        language: String,
        source: String,
        #[serde(default)]
        preview_url: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorialStep {
    pub title: String,
    pub body: String,
}

impl PostKind {
    /// Wire name of this post type
    pub fn type_name(&self) -> &'static str {
        match self {
            PostKind::Text => "text",
            PostKind::CodeSnippet { .. } => "code_snippet",
            PostKind::Tutorial { .. } => "tutorial",
            PostKind::ProblemSolution { .. } => "problem_solution",
            PostKind::Playground { .. } => "playground",
        }
    }
}
