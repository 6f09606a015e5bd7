use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Pivotal Tracker story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: u64,
    pub name: String,
    pub story_type: StoryType,
    pub current_state: StoryState,
    /// Point estimate. Unestimated stories render as "none".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<f64>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<Person>,
    #[serde(default)]
    pub url: String,
}

/// The scheduling state of a story.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoryState {
    Unscheduled,
    Unstarted,
    Planned,
    Started,
    Finished,
    Delivered,
    Accepted,
    Rejected,
}

impl StoryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unscheduled => "unscheduled",
            Self::Unstarted => "unstarted",
            Self::Planned => "planned",
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Delivered => "delivered",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unscheduled" => Some(Self::Unscheduled),
            "unstarted" => Some(Self::Unstarted),
            "planned" => Some(Self::Planned),
            "started" => Some(Self::Started),
            "finished" => Some(Self::Finished),
            "delivered" => Some(Self::Delivered),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for StoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a story.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoryType {
    Feature,
    Bug,
    Chore,
    Release,
}

impl StoryType {
    pub const ALL: [StoryType; 4] = [Self::Feature, Self::Bug, Self::Chore, Self::Release];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Bug => "bug",
            Self::Chore => "chore",
            Self::Release => "release",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "feature" => Some(Self::Feature),
            "bug" => Some(Self::Bug),
            "chore" => Some(Self::Chore),
            "release" => Some(Self::Release),
            _ => None,
        }
    }
}

impl std::fmt::Display for StoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
}

/// One iteration of a project, with the stories scheduled into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iteration {
    pub number: u64,
    #[serde(default)]
    pub stories: Vec<Story>,
}

/// A comment on a story. Attachment-only comments have no text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_attachments: Vec<Attachment>,
}

/// A checklist task within a story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryTask {
    pub id: u64,
    pub description: String,
    #[serde(default)]
    pub complete: bool,
}

/// A file attached to a story, via a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: u64,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Input for creating a new story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStoryInput {
    pub name: String,
    pub story_type: StoryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// Input for updating a story. All fields optional for partial updates;
/// `after_id` repositions the story within its backlog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStoryInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<StoryState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_id: Option<u64>,
}

/// Input for posting a comment, optionally carrying uploaded attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_attachments: Vec<Attachment>,
}
