use serde::{Deserialize, Serialize};

/// A GitHub issue, as returned by the repository issues endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub user: IssueAuthor,
    #[serde(default)]
    pub labels: Vec<IssueLabel>,
    /// Comment count.
    #[serde(default)]
    pub comments: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueAuthor {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueLabel {
    pub name: String,
}

/// An OAuth authorization created for the user during setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authorization {
    pub id: u64,
    pub token: String,
}

/// Input for registering a new OAuth authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuthorizationInput {
    pub scopes: Vec<String>,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_url: Option<String>,
}
