//! HTTP client for the Pivotal Tracker API.

use reqwest::{multipart, Client, Method};

use crate::integrations::{read_json, ClientError};
use crate::models::{
    Attachment, Comment, CreateCommentInput, CreateStoryInput, Iteration, Story, StoryTask,
    UpdateStoryInput,
};

/// Production API root. Overridable through the `api_url` setting.
const DEFAULT_URL: &str = "https://www.pivotaltracker.com/services/v5";

const TOKEN_HEADER: &str = "X-TrackerToken";

/// Which iterations to fetch.
#[derive(Debug, Clone, Copy)]
pub enum IterationScope {
    Current,
    Backlog,
    CurrentBacklog,
}

impl IterationScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Backlog => "backlog",
            Self::CurrentBacklog => "current_backlog",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackerClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl TrackerClient {
    pub fn new(base_url: Option<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_URL.to_string()),
            token,
            client: Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref token) = self.token {
            req = req.header(TOKEN_HEADER, token);
        }
        req
    }

    /// Iterations of the project, with their stories.
    pub async fn iterations(
        &self,
        project_id: u64,
        scope: IterationScope,
    ) -> Result<Vec<Iteration>, ClientError> {
        let response = self
            .request(Method::GET, &format!("/projects/{}/iterations", project_id))
            .query(&[("scope", scope.as_str())])
            .send()
            .await?;
        read_json(response).await
    }

    /// Stories of the project, optionally narrowed by a search filter
    /// such as `state:unscheduled`.
    pub async fn stories(
        &self,
        project_id: u64,
        filter: Option<&str>,
    ) -> Result<Vec<Story>, ClientError> {
        let mut req = self.request(Method::GET, &format!("/projects/{}/stories", project_id));
        if let Some(filter) = filter {
            req = req.query(&[("filter", filter)]);
        }
        let response = req.send().await?;
        read_json(response).await
    }

    pub async fn story(&self, project_id: u64, story_id: u64) -> Result<Story, ClientError> {
        let response = self
            .request(
                Method::GET,
                &format!("/projects/{}/stories/{}", project_id, story_id),
            )
            .query(&[("fields", ":default,requested_by")])
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn create_story(
        &self,
        project_id: u64,
        input: &CreateStoryInput,
    ) -> Result<Story, ClientError> {
        let response = self
            .request(Method::POST, &format!("/projects/{}/stories", project_id))
            .json(input)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn update_story(
        &self,
        project_id: u64,
        story_id: u64,
        input: &UpdateStoryInput,
    ) -> Result<Story, ClientError> {
        let response = self
            .request(
                Method::PUT,
                &format!("/projects/{}/stories/{}", project_id, story_id),
            )
            .json(input)
            .send()
            .await?;
        read_json(response).await
    }

    /// Comments on a story, with any file attachments included.
    pub async fn comments(
        &self,
        project_id: u64,
        story_id: u64,
    ) -> Result<Vec<Comment>, ClientError> {
        let response = self
            .request(
                Method::GET,
                &format!("/projects/{}/stories/{}/comments", project_id, story_id),
            )
            .query(&[("fields", ":default,file_attachments")])
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn tasks(
        &self,
        project_id: u64,
        story_id: u64,
    ) -> Result<Vec<StoryTask>, ClientError> {
        let response = self
            .request(
                Method::GET,
                &format!("/projects/{}/stories/{}/tasks", project_id, story_id),
            )
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn add_comment(
        &self,
        project_id: u64,
        story_id: u64,
        input: &CreateCommentInput,
    ) -> Result<Comment, ClientError> {
        let response = self
            .request(
                Method::POST,
                &format!("/projects/{}/stories/{}/comments", project_id, story_id),
            )
            .json(input)
            .send()
            .await?;
        read_json(response).await
    }

    /// Upload a file to the project; the result can then be attached to a
    /// story via a comment.
    pub async fn upload(
        &self,
        project_id: u64,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Attachment, ClientError> {
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);

        let response = self
            .request(Method::POST, &format!("/projects/{}/uploads", project_id))
            .multipart(form)
            .send()
            .await?;
        read_json(response).await
    }
}
