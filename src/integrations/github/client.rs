//! HTTP client for the GitHub API.

use reqwest::{header, Client, Method};

use crate::integrations::{read_json, ClientError};
use crate::models::{Authorization, CreateAuthorizationInput, Issue};

/// Production API root. Overridable through the `api_url` setting.
const DEFAULT_URL: &str = "https://api.github.com";

/// GitHub rejects requests without a user agent.
const USER_AGENT: &str = "spoor";

const ACCEPT: &str = "application/vnd.github+json";

#[derive(Debug, Clone)]
pub struct GithubClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl GithubClient {
    pub fn new(base_url: Option<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_URL.to_string()),
            token,
            client: Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .client
            .request(method, &url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, ACCEPT);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Open issues of a repository.
    pub async fn open_issues(&self, user: &str, repo: &str) -> Result<Vec<Issue>, ClientError> {
        let response = self
            .request(Method::GET, &format!("/repos/{}/{}/issues", user, repo))
            .query(&[("state", "open")])
            .send()
            .await?;
        read_json(response).await
    }

    /// Register an OAuth authorization with basic-auth credentials, so the
    /// user does not have to enter them again.
    pub async fn create_authorization(
        &self,
        username: &str,
        password: &str,
        input: &CreateAuthorizationInput,
    ) -> Result<Authorization, ClientError> {
        let response = self
            .client
            .request(Method::POST, format!("{}/authorizations", self.base_url))
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, ACCEPT)
            .basic_auth(username, Some(password))
            .json(input)
            .send()
            .await?;
        read_json(response).await
    }
}
