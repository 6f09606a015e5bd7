//! GitHub integration.
//!
//! Two commands: `open_issues` lists a repository's open issues, and
//! `setup` bootstraps configuration interactively, registering an OAuth
//! token (saved to the user document) and inferring the repository from
//! `git remote -v` (saved to the project document).

mod client;

pub use client::GithubClient;

use std::collections::BTreeMap;

use regex_lite::Regex;
use serde_json::Value;

use crate::integrations::{CommandError, CommandFuture, CommandOpts, Integration, OptsFn};
use crate::models::{CreateAuthorizationInput, Issue};
use crate::prompt;
use crate::render::Table;
use crate::settings::{self, IntegrationSettings, SettingsError, Store};

#[derive(Debug, Clone, Copy)]
enum GithubCommand {
    OpenIssues,
    Setup,
}

pub struct Github {
    client: GithubClient,
    user: Option<String>,
    repo: Option<String>,
    authenticated: bool,
    table: BTreeMap<String, GithubCommand>,
}

impl Github {
    /// Settings slice: `token`, `user`, `repo`, and optionally `api_url`.
    pub fn construct(
        settings: Option<IntegrationSettings>,
    ) -> Result<Box<dyn Integration>, SettingsError> {
        let slice = settings.as_ref();
        let token = settings::string_field(slice, "github", "token")?;
        let user = settings::string_field(slice, "github", "user")?;
        let repo = settings::string_field(slice, "github", "repo")?;
        let api_url = settings::string_field(slice, "github", "api_url")?;

        Ok(Box::new(Self {
            authenticated: token.is_some(),
            client: GithubClient::new(api_url, token),
            user,
            repo,
            table: command_table(),
        }))
    }

    async fn open_issues(&self) -> Result<(), CommandError> {
        let user = self
            .user
            .as_deref()
            .ok_or(CommandError::MissingSetting("github.user"))?;
        let repo = self
            .repo
            .as_deref()
            .ok_or(CommandError::MissingSetting("github.repo"))?;

        let issues = self.client.open_issues(user, repo).await?;
        print!("{}", issues_listing(&issues, "No open issues"));
        Ok(())
    }

    /// Interactive bootstrap: token registration, then repository
    /// inference.
    async fn setup(&self) -> Result<(), CommandError> {
        if self.authenticated {
            println!("Authorization token already exists.");
            if prompt::confirm("Are you sure you want to continue?")? {
                self.create_authorization().await?;
            }
        } else {
            self.create_authorization().await?;
        }

        self.infer_repository().await
    }

    async fn create_authorization(&self) -> Result<(), CommandError> {
        println!("We need your username and password in order to generate an OAuth token.");
        println!(
            "We will save this token in your home directory so you will not need to enter credentials again."
        );

        let credentials = prompt::username_and_password()?;
        let authorization = self
            .client
            .create_authorization(
                &credentials.username,
                &credentials.password,
                &CreateAuthorizationInput {
                    scopes: vec!["repo".to_string()],
                    note: "spoor".to_string(),
                    note_url: Some("https://github.com/sonnym/spoor".to_string()),
                },
            )
            .await?;

        let mut fields = IntegrationSettings::new();
        fields.insert("token".to_string(), Value::String(authorization.token));
        Store::from_env()?.write_user_slice("github", fields)?;

        println!("Token successfully saved");
        Ok(())
    }

    async fn infer_repository(&self) -> Result<(), CommandError> {
        let output = tokio::process::Command::new("git")
            .args(["remote", "-v"])
            .output()
            .await
            .map_err(CommandError::Git)?;

        let remotes = String::from_utf8_lossy(&output.stdout);
        let Some(remote) = parse_origin_fetch(&remotes) else {
            tracing::debug!("no origin fetch remote to infer repository from");
            return Ok(());
        };

        println!(
            "We were able to infer the following settings about your Github repository! Does the following information look correct?"
        );
        println!("username: {}", remote.user);
        println!("repo: {}", remote.repo);
        println!();

        if prompt::confirm("Would you like to save this information?")? {
            let mut fields = IntegrationSettings::new();
            fields.insert("user".to_string(), Value::String(remote.user));
            fields.insert("repo".to_string(), Value::String(remote.repo));
            Store::from_env()?.write_project_slice("github", fields)?;

            println!("Github project settings saved!");
        }
        Ok(())
    }
}

impl Integration for Github {
    fn commands(&self) -> Vec<String> {
        self.table.keys().cloned().collect()
    }

    fn opts(&self, _command: &str) -> Option<OptsFn> {
        None
    }

    fn run<'a>(&'a self, command: &'a str, _opts: CommandOpts) -> CommandFuture<'a> {
        let entry = self.table.get(command).copied();
        Box::pin(async move {
            match entry {
                Some(GithubCommand::OpenIssues) => self.open_issues().await,
                Some(GithubCommand::Setup) => self.setup().await,
                None => Err(CommandError::UnknownCommand(command.to_string())),
            }
        })
    }
}

fn command_table() -> BTreeMap<String, GithubCommand> {
    BTreeMap::from([
        ("open_issues".to_string(), GithubCommand::OpenIssues),
        ("setup".to_string(), GithubCommand::Setup),
    ])
}

#[derive(Debug, PartialEq)]
struct RemoteRepo {
    user: String,
    repo: String,
}

/// Pull `user/repo` out of the first `origin … (fetch)` line of
/// `git remote -v`. Handles both ssh and https remote URLs.
fn parse_origin_fetch(remotes: &str) -> Option<RemoteRepo> {
    let line = remotes
        .lines()
        .find(|line| line.starts_with("origin") && line.trim_end().ends_with("(fetch)"))?;
    let url = line.split_whitespace().nth(1)?;

    let pattern = Regex::new(r"[:/]([^/:\s]+)/([^/\s]+)$").ok()?;
    let captures = pattern.captures(url)?;
    let user = captures.get(1)?.as_str().to_string();
    let repo = captures.get(2)?.as_str();
    let repo = repo.strip_suffix(".git").unwrap_or(repo).to_string();

    Some(RemoteRepo { user, repo })
}

fn issues_listing(issues: &[Issue], empty_message: &str) -> String {
    if issues.is_empty() {
        return format!("{}\n", empty_message);
    }

    let mut table = Table::with_header(["Title", "ID", "User", "Labels", "Comments"]);
    for issue in issues {
        let labels = issue
            .labels
            .iter()
            .map(|label| label.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        table.push([
            issue.title.clone(),
            issue.id.to_string(),
            issue.user.login.clone(),
            labels,
            issue.comments.to_string(),
        ]);
    }
    table.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueAuthor, IssueLabel};

    #[test]
    fn parses_ssh_origin_remote() {
        let remotes = "\
origin\tgit@github.com:sonnym/spoor.git (fetch)
origin\tgit@github.com:sonnym/spoor.git (push)
";
        assert_eq!(
            parse_origin_fetch(remotes),
            Some(RemoteRepo {
                user: "sonnym".to_string(),
                repo: "spoor".to_string(),
            })
        );
    }

    #[test]
    fn parses_https_origin_remote_without_git_suffix() {
        let remotes = "origin\thttps://github.com/sonnym/spoor (fetch)\n";
        assert_eq!(
            parse_origin_fetch(remotes),
            Some(RemoteRepo {
                user: "sonnym".to_string(),
                repo: "spoor".to_string(),
            })
        );
    }

    #[test]
    fn ignores_non_origin_remotes() {
        let remotes = "upstream\tgit@github.com:other/project.git (fetch)\n";
        assert_eq!(parse_origin_fetch(remotes), None);
    }

    #[test]
    fn listing_renders_issue_columns() {
        let issues = vec![Issue {
            id: 9000,
            number: 12,
            title: "Tables misaligned".to_string(),
            user: IssueAuthor {
                login: "sonny".to_string(),
            },
            labels: vec![
                IssueLabel {
                    name: "bug".to_string(),
                },
                IssueLabel {
                    name: "display".to_string(),
                },
            ],
            comments: 3,
        }];

        let expected = "\
┌───────────────────┬──────┬───────┬──────────────┬──────────┐
│ Title             │ ID   │ User  │ Labels       │ Comments │
├───────────────────┼──────┼───────┼──────────────┼──────────┤
│ Tables misaligned │ 9000 │ sonny │ bug, display │ 3        │
└───────────────────┴──────┴───────┴──────────────┴──────────┘
";
        assert_eq!(issues_listing(&issues, "No open issues"), expected);
    }

    #[test]
    fn empty_listing_prints_only_the_message() {
        assert_eq!(issues_listing(&[], "No open issues"), "No open issues\n");
    }
}
