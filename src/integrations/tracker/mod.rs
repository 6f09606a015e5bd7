//! Pivotal Tracker integration.
//!
//! Commands cover iteration listings (`todo`, `current`, `backlog`,
//! `scheduled`, `icebox`, `stories`), single-story work (`show`, `add`,
//! `estimate`, `comment`, `attach`, `schedule`, `deliver_finished`) and a
//! family of state-transition commands generated from [`STATE_VERBS`]:
//! each verb registers an updating command (`start <story_id>`) and a
//! listing command named after the resulting state (`started`).

mod client;

pub use client::{IterationScope, TrackerClient};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{value_parser, Arg};

use crate::integrations::{CommandError, CommandFuture, CommandOpts, Integration, OptsFn};
use crate::models::{
    CreateCommentInput, CreateStoryInput, Iteration, Story, StoryState, UpdateStoryInput,
};
use crate::prompt;
use crate::render::Table;
use crate::settings::{self, IntegrationSettings, SettingsError};

/// State-transition verbs and the story state each one produces. Iterated
/// once at construction to register both command variants per entry.
const STATE_VERBS: &[(&str, StoryState)] = &[
    ("start", StoryState::Started),
    ("finish", StoryState::Finished),
    ("deliver", StoryState::Delivered),
    ("accept", StoryState::Accepted),
    ("unstart", StoryState::Unstarted),
];

#[derive(Debug, Clone, Copy)]
enum TrackerCommand {
    Todo,
    Current,
    Backlog,
    Scheduled,
    Icebox,
    Stories,
    Show,
    Add,
    Estimate,
    Comment,
    Attach,
    Schedule,
    DeliverFinished,
    SetState(StoryState),
    ListByState(StoryState),
}

pub struct Tracker {
    client: TrackerClient,
    project_id: Option<u64>,
    table: BTreeMap<String, TrackerCommand>,
}

impl Tracker {
    /// Settings slice: `token`, `project_id`, and optionally `api_url`.
    pub fn construct(
        settings: Option<IntegrationSettings>,
    ) -> Result<Box<dyn Integration>, SettingsError> {
        let slice = settings.as_ref();
        let token = settings::string_field(slice, "tracker", "token")?;
        let project_id = settings::u64_field(slice, "tracker", "project_id")?;
        let api_url = settings::string_field(slice, "tracker", "api_url")?;

        Ok(Box::new(Self {
            client: TrackerClient::new(api_url, token),
            project_id,
            table: command_table(),
        }))
    }

    fn project_id(&self) -> Result<u64, CommandError> {
        self.project_id
            .ok_or(CommandError::MissingSetting("tracker.project_id"))
    }

    // ============================================================
    // Listing commands
    // ============================================================

    /// Started and unstarted work in current, plus the entire backlog.
    async fn todo(&self) -> Result<(), CommandError> {
        let project = self.project_id()?;

        let current = self
            .client
            .iterations(project, IterationScope::Current)
            .await?;
        let mut stories: Vec<Story> = stories_from_iterations(current)
            .into_iter()
            .filter(|story| {
                !matches!(
                    story.current_state,
                    StoryState::Accepted | StoryState::Finished | StoryState::Delivered
                )
            })
            .collect();

        let backlog = self
            .client
            .iterations(project, IterationScope::Backlog)
            .await?;
        stories.extend(stories_from_iterations(backlog));
        stories.sort_by_key(|story| story.current_state.as_str());

        print!("{}", stories_listing(&stories, "No stories to work on"));
        Ok(())
    }

    async fn current(&self) -> Result<(), CommandError> {
        let project = self.project_id()?;
        let iterations = self
            .client
            .iterations(project, IterationScope::Current)
            .await?;
        let stories = stories_from_iterations(iterations);
        print!(
            "{}",
            stories_listing(&stories, "No stories in current iteration")
        );
        Ok(())
    }

    async fn backlog(&self) -> Result<(), CommandError> {
        let project = self.project_id()?;
        let iterations = self
            .client
            .iterations(project, IterationScope::Backlog)
            .await?;
        let stories = stories_from_iterations(iterations);
        print!("{}", stories_listing(&stories, "No stories in backlog"));
        Ok(())
    }

    /// Anything in current or backlog that is not yet accepted.
    async fn scheduled(&self) -> Result<(), CommandError> {
        let project = self.project_id()?;
        let iterations = self
            .client
            .iterations(project, IterationScope::CurrentBacklog)
            .await?;
        let stories: Vec<Story> = stories_from_iterations(iterations)
            .into_iter()
            .filter(|story| story.current_state != StoryState::Accepted)
            .collect();
        print!("{}", stories_listing(&stories, "No scheduled stories"));
        Ok(())
    }

    async fn icebox(&self) -> Result<(), CommandError> {
        let project = self.project_id()?;
        let stories = self
            .client
            .stories(project, Some("state:unscheduled"))
            .await?;
        print!("{}", stories_listing(&stories, "No stories in icebox"));
        Ok(())
    }

    async fn stories(&self) -> Result<(), CommandError> {
        let project = self.project_id()?;
        let stories = self.client.stories(project, None).await?;
        print!("{}", stories_listing(&stories, "No stories to display"));
        Ok(())
    }

    async fn list_by_state(&self, state: StoryState) -> Result<(), CommandError> {
        let project = self.project_id()?;
        let stories = self
            .client
            .stories(project, Some(&format!("state:{}", state)))
            .await?;
        print!(
            "{}",
            stories_listing(&stories, &format!("No stories are currently {}", state))
        );
        Ok(())
    }

    // ============================================================
    // Single-story commands
    // ============================================================

    async fn show(&self, story_id: u64) -> Result<(), CommandError> {
        let project = self.project_id()?;
        let story = self.client.story(project, story_id).await?;
        let comments = self.client.comments(project, story_id).await?;
        let tasks = self.client.tasks(project, story_id).await?;
        print!("{}", story_details(&story, &comments, &tasks));
        Ok(())
    }

    async fn add(&self) -> Result<(), CommandError> {
        let project = self.project_id()?;
        let attributes = prompt::story_attributes()?;

        let story = self
            .client
            .create_story(
                project,
                &CreateStoryInput {
                    name: attributes.name,
                    story_type: attributes.story_type,
                    description: attributes.description,
                    estimate: attributes.estimate,
                    labels: attributes.labels,
                },
            )
            .await?;

        println!("\nAdded story with id: {}", story.id);
        println!("You can view it at: {}\n", story.url);

        if prompt::confirm("Would you like to schedule this story?")? {
            self.schedule_story(story.id).await?;
        }
        Ok(())
    }

    async fn estimate(&self, story_id: u64, points: u64) -> Result<(), CommandError> {
        let project = self.project_id()?;
        self.client
            .update_story(
                project,
                story_id,
                &UpdateStoryInput {
                    estimate: Some(points as f64),
                    ..Default::default()
                },
            )
            .await?;
        println!("Story has been estimated");
        Ok(())
    }

    async fn comment(&self, story_id: u64, text: &str) -> Result<(), CommandError> {
        let project = self.project_id()?;
        let comment = self
            .client
            .add_comment(
                project,
                story_id,
                &CreateCommentInput {
                    text: Some(text.to_string()),
                    file_attachments: Vec::new(),
                },
            )
            .await?;
        println!(
            "Comment \"{}\" noted at {}",
            comment.text.unwrap_or_default(),
            comment.created_at
        );
        Ok(())
    }

    async fn attach(
        &self,
        story_id: u64,
        path: &Path,
        name: Option<&str>,
    ) -> Result<(), CommandError> {
        let project = self.project_id()?;

        let data = tokio::fs::read(path)
            .await
            .map_err(|source| CommandError::File {
                path: path.to_owned(),
                source,
            })?;

        let filename = match name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| CommandError::File {
                    path: path.to_owned(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "path has no file name",
                    ),
                })?,
        };

        let attachment = self.client.upload(project, &filename, data).await?;
        self.client
            .add_comment(
                project,
                story_id,
                &CreateCommentInput {
                    text: None,
                    file_attachments: vec![attachment],
                },
            )
            .await?;

        println!("Upload of {} successful", filename);
        Ok(())
    }

    async fn schedule(&self, story_id: u64) -> Result<(), CommandError> {
        if self.schedule_story(story_id).await? {
            println!("Story has been scheduled");
        }
        Ok(())
    }

    async fn deliver_finished(&self) -> Result<(), CommandError> {
        let project = self.project_id()?;
        let finished = self.client.stories(project, Some("state:finished")).await?;
        for story in &finished {
            self.client
                .update_story(
                    project,
                    story.id,
                    &UpdateStoryInput {
                        current_state: Some(StoryState::Delivered),
                        ..Default::default()
                    },
                )
                .await?;
        }
        println!("All finished stories now marked as delivered");
        Ok(())
    }

    async fn set_state(&self, story_id: u64, state: StoryState) -> Result<(), CommandError> {
        let project = self.project_id()?;
        let story = self
            .client
            .update_story(
                project,
                story_id,
                &UpdateStoryInput {
                    current_state: Some(state),
                    ..Default::default()
                },
            )
            .await?;
        println!("Story \"{}\" has been {}", story.name, state);
        Ok(())
    }

    /// Move a story after the last story of the backlog, regardless of its
    /// current location. Returns false when the backlog is empty and the
    /// story was left in place.
    async fn schedule_story(&self, story_id: u64) -> Result<bool, CommandError> {
        let project = self.project_id()?;
        let iterations = self
            .client
            .iterations(project, IterationScope::CurrentBacklog)
            .await?;

        match stories_from_iterations(iterations).pop() {
            Some(target) => {
                self.client
                    .update_story(
                        project,
                        story_id,
                        &UpdateStoryInput {
                            after_id: Some(target.id),
                            ..Default::default()
                        },
                    )
                    .await?;
                Ok(true)
            }
            None => {
                tracing::debug!(story_id, "backlog is empty, story left in place");
                Ok(false)
            }
        }
    }
}

impl Integration for Tracker {
    fn commands(&self) -> Vec<String> {
        self.table.keys().cloned().collect()
    }

    fn opts(&self, command: &str) -> Option<OptsFn> {
        match self.table.get(command)? {
            TrackerCommand::Show | TrackerCommand::Schedule | TrackerCommand::SetState(_) => {
                Some(story_id_opts)
            }
            TrackerCommand::Estimate => Some(estimate_opts),
            TrackerCommand::Comment => Some(comment_opts),
            TrackerCommand::Attach => Some(attach_opts),
            _ => None,
        }
    }

    fn run<'a>(&'a self, command: &'a str, opts: CommandOpts) -> CommandFuture<'a> {
        let entry = self.table.get(command).copied();
        Box::pin(async move {
            let Some(entry) = entry else {
                return Err(CommandError::UnknownCommand(command.to_string()));
            };

            match entry {
                TrackerCommand::Todo => self.todo().await,
                TrackerCommand::Current => self.current().await,
                TrackerCommand::Backlog => self.backlog().await,
                TrackerCommand::Scheduled => self.scheduled().await,
                TrackerCommand::Icebox => self.icebox().await,
                TrackerCommand::Stories => self.stories().await,
                TrackerCommand::Show => self.show(opts.require_u64("story_id")?).await,
                TrackerCommand::Add => self.add().await,
                TrackerCommand::Estimate => {
                    self.estimate(opts.require_u64("story_id")?, opts.require_u64("estimate")?)
                        .await
                }
                TrackerCommand::Comment => {
                    self.comment(opts.require_u64("story_id")?, opts.require_str("comment")?)
                        .await
                }
                TrackerCommand::Attach => {
                    self.attach(
                        opts.require_u64("story_id")?,
                        opts.require_path("path")?,
                        opts.str("name"),
                    )
                    .await
                }
                TrackerCommand::Schedule => self.schedule(opts.require_u64("story_id")?).await,
                TrackerCommand::DeliverFinished => self.deliver_finished().await,
                TrackerCommand::SetState(state) => {
                    self.set_state(opts.require_u64("story_id")?, state).await
                }
                TrackerCommand::ListByState(state) => self.list_by_state(state).await,
            }
        })
    }
}

fn command_table() -> BTreeMap<String, TrackerCommand> {
    let mut table = BTreeMap::new();
    for (name, command) in [
        ("todo", TrackerCommand::Todo),
        ("current", TrackerCommand::Current),
        ("backlog", TrackerCommand::Backlog),
        ("scheduled", TrackerCommand::Scheduled),
        ("icebox", TrackerCommand::Icebox),
        ("stories", TrackerCommand::Stories),
        ("show", TrackerCommand::Show),
        ("add", TrackerCommand::Add),
        ("estimate", TrackerCommand::Estimate),
        ("comment", TrackerCommand::Comment),
        ("attach", TrackerCommand::Attach),
        ("schedule", TrackerCommand::Schedule),
        ("deliver_finished", TrackerCommand::DeliverFinished),
    ] {
        table.insert(name.to_string(), command);
    }

    // Each verb registers an updating command and a listing command named
    // after the resulting state.
    for &(verb, state) in STATE_VERBS {
        table.insert(verb.to_string(), TrackerCommand::SetState(state));
        table.insert(state.as_str().to_string(), TrackerCommand::ListByState(state));
    }

    table
}

// ============================================================
// Option declarations
// ============================================================

fn story_id_opts(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        Arg::new("story_id")
            .required(true)
            .value_parser(value_parser!(u64))
            .help("ID of the Tracker story"),
    )
}

fn estimate_opts(cmd: clap::Command) -> clap::Command {
    story_id_opts(cmd).arg(
        Arg::new("estimate")
            .required(true)
            .value_parser(value_parser!(u64))
            .help("Number of story points"),
    )
}

fn comment_opts(cmd: clap::Command) -> clap::Command {
    story_id_opts(cmd).arg(
        Arg::new("comment")
            .required(true)
            .help("Comment to be posted"),
    )
}

fn attach_opts(cmd: clap::Command) -> clap::Command {
    story_id_opts(cmd)
        .arg(
            Arg::new("path")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Location of the file to upload"),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .help("Name of the file after upload"),
        )
}

// ============================================================
// Output
// ============================================================

fn stories_from_iterations(iterations: Vec<Iteration>) -> Vec<Story> {
    iterations
        .into_iter()
        .flat_map(|iteration| iteration.stories)
        .collect()
}

fn stories_listing(stories: &[Story], empty_message: &str) -> String {
    if stories.is_empty() {
        return format!("{}\n", empty_message);
    }

    let mut table = Table::with_header(["Name", "ID", "Type", "State", "Estimate", "Labels"]);
    for story in stories {
        table.push([
            story.name.clone(),
            story.id.to_string(),
            story.story_type.to_string(),
            story.current_state.to_string(),
            story
                .estimate
                .map(|estimate| estimate.to_string())
                .unwrap_or_else(|| "none".to_string()),
            labels_cell(story),
        ]);
    }
    table.render()
}

fn labels_cell(story: &Story) -> String {
    story
        .labels
        .iter()
        .map(|label| label.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn story_details(
    story: &Story,
    comments: &[crate::models::Comment],
    tasks: &[crate::models::StoryTask],
) -> String {
    let mut output = String::from("General Information:\n");

    let mut basic = Table::new();
    basic.push(["name".to_string(), story.name.clone()]);
    basic.push(["current_state".to_string(), story.current_state.to_string()]);
    basic.push([
        "estimate".to_string(),
        story
            .estimate
            .map(|estimate| estimate.to_string())
            .unwrap_or_else(|| "none".to_string()),
    ]);
    basic.push([
        "requested_by".to_string(),
        story
            .requested_by
            .as_ref()
            .map(|person| person.name.clone())
            .unwrap_or_default(),
    ]);
    basic.push(["labels".to_string(), labels_cell(story)]);
    basic.push([
        "description".to_string(),
        story.description.clone().unwrap_or_default(),
    ]);
    output.push_str(&basic.render());

    if !comments.is_empty() {
        let mut table = Table::with_header(["Comment", "Timestamp"]);
        for comment in comments {
            table.push([
                comment.text.clone().unwrap_or_default(),
                comment.created_at.to_string(),
            ]);
        }
        output.push_str("Comments:\n");
        output.push_str(&table.render());
    }

    if !tasks.is_empty() {
        let mut table = Table::with_header([" ", "Task", "ID"]);
        for task in tasks {
            table.push([
                if task.complete { "✓" } else { " " }.to_string(),
                task.description.clone(),
                task.id.to_string(),
            ]);
        }
        output.push_str("Tasks:\n");
        output.push_str(&table.render());
    }

    let attachments: Vec<_> = comments
        .iter()
        .flat_map(|comment| comment.file_attachments.iter())
        .collect();
    if !attachments.is_empty() {
        let mut table = Table::with_header(["Filename", "URL"]);
        for attachment in attachments {
            table.push([
                attachment.filename.clone(),
                attachment.download_url.clone().unwrap_or_default(),
            ]);
        }
        output.push_str("Attachments:\n");
        output.push_str(&table.render());
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Label, StoryType};

    fn story(id: u64, name: &str, state: StoryState, estimate: Option<f64>) -> Story {
        Story {
            id,
            name: name.to_string(),
            story_type: StoryType::Feature,
            current_state: state,
            estimate,
            labels: vec![Label {
                name: "core".to_string(),
            }],
            description: None,
            requested_by: None,
            url: String::new(),
        }
    }

    #[test]
    fn command_table_registers_both_variants_per_verb() {
        let table = command_table();
        for &(verb, state) in STATE_VERBS {
            assert!(
                matches!(table.get(verb), Some(TrackerCommand::SetState(s)) if *s == state),
                "missing updating command for {verb}"
            );
            assert!(
                matches!(table.get(state.as_str()), Some(TrackerCommand::ListByState(s)) if *s == state),
                "missing listing command for {}",
                state
            );
        }
    }

    #[test]
    fn listing_renders_expected_columns_and_none_estimate() {
        let stories = vec![
            story(1, "First", StoryState::Started, Some(2.0)),
            story(2, "Second", StoryState::Unstarted, None),
        ];

        let expected = "\
┌────────┬────┬─────────┬───────────┬──────────┬────────┐
│ Name   │ ID │ Type    │ State     │ Estimate │ Labels │
├────────┼────┼─────────┼───────────┼──────────┼────────┤
│ First  │ 1  │ feature │ started   │ 2        │ core   │
│ Second │ 2  │ feature │ unstarted │ none     │ core   │
└────────┴────┴─────────┴───────────┴──────────┴────────┘
";
        assert_eq!(stories_listing(&stories, "No stories"), expected);
    }

    #[test]
    fn empty_listing_prints_only_the_message() {
        assert_eq!(stories_listing(&[], "No stories to work on"), "No stories to work on\n");
    }

    #[test]
    fn iteration_stories_flatten_in_order() {
        let iterations = vec![
            Iteration {
                number: 1,
                stories: vec![story(1, "a", StoryState::Started, None)],
            },
            Iteration {
                number: 2,
                stories: vec![
                    story(2, "b", StoryState::Unstarted, None),
                    story(3, "c", StoryState::Unstarted, None),
                ],
            },
        ];

        let ids: Vec<u64> = stories_from_iterations(iterations)
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn story_id_opts_parse_a_numeric_positional() {
        let matches = story_id_opts(clap::Command::new("show").no_binary_name(true))
            .try_get_matches_from(["42"])
            .unwrap();
        assert_eq!(matches.get_one::<u64>("story_id").copied(), Some(42));
    }

    #[test]
    fn attach_opts_accept_an_optional_name_flag() {
        let matches = attach_opts(clap::Command::new("attach").no_binary_name(true))
            .try_get_matches_from(["7", "notes.txt", "--name", "renamed.txt"])
            .unwrap();
        assert_eq!(matches.get_one::<u64>("story_id").copied(), Some(7));
        assert_eq!(
            matches.get_one::<String>("name").map(String::as_str),
            Some("renamed.txt")
        );
    }

    #[test]
    fn missing_required_positional_is_a_parse_error() {
        let result = estimate_opts(clap::Command::new("estimate").no_binary_name(true))
            .try_get_matches_from(["42"]);
        assert!(result.is_err());
    }
}
