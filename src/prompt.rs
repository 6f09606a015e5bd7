//! Interactive prompts, wrapping `inquire`.

use inquire::{Confirm, InquireError, Password, Select, Text};

use crate::models::StoryType;

pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Fields gathered interactively when adding a story.
pub struct StoryAttributes {
    pub name: String,
    pub story_type: StoryType,
    pub description: Option<String>,
    pub estimate: Option<f64>,
    pub labels: Vec<String>,
}

/// Yes/no confirmation, defaulting to no.
pub fn confirm(message: &str) -> Result<bool, InquireError> {
    Confirm::new(message).with_default(false).prompt()
}

pub fn username_and_password() -> Result<Credentials, InquireError> {
    let username = Text::new("Username").prompt()?;
    let password = Password::new("Password").without_confirmation().prompt()?;
    Ok(Credentials { username, password })
}

pub fn story_attributes() -> Result<StoryAttributes, InquireError> {
    let name = Text::new("Story name").prompt()?;
    let story_type = Select::new("Story type", StoryType::ALL.to_vec()).prompt()?;
    let description = non_empty(Text::new("Description").prompt()?);
    let estimate = Text::new("Estimate").prompt()?.trim().parse().ok();
    let labels = parse_labels(&Text::new("Labels (comma separated)").prompt()?);

    Ok(StoryAttributes {
        name,
        story_type,
        description,
        estimate,
        labels,
    })
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_labels(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(String::from)
        .collect()
}
