//! Input checks run before anything is sent to the server, so mistakes surface as a readable
//! message next to the offending flag instead of a 422.

use chrono::{DateTime, Utc};
use thiserror::Error;

pub const MAX_ACTIVITY_NAME: usize = 100;
pub const MAX_COMMENT: usize = 1000;
pub const MAX_TAG_NAME: usize = 50;
pub const MAX_DISTRACTIONS: u32 = 1000;
pub const MIN_PASSWORD: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} can't be empty")]
    Empty { field: &'static str },
    #[error("{field} can be at most {max} characters long")]
    TooLong { field: &'static str, max: usize },
    #[error("Rating must be between 1 and 5, got {0}")]
    Rating(u8),
    #[error("Distractions must be at most 1000, got {0}")]
    Distractions(u32),
    #[error("Tag names can't contain commas: {0}")]
    TagComma(String),
    #[error("Stop time must be after start time")]
    StopBeforeStart,
    #[error("Entries can't end in the future")]
    FutureStop,
    #[error("{0} isn't a valid email address")]
    Email(String),
    #[error("Password must be at least 8 characters long")]
    PasswordTooShort,
}

fn bounded(value: &str, field: &'static str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// Returns the trimmed name.
pub fn activity_name(value: &str) -> Result<String, ValidationError> {
    bounded(value, "Activity name", MAX_ACTIVITY_NAME)
}

pub fn tag_name(value: &str) -> Result<String, ValidationError> {
    let name = bounded(value, "Tag name", MAX_TAG_NAME)?;
    if name.contains(',') {
        return Err(ValidationError::TagComma(name));
    }
    Ok(name)
}

/// Validates every tag and drops duplicates while keeping the order.
pub fn tag_list(values: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut tags: Vec<String> = vec![];
    for value in values {
        let tag = tag_name(value)?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

pub fn rating(value: u8) -> Result<u8, ValidationError> {
    if (1..=5).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::Rating(value))
    }
}

/// An empty comment clears it, so only the length is checked.
pub fn comment(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > MAX_COMMENT {
        return Err(ValidationError::TooLong {
            field: "Comment",
            max: MAX_COMMENT,
        });
    }
    Ok(trimmed.to_string())
}

pub fn distractions(value: u32) -> Result<u32, ValidationError> {
    if value > MAX_DISTRACTIONS {
        Err(ValidationError::Distractions(value))
    } else {
        Ok(value)
    }
}

pub fn entry_span(
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if stop <= start {
        return Err(ValidationError::StopBeforeStart);
    }
    if stop > now {
        return Err(ValidationError::FutureStop);
    }
    Ok(())
}

pub fn email(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    match trimmed.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !trimmed.contains(char::is_whitespace) =>
        {
            Ok(trimmed.to_string())
        }
        _ => Err(ValidationError::Email(trimmed.to_string())),
    }
}

pub fn password(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() < MIN_PASSWORD {
        Err(ValidationError::PasswordTooShort)
    } else {
        Ok(())
    }
}
