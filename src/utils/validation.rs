// src/utils/validation.rs
use regex::Regex;

const MAX_OWNER_LENGTH: usize = 39;
const MAX_REPO_NAME_LENGTH: usize = 100;
const MAX_TOPIC_LENGTH: usize = 50;
const MAX_LANGUAGE_LENGTH: usize = 50;
const MAX_LABEL_LENGTH: usize = 50;
pub const MAX_FREE_TEXT_LENGTH: usize = 256;

lazy_static::lazy_static! {
    static ref OWNER_REGEX: Regex = Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?$").unwrap();
    static ref REPO_NAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9._-]+$").unwrap();
    static ref TOPIC_REGEX: Regex = Regex::new(r"^[a-z0-9][a-z0-9-]*$").unwrap();
    static ref LANGUAGE_REGEX: Regex = Regex::new(r"^[A-Za-z0-9+#._ -]+$").unwrap();
}

/// Validates a user or organization login.
pub fn validate_owner(owner: &str) -> Result<(), &'static str> {
    if owner.is_empty() || owner.len() > MAX_OWNER_LENGTH {
        return Err("Owner must be between 1 and 39 characters");
    }

    if !OWNER_REGEX.is_match(owner) || owner.contains("--") {
        return Err("Owner can only contain letters, numbers and single hyphens");
    }

    Ok(())
}

pub fn validate_repo_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() || name.len() > MAX_REPO_NAME_LENGTH {
        return Err("Repository name must be between 1 and 100 characters");
    }

    if !REPO_NAME_REGEX.is_match(name) {
        return Err("Repository name can only contain letters, numbers, dots, underscores, and hyphens");
    }

    if name == "." || name == ".." {
        return Err("Repository name is reserved");
    }

    Ok(())
}

/// Topics are lowercase on GitHub; callers lowercase before validating.
pub fn validate_topic(topic: &str) -> Result<(), &'static str> {
    if topic.is_empty() || topic.len() > MAX_TOPIC_LENGTH {
        return Err("Topic must be between 1 and 50 characters");
    }

    if !TOPIC_REGEX.is_match(topic) {
        return Err("Topic can only contain lowercase letters, numbers, and hyphens");
    }

    Ok(())
}

pub fn validate_language(language: &str) -> Result<(), &'static str> {
    if language.len() > MAX_LANGUAGE_LENGTH {
        return Err("Language too long (maximum 50 characters)");
    }

    if !LANGUAGE_REGEX.is_match(language) {
        return Err("Language contains invalid characters");
    }

    Ok(())
}

/// Labels are emitted inside double quotes, so a quote would end the clause.
pub fn validate_label(label: &str) -> Result<(), &'static str> {
    if label.len() > MAX_LABEL_LENGTH {
        return Err("Label too long (maximum 50 characters)");
    }

    if label.contains('"') || label.chars().any(|c| c.is_control()) {
        return Err("Label contains invalid characters");
    }

    Ok(())
}

pub fn validate_free_text(text: &str) -> Result<(), &'static str> {
    if text.len() > MAX_FREE_TEXT_LENGTH {
        return Err("Search text too long (maximum 256 characters)");
    }

    if text.chars().any(|c| c.is_control()) {
        return Err("Search text contains control characters");
    }

    Ok(())
}
