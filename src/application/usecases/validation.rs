use chrono::{DateTime, Utc};

use crate::domain::{errors::DomainError, models::MAX_BODY_LENGTH};

pub fn parse_scheduled_at(value: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| {
            DomainError::Validation(format!(
                "invalid scheduled_at '{value}', expected an ISO 8601 / RFC 3339 timestamp"
            ))
        })
}

pub fn validate_content(recipient: &str, body: &str) -> Result<(), DomainError> {
    if recipient.trim().is_empty() {
        return Err(DomainError::Validation(
            "recipient must not be empty".to_string(),
        ));
    }
    if body.trim().is_empty() {
        return Err(DomainError::Validation("body must not be empty".to_string()));
    }
    if body.chars().count() > MAX_BODY_LENGTH {
        return Err(DomainError::Validation(format!(
            "body must be at most {MAX_BODY_LENGTH} characters"
        )));
    }
    Ok(())
}
