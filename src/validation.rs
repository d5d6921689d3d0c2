use std::sync::OnceLock;

use chrono::{Datelike, Utc};
use regex::Regex;

use crate::errors::{AppError, AppResult};

pub const SCORE_MIN: i64 = 1;
pub const SCORE_MAX: i64 = 10;

const USERNAME_MAX: usize = 150;
const EMAIL_MAX: usize = 254;
const NAME_MAX: usize = 256;
const SLUG_MAX: usize = 50;

/// Reserved path segment: `/users/me` addresses the caller's own profile.
const RESERVED_USERNAME: &str = "me";

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.@+-]+$").expect("valid username regex"))
}

fn slug_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug regex"))
}

pub fn validate_username(value: &str) -> AppResult<()> {
    if value.is_empty() || value.len() > USERNAME_MAX {
        return Err(AppError::validation("username must be 1-150 characters"));
    }
    if value.eq_ignore_ascii_case(RESERVED_USERNAME) {
        return Err(AppError::validation("username 'me' is reserved"));
    }
    if !username_regex().is_match(value) {
        return Err(AppError::validation(format!("invalid username: {value}")));
    }
    Ok(())
}

pub fn validate_email(value: &str) -> AppResult<()> {
    if value.is_empty() || value.len() > EMAIL_MAX {
        return Err(AppError::validation("email must be 1-254 characters"));
    }
    // A full RFC check belongs to the mail relay; reject the obviously broken.
    let mut parts = value.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::validation(format!("invalid email: {value}"))),
    }
}

pub fn validate_name(value: &str) -> AppResult<()> {
    if value.is_empty() || value.len() > NAME_MAX {
        return Err(AppError::validation("name must be 1-256 characters"));
    }
    Ok(())
}

pub fn validate_slug(value: &str) -> AppResult<()> {
    if value.is_empty() || value.len() > SLUG_MAX {
        return Err(AppError::validation("slug must be 1-50 characters"));
    }
    if !slug_regex().is_match(value) {
        return Err(AppError::validation(format!("invalid slug: {value}")));
    }
    Ok(())
}

/// Release year cannot lie in the future or before year zero.
pub fn validate_year(value: i64) -> AppResult<()> {
    let current = i64::from(Utc::now().year());
    if value < 0 || value > current {
        return Err(AppError::validation(format!(
            "year must be between 0 and {current}"
        )));
    }
    Ok(())
}

pub fn validate_score(value: i64) -> AppResult<()> {
    if !(SCORE_MIN..=SCORE_MAX).contains(&value) {
        return Err(AppError::validation(format!(
            "score must be between {SCORE_MIN} and {SCORE_MAX}"
        )));
    }
    Ok(())
}
