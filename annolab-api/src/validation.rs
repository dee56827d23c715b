//! Input validation for account fields and names

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ApiError, ApiResult};

/// ASCII word characters only; a Unicode `\w` would admit any letter
static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\s]{2,40}$").expect("static username pattern"));

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern")
});

/// Characters that satisfy the "special character" password rule
pub const PASSWORD_SPECIALS: &str = "!@#$%^*+=-";

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 20;

pub const WORKSPACE_NAME_MIN_LEN: usize = 4;

pub fn validate_email(email: &str) -> ApiResult<()> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Invalid email address".to_string()))
    }
}

/// 2 to 40 letters, digits, underscores or spaces
pub fn validate_username(username: &str) -> ApiResult<()> {
    if USERNAME_PATTERN.is_match(username) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(
            "Username must be 2-40 characters of letters, digits, underscores or spaces"
                .to_string(),
        ))
    }
}

/// 8 to 20 characters with at least one letter, one digit and one of
/// [`PASSWORD_SPECIALS`]
pub fn validate_password(password: &str) -> ApiResult<()> {
    let len = password.chars().count();
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len)
        && has_letter
        && has_digit
        && has_special
    {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Password must be {}-{} characters and include a letter, a digit and one of {}",
            PASSWORD_MIN_LEN, PASSWORD_MAX_LEN, PASSWORD_SPECIALS
        )))
    }
}

/// Trimmed, non-empty name
pub fn require_name(name: &str, field: &str) -> ApiResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

pub fn validate_workspace_name(name: &str) -> ApiResult<String> {
    let name = require_name(name, "Workspace name")?;
    if name.chars().count() < WORKSPACE_NAME_MIN_LEN {
        return Err(ApiError::BadRequest(format!(
            "Workspace name must be at least {} characters",
            WORKSPACE_NAME_MIN_LEN
        )));
    }
    Ok(name)
}
