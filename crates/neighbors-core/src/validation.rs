//! Input validation for tasks and user profiles.
//!
//! Applied at the request boundary, before anything reaches storage or the
//! ranking engines. The engines themselves assume validated input.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Value shorter than allowed.
    TooShort { field: String, min: usize, actual: usize },
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
    /// Invalid phone number format.
    InvalidPhone(String),
    /// Invalid media URL.
    InvalidUrl(String),
    /// Negative amount where only zero or more is allowed.
    Negative { field: String, value: i64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::TooShort { field, min, actual } => {
                write!(f, "{} is too short ({} chars, min {})", field, actual, min)
            }
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
            ValidationError::InvalidPhone(msg) => write!(f, "Invalid phone: {}", msg),
            ValidationError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            ValidationError::Negative { field, value } => {
                write!(f, "{} cannot be negative (got {})", field, value)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

pub const MIN_TITLE_LENGTH: usize = 3;
pub const MAX_TITLE_LENGTH: usize = 120;

pub const MIN_DESCRIPTION_LENGTH: usize = 10;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 64;

pub const MIN_PHONE_LENGTH: usize = 10;
pub const MAX_PHONE_LENGTH: usize = 20;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum allowed length for image/video URLs.
pub const MAX_URL_LENGTH: usize = 2048;

/// Check a trimmed value's length in characters against `min..=max`.
fn validate_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let value = value.trim();
    let len = value.chars().count();

    if len == 0 {
        return Err(ValidationError::Empty(field.to_string()));
    }

    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
            actual: len,
        });
    }

    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
            actual: len,
        });
    }

    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    validate_length("title", title, MIN_TITLE_LENGTH, MAX_TITLE_LENGTH)
}

pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    validate_length(
        "description",
        description,
        MIN_DESCRIPTION_LENGTH,
        MAX_DESCRIPTION_LENGTH,
    )
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    validate_length("name", name, MIN_NAME_LENGTH, MAX_NAME_LENGTH)
}

/// Validate a phone number.
///
/// Accepts digits with an optional leading `+` and the separators space,
/// `-`, `(` and `)`. Requires at least 10 digits.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Empty("phone".to_string()));
    }

    if phone.len() > MAX_PHONE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: MAX_PHONE_LENGTH,
            actual: phone.len(),
        });
    }

    let body = phone.strip_prefix('+').unwrap_or(phone);
    if let Some(c) = body
        .chars()
        .find(|c| !c.is_ascii_digit() && !matches!(c, ' ' | '-' | '(' | ')'))
    {
        return Err(ValidationError::InvalidPhone(format!(
            "unexpected character '{}'",
            c
        )));
    }

    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < MIN_PHONE_LENGTH {
        return Err(ValidationError::InvalidPhone(format!(
            "expected at least {} digits, got {}",
            MIN_PHONE_LENGTH, digits
        )));
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LENGTH,
            actual: len,
        });
    }
    Ok(())
}

pub fn validate_reward(reward: i64) -> Result<(), ValidationError> {
    if reward < 0 {
        return Err(ValidationError::Negative {
            field: "reward".to_string(),
            value: reward,
        });
    }
    Ok(())
}

/// Validate an image or video URL (scheme and length only).
pub fn validate_media_url(url: &str) -> Result<(), ValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(ValidationError::Empty("url".to_string()));
    }

    if url.len() > MAX_URL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "url".to_string(),
            max: MAX_URL_LENGTH,
            actual: url.len(),
        });
    }

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            ValidationError::InvalidUrl("must start with http:// or https://".to_string())
        })?;

    if rest.is_empty() {
        return Err(ValidationError::InvalidUrl("missing host".to_string()));
    }

    Ok(())
}
