use regex::Regex;
use std::sync::LazyLock;
use validator::ValidationError;

/// Latin and Cyrillic letters, whitespace and hyphens
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Zа-яА-ЯёЁ\s-]+$").expect("valid name regex"));

/// `local@domain.tld` with at least one dot in the domain
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)+$",
    )
    .expect("valid email regex")
});

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(invalid("blank", "Name must not be blank"));
    }
    if !NAME_RE.is_match(name) {
        return Err(invalid(
            "name_chars",
            "Name may only contain letters, spaces and hyphens",
        ));
    }
    Ok(())
}

/// Empty input is left to the `length` rule.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || EMAIL_RE.is_match(email) {
        return Ok(());
    }
    Err(invalid(
        "email_format",
        "Email must not contain forbidden characters and must have a dot in the domain",
    ))
}
