use crate::error::AppError;

/// Maximum length of a chat message
const MAX_MESSAGE_LENGTH: usize = 10_000;

/// Validate a message typed at the prompt
pub fn validate_message(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::InvalidInput("Message cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Message too long (max {} characters)",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(())
}

/// Validate a backend base URL such as `http://localhost:8000`
pub fn validate_base_url(url: &str) -> Result<(), AppError> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Invalid URL: {}. Expected http:// or https://",
                url
            ))
        })?;

    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return Err(AppError::InvalidInput(format!("Invalid URL: {}", url)));
    }
    Ok(())
}

/// Validate language code format (e.g., en_US, de_DE)
pub fn validate_language_code(code: &str) -> Result<(), AppError> {
    if is_valid_language_code(code) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Invalid language code format: {}. Expected format: ll_CC (e.g., en_US, de_DE)",
            code
        )))
    }
}

fn is_valid_language_code(code: &str) -> bool {
    // ll_CC or just ll
    let parts: Vec<&str> = code.split('_').collect();
    match parts.as_slice() {
        [lang] => is_lang(lang),
        [lang, country] => {
            is_lang(lang) && country.len() == 2 && country.chars().all(|c| c.is_ascii_uppercase())
        }
        _ => false,
    }
}

fn is_lang(part: &str) -> bool {
    part.len() == 2 && part.chars().all(|c| c.is_ascii_lowercase())
}
