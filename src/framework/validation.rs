// Field validation - collects per-field messages into a single 400 payload

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{AppError, AppResult};

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("hex color pattern is valid"));

static HTTP_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/?#]+\.[^\s/?#]+(?:[/?#]\S*)?$|^https?://localhost(?::\d+)?(?:[/?#]\S*)?$")
        .expect("url pattern is valid"));

/// Field name -> list of messages, rendered as the `fields` object of a 400 response.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Ok when nothing was collected, otherwise a `Validation` error.
    pub fn into_result(self) -> AppResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// How a write payload is applied: creation and PUT need every required field,
/// PATCH only touches what was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Replace,
    Partial,
}

impl WriteMode {
    pub fn requires_all(self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}

/// Required text field: must be present when the mode demands it and never blank.
pub fn check_required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    max_len: Option<usize>,
    mode: WriteMode,
) {
    match value {
        None if mode.requires_all() => errors.add(field, "This field is required."),
        None => {}
        Some(text) if text.trim().is_empty() => errors.add(field, "This field may not be blank."),
        Some(text) => {
            if let Some(max) = max_len {
                check_max_len(errors, field, text, max);
            }
        }
    }
}

pub fn check_max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max),
        );
    }
}

pub fn check_url(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.chars().count() > 200 || !HTTP_URL.is_match(value) {
        errors.add(field, "Enter a valid URL.");
    }
}

pub fn check_hex_color(errors: &mut FieldErrors, field: &str, value: &str) {
    if !HEX_COLOR.is_match(value) {
        errors.add(field, "Enter a hex color such as #007bff.");
    }
}

/// Deserializes a field that distinguishes "absent" (outer `None`, via
/// `#[serde(default)]`) from an explicit `null` (`Some(None)`).
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parses an optional id-valued query parameter; blank counts as absent.
pub fn parse_id_param(field: &str, raw: Option<&str>) -> AppResult<Option<i64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AppError::field(field, "Select a valid choice. That choice is not one of the available choices.")),
    }
}

/// Parses an optional boolean query parameter in the forms browsers and
/// clients commonly send.
pub fn parse_bool_param(field: &str, raw: Option<&str>) -> AppResult<Option<bool>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(AppError::field(field, "Enter a valid boolean.")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_modes() {
        let mut errors = FieldErrors::new();
        check_required_text(&mut errors, "title", None, Some(200), WriteMode::Create);
        check_required_text(&mut errors, "content", None, None, WriteMode::Partial);
        check_required_text(&mut errors, "name", Some("   "), Some(100), WriteMode::Partial);

        assert_eq!(errors.get("title"), Some(&["This field is required.".to_string()][..]));
        assert!(errors.get("content").is_none());
        assert!(errors.get("name").is_some());
    }

    #[test]
    fn test_max_len_counts_chars() {
        let mut errors = FieldErrors::new();
        check_max_len(&mut errors, "excerpt", &"é".repeat(300), 300);
        assert!(errors.is_empty());
        check_max_len(&mut errors, "excerpt", &"a".repeat(301), 300);
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_url_and_color_checks() {
        let mut errors = FieldErrors::new();
        check_url(&mut errors, "avatar", "https://example.com/me.png");
        check_url(&mut errors, "website", "http://localhost:8000/");
        check_hex_color(&mut errors, "color", "#00ff7B");
        assert!(errors.is_empty());

        check_url(&mut errors, "avatar", "not a url");
        check_hex_color(&mut errors, "color", "blue");
        assert!(errors.get("avatar").is_some());
        assert!(errors.get("color").is_some());
    }

    #[test]
    fn test_nullable_distinguishes_null_from_absent() {
        #[derive(Deserialize)]
        struct Payload {
            #[serde(default, deserialize_with = "nullable")]
            category: Option<Option<i64>>,
        }

        let absent: Payload = serde_json::from_str("{}").unwrap();
        let null: Payload = serde_json::from_str(r#"{"category": null}"#).unwrap();
        let set: Payload = serde_json::from_str(r#"{"category": 3}"#).unwrap();

        assert_eq!(absent.category, None);
        assert_eq!(null.category, Some(None));
        assert_eq!(set.category, Some(Some(3)));
    }

    #[test]
    fn test_query_param_parsing() {
        assert_eq!(parse_id_param("category", Some("")).unwrap(), None);
        assert_eq!(parse_id_param("category", Some("12")).unwrap(), Some(12));
        assert!(parse_id_param("category", Some("abc")).is_err());
        assert_eq!(parse_bool_param("is_featured", Some("True")).unwrap(), Some(true));
        assert_eq!(parse_bool_param("is_featured", Some("0")).unwrap(), Some(false));
        assert!(parse_bool_param("is_featured", Some("maybe")).is_err());
    }
}
