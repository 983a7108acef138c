//! Field rules shared by the classifier prompts and catalog loading.
//!
//! Each validator is a pure predicate. On rejection it returns the guidance
//! line the operator should see; printing it is up to the caller.

use crate::core::catalog::{Language, License};

pub type Verdict = Result<(), String>;

pub fn check_tags(tags: &str) -> Verdict {
    if tags.is_empty() {
        return Err("Tags are required!".to_string());
    }
    if tags.to_lowercase() != tags {
        return Err("Only lower case letters please.".to_string());
    }
    Ok(())
}

pub fn check_title(_title: &str) -> Verdict {
    Ok(())
}

pub fn check_author(_author: &str) -> Verdict {
    Ok(())
}

/// Empty means "unset" and is always accepted.
pub fn check_license(license: &str) -> Verdict {
    if license.is_empty() || license.parse::<License>().is_ok() {
        return Ok(());
    }
    Err(format!("Valid licenses: {}", allow_list(License::ALL.iter().map(License::as_str))))
}

pub fn check_language(language: &str) -> Verdict {
    if language.is_empty() || language.parse::<Language>().is_ok() {
        return Ok(());
    }
    Err(format!("Valid languages: {}", allow_list(Language::ALL.iter().map(Language::as_str))))
}

/// Renders `["", "a", "b"]`, the empty string standing for "unset".
fn allow_list<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = std::iter::once("")
        .chain(values)
        .map(|v| format!("\"{v}\""))
        .collect();
    format!("[{}]", quoted.join(", "))
}
