//! Repository slug validation.

use std::sync::OnceLock;

use regex::Regex;

use crate::{AppError, Result};

/// Placeholder slug shown in empty forms; never a real target.
pub const PLACEHOLDER_REPO: &str = "owner/repo";

/// `owner/name`, each segment alphanumerics, `.`, `_` or `-`.
const SLUG_PATTERN: &str = r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$";

fn slug_regex() -> Option<&'static Regex> {
    static SLUG: OnceLock<Option<Regex>> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(SLUG_PATTERN).ok()).as_ref()
}

/// Whether `repo` has the two-segment `owner/name` shape.
///
/// Does not reject the placeholder; see [`validate_repo_slug`].
#[must_use]
pub fn looks_like_slug(repo: &str) -> bool {
    slug_regex().is_some_and(|re| re.is_match(repo.trim()))
}

/// Validate a repository slug before submitting issues.
///
/// This is a local pre-submission guard; the backend still validates.
///
/// # Errors
///
/// Returns `AppError::Validation` if `repo` is not `owner/name` or is the
/// placeholder value.
pub fn validate_repo_slug(repo: &str) -> Result<&str> {
    let trimmed = repo.trim();
    if !looks_like_slug(trimmed) {
        return Err(AppError::Validation(format!(
            "repository must look like owner/name, got {trimmed:?}"
        )));
    }
    if trimmed.eq_ignore_ascii_case(PLACEHOLDER_REPO) {
        return Err(AppError::Validation(
            "repository is still the placeholder owner/repo".into(),
        ));
    }
    Ok(trimmed)
}
