//! Synthetic risk identities and duplicate suppression

use crate::models::Risk;
use std::collections::HashSet;

/// Separator between the category ID and the referenced entity IDs
pub const ID_SEPARATOR: char = '@';

/// Build `category@part@part...`, skipping empty parts
pub fn synthetic_id(category_id: &str, parts: &[&str]) -> String {
    let mut id = category_id.to_string();
    for part in parts.iter().filter(|part| !part.is_empty()) {
        id.push(ID_SEPARATOR);
        id.push_str(part);
    }
    id
}

/// Category portion of a synthetic ID or tracking pattern
pub fn category_of(synthetic_id: &str) -> &str {
    synthetic_id
        .split(ID_SEPARATOR)
        .next()
        .unwrap_or(synthetic_id)
}

/// Lowercase, collapse every run of non-alphanumerics into `-`, trim dashes
pub fn make_id(value: &str) -> String {
    let mut id = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !id.is_empty() {
                id.push('-');
            }
            pending_dash = false;
            id.push(c);
        } else {
            pending_dash = true;
        }
    }
    id
}

/// Drop later risks whose synthetic ID was already emitted, keeping the
/// first occurrence in place
pub fn dedupe_by_synthetic_id(risks: Vec<Risk>) -> Vec<Risk> {
    let mut seen = HashSet::with_capacity(risks.len());
    let before = risks.len();
    let kept: Vec<Risk> = risks
        .into_iter()
        .filter(|risk| seen.insert(risk.synthetic_id.clone()))
        .collect();
    if kept.len() != before {
        log::trace!("Suppressed {} duplicate risks", before - kept.len());
    }
    kept
}
