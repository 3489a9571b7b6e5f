//! Command handlers

pub mod collection;
pub mod config;
pub mod data;
pub mod ingredients;
pub mod rating;
pub mod status;
pub mod watch;

use anyhow::{bail, Result};

/// Resolve a full id or unique id prefix among `(id, label)` candidates
pub(crate) fn resolve_id<'a>(
    kind: &str,
    input: &str,
    candidates: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        bail!("No {} id given", kind);
    }

    let mut matches = Vec::new();
    for (id, label) in candidates {
        if id == input {
            return Ok(id.to_string());
        }
        if id.starts_with(input) {
            matches.push((id, label));
        }
    }

    match matches.as_slice() {
        [] => bail!("No {} found matching: {}", kind, input),
        [(id, _)] => Ok(id.to_string()),
        _ => {
            eprintln!("Multiple {}s match '{}':", kind, input);
            for (id, label) in &matches {
                eprintln!("  {} - {}", id, label);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
