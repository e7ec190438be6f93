//! Auth-fragment inliner.
//!
//! Schema sources reference shared authorization rules as `<<name>>`
//! markers. Before parsing, each marker is replaced by the contents of
//! `<auth_dir>/<name>.gql`, stripped of comments and of lines those
//! comments leave blank. A plain textual substitution, applied to every
//! occurrence of the marker.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use tracing::debug;

use crate::error::CompileError;

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<<(.*?)>>").expect("valid regex"));

/// Replaces every `<<name>>` marker in `schema` with the cleaned contents
/// of the matching fragment file. A marker whose file cannot be read is
/// fatal.
pub fn inline_fragments(schema: &str, auth_dir: &Path) -> Result<String, CompileError> {
    let mut result = schema.to_owned();
    let mut seen: Vec<&str> = Vec::new();
    for caps in MARKER.captures_iter(schema) {
        let Some(marker) = caps.get(0).map(|m| m.as_str()) else {
            continue;
        };
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if seen.contains(&marker) {
            continue;
        }
        seen.push(marker);

        let path = auth_dir.join(format!("{name}.gql"));
        let contents =
            fs::read_to_string(&path).map_err(|source| CompileError::MissingFragment {
                path: path.display().to_string(),
                source,
            })?;
        let fragment = strip_comments(contents.trim());
        debug!(fragment = name, "inlined auth fragment");
        result = result.replace(marker, &fragment);
    }
    Ok(result)
}

/// Removes `#` comments; a line left blank by the removal disappears
/// entirely.
fn strip_comments(text: &str) -> String {
    text.lines()
        .filter_map(|line| {
            let stripped = match line.find('#') {
                Some(index) => &line[..index],
                None => line,
            };
            if stripped.trim().is_empty() {
                None
            } else {
                Some(stripped)
            }
        })
        .join("\n")
}
