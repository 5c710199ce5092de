//! Text rendering for enumerated elements and learned mappings.
//!
//! The output is consumed by both people and agents, so every rule here is
//! deterministic: same input, same bytes.

use crate::mapping::{MappingSnapshot, iso_timestamp};
use crate::protocol::EnumeratedEntity;

/// Preview text longer than this many characters is cut and suffixed with `...`.
pub const PREVIEW_MAX_CHARS: usize = 50;

pub const NO_ELEMENTS: &str = "No interactive elements found on the page.";
pub const NOTHING_LEARNED: &str = "Nothing learned yet.";
pub const TEACH_HINT: &str = "Use the `teach` tool to map a description to a target.";

const DEFAULT_KIND: &str = "element";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingMode {
    /// One indented line per present attribute.
    Detailed,
    /// Locator inline, one line per element.
    Compact,
}

pub fn format_entities(entities: &[EnumeratedEntity], mode: ListingMode) -> String {
    if entities.is_empty() {
        return NO_ELEMENTS.to_string();
    }

    let noun = if entities.len() == 1 {
        "element"
    } else {
        "elements"
    };
    let mut output = format!("Found {} interactive {}:\n", entities.len(), noun);

    for (i, entity) in entities.iter().enumerate() {
        output.push('\n');
        output.push_str(&entity_headline(i + 1, entity));

        match mode {
            ListingMode::Detailed => {
                for (label, value) in attribute_lines(entity) {
                    output.push_str(&format!("\n   {}: {}", label, value));
                }
            }
            ListingMode::Compact => {
                if let Some(locator) = present(&entity.locator) {
                    output.push_str(&format!(" - `{}`", locator));
                }
            }
        }
    }

    output
}

fn entity_headline(index: usize, entity: &EnumeratedEntity) -> String {
    let kind = present(&entity.kind).unwrap_or(DEFAULT_KIND);
    match present(&entity.display_text) {
        Some(text) => format!("{}. {} \"{}\"", index, kind, preview(text)),
        None => format!("{}. {}", index, kind),
    }
}

/// Attributes in display priority order, skipping absent ones.
fn attribute_lines(entity: &EnumeratedEntity) -> Vec<(&'static str, &str)> {
    let attrs = &entity.attributes;
    [
        ("Selector", &entity.locator),
        ("ID", &attrs.identity),
        ("Class", &attrs.classification),
        ("Type", &attrs.category),
        ("Aria-label", &attrs.accessible_name),
    ]
    .into_iter()
    .filter_map(|(label, value)| present(value).map(|v| (label, v)))
    .collect()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Cut `text` to [`PREVIEW_MAX_CHARS`] characters, marking the cut with `...`.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_MAX_CHARS) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

pub fn format_mappings(snapshot: &MappingSnapshot) -> String {
    if snapshot.is_empty() {
        return format!("{}\n{}", NOTHING_LEARNED, TEACH_HINT);
    }

    let mut output = format!("Learned mappings ({}):\n", snapshot.len());
    for (description, mapping) in snapshot {
        output.push_str(&format!("\n- \"{}\" → `{}`", description, mapping.target));
        if let Some(notes) = &mapping.notes {
            output.push_str(&format!("\n  Notes: {}", notes));
        }
        output.push_str(&format!(
            "\n  Recorded: {}",
            iso_timestamp(&mapping.recorded_at)
        ));
    }
    output
}
