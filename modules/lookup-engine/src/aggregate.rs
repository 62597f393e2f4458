//! Presentation of lookup results as bounded text blocks.

use crate::collector::{Collection, Completeness};
use crate::dedup::distinct;
use crate::flagger::FlaggedCandidate;

pub const CANDIDATES_PER_BLOCK: usize = 30;
pub const WIKIS_PER_BLOCK: usize = 50;

const ACTIVITY_NOTE: &str = "Includes likes, upvotes and other activity.";
const DEVICE_DISCLAIMER: &str = "Note that device/browser match may not mean they are the same user.";

/// One page of output: a title, bullet lines, and a footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub title: String,
    pub lines: Vec<String>,
    pub footer: String,
}

impl TextBlock {
    pub fn body(&self) -> String {
        self.lines.join("\n")
    }
}

/// A wiki the subject was active on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiEntry {
    pub site_name: String,
    pub user_id: String,
}

/// Distinct non-empty sites from the subject's history, linked with the
/// first non-empty user id found anywhere in it.
pub fn wikis_view(collection: &Collection) -> Vec<WikiEntry> {
    let user_id = collection
        .records
        .iter()
        .map(|r| r.user_id.as_str())
        .find(|id| !id.is_empty())
        .unwrap_or_default();

    distinct(&collection.records, |r| r.site_name.as_str())
        .into_iter()
        .map(|site_name| WikiEntry {
            site_name,
            user_id: user_id.to_string(),
        })
        .collect()
}

fn profile_link(site_name: &str, user_id: &str) -> String {
    format!("https://{site_name}/f/u/{user_id}")
}

pub fn wiki_line(entry: &WikiEntry) -> String {
    format!(
        "• [{}]({})",
        entry.site_name,
        profile_link(&entry.site_name, &entry.user_id)
    )
}

pub fn candidate_line(candidate: &FlaggedCandidate) -> String {
    let mut line = format!(
        "• {} [{}]({})",
        candidate.user_name,
        candidate.site_name,
        profile_link(&candidate.site_name, &candidate.user_id)
    );
    if let Some(label) = candidate.confidence.label() {
        line.push(' ');
        line.push_str(label);
    }
    line
}

/// Split `items` into groups of at most `size`, in order.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

/// Footer noting the lookback window and, when relevant, truncation.
pub fn footer(collection: &Collection, device_disclaimer: bool) -> String {
    let earliest = collection.earliest.as_deref().unwrap_or("unknown");
    let mut footer = format!("{ACTIVITY_NOTE} Earliest logs at {earliest}.");
    if let Completeness::Truncated { pages } = collection.completeness {
        footer.push_str(&format!(" Results truncated after {pages} pages."));
    }
    if device_disclaimer {
        footer.push(' ');
        footer.push_str(DEVICE_DISCLAIMER);
    }
    footer
}

/// Lay `lines` out as blocks titled `{subject}: Discussions activity`,
/// numbered `(i/n)` when more than one block is needed.
pub fn blocks(subject: &str, lines: &[String], per_block: usize, footer: &str) -> Vec<TextBlock> {
    let groups = chunk(lines, per_block);
    let total = groups.len();
    groups
        .into_iter()
        .enumerate()
        .map(|(i, lines)| TextBlock {
            title: if total > 1 {
                format!("{subject}: Discussions activity ({}/{total})", i + 1)
            } else {
                format!("{subject}: Discussions activity")
            },
            lines,
            footer: footer.to_string(),
        })
        .collect()
}

pub fn wiki_blocks(subject: &str, collection: &Collection, wikis: &[WikiEntry]) -> Vec<TextBlock> {
    let lines: Vec<String> = wikis.iter().map(wiki_line).collect();
    blocks(subject, &lines, WIKIS_PER_BLOCK, &footer(collection, false))
}

pub fn candidate_blocks(
    subject: &str,
    collection: &Collection,
    candidates: &[FlaggedCandidate],
) -> Vec<TextBlock> {
    let lines: Vec<String> = candidates.iter().map(candidate_line).collect();
    blocks(subject, &lines, CANDIDATES_PER_BLOCK, &footer(collection, true))
}
