//! Prompt-prefix rendering.
//!
//! ```text
//! [User context]
//! About the user:
//! - I have two cats named Luna and Pixel
//! Preferences:
//! - I like jazz
//! [End of user context]
//!
//! <original prompt>
//! ```
//!
//! Categories appear in the order their best entry was selected; entries keep score
//! order within a category. Output depends only on the input order.

use crate::config::BudgetUnit;
use crate::vault::types::{Category, ContextEntry};

const HEADER: &str = "[User context]";
const FOOTER: &str = "[End of user context]";

/// A rendered prefix and how many of the offered entries it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContext {
    pub text: String,
    /// Leading entries of the input that made it into `text`.
    pub included: usize,
}

impl RenderedContext {
    pub fn is_empty(&self) -> bool {
        self.included == 0
    }
}

fn format_block(entries: &[&ContextEntry]) -> String {
    let mut groups: Vec<(Category, Vec<&str>)> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|(c, _)| *c == entry.category) {
            Some((_, lines)) => lines.push(&entry.content),
            None => groups.push((entry.category, vec![&entry.content])),
        }
    }

    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    for (category, lines) in groups {
        out.push_str(category.heading());
        out.push_str(":\n");
        for line in lines {
            out.push_str("- ");
            out.push_str(line.trim());
            out.push('\n');
        }
    }
    out.push_str(FOOTER);
    out.push_str("\n\n");
    out
}

/// Render entries (best first) into a prefix no longer than `budget`.
///
/// Lowest-scored entries are dropped until the block fits. Entries are never cut
/// mid-text; if not even the first entry fits, the result is empty.
pub fn render(entries: &[ContextEntry], budget: usize, unit: BudgetUnit) -> RenderedContext {
    let refs: Vec<&ContextEntry> = entries.iter().collect();
    for keep in (1..=refs.len()).rev() {
        let text = format_block(&refs[..keep]);
        if unit.measure(&text) <= budget {
            return RenderedContext {
                text,
                included: keep,
            };
        }
    }
    RenderedContext {
        text: String::new(),
        included: 0,
    }
}

/// Prepend a rendered prefix to the caller's prompt.
pub fn inject(prefix: &RenderedContext, prompt: &str) -> String {
    if prefix.is_empty() {
        prompt.to_string()
    } else {
        format!("{}{}", prefix.text, prompt)
    }
}
