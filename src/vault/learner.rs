//! Candidate extraction from a completed exchange.
//!
//! The prompt is scanned for first-person declaratives; the assistant's response only
//! contributes second-person restatements ("you live in Denver"), rewritten to first
//! person at a discount. Persisting, deduplication and conflict resolution happen in
//! [`crate::vault::Vault::observe`].

use std::collections::{BTreeSet, HashSet};

use crate::config::LearningConfig;
use crate::vault::rules;
use crate::vault::types::Category;

/// Response-derived statements are less trustworthy than the user's own words.
const RESPONSE_DISCOUNT: f64 = 0.8;

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 300;

/// A statement that passed extraction and validation, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub content: String,
    pub category: Category,
    pub confidence: f64,
    pub tags: BTreeSet<String>,
}

/// A sentence with its terminator already classified.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub text: String,
    pub question: bool,
}

/// Split on `.`, `!`, `?`, `;` and newlines. A period only ends a sentence when it is
/// followed by whitespace or the end of input, so `3.5` and `v1.2` stay intact.
pub fn split_sentences(text: &str) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let boundary = match c {
            '!' | '?' | ';' | '\n' => true,
            '.' => chars.peek().map_or(true, |next| next.is_whitespace()),
            _ => false,
        };
        if boundary {
            push_sentence(&mut sentences, &current, c == '?');
            current.clear();
        } else {
            current.push(c);
        }
    }
    push_sentence(&mut sentences, &current, false);
    sentences
}

fn push_sentence(out: &mut Vec<Sentence>, raw: &str, question: bool) {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !text.is_empty() {
        out.push(Sentence { text, question });
    }
}

/// Gate applied to every candidate before it is persisted.
pub fn is_valid_statement(text: &str) -> bool {
    let len = text.chars().count();
    (MIN_LEN..=MAX_LEN).contains(&len)
        && text.chars().any(char::is_alphabetic)
        && !text.contains('?')
        && !rules::is_hedged(text)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn candidate_from(sentence: &str, discount: f64, config: &LearningConfig) -> Option<Candidate> {
    if !is_valid_statement(sentence) {
        return None;
    }
    let rule = rules::match_statement(&sentence.to_lowercase())?;
    Some(Candidate {
        content: capitalize(sentence),
        category: rules::categorize(sentence),
        confidence: (rule.base_confidence * discount).min(config.initial_confidence_ceiling),
        tags: rules::topic_tags(sentence),
    })
}

/// Extract candidates from a prompt and the response it produced, prompt first.
pub fn extract(prompt: &str, response: &str, config: &LearningConfig) -> Vec<Candidate> {
    let from_prompt = split_sentences(prompt)
        .into_iter()
        .filter(|s| !s.question)
        .filter_map(|s| candidate_from(&s.text, 1.0, config));

    let from_response = split_sentences(response)
        .into_iter()
        .filter(|s| !s.question)
        .filter_map(|s| rules::first_person_restatement(&s.text))
        .filter_map(|s| candidate_from(&s, RESPONSE_DISCOUNT, config));

    let mut seen = HashSet::new();
    from_prompt
        .chain(from_response)
        .filter(|c| seen.insert(c.content.to_lowercase()))
        .collect()
}
